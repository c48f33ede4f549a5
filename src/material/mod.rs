pub mod bsdf;

// External imports
use std::sync::Arc;
// Local imports
use crate::material::bsdf::{
  f0_from_ior, schlick, BsdfEvent, DispersionParams, Fresnel, MicrofacetBsdf, OrenNayarBsdf,
  SpecularTransmissiveBsdf, COS_EPSILON,
};
use crate::math::{clamp, Vec2, Vec3};
use crate::rng::Rng;
use crate::spectrum::{Spectrum, Wavelength};
use crate::texture::{SamplerDesc, Texture};

/// Below this roughness the specular lobe is compiled as a perfect mirror
const SPECULAR_ROUGHNESS : f32 = 0.01;

/// A material parameter that may be modulated by a texture
#[derive(Clone)]
pub struct ColorParameter {
  pub base    : Vec3,
  pub texture : Option< Arc< dyn Texture > >
}

impl ColorParameter {
  pub fn new( base : Vec3 ) -> ColorParameter {
    ColorParameter { base, texture: None }
  }

  pub fn evaluate( &self, uv : Vec2 ) -> Vec3 {
    match &self.texture {
      Some( tex ) => self.base.mul_elem( tex.sample( uv, &SamplerDesc::default( ) ) ),
      None => self.base
    }
  }
}

/// Everything the integrator knows about the surface point being shaded
///
/// The tangent/bitangent/normal triple is the orthonormal local frame the
/// BSDF math runs in, with the normal on the z-axis
#[derive(Clone)]
pub struct ShadingData< 'a > {
  pub material           : &'a Material,
  pub position           : Vec3,
  pub tangent            : Vec3,
  pub bitangent          : Vec3,
  pub normal             : Vec3,
  pub tex_coord          : Vec2,
  pub outgoing_dir_world : Vec3,
  pub outgoing_dir_local : Vec3,
  /// The base color sampled at `tex_coord`, resolved to the path's
  /// wavelengths
  pub base_color         : Spectrum
}

impl< 'a > ShadingData< 'a > {
  pub fn new( material : &'a Material ) -> ShadingData< 'a > {
    ShadingData {
      material
    , position:           Vec3::ZERO
    , tangent:            Vec3::new( 1.0, 0.0, 0.0 )
    , bitangent:          Vec3::new( 0.0, 1.0, 0.0 )
    , normal:             Vec3::new( 0.0, 0.0, 1.0 )
    , tex_coord:          Vec2::ZERO
    , outgoing_dir_world: Vec3::new( 0.0, 0.0, 1.0 )
    , outgoing_dir_local: Vec3::new( 0.0, 0.0, 1.0 )
    , base_color:         Spectrum::zero( )
    }
  }

  pub fn local_to_world( &self, local : Vec3 ) -> Vec3 {
    self.tangent * local.x + self.bitangent * local.y + self.normal * local.z
  }

  pub fn world_to_local( &self, world : Vec3 ) -> Vec3 {
    Vec3::new(
      world.dot( self.tangent )
    , world.dot( self.bitangent )
    , world.dot( self.normal )
    )
  }
}

/// A sampled scattering direction with its weight and probability
pub struct MaterialSample {
  /// The BSDF value at the sampled direction (cosine folded in).
  /// The path throughput update is `color / pdf`
  pub color              : Spectrum,
  pub incoming_dir_world : Vec3,
  pub pdf                : f32,
  pub event              : BsdfEvent
}

impl MaterialSample {
  fn null( ) -> MaterialSample {
    MaterialSample {
      color:              Spectrum::zero( )
    , incoming_dir_world: Vec3::ZERO
    , pdf:                0.0
    , event:              BsdfEvent::Null
    }
  }
}

/// The specular slot a material compiles to: a true mirror below the
/// roughness threshold, a GGX microfacet lobe otherwise
#[derive(Clone)]
enum SpecularSlot {
  Delta( Fresnel ),
  Glossy( MicrofacetBsdf )
}

/// A simple PBR material
///
/// The public fields describe the surface; `compile()` selects up to three
/// internal BSDF lobes (diffuse, specular/glossy, transmissive) from them.
/// Construction helpers call it already; call it again after mutating
/// fields by hand
#[derive(Clone)]
pub struct Material {
  pub debug_name          : String,

  /// Light emitted by the surface itself
  pub emission            : ColorParameter,
  /// Albedo for dielectrics, reflectance for metals
  pub base_color          : ColorParameter,
  /// 0 - perfect mirror, 1 - maximum roughness
  pub roughness           : f32,
  /// Blends between the dielectric and metallic models
  pub metalness           : f32,
  /// Index of refraction (not used when the material is dispersive)
  pub ior                 : f32,
  /// Extinction coefficient of the conductor model
  pub k                   : f32,
  pub dispersion          : DispersionParams,
  /// When set, the index of refraction follows the Sellmeier equation of
  /// `dispersion` per wavelength
  pub is_dispersive       : bool,
  pub transparent         : bool,
  pub normal_map          : Option< Arc< dyn Texture > >,
  pub normal_map_strength : f32,
  pub mask_map            : Option< Arc< dyn Texture > >,

  diffuse_bsdf      : Option< OrenNayarBsdf >,
  specular_bsdf     : Option< SpecularSlot >,
  transmissive_bsdf : Option< SpecularTransmissiveBsdf >
}

impl Material {
  pub fn new( debug_name : &str ) -> Material {
    let mut material = Material {
      debug_name:          debug_name.to_string( )
    , emission:            ColorParameter::new( Vec3::ZERO )
    , base_color:          ColorParameter::new( Vec3::new( 0.7, 0.7, 0.7 ) )
    , roughness:           0.1
    , metalness:           0.0
    , ior:                 1.5
    , k:                   4.0
    , dispersion:          DispersionParams::default( )
    , is_dispersive:       false
    , transparent:         false
    , normal_map:          None
    , normal_map_strength: 1.0
    , mask_map:            None
    , diffuse_bsdf:        None
    , specular_bsdf:       None
    , transmissive_bsdf:   None
    };
    material.compile( );
    material
  }

  /// A matte surface without a specular coat
  pub fn diffuse( debug_name : &str, base_color : Vec3 ) -> Material {
    let mut material = Material::new( debug_name );
    material.base_color = ColorParameter::new( base_color );
    material.roughness = 0.0;
    material.ior = 1.0;
    material.compile( );
    material
  }

  /// A purely emissive surface
  pub fn emissive( debug_name : &str, emission : Vec3 ) -> Material {
    let mut material = Material::new( debug_name );
    material.base_color = ColorParameter::new( Vec3::ZERO );
    material.emission = ColorParameter::new( emission );
    material.roughness = 0.0;
    material.ior = 1.0;
    material.compile( );
    material
  }

  /// A metal; the base color is its reflectance
  pub fn metal( debug_name : &str, base_color : Vec3, roughness : f32 ) -> Material {
    let mut material = Material::new( debug_name );
    material.base_color = ColorParameter::new( base_color );
    material.roughness = roughness;
    material.metalness = 1.0;
    material.compile( );
    material
  }

  /// A smooth dielectric that transmits light (glass, water)
  pub fn glass( debug_name : &str, ior : f32, is_dispersive : bool ) -> Material {
    let mut material = Material::new( debug_name );
    material.base_color = ColorParameter::new( Vec3::ONE );
    material.roughness = 0.0;
    material.ior = ior;
    material.transparent = true;
    material.is_dispersive = is_dispersive;
    material.compile( );
    material
  }

  /// Selects the internal BSDF lobes from the material parameters
  pub fn compile( &mut self ) {
    self.roughness = clamp( self.roughness, 0.0, 1.0 );
    self.metalness = clamp( self.metalness, 0.0, 1.0 );

    if self.transparent {
      self.diffuse_bsdf = None;
      self.specular_bsdf = None;
      self.transmissive_bsdf = Some( SpecularTransmissiveBsdf {
        ior:        self.ior
      , dispersion: if self.is_dispersive { Some( self.dispersion ) } else { None }
      } );
      return;
    }
    self.transmissive_bsdf = None;

    self.diffuse_bsdf = if self.metalness < 1.0 {
      Some( OrenNayarBsdf::new( self.roughness ) )
    } else {
      None
    };

    let f0 = f0_from_ior( self.ior );
    let fresnel = if self.metalness > 0.5 {
      // The base color is the measured reflectance of the metal; `ior`/`k`
      // remain available to hosts that derive base colors from them
      Fresnel::Conductor
    } else {
      Fresnel::Dielectric { f0 }
    };

    self.specular_bsdf = if self.metalness == 0.0 && f0 == 0.0 {
      None
    } else if self.roughness <= SPECULAR_ROUGHNESS {
      Some( SpecularSlot::Delta( fresnel ) )
    } else {
      Some( SpecularSlot::Glossy( MicrofacetBsdf::new( self.roughness, fresnel ) ) )
    };
  }

  /// Completes the shading data with the wavelength-dependent parts
  pub fn evaluate_shading_data( &self, wavelength : &Wavelength, shading : &mut ShadingData ) {
    let rgb = self.base_color.evaluate( shading.tex_coord );
    shading.base_color = Spectrum::sample_rgb( wavelength, rgb );
  }

  /// The tangent-space normal the normal map prescribes at `uv`
  pub fn normal_vector( &self, uv : Vec2 ) -> Vec3 {
    match &self.normal_map {
      Some( map ) => {
        let sampler = SamplerDesc { force_linear_space: true, ..Default::default( ) };
        let raw = map.sample( uv, &sampler ) * 2.0 - Vec3::ONE;
        let flat = Vec3::new( 0.0, 0.0, 1.0 );
        ( flat + ( raw - flat ) * self.normal_map_strength ).normalize( )
      },
      None => Vec3::new( 0.0, 0.0, 1.0 )
    }
  }

  /// False where the mask map cuts the surface out
  pub fn mask_value( &self, uv : Vec2 ) -> bool {
    match &self.mask_map {
      Some( map ) => {
        let sampler = SamplerDesc { force_linear_space: true, ..Default::default( ) };
        map.sample( uv, &sampler ).x >= 0.5
      },
      None => true
    }
  }

  /// Probability of routing a sample to the specular slot, given the
  /// outgoing cosine. Fresnel-weighted between the diffuse and glossy lobes
  fn specular_probability( &self, cos_o : f32 ) -> f32 {
    match (&self.diffuse_bsdf, &self.specular_bsdf) {
      (_, None) => 0.0,
      (None, Some( _ )) => 1.0,
      (Some( _ ), Some( _ )) => {
        let fresnel = schlick( f0_from_ior( self.ior ), cos_o );
        clamp( self.metalness + ( 1.0 - self.metalness ) * fresnel, 0.0, 1.0 )
      }
    }
  }

  fn delta_fresnel_color( &self, fresnel : &Fresnel, cos_o : f32, base_color : Spectrum ) -> Spectrum {
    match fresnel {
      Fresnel::Dielectric { f0 } => Spectrum::one( ) * schlick( *f0, cos_o ),
      Fresnel::Conductor => base_color
    }
  }

  /// Combined value and PDF of the non-delta lobes at a known direction
  fn evaluate_local( &self, wo : Vec3, wi : Vec3, base_color : Spectrum, spec_prob : f32 )
      -> (Spectrum, f32) {
    let mut value = Spectrum::zero( );
    let mut pdf = 0.0;

    if let Some( diffuse ) = &self.diffuse_bsdf {
      // 1 - spec_prob is exactly the (1 - metalness)(1 - fresnel) energy
      // share left for the diffuse lobe
      let (v, p) = diffuse.evaluate( wo, wi );
      value += base_color * ( v * ( 1.0 - spec_prob ) );
      pdf += ( 1.0 - spec_prob ) * p;
    }

    if let Some( SpecularSlot::Glossy( glossy ) ) = &self.specular_bsdf {
      let (v, p) = glossy.evaluate( wo, wi, base_color );
      value += v;
      pdf += spec_prob * p;
    }

    (value, pdf)
  }

  /// Chooses one BSDF lobe and samples a scattering direction from it.
  ///
  /// The returned color is the combined BSDF value (not divided by the
  /// PDF); dividing is the integrator's job, so the PDF stays visible for
  /// multiple importance sampling. A dispersive transmission collapses the
  /// wavelength sample to its hero lane
  pub fn sample( &self
               , wavelength : &mut Wavelength
               , shading    : &ShadingData
               , rng        : &mut Rng
               ) -> MaterialSample {
    let wo = shading.outgoing_dir_local;

    if let Some( transmissive ) = &self.transmissive_bsdf {
      return match transmissive.sample( wavelength, wo, rng ) {
        Some( (wi, color, event) ) => MaterialSample {
          color
        , incoming_dir_world: shading.local_to_world( wi )
        , pdf:                1.0
        , event
        },
        None => MaterialSample::null( )
      };
    }

    if wo.z < COS_EPSILON {
      return MaterialSample::null( );
    }

    let spec_prob = self.specular_probability( wo.z );
    let pick_specular = spec_prob > 0.0 && rng.next( ) < spec_prob;

    if pick_specular {
      match &self.specular_bsdf {
        None => MaterialSample::null( ),
        Some( SpecularSlot::Delta( fresnel ) ) => {
          let color = self.delta_fresnel_color( fresnel, wo.z, shading.base_color );
          let wi = Vec3::new( -wo.x, -wo.y, wo.z );
          MaterialSample {
            color
          , incoming_dir_world: shading.local_to_world( wi )
          , pdf:                spec_prob
          , event:              BsdfEvent::SpecularReflection
          }
        },
        Some( SpecularSlot::Glossy( glossy ) ) => {
          match glossy.sample( wo, shading.base_color, rng ) {
            Some( (wi, _weight, _pdf) ) => {
              let (value, pdf) = self.evaluate_local( wo, wi, shading.base_color, spec_prob );
              if pdf <= 0.0 {
                return MaterialSample::null( );
              }
              MaterialSample {
                color:              value
              , incoming_dir_world: shading.local_to_world( wi )
              , pdf
              , event:              BsdfEvent::GlossyReflection
              }
            },
            None => MaterialSample::null( )
          }
        }
      }
    } else if let Some( diffuse ) = &self.diffuse_bsdf {
      match diffuse.sample( wo, rng ) {
        Some( (wi, _weight, _pdf) ) => {
          let (value, pdf) = self.evaluate_local( wo, wi, shading.base_color, spec_prob );
          if pdf <= 0.0 {
            return MaterialSample::null( );
          }
          MaterialSample {
            color:              value
          , incoming_dir_world: shading.local_to_world( wi )
          , pdf
          , event:              BsdfEvent::DiffuseReflection
          }
        },
        None => MaterialSample::null( )
      }
    } else {
      MaterialSample::null( )
    }
  }

  /// The amount of light scattered from `incoming_dir_world` toward the
  /// outgoing direction, summed over the non-delta lobes, with the PDF the
  /// sampler would have assigned to that direction.
  ///
  /// Delta lobes contribute nothing here; they are reachable by sampling
  /// only
  pub fn evaluate( &self
                 , _wavelength        : &Wavelength
                 , shading            : &ShadingData
                 , incoming_dir_world : Vec3
                 ) -> (Spectrum, f32) {
    if self.transmissive_bsdf.is_some( ) {
      return (Spectrum::zero( ), 0.0);
    }

    let wo = shading.outgoing_dir_local;
    let wi = shading.world_to_local( incoming_dir_world );
    if wo.z < COS_EPSILON || wi.z < COS_EPSILON {
      return (Spectrum::zero( ), 0.0);
    }

    let spec_prob = self.specular_probability( wo.z );
    self.evaluate_local( wo, wi, shading.base_color, spec_prob )
  }
}

#[cfg(test)]
mod tests {
  use super::{Material, ShadingData};
  use crate::material::bsdf::BsdfEvent;
  use crate::math::Vec3;
  use crate::rng::Rng;
  use crate::spectrum::Wavelength;

  fn shading_for< 'a >( material : &'a Material, wavelength : &Wavelength ) -> ShadingData< 'a > {
    let mut shading = ShadingData::new( material );
    shading.outgoing_dir_world = Vec3::new( 0.2, 0.3, 0.93 ).normalize( );
    shading.outgoing_dir_local = shading.world_to_local( shading.outgoing_dir_world );
    material.evaluate_shading_data( wavelength, &mut shading );
    shading
  }

  #[test]
  fn lambertian_weight_is_the_base_color( ) {
    let material = Material::diffuse( "matte", Vec3::splat( 0.5 ) );
    let mut rng = Rng::new( 81 );
    let mut wavelength = Wavelength::randomize( &mut rng );
    let shading = shading_for( &material, &wavelength );

    for _i in 0..500 {
      let sample = material.sample( &mut wavelength, &shading, &mut rng );
      if sample.event == BsdfEvent::Null {
        continue;
      }
      assert_eq!( sample.event, BsdfEvent::DiffuseReflection );
      // cosine sampling cancels exactly; f / pdf equals the albedo
      let weight = sample.color.max_value( ) / sample.pdf;
      assert!( ( weight - 0.5 ).abs( ) < 1.0e-4, "weight {}", weight );
    }
  }

  #[test]
  fn smooth_metal_is_a_delta_mirror( ) {
    let material = Material::metal( "chrome", Vec3::splat( 0.9 ), 0.0 );
    let mut rng = Rng::new( 82 );
    let mut wavelength = Wavelength::randomize( &mut rng );
    let shading = shading_for( &material, &wavelength );

    let sample = material.sample( &mut wavelength, &shading, &mut rng );
    assert_eq!( sample.event, BsdfEvent::SpecularReflection );
    assert!( sample.event.is_delta( ) );
    assert!( ( sample.pdf - 1.0 ).abs( ) < 1.0e-6 );

    // Mirror direction around the normal
    let expected = shading.outgoing_dir_world.reflect( shading.normal );
    assert!( ( sample.incoming_dir_world - expected ).len( ) < 1.0e-5 );

    // Delta lobes cannot be evaluated
    let (value, pdf) = material.evaluate( &wavelength, &shading, expected );
    assert!( value.almost_zero( ) );
    assert_eq!( pdf, 0.0 );
  }

  #[test]
  fn evaluate_agrees_with_sample_pdf( ) {
    // A plastic-like material with both a diffuse and a glossy lobe
    let mut material = Material::new( "plastic" );
    material.base_color = super::ColorParameter::new( Vec3::new( 0.6, 0.2, 0.2 ) );
    material.roughness = 0.4;
    material.compile( );

    let mut rng = Rng::new( 83 );
    let mut wavelength = Wavelength::randomize( &mut rng );
    let shading = shading_for( &material, &wavelength );

    for _i in 0..500 {
      let sample = material.sample( &mut wavelength, &shading, &mut rng );
      if sample.event == BsdfEvent::Null {
        continue;
      }
      let (value, pdf) = material.evaluate( &wavelength, &shading, sample.incoming_dir_world );
      assert!( ( pdf - sample.pdf ).abs( ) < 1.0e-3 * pdf.max( 1.0 )
             , "pdf {} vs {}", pdf, sample.pdf );
      assert!( ( value.max_value( ) - sample.color.max_value( ) ).abs( ) < 1.0e-3 );
    }
  }

  #[test]
  fn transparent_material_refracts( ) {
    let material = Material::glass( "glass", 1.5, false );
    let mut rng = Rng::new( 84 );
    let mut wavelength = Wavelength::randomize( &mut rng );
    let shading = shading_for( &material, &wavelength );

    let mut seen_refraction = false;
    for _i in 0..64 {
      let sample = material.sample( &mut wavelength, &shading, &mut rng );
      assert!( sample.event.is_delta( ) );
      if sample.event == BsdfEvent::SpecularRefraction {
        // Transmitted rays leave through the far side
        assert!( shading.world_to_local( sample.incoming_dir_world ).z < 0.0 );
        seen_refraction = true;
      }
    }
    assert!( seen_refraction );
  }
}

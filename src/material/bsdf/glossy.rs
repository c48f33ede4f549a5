// External imports
use std::f32::consts::PI;
// Local imports
use crate::material::bsdf::COS_EPSILON;
use crate::math::Vec3;
use crate::rng::Rng;
use crate::spectrum::Spectrum;

/// Which Fresnel model tints the microfacet reflection
#[derive(Copy,Clone,Debug)]
pub enum Fresnel {
  /// Scalar Schlick reflectance derived from the index of refraction;
  /// the highlight is uncolored
  Dielectric { f0 : f32 },
  /// The base color is the reflectance. Metals reflect their own color
  Conductor
}

/// Normal-incidence reflectance of a dielectric boundary against air
pub fn f0_from_ior( ior : f32 ) -> f32 {
  let r = ( ior - 1.0 ) / ( ior + 1.0 );
  r * r
}

pub fn schlick( f0 : f32, cos_theta : f32 ) -> f32 {
  let f = 1.0 - cos_theta.max( 0.0 );
  let f2 = f * f;
  f0 + ( 1.0 - f0 ) * f2 * f2 * f
}

/// GGX microfacet reflection with the Smith shadowing term
///
/// The half vector is drawn from the GGX normal distribution; PDF and
/// evaluation carry the `D h_z / (4 (wo.h))` Jacobian of that choice
#[derive(Copy,Clone,Debug)]
pub struct MicrofacetBsdf {
  alpha   : f32,
  fresnel : Fresnel
}

impl MicrofacetBsdf {
  pub fn new( roughness : f32, fresnel : Fresnel ) -> MicrofacetBsdf {
    // Perceptual roughness remap
    let alpha = ( roughness * roughness ).max( 1.0e-4 );
    MicrofacetBsdf { alpha, fresnel }
  }

  /// GGX normal distribution, evaluated at the half-vector cosine
  fn d( &self, h_z : f32 ) -> f32 {
    let a2 = self.alpha * self.alpha;
    let t = h_z * h_z * ( a2 - 1.0 ) + 1.0;
    a2 / ( PI * t * t )
  }

  /// Smith masking for one direction
  fn g1( &self, v_z : f32 ) -> f32 {
    let a2 = self.alpha * self.alpha;
    2.0 * v_z / ( v_z + ( a2 + ( 1.0 - a2 ) * v_z * v_z ).sqrt( ) )
  }

  fn fresnel_color( &self, cos_theta : f32, base_color : Spectrum ) -> Spectrum {
    match self.fresnel {
      Fresnel::Dielectric { f0 } => Spectrum::one( ) * schlick( f0, cos_theta ),
      Fresnel::Conductor => base_color
    }
  }

  /// Draws an incoming direction; returns `(incoming, weight, pdf)`.
  /// The weight is the full throughput factor `value / pdf`
  pub fn sample( &self, wo : Vec3, base_color : Spectrum, rng : &mut Rng )
      -> Option< (Vec3, Spectrum, f32) > {
    if wo.z < COS_EPSILON {
      return None;
    }

    // Sample a microfacet normal from the GGX distribution
    let u1 = rng.next( );
    let u2 = rng.next( );
    let a2 = self.alpha * self.alpha;
    let cos2_h = ( 1.0 - u1 ) / ( 1.0 + ( a2 - 1.0 ) * u1 );
    let cos_h = cos2_h.sqrt( );
    let sin_h = ( 1.0 - cos2_h ).max( 0.0 ).sqrt( );
    let phi = 2.0 * PI * u2;
    let h = Vec3::new( sin_h * phi.cos( ), sin_h * phi.sin( ), cos_h );

    let wi = wo.reflect( h );
    if wi.z < COS_EPSILON {
      return None;
    }

    let (value, pdf) = self.evaluate_with_half( wo, wi, h, base_color );
    if pdf <= 0.0 {
      return None;
    }

    Some( (wi, value * ( 1.0 / pdf ), pdf) )
  }

  /// The reflected fraction toward `wi` (cosine included) and its PDF
  pub fn evaluate( &self, wo : Vec3, wi : Vec3, base_color : Spectrum ) -> (Spectrum, f32) {
    if wo.z < COS_EPSILON || wi.z < COS_EPSILON {
      return (Spectrum::zero( ), 0.0);
    }
    let h = ( wo + wi ).normalize( );
    self.evaluate_with_half( wo, wi, h, base_color )
  }

  fn evaluate_with_half( &self, wo : Vec3, wi : Vec3, h : Vec3, base_color : Spectrum )
      -> (Spectrum, f32) {
    let wo_dot_h = wo.dot( h );
    if wo_dot_h < COS_EPSILON || h.z < COS_EPSILON {
      return (Spectrum::zero( ), 0.0);
    }

    let d = self.d( h.z );
    let g = self.g1( wo.z ) * self.g1( wi.z );
    let f = self.fresnel_color( wo_dot_h, base_color );

    // D G F / (4 cos_o cos_i), with the cosine toward the light folded in
    let value = f * ( d * g / ( 4.0 * wo.z ) );
    let pdf = d * h.z / ( 4.0 * wo_dot_h );

    (value, pdf)
  }
}

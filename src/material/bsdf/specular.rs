// Local imports
use crate::material::bsdf::glossy::{f0_from_ior, schlick};
use crate::material::bsdf::{BsdfEvent, COS_EPSILON};
use crate::math::Vec3;
use crate::rng::Rng;
use crate::spectrum::{Spectrum, Wavelength};

/// Coefficients of the Sellmeier dispersion equation
#[derive(Copy,Clone,Debug)]
pub struct DispersionParams {
  pub b : [f32; 3],
  pub c : [f32; 3]
}

impl Default for DispersionParams {
  /// Borosilicate crown glass (BK7)
  fn default( ) -> DispersionParams {
    DispersionParams {
      b: [ 1.039_612_1, 0.231_792_34, 1.010_469_5 ]
    , c: [ 0.006_000_699, 0.020_017_914, 103.560_65 ]
    }
  }
}

/// Index of refraction at a wavelength (in micrometers) per the Sellmeier
/// equation
pub fn sellmeier( params : &DispersionParams, lambda_micrometers : f32 ) -> f32 {
  let l2 = lambda_micrometers * lambda_micrometers;
  let mut n2 = 1.0;
  for i in 0..3 {
    n2 += params.b[ i ] * l2 / ( l2 - params.c[ i ] );
  }
  n2.max( 1.0 ).sqrt( )
}

/// Perfectly smooth refraction (and reflection, by Fresnel chance) through
/// a dielectric boundary. Both outcomes are delta events with `pdf = 1`
///
/// A dispersive material derives its index of refraction from the hero
/// wavelength and collapses the spectral sample to that single lane
#[derive(Copy,Clone,Debug)]
pub struct SpecularTransmissiveBsdf {
  pub ior        : f32,
  pub dispersion : Option< DispersionParams >
}

impl SpecularTransmissiveBsdf {
  /// Draws the transmitted (or Fresnel-reflected) direction.
  /// Returns `(incoming, weight, event)`
  pub fn sample( &self
               , wavelength : &mut Wavelength
               , wo         : Vec3
               , rng        : &mut Rng
               ) -> Option< (Vec3, Spectrum, BsdfEvent) > {
    if wo.z.abs( ) < COS_EPSILON {
      return None;
    }

    let mut color = Spectrum::one( );
    let ior = if let Some( params ) = &self.dispersion {
      if !wavelength.is_single {
        color = Spectrum::single_wavelength_fallback( );
        wavelength.is_single = true;
      }
      sellmeier( params, wavelength.base_micrometers( ) )
    } else {
      self.ior
    };

    // The normal flipped toward the outgoing side
    let entering = wo.z > 0.0;
    let n_sign = if entering { 1.0 } else { -1.0 };
    let eta = if entering { 1.0 / ior } else { ior };

    let cos_i = wo.z.abs( );
    let sin2_t = eta * eta * ( 1.0 - cos_i * cos_i );

    if sin2_t >= 1.0 {
      // Total internal reflection
      return Some( (Vec3::new( -wo.x, -wo.y, wo.z ), color, BsdfEvent::SpecularReflection) );
    }

    let fresnel = schlick( f0_from_ior( ior ), cos_i );
    if rng.next( ) < fresnel {
      return Some( (Vec3::new( -wo.x, -wo.y, wo.z ), color, BsdfEvent::SpecularReflection) );
    }

    let cos_t = ( 1.0 - sin2_t ).sqrt( );
    let wi = Vec3::new(
      -eta * wo.x
    , -eta * wo.y
    , -n_sign * cos_t
    );
    Some( (wi.normalize( ), color, BsdfEvent::SpecularRefraction) )
  }
}

#[cfg(test)]
mod tests {
  use super::{sellmeier, DispersionParams, SpecularTransmissiveBsdf};
  use crate::material::bsdf::BsdfEvent;
  use crate::math::Vec3;
  use crate::rng::Rng;
  use crate::spectrum::Wavelength;

  #[test]
  fn sellmeier_matches_bk7_reference( ) {
    let params = DispersionParams::default( );
    // n_d at 587.6 nm is 1.5168 for BK7
    let n = sellmeier( &params, 0.5876 );
    assert!( ( n - 1.5168 ).abs( ) < 1.0e-3, "n = {}", n );
    // Blue light bends more than red
    assert!( sellmeier( &params, 0.4 ) > sellmeier( &params, 0.7 ) );
  }

  #[test]
  fn straight_through_at_normal_incidence( ) {
    let bsdf = SpecularTransmissiveBsdf { ior: 1.5, dispersion: None };
    let mut rng = Rng::new( 41 );
    let mut wl = Wavelength::randomize( &mut rng );
    // Sample until a refraction comes out (Fresnel may pick reflection)
    for _i in 0..64 {
      let (wi, _c, event) = bsdf
        .sample( &mut wl, Vec3::new( 0.0, 0.0, 1.0 ), &mut rng )
        .unwrap( );
      if event == BsdfEvent::SpecularRefraction {
        assert!( ( wi.z - -1.0 ).abs( ) < 1.0e-6 );
        return;
      }
    }
    panic!( "refraction never sampled" );
  }

  #[test]
  fn grazing_exit_is_total_internal_reflection( ) {
    let bsdf = SpecularTransmissiveBsdf { ior: 1.5, dispersion: None };
    let mut rng = Rng::new( 43 );
    let mut wl = Wavelength::randomize( &mut rng );
    // Leaving the dense medium at a steep angle
    let wo = Vec3::new( 0.9, 0.0, -0.435_889_9 ).normalize( );
    let (wi, _c, event) = bsdf.sample( &mut wl, wo, &mut rng ).unwrap( );
    assert_eq!( event, BsdfEvent::SpecularReflection );
    assert!( ( wi.z - wo.z ).abs( ) < 1.0e-6 );
  }

  #[test]
  fn dispersion_collapses_to_hero_wavelength( ) {
    let bsdf = SpecularTransmissiveBsdf { ior: 1.5, dispersion: Some( DispersionParams::default( ) ) };
    let mut rng = Rng::new( 44 );
    let mut wl = Wavelength::randomize( &mut rng );
    assert!( !wl.is_single );
    let (_wi, color, _event) = bsdf.sample( &mut wl, Vec3::new( 0.0, 0.0, 1.0 ), &mut rng ).unwrap( );
    assert!( wl.is_single );
    assert_eq!( color.value.lane( 0 ), 8.0 );
    assert_eq!( color.value.lane( 3 ), 0.0 );
  }
}

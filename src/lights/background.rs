// External imports
use std::f32::consts::PI;
// Local imports
use crate::lights::Illumination;
use crate::math::Vec3;
use crate::rng::Rng;
use crate::spectrum::{Spectrum, Wavelength};

/// The environment: constant radiance arriving from every direction a ray
/// escapes into
///
/// Kept apart from the scene's light list, as it backs both the NEE
/// sampling and the "ray missed everything" path of the integrator
pub struct BackgroundLight {
  pub color : Vec3
}

impl BackgroundLight {
  pub fn new( color : Vec3 ) -> BackgroundLight {
    BackgroundLight { color }
  }

  /// Radiance along an escaping ray, with the solid-angle PDF the
  /// `illuminate(..)` sampler would have assigned to that direction
  pub fn radiance( &self, wavelength : &Wavelength, _ray_dir : Vec3 ) -> (Spectrum, f32) {
    ( Spectrum::sample_rgb( wavelength, self.color ), 1.0 / ( 4.0 * PI ) )
  }

  /// Samples a direction uniformly over the sphere. Uniform keeps the PDF
  /// reported by `radiance(..)` exact for MIS without knowing the surface
  /// normal here
  pub fn illuminate( &self, wavelength : &Wavelength, rng : &mut Rng ) -> Illumination {
    let z = 1.0 - 2.0 * rng.next( );
    let r = ( 1.0 - z * z ).max( 0.0 ).sqrt( );
    let phi = 2.0 * PI * rng.next( );
    let dir = Vec3::new( r * phi.cos( ), r * phi.sin( ), z );

    Illumination {
      direction_to_light: dir
    , distance:           1.0e+30
    , direct_pdf_w:       1.0 / ( 4.0 * PI )
    , radiance:           Spectrum::sample_rgb( wavelength, self.color )
    }
  }
}

// Local imports
use crate::geometry::Aabb;
use crate::lights::Illumination;
use crate::math::Vec3;
use crate::spectrum::{Spectrum, Wavelength};

/// A light at infinity shining along a fixed direction (sunlight)
pub struct DirectionalLight {
  direction : Vec3,
  color     : Vec3
}

impl DirectionalLight {
  /// `direction` points from the light toward the scene
  pub fn new( direction : Vec3, color : Vec3 ) -> DirectionalLight {
    DirectionalLight { direction: direction.normalize( ), color }
  }

  pub fn bounding_box( &self ) -> Aabb {
    Aabb::empty( )
  }

  pub fn illuminate( &self, _point : Vec3, wavelength : &Wavelength ) -> Option< Illumination > {
    Some( Illumination {
      direction_to_light: -self.direction
    // Far enough that any scene geometry can occlude; no distance
    // attenuation applies at infinity
    , distance:           1.0e+30
    , direct_pdf_w:       1.0
    , radiance:           Spectrum::sample_rgb( wavelength, self.color )
    } )
  }
}

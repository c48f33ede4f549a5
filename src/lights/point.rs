// Local imports
use crate::geometry::Aabb;
use crate::lights::Illumination;
use crate::math::Vec3;
use crate::spectrum::{Spectrum, Wavelength};

/// An infinitely small light emitting in all directions
///
/// A delta light: rays can never hit it, and its sampling distribution is
/// a Dirac, so next-event estimation takes it with MIS weight 1
pub struct PointLight {
  position : Vec3,
  color    : Vec3
}

impl PointLight {
  pub fn new( position : Vec3, color : Vec3 ) -> PointLight {
    PointLight { position, color }
  }

  pub fn bounding_box( &self ) -> Aabb {
    Aabb::new( self.position, self.position )
  }

  pub fn illuminate( &self, point : Vec3, wavelength : &Wavelength ) -> Option< Illumination > {
    let mut to_light = self.position - point;
    let sqr_distance = to_light.len_sq( );
    if sqr_distance <= 0.0 {
      return None;
    }

    let distance = sqr_distance.sqrt( );
    to_light = to_light / distance;

    Some( Illumination {
      direction_to_light: to_light
    , distance
    // The inverse-square falloff rides in through the PDF
    , direct_pdf_w:       sqr_distance
    , radiance:           Spectrum::sample_rgb( wavelength, self.color )
    } )
  }
}

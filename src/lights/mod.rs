mod area;
mod background;
mod directional;
mod point;

pub use area::AreaLight;
pub use background::BackgroundLight;
pub use directional::DirectionalLight;
pub use point::PointLight;

// Local imports
use crate::geometry::{Aabb, Ray};
use crate::math::Vec3;
use crate::rng::Rng;
use crate::spectrum::{Spectrum, Wavelength};

/// A light source's answer to "illuminate this point"
#[derive(Copy,Clone)]
pub struct Illumination {
  /// Unit direction from the shading point toward the light
  pub direction_to_light : Vec3,
  /// Distance to the sampled light point (shadow rays probe up to this)
  pub distance           : f32,
  pub radiance           : Spectrum,
  /// Solid-angle probability of having sampled this direction
  pub direct_pdf_w       : f32
}

/// A general light class which encapsulates the available light sources
pub enum Light {
  Point( PointLight ),
  Area( AreaLight ),
  Directional( DirectionalLight )
}

impl Light {
  /// Constructs a new point light. See `PointLight::new(..)`
  pub fn point( position : Vec3, color : Vec3 ) -> Light {
    Light::Point( PointLight::new( position, color ) )
  }

  /// Constructs a new area light. See `AreaLight::new(..)`
  pub fn area( p0 : Vec3, edge0 : Vec3, edge1 : Vec3, color : Vec3, is_triangle : bool ) -> Light {
    Light::Area( AreaLight::new( p0, edge0, edge1, color, is_triangle ) )
  }

  /// Constructs a new directional light. See `DirectionalLight::new(..)`
  pub fn directional( direction : Vec3, color : Vec3 ) -> Light {
    Light::Directional( DirectionalLight::new( direction, color ) )
  }

  /// The light surface's bounding box (empty for immaterial lights)
  pub fn bounding_box( &self ) -> Aabb {
    match self {
      Light::Point( l ) => l.bounding_box( ),
      Light::Area( l ) => l.bounding_box( ),
      Light::Directional( l ) => l.bounding_box( )
    }
  }

  /// Whether (and where) a ray hits the light's surface. Delta lights can
  /// never be hit
  pub fn test_ray_hit( &self, ray : &Ray ) -> Option< f32 > {
    match self {
      Light::Point( _ ) => None,
      Light::Area( l ) => l.test_ray_hit( ray ),
      Light::Directional( _ ) => None
    }
  }

  /// Samples a direction from the shading point toward the light
  pub fn illuminate( &self
                   , point      : Vec3
                   , wavelength : &Wavelength
                   , rng        : &mut Rng
                   ) -> Option< Illumination > {
    match self {
      Light::Point( l ) => l.illuminate( point, wavelength ),
      Light::Area( l ) => l.illuminate( point, wavelength, rng ),
      Light::Directional( l ) => l.illuminate( point, wavelength )
    }
  }

  /// Radiance carried by a ray that hit the light surface directly, with
  /// the area probability of that point and the cosine at the light
  pub fn radiance( &self
                 , wavelength : &Wavelength
                 , ray_dir    : Vec3
                 , hit_point  : Vec3
                 ) -> Option< (Spectrum, f32, f32) > {
    match self {
      Light::Point( _ ) => None,
      Light::Area( l ) => l.radiance( wavelength, ray_dir, hit_point ),
      Light::Directional( _ ) => None
    }
  }

  /// True for lights of finite extent (point, area)
  pub fn is_finite( &self ) -> bool {
    match self {
      Light::Point( _ ) => true,
      Light::Area( _ ) => true,
      Light::Directional( _ ) => false
    }
  }

  /// True for lights with a Dirac sampling distribution; they skip
  /// multiple importance sampling
  pub fn is_delta( &self ) -> bool {
    match self {
      Light::Point( _ ) => true,
      Light::Area( _ ) => false,
      Light::Directional( _ ) => true
    }
  }
}

// Local imports
use crate::geometry::{intersect_triangle, Aabb, ProcessedTriangle, Ray};
use crate::lights::Illumination;
use crate::math::{Vec3, EPSILON};
use crate::rng::Rng;
use crate::spectrum::{Spectrum, Wavelength};

/// A one-sided emitting parallelogram (or triangle) patch
pub struct AreaLight {
  p0          : Vec3,
  edge0       : Vec3,
  edge1       : Vec3,
  color       : Vec3,
  is_triangle : bool,
  normal      : Vec3,
  inv_area    : f32
}

impl AreaLight {
  pub fn new( p0 : Vec3, edge0 : Vec3, edge1 : Vec3, color : Vec3, is_triangle : bool ) -> AreaLight {
    let cross = edge1.cross( edge0 );
    let normal = cross.normalize( );
    let mut surface_area = cross.len( );
    if is_triangle {
      surface_area *= 0.5;
    }

    AreaLight {
      p0
    , edge0
    , edge1
    , color
    , is_triangle
    , normal
    , inv_area: 1.0 / surface_area
    }
  }

  pub fn bounding_box( &self ) -> Aabb {
    let mut aabb = Aabb::from_points( self.p0, self.p0 + self.edge0, self.p0 + self.edge1 );
    if !self.is_triangle {
      aabb = aabb.include( self.p0 + self.edge0 + self.edge1 );
    }
    aabb
  }

  pub fn test_ray_hit( &self, ray : &Ray ) -> Option< f32 > {
    let half = ProcessedTriangle {
      v0:    self.p0
    , edge1: self.edge0
    , edge2: self.edge1
    };
    if let Some( (t, _u, _v) ) = intersect_triangle( ray, &half ) {
      return Some( t );
    }

    if !self.is_triangle {
      let opposite = ProcessedTriangle {
        v0:    self.p0 + self.edge0 + self.edge1
      , edge1: -self.edge0
      , edge2: -self.edge1
      };
      if let Some( (t, _u, _v) ) = intersect_triangle( ray, &opposite ) {
        return Some( t );
      }
    }

    None
  }

  pub fn illuminate( &self
                   , point      : Vec3
                   , wavelength : &Wavelength
                   , rng        : &mut Rng
                   ) -> Option< Illumination > {
    let (u, v) = if self.is_triangle {
      // Uniform barycentric point on the triangle half
      let mut u = rng.next( );
      let mut v = rng.next( );
      if u + v > 1.0 {
        u = 1.0 - u;
        v = 1.0 - v;
      }
      (u, v)
    } else {
      (rng.next( ), rng.next( ))
    };

    let light_point = self.p0 + self.edge0 * u + self.edge1 * v;
    let mut to_light = light_point - point;
    let sqr_distance = to_light.len_sq( );
    let distance = sqr_distance.sqrt( );
    to_light = to_light / distance;

    // Facing the back of the patch
    let cos_normal_dir = self.normal.dot( -to_light );
    if cos_normal_dir < EPSILON {
      return None;
    }

    Some( Illumination {
      direction_to_light: to_light
    , distance
    , direct_pdf_w:       self.inv_area * sqr_distance / cos_normal_dir
    , radiance:           Spectrum::sample_rgb( wavelength, self.color )
    } )
  }

  /// Radiance toward a ray that hit the patch, the area probability of
  /// the hit point, and the cosine at the light surface (needed to turn
  /// the area probability into a solid-angle one)
  pub fn radiance( &self
                 , wavelength : &Wavelength
                 , ray_dir    : Vec3
                 , _hit_point : Vec3
                 ) -> Option< (Spectrum, f32, f32) > {
    let cos_normal_dir = self.normal.dot( -ray_dir );
    if cos_normal_dir < EPSILON {
      return None;
    }

    Some( (Spectrum::sample_rgb( wavelength, self.color ), self.inv_area, cos_normal_dir) )
  }
}

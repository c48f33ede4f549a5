// External imports
use std::f32::INFINITY;
// Local imports
use crate::geometry::ray::{Ray, Ray8};
use crate::math::{Bool8, Float8, Vec3, Vec3x8};

/// An Axis-Aligned Bounding Box
///
/// Fast intersection with the hit distance is available, both for a single
/// ray and for 8 rays at once.
#[derive(Copy,Clone,Debug)]
pub struct Aabb {
  pub min : Vec3,
  pub max : Vec3
}

impl Aabb {
  /// The empty box. It is the identity of `join(..)`:
  /// `Aabb::empty().join(&b) == b` for any box `b`
  pub fn empty( ) -> Aabb {
    Aabb {
      min: Vec3::splat( INFINITY )
    , max: Vec3::splat( -INFINITY )
    }
  }

  pub fn new( min : Vec3, max : Vec3 ) -> Aabb {
    Aabb { min, max }
  }

  /// The smallest box containing all three points
  pub fn from_points( a : Vec3, b : Vec3, c : Vec3 ) -> Aabb {
    Aabb {
      min: a.min_elem( b ).min_elem( c )
    , max: a.max_elem( b ).max_elem( c )
    }
  }

  pub fn is_empty( &self ) -> bool {
    self.min.x > self.max.x
  }

  /// Returns the smallest AABB containing both `self` and `o`
  pub fn join( &self, o : &Aabb ) -> Aabb {
    Aabb {
      min: self.min.min_elem( o.min )
    , max: self.max.max_elem( o.max )
    }
  }

  /// Grows the box to contain the point
  pub fn include( &self, v : Vec3 ) -> Aabb {
    Aabb {
      min: self.min.min_elem( v )
    , max: self.max.max_elem( v )
    }
  }

  /// Returns the center point of the AABB
  pub fn center( &self ) -> Vec3 {
    ( self.min + self.max ) * 0.5
  }

  pub fn surface_area( &self ) -> f32 {
    let s = self.max - self.min;
    2.0 * ( s.x * s.y + s.x * s.z + s.y * s.z )
  }

  pub fn volume( &self ) -> f32 {
    let s = self.max - self.min;
    s.x * s.y * s.z
  }

  /// True if `o` is a subset of `self`
  pub fn contains( &self, o : &Aabb ) -> bool {
    o.min.x >= self.min.x && o.min.y >= self.min.y && o.min.z >= self.min.z
      && o.max.x <= self.max.x && o.max.y <= self.max.y && o.max.z <= self.max.z
  }

  /// Intersects the ray with the box. If it intersects, the minimum positive
  /// distance is returned. If the ray originates inside the box, then
  /// `Some(0.0)` is returned. If the box lies behind the ray, `None`
  pub fn hit( &self, ray : &Ray ) -> Option< f32 > {
    // "Clip" the line within the box, along each axis
    let tx1 = ( self.min.x - ray.origin.x ) * ray.inv_dir.x;
    let tx2 = ( self.max.x - ray.origin.x ) * ray.inv_dir.x;
    let ty1 = ( self.min.y - ray.origin.y ) * ray.inv_dir.y;
    let ty2 = ( self.max.y - ray.origin.y ) * ray.inv_dir.y;
    let tz1 = ( self.min.z - ray.origin.z ) * ray.inv_dir.z;
    let tz2 = ( self.max.z - ray.origin.z ) * ray.inv_dir.z;

    let tmin = tx1.min( tx2 ).max( ty1.min( ty2 ) ).max( tz1.min( tz2 ) );
    let tmax = tx1.max( tx2 ).min( ty1.max( ty2 ) ).min( tz1.max( tz2 ) );

    if tmin > tmax { // Does not intersect
      None
    } else if tmin >= 0.0 { // Outside the box
      Some( tmin )
    } else if tmax >= 0.0 { // Inside the box
      Some( 0.0 )
    } else { // Box behind the ray
      None
    }
  }

  /// Intersects 8 rays with this one box at once.
  ///
  /// Returns the lane mask of rays that hit, and per-lane entry distances
  /// (0 for rays originating inside the box; undefined for missing lanes)
  pub fn hit8( &self, ray : &Ray8 ) -> (Bool8, Float8) {
    let bmin = Vec3x8::splat( self.min );
    let bmax = Vec3x8::splat( self.max );

    let t1x = ( bmin.x - ray.origin.x ) * ray.inv_dir.x;
    let t2x = ( bmax.x - ray.origin.x ) * ray.inv_dir.x;
    let t1y = ( bmin.y - ray.origin.y ) * ray.inv_dir.y;
    let t2y = ( bmax.y - ray.origin.y ) * ray.inv_dir.y;
    let t1z = ( bmin.z - ray.origin.z ) * ray.inv_dir.z;
    let t2z = ( bmax.z - ray.origin.z ) * ray.inv_dir.z;

    let tmin = t1x.min( t2x ).max( t1y.min( t2y ) ).max( t1z.min( t2z ) );
    let tmax = t1x.max( t2x ).min( t1y.max( t2y ) ).min( t1z.max( t2z ) );

    let hits = tmin.le( tmax ).and( tmax.ge( Float8::ZERO ) );
    let dist = tmin.max( Float8::ZERO );
    (hits, dist)
  }
}

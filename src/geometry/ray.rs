// Local imports
use crate::math::{Float8, Vec3, Vec3x8};

/// Marker for a hit that did not land on any object
pub const INVALID_OBJECT : u32 = u32::MAX;
/// Marker in `sub_object_id` for a hit on a light surface
pub const LIGHT_OBJECT : u32 = u32::MAX;

/// A half-line in 3-dimensional space
///
/// Conceptually, it "shoots" from an origin into a direction.
/// The direction should be of unit length. The reciprocal direction is
/// precomputed, as the slab test against bounding boxes needs it
#[derive(Clone,Copy)]
pub struct Ray {
  pub origin  : Vec3,
  pub dir     : Vec3,
  pub inv_dir : Vec3
}

impl Ray {
  /// Constructs a new `Ray`. The direction should be of unit length
  pub fn new( origin : Vec3, dir : Vec3 ) -> Ray {
    let inv_dir = Vec3::new( 1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z );
    Ray { origin, dir, inv_dir }
  }

  /// Evaluates the ray at the provided distance from its origin
  pub fn at( &self, distance : f32 ) -> Vec3 {
    self.origin + distance * self.dir
  }
}

/// 8 rays in SoA form, traversed together in the SIMD and packet modes
#[derive(Clone,Copy)]
pub struct Ray8 {
  pub origin  : Vec3x8,
  pub dir     : Vec3x8,
  pub inv_dir : Vec3x8
}

impl Ray8 {
  pub fn new( origin : Vec3x8, dir : Vec3x8 ) -> Ray8 {
    Ray8 { origin, dir, inv_dir: dir.recip( ) }
  }

  /// Extracts the scalar ray in lane `i`
  pub fn lane( &self, i : usize ) -> Ray {
    Ray::new( self.origin.lane( i ), self.dir.lane( i ) )
  }
}

/// The nearest intersection found along a ray
///
/// `sub_object_id` identifies the primitive within the object (the triangle
/// index for meshes), or `LIGHT_OBJECT` when a light surface was hit.
#[derive(Clone,Copy)]
pub struct HitPoint {
  pub distance      : f32,
  pub u             : f32,
  pub v             : f32,
  pub object_id     : u32,
  pub sub_object_id : u32
}

impl HitPoint {
  /// A hit point representing "no hit yet"; any real hit is closer
  pub fn no_hit( ) -> HitPoint {
    HitPoint {
      distance:      f32::MAX
    , u:             0.0
    , v:             0.0
    , object_id:     INVALID_OBJECT
    , sub_object_id: INVALID_OBJECT
    }
  }

  pub fn is_hit( &self ) -> bool {
    self.distance != f32::MAX
  }
}

/// Nearest intersections for 8 rays at once
#[derive(Clone,Copy)]
pub struct HitPoint8 {
  pub distance      : Float8,
  pub u             : Float8,
  pub v             : Float8,
  pub object_id     : [u32; 8],
  pub sub_object_id : [u32; 8]
}

impl HitPoint8 {
  pub fn no_hit( ) -> HitPoint8 {
    HitPoint8 {
      distance:      Float8::splat( f32::MAX )
    , u:             Float8::ZERO
    , v:             Float8::ZERO
    , object_id:     [INVALID_OBJECT; 8]
    , sub_object_id: [INVALID_OBJECT; 8]
    }
  }

  /// Extracts the scalar hit point in lane `i`
  pub fn lane( &self, i : usize ) -> HitPoint {
    HitPoint {
      distance:      self.distance.lane( i )
    , u:             self.u.lane( i )
    , v:             self.v.lane( i )
    , object_id:     self.object_id[ i ]
    , sub_object_id: self.sub_object_id[ i ]
    }
  }
}

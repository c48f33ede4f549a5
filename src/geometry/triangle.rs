// Local imports
use crate::geometry::ray::{Ray, Ray8};
use crate::math::{Bool8, Float8, Vec3, Vec3x8};

/// Epsilon on the Möller-Trumbore determinant; rejects edge-on rays
const DET_EPSILON : f32 = 1.0e-7;

/// A triangle preprocessed for intersection: one vertex plus the two edges
/// leaving it. Computed once per mesh, never touched afterwards
#[derive(Copy,Clone,Debug)]
pub struct ProcessedTriangle {
  pub v0    : Vec3,
  pub edge1 : Vec3,
  pub edge2 : Vec3
}

impl ProcessedTriangle {
  pub fn new( v0 : Vec3, v1 : Vec3, v2 : Vec3 ) -> ProcessedTriangle {
    ProcessedTriangle { v0, edge1: v1 - v0, edge2: v2 - v0 }
  }

  pub fn aabb( &self ) -> crate::geometry::Aabb {
    crate::geometry::Aabb::from_points( self.v0, self.v0 + self.edge1, self.v0 + self.edge2 )
  }
}

/// One triangle broadcast across 8 lanes, for intersecting against a ray group
#[derive(Copy,Clone)]
pub struct Triangle8 {
  pub v0    : Vec3x8,
  pub edge1 : Vec3x8,
  pub edge2 : Vec3x8
}

impl Triangle8 {
  pub fn splat( tri : &ProcessedTriangle ) -> Triangle8 {
    Triangle8 {
      v0:    Vec3x8::splat( tri.v0 )
    , edge1: Vec3x8::splat( tri.edge1 )
    , edge2: Vec3x8::splat( tri.edge2 )
    }
  }
}

/// Möller-Trumbore ray/triangle intersection
///
/// Accepts barycentrics in [0,1] with `u + v <= 1` and strictly positive
/// distance. Returns `(distance, u, v)` on a hit
pub fn intersect_triangle( ray : &Ray, tri : &ProcessedTriangle ) -> Option< (f32, f32, f32) > {
  let pvec = ray.dir.cross( tri.edge2 );
  let det  = tri.edge1.dot( pvec );

  if det.abs( ) < DET_EPSILON {
    // Edge-on: the ray is (nearly) parallel to the triangle plane
    return None;
  }

  let inv_det = 1.0 / det;
  let tvec = ray.origin - tri.v0;
  let u = tvec.dot( pvec ) * inv_det;
  if u < 0.0 || u > 1.0 {
    return None;
  }

  let qvec = tvec.cross( tri.edge1 );
  let v = ray.dir.dot( qvec ) * inv_det;
  if v < 0.0 || u + v > 1.0 {
    return None;
  }

  let t = tri.edge2.dot( qvec ) * inv_det;
  if t > 0.0 {
    Some( (t, u, v) )
  } else {
    None
  }
}

/// Intersects 8 rays with one triangle at once.
///
/// Lanes only pass when their hit is closer than the corresponding
/// `max_distances` entry. Returns the pass mask and per-lane `(t, u, v)`
pub fn intersect_triangle8(
      ray           : &Ray8
    , tri           : &Triangle8
    , max_distances : Float8
    ) -> (Bool8, Float8, Float8, Float8) {
  let zero = Float8::ZERO;
  let one  = Float8::ONE;

  let pvec = ray.dir.cross( tri.edge2 );
  let det  = tri.edge1.dot( pvec );
  let inv_det = one / det;

  let tvec = ray.origin - tri.v0;
  let u = tvec.dot( pvec ) * inv_det;

  let qvec = tvec.cross( tri.edge1 );
  let v = ray.dir.dot( qvec ) * inv_det;

  let t = tri.edge2.dot( qvec ) * inv_det;

  let mask = det.abs( ).gt( Float8::splat( DET_EPSILON ) )
    .and( u.ge( zero ) )
    .and( u.le( one ) )
    .and( v.ge( zero ) )
    .and( ( u + v ).le( one ) )
    .and( t.gt( zero ) )
    .and( t.lt( max_distances ) );

  (mask, t, u, v)
}

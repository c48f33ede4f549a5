// External imports
use std::sync::Arc;
// Local imports
use crate::geometry::{Aabb, Ray, Ray8};
use crate::lights::Light;
use crate::material::Material;
use crate::math::{Float8, Quat, Vec2, Vec3, Vec3x8};
use crate::mesh::Mesh;

/// The geometry carried by a scene object
pub enum Shape {
  Mesh( Arc< Mesh > ),
  Sphere { radius : f32, material : Arc< Material > },
  Box { half_size : Vec3, material : Arc< Material > },
  /// The surface of an area light, referencing the scene's light list.
  /// Light objects live in world space; their transform must stay identity
  Light( u32 )
}

/// One object of the scene: a shape, a rigid placement, and its motion
/// over the frame (for motion blur)
///
/// The world transform at time `t` interpolates the placement linearly
/// (translation) and spherically (rotation) toward where one frame of
/// velocity would carry it
pub struct SceneObject {
  pub shape            : Shape,
  pub position         : Vec3,
  pub rotation         : Quat,
  /// Translation over one frame
  pub linear_velocity  : Vec3,
  /// Rotation over one frame
  pub angular_velocity : Quat
}

impl SceneObject {
  pub fn new( shape : Shape ) -> SceneObject {
    SceneObject {
      shape
    , position:         Vec3::ZERO
    , rotation:         Quat::IDENTITY
    , linear_velocity:  Vec3::ZERO
    , angular_velocity: Quat::IDENTITY
    }
  }

  pub fn with_position( mut self, position : Vec3 ) -> SceneObject {
    self.position = position;
    self
  }

  pub fn with_rotation( mut self, rotation : Quat ) -> SceneObject {
    self.rotation = rotation;
    self
  }

  pub fn with_velocity( mut self, linear : Vec3, angular : Quat ) -> SceneObject {
    self.linear_velocity = linear;
    self.angular_velocity = angular;
    self
  }

  pub fn position_at( &self, time : f32 ) -> Vec3 {
    self.position + self.linear_velocity * time
  }

  pub fn rotation_at( &self, time : f32 ) -> Quat {
    self.rotation.slerp( self.angular_velocity.mul( self.rotation ), time )
  }

  /// The object's bounds in its local space (world space for light shapes)
  pub fn local_aabb( &self, lights : &[Light] ) -> Aabb {
    match &self.shape {
      Shape::Mesh( mesh ) => *mesh.bounding_box( ),
      Shape::Sphere { radius, .. } => {
        Aabb::new( Vec3::splat( -radius ), Vec3::splat( *radius ) )
      },
      Shape::Box { half_size, .. } => Aabb::new( -*half_size, *half_size ),
      Shape::Light( index ) => lights[ *index as usize ].bounding_box( )
    }
  }

  /// World bounds covering the whole frame: the union of the placement at
  /// time 0 and time 1, so moving objects stay inside their BVH node
  pub fn world_aabb( &self, lights : &[Light] ) -> Aabb {
    let local = self.local_aabb( lights );
    if let Shape::Light( _ ) = self.shape {
      return local;
    }

    let mut world = Aabb::empty( );
    for &time in &[ 0.0, 1.0 ] {
      let rotation = self.rotation_at( time );
      let position = self.position_at( time );
      for i in 0..8 {
        let corner = Vec3::new(
          if i & 1 == 0 { local.min.x } else { local.max.x }
        , if i & 2 == 0 { local.min.y } else { local.max.y }
        , if i & 4 == 0 { local.min.z } else { local.max.z }
        );
        world = world.include( rotation.rotate( corner ) + position );
      }
    }
    world
  }

  /// Transforms a world-space ray into the object's local space at `time`.
  /// The transform is rigid, so distances along the ray are preserved
  pub fn ray_to_local( &self, ray : &Ray, time : f32 ) -> Ray {
    let inv_rotation = self.rotation_at( time ).conjugate( );
    let origin = inv_rotation.rotate( ray.origin - self.position_at( time ) );
    let dir = inv_rotation.rotate( ray.dir );
    Ray::new( origin, dir )
  }

  /// SoA variant of `ray_to_local(..)` for 8 rays at once
  pub fn ray8_to_local( &self, ray : &Ray8, time : f32 ) -> Ray8 {
    let inv_rotation = self.rotation_at( time ).conjugate( );
    let position = self.position_at( time );

    // Rows of the world-to-local rotation matrix
    let bx = inv_rotation.rotate( Vec3::new( 1.0, 0.0, 0.0 ) );
    let by = inv_rotation.rotate( Vec3::new( 0.0, 1.0, 0.0 ) );
    let bz = inv_rotation.rotate( Vec3::new( 0.0, 0.0, 1.0 ) );

    let rotate = | v : Vec3x8 | Vec3x8::new(
      v.x * Float8::splat( bx.x ) + v.y * Float8::splat( by.x ) + v.z * Float8::splat( bz.x )
    , v.x * Float8::splat( bx.y ) + v.y * Float8::splat( by.y ) + v.z * Float8::splat( bz.y )
    , v.x * Float8::splat( bx.z ) + v.y * Float8::splat( by.z ) + v.z * Float8::splat( bz.z )
    );

    let origin = rotate( ray.origin - Vec3x8::splat( position ) );
    let dir = rotate( ray.dir );
    Ray8::new( origin, dir )
  }

  /// Rotates a local-space direction back into world space
  pub fn dir_to_world( &self, dir : Vec3, time : f32 ) -> Vec3 {
    self.rotation_at( time ).rotate( dir )
  }

  /// Transforms a world-space point into the object's local space
  pub fn point_to_local( &self, point : Vec3, time : f32 ) -> Vec3 {
    self
      .rotation_at( time )
      .conjugate( )
      .rotate( point - self.position_at( time ) )
  }
}

/// Local-space sphere intersection; the sphere sits at the origin
pub fn intersect_sphere( ray : &Ray, radius : f32 ) -> Option< f32 > {
  let b = ray.dir.dot( ray.origin );
  let c = ray.origin.len_sq( ) - radius * radius;
  let disc = b * b - c;
  if disc < 0.0 {
    return None;
  }

  let s = disc.sqrt( );
  let t0 = -b - s;
  if t0 > 0.0 {
    return Some( t0 );
  }
  let t1 = -b + s;
  if t1 > 0.0 {
    return Some( t1 );
  }
  None
}

/// Local-space box intersection. Unlike the BVH slab test this reports the
/// surface: the exit face when the ray starts inside
pub fn intersect_box( ray : &Ray, half_size : Vec3 ) -> Option< f32 > {
  let t1x = ( -half_size.x - ray.origin.x ) * ray.inv_dir.x;
  let t2x = ( half_size.x - ray.origin.x ) * ray.inv_dir.x;
  let t1y = ( -half_size.y - ray.origin.y ) * ray.inv_dir.y;
  let t2y = ( half_size.y - ray.origin.y ) * ray.inv_dir.y;
  let t1z = ( -half_size.z - ray.origin.z ) * ray.inv_dir.z;
  let t2z = ( half_size.z - ray.origin.z ) * ray.inv_dir.z;

  let tmin = t1x.min( t2x ).max( t1y.min( t2y ) ).max( t1z.min( t2z ) );
  let tmax = t1x.max( t2x ).min( t1y.max( t2y ) ).min( t1z.max( t2z ) );

  if tmin > tmax || tmax <= 0.0 {
    None
  } else if tmin > 0.0 {
    Some( tmin )
  } else {
    Some( tmax )
  }
}

/// Outward normal of a local-space box surface point
pub fn box_normal( point : Vec3, half_size : Vec3 ) -> Vec3 {
  let rx = ( point.x / half_size.x ).abs( );
  let ry = ( point.y / half_size.y ).abs( );
  let rz = ( point.z / half_size.z ).abs( );

  if rx >= ry && rx >= rz {
    Vec3::new( point.x.signum( ), 0.0, 0.0 )
  } else if ry >= rz {
    Vec3::new( 0.0, point.y.signum( ), 0.0 )
  } else {
    Vec3::new( 0.0, 0.0, point.z.signum( ) )
  }
}

/// Spherical texture coordinates of a local-space unit direction
pub fn sphere_uv( n : Vec3 ) -> Vec2 {
  let phi = n.z.atan2( n.x );
  let theta = n.y.asin( );
  Vec2::new(
    0.5 + phi / ( 2.0 * std::f32::consts::PI )
  , 0.5 + theta / std::f32::consts::PI
  )
}

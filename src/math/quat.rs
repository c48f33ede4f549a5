// Local imports
use crate::math::Vec3;

/// A unit quaternion, representing a rotation in 3-dimensional space
#[derive(Copy,Clone,Debug)]
pub struct Quat {
  pub x : f32,
  pub y : f32,
  pub z : f32,
  pub w : f32
}

impl Quat {
  pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

  pub fn new( x : f32, y : f32, z : f32, w : f32 ) -> Quat {
    Quat { x, y, z, w }
  }

  /// Constructs the rotation of `angle` radians around the (unit) `axis`
  pub fn from_axis_angle( axis : Vec3, angle : f32 ) -> Quat {
    let half = 0.5 * angle;
    let s = half.sin( );
    Quat::new( axis.x * s, axis.y * s, axis.z * s, half.cos( ) )
  }

  pub fn dot( self, o : Quat ) -> f32 {
    self.x * o.x + self.y * o.y + self.z * o.z + self.w * o.w
  }

  pub fn normalize( self ) -> Quat {
    let len = self.dot( self ).sqrt( );
    Quat::new( self.x / len, self.y / len, self.z / len, self.w / len )
  }

  /// Composes two rotations. `self` is applied *after* `o`
  pub fn mul( self, o : Quat ) -> Quat {
    Quat::new(
      self.w * o.x + self.x * o.w + self.y * o.z - self.z * o.y
    , self.w * o.y - self.x * o.z + self.y * o.w + self.z * o.x
    , self.w * o.z + self.x * o.y - self.y * o.x + self.z * o.w
    , self.w * o.w - self.x * o.x - self.y * o.y - self.z * o.z
    )
  }

  pub fn conjugate( self ) -> Quat {
    Quat::new( -self.x, -self.y, -self.z, self.w )
  }

  /// Rotates the vector by this quaternion
  pub fn rotate( self, v : Vec3 ) -> Vec3 {
    // v + 2 * q_v x (q_v x v + w * v)
    let qv = Vec3::new( self.x, self.y, self.z );
    let t = qv.cross( v ) * 2.0;
    v + t * self.w + qv.cross( t )
  }

  /// Spherical linear interpolation from `self` (t = 0) to `o` (t = 1)
  ///
  /// Falls back to normalized linear interpolation when the rotations are
  /// nearly identical, where the slerp formula is numerically unstable.
  pub fn slerp( self, o : Quat, t : f32 ) -> Quat {
    let mut cos_half = self.dot( o );
    // Take the short way around
    let o = if cos_half < 0.0 { cos_half = -cos_half; Quat::new( -o.x, -o.y, -o.z, -o.w ) } else { o };

    if cos_half > 0.9995 {
      return Quat::new(
        self.x + ( o.x - self.x ) * t
      , self.y + ( o.y - self.y ) * t
      , self.z + ( o.z - self.z ) * t
      , self.w + ( o.w - self.w ) * t
      ).normalize( );
    }

    let half = cos_half.acos( );
    let sin_half = half.sin( );
    let wa = ( ( 1.0 - t ) * half ).sin( ) / sin_half;
    let wb = ( t * half ).sin( ) / sin_half;
    Quat::new(
      self.x * wa + o.x * wb
    , self.y * wa + o.y * wb
    , self.z * wa + o.z * wb
    , self.w * wa + o.w * wb
    )
  }
}

#[cfg(test)]
mod tests {
  use super::Quat;
  use crate::math::Vec3;
  use approx::assert_relative_eq;
  use std::f32::consts::PI;

  #[test]
  fn rotate_quarter_turn( ) {
    let q = Quat::from_axis_angle( Vec3::new( 0.0, 1.0, 0.0 ), 0.5 * PI );
    let v = q.rotate( Vec3::new( 1.0, 0.0, 0.0 ) );
    assert_relative_eq!( v.x, 0.0, epsilon = 1.0e-6 );
    assert_relative_eq!( v.z, -1.0, epsilon = 1.0e-6 );
  }

  #[test]
  fn slerp_halfway( ) {
    let a = Quat::IDENTITY;
    let b = Quat::from_axis_angle( Vec3::new( 0.0, 0.0, 1.0 ), PI );
    let h = a.slerp( b, 0.5 );
    let v = h.rotate( Vec3::new( 1.0, 0.0, 0.0 ) );
    assert!( ( v.y - 1.0 ).abs( ) < 1.0e-5 );
  }

  #[test]
  fn slerp_endpoints( ) {
    let a = Quat::from_axis_angle( Vec3::new( 1.0, 0.0, 0.0 ), 0.3 );
    let b = Quat::from_axis_angle( Vec3::new( 0.0, 1.0, 0.0 ), 1.2 );
    let s0 = a.slerp( b, 0.0 );
    let s1 = a.slerp( b, 1.0 );
    assert!( ( s0.dot( a ).abs( ) - 1.0 ).abs( ) < 1.0e-5 );
    assert!( ( s1.dot( b ).abs( ) - 1.0 ).abs( ) < 1.0e-5 );
  }
}

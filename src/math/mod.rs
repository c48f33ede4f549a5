mod quat;
mod vec2;
mod vec3;
mod vec8;

pub use quat::Quat;
pub use vec2::Vec2;
pub use vec3::Vec3;
pub use vec8::{Bool8, Float8, Vec3x8};

// Some arbitrary math utilities

/// Offset applied to secondary-ray origins, to avoid self-intersection
pub static EPSILON : f32 = 0.0002;

pub fn clamp( x : f32, min_val : f32, max_val : f32 ) -> f32 {
  max_val.min( min_val.max( x ) )
}

/// Linearly interpolates between `a` and `b`
pub fn lerp( a : f32, b : f32, t : f32 ) -> f32 {
  a + ( b - a ) * t
}

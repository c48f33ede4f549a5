// Local imports
use crate::math::{Float8, Vec2, Vec3};

/// A XOR-shift pseudo-random number generator
///
/// Every worker thread owns one instance, seeded from its thread index, so
/// renders are deterministic for a fixed thread count. The distribution
/// quality of xorshift is plenty for Monte-Carlo sampling, and it keeps the
/// hot path free of external state.
#[derive(Clone)]
pub struct Rng {
  state : u32
}

impl Rng {
  pub fn new( seed : u32 ) -> Rng {
    // A zero state would make the generator emit zeroes forever
    Rng { state: seed ^ 0xBABA_BEBE | 1 }
  }

  fn next_u32( &mut self ) -> u32 {
    let mut x = self.state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    self.state = x;
    x
  }

  /// Uniformly generates a f32 in the range [0,1)
  pub fn next( &mut self ) -> f32 {
    // Use the top 24 bits; all values stay strictly below 1
    ( self.next_u32( ) >> 8 ) as f32 * ( 1.0 / 16_777_216.0 )
  }

  /// Returns a random element in the range [low, high)
  pub fn next_in_range( &mut self, low : usize, high : usize ) -> usize {
    debug_assert!( low < high );
    low + ( self.next( ) * ( high - low ) as f32 ) as usize
  }

  /// Two independent samples from the standard normal distribution
  ///
  /// Box-Muller transform. Used for anti-aliasing jitter
  pub fn next_gaussian2( &mut self ) -> Vec2 {
    let u1 = ( 1.0 - self.next( ) ).max( 1.0e-7 );
    let u2 = self.next( );
    let r = ( -2.0 * u1.ln( ) ).sqrt( );
    let theta = 2.0 * std::f32::consts::PI * u2;
    Vec2::new( r * theta.cos( ), r * theta.sin( ) )
  }

  /// 8 uniform samples in [0,1), one per lane
  pub fn next_float8( &mut self ) -> Float8 {
    let mut vs = [0.0; 8];
    for i in 0..8 {
      vs[ i ] = self.next( );
    }
    Float8::new( vs )
  }

  /// A uniform point on the unit disc (for lens sampling)
  pub fn next_disc( &mut self ) -> Vec2 {
    let r = self.next( ).sqrt( );
    let theta = 2.0 * std::f32::consts::PI * self.next( );
    Vec2::new( r * theta.cos( ), r * theta.sin( ) )
  }

  /// A cosine-weighted direction on the upper hemisphere, in a local frame
  /// where z points along the surface normal
  pub fn next_hemisphere_cos( &mut self ) -> Vec3 {
    let d = self.next_disc( );
    let z = ( 1.0 - d.x * d.x - d.y * d.y ).max( 0.0 ).sqrt( );
    Vec3::new( d.x, d.y, z )
  }
}

#[cfg(test)]
mod tests {
  use super::Rng;

  #[test]
  fn next_stays_in_unit_range( ) {
    let mut rng = Rng::new( 17 );
    for _i in 0..10_000 {
      let v = rng.next( );
      assert!( v >= 0.0 && v < 1.0 );
    }
  }

  #[test]
  fn seeds_produce_distinct_streams( ) {
    let mut a = Rng::new( 1 );
    let mut b = Rng::new( 2 );
    let va : Vec< f32 > = ( 0..8 ).map( |_| a.next( ) ).collect( );
    let vb : Vec< f32 > = ( 0..8 ).map( |_| b.next( ) ).collect( );
    assert_ne!( va, vb );
  }

  #[test]
  fn hemisphere_samples_are_upward_unit_vectors( ) {
    let mut rng = Rng::new( 5 );
    for _i in 0..1_000 {
      let d = rng.next_hemisphere_cos( );
      assert!( d.z >= 0.0 );
      assert!( ( d.len( ) - 1.0 ).abs( ) < 1.0e-5 );
    }
  }
}

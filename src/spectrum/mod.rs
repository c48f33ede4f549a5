// External imports
use std::ops;
// Local imports
use crate::math::{Float8, Vec3};
use crate::rng::Rng;

// The spectral color carrier.
//
// A radiance sample is tracked at 8 wavelengths at once (hero wavelength
// sampling). The wavelengths are stored in normalized form: 0 maps to 380 nm
// and 1 maps to 720 nm. A dispersive scattering event collapses the sample
// to the hero wavelength only (lane 0), which is flagged with `is_single`.

/// Shortest wavelength considered, in meters (violet)
pub const LOWER_WAVELENGTH : f32 = 380.0e-9;
/// Longest wavelength considered, in meters (red)
pub const HIGHER_WAVELENGTH : f32 = 720.0e-9;
/// Number of wavelengths tracked per radiance sample
pub const NUM_COMPONENTS : usize = 8;

/// The wavelengths a radiance sample is evaluated at, normalized to [0,1)
#[derive(Copy,Clone)]
pub struct Wavelength {
  pub value     : Float8,
  /// Set when a dispersive event collapsed the sample to the hero wavelength
  pub is_single : bool
}

impl Wavelength {
  /// Picks a fresh hero wavelength, with the remaining 7 lanes rotated
  /// evenly across the visible range (stratified sampling)
  pub fn randomize( rng : &mut Rng ) -> Wavelength {
    let hero = rng.next( );
    let mut vs = [0.0; NUM_COMPONENTS];
    for i in 0..NUM_COMPONENTS {
      let v = hero + i as f32 / NUM_COMPONENTS as f32;
      vs[ i ] = if v >= 1.0 { v - 1.0 } else { v };
    }
    Wavelength { value: Float8::new( vs ), is_single: false }
  }

  /// The hero wavelength, normalized to [0,1)
  pub fn base( &self ) -> f32 {
    self.value.lane( 0 )
  }

  /// The hero wavelength in micrometers (as used by the Sellmeier equation)
  pub fn base_micrometers( &self ) -> f32 {
    ( LOWER_WAVELENGTH + self.base( ) * ( HIGHER_WAVELENGTH - LOWER_WAVELENGTH ) ) * 1.0e+6
  }
}

/// A ray color/weight during raytracing; one value per tracked wavelength
#[derive(Copy,Clone,Debug)]
pub struct Spectrum {
  pub value : Float8
}

/// The RGB band a normalized wavelength falls into (2 = red, 1 = green, 0 = blue)
fn band_of( t : f32 ) -> usize {
  if t < 1.0 / 3.0 {
    0
  } else if t < 2.0 / 3.0 {
    1
  } else {
    2
  }
}

impl Spectrum {
  pub fn zero( ) -> Spectrum {
    Spectrum { value: Float8::ZERO }
  }

  pub fn one( ) -> Spectrum {
    Spectrum { value: Float8::ONE }
  }

  /// The weight a path carries after a dispersive event collapsed it to a
  /// single wavelength. The magnitude 8 compensates for the 7 dropped lanes
  pub fn single_wavelength_fallback( ) -> Spectrum {
    Spectrum { value: Float8::new( [ 8.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0 ] ) }
  }

  /// Evaluates an RGB color at the sample's wavelengths
  ///
  /// The RGB channels are treated as rectangular spectra over thirds of the
  /// visible range, which makes the conversion to RGB (see `to_rgb(..)`)
  /// exact for band-constant spectra.
  pub fn sample_rgb( wavelength : &Wavelength, rgb : Vec3 ) -> Spectrum {
    let ts = wavelength.value.to_array( );
    let mut vs = [0.0; NUM_COMPONENTS];
    for i in 0..NUM_COMPONENTS {
      vs[ i ] = match band_of( ts[ i ] ) {
        0 => rgb.z,
        1 => rgb.y,
        _ => rgb.x
      };
    }
    Spectrum { value: Float8::new( vs ) }
  }

  /// Resolves the spectral sample back to RGB, averaging the lanes that fall
  /// into each band
  pub fn to_rgb( &self, wavelength : &Wavelength ) -> Vec3 {
    let ts = wavelength.value.to_array( );
    let vs = self.value.to_array( );
    let mut sums   = [0.0_f32; 3];
    let mut counts = [0_u32; 3];
    for i in 0..NUM_COMPONENTS {
      let b = band_of( ts[ i ] );
      sums[ b ] += vs[ i ];
      counts[ b ] += 1;
    }
    let avg = | b : usize | if counts[ b ] > 0 { sums[ b ] / counts[ b ] as f32 } else { 0.0 };
    Vec3::new( avg( 2 ), avg( 1 ), avg( 0 ) )
  }

  pub fn almost_zero( &self ) -> bool {
    self.value.abs( ).horizontal_max( ) < 1.0e-8
  }

  /// The largest value across the tracked wavelengths
  pub fn max_value( &self ) -> f32 {
    self.value.horizontal_max( )
  }

  /// True if no value is negative or NaN
  pub fn validate( &self ) -> bool {
    self.value.ge( Float8::ZERO ).all( )
  }
}

impl ops::Add< Spectrum > for Spectrum {
  type Output = Spectrum;

  fn add( self, addend: Spectrum ) -> Spectrum {
    Spectrum { value: self.value + addend.value }
  }
}

impl ops::AddAssign< Spectrum > for Spectrum {
  fn add_assign( &mut self, v : Spectrum ) {
    self.value += v.value;
  }
}

impl ops::Mul< Spectrum > for Spectrum {
  type Output = Spectrum;

  fn mul( self, multiplier: Spectrum ) -> Spectrum {
    Spectrum { value: self.value * multiplier.value }
  }
}

impl ops::MulAssign< Spectrum > for Spectrum {
  fn mul_assign( &mut self, v : Spectrum ) {
    self.value *= v.value;
  }
}

impl ops::Mul< f32 > for Spectrum {
  type Output = Spectrum;

  fn mul( self, multiplier: f32 ) -> Spectrum {
    Spectrum { value: self.value * multiplier }
  }
}

#[cfg(test)]
mod tests {
  use super::{Spectrum, Wavelength};
  use crate::math::Vec3;
  use crate::rng::Rng;

  #[test]
  fn rgb_roundtrip_is_exact_for_primaries( ) {
    let mut rng = Rng::new( 3 );
    for _i in 0..100 {
      let wl = Wavelength::randomize( &mut rng );
      for &c in &[ Vec3::new( 100.0, 0.0, 0.0 )
                 , Vec3::new( 0.0, 1.0, 0.0 )
                 , Vec3::new( 0.25, 0.5, 0.75 ) ] {
        let s = Spectrum::sample_rgb( &wl, c );
        let rgb = s.to_rgb( &wl );
        assert!( ( rgb.x - c.x ).abs( ) < 1.0e-4 );
        assert!( ( rgb.y - c.y ).abs( ) < 1.0e-4 );
        assert!( ( rgb.z - c.z ).abs( ) < 1.0e-4 );
      }
    }
  }

  #[test]
  fn validate_rejects_negative_and_nan( ) {
    let mut rng = Rng::new( 7 );
    let wl = Wavelength::randomize( &mut rng );
    let ok = Spectrum::sample_rgb( &wl, Vec3::new( 0.5, 0.5, 0.5 ) );
    assert!( ok.validate( ) );
    let neg = Spectrum::sample_rgb( &wl, Vec3::new( -1.0, 0.0, 0.0 ) );
    assert!( !neg.validate( ) );
    let nan = Spectrum::sample_rgb( &wl, Vec3::new( f32::NAN, 0.0, 0.0 ) );
    assert!( !nan.validate( ) );
  }

  #[test]
  fn wavelengths_are_stratified( ) {
    let mut rng = Rng::new( 11 );
    let wl = Wavelength::randomize( &mut rng );
    let ts = wl.value.to_array( );
    for i in 0..8 {
      assert!( ts[ i ] >= 0.0 && ts[ i ] < 1.0 );
    }
    // every band sees at least 2 of the 8 stratified lanes
    let mut counts = [0; 3];
    for i in 0..8 {
      counts[ super::band_of( ts[ i ] ) ] += 1;
    }
    assert!( counts.iter( ).all( |&c| c >= 2 ) );
  }
}

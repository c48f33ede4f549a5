// Local imports
use crate::math::{clamp, Vec2, Vec3};

// The texture interface the core samples through. Decoding image files into
// one of these is the host's concern; the in-memory bitmap below is enough
// for tests and procedural content.

#[derive(Copy,Clone,PartialEq)]
pub enum AddressMode {
  Repeat,
  Clamp,
  Border
}

#[derive(Copy,Clone,PartialEq)]
pub enum FilterMode {
  Nearest,
  Bilinear
}

/// How a texture is addressed and filtered when sampled
#[derive(Copy,Clone)]
pub struct SamplerDesc {
  pub address_u          : AddressMode,
  pub address_v          : AddressMode,
  pub filter             : FilterMode,
  pub border_color       : Vec3,
  /// Skip the sRGB-to-linear conversion (for data textures, e.g. normal maps)
  pub force_linear_space : bool
}

impl Default for SamplerDesc {
  fn default( ) -> SamplerDesc {
    SamplerDesc {
      address_u:          AddressMode::Repeat
    , address_v:          AddressMode::Repeat
    , filter:             FilterMode::Bilinear
    , border_color:       Vec3::ZERO
    , force_linear_space: false
    }
  }
}

/// Anything the material system can sample colors from
pub trait Texture : Send + Sync {
  /// Evaluates the texture at `uv`; colors come back in linear space
  fn sample( &self, uv : Vec2, sampler : &SamplerDesc ) -> Vec3;
}

/// An RGB texture held in memory
pub struct BitmapTexture {
  data   : Vec< Vec3 >,
  width  : u32,
  height : u32,
  /// Whether the stored texels are sRGB-encoded and need decoding on sample
  srgb   : bool
}

/// Maps a coordinate in texel space onto [0, size), or None for border
fn address( x : i64, size : u32, mode : AddressMode ) -> Option< u32 > {
  let size = size as i64;
  match mode {
    AddressMode::Repeat => Some( ( ( x % size + size ) % size ) as u32 ),
    AddressMode::Clamp => Some( x.max( 0 ).min( size - 1 ) as u32 ),
    AddressMode::Border =>
      if x >= 0 && x < size {
        Some( x as u32 )
      } else {
        None
      }
  }
}

fn srgb_to_linear( c : f32 ) -> f32 {
  if c <= 0.04045 {
    c / 12.92
  } else {
    ( ( c + 0.055 ) / 1.055 ).powf( 2.4 )
  }
}

impl BitmapTexture {
  /// Wraps linear-space RGB data, laid out row by row
  pub fn new( data : Vec< Vec3 >, width : u32, height : u32 ) -> Option< BitmapTexture > {
    if width == 0 || height == 0 || data.len( ) != ( width * height ) as usize {
      return None;
    }
    Some( BitmapTexture { data, width, height, srgb: false } )
  }

  /// Wraps sRGB-encoded data; texels are decoded to linear space on sample
  pub fn new_srgb( data : Vec< Vec3 >, width : u32, height : u32 ) -> Option< BitmapTexture > {
    let mut tex = BitmapTexture::new( data, width, height )?;
    tex.srgb = true;
    Some( tex )
  }

  /// A uniform single-texel texture
  pub fn solid( color : Vec3 ) -> BitmapTexture {
    BitmapTexture { data: vec![ color ], width: 1, height: 1, srgb: false }
  }

  fn texel( &self, x : i64, y : i64, sampler : &SamplerDesc ) -> Vec3 {
    let ix = address( x, self.width, sampler.address_u );
    let iy = address( y, self.height, sampler.address_v );
    match (ix, iy) {
      (Some( ix ), Some( iy )) => self.data[ ( iy * self.width + ix ) as usize ],
      _ => sampler.border_color
    }
  }
}

impl Texture for BitmapTexture {
  fn sample( &self, uv : Vec2, sampler : &SamplerDesc ) -> Vec3 {
    let fx = uv.x * self.width as f32 - 0.5;
    let fy = uv.y * self.height as f32 - 0.5;

    let color = match sampler.filter {
      FilterMode::Nearest => {
        self.texel( fx.round( ) as i64, fy.round( ) as i64, sampler )
      },
      FilterMode::Bilinear => {
        let x0 = fx.floor( );
        let y0 = fy.floor( );
        let tx = clamp( fx - x0, 0.0, 1.0 );
        let ty = clamp( fy - y0, 0.0, 1.0 );
        let (x0, y0) = (x0 as i64, y0 as i64);

        let c00 = self.texel( x0, y0, sampler );
        let c10 = self.texel( x0 + 1, y0, sampler );
        let c01 = self.texel( x0, y0 + 1, sampler );
        let c11 = self.texel( x0 + 1, y0 + 1, sampler );

        let top = c00 * ( 1.0 - tx ) + c10 * tx;
        let bottom = c01 * ( 1.0 - tx ) + c11 * tx;
        top * ( 1.0 - ty ) + bottom * ty
      }
    };

    if self.srgb && !sampler.force_linear_space {
      decode_srgb( color )
    } else {
      color
    }
  }
}

/// Decodes an sRGB-encoded color to linear space
pub fn decode_srgb( c : Vec3 ) -> Vec3 {
  Vec3::new( srgb_to_linear( c.x ), srgb_to_linear( c.y ), srgb_to_linear( c.z ) )
}

#[cfg(test)]
mod tests {
  use super::{AddressMode, BitmapTexture, FilterMode, SamplerDesc, Texture};
  use crate::math::{Vec2, Vec3};

  fn checkerboard( ) -> BitmapTexture {
    BitmapTexture::new(
      vec![ Vec3::ZERO, Vec3::ONE, Vec3::ONE, Vec3::ZERO ]
    , 2
    , 2
    ).unwrap( )
  }

  #[test]
  fn zero_sized_bitmap_is_rejected( ) {
    assert!( BitmapTexture::new( Vec::new( ), 0, 4 ).is_none( ) );
    assert!( BitmapTexture::new( vec![ Vec3::ZERO ], 2, 2 ).is_none( ) );
  }

  #[test]
  fn nearest_sampling_picks_texels( ) {
    let tex = checkerboard( );
    let sampler = SamplerDesc { filter: FilterMode::Nearest, ..Default::default( ) };
    let c = tex.sample( Vec2::new( 0.25, 0.25 ), &sampler );
    assert_eq!( c, Vec3::ZERO );
    let c = tex.sample( Vec2::new( 0.75, 0.25 ), &sampler );
    assert_eq!( c, Vec3::ONE );
  }

  #[test]
  fn repeat_wraps_around( ) {
    let tex = checkerboard( );
    let sampler = SamplerDesc { filter: FilterMode::Nearest, ..Default::default( ) };
    let a = tex.sample( Vec2::new( 0.25, 0.25 ), &sampler );
    let b = tex.sample( Vec2::new( 1.25, -0.75 ), &sampler );
    assert_eq!( a, b );
  }

  #[test]
  fn border_returns_border_color( ) {
    let tex = checkerboard( );
    let sampler = SamplerDesc {
      filter:       FilterMode::Nearest
    , address_u:    AddressMode::Border
    , address_v:    AddressMode::Border
    , border_color: Vec3::new( 1.0, 0.0, 0.0 )
    , ..Default::default( )
    };
    let c = tex.sample( Vec2::new( 3.0, 0.5 ), &sampler );
    assert_eq!( c, Vec3::new( 1.0, 0.0, 0.0 ) );
  }
}

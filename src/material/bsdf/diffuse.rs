// External imports
use std::f32::consts::PI;
// Local imports
use crate::material::bsdf::COS_EPSILON;
use crate::math::Vec3;
use crate::rng::Rng;

/// Oren-Nayar diffuse reflection
///
/// Uses the improved qualitative model
/// (http://mimosa-pudica.net/improved-oren-nayar.html); a roughness of zero
/// degenerates to plain Lambertian. Importance-sampled as cosine-weighted
/// over the upper hemisphere
#[derive(Copy,Clone,Debug)]
pub struct OrenNayarBsdf {
  a : f32,
  b : f32
}

impl OrenNayarBsdf {
  pub fn new( roughness : f32 ) -> OrenNayarBsdf {
    let s2 = roughness * roughness;
    OrenNayarBsdf {
      a: 1.0 - 0.5 * s2 / ( 0.33 + s2 )
    , b: 0.45 * s2 / ( 0.09 + s2 )
    }
  }

  /// The view-dependent roughness factor; 1 for zero roughness
  fn factor( &self, wo : Vec3, wi : Vec3 ) -> f32 {
    let n_dot_v = wo.z;
    let n_dot_l = wi.z;
    let l_dot_v = wi.dot( wo ).max( 0.0 );

    let s = l_dot_v - n_dot_l * n_dot_v;
    let st_inv = if s > 0.0 { s / n_dot_l.max( n_dot_v ) } else { 0.0 };

    ( self.a + self.b * st_inv ).max( 0.0 )
  }

  /// Draws an incoming direction; returns `(incoming, weight, pdf)`.
  /// The weight excludes the base color, which the material applies
  pub fn sample( &self, wo : Vec3, rng : &mut Rng ) -> Option< (Vec3, f32, f32) > {
    if wo.z < COS_EPSILON {
      return None;
    }

    let wi = rng.next_hemisphere_cos( );
    if wi.z < COS_EPSILON {
      return None;
    }

    let pdf = wi.z / PI;
    // Cosine-weighted sampling cancels the cos/pi; the Oren-Nayar factor
    // remains
    let weight = self.factor( wo, wi ) * pdf;
    Some( (wi, weight, pdf) )
  }

  /// The reflected fraction toward `wi` (cosine included) and its
  /// sampling PDF. Base color excluded, as with `sample(..)`
  pub fn evaluate( &self, wo : Vec3, wi : Vec3 ) -> (f32, f32) {
    if wo.z < COS_EPSILON || wi.z < COS_EPSILON {
      return (0.0, 0.0);
    }

    let pdf = wi.z / PI;
    ( self.factor( wo, wi ) * wi.z / PI, pdf )
  }
}

#[cfg(test)]
mod tests {
  use super::OrenNayarBsdf;
  use crate::math::Vec3;
  use crate::rng::Rng;
  use std::f32::consts::PI;

  #[test]
  fn zero_roughness_is_lambertian( ) {
    let bsdf = OrenNayarBsdf::new( 0.0 );
    let wo = Vec3::new( 0.3, 0.1, 0.9 ).normalize( );
    let wi = Vec3::new( -0.2, 0.4, 0.8 ).normalize( );
    let (value, pdf) = bsdf.evaluate( wo, wi );
    assert!( ( value - wi.z / PI ).abs( ) < 1.0e-6 );
    assert!( ( pdf - wi.z / PI ).abs( ) < 1.0e-6 );
  }

  #[test]
  fn sample_weight_matches_evaluate( ) {
    let bsdf = OrenNayarBsdf::new( 0.5 );
    let wo = Vec3::new( 0.2, -0.3, 0.93 ).normalize( );
    let mut rng = Rng::new( 21 );
    for _i in 0..1_000 {
      if let Some( (wi, weight, pdf) ) = bsdf.sample( wo, &mut rng ) {
        let (value, eval_pdf) = bsdf.evaluate( wo, wi );
        assert!( ( value - weight ).abs( ) < 1.0e-5 );
        assert!( ( pdf - eval_pdf ).abs( ) < 1.0e-6 );
      }
    }
  }

  #[test]
  fn grazing_outgoing_is_rejected( ) {
    let bsdf = OrenNayarBsdf::new( 0.2 );
    let mut rng = Rng::new( 22 );
    assert!( bsdf.sample( Vec3::new( 1.0, 0.0, 0.0 ), &mut rng ).is_none( ) );
  }
}

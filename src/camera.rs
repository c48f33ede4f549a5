// Local imports
use crate::geometry::{Ray, Ray8};
use crate::math::{Float8, Vec2, Vec3, Vec3x8};
use crate::rng::Rng;

/// The scene camera: a thin lens with optional barrel distortion
///
/// It first rotates around the x-axis, then around the y-axis, then it
/// translates. A zero aperture radius gives a pinhole camera
pub struct Camera {
  pub position          : Vec3,
  pub rot_x             : f32,
  pub rot_y             : f32,
  /// Vertical field of view, in radians
  pub fov               : f32,
  /// Radius of the lens opening; 0 disables depth of field
  pub aperture_radius   : f32,
  /// Distance to the plane of perfect focus
  pub focus_distance    : f32,
  /// First-order radial distortion coefficient; 0 keeps straight lines
  pub barrel_distortion : f32
}

impl Camera {
  pub fn new( position : Vec3, rot_x : f32, rot_y : f32 ) -> Camera {
    Camera {
      position
    , rot_x
    , rot_y
    , fov:               60.0_f32.to_radians( )
    , aperture_radius:   0.0
    , focus_distance:    5.0
    , barrel_distortion: 0.0
    }
  }

  pub fn with_fov( mut self, fov_radians : f32 ) -> Camera {
    self.fov = fov_radians;
    self
  }

  pub fn with_lens( mut self, aperture_radius : f32, focus_distance : f32 ) -> Camera {
    self.aperture_radius = aperture_radius;
    self.focus_distance = focus_distance;
    self
  }

  /// Distance from the eye to the (unit-height) image plane
  fn plane_distance( &self ) -> f32 {
    0.5 / ( 0.5 * self.fov ).tan( )
  }

  fn rotate( &self, v : Vec3 ) -> Vec3 {
    v.rot_x( self.rot_x ).rot_y( self.rot_y )
  }

  /// Generates the ray through the image plane at `ndc` (in (0,1)x(0,1),
  /// y pointing down). `aspect_ratio` is width over height
  pub fn generate_ray( &self, ndc : Vec2, aspect_ratio : f32, rng : &mut Rng ) -> Ray {
    let mut fx = ( ndc.x - 0.5 ) * aspect_ratio;
    let mut fy = 0.5 - ndc.y;

    if self.barrel_distortion != 0.0 {
      let r2 = fx * fx + fy * fy;
      let scale = 1.0 + self.barrel_distortion * r2;
      fx *= scale;
      fy *= scale;
    }

    let dir = self.rotate( Vec3::new( fx, fy, self.plane_distance( ) ).normalize( ) );

    if self.aperture_radius <= 0.0 {
      return Ray::new( self.position, dir );
    }

    // Thin lens: jitter the origin on the lens disc and aim at the point
    // of perfect focus
    let focus_point = self.position + dir * self.focus_distance;
    let disc = rng.next_disc( ) * self.aperture_radius;
    let right = self.rotate( Vec3::new( 1.0, 0.0, 0.0 ) );
    let up = self.rotate( Vec3::new( 0.0, 1.0, 0.0 ) );
    let origin = self.position + right * disc.x + up * disc.y;

    Ray::new( origin, ( focus_point - origin ).normalize( ) )
  }

  /// Generates 8 rays at once, one per lane of the ndc coordinates
  pub fn generate_ray8( &self
                      , ndc_x        : Float8
                      , ndc_y        : Float8
                      , aspect_ratio : f32
                      , rng          : &mut Rng
                      ) -> Ray8 {
    let xs = ndc_x.to_array( );
    let ys = ndc_y.to_array( );
    let mut origins = [Vec3::ZERO; 8];
    let mut dirs = [Vec3::ZERO; 8];
    for i in 0..8 {
      let ray = self.generate_ray( Vec2::new( xs[ i ], ys[ i ] ), aspect_ratio, rng );
      origins[ i ] = ray.origin;
      dirs[ i ] = ray.dir;
    }
    Ray8::new( Vec3x8::from_vecs( origins ), Vec3x8::from_vecs( dirs ) )
  }
}

#[cfg(test)]
mod tests {
  use super::Camera;
  use crate::math::{Vec2, Vec3};
  use crate::rng::Rng;

  #[test]
  fn center_ray_looks_forward( ) {
    let camera = Camera::new( Vec3::ZERO, 0.0, 0.0 );
    let mut rng = Rng::new( 50 );
    let ray = camera.generate_ray( Vec2::new( 0.5, 0.5 ), 1.0, &mut rng );
    assert!( ray.dir.z > 0.999 );
  }

  #[test]
  fn ndc_corners_diverge( ) {
    let camera = Camera::new( Vec3::ZERO, 0.0, 0.0 );
    let mut rng = Rng::new( 51 );
    let left = camera.generate_ray( Vec2::new( 0.0, 0.5 ), 1.0, &mut rng );
    let right = camera.generate_ray( Vec2::new( 1.0, 0.5 ), 1.0, &mut rng );
    assert!( left.dir.x < 0.0 );
    assert!( right.dir.x > 0.0 );
  }

  #[test]
  fn lens_rays_converge_at_the_focus_point( ) {
    let pinhole = Camera::new( Vec3::ZERO, 0.0, 0.0 );
    let camera = Camera::new( Vec3::ZERO, 0.0, 0.0 ).with_lens( 0.2, 4.0 );
    let mut rng = Rng::new( 52 );

    // Every lens sample of one image point passes through that point's
    // location on the plane of focus
    let ndc = Vec2::new( 0.3, 0.6 );
    let focus_point = pinhole.generate_ray( ndc, 1.0, &mut rng ).dir * 4.0;

    for _i in 0..16 {
      let ray = camera.generate_ray( ndc, 1.0, &mut rng );
      let to_focus = focus_point - ray.origin;
      let miss = ( to_focus - ray.dir * to_focus.dot( ray.dir ) ).len( );
      assert!( miss < 1.0e-4, "closest approach {}", miss );
    }
  }
}

// The three traversal modes must report identical hits for identical
// rays, across object transforms and shape kinds.

mod common;

use spectra::geometry::{HitPoint, HitPoint8, ImageLocation, Ray, Ray8, RayPacket};
use spectra::material::Material;
use spectra::math::{Quat, Vec3, Vec3x8};
use spectra::render::LocalCounters;
use spectra::rng::Rng;
use spectra::scene::{Scene, SceneObject, Shape};
use std::f32::consts::PI;
use std::sync::Arc;

fn test_scene( ) -> Scene {
  let soup = Arc::new( common::triangle_soup( 500, 11 ) );
  let gray = Arc::new( Material::diffuse( "gray", Vec3::splat( 0.5 ) ) );

  let objects = vec![
    SceneObject::new( Shape::Mesh( soup.clone( ) ) )
  , SceneObject::new( Shape::Mesh( soup ) )
      .with_position( Vec3::new( 7.0, 1.0, -2.0 ) )
      .with_rotation( Quat::from_axis_angle( Vec3::new( 0.0, 1.0, 0.0 ), 0.3 * PI ) )
  , SceneObject::new( Shape::Sphere { radius: 1.5, material: gray.clone( ) } )
      .with_position( Vec3::new( -6.0, 0.0, 0.0 ) )
  , SceneObject::new( Shape::Box { half_size: Vec3::new( 1.0, 2.0, 0.5 ), material: gray } )
      .with_position( Vec3::new( 0.0, -5.0, 1.0 ) )
      .with_rotation( Quat::from_axis_angle( Vec3::new( 1.0, 0.0, 0.0 ), 0.2 ) )
  ];

  Scene::build( objects, Vec::new( ), None )
}

fn random_dirs( rng : &mut Rng ) -> [Vec3; 8] {
  let mut dirs = [Vec3::ZERO; 8];
  for i in 0..8 {
    dirs[ i ] = Vec3::new(
      rng.next( ) - 0.5
    , rng.next( ) - 0.5
    , rng.next( ) - 0.5
    ).normalize( );
  }
  dirs
}

fn assert_hits_match( scalar : &HitPoint, wide : &HitPoint, label : &str ) {
  assert_eq!( scalar.is_hit( ), wide.distance != f32::MAX, "{}", label );
  if scalar.is_hit( ) {
    assert!( ( scalar.distance - wide.distance ).abs( ) <= 1.0e-4
           , "{}: {} vs {}", label, scalar.distance, wide.distance );
    // Indices agree except when two primitives tie within float tolerance,
    // which the distance check above already bounds
    if scalar.object_id == wide.object_id {
      assert_eq!( scalar.sub_object_id, wide.sub_object_id, "{}", label );
    }
  }
}

#[test]
fn simd8_matches_single_across_the_scene( ) {
  let scene = test_scene( );
  let mut rng = Rng::new( 21 );
  let mut counters = LocalCounters::new( );

  for _round in 0..60 {
    let origin = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 16.0 - Vec3::splat( 8.0 );
    let dirs = random_dirs( &mut rng );
    let ray8 = Ray8::new( Vec3x8::splat( origin ), Vec3x8::from_vecs( dirs ) );

    let mut hit8 = HitPoint8::no_hit( );
    scene.traverse_simd8( &ray8, &mut hit8, 0.0, &mut counters );

    for lane in 0..8 {
      let mut hit = HitPoint::no_hit( );
      scene.traverse_single( &Ray::new( origin, dirs[ lane ] ), &mut hit, 0.0, &mut counters );
      let wide = hit8.lane( lane );
      assert_hits_match( &hit, &wide, &format!( "lane {}", lane ) );
    }
  }
}

#[test]
fn packet_matches_single_across_the_scene( ) {
  let scene = test_scene( );
  let mut rng = Rng::new( 22 );
  let mut counters = LocalCounters::new( );

  // A packet of 32 groups = 256 rays
  let mut packet = RayPacket::new( );
  let mut all_rays = Vec::new( );
  for g in 0..32_u16 {
    let origin = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 16.0 - Vec3::splat( 8.0 );
    let dirs = random_dirs( &mut rng );
    for i in 0..8 {
      all_rays.push( Ray::new( origin, dirs[ i ] ) );
    }
    packet.push_rays(
      Ray8::new( Vec3x8::splat( origin ), Vec3x8::from_vecs( dirs ) )
    , Vec3x8::splat( Vec3::splat( 1.0 / 8.0 ) )
    , ImageLocation { x: g, y: 0 }
    );
  }

  let mut hits = vec![ HitPoint8::no_hit( ); packet.num_groups( ) ];
  let mut scratch = Vec::new( );
  scene.traverse_packet( &mut packet, &mut hits, &mut scratch, 0.0, &mut counters );

  for (i, ray) in all_rays.iter( ).enumerate( ) {
    let mut hit = HitPoint::no_hit( );
    scene.traverse_single( ray, &mut hit, 0.0, &mut counters );
    let wide = hits[ i / 8 ].lane( i % 8 );
    assert_hits_match( &hit, &wide, &format!( "ray {}", i ) );

    // The group's shrunken search interval agrees with the nearest hit
    let max_dist = packet.groups[ i / 8 ].max_distances.lane( i % 8 );
    if hit.is_hit( ) {
      assert!( ( max_dist - hit.distance ).abs( ) <= 1.0e-4 );
    }
  }
}

#[test]
fn shadow_rays_agree_with_nearest_hits( ) {
  let scene = test_scene( );
  let mut rng = Rng::new( 23 );
  let mut counters = LocalCounters::new( );

  for _round in 0..300 {
    let origin = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 16.0 - Vec3::splat( 8.0 );
    let dir = Vec3::new(
      rng.next( ) - 0.5
    , rng.next( ) - 0.5
    , rng.next( ) - 0.5
    ).normalize( );
    let ray = Ray::new( origin, dir );
    let probe = rng.next( ) * 20.0;

    let mut nearest = HitPoint::no_hit( );
    scene.traverse_single( &ray, &mut nearest, 0.0, &mut counters );

    let mut shadow = HitPoint::no_hit( );
    shadow.distance = probe;
    let occluded = scene.traverse_shadow( &ray, &mut shadow, 0.0, &mut counters );

    assert_eq!( occluded, nearest.is_hit( ) && nearest.distance < probe );
  }
}

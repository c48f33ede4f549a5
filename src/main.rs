// A native debug binary for the library: builds a procedural test scene,
// renders a few progressive passes in every traversal mode, and prints
// render statistics. No window, no image output; this exists to exercise
// the full pipeline and to compare the traversal modes' throughput.

// External imports
use log::info;
use std::time::Instant;
// Local imports
use spectra::camera::Camera;
use spectra::lights::{BackgroundLight, Light};
use spectra::material::Material;
use spectra::math::Vec3;
use spectra::mesh::{Mesh, MeshDesc, VertexBufferDesc};
use spectra::render::{RenderingParams, TraversalMode, Viewport};
use spectra::rng::Rng;
use spectra::scene::{Scene, SceneObject, Shape};
use std::sync::Arc;

/// Constructs a triangle cloud mesh with triangles in [-3, 3]^3
fn cloud( n : usize ) -> Mesh {
  let mut rng = Rng::new( 0xC10D );
  let mut positions = Vec::with_capacity( 9 * n );
  let mut indices = Vec::with_capacity( 3 * n );
  let mut material_indices = Vec::with_capacity( n );

  for i in 0..n {
    let center = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 6.0 - Vec3::splat( 3.0 );
    for _v in 0..3 {
      let p = center + Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 0.5;
      positions.extend_from_slice( &[ p.x, p.y, p.z ] );
    }
    let base = 3 * i as u32;
    indices.extend_from_slice( &[ base, base + 1, base + 2 ] );
    material_indices.push( 0 );
  }

  let materials = vec![ Arc::new( Material::diffuse( "cloud", Vec3::new( 0.8, 0.3, 0.3 ) ) ) ];

  Mesh::new( &MeshDesc {
    path: "cloud".to_string( )
  , vertex_buffer: VertexBufferDesc {
      num_triangles:         n as u32
    , num_vertices:          3 * n as u32
    , positions:             &positions
    , normals:               &[]
    , tangents:              &[]
    , tex_coords:            &[]
    , vertex_index_buffer:   &indices
    , material_index_buffer: &material_indices
    , materials
    }
  } ).expect( "cloud mesh construction failed" )
}

fn demo_scene( ) -> Scene {
  let mesh = Arc::new( cloud( 100_000 ) );
  let mirror = Arc::new( Material::metal( "mirror", Vec3::splat( 0.9 ), 0.05 ) );

  let objects = vec![
    SceneObject::new( Shape::Mesh( mesh ) )
  , SceneObject::new( Shape::Sphere { radius: 1.2, material: mirror } )
      .with_position( Vec3::new( 0.0, 0.0, -4.5 ) )
  , SceneObject::new( Shape::Light( 0 ) )
  ];

  let lights = vec![
    Light::area(
      Vec3::new( -2.0, 6.0, -2.0 )
    , Vec3::new( 0.0, 0.0, 4.0 )
    , Vec3::new( 4.0, 0.0, 0.0 )
    , Vec3::new( 20.0, 18.0, 14.0 )
    , false
    )
  ];

  Scene::build( objects, lights, Some( BackgroundLight::new( Vec3::new( 0.3, 0.4, 0.6 ) ) ) )
}

fn main( ) {
  env_logger::init( );

  let build_timer = Instant::now( );
  let scene = demo_scene( );
  info!( "Scene built in {:.1} ms", build_timer.elapsed( ).as_secs_f64( ) * 1000.0 );

  let camera = Camera::new( Vec3::new( 0.0, 4.8, 2.6 ), 0.97, 0.0 );
  let mut viewport = Viewport::new( 512, 512 ).expect( "viewport" );

  for &(mode, name) in &[
    (TraversalMode::Single, "single")
  , (TraversalMode::Simd, "simd8")
  , (TraversalMode::Packet, "packet")
  ] {
    viewport.reset( );
    let params = RenderingParams {
      traversal_mode: mode
    , samples_per_pixel: 1
    , ..Default::default( )
    };

    let timer = Instant::now( );
    let passes = 4;
    for _pass in 0..passes {
      viewport.render( &scene, &camera, &params ).expect( "render" );
    }
    let elapsed = timer.elapsed( ).as_secs_f64( );

    let counters = viewport.counters( );
    println!( "### {} ###", name );
    println!( "time per pass:      {:.1} ms", 1000.0 * elapsed / passes as f64 );
    println!( "samples:            {}", viewport.framebuffer( ).samples_accumulated( ) );
    println!( "primary rays:       {}", counters.num_primary_rays );
    println!( "ray-box tests:      {} ({} passed)"
            , counters.num_ray_box_tests, counters.num_passed_ray_box_tests );
    println!( "ray-triangle tests: {} ({} passed)"
            , counters.num_ray_triangle_tests, counters.num_passed_ray_triangle_tests );
  }
}

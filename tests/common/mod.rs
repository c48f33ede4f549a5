// Shared scene-building helpers for the integration tests.
#![allow(dead_code)]

use spectra::material::Material;
use spectra::math::Vec3;
use spectra::mesh::{Mesh, MeshDesc, VertexBufferDesc};
use std::sync::Arc;

/// A cube of side `2 * size` around the origin whose faces point inward,
/// for furnace-style tests with the camera on the inside
pub fn inward_cube( size : f32, material : Arc< Material > ) -> Mesh {
  let mut positions : Vec< f32 > = Vec::new( );
  let mut indices : Vec< u32 > = Vec::new( );
  let mut material_indices : Vec< u32 > = Vec::new( );

  // (outward axis, u, v) per face, with u x v = outward so the reversed
  // winding below faces inward
  let faces = [
    ( Vec3::new( 1.0, 0.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 ), Vec3::new( 0.0, 0.0, 1.0 ) )
  , ( Vec3::new( -1.0, 0.0, 0.0 ), Vec3::new( 0.0, 0.0, 1.0 ), Vec3::new( 0.0, 1.0, 0.0 ) )
  , ( Vec3::new( 0.0, 1.0, 0.0 ), Vec3::new( 0.0, 0.0, 1.0 ), Vec3::new( 1.0, 0.0, 0.0 ) )
  , ( Vec3::new( 0.0, -1.0, 0.0 ), Vec3::new( 1.0, 0.0, 0.0 ), Vec3::new( 0.0, 0.0, 1.0 ) )
  , ( Vec3::new( 0.0, 0.0, 1.0 ), Vec3::new( 1.0, 0.0, 0.0 ), Vec3::new( 0.0, 1.0, 0.0 ) )
  , ( Vec3::new( 0.0, 0.0, -1.0 ), Vec3::new( 0.0, 1.0, 0.0 ), Vec3::new( 1.0, 0.0, 0.0 ) )
  ];

  for (n, u, v) in faces.iter( ) {
    let center = *n * size;
    let corners = [
      center - *u * size - *v * size
    , center + *u * size - *v * size
    , center + *u * size + *v * size
    , center - *u * size + *v * size
    ];

    let base = ( positions.len( ) / 3 ) as u32;
    for c in corners.iter( ) {
      positions.extend_from_slice( &[ c.x, c.y, c.z ] );
    }
    // Wound so the face normal points at the origin
    indices.extend_from_slice( &[ base, base + 2, base + 1, base, base + 3, base + 2 ] );
    material_indices.extend_from_slice( &[ 0, 0 ] );
  }

  Mesh::new( &MeshDesc {
    path: "inward-cube".to_string( )
  , vertex_buffer: VertexBufferDesc {
      num_triangles:         indices.len( ) as u32 / 3
    , num_vertices:          positions.len( ) as u32 / 3
    , positions:             &positions
    , normals:               &[]
    , tangents:              &[]
    , tex_coords:            &[]
    , vertex_index_buffer:   &indices
    , material_index_buffer: &material_indices
    , materials:             vec![ material ]
    }
  } ).unwrap( )
}

/// A random triangle soup in a cube of side 6 around the origin
pub fn triangle_soup( n : usize, seed : u32 ) -> Mesh {
  let mut rng = spectra::rng::Rng::new( seed );
  let mut positions = Vec::with_capacity( 9 * n );
  let mut indices = Vec::with_capacity( 3 * n );

  for t in 0..n {
    let c = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 6.0 - Vec3::splat( 3.0 );
    for _v in 0..3 {
      let p = c + Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 0.5;
      positions.extend_from_slice( &[ p.x, p.y, p.z ] );
    }
    let base = 3 * t as u32;
    indices.extend_from_slice( &[ base, base + 1, base + 2 ] );
  }

  Mesh::new( &MeshDesc {
    path: String::new( )
  , vertex_buffer: VertexBufferDesc {
      num_triangles:         n as u32
    , num_vertices:          3 * n as u32
    , positions:             &positions
    , normals:               &[]
    , tangents:              &[]
    , tex_coords:            &[]
    , vertex_index_buffer:   &indices
    , material_index_buffer: &[]
    , materials:             Vec::new( )
    }
  } ).unwrap( )
}


// External imports
use log::warn;
use std::sync::Arc;
// Local imports
use crate::error::{Error, Result};
use crate::geometry::ProcessedTriangle;
use crate::material::Material;
use crate::math::{Vec2, Vec3};

/// Marks a triangle without a material of its own
pub const NO_MATERIAL : u32 = u32::MAX;

/// The corner vertices of one triangle plus its material slot
#[derive(Copy,Clone,Debug)]
pub struct VertexIndices {
  pub i0             : u32,
  pub i1             : u32,
  pub i2             : u32,
  pub material_index : u32
}

/// Interpolation inputs per vertex
#[derive(Copy,Clone,Debug)]
pub struct VertexShadingData {
  pub normal    : Vec3,
  pub tangent   : Vec3,
  pub tex_coord : Vec2
}

/// Raw mesh data as handed over by a loader.
///
/// `positions` holds 3 floats per vertex; `normals`/`tangents` likewise but
/// may be empty (then they are derived per face); `tex_coords` holds 2
/// floats per vertex or is empty. `material_index_buffer` may be empty, or
/// hold one index per triangle (`NO_MATERIAL` selects the scene default)
pub struct VertexBufferDesc< 'a > {
  pub num_triangles         : u32,
  pub num_vertices          : u32,
  pub positions             : &'a [f32],
  pub normals               : &'a [f32],
  pub tangents              : &'a [f32],
  pub tex_coords            : &'a [f32],
  pub vertex_index_buffer   : &'a [u32],
  pub material_index_buffer : &'a [u32],
  pub materials             : Vec< Arc< Material > >
}

/// The preprocessed, immutable triangle data of one mesh: positions, the
/// per-triangle index/material table, per-vertex shading attributes, the
/// material table, and the parallel `ProcessedTriangle` cache the
/// intersectors run on
pub struct VertexBuffer {
  positions : Vec< Vec3 >,
  indices   : Vec< VertexIndices >,
  shading   : Vec< VertexShadingData >,
  materials : Vec< Arc< Material > >,
  triangles : Vec< ProcessedTriangle >
}

impl VertexBuffer {
  /// Validates and preprocesses the descriptor. Triangles are taken in the
  /// order of `desc.vertex_index_buffer` (the mesh reorders that buffer
  /// along the BVH leaf order before calling this)
  pub fn new( desc : &VertexBufferDesc ) -> Result< VertexBuffer > {
    let num_triangles = desc.num_triangles as usize;
    let num_vertices = desc.num_vertices as usize;

    if desc.positions.len( ) != 3 * num_vertices {
      return Err( Error::InvalidInput( format!(
        "positions buffer holds {} floats, expected {}", desc.positions.len( ), 3 * num_vertices ) ) );
    }
    if desc.vertex_index_buffer.len( ) != 3 * num_triangles {
      return Err( Error::InvalidInput( format!(
        "index buffer holds {} entries, expected {}", desc.vertex_index_buffer.len( ), 3 * num_triangles ) ) );
    }
    if !desc.normals.is_empty( ) && desc.normals.len( ) != 3 * num_vertices {
      return Err( Error::InvalidInput( "normals buffer size mismatch".to_string( ) ) );
    }
    if !desc.tangents.is_empty( ) && desc.tangents.len( ) != 3 * num_vertices {
      return Err( Error::InvalidInput( "tangents buffer size mismatch".to_string( ) ) );
    }
    if !desc.tex_coords.is_empty( ) && desc.tex_coords.len( ) != 2 * num_vertices {
      return Err( Error::InvalidInput( "texture coordinate buffer size mismatch".to_string( ) ) );
    }
    if !desc.material_index_buffer.is_empty( ) && desc.material_index_buffer.len( ) != num_triangles {
      return Err( Error::InvalidInput( "material index buffer size mismatch".to_string( ) ) );
    }

    for &i in desc.vertex_index_buffer {
      if i as usize >= num_vertices {
        return Err( Error::InvalidInput( format!( "vertex index {} out of range", i ) ) );
      }
    }
    for &m in desc.material_index_buffer {
      if m != NO_MATERIAL && m as usize >= desc.materials.len( ) {
        return Err( Error::InvalidInput( format!( "material index {} out of range", m ) ) );
      }
    }

    if num_vertices > 3 * num_triangles {
      warn!( "There are redundant (unused) vertices" );
    }

    let read_vec3 = | buf : &[f32], i : usize | {
      Vec3::new( buf[ 3 * i ], buf[ 3 * i + 1 ], buf[ 3 * i + 2 ] )
    };

    let positions : Vec< Vec3 > =
      ( 0..num_vertices ).map( |i| read_vec3( desc.positions, i ) ).collect( );

    let mut indices = Vec::with_capacity( num_triangles );
    let mut triangles = Vec::with_capacity( num_triangles );
    for t in 0..num_triangles {
      let i0 = desc.vertex_index_buffer[ 3 * t ];
      let i1 = desc.vertex_index_buffer[ 3 * t + 1 ];
      let i2 = desc.vertex_index_buffer[ 3 * t + 2 ];
      let material_index = if desc.material_index_buffer.is_empty( ) {
        NO_MATERIAL
      } else {
        desc.material_index_buffer[ t ]
      };
      indices.push( VertexIndices { i0, i1, i2, material_index } );
      triangles.push( ProcessedTriangle::new(
        positions[ i0 as usize ]
      , positions[ i1 as usize ]
      , positions[ i2 as usize ]
      ) );
    }

    // Shading attributes; missing normals/tangents are derived per face
    let mut shading : Vec< VertexShadingData > = ( 0..num_vertices )
      .map( |i| VertexShadingData {
        normal:    if desc.normals.is_empty( ) { Vec3::ZERO } else { read_vec3( desc.normals, i ) }
      , tangent:   if desc.tangents.is_empty( ) { Vec3::ZERO } else { read_vec3( desc.tangents, i ) }
      , tex_coord: if desc.tex_coords.is_empty( ) {
                     Vec2::ZERO
                   } else {
                     Vec2::new( desc.tex_coords[ 2 * i ], desc.tex_coords[ 2 * i + 1 ] )
                   }
      } )
      .collect( );

    if desc.normals.is_empty( ) {
      for (t, tri) in triangles.iter( ).enumerate( ) {
        let n = tri.edge1.cross( tri.edge2 ).normalize( );
        shading[ indices[ t ].i0 as usize ].normal = n;
        shading[ indices[ t ].i1 as usize ].normal = n;
        shading[ indices[ t ].i2 as usize ].normal = n;
      }
    }
    if desc.tangents.is_empty( ) {
      for s in shading.iter_mut( ) {
        s.tangent = s.normal.any_perpendicular( );
      }
    }

    Ok( VertexBuffer {
      positions
    , indices
    , shading
    , materials: desc.materials.clone( )
    , triangles
    } )
  }

  pub fn num_triangles( &self ) -> u32 {
    self.triangles.len( ) as u32
  }

  pub fn num_vertices( &self ) -> u32 {
    self.positions.len( ) as u32
  }

  pub fn triangle( &self, index : u32 ) -> &ProcessedTriangle {
    &self.triangles[ index as usize ]
  }

  pub fn vertex_indices( &self, triangle_index : u32 ) -> &VertexIndices {
    &self.indices[ triangle_index as usize ]
  }

  pub fn shading_data( &self, vertex_index : u32 ) -> &VertexShadingData {
    &self.shading[ vertex_index as usize ]
  }

  pub fn material( &self, material_index : u32 ) -> Option< &Arc< Material > > {
    self.materials.get( material_index as usize )
  }
}

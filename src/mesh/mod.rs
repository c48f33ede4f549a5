mod vertex_buffer;

pub use vertex_buffer::{
  VertexBuffer, VertexBufferDesc, VertexIndices, VertexShadingData, NO_MATERIAL,
};

// External imports
use log::info;
// Local imports
use crate::bvh::{build, BuildParams, Bvh, LeafIntersector, Node};
use crate::error::Result;
use crate::geometry::{
  intersect_triangle, intersect_triangle8, Aabb, HitPoint, HitPoint8, Ray, Ray8, RayPacket,
  Triangle8,
};
use crate::material::{Material, ShadingData};
use crate::math::{Vec2, Vec3};
use crate::render::LocalCounters;

/// A mesh as handed over by a loader
pub struct MeshDesc< 'a > {
  pub path          : String,
  pub vertex_buffer : VertexBufferDesc< 'a >
}

/// A triangle mesh with its own BVH
///
/// Construction builds the hierarchy over the triangle bounds and lays the
/// triangles out in BVH leaf order, so leaves cover contiguous runs of the
/// vertex buffer. Everything is frozen after `new(..)` returns
pub struct Mesh {
  bounding_box  : Aabb,
  bvh           : Bvh,
  vertex_buffer : VertexBuffer
}

impl Mesh {
  pub fn new( desc : &MeshDesc ) -> Result< Mesh > {
    let num_triangles = desc.vertex_buffer.num_triangles as usize;

    let num_vertices = desc.vertex_buffer.num_vertices as usize;
    if desc.vertex_buffer.positions.len( ) != 3 * num_vertices {
      return Err( crate::error::Error::InvalidInput( "positions buffer size mismatch".to_string( ) ) );
    }
    if desc.vertex_buffer.vertex_index_buffer.len( ) != 3 * num_triangles {
      return Err( crate::error::Error::InvalidInput( "index buffer size mismatch".to_string( ) ) );
    }

    // Triangle bounds drive the BVH build
    let mut bounding_box = Aabb::empty( );
    let mut boxes = Vec::with_capacity( num_triangles );
    for t in 0..num_triangles {
      let mut corners = [Vec3::ZERO; 3];
      for v in 0..3 {
        let i = desc.vertex_buffer.vertex_index_buffer[ 3 * t + v ] as usize;
        if i >= num_vertices {
          return Err( crate::error::Error::InvalidInput( format!(
            "vertex index {} out of range", i ) ) );
        }
        corners[ v ] = Vec3::new(
          desc.vertex_buffer.positions[ 3 * i ]
        , desc.vertex_buffer.positions[ 3 * i + 1 ]
        , desc.vertex_buffer.positions[ 3 * i + 2 ]
        );
      }
      let tri_box = Aabb::from_points( corners[ 0 ], corners[ 1 ], corners[ 2 ] );
      boxes.push( tri_box );
      bounding_box = bounding_box.join( &tri_box );
    }

    let (bvh, new_order) = build( &boxes, &BuildParams::default( ) );

    // Log the tree shape the way the builder reports it
    {
      let stats = bvh.calculate_stats( );
      info!( "BVH stats:" );
      info!( "    - max depth: {}", stats.max_depth );
      info!( "    - total surface area: {}", stats.total_nodes_area );
      info!( "    - total volume: {}", stats.total_nodes_volume );
      let histogram : Vec< String > = stats
        .leaves_count_histogram
        .iter( )
        .enumerate( )
        .map( |(i, c)| format!( "{} ({})", i, c ) )
        .collect( );
      info!( "    - leaf nodes histogram: {}", histogram.join( ", " ) );
    }

    // Reorder the triangle table along the leaf order, so leaves reference
    // contiguous triangle ranges
    let mut new_index_buffer = Vec::with_capacity( 3 * num_triangles );
    let mut new_material_index_buffer = Vec::with_capacity( num_triangles );
    for i in 0..num_triangles {
      let new_triangle_index = new_order[ i ] as usize;
      new_index_buffer.push( desc.vertex_buffer.vertex_index_buffer[ 3 * new_triangle_index ] );
      new_index_buffer.push( desc.vertex_buffer.vertex_index_buffer[ 3 * new_triangle_index + 1 ] );
      new_index_buffer.push( desc.vertex_buffer.vertex_index_buffer[ 3 * new_triangle_index + 2 ] );
      if !desc.vertex_buffer.material_index_buffer.is_empty( ) {
        new_material_index_buffer.push( desc.vertex_buffer.material_index_buffer[ new_triangle_index ] );
      }
    }

    let reordered = VertexBufferDesc {
      num_triangles:         desc.vertex_buffer.num_triangles
    , num_vertices:          desc.vertex_buffer.num_vertices
    , positions:             desc.vertex_buffer.positions
    , normals:               desc.vertex_buffer.normals
    , tangents:              desc.vertex_buffer.tangents
    , tex_coords:            desc.vertex_buffer.tex_coords
    , vertex_index_buffer:   &new_index_buffer
    , material_index_buffer: &new_material_index_buffer
    , materials:             desc.vertex_buffer.materials.clone( )
    };
    let vertex_buffer = VertexBuffer::new( &reordered )?;

    info!( "Mesh '{}' created successfully"
         , if desc.path.is_empty( ) { "unnamed" } else { desc.path.as_str( ) } );

    Ok( Mesh { bounding_box, bvh, vertex_buffer } )
  }

  pub fn bounding_box( &self ) -> &Aabb {
    &self.bounding_box
  }

  pub fn bvh( &self ) -> &Bvh {
    &self.bvh
  }

  pub fn vertex_buffer( &self ) -> &VertexBuffer {
    &self.vertex_buffer
  }

  /// Interpolates the shading attributes at a hit on this mesh.
  /// `default_material` fills in for triangles without a material slot
  pub fn evaluate_shading_data< 'a >(
        &'a self
      , hit              : &HitPoint
      , default_material : &'a Material
      ) -> ShadingData< 'a > {
    let indices = self.vertex_buffer.vertex_indices( hit.sub_object_id );

    let material = if indices.material_index == NO_MATERIAL {
      default_material
    } else {
      self
        .vertex_buffer
        .material( indices.material_index )
        .map( |m| m.as_ref( ) )
        .unwrap_or( default_material )
    };

    let s0 = self.vertex_buffer.shading_data( indices.i0 );
    let s1 = self.vertex_buffer.shading_data( indices.i1 );
    let s2 = self.vertex_buffer.shading_data( indices.i2 );

    let c1 = hit.u;
    let c2 = hit.v;
    let c0 = 1.0 - c1 - c2;

    let mut shading = ShadingData::new( material );
    shading.tex_coord = Vec2::new(
      c0 * s0.tex_coord.x + c1 * s1.tex_coord.x + c2 * s2.tex_coord.x
    , c0 * s0.tex_coord.y + c1 * s1.tex_coord.y + c2 * s2.tex_coord.y
    );

    let mut normal = ( s0.normal * c0 + s1.normal * c1 + s2.normal * c2 ).normalize( );
    let mut tangent = ( s0.tangent * c0 + s1.tangent * c1 + s2.tangent * c2 ).normalize( );
    let mut bitangent = tangent.cross( normal );

    if material.normal_map.is_some( ) {
      let local = material.normal_vector( shading.tex_coord );
      normal = ( tangent * local.x + bitangent * local.y + normal * local.z ).normalize( );
    }

    // Interpolation (and normal mapping) break orthogonality
    tangent = tangent.orthogonalize( normal ).normalize( );
    bitangent = tangent.cross( normal );

    shading.normal = normal;
    shading.tangent = tangent;
    shading.bitangent = bitangent;
    shading
  }
}

impl LeafIntersector for Mesh {
  fn leaf_single( &self
                , ray       : &Ray
                , node      : &Node
                , object_id : u32
                , hit       : &mut HitPoint
                , counters  : &mut LocalCounters ) {
    counters.num_ray_triangle_tests += node.num_leaves as u32;

    for i in 0..node.num_leaves as u32 {
      let triangle_index = node.child_index + i;
      let tri = self.vertex_buffer.triangle( triangle_index );

      if let Some( (distance, u, v) ) = intersect_triangle( ray, tri ) {
        if distance < hit.distance {
          hit.distance = distance;
          hit.sub_object_id = triangle_index;
          hit.object_id = object_id;
          hit.u = u;
          hit.v = v;
          counters.num_passed_ray_triangle_tests += 1;
        }
      }
    }
  }

  fn leaf_shadow( &self
                , ray      : &Ray
                , node     : &Node
                , hit      : &mut HitPoint
                , counters : &mut LocalCounters ) -> bool {
    counters.num_ray_triangle_tests += node.num_leaves as u32;

    for i in 0..node.num_leaves as u32 {
      let triangle_index = node.child_index + i;
      let tri = self.vertex_buffer.triangle( triangle_index );

      if let Some( (distance, _u, _v) ) = intersect_triangle( ray, tri ) {
        if distance < hit.distance {
          hit.distance = distance;
          counters.num_passed_ray_triangle_tests += 1;
          return true;
        }
      }
    }

    false
  }

  fn leaf_simd8( &self
               , ray       : &Ray8
               , node      : &Node
               , object_id : u32
               , hit       : &mut HitPoint8
               , counters  : &mut LocalCounters ) {
    counters.num_ray_triangle_tests += 8 * node.num_leaves as u32;

    for i in 0..node.num_leaves as u32 {
      let triangle_index = node.child_index + i;
      let tri = Triangle8::splat( self.vertex_buffer.triangle( triangle_index ) );

      let (mask, distance, u, v) = intersect_triangle8( ray, &tri, hit.distance );
      let bits = mask.sign_mask( );
      if bits != 0 {
        // Merge the passing lanes into the running hit record
        hit.u = mask.select( u, hit.u );
        hit.v = mask.select( v, hit.v );
        hit.distance = mask.select( distance, hit.distance );
        for lane in 0..8 {
          if ( bits >> lane ) & 1 == 1 {
            hit.sub_object_id[ lane ] = triangle_index;
            hit.object_id[ lane ] = object_id;
          }
        }
        counters.num_passed_ray_triangle_tests += bits.count_ones( );
      }
    }
  }

  fn leaf_packet( &self
                , node      : &Node
                , object_id : u32
                , packet    : &mut RayPacket
                , active    : &[u32]
                , hits      : &mut [HitPoint8]
                , counters  : &mut LocalCounters ) {
    counters.num_ray_triangle_tests += 8 * node.num_leaves as u32 * active.len( ) as u32;

    for i in 0..node.num_leaves as u32 {
      let triangle_index = node.child_index + i;
      let tri = Triangle8::splat( self.vertex_buffer.triangle( triangle_index ) );

      for &group_index in active {
        let group = &mut packet.groups[ group_index as usize ];
        let (mask, distance, u, v) = intersect_triangle8( &group.rays, &tri, group.max_distances );
        let bits = mask.sign_mask( );
        if bits == 0 {
          continue;
        }

        group.max_distances = mask.select( distance, group.max_distances );

        // Scatter the passing lanes to their rays' hit records
        for lane in 0..8 {
          if ( bits >> lane ) & 1 == 1 {
            let ray_offset = group.ray_offsets[ lane ] as usize;
            let sub_offset = ray_offset % 8;
            let hit = &mut hits[ ray_offset / 8 ];

            hit.u.set_lane( sub_offset, u.lane( lane ) );
            hit.v.set_lane( sub_offset, v.lane( lane ) );
            hit.distance.set_lane( sub_offset, distance.lane( lane ) );
            hit.sub_object_id[ sub_offset ] = triangle_index;
            hit.object_id[ sub_offset ] = object_id;
          }
        }
        counters.num_passed_ray_triangle_tests += bits.count_ones( );
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{Mesh, MeshDesc, VertexBufferDesc};
  use crate::bvh::{traverse_shadow, traverse_simd8, traverse_single};
  use crate::geometry::{HitPoint, HitPoint8, Ray, Ray8};
  use crate::math::{Vec3, Vec3x8};
  use crate::render::LocalCounters;
  use crate::rng::Rng;

  /// A little cloud of triangles for equivalence testing
  fn triangle_cloud( n : usize, seed : u32 ) -> Mesh {
    let mut rng = Rng::new( seed );
    let mut positions = Vec::new( );
    let mut indices = Vec::new( );
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

  fn random_ray( rng : &mut Rng ) -> Ray {
    let origin = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 8.0 - Vec3::splat( 4.0 );
    let dir = Vec3::new(
      rng.next( ) - 0.5
    , rng.next( ) - 0.5
    , rng.next( ) - 0.5
    ).normalize( );
    Ray::new( origin, dir )
  }

  #[test]
  fn reordered_triangles_cover_the_mesh( ) {
    let mesh = triangle_cloud( 200, 60 );
    assert_eq!( mesh.vertex_buffer( ).num_triangles( ), 200 );
    // Every leaf references in-range triangles
    for node in &mesh.bvh( ).nodes {
      if node.is_leaf( ) {
        assert!( node.child_index + node.num_leaves as u32 <= 200 );
      }
    }
  }

  #[test]
  fn simd8_traversal_matches_single( ) {
    let mesh = triangle_cloud( 300, 61 );
    let mut rng = Rng::new( 62 );
    let mut counters = LocalCounters::new( );

    for _round in 0..50 {
      let rays : Vec< Ray > = ( 0..8 ).map( |_| random_ray( &mut rng ) ).collect( );

      let mut dirs = [Vec3::ZERO; 8];
      for i in 0..8 {
        dirs[ i ] = rays[ i ].dir;
      }
      // 8 coherent rays share an origin in SIMD mode; use lane 0's
      let origin = rays[ 0 ].origin;
      let ray8 = Ray8::new( Vec3x8::splat( origin ), Vec3x8::from_vecs( dirs ) );

      let mut hit8 = HitPoint8::no_hit( );
      traverse_simd8( mesh.bvh( ), &mesh, 7, &ray8, &mut hit8, &mut counters );

      for lane in 0..8 {
        let mut hit = HitPoint::no_hit( );
        let scalar_ray = Ray::new( origin, dirs[ lane ] );
        traverse_single( mesh.bvh( ), &mesh, 7, &scalar_ray, &mut hit, &mut counters );

        let simd_hit = hit8.lane( lane );
        assert_eq!( hit.is_hit( ), simd_hit.distance != f32::MAX, "lane {}", lane );
        if hit.is_hit( ) {
          assert!( ( hit.distance - simd_hit.distance ).abs( ) <= 1.0e-5 );
          assert_eq!( hit.sub_object_id, simd_hit.sub_object_id );
          assert_eq!( hit.object_id, simd_hit.object_id );
        }
      }
    }
  }

  #[test]
  fn shadow_traversal_is_consistent_with_nearest_hit( ) {
    let mesh = triangle_cloud( 300, 63 );
    let mut rng = Rng::new( 64 );
    let mut counters = LocalCounters::new( );

    for _round in 0..200 {
      let ray = random_ray( &mut rng );
      let probe = 2.0 + rng.next( ) * 4.0;

      let mut nearest = HitPoint::no_hit( );
      traverse_single( mesh.bvh( ), &mesh, 0, &ray, &mut nearest, &mut counters );

      let mut shadow = HitPoint::no_hit( );
      shadow.distance = probe;
      let occluded = traverse_shadow( mesh.bvh( ), &mesh, &ray, &mut shadow, &mut counters );

      let expected = nearest.is_hit( ) && nearest.distance < probe;
      assert_eq!( occluded, expected );
    }
  }

  #[test]
  fn bad_vertex_index_is_rejected( ) {
    let positions = [ 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0 ];
    let indices = [ 0_u32, 1, 5 ];
    let result = Mesh::new( &MeshDesc {
      path: String::new( )
    , vertex_buffer: VertexBufferDesc {
        num_triangles:         1
      , num_vertices:          3
      , positions:             &positions
      , normals:               &[]
      , tangents:              &[]
      , tex_coords:            &[]
      , vertex_index_buffer:   &indices
      , material_index_buffer: &[]
      , materials:             Vec::new( )
      }
    } );
    assert!( matches!( result, Err( crate::error::Error::InvalidInput( _ ) ) ) );
  }
}

// The generic depth-first traversal skeleton, shared by the three ray
// forms. The leaf work is supplied by the object being traversed (triangle
// ranges for meshes, object ranges for the scene), the skeleton only walks
// nodes and culls against the current-best hit distances.

// External imports
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
// Local imports
use crate::bvh::{Bvh, Node};
use crate::geometry::{HitPoint, HitPoint8, Ray, Ray8, RayPacket};
use crate::math::Float8;
use crate::render::LocalCounters;

/// Stack capacity for all traversal modes; the builder bounds tree depth to
/// `Bvh::MAX_DEPTH`
pub const STACK_SIZE : usize = Bvh::MAX_DEPTH as usize;

/// Primitive-level intersection, supplied by the traversed object
///
/// The node passed to each method is a leaf covering `node.num_leaves`
/// primitives starting at `node.child_index` in the object's
/// primitive-order array
pub trait LeafIntersector {
  /// Nearest-hit intersection for a single ray
  fn leaf_single( &self
                , ray       : &Ray
                , node      : &Node
                , object_id : u32
                , hit       : &mut HitPoint
                , counters  : &mut LocalCounters );

  /// Any-hit intersection for a shadow ray; `hit.distance` is the probe
  /// length. Returns true as soon as any occluder is found
  fn leaf_shadow( &self
                , ray      : &Ray
                , node     : &Node
                , hit      : &mut HitPoint
                , counters : &mut LocalCounters ) -> bool;

  /// Nearest-hit intersection for 8 coherent rays; lanes are updated
  /// independently through their masks
  fn leaf_simd8( &self
               , ray       : &Ray8
               , node      : &Node
               , object_id : u32
               , hit       : &mut HitPoint8
               , counters  : &mut LocalCounters );

  /// Nearest-hit intersection for the active groups of a ray packet.
  /// Results are written per ray through the groups' `ray_offsets`
  fn leaf_packet( &self
                , node      : &Node
                , object_id : u32
                , packet    : &mut RayPacket
                , active    : &[u32]
                , hits      : &mut [HitPoint8]
                , counters  : &mut LocalCounters );
}

#[inline(always)]
fn prefetch_node( nodes : &[Node], index : usize ) {
  #[cfg(target_arch = "x86_64")]
  {
    if index < nodes.len( ) {
      unsafe {
        _mm_prefetch::< _MM_HINT_T0 >( nodes.as_ptr( ).add( index ) as *const i8 );
      }
    }
  }
  #[cfg(not(target_arch = "x86_64"))]
  {
    let _ = ( nodes, index );
  }
}

/// Walks the tree with a single ray, reporting the nearest hit into `hit`
///
/// For a given ray the reported hit is the one with the smallest positive
/// distance among all primitives under the tree
pub fn traverse_single< T : LeafIntersector + ?Sized >(
      bvh       : &Bvh
    , object    : &T
    , object_id : u32
    , ray       : &Ray
    , hit       : &mut HitPoint
    , counters  : &mut LocalCounters ) {
  if bvh.nodes.is_empty( ) {
    return;
  }

  let nodes = &bvh.nodes;
  let mut stack = [0_u32; STACK_SIZE];
  let mut stack_size = 0;
  let mut node_index = 0_u32;

  loop {
    let node = &nodes[ node_index as usize ];

    if node.is_leaf( ) {
      object.leaf_single( ray, node, object_id, hit, counters );
    } else {
      let child = node.child_index as usize;
      let node_a = &nodes[ child ];
      let node_b = &nodes[ child + 1 ];

      if !node_a.is_leaf( ) {
        prefetch_node( nodes, node_a.child_index as usize );
      }
      if !node_b.is_leaf( ) {
        prefetch_node( nodes, node_b.child_index as usize );
      }

      counters.num_ray_box_tests += 2;
      let dist_a = node_a.aabb( ).hit( ray ).filter( |d| *d < hit.distance );
      let dist_b = node_b.aabb( ).hit( ray ).filter( |d| *d < hit.distance );
      counters.num_passed_ray_box_tests +=
        dist_a.is_some( ) as u32 + dist_b.is_some( ) as u32;

      match (dist_a, dist_b) {
        (Some( da ), Some( db )) => {
          // Descend into the nearer child; the farther one waits
          let (near, far) = if da <= db { (child, child + 1) } else { (child + 1, child) };
          stack[ stack_size ] = far as u32;
          stack_size += 1;
          node_index = near as u32;
          continue;
        },
        (Some( _ ), None) => {
          node_index = child as u32;
          continue;
        },
        (None, Some( _ )) => {
          node_index = ( child + 1 ) as u32;
          continue;
        },
        (None, None) => { }
      }
    }

    if stack_size == 0 {
      break;
    }
    stack_size -= 1;
    node_index = stack[ stack_size ];
  }
}

/// Any-hit walk for shadow rays. `hit.distance` bounds the probe; returns
/// true iff some primitive occludes within that distance
pub fn traverse_shadow< T : LeafIntersector + ?Sized >(
      bvh      : &Bvh
    , object   : &T
    , ray      : &Ray
    , hit      : &mut HitPoint
    , counters : &mut LocalCounters ) -> bool {
  if bvh.nodes.is_empty( ) {
    return false;
  }

  let nodes = &bvh.nodes;
  let mut stack = [0_u32; STACK_SIZE];
  let mut stack_size = 0;
  let mut node_index = 0_u32;

  loop {
    let node = &nodes[ node_index as usize ];

    if node.is_leaf( ) {
      if object.leaf_shadow( ray, node, hit, counters ) {
        return true;
      }
    } else {
      let child = node.child_index as usize;
      counters.num_ray_box_tests += 2;
      let hit_a = nodes[ child ].aabb( ).hit( ray ).filter( |d| *d <= hit.distance ).is_some( );
      let hit_b = nodes[ child + 1 ].aabb( ).hit( ray ).filter( |d| *d <= hit.distance ).is_some( );
      counters.num_passed_ray_box_tests += hit_a as u32 + hit_b as u32;

      // Any order works; occlusion needs no nearest-first walk
      if hit_a && hit_b {
        stack[ stack_size ] = ( child + 1 ) as u32;
        stack_size += 1;
        node_index = child as u32;
        continue;
      } else if hit_a {
        node_index = child as u32;
        continue;
      } else if hit_b {
        node_index = ( child + 1 ) as u32;
        continue;
      }
    }

    if stack_size == 0 {
      return false;
    }
    stack_size -= 1;
    node_index = stack[ stack_size ];
  }
}

/// Walks the tree with 8 coherent rays at once. Each box is fetched once
/// and tested against all 8 lanes; a child is entered while any lane hits
/// it closer than that lane's current best
pub fn traverse_simd8< T : LeafIntersector + ?Sized >(
      bvh       : &Bvh
    , object    : &T
    , object_id : u32
    , ray       : &Ray8
    , hit       : &mut HitPoint8
    , counters  : &mut LocalCounters ) {
  if bvh.nodes.is_empty( ) {
    return;
  }

  let nodes = &bvh.nodes;
  let mut stack = [0_u32; STACK_SIZE];
  let mut stack_size = 0;
  let mut node_index = 0_u32;
  let miss = Float8::splat( f32::MAX );

  loop {
    let node = &nodes[ node_index as usize ];

    if node.is_leaf( ) {
      object.leaf_simd8( ray, node, object_id, hit, counters );
    } else {
      let child = node.child_index as usize;
      let node_a = &nodes[ child ];
      let node_b = &nodes[ child + 1 ];

      if !node_a.is_leaf( ) {
        prefetch_node( nodes, node_a.child_index as usize );
      }
      if !node_b.is_leaf( ) {
        prefetch_node( nodes, node_b.child_index as usize );
      }

      counters.num_ray_box_tests += 16;
      let (mask_a, dist_a) = node_a.aabb( ).hit8( ray );
      let (mask_b, dist_b) = node_b.aabb( ).hit8( ray );
      let active_a = mask_a.and( dist_a.lt( hit.distance ) );
      let active_b = mask_b.and( dist_b.lt( hit.distance ) );
      counters.num_passed_ray_box_tests +=
        active_a.sign_mask( ).count_ones( ) + active_b.sign_mask( ).count_ones( );

      let any_a = active_a.any( );
      let any_b = active_b.any( );

      if any_a && any_b {
        // Order by the nearest active lane of each child
        let key_a = active_a.select( dist_a, miss ).horizontal_min( );
        let key_b = active_b.select( dist_b, miss ).horizontal_min( );
        let (near, far) = if key_a <= key_b { (child, child + 1) } else { (child + 1, child) };
        stack[ stack_size ] = far as u32;
        stack_size += 1;
        node_index = near as u32;
        continue;
      } else if any_a {
        node_index = child as u32;
        continue;
      } else if any_b {
        node_index = ( child + 1 ) as u32;
        continue;
      }
    }

    if stack_size == 0 {
      break;
    }
    stack_size -= 1;
    node_index = stack[ stack_size ];
  }
}

#[derive(Copy,Clone)]
struct PacketFrame {
  node  : u32,
  start : u32,
  end   : u32
}

/// Walks the tree with a whole ray packet.
///
/// Each stack frame carries the list of groups still active at its node
/// (a range of `active_scratch`, the stack-of-lists arena). Groups whose
/// lanes all miss a child's box are dropped from the list pushed for that
/// child; popping a frame restores the full list of its level. Per-ray
/// results at exit equal what every ray would get when traversed alone
pub fn traverse_packet< T : LeafIntersector + ?Sized >(
      bvh            : &Bvh
    , object         : &T
    , object_id      : u32
    , packet         : &mut RayPacket
    , hits           : &mut [HitPoint8]
    , active_scratch : &mut Vec< u32 >
    , counters       : &mut LocalCounters ) {
  if bvh.nodes.is_empty( ) || packet.num_groups( ) == 0 {
    return;
  }

  let nodes = &bvh.nodes;
  let arena = active_scratch;
  arena.clear( );
  for g in 0..packet.num_groups( ) as u32 {
    arena.push( g );
  }

  let mut stack = [PacketFrame { node: 0, start: 0, end: 0 }; STACK_SIZE];
  let mut stack_size = 0;
  let mut frame = PacketFrame { node: 0, start: 0, end: packet.num_groups( ) as u32 };

  loop {
    let node = &nodes[ frame.node as usize ];

    if node.is_leaf( ) {
      let active = &arena[ frame.start as usize .. frame.end as usize ];
      object.leaf_packet( node, object_id, packet, active, hits, counters );
    } else {
      let child = node.child_index as usize;
      let node_a = &nodes[ child ];
      let node_b = &nodes[ child + 1 ];

      if !node_a.is_leaf( ) {
        prefetch_node( nodes, node_a.child_index as usize );
      }
      if !node_b.is_leaf( ) {
        prefetch_node( nodes, node_b.child_index as usize );
      }

      // Filter the active list against each child box
      let box_a = node_a.aabb( );
      let box_b = node_b.aabb( );

      let a_start = arena.len( ) as u32;
      for k in frame.start..frame.end {
        let gi = arena[ k as usize ];
        let group = &packet.groups[ gi as usize ];
        counters.num_ray_box_tests += 8;
        let (mask, dist) = box_a.hit8( &group.rays );
        let active = mask.and( dist.lt( group.max_distances ) );
        counters.num_passed_ray_box_tests += active.sign_mask( ).count_ones( );
        if active.any( ) {
          arena.push( gi );
        }
      }
      let a_end = arena.len( ) as u32;

      for k in frame.start..frame.end {
        let gi = arena[ k as usize ];
        let group = &packet.groups[ gi as usize ];
        counters.num_ray_box_tests += 8;
        let (mask, dist) = box_b.hit8( &group.rays );
        let active = mask.and( dist.lt( group.max_distances ) );
        counters.num_passed_ray_box_tests += active.sign_mask( ).count_ones( );
        if active.any( ) {
          arena.push( gi );
        }
      }
      let b_end = arena.len( ) as u32;

      let frame_a = PacketFrame { node: child as u32, start: a_start, end: a_end };
      let frame_b = PacketFrame { node: ( child + 1 ) as u32, start: a_end, end: b_end };
      let has_a = a_end > a_start;
      let has_b = b_end > a_end;

      if has_a && has_b {
        // Near child by the split axis vs the direction sign of the first
        // active ray; the left child holds the lower coordinates
        let first = &packet.groups[ arena[ frame.start as usize ] as usize ];
        let axis = node.split_axis as usize;
        let d0 = match axis {
          0 => first.rays.dir.x.lane( 0 ),
          1 => first.rays.dir.y.lane( 0 ),
          _ => first.rays.dir.z.lane( 0 )
        };
        let a_first = if d0 > 0.0 {
          true
        } else if d0 < 0.0 {
          false
        } else {
          // Degenerate direction on this axis: fall back to box distance
          let r0 = first.rays.lane( 0 );
          let da = box_a.hit( &r0 ).unwrap_or( f32::MAX );
          let db = box_b.hit( &r0 ).unwrap_or( f32::MAX );
          da <= db
        };
        let (near, far) = if a_first { (frame_a, frame_b) } else { (frame_b, frame_a) };
        stack[ stack_size ] = far;
        stack_size += 1;
        frame = near;
        continue;
      } else if has_a {
        frame = frame_a;
        continue;
      } else if has_b {
        frame = frame_b;
        continue;
      }
    }

    if stack_size == 0 {
      break;
    }
    stack_size -= 1;
    frame = stack[ stack_size ];
    // Everything past this frame's list belongs to finished subtrees
    arena.truncate( frame.end as usize );
  }
}

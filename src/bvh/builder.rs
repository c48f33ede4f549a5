// External imports
use log::info;
use std::cmp::Ordering;
use std::time::Instant;
// Local imports
use crate::bvh::{Bvh, Node};
use crate::geometry::Aabb;

/// Which measure of a candidate child box the split cost is charged by
#[derive(Copy,Clone,Debug,PartialEq)]
pub enum SplitHeuristic {
  SurfaceArea,
  Volume
}

#[derive(Copy,Clone,Debug)]
pub struct BuildParams {
  /// Maximum number of primitives placed in one leaf
  pub max_leaf_size : u32,
  pub heuristic     : SplitHeuristic
}

impl Default for BuildParams {
  fn default( ) -> BuildParams {
    BuildParams { max_leaf_size: 2, heuristic: SplitHeuristic::SurfaceArea }
  }
}

/// Past this depth only median splits are taken. Any remaining set then
/// halves every level, which keeps the tree within `Bvh::MAX_DEPTH` even for
/// adversarial input that SAH would split one-off-the-end repeatedly
const MEDIAN_SPLIT_DEPTH : u32 = 32;

/// Scratch buffers reused across the whole recursion, sized once at the
/// primitive count
struct Context {
  left_boxes  : Vec< Aabb >,
  right_boxes : Vec< Aabb >,
  sorted      : [Vec< u32 >; 3]
}

impl Context {
  fn new( num_leaves : usize ) -> Context {
    Context {
      left_boxes:  vec![ Aabb::empty( ); num_leaves ]
    , right_boxes: vec![ Aabb::empty( ); num_leaves ]
    , sorted:      [ Vec::with_capacity( num_leaves )
                   , Vec::with_capacity( num_leaves )
                   , Vec::with_capacity( num_leaves )
                   ]
    }
  }
}

/// The set of primitives a recursion step is responsible for
struct WorkSet {
  aabb      : Aabb,
  indices   : Vec< u32 >,
  /// The axis `indices` is already sorted on, if any; that axis then skips
  /// one sort in the child
  sorted_by : Option< u8 >,
  depth     : u32
}

struct Builder< 'a > {
  boxes                : &'a [Aabb],
  params               : BuildParams,
  nodes                : Vec< Node >,
  num_generated_nodes  : u32,
  num_generated_leaves : u32,
  leaves_order         : Vec< u32 >
}

/// Constructs a BVH over the provided primitive bounds.
///
/// Returns the node array and the permutation of `[0, N)` giving the
/// primitive order referenced by the leaves. The build is deterministic:
/// equal centroids tie-break on the input index, and equal split costs take
/// the smallest `(axis, position)`
pub fn build( boxes : &[Aabb], params : &BuildParams ) -> (Bvh, Vec< u32 >) {
  let num_leaves = boxes.len( );

  if num_leaves == 0 {
    info!( "Skipped empty BVH generation" );
    return (Bvh::empty( ), Vec::new( ));
  }

  let mut params = *params;
  params.max_leaf_size = params.max_leaf_size.max( 1 ).min( u16::MAX as u32 );

  let mut overall = Aabb::empty( );
  for b in boxes {
    overall = overall.join( b );
  }

  info!( "BVH statistics: num leaves = {}, overall box = [{}, {}, {}], [{}, {}, {}]"
       , num_leaves
       , overall.min.x, overall.min.y, overall.min.z
       , overall.max.x, overall.max.y, overall.max.z );

  let mut builder = Builder {
    boxes
  , params
  , nodes:                vec![ Node::new( ); 2 * num_leaves - 1 ]
  , num_generated_nodes:  1
  , num_generated_leaves: 0
  , leaves_order:         Vec::with_capacity( num_leaves )
  };

  let root_work = WorkSet {
    aabb:      overall
  , indices:   ( 0..num_leaves as u32 ).collect( )
  , sorted_by: None
  , depth:     0
  };

  let timer = Instant::now( );
  let mut context = Context::new( num_leaves );
  builder.build_node( root_work, &mut context, 0 );

  debug_assert_eq!( builder.num_generated_leaves as usize, num_leaves );
  debug_assert!( ( builder.num_generated_nodes as usize ) < 2 * num_leaves || num_leaves == 1 );

  let num_nodes = builder.num_generated_nodes as usize;
  let mut nodes = builder.nodes;
  nodes.truncate( num_nodes );
  nodes.shrink_to_fit( );

  info!( "Finished BVH generation in {:.3} ms (num nodes = {})"
       , timer.elapsed( ).as_secs_f64( ) * 1000.0, num_nodes );

  (Bvh { nodes }, builder.leaves_order)
}

impl< 'a > Builder< 'a > {
  fn generate_leaf( &mut self, work : &WorkSet, target : usize ) {
    self.nodes[ target ].num_leaves = work.indices.len( ) as u16;
    self.nodes[ target ].child_index = self.num_generated_leaves;

    self.leaves_order.extend_from_slice( &work.indices );
    self.num_generated_leaves += work.indices.len( ) as u32;
  }

  fn build_node( &mut self, work : WorkSet, context : &mut Context, target : usize ) {
    debug_assert!( !work.indices.is_empty( ) );
    debug_assert!( work.depth <= Bvh::MAX_DEPTH );

    self.nodes[ target ].set_aabb( &work.aabb );

    let n = work.indices.len( );
    if n <= self.params.max_leaf_size as usize {
      self.generate_leaf( &work, target );
      return;
    }

    self.sort_leaves( &work, context );

    let (best_axis, best_split) = if work.depth >= MEDIAN_SPLIT_DEPTH {
      self.find_median_split( &work )
    } else {
      self.find_best_split( n, context )
    };

    // Recompute the winning child boxes; the per-axis caches were
    // overwritten while scanning the remaining axes
    let sorted = &context.sorted[ best_axis as usize ];
    let left_count = best_split + 1;

    let mut left_aabb = Aabb::empty( );
    for i in 0..left_count {
      left_aabb = left_aabb.join( &self.boxes[ sorted[ i ] as usize ] );
    }
    let mut right_aabb = Aabb::empty( );
    for i in left_count..n {
      right_aabb = right_aabb.join( &self.boxes[ sorted[ i ] as usize ] );
    }

    let left_indices : Vec< u32 > = sorted[ ..left_count ].to_vec( );
    let right_indices : Vec< u32 > = sorted[ left_count.. ].to_vec( );

    let left_node_index = self.num_generated_nodes as usize;
    self.num_generated_nodes += 2;

    self.nodes[ target ].child_index = left_node_index as u32;
    self.nodes[ target ].num_leaves = 0;
    self.nodes[ target ].split_axis = best_axis;

    self.build_node(
      WorkSet {
        aabb:      left_aabb
      , indices:   left_indices
      , sorted_by: Some( best_axis )
      , depth:     work.depth + 1
      }
    , context
    , left_node_index
    );

    self.build_node(
      WorkSet {
        aabb:      right_aabb
      , indices:   right_indices
      , sorted_by: Some( best_axis )
      , depth:     work.depth + 1
      }
    , context
    , left_node_index + 1
    );
  }

  /// Full SAH: every split position on every axis is costed with the cached
  /// prefix/suffix boxes. Smallest `(axis, position)` wins on cost ties
  fn find_best_split( &self, n : usize, context : &mut Context ) -> (u8, usize) {
    let mut best_axis = 0;
    let mut best_split = 0;
    let mut best_cost = f32::MAX;

    let Context { left_boxes, right_boxes, sorted: sorted_all } = context;

    for axis in 0..3_u8 {
      let sorted = &sorted_all[ axis as usize ];

      // Left child box for every split position
      let mut acc = Aabb::empty( );
      for i in 0..n {
        acc = acc.join( &self.boxes[ sorted[ i ] as usize ] );
        left_boxes[ i ] = acc;
      }

      // Right child box for every split position
      let mut acc = Aabb::empty( );
      for i in ( 0..n ).rev( ) {
        acc = acc.join( &self.boxes[ sorted[ i ] as usize ] );
        right_boxes[ i ] = acc;
      }

      for split_pos in 0..n - 1 {
        let left_measure = self.measure( &left_boxes[ split_pos ] );
        let right_measure = self.measure( &right_boxes[ split_pos + 1 ] );
        let left_count = ( split_pos + 1 ) as f32;
        let right_count = ( n - split_pos - 1 ) as f32;

        let cost = left_measure * left_count + right_measure * right_count;
        if cost < best_cost {
          best_cost = cost;
          best_axis = axis;
          best_split = split_pos;
        }
      }
    }

    (best_axis, best_split)
  }

  /// Balanced split along the longest axis of the working set
  fn find_median_split( &self, work : &WorkSet ) -> (u8, usize) {
    let size = work.aabb.max - work.aabb.min;
    let axis = if size.x >= size.y && size.x >= size.z {
      0
    } else if size.y >= size.z {
      1
    } else {
      2
    };
    (axis, work.indices.len( ) / 2 - 1)
  }

  fn measure( &self, aabb : &Aabb ) -> f32 {
    match self.params.heuristic {
      SplitHeuristic::SurfaceArea => aabb.surface_area( ),
      SplitHeuristic::Volume => aabb.volume( )
    }
  }

  /// Fills the per-axis sorted index caches. The axis the parent already
  /// sorted on is copied verbatim
  fn sort_leaves( &self, work : &WorkSet, context : &mut Context ) {
    for axis in 0..3_u8 {
      let indices = &mut context.sorted[ axis as usize ];
      indices.clear( );
      indices.extend_from_slice( &work.indices );

      if work.sorted_by == Some( axis ) {
        continue;
      }

      let boxes = self.boxes;
      indices.sort_by( |&a, &b| {
        let box_a = &boxes[ a as usize ];
        let box_b = &boxes[ b as usize ];
        let center_a = box_a.min.axis( axis as usize ) + box_a.max.axis( axis as usize );
        let center_b = box_b.min.axis( axis as usize ) + box_b.max.axis( axis as usize );
        center_a
          .partial_cmp( &center_b )
          .unwrap_or( Ordering::Equal )
          .then( a.cmp( &b ) )
      } );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{build, BuildParams};
  use crate::bvh::Bvh;
  use crate::geometry::Aabb;
  use crate::math::Vec3;
  use crate::rng::Rng;

  fn random_boxes( n : usize, seed : u32 ) -> Vec< Aabb > {
    let mut rng = Rng::new( seed );
    ( 0..n ).map( |_| {
      let c = Vec3::new( rng.next( ), rng.next( ), rng.next( ) );
      let s = Vec3::new( rng.next( ), rng.next( ), rng.next( ) ) * 0.01;
      Aabb::new( c - s, c + s )
    } ).collect( )
  }

  /// Checks the §8 well-formedness invariants on every node
  fn assert_well_formed( bvh : &Bvh, boxes : &[Aabb], order : &[u32] ) {
    let mut num_covered = 0;
    for node in &bvh.nodes {
      let node_aabb = node.aabb( );
      if node.is_leaf( ) {
        for i in 0..node.num_leaves as usize {
          let prim = order[ node.child_index as usize + i ] as usize;
          assert!( node_aabb.contains( &boxes[ prim ] ) );
        }
        num_covered += node.num_leaves as usize;
      } else {
        let left = bvh.nodes[ node.child_index as usize ].aabb( );
        let right = bvh.nodes[ node.child_index as usize + 1 ].aabb( );
        assert!( node_aabb.contains( &left.join( &right ) ) );
      }
    }
    assert_eq!( num_covered, boxes.len( ) );
  }

  #[test]
  fn empty_input_builds_empty_bvh( ) {
    let (bvh, order) = build( &[], &BuildParams::default( ) );
    assert!( bvh.nodes.is_empty( ) );
    assert!( order.is_empty( ) );
  }

  #[test]
  fn single_primitive_is_a_root_leaf( ) {
    let boxes = random_boxes( 1, 2 );
    let (bvh, order) = build( &boxes, &BuildParams::default( ) );
    assert_eq!( bvh.num_nodes( ), 1 );
    assert_eq!( bvh.nodes[ 0 ].num_leaves, 1 );
    assert_eq!( bvh.nodes[ 0 ].child_index, 0 );
    assert_eq!( order, vec![ 0 ] );
  }

  #[test]
  fn large_leaf_size_keeps_a_single_leaf( ) {
    let boxes = random_boxes( 7, 3 );
    let params = BuildParams { max_leaf_size: 16, ..Default::default( ) };
    let (bvh, order) = build( &boxes, &params );
    assert_eq!( bvh.num_nodes( ), 1 );
    assert_eq!( bvh.nodes[ 0 ].num_leaves, 7 );
    assert_eq!( order.len( ), 7 );
  }

  #[test]
  fn order_is_a_permutation( ) {
    let boxes = random_boxes( 500, 4 );
    let (_bvh, order) = build( &boxes, &BuildParams::default( ) );
    let mut seen = vec![ false; boxes.len( ) ];
    for &i in &order {
      assert!( !seen[ i as usize ] );
      seen[ i as usize ] = true;
    }
    assert!( seen.iter( ).all( |&s| s ) );
  }

  #[test]
  fn tree_is_well_formed( ) {
    let boxes = random_boxes( 1_000, 5 );
    let (bvh, order) = build( &boxes, &BuildParams::default( ) );
    assert_well_formed( &bvh, &boxes, &order );
  }

  #[test]
  fn rebuild_is_deterministic( ) {
    let boxes = random_boxes( 300, 6 );
    let (a, order_a) = build( &boxes, &BuildParams::default( ) );
    let (b, order_b) = build( &boxes, &BuildParams::default( ) );
    assert_eq!( a.nodes, b.nodes );
    assert_eq!( order_a, order_b );
  }

  #[test]
  fn identical_centroids_terminate( ) {
    // Every box has the same center; split costs tie everywhere
    let boxes = vec![ Aabb::new( Vec3::ZERO, Vec3::ONE ); 64 ];
    let (bvh, order) = build( &boxes, &BuildParams::default( ) );
    assert_well_formed( &bvh, &boxes, &order );
  }

  #[test]
  fn depth_stays_bounded( ) {
    let boxes = random_boxes( 50_000, 7 );
    let (bvh, _order) = build( &boxes, &BuildParams::default( ) );
    let stats = bvh.calculate_stats( );
    assert!( stats.max_depth <= Bvh::MAX_DEPTH );
    let total : u32 = stats
      .leaves_count_histogram
      .iter( )
      .enumerate( )
      .map( |(size, count)| size as u32 * count )
      .sum( );
    assert_eq!( total, 50_000 );
  }

  #[test]
  #[ignore] // stress test; takes a while in debug builds
  fn depth_stays_bounded_for_a_million_primitives( ) {
    let boxes = random_boxes( 1_000_000, 8 );
    let (bvh, _order) = build( &boxes, &BuildParams::default( ) );
    let stats = bvh.calculate_stats( );
    assert!( stats.max_depth <= Bvh::MAX_DEPTH );
    let total : u32 = stats
      .leaves_count_histogram
      .iter( )
      .enumerate( )
      .map( |(size, count)| size as u32 * count )
      .sum( );
    assert_eq!( total, 1_000_000 );
  }
}

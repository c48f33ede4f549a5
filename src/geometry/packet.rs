// Local imports
use crate::geometry::ray::Ray8;
use crate::math::{Float8, Vec3x8};

/// Rays per SIMD group within a packet
pub const RAYS_PER_GROUP : usize = 8;

/// Position on the image plane a ray group writes its results to
#[derive(Copy,Clone)]
pub struct ImageLocation {
  pub x : u16,
  pub y : u16
}

/// 8 rays of a packet, with their traversal state
///
/// `max_distances` doubles as the current-best hit distance per ray, so a
/// group shrinks its own search interval as leaves are intersected.
/// `ray_offsets` map each lane to its position in the packet's flat ray
/// order, so leaf intersectors can write results regardless of regrouping
#[derive(Copy,Clone)]
pub struct RayGroup {
  pub rays          : Ray8,
  pub max_distances : Float8,
  pub weights       : Vec3x8,
  pub ray_offsets   : [u32; RAYS_PER_GROUP]
}

/// A flat list of ray groups traversed together through a BVH
///
/// Packets exist to amortize node fetches: one node is read once and tested
/// against every group that is still active at it. The per-ray results at
/// exit are identical to what each ray would get when traversed alone
pub struct RayPacket {
  pub groups    : Vec< RayGroup >,
  pub locations : Vec< ImageLocation >
}

impl RayPacket {
  pub fn new( ) -> RayPacket {
    RayPacket { groups: Vec::new( ), locations: Vec::new( ) }
  }

  /// Drops all rays; capacity is kept for the next tile
  pub fn clear( &mut self ) {
    self.groups.clear( );
    self.locations.clear( );
  }

  pub fn num_groups( &self ) -> usize {
    self.groups.len( )
  }

  pub fn num_rays( &self ) -> usize {
    self.groups.len( ) * RAYS_PER_GROUP
  }

  /// Appends a group of 8 rays writing to the given image location
  pub fn push_rays( &mut self, rays : Ray8, weights : Vec3x8, location : ImageLocation ) {
    let base = self.num_rays( ) as u32;
    let mut ray_offsets = [0; RAYS_PER_GROUP];
    for i in 0..RAYS_PER_GROUP {
      ray_offsets[ i ] = base + i as u32;
    }

    self.groups.push( RayGroup {
      rays
    , max_distances: Float8::splat( f32::MAX )
    , weights
    , ray_offsets
    } );
    self.locations.push( location );
  }
}

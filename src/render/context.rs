// Local imports
use crate::geometry::{HitPoint, HitPoint8, RayPacket};
use crate::material::bsdf::BsdfEvent;
use crate::math::{clamp, Vec3};
use crate::render::counters::{LocalCounters, RayTracingCounters};
use crate::rng::Rng;
use crate::spectrum::Wavelength;

/// How primary rays are pushed through the scene
#[derive(Copy,Clone,Debug,PartialEq)]
pub enum TraversalMode {
  /// One ray at a time
  Single,
  /// 8 jittered rays per pixel, traversed together
  Simd,
  /// One ray packet per tile
  Packet
}

/// What the viewport writes into the framebuffer
#[derive(Copy,Clone,Debug,PartialEq)]
pub enum RenderingMode {
  Regular,

  // geometry
  Depth,
  Normals,
  TexCoords,

  // material
  BaseColor,

  // stats
  RayBoxIntersection,
  RayBoxIntersectionPassed,
  RayTriIntersection,
  RayTriIntersectionPassed
}

#[derive(Copy,Clone,Debug)]
pub struct RenderingParams {
  /// Longest path traced, in [1, 64]
  pub max_ray_depth             : u32,
  /// First depth at which Russian roulette may kill a path, in [1, 64]
  pub min_russian_roulette_depth : u32,
  /// Samples added per pixel per `render(..)` call, in [1, 64]
  pub samples_per_pixel         : u32,
  /// Gaussian anti-aliasing jitter scale, in [0, 3].
  /// 1.0 is most optimal; larger values blur the image
  pub anti_aliasing_spread      : f32,
  /// Scales the per-ray shutter time, in [0, 1]; 0 freezes the scene
  pub motion_blur_strength      : f32,
  /// Tiles are squares of side `1 << tile_order`, order in [0, 8]
  pub tile_order                : u32,
  pub traversal_mode            : TraversalMode,
  pub rendering_mode            : RenderingMode,
  /// Next-event estimation switch. Off, lights are only found by BSDF
  /// sampling (delta lights then contribute nothing)
  pub sample_lights             : bool
}

impl Default for RenderingParams {
  fn default( ) -> RenderingParams {
    RenderingParams {
      max_ray_depth:             8
    , min_russian_roulette_depth: 5
    , samples_per_pixel:         1
    // Blur a little bit; real images are not perfectly sharp
    , anti_aliasing_spread:      1.5
    , motion_blur_strength:      0.0
    , tile_order:                4
    , traversal_mode:            TraversalMode::Single
    , rendering_mode:            RenderingMode::Regular
    , sample_lights:             true
    }
  }
}

impl RenderingParams {
  /// A copy with every field forced into its documented range
  pub fn clamped( &self ) -> RenderingParams {
    RenderingParams {
      max_ray_depth:             self.max_ray_depth.max( 1 ).min( 64 )
    , min_russian_roulette_depth: self.min_russian_roulette_depth.max( 1 ).min( 64 )
    , samples_per_pixel:         self.samples_per_pixel.max( 1 ).min( 64 )
    , anti_aliasing_spread:      clamp( self.anti_aliasing_spread, 0.0, 3.0 )
    , motion_blur_strength:      clamp( self.motion_blur_strength, 0.0, 1.0 )
    , tile_order:                self.tile_order.min( 8 )
    , traversal_mode:            self.traversal_mode
    , rendering_mode:            self.rendering_mode
    , sample_lights:             self.sample_lights
    }
  }
}

/// Why a traced path ended
#[derive(Copy,Clone,Debug,PartialEq)]
pub enum PathTerminationReason {
  None,
  HitBackground,
  HitLight,
  Depth,
  RussianRoulette,
  Throughput,
  NoSampledEvent
}

/// One bounce of a debugged path
#[derive(Copy,Clone)]
pub struct PathDebugEntry {
  pub ray_origin     : Vec3,
  pub ray_dir        : Vec3,
  pub hit            : HitPoint,
  pub throughput_max : f32,
  pub bsdf_event     : BsdfEvent
}

/// A full record of one path, collected when debugging is switched on in
/// the rendering context
pub struct PathDebugData {
  pub entries            : Vec< PathDebugEntry >,
  pub termination_reason : PathTerminationReason
}

impl PathDebugData {
  pub fn new( ) -> PathDebugData {
    PathDebugData {
      entries:            Vec::new( )
    , termination_reason: PathTerminationReason::None
    }
  }
}

/// Per-worker mutable state: the RNG, counters, the current wavelength
/// sample, and preallocated traversal scratch. A hub for everything a
/// worker mutates, so the scene itself can stay read-only
pub struct RenderingContext {
  pub rng            : Rng,
  pub wavelength     : Wavelength,
  /// Shutter time of the ray being traced, in [0, 1)
  pub time           : f32,
  pub counters       : RayTracingCounters,
  pub local_counters : LocalCounters,

  // packet traversal scratch
  pub packet         : RayPacket,
  pub hit_points     : Vec< HitPoint8 >,
  pub active_scratch : Vec< u32 >,

  /// When set, the integrator records every bounce here
  pub path_debug     : Option< PathDebugData >
}

impl RenderingContext {
  pub fn new( seed : u32 ) -> RenderingContext {
    let mut rng = Rng::new( seed );
    let wavelength = Wavelength::randomize( &mut rng );
    RenderingContext {
      rng
    , wavelength
    , time:           0.0
    , counters:       RayTracingCounters::new( )
    , local_counters: LocalCounters::new( )
    , packet:         RayPacket::new( )
    , hit_points:     Vec::new( )
    , active_scratch: Vec::new( )
    , path_debug:     None
    }
  }
}

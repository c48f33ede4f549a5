// External imports
use log::info;
use rayon::prelude::*;
use std::sync::atomic;
use std::time::Instant;
// Local imports
use crate::camera::Camera;
use crate::error::Result;
use crate::geometry::{HitPoint, HitPoint8, ImageLocation, Ray};
use crate::math::{Float8, Vec2, Vec3, Vec3x8};
use crate::render::context::{RenderingContext, RenderingMode, RenderingParams, TraversalMode};
use crate::render::counters::RayTracingCounters;
use crate::render::framebuffer::Framebuffer;
use crate::scene::Scene;
use crate::spectrum::Wavelength;
use crate::tracer;

/// Morton order -> 2D coordinates; deinterleaves the bits
fn decode_morton( order : u32 ) -> (u32, u32) {
  fn compact( mut v : u32 ) -> u32 {
    v &= 0x5555_5555;
    v = ( v | ( v >> 1 ) ) & 0x3333_3333;
    v = ( v | ( v >> 2 ) ) & 0x0F0F_0F0F;
    v = ( v | ( v >> 4 ) ) & 0x00FF_00FF;
    ( v | ( v >> 8 ) ) & 0x0000_FFFF
  }
  ( compact( order ), compact( order >> 1 ) )
}

/// A raw view of the accumulator that tile jobs write through.
///
/// Safety rests on the tiling: every job owns a disjoint set of pixels, so
/// no two threads ever touch the same index during one render
struct SharedAccumulator {
  data  : *mut [f32; 4],
  width : u32
}

unsafe impl Sync for SharedAccumulator { }

impl SharedAccumulator {
  /// Caller must be the (only) job owning the tile containing `(x, y)`
  unsafe fn accumulate( &self, x : u32, y : u32, value : Vec3 ) {
    let p = &mut *self.data.add( ( y * self.width + x ) as usize );
    p[ 0 ] += value.x;
    p[ 1 ] += value.y;
    p[ 2 ] += value.z;
    p[ 3 ] += 1.0;
  }
}

/// Hands each worker thread its own `RenderingContext` slot, indexed by
/// the rayon thread index.
///
/// Safety: slot `i` is only ever touched by pool thread `i` (the extra
/// last slot belongs to a caller outside the pool), so the mutable
/// accesses never alias
struct PerThreadContexts {
  data : *mut RenderingContext,
  len  : usize
}

unsafe impl Sync for PerThreadContexts { }

impl PerThreadContexts {
  unsafe fn get( &self ) -> &mut RenderingContext {
    let index = rayon::current_thread_index( ).unwrap_or( self.len - 1 );
    &mut *self.data.add( index )
  }
}

/// The tiled viewport: a framebuffer plus the scheduler that fills it
///
/// `render(..)` splits the image into `1 << tile_order` sized tiles,
/// dispatches them to the worker pool, and blocks until every tile is
/// done. Repeated calls keep accumulating samples progressively
pub struct Viewport {
  framebuffer : Framebuffer,
  contexts    : Vec< RenderingContext >,
  counters    : RayTracingCounters
}

impl Viewport {
  pub fn new( width : u32, height : u32 ) -> Result< Viewport > {
    let framebuffer = Framebuffer::new( width, height )?;

    // One context per pool worker, one spare for a caller outside the pool
    let num_slots = rayon::current_num_threads( ) + 1;
    let contexts = ( 0..num_slots )
      .map( |i| RenderingContext::new( 0x5EED_0000 + i as u32 ) )
      .collect( );

    Ok( Viewport {
      framebuffer
    , contexts
    , counters: RayTracingCounters::new( )
    } )
  }

  pub fn resize( &mut self, width : u32, height : u32 ) -> Result< () > {
    if width == self.framebuffer.width( ) && height == self.framebuffer.height( ) {
      return Ok( () );
    }
    self.framebuffer = Framebuffer::new( width, height )?;
    Ok( () )
  }

  pub fn framebuffer( &self ) -> &Framebuffer {
    &self.framebuffer
  }

  pub fn counters( &self ) -> &RayTracingCounters {
    &self.counters
  }

  /// Clears the accumulator and the sample counter
  pub fn reset( &mut self ) {
    self.framebuffer.reset( );
  }

  /// Renders one pass of `samples_per_pixel` samples over the whole image.
  /// Blocks until every tile is finished
  pub fn render( &mut self, scene : &Scene, camera : &Camera, params : &RenderingParams ) -> Result< () > {
    let params = params.clamped( );
    let width = self.framebuffer.width( );
    let height = self.framebuffer.height( );

    for ctx in self.contexts.iter_mut( ) {
      ctx.counters.reset( );
    }

    let tile_size = 1_u32 << params.tile_order;
    let rows = 1 + ( height - 1 ) / tile_size;
    let columns = 1 + ( width - 1 ) / tile_size;
    let tiles : Vec< (u32, u32) > =
      ( 0..rows ).flat_map( |ty| ( 0..columns ).map( move |tx| (tx, ty) ) ).collect( );

    let accumulator = SharedAccumulator {
      data:  self.framebuffer.as_mut_ptr( )
    , width
    };
    let contexts = PerThreadContexts {
      data: self.contexts.as_mut_ptr( )
    , len:  self.contexts.len( )
    };

    let timer = Instant::now( );

    tiles.par_iter( ).for_each( |&(tx, ty)| {
      let ctx = unsafe { contexts.get( ) };
      render_tile(
        scene
      , camera
      , ctx
      , &accumulator
      , tx * tile_size
      , ty * tile_size
      , width
      , height
      , &params
      );
    } );

    // Fold the per-thread counters into the viewport totals
    self.counters.reset( );
    for ctx in self.contexts.iter( ) {
      self.counters.merge( &ctx.counters );
    }

    self.framebuffer.add_samples( params.samples_per_pixel );

    info!( "Rendered {}x{} (+{} spp) in {:.3} ms"
         , width, height, params.samples_per_pixel
         , timer.elapsed( ).as_secs_f64( ) * 1000.0 );
    Ok( () )
  }
}

/// Renders all pixels of one tile. Runs on a worker thread; writes only to
/// this tile's pixels
#[allow(clippy::too_many_arguments)]
fn render_tile( scene       : &Scene
              , camera      : &Camera
              , ctx         : &mut RenderingContext
              , accumulator : &SharedAccumulator
              , x0          : u32
              , y0          : u32
              , width       : u32
              , height      : u32
              , params      : &RenderingParams ) {
  let tile_size = 1_u32 << params.tile_order;
  let max_x = ( x0 + tile_size ).min( width );
  let max_y = ( y0 + tile_size ).min( height );
  let inv_width = 1.0 / width as f32;
  let inv_height = 1.0 / height as f32;
  let aspect_ratio = width as f32 / height as f32;

  match params.traversal_mode {
    TraversalMode::Single => {
      // Walk the tile along the Morton curve for cache locality
      for i in 0..tile_size * tile_size {
        let (local_x, local_y) = decode_morton( i );
        let x = x0 + local_x;
        let y = y0 + local_y;
        if x >= max_x || y >= max_y {
          continue;
        }

        for _s in 0..params.samples_per_pixel {
          ctx.wavelength = Wavelength::randomize( &mut ctx.rng );
          ctx.time = ctx.rng.next( ) * params.motion_blur_strength;

          let jitter = ctx.rng.next_gaussian2( ) * params.anti_aliasing_spread;
          let ndc = Vec2::new(
            ( x as f32 + 0.5 + jitter.x ) * inv_width
          , ( y as f32 + 0.5 + jitter.y ) * inv_height
          );
          let ray = camera.generate_ray( ndc, aspect_ratio, &mut ctx.rng );

          let value = if params.rendering_mode == RenderingMode::Regular {
            let radiance = tracer::trace_ray( scene, &ray, ctx, params );
            radiance.to_rgb( &ctx.wavelength )
          } else {
            let mut hit = HitPoint::no_hit( );
            ctx.local_counters.reset( );
            scene.traverse_single( &ray, &mut hit, ctx.time, &mut ctx.local_counters );
            let local = ctx.local_counters;
            ctx.counters.append( &local );
            debug_value( scene, &ray, &hit, ctx, params.rendering_mode )
          };

          unsafe {
            accumulator.accumulate( x, y, value );
          }
        }
        ctx.counters.num_primary_rays += params.samples_per_pixel as u64;
      }
    },

    TraversalMode::Simd => {
      for y in y0..max_y {
        for x in x0..max_x {
          for _s in 0..params.samples_per_pixel {
            ctx.wavelength = Wavelength::randomize( &mut ctx.rng );
            ctx.time = ctx.rng.next( ) * params.motion_blur_strength;

            let (ndc_x, ndc_y) = jittered_ndc8( ctx, x, y, inv_width, inv_height, params );
            let ray8 = camera.generate_ray8( ndc_x, ndc_y, aspect_ratio, &mut ctx.rng );

            let mut hit8 = HitPoint8::no_hit( );
            ctx.local_counters.reset( );
            scene.traverse_simd8( &ray8, &mut hit8, ctx.time, &mut ctx.local_counters );
            let local = ctx.local_counters;
            ctx.counters.append( &local );

            // Shade the 8 rays and fold them into one sample
            let mut sum = Vec3::ZERO;
            for lane in 0..8 {
              let ray = ray8.lane( lane );
              let hit = hit8.lane( lane );
              sum += if params.rendering_mode == RenderingMode::Regular {
                tracer::trace_ray_from_hit( scene, &ray, hit, ctx, params ).to_rgb( &ctx.wavelength )
              } else {
                debug_value( scene, &ray, &hit, ctx, params.rendering_mode )
              };
            }

            unsafe {
              accumulator.accumulate( x, y, sum * ( 1.0 / 8.0 ) );
            }
            ctx.counters.num_primary_rays += 8;
          }
        }
      }
    },

    TraversalMode::Packet => {
      for _s in 0..params.samples_per_pixel {
        // One packet covers the whole tile; the scene transforms are
        // sampled once per packet, so the shutter time is shared
        ctx.time = ctx.rng.next( ) * params.motion_blur_strength;

        ctx.packet.clear( );
        let mut wavelengths = Vec::with_capacity( ( ( max_x - x0 ) * ( max_y - y0 ) ) as usize );
        for y in y0..max_y {
          for x in x0..max_x {
            ctx.wavelength = Wavelength::randomize( &mut ctx.rng );
            wavelengths.push( ctx.wavelength );

            let (ndc_x, ndc_y) = jittered_ndc8( ctx, x, y, inv_width, inv_height, params );
            let ray8 = camera.generate_ray8( ndc_x, ndc_y, aspect_ratio, &mut ctx.rng );
            let weight = Vec3x8::splat( Vec3::splat( 1.0 / 8.0 ) );
            ctx.packet.push_rays( ray8, weight, ImageLocation { x: x as u16, y: y as u16 } );
          }
        }

        let num_groups = ctx.packet.num_groups( );
        ctx.hit_points.clear( );
        ctx.hit_points.resize( num_groups, HitPoint8::no_hit( ) );

        ctx.local_counters.reset( );
        let time = ctx.time;
        {
          let RenderingContext { packet, hit_points, active_scratch, local_counters, .. } = ctx;
          scene.traverse_packet( packet, hit_points, active_scratch, time, local_counters );
        }
        let local = ctx.local_counters;
        ctx.counters.append( &local );

        for g in 0..num_groups {
          // Copy out; shading borrows the whole context
          let group = ctx.packet.groups[ g ];
          let hits = ctx.hit_points[ g ];
          let location = ctx.packet.locations[ g ];
          ctx.wavelength = wavelengths[ g ];

          let mut sum = Vec3::ZERO;
          for lane in 0..8 {
            let ray = group.rays.lane( lane );
            let hit = hits.lane( lane );
            let value = if params.rendering_mode == RenderingMode::Regular {
              tracer::trace_ray_from_hit( scene, &ray, hit, ctx, params ).to_rgb( &ctx.wavelength )
            } else {
              debug_value( scene, &ray, &hit, ctx, params.rendering_mode )
            };
            sum += value.mul_elem( group.weights.lane( lane ) );
          }

          unsafe {
            accumulator.accumulate( location.x as u32, location.y as u32, sum );
          }
        }
        ctx.counters.num_primary_rays += 8 * num_groups as u64;
      }
    }
  }

  // Publish the accumulator writes before the render barrier falls
  atomic::fence( atomic::Ordering::SeqCst );
}

/// 8 jittered image-plane positions for one pixel
fn jittered_ndc8( ctx        : &mut RenderingContext
                , x          : u32
                , y          : u32
                , inv_width  : f32
                , inv_height : f32
                , params     : &RenderingParams ) -> (Float8, Float8) {
  let mut xs = [0.0; 8];
  let mut ys = [0.0; 8];
  for i in 0..8 {
    let jitter = ctx.rng.next_gaussian2( ) * params.anti_aliasing_spread;
    xs[ i ] = ( x as f32 + 0.5 + jitter.x ) * inv_width;
    ys[ i ] = ( y as f32 + 0.5 + jitter.y ) * inv_height;
  }
  ( Float8::new( xs ), Float8::new( ys ) )
}

/// The non-regular rendering modes: visualize geometry, material or
/// traversal-cost data of the primary hit
fn debug_value( scene : &Scene
              , ray   : &Ray
              , hit   : &HitPoint
              , ctx   : &RenderingContext
              , mode  : RenderingMode ) -> Vec3 {
  match mode {
    RenderingMode::Regular => Vec3::ZERO,
    RenderingMode::Depth => {
      if hit.is_hit( ) {
        Vec3::splat( hit.distance )
      } else {
        Vec3::ZERO
      }
    },
    RenderingMode::Normals => {
      if hit.is_hit( ) && hit.sub_object_id != crate::geometry::LIGHT_OBJECT {
        let shading = scene.extract_shading_data( ray, hit, ctx.time );
        shading.normal * 0.5 + Vec3::splat( 0.5 )
      } else {
        Vec3::ZERO
      }
    },
    RenderingMode::TexCoords => {
      if hit.is_hit( ) && hit.sub_object_id != crate::geometry::LIGHT_OBJECT {
        let shading = scene.extract_shading_data( ray, hit, ctx.time );
        Vec3::new( shading.tex_coord.x.fract( ).abs( ), shading.tex_coord.y.fract( ).abs( ), 0.0 )
      } else {
        Vec3::ZERO
      }
    },
    RenderingMode::BaseColor => {
      if hit.is_hit( ) && hit.sub_object_id != crate::geometry::LIGHT_OBJECT {
        let shading = scene.extract_shading_data( ray, hit, ctx.time );
        shading.material.base_color.evaluate( shading.tex_coord )
      } else {
        Vec3::ZERO
      }
    },
    RenderingMode::RayBoxIntersection =>
      Vec3::splat( ctx.local_counters.num_ray_box_tests as f32 ),
    RenderingMode::RayBoxIntersectionPassed =>
      Vec3::splat( ctx.local_counters.num_passed_ray_box_tests as f32 ),
    RenderingMode::RayTriIntersection =>
      Vec3::splat( ctx.local_counters.num_ray_triangle_tests as f32 ),
    RenderingMode::RayTriIntersectionPassed =>
      Vec3::splat( ctx.local_counters.num_passed_ray_triangle_tests as f32 )
  }
}

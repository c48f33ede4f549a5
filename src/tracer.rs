// The unidirectional path tracer: next-event estimation at every diffuse
// or glossy bounce, combined with BSDF sampling through the power
// heuristic. Delta events (mirrors, refraction, point lights) skip MIS.

// Local imports
use crate::geometry::{HitPoint, Ray};
use crate::lights::{BackgroundLight, Illumination, Light};
use crate::material::bsdf::BsdfEvent;
use crate::material::ShadingData;
use crate::math::{Vec3, EPSILON};
use crate::render::{PathDebugEntry, PathTerminationReason, RenderingContext, RenderingParams};
use crate::scene::Scene;
use crate::spectrum::Spectrum;

/// Power heuristic (beta = 2) weight for the sampling technique with
/// probability `sample_pdf`, against the competing `other_pdf`
fn power_heuristic( sample_pdf : f32, other_pdf : f32 ) -> f32 {
  let s = sample_pdf * sample_pdf;
  let o = other_pdf * other_pdf;
  s / ( s + o )
}

/// Turns an area probability at a surface `distance` away into a
/// solid-angle probability at the receiving point
fn pdf_a_to_w( pdf_a : f32, distance : f32, cos_there : f32 ) -> f32 {
  pdf_a * distance * distance / cos_there.abs( ).max( 1.0e-20 )
}

/// What NEE may sample: a scene light, or the background
enum LightRef< 'a > {
  Scene( &'a Light ),
  Background( &'a BackgroundLight )
}

impl< 'a > LightRef< 'a > {
  fn illuminate( &self, shading : &ShadingData, ctx : &mut RenderingContext ) -> Option< Illumination > {
    match self {
      LightRef::Scene( light ) =>
        light.illuminate( shading.position, &ctx.wavelength, &mut ctx.rng ),
      LightRef::Background( bg ) =>
        Some( bg.illuminate( &ctx.wavelength, &mut ctx.rng ) )
    }
  }

  fn is_delta( &self ) -> bool {
    match self {
      LightRef::Scene( light ) => light.is_delta( ),
      LightRef::Background( _ ) => false
    }
  }
}

/// Direct lighting of one light at one surface point (next-event
/// estimation)
fn sample_light( scene   : &Scene
               , light   : &LightRef
               , shading : &ShadingData
               , ctx     : &mut RenderingContext
               ) -> Spectrum {
  let illumination = match light.illuminate( shading, ctx ) {
    Some( i ) => i,
    None => return Spectrum::zero( )
  };

  if illumination.radiance.almost_zero( ) || illumination.direct_pdf_w <= 0.0 {
    return Spectrum::zero( );
  }

  // The BSDF's answer for that direction
  let (factor, bsdf_pdf_w) =
    shading.material.evaluate( &ctx.wavelength, shading, illumination.direction_to_light );
  if factor.almost_zero( ) {
    return Spectrum::zero( );
  }

  // Cast the shadow ray, stopping just short of the light surface
  let shadow_ray = Ray::new(
    shading.position + illumination.direction_to_light * EPSILON
  , illumination.direction_to_light
  );
  let mut shadow_hit = HitPoint::no_hit( );
  shadow_hit.distance = illumination.distance - EPSILON;
  if scene.traverse_shadow( &shadow_ray, &mut shadow_hit, ctx.time, &mut ctx.local_counters ) {
    return Spectrum::zero( );
  }

  let weight = if light.is_delta( ) {
    1.0
  } else {
    power_heuristic( illumination.direct_pdf_w, bsdf_pdf_w )
  };

  illumination.radiance * factor * ( weight / illumination.direct_pdf_w )
}

/// Direct lighting summed over all scene lights plus the background
fn sample_lights( scene : &Scene, shading : &ShadingData, ctx : &mut RenderingContext ) -> Spectrum {
  let mut accumulated = Spectrum::zero( );

  for light in scene.lights( ) {
    accumulated += sample_light( scene, &LightRef::Scene( light ), shading, ctx );
  }
  if let Some( bg ) = scene.background_light( ) {
    accumulated += sample_light( scene, &LightRef::Background( bg ), shading, ctx );
  }

  accumulated
}

/// Traces a full path from the primary ray
pub fn trace_ray( scene  : &Scene
                , ray    : &Ray
                , ctx    : &mut RenderingContext
                , params : &RenderingParams
                ) -> Spectrum {
  let mut hit = HitPoint::no_hit( );
  ctx.local_counters.reset( );
  scene.traverse_single( ray, &mut hit, ctx.time, &mut ctx.local_counters );
  let local = ctx.local_counters;
  ctx.counters.append( &local );

  trace_ray_from_hit( scene, ray, hit, ctx, params )
}

/// Traces a path whose primary hit was already found (the SIMD and packet
/// front-ends run the first traversal in their wide modes, then shade each
/// ray through here)
pub fn trace_ray_from_hit( scene       : &Scene
                         , primary_ray : &Ray
                         , primary_hit : HitPoint
                         , ctx         : &mut RenderingContext
                         , params      : &RenderingParams
                         ) -> Spectrum {
  let mut result = Spectrum::zero( );
  let mut throughput = Spectrum::one( );
  let mut ray = *primary_ray;
  let mut hit = primary_hit;

  let mut depth = 0;
  let mut last_specular = true;
  let mut last_pdf_w = 1.0;
  let mut last_event = BsdfEvent::Null;
  let mut termination_reason;

  loop {
    if !hit.is_hit( ) {
      // The ray escaped the scene
      if let Some( bg ) = scene.background_light( ) {
        let (radiance, direct_pdf_w) = bg.radiance( &ctx.wavelength, ray.dir );
        if !radiance.almost_zero( ) {
          let weight = if last_specular || !params.sample_lights {
            1.0
          } else {
            power_heuristic( last_pdf_w, direct_pdf_w )
          };
          result += throughput * radiance * weight;
        }
      }
      termination_reason = PathTerminationReason::HitBackground;
      break;
    }

    if let Some( light ) = scene.light_for_hit( &hit ) {
      // The ray ran into a light surface
      let hit_pos = ray.at( hit.distance );
      if let Some( (radiance, direct_pdf_a, cos_at_light) ) =
          light.radiance( &ctx.wavelength, ray.dir, hit_pos ) {
        let weight = if last_specular || !params.sample_lights {
          1.0
        } else {
          let direct_pdf_w = pdf_a_to_w( direct_pdf_a, hit.distance, cos_at_light );
          power_heuristic( last_pdf_w, direct_pdf_w )
        };
        result += throughput * radiance * weight;
      }
      termination_reason = PathTerminationReason::HitLight;
      break;
    }

    let mut shading = scene.extract_shading_data( &ray, &hit, ctx.time );

    // Alpha-masked surface points do not exist; step through them
    if !shading.material.mask_value( shading.tex_coord ) {
      ray = Ray::new( shading.position + ray.dir * EPSILON, ray.dir );
      hit = HitPoint::no_hit( );
      ctx.local_counters.reset( );
      scene.traverse_single( &ray, &mut hit, ctx.time, &mut ctx.local_counters );
      let local = ctx.local_counters;
      ctx.counters.append( &local );
      continue;
    }

    shading.material.evaluate_shading_data( &ctx.wavelength, &mut shading );

    // Emission of the surface itself
    let emission = shading.material.emission.evaluate( shading.tex_coord );
    if emission != Vec3::ZERO {
      result += throughput * Spectrum::sample_rgb( &ctx.wavelength, emission );
    }

    // Next-event estimation
    if params.sample_lights {
      result += throughput * sample_lights( scene, &shading, ctx );
    }

    if depth >= params.max_ray_depth {
      termination_reason = PathTerminationReason::Depth;
      break;
    }

    // Russian roulette
    if depth >= params.min_russian_roulette_depth {
      let survive = throughput.max_value( ).min( 1.0 );
      if survive <= 0.0 || ctx.rng.next( ) > survive {
        termination_reason = PathTerminationReason::RussianRoulette;
        break;
      }
      throughput *= Spectrum::one( ) * ( 1.0 / survive );
    }

    // Continue the path through the BSDF
    let sample = shading.material.sample( &mut ctx.wavelength, &shading, &mut ctx.rng );
    if sample.event == BsdfEvent::Null {
      termination_reason = PathTerminationReason::NoSampledEvent;
      break;
    }
    if sample.color.almost_zero( ) || sample.pdf <= 0.0 {
      termination_reason = PathTerminationReason::Throughput;
      break;
    }

    throughput *= sample.color * ( 1.0 / sample.pdf );
    if throughput.almost_zero( ) {
      termination_reason = PathTerminationReason::Throughput;
      break;
    }

    last_specular = sample.event.is_delta( );
    last_pdf_w = sample.pdf;
    last_event = sample.event;

    ray = Ray::new( shading.position + sample.incoming_dir_world * EPSILON, sample.incoming_dir_world );
    depth += 1;

    if let Some( debug ) = &mut ctx.path_debug {
      debug.entries.push( PathDebugEntry {
        ray_origin:     ray.origin
      , ray_dir:        ray.dir
      , hit
      , throughput_max: throughput.max_value( )
      , bsdf_event:     last_event
      } );
    }

    hit = HitPoint::no_hit( );
    ctx.local_counters.reset( );
    scene.traverse_single( &ray, &mut hit, ctx.time, &mut ctx.local_counters );
    let local = ctx.local_counters;
    ctx.counters.append( &local );
  }

  if let Some( debug ) = &mut ctx.path_debug {
    debug.termination_reason = termination_reason;
  }

  debug_assert!( result.validate( ), "invalid radiance sample" );
  result
}

#[cfg(test)]
mod tests {
  use super::{power_heuristic, trace_ray};
  use crate::geometry::Ray;
  use crate::lights::BackgroundLight;
  use crate::math::Vec3;
  use crate::render::{RenderingContext, RenderingParams};
  use crate::scene::Scene;
  use crate::spectrum::Wavelength;

  #[test]
  fn power_heuristic_is_complementary( ) {
    let a = power_heuristic( 0.7, 0.2 );
    let b = power_heuristic( 0.2, 0.7 );
    assert!( ( a + b - 1.0 ).abs( ) < 1.0e-6 );
    assert!( a > b );
  }

  #[test]
  fn escaped_rays_return_the_background( ) {
    let scene = Scene::build(
      Vec::new( )
    , Vec::new( )
    , Some( BackgroundLight::new( Vec3::new( 100.0, 0.0, 0.0 ) ) )
    );
    let params = RenderingParams::default( );
    let mut ctx = RenderingContext::new( 7 );

    for _i in 0..100 {
      ctx.wavelength = Wavelength::randomize( &mut ctx.rng );
      let dir = Vec3::new(
        ctx.rng.next( ) - 0.5
      , ctx.rng.next( ) - 0.5
      , ctx.rng.next( ) - 0.5
      ).normalize( );
      let radiance = trace_ray( &scene, &Ray::new( Vec3::ZERO, dir ), &mut ctx, &params );
      let rgb = radiance.to_rgb( &ctx.wavelength );
      assert!( ( rgb.x - 100.0 ).abs( ) < 1.0e-3, "r = {}", rgb.x );
      assert!( rgb.y.abs( ) < 1.0e-4 );
      assert!( rgb.z.abs( ) < 1.0e-4 );
    }
  }
}

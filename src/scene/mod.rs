mod object;

pub use object::{box_normal, intersect_box, intersect_sphere, sphere_uv, SceneObject, Shape};

// External imports
use std::cell::RefCell;
use std::sync::Arc;
// Local imports
use crate::bvh::{
  build, traverse_packet, traverse_shadow, traverse_simd8, traverse_single, BuildParams, Bvh,
  LeafIntersector, Node,
};
use crate::geometry::{
  HitPoint, HitPoint8, Ray, Ray8, RayGroup, RayPacket, LIGHT_OBJECT,
};
use crate::lights::{BackgroundLight, Light};
use crate::material::{Material, ShadingData};
use crate::math::{Vec2, Vec3};
use crate::render::LocalCounters;

/// A frozen scene: objects under a top-level BVH, plus the light set
///
/// Everything here is immutable during rendering and shared read-only
/// across the worker threads. The top-level hierarchy is built over the
/// objects' whole-frame world bounds, so motion-blurred objects never
/// leave their nodes
pub struct Scene {
  objects          : Vec< SceneObject >,
  lights           : Vec< Light >,
  background       : Option< BackgroundLight >,
  default_material : Arc< Material >,
  bvh              : Bvh,
  object_order     : Vec< u32 >
}

impl Scene {
  pub fn build( objects    : Vec< SceneObject >
              , lights     : Vec< Light >
              , background : Option< BackgroundLight >
              ) -> Scene {
    let boxes : Vec< _ > = objects.iter( ).map( |o| o.world_aabb( &lights ) ).collect( );
    let (bvh, object_order) = build( &boxes, &BuildParams::default( ) );

    Scene {
      objects
    , lights
    , background
    , default_material: Arc::new( Material::new( "default" ) )
    , bvh
    , object_order
    }
  }

  pub fn objects( &self ) -> &[SceneObject] {
    &self.objects
  }

  pub fn lights( &self ) -> &[Light] {
    &self.lights
  }

  pub fn background_light( &self ) -> Option< &BackgroundLight > {
    self.background.as_ref( )
  }

  /// The light whose surface this hit landed on, if any
  pub fn light_for_hit( &self, hit : &HitPoint ) -> Option< &Light > {
    if hit.sub_object_id != LIGHT_OBJECT {
      return None;
    }
    match &self.objects[ hit.object_id as usize ].shape {
      Shape::Light( index ) => Some( &self.lights[ *index as usize ] ),
      _ => None
    }
  }

  /// Finds the nearest hit along the ray
  pub fn traverse_single( &self
                        , ray      : &Ray
                        , hit      : &mut HitPoint
                        , time     : f32
                        , counters : &mut LocalCounters ) {
    let traverser = SceneTraverser::new( self, time );
    traverse_single( &self.bvh, &traverser, 0, ray, hit, counters );
  }

  /// True iff anything occludes the ray within `hit.distance`
  pub fn traverse_shadow( &self
                        , ray      : &Ray
                        , hit      : &mut HitPoint
                        , time     : f32
                        , counters : &mut LocalCounters ) -> bool {
    let traverser = SceneTraverser::new( self, time );
    traverse_shadow( &self.bvh, &traverser, ray, hit, counters )
  }

  /// Finds the nearest hits of 8 coherent rays at once
  pub fn traverse_simd8( &self
                       , ray      : &Ray8
                       , hit      : &mut HitPoint8
                       , time     : f32
                       , counters : &mut LocalCounters ) {
    let traverser = SceneTraverser::new( self, time );
    traverse_simd8( &self.bvh, &traverser, 0, ray, hit, counters );
  }

  /// Finds the nearest hits for a whole ray packet
  pub fn traverse_packet( &self
                        , packet         : &mut RayPacket
                        , hits           : &mut [HitPoint8]
                        , active_scratch : &mut Vec< u32 >
                        , time           : f32
                        , counters       : &mut LocalCounters ) {
    let traverser = SceneTraverser::new( self, time );
    traverse_packet( &self.bvh, &traverser, 0, packet, hits, active_scratch, counters );
  }

  /// Builds the shading data for a hit: world position, the shading frame,
  /// texture coordinates and the material. The wavelength-dependent parts
  /// are filled in by `Material::evaluate_shading_data(..)` afterwards
  pub fn extract_shading_data( &self, ray : &Ray, hit : &HitPoint, time : f32 ) -> ShadingData {
    let object = &self.objects[ hit.object_id as usize ];
    let position = ray.at( hit.distance );

    let mut shading = match &object.shape {
      Shape::Mesh( mesh ) => {
        let mut shading = mesh.evaluate_shading_data( hit, &self.default_material );
        // Mesh attributes live in object space
        shading.normal = object.dir_to_world( shading.normal, time );
        shading.tangent = object.dir_to_world( shading.tangent, time );
        shading.bitangent = object.dir_to_world( shading.bitangent, time );
        shading
      },
      Shape::Sphere { material, .. } => {
        let local_normal = object.point_to_local( position, time ).normalize( );
        let mut shading = ShadingData::new( material );
        shading.normal = object.dir_to_world( local_normal, time );
        shading.tangent = shading.normal.any_perpendicular( );
        shading.bitangent = shading.tangent.cross( shading.normal );
        shading.tex_coord = sphere_uv( local_normal );
        shading
      },
      Shape::Box { half_size, material } => {
        let local_point = object.point_to_local( position, time );
        let local_normal = box_normal( local_point, *half_size );
        let mut shading = ShadingData::new( material );
        shading.normal = object.dir_to_world( local_normal, time );
        shading.tangent = shading.normal.any_perpendicular( );
        shading.bitangent = shading.tangent.cross( shading.normal );
        shading.tex_coord = box_uv( local_point, local_normal, *half_size );
        shading
      },
      Shape::Light( _ ) => {
        // Light hits are resolved through `light_for_hit(..)`, not shaded
        let mut shading = ShadingData::new( &self.default_material );
        shading.normal = -ray.dir;
        shading.tangent = shading.normal.any_perpendicular( );
        shading.bitangent = shading.tangent.cross( shading.normal );
        shading
      }
    };

    shading.position = position;
    shading.outgoing_dir_world = -ray.dir;
    shading.outgoing_dir_local = shading.world_to_local( -ray.dir );
    shading
  }
}

/// Per-face planar texture coordinates on a box surface
fn box_uv( point : Vec3, normal : Vec3, half_size : Vec3 ) -> Vec2 {
  let (u, v, hu, hv) = if normal.x != 0.0 {
    (point.z, point.y, half_size.z, half_size.y)
  } else if normal.y != 0.0 {
    (point.x, point.z, half_size.x, half_size.z)
  } else {
    (point.x, point.y, half_size.x, half_size.y)
  };
  Vec2::new( 0.5 + 0.5 * u / hu, 0.5 + 0.5 * v / hv )
}

/// Scratch used by the packet leaf: the local-space sub-packet handed to
/// mesh hierarchies, and the arena for their active-group lists
struct PacketLeafScratch {
  sub_packet : RayPacket,
  arena      : Vec< u32 >
}

/// Adapts the scene to the generic traversal skeleton: a "leaf" covers a
/// run of objects, and intersecting one means transforming the ray into
/// the object's space and running its own local traversal
struct SceneTraverser< 'a > {
  scene          : &'a Scene,
  time           : f32,
  packet_scratch : RefCell< PacketLeafScratch >
}

impl< 'a > SceneTraverser< 'a > {
  fn new( scene : &'a Scene, time : f32 ) -> SceneTraverser< 'a > {
    SceneTraverser {
      scene
    , time
    , packet_scratch: RefCell::new( PacketLeafScratch {
        sub_packet: RayPacket::new( )
      , arena:      Vec::new( )
      } )
    }
  }

  fn objects_of( &self, node : &Node ) -> impl Iterator< Item = u32 > + '_ {
    let start = node.child_index as usize;
    let end = start + node.num_leaves as usize;
    self.scene.object_order[ start..end ].iter( ).copied( )
  }
}

impl< 'a > LeafIntersector for SceneTraverser< 'a > {
  fn leaf_single( &self
                , ray       : &Ray
                , node      : &Node
                , _object_id : u32
                , hit       : &mut HitPoint
                , counters  : &mut LocalCounters ) {
    for object_index in self.objects_of( node ) {
      let object = &self.scene.objects[ object_index as usize ];
      match &object.shape {
        Shape::Mesh( mesh ) => {
          let local_ray = object.ray_to_local( ray, self.time );
          traverse_single( mesh.bvh( ), mesh.as_ref( ), object_index, &local_ray, hit, counters );
        },
        Shape::Sphere { radius, .. } => {
          let local_ray = object.ray_to_local( ray, self.time );
          if let Some( t ) = intersect_sphere( &local_ray, *radius ) {
            if t < hit.distance {
              hit.distance = t;
              hit.object_id = object_index;
              hit.sub_object_id = 0;
              hit.u = 0.0;
              hit.v = 0.0;
            }
          }
        },
        Shape::Box { half_size, .. } => {
          let local_ray = object.ray_to_local( ray, self.time );
          if let Some( t ) = intersect_box( &local_ray, *half_size ) {
            if t < hit.distance {
              hit.distance = t;
              hit.object_id = object_index;
              hit.sub_object_id = 0;
              hit.u = 0.0;
              hit.v = 0.0;
            }
          }
        },
        Shape::Light( index ) => {
          // Light surfaces live in world space
          if let Some( t ) = self.scene.lights[ *index as usize ].test_ray_hit( ray ) {
            if t < hit.distance {
              hit.distance = t;
              hit.object_id = object_index;
              hit.sub_object_id = LIGHT_OBJECT;
              hit.u = 0.0;
              hit.v = 0.0;
            }
          }
        }
      }
    }
  }

  fn leaf_shadow( &self
                , ray      : &Ray
                , node     : &Node
                , hit      : &mut HitPoint
                , counters : &mut LocalCounters ) -> bool {
    for object_index in self.objects_of( node ) {
      let object = &self.scene.objects[ object_index as usize ];
      let occluded = match &object.shape {
        Shape::Mesh( mesh ) => {
          let local_ray = object.ray_to_local( ray, self.time );
          traverse_shadow( mesh.bvh( ), mesh.as_ref( ), &local_ray, hit, counters )
        },
        Shape::Sphere { radius, .. } => {
          let local_ray = object.ray_to_local( ray, self.time );
          matches!( intersect_sphere( &local_ray, *radius ), Some( t ) if t < hit.distance )
        },
        Shape::Box { half_size, .. } => {
          let local_ray = object.ray_to_local( ray, self.time );
          matches!( intersect_box( &local_ray, *half_size ), Some( t ) if t < hit.distance )
        },
        Shape::Light( index ) => {
          matches!( self.scene.lights[ *index as usize ].test_ray_hit( ray ), Some( t ) if t < hit.distance )
        }
      };
      if occluded {
        return true;
      }
    }
    false
  }

  fn leaf_simd8( &self
               , ray       : &Ray8
               , node      : &Node
               , _object_id : u32
               , hit       : &mut HitPoint8
               , counters  : &mut LocalCounters ) {
    for object_index in self.objects_of( node ) {
      let object = &self.scene.objects[ object_index as usize ];
      match &object.shape {
        Shape::Mesh( mesh ) => {
          let local_ray = object.ray8_to_local( ray, self.time );
          traverse_simd8( mesh.bvh( ), mesh.as_ref( ), object_index, &local_ray, hit, counters );
        },
        _ => {
          // Analytic shapes go lane by lane; they are rare enough that a
          // SIMD path would not pay off
          let local_ray = object.ray8_to_local( ray, self.time );
          for lane in 0..8 {
            let scalar = local_ray.lane( lane );
            let world = ray.lane( lane );
            let mut lane_hit = HitPoint {
              distance:      hit.distance.lane( lane )
            , u:             hit.u.lane( lane )
            , v:             hit.v.lane( lane )
            , object_id:     hit.object_id[ lane ]
            , sub_object_id: hit.sub_object_id[ lane ]
            };
            self.intersect_shape_single( object, object_index, &scalar, &world, &mut lane_hit );
            hit.distance.set_lane( lane, lane_hit.distance );
            hit.u.set_lane( lane, lane_hit.u );
            hit.v.set_lane( lane, lane_hit.v );
            hit.object_id[ lane ] = lane_hit.object_id;
            hit.sub_object_id[ lane ] = lane_hit.sub_object_id;
          }
        }
      }
    }
  }

  fn leaf_packet( &self
                , node      : &Node
                , _object_id : u32
                , packet    : &mut RayPacket
                , active    : &[u32]
                , hits      : &mut [HitPoint8]
                , counters  : &mut LocalCounters ) {
    for object_index in self.objects_of( node ) {
      let object = &self.scene.objects[ object_index as usize ];
      match &object.shape {
        Shape::Mesh( mesh ) => {
          let mut scratch = self.packet_scratch.borrow_mut( );
          let PacketLeafScratch { sub_packet, arena } = &mut *scratch;

          // Hand the mesh a local-space packet of just the active groups.
          // Ray offsets stay those of the original packet, so leaf writes
          // land in the caller's hit records directly
          sub_packet.clear( );
          for &group_index in active {
            let group = &packet.groups[ group_index as usize ];
            sub_packet.groups.push( RayGroup {
              rays:          object.ray8_to_local( &group.rays, self.time )
            , max_distances: group.max_distances
            , weights:       group.weights
            , ray_offsets:   group.ray_offsets
            } );
          }

          traverse_packet( mesh.bvh( ), mesh.as_ref( ), object_index, sub_packet, hits, arena, counters );

          // The groups shrank their search intervals; carry that back
          for (k, &group_index) in active.iter( ).enumerate( ) {
            packet.groups[ group_index as usize ].max_distances = sub_packet.groups[ k ].max_distances;
          }
        },
        _ => {
          for &group_index in active {
            let group_rays = packet.groups[ group_index as usize ].rays;
            let local_ray = object.ray8_to_local( &group_rays, self.time );
            for lane in 0..8 {
              let scalar = local_ray.lane( lane );
              let world = group_rays.lane( lane );
              let group = &packet.groups[ group_index as usize ];
              let ray_offset = group.ray_offsets[ lane ] as usize;
              let sub_offset = ray_offset % 8;
              let hit_group = ray_offset / 8;

              let mut lane_hit = HitPoint {
                distance:      group.max_distances.lane( lane )
              , u:             hits[ hit_group ].u.lane( sub_offset )
              , v:             hits[ hit_group ].v.lane( sub_offset )
              , object_id:     hits[ hit_group ].object_id[ sub_offset ]
              , sub_object_id: hits[ hit_group ].sub_object_id[ sub_offset ]
              };
              let before = lane_hit.distance;
              self.intersect_shape_single( object, object_index, &scalar, &world, &mut lane_hit );

              if lane_hit.distance < before {
                packet.groups[ group_index as usize ].max_distances.set_lane( lane, lane_hit.distance );
                let hit = &mut hits[ hit_group ];
                hit.distance.set_lane( sub_offset, lane_hit.distance );
                hit.u.set_lane( sub_offset, lane_hit.u );
                hit.v.set_lane( sub_offset, lane_hit.v );
                hit.object_id[ sub_offset ] = lane_hit.object_id;
                hit.sub_object_id[ sub_offset ] = lane_hit.sub_object_id;
              }
            }
          }
        }
      }
    }
  }
}

impl< 'a > SceneTraverser< 'a > {
  /// Scalar intersection against one analytic shape, updating the hit
  /// record in place. `local_ray` is in object space, `world_ray` is the
  /// untransformed ray (light surfaces live in world space)
  fn intersect_shape_single( &self
                           , object       : &SceneObject
                           , object_index : u32
                           , local_ray    : &Ray
                           , world_ray    : &Ray
                           , hit          : &mut HitPoint ) {
    let result = match &object.shape {
      Shape::Sphere { radius, .. } => intersect_sphere( local_ray, *radius ).map( |t| (t, 0) ),
      Shape::Box { half_size, .. } => intersect_box( local_ray, *half_size ).map( |t| (t, 0) ),
      Shape::Light( index ) => self
        .scene
        .lights[ *index as usize ]
        .test_ray_hit( world_ray )
        .map( |t| (t, LIGHT_OBJECT) ),
      Shape::Mesh( _ ) => None
    };

    if let Some( (t, sub_object_id) ) = result {
      if t < hit.distance {
        hit.distance = t;
        hit.object_id = object_index;
        hit.sub_object_id = sub_object_id;
        hit.u = 0.0;
        hit.v = 0.0;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{Scene, SceneObject, Shape};
  use crate::geometry::{HitPoint, Ray, LIGHT_OBJECT};
  use crate::lights::Light;
  use crate::material::Material;
  use crate::math::{Quat, Vec3};
  use crate::render::LocalCounters;
  use std::sync::Arc;

  fn sphere_at( position : Vec3, radius : f32 ) -> SceneObject {
    let material = Arc::new( Material::diffuse( "gray", Vec3::splat( 0.5 ) ) );
    SceneObject::new( Shape::Sphere { radius, material } ).with_position( position )
  }

  #[test]
  fn nearest_object_wins( ) {
    let scene = Scene::build(
      vec![
        sphere_at( Vec3::new( 0.0, 0.0, 5.0 ), 1.0 )
      , sphere_at( Vec3::new( 0.0, 0.0, 9.0 ), 1.0 )
      ]
    , Vec::new( )
    , None
    );

    let ray = Ray::new( Vec3::ZERO, Vec3::new( 0.0, 0.0, 1.0 ) );
    let mut hit = HitPoint::no_hit( );
    let mut counters = LocalCounters::new( );
    scene.traverse_single( &ray, &mut hit, 0.0, &mut counters );

    assert!( hit.is_hit( ) );
    assert_eq!( hit.object_id, 0 );
    assert!( ( hit.distance - 4.0 ).abs( ) < 1.0e-4 );
  }

  #[test]
  fn empty_scene_reports_miss( ) {
    let scene = Scene::build( Vec::new( ), Vec::new( ), None );
    let ray = Ray::new( Vec3::ZERO, Vec3::new( 0.0, 0.0, 1.0 ) );
    let mut hit = HitPoint::no_hit( );
    let mut counters = LocalCounters::new( );
    scene.traverse_single( &ray, &mut hit, 0.0, &mut counters );
    assert!( !hit.is_hit( ) );
  }

  #[test]
  fn light_surface_is_hit_and_tagged( ) {
    let light = Light::area(
      Vec3::new( -1.0, 3.0, -1.0 )
    , Vec3::new( 0.0, 0.0, 2.0 )
    , Vec3::new( 2.0, 0.0, 0.0 )
    , Vec3::new( 10.0, 10.0, 10.0 )
    , false
    );
    let scene = Scene::build(
      vec![ SceneObject::new( Shape::Light( 0 ) ) ]
    , vec![ light ]
    , None
    );

    let ray = Ray::new( Vec3::ZERO, Vec3::new( 0.0, 1.0, 0.0 ) );
    let mut hit = HitPoint::no_hit( );
    let mut counters = LocalCounters::new( );
    scene.traverse_single( &ray, &mut hit, 0.0, &mut counters );

    assert!( hit.is_hit( ) );
    assert_eq!( hit.sub_object_id, LIGHT_OBJECT );
    assert!( scene.light_for_hit( &hit ).is_some( ) );
  }

  #[test]
  fn motion_blur_moves_the_hit( ) {
    let object = sphere_at( Vec3::new( 0.0, 0.0, 5.0 ), 1.0 )
      .with_velocity( Vec3::new( 4.0, 0.0, 0.0 ), Quat::IDENTITY );
    let scene = Scene::build( vec![ object ], Vec::new( ), None );

    let ray = Ray::new( Vec3::new( 4.0, 0.0, 0.0 ), Vec3::new( 0.0, 0.0, 1.0 ) );
    let mut counters = LocalCounters::new( );

    // At time 0 the sphere is at x=0; the ray at x=4 misses it
    let mut hit = HitPoint::no_hit( );
    scene.traverse_single( &ray, &mut hit, 0.0, &mut counters );
    assert!( !hit.is_hit( ) );

    // At time 1 it moved under the ray
    let mut hit = HitPoint::no_hit( );
    scene.traverse_single( &ray, &mut hit, 1.0, &mut counters );
    assert!( hit.is_hit( ) );
  }

  #[test]
  fn shading_data_has_an_orthonormal_frame( ) {
    let scene = Scene::build(
      vec![ sphere_at( Vec3::new( 0.0, 0.0, 5.0 ), 1.0 ) ]
    , Vec::new( )
    , None
    );
    let ray = Ray::new( Vec3::ZERO, Vec3::new( 0.0, 0.0, 1.0 ) );
    let mut hit = HitPoint::no_hit( );
    let mut counters = LocalCounters::new( );
    scene.traverse_single( &ray, &mut hit, 0.0, &mut counters );

    let shading = scene.extract_shading_data( &ray, &hit, 0.0 );
    assert!( shading.normal.dot( shading.tangent ).abs( ) < 1.0e-5 );
    assert!( shading.normal.dot( shading.bitangent ).abs( ) < 1.0e-5 );
    assert!( ( shading.normal.len( ) - 1.0 ).abs( ) < 1.0e-5 );
    // The normal faces the ray
    assert!( shading.normal.z < 0.0 );
    assert!( shading.outgoing_dir_local.z > 0.99 );
  }
}

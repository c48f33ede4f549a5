/// Intersection counters local to one traversal
///
/// Reset per primary ray, then folded into the per-thread totals, so the
/// debug rendering modes can visualize the cost of individual rays
#[derive(Clone,Copy,Default)]
pub struct LocalCounters {
  pub num_ray_box_tests             : u32,
  pub num_passed_ray_box_tests      : u32,
  pub num_ray_triangle_tests        : u32,
  pub num_passed_ray_triangle_tests : u32
}

impl LocalCounters {
  pub fn new( ) -> LocalCounters {
    LocalCounters::default( )
  }

  pub fn reset( &mut self ) {
    *self = LocalCounters::default( );
  }
}

/// Ray tracing statistics accumulated over a whole render
#[derive(Clone,Copy,Default)]
pub struct RayTracingCounters {
  pub num_primary_rays              : u64,
  pub num_ray_box_tests             : u64,
  pub num_passed_ray_box_tests      : u64,
  pub num_ray_triangle_tests        : u64,
  pub num_passed_ray_triangle_tests : u64
}

impl RayTracingCounters {
  pub fn new( ) -> RayTracingCounters {
    RayTracingCounters::default( )
  }

  pub fn reset( &mut self ) {
    *self = RayTracingCounters::default( );
  }

  /// Folds one traversal's local counters into the totals
  pub fn append( &mut self, local : &LocalCounters ) {
    self.num_ray_box_tests += local.num_ray_box_tests as u64;
    self.num_passed_ray_box_tests += local.num_passed_ray_box_tests as u64;
    self.num_ray_triangle_tests += local.num_ray_triangle_tests as u64;
    self.num_passed_ray_triangle_tests += local.num_passed_ray_triangle_tests as u64;
  }

  /// Merges the totals of another thread
  pub fn merge( &mut self, o : &RayTracingCounters ) {
    self.num_primary_rays += o.num_primary_rays;
    self.num_ray_box_tests += o.num_ray_box_tests;
    self.num_passed_ray_box_tests += o.num_passed_ray_box_tests;
    self.num_ray_triangle_tests += o.num_ray_triangle_tests;
    self.num_passed_ray_triangle_tests += o.num_passed_ray_triangle_tests;
  }
}

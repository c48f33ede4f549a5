mod context;
mod counters;
mod framebuffer;
mod viewport;

pub use context::{
  PathDebugData, PathDebugEntry, PathTerminationReason, RenderingContext, RenderingMode,
  RenderingParams, TraversalMode,
};
pub use counters::{LocalCounters, RayTracingCounters};
pub use framebuffer::Framebuffer;
pub use viewport::Viewport;

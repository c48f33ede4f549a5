// An offline CPU path tracer built around three things: an SAH-built BVH
// traversed in scalar, 8-wide SIMD and ray-packet modes; a hero-wavelength
// spectral radiance carrier; and a Morton-ordered tile scheduler feeding a
// progressive framebuffer.
//
// The crate is presentation-agnostic: hosts bring their own window, image
// codecs and mesh loaders, and talk to the core through `MeshDesc`, the
// `Texture` trait and the `Framebuffer`.

pub mod bvh;
pub mod camera;
pub mod error;
pub mod geometry;
pub mod lights;
pub mod material;
pub mod math;
pub mod mesh;
pub mod render;
pub mod rng;
pub mod scene;
pub mod spectrum;
pub mod texture;
pub mod tracer;

pub use camera::Camera;
pub use error::{Error, Result};
pub use render::{Framebuffer, RenderingMode, RenderingParams, TraversalMode, Viewport};
pub use scene::{Scene, SceneObject, Shape};

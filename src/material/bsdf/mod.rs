mod diffuse;
mod glossy;
mod specular;

pub use diffuse::OrenNayarBsdf;
pub use glossy::{f0_from_ior, schlick, Fresnel, MicrofacetBsdf};
pub use specular::{sellmeier, DispersionParams, SpecularTransmissiveBsdf};

// All BSDF math runs in the local frame of the hit point: X is the tangent,
// Z is the shading normal. Directions point away from the surface.

/// Lanes below this cosine count as grazing and are rejected
pub const COS_EPSILON : f32 = 1.0e-5;

/// What kind of scattering event a material sample produced
#[derive(Copy,Clone,Debug,PartialEq)]
pub enum BsdfEvent {
  Null,
  DiffuseReflection,
  GlossyReflection,
  SpecularReflection,
  SpecularRefraction
}

impl BsdfEvent {
  /// Delta events have a Dirac PDF; they are sampled, never evaluated,
  /// and skip multiple importance sampling
  pub fn is_delta( self ) -> bool {
    self == BsdfEvent::SpecularReflection || self == BsdfEvent::SpecularRefraction
  }
}

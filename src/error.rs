// External imports
use thiserror::Error;

pub type Result< T > = std::result::Result< T, Error >;

/// Errors surfaced by the builder, loader and cache paths.
///
/// The hot rendering path never produces errors; degenerate inputs there
/// yield a miss (zero radiance) instead. Objects that fail validation are
/// simply not registered with the scene
#[derive(Debug,Error)]
pub enum Error {
  /// Malformed caller data: an out-of-range geometry index, a zero-sized
  /// bitmap, an unknown BVH magic or version
  #[error( "invalid input: {0}" )]
  InvalidInput( String ),

  /// A file could not be opened, read or written. Callers may fall back
  /// (e.g. rebuild a BVH whose cache failed to load)
  #[error( "i/o failure: {0}" )]
  Io( #[from] std::io::Error ),

  /// A requested format or mode this build cannot handle
  #[error( "unsupported: {0}" )]
  Unsupported( String ),

  /// A broken internal invariant: a BVH depth overflow, a NaN radiance
  /// sample. Fatal; debug builds trap on these before they get here
  #[error( "invariant violation: {0}" )]
  InvariantViolation( String )
}

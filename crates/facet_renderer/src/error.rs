//! Error types for configuration and rendering.

use std::collections::TryReserveError;
use std::path::PathBuf;

use thiserror::Error;

use crate::MaterialId;

/// A render configuration that cannot be used.
///
/// Raised by [`crate::RenderConfig::validate`] before any tracing starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative radius (got {value})")]
    InvalidRadius { name: &'static str, value: f32 },

    #[error("epsilon must be finite and positive (got {0})")]
    InvalidEpsilon(f32),

    #[error("max_depth {requested} exceeds the recursion limit {limit}")]
    DepthTooLarge { requested: u32, limit: u32 },

    #[error("max_depth is 0 but max_gi_bounces is {0}; no bounce could ever be traced")]
    ZeroDepthWithBounces(u32),

    #[error("max_specular_bounces must be at least 1")]
    ZeroSpecularBounceCap,

    #[error("samples_per_pixel must be at least 1")]
    ZeroSamples,

    #[error("bucket_size must be at least 1")]
    ZeroBucketSize,

    #[error("cone kernel constant must be >= 1 (got {0})")]
    InvalidConeKernel(f32),

    #[error("gather_limit must be at least 1 when set")]
    ZeroGatherLimit,

    #[error("photon_count {requested} exceeds max_photons {limit}")]
    TooManyPhotons { requested: usize, limit: usize },

    #[error("Failed to read config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while preparing or evaluating a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Ray direction must be unit length (length {length})")]
    NonUnitDirection { length: f32 },

    #[error("Unknown material id {0}")]
    UnknownMaterial(MaterialId),

    #[error("Scene error: {0}")]
    Scene(#[from] facet_core::LoadError),

    #[error("Photon store capacity exceeded: {requested} photons requested, limit {limit}")]
    Capacity { requested: usize, limit: usize },

    #[error("Photon store allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("No photon maps were built; prepare the integrator in photon map mode")]
    MissingPhotonMap,
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

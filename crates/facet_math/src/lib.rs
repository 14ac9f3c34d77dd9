// Re-export glam for convenience
pub use glam::*;

// Facet math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;

/// Tolerance used when checking that a direction is unit length.
pub const UNIT_LENGTH_TOLERANCE: f32 = 1e-3;

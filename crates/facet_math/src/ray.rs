use crate::{Vec3, UNIT_LENGTH_TOLERANCE};

/// A ray in 3D space with an origin and a unit-length direction.
///
/// Every producer in Facet (camera, light sampler, bounce code) hands out
/// normalized directions. Consumers that need to enforce that contract call
/// [`Ray::is_unit`] rather than renormalizing silently.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is stored as given.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create a ray from an origin towards an arbitrary (non-zero) vector.
    pub fn towards(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction.normalize())
    }

    /// Spawn a secondary ray leaving `point` along `direction`.
    ///
    /// The origin is pushed `epsilon` along the direction so the new ray does
    /// not immediately re-hit the surface it leaves.
    pub fn spawn(point: Vec3, direction: Vec3, epsilon: f32) -> Self {
        Self::new(point + direction * epsilon, direction)
    }

    /// Get the origin point of the ray.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Get the direction vector of the ray.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Whether the direction is unit length within [`UNIT_LENGTH_TOLERANCE`].
    pub fn is_unit(&self) -> bool {
        (self.direction.length() - 1.0).abs() <= UNIT_LENGTH_TOLERANCE
    }
}

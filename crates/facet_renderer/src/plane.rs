//! Infinite plane primitive, used for floors and backdrops.

use crate::{
    hittable::{HitRecord, Hittable},
    MaterialId, Ray,
};
use facet_math::{Aabb, Interval, Vec3};

/// An infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone)]
pub struct Plane {
    point: Vec3,
    normal: Vec3,
    material: MaterialId,
}

impl Plane {
    /// Create a new plane. The normal is normalized.
    pub fn new(point: Vec3, normal: Vec3, material: MaterialId) -> Self {
        Self {
            point,
            normal: normal.normalize(),
            material,
        }
    }
}

impl Hittable for Plane {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let denom = self.normal.dot(ray.direction());
        if denom.abs() < 1e-8 {
            return false;
        }

        let t = (self.point - ray.origin()).dot(self.normal) / denom;
        if !ray_t.surrounds(t) {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, self.normal);
        rec.material = self.material;
        true
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::UNIVERSE
    }

    fn is_bounded(&self) -> bool {
        false
    }
}

//! Hittable trait and HitRecord for ray-object intersection.

use crate::{MaterialId, Ray};
use facet_math::{Aabb, Interval, Vec3};

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Material of the primitive that was hit
    pub material: MaterialId,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl HitRecord {
    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;

        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within the given interval.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;

    /// Whether the object has finite extent. Unbounded objects stay out of
    /// the BVH.
    fn is_bounded(&self) -> bool {
        true
    }
}

/// A list of hittable objects.
pub struct HittableList {
    objects: Vec<Box<dyn Hittable>>,
    bbox: Aabb,
}

impl HittableList {
    /// Create a new empty hittable list.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            bbox: Aabb::EMPTY,
        }
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: Box<dyn Hittable>) {
        self.bbox = self.bbox.union(&object.bounding_box());
        self.objects.push(object);
    }

    /// Get the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for HittableList {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest hit among `objects`, narrowing the range after every hit.
pub(crate) fn closest_hit(
    objects: &[Box<dyn Hittable>],
    ray: &Ray,
    ray_t: Interval,
    rec: &mut HitRecord,
) -> bool {
    let mut range = ray_t;
    let mut hit_anything = false;
    for object in objects {
        if object.hit(ray, range, rec) {
            hit_anything = true;
            range = range.with_max(rec.t);
        }
    }
    hit_anything
}

impl Hittable for HittableList {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        closest_hit(&self.objects, ray, ray_t, rec)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn is_bounded(&self) -> bool {
        self.objects.iter().all(|o| o.is_bounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sphere;

    #[test]
    fn test_hittable_list_returns_closest() {
        let mut list = HittableList::new();
        list.add(Box::new(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, MaterialId(0))));
        list.add(Box::new(Sphere::new(Vec3::new(0.0, 0.0, -2.0), 0.5, MaterialId(1))));
        assert_eq!(list.len(), 2);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut rec = HitRecord::default();
        assert!(list.hit(&ray, Interval::POSITIVE, &mut rec));
        assert_eq!(rec.material, MaterialId(1));
        assert!((rec.t - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_set_face_normal_back_face() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let mut rec = HitRecord::default();
        rec.set_face_normal(&ray, Vec3::Y);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, -Vec3::Y);
    }
}

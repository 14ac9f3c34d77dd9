//! Scene queries: nearest intersection plus material lookup.
//!
//! Primitives only carry a [`MaterialId`]. The [`Scene`] resolves it against
//! its material table, so a dangling id surfaces as an error at the query
//! site instead of a panic deep inside an estimator.

use std::fmt;

use facet_core::{Material, SceneDescription, Shape, SurfaceType};
use facet_math::{Interval, Ray, Vec3};

use crate::{Bvh, HitRecord, Hittable, HittableList, Plane, RenderError, RenderResult, Sphere};

/// Index into a scene's material table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved surface hit, as consumed by the estimators.
#[derive(Debug, Clone, Copy)]
pub struct Intersection<'a> {
    pub point: Vec3,
    /// Unit normal facing against the incoming ray
    pub normal: Vec3,
    /// Whether the ray arrived from the outside of the surface
    pub front_face: bool,
    /// Ray parameter of the hit
    pub t: f32,
    pub material: &'a Material,
    pub surface: SurfaceType,
}

/// Nearest-hit queries against immutable scene data.
///
/// Implementations must be deterministic for a fixed ray and safe to call
/// from many threads at once.
pub trait SceneQuery: Send + Sync {
    /// Nearest hit with ray parameter strictly inside `ray_t`.
    fn intersect_in(&self, ray: &Ray, ray_t: Interval) -> RenderResult<Option<Intersection<'_>>>;

    /// Nearest hit in front of the ray origin.
    fn intersect(&self, ray: &Ray) -> RenderResult<Option<Intersection<'_>>> {
        self.intersect_in(ray, Interval::POSITIVE)
    }
}

/// Geometry plus materials.
pub struct Scene {
    objects: HittableList,
    materials: Vec<Material>,
}

impl Scene {
    /// Build a scene. Bounded objects go into a BVH; unbounded ones (planes)
    /// are tested separately.
    pub fn new(materials: Vec<Material>, objects: Vec<Box<dyn Hittable>>) -> Self {
        let (bounded, unbounded): (Vec<_>, Vec<_>) =
            objects.into_iter().partition(|o| o.is_bounded());

        let mut list = HittableList::new();
        if !bounded.is_empty() {
            list.add(Box::new(Bvh::build(bounded)));
        }
        for object in unbounded {
            list.add(object);
        }

        log::debug!(
            "Scene built with {} materials, {} top-level objects",
            materials.len(),
            list.len()
        );

        Self {
            objects: list,
            materials,
        }
    }

    /// Build a scene from a loaded description.
    pub fn from_description(desc: &SceneDescription) -> RenderResult<Self> {
        desc.validate()?;

        let mut objects: Vec<Box<dyn Hittable>> = Vec::with_capacity(desc.shapes.len());
        for shape in &desc.shapes {
            let material = MaterialId(desc.material_index(shape.material())?);
            match shape {
                Shape::Sphere { center, radius, .. } => {
                    objects.push(Box::new(Sphere::new(*center, *radius, material)));
                }
                Shape::Plane { point, normal, .. } => {
                    objects.push(Box::new(Plane::new(*point, *normal, material)));
                }
            }
        }

        Ok(Self::new(desc.materials.clone(), objects))
    }

    /// Look up a material by id.
    pub fn material(&self, id: MaterialId) -> RenderResult<&Material> {
        self.materials
            .get(id.0)
            .ok_or(RenderError::UnknownMaterial(id))
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn resolve(&self, rec: &HitRecord) -> RenderResult<Intersection<'_>> {
        let material = self.material(rec.material)?;
        Ok(Intersection {
            point: rec.p,
            normal: rec.normal,
            front_face: rec.front_face,
            t: rec.t,
            material,
            surface: material.surface_type(),
        })
    }
}

impl SceneQuery for Scene {
    fn intersect_in(&self, ray: &Ray, ray_t: Interval) -> RenderResult<Option<Intersection<'_>>> {
        let mut rec = HitRecord::default();
        if !self.objects.hit(ray, ray_t, &mut rec) {
            return Ok(None);
        }
        self.resolve(&rec).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sphere_scene() -> Scene {
        let materials = vec![
            Material::diffuse("floor", Vec3::splat(0.5)),
            Material::mirror("chrome", 1.0),
        ];
        let objects: Vec<Box<dyn Hittable>> = vec![
            Box::new(Plane::new(Vec3::ZERO, Vec3::Y, MaterialId(0))),
            Box::new(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 0.5, MaterialId(1))),
        ];
        Scene::new(materials, objects)
    }

    #[test]
    fn test_intersect_resolves_material() {
        let scene = two_sphere_scene();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), -Vec3::Y);
        let hit = scene.intersect(&ray).unwrap().unwrap();
        assert_eq!(hit.material.name, "chrome");
        assert_eq!(hit.surface, SurfaceType::Specular);
        assert!((hit.point.y - 1.5).abs() < 1e-4);
    }

    #[test]
    fn test_intersect_plane_outside_bvh() {
        let scene = two_sphere_scene();
        let ray = Ray::new(Vec3::new(3.0, 5.0, 0.0), -Vec3::Y);
        let hit = scene.intersect(&ray).unwrap().unwrap();
        assert_eq!(hit.surface, SurfaceType::Diffuse);
        assert!(hit.point.y.abs() < 1e-5);
    }

    #[test]
    fn test_miss_is_not_an_error() {
        let scene = two_sphere_scene();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(scene.intersect(&ray).unwrap().is_none());
    }

    #[test]
    fn test_unknown_material_propagates() {
        let objects: Vec<Box<dyn Hittable>> =
            vec![Box::new(Sphere::new(Vec3::ZERO, 1.0, MaterialId(7)))];
        let scene = Scene::new(Vec::new(), objects);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
        assert!(matches!(
            scene.intersect(&ray),
            Err(RenderError::UnknownMaterial(MaterialId(7)))
        ));
    }

    #[test]
    fn test_intersect_in_limits_range() {
        let scene = two_sphere_scene();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), -Vec3::Y);
        // Sphere top is at t = 3.5; stop short of it.
        assert!(scene
            .intersect_in(&ray, Interval::new(0.0, 3.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_from_description() {
        let desc = SceneDescription::jewelry_demo();
        let scene = Scene::from_description(&desc).unwrap();
        assert_eq!(scene.materials().len(), desc.materials.len());
    }

    #[test]
    fn test_from_description_rejects_energy_gain() {
        let mut desc = SceneDescription::jewelry_demo();
        desc.materials[0].albedo = Vec3::new(-0.8, 0.5, 0.5);
        assert!(matches!(
            Scene::from_description(&desc),
            Err(RenderError::Scene(facet_core::LoadError::InvalidMaterial(_)))
        ));

        let mut desc = SceneDescription::jewelry_demo();
        desc.materials[1].reflectivity = 3.0;
        assert!(matches!(
            Scene::from_description(&desc),
            Err(RenderError::Scene(facet_core::LoadError::InvalidMaterial(_)))
        ));
    }
}

//! Scene description types and JSON loading.
//!
//! A scene file lists named materials, primitives that reference those
//! materials by name, point lights and a constant ambient term. Loading
//! validates every cross-reference up front so the renderer never sees a
//! dangling material name.

use std::collections::HashSet;
use std::path::Path;

use facet_math::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::material::{Material, OpticalParams};

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Shape references unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Material defined more than once: {0}")]
    DuplicateMaterial(String),

    #[error("Invalid material: {0}")]
    InvalidMaterial(String),

    #[error("Invalid primitive: {0}")]
    InvalidPrimitive(String),

    #[error("Invalid light: {0}")]
    InvalidLight(String),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A geometric primitive referencing a material by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Sphere {
        center: Vec3,
        radius: f32,
        material: String,
    },
    /// Infinite plane through `point` with the given normal.
    Plane {
        point: Vec3,
        normal: Vec3,
        material: String,
    },
}

impl Shape {
    /// Name of the material this shape uses.
    pub fn material(&self) -> &str {
        match self {
            Shape::Sphere { material, .. } | Shape::Plane { material, .. } => material,
        }
    }
}

/// An isotropic point light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    /// Normalized light color (linear RGB)
    pub color: Vec3,
    /// Total emitted power (watts)
    pub power: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, power: f32) -> Self {
        Self {
            position,
            color,
            power,
        }
    }

    /// Emitted power per color channel.
    pub fn flux(&self) -> Vec3 {
        self.color * self.power
    }
}

/// A complete scene as read from disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub materials: Vec<Material>,
    pub shapes: Vec<Shape>,
    pub lights: Vec<PointLight>,
    /// Constant ambient radiance added by the photon-map composition
    pub ambient: Vec3,
}

impl SceneDescription {
    /// Index of the material with the given name.
    pub fn material_index(&self, name: &str) -> LoadResult<usize> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| LoadError::UnknownMaterial(name.to_string()))
    }

    /// Check cross-references and primitive parameters.
    pub fn validate(&self) -> LoadResult<()> {
        let mut seen = HashSet::new();
        for material in &self.materials {
            if !seen.insert(material.name.as_str()) {
                return Err(LoadError::DuplicateMaterial(material.name.clone()));
            }
            material.check_ranges().map_err(|reason| {
                LoadError::InvalidMaterial(format!("{}: {}", material.name, reason))
            })?;
        }

        for shape in &self.shapes {
            self.material_index(shape.material())?;
            match shape {
                Shape::Sphere { radius, .. } if !(*radius > 0.0) => {
                    return Err(LoadError::InvalidPrimitive(format!(
                        "sphere radius must be positive, got {}",
                        radius
                    )));
                }
                Shape::Plane { normal, .. } if normal.length_squared() < 1e-12 => {
                    return Err(LoadError::InvalidPrimitive(
                        "plane normal must be non-zero".to_string(),
                    ));
                }
                _ => {}
            }
        }

        for light in &self.lights {
            if !(light.power >= 0.0) || light.color.min_element() < 0.0 {
                return Err(LoadError::InvalidLight(format!(
                    "light at {:?} has negative power or color",
                    light.position
                )));
            }
        }

        if !self.ambient.is_finite() || self.ambient.min_element() < 0.0 {
            return Err(LoadError::InvalidLight(format!(
                "ambient {:?} must be finite and non-negative",
                self.ambient
            )));
        }

        Ok(())
    }
}

impl SceneDescription {
    /// Built-in scene: a diffuse floor, a chrome ball and a diamond under
    /// one warm point light.
    pub fn jewelry_demo() -> Self {
        Self {
            materials: vec![
                Material::diffuse("floor", Vec3::new(0.75, 0.72, 0.68)),
                Material::mirror("chrome", 0.9),
                Material::glass("diamond", OpticalParams::DIAMOND),
            ],
            shapes: vec![
                Shape::Plane {
                    point: Vec3::ZERO,
                    normal: Vec3::Y,
                    material: "floor".to_string(),
                },
                Shape::Sphere {
                    center: Vec3::new(-0.7, 0.5, 0.0),
                    radius: 0.5,
                    material: "chrome".to_string(),
                },
                Shape::Sphere {
                    center: Vec3::new(0.7, 0.45, 0.3),
                    radius: 0.45,
                    material: "diamond".to_string(),
                },
            ],
            lights: vec![PointLight::new(
                Vec3::new(0.5, 3.5, 1.5),
                Vec3::new(1.0, 0.95, 0.85),
                120.0,
            )],
            ambient: Vec3::splat(0.02),
        }
    }
}

/// Parse and validate a scene from a JSON string.
pub fn load_scene_from_str(json: &str) -> LoadResult<SceneDescription> {
    let scene: SceneDescription = serde_json::from_str(json)?;
    scene.validate()?;
    log::info!(
        "Loaded scene: {} materials, {} shapes, {} lights",
        scene.materials.len(),
        scene.shapes.len(),
        scene.lights.len()
    );
    Ok(scene)
}

/// Load and validate a scene from a JSON file.
pub fn load_scene(path: impl AsRef<Path>) -> LoadResult<SceneDescription> {
    let path = path.as_ref();
    log::debug!("Reading scene file {}", path.display());
    let json = std::fs::read_to_string(path)?;
    load_scene_from_str(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "materials": [
            { "name": "floor", "albedo": [0.8, 0.8, 0.8] },
            { "name": "chrome", "reflective": true, "diffuse": false, "reflectivity": 0.9 },
            { "name": "diamond", "diffuse": false, "transmissive": true,
              "optical": { "base_ior": 2.417, "abbe": 55.3 } }
        ],
        "shapes": [
            { "type": "plane", "point": [0, 0, 0], "normal": [0, 1, 0], "material": "floor" },
            { "type": "sphere", "center": [0, 1, 0], "radius": 1.0, "material": "chrome" },
            { "type": "sphere", "center": [2, 0.5, 0], "radius": 0.5, "material": "diamond" }
        ],
        "lights": [
            { "position": [0, 5, 0], "color": [1, 1, 1], "power": 100 }
        ],
        "ambient": [0.01, 0.01, 0.01]
    }"#;

    #[test]
    fn test_load_scene_from_str() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scene = load_scene_from_str(SCENE).unwrap();
        assert_eq!(scene.materials.len(), 3);
        assert_eq!(scene.shapes.len(), 3);
        assert_eq!(scene.lights.len(), 1);
        assert_eq!(scene.material_index("diamond").unwrap(), 2);
        assert!(scene.materials[2].transmissive);
        assert_eq!(scene.lights[0].flux(), Vec3::splat(100.0));
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let json = r#"{
            "shapes": [ { "type": "sphere", "center": [0, 0, 0], "radius": 1.0, "material": "nope" } ]
        }"#;
        let err = load_scene_from_str(json).unwrap_err();
        assert!(matches!(err, LoadError::UnknownMaterial(name) if name == "nope"));
    }

    #[test]
    fn test_duplicate_material_is_rejected() {
        let json = r#"{ "materials": [ { "name": "a" }, { "name": "a" } ] }"#;
        assert!(matches!(
            load_scene_from_str(json),
            Err(LoadError::DuplicateMaterial(_))
        ));
    }

    #[test]
    fn test_invalid_sphere_radius() {
        let json = r#"{
            "materials": [ { "name": "m" } ],
            "shapes": [ { "type": "sphere", "center": [0, 0, 0], "radius": 0.0, "material": "m" } ]
        }"#;
        assert!(matches!(
            load_scene_from_str(json),
            Err(LoadError::InvalidPrimitive(_))
        ));
    }

    #[test]
    fn test_negative_light_power() {
        let json = r#"{ "lights": [ { "position": [0, 0, 0], "color": [1, 1, 1], "power": -1 } ] }"#;
        assert!(matches!(
            load_scene_from_str(json),
            Err(LoadError::InvalidLight(_))
        ));
    }

    #[test]
    fn test_material_ranges_are_checked() {
        let negative_albedo = r#"{ "materials": [ { "name": "m", "albedo": [-0.8, 0.5, 0.5] } ] }"#;
        assert!(matches!(
            load_scene_from_str(negative_albedo),
            Err(LoadError::InvalidMaterial(reason)) if reason.starts_with("m:")
        ));

        let hot_mirror = r#"{
            "materials": [ { "name": "m", "reflective": true, "diffuse": false, "reflectivity": 3.0 } ]
        }"#;
        assert!(matches!(
            load_scene_from_str(hot_mirror),
            Err(LoadError::InvalidMaterial(_))
        ));

        let mut desc = SceneDescription::jewelry_demo();
        desc.materials[2].optical = Some(OpticalParams {
            base_ior: 0.0,
            abbe: 55.3,
        });
        assert!(matches!(desc.validate(), Err(LoadError::InvalidMaterial(_))));

        desc.materials[2].optical = Some(OpticalParams::DIAMOND);
        desc.materials[0].albedo.x = f32::NAN;
        assert!(matches!(desc.validate(), Err(LoadError::InvalidMaterial(_))));

        let mut desc = SceneDescription::jewelry_demo();
        desc.ambient = Vec3::splat(-0.1);
        assert!(matches!(desc.validate(), Err(LoadError::InvalidLight(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            load_scene_from_str("{ not json"),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_scene("/definitely/not/here.json"),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn test_jewelry_demo_is_valid() {
        let demo = SceneDescription::jewelry_demo();
        assert!(demo.validate().is_ok());
        assert_eq!(demo.lights.len(), 1);

        // Survives a JSON round trip through the loader.
        let json = serde_json::to_string(&demo).unwrap();
        assert_eq!(load_scene_from_str(&json).unwrap(), demo);
    }
}

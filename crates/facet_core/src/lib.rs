//! Facet Core - scene description types for the Facet renderer.
//!
//! This crate provides:
//!
//! - **Materials**: `Material`, `SurfaceType`, `OpticalParams`
//! - **Scene description**: `SceneDescription`, `Shape`, `PointLight`
//! - **Loading**: JSON scene files via serde
//!
//! # Example
//!
//! ```ignore
//! use facet_core::load_scene;
//!
//! let scene = load_scene("ring.json")?;
//! println!("Loaded {} shapes, {} lights",
//!     scene.shapes.len(),
//!     scene.lights.len());
//! ```

pub mod material;
pub mod scene;

// Re-export commonly used types
pub use material::{Material, OpticalParams, SurfaceType};
pub use scene::{
    load_scene, load_scene_from_str, LoadError, LoadResult, PointLight, SceneDescription, Shape,
};

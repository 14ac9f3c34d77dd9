//! Render configuration.
//!
//! Every option can be given in a JSON file; missing keys fall back to the
//! defaults below. [`RenderConfig::validate`] must pass before any photon is
//! emitted or any ray is traced.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Color, ConfigError};

/// Deepest recursion `trace_ray` may take.
///
/// Every bounce is a native stack frame on a rayon worker, so the depth has
/// a hard ceiling well below the worker stack size.
pub const MAX_TRACE_DEPTH: u32 = 64;

/// Default offset for spawned ray origins.
pub const DEFAULT_EPSILON: f32 = 0.001;

/// Which estimator supplies indirect lighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiMode {
    /// Recursive cosine-weighted sampling of diffuse bounces.
    #[default]
    PathTracing,
    /// Density estimation over precomputed caustic and global photon maps.
    PhotonMap,
}

/// Density-estimation filter applied to gathered photons.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    /// Every photon within the radius counts fully.
    #[default]
    Flat,
    /// Weight falls off linearly with distance: `1 - d / (k r)`.
    Cone { k: f32 },
}

impl Kernel {
    /// Weight of a photon at distance `distance` from the query point.
    #[inline]
    pub fn weight(&self, distance: f32, radius: f32) -> f32 {
        match *self {
            Kernel::Flat => 1.0,
            Kernel::Cone { k } => (1.0 - distance / (k * radius)).max(0.0),
        }
    }

    /// Area normalization so that the kernel integrates to the gathered power.
    #[inline]
    pub fn normalization(&self, radius: f32) -> f32 {
        let disk = std::f32::consts::PI * radius * radius;
        match *self {
            Kernel::Flat => disk,
            Kernel::Cone { k } => (1.0 - 2.0 / (3.0 * k)) * disk,
        }
    }
}

/// Which shading path supplies direct lighting for transparent materials.
///
/// Advanced mode lets shadow rays pass through transmissive occluders;
/// legacy mode treats every surface as opaque. The GI estimators are
/// invoked identically in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpticalMode {
    #[default]
    Advanced,
    Legacy,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Samples per pixel for anti-aliasing
    pub samples_per_pixel: u32,
    /// Maximum total recursion depth (specular and diffuse)
    pub max_depth: u32,
    /// Maximum number of diffuse (GI) bounces
    pub max_gi_bounces: u32,
    /// Number of photons emitted from the lights
    pub photon_count: usize,
    /// Gather radius for the caustic photon map
    pub caustics_radius: f32,
    /// Gather radius for the global photon map
    pub global_radius: f32,
    /// Offset applied to every spawned ray origin
    pub epsilon: f32,
    /// Specular bounces after which a photon is dropped
    pub max_specular_bounces: u32,
    /// Hard limit on photons a single emission run may store
    pub max_photons: usize,
    /// Use at most this many nearest photons per lookup
    pub gather_limit: Option<usize>,
    /// Density-estimation kernel
    pub kernel: Kernel,
    /// Indirect-lighting strategy
    pub gi_mode: GiMode,
    /// Shading path for transparent materials
    pub optical_mode: OpticalMode,
    /// Radiance returned by rays that leave the scene
    pub background: Color,
    /// Seed for photon emission and pixel sampling
    pub seed: u64,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 16,
            max_depth: 5,
            max_gi_bounces: 1,
            photon_count: 100_000,
            caustics_radius: 0.1,
            global_radius: 0.3,
            epsilon: DEFAULT_EPSILON,
            max_specular_bounces: 16,
            max_photons: 50_000_000,
            gather_limit: None,
            kernel: Kernel::Flat,
            gi_mode: GiMode::PathTracing,
            optical_mode: OpticalMode::Advanced,
            background: Color::ZERO,
            seed: 0,
            bucket_size: crate::DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from JSON. Missing keys take default values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject configurations that cannot produce a meaningful render.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("caustics_radius", self.caustics_radius),
            ("global_radius", self.global_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRadius { name, value });
            }
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }

        if self.max_depth > MAX_TRACE_DEPTH {
            return Err(ConfigError::DepthTooLarge {
                requested: self.max_depth,
                limit: MAX_TRACE_DEPTH,
            });
        }

        if self.max_depth == 0 && self.max_gi_bounces > 0 {
            return Err(ConfigError::ZeroDepthWithBounces(self.max_gi_bounces));
        }

        if self.max_specular_bounces == 0 {
            return Err(ConfigError::ZeroSpecularBounceCap);
        }

        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }

        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroBucketSize);
        }

        if let Kernel::Cone { k } = self.kernel {
            if !(k >= 1.0) {
                return Err(ConfigError::InvalidConeKernel(k));
            }
        }

        if self.gather_limit == Some(0) {
            return Err(ConfigError::ZeroGatherLimit);
        }

        if self.photon_count > self.max_photons {
            return Err(ConfigError::TooManyPhotons {
                requested: self.photon_count,
                limit: self.max_photons,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.epsilon, 0.001);
        assert_eq!(config.max_specular_bounces, 16);
        assert_eq!(config.caustics_radius, 0.1);
        assert_eq!(config.global_radius, 0.3);
    }

    #[test]
    fn test_negative_radius_rejected() {
        let config = RenderConfig {
            caustics_radius: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRadius { name: "caustics_radius", value }) if value == -0.1
        ));

        let config = RenderConfig {
            global_radius: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRadius { name: "global_radius", .. })
        ));
    }

    #[test]
    fn test_zero_depth_with_bounces_rejected() {
        let config = RenderConfig {
            max_depth: 0,
            max_gi_bounces: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDepthWithBounces(2))
        ));

        let config = RenderConfig {
            max_depth: 0,
            max_gi_bounces: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_depth_is_capped() {
        let config = RenderConfig {
            max_depth: 1_000_000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DepthTooLarge {
                requested: 1_000_000,
                limit: MAX_TRACE_DEPTH
            })
        ));

        let config = RenderConfig {
            max_depth: MAX_TRACE_DEPTH,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_epsilon_must_be_positive() {
        let config = RenderConfig {
            epsilon: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEpsilon(e)) if e == 0.0
        ));
    }

    #[test]
    fn test_photon_budget_over_capacity() {
        let config = RenderConfig {
            photon_count: 11,
            max_photons: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyPhotons {
                requested: 11,
                limit: 10
            })
        ));
    }

    #[test]
    fn test_cone_kernel_constant() {
        let config = RenderConfig {
            kernel: Kernel::Cone { k: 0.5 },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConeKernel(k)) if k == 0.5
        ));
    }

    #[test]
    fn test_kernel_weights() {
        assert_eq!(Kernel::Flat.weight(0.7, 1.0), 1.0);
        let cone = Kernel::Cone { k: 1.0 };
        assert_eq!(cone.weight(0.0, 1.0), 1.0);
        assert!((cone.weight(0.5, 1.0) - 0.5).abs() < 1e-6);
        assert_eq!(cone.weight(1.0, 1.0), 0.0);

        let disk = std::f32::consts::PI * 4.0;
        assert!((Kernel::Flat.normalization(2.0) - disk).abs() < 1e-4);
        assert!((cone.normalization(2.0) - disk / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = RenderConfig::from_json_str(
            r#"{ "max_depth": 3, "gi_mode": "photon_map", "kernel": { "type": "cone", "k": 1.1 } }"#,
        )
        .unwrap();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.gi_mode, GiMode::PhotonMap);
        assert_eq!(config.kernel, Kernel::Cone { k: 1.1 });
        assert_eq!(config.samples_per_pixel, 16);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            RenderConfig::from_json_str(r#"{ "global_radius": -1.0 }"#),
            Err(ConfigError::InvalidRadius { .. })
        ));
        assert!(matches!(
            RenderConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_keeps_io_source() {
        use std::error::Error;

        let err = RenderConfig::load("/definitely/not/here.json").unwrap_err();
        match &err {
            ConfigError::Io { path, source } => {
                assert_eq!(path, Path::new("/definitely/not/here.json"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected an io error, got {other:?}"),
        }
        assert!(err.source().is_some());

        let err = RenderConfig::from_json_str("[1, 2]").unwrap_err();
        assert!(err.source().is_some());
    }
}

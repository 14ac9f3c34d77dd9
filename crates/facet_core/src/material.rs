//! Surface materials as seen by the light-transport core.
//!
//! The renderer only reads the albedo, the reflectivity and the three
//! behaviour flags. Optical parameters (IOR, Abbe number) drive the
//! refraction direction of specular bounces and are otherwise forwarded
//! untouched to the shading path.

use facet_math::Vec3;
use serde::{Deserialize, Serialize};

/// Classification of a surface hit, driving photon deposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceType {
    /// Lambertian-style surface. Photons are deposited here.
    Diffuse,
    /// Perfect mirror or dielectric. Photons bounce and continue.
    Specular,
    /// Anything else (pure absorbers, emitters). Photons terminate.
    Other,
}

/// Index of refraction and dispersion parameters of a dielectric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpticalParams {
    /// Index of refraction at the reference (green) wavelength.
    pub base_ior: f32,
    /// Abbe number. Lower values mean stronger dispersion.
    pub abbe: f32,
}

impl OpticalParams {
    /// Typical diamond: nD = 2.417, Abbe number 55.3.
    pub const DIAMOND: OpticalParams = OpticalParams {
        base_ior: 2.417,
        abbe: 55.3,
    };

    /// Typical crown glass: nD = 1.5, Abbe number 59.
    pub const CROWN_GLASS: OpticalParams = OpticalParams {
        base_ior: 1.5,
        abbe: 59.0,
    };
}

impl Default for OpticalParams {
    fn default() -> Self {
        Self::CROWN_GLASS
    }
}

/// A surface material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name (referenced by shapes in scene files)
    pub name: String,

    /// Diffuse reflectance (RGB, 0-1)
    pub albedo: Vec3,

    /// Strength of the mirror reflection (0-1)
    pub reflectivity: f32,

    /// Whether the surface has a mirror component
    pub reflective: bool,

    /// Whether the surface has a diffuse component
    pub diffuse: bool,

    /// Whether light is transmitted through the surface (dielectrics)
    pub transmissive: bool,

    /// Refraction and dispersion parameters for transmissive surfaces
    pub optical: Option<OpticalParams>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Vec3::new(0.5, 0.5, 0.5), // Grey default
            reflectivity: 0.0,
            reflective: false,
            diffuse: true,
            transmissive: false,
            optical: None,
        }
    }
}

impl Material {
    /// A purely diffuse material.
    pub fn diffuse(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            albedo,
            ..Default::default()
        }
    }

    /// A perfect mirror with the given reflectivity.
    pub fn mirror(name: impl Into<String>, reflectivity: f32) -> Self {
        Self {
            name: name.into(),
            albedo: Vec3::ZERO,
            reflectivity: reflectivity.clamp(0.0, 1.0),
            reflective: true,
            diffuse: false,
            ..Default::default()
        }
    }

    /// A clear dielectric (glass, gemstone).
    pub fn glass(name: impl Into<String>, optical: OpticalParams) -> Self {
        Self {
            name: name.into(),
            albedo: Vec3::ZERO,
            reflectivity: 0.0,
            reflective: false,
            diffuse: false,
            transmissive: true,
            optical: Some(optical),
        }
    }

    /// A diffuse base with a mirror coat on top.
    pub fn glossy(name: impl Into<String>, albedo: Vec3, reflectivity: f32) -> Self {
        Self {
            name: name.into(),
            albedo,
            reflectivity: reflectivity.clamp(0.0, 1.0),
            reflective: true,
            diffuse: true,
            ..Default::default()
        }
    }

    /// A surface that neither reflects nor scatters light.
    pub fn absorber(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            albedo: Vec3::ZERO,
            diffuse: false,
            ..Default::default()
        }
    }

    /// Classify this material for photon tracing.
    ///
    /// A diffuse component wins over a specular one: photons deposit on
    /// glossy surfaces instead of bouncing off them.
    pub fn surface_type(&self) -> SurfaceType {
        if self.diffuse {
            SurfaceType::Diffuse
        } else if self.reflective || self.transmissive {
            SurfaceType::Specular
        } else {
            SurfaceType::Other
        }
    }

    /// Check that the material cannot create energy.
    ///
    /// Albedo channels and reflectivity must lie in `[0, 1]` and any index
    /// of refraction must be finite and positive. Constructors clamp, but
    /// deserialized materials bypass them.
    pub fn check_ranges(&self) -> Result<(), String> {
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        if !self.albedo.to_array().into_iter().all(unit) {
            return Err(format!("albedo {:?} must lie in [0, 1]", self.albedo));
        }
        if !unit(self.reflectivity) {
            return Err(format!(
                "reflectivity {} must lie in [0, 1]",
                self.reflectivity
            ));
        }
        if let Some(optical) = self.optical {
            if !optical.base_ior.is_finite() || optical.base_ior <= 0.0 {
                return Err(format!("base_ior {} must be positive", optical.base_ior));
            }
        }
        Ok(())
    }

    /// Index of refraction, defaulting to 1.0 for non-dielectrics.
    pub fn ior(&self) -> f32 {
        self.optical.map_or(1.0, |o| o.base_ior)
    }
}

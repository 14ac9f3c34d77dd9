//! Point lights: photon emission and direct shading.

use std::f32::consts::PI;

use facet_core::{PointLight, SceneDescription};
use facet_math::{Interval, Ray, Vec3};
use rand::RngCore;

use crate::sampling::{gen_f32, uniform_sample_sphere};
use crate::{
    Color, Intersection, OpticalMode, RenderConfig, RenderResult, SceneQuery, DEFAULT_EPSILON,
};

/// Source of photon emission rays.
pub trait LightSampler: Send + Sync {
    /// Total emitted power of all lights.
    fn total_flux(&self) -> Color;

    /// Sample an emission ray and the power it would carry if it were the
    /// only photon emitted. Callers divide by the photon count.
    ///
    /// Returns `None` when there is nothing to emit.
    fn emit_photon(&self, rng: &mut dyn RngCore) -> Option<(Ray, Color)>;
}

/// Local shading terms consumed by both estimators.
pub trait Shading: Send + Sync {
    /// Radiance reaching the viewer straight from the lights.
    fn direct_lighting(
        &self,
        scene: &dyn SceneQuery,
        hit: &Intersection<'_>,
        view_dir: Vec3,
    ) -> RenderResult<Color>;

    /// Constant fill light.
    fn ambient_lighting(&self, hit: &Intersection<'_>) -> Color;

    /// BRDF at `hit` for light arriving along `wi` and leaving along `wo`.
    fn brdf(&self, hit: &Intersection<'_>, wi: Vec3, wo: Vec3) -> Color;
}

/// A set of point lights plus a constant ambient term.
#[derive(Debug, Clone)]
pub struct LightRig {
    lights: Vec<PointLight>,
    ambient: Color,
    optical_mode: OpticalMode,
    epsilon: f32,
}

impl LightRig {
    pub fn new(lights: Vec<PointLight>, ambient: Color) -> Self {
        Self {
            lights,
            ambient,
            optical_mode: OpticalMode::default(),
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Lights of a loaded scene, shading with the config's optical mode and
    /// shadow-ray epsilon.
    pub fn from_description(desc: &SceneDescription, config: &RenderConfig) -> Self {
        Self::new(desc.lights.clone(), desc.ambient)
            .with_optical_mode(config.optical_mode)
            .with_epsilon(config.epsilon)
    }

    /// Select the shading path for transparent occluders.
    pub fn with_optical_mode(mut self, mode: OpticalMode) -> Self {
        self.optical_mode = mode;
        self
    }

    /// Shadow-ray origin offset.
    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    fn total_power(&self) -> f32 {
        self.lights.iter().map(|l| l.power.max(0.0)).sum()
    }

    /// Whether nothing opaque lies strictly between `from` and `to`.
    fn visible(&self, scene: &dyn SceneQuery, from: Vec3, to: Vec3) -> RenderResult<bool> {
        let offset = to - from;
        let dist = offset.length();
        if dist <= self.epsilon {
            return Ok(true);
        }
        let ray = Ray::spawn(from, offset / dist, self.epsilon);
        let mut t_min = 0.0;
        let t_max = dist - 2.0 * self.epsilon;

        while t_min < t_max {
            match scene.intersect_in(&ray, Interval::new(t_min, t_max))? {
                None => return Ok(true),
                Some(occluder)
                    if self.optical_mode == OpticalMode::Advanced
                        && occluder.material.transmissive =>
                {
                    // Transparent geometry does not block light in advanced mode.
                    t_min = occluder.t + self.epsilon;
                }
                Some(_) => return Ok(false),
            }
        }
        Ok(true)
    }
}

impl LightSampler for LightRig {
    fn total_flux(&self) -> Color {
        self.lights.iter().map(|l| l.flux()).sum()
    }

    fn emit_photon(&self, rng: &mut dyn RngCore) -> Option<(Ray, Color)> {
        let total = self.total_power();
        if total <= 0.0 {
            return None;
        }

        // Pick a light proportionally to its power.
        let mut target = gen_f32(rng) * total;
        let light = self
            .lights
            .iter()
            .filter(|l| l.power > 0.0)
            .find(|l| {
                target -= l.power;
                target <= 0.0
            })
            .or_else(|| self.lights.iter().rev().find(|l| l.power > 0.0))?;

        let direction = uniform_sample_sphere(rng);
        // flux / (power / total) == color * total
        Some((Ray::new(light.position, direction), light.color * total))
    }
}

impl Shading for LightRig {
    fn direct_lighting(
        &self,
        scene: &dyn SceneQuery,
        hit: &Intersection<'_>,
        view_dir: Vec3,
    ) -> RenderResult<Color> {
        if !hit.material.diffuse {
            return Ok(Color::ZERO);
        }

        let mut sum = Color::ZERO;
        for light in &self.lights {
            let to_light = light.position - hit.point;
            let d2 = to_light.length_squared();
            if d2 == 0.0 {
                continue;
            }
            let wi = to_light / d2.sqrt();
            let cos_theta = hit.normal.dot(wi);
            if cos_theta <= 0.0 {
                continue;
            }
            if !self.visible(scene, hit.point, light.position)? {
                continue;
            }
            let irradiance = light.flux() / (4.0 * PI * d2) * cos_theta;
            sum += self.brdf(hit, wi, view_dir) * irradiance;
        }
        Ok(sum)
    }

    fn ambient_lighting(&self, hit: &Intersection<'_>) -> Color {
        hit.material.albedo * self.ambient
    }

    fn brdf(&self, hit: &Intersection<'_>, _wi: Vec3, _wo: Vec3) -> Color {
        if hit.material.diffuse {
            hit.material.albedo / PI
        } else {
            Color::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hittable, MaterialId, Plane, Scene, Sphere};
    use facet_core::{Material, OpticalParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn floor_with_blocker(blocker: Material) -> Scene {
        let materials = vec![Material::diffuse("floor", Vec3::ONE), blocker];
        let objects: Vec<Box<dyn Hittable>> = vec![
            Box::new(Plane::new(Vec3::ZERO, Vec3::Y, MaterialId(0))),
            Box::new(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 0.5, MaterialId(1))),
        ];
        Scene::new(materials, objects)
    }

    fn light_above() -> LightRig {
        LightRig::new(
            vec![PointLight::new(Vec3::new(0.0, 4.0, 0.0), Vec3::ONE, 4.0 * PI)],
            Color::splat(0.1),
        )
    }

    fn floor_hit(scene: &Scene, x: f32) -> Intersection<'_> {
        scene
            .intersect(&Ray::new(Vec3::new(x, 1.0, 0.0), -Vec3::Y))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_direct_lighting_unoccluded() {
        let scene = floor_with_blocker(Material::diffuse("unused", Vec3::ONE));
        let rig = light_above();
        // Far away from the blocker: light at distance sqrt(16 + 16)
        let hit = floor_hit(&scene, 4.0);
        let direct = rig.direct_lighting(&scene, &hit, Vec3::Y).unwrap();

        let d2 = 32.0_f32;
        let cos = 4.0 / d2.sqrt();
        let expected = (1.0 / PI) * (1.0 / d2) * cos;
        assert!((direct.x - expected).abs() < 1e-5, "{} vs {}", direct.x, expected);
    }

    #[test]
    fn test_opaque_blocker_casts_shadow() {
        let scene = floor_with_blocker(Material::diffuse("blocker", Vec3::ONE));
        let hit = floor_hit(&scene, 0.0);
        let direct = light_above().direct_lighting(&scene, &hit, Vec3::Y).unwrap();
        assert_eq!(direct, Color::ZERO);
    }

    #[test]
    fn test_optical_mode_controls_transparent_shadows() {
        let scene = floor_with_blocker(Material::glass("gem", OpticalParams::DIAMOND));
        let hit = floor_hit(&scene, 0.0);

        let advanced = light_above().with_optical_mode(OpticalMode::Advanced);
        let legacy = light_above().with_optical_mode(OpticalMode::Legacy);

        assert!(advanced.direct_lighting(&scene, &hit, Vec3::Y).unwrap().x > 0.0);
        assert_eq!(
            legacy.direct_lighting(&scene, &hit, Vec3::Y).unwrap(),
            Color::ZERO
        );
    }

    #[test]
    fn test_non_diffuse_gets_no_direct_light() {
        let scene = floor_with_blocker(Material::mirror("chrome", 1.0));
        let hit = scene
            .intersect(&Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::Y))
            .unwrap()
            .unwrap();
        assert_eq!(hit.material.name, "chrome");
        let direct = light_above().direct_lighting(&scene, &hit, Vec3::Y).unwrap();
        assert_eq!(direct, Color::ZERO);
    }

    #[test]
    fn test_ambient_scales_albedo() {
        let scene = floor_with_blocker(Material::diffuse("unused", Vec3::ONE));
        let hit = floor_hit(&scene, 3.0);
        assert_eq!(light_above().ambient_lighting(&hit), Color::splat(0.1));
    }

    #[test]
    fn test_emission_power_split_between_lights() {
        let rig = LightRig::new(
            vec![
                PointLight::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 30.0),
                PointLight::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 10.0),
            ],
            Color::ZERO,
        );
        assert_eq!(rig.total_flux(), Color::new(30.0, 0.0, 10.0));

        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            let (ray, power) = rig.emit_photon(&mut rng).unwrap();
            assert!(ray.is_unit());
            sum += power;
        }
        // Average photon power matches total flux.
        let mean = sum / n as f32;
        assert!((mean.x - 30.0).abs() < 1.5, "{:?}", mean);
        assert!((mean.z - 10.0).abs() < 1.5, "{:?}", mean);
    }

    #[test]
    fn test_from_description_uses_config() {
        let desc = SceneDescription::jewelry_demo();
        let rig = LightRig::from_description(&desc, &RenderConfig::default());
        assert_eq!(rig.epsilon, DEFAULT_EPSILON);
        assert_eq!(rig.optical_mode, OpticalMode::Advanced);
        assert_eq!(rig.lights().len(), 1);

        let config = RenderConfig {
            epsilon: 0.05,
            optical_mode: OpticalMode::Legacy,
            ..Default::default()
        };
        let rig = LightRig::from_description(&desc, &config);
        assert_eq!(rig.epsilon, 0.05);
        assert_eq!(rig.optical_mode, OpticalMode::Legacy);
    }

    #[test]
    fn test_no_lights_emit_nothing() {
        let rig = LightRig::new(Vec::new(), Color::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(rig.emit_photon(&mut rng).is_none());
    }
}

//! Recursive radiance tracing with separate depth and GI budgets.
//!
//! `max_depth` bounds total recursion (specular and diffuse), while
//! `max_gi_bounces` bounds diffuse bounces only, so mirror chains do not eat
//! into the GI budget.

use facet_math::{Ray, Vec3};
use rand::RngCore;

use crate::sampling::{gen_f32, reflect, refract, schlick};
use crate::{
    Color, IndirectEstimator, Intersection, RenderConfig, RenderError, RenderResult, SceneQuery,
    Shading, MAX_TRACE_DEPTH,
};

/// Recursion limits for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceLimits {
    pub max_depth: u32,
    pub max_gi_bounces: u32,
    /// Offset applied to every spawned ray origin
    pub epsilon: f32,
}

impl TraceLimits {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_gi_bounces: config.max_gi_bounces,
            epsilon: config.epsilon,
        }
    }
}

/// Recursion state of a single ray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    /// Total bounces taken so far
    pub depth: u32,
    /// Diffuse bounces taken so far
    pub gi_depth: u32,
}

impl Budget {
    pub fn new(depth: u32, gi_depth: u32) -> Self {
        Self { depth, gi_depth }
    }

    /// State after a mirror or dielectric bounce.
    pub fn specular_bounce(self) -> Self {
        Self {
            depth: self.depth + 1,
            gi_depth: self.gi_depth,
        }
    }

    /// State after a diffuse bounce.
    pub fn diffuse_bounce(self) -> Self {
        Self {
            depth: self.depth + 1,
            gi_depth: self.gi_depth + 1,
        }
    }
}

/// Traces camera and bounce rays through a scene.
pub struct PathTracer<'a> {
    scene: &'a dyn SceneQuery,
    shading: &'a dyn Shading,
    indirect: &'a dyn IndirectEstimator,
    limits: TraceLimits,
    background: Color,
}

impl<'a> PathTracer<'a> {
    /// `limits.max_depth` is clamped to [`MAX_TRACE_DEPTH`].
    pub fn new(
        scene: &'a dyn SceneQuery,
        shading: &'a dyn Shading,
        indirect: &'a dyn IndirectEstimator,
        mut limits: TraceLimits,
        background: Color,
    ) -> Self {
        if limits.max_depth > MAX_TRACE_DEPTH {
            log::warn!(
                "max_depth {} clamped to {}",
                limits.max_depth,
                MAX_TRACE_DEPTH
            );
            limits.max_depth = MAX_TRACE_DEPTH;
        }
        Self {
            scene,
            shading,
            indirect,
            limits,
            background,
        }
    }

    pub fn scene(&self) -> &'a dyn SceneQuery {
        self.scene
    }

    pub fn shading(&self) -> &'a dyn Shading {
        self.shading
    }

    pub fn limits(&self) -> TraceLimits {
        self.limits
    }

    /// Radiance along a camera ray.
    pub fn trace(&self, ray: &Ray, rng: &mut dyn RngCore) -> RenderResult<Color> {
        self.trace_ray(ray, 0, 0, rng)
    }

    /// Radiance arriving along `ray`, which has already taken `depth` bounces
    /// of which `gi_depth` were diffuse.
    ///
    /// Returns zero once `depth` reaches `max_depth` without touching the
    /// scene, and the background color when the ray escapes.
    pub fn trace_ray(
        &self,
        ray: &Ray,
        depth: u32,
        gi_depth: u32,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Color> {
        if depth >= self.limits.max_depth {
            return Ok(Color::ZERO);
        }
        if !ray.is_unit() {
            return Err(RenderError::NonUnitDirection {
                length: ray.direction.length(),
            });
        }

        let Some(hit) = self.scene.intersect(ray)? else {
            return Ok(self.background);
        };

        let budget = Budget::new(depth, gi_depth);
        let view_dir = -ray.direction;
        let material = hit.material;

        let mut color = self.shading.direct_lighting(self.scene, &hit, view_dir)?;

        if material.reflective && material.reflectivity > 0.0 {
            let direction = reflect(ray.direction, hit.normal);
            color += material.reflectivity * self.specular(&hit, direction, budget, rng)?;
        }

        if material.transmissive {
            let direction = self.dielectric_direction(ray, &hit, rng);
            color += self.specular(&hit, direction, budget, rng)?;
        }

        color += self
            .indirect
            .estimate_indirect(self, &hit, view_dir, budget, rng)?;

        Ok(color)
    }

    fn specular(
        &self,
        hit: &Intersection<'_>,
        direction: Vec3,
        budget: Budget,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Color> {
        let next = budget.specular_bounce();
        let bounce = Ray::spawn(hit.point, direction, self.limits.epsilon);
        self.trace_ray(&bounce, next.depth, next.gi_depth, rng)
    }

    /// Pick reflection or refraction with the Schlick probability.
    fn dielectric_direction(
        &self,
        ray: &Ray,
        hit: &Intersection<'_>,
        rng: &mut dyn RngCore,
    ) -> Vec3 {
        let ior = hit.material.ior();
        let ratio = if hit.front_face { 1.0 / ior } else { ior };
        let cos_theta = (-ray.direction).dot(hit.normal).min(1.0);

        match refract(ray.direction, hit.normal, ratio) {
            Some(refracted) if schlick(cos_theta, ratio) <= gen_f32(rng) => refracted,
            _ => reflect(ray.direction, hit.normal),
        }
    }
}

//! Indirect lighting estimators.
//!
//! Two interchangeable strategies implement [`IndirectEstimator`]:
//! [`PhotonMapEstimator`] reads precomputed photon maps, and
//! [`StochasticSampler`] recurses through the path tracer with a
//! cosine-weighted diffuse bounce.

use std::time::Instant;

use facet_math::{Ray, Vec3};
use rand::RngCore;

use crate::sampling::cosine_sample_hemisphere;
use crate::{
    Budget, Color, Intersection, Kernel, KdTree, PathTracer, Photon, PhotonStore, RenderConfig,
    RenderError, RenderResult, SceneQuery, Shading,
};

/// Indirect lighting at a surface hit.
///
/// Implementations are selected by configuration and must be safe to share
/// across render threads.
pub trait IndirectEstimator: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Light reaching `hit` through paths other than direct illumination and
    /// specular recursion, leaving towards `view_dir`.
    ///
    /// `budget` is the recursion state of the ray that produced `hit`.
    fn estimate_indirect(
        &self,
        tracer: &PathTracer<'_>,
        hit: &Intersection<'_>,
        view_dir: Vec3,
        budget: Budget,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Color>;
}

/// Kernel density estimate of reflected radiance from nearby photons.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RadianceEstimator {
    kernel: Kernel,
}

impl RadianceEstimator {
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Sum `brdf(position, wi, view_dir) * power` over `photons`, weighted by
    /// the kernel and divided by its area normalization.
    ///
    /// Photons that arrived from behind the surface (relative to `normal`)
    /// are ignored. A non-positive radius yields zero.
    pub fn estimate<F>(
        &self,
        position: Vec3,
        normal: Vec3,
        view_dir: Vec3,
        photons: &[&Photon],
        radius: f32,
        brdf: F,
    ) -> Color
    where
        F: Fn(Vec3, Vec3, Vec3) -> Color,
    {
        if radius.is_nan() || radius <= 0.0 || photons.is_empty() {
            return Color::ZERO;
        }

        let mut sum = Color::ZERO;
        for photon in photons {
            if photon.incoming_direction.dot(normal) <= 0.0 {
                continue;
            }
            let weight = self
                .kernel
                .weight(photon.position.distance(position), radius);
            if weight <= 0.0 {
                continue;
            }
            let wi = -photon.incoming_direction;
            sum += brdf(position, wi, view_dir) * photon.power * weight;
        }

        (sum / self.kernel.normalization(radius)).max(Color::ZERO)
    }
}

/// A frozen photon collection and its spatial index.
#[derive(Debug, Clone)]
pub struct PhotonMap {
    tree: KdTree,
}

impl PhotonMap {
    /// Index a photon collection. The map is immutable afterwards.
    pub fn build(photons: Vec<Photon>) -> Self {
        let start = Instant::now();
        let count = photons.len();
        let tree = KdTree::build(photons);
        log::info!("Built photon map: {} photons in {:?}", count, start.elapsed());
        Self { tree }
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    /// Photons within `radius` of `center`.
    pub fn query(&self, center: Vec3, radius: f32) -> Vec<&Photon> {
        self.tree.query(center, radius)
    }

    /// Photons for one density estimate, plus the radius to normalize by.
    ///
    /// Without a limit every photon within `radius` is returned. With a
    /// limit of `k`, at most the `k` nearest are kept; once `k` are found
    /// the estimate radius shrinks to the farthest of them.
    pub fn gather(&self, center: Vec3, radius: f32, limit: Option<usize>) -> (Vec<&Photon>, f32) {
        let Some(k) = limit else {
            return (self.query(center, radius), radius);
        };

        let nearest = self.tree.nearest(center, k, radius);
        let radius = match nearest.last() {
            Some((_, dist2)) if nearest.len() == k && *dist2 > 0.0 => dist2.sqrt(),
            _ => radius,
        };
        (nearest.into_iter().map(|(p, _)| p).collect(), radius)
    }
}

/// Photon-map indirect lighting with separate caustic and global maps.
#[derive(Debug, Clone)]
pub struct PhotonMapEstimator {
    caustic: PhotonMap,
    global: PhotonMap,
    caustics_radius: f32,
    global_radius: f32,
    gather_limit: Option<usize>,
    estimator: RadianceEstimator,
}

impl PhotonMapEstimator {
    pub fn new(caustic: PhotonMap, global: PhotonMap, config: &RenderConfig) -> Self {
        Self {
            caustic,
            global,
            caustics_radius: config.caustics_radius,
            global_radius: config.global_radius,
            gather_limit: config.gather_limit,
            estimator: RadianceEstimator::new(config.kernel),
        }
    }

    /// Freeze an emission run and index both subsets.
    pub fn from_store(store: PhotonStore, config: &RenderConfig) -> Self {
        let (caustic, global) = store.freeze();
        let (caustic, global) = rayon::join(
            || PhotonMap::build(caustic),
            || PhotonMap::build(global),
        );
        Self::new(caustic, global, config)
    }

    pub fn caustic(&self) -> &PhotonMap {
        &self.caustic
    }

    pub fn global(&self) -> &PhotonMap {
        &self.global
    }

    /// Radiance from caustic photons around `hit`.
    pub fn caustic_radiance(&self, shading: &dyn Shading, hit: &Intersection<'_>, view_dir: Vec3) -> Color {
        self.map_radiance(&self.caustic, self.caustics_radius, shading, hit, view_dir)
    }

    /// Radiance from global photons around `hit`.
    pub fn global_radiance(&self, shading: &dyn Shading, hit: &Intersection<'_>, view_dir: Vec3) -> Color {
        self.map_radiance(&self.global, self.global_radius, shading, hit, view_dir)
    }

    fn map_radiance(
        &self,
        map: &PhotonMap,
        radius: f32,
        shading: &dyn Shading,
        hit: &Intersection<'_>,
        view_dir: Vec3,
    ) -> Color {
        if map.is_empty() {
            return Color::ZERO;
        }
        let (photons, radius) = map.gather(hit.point, radius, self.gather_limit);
        self.estimator
            .estimate(hit.point, hit.normal, view_dir, &photons, radius, |_, wi, wo| {
                shading.brdf(hit, wi, wo)
            })
    }

    /// Shade the first hit of a camera ray: direct + ambient + caustic + global.
    ///
    /// Rays that leave the scene return `background`.
    pub fn render_pixel(
        &self,
        scene: &dyn SceneQuery,
        shading: &dyn Shading,
        ray: &Ray,
        background: Color,
    ) -> RenderResult<Color> {
        if !ray.is_unit() {
            return Err(RenderError::NonUnitDirection {
                length: ray.direction.length(),
            });
        }
        let Some(hit) = scene.intersect(ray)? else {
            return Ok(background);
        };
        let view_dir = -ray.direction;

        let direct = shading.direct_lighting(scene, &hit, view_dir)?;
        Ok(direct
            + shading.ambient_lighting(&hit)
            + self.caustic_radiance(shading, &hit, view_dir)
            + self.global_radiance(shading, &hit, view_dir))
    }
}

impl IndirectEstimator for PhotonMapEstimator {
    fn name(&self) -> &'static str {
        "photon map"
    }

    fn estimate_indirect(
        &self,
        tracer: &PathTracer<'_>,
        hit: &Intersection<'_>,
        view_dir: Vec3,
        _budget: Budget,
        _rng: &mut dyn RngCore,
    ) -> RenderResult<Color> {
        let shading = tracer.shading();
        Ok(shading.ambient_lighting(hit)
            + self.caustic_radiance(shading, hit, view_dir)
            + self.global_radiance(shading, hit, view_dir))
    }
}

/// Monte Carlo diffuse bounce through the path tracer.
///
/// Stateless: the only limit is the GI bounce budget carried by the ray.
#[derive(Debug, Clone, Copy, Default)]
pub struct StochasticSampler;

impl IndirectEstimator for StochasticSampler {
    fn name(&self) -> &'static str {
        "path tracing"
    }

    fn estimate_indirect(
        &self,
        tracer: &PathTracer<'_>,
        hit: &Intersection<'_>,
        _view_dir: Vec3,
        budget: Budget,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Color> {
        let limits = tracer.limits();
        if !hit.material.diffuse || budget.gi_depth >= limits.max_gi_bounces {
            return Ok(Color::ZERO);
        }

        // Cosine-weighted sampling cancels the cosine and 1/pi of the BRDF.
        let direction = cosine_sample_hemisphere(hit.normal, rng);
        let bounce = Ray::spawn(hit.point, direction, limits.epsilon);
        let next = budget.diffuse_bounce();
        let incoming = tracer.trace_ray(&bounce, next.depth, next.gi_depth, rng)?;
        Ok(hit.material.albedo * incoming)
    }
}

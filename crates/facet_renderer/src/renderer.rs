//! Render driver.
//!
//! Rendering is two-pass. [`Integrator::prepare`] validates the config and,
//! in photon map mode, emits photons and builds both maps. The integrator
//! then owns the maps for the lifetime of the image and every pixel query
//! reads them without synchronization.

use std::time::Instant;

use facet_math::Ray;
use rand::RngCore;
use rayon::prelude::*;

use crate::bucket::{generate_buckets, render_bucket, BucketResult};
use crate::{
    Camera, Color, EmissionStats, GiMode, IndirectEstimator, LightSampler, PathTracer,
    PhotonMapEstimator, PhotonTracer, RenderConfig, RenderError, RenderResult, SceneQuery,
    Shading, StochasticSampler, TraceLimits,
};

enum Indirect {
    Sampling(StochasticSampler),
    PhotonMap(Box<PhotonMapEstimator>),
}

/// Prepared light transport for one image.
pub struct Integrator {
    config: RenderConfig,
    indirect: Indirect,
    emission: Option<EmissionStats>,
}

impl Integrator {
    /// Validate `config` and run any preprocessing its GI mode needs.
    ///
    /// Fails before any work starts when the configuration is invalid.
    pub fn prepare(
        scene: &dyn SceneQuery,
        lights: &dyn LightSampler,
        config: &RenderConfig,
    ) -> RenderResult<Self> {
        config.validate()?;

        let (indirect, emission) = match config.gi_mode {
            GiMode::PathTracing => (Indirect::Sampling(StochasticSampler), None),
            GiMode::PhotonMap => {
                let tracer =
                    PhotonTracer::new(scene, config.max_specular_bounces, config.epsilon);
                let (store, stats) = tracer.emit_photons(
                    lights,
                    config.photon_count,
                    config.seed,
                    config.max_photons,
                )?;
                let maps = PhotonMapEstimator::from_store(store, config);
                (Indirect::PhotonMap(Box::new(maps)), Some(stats))
            }
        };

        let integrator = Self {
            config: config.clone(),
            indirect,
            emission,
        };
        log::info!(
            "Integrator ready: {} (max_depth {}, max_gi_bounces {})",
            integrator.estimator().name(),
            config.max_depth,
            config.max_gi_bounces
        );
        Ok(integrator)
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Counters from the photon pass, if one ran.
    pub fn emission_stats(&self) -> Option<&EmissionStats> {
        self.emission.as_ref()
    }

    /// The configured indirect lighting strategy.
    pub fn estimator(&self) -> &dyn IndirectEstimator {
        match &self.indirect {
            Indirect::Sampling(sampler) => sampler,
            Indirect::PhotonMap(maps) => maps.as_ref(),
        }
    }

    /// The photon maps built during preparation.
    pub fn photon_maps(&self) -> RenderResult<&PhotonMapEstimator> {
        match &self.indirect {
            Indirect::PhotonMap(maps) => Ok(maps.as_ref()),
            Indirect::Sampling(_) => Err(RenderError::MissingPhotonMap),
        }
    }

    /// Radiance along a camera ray.
    pub fn radiance(
        &self,
        scene: &dyn SceneQuery,
        shading: &dyn Shading,
        ray: &Ray,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Color> {
        let tracer = PathTracer::new(
            scene,
            shading,
            self.estimator(),
            TraceLimits::from_config(&self.config),
            self.config.background,
        );
        tracer.trace(ray, rng)
    }
}

/// Everything a render thread reads.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub scene: &'a dyn SceneQuery,
    pub shading: &'a dyn Shading,
    pub integrator: &'a Integrator,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        scene: &'a dyn SceneQuery,
        shading: &'a dyn Shading,
        integrator: &'a Integrator,
    ) -> Self {
        Self {
            scene,
            shading,
            integrator,
        }
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * linear_to_gamma(color.x).clamp(0.0, 1.0)) as u8;
    let g = (255.0 * linear_to_gamma(color.y).clamp(0.0, 1.0)) as u8;
    let b = (255.0 * linear_to_gamma(color.z).clamp(0.0, 1.0)) as u8;
    [r, g, b, 255]
}

/// Render a single pixel with multi-sampling.
///
/// A sample that fails is logged and the pixel is rendered black, so one bad
/// ray cannot abort the image.
pub fn render_pixel(
    camera: &Camera,
    ctx: &RenderContext<'_>,
    x: u32,
    y: u32,
    rng: &mut dyn RngCore,
) -> Color {
    let samples = ctx.integrator.config().samples_per_pixel.max(1);
    let mut pixel_color = Color::ZERO;

    for _ in 0..samples {
        let ray = camera.get_ray(x, y, rng);
        match ctx.integrator.radiance(ctx.scene, ctx.shading, &ray, rng) {
            Ok(color) => pixel_color += color,
            Err(e) => {
                log::warn!("Pixel ({}, {}) failed, rendering black: {}", x, y, e);
                return Color::ZERO;
            }
        }
    }

    pixel_color / samples as f32
}

/// Pixels in a `width` x `height` image, counted without u32 overflow.
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; pixel_count(width, height)],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Copy a rendered bucket into place.
    pub fn blit(&mut self, result: &BucketResult) {
        let bucket = &result.bucket;
        for (i, color) in result.pixels.iter().enumerate() {
            let local_x = i as u32 % bucket.width;
            let local_y = i as u32 / bucket.width;
            self.set(bucket.x + local_x, bucket.y + local_y, *color);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }
}

/// Render the whole image, buckets in parallel.
pub fn render(camera: &Camera, ctx: &RenderContext<'_>) -> ImageBuffer {
    let width = camera.image_width;
    let height = camera.image_height;
    let buckets = generate_buckets(width, height, ctx.integrator.config().bucket_size);

    log::info!(
        "Rendering {}x{} in {} buckets, {} spp",
        width,
        height,
        buckets.len(),
        ctx.integrator.config().samples_per_pixel
    );
    let start = Instant::now();

    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| BucketResult::new(*bucket, render_bucket(bucket, camera, ctx)))
        .collect();

    let mut image = ImageBuffer::new(width, height);
    for result in &results {
        image.blit(result);
    }

    log::info!("Render finished in {:?}", start.elapsed());
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, Hittable, Kernel, LightRig, MaterialId, Plane, Scene, Sphere};
    use facet_core::{Material, OpticalParams, PointLight};
    use facet_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn jewelry_scene() -> (Scene, LightRig) {
        let materials = vec![
            Material::diffuse("floor", Vec3::splat(0.7)),
            Material::mirror("chrome", 0.9),
            Material::glass("gem", OpticalParams::DIAMOND),
        ];
        let objects: Vec<Box<dyn Hittable>> = vec![
            Box::new(Plane::new(Vec3::ZERO, Vec3::Y, MaterialId(0))),
            Box::new(Sphere::new(Vec3::new(-0.6, 0.5, 0.0), 0.5, MaterialId(1))),
            Box::new(Sphere::new(Vec3::new(0.6, 0.5, 0.0), 0.5, MaterialId(2))),
        ];
        let rig = LightRig::new(
            vec![PointLight::new(Vec3::new(0.0, 3.0, 1.0), Vec3::ONE, 60.0)],
            Color::splat(0.05),
        );
        (Scene::new(materials, objects), rig)
    }

    fn camera() -> Camera {
        Camera::new()
            .with_resolution(12, 8)
            .with_position(Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, 0.4, 0.0), Vec3::Y)
            .with_fov(40.0)
    }

    fn small_config(gi_mode: GiMode) -> RenderConfig {
        RenderConfig {
            samples_per_pixel: 2,
            photon_count: 5_000,
            gi_mode,
            bucket_size: 4,
            seed: 11,
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_rejects_invalid_config() {
        let (scene, rig) = jewelry_scene();
        let config = RenderConfig {
            global_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            Integrator::prepare(&scene, &rig, &config),
            Err(RenderError::Config(ConfigError::InvalidRadius { .. }))
        ));
    }

    #[test]
    fn test_path_mode_skips_photon_pass() {
        let (scene, rig) = jewelry_scene();
        let integrator =
            Integrator::prepare(&scene, &rig, &small_config(GiMode::PathTracing)).unwrap();
        assert!(integrator.emission_stats().is_none());
        assert_eq!(integrator.estimator().name(), "path tracing");
        assert!(matches!(
            integrator.photon_maps(),
            Err(RenderError::MissingPhotonMap)
        ));
    }

    #[test]
    fn test_photon_mode_builds_maps() {
        let (scene, rig) = jewelry_scene();
        let config = small_config(GiMode::PhotonMap);
        let integrator = Integrator::prepare(&scene, &rig, &config).unwrap();

        let stats = integrator.emission_stats().unwrap();
        assert_eq!(stats.emitted, 5_000);
        let maps = integrator.photon_maps().unwrap();
        assert_eq!(maps.global().len(), stats.deposited);
        assert_eq!(maps.caustic().len(), stats.caustic);
        assert!(maps.caustic().len() <= maps.global().len());
    }

    #[test]
    fn test_zero_photons_leave_empty_maps() {
        let (scene, rig) = jewelry_scene();
        let config = RenderConfig {
            photon_count: 0,
            ..small_config(GiMode::PhotonMap)
        };
        let integrator = Integrator::prepare(&scene, &rig, &config).unwrap();
        assert_eq!(integrator.emission_stats().unwrap().emitted, 0);

        let maps = integrator.photon_maps().unwrap();
        assert!(maps.caustic().is_empty());
        assert!(maps.global().is_empty());
        for center in [Vec3::ZERO, Vec3::new(0.6, 0.0, 0.0), Vec3::splat(-50.0)] {
            for radius in [0.0, 0.3, 1_000.0] {
                assert!(maps.caustic().query(center, radius).is_empty());
                assert!(maps.global().query(center, radius).is_empty());
            }
        }

        // The pixel query still works with nothing to gather.
        let ctx = RenderContext::new(&scene, &rig, &integrator);
        let mut rng = StdRng::seed_from_u64(3);
        let color = render_pixel(&camera(), &ctx, 6, 7, &mut rng);
        assert!(color.is_finite() && color.min_element() >= 0.0);
    }

    #[test]
    fn test_render_both_modes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (scene, rig) = jewelry_scene();
        let camera = camera();

        for mode in [GiMode::PathTracing, GiMode::PhotonMap] {
            let mut config = small_config(mode);
            config.kernel = Kernel::Cone { k: 1.5 };
            config.gather_limit = Some(32);
            let integrator = Integrator::prepare(&scene, &rig, &config).unwrap();
            let ctx = RenderContext::new(&scene, &rig, &integrator);

            let image = render(&camera, &ctx);
            assert_eq!(image.pixels.len(), 12 * 8);
            assert!(image
                .pixels
                .iter()
                .all(|c| c.is_finite() && c.min_element() >= 0.0));
            assert!(image.pixels.iter().any(|c| c.max_element() > 0.0));

            // Bucket-local seeding makes the image reproducible.
            let again = render(&camera, &ctx);
            assert_eq!(image.pixels, again.pixels);
        }
    }

    #[test]
    fn test_failing_pixel_renders_black() {
        let objects: Vec<Box<dyn Hittable>> =
            vec![Box::new(Sphere::new(Vec3::ZERO, 1.0, MaterialId(3)))];
        let scene = Scene::new(vec![Material::diffuse("only", Vec3::ONE)], objects);
        let rig = LightRig::new(Vec::new(), Color::ZERO);
        let config = RenderConfig {
            background: Color::ONE,
            samples_per_pixel: 1,
            ..Default::default()
        };
        let integrator = Integrator::prepare(&scene, &rig, &config).unwrap();
        let ctx = RenderContext::new(&scene, &rig, &integrator);
        let camera = Camera::new()
            .with_resolution(9, 9)
            .with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
            .with_fov(60.0);
        let mut rng = StdRng::seed_from_u64(42);

        // Center pixel hits the sphere with a dangling material id.
        assert_eq!(render_pixel(&camera, &ctx, 4, 4, &mut rng), Color::ZERO);
        // Corner pixel misses and sees the background.
        assert_eq!(render_pixel(&camera, &ctx, 0, 0, &mut rng), Color::ONE);
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.25) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_image_buffer_rgba() {
        let mut image = ImageBuffer::new(2, 1);
        image.set(1, 0, Color::new(1.0, 0.25, 4.0));
        assert_eq!(image.get(1, 0), Color::new(1.0, 0.25, 4.0));
        assert_eq!(image.to_rgba(), vec![0, 0, 0, 255, 255, 127, 255, 255]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_pixel_count_does_not_wrap() {
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(pixel_count(u32::MAX, 2), 2 * u32::MAX as usize);
    }
}

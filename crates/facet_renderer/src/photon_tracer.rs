//! Photon emission and propagation.
//!
//! Photons travel from the lights through any number of specular bounces
//! and are deposited at the first diffuse surface they reach. There is no
//! diffuse-to-diffuse continuation: a deposit ends the photon's path.

use std::time::Instant;

use facet_core::SurfaceType;
use facet_math::{Ray, Vec3};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::sampling::{gen_f32, reflect, refract, schlick};
use crate::{Color, Intersection, LightSampler, Photon, PhotonStore, RenderError, RenderResult, SceneQuery};

/// Photons traced per parallel work item.
const EMISSION_CHUNK: usize = 4096;

/// What happened to a single traced photon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// Left the scene without reaching a diffuse surface.
    Escaped,
    /// Stored at a diffuse surface.
    Deposited { caustic: bool },
    /// Hit a surface that neither scatters nor stores photons.
    Absorbed,
    /// Exceeded the specular bounce cap and was discarded.
    Dropped,
}

/// Counters for one emission run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionStats {
    pub emitted: usize,
    pub deposited: usize,
    pub caustic: usize,
    pub escaped: usize,
    pub absorbed: usize,
    pub dropped: usize,
    /// Emission attempts with no light to emit from
    pub unlit: usize,
}

impl EmissionStats {
    fn record(&mut self, outcome: TraceOutcome) {
        self.emitted += 1;
        match outcome {
            TraceOutcome::Escaped => self.escaped += 1,
            TraceOutcome::Deposited { caustic } => {
                self.deposited += 1;
                if caustic {
                    self.caustic += 1;
                }
            }
            TraceOutcome::Absorbed => self.absorbed += 1,
            TraceOutcome::Dropped => self.dropped += 1,
        }
    }

    fn merge(&mut self, other: &EmissionStats) {
        self.emitted += other.emitted;
        self.deposited += other.deposited;
        self.caustic += other.caustic;
        self.escaped += other.escaped;
        self.absorbed += other.absorbed;
        self.dropped += other.dropped;
        self.unlit += other.unlit;
    }
}

/// Traces photons through a scene.
pub struct PhotonTracer<'a> {
    scene: &'a dyn SceneQuery,
    max_specular_bounces: u32,
    epsilon: f32,
}

impl<'a> PhotonTracer<'a> {
    pub fn new(scene: &'a dyn SceneQuery, max_specular_bounces: u32, epsilon: f32) -> Self {
        Self {
            scene,
            max_specular_bounces,
            epsilon,
        }
    }

    /// Propagate one photon, depositing it into `store` if it reaches a
    /// diffuse surface.
    pub fn trace_photon(
        &self,
        ray: Ray,
        power: Color,
        store: &mut PhotonStore,
        rng: &mut dyn RngCore,
    ) -> RenderResult<TraceOutcome> {
        if !ray.is_unit() {
            return Err(RenderError::NonUnitDirection {
                length: ray.direction.length(),
            });
        }

        let mut ray = ray;
        let mut power = power;
        let mut specular_bounces = 0;

        loop {
            let Some(hit) = self.scene.intersect(&ray)? else {
                return Ok(TraceOutcome::Escaped);
            };

            match hit.surface {
                SurfaceType::Diffuse => {
                    let caustic = specular_bounces > 0;
                    store.deposit(Photon::new(hit.point, -ray.direction, power), caustic);
                    return Ok(TraceOutcome::Deposited { caustic });
                }
                SurfaceType::Specular => {
                    if specular_bounces >= self.max_specular_bounces {
                        log::debug!(
                            "Dropping photon after {} specular bounces at {:?}",
                            specular_bounces,
                            hit.point
                        );
                        return Ok(TraceOutcome::Dropped);
                    }
                    specular_bounces += 1;

                    let (direction, tint) = specular_bounce(&ray, &hit, rng);
                    power *= tint;
                    ray = Ray::spawn(hit.point, direction, self.epsilon);
                }
                SurfaceType::Other => return Ok(TraceOutcome::Absorbed),
            }
        }
    }

    /// Emit `count` photons from `lights` in parallel.
    ///
    /// Each photon carries `1 / count` of the sampled light power. Work is
    /// split into fixed chunks with their own seeded RNG and store, and the
    /// chunk stores are concatenated in order, so the result is identical
    /// for a given seed regardless of thread count.
    pub fn emit_photons(
        &self,
        lights: &dyn LightSampler,
        count: usize,
        seed: u64,
        max_photons: usize,
    ) -> RenderResult<(PhotonStore, EmissionStats)> {
        if count > max_photons {
            return Err(RenderError::Capacity {
                requested: count,
                limit: max_photons,
            });
        }
        if count == 0 {
            return Ok((PhotonStore::new(), EmissionStats::default()));
        }

        log::info!("Emitting {} photons", count);
        let start = Instant::now();
        let scale = 1.0 / count as f32;
        let chunks = count.div_ceil(EMISSION_CHUNK);

        let results: Vec<(PhotonStore, EmissionStats)> = (0..chunks)
            .into_par_iter()
            .map(|chunk| -> RenderResult<(PhotonStore, EmissionStats)> {
                let n = EMISSION_CHUNK.min(count - chunk * EMISSION_CHUNK);
                let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
                let mut store = PhotonStore::with_capacity(n)?;
                let mut stats = EmissionStats::default();

                for _ in 0..n {
                    match lights.emit_photon(&mut rng) {
                        Some((ray, power)) => {
                            let outcome =
                                self.trace_photon(ray, power * scale, &mut store, &mut rng)?;
                            stats.record(outcome);
                        }
                        None => stats.unlit += 1,
                    }
                }
                Ok((store, stats))
            })
            .collect::<RenderResult<Vec<_>>>()?;

        let total: usize = results.iter().map(|(s, _)| s.len()).sum();
        let mut store = PhotonStore::with_capacity(total)?;
        let mut stats = EmissionStats::default();
        for (chunk_store, chunk_stats) in results {
            store.append(chunk_store)?;
            stats.merge(&chunk_stats);
        }

        log::info!(
            "Photon emission done in {:?}: {} deposited ({} caustic), {} escaped, {} absorbed, {} dropped",
            start.elapsed(),
            stats.deposited,
            stats.caustic,
            stats.escaped,
            stats.absorbed,
            stats.dropped
        );
        if stats.unlit > 0 {
            log::warn!("{} photons had no light to emit from", stats.unlit);
        }

        Ok((store, stats))
    }
}

/// Decorrelated seed for an emission chunk.
fn chunk_seed(seed: u64, chunk: usize) -> u64 {
    seed ^ (chunk as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Outgoing direction and power tint of a specular bounce.
///
/// Dielectrics refract by Snell's law, choosing reflection with the Schlick
/// probability (always on total internal reflection) and keeping power.
/// Mirrors reflect and scale power by their reflectivity.
fn specular_bounce(ray: &Ray, hit: &Intersection<'_>, rng: &mut dyn RngCore) -> (Vec3, Color) {
    let material = hit.material;
    let unit_direction = ray.direction;

    if material.transmissive {
        let ior = material.ior();
        let ratio = if hit.front_face { 1.0 / ior } else { ior };
        let cos_theta = (-unit_direction).dot(hit.normal).min(1.0);

        let direction = match refract(unit_direction, hit.normal, ratio) {
            Some(refracted) if schlick(cos_theta, ratio) <= gen_f32(rng) => refracted,
            _ => reflect(unit_direction, hit.normal),
        };
        return (direction, Color::ONE);
    }

    (
        reflect(unit_direction, hit.normal),
        Color::splat(material.reflectivity),
    )
}

//! Facet Renderer - CPU global illumination
//!
//! Two light-transport strategies behind one indirect-lighting contract:
//!
//! - **Photon mapping**: photons are emitted from the lights, deposited on
//!   diffuse surfaces, indexed in a k-d tree and turned into radiance with a
//!   kernel density estimate.
//! - **Path tracing**: recursive Monte Carlo sampling with separate budgets
//!   for total depth and diffuse (GI) bounces.
//!
//! Rendering is two-pass: [`Integrator::prepare`] runs the one-shot photon
//! preprocessing, after which every pixel query is read-only.

mod bucket;
mod bvh;
mod camera;
mod config;
mod error;
mod estimator;
mod hittable;
mod kdtree;
mod light;
mod path_tracer;
mod photon;
mod photon_tracer;
mod plane;
mod renderer;
mod sampling;
mod scene;
mod sphere;
mod split;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::Bvh;
pub use camera::Camera;
pub use config::{GiMode, Kernel, OpticalMode, RenderConfig, DEFAULT_EPSILON, MAX_TRACE_DEPTH};
pub use error::{ConfigError, RenderError, RenderResult};
pub use estimator::{
    IndirectEstimator, PhotonMap, PhotonMapEstimator, RadianceEstimator, StochasticSampler,
};
pub use hittable::{HitRecord, Hittable, HittableList};
pub use kdtree::KdTree;
pub use light::{LightRig, LightSampler, Shading};
pub use path_tracer::{Budget, PathTracer, TraceLimits};
pub use photon::{Photon, PhotonStore};
pub use photon_tracer::{EmissionStats, PhotonTracer, TraceOutcome};
pub use plane::Plane;
pub use renderer::{color_to_rgba, render, render_pixel, ImageBuffer, Integrator, RenderContext};
pub use sampling::{cosine_sample_hemisphere, reflect, refract, schlick, uniform_sample_sphere};
pub use scene::{Intersection, MaterialId, Scene, SceneQuery};
pub use sphere::Sphere;

/// Re-export Vec3 and common math types from facet_math
pub use facet_math::{Aabb, Interval, Ray, Vec3};

/// Color type alias (linear RGB)
pub type Color = Vec3;

//! Direction sampling and specular scattering helpers.

use std::f32::consts::PI;

use facet_math::Vec3;
use rand::{Rng, RngCore};

/// Uniform float in [0, 1).
#[inline]
pub(crate) fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with normal `n` facing against it.
///
/// Returns `None` on total internal reflection.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Option<Vec3> {
    let cos_theta = (-uv).dot(n).min(1.0);
    let sin_theta2 = (1.0 - cos_theta * cos_theta).max(0.0);
    if etai_over_etat * etai_over_etat * sin_theta2 > 1.0 {
        return None;
    }
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    Some((r_out_perp + r_out_parallel).normalize())
}

/// Schlick's approximation for Fresnel reflectance.
#[inline]
pub fn schlick(cosine: f32, ior_ratio: f32) -> f32 {
    let r0 = ((1.0 - ior_ratio) / (1.0 + ior_ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Cosine-weighted direction on the hemisphere around unit `normal`.
///
/// The pdf is `cos θ / π`, which cancels the cosine and `1/π` of a
/// Lambertian BRDF so a diffuse bounce is weighted by albedo alone.
pub fn cosine_sample_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);

    // Malley's method: uniform disk sample projected up onto the hemisphere.
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let x = r * phi.cos();
    let y = r * phi.sin();
    let z = (1.0 - u1).max(0.0).sqrt();

    let (tangent, bitangent) = normal.any_orthonormal_pair();
    (tangent * x + bitangent * y + normal * z).normalize()
}

/// Uniform direction on the unit sphere.
pub fn uniform_sample_sphere(rng: &mut dyn RngCore) -> Vec3 {
    let z = 1.0 - 2.0 * gen_f32(rng);
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * gen_f32(rng);
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

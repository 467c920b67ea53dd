//! Cook-Torrance specular + Lambertian diffuse shading
//!
//! Pure functions evaluated at bounce hit points. Distances feeding the
//! attenuation terms are bounced path lengths (light → hit → sample point),
//! which is what makes a single raycast model one indirect bounce.

use std::f32::consts::PI;

use glam::Vec3;

use crate::light::LightSample;
use crate::math::angle_between;

/// Base reflectivity of dielectrics.
pub const DIELECTRIC_F0: f32 = 0.04;

/// Minimum emitter radius for the radius-aware falloff curve.
const MIN_LIGHT_RADIUS: f32 = 0.1;

/// Distance attenuation flavor, from solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttenuationMode {
    pub sphere_area_falloff: bool,
    pub point_light_radius: bool,
}

/// View vector and base reflectivity for a bounce hit.
///
/// The "camera" of the bounce is the sample point being lit; `f0` blends
/// the dielectric constant toward the surface albedo by its metallic factor.
#[inline]
pub fn prep_bounce(hit_pos: Vec3, sample_pos: Vec3, metallic: f32, albedo: Vec3) -> (Vec3, Vec3) {
    let v = (sample_pos - hit_pos).normalize();
    let f0 = Vec3::splat(DIELECTRIC_F0).lerp(albedo, metallic);
    (v, f0)
}

/// Radiance contribution of one light at a bounce hit point.
#[allow(clippy::too_many_arguments)]
#[inline]
pub fn light_contribution(
    hit_pos: Vec3,
    normal: Vec3,
    albedo: Vec3,
    sample_pos: Vec3,
    metallic: f32,
    roughness: f32,
    v: Vec3,
    f0: Vec3,
    light: &LightSample,
    mode: AttenuationMode,
) -> Vec3 {
    let l = (light.position - hit_pos).normalize();
    let h = (v + l).normalize();

    let attenuation = if mode.point_light_radius {
        bounced_point_light_attenuation(light.position, sample_pos, hit_pos, light.radius())
    } else {
        bounced_distance_attenuation(
            light.position,
            sample_pos,
            hit_pos,
            mode.sphere_area_falloff,
        )
    };

    let angle_mul = light_angle_attenuation(light, hit_pos);
    let radiance = light.color() * attenuation * angle_mul * light.strength();

    let ndf = distribution_ggx(normal, h, roughness);
    let g = geometry_smith(normal, v, l, roughness);
    let f = fresnel_schlick(h.dot(v).max(0.0), f0);

    let k_s = f;
    let k_d = (Vec3::ONE - k_s) * (1.0 - metallic);

    let numerator = ndf * g * f;
    let denominator = 4.0 * normal.dot(v).max(0.0) * normal.dot(l).max(0.0) + 0.0001;
    let specular = numerator / denominator;

    let n_dot_l = normal.dot(l).max(0.0);
    (k_d * albedo / PI + specular) * radiance * n_dot_l
}

/// Reinhard tonemap followed by 1/2.2 gamma encoding.
#[inline]
pub fn tonemap_gamma(color: Vec3) -> Vec3 {
    let c = color / (color + Vec3::ONE);
    c.powf(1.0 / 2.2)
}

/// Attenuation over the bounced path `start → bounced → end`.
///
/// Distances below epsilon yield zero rather than a near-infinite result.
#[inline]
pub fn bounced_distance_attenuation(
    start: Vec3,
    end: Vec3,
    bounced: Vec3,
    sphere_area_falloff: bool,
) -> f32 {
    let distance = start.distance(bounced) + end.distance(bounced);
    if distance < f32::EPSILON {
        return 0.0;
    }

    if sphere_area_falloff {
        let surface_area = 4.0 * PI * distance * distance;
        return 1.0 / surface_area;
    }

    1.0 / (distance * distance)
}

/// Radius-aware point light falloff over the bounced path.
///
/// `c1 * c2` with `c1 = 2/r²` and `c2 = 1 - d/√(d² + r²)`; finite at d = 0.
#[inline]
pub fn bounced_point_light_attenuation(start: Vec3, end: Vec3, bounced: Vec3, radius: f32) -> f32 {
    let distance = start.distance(bounced) + end.distance(bounced);
    let radius = radius.max(MIN_LIGHT_RADIUS);

    let c1 = 2.0 / (radius * radius);
    let c2 = 1.0 - distance / (distance * distance + radius * radius).sqrt();

    c1 * c2
}

/// Spot cone attenuation: full inside the inner angle, linear falloff to
/// zero between inner and outer, zero beyond.
#[inline]
fn light_angle_attenuation(light: &LightSample, world_pos: Vec3) -> f32 {
    let angle = angle_between(light.direction, (world_pos - light.position).normalize());
    if angle < light.inner_angle() {
        1.0
    } else if angle < light.outer_angle() {
        1.0 - ((angle - light.inner_angle()) / (light.outer_angle() - light.inner_angle()))
            .clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[inline]
fn distribution_ggx(n: Vec3, h: Vec3, roughness: f32) -> f32 {
    let a = roughness * roughness;
    let a2 = a * a;
    let n_dot_h = n.dot(h).max(0.0);
    let n_dot_h2 = n_dot_h * n_dot_h;

    let denom = n_dot_h2 * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

#[inline]
fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = (r * r) / 8.0;
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

#[inline]
fn geometry_smith(n: Vec3, v: Vec3, l: Vec3, roughness: f32) -> f32 {
    let n_dot_v = n.dot(v).max(0.0);
    let n_dot_l = n.dot(l).max(0.0);
    geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness)
}

#[inline]
fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

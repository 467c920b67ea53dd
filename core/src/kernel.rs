//! Per-shape raycast shading kernel
//!
//! One invocation advances one shape by one convergence step: pick the next
//! polygon region round-robin, rotate the ray fan a little, cast the
//! high-fidelity fan from every sample point in the region, shade hits with
//! the bounce PBR model and fold the result into a cumulative moving
//! average. Low ray counts per pass converge over many passes instead of
//! resolving in one.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use crate::fan::FanAsset;
use crate::light::LightSample;
use crate::pbr::{self, AttenuationMode};
use crate::raycast::RayCaster;
use crate::settings::GiSettings;
use crate::shape::{GiMaterial, PolygonRegion, SamplePoint};

/// Steps after which a shape is considered converged and frozen.
pub const FADE_IN_LIMIT: u32 = 1000;

/// Fan rotation advance per step, radians.
const FAN_ROTATION_STEP: f32 = 0.01;

/// Rasterization happens every this many shading steps.
const RASTER_INTERVAL: u32 = 10;

/// Nearest lights evaluated per bounce hit.
pub const LIGHTS_PER_POINT: usize = 3;

/// Ray origins are lifted off the surface by this much.
const RAY_ORIGIN_BIAS: f32 = 0.01;

/// Constant ambient fraction of the shape's own albedo.
const AMBIENT_FACTOR: f32 = 0.03;

/// Per-shape mutable convergence state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeState {
    /// Monotonically advancing fan rotation, radians (wrapped on use).
    pub fan_rotation: f32,
    /// Convergence step counter; reset to zero when lights change.
    pub fade_in: u32,
    /// Round-robin cursor into the shape's polygon regions.
    pub region_cursor: usize,
    /// Shaded data pending rasterization.
    pub dirty: bool,
}

/// What a kernel invocation did with its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeOutcome {
    /// One region was shaded.
    Shaded,
    /// The shape is past the fade-in limit; nothing was touched.
    Frozen,
    /// The shape has no sample points.
    Empty,
}

/// Shared read-only state for one shading pass.
pub struct ShadeContext<'a> {
    pub settings: &'a GiSettings,
    pub fans: &'a FanAsset,
    pub lights: &'a [LightSample],
    pub caster: &'a dyn RayCaster,
    /// Materials for every shape in the world, indexed by hit handle.
    pub materials: &'a [GiMaterial],
}

/// Advance one shape by one convergence step.
///
/// `points` and `pixels` are the shape's own slices of the global buffers;
/// `shape_start` is the shape's offset into the global index space (region
/// `start` fields are global).
pub fn shade_shape(
    ctx: &ShadeContext<'_>,
    regions: &[PolygonRegion],
    material: &GiMaterial,
    state: &mut ShapeState,
    shape_start: usize,
    points: &[SamplePoint],
    pixels: &mut [Vec3],
) -> ShadeOutcome {
    if regions.is_empty() || points.is_empty() {
        return ShadeOutcome::Empty;
    }

    // Large shapes refine one region per step, not all at once
    let region = &regions[state.region_cursor % regions.len()];
    state.region_cursor = (state.region_cursor + 1) % regions.len();

    if state.fade_in > FADE_IN_LIMIT {
        return ShadeOutcome::Frozen;
    }
    state.fan_rotation += FAN_ROTATION_STEP;
    state.fade_in += 1;
    if state.fade_in % RASTER_INTERVAL == 1 {
        state.dirty = true;
    }

    let local = (region.start - shape_start)..(region.start - shape_start + region.len);
    let points = &points[local.clone()];
    let pixels = &mut pixels[local];

    // One nearest-lights ordering per region, measured from its middle
    // point and reused for every point in the region.
    let middle = points[points.len() / 2].position;
    let mut closest: Vec<(f32, LightSample)> = ctx
        .lights
        .iter()
        .map(|light| (middle.distance_squared(light.position), *light))
        .collect();
    closest.sort_by(|a, b| a.0.total_cmp(&b.0));

    let fan_offset = Quat::from_axis_angle(Vec3::Y, state.fan_rotation % TAU);
    let fan = ctx.fans.high();
    let mode = AttenuationMode {
        sphere_area_falloff: ctx.settings.use_sphere_area_falloff,
        point_light_radius: ctx.settings.use_point_light_radius,
    };

    for (pixel, point) in pixels.iter_mut().zip(points) {
        let mut acc = Vec3::ZERO;
        let mut hits = 0u32;
        let rotated = point.rotation * fan_offset;
        let normal = point.normal();

        for ray_rot in fan {
            cast_bounce(
                ctx,
                mode,
                &mut hits,
                &mut acc,
                point.position,
                rotated,
                normal,
                *ray_rot,
                &closest,
            );
        }

        acc += material.albedo_rgb() * AMBIENT_FACTOR;

        if state.fade_in == 1 {
            // First-ever step: store directly. With zero hits only the
            // ambient term is stored, never a divide-by-zero.
            let avg = if hits > 0 { acc / hits as f32 } else { acc };
            *pixel = pbr::tonemap_gamma(avg);
        } else if hits > 0 {
            let avg = pbr::tonemap_gamma(acc / hits as f32);
            *pixel = (avg + *pixel * state.fade_in as f32) / (state.fade_in as f32 + 1.0);
        }
        // Zero hits after the first step leaves the accumulated value alone
    }

    ShadeOutcome::Shaded
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn cast_bounce(
    ctx: &ShadeContext<'_>,
    mode: AttenuationMode,
    hits: &mut u32,
    acc: &mut Vec3,
    position: Vec3,
    point_rot: Quat,
    normal: Vec3,
    ray_rot: Quat,
    closest: &[(f32, LightSample)],
) {
    let dir = (point_rot * ray_rot) * Vec3::Y;
    let start = position + normal * RAY_ORIGIN_BIAS;
    let end = position + dir * ctx.settings.max_raycast_length;

    let Some(hit) = ctx.caster.cast(start, end) else {
        return;
    };
    *hits += 1;

    let hit_material = &ctx.materials[hit.shape.index()];
    let (v, f0) = pbr::prep_bounce(
        hit.position,
        position,
        hit_material.metallic,
        hit_material.albedo_rgb(),
    );

    for (_, light) in closest.iter().take(LIGHTS_PER_POINT) {
        *acc += pbr::light_contribution(
            hit.position,
            hit.normal,
            hit_material.albedo_rgb(),
            position,
            hit_material.metallic,
            1.0 - hit_material.smoothness,
            v,
            f0,
            light,
            mode,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{LightCollector, LightDesc};
    use crate::raycast::PlanarRayCaster;
    use crate::settings::FanSettings;
    use crate::shape::{generate_sample_points, ShapeDesc, ShapeKind};
    use glam::{Quat, UVec2, Vec2, Vec4};

    struct Fixture {
        settings: GiSettings,
        fans: FanAsset,
        lights: LightCollector,
        caster: PlanarRayCaster,
        materials: Vec<GiMaterial>,
        regions: Vec<PolygonRegion>,
        points: Vec<SamplePoint>,
    }

    /// Floor at y=0 plus a ceiling at y=2 facing down; samples live on the
    /// floor so upward rays always find the ceiling.
    fn fixture() -> Fixture {
        let floor = ShapeDesc {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            kind: ShapeKind::Plane { size: Vec2::splat(4.0) },
        };
        let ceiling = ShapeDesc {
            position: Vec3::new(0.0, 2.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::PI),
            scale: Vec3::ONE,
            kind: ShapeKind::Plane { size: Vec2::splat(8.0) },
        };

        let material = GiMaterial {
            resolution: UVec2::new(4, 4),
            albedo: Vec4::new(0.8, 0.8, 0.8, 1.0),
            smoothness: 0.2,
            metallic: 0.0,
        };

        let mut points = Vec::new();
        let mut regions = Vec::new();
        generate_sample_points(&floor, material.resolution, 0.01, 0, &mut points, &mut regions);

        let mut lights = LightCollector::default();
        lights.collect(&[LightDesc {
            position: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::NEG_Y,
            spot_angle: 120.0,
            inner_percent: 50.0,
            color_temperature: 6500.0,
            intensity: 50.0,
            radius: 0.1,
        }]);

        Fixture {
            settings: GiSettings {
                max_raycast_length: 20.0,
                fan: FanSettings {
                    raycast_count_low: 4,
                    raycast_count_mid: 8,
                    raycast_count_high: 16,
                    ..FanSettings::default()
                },
                ..GiSettings::default()
            },
            fans: FanAsset::build(&FanSettings {
                raycast_count_low: 4,
                raycast_count_mid: 8,
                raycast_count_high: 16,
                ..FanSettings::default()
            }),
            lights,
            caster: PlanarRayCaster::from_shapes([&floor, &ceiling]),
            materials: vec![material, material],
            regions,
            points,
        }
    }

    fn shade(fx: &mut Fixture, state: &mut ShapeState, pixels: &mut [Vec3]) -> ShadeOutcome {
        let ctx = ShadeContext {
            settings: &fx.settings,
            fans: &fx.fans,
            lights: fx.lights.samples(),
            caster: &fx.caster,
            materials: &fx.materials,
        };
        let material = fx.materials[0];
        shade_shape(&ctx, &fx.regions, &material, state, 0, &fx.points, pixels)
    }

    #[test]
    fn test_first_step_writes_every_point() {
        let mut fx = fixture();
        let mut state = ShapeState::default();
        let mut pixels = vec![Vec3::ZERO; fx.points.len()];

        assert_eq!(shade(&mut fx, &mut state, &mut pixels), ShadeOutcome::Shaded);
        assert_eq!(state.fade_in, 1);
        assert!(state.dirty);
        for p in &pixels {
            assert!(p.is_finite());
            assert!(p.min_element() > 0.0, "unlit pixel: {p:?}");
        }
    }

    #[test]
    fn test_convergence_is_stable() {
        let mut fx = fixture();
        let mut state = ShapeState::default();
        let mut pixels = vec![Vec3::ZERO; fx.points.len()];

        shade(&mut fx, &mut state, &mut pixels);
        let first = pixels.clone();

        let mut last_delta = f32::MAX;
        for step in 0..200 {
            let before = pixels.clone();
            shade(&mut fx, &mut state, &mut pixels);
            let delta: f32 = pixels
                .iter()
                .zip(&before)
                .map(|(a, b)| (*a - *b).length())
                .sum();
            if step % 50 == 49 {
                // Per-step movement settles as the average accumulates
                assert!(delta <= last_delta + 1e-3, "diverging at step {step}");
                last_delta = delta;
            }
        }

        // The converged result stays in the neighborhood of the first
        // estimate rather than drifting unboundedly
        for (a, b) in pixels.iter().zip(&first) {
            assert!((*a - *b).length() < 1.0);
        }
    }

    #[test]
    fn test_freeze_after_fade_in_limit() {
        let mut fx = fixture();
        let mut state = ShapeState { fade_in: FADE_IN_LIMIT + 1, ..ShapeState::default() };
        let mut pixels = vec![Vec3::splat(0.5); fx.points.len()];

        assert_eq!(shade(&mut fx, &mut state, &mut pixels), ShadeOutcome::Frozen);
        assert_eq!(state.fade_in, FADE_IN_LIMIT + 1);
        assert!(!state.dirty);
        assert!(pixels.iter().all(|p| *p == Vec3::splat(0.5)));
    }

    #[test]
    fn test_dirty_throttle() {
        let mut fx = fixture();
        let mut state = ShapeState::default();
        let mut pixels = vec![Vec3::ZERO; fx.points.len()];

        // Step 1 marks dirty, steps 2..=10 do not
        shade(&mut fx, &mut state, &mut pixels);
        assert!(state.dirty);
        state.dirty = false;
        for _ in 0..9 {
            shade(&mut fx, &mut state, &mut pixels);
            assert!(!state.dirty);
        }
        // Step 11 is the next `% 10 == 1`
        shade(&mut fx, &mut state, &mut pixels);
        assert!(state.dirty);
    }

    #[test]
    fn test_no_lights_still_shades_ambient() {
        let mut fx = fixture();
        fx.lights.collect(&[]);
        let mut state = ShapeState::default();
        let mut pixels = vec![Vec3::ZERO; fx.points.len()];

        shade(&mut fx, &mut state, &mut pixels);
        for p in &pixels {
            assert!(p.is_finite());
            assert!(p.min_element() > 0.0);
        }
    }

    #[test]
    fn test_empty_shape_is_skipped() {
        let mut fx = fixture();
        fx.regions.clear();
        fx.points.clear();
        let mut state = ShapeState::default();

        assert_eq!(shade(&mut fx, &mut state, &mut []), ShadeOutcome::Empty);
        assert_eq!(state.fade_in, 0);
    }
}

//! Light enumeration and per-step snapshots
//!
//! Hosts expose their lights through [`LightProvider`]; each update the
//! collector flattens them into [`LightSample`]s and reports whether
//! anything changed. A change invalidates all accumulated indirect light,
//! so the world resets every shape's convergence counter in response.

use std::sync::{Arc, Mutex};

use glam::{Vec3, Vec4};

/// Host-side description of one active light source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub position: Vec3,
    /// Unit forward vector of the light.
    pub direction: Vec3,
    /// Full cone angle in degrees.
    pub spot_angle: f32,
    /// Inner cone as a percentage of the outer cone.
    pub inner_percent: f32,
    /// Correlated color temperature in Kelvin.
    pub color_temperature: f32,
    pub intensity: f32,
    /// Emitter radius for the radius-aware falloff mode.
    pub radius: f32,
}

/// Supplies the current list of active lights each update.
pub trait LightProvider: Send + Sync {
    fn lights(&self) -> Vec<LightDesc>;
}

/// Fixed light list that never changes.
pub struct StaticLights(pub Vec<LightDesc>);

impl LightProvider for StaticLights {
    fn lights(&self) -> Vec<LightDesc> {
        self.0.clone()
    }
}

/// Mutex-backed light list a host can mutate between steps.
#[derive(Clone, Default)]
pub struct SharedLights(Arc<Mutex<Vec<LightDesc>>>);

impl SharedLights {
    pub fn new(lights: Vec<LightDesc>) -> Self {
        Self(Arc::new(Mutex::new(lights)))
    }

    pub fn set(&self, lights: Vec<LightDesc>) {
        *self.0.lock().unwrap() = lights;
    }

    pub fn update<F: FnOnce(&mut Vec<LightDesc>)>(&self, f: F) {
        f(&mut self.0.lock().unwrap());
    }
}

impl LightProvider for SharedLights {
    fn lights(&self) -> Vec<LightDesc> {
        self.0.lock().unwrap().clone()
    }
}

/// Read-only snapshot of one light, derived from its description.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightSample {
    pub color_and_strength: Vec4,
    pub position: Vec3,
    pub direction: Vec3,
    pub cone_angles_and_radius: Vec3,
}

impl LightSample {
    pub fn color(&self) -> Vec3 {
        self.color_and_strength.truncate()
    }

    pub fn strength(&self) -> f32 {
        self.color_and_strength.w
    }

    /// Outer cone half-angle in radians.
    pub fn outer_angle(&self) -> f32 {
        self.cone_angles_and_radius.x
    }

    /// Inner cone half-angle in radians.
    pub fn inner_angle(&self) -> f32 {
        self.cone_angles_and_radius.y
    }

    pub fn radius(&self) -> f32 {
        self.cone_angles_and_radius.z
    }

    fn from_desc(desc: &LightDesc) -> Self {
        let color = correlated_color_temperature_to_rgb(desc.color_temperature);
        let inner_angle = desc.inner_percent / 100.0 * desc.spot_angle;

        Self {
            position: desc.position,
            direction: desc.direction,
            color_and_strength: color.extend(desc.intensity),
            cone_angles_and_radius: Vec3::new(
                (desc.spot_angle / 2.0).to_radians(),
                (inner_angle / 2.0).to_radians(),
                desc.radius,
            ),
        }
    }
}

/// Maintains the current frame's light snapshot and detects changes.
#[derive(Default)]
pub struct LightCollector {
    samples: Vec<LightSample>,
}

impl LightCollector {
    /// Rebuild the snapshot from `descs`.
    ///
    /// Returns true when anything differs from the previous snapshot,
    /// including the initial collection and any count change.
    pub fn collect(&mut self, descs: &[LightDesc]) -> bool {
        let mut dirty = false;

        if self.samples.len() != descs.len() {
            self.samples.resize(descs.len(), LightSample::default());
            dirty = true;
        }

        for (slot, desc) in self.samples.iter_mut().zip(descs) {
            let sample = LightSample::from_desc(desc);
            if *slot != sample {
                dirty = true;
            }
            *slot = sample;
        }

        if dirty {
            tracing::debug!(lights = descs.len(), "light snapshot changed");
        }

        dirty
    }

    pub fn samples(&self) -> &[LightSample] {
        &self.samples
    }
}

/// Approximate the linear sRGB color of a black body at `kelvin`.
///
/// Planckian locus approximation in CIE 1960 UCS, converted through xyY and
/// XYZ to linear sRGB. Input is clamped to [1000, 40000] K; out-of-gamut
/// channels are clamped to zero.
pub fn correlated_color_temperature_to_rgb(kelvin: f32) -> Vec3 {
    let t = kelvin.clamp(1000.0, 40000.0);

    let u = (0.860117757 + 1.54118254e-4 * t + 1.28641212e-7 * t * t)
        / (1.0 + 8.42420235e-4 * t + 7.08145163e-7 * t * t);
    let v = (0.317398726 + 4.22806245e-5 * t + 4.20481691e-8 * t * t)
        / (1.0 - 2.89741816e-5 * t + 1.61456053e-7 * t * t);

    let x = 3.0 * u / (2.0 * u - 8.0 * v + 4.0);
    let y = 2.0 * v / (2.0 * u - 8.0 * v + 4.0);
    let z = 1.0 - x - y;

    let big_x = x / y;
    let big_z = z / y;

    let r = 3.240_969_9 * big_x - 1.537_383_2 - 0.498_610_76 * big_z;
    let g = -0.969_243_65 * big_x + 1.875_967_5 + 0.041_555_06 * big_z;
    let b = 0.012_514_21 * big_x - 0.712_142_49 + 1.053_099_1 * big_z;

    Vec3::new(r.max(0.0), g.max(0.0), b.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(position: Vec3, intensity: f32) -> LightDesc {
        LightDesc {
            position,
            direction: Vec3::NEG_Y,
            spot_angle: 60.0,
            inner_percent: 80.0,
            color_temperature: 6500.0,
            intensity,
            radius: 0.1,
        }
    }

    #[test]
    fn test_initial_collect_is_dirty() {
        let mut collector = LightCollector::default();
        assert!(collector.collect(&[spot(Vec3::ZERO, 10.0)]));
        assert_eq!(collector.samples().len(), 1);
    }

    #[test]
    fn test_unchanged_collect_is_clean() {
        let mut collector = LightCollector::default();
        let lights = [spot(Vec3::ZERO, 10.0)];
        collector.collect(&lights);
        assert!(!collector.collect(&lights));
    }

    #[test]
    fn test_field_change_is_dirty() {
        let mut collector = LightCollector::default();
        collector.collect(&[spot(Vec3::ZERO, 10.0)]);
        assert!(collector.collect(&[spot(Vec3::ZERO, 11.0)]));
        assert!(collector.collect(&[spot(Vec3::X, 11.0)]));
    }

    #[test]
    fn test_count_change_is_dirty() {
        let mut collector = LightCollector::default();
        collector.collect(&[spot(Vec3::ZERO, 10.0)]);
        assert!(collector.collect(&[spot(Vec3::ZERO, 10.0), spot(Vec3::X, 5.0)]));
        assert!(collector.collect(&[]));
        assert!(collector.samples().is_empty());
    }

    #[test]
    fn test_cone_angle_derivation() {
        let mut collector = LightCollector::default();
        collector.collect(&[spot(Vec3::ZERO, 1.0)]);
        let sample = collector.samples()[0];

        assert!((sample.outer_angle() - 30.0f32.to_radians()).abs() < 1e-6);
        // Inner cone is 80% of the outer cone
        assert!((sample.inner_angle() - 24.0f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_color_temperature_extremes() {
        let warm = correlated_color_temperature_to_rgb(2000.0);
        let neutral = correlated_color_temperature_to_rgb(6500.0);
        let cool = correlated_color_temperature_to_rgb(20000.0);

        assert!(warm.x > warm.z, "2000K should be red-dominant: {warm:?}");
        assert!(cool.z > cool.x, "20000K should be blue-dominant: {cool:?}");
        // D65-ish white: channels within ~15% of each other
        let max = neutral.max_element();
        let min = neutral.min_element();
        assert!(max > 0.0 && (max - min) / max < 0.15, "{neutral:?}");
    }
}

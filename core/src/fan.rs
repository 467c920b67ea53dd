//! Precomputed ray fan direction sets
//!
//! A fan is an immutable set of rotations applied to a sample point's
//! orientation to produce hemisphere ray directions. Three fidelity tiers
//! are built once per GI world and shared read-only by every shading task.

use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::math::align_up_to;
use crate::settings::FanSettings;

/// Which fan tier to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Low,
    Mid,
    High,
}

/// Immutable hemisphere sample rotation sets.
#[derive(Debug, Clone)]
pub struct FanAsset {
    low: Vec<Quat>,
    mid: Vec<Quat>,
    high: Vec<Quat>,
}

impl FanAsset {
    /// Build all three tiers from settings.
    ///
    /// Pure function of its input: degenerate counts of zero produce empty
    /// tiers rather than an error.
    pub fn build(settings: &FanSettings) -> Self {
        if settings.use_fibonacci_fan {
            Self {
                low: half_fibonacci_sphere(settings.raycast_count_low),
                mid: half_fibonacci_sphere(settings.raycast_count_mid),
                high: half_fibonacci_sphere(settings.raycast_count_high),
            }
        } else {
            let fan = ring_fan(
                settings.start_spread_angle,
                settings.circle_count,
                settings.spread_count,
            );
            Self { low: fan.clone(), mid: fan.clone(), high: fan }
        }
    }

    pub fn tier(&self, fidelity: Fidelity) -> &[Quat] {
        match fidelity {
            Fidelity::Low => &self.low,
            Fidelity::Mid => &self.mid,
            Fidelity::High => &self.high,
        }
    }

    pub fn high(&self) -> &[Quat] {
        &self.high
    }
}

/// Golden-ratio spiral over the upper hemisphere.
///
/// Directions generated over the full sphere are mirrored above the horizon,
/// then converted into rotations that map the canonical up axis onto the
/// direction.
fn half_fibonacci_sphere(count: usize) -> Vec<Quat> {
    let golden_ratio = (1.0 + 5.0f32.sqrt()) / 2.0;
    let angle_increment = TAU * golden_ratio;

    let mut rotations = Vec::with_capacity(count);
    for i in 0..count {
        let t = i as f32 / count as f32;
        let polar = (1.0 - 2.0 * t).acos();
        let azimuth = angle_increment * i as f32;

        let mut dir = Vec3::new(
            polar.sin() * azimuth.cos(),
            polar.sin() * azimuth.sin(),
            polar.cos(),
        );
        if Vec3::Y.dot(dir) < 0.0 {
            dir = -dir;
        }

        // The look-rotation reference must not be parallel to the direction
        let reference = if dir.abs_diff_eq(Vec3::Z, 1e-6) { Vec3::Y } else { Vec3::Z };
        rotations.push(align_up_to(dir, reference));
    }

    rotations
}

/// Nested azimuth/polar ring fan between `start_spread_angle` and the zenith.
fn ring_fan(start_spread_angle: f32, circle_count: usize, spread_count: usize) -> Vec<Quat> {
    let start = start_spread_angle.to_radians();
    let spread_range = FRAC_PI_2 - start;

    let mut rotations = Vec::with_capacity(circle_count * spread_count);
    for c in 0..circle_count {
        let circle_step = c as f32 / circle_count as f32 * TAU;
        let circle_rot = Quat::from_axis_angle(Vec3::Y, circle_step);

        for s in 0..spread_count {
            let spread_step = s as f32 / spread_count as f32 * spread_range + start;
            let spread_rot = Quat::from_axis_angle(Vec3::X, FRAC_PI_2 - spread_step);
            rotations.push(circle_rot * spread_rot);
        }
    }

    rotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FanSettings;

    fn fibonacci_settings(low: usize, mid: usize, high: usize) -> FanSettings {
        FanSettings {
            use_fibonacci_fan: true,
            raycast_count_low: low,
            raycast_count_mid: mid,
            raycast_count_high: high,
            ..FanSettings::default()
        }
    }

    #[test]
    fn test_tier_counts() {
        let fans = FanAsset::build(&fibonacci_settings(4, 16, 64));
        assert_eq!(fans.tier(Fidelity::Low).len(), 4);
        assert_eq!(fans.tier(Fidelity::Mid).len(), 16);
        assert_eq!(fans.tier(Fidelity::High).len(), 64);
    }

    #[test]
    fn test_zero_counts_yield_empty_tiers() {
        let fans = FanAsset::build(&fibonacci_settings(0, 0, 0));
        assert!(fans.high().is_empty());
    }

    #[test]
    fn test_fibonacci_rotations_are_unit() {
        let fans = FanAsset::build(&fibonacci_settings(0, 0, 128));
        for rot in fans.high() {
            assert!((rot.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fibonacci_directions_never_below_horizon() {
        let fans = FanAsset::build(&fibonacci_settings(0, 0, 256));
        for rot in fans.high() {
            let dir = *rot * Vec3::Y;
            assert!(dir.y >= -1e-4, "direction below horizon: {dir:?}");
            assert!((dir.length() - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_ring_fan_shares_one_set_across_tiers() {
        let settings = FanSettings {
            use_fibonacci_fan: false,
            start_spread_angle: 30.0,
            circle_count: 6,
            spread_count: 3,
            ..FanSettings::default()
        };
        let fans = FanAsset::build(&settings);
        assert_eq!(fans.tier(Fidelity::Low).len(), 18);
        assert_eq!(fans.tier(Fidelity::Low), fans.tier(Fidelity::High));
    }

    #[test]
    fn test_ring_fan_directions_within_spread() {
        let settings = FanSettings {
            use_fibonacci_fan: false,
            start_spread_angle: 45.0,
            circle_count: 8,
            spread_count: 4,
            ..FanSettings::default()
        };
        let fans = FanAsset::build(&settings);
        for rot in fans.high() {
            let dir = *rot * Vec3::Y;
            // Polar angle stays at or above the configured start spread
            assert!(dir.y >= (45.0f32.to_radians()).sin() - 1e-4);
        }
    }
}

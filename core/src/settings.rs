//! Solver configuration
//!
//! `GiSettings` is plain serde data so hosts can load it from TOML. Every
//! field has a default; a missing file or section falls back to a usable
//! configuration.

use serde::{Deserialize, Serialize};

/// Top-level solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiSettings {
    /// Maximum world-space length of a bounce ray.
    #[serde(default = "default_max_raycast_length")]
    pub max_raycast_length: f32,

    /// Attenuate by sphere surface area (`1/(4πd²)`) instead of plain
    /// inverse-square falloff.
    #[serde(default)]
    pub use_sphere_area_falloff: bool,

    /// Use the radius-aware point light falloff curve instead of
    /// distance-only attenuation.
    #[serde(default)]
    pub use_point_light_radius: bool,

    /// Padding in pixels subtracted from each packed region's UV transform
    /// to avoid bilinear bleed between neighbors.
    #[serde(default = "default_texture_padding")]
    pub texture_padding: f32,

    /// Edge length of every finished atlas, in pixels.
    #[serde(default = "default_lightmap_size")]
    pub lightmap_size: u32,

    #[serde(default)]
    pub fan: FanSettings,
}

/// Ray fan construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanSettings {
    /// Golden-ratio spiral over the hemisphere; when false the ring fan
    /// below is used for all three tiers.
    #[serde(default = "default_true")]
    pub use_fibonacci_fan: bool,

    #[serde(default = "default_count_low")]
    pub raycast_count_low: usize,
    #[serde(default = "default_count_mid")]
    pub raycast_count_mid: usize,
    #[serde(default = "default_count_high")]
    pub raycast_count_high: usize,

    /// Ring fan: first polar angle in degrees, measured from the horizon.
    #[serde(default = "default_start_spread_angle")]
    pub start_spread_angle: f32,
    /// Ring fan: azimuth step count.
    #[serde(default = "default_circle_count")]
    pub circle_count: usize,
    /// Ring fan: polar step count between `start_spread_angle` and 90°.
    #[serde(default = "default_spread_count")]
    pub spread_count: usize,
}

fn default_max_raycast_length() -> f32 {
    100.0
}
fn default_texture_padding() -> f32 {
    2.0
}
fn default_lightmap_size() -> u32 {
    256
}
fn default_true() -> bool {
    true
}
fn default_count_low() -> usize {
    8
}
fn default_count_mid() -> usize {
    24
}
fn default_count_high() -> usize {
    64
}
fn default_start_spread_angle() -> f32 {
    30.0
}
fn default_circle_count() -> usize {
    8
}
fn default_spread_count() -> usize {
    4
}

impl Default for GiSettings {
    fn default() -> Self {
        Self {
            max_raycast_length: default_max_raycast_length(),
            use_sphere_area_falloff: false,
            use_point_light_radius: false,
            texture_padding: default_texture_padding(),
            lightmap_size: default_lightmap_size(),
            fan: FanSettings::default(),
        }
    }
}

impl Default for FanSettings {
    fn default() -> Self {
        Self {
            use_fibonacci_fan: true,
            raycast_count_low: default_count_low(),
            raycast_count_mid: default_count_mid(),
            raycast_count_high: default_count_high(),
            start_spread_angle: default_start_spread_angle(),
            circle_count: default_circle_count(),
            spread_count: default_spread_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings: GiSettings = toml::from_str("").unwrap();
        assert_eq!(settings, GiSettings::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let settings: GiSettings = toml::from_str(
            r#"
            max_raycast_length = 25.0

            [fan]
            use_fibonacci_fan = false
            circle_count = 16
            "#,
        )
        .unwrap();

        assert_eq!(settings.max_raycast_length, 25.0);
        assert!(!settings.fan.use_fibonacci_fan);
        assert_eq!(settings.fan.circle_count, 16);
        // Untouched fields keep their defaults
        assert_eq!(settings.lightmap_size, 256);
        assert_eq!(settings.fan.spread_count, 4);
    }
}

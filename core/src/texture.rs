//! CPU-side atlas pixel buffers
//!
//! The solver rasterizes into plain RGBA8 buffers; uploading them to a GPU
//! is the host's job. `apply()` bumps a version counter after a batch of
//! writes so hosts can poll for re-upload instead of diffing pixels.

use glam::Vec3;

/// Convert f32 to unsigned normalized 8-bit, clamping to [0.0, 1.0].
#[inline]
pub fn f32_to_unorm8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * 255.0) as u8
}

/// Pack a linear RGB color to RGBA8 with full alpha.
#[inline]
pub fn pack_color_unorm8(color: Vec3) -> [u8; 4] {
    [
        f32_to_unorm8(color.x),
        f32_to_unorm8(color.y),
        f32_to_unorm8(color.z),
        255,
    ]
}

/// Fixed-size RGBA8 atlas texture.
#[derive(Debug, Clone)]
pub struct AtlasTexture {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
    version: u64,
}

impl AtlasTexture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0, 255]; (width * height) as usize],
            version: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Write one pixel. Coordinates outside the texture are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        self.pixels[(y * self.width as i64 + x) as usize] = rgba;
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Raw pixel rows, bottom-up, for host upload or export.
    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Finish a batch of writes; hosts re-upload when `version` changes.
    pub fn apply(&mut self) {
        self.version += 1;
        tracing::debug!(version = self.version, "atlas applied");
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_unorm8_range_and_clamping() {
        assert_eq!(f32_to_unorm8(0.0), 0);
        assert_eq!(f32_to_unorm8(0.5), 127);
        assert_eq!(f32_to_unorm8(1.0), 255);
        assert_eq!(f32_to_unorm8(-1.0), 0);
        assert_eq!(f32_to_unorm8(2.0), 255);
    }

    #[test]
    fn test_set_pixel_ignores_out_of_bounds() {
        let mut tex = AtlasTexture::new(4, 4);
        tex.set_pixel(-1, 0, [9; 4]);
        tex.set_pixel(0, 4, [9; 4]);
        tex.set_pixel(2, 2, [10, 20, 30, 255]);

        assert_eq!(tex.pixel(2, 2), [10, 20, 30, 255]);
        assert!(tex.pixels().iter().all(|p| p[0] != 9));
    }

    #[test]
    fn test_apply_bumps_version() {
        let mut tex = AtlasTexture::new(2, 2);
        assert_eq!(tex.version(), 0);
        tex.apply();
        tex.apply();
        assert_eq!(tex.version(), 2);
    }
}

//! Region rasterization into atlas pixel buffers
//!
//! Rectangular regions (the only kind the plane sampler produces) take a
//! direct per-pixel path; irregular regions fall back to a scanline polygon
//! fill. Colors are copied, not resampled, and written at 8 bits per
//! channel with full alpha.

use glam::Vec3;
use smallvec::SmallVec;

use crate::shape::PolygonRegion;
use crate::texture::{pack_color_unorm8, AtlasTexture};

/// Constant exposure multiplier applied when converting to 8-bit.
pub const EXPOSURE: f32 = 1.0;

/// Rasterize one region's shaded colors into its atlas rectangle.
///
/// `lit_pixels` is the region's slice of the lit pixel buffer, row-major at
/// `region.width x region.height`.
pub fn rasterize_region(region: &PolygonRegion, lit_pixels: &[Vec3], atlas: &mut AtlasTexture) {
    if region.is_rectangular() {
        rasterize_rect(region, lit_pixels, atlas);
    } else {
        rasterize_polygon(region, lit_pixels, atlas);
    }
}

/// Direct path: every sample maps to one destination pixel through a
/// coordinate flip from the rectangle's far corner.
fn rasterize_rect(region: &PolygonRegion, lit_pixels: &[Vec3], atlas: &mut AtlasTexture) {
    let img_left = (region.rect.x * atlas.width() as f32) as i64;
    let img_bottom = (region.rect.y * atlas.height() as f32) as i64;

    let width = region.width as i64;
    let height = region.height as i64;

    for y in 0..height {
        for x in 0..width {
            let tex_x = img_left + (width - x);
            let tex_y = img_bottom + (height - y);

            let color = lit_pixels[(y * width + x) as usize] * EXPOSURE;
            atlas.set_pixel(tex_x, tex_y, pack_color_unorm8(color));
        }
    }
}

/// Scanline fill for irregular quad regions.
///
/// Adapted from the public-domain polygon fill by Darel Rex Finley (2007):
/// for each scanline inside the polygon's vertical bounds, collect the
/// x-intercepts of the crossing edges, sort them, and fill the spans between
/// successive pairs, clipped to the region's pixel bounds.
fn rasterize_polygon(region: &PolygonRegion, lit_pixels: &[Vec3], atlas: &mut AtlasTexture) {
    let width = region.width as f32;
    let height = region.height as f32;

    let poly_x = [
        region.lb.x * width,
        region.lt.x * width,
        region.rt.x * width,
        region.rb.x * width,
    ];
    let poly_y = [
        region.lb.y * height,
        region.lt.y * height,
        region.rt.y * height,
        region.rb.y * height,
    ];

    let y_min = poly_y.iter().fold(f32::MAX, |a, b| a.min(*b)).floor().max(0.0) as i64;
    let y_max = poly_y.iter().fold(f32::MIN, |a, b| a.max(*b)).ceil().min(height) as i64;

    let img_left = (region.rect.x * atlas.width() as f32) as i64;
    let img_bottom = (region.rect.y * atlas.height() as f32) as i64;

    for pixel_y in y_min..y_max {
        let scan_y = pixel_y as f32 + 0.5;

        // X-intercepts of edges crossing this scanline
        let mut nodes: SmallVec<[f32; 4]> = SmallVec::new();
        let mut j = 3;
        for i in 0..4 {
            if (poly_y[i] < scan_y && poly_y[j] >= scan_y)
                || (poly_y[j] < scan_y && poly_y[i] >= scan_y)
            {
                let t = (scan_y - poly_y[i]) / (poly_y[j] - poly_y[i]);
                nodes.push(poly_x[i] + t * (poly_x[j] - poly_x[i]));
            }
            j = i;
        }
        nodes.sort_by(f32::total_cmp);

        for pair in nodes.chunks_exact(2) {
            let span_start = (pair[0].max(0.0)) as i64;
            let span_end = (pair[1].min(width)) as i64;

            for pixel_x in span_start..span_end {
                let index = (pixel_y * region.width as i64 + pixel_x) as usize;
                let Some(color) = lit_pixels.get(index) else {
                    continue;
                };
                atlas.set_pixel(
                    img_left + pixel_x,
                    img_bottom + pixel_y,
                    pack_color_unorm8(*color * EXPOSURE),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;
    use glam::Vec2;

    fn rect_region(width: u32, height: u32, rect: Rect) -> PolygonRegion {
        PolygonRegion {
            lb: Vec2::new(0.0, 0.0),
            lt: Vec2::new(0.0, 1.0),
            rt: Vec2::new(1.0, 1.0),
            rb: Vec2::new(1.0, 0.0),
            rect,
            start: 0,
            len: (width * height) as usize,
            width,
            height,
        }
    }

    #[test]
    fn test_rect_round_trip_bytes() {
        let region = rect_region(2, 2, Rect::new(0.0, 0.0, 0.25, 0.25));
        let colors = vec![
            Vec3::new(0.0, 0.25, 0.5),
            Vec3::new(1.0, 0.75, 0.5),
            Vec3::new(0.1, 0.2, 0.3),
            Vec3::new(2.0, -1.0, 1.0), // out of range, must clamp
        ];
        let mut atlas = AtlasTexture::new(16, 16);
        rasterize_region(&region, &colors, &mut atlas);

        // Sample (x, y) lands at (width - x, height - y) within the rect
        let expect = |c: Vec3| pack_color_unorm8(c);
        assert_eq!(atlas.pixel(2, 2), expect(colors[0]));
        assert_eq!(atlas.pixel(1, 2), expect(colors[1]));
        assert_eq!(atlas.pixel(2, 1), expect(colors[2]));
        assert_eq!(atlas.pixel(1, 1), [255, 0, 255, 255]);
    }

    #[test]
    fn test_rect_alpha_always_opaque() {
        let region = rect_region(2, 2, Rect::new(0.0, 0.0, 0.25, 0.25));
        let colors = vec![Vec3::ZERO; 4];
        let mut atlas = AtlasTexture::new(16, 16);
        rasterize_region(&region, &colors, &mut atlas);

        assert_eq!(atlas.pixel(1, 1)[3], 255);
        assert_eq!(atlas.pixel(2, 2)[3], 255);
    }

    #[test]
    fn test_rect_outside_atlas_is_skipped() {
        // Rect positioned so flipped coordinates spill past the atlas edge
        let region = rect_region(4, 4, Rect::new(0.9, 0.9, 0.5, 0.5));
        let colors = vec![Vec3::ONE; 16];
        let mut atlas = AtlasTexture::new(8, 8);
        // Must not panic
        rasterize_region(&region, &colors, &mut atlas);
    }

    #[test]
    fn test_polygon_fill_covers_interior() {
        // Diamond-shaped region: not the unit rectangle, so the scanline
        // path runs
        let mut region = rect_region(8, 8, Rect::new(0.0, 0.0, 0.5, 0.5));
        region.lb = Vec2::new(0.5, 0.0);
        region.lt = Vec2::new(0.0, 0.5);
        region.rt = Vec2::new(0.5, 1.0);
        region.rb = Vec2::new(1.0, 0.5);
        assert!(!region.is_rectangular());

        let colors = vec![Vec3::ONE; 64];
        let mut atlas = AtlasTexture::new(16, 16);
        rasterize_region(&region, &colors, &mut atlas);

        // Center of the diamond is filled
        assert_eq!(atlas.pixel(4, 4), [255, 255, 255, 255]);
        // Far corner of the bounding box stays untouched
        assert_eq!(atlas.pixel(7, 0), [0, 0, 0, 255]);
    }
}

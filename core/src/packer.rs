//! Lightmap atlas packing
//!
//! Runs once during world construction, after every shape has produced its
//! polygon regions. Shapes are streamed in registry order into the current
//! atlas; when a shape no longer fits at full resolution the atlas is
//! finalized from the last successful packing and a fresh one is started
//! with the shape that did not fit.

use glam::{UVec2, Vec2};

use crate::error::GiError;
use crate::math::Rect;
use crate::settings::GiSettings;
use crate::shape::PolygonRegion;
use crate::texture::AtlasTexture;

/// Pixel gap kept between packed rectangles.
const PACK_PADDING: u32 = 2;

/// Result of one packing attempt: the chosen texture size and one
/// normalized rectangle per input, in input order.
#[derive(Debug, Clone)]
pub struct Packing {
    pub width: u32,
    pub height: u32,
    pub rects: Vec<Rect>,
}

/// Rectangle packing primitive.
///
/// Implementations must keep output order equal to input order and either
/// place every rectangle at full size within `max_dim` or return `None`.
pub trait RectPacker {
    fn pack(&self, sizes: &[UVec2], padding: u32, max_dim: u32) -> Option<Packing>;
}

/// Order-preserving shelf packer over power-of-two square textures.
///
/// Rectangles are laid out left-to-right on shelves, wrapping to a new
/// shelf when the row fills; the smallest power-of-two texture that fits
/// everything wins.
#[derive(Debug, Default)]
pub struct ShelfPacker;

impl RectPacker for ShelfPacker {
    fn pack(&self, sizes: &[UVec2], padding: u32, max_dim: u32) -> Option<Packing> {
        if sizes.is_empty() {
            return Some(Packing { width: 1, height: 1, rects: Vec::new() });
        }

        let mut dim = 32u32.min(max_dim);
        loop {
            if let Some(rects) = try_shelf_layout(sizes, padding, dim) {
                let norm = rects
                    .iter()
                    .map(|r| {
                        Rect::new(
                            r.0 as f32 / dim as f32,
                            r.1 as f32 / dim as f32,
                            r.2 as f32 / dim as f32,
                            r.3 as f32 / dim as f32,
                        )
                    })
                    .collect();
                return Some(Packing { width: dim, height: dim, rects: norm });
            }

            if dim >= max_dim {
                return None;
            }
            dim = (dim * 2).min(max_dim);
        }
    }
}

/// Shelf layout at a fixed texture size; pixel rects or `None` on overflow.
fn try_shelf_layout(sizes: &[UVec2], padding: u32, dim: u32) -> Option<Vec<(u32, u32, u32, u32)>> {
    let mut x = padding;
    let mut y = padding;
    let mut shelf_height = 0u32;
    let mut rects = Vec::with_capacity(sizes.len());

    for size in sizes {
        let (w, h) = (size.x, size.y);

        if x + w + padding > dim {
            y += shelf_height + padding;
            x = padding;
            shelf_height = 0;
        }
        if x + w + padding > dim || y + h + padding > dim {
            return None;
        }

        rects.push((x, y, w, h));
        x += w + padding;
        shelf_height = shelf_height.max(h);
    }

    Some(rects)
}

/// Per-shape UV transform into its atlas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightmapSt {
    pub scale: Vec2,
    pub offset: Vec2,
    pub atlas: usize,
}

/// Output of the packing pass.
#[derive(Debug)]
pub struct PackOutput {
    pub atlases: Vec<AtlasTexture>,
    pub sts: Vec<LightmapSt>,
}

struct Entry {
    shape: usize,
    size: UVec2,
}

/// Pack every shape's regions into as few atlases as needed.
///
/// Mutates each region's `rect` to its normalized final-atlas rectangle and
/// returns blank final atlases plus the per-shape ST transforms. Shapes with
/// no regions take part in nothing and keep a default ST.
pub fn pack_lightmaps(
    regions: &mut [Vec<PolygonRegion>],
    settings: &GiSettings,
    packer: &dyn RectPacker,
) -> Result<PackOutput, GiError> {
    let max_dim = settings.lightmap_size;
    if max_dim == 0 {
        return Err(GiError::InvalidSettings("lightmap_size must be non-zero".into()));
    }

    let mut atlases = Vec::new();
    let mut sts = vec![LightmapSt::default(); regions.len()];

    let mut current: Vec<Entry> = Vec::new();
    let mut last_good: Option<Packing> = None;

    for shape in 0..regions.len() {
        if regions[shape].is_empty() {
            continue;
        }

        let mut trial_sizes: Vec<UVec2> =
            current.iter().map(|e| e.size).collect();
        trial_sizes.extend(regions[shape].iter().map(|r| UVec2::new(r.width, r.height)));

        match try_pack(packer, &trial_sizes, max_dim) {
            Some(packing) => {
                current.extend(
                    regions[shape]
                        .iter()
                        .map(|r| Entry { shape, size: UVec2::new(r.width, r.height) }),
                );
                last_good = Some(packing);
            }
            None => {
                // Roll back to the last successful state, finalize, and
                // start a new atlas with the shape that did not fit.
                if let Some(packing) = last_good.take() {
                    commit_atlas(&packing, &current, atlases.len(), regions, &mut sts, settings);
                    atlases.push(AtlasTexture::new(max_dim, max_dim));
                }
                current = regions[shape]
                    .iter()
                    .map(|r| Entry { shape, size: UVec2::new(r.width, r.height) })
                    .collect();

                let own_sizes: Vec<UVec2> = current.iter().map(|e| e.size).collect();
                last_good = Some(
                    try_pack(packer, &own_sizes, max_dim)
                        .ok_or(GiError::PackingFailed { shape, max_dim })?,
                );
            }
        }
    }

    if let Some(packing) = last_good.take() {
        commit_atlas(&packing, &current, atlases.len(), regions, &mut sts, settings);
        atlases.push(AtlasTexture::new(max_dim, max_dim));
    }

    tracing::info!(
        shapes = regions.len(),
        atlases = atlases.len(),
        size = max_dim,
        "lightmaps packed"
    );

    Ok(PackOutput { atlases, sts })
}

/// One packing attempt, accepted only when every rectangle keeps its source
/// dimensions at full resolution.
fn try_pack(packer: &dyn RectPacker, sizes: &[UVec2], max_dim: u32) -> Option<Packing> {
    let packing = packer.pack(sizes, PACK_PADDING, max_dim)?;

    for (rect, size) in packing.rects.iter().zip(sizes) {
        let packed_w = rect.w * packing.width as f32;
        let packed_h = rect.h * packing.height as f32;
        if packed_w + 0.5 < size.x as f32 || packed_h + 0.5 < size.y as f32 {
            return None;
        }
    }

    Some(packing)
}

/// Write the committed rectangles back to their regions and record each
/// shape's ST transform.
///
/// The provisional texture is copied into the corner of a fixed-size final
/// atlas, so rectangles scale by the provisional/final size ratio per axis.
/// Region assignment walks the packed entries in order with a per-shape
/// counter that resets when the owning shape changes; regions of one shape
/// are assumed contiguous in pack order.
fn commit_atlas(
    packing: &Packing,
    entries: &[Entry],
    atlas_index: usize,
    regions: &mut [Vec<PolygonRegion>],
    sts: &mut [LightmapSt],
    settings: &GiSettings,
) {
    let final_size = settings.lightmap_size as f32;
    let ratio_x = packing.width as f32 / final_size;
    let ratio_y = packing.height as f32 / final_size;
    let padding = Vec2::splat(settings.texture_padding) / final_size;

    let mut polygon_index = 0usize;
    let mut last_shape: Option<usize> = None;

    for (entry, packed) in entries.iter().zip(&packing.rects) {
        if last_shape == Some(entry.shape) {
            polygon_index += 1;
        } else {
            polygon_index = 0;
        }

        let rect = Rect::new(
            packed.x * ratio_x,
            packed.y * ratio_y,
            packed.w * ratio_x,
            packed.h * ratio_y,
        );
        regions[entry.shape][polygon_index].rect = rect;

        sts[entry.shape] = LightmapSt {
            scale: Vec2::new(rect.w - padding.x * 2.0, rect.h - padding.y * 2.0),
            offset: Vec2::new(rect.x + padding.x, rect.y + padding.y),
            atlas: atlas_index,
        };

        last_shape = Some(entry.shape);
    }
}

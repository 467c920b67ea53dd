//! Shapes, materials and sample grid generation
//!
//! Converts a shape description into a row-major grid of world-space sample
//! points plus the polygon regions that map the grid into a lightmap. Only
//! planar shapes generate points; the other kinds are listed so the coverage
//! gap is visible in the API, and produce none.

use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

use crate::math::Rect;

/// Geometric description of one static shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub kind: ShapeKind,
}

/// Shape kind. Only `Plane` is sampled; the rest generate zero points and
/// take no part in lightmapping (callers must treat them as valid but
/// non-contributing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    /// Rectangle in the shape's local XZ plane, `size` = local extents.
    Plane { size: Vec2 },
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

/// Per-shape surface and lightmap parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GiMaterial {
    /// Sample grid resolution; also the pixel size of the shape's region.
    pub resolution: UVec2,
    pub albedo: Vec4,
    pub smoothness: f32,
    pub metallic: f32,
}

impl GiMaterial {
    pub fn total_points(&self) -> usize {
        (self.resolution.x * self.resolution.y) as usize
    }

    pub fn albedo_rgb(&self) -> Vec3 {
        self.albedo.truncate()
    }
}

/// One shape's input to world construction.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSetup {
    pub desc: ShapeDesc,
    pub material: GiMaterial,
    /// World-space inset that keeps samples off the exact surface edge.
    pub edge_margin: f32,
}

impl ShapeSetup {
    pub fn new(desc: ShapeDesc, material: GiMaterial) -> Self {
        Self { desc, material, edge_margin: DEFAULT_EDGE_MARGIN }
    }
}

const DEFAULT_EDGE_MARGIN: f32 = 0.001;

/// World-space position and orientation of one lighting sample.
///
/// The surface normal is the orientation's local up axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Vec3,
    pub rotation: Quat,
}

impl SamplePoint {
    pub fn normal(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

/// A sub-area of a shape's sample grid that maps to one packed sub-texture.
///
/// `start`/`len` index the global sample/pixel buffers. `rect` is written
/// once by the packer (normalized atlas coordinates); until then it is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonRegion {
    pub lb: Vec2,
    pub lt: Vec2,
    pub rt: Vec2,
    pub rb: Vec2,

    pub rect: Rect,

    pub start: usize,
    pub len: usize,
    pub width: u32,
    pub height: u32,
}

impl PolygonRegion {
    /// True when the corner UVs form the unit rectangle, which lets the
    /// rasterizer take the direct per-pixel path.
    pub fn is_rectangular(&self) -> bool {
        self.lb == Vec2::new(0.0, 0.0)
            && self.lt == Vec2::new(0.0, 1.0)
            && self.rt == Vec2::new(1.0, 1.0)
            && self.rb == Vec2::new(1.0, 0.0)
    }
}

/// Generate the sample grid and polygon regions for one shape.
///
/// Appends `resolution.x * resolution.y` points for planar shapes, in
/// row-major order (the rasterizer relies on this to map point index back to
/// pixel coordinate), and one region covering the whole grid. Unsupported
/// kinds append nothing.
pub fn generate_sample_points(
    desc: &ShapeDesc,
    resolution: UVec2,
    edge_margin: f32,
    start_index: usize,
    points: &mut Vec<SamplePoint>,
    regions: &mut Vec<PolygonRegion>,
) {
    match desc.kind {
        ShapeKind::Plane { size } => {
            let scale_xz = Vec2::new(desc.scale.x, desc.scale.z);
            let local_to_world =
                Mat4::from_scale_rotation_translation(desc.scale, desc.rotation, desc.position);

            // Shrink the usable range so no sample lands on the exact edge;
            // the margin is given in world units, so divide the local inset
            // by the shape's scale.
            let margin_size = size - edge_margin * 2.0 / scale_xz;
            let margin_offset = edge_margin / scale_xz;
            let half = size / 2.0;

            let mut emitted = 0;
            for y in 0..resolution.y {
                let norm_y = normalized_coord(y, resolution.y);
                for x in 0..resolution.x {
                    let norm_x = normalized_coord(x, resolution.x);

                    let local = Vec3::new(
                        norm_x * margin_size.x + margin_offset.x - half.x,
                        0.0,
                        norm_y * margin_size.y + margin_offset.y - half.y,
                    );
                    points.push(SamplePoint {
                        position: local_to_world.transform_point3(local),
                        rotation: desc.rotation,
                    });
                    emitted += 1;
                }
            }

            regions.push(PolygonRegion {
                lb: Vec2::new(0.0, 0.0),
                lt: Vec2::new(0.0, 1.0),
                rt: Vec2::new(1.0, 1.0),
                rb: Vec2::new(1.0, 0.0),
                rect: Rect::ZERO,
                start: start_index,
                len: emitted,
                width: resolution.x,
                height: resolution.y,
            });
        }
        ShapeKind::Box { .. } | ShapeKind::Sphere { .. } => {}
    }
}

/// Map a grid index to `[0, 1]`; a single-sample axis uses its center.
fn normalized_coord(i: u32, count: u32) -> f32 {
    if count > 1 { i as f32 / (count - 1) as f32 } else { 0.5 }
}

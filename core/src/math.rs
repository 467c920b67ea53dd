//! Small math helpers shared across the solver

use glam::{Mat3, Quat, Vec2, Vec3};

/// Normalized rectangle (origin at the lower-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, w: 0.0, h: 0.0 };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    /// True if the two rectangles share interior area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Rotation whose local +Z axis points along `forward` with +Y as close to
/// `up` as the constraint allows.
///
/// `forward` and `up` must not be parallel.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let f = forward.normalize();
    let r = up.cross(f).normalize();
    let u = f.cross(r);
    Quat::from_mat3(&Mat3::from_cols(r, u, f))
}

/// Rotation that maps the canonical up axis (+Y) onto `dir`.
///
/// Composes a look-rotation toward `dir` with the inverse of the canonical
/// look-rotation, so `result * Vec3::Y == dir`.
pub fn align_up_to(dir: Vec3, reference_up: Vec3) -> Quat {
    let a = look_rotation(dir, reference_up);
    let b = look_rotation(Vec3::Y, Vec3::Z);
    (a * b.inverse()).normalize()
}

/// Angle in radians between two vectors, clamped to a valid acos domain.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denom = a.length() * b.length();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

//! Scene ray intersection service
//!
//! The kernel only needs "cast a segment, get the nearest hit position,
//! normal and hit identity". Hosts with a real physics world implement
//! [`RayCaster`] over it; [`PlanarRayCaster`] is the built-in fallback that
//! intersects the world's own plane shapes, which is all the sample
//! generator produces anyway.

use glam::{Vec2, Vec3};

use crate::shape::{ShapeDesc, ShapeKind};

/// Index of a shape in the GI world's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u32);

impl ShapeHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Nearest intersection along a cast segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub shape: ShapeHandle,
}

/// Scene intersection service consumed by the shading kernel.
///
/// Returned handles must refer to shapes registered in the GI world; the
/// kernel looks the hit surface's material up by handle.
pub trait RayCaster: Send + Sync {
    /// Nearest hit along the segment `start → end`, if any.
    fn cast(&self, start: Vec3, end: Vec3) -> Option<RayHit>;
}

struct PlaneCollider {
    origin: Vec3,
    normal: Vec3,
    axis_u: Vec3,
    axis_v: Vec3,
    half_extents: Vec2,
    shape: ShapeHandle,
}

/// Brute-force nearest segment-vs-finite-plane caster over the world's
/// plane shapes.
pub struct PlanarRayCaster {
    colliders: Vec<PlaneCollider>,
}

impl PlanarRayCaster {
    /// Build colliders from shape descriptions, in registry order so hit
    /// handles line up with the world. Non-plane kinds are skipped.
    pub fn from_shapes<'a>(descs: impl IntoIterator<Item = &'a ShapeDesc>) -> Self {
        let mut colliders = Vec::new();
        for (index, desc) in descs.into_iter().enumerate() {
            let ShapeKind::Plane { size } = desc.kind else {
                continue;
            };

            let axis_u = desc.rotation * Vec3::X;
            let axis_v = desc.rotation * Vec3::Z;
            colliders.push(PlaneCollider {
                origin: desc.position,
                normal: desc.rotation * Vec3::Y,
                axis_u,
                axis_v,
                half_extents: size / 2.0 * Vec2::new(desc.scale.x, desc.scale.z),
                shape: ShapeHandle(index as u32),
            });
        }

        Self { colliders }
    }
}

/// Hits closer than this along the segment are discarded; keeps a ray cast
/// from a surface from immediately re-hitting it.
const MIN_HIT_FRACTION: f32 = 1e-4;

impl RayCaster for PlanarRayCaster {
    fn cast(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        let dir = end - start;

        let mut nearest: Option<(f32, RayHit)> = None;
        for collider in &self.colliders {
            let denom = dir.dot(collider.normal);
            if denom.abs() < f32::EPSILON {
                continue;
            }

            let t = (collider.origin - start).dot(collider.normal) / denom;
            if t < MIN_HIT_FRACTION || t > 1.0 {
                continue;
            }

            let point = start + dir * t;
            let local = point - collider.origin;
            if local.dot(collider.axis_u).abs() > collider.half_extents.x
                || local.dot(collider.axis_v).abs() > collider.half_extents.y
            {
                continue;
            }

            if nearest.is_none_or(|(best, _)| t < best) {
                // Face the normal back toward the ray origin
                let normal = if denom > 0.0 { -collider.normal } else { collider.normal };
                nearest = Some((t, RayHit { position: point, normal, shape: collider.shape }));
            }
        }

        nearest.map(|(_, hit)| hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn floor(size: f32) -> ShapeDesc {
        ShapeDesc {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            kind: ShapeKind::Plane { size: Vec2::splat(size) },
        }
    }

    #[test]
    fn test_hits_floor_from_above() {
        let caster = PlanarRayCaster::from_shapes([&floor(10.0)]);
        let hit = caster
            .cast(Vec3::new(1.0, 5.0, 1.0), Vec3::new(1.0, -5.0, 1.0))
            .expect("should hit the floor");

        assert!(hit.position.abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-5));
        assert!(hit.normal.abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(hit.shape, ShapeHandle(0));
    }

    #[test]
    fn test_misses_outside_extents() {
        let caster = PlanarRayCaster::from_shapes([&floor(2.0)]);
        assert!(caster
            .cast(Vec3::new(5.0, 5.0, 0.0), Vec3::new(5.0, -5.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_misses_when_segment_too_short() {
        let caster = PlanarRayCaster::from_shapes([&floor(10.0)]);
        assert!(caster
            .cast(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_nearest_of_two_planes_wins() {
        let near = ShapeDesc { position: Vec3::new(0.0, 2.0, 0.0), ..floor(10.0) };
        let far = floor(10.0);
        let caster = PlanarRayCaster::from_shapes([&far, &near]);

        let hit = caster
            .cast(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0))
            .expect("should hit the upper plane");
        assert_eq!(hit.shape, ShapeHandle(1));
        assert!((hit.position.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_hit_from_below_faces_normal_down() {
        let caster = PlanarRayCaster::from_shapes([&floor(10.0)]);
        let hit = caster
            .cast(Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, 5.0, 0.0))
            .expect("planes are double-sided");
        assert!(hit.normal.abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn test_scaled_plane_extends_reach() {
        let scaled = ShapeDesc { scale: Vec3::new(3.0, 1.0, 1.0), ..floor(2.0) };
        let caster = PlanarRayCaster::from_shapes([&scaled]);

        // Half extent along X is 1.0 * 3.0 = 3.0
        assert!(caster
            .cast(Vec3::new(2.5, 5.0, 0.0), Vec3::new(2.5, -5.0, 0.0))
            .is_some());
        assert!(caster
            .cast(Vec3::new(3.5, 5.0, 0.0), Vec3::new(3.5, -5.0, 0.0))
            .is_none());
    }
}

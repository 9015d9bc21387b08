//! Viewport pre-filter for chunk visibility.
use glam::{Mat4, Vec2, Vec3};

use super::bounds::ChunkBounds;

/// Maps world positions into viewport space: `x`/`y` in `[0, 1]` across the
/// visible image, `z` the depth in front of the camera (negative behind it).
pub trait ViewportProjector {
    fn world_to_viewport(&self, world: Vec3) -> Vec3;
}

/// Right-handed, Y-up perspective camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    view: Mat4,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn look_at(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y_radians, aspect, near, far),
        }
    }
}

impl ViewportProjector for PerspectiveCamera {
    fn world_to_viewport(&self, world: Vec3) -> Vec3 {
        let eye_space = self.view.transform_point3(world);
        let depth = -eye_space.z;
        let clip = self.projection * eye_space.extend(1.0);
        if clip.w.abs() <= f32::EPSILON {
            return Vec3::new(0.5, 0.5, depth);
        }
        let ndc = Vec2::new(clip.x, clip.y) / clip.w;
        let uv = ndc * 0.5 + Vec2::splat(0.5);
        Vec3::new(uv.x, uv.y, depth)
    }
}

/// Whether any part of `bounds` can land inside the viewport widened by
/// `margin` on every side.
///
/// When any corner is behind the camera the projected rectangle is
/// meaningless and the box is kept.
pub fn in_viewport(bounds: &ChunkBounds, projector: &dyn ViewportProjector, margin: f32) -> bool {
    let mut lo = Vec2::splat(f32::INFINITY);
    let mut hi = Vec2::splat(f32::NEG_INFINITY);
    for corner in bounds.corners() {
        let p = projector.world_to_viewport(corner);
        if p.z <= 0.0 {
            return true;
        }
        lo = lo.min(p.truncate());
        hi = hi.max(p.truncate());
    }
    let (min_edge, max_edge) = (-margin, 1.0 + margin);
    !(hi.x < min_edge || lo.x > max_edge || hi.y < min_edge || lo.y > max_edge)
}

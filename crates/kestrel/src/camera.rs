//! Active camera and the world-to-screen matrix.
//!
//! A camera is just a transform: its world position is the point shown at the
//! centre of the viewport, its world rotation turns the view, and its world
//! scale `x` is the zoom, expressed as how many world units fit in the
//! viewport's height.

use crate::context::Context;
use crate::entity::EntityId;
use crate::math::{Mat4, Vec2, Vec3};
use crate::physics::Physics;
use crate::transform::{TransformId, Transforms};

#[derive(Debug, Default)]
pub struct CameraManager {
    active: Option<TransformId>,
}

impl CameraManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<TransformId> {
        self.active
    }

    pub fn set_active(&mut self, camera: Option<TransformId>) {
        self.active = camera;
    }

    /// The view matrix for `viewport` (pixels). Identity with no camera, or
    /// when the camera's transform is gone.
    pub fn view_matrix(&self, transforms: &Transforms, physics: &Physics, viewport: Vec2) -> Mat4 {
        let Some(camera) = self.active else {
            return Mat4::IDENTITY;
        };
        let (Some(pose), Some(scale)) = (
            transforms.world_pose(camera, physics),
            transforms.world_scale(camera),
        ) else {
            return Mat4::IDENTITY;
        };
        let zoom = if scale.x.is_finite() && scale.x > 0.0 {
            scale.x
        } else {
            viewport.y
        };
        let s = viewport.y / zoom;

        Mat4::from_translation((viewport * 0.5).extend(0.0))
            * Mat4::from_scale(Vec3::new(s, s, 1.0))
            * Mat4::from_rotation_z(pose.rotation)
            * Mat4::from_translation((-pose.position).extend(0.0))
    }
}

impl Context {
    /// Follow `entity`'s transform with the camera.
    pub fn set_camera_entity(&mut self, entity: EntityId) -> bool {
        let Some(transform) = self.entity(entity).map(|e| e.transform()) else {
            return false;
        };
        self.cameras.set_active(Some(transform));
        true
    }

    pub fn view_matrix(&self, viewport: Vec2) -> Mat4 {
        self.cameras
            .view_matrix(&self.transforms, &self.physics, viewport)
    }
}

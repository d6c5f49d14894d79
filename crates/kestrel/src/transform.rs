//! # Transforms — Parented Poses with Physics Override
//!
//! Every entity and component owns one [`Transform`] record stored in the
//! [`Transforms`] arena. Records reference their parent by [`TransformId`],
//! never by pointer, so destroying an owner can't leave a dangling link: a
//! child whose parent key went stale simply behaves as a root.
//!
//! ## Composition
//!
//! Composition is translation-only. A child's world position is its parent's
//! world position plus its own local offset; the parent's rotation and scale
//! are *not* applied to that offset.
//!
//! ```text
//! world_position = parent.world_position + local_position
//! world_rotation = parent.world_rotation + local_rotation
//! world_scale    = parent.world_scale    * local_scale
//! ```
//!
//! ## Pose source
//!
//! A transform is either [`PoseSource::Local`] or
//! [`PoseSource::PhysicsDriven`]. A physics-driven transform reads position
//! and rotation from its body (ignoring its parent), and writes to position
//! or rotation are pushed into the body immediately. Scale never comes from
//! physics. [`Transforms::sync_from_body`] copies the body's pose into the
//! local fields; the owning entity calls it once per tick, before any hook
//! reads the transform.

use crate::arena::Arena;
use crate::math::{Pose, Vec2};
use crate::physics::{Physics, PhysicsObject};

crate::define_handle!(
    /// Key of a [`Transform`] record in [`Transforms`].
    pub struct TransformId;
);

/// Where a transform's position and rotation come from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PoseSource {
    /// Local fields composed with the parent chain.
    #[default]
    Local,
    /// The attached body's simulated pose.
    PhysicsDriven(PhysicsObject),
}

/// A hierarchical position/rotation/scale node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    local_position: Vec2,
    local_rotation: f32,
    local_scale: Vec2,
    parent: Option<TransformId>,
    source: PoseSource,
}

impl Transform {
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self {
            local_position: Vec2::new(x, y),
            ..Default::default()
        }
    }

    pub fn from_pose(pose: Pose) -> Self {
        Self {
            local_position: pose.position,
            local_rotation: pose.rotation,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.local_rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.local_scale = scale;
        self
    }

    pub fn with_parent(mut self, parent: TransformId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn local_position(&self) -> Vec2 {
        self.local_position
    }

    pub fn local_rotation(&self) -> f32 {
        self.local_rotation
    }

    pub fn local_scale(&self) -> Vec2 {
        self.local_scale
    }

    pub fn local_pose(&self) -> Pose {
        Pose::new(self.local_position, self.local_rotation)
    }

    pub fn parent(&self) -> Option<TransformId> {
        self.parent
    }

    pub fn source(&self) -> PoseSource {
        self.source
    }

    /// The attached body, if this transform is physics-driven.
    pub fn body(&self) -> Option<PhysicsObject> {
        match self.source {
            PoseSource::PhysicsDriven(obj) => Some(obj),
            PoseSource::Local => None,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            local_position: Vec2::ZERO,
            local_rotation: 0.0,
            local_scale: Vec2::ONE,
            parent: None,
            source: PoseSource::Local,
        }
    }
}

/// Arena of every transform record in a [`Context`](crate::Context).
#[derive(Default)]
pub struct Transforms {
    records: Arena<TransformId, Transform>,
}

impl Transforms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, transform: Transform) -> TransformId {
        self.records.insert(transform)
    }

    /// Drop a record. Children keep their stale parent key and behave as roots.
    pub fn remove(&mut self, id: TransformId) -> Option<Transform> {
        self.records.remove(id)
    }

    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.records.get(id)
    }

    pub fn contains(&self, id: TransformId) -> bool {
        self.records.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The live parent of `id`, if any.
    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        self.get(id)?.parent.filter(|p| self.contains(*p))
    }

    /// Re-parent `id`. Returns `false` (and changes nothing) if either record
    /// is missing or the link would create a cycle.
    pub fn set_parent(&mut self, id: TransformId, parent: Option<TransformId>) -> bool {
        if !self.contains(id) {
            return false;
        }
        if let Some(p) = parent {
            let mut cursor = Some(p);
            while let Some(ancestor) = cursor {
                if ancestor == id || !self.contains(ancestor) {
                    return false;
                }
                cursor = self.parent(ancestor);
            }
        }
        if let Some(t) = self.records.get_mut(id) {
            t.parent = parent;
        }
        true
    }

    // ── Local accessors ─────────────────────────────────────────────

    /// Set the local position. A physics-driven transform also moves its body.
    pub fn set_local_position(&mut self, id: TransformId, position: Vec2, physics: &mut Physics) -> bool {
        let Some(t) = self.records.get_mut(id) else {
            return false;
        };
        t.local_position = position;
        if let PoseSource::PhysicsDriven(obj) = t.source {
            physics.set_body_position(&obj, position);
        }
        true
    }

    /// Set the local rotation. A physics-driven transform also turns its body.
    pub fn set_local_rotation(&mut self, id: TransformId, rotation: f32, physics: &mut Physics) -> bool {
        let Some(t) = self.records.get_mut(id) else {
            return false;
        };
        t.local_rotation = rotation;
        if let PoseSource::PhysicsDriven(obj) = t.source {
            physics.set_body_rotation(&obj, rotation);
        }
        true
    }

    pub fn set_local_scale(&mut self, id: TransformId, scale: Vec2) -> bool {
        let Some(t) = self.records.get_mut(id) else {
            return false;
        };
        t.local_scale = scale;
        true
    }

    // ── World-space reads ───────────────────────────────────────────

    /// World position: the body's pose if physics-driven, otherwise the
    /// parent's world position plus the local offset.
    pub fn world_position(&self, id: TransformId, physics: &Physics) -> Option<Vec2> {
        self.get(id)?;
        let mut position = Vec2::ZERO;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let t = self.records.get(current)?;
            if let Some(pose) = t.body().and_then(|obj| physics.body_pose(&obj)) {
                return Some(position + pose.position);
            }
            position += t.local_position;
            cursor = self.parent(current);
        }
        Some(position)
    }

    /// World rotation in radians, accumulated the same way as position.
    pub fn world_rotation(&self, id: TransformId, physics: &Physics) -> Option<f32> {
        self.get(id)?;
        let mut rotation = 0.0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let t = self.records.get(current)?;
            if let Some(pose) = t.body().and_then(|obj| physics.body_pose(&obj)) {
                return Some(rotation + pose.rotation);
            }
            rotation += t.local_rotation;
            cursor = self.parent(current);
        }
        Some(rotation)
    }

    /// Component-wise product of the local scales up the chain.
    pub fn world_scale(&self, id: TransformId) -> Option<Vec2> {
        self.get(id)?;
        let mut scale = Vec2::ONE;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            scale *= self.records.get(current)?.local_scale;
            cursor = self.parent(current);
        }
        Some(scale)
    }

    pub fn world_pose(&self, id: TransformId, physics: &Physics) -> Option<Pose> {
        Some(Pose::new(
            self.world_position(id, physics)?,
            self.world_rotation(id, physics)?,
        ))
    }

    /// Facing direction for the world rotation: `(sin r, cos r)`.
    pub fn forward(&self, id: TransformId, physics: &Physics) -> Option<Vec2> {
        let r = self.world_rotation(id, physics)?;
        Some(Vec2::new(r.sin(), r.cos()))
    }

    /// `forward` turned a quarter clockwise: `(cos r, -sin r)`.
    pub fn right(&self, id: TransformId, physics: &Physics) -> Option<Vec2> {
        let r = self.world_rotation(id, physics)?;
        Some(Vec2::new(r.cos(), -r.sin()))
    }

    // ── Physics attachment ──────────────────────────────────────────

    /// Make `id` physics-driven by `obj`.
    pub fn attach_body(&mut self, id: TransformId, obj: PhysicsObject) -> bool {
        let Some(t) = self.records.get_mut(id) else {
            return false;
        };
        t.source = PoseSource::PhysicsDriven(obj);
        true
    }

    /// Stop delegating to the body. The transform keeps its last-synced
    /// local pose.
    pub fn detach_body(&mut self, id: TransformId) -> Option<PhysicsObject> {
        let t = self.records.get_mut(id)?;
        let obj = t.body();
        t.source = PoseSource::Local;
        obj
    }

    /// Copy the attached body's pose into the local fields. Returns `false`
    /// if the transform is not physics-driven or its body is gone.
    pub fn sync_from_body(&mut self, id: TransformId, physics: &Physics) -> bool {
        let Some(t) = self.records.get_mut(id) else {
            return false;
        };
        let Some(pose) = t.body().and_then(|obj| physics.body_pose(&obj)) else {
            return false;
        };
        t.local_position = pose.position;
        t.local_rotation = pose.rotation;
        true
    }
}

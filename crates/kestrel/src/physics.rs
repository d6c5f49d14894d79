//! 2D physics integration via Rapier.
//!
//! [`Physics`] owns one rigid-body simulation ([`PhysicsSpace`]) per world.
//! Entities never own simulation state: they hold a [`PhysicsObject`], a plain
//! `Copy` handle naming a body (and optionally its collider) inside the space
//! of the world that created it. Dropping a space drops every body in it.
//!
//! Positions and angles cross this boundary in world units. Internally the
//! simulation runs in physics units: `world = physics * transform_scale`.
//! Velocities are exchanged in physics units, as the simulation reports them.
//!
//! ## Step policy
//!
//! [`Physics::step`] advances by `min(dt, max_dt)`. An oversized frame (a
//! stall, or a breakpoint pause) is clamped with a warning rather than
//! sub-stepped, so the simulation falls behind wall-clock time instead of
//! taking an unstable large step.

use std::collections::HashMap;

use rapier2d::prelude::Pose as RapierPose;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::Pose;
use crate::world::WorldId;

/// World units per physics unit.
pub const DEFAULT_TRANSFORM_SCALE: f32 = 32.0;

/// Largest delta (seconds) a single step may simulate.
pub const DEFAULT_MAX_DT: f32 = 0.128;

/// Rounding radius of box shapes, in physics units.
const BOX_BORDER_RADIUS: f32 = 0.1;

// ── Configuration ───────────────────────────────────────────────────────

/// Physics settings shared by every world of a [`Context`](crate::Context).
///
/// Loadable from JSON; missing fields take their defaults.
///
/// ```ignore
/// let cfg: PhysicsConfig = serde_json::from_str(r#"{ "max_dt": 0.05 }"#)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity for newly registered worlds, in physics units/s².
    pub gravity: glam::Vec2,
    /// World units per physics unit.
    pub transform_scale: f32,
    /// Largest delta (seconds) simulated by one step.
    pub max_dt: f32,
}

impl PhysicsConfig {
    pub fn with_gravity(mut self, gravity: glam::Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_transform_scale(mut self, scale: f32) -> Self {
        self.transform_scale = scale;
        self
    }

    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt;
        self
    }

    /// Convert a world-space vector to physics units.
    pub fn to_physics(&self, v: glam::Vec2) -> glam::Vec2 {
        v / self.transform_scale
    }

    /// Convert a physics-space vector to world units.
    pub fn to_world(&self, v: glam::Vec2) -> glam::Vec2 {
        v * self.transform_scale
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: glam::Vec2::new(0.0, 10.0),
            transform_scale: DEFAULT_TRANSFORM_SCALE,
            max_dt: DEFAULT_MAX_DT,
        }
    }
}

// ── Handles ─────────────────────────────────────────────────────────────

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Moved by gravity, forces and contacts.
    #[default]
    Dynamic,
    /// Moved only by the velocity the game sets on it.
    Kinematic,
    /// Never moves.
    Static,
}

fn body_kind_to_rapier(kind: BodyKind) -> RigidBodyType {
    match kind {
        BodyKind::Dynamic => RigidBodyType::Dynamic,
        BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
        BodyKind::Static => RigidBodyType::Fixed,
    }
}

/// A body (and the shape it was created with) inside one world's simulation.
///
/// This is a non-owning handle: the [`PhysicsSpace`] owns the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicsObject {
    pub world: WorldId,
    pub body: RigidBodyHandle,
    pub collider: Option<ColliderHandle>,
}

// ── PhysicsSpace ────────────────────────────────────────────────────────

/// One world's rigid-body simulation.
pub struct PhysicsSpace {
    gravity: glam::Vec2,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    last_step_dt: f32,
    clamped_steps: u32,
}

impl std::fmt::Debug for PhysicsSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsSpace")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("last_step_dt", &self.last_step_dt)
            .finish()
    }
}

impl PhysicsSpace {
    fn new(gravity: glam::Vec2) -> Self {
        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            last_step_dt: 0.0,
            clamped_steps: 0,
        }
    }

    fn step(&mut self, dt: f32) {
        self.params.dt = dt;
        self.pipeline.step(
            Vec2::new(self.gravity.x, self.gravity.y),
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.last_step_dt = dt;
    }

    fn insert_body(&mut self, kind: BodyKind, mass: f32, moment: f32, pose: Pose) -> RigidBodyHandle {
        let mut builder = RigidBodyBuilder::new(body_kind_to_rapier(kind))
            .translation(Vec2::new(pose.position.x, pose.position.y))
            .rotation(pose.rotation)
            .enabled(false);
        if kind == BodyKind::Dynamic {
            // Non-finite mass or moment means "immovable" along that axis.
            let mass = if mass.is_finite() { mass.max(0.0) } else { 0.0 };
            let moment = if moment.is_finite() { moment.max(0.0) } else { 0.0 };
            builder = builder.additional_mass_properties(MassProperties::new(Vec2::ZERO, mass, moment));
        }
        self.bodies.insert(builder.build())
    }

    fn insert_shape(&mut self, body: RigidBodyHandle, shape: ColliderBuilder) -> ColliderHandle {
        // Mass comes from the body, not the shape.
        let collider = shape.density(0.0).build();
        self.colliders
            .insert_with_parent(collider, body, &mut self.bodies)
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn gravity(&self) -> glam::Vec2 {
        self.gravity
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Delta (seconds) simulated by the most recent step.
    pub fn last_step_dt(&self) -> f32 {
        self.last_step_dt
    }

    /// Number of steps that had to be clamped to `max_dt`.
    pub fn clamped_steps(&self) -> u32 {
        self.clamped_steps
    }
}

// ── Physics registry ────────────────────────────────────────────────────

/// Registry of per-world simulations.
pub struct Physics {
    config: PhysicsConfig,
    spaces: HashMap<WorldId, PhysicsSpace>,
}

impl Physics {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            spaces: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Create a simulation for `world`.
    ///
    /// Registering the same world twice is a configuration error.
    pub fn register_world(&mut self, world: WorldId) -> Result<()> {
        if self.spaces.contains_key(&world) {
            return Err(EngineError::WorldAlreadyRegistered(world));
        }
        self.spaces.insert(world, PhysicsSpace::new(self.config.gravity));
        log::debug!("Registered physics space for world {world}");
        Ok(())
    }

    /// Discard the simulation for `world` and every body in it.
    ///
    /// Returns `false` if the world was not registered.
    pub fn unregister_world(&mut self, world: WorldId) -> bool {
        self.spaces.remove(&world).is_some()
    }

    pub fn is_registered(&self, world: WorldId) -> bool {
        self.spaces.contains_key(&world)
    }

    pub fn space(&self, world: WorldId) -> Option<&PhysicsSpace> {
        self.spaces.get(&world)
    }

    fn space_mut(&mut self, world: WorldId) -> Result<&mut PhysicsSpace> {
        self.spaces
            .get_mut(&world)
            .ok_or(EngineError::UnknownWorld(world))
    }

    pub fn set_gravity(&mut self, world: WorldId, gravity: glam::Vec2) -> Result<()> {
        self.space_mut(world)?.gravity = gravity;
        Ok(())
    }

    /// Advance `world`'s simulation by `min(dt, max_dt)` seconds.
    ///
    /// Returns the delta actually simulated. Non-positive or NaN deltas are
    /// skipped and return `0.0`.
    pub fn step(&mut self, world: WorldId, dt: f32) -> Result<f32> {
        let max_dt = self.config.max_dt;
        let space = self.space_mut(world)?;
        if dt.is_nan() || dt <= 0.0 {
            return Ok(0.0);
        }
        let step_dt = if dt > max_dt {
            log::warn!(
                "Physics step clamped for world {world}: frame delta {dt:.3}s exceeds max {max_dt:.3}s"
            );
            space.clamped_steps += 1;
            max_dt
        } else {
            dt
        };
        space.step(step_dt);
        Ok(step_dt)
    }

    // ── Body creation ───────────────────────────────────────────────

    /// Create a body with no shape at the origin.
    ///
    /// Bodies are inert until [`activate`](Self::activate) is called.
    pub fn create_body(&mut self, world: WorldId, kind: BodyKind, mass: f32, moment: f32) -> Result<PhysicsObject> {
        let space = self.space_mut(world)?;
        let body = space.insert_body(kind, mass, moment, Pose::IDENTITY);
        Ok(PhysicsObject {
            world,
            body,
            collider: None,
        })
    }

    /// Create a body with a circle shape. `position` and `radius` are in
    /// world units.
    pub fn create_circle(
        &mut self,
        world: WorldId,
        position: glam::Vec2,
        rotation: f32,
        radius: f32,
        kind: BodyKind,
        mass: f32,
        moment: f32,
    ) -> Result<PhysicsObject> {
        let cfg = self.config;
        let space = self.space_mut(world)?;
        let pose = Pose::new(cfg.to_physics(position), rotation);
        let body = space.insert_body(kind, mass, moment, pose);
        let collider = space.insert_shape(body, ColliderBuilder::ball(radius / cfg.transform_scale));
        Ok(PhysicsObject {
            world,
            body,
            collider: Some(collider),
        })
    }

    /// Create a body with a box shape. `position` is the box centre and `size`
    /// its full width and height, both in world units.
    pub fn create_box(
        &mut self,
        world: WorldId,
        position: glam::Vec2,
        rotation: f32,
        size: glam::Vec2,
        kind: BodyKind,
        mass: f32,
        moment: f32,
    ) -> Result<PhysicsObject> {
        let cfg = self.config;
        let space = self.space_mut(world)?;
        let pose = Pose::new(cfg.to_physics(position), rotation);
        let body = space.insert_body(kind, mass, moment, pose);
        let half = cfg.to_physics(size) * 0.5;
        let collider = space.insert_shape(
            body,
            ColliderBuilder::round_cuboid(half.x, half.y, BOX_BORDER_RADIUS),
        );
        Ok(PhysicsObject {
            world,
            body,
            collider: Some(collider),
        })
    }

    /// Remove a body and its shapes from its world's simulation.
    pub fn remove_body(&mut self, obj: &PhysicsObject) -> bool {
        match self.spaces.get_mut(&obj.world) {
            Some(space) => space.remove_body(obj.body),
            None => false,
        }
    }

    pub fn contains(&self, obj: &PhysicsObject) -> bool {
        self.body(obj).is_some()
    }

    // ── Body access ─────────────────────────────────────────────────

    fn body(&self, obj: &PhysicsObject) -> Option<&RigidBody> {
        self.spaces.get(&obj.world)?.bodies.get(obj.body)
    }

    fn body_mut(&mut self, obj: &PhysicsObject) -> Option<&mut RigidBody> {
        self.spaces.get_mut(&obj.world)?.bodies.get_mut(obj.body)
    }

    /// Let the simulation move the body.
    pub fn activate(&mut self, obj: &PhysicsObject) -> bool {
        let Some(body) = self.body_mut(obj) else {
            return false;
        };
        body.set_enabled(true);
        body.wake_up(true);
        true
    }

    /// Whether the body has been activated and is not asleep.
    pub fn is_active(&self, obj: &PhysicsObject) -> bool {
        self.body(obj)
            .is_some_and(|b| b.is_enabled() && !b.is_sleeping())
    }

    /// The body's pose in world units.
    pub fn body_pose(&self, obj: &PhysicsObject) -> Option<Pose> {
        let body = self.body(obj)?;
        let t = body.translation();
        let position = self.config.to_world(glam::Vec2::new(t.x, t.y));
        Some(Pose::new(position, body.rotation().angle()))
    }

    /// Teleport the body to a pose given in world units.
    pub fn set_body_pose(&mut self, obj: &PhysicsObject, pose: Pose) -> bool {
        let p = self.config.to_physics(pose.position);
        let Some(body) = self.body_mut(obj) else {
            return false;
        };
        body.set_position(RapierPose::new(Vec2::new(p.x, p.y), pose.rotation), false);
        true
    }

    /// Move the body, keeping its angle.
    pub fn set_body_position(&mut self, obj: &PhysicsObject, position: glam::Vec2) -> bool {
        match self.body_pose(obj) {
            Some(current) => self.set_body_pose(obj, Pose::new(position, current.rotation)),
            None => false,
        }
    }

    /// Rotate the body, keeping its position.
    pub fn set_body_rotation(&mut self, obj: &PhysicsObject, rotation: f32) -> bool {
        match self.body_pose(obj) {
            Some(current) => self.set_body_pose(obj, Pose::new(current.position, rotation)),
            None => false,
        }
    }

    /// Linear velocity in physics units/s.
    pub fn velocity(&self, obj: &PhysicsObject) -> Option<glam::Vec2> {
        let v = self.body(obj)?.linvel();
        Some(glam::Vec2::new(v.x, v.y))
    }

    pub fn set_velocity(&mut self, obj: &PhysicsObject, velocity: glam::Vec2) -> bool {
        let Some(body) = self.body_mut(obj) else {
            return false;
        };
        body.set_linvel(Vec2::new(velocity.x, velocity.y), false);
        true
    }

    /// Angular velocity in radians/s.
    pub fn angular_velocity(&self, obj: &PhysicsObject) -> Option<f32> {
        Some(self.body(obj)?.angvel())
    }

    pub fn set_angular_velocity(&mut self, obj: &PhysicsObject, angvel: f32) -> bool {
        let Some(body) = self.body_mut(obj) else {
            return false;
        };
        body.set_angvel(angvel, false);
        true
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_world_id;

    const EPS: f32 = 1e-3;

    fn registered(config: PhysicsConfig) -> (Physics, WorldId) {
        let mut physics = Physics::new(config);
        let world = test_world_id(0);
        physics.register_world(world).unwrap();
        (physics, world)
    }

    #[test]
    fn double_registration_is_an_error() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        assert_eq!(
            physics.register_world(world),
            Err(EngineError::WorldAlreadyRegistered(world))
        );
    }

    #[test]
    fn unregister_unknown_world_is_noop() {
        let mut physics = Physics::default();
        assert!(!physics.unregister_world(test_world_id(3)));
    }

    #[test]
    fn unregister_discards_bodies() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_circle(world, glam::Vec2::ZERO, 0.0, 10.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        assert!(physics.unregister_world(world));
        assert!(physics.body_pose(&obj).is_none());
        assert!(!physics.is_registered(world));
    }

    #[test]
    fn step_unknown_world_is_an_error() {
        let mut physics = Physics::default();
        let world = test_world_id(9);
        assert_eq!(physics.step(world, 0.016), Err(EngineError::UnknownWorld(world)));
    }

    #[test]
    fn oversized_step_is_clamped_to_max_dt() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let stepped = physics.step(world, 0.5).unwrap();
        assert_eq!(stepped, DEFAULT_MAX_DT);
        let space = physics.space(world).unwrap();
        assert_eq!(space.last_step_dt(), DEFAULT_MAX_DT);
        assert_eq!(space.clamped_steps(), 1);
    }

    #[test]
    fn small_step_is_not_clamped() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        assert_eq!(physics.step(world, 0.016).unwrap(), 0.016);
        assert_eq!(physics.space(world).unwrap().clamped_steps(), 0);
    }

    #[test]
    fn degenerate_step_is_skipped() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        assert_eq!(physics.step(world, 0.0).unwrap(), 0.0);
        assert_eq!(physics.step(world, f32::NAN).unwrap(), 0.0);
        assert_eq!(physics.step(world, f32::INFINITY).unwrap(), DEFAULT_MAX_DT);
    }

    #[test]
    fn custom_max_dt_is_honoured() {
        let (mut physics, world) = registered(PhysicsConfig::default().with_max_dt(0.05));
        assert_eq!(physics.step(world, 0.1).unwrap(), 0.05);
    }

    #[test]
    fn circle_pose_round_trips_through_scale() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_circle(world, glam::Vec2::new(100.0, 200.0), 0.5, 10.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        let pose = physics.body_pose(&obj).unwrap();
        assert!((pose.position.x - 100.0).abs() < EPS);
        assert!((pose.position.y - 200.0).abs() < EPS);
        assert!((pose.rotation - 0.5).abs() < EPS);
        assert_eq!(physics.space(world).unwrap().collider_count(), 1);
    }

    #[test]
    fn bodies_are_inert_until_activated() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_circle(world, glam::Vec2::new(0.0, 0.0), 0.0, 10.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        assert!(!physics.is_active(&obj));
        for _ in 0..8 {
            physics.step(world, 0.125).unwrap();
        }
        let pose = physics.body_pose(&obj).unwrap();
        assert!(pose.position.y.abs() < EPS);

        assert!(physics.activate(&obj));
        assert!(physics.is_active(&obj));
    }

    #[test]
    fn activated_body_falls_under_gravity() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_circle(world, glam::Vec2::new(100.0, 200.0), 0.0, 10.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        physics.activate(&obj);
        for _ in 0..8 {
            physics.step(world, 0.125).unwrap();
        }
        let pose = physics.body_pose(&obj).unwrap();
        assert!(pose.position.y > 200.0);
        assert!((pose.position.x - 100.0).abs() < EPS);
    }

    #[test]
    fn static_box_does_not_move() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_box(
                world,
                glam::Vec2::new(-800.0, 300.0),
                0.8,
                glam::Vec2::new(1000.0, 10.0),
                BodyKind::Static,
                f32::INFINITY,
                0.0,
            )
            .unwrap();
        physics.activate(&obj);
        for _ in 0..4 {
            physics.step(world, 0.1).unwrap();
        }
        let pose = physics.body_pose(&obj).unwrap();
        assert!((pose.position.x + 800.0).abs() < EPS);
        assert!((pose.rotation - 0.8).abs() < EPS);
    }

    #[test]
    fn kinematic_body_follows_angular_velocity() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_box(
                world,
                glam::Vec2::ZERO,
                0.0,
                glam::Vec2::new(300.0, 10.0),
                BodyKind::Kinematic,
                f32::INFINITY,
                f32::INFINITY,
            )
            .unwrap();
        physics.activate(&obj);
        physics.set_angular_velocity(&obj, 4.0);
        physics.step(world, 0.1).unwrap();
        let pose = physics.body_pose(&obj).unwrap();
        assert!(pose.rotation > 0.0);
        assert_eq!(physics.angular_velocity(&obj), Some(4.0));
    }

    #[test]
    fn velocity_round_trip() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics.create_body(world, BodyKind::Dynamic, 1.0, 1.0).unwrap();
        assert_eq!(physics.velocity(&obj), Some(glam::Vec2::ZERO));
        assert!(physics.set_velocity(&obj, glam::Vec2::new(3.0, -1.0)));
        assert_eq!(physics.velocity(&obj), Some(glam::Vec2::new(3.0, -1.0)));
    }

    #[test]
    fn set_body_position_keeps_angle() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_circle(world, glam::Vec2::ZERO, 1.25, 4.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        physics.set_body_position(&obj, glam::Vec2::new(64.0, -32.0));
        let pose = physics.body_pose(&obj).unwrap();
        assert!((pose.position.x - 64.0).abs() < EPS);
        assert!((pose.position.y + 32.0).abs() < EPS);
        assert!((pose.rotation - 1.25).abs() < EPS);
    }

    #[test]
    fn remove_body_drops_shapes() {
        let (mut physics, world) = registered(PhysicsConfig::default());
        let obj = physics
            .create_box(world, glam::Vec2::ZERO, 0.0, glam::Vec2::ONE * 32.0, BodyKind::Dynamic, 1.0, 1.0)
            .unwrap();
        assert!(physics.remove_body(&obj));
        assert!(!physics.contains(&obj));
        assert_eq!(physics.space(world).unwrap().collider_count(), 0);
        assert!(!physics.remove_body(&obj));
    }

    #[test]
    fn config_loads_from_json_with_defaults() {
        let cfg: PhysicsConfig = serde_json::from_str(r#"{ "max_dt": 0.05 }"#).unwrap();
        assert_eq!(cfg.max_dt, 0.05);
        assert_eq!(cfg.transform_scale, DEFAULT_TRANSFORM_SCALE);
        assert_eq!(cfg.gravity, glam::Vec2::new(0.0, 10.0));
    }
}

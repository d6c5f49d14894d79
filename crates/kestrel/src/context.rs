//! Context — every engine registry in one value.
//!
//! [`Context`] bundles transforms, per-world physics, entities, worlds,
//! input routing, the active camera, and frame timing. Hooks receive
//! `&mut Context` (or `&Context` while drawing), giving them access to
//! everything they need. Two contexts share nothing, so independent
//! simulations can live side by side in one process.
//!
//! The lifecycle operations are spread over the modules that own the data
//! they touch: world operations in `world.rs`, entity passes and possession
//! in `entity_manager.rs`.

use crate::camera::CameraManager;
use crate::entity_manager::EntityManager;
use crate::input::InputRouter;
use crate::math::UVec2;
use crate::physics::{Physics, PhysicsConfig};
use crate::time::Time;
use crate::transform::Transforms;
use crate::world::WorldManager;

/// The engine context.
///
/// # Example
///
/// ```ignore
/// let mut ctx = Context::new();
/// let level = ctx.create_world("level")?;
/// let player = ctx.create_entity(level, Player::default(), false)?;
/// ctx.start_world(level);
///
/// loop {
///     ctx.time.advance_secs(frame_dt);
///     ctx.tick_worlds(ctx.time.delta_secs());
///     ctx.draw_worlds(&mut canvas);
/// }
/// ```
pub struct Context {
    /// Every transform record.
    pub transforms: Transforms,
    /// Per-world rigid-body simulations.
    pub physics: Physics,
    /// Every entity, partitioned by world.
    pub entities: EntityManager,
    /// Every world, in registration order.
    pub worlds: WorldManager,
    /// Input controllers and the possession table.
    pub input: InputRouter,
    /// The camera used for the world-to-screen matrix.
    pub cameras: CameraManager,
    /// Frame timing (delta time, elapsed time, frame count).
    pub time: Time,
    /// Screen size in pixels, as last reported by the host.
    pub screen: UVec2,
}

impl Context {
    pub fn new() -> Self {
        Self::with_physics_config(PhysicsConfig::default())
    }

    pub fn with_physics_config(config: PhysicsConfig) -> Self {
        Self {
            transforms: Transforms::new(),
            physics: Physics::new(config),
            entities: EntityManager::new(),
            worlds: WorldManager::new(),
            input: InputRouter::new(),
            cameras: CameraManager::new(),
            time: Time::new(),
            screen: UVec2::ZERO,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

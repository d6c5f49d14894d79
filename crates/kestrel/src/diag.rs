//! Diagnostics — logger setup and JSON snapshots of engine state.
//!
//! Enabled by the `diagnostics` feature flag (on by default). A
//! [`Snapshot`] is a plain serializable view of a [`Context`]: one entry per
//! world, in registration order, plus registry totals. Hosts can dump it to a
//! log, a file, or a debug overlay.

use serde::Serialize;

use crate::context::Context;

/// Initialise `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}

// ── Snapshot types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldStats {
    pub name: String,
    pub active: bool,
    pub entities: usize,
    pub bodies: usize,
    pub colliders: usize,
    pub clamped_steps: u32,
    pub last_step_dt: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub frame_count: u64,
    pub elapsed_secs: f32,
    pub fps: f32,
    pub worlds: Vec<WorldStats>,
    pub transforms: usize,
    pub controllers: usize,
}

impl Snapshot {
    pub fn capture(ctx: &Context) -> Self {
        let worlds = ctx
            .worlds
            .iter()
            .map(|(id, world)| {
                let space = ctx.physics.space(id);
                WorldStats {
                    name: world.name().to_string(),
                    active: world.is_active(),
                    entities: ctx.entities.entity_count(id),
                    bodies: space.map_or(0, |s| s.body_count()),
                    colliders: space.map_or(0, |s| s.collider_count()),
                    clamped_steps: space.map_or(0, |s| s.clamped_steps()),
                    last_step_dt: space.map_or(0.0, |s| s.last_step_dt()),
                }
            })
            .collect();

        Self {
            frame_count: ctx.time.frame_count(),
            elapsed_secs: ctx.time.elapsed_secs(),
            fps: ctx.time.fps(),
            worlds,
            transforms: ctx.transforms.len(),
            controllers: ctx.input.controller_count(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputController;
    use crate::physics::BodyKind;

    #[test]
    fn snapshot_counts_each_world() {
        let mut ctx = Context::new();
        let a = ctx.create_world("a").unwrap();
        let b = ctx.create_world("b").unwrap();
        let e = ctx.create_entity(a, (), false).unwrap();
        ctx.create_entity(b, (), false).unwrap();
        ctx.create_entity(b, (), false).unwrap();
        ctx.with_entity(e, |entity, ctx| {
            entity.create_sphere_physics(ctx, 16.0, BodyKind::Dynamic, 1.0, 1.0).unwrap();
        });
        ctx.input.add_controller(InputController::new());
        ctx.start_world(a);
        ctx.tick_world(a, 0.5).unwrap();

        let snap = Snapshot::capture(&ctx);
        assert_eq!(snap.worlds.len(), 2);
        assert_eq!(snap.controllers, 1);
        assert_eq!(snap.transforms, 3);

        let wa = &snap.worlds[0];
        assert_eq!(wa.name, "a");
        assert!(wa.active);
        assert_eq!(wa.entities, 1);
        assert_eq!(wa.bodies, 1);
        assert_eq!(wa.colliders, 1);
        assert_eq!(wa.clamped_steps, 1);
        assert!((wa.last_step_dt - 0.128).abs() < 1e-6);

        let wb = &snap.worlds[1];
        assert!(!wb.active);
        assert_eq!(wb.entities, 2);
        assert_eq!(wb.bodies, 0);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut ctx = Context::new();
        ctx.create_world("level").unwrap();
        let json = Snapshot::capture(&ctx).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["worlds"][0]["name"], "level");
        assert_eq!(value["worlds"][0]["active"], false);
    }

    #[test]
    fn init_logger_twice_is_harmless() {
        init_logger();
        init_logger();
    }
}

//! # Kestrel — Minimal 2D Engine Core
//!
//! Worlds of entities with components, hierarchical transforms, and a
//! rapier-backed rigid-body simulation per world. Everything lives in one
//! explicit [`Context`]; the host owns the window, the clock, and the
//! renderer, and drives frames through [`Game`] or the `Context` passes
//! directly.
//!
//! Start with `use kestrel::prelude::*`.

pub mod animation;
pub mod arena;
pub mod camera;
pub mod component;
pub mod context;
pub mod entity;
pub mod entity_manager;
pub mod error;
pub mod game;
pub mod input;
pub mod math;
pub mod physics;
pub mod prelude;
pub mod render;
pub mod tilemap;
pub mod time;
pub mod transform;
pub mod world;

#[cfg(feature = "diagnostics")]
pub mod diag;

pub use context::Context;
pub use entity::{Behaviour, Entity, EntityId};
pub use entity_manager::EntityManager;
pub use error::{EngineError, Result};
pub use game::{Game, GameState, LoadRegistry};

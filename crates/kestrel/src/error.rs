//! Engine errors.
//!
//! Only configuration errors surface as [`EngineError`]: they are detected
//! before any registry is touched, so a failed call leaves the [`Context`]
//! unchanged. Lookup misses are `Option`s, not errors.
//!
//! [`Context`]: crate::context::Context

use thiserror::Error;

use crate::entity::EntityId;
use crate::world::WorldId;

/// Errors returned by world, physics and entity registries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("a world named \"{0}\" already exists")]
    DuplicateWorldName(String),

    #[error("physics is already registered for world {0}")]
    WorldAlreadyRegistered(WorldId),

    #[error("world {0} is not registered")]
    UnknownWorld(WorldId),

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),
}

pub type Result<T> = std::result::Result<T, EngineError>;

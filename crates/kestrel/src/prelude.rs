//! Convenience re-exports — `use kestrel::prelude::*` for the common items.

// Core
pub use crate::component::{Component, ComponentId, ComponentRef};
pub use crate::context::Context;
pub use crate::entity::{Behaviour, Entity, EntityId};
pub use crate::error::EngineError;
pub use crate::game::{Game, GameState, LoadRegistry};
pub use crate::math::{Mat4, Pose, Rect, UVec2, Vec2, Vec3};
pub use crate::time::Time;
pub use crate::transform::{Transform, TransformId};
pub use crate::world::{WorldId, WorldState};

// Physics
pub use crate::physics::{BodyKind, PhysicsConfig, PhysicsObject};

// Input
pub use crate::input::{ControllerId, InputAction, InputController, InputEvent, InputEventType, InputSample};

// Rendering boundary
pub use crate::animation::{SpriteAnimation, SpriteAnimator, SpriteSheet};
pub use crate::render::{Canvas, Color, DrawList, SpriteDraw, TextureId};
pub use crate::tilemap::{MapLayer, TileMap};

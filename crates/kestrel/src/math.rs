//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. [`Pose`] is the 2D position + rotation pair that both
//! transforms and physics bodies exchange.

pub use glam::{Mat4, UVec2, Vec2, Vec3};

/// A 2D position and rotation (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec2,
    pub rotation: f32,
}

impl Pose {
    /// The origin with no rotation.
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        rotation: 0.0,
    };

    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Create a pose at the given position with no rotation.
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self::new(Vec2::new(x, y), 0.0)
    }
}

/// An axis-aligned rectangle in pixels.
///
/// Used to select a sub-region of a texture, for example a single cell from a
/// sprite sheet or a tile from a map atlas. `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

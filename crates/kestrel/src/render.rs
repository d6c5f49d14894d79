//! Render boundary.
//!
//! The engine never talks to a GPU. Draw hooks receive a `&mut dyn Canvas`
//! and describe sprites as [`SpriteDraw`] values; the host decides how to
//! batch and present them. [`DrawList`] is a canvas that just records what
//! it was asked to draw, used by headless hosts and tests.

use crate::math::{Mat4, Rect, Vec2};

/// Opaque id of a texture owned by the host renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const RED: Self = Self { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// One textured quad.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub texture: TextureId,
    /// Destination of the origin point, in world units.
    pub position: Vec2,
    /// Destination size in world units.
    pub size: Vec2,
    /// Pixel region of the texture. `None` draws the whole texture.
    pub source: Option<Rect>,
    /// Rotation in radians around the origin.
    pub rotation: f32,
    /// Pivot in normalised quad space: `(0.5, 0.5)` is the centre.
    pub origin: Vec2,
    /// Mirror the sprite horizontally.
    pub flip_x: bool,
    /// Tint color multiplied with the texture sample.
    pub color: Color,
}

impl SpriteDraw {
    pub fn new(texture: TextureId, position: Vec2, size: Vec2) -> Self {
        Self {
            texture,
            position,
            size,
            source: None,
            rotation: 0.0,
            origin: Vec2::ZERO,
            flip_x: false,
            color: Color::WHITE,
        }
    }

    pub fn with_source(mut self, source: Rect) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_flip_x(mut self, flip_x: bool) -> Self {
        self.flip_x = flip_x;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// Drawing surface handed to draw hooks.
pub trait Canvas {
    fn draw_sprite(&mut self, sprite: &SpriteDraw);

    /// Set the world-to-screen matrix for the following sprites.
    fn set_view(&mut self, _view: Mat4) {}
}

/// A [`Canvas`] that records every call.
#[derive(Debug, Default)]
pub struct DrawList {
    pub sprites: Vec<SpriteDraw>,
    pub view: Option<Mat4>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
        self.view = None;
    }
}

impl Canvas for DrawList {
    fn draw_sprite(&mut self, sprite: &SpriteDraw) {
        self.sprites.push(sprite.clone());
    }

    fn set_view(&mut self, view: Mat4) {
        self.view = Some(view);
    }
}

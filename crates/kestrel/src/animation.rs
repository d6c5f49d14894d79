//! # Animation — Sprite Sheets
//!
//! A sprite sheet is a single texture image containing a grid of cells (e.g. a
//! character walk cycle). [`SpriteSheet`] describes the grid layout,
//! [`SpriteAnimation`] picks which cells to cycle through and how fast, and
//! [`SpriteAnimator`] is a component that advances an animation every tick
//! and draws the current cell at its transform.
//!
//! ```text
//!  ┌────┬────┬────┬────┐
//!  │ 1  │ 2  │ 3  │ 4  │   4-column, 2-row sprite sheet
//!  ├────┼────┼────┼────┤   frame number = row * columns + column + 1
//!  │ 5  │ 6  │ 7  │ 8  │
//!  └────┴────┴────┴────┘
//! ```
//!
//! Frame numbers are 1-based. Playback time is normalised: one pass through
//! the frame list takes `1 / speed` seconds whatever its length.

use crate::component::{Component, ComponentRef};
use crate::context::Context;
use crate::entity::Entity;
use crate::math::{Rect, Vec2};
use crate::render::{Canvas, Color, SpriteDraw, TextureId};

/// Describes a uniform grid sprite sheet.
///
/// All cells are the same size. Cells are numbered row-major (left-to-right,
/// top-to-bottom).
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheet {
    pub columns: u32,
    pub rows: u32,
    /// Size of one cell in pixels.
    pub cell_size: Vec2,
}

impl SpriteSheet {
    /// Create a sprite sheet from grid dimensions and texture size.
    ///
    /// Cell size is `texture_size / grid`.
    pub fn new(columns: u32, rows: u32, texture_size: Vec2) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        Self {
            columns,
            rows,
            cell_size: Vec2::new(
                texture_size.x / columns as f32,
                texture_size.y / rows as f32,
            ),
        }
    }

    /// Total number of cells in the sheet.
    pub fn frame_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Pixel rect of 1-based frame number `frame`, or `None` outside the sheet.
    pub fn frame_rect(&self, frame: u32) -> Option<Rect> {
        if frame == 0 || frame > self.frame_count() {
            return None;
        }
        let index = frame - 1;
        let col = index % self.columns;
        let row = index / self.columns;
        Some(Rect::new(
            col as f32 * self.cell_size.x,
            row as f32 * self.cell_size.y,
            self.cell_size.x,
            self.cell_size.y,
        ))
    }
}

/// A looping sequence of frame numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteAnimation {
    /// 1-based frame numbers into the sheet.
    pub frames: Vec<u32>,
    /// Passes through `frames` per second.
    pub speed: f32,
    /// Normalised playback position in `[0, 1)`.
    pub time: f32,
    pub playing: bool,
}

impl SpriteAnimation {
    pub fn new(frames: Vec<u32>) -> Self {
        Self {
            frames,
            speed: 1.0,
            time: 0.0,
            playing: false,
        }
    }

    /// Advance by `dt` seconds if playing, wrapping at the end of the list.
    pub fn advance(&mut self, dt: f32) {
        if self.playing {
            self.time = (self.time + dt * self.speed).rem_euclid(1.0);
        }
    }

    /// The frame number showing now.
    pub fn current_frame(&self) -> Option<u32> {
        if self.frames.is_empty() {
            return None;
        }
        let last = self.frames.len() - 1;
        let index = ((self.time * self.frames.len() as f32).floor() as usize).min(last);
        Some(self.frames[index])
    }
}

impl Default for SpriteAnimation {
    fn default() -> Self {
        Self::new(vec![1])
    }
}

/// Component: plays a [`SpriteAnimation`] and draws it at its transform.
#[derive(Debug, Clone)]
pub struct SpriteAnimator {
    pub texture: TextureId,
    pub sheet: SpriteSheet,
    pub animation: SpriteAnimation,
    pub tint: Color,
    pub flip_x: bool,
    /// Draw the current frame in the draw pass. Turn off to draw manually
    /// with [`draw_current_frame`](Self::draw_current_frame).
    pub auto_draw: bool,
}

impl SpriteAnimator {
    pub fn new(texture: TextureId, sheet: SpriteSheet) -> Self {
        Self {
            texture,
            sheet,
            animation: SpriteAnimation::default(),
            tint: Color::WHITE,
            flip_x: false,
            auto_draw: true,
        }
    }

    pub fn with_frames(mut self, frames: Vec<u32>) -> Self {
        self.animation.frames = frames;
        self
    }

    pub fn set_frames(&mut self, frames: Vec<u32>) {
        self.animation.frames = frames;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.animation.speed = speed;
    }

    pub fn play(&mut self) {
        self.animation.playing = true;
    }

    /// Hold the current frame.
    pub fn pause(&mut self) {
        self.animation.playing = false;
    }

    /// Stop and rewind to the first frame.
    pub fn stop(&mut self) {
        self.animation.playing = false;
        self.animation.time = 0.0;
    }

    /// Rewind to the first frame and play.
    pub fn reset(&mut self) {
        self.animation.playing = true;
        self.animation.time = 0.0;
    }

    /// Draw the current frame, centred on the transform's world position.
    pub fn draw_current_frame(&self, this: ComponentRef, ctx: &Context, canvas: &mut dyn Canvas) {
        let Some(source) = self
            .animation
            .current_frame()
            .and_then(|frame| self.sheet.frame_rect(frame))
        else {
            return;
        };
        let transforms = &ctx.transforms;
        let (Some(pose), Some(scale)) = (
            transforms.world_pose(this.transform, &ctx.physics),
            transforms.world_scale(this.transform),
        ) else {
            return;
        };
        canvas.draw_sprite(
            &SpriteDraw::new(self.texture, pose.position, self.sheet.cell_size * scale)
                .with_source(source)
                .with_rotation(pose.rotation)
                .with_origin(Vec2::splat(0.5))
                .with_flip_x(self.flip_x)
                .with_color(self.tint),
        );
    }
}

impl Component for SpriteAnimator {
    fn tick(&mut self, _: ComponentRef, _: &mut Entity, ctx: &mut Context) {
        self.animation.advance(ctx.time.delta_secs());
    }

    fn draw(&mut self, this: ComponentRef, _: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {
        if self.auto_draw {
            self.draw_current_frame(this, ctx, canvas);
        }
    }
}

//! Game state and frame driver.
//!
//! [`Game`] owns the [`Context`] and a [`GameState`], and turns one call to
//! [`frame`](Game::frame) into the fixed per-frame sequence:
//!
//! ```text
//! advance time → tick → draw (camera view) → draw_ui (screen space)
//! ```
//!
//! The host owns the window, the clock, and device polling. It calls
//! [`Context::poll_input`] before `frame` if it routes input to entities.
//!
//! # Example
//!
//! ```ignore
//! struct Level;
//!
//! impl GameState for Level {
//!     fn register(&mut self, loaders: &mut LoadRegistry) {
//!         loaders.register::<Player>();
//!     }
//!
//!     fn initialize(&mut self, ctx: &mut Context) {
//!         let world = ctx.create_world("level").expect("unique world name");
//!         ctx.create_entity(world, Player::default(), false).expect("world exists");
//!         ctx.start_world(world);
//!     }
//! }
//!
//! let mut game = Game::new(Level);
//! loop {
//!     game.frame(dt, &mut canvas, screen);
//! }
//! ```

use crate::context::Context;
use crate::entity::Behaviour;
use crate::math::{Mat4, UVec2};
use crate::render::Canvas;

// ── LoadRegistry ────────────────────────────────────────────────────────

/// Explicit table of one-time load callbacks, keyed by a variant tag.
#[derive(Default)]
pub struct LoadRegistry {
    entries: Vec<(String, Box<dyn Fn()>)>,
}

impl LoadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `B::load` under `B`'s type name.
    pub fn register<B: Behaviour>(&mut self) -> &mut Self {
        self.register_fn(std::any::type_name::<B>(), B::load)
    }

    /// Register `load` under `tag`, replacing any callback with that tag.
    pub fn register_fn(&mut self, tag: impl Into<String>, load: impl Fn() + 'static) -> &mut Self {
        let tag = tag.into();
        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = Box::new(load),
            None => self.entries.push((tag, Box::new(load))),
        }
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every callback once, in registration order.
    pub fn load_all(&self) {
        for (tag, load) in &self.entries {
            log::debug!("Loading {tag}");
            load();
        }
    }
}

// ── GameState ───────────────────────────────────────────────────────────

/// Top-level game logic. The defaults drive every active world.
#[allow(unused_variables)]
pub trait GameState {
    /// Register load callbacks for the entity types this state uses.
    fn register(&mut self, loaders: &mut LoadRegistry) {}

    /// Load state-wide assets. Runs once, after the registered loaders.
    fn load(&mut self, ctx: &mut Context) {}

    /// Build worlds and entities. Runs once, after `load`.
    fn initialize(&mut self, ctx: &mut Context) {}

    fn tick(&mut self, ctx: &mut Context) {
        let dt = ctx.time.delta_secs();
        ctx.tick_worlds(dt);
    }

    fn draw(&mut self, ctx: &mut Context, canvas: &mut dyn Canvas) {
        ctx.draw_worlds(canvas);
    }

    fn draw_ui(&mut self, ctx: &mut Context, canvas: &mut dyn Canvas) {
        ctx.draw_ui_worlds(canvas);
    }
}

// ── Game ────────────────────────────────────────────────────────────────

/// Owns the context and the state, and runs frames.
pub struct Game<S: GameState> {
    pub ctx: Context,
    pub state: S,
}

impl<S: GameState> Game<S> {
    /// Set up `state` on a fresh context: registered loaders, then `load`,
    /// then `initialize`.
    pub fn new(state: S) -> Self {
        Self::with_context(Context::new(), state)
    }

    pub fn with_context(mut ctx: Context, mut state: S) -> Self {
        let mut loaders = LoadRegistry::new();
        state.register(&mut loaders);
        loaders.load_all();
        state.load(&mut ctx);
        state.initialize(&mut ctx);
        Self { ctx, state }
    }

    /// Run one frame lasting `delta` seconds on a `screen`-sized surface.
    pub fn frame(&mut self, delta: f32, canvas: &mut dyn Canvas, screen: UVec2) {
        self.ctx.time.advance_secs(delta);
        self.ctx.screen = screen;

        self.state.tick(&mut self.ctx);

        canvas.set_view(self.ctx.view_matrix(screen.as_vec2()));
        self.state.draw(&mut self.ctx, canvas);

        canvas.set_view(Mat4::IDENTITY);
        self.state.draw_ui(&mut self.ctx, canvas);
    }
}

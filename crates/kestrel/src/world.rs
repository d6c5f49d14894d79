//! # Worlds — Isolated Simulation Domains
//!
//! A world couples one entity partition with one physics simulation and owns
//! the active flag that decides whether it runs.
//!
//! ```text
//! Constructed ──start──▶ Active ◀──start/stop──▶ Inactive
//!       └───────────── destroy_world (any state) ─────────────▶ gone
//! ```
//!
//! Only active worlds are ticked and drawn by [`Context::tick_worlds`] and
//! friends. A world's tick always steps physics first, then ticks entities,
//! so every entity reads this frame's settled poses.

use crate::arena::Arena;
use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::render::Canvas;

crate::define_handle!(
    /// Key of a [`World`] in the [`WorldManager`].
    pub struct WorldId;
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    /// Created, never started.
    Constructed,
    Active,
    Inactive,
}

#[derive(Debug, Clone)]
pub struct World {
    name: String,
    state: WorldState,
}

impl World {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == WorldState::Active
    }
}

/// Registry of every world, in registration order.
#[derive(Default)]
pub struct WorldManager {
    worlds: Arena<WorldId, World>,
    order: Vec<WorldId>,
}

impl WorldManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(id)
    }

    pub fn contains(&self, id: WorldId) -> bool {
        self.worlds.contains(id)
    }

    /// Look a world up by name.
    pub fn find(&self, name: &str) -> Option<WorldId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.get(*id).is_some_and(|w| w.name == name))
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    /// World ids in registration order.
    pub fn ids(&self) -> &[WorldId] {
        &self.order
    }

    /// Worlds in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (WorldId, &World)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.worlds.get(*id).map(|w| (*id, w)))
    }

    fn active_ids(&self) -> Vec<WorldId> {
        self.iter()
            .filter(|(_, w)| w.is_active())
            .map(|(id, _)| id)
            .collect()
    }

    fn set_state(&mut self, id: WorldId, state: WorldState) -> Option<WorldState> {
        let world = self.worlds.get_mut(id)?;
        Some(std::mem::replace(&mut world.state, state))
    }
}

impl Context {
    /// Create a world and register it with the entity, physics and world
    /// registries.
    ///
    /// Fails without touching any registry if a world with the same name
    /// exists.
    pub fn create_world(&mut self, name: impl Into<String>) -> Result<WorldId> {
        let name = name.into();
        if self.worlds.find(&name).is_some() {
            return Err(EngineError::DuplicateWorldName(name));
        }
        let id = self.worlds.worlds.insert(World {
            name,
            state: WorldState::Constructed,
        });
        if let Err(e) = self.physics.register_world(id) {
            self.worlds.worlds.remove(id);
            return Err(e);
        }
        self.entities.register_world(id);
        self.worlds.order.push(id);
        log::debug!("Created world {id}");
        Ok(id)
    }

    pub fn world(&self, id: WorldId) -> Option<&World> {
        self.worlds.get(id)
    }

    /// Activate a world and initialize its entities that haven't been yet.
    /// Starting an active world does nothing.
    pub fn start_world(&mut self, id: WorldId) -> bool {
        match self.worlds.set_state(id, WorldState::Active) {
            None => false,
            Some(WorldState::Active) => true,
            Some(_) => {
                log::info!("Starting world \"{}\"", self.world_name(id));
                self.initialize_entities(Some(id));
                true
            }
        }
    }

    /// Deactivate a world, keeping all of its state. Stopping an inactive
    /// world does nothing.
    pub fn stop_world(&mut self, id: WorldId) -> bool {
        match self.worlds.set_state(id, WorldState::Inactive) {
            None => false,
            Some(WorldState::Active) => {
                log::info!("Stopped world \"{}\"", self.world_name(id));
                true
            }
            Some(_) => true,
        }
    }

    fn world_name(&self, id: WorldId) -> &str {
        self.worlds.get(id).map(World::name).unwrap_or_default()
    }

    /// Step `world`'s physics by (at most `max_dt` of) `dt`, then tick its
    /// entities. Runs regardless of the active flag.
    pub fn tick_world(&mut self, id: WorldId, dt: f32) -> Result<()> {
        self.physics.step(id, dt)?;
        self.tick_entities(Some(id));
        Ok(())
    }

    pub fn draw_world(&mut self, id: WorldId, canvas: &mut dyn Canvas) {
        self.draw_entities(Some(id), canvas);
    }

    pub fn draw_ui_world(&mut self, id: WorldId, canvas: &mut dyn Canvas) {
        self.draw_ui_entities(Some(id), canvas);
    }

    /// Destroy every entity of the world, drop its simulation and forget it.
    pub fn destroy_world(&mut self, id: WorldId) -> bool {
        if !self.worlds.contains(id) {
            return false;
        }
        self.unregister_entities(id);
        self.physics.unregister_world(id);
        self.worlds.worlds.remove(id);
        self.worlds.order.retain(|w| *w != id);
        log::debug!("Destroyed world {id}");
        true
    }

    /// Tick every active world, in registration order.
    pub fn tick_worlds(&mut self, dt: f32) {
        for id in self.worlds.active_ids() {
            if let Err(e) = self.tick_world(id, dt) {
                log::warn!("Skipped tick of world {id}: {e}");
            }
        }
    }

    pub fn draw_worlds(&mut self, canvas: &mut dyn Canvas) {
        for id in self.worlds.active_ids() {
            self.draw_world(id, canvas);
        }
    }

    pub fn draw_ui_worlds(&mut self, canvas: &mut dyn Canvas) {
        for id in self.worlds.active_ids() {
            self.draw_ui_world(id, canvas);
        }
    }
}

#[cfg(test)]
pub(crate) fn test_world_id(index: u32) -> WorldId {
    crate::arena::test_key(index)
}

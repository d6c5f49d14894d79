//! Input controllers and possession routing.
//!
//! Raw device polling lives in the host. It reports, per frame, whether each
//! bound button is down and the current wheel value; an [`InputController`]
//! turns those samples into [`InputEvent`]s (pressed / held / released edges
//! and wheel streams).
//!
//! Events reach an entity only through possession. The [`InputRouter`] keeps
//! one table `controller → entity`, so "at most one possessor per entity" is
//! checked in one place. [`Context::possess`](crate::Context::possess) and
//! friends live in `entity_manager.rs`, next to the hook dispatch they need.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::arena::Arena;
use crate::entity::EntityId;

crate::define_handle!(
    /// Key of an [`InputController`] in the [`InputRouter`].
    pub struct ControllerId;
);

// ── Input<T> ────────────────────────────────────────────────────────────

/// Tracks the state of a set of buttons.
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this frame (not held last frame)
/// - `just_released`: released this frame
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if the input was pressed this frame.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this frame.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Events ──────────────────────────────────────────────────────────────

/// Game-level actions a controller can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum InputAction {
    Quit = 0,
    Back = 1,
    Left = 100,
    Right = 101,
    Forward = 102,
    Backward = 103,
    Jump = 200,
    Crouch = 300,
    Run = 350,
    Fire = 400,
    SecondaryFire = 401,
    WheelUp = 500,
    WheelDown = 501,
}

/// What happened to an action this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputEventType {
    /// Went down this frame.
    Pressed = 0,
    /// Down for more than one frame.
    Held = 1,
    /// Went up this frame.
    Released = 2,
    /// A non-binary value, carried in the event's metadata.
    Stream = 10,
}

/// One event relayed to a possessed entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub action: InputAction,
    pub kind: InputEventType,
    /// Analog value for [`InputEventType::Stream`] events, `0.0` otherwise.
    pub metadata: f32,
    /// Elapsed game time (seconds) when the event was sampled.
    pub time: f32,
}

impl InputEvent {
    pub fn new(action: InputAction, kind: InputEventType, metadata: f32, time: f32) -> Self {
        Self {
            action,
            kind,
            metadata,
            time,
        }
    }
}

/// One polled reading handed to [`Context::poll_input`](crate::Context::poll_input).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputSample {
    /// Whether the button bound to `action` is down.
    Button { action: InputAction, down: bool },
    /// Absolute wheel value.
    Wheel(f32),
}

// ── InputController ─────────────────────────────────────────────────────

/// Turns raw samples into edge events.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    buttons: Input<InputAction>,
    wheel: f32,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Button state as of the last sample.
    pub fn buttons(&self) -> &Input<InputAction> {
        &self.buttons
    }

    /// `Pressed` on the rising edge, `Held` while down, `Released` on the
    /// falling edge, nothing while up.
    pub fn sample_button(&mut self, action: InputAction, down: bool, time: f32) -> Option<InputEvent> {
        let was_down = self.buttons.pressed(action);
        let kind = match (was_down, down) {
            (false, true) => {
                self.buttons.press(action);
                InputEventType::Pressed
            }
            (true, true) => InputEventType::Held,
            (true, false) => {
                self.buttons.release(action);
                InputEventType::Released
            }
            (false, false) => return None,
        };
        Some(InputEvent::new(action, kind, 0.0, time))
    }

    /// A `Stream` event carrying the new wheel value whenever it changes.
    pub fn sample_wheel(&mut self, value: f32, time: f32) -> Option<InputEvent> {
        let previous = std::mem::replace(&mut self.wheel, value);
        let action = if value > previous {
            InputAction::WheelUp
        } else if value < previous {
            InputAction::WheelDown
        } else {
            return None;
        };
        Some(InputEvent::new(action, InputEventType::Stream, value, time))
    }

    /// Sample a whole frame, in order.
    pub fn sample(&mut self, samples: &[InputSample], time: f32) -> Vec<InputEvent> {
        self.buttons.clear_just();
        samples
            .iter()
            .filter_map(|sample| match *sample {
                InputSample::Button { action, down } => self.sample_button(action, down, time),
                InputSample::Wheel(value) => self.sample_wheel(value, time),
            })
            .collect()
    }
}

// ── InputRouter ─────────────────────────────────────────────────────────

/// Owns controllers and the possession table.
#[derive(Default)]
pub struct InputRouter {
    controllers: Arena<ControllerId, InputController>,
    possessions: HashMap<ControllerId, EntityId>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_controller(&mut self, controller: InputController) -> ControllerId {
        self.controllers.insert(controller)
    }

    pub fn remove_controller(&mut self, id: ControllerId) -> Option<InputController> {
        self.possessions.remove(&id);
        self.controllers.remove(id)
    }

    pub fn controller(&self, id: ControllerId) -> Option<&InputController> {
        self.controllers.get(id)
    }

    pub fn controller_mut(&mut self, id: ControllerId) -> Option<&mut InputController> {
        self.controllers.get_mut(id)
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// The entity `controller` possesses.
    pub fn possessed(&self, controller: ControllerId) -> Option<EntityId> {
        self.possessions.get(&controller).copied()
    }

    /// The controller possessing `entity`.
    pub fn possessor(&self, entity: EntityId) -> Option<ControllerId> {
        self.possessions
            .iter()
            .find_map(|(c, e)| (*e == entity).then_some(*c))
    }

    pub(crate) fn bind(&mut self, controller: ControllerId, entity: EntityId) -> Option<EntityId> {
        self.possessions.insert(controller, entity)
    }

    /// Drop whatever possession involves `entity`.
    pub(crate) fn release_entity(&mut self, entity: EntityId) -> Option<ControllerId> {
        let controller = self.possessor(entity)?;
        self.possessions.remove(&controller);
        Some(controller)
    }
}

//! # Entity Manager — Per-World Entity Registry and Lifecycle Passes
//!
//! [`EntityManager`] stores every entity record, plus one ordered id list per
//! registered world. The lifecycle passes (`initialize`, `tick`, `draw`,
//! `draw_ui`) are methods on [`Context`], because hooks need the whole
//! context while they run.
//!
//! ## Checkout
//!
//! Before a hook runs, the entity's slot is taken out of the manager and put
//! back once the hook returns:
//!
//! ```text
//! slots[id] = Some(slot)  ──checkout──▶  slots[id] = None   (hook runs)
//!                         ◀──checkin───                     (flush deferred work)
//! ```
//!
//! While checked out, `ctx.entity(id)` returns `None`. Destroying the entity,
//! possessing it, notifying it that it lost its possessor, and relaying input
//! to it are all queued and carried out at checkin.
//!
//! ## Pass policy
//!
//! Every pass iterates a snapshot of the id list taken when the pass starts.
//! Entities created during a pass first run in the next pass; entities
//! destroyed during a pass are skipped. `initialize` runs at most once per
//! entity, whether immediately at creation or in a later pass.

use std::collections::HashMap;

use crate::arena::Arena;
use crate::component::{Component, ComponentId, ComponentRef};
use crate::context::Context;
use crate::entity::{Behaviour, Entity, EntityId};
use crate::error::{EngineError, Result};
use crate::input::{ControllerId, InputEvent, InputSample};
use crate::render::Canvas;
use crate::transform::Transform;
use crate::world::WorldId;

/// An entity record and its behaviour, stored side by side so a hook can
/// borrow both mutably.
pub(crate) struct EntitySlot {
    pub(crate) entity: Entity,
    pub(crate) behaviour: Box<dyn Behaviour>,
}

/// Registry of entities, partitioned by world.
#[derive(Default)]
pub struct EntityManager {
    /// `None` while the entity is checked out for a hook.
    slots: Arena<EntityId, Option<EntitySlot>>,
    /// Entity ids per world, in creation order.
    partitions: HashMap<WorldId, Vec<EntityId>>,
    /// Worlds in registration order.
    order: Vec<WorldId>,
    /// Owner of every attached component.
    pub(crate) component_owners: Arena<ComponentId, EntityId>,
    pending_destroy: Vec<EntityId>,
    pending_input: Vec<(EntityId, InputEvent)>,
    pending_possess: Vec<(ControllerId, EntityId)>,
    pending_unpossessed: Vec<EntityId>,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register_world(&mut self, world: WorldId) -> bool {
        if self.partitions.contains_key(&world) {
            return false;
        }
        self.partitions.insert(world, Vec::new());
        self.order.push(world);
        true
    }

    pub fn is_registered(&self, world: WorldId) -> bool {
        self.partitions.contains_key(&world)
    }

    /// Whether `id` names a live entity (checked out or not).
    pub fn contains(&self, id: EntityId) -> bool {
        self.slots.contains(id)
    }

    /// The entity record, unless it is checked out for a hook.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id)?.as_ref().map(|slot| &slot.entity)
    }

    /// Number of live entities across all worlds.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entity ids of `world`, in creation order.
    pub fn world_entities(&self, world: WorldId) -> &[EntityId] {
        self.partitions
            .get(&world)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entity_count(&self, world: WorldId) -> usize {
        self.world_entities(world).len()
    }

    /// The entity at `index` in `world`'s creation order.
    pub fn entity_at(&self, world: WorldId, index: usize) -> Option<EntityId> {
        self.world_entities(world).get(index).copied()
    }

    /// The entity a component is attached to.
    pub fn component_owner(&self, id: ComponentId) -> Option<EntityId> {
        self.component_owners.get(id).copied()
    }

    /// The behaviour of `id`, downcast to `B`.
    pub fn behaviour<B: Behaviour>(&self, id: EntityId) -> Option<&B> {
        let slot = self.slots.get(id)?.as_ref()?;
        let behaviour: &dyn Behaviour = slot.behaviour.as_ref();
        behaviour.as_any().downcast_ref::<B>()
    }

    pub fn behaviour_mut<B: Behaviour>(&mut self, id: EntityId) -> Option<&mut B> {
        let slot = self.slots.get_mut(id)?.as_mut()?;
        let behaviour: &mut dyn Behaviour = slot.behaviour.as_mut();
        behaviour.as_any_mut().downcast_mut::<B>()
    }

    /// Snapshot of the ids `world` (or every world, in registration order)
    /// holds right now.
    fn snapshot(&self, world: Option<WorldId>) -> Vec<EntityId> {
        match world {
            Some(world) => self.world_entities(world).to_vec(),
            None => self
                .order
                .iter()
                .flat_map(|w| self.world_entities(*w).iter().copied())
                .collect(),
        }
    }

    fn checkout(&mut self, id: EntityId) -> Option<EntitySlot> {
        self.slots.get_mut(id)?.take()
    }

    fn checkin(&mut self, id: EntityId, slot: EntitySlot) {
        match self.slots.get_mut(id) {
            Some(entry) => *entry = Some(slot),
            None => panic!("entity {id} vanished while checked out"),
        }
    }

    fn is_checked_out(&self, id: EntityId) -> bool {
        matches!(self.slots.get(id), Some(None))
    }
}

// ── Hook dispatch ───────────────────────────────────────────────────────

/// Run `f` on every component of `entity` that is attached when the call
/// starts, in attachment order, each checked out while `f` runs.
fn for_each_component(
    entity: &mut Entity,
    mut f: impl FnMut(&mut dyn Component, ComponentRef, &mut Entity),
) {
    for this in entity.component_refs() {
        let Some(mut component) = entity.take_component(this.id) else {
            continue;
        };
        f(component.as_mut(), this, entity);
        entity.restore_component(this.id, component);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DrawLayer {
    World,
    Ui,
}

impl Context {
    /// Borrow an entity record together with the context.
    ///
    /// Returns `None` if the entity doesn't exist or one of its own hooks is
    /// running.
    pub fn with_entity<R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Entity, &mut Context) -> R,
    ) -> Option<R> {
        self.run_hook(id, |slot, ctx| f(&mut slot.entity, ctx))
    }

    /// The entity record, unless one of its hooks is running.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_at(&self, world: WorldId, index: usize) -> Option<EntityId> {
        self.entities.entity_at(world, index)
    }

    fn run_hook<R>(&mut self, id: EntityId, f: impl FnOnce(&mut EntitySlot, &mut Context) -> R) -> Option<R> {
        let mut slot = self.entities.checkout(id)?;
        let result = f(&mut slot, self);
        self.entities.checkin(id, slot);
        self.flush_deferred(id);
        Some(result)
    }

    /// Deliver what piled up for `id` while it was checked out.
    fn flush_deferred(&mut self, id: EntityId) {
        let lost = self.entities.pending_unpossessed.iter().filter(|e| **e == id).count();
        if lost > 0 {
            self.entities.pending_unpossessed.retain(|e| *e != id);
            for _ in 0..lost {
                self.notify_unpossessed(id);
            }
        }
        if self.entities.pending_possess.iter().any(|(_, e)| *e == id) {
            let (requests, rest) = std::mem::take(&mut self.entities.pending_possess)
                .into_iter()
                .partition::<Vec<_>, _>(|(_, e)| *e == id);
            self.entities.pending_possess = rest;
            for (controller, _) in requests {
                if !self.possess(controller, id) {
                    log::warn!("Queued possession of entity {id} by controller {controller} was refused");
                }
            }
        }
        if let Some(i) = self.entities.pending_destroy.iter().position(|e| *e == id) {
            self.entities.pending_destroy.swap_remove(i);
            self.destroy_entity(id);
        }
        if self.entities.pending_input.iter().any(|(e, _)| *e == id) {
            let (events, rest) = std::mem::take(&mut self.entities.pending_input)
                .into_iter()
                .partition::<Vec<_>, _>(|(e, _)| *e == id);
            self.entities.pending_input = rest;
            for (_, event) in events {
                self.deliver_input(id, event);
            }
        }
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Create an entity at the origin of `world`.
    pub fn create_entity<B: Behaviour>(&mut self, world: WorldId, behaviour: B, initialize_now: bool) -> Result<EntityId> {
        self.create_entity_with(world, behaviour, Transform::default(), initialize_now)
    }

    /// Create an entity with an explicit root transform.
    pub fn create_entity_with<B: Behaviour>(
        &mut self,
        world: WorldId,
        behaviour: B,
        transform: Transform,
        initialize_now: bool,
    ) -> Result<EntityId> {
        if !self.entities.is_registered(world) {
            return Err(EngineError::UnknownWorld(world));
        }
        let transform = self.transforms.insert(transform);
        let id = self.entities.slots.insert(None);
        self.entities.checkin(
            id,
            EntitySlot {
                entity: Entity::new(id, world, transform),
                behaviour: Box::new(behaviour),
            },
        );
        if let Some(ids) = self.entities.partitions.get_mut(&world) {
            ids.push(id);
        }
        log::debug!("Created entity {id} in world {world}");
        if initialize_now {
            self.initialize_entity(id);
        }
        Ok(id)
    }

    // ── Passes ──────────────────────────────────────────────────────

    fn initialize_entity(&mut self, id: EntityId) {
        self.run_hook(id, |slot, ctx| {
            if slot.entity.initialized {
                return;
            }
            slot.entity.initialized = true;
            slot.behaviour.initialize(&mut slot.entity, ctx);
            for_each_component(&mut slot.entity, |c, this, owner| c.initialize(this, owner, ctx));
        });
    }

    /// Initialize every entity present now in `world` (or in every world).
    /// Entities spawned by these initializers are not initialized by this
    /// call.
    pub fn initialize_entities(&mut self, world: Option<WorldId>) {
        for id in self.entities.snapshot(world) {
            self.initialize_entity(id);
        }
    }

    /// Tick every entity present now in `world` (or in every world).
    pub fn tick_entities(&mut self, world: Option<WorldId>) {
        for id in self.entities.snapshot(world) {
            self.run_hook(id, |slot, ctx| {
                ctx.transforms
                    .sync_from_body(slot.entity.transform(), &ctx.physics);
                slot.behaviour.tick(&mut slot.entity, ctx);
                for_each_component(&mut slot.entity, |c, this, owner| c.tick(this, owner, ctx));
            });
        }
    }

    pub fn draw_entities(&mut self, world: Option<WorldId>, canvas: &mut dyn Canvas) {
        self.draw_pass(world, canvas, DrawLayer::World);
    }

    pub fn draw_ui_entities(&mut self, world: Option<WorldId>, canvas: &mut dyn Canvas) {
        self.draw_pass(world, canvas, DrawLayer::Ui);
    }

    fn draw_pass(&mut self, world: Option<WorldId>, canvas: &mut dyn Canvas, layer: DrawLayer) {
        for id in self.entities.snapshot(world) {
            let Some(mut slot) = self.entities.checkout(id) else {
                continue;
            };
            let ctx: &Context = self;
            let EntitySlot { entity, behaviour } = &mut slot;
            match layer {
                DrawLayer::World => behaviour.draw(entity, ctx, canvas),
                DrawLayer::Ui => behaviour.draw_ui(entity, ctx, canvas),
            }
            for_each_component(entity, |c, this, owner| match layer {
                DrawLayer::World => c.draw(this, owner, ctx, canvas),
                DrawLayer::Ui => c.draw_ui(this, owner, ctx, canvas),
            });
            self.entities.checkin(id, slot);
        }
    }

    // ── Destruction ─────────────────────────────────────────────────

    /// Destroy an entity: run its `on_destroy` hooks, remove its body, release
    /// its transforms and possession, and drop it from its world.
    ///
    /// Destroying an entity whose hook is running takes effect when that hook
    /// returns.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if self.entities.is_checked_out(id) {
            if !self.entities.pending_destroy.contains(&id) {
                self.entities.pending_destroy.push(id);
            }
            return true;
        }
        let Some(mut slot) = self.entities.checkout(id) else {
            log::warn!("Tried to destroy entity {id}, which does not exist");
            return false;
        };

        slot.behaviour.on_destroy(&mut slot.entity, self);
        for_each_component(&mut slot.entity, |c, this, owner| c.on_destroy(this, owner, self));

        let entity = &mut slot.entity;
        entity.destroy_physics(self);
        for this in entity.component_refs() {
            self.transforms.remove(this.transform);
            self.entities.component_owners.remove(this.id);
        }
        self.transforms.remove(entity.transform());
        if let Some(controller) = self.input.release_entity(id) {
            slot.behaviour.on_unpossessed(&mut slot.entity);
            log::debug!("Controller {controller} lost entity {id}");
        }
        if let Some(ids) = self.entities.partitions.get_mut(&slot.entity.world()) {
            ids.retain(|e| *e != id);
        }
        self.entities.slots.remove(id);
        self.entities.pending_destroy.retain(|e| *e != id);
        self.entities.pending_input.retain(|(e, _)| *e != id);
        self.entities.pending_possess.retain(|(_, e)| *e != id);
        self.entities.pending_unpossessed.retain(|e| *e != id);
        log::debug!("Destroyed entity {id}");
        true
    }

    /// Remove `entity`'s body from its world's simulation. The transform keeps
    /// the last synced pose.
    pub fn destroy_physics(&mut self, entity: EntityId) -> bool {
        self.run_hook(entity, |slot, ctx| slot.entity.destroy_physics(ctx))
            .unwrap_or(false)
    }

    /// Destroy every entity of `world` and forget the world.
    pub(crate) fn unregister_entities(&mut self, world: WorldId) {
        for id in self.entities.snapshot(Some(world)) {
            self.destroy_entity(id);
        }
        self.entities.partitions.remove(&world);
        self.entities.order.retain(|w| *w != world);
    }

    // ── Possession ──────────────────────────────────────────────────

    /// Bind `controller` to `entity`.
    ///
    /// Returns `false` without effect if the entity is already possessed, is
    /// not possessable, or its behaviour refuses. A controller that possessed
    /// another entity lets go of it first.
    ///
    /// If one of `entity`'s hooks is running, the request is queued and
    /// decided when the hook returns; `true` then means "queued". Hooks that
    /// need an immediate answer call [`Entity::possess`] instead.
    pub fn possess(&mut self, controller: ControllerId, entity: EntityId) -> bool {
        if self.input.controller(controller).is_none() {
            log::warn!("Controller {controller} does not exist");
            return false;
        }
        if self.input.possessor(entity).is_some() {
            return false;
        }
        if self.entities.is_checked_out(entity) {
            self.entities.pending_possess.push((controller, entity));
            return true;
        }
        let accepted = self
            .run_hook(entity, |slot, _| {
                if !slot.entity.possessable {
                    log::warn!("Tried to possess entity {entity}, which is not possessable");
                    return false;
                }
                if !slot.behaviour.on_possessed(&mut slot.entity, controller) {
                    log::warn!("Entity {entity} refused possession");
                    return false;
                }
                true
            })
            .unwrap_or(false);
        if !accepted {
            return false;
        }
        self.bind_possession(controller, entity);
        true
    }

    /// Record that `controller` possesses `entity`, letting go of whatever it
    /// possessed before.
    pub(crate) fn bind_possession(&mut self, controller: ControllerId, entity: EntityId) {
        if let Some(previous) = self.input.bind(controller, entity) {
            if previous != entity {
                self.notify_unpossessed(previous);
            }
        }
    }

    /// Run `entity`'s `on_unpossessed`, now or when its running hook returns.
    fn notify_unpossessed(&mut self, entity: EntityId) {
        if self.entities.is_checked_out(entity) {
            self.entities.pending_unpossessed.push(entity);
            return;
        }
        self.run_hook(entity, |slot, _| slot.behaviour.on_unpossessed(&mut slot.entity));
    }

    /// Clear whatever possession involves `entity`.
    pub fn unpossess(&mut self, entity: EntityId) -> Option<ControllerId> {
        let controller = self.input.release_entity(entity)?;
        self.notify_unpossessed(entity);
        Some(controller)
    }

    pub fn possessor(&self, entity: EntityId) -> Option<ControllerId> {
        self.input.possessor(entity)
    }

    /// Relay `event` from `controller` to the entity it possesses, if any.
    pub fn relay_input(&mut self, controller: ControllerId, event: InputEvent) -> bool {
        match self.input.possessed(controller) {
            Some(entity) => self.deliver_input(entity, event),
            None => false,
        }
    }

    fn deliver_input(&mut self, entity: EntityId, event: InputEvent) -> bool {
        if self.entities.is_checked_out(entity) {
            self.entities.pending_input.push((entity, event));
            return true;
        }
        self.run_hook(entity, |slot, ctx| {
            slot.behaviour.on_input_event(&mut slot.entity, ctx, event)
        })
        .is_some()
    }

    /// Turn one frame of raw samples into events and relay them.
    pub fn poll_input(&mut self, controller: ControllerId, samples: &[InputSample]) -> Vec<InputEvent> {
        let time = self.time.elapsed_secs();
        let Some(c) = self.input.controller_mut(controller) else {
            return Vec::new();
        };
        let events = c.sample(samples, time);
        for event in &events {
            self.relay_input(controller, *event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::input::{InputAction, InputController, InputEventType};
    use crate::math::Vec2;
    use crate::physics::BodyKind;
    use crate::render::{DrawList, SpriteDraw, TextureId};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    impl Behaviour for Recorder {
        fn initialize(&mut self, _: &mut Entity, _: &mut Context) {
            self.log.borrow_mut().push(format!("{}:init", self.name));
        }

        fn tick(&mut self, _: &mut Entity, _: &mut Context) {
            self.log.borrow_mut().push(format!("{}:tick", self.name));
        }

        fn draw(&mut self, _: &Entity, _: &Context, canvas: &mut dyn Canvas) {
            canvas.draw_sprite(&SpriteDraw::new(TextureId(1), Vec2::ZERO, Vec2::ONE));
        }

        fn on_destroy(&mut self, _: &mut Entity, _: &mut Context) {
            self.log.borrow_mut().push(format!("{}:destroy", self.name));
        }
    }

    struct RecordingComponent {
        name: &'static str,
        log: Log,
    }

    impl Component for RecordingComponent {
        fn tick(&mut self, _: ComponentRef, _: &mut Entity, _: &mut Context) {
            self.log.borrow_mut().push(format!("{}:tick", self.name));
        }

        fn on_destroy(&mut self, _: ComponentRef, _: &mut Entity, _: &mut Context) {
            self.log.borrow_mut().push(format!("{}:destroy", self.name));
        }
    }

    fn recorder(name: &'static str, log: &Log) -> Recorder {
        Recorder {
            name,
            log: log.clone(),
        }
    }

    fn setup() -> (Context, WorldId, Log) {
        let mut ctx = Context::new();
        let world = ctx.create_world("W1").unwrap();
        (ctx, world, Log::default())
    }

    /// Spawns one more entity the first time it is initialized.
    struct Spawner {
        count: Rc<RefCell<u32>>,
    }

    impl Behaviour for Spawner {
        fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
            *self.count.borrow_mut() += 1;
            ctx.create_entity(
                entity.world(),
                Spawner {
                    count: self.count.clone(),
                },
                false,
            )
            .unwrap();
        }

        fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {
            ctx.create_entity(entity.world(), (), false).unwrap();
        }
    }

    #[test]
    fn create_into_unknown_world_fails() {
        let mut ctx = Context::new();
        let world: WorldId = crate::arena::test_key(5);
        assert_eq!(
            ctx.create_entity(world, (), false),
            Err(EngineError::UnknownWorld(world))
        );
        assert!(ctx.entities.is_empty());
    }

    #[test]
    fn initialize_now_runs_once() {
        let (mut ctx, world, log) = setup();
        let id = ctx.create_entity(world, recorder("a", &log), true).unwrap();
        assert!(ctx.entity(id).unwrap().is_initialized());
        ctx.initialize_entities(Some(world));
        assert_eq!(*log.borrow(), vec!["a:init"]);
    }

    #[test]
    fn initialize_skips_entities_spawned_during_pass() {
        let (mut ctx, world, _) = setup();
        let count = Rc::new(RefCell::new(0));
        for _ in 0..3 {
            ctx.create_entity(world, Spawner { count: count.clone() }, false)
                .unwrap();
        }
        ctx.initialize_entities(Some(world));
        assert_eq!(*count.borrow(), 3);
        assert_eq!(ctx.entities.entity_count(world), 6);

        // The spawned ones are initialized by the next pass, exactly once.
        ctx.initialize_entities(Some(world));
        assert_eq!(*count.borrow(), 6);
    }

    #[test]
    fn tick_spawns_run_next_frame() {
        let (mut ctx, world, _) = setup();
        let count = Rc::new(RefCell::new(0));
        ctx.create_entity(world, Spawner { count }, false).unwrap();
        ctx.tick_entities(Some(world));
        assert_eq!(ctx.entities.entity_count(world), 2);
        ctx.tick_entities(Some(world));
        assert_eq!(ctx.entities.entity_count(world), 3);
    }

    #[test]
    fn tick_order_is_behaviour_then_components() {
        let (mut ctx, world, log) = setup();
        let id = ctx.create_entity(world, recorder("e", &log), false).unwrap();
        ctx.with_entity(id, |entity, ctx| {
            entity.add_component(ctx, RecordingComponent { name: "c1", log: log.clone() });
            entity.add_component(ctx, RecordingComponent { name: "c2", log: log.clone() });
        });
        ctx.tick_entities(None);
        assert_eq!(*log.borrow(), vec!["e:tick", "c1:tick", "c2:tick"]);
    }

    #[test]
    fn entities_tick_in_creation_order() {
        let (mut ctx, world, log) = setup();
        let other = ctx.create_world("W2").unwrap();
        ctx.create_entity(other, recorder("x", &log), false).unwrap();
        ctx.create_entity(world, recorder("a", &log), false).unwrap();
        ctx.create_entity(world, recorder("b", &log), false).unwrap();
        ctx.tick_entities(None);
        assert_eq!(*log.borrow(), vec!["a:tick", "b:tick", "x:tick"]);
    }

    #[test]
    fn tick_syncs_body_before_hooks() {
        struct Observer {
            seen: Rc<RefCell<Option<Vec2>>>,
        }
        impl Behaviour for Observer {
            fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {
                let local = ctx.transforms.get(entity.transform()).unwrap().local_position();
                *self.seen.borrow_mut() = Some(local);
            }
        }

        let (mut ctx, world, _) = setup();
        let seen = Rc::new(RefCell::new(None));
        let id = ctx
            .create_entity(world, Observer { seen: seen.clone() }, false)
            .unwrap();
        let obj = ctx
            .with_entity(id, |entity, ctx| {
                entity.set_position(ctx, Vec2::new(100.0, 200.0));
                let obj = entity
                    .create_sphere_physics(ctx, 10.0, BodyKind::Dynamic, 1.0, 1.0)
                    .unwrap();
                entity.activate_physics(ctx);
                obj
            })
            .unwrap();
        ctx.physics.step(world, 0.1).unwrap();
        ctx.tick_entities(Some(world));

        let body = ctx.physics.body_pose(&obj).unwrap().position;
        let seen = seen.borrow().unwrap();
        assert!((seen - body).length() < 1e-3);
        assert!(seen.y > 200.0);
    }

    #[test]
    fn draw_passes_reach_canvas() {
        let (mut ctx, world, log) = setup();
        ctx.create_entity(world, recorder("a", &log), false).unwrap();
        ctx.create_entity(world, recorder("b", &log), false).unwrap();
        let mut canvas = DrawList::new();
        ctx.draw_entities(Some(world), &mut canvas);
        assert_eq!(canvas.len(), 2);
        canvas.clear();
        ctx.draw_ui_entities(Some(world), &mut canvas);
        assert!(canvas.is_empty());
    }

    #[test]
    fn destroy_runs_hooks_and_releases_everything() {
        let (mut ctx, world, log) = setup();
        let id = ctx.create_entity(world, recorder("e", &log), false).unwrap();
        ctx.with_entity(id, |entity, ctx| {
            entity.add_component(ctx, RecordingComponent { name: "c", log: log.clone() });
            entity
                .create_sphere_physics(ctx, 10.0, BodyKind::Dynamic, 1.0, 1.0)
                .unwrap();
        });
        assert_eq!(ctx.transforms.len(), 2);

        assert!(ctx.destroy_entity(id));
        assert_eq!(*log.borrow(), vec!["e:destroy", "c:destroy"]);
        assert!(!ctx.entities.contains(id));
        assert_eq!(ctx.entities.entity_count(world), 0);
        assert!(ctx.transforms.is_empty());
        assert_eq!(ctx.physics.space(world).unwrap().body_count(), 0);
        assert!(!ctx.destroy_entity(id));
    }

    #[test]
    fn self_destroy_is_deferred_until_hook_returns() {
        struct Doomed;
        impl Behaviour for Doomed {
            fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {
                assert!(ctx.destroy_entity(entity.id()));
                // Still usable for the rest of the hook.
                entity.possessable = true;
            }
        }

        let (mut ctx, world, log) = setup();
        let doomed = ctx.create_entity(world, Doomed, false).unwrap();
        ctx.create_entity(world, recorder("after", &log), false).unwrap();
        ctx.tick_entities(Some(world));
        assert!(!ctx.entities.contains(doomed));
        assert_eq!(*log.borrow(), vec!["after:tick"]);
    }

    #[test]
    fn destroyed_mid_pass_is_skipped() {
        struct Killer {
            victim: Rc<RefCell<Option<EntityId>>>,
        }
        impl Behaviour for Killer {
            fn tick(&mut self, _: &mut Entity, ctx: &mut Context) {
                if let Some(victim) = self.victim.borrow_mut().take() {
                    ctx.destroy_entity(victim);
                }
            }
        }

        let (mut ctx, world, log) = setup();
        let victim = Rc::new(RefCell::new(None));
        ctx.create_entity(world, Killer { victim: victim.clone() }, false)
            .unwrap();
        let target = ctx.create_entity(world, recorder("victim", &log), false).unwrap();
        *victim.borrow_mut() = Some(target);
        ctx.tick_entities(Some(world));
        assert_eq!(*log.borrow(), vec!["victim:destroy"]);
    }

    #[test]
    fn entity_at_follows_creation_order() {
        let (mut ctx, world, log) = setup();
        let a = ctx.create_entity(world, recorder("a", &log), false).unwrap();
        let b = ctx.create_entity(world, recorder("b", &log), false).unwrap();
        assert_eq!(ctx.entity_at(world, 0), Some(a));
        assert_eq!(ctx.entity_at(world, 1), Some(b));
        assert_eq!(ctx.entity_at(world, 2), None);
        assert!(ctx.entities.behaviour::<Recorder>(a).is_some());
        assert!(ctx.entities.behaviour::<Spawner>(a).is_none());
    }

    // ── Possession ──────────────────────────────────────────────────

    struct Pawn {
        events: Rc<RefCell<Vec<InputEvent>>>,
    }

    impl Behaviour for Pawn {
        fn initialize(&mut self, entity: &mut Entity, _: &mut Context) {
            entity.possessable = true;
        }

        fn on_input_event(&mut self, _: &mut Entity, _: &mut Context, event: InputEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    fn pawn(ctx: &mut Context, world: WorldId) -> (EntityId, Rc<RefCell<Vec<InputEvent>>>) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let id = ctx
            .create_entity(world, Pawn { events: events.clone() }, true)
            .unwrap();
        (id, events)
    }

    #[test]
    fn second_possess_is_refused() {
        let (mut ctx, world, _) = setup();
        let (entity, _) = pawn(&mut ctx, world);
        let x = ctx.input.add_controller(InputController::new());
        let y = ctx.input.add_controller(InputController::new());
        assert!(ctx.possess(x, entity));
        assert!(!ctx.possess(y, entity));
        assert_eq!(ctx.possessor(entity), Some(x));

        assert_eq!(ctx.unpossess(entity), Some(x));
        assert!(ctx.possess(y, entity));
    }

    #[test]
    fn unpossessable_entity_is_refused() {
        let (mut ctx, world, log) = setup();
        let entity = ctx.create_entity(world, recorder("a", &log), true).unwrap();
        let x = ctx.input.add_controller(InputController::new());
        assert!(!ctx.possess(x, entity));
        assert_eq!(ctx.possessor(entity), None);
    }

    #[test]
    fn only_possessed_entity_receives_input() {
        let (mut ctx, world, _) = setup();
        let (a, a_events) = pawn(&mut ctx, world);
        let (_b, b_events) = pawn(&mut ctx, world);
        let x = ctx.input.add_controller(InputController::new());
        let event = InputEvent::new(InputAction::Jump, InputEventType::Pressed, 0.0, 0.0);

        assert!(!ctx.relay_input(x, event));
        ctx.possess(x, a);
        assert!(ctx.relay_input(x, event));
        assert_eq!(a_events.borrow().len(), 1);
        assert!(b_events.borrow().is_empty());
    }

    #[test]
    fn possession_moves_with_controller() {
        let (mut ctx, world, _) = setup();
        let (a, _) = pawn(&mut ctx, world);
        let (b, _) = pawn(&mut ctx, world);
        let x = ctx.input.add_controller(InputController::new());
        assert!(ctx.possess(x, a));
        assert!(ctx.possess(x, b));
        assert_eq!(ctx.possessor(a), None);
        assert_eq!(ctx.possessor(b), Some(x));
    }

    #[test]
    fn poll_input_relays_edges() {
        let (mut ctx, world, _) = setup();
        let (a, events) = pawn(&mut ctx, world);
        let x = ctx.input.add_controller(InputController::new());
        ctx.possess(x, a);
        let down = [InputSample::Button { action: InputAction::Fire, down: true }];
        ctx.poll_input(x, &down);
        ctx.poll_input(x, &down);
        ctx.poll_input(x, &[InputSample::Button { action: InputAction::Fire, down: false }]);
        let kinds: Vec<_> = events.borrow().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![InputEventType::Pressed, InputEventType::Held, InputEventType::Released]
        );
    }

    #[test]
    fn input_for_running_entity_is_queued() {
        struct SelfRelay {
            controller: ControllerId,
            events: Rc<RefCell<Vec<InputEvent>>>,
        }
        impl Behaviour for SelfRelay {
            fn initialize(&mut self, entity: &mut Entity, _: &mut Context) {
                entity.possessable = true;
            }
            fn tick(&mut self, _: &mut Entity, ctx: &mut Context) {
                let event = InputEvent::new(InputAction::Run, InputEventType::Held, 0.0, 0.0);
                ctx.relay_input(self.controller, event);
                assert!(self.events.borrow().is_empty());
            }
            fn on_input_event(&mut self, _: &mut Entity, _: &mut Context, event: InputEvent) {
                self.events.borrow_mut().push(event);
            }
        }

        let (mut ctx, world, _) = setup();
        let x = ctx.input.add_controller(InputController::new());
        let events = Rc::new(RefCell::new(Vec::new()));
        let id = ctx
            .create_entity(world, SelfRelay { controller: x, events: events.clone() }, true)
            .unwrap();
        assert!(ctx.possess(x, id));
        ctx.tick_entities(Some(world));
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn destroy_physics_by_id_removes_body() {
        let (mut ctx, world, _) = setup();
        let e = ctx.create_entity(world, (), false).unwrap();
        let obj = ctx
            .with_entity(e, |entity, ctx| {
                entity.create_box_physics(ctx, Vec2::new(64.0, 64.0), BodyKind::Static, 0.0, 0.0)
            })
            .unwrap()
            .unwrap();
        assert!(ctx.destroy_physics(e));
        assert!(!ctx.physics.contains(&obj));
        assert!(!ctx.destroy_physics(e));
    }

    #[test]
    fn destroy_releases_possession() {
        let (mut ctx, world, _) = setup();
        let (a, _) = pawn(&mut ctx, world);
        let x = ctx.input.add_controller(InputController::new());
        ctx.possess(x, a);
        ctx.destroy_entity(a);
        assert_eq!(ctx.input.possessed(x), None);
    }

    /// Asks to be possessed while initializing, and counts lost possessions.
    struct Volunteer {
        controller: ControllerId,
        immediate: bool,
        answer: Rc<Cell<Option<bool>>>,
        seen_possessor: Rc<Cell<Option<ControllerId>>>,
    }

    impl Behaviour for Volunteer {
        fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
            entity.possessable = true;
            let answer = if self.immediate {
                entity.possess(ctx, self.controller)
            } else {
                ctx.possess(self.controller, entity.id())
            };
            self.answer.set(Some(answer));
            self.seen_possessor.set(ctx.possessor(entity.id()));
        }
    }

    fn volunteer(
        ctx: &mut Context,
        world: WorldId,
        controller: ControllerId,
        immediate: bool,
    ) -> (EntityId, Option<bool>, Option<ControllerId>) {
        let answer = Rc::new(Cell::new(None));
        let seen = Rc::new(Cell::new(None));
        let behaviour = Volunteer {
            controller,
            immediate,
            answer: answer.clone(),
            seen_possessor: seen.clone(),
        };
        let id = ctx.create_entity(world, behaviour, true).unwrap();
        (id, answer.get(), seen.get())
    }

    #[test]
    fn possess_from_initialize_is_applied_after_the_hook() {
        let (mut ctx, world, _) = setup();
        let x = ctx.input.add_controller(InputController::new());
        let (entity, answer, seen) = volunteer(&mut ctx, world, x, false);
        assert_eq!(answer, Some(true));
        assert_eq!(seen, None);
        assert_eq!(ctx.possessor(entity), Some(x));
        assert_eq!(ctx.input.possessed(x), Some(entity));
    }

    #[test]
    fn entity_possess_answers_inside_initialize() {
        let (mut ctx, world, _) = setup();
        let x = ctx.input.add_controller(InputController::new());
        let (entity, answer, seen) = volunteer(&mut ctx, world, x, true);
        assert_eq!(answer, Some(true));
        assert_eq!(seen, Some(x));
        assert_eq!(ctx.possessor(entity), Some(x));
    }

    /// Counts `on_unpossessed` calls. On tick it either lets go of its own
    /// possessor or hands its controller over to another entity.
    struct Holder {
        lost: Rc<Cell<u32>>,
        on_tick: Option<Handover>,
    }

    enum Handover {
        Release,
        To(ControllerId, EntityId),
    }

    impl Behaviour for Holder {
        fn initialize(&mut self, entity: &mut Entity, _: &mut Context) {
            entity.possessable = true;
        }

        fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {
            match self.on_tick.take() {
                Some(Handover::Release) => {
                    ctx.unpossess(entity.id());
                }
                Some(Handover::To(controller, other)) => {
                    assert!(ctx.possess(controller, other));
                }
                None => {}
            }
        }

        fn on_unpossessed(&mut self, _: &mut Entity) {
            self.lost.set(self.lost.get() + 1);
        }
    }

    fn holder(ctx: &mut Context, world: WorldId, on_tick: Option<Handover>) -> (EntityId, Rc<Cell<u32>>) {
        let lost = Rc::new(Cell::new(0));
        let id = ctx
            .create_entity(world, Holder { lost: lost.clone(), on_tick }, true)
            .unwrap();
        (id, lost)
    }

    #[test]
    fn unpossess_from_own_tick_notifies_after_the_hook() {
        let (mut ctx, world, _) = setup();
        let (a, lost) = holder(&mut ctx, world, Some(Handover::Release));
        let x = ctx.input.add_controller(InputController::new());
        assert!(ctx.possess(x, a));

        ctx.tick_entities(Some(world));
        assert_eq!(lost.get(), 1);
        assert_eq!(ctx.possessor(a), None);
        assert_eq!(ctx.input.possessed(x), None);
    }

    #[test]
    fn handing_controller_away_from_own_tick_notifies_previous() {
        let (mut ctx, world, _) = setup();
        let (b, b_lost) = holder(&mut ctx, world, None);
        let x = ctx.input.add_controller(InputController::new());
        let (a, a_lost) = holder(&mut ctx, world, Some(Handover::To(x, b)));
        assert!(ctx.possess(x, a));

        ctx.tick_entities(Some(world));
        assert_eq!(a_lost.get(), 1);
        assert_eq!(b_lost.get(), 0);
        assert_eq!(ctx.possessor(a), None);
        assert_eq!(ctx.possessor(b), Some(x));
    }
}

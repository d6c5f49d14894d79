//! # Entities — Composed Game Objects
//!
//! An entity is a record in the [`EntityManager`](crate::EntityManager)
//! owning one transform, an ordered list of components, and optionally one
//! physics body. What the entity *does* lives in its [`Behaviour`], a trait
//! object stored next to the record.
//!
//! ## Hooks and checkout
//!
//! While one of an entity's hooks runs, its record is checked out of the
//! manager and passed to the hook as `&mut Entity`, with the whole
//! [`Context`] alongside. Every pass runs in a fixed order:
//!
//! ```text
//! tick:  sync_from_body → Behaviour::tick → components (attachment order)
//! other: Behaviour hook → components (attachment order)
//! ```
//!
//! Outside hooks, use [`Context::with_entity`] to borrow a record together
//! with the context.

use crate::component::{Attached, Component, ComponentId, ComponentRef};
use crate::context::Context;
use crate::error::Result;
use crate::input::{ControllerId, InputEvent};
use crate::math::{Pose, Vec2};
use crate::physics::{BodyKind, PhysicsObject};
use crate::render::Canvas;
use crate::transform::{Transform, TransformId};
use crate::world::WorldId;

crate::define_handle!(
    /// Key of an entity in the [`EntityManager`](crate::EntityManager).
    pub struct EntityId;
);

// ── Behaviour ───────────────────────────────────────────────────────────

/// What an entity does. Every hook defaults to a no-op.
///
/// # Example
///
/// ```ignore
/// struct Crate;
///
/// impl Behaviour for Crate {
///     fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {
///         entity.set_position(ctx, Vec2::new(100.0, 200.0));
///         entity
///             .create_box_physics(ctx, Vec2::splat(32.0), BodyKind::Dynamic, 1.0, 1.0)
///             .expect("world is registered");
///         entity.activate_physics(ctx);
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Behaviour: crate::component::AsAny {
    /// One-time setup for the variant (asset loading and the like), run by
    /// [`LoadRegistry`](crate::LoadRegistry) before any world exists.
    fn load()
    where
        Self: Sized,
    {
    }

    fn initialize(&mut self, entity: &mut Entity, ctx: &mut Context) {}

    fn tick(&mut self, entity: &mut Entity, ctx: &mut Context) {}

    fn draw(&mut self, entity: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {}

    fn draw_ui(&mut self, entity: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {}

    fn on_destroy(&mut self, entity: &mut Entity, ctx: &mut Context) {}

    /// An event relayed by the controller possessing this entity.
    fn on_input_event(&mut self, entity: &mut Entity, ctx: &mut Context, event: InputEvent) {}

    /// Veto for possession. Only asked for possessable, unpossessed entities.
    fn on_possessed(&mut self, entity: &mut Entity, controller: ControllerId) -> bool {
        true
    }

    fn on_unpossessed(&mut self, entity: &mut Entity) {}
}

/// An entity with no behaviour of its own; only its components run.
impl Behaviour for () {}

// ── Entity ──────────────────────────────────────────────────────────────

/// The record of one entity.
pub struct Entity {
    id: EntityId,
    world: WorldId,
    transform: TransformId,
    pub(crate) components: Vec<Attached>,
    physics: Option<PhysicsObject>,
    /// Whether an input controller may possess this entity.
    pub possessable: bool,
    pub(crate) initialized: bool,
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("world", &self.world)
            .field("transform", &self.transform)
            .field("components", &self.components.len())
            .field("physics", &self.physics)
            .field("possessable", &self.possessable)
            .finish()
    }
}

impl Entity {
    pub(crate) fn new(id: EntityId, world: WorldId, transform: TransformId) -> Self {
        Self {
            id,
            world,
            transform,
            components: Vec::new(),
            physics: None,
            possessable: false,
            initialized: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The world this entity was created in.
    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn physics(&self) -> Option<PhysicsObject> {
        self.physics
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Components ──────────────────────────────────────────────────

    /// Attach `component`, giving it a transform parented to the entity's.
    /// Several components of the same type may be attached.
    pub fn add_component<C: Component>(&mut self, ctx: &mut Context, component: C) -> ComponentId {
        let transform = ctx
            .transforms
            .insert(Transform::default().with_parent(self.transform));
        let id = ctx.entities.component_owners.insert(self.id);
        self.components.push(Attached {
            this: ComponentRef {
                id,
                owner: self.id,
                transform,
            },
            component: Some(Box::new(component)),
        });
        id
    }

    /// Attach a default-constructed `C`.
    pub fn add_default_component<C: Component + Default>(&mut self, ctx: &mut Context) -> ComponentId {
        self.add_component(ctx, C::default())
    }

    /// Detach a component and release its transform. Unknown ids are ignored.
    pub fn remove_component(&mut self, ctx: &mut Context, id: ComponentId) -> bool {
        let Some(index) = self.components.iter().position(|a| a.this.id == id) else {
            return false;
        };
        let attached = self.components.remove(index);
        ctx.transforms.remove(attached.this.transform);
        ctx.entities.component_owners.remove(id);
        true
    }

    /// The first attached component of type `C`, in attachment order.
    pub fn get_component<C: Component>(&self) -> Option<&C> {
        self.components.iter().find_map(|a| {
            let component: &dyn Component = a.component.as_deref()?;
            component.as_any().downcast_ref::<C>()
        })
    }

    pub fn get_component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components.iter_mut().find_map(|a| {
            let component: &mut dyn Component = a.component.as_deref_mut()?;
            component.as_any_mut().downcast_mut::<C>()
        })
    }

    /// Where the first component of type `C` lives.
    pub fn component_ref<C: Component>(&self) -> Option<ComponentRef> {
        self.components.iter().find_map(|a| {
            let component: &dyn Component = a.component.as_deref()?;
            component.as_any().is::<C>().then_some(a.this)
        })
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Ids of the attached components, in attachment order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|a| a.this.id)
    }

    pub(crate) fn take_component(&mut self, id: ComponentId) -> Option<Box<dyn Component>> {
        self.components
            .iter_mut()
            .find(|a| a.this.id == id)?
            .component
            .take()
    }

    /// Put a checked-out component back. If it was removed meanwhile, it is
    /// dropped.
    pub(crate) fn restore_component(&mut self, id: ComponentId, component: Box<dyn Component>) {
        if let Some(slot) = self.components.iter_mut().find(|a| a.this.id == id) {
            slot.component = Some(component);
        }
    }

    pub(crate) fn component_refs(&self) -> Vec<ComponentRef> {
        self.components.iter().map(|a| a.this).collect()
    }

    // ── Pose ────────────────────────────────────────────────────────

    pub fn position(&self, ctx: &Context) -> Vec2 {
        ctx.transforms
            .world_position(self.transform, &ctx.physics)
            .unwrap_or_default()
    }

    pub fn rotation(&self, ctx: &Context) -> f32 {
        ctx.transforms
            .world_rotation(self.transform, &ctx.physics)
            .unwrap_or_default()
    }

    pub fn set_position(&self, ctx: &mut Context, position: Vec2) {
        ctx.transforms
            .set_local_position(self.transform, position, &mut ctx.physics);
    }

    pub fn set_rotation(&self, ctx: &mut Context, rotation: f32) {
        ctx.transforms
            .set_local_rotation(self.transform, rotation, &mut ctx.physics);
    }

    // ── Physics ─────────────────────────────────────────────────────

    /// Create a circle body at the entity's current world pose and let it
    /// drive the entity's transform. Replaces any previous body.
    pub fn create_sphere_physics(
        &mut self,
        ctx: &mut Context,
        radius: f32,
        kind: BodyKind,
        mass: f32,
        moment: f32,
    ) -> Result<PhysicsObject> {
        let pose = self.world_pose(ctx);
        let obj = ctx
            .physics
            .create_circle(self.world, pose.position, pose.rotation, radius, kind, mass, moment)?;
        self.attach_physics(ctx, obj);
        Ok(obj)
    }

    /// Create a box body (full width and height in world units) at the
    /// entity's current world pose. Replaces any previous body.
    pub fn create_box_physics(
        &mut self,
        ctx: &mut Context,
        size: Vec2,
        kind: BodyKind,
        mass: f32,
        moment: f32,
    ) -> Result<PhysicsObject> {
        let pose = self.world_pose(ctx);
        let obj = ctx
            .physics
            .create_box(self.world, pose.position, pose.rotation, size, kind, mass, moment)?;
        self.attach_physics(ctx, obj);
        Ok(obj)
    }

    fn world_pose(&self, ctx: &Context) -> Pose {
        ctx.transforms
            .world_pose(self.transform, &ctx.physics)
            .unwrap_or_default()
    }

    fn attach_physics(&mut self, ctx: &mut Context, obj: PhysicsObject) {
        self.destroy_physics(ctx);
        ctx.transforms.attach_body(self.transform, obj);
        self.physics = Some(obj);
    }

    /// Let the simulation move this entity's body.
    pub fn activate_physics(&self, ctx: &mut Context) -> bool {
        match &self.physics {
            Some(obj) => ctx.physics.activate(obj),
            None => false,
        }
    }

    /// Detach and remove the body. The transform keeps its last-synced pose.
    pub fn destroy_physics(&mut self, ctx: &mut Context) -> bool {
        let Some(obj) = self.physics.take() else {
            return false;
        };
        ctx.transforms.detach_body(self.transform);
        ctx.physics.remove_body(&obj)
    }

    /// Linear velocity in physics units/s; zero without a body.
    pub fn velocity(&self, ctx: &Context) -> Vec2 {
        self.physics
            .and_then(|obj| ctx.physics.velocity(&obj))
            .unwrap_or(Vec2::ZERO)
    }

    /// Angular velocity in radians/s; zero without a body.
    pub fn angular_velocity(&self, ctx: &Context) -> f32 {
        self.physics
            .and_then(|obj| ctx.physics.angular_velocity(&obj))
            .unwrap_or(0.0)
    }

    pub fn set_velocity(&self, ctx: &mut Context, velocity: Vec2) -> bool {
        match &self.physics {
            Some(obj) => ctx.physics.set_velocity(obj, velocity),
            None => false,
        }
    }

    pub fn set_angular_velocity(&self, ctx: &mut Context, angvel: f32) -> bool {
        match &self.physics {
            Some(obj) => ctx.physics.set_angular_velocity(obj, angvel),
            None => false,
        }
    }

    // ── Possession ──────────────────────────────────────────────────

    /// Let `controller` possess this entity from inside one of its own hooks.
    ///
    /// Unlike [`Context::possess`] this answers immediately. `on_possessed` is
    /// not asked, since the behaviour is the one making the request.
    pub fn possess(&self, ctx: &mut Context, controller: ControllerId) -> bool {
        if !self.possessable {
            log::warn!("Tried to possess entity {}, which is not possessable", self.id);
            return false;
        }
        if ctx.input.controller(controller).is_none() {
            log::warn!("Controller {controller} does not exist");
            return false;
        }
        if ctx.input.possessor(self.id).is_some() {
            return false;
        }
        ctx.bind_possession(controller, self.id);
        true
    }
}

//! Components — reusable behaviour attached to one entity.
//!
//! A component is any `'static` type implementing [`Component`]. It is
//! attached with [`Entity::add_component`](crate::Entity::add_component),
//! which gives it its own transform parented to the entity's, and it only
//! runs inside its owner's passes, in attachment order.
//!
//! While a component hook runs, the component is checked out of its owner,
//! so the hook gets `&mut Entity` for the owner alongside `&mut self`.

use std::any::Any;

use crate::context::Context;
use crate::entity::{Entity, EntityId};
use crate::render::Canvas;
use crate::transform::TransformId;

crate::define_handle!(
    /// Identity of an attached component.
    pub struct ComponentId;
);

/// Upcast to [`Any`] for downcasting trait objects.
///
/// Call it on `&dyn Component`, never on a `Box`, or the box itself is what
/// gets downcast.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Where a component lives: its id, its owner and its own transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub id: ComponentId,
    pub owner: EntityId,
    pub transform: TransformId,
}

/// Per-frame hooks of a component. Every hook defaults to a no-op.
#[allow(unused_variables)]
pub trait Component: AsAny {
    fn initialize(&mut self, this: ComponentRef, owner: &mut Entity, ctx: &mut Context) {}

    fn tick(&mut self, this: ComponentRef, owner: &mut Entity, ctx: &mut Context) {}

    fn draw(&mut self, this: ComponentRef, owner: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {}

    fn draw_ui(&mut self, this: ComponentRef, owner: &Entity, ctx: &Context, canvas: &mut dyn Canvas) {}

    fn on_destroy(&mut self, this: ComponentRef, owner: &mut Entity, ctx: &mut Context) {}
}

/// A component slot on an entity. `component` is `None` while its hook runs.
pub(crate) struct Attached {
    pub(crate) this: ComponentRef,
    pub(crate) component: Option<Box<dyn Component>>,
}

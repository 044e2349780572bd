//! Actor abstraction consumed by the clamper.
//!
//! Actors are owned by the simulation's registry. The clamper only borrows
//! them for the duration of a call: requests are made with `&mut dyn
//! ClampableActor`, and deferred requests are resolved later through a
//! [`ClampTargets`] registry keyed by [`ActorId`].

use std::collections::HashMap;

use crate::{
    data::GroundClampingData,
    types::{BoundingBox, Transform},
};

/// Stable identifier of an actor within the simulation registry.
pub type ActorId = u64;

/// Anything the clamper can position.
pub trait ClampableActor {
    fn id(&self) -> ActorId;

    /// Human-readable name used in log messages.
    fn name(&self) -> &str {
        ""
    }

    fn transform(&self) -> Transform;

    fn set_transform(&mut self, xform: Transform);

    /// Visual bounds in model space.
    fn bounding_box(&self) -> BoundingBox;

    /// Collision geometry bounds in model space, when the actor has collision geometry.
    /// Preferred over the visual bounds when sizing the probe footprint.
    fn collision_bounds(&self) -> Option<BoundingBox> {
        None
    }
}

/// Minimal concrete actor: a named transform with bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicActor {
    pub id: ActorId,
    pub name: String,
    pub transform: Transform,
    pub bounds: BoundingBox,
    pub collision: Option<BoundingBox>,
}

impl BasicActor {
    pub fn new(
        id: ActorId,
        name: impl Into<String>,
        transform: Transform,
        bounds: BoundingBox,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            transform,
            bounds,
            collision: None,
        }
    }
}

impl ClampableActor for BasicActor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self) -> Transform {
        self.transform
    }

    fn set_transform(&mut self, xform: Transform) {
        self.transform = xform;
    }

    fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    fn collision_bounds(&self) -> Option<BoundingBox> {
        self.collision
    }
}

/// An actor together with its clamping data, as stored by a registry.
#[derive(Debug)]
pub struct ClampEntity<A> {
    pub actor: A,
    pub data: GroundClampingData,
}

impl<A> ClampEntity<A> {
    pub fn new(actor: A, data: GroundClampingData) -> Self {
        Self { actor, data }
    }
}

/// Registry lookup used to resolve deferred clamp requests.
pub trait ClampTargets {
    /// Borrow the actor and its clamping data, or `None` if the actor is gone.
    fn clamp_target(
        &mut self,
        id: ActorId,
    ) -> Option<(&mut dyn ClampableActor, &mut GroundClampingData)>;
}

impl<A: ClampableActor> ClampTargets for [ClampEntity<A>] {
    fn clamp_target(
        &mut self,
        id: ActorId,
    ) -> Option<(&mut dyn ClampableActor, &mut GroundClampingData)> {
        self.iter_mut()
            .find(|entity| entity.actor.id() == id)
            .map(|ClampEntity { actor, data }| (actor as &mut dyn ClampableActor, data))
    }
}

impl<A: ClampableActor> ClampTargets for Vec<ClampEntity<A>> {
    fn clamp_target(
        &mut self,
        id: ActorId,
    ) -> Option<(&mut dyn ClampableActor, &mut GroundClampingData)> {
        self.as_mut_slice().clamp_target(id)
    }
}

impl<A: ClampableActor> ClampTargets for HashMap<ActorId, ClampEntity<A>> {
    fn clamp_target(
        &mut self,
        id: ActorId,
    ) -> Option<(&mut dyn ClampableActor, &mut GroundClampingData)> {
        self.get_mut(&id)
            .map(|ClampEntity { actor, data }| (actor as &mut dyn ClampableActor, data))
    }
}

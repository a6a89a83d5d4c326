//! Collaborator traits: the physics engine and the response channel.
//!
//! The engine is split in two. [`EntityLookup`] is the read-only name
//! lookup, safe to call from any thread and shared behind an `Arc`.
//! [`PhysicsWorld`] carries every mutating primitive and is owned by the
//! step thread alone; the controller only ever borrows it for the
//! duration of a step-boundary call.

use crate::error::{EngineError, PublishError};
use crate::id::{EntityHandle, SimTime};
use crate::request::{EntityDescription, EntityInfo, Response};

/// Read-only name lookup into the live world.
pub trait EntityLookup: Send + Sync {
    /// Resolve a live entity by name.
    ///
    /// Returns `None` if no live entity has that name.
    fn lookup_by_name(&self, name: &str) -> Option<EntityHandle>;
}

/// Notification produced by the engine as a consequence of a step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// An entity requested through [`PhysicsWorld::insert`] now exists.
    Created(EntityInfo),
}

/// Mutating engine primitives, invoked only from the step thread.
///
/// Implementations are `Send` so a host can move the world onto its
/// step thread, but never need to be `Sync`.
pub trait PhysicsWorld: Send {
    /// Queue an entity for creation.
    ///
    /// Creation is asynchronous: the entity becomes visible, and a
    /// [`WorldEvent::Created`] is reported by
    /// [`drain_events`](PhysicsWorld::drain_events), at some later point.
    fn insert(&mut self, description: &EntityDescription) -> Result<(), EngineError>;

    /// Remove a live entity.
    fn remove(&mut self, handle: EntityHandle) -> Result<(), EngineError>;

    /// Advance the simulation by one step.
    fn step(&mut self) -> Result<(), EngineError>;

    /// Take all notifications produced since the last call.
    fn drain_events(&mut self) -> Vec<WorldEvent>;

    /// Current simulation time.
    fn sim_time(&self) -> SimTime;

    /// Number of live entities.
    fn entity_count(&self) -> usize;
}

/// Outbound half of the request channel.
pub trait ResponseSink: Send + Sync {
    /// Publish a response. Best effort: a failure means the response is
    /// lost and the requester's own timeout takes over.
    fn publish(&self, response: Response) -> Result<(), PublishError>;
}

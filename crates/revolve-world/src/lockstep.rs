//! Lockstep (synchronous) host.
//!
//! [`LockstepHost`] runs ticks in the caller's thread, one per
//! [`step()`](LockstepHost::step) call. Requests may still arrive from
//! other threads through the shared [`LifecycleController`]; only the
//! world stays with the host.
//!
//! # Ownership model
//!
//! The host owns the world by value and lends it to the controller for
//! the duration of each tick. No background threads are involved, so
//! dropping the host simply drops the world.

use std::sync::Arc;

use revolve_core::{PhysicsWorld, TickId};

use crate::controller::LifecycleController;
use crate::tick::{execute_tick, StepReport};

/// Single-threaded host that ticks the world on demand.
///
/// # Example
///
/// ```ignore
/// let mut host = LockstepHost::new(world, Arc::clone(&controller));
/// controller.dispatch(request)?;
/// for _ in 0..10 {
///     let report = host.step();
/// }
/// ```
pub struct LockstepHost<W: PhysicsWorld> {
    world: W,
    controller: Arc<LifecycleController>,
    tick: TickId,
}

impl<W: PhysicsWorld> LockstepHost<W> {
    /// Wrap a world and the controller that manages its entities.
    ///
    /// The controller must have been built with this world's lookup.
    pub fn new(world: W, controller: Arc<LifecycleController>) -> Self {
        Self {
            world,
            controller,
            tick: TickId::default(),
        }
    }

    /// Execute one tick.
    pub fn step(&mut self) -> StepReport {
        self.tick = TickId(self.tick.0 + 1);
        execute_tick(&self.controller, &mut self.world, self.tick)
    }

    /// Execute `n` ticks and return their reports.
    pub fn run(&mut self, n: usize) -> Vec<StepReport> {
        (0..n).map(|_| self.step()).collect()
    }

    /// The shared controller.
    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    /// Read access to the world.
    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable access to the world between ticks.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    /// Last executed tick (0 before the first step).
    pub fn current_tick(&self) -> TickId {
        self.tick
    }

    /// Close the controller, answer everything still pending with
    /// `ShuttingDown`, and return the world.
    pub fn shutdown(self) -> W {
        self.controller.close();
        self.controller.abort_pending();
        self.world
    }
}

impl<W: PhysicsWorld> std::fmt::Debug for LockstepHost<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockstepHost")
            .field("current_tick", &self.tick)
            .field("entity_count", &self.world.entity_count())
            .field("controller", &self.controller)
            .finish()
    }
}

//! The per-tick call sequence shared by both hosts.
//!
//! Every tick runs the same fixed order on the thread that owns the
//! world:
//!
//! 1. [`on_begin_step`](LifecycleController::on_begin_step): lifespan
//!    expiry, then the try-lock removal drain.
//! 2. [`PhysicsWorld::step`].
//! 3. [`on_end_step`](LifecycleController::on_end_step): at most one
//!    insertion.
//! 4. [`on_entity_created`](LifecycleController::on_entity_created) for
//!    every creation event the step produced.

use tracing::{trace, warn};

use revolve_core::{EngineError, PhysicsWorld, SimTime, TickId, WorldEvent};

use crate::controller::LifecycleController;

/// What happened during one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// The tick just executed.
    pub tick: TickId,
    /// Simulation time after the step.
    pub sim_time: SimTime,
    /// Removals applied at the start of the tick.
    pub removed: usize,
    /// Lifespan expiries queued at the start of the tick.
    pub expired: usize,
    /// Whether the removal drain was skipped because the queue was busy.
    pub skipped_removal_drain: bool,
    /// The entity handed to the engine at the end of the tick, if any.
    pub inserted: Option<String>,
    /// Pending inserts closed by creation events.
    pub closed: usize,
    /// The world's step failure, if it failed. The tick still completes.
    pub step_error: Option<EngineError>,
}

/// Run one tick against `world`.
pub(crate) fn execute_tick(
    controller: &LifecycleController,
    world: &mut dyn PhysicsWorld,
    tick: TickId,
) -> StepReport {
    let begin = controller.on_begin_step(world);

    let step_error = world.step().err();
    if let Some(e) = &step_error {
        warn!(%tick, error = %e, "world step failed");
    }

    let inserted = controller.on_end_step(world);

    let now = world.sim_time();
    let mut closed = 0;
    for event in world.drain_events() {
        match event {
            WorldEvent::Created(info) => {
                if controller.on_entity_created(info, now).is_ok() {
                    closed += 1;
                }
            }
        }
    }

    let report = StepReport {
        tick,
        sim_time: now,
        removed: begin.removed,
        expired: begin.expired,
        skipped_removal_drain: begin.skipped,
        inserted,
        closed,
        step_error,
    };
    trace!(?report, "tick complete");
    report
}

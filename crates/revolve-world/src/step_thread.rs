//! Step loop for [`RealtimeHost`](crate::RealtimeHost).
//!
//! The step thread owns the world exclusively (moved in via
//! `thread::spawn`) and hands it back through its `JoinHandle` when the
//! loop ends. Requests never reach this thread directly; they land in the
//! controller's pending state and are picked up at the next tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use revolve_core::{PhysicsWorld, TickId};

use crate::controller::LifecycleController;
use crate::tick::execute_tick;

/// State held by the step thread's main loop.
pub(crate) struct StepLoop<W> {
    world: W,
    controller: Arc<LifecycleController>,
    shutdown_flag: Arc<AtomicBool>,
    step_stopped: Arc<AtomicBool>,
    current_tick: Arc<AtomicU64>,
    step_budget: Duration,
}

impl<W: PhysicsWorld> StepLoop<W> {
    pub fn new(
        world: W,
        controller: Arc<LifecycleController>,
        shutdown_flag: Arc<AtomicBool>,
        step_stopped: Arc<AtomicBool>,
        current_tick: Arc<AtomicU64>,
        step_rate_hz: f64,
    ) -> Self {
        Self {
            world,
            controller,
            shutdown_flag,
            step_stopped,
            current_tick,
            step_budget: Duration::from_secs_f64(1.0 / step_rate_hz),
        }
    }

    /// Main step loop. Runs until `shutdown_flag` is set, then returns
    /// the world.
    pub fn run(mut self) -> W {
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                break;
            }
            let tick_start = Instant::now();

            let tick = TickId(self.current_tick.load(Ordering::Relaxed) + 1);
            execute_tick(&self.controller, &mut self.world, tick);
            self.current_tick.store(tick.0, Ordering::Release);

            self.sleep_until(tick_start + self.step_budget);
        }

        debug!(
            ticks = self.current_tick.load(Ordering::Relaxed),
            "step loop stopped"
        );
        self.step_stopped.store(true, Ordering::Release);
        self.world
    }

    /// Park until `deadline`. `unpark()` from the host cuts the sleep
    /// short once the shutdown flag is set.
    fn sleep_until(&self, deadline: Instant) {
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            let Some(remaining) = deadline.checked_duration_since(now) else {
                return;
            };
            if remaining.is_zero() {
                return;
            }
            thread::park_timeout(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use revolve_test_utils::{insert_request, MockWorld, RecordingSink};

    #[test]
    fn loop_ticks_until_shutdown_and_returns_world() {
        let world = MockWorld::new(Duration::from_millis(1));
        let sink = Arc::new(RecordingSink::new());
        let controller = Arc::new(
            LifecycleController::new(&ControllerConfig::default(), world.lookup(), sink.clone())
                .unwrap(),
        );
        controller.dispatch(insert_request(1, "a")).unwrap();

        let shutdown = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let tick = Arc::new(AtomicU64::new(0));
        let state = StepLoop::new(
            world,
            Arc::clone(&controller),
            Arc::clone(&shutdown),
            Arc::clone(&stopped),
            Arc::clone(&tick),
            1000.0,
        );
        let handle = thread::spawn(move || state.run());

        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        shutdown.store(true, Ordering::Release);
        handle.thread().unpark();
        let world = handle.join().unwrap();

        assert!(stopped.load(Ordering::Acquire));
        assert!(tick.load(Ordering::Acquire) >= 2);
        assert!(world.contains("a"));
        assert_eq!(sink.len(), 1);
    }
}

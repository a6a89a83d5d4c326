//! Threaded host: a step thread ticking at a fixed rate plus a request
//! pump feeding the controller.
//!
//! # Architecture
//!
//! ```text
//! Requester(s)              Pump Thread               Step Thread
//!     |                          |                          |
//!     |--submit()--------------->| inbound.recv()           |
//!     |  [bounded request chan]  | controller.dispatch()    |
//!     |                          |   (pending state, lock)  |
//!     |                          |                          | on_begin_step
//!     |                          |                          | world.step()
//!     |                          |                          | on_end_step
//!     |                          |                          | on_entity_created
//!     |<--responses()-------------------------------------- | publish
//!     |  [bounded response chan]                            | park(budget - elapsed)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

use revolve_core::{EntityLookup, PhysicsWorld, Response, TickId};

use crate::config::{ConfigError, HostConfig};
use crate::controller::LifecycleController;
use crate::metrics::ControllerMetrics;
use crate::step_thread::StepLoop;
use crate::transport::{request_channel, response_channel, RequestPump, RequestSender};

// ── ShutdownReport ─────────────────────────────────────────────────

/// Report from [`RealtimeHost::shutdown`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent in the shutdown sequence.
    pub total_ms: u64,
    /// Whether the step thread was joined and the world recovered.
    pub step_joined: bool,
    /// Whether the pump thread was joined.
    pub pump_joined: bool,
    /// Ticks executed over the host's lifetime.
    pub ticks: u64,
    /// Inbound messages the pump handled over its lifetime.
    pub messages_handled: u64,
    /// Pending requests answered with `ShuttingDown`.
    pub aborted: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Stopped,
}

// ── RealtimeHost ───────────────────────────────────────────────────

/// Host that runs the world on a background step thread.
///
/// Requests go in through [`sender()`](Self::sender); responses come out
/// of [`responses()`](Self::responses). Dropping the host shuts it down.
pub struct RealtimeHost<W: PhysicsWorld + 'static> {
    controller: Arc<LifecycleController>,
    sender: RequestSender,
    responses: Receiver<Response>,
    shutdown_flag: Arc<AtomicBool>,
    step_stopped: Arc<AtomicBool>,
    current_tick: Arc<AtomicU64>,
    step_thread: Option<JoinHandle<W>>,
    pump_stop: Option<Sender<()>>,
    pump_thread: Option<JoinHandle<u64>>,
    recovered_world: Option<W>,
    state: ShutdownState,
}

impl<W: PhysicsWorld + 'static> RealtimeHost<W> {
    /// Build the controller and channels, then spawn both threads.
    ///
    /// `lookup` must be the read-only name index of `world`.
    pub fn new(
        world: W,
        lookup: Arc<dyn EntityLookup>,
        config: HostConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (sink, responses) = response_channel(config.response_channel_capacity);
        let controller = Arc::new(LifecycleController::new(
            &config.controller,
            lookup,
            Arc::new(sink),
        )?);
        let (sender, inbound) = request_channel(config.request_channel_capacity);

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let step_stopped = Arc::new(AtomicBool::new(false));
        let current_tick = Arc::new(AtomicU64::new(0));

        let step_state = StepLoop::new(
            world,
            Arc::clone(&controller),
            Arc::clone(&shutdown_flag),
            Arc::clone(&step_stopped),
            Arc::clone(&current_tick),
            config.step_rate_hz,
        );
        let step_thread = thread::Builder::new()
            .name("revolve-step".into())
            .spawn(move || step_state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        let (pump_stop, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let pump = RequestPump::new(Arc::clone(&controller), inbound, stop_rx);
        let pump_thread = match thread::Builder::new()
            .name("revolve-pump".into())
            .spawn(move || pump.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                shutdown_flag.store(true, Ordering::Release);
                step_thread.thread().unpark();
                let _ = step_thread.join();
                return Err(ConfigError::ThreadSpawnFailed {
                    reason: e.to_string(),
                });
            }
        };

        info!(step_rate_hz = config.step_rate_hz, "realtime host started");
        Ok(Self {
            controller,
            sender,
            responses,
            shutdown_flag,
            step_stopped,
            current_tick,
            step_thread: Some(step_thread),
            pump_stop: Some(pump_stop),
            pump_thread: Some(pump_thread),
            recovered_world: None,
            state: ShutdownState::Running,
        })
    }

    /// A new handle for submitting requests and health reports.
    pub fn sender(&self) -> RequestSender {
        self.sender.clone()
    }

    /// The response stream.
    pub fn responses(&self) -> &Receiver<Response> {
        &self.responses
    }

    /// The shared controller.
    pub fn controller(&self) -> &Arc<LifecycleController> {
        &self.controller
    }

    /// Snapshot of the controller's counters.
    pub fn metrics(&self) -> ControllerMetrics {
        self.controller.metrics()
    }

    /// Last completed tick.
    pub fn current_tick(&self) -> TickId {
        TickId(self.current_tick.load(Ordering::Acquire))
    }

    /// Stop both threads and answer everything still pending.
    ///
    /// 1. Stop the step thread (unparked so it wakes from its budget
    ///    sleep) and recover the world.
    /// 2. Close the controller, so later requests are rejected.
    /// 3. Stop the pump; it answers whatever is still buffered.
    /// 4. Answer every pending request with `ShuttingDown`.
    ///
    /// Idempotent: later calls return an empty report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ShutdownState::Stopped {
            return ShutdownReport {
                step_joined: true,
                pump_joined: true,
                ..ShutdownReport::default()
            };
        }
        let start = Instant::now();
        self.state = ShutdownState::Stopped;

        self.shutdown_flag.store(true, Ordering::Release);
        let step_joined = match self.step_thread.take() {
            Some(handle) => {
                handle.thread().unpark();
                match handle.join() {
                    Ok(world) => {
                        self.recovered_world = Some(world);
                        true
                    }
                    Err(_) => {
                        warn!("step thread panicked");
                        false
                    }
                }
            }
            None => true,
        };
        debug_assert!(!step_joined || self.step_stopped.load(Ordering::Acquire));

        self.controller.close();

        self.pump_stop.take();
        let (pump_joined, messages_handled) = match self.pump_thread.take() {
            Some(handle) => match handle.join() {
                Ok(n) => (true, n),
                Err(_) => {
                    warn!("request pump panicked");
                    (false, 0)
                }
            },
            None => (true, 0),
        };

        let aborted = self.controller.abort_pending();

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            step_joined,
            pump_joined,
            ticks: self.current_tick.load(Ordering::Acquire),
            messages_handled,
            aborted,
        };
        info!(?report, "realtime host stopped");
        report
    }

    /// Shut down and return the world.
    ///
    /// `None` if the step thread panicked.
    pub fn into_world(mut self) -> Option<W> {
        self.shutdown();
        self.recovered_world.take()
    }

    /// Block until `n` more ticks have completed, or `timeout` elapses.
    /// Returns whether the ticks completed.
    pub fn wait_ticks(&self, n: u64, timeout: Duration) -> bool {
        let target = self.current_tick.load(Ordering::Acquire) + n;
        let deadline = Instant::now() + timeout;
        while self.current_tick.load(Ordering::Acquire) < target {
            if self.state == ShutdownState::Stopped || Instant::now() > deadline {
                return false;
            }
            thread::sleep(Duration::from_micros(200));
        }
        true
    }
}

impl<W: PhysicsWorld + 'static> Drop for RealtimeHost<W> {
    fn drop(&mut self) {
        if self.state != ShutdownState::Stopped {
            self.shutdown();
        }
    }
}

impl<W: PhysicsWorld + 'static> std::fmt::Debug for RealtimeHost<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHost")
            .field("current_tick", &self.current_tick())
            .field("state", &self.state)
            .field("controller", &self.controller)
            .finish()
    }
}

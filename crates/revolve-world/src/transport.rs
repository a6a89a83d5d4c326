//! Crossbeam-channel message layer between requesters and the controller.
//!
//! Inbound traffic ([`Inbound`]) flows through a bounded channel into a
//! [`RequestPump`], which is the only code that hands transport messages
//! to the [`LifecycleController`]. Responses flow back through a bounded
//! channel behind [`ChannelSink`].
//!
//! ```text
//! RequestSender --[bounded]--> RequestPump --dispatch--> LifecycleController
//!                                                             |
//! Receiver<Response> <--[bounded]-- ChannelSink <--publish----+
//! ```

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, trace};

use revolve_core::{LifecycleError, PublishError, Request, Response, ResponseSink};

use crate::controller::LifecycleController;

/// A message arriving on the request side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// An insert or delete request.
    Request(Request),
    /// A status report from a health monitor.
    HealthReport(HealthReport),
}

/// Status report for one entity. Only reports with `dead == true` have
/// any effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthReport {
    /// The entity reported on.
    pub name: String,
    /// Whether the monitor declares the entity dead.
    pub dead: bool,
}

// ── responses ──────────────────────────────────────────────────────

/// [`ResponseSink`] backed by a bounded crossbeam channel.
///
/// Never blocks: a full channel is reported as [`PublishError::Full`].
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<Response>,
}

impl ChannelSink {
    /// Wrap an existing sender.
    pub fn new(tx: Sender<Response>) -> Self {
        Self { tx }
    }
}

impl ResponseSink for ChannelSink {
    fn publish(&self, response: Response) -> Result<(), PublishError> {
        self.tx.try_send(response).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::Full,
            TrySendError::Disconnected(_) => PublishError::Disconnected,
        })
    }
}

/// Create a bounded response channel.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn response_channel(capacity: usize) -> (ChannelSink, Receiver<Response>) {
    assert!(capacity > 0, "response channel capacity must be at least 1");
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (ChannelSink::new(tx), rx)
}

// ── requests ───────────────────────────────────────────────────────

/// Error submitting a message to the request channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The request channel is full (back-pressure).
    ChannelFull,
    /// The request pump has shut down.
    Shutdown,
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChannelFull => write!(f, "request channel full"),
            Self::Shutdown => write!(f, "request pump has shut down"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// Cloneable sending half of the request channel.
#[derive(Clone, Debug)]
pub struct RequestSender {
    tx: Sender<Inbound>,
}

impl RequestSender {
    /// Submit a request without blocking.
    pub fn submit(&self, request: Request) -> Result<(), SubmitError> {
        self.send(Inbound::Request(request))
    }

    /// Forward a health monitor's status report without blocking.
    pub fn report_health(&self, name: impl Into<String>, dead: bool) -> Result<(), SubmitError> {
        self.send(Inbound::HealthReport(HealthReport {
            name: name.into(),
            dead,
        }))
    }

    fn send(&self, msg: Inbound) -> Result<(), SubmitError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::ChannelFull,
            TrySendError::Disconnected(_) => SubmitError::Shutdown,
        })
    }
}

/// Create a bounded request channel.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn request_channel(capacity: usize) -> (RequestSender, Receiver<Inbound>) {
    assert!(capacity > 0, "request channel capacity must be at least 1");
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (RequestSender { tx }, rx)
}

// ── RequestPump ────────────────────────────────────────────────────

/// Request thread body: receives [`Inbound`] messages and dispatches
/// them to the controller.
pub struct RequestPump {
    controller: Arc<LifecycleController>,
    inbound: Receiver<Inbound>,
    stop: Receiver<()>,
}

impl RequestPump {
    /// Create a pump. It stops when every sender of `stop` is dropped, or
    /// when every [`RequestSender`] is dropped.
    pub fn new(
        controller: Arc<LifecycleController>,
        inbound: Receiver<Inbound>,
        stop: Receiver<()>,
    ) -> Self {
        Self {
            controller,
            inbound,
            stop,
        }
    }

    /// Hand one message to the controller.
    ///
    /// Health reports that do not declare death are ignored.
    pub fn handle(&self, msg: Inbound) -> Result<(), LifecycleError> {
        match msg {
            Inbound::Request(request) => self.controller.dispatch(request),
            Inbound::HealthReport(report) if report.dead => {
                self.controller.on_external_death_report(&report.name)
            }
            Inbound::HealthReport(report) => {
                trace!(name = %report.name, "health report ignored: alive");
                Ok(())
            }
        }
    }

    /// Pump messages until stopped. Messages still buffered when the stop
    /// signal arrives are handled before returning, so each of them gets
    /// its response. Returns the number of messages handled.
    pub fn run(self) -> u64 {
        let mut handled = 0u64;
        loop {
            crossbeam_channel::select! {
                recv(self.inbound) -> msg => match msg {
                    Ok(msg) => {
                        handled += 1;
                        self.handle_logged(msg);
                    }
                    Err(_) => break,
                },
                recv(self.stop) -> _ => {
                    while let Ok(msg) = self.inbound.try_recv() {
                        handled += 1;
                        self.handle_logged(msg);
                    }
                    break;
                }
            }
        }
        debug!(handled, "request pump stopped");
        handled
    }

    fn handle_logged(&self, msg: Inbound) {
        // Rejections are already answered and logged by the controller.
        if let Err(e) = self.handle(msg) {
            trace!(error = %e, "request not accepted");
        }
    }
}

//! Step-aligned entity lifecycle management for physics simulations.
//!
//! Provides the [`LifecycleController`] that reconciles insert and delete
//! requests arriving on arbitrary threads with a physics engine's
//! fixed-step loop, plus two hosts that drive it: [`LockstepHost`]
//! (ticks in the caller's thread) and [`RealtimeHost`] (a background step
//! thread and request pump wired over crossbeam channels).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod lifespan;
pub mod lockstep;
pub mod metrics;
pub mod pending;
pub mod realtime;
pub(crate) mod step_thread;
pub mod tick;
pub mod transport;

pub use config::{ConfigError, ControllerConfig, HostConfig};
pub use controller::{BeginStepReport, LifecycleController};
pub use lifespan::LifespanTracker;
pub use lockstep::LockstepHost;
pub use metrics::ControllerMetrics;
pub use pending::{InsertState, ReplyTo};
pub use realtime::{RealtimeHost, ShutdownReport};
pub use tick::StepReport;
pub use transport::{
    request_channel, response_channel, ChannelSink, HealthReport, Inbound, RequestPump,
    RequestSender, SubmitError,
};

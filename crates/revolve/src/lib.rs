//! Revolve: step-aligned entity lifecycle management for physics simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Revolve sub-crates. For most users, adding `revolve` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use revolve::prelude::*;
//! use revolve_test_utils::{MockWorld, RecordingSink};
//!
//! let world = MockWorld::new(Duration::from_millis(10));
//! let sink = Arc::new(RecordingSink::new());
//! let controller = Arc::new(
//!     LifecycleController::new(&ControllerConfig::default(), world.lookup(), sink.clone())
//!         .unwrap(),
//! );
//! let mut host = LockstepHost::new(world, Arc::clone(&controller));
//!
//! controller
//!     .dispatch(Request::insert(
//!         CorrelationId(1),
//!         EntityDescription::new("robot", "<model name='robot'/>"),
//!         None,
//!     ))
//!     .unwrap();
//!
//! // One tick hands the insert to the engine, the next closes it.
//! host.step();
//! host.step();
//!
//! let responses = sink.responses();
//! assert_eq!(responses.len(), 1);
//! assert_eq!(responses[0].outcome, Outcome::Success);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `revolve-core` | IDs, requests, responses, errors, collaborator traits |
//! | [`world`] | `revolve-world` | Controller, pending state, transport, hosts |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`revolve-core`).
///
/// Contains requests and responses, error types, and the collaborator
/// traits ([`types::EntityLookup`], [`types::PhysicsWorld`],
/// [`types::ResponseSink`]) an engine or transport adapter implements.
pub use revolve_core as types;

/// The lifecycle controller and its hosts (`revolve-world`).
///
/// [`world::LockstepHost`] for stepping in the caller's thread,
/// [`world::RealtimeHost`] for a background step thread fed over
/// channels.
pub use revolve_world as world;

/// Common imports for typical Revolve usage.
///
/// ```rust
/// use revolve::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use revolve_core::{
        CorrelationId, EntityDescription, EntityHandle, EntityInfo, EntityLookup, InsertedEntity,
        Outcome, PhysicsWorld, Request, RequestKind, Response, ResponseSink, SessionId, SimTime,
        TickId, WorldEvent,
    };

    // Errors
    pub use revolve_core::{EngineError, LifecycleError, PublishError, RejectReason};

    // Controller and hosts
    pub use revolve_world::{
        ConfigError, ControllerConfig, ControllerMetrics, HostConfig, InsertState,
        LifecycleController, LockstepHost, RealtimeHost, RequestSender, StepReport, SubmitError,
    };
}

//! Core types and traits for the Revolve entity lifecycle controller.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the controller, its hosts, and the engine
//! and transport adapters: identifiers, requests and responses, error
//! types, and the collaborator traits the controller is written against.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod request;
pub mod traits;

pub use error::{EngineError, LifecycleError, PublishError, RejectReason};
pub use id::{CorrelationId, EntityHandle, SessionId, SimTime, TickId};
pub use request::{
    EntityDescription, EntityInfo, InsertedEntity, Outcome, Request, RequestKind, RequestPayload,
    Response,
};
pub use traits::{EntityLookup, PhysicsWorld, ResponseSink, WorldEvent};

//! Request, response, and payload types exchanged with the transport layer.

use std::time::Duration;

use crate::error::RejectReason;
use crate::id::{CorrelationId, EntityHandle, SessionId, SimTime};

/// An entity to insert: its name plus the engine-defined serialized
/// description.
///
/// The controller never parses `document`; it only keys pending work by
/// `name` and hands the whole description to the engine at step time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDescription {
    /// Unique entity name inside the world.
    pub name: String,
    /// Serialized description in whatever format the engine consumes.
    pub document: String,
}

impl EntityDescription {
    /// Build a description from a name and serialized document.
    pub fn new(name: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: document.into(),
        }
    }
}

/// A lifecycle request delivered by the transport layer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use revolve_core::{CorrelationId, EntityDescription, Request, RequestKind};
///
/// let req = Request::insert(
///     CorrelationId(7),
///     EntityDescription::new("robot_a", "<model name='robot_a'/>"),
///     Some(Duration::from_secs(120)),
/// );
///
/// assert_eq!(req.kind(), RequestKind::Insert);
/// assert_eq!(req.name(), "robot_a");
/// assert!(req.origin.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Caller-chosen correlation ID, echoed on the response.
    pub correlation_id: CorrelationId,
    /// Optional originator address, echoed on the response.
    pub origin: Option<SessionId>,
    /// The operation requested.
    pub payload: RequestPayload,
}

/// All request payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPayload {
    /// Insert a new entity at the next end-of-step boundary.
    Insert {
        /// What to insert.
        description: EntityDescription,
        /// Simulation time the entity may live before it is removed
        /// automatically. `None` means no limit.
        lifespan: Option<Duration>,
    },
    /// Remove a live entity at the next begin-of-step boundary.
    Delete {
        /// The entity to remove.
        name: String,
    },
}

impl Request {
    /// Build an insert request with no originator token.
    pub fn insert(
        correlation_id: CorrelationId,
        description: EntityDescription,
        lifespan: Option<Duration>,
    ) -> Self {
        Self {
            correlation_id,
            origin: None,
            payload: RequestPayload::Insert {
                description,
                lifespan,
            },
        }
    }

    /// Build a delete request with no originator token.
    pub fn delete(correlation_id: CorrelationId, name: impl Into<String>) -> Self {
        Self {
            correlation_id,
            origin: None,
            payload: RequestPayload::Delete { name: name.into() },
        }
    }

    /// Attach an originator token.
    pub fn with_origin(mut self, origin: SessionId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// The request kind, used to label the response.
    pub fn kind(&self) -> RequestKind {
        match self.payload {
            RequestPayload::Insert { .. } => RequestKind::Insert,
            RequestPayload::Delete { .. } => RequestKind::Delete,
        }
    }

    /// The entity name this request concerns.
    pub fn name(&self) -> &str {
        match &self.payload {
            RequestPayload::Insert { description, .. } => &description.name,
            RequestPayload::Delete { name } => name,
        }
    }
}

/// Which kind of request a response answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// An insert request.
    Insert,
    /// A delete request.
    Delete,
}

/// Metadata the engine reports for a newly created entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityInfo {
    /// The entity name, matching [`EntityDescription::name`].
    pub name: String,
    /// Engine handle of the new entity.
    pub handle: EntityHandle,
    /// Engine-serialized model information, passed through untouched.
    pub data: Vec<u8>,
}

/// Success payload of an insert: engine metadata plus the simulation
/// time at which the insert was closed out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertedEntity {
    /// Engine metadata for the new entity.
    pub info: EntityInfo,
    /// Simulation time when the creation notification was processed.
    pub time: SimTime,
}

/// Whether a request succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The request was applied.
    Success,
    /// The request was rejected or failed.
    Error(RejectReason),
}

/// Response published for a request.
///
/// At most one response is ever published per accepted or rejected
/// request.
///
/// # Examples
///
/// ```
/// use revolve_core::{CorrelationId, Outcome, RejectReason, RequestKind, Response};
///
/// let resp = Response::error(
///     CorrelationId(42),
///     None,
///     RequestKind::Delete,
///     RejectReason::EntityNotFound,
/// );
///
/// assert!(!resp.is_success());
/// assert_eq!(resp.outcome, Outcome::Error(RejectReason::EntityNotFound));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// Correlation ID of the request being answered.
    pub correlation_id: CorrelationId,
    /// Originator token of the request being answered, if any.
    pub origin: Option<SessionId>,
    /// Kind of the request being answered.
    pub kind: RequestKind,
    /// Whether the request succeeded.
    pub outcome: Outcome,
    /// Present only on a successful insert.
    pub payload: Option<InsertedEntity>,
}

impl Response {
    /// A success response without payload.
    pub fn success(
        correlation_id: CorrelationId,
        origin: Option<SessionId>,
        kind: RequestKind,
    ) -> Self {
        Self {
            correlation_id,
            origin,
            kind,
            outcome: Outcome::Success,
            payload: None,
        }
    }

    /// A successful insert response carrying the engine metadata.
    pub fn inserted(
        correlation_id: CorrelationId,
        origin: Option<SessionId>,
        inserted: InsertedEntity,
    ) -> Self {
        Self {
            correlation_id,
            origin,
            kind: RequestKind::Insert,
            outcome: Outcome::Success,
            payload: Some(inserted),
        }
    }

    /// An error response.
    pub fn error(
        correlation_id: CorrelationId,
        origin: Option<SessionId>,
        kind: RequestKind,
        reason: RejectReason,
    ) -> Self {
        Self {
            correlation_id,
            origin,
            kind,
            outcome: Outcome::Error(reason),
            payload: None,
        }
    }

    /// Whether the outcome is [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

//! Error types for the lifecycle controller and its collaborators.
//!
//! Organized by boundary: the reason code carried on an error response,
//! the controller's own taxonomy, and the failures reported by the
//! engine and transport adapters.

use std::error::Error;
use std::fmt;

/// Reason code carried by an error [`Response`](crate::request::Response).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Insert requested for a name already pending or live.
    DuplicateEntity,
    /// Delete requested for a name with no live entity.
    EntityNotFound,
    /// The pending table or queue is at capacity.
    QueueFull,
    /// The engine refused the insertion or removal.
    EngineRejected,
    /// The controller is shutting down.
    ShuttingDown,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEntity => write!(f, "duplicate entity"),
            Self::EntityNotFound => write!(f, "entity not found"),
            Self::QueueFull => write!(f, "pending queue full"),
            Self::EngineRejected => write!(f, "engine rejected the operation"),
            Self::ShuttingDown => write!(f, "controller is shutting down"),
        }
    }
}

/// Errors detected by the lifecycle controller.
///
/// None of these is fatal. Request-path variants are returned to the
/// caller after the matching error response has already been published;
/// step-path variants are only logged and counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// Insert requested for a name already pending or live.
    DuplicateEntity {
        /// The contested name.
        name: String,
    },
    /// Delete requested for an unknown name.
    EntityNotFound {
        /// The unknown name.
        name: String,
    },
    /// The pending table or queue is at capacity.
    QueueFull {
        /// Configured capacity that was reached.
        capacity: usize,
    },
    /// The engine reported a creation the controller did not expect,
    /// or expected but had not yet performed.
    SpuriousNotification {
        /// The name in the notification.
        name: String,
    },
    /// A response could not be published; the request is considered lost.
    ChannelUnavailable(PublishError),
    /// The controller no longer accepts requests.
    ShuttingDown,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateEntity { name } => {
                write!(f, "entity '{name}' is already pending or live")
            }
            Self::EntityNotFound { name } => write!(f, "entity '{name}' not found"),
            Self::QueueFull { capacity } => {
                write!(f, "pending queue full (capacity {capacity})")
            }
            Self::SpuriousNotification { name } => {
                write!(f, "unexpected creation notification for '{name}'")
            }
            Self::ChannelUnavailable(e) => write!(f, "response channel unavailable: {e}"),
            Self::ShuttingDown => write!(f, "controller is shutting down"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ChannelUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PublishError> for LifecycleError {
    fn from(e: PublishError) -> Self {
        Self::ChannelUnavailable(e)
    }
}

/// Failure reported by a [`ResponseSink`](crate::traits::ResponseSink).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishError {
    /// The response channel is at capacity.
    Full,
    /// The receiving side of the channel is gone.
    Disconnected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "response channel full"),
            Self::Disconnected => write!(f, "response channel disconnected"),
        }
    }
}

impl Error for PublishError {}

/// Failure reported by a [`PhysicsWorld`](crate::traits::PhysicsWorld)
/// primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The handle does not refer to a live entity (already removed, or
    /// minted by a different engine).
    StaleHandle,
    /// An entity with this name already exists.
    NameTaken {
        /// The contested name.
        name: String,
    },
    /// The serialized description could not be used.
    InvalidDescription {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The engine failed to advance one step.
    StepFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleHandle => write!(f, "stale entity handle"),
            Self::NameTaken { name } => write!(f, "entity name '{name}' already taken"),
            Self::InvalidDescription { reason } => write!(f, "invalid description: {reason}"),
            Self::StepFailed { reason } => write!(f, "step failed: {reason}"),
        }
    }
}

impl Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_unavailable_exposes_source() {
        let err = LifecycleError::from(PublishError::Disconnected);
        assert_eq!(
            err.to_string(),
            "response channel unavailable: response channel disconnected"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn name_errors_quote_the_name() {
        let err = LifecycleError::DuplicateEntity {
            name: "robot_1".into(),
        };
        assert_eq!(err.to_string(), "entity 'robot_1' is already pending or live");
        assert!(err.source().is_none());
    }
}

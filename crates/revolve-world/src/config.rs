//! Controller and host configuration, validation, and error types.
//!
//! [`ControllerConfig`] sizes the pending table and queue owned by the
//! [`LifecycleController`](crate::LifecycleController). [`HostConfig`]
//! adds what a [`RealtimeHost`](crate::RealtimeHost) needs to run its own
//! step and request threads. Both are validated once at construction.

use std::error::Error;
use std::fmt;

// ── ControllerConfig ───────────────────────────────────────────────

/// Capacity limits for the controller's pending state.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Maximum entries in the pending insert table. Inserts beyond it
    /// are rejected with `QueueFull`. Default: 1024.
    pub max_pending_inserts: usize,
    /// Maximum entries in the pending remove queue. Delete requests
    /// beyond it are rejected with `QueueFull`; death reports are
    /// dropped. Default: 1024.
    pub max_pending_removals: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_pending_inserts: 1024,
            max_pending_removals: 1024,
        }
    }
}

impl ControllerConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pending_inserts == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "max_pending_inserts",
            });
        }
        if self.max_pending_removals == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "max_pending_removals",
            });
        }
        Ok(())
    }
}

// ── HostConfig ─────────────────────────────────────────────────────

/// Configuration for [`RealtimeHost`](crate::RealtimeHost).
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Controller capacity limits.
    pub controller: ControllerConfig,
    /// Target step rate of the step thread. Default: 100.0.
    pub step_rate_hz: f64,
    /// Capacity of the inbound request channel. Default: 256.
    pub request_channel_capacity: usize,
    /// Capacity of the outbound response channel. Default: 256.
    pub response_channel_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            step_rate_hz: 100.0,
            request_channel_capacity: 256,
            response_channel_capacity: 256,
        }
    }
}

impl HostConfig {
    /// Validate all structural invariants, including the nested
    /// controller configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.controller.validate()?;
        // The reciprocal must also be finite: a subnormal rate would
        // overflow Duration::from_secs_f64.
        let hz = self.step_rate_hz;
        if !hz.is_finite() || hz <= 0.0 || !(1.0 / hz).is_finite() {
            return Err(ConfigError::InvalidStepRate { value: hz });
        }
        if self.request_channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "request_channel_capacity",
            });
        }
        if self.response_channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "response_channel_capacity",
            });
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating configuration or starting a host.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// A capacity field is zero.
    ZeroCapacity {
        /// Name of the offending field.
        field: &'static str,
    },
    /// `step_rate_hz` is NaN, infinite, zero, or negative.
    InvalidStepRate {
        /// The invalid value.
        value: f64,
    },
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity { field } => write!(f, "{field} must be at least 1"),
            Self::InvalidStepRate { value } => {
                write!(f, "step_rate_hz must be finite and positive, got {value}")
            }
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {}

//! Strongly-typed identifiers and the [`SimTime`] timestamp.

use std::fmt;
use std::time::Duration;

/// Caller-chosen integer linking a request to its eventual response.
///
/// The controller never generates these; it threads them through to the
/// matching [`Response`](crate::request::Response) unchanged. Two
/// independent originators may pick the same value, so nothing in the
/// controller is keyed by correlation ID alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub i64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CorrelationId {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

/// Optional address token supplied by a request originator.
///
/// Echoed verbatim on the response so that originators sharing a
/// response topic can tell their replies apart even when their
/// correlation IDs collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Opaque reference to a live entity inside the physics engine.
///
/// Only an engine implementation mints handles (via
/// [`from_raw`](EntityHandle::from_raw)); the controller stores them and
/// passes them back to the engine without looking inside. Engines are
/// expected to validate a handle on use, so a handle to an entity that
/// has since been removed is rejected rather than trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Wrap an engine-defined raw token.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The engine-defined raw token.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

/// Monotonically increasing step counter.
///
/// Incremented by the host each time the simulation advances one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Simulation clock reading, measured from the start of the simulation.
///
/// This is engine time, not wall-clock time: it advances only when the
/// engine steps, and only the step thread reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Build a timestamp from a duration since simulation start.
    pub const fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    /// Build a timestamp from whole seconds and nanoseconds.
    pub const fn new(sec: u64, nsec: u32) -> Self {
        Self(Duration::new(sec, nsec))
    }

    /// Duration since simulation start.
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Whole seconds component.
    pub const fn sec(self) -> u64 {
        self.0.as_secs()
    }

    /// Sub-second nanoseconds component.
    pub const fn nsec(self) -> u32 {
        self.0.subsec_nanos()
    }

    /// Add a duration, saturating at the maximum representable time.
    pub fn saturating_add(self, d: Duration) -> Self {
        Self(self.0.saturating_add(d))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.sec(), self.nsec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_time_display_pads_nanoseconds() {
        assert_eq!(SimTime::new(3, 5).to_string(), "3.000000005s");
    }

    #[test]
    fn sim_time_saturating_add_caps() {
        let t = SimTime::from_duration(Duration::MAX);
        assert_eq!(t.saturating_add(Duration::from_secs(1)), t);
    }

    #[test]
    fn sim_time_orders_by_duration() {
        assert!(SimTime::new(1, 0) < SimTime::new(1, 1));
        assert!(SimTime::ZERO < SimTime::new(0, 1));
    }

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(
            EntityHandle::from_raw(0x1_0000_0002).to_string(),
            "#0000000100000002"
        );
    }
}

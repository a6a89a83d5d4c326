//! Death sentences for entities inserted with a lifespan.
//!
//! Sentences are recorded when an insert is closed out, using the
//! simulation time of the step thread, and read back at the start of
//! every step. A sentence is only dropped once its removal has been
//! applied or its entity is gone. Nothing here is touched from a request thread.

use std::collections::HashMap;
use std::time::Duration;

use revolve_core::id::SimTime;

/// Simulation-time deadlines keyed by entity name.
#[derive(Debug, Default)]
pub struct LifespanTracker {
    deadlines: HashMap<String, SimTime>,
}

impl LifespanTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sentence `name` to removal at `born + lifespan`. Replaces any
    /// earlier sentence for the same name.
    pub fn sentence(&mut self, name: &str, born: SimTime, lifespan: Duration) {
        self.deadlines
            .insert(name.to_string(), born.saturating_add(lifespan));
    }

    /// Drop the sentence for `name`, if any.
    pub fn pardon(&mut self, name: &str) -> bool {
        self.deadlines.remove(name).is_some()
    }

    /// Every name whose deadline is at or before `now`, sorted by deadline
    /// then name. Sentences stay in place until pardoned.
    pub fn expired(&self, now: SimTime) -> Vec<String> {
        let mut expired: Vec<(SimTime, &String)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(name, deadline)| (*deadline, name))
            .collect();
        expired.sort_unstable();
        expired.into_iter().map(|(_, name)| name.clone()).collect()
    }

    /// Drop every sentence.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Deadline for `name`, if sentenced.
    pub fn deadline(&self, name: &str) -> Option<SimTime> {
        self.deadlines.get(name).copied()
    }

    /// Number of outstanding sentences.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether no sentences are outstanding.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> SimTime {
        SimTime::new(s, 0)
    }

    #[test]
    fn deadline_is_birth_plus_lifespan() {
        let mut t = LifespanTracker::new();
        t.sentence("a", secs(10), Duration::from_secs(5));
        assert_eq!(t.deadline("a"), Some(secs(15)));
    }

    #[test]
    fn expiry_is_inclusive() {
        let mut t = LifespanTracker::new();
        t.sentence("a", secs(0), Duration::from_secs(5));
        assert!(t.expired(SimTime::new(4, 999_999_999)).is_empty());
        assert_eq!(t.expired(secs(5)), vec!["a".to_string()]);
        // Reading does not consume the sentence.
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn expired_sorted_by_deadline() {
        let mut t = LifespanTracker::new();
        t.sentence("late", secs(0), Duration::from_secs(3));
        t.sentence("early", secs(0), Duration::from_secs(1));
        t.sentence("alive", secs(0), Duration::from_secs(60));
        assert_eq!(
            t.expired(secs(10)),
            vec!["early".to_string(), "late".to_string()]
        );
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn pardon_cancels_sentence() {
        let mut t = LifespanTracker::new();
        t.sentence("a", secs(0), Duration::from_secs(1));
        assert!(t.pardon("a"));
        assert!(!t.pardon("a"));
        assert!(t.expired(secs(100)).is_empty());
    }
}

//! Bounded pending state for accepted-but-not-yet-applied lifecycle work.
//!
//! [`PendingInsertTable`] tracks requested inserts keyed by entity name.
//! [`PendingRemoveQueue`] buffers removals in arrival order. Neither type
//! synchronizes; the controller wraps each in its own lock and never
//! holds one across an engine call.
//!
//! # Insert entry lifecycle
//!
//! ```text
//! absent --accept--> Waiting --claim_next--> Inserted --close--> absent
//! ```
//!
//! An entry only ever moves forward. A name with a live entry cannot be
//! accepted again until the entry is closed or discarded.

use std::collections::VecDeque;
use std::time::Duration;

use indexmap::IndexMap;
use smallvec::SmallVec;

use revolve_core::id::{CorrelationId, EntityHandle, SessionId};
use revolve_core::request::EntityDescription;

/// Where a response goes: the correlation ID and originator token of
/// the request that asked for the work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyTo {
    /// Correlation ID of the originating request.
    pub correlation_id: CorrelationId,
    /// Originator token of the originating request.
    pub origin: Option<SessionId>,
}

// ── PendingInsertTable ─────────────────────────────────────────────

/// Observable state of a pending insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InsertState {
    /// Accepted, not yet handed to the engine.
    Waiting,
    /// Handed to the engine; waiting for its creation notification.
    Inserted,
}

/// A pending insert.
#[derive(Clone, Debug)]
pub struct PendingInsert {
    /// Where the response goes.
    pub reply: ReplyTo,
    /// What to insert.
    pub description: EntityDescription,
    /// Lifespan to enforce once the entity exists.
    pub lifespan: Option<Duration>,
    completed: bool,
}

impl PendingInsert {
    /// A fresh entry in the [`InsertState::Waiting`] state.
    pub fn new(reply: ReplyTo, description: EntityDescription, lifespan: Option<Duration>) -> Self {
        Self {
            reply,
            description,
            lifespan,
            completed: false,
        }
    }

    /// Current state of the entry.
    pub fn state(&self) -> InsertState {
        if self.completed {
            InsertState::Inserted
        } else {
            InsertState::Waiting
        }
    }
}

/// Why [`PendingInsertTable::accept`] refused an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptError {
    /// The name already has an entry.
    Duplicate,
    /// The table is at capacity.
    Full,
}

/// Result of [`PendingInsertTable::close`].
#[derive(Debug)]
pub enum CloseOutcome {
    /// The entry was inserted and is now removed from the table.
    Closed(PendingInsert),
    /// The entry exists but has not been handed to the engine yet. It is
    /// left untouched.
    NotInserted,
    /// No entry for this name.
    Absent,
}

/// Pending inserts keyed by entity name.
///
/// Iteration follows acceptance order, so [`claim_next`](Self::claim_next)
/// hands out the oldest waiting entry first.
pub struct PendingInsertTable {
    entries: IndexMap<String, PendingInsert>,
    capacity: usize,
}

impl PendingInsertTable {
    /// Create an empty table with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "PendingInsertTable capacity must be at least 1");
        Self {
            entries: IndexMap::new(),
            capacity,
        }
    }

    /// Accept a new entry keyed by its description's name.
    ///
    /// Never replaces an existing entry.
    pub fn accept(&mut self, entry: PendingInsert) -> Result<(), AcceptError> {
        if self.entries.contains_key(&entry.description.name) {
            return Err(AcceptError::Duplicate);
        }
        if self.entries.len() >= self.capacity {
            return Err(AcceptError::Full);
        }
        self.entries.insert(entry.description.name.clone(), entry);
        Ok(())
    }

    /// Mark the oldest waiting entry as inserted and return a copy of its
    /// description. At most one entry changes per call.
    pub fn claim_next(&mut self) -> Option<EntityDescription> {
        let entry = self.entries.values_mut().find(|e| !e.completed)?;
        entry.completed = true;
        Some(entry.description.clone())
    }

    /// Close an inserted entry, removing it from the table.
    pub fn close(&mut self, name: &str) -> CloseOutcome {
        let completed = match self.entries.get(name) {
            None => return CloseOutcome::Absent,
            Some(e) => e.completed,
        };
        if !completed {
            return CloseOutcome::NotInserted;
        }
        self.entries
            .shift_remove(name)
            .map_or(CloseOutcome::Absent, CloseOutcome::Closed)
    }

    /// Remove an entry regardless of state.
    pub fn discard(&mut self, name: &str) -> Option<PendingInsert> {
        self.entries.shift_remove(name)
    }

    /// Remove every entry, in acceptance order.
    pub fn drain_all(&mut self) -> Vec<PendingInsert> {
        self.entries.drain(..).map(|(_, e)| e).collect()
    }

    /// State of the entry for `name`, if any.
    pub fn state(&self, name: &str) -> Option<InsertState> {
        self.entries.get(name).map(PendingInsert::state)
    }

    /// Whether `name` has an entry.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries still waiting for the engine.
    pub fn waiting(&self) -> usize {
        self.entries.values().filter(|e| !e.completed).count()
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ── PendingRemoveQueue ─────────────────────────────────────────────

/// A queued removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRemove {
    /// Entity name, for logging and lifespan bookkeeping.
    pub name: String,
    /// Engine handle resolved when the removal was accepted.
    pub handle: EntityHandle,
    /// Where the response goes. `None` for death reports, which expect
    /// no response.
    pub reply: Option<ReplyTo>,
}

/// Returned by [`PendingRemoveQueue::push`] when the queue is at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFull;

/// Batch type handed out by [`PendingRemoveQueue::take_all`].
pub type RemoveBatch = SmallVec<[PendingRemove; 8]>;

/// Removals awaiting the next begin-of-step drain, in arrival order.
pub struct PendingRemoveQueue {
    queue: VecDeque<PendingRemove>,
    capacity: usize,
}

impl PendingRemoveQueue {
    /// Create an empty queue with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "PendingRemoveQueue capacity must be at least 1");
        Self {
            queue: VecDeque::new(),
            capacity,
        }
    }

    /// Append a removal.
    pub fn push(&mut self, entry: PendingRemove) -> Result<(), QueueFull> {
        if self.queue.len() >= self.capacity {
            return Err(QueueFull);
        }
        self.queue.push_back(entry);
        Ok(())
    }

    /// Take every queued removal, leaving the queue empty.
    pub fn take_all(&mut self) -> RemoveBatch {
        self.queue.drain(..).collect()
    }

    /// Give a queued reply-less removal of `handle` a reply.
    ///
    /// Returns `false` if no such entry exists, or if the queued removal
    /// already answers another request.
    pub fn attach_reply(&mut self, handle: EntityHandle, reply: ReplyTo) -> bool {
        match self
            .queue
            .iter_mut()
            .find(|e| e.handle == handle && e.reply.is_none())
        {
            Some(entry) => {
                entry.reply = Some(reply);
                true
            }
            None => false,
        }
    }

    /// Whether a removal for `handle` is already queued.
    pub fn contains_handle(&self, handle: EntityHandle) -> bool {
        self.queue.iter().any(|e| e.handle == handle)
    }

    /// Number of queued removals.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of queued removals.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(id: i64) -> ReplyTo {
        ReplyTo {
            correlation_id: CorrelationId(id),
            origin: None,
        }
    }

    fn entry(name: &str, id: i64) -> PendingInsert {
        PendingInsert::new(reply(id), EntityDescription::new(name, "<model/>"), None)
    }

    fn removal(name: &str, raw: u64, id: Option<i64>) -> PendingRemove {
        PendingRemove {
            name: name.to_string(),
            handle: EntityHandle::from_raw(raw),
            reply: id.map(reply),
        }
    }

    // ── insert table ───────────────────────────────────────────

    #[test]
    fn accept_then_state_is_waiting() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("a", 1)).unwrap();
        assert_eq!(t.state("a"), Some(InsertState::Waiting));
        assert_eq!(t.waiting(), 1);
    }

    #[test]
    fn duplicate_accept_leaves_original_untouched() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("a", 1)).unwrap();
        assert_eq!(t.accept(entry("a", 2)), Err(AcceptError::Duplicate));
        assert_eq!(t.len(), 1);
        match t.discard("a") {
            Some(e) => assert_eq!(e.reply.correlation_id, CorrelationId(1)),
            None => panic!("entry missing"),
        }
    }

    #[test]
    fn duplicate_reported_before_full() {
        let mut t = PendingInsertTable::new(1);
        t.accept(entry("a", 1)).unwrap();
        assert_eq!(t.accept(entry("a", 2)), Err(AcceptError::Duplicate));
        assert_eq!(t.accept(entry("b", 3)), Err(AcceptError::Full));
    }

    #[test]
    fn claim_next_marks_one_entry_in_acceptance_order() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("b", 1)).unwrap();
        t.accept(entry("a", 2)).unwrap();
        let first = t.claim_next().unwrap();
        assert_eq!(first.name, "b");
        assert_eq!(t.state("b"), Some(InsertState::Inserted));
        assert_eq!(t.state("a"), Some(InsertState::Waiting));
        let second = t.claim_next().unwrap();
        assert_eq!(second.name, "a");
        assert!(t.claim_next().is_none());
    }

    #[test]
    fn close_requires_inserted_state() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("a", 1)).unwrap();
        assert!(matches!(t.close("a"), CloseOutcome::NotInserted));
        assert!(t.contains("a"));
        t.claim_next();
        match t.close("a") {
            CloseOutcome::Closed(e) => assert_eq!(e.reply.correlation_id, CorrelationId(1)),
            other => panic!("expected Closed, got {other:?}"),
        }
        assert!(t.is_empty());
    }

    #[test]
    fn close_unknown_is_absent() {
        let mut t = PendingInsertTable::new(4);
        assert!(matches!(t.close("ghost"), CloseOutcome::Absent));
    }

    #[test]
    fn name_reusable_after_close() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("a", 1)).unwrap();
        t.claim_next();
        t.close("a");
        assert!(t.accept(entry("a", 2)).is_ok());
    }

    #[test]
    fn drain_all_empties_table() {
        let mut t = PendingInsertTable::new(4);
        t.accept(entry("a", 1)).unwrap();
        t.accept(entry("b", 2)).unwrap();
        let drained = t.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].description.name, "a");
        assert!(t.is_empty());
    }

    // ── remove queue ───────────────────────────────────────────

    #[test]
    fn push_rejects_when_full() {
        let mut q = PendingRemoveQueue::new(1);
        q.push(removal("a", 1, Some(1))).unwrap();
        assert_eq!(q.push(removal("b", 2, Some(2))), Err(QueueFull));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn take_all_preserves_order_and_clears() {
        let mut q = PendingRemoveQueue::new(4);
        q.push(removal("a", 1, Some(1))).unwrap();
        q.push(removal("b", 2, None)).unwrap();
        let batch = q.take_all();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].name, "a");
        assert_eq!(batch[1].reply, None);
        assert!(q.is_empty());
    }

    #[test]
    fn contains_handle_matches_queued_entries() {
        let mut q = PendingRemoveQueue::new(4);
        q.push(removal("a", 7, None)).unwrap();
        assert!(q.contains_handle(EntityHandle::from_raw(7)));
        assert!(!q.contains_handle(EntityHandle::from_raw(8)));
    }

    #[test]
    fn attach_reply_upgrades_only_reply_less_entries() {
        let mut q = PendingRemoveQueue::new(4);
        q.push(removal("a", 7, None)).unwrap();
        assert!(q.attach_reply(EntityHandle::from_raw(7), reply(5)));
        // Already answering request 5.
        assert!(!q.attach_reply(EntityHandle::from_raw(7), reply(6)));
        assert!(!q.attach_reply(EntityHandle::from_raw(8), reply(6)));
        let batch = q.take_all();
        assert_eq!(batch[0].reply, Some(reply(5)));
    }

    // ── proptest ───────────────────────────────────────────────

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn each_claim_changes_exactly_one_entry(
                names in prop::collection::hash_set("[a-z]{1,6}", 1..32),
                claims in 0usize..40,
            ) {
                let mut t = PendingInsertTable::new(64);
                for (i, n) in names.iter().enumerate() {
                    t.accept(entry(n, i as i64)).unwrap();
                }
                let total = t.len();
                for k in 0..claims {
                    let before = t.waiting();
                    let claimed = t.claim_next();
                    let after = t.waiting();
                    if k < total {
                        prop_assert!(claimed.is_some());
                        prop_assert_eq!(before - after, 1);
                    } else {
                        prop_assert!(claimed.is_none());
                        prop_assert_eq!(after, 0);
                    }
                }
                prop_assert_eq!(t.len(), total);
            }
        }
    }
}

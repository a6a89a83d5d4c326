//! Test utilities and mock types for Revolve development.
//!
//! Provides an in-memory engine ([`MockWorld`] plus its shared
//! [`MockDirectory`]), a [`RecordingSink`] that captures published
//! responses, and small request builders.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod handle;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use revolve_core::{
    CorrelationId, EngineError, EntityDescription, EntityHandle, EntityInfo, EntityLookup,
    PhysicsWorld, PublishError, Request, Response, ResponseSink, SimTime, WorldEvent,
};

use crate::handle::HandleTable;

// ── MockDirectory ──────────────────────────────────────────────────

#[derive(Default)]
struct DirectoryInner {
    table: HandleTable<String>,
    by_name: HashMap<String, EntityHandle>,
}

/// Name index of a [`MockWorld`], shared with request threads.
#[derive(Default)]
pub struct MockDirectory {
    inner: RwLock<DirectoryInner>,
}

impl MockDirectory {
    fn add(&self, name: &str) -> EntityHandle {
        let mut inner = self.inner.write();
        let handle = inner.table.insert(name.to_string());
        inner.by_name.insert(name.to_string(), handle);
        handle
    }

    fn remove(&self, handle: EntityHandle) -> Option<String> {
        let mut inner = self.inner.write();
        let name = inner.table.remove(handle)?;
        inner.by_name.remove(&name);
        Some(name)
    }

    /// Whether a live entity has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().by_name.contains_key(name)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.inner.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityLookup for MockDirectory {
    fn lookup_by_name(&self, name: &str) -> Option<EntityHandle> {
        self.inner.read().by_name.get(name).copied()
    }
}

// ── MockWorld ──────────────────────────────────────────────────────

/// In-memory engine with asynchronous creation.
///
/// An entity passed to [`insert`](PhysicsWorld::insert) appears in the
/// directory on the following [`step`](PhysicsWorld::step), which also
/// queues its [`WorldEvent::Created`]. Each step advances simulation
/// time by a fixed `dt`.
pub struct MockWorld {
    directory: Arc<MockDirectory>,
    queued: VecDeque<EntityDescription>,
    events: Vec<WorldEvent>,
    time: SimTime,
    dt: Duration,
    steps: u64,
    refused: HashSet<String>,
    fail_steps: bool,
    insert_log: Vec<String>,
    remove_log: Vec<String>,
}

impl MockWorld {
    pub fn new(dt: Duration) -> Self {
        Self {
            directory: Arc::new(MockDirectory::default()),
            queued: VecDeque::new(),
            events: Vec::new(),
            time: SimTime::ZERO,
            dt,
            steps: 0,
            refused: HashSet::new(),
            fail_steps: false,
            insert_log: Vec::new(),
            remove_log: Vec::new(),
        }
    }

    /// The shared name index.
    pub fn directory(&self) -> Arc<MockDirectory> {
        Arc::clone(&self.directory)
    }

    /// The shared name index as a trait object.
    pub fn lookup(&self) -> Arc<dyn EntityLookup> {
        self.directory.clone()
    }

    /// Create a live entity immediately, bypassing `insert` and
    /// producing no event.
    pub fn spawn(&mut self, name: &str) -> EntityHandle {
        self.directory.add(name)
    }

    /// Make every future `insert` of `name` fail.
    pub fn refuse_inserts_of(&mut self, name: &str) {
        self.refused.insert(name.to_string());
    }

    /// Make every future `step` fail (or succeed again).
    pub fn set_fail_steps(&mut self, fail: bool) {
        self.fail_steps = fail;
    }

    /// Queue an arbitrary event for the next `drain_events`.
    pub fn push_event(&mut self, event: WorldEvent) {
        self.events.push(event);
    }

    /// Names passed to `insert`, in call order.
    pub fn insert_log(&self) -> &[String] {
        &self.insert_log
    }

    /// Names removed through `remove`, in call order.
    pub fn remove_log(&self) -> &[String] {
        &self.remove_log
    }

    /// Whether a live entity has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.directory.contains(name)
    }

    /// Number of successful steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl PhysicsWorld for MockWorld {
    fn insert(&mut self, description: &EntityDescription) -> Result<(), EngineError> {
        if self.refused.contains(&description.name) {
            return Err(EngineError::InvalidDescription {
                reason: format!("'{}' refused by test setup", description.name),
            });
        }
        if self.directory.contains(&description.name)
            || self.queued.iter().any(|d| d.name == description.name)
        {
            return Err(EngineError::NameTaken {
                name: description.name.clone(),
            });
        }
        self.insert_log.push(description.name.clone());
        self.queued.push_back(description.clone());
        Ok(())
    }

    fn remove(&mut self, handle: EntityHandle) -> Result<(), EngineError> {
        let name = self
            .directory
            .remove(handle)
            .ok_or(EngineError::StaleHandle)?;
        self.remove_log.push(name);
        Ok(())
    }

    fn step(&mut self) -> Result<(), EngineError> {
        if self.fail_steps {
            return Err(EngineError::StepFailed {
                reason: "failure injected by test setup".into(),
            });
        }
        self.time = self.time.saturating_add(self.dt);
        self.steps += 1;
        while let Some(desc) = self.queued.pop_front() {
            let handle = self.directory.add(&desc.name);
            self.events.push(WorldEvent::Created(EntityInfo {
                name: desc.name,
                handle,
                data: desc.document.into_bytes(),
            }));
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    fn sim_time(&self) -> SimTime {
        self.time
    }

    fn entity_count(&self) -> usize {
        self.directory.len()
    }
}

// ── RecordingSink ──────────────────────────────────────────────────

/// [`ResponseSink`] that records every published response.
///
/// Can be switched into a failing mode to exercise lost-response paths;
/// responses published while failing are not recorded.
#[derive(Default)]
pub struct RecordingSink {
    responses: Mutex<Vec<Response>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future `publish` fail with `Disconnected` (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Copy of everything recorded so far.
    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().clone()
    }

    /// Take everything recorded so far.
    pub fn take(&self) -> Vec<Response> {
        std::mem::take(&mut *self.responses.lock())
    }

    /// Recorded responses for one correlation ID.
    pub fn for_id(&self, id: CorrelationId) -> Vec<Response> {
        self.responses
            .lock()
            .iter()
            .filter(|r| r.correlation_id == id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseSink for RecordingSink {
    fn publish(&self, response: Response) -> Result<(), PublishError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(PublishError::Disconnected);
        }
        self.responses.lock().push(response);
        Ok(())
    }
}

// ── Request builders ───────────────────────────────────────────────

/// A description whose document is a minimal model element.
pub fn description(name: &str) -> EntityDescription {
    EntityDescription::new(name, format!("<model name='{name}'/>"))
}

/// An insert request with no lifespan.
pub fn insert_request(id: i64, name: &str) -> Request {
    Request::insert(CorrelationId(id), description(name), None)
}

/// An insert request with a lifespan.
pub fn insert_request_with_lifespan(id: i64, name: &str, lifespan: Duration) -> Request {
    Request::insert(CorrelationId(id), description(name), Some(lifespan))
}

/// A delete request.
pub fn delete_request(id: i64, name: &str) -> Request {
    Request::delete(CorrelationId(id), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_appears_after_next_step() {
        let mut world = MockWorld::new(Duration::from_millis(10));
        world.insert(&description("a")).unwrap();
        assert!(!world.contains("a"));
        assert!(world.drain_events().is_empty());
        world.step().unwrap();
        assert!(world.contains("a"));
        let events = world.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], WorldEvent::Created(info) if info.name == "a"));
        assert_eq!(world.sim_time(), SimTime::new(0, 10_000_000));
    }

    #[test]
    fn duplicate_insert_is_name_taken() {
        let mut world = MockWorld::new(Duration::from_millis(10));
        world.spawn("a");
        assert!(matches!(
            world.insert(&description("a")),
            Err(EngineError::NameTaken { .. })
        ));
    }

    #[test]
    fn remove_twice_is_stale() {
        let mut world = MockWorld::new(Duration::from_millis(10));
        let h = world.spawn("a");
        assert!(world.remove(h).is_ok());
        assert_eq!(world.remove(h), Err(EngineError::StaleHandle));
        assert_eq!(world.remove_log(), ["a".to_string()]);
    }

    #[test]
    fn failing_sink_records_nothing() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        let resp = Response::success(CorrelationId(1), None, revolve_core::RequestKind::Delete);
        assert_eq!(sink.publish(resp.clone()), Err(PublishError::Disconnected));
        sink.set_failing(false);
        sink.publish(resp).unwrap();
        assert_eq!(sink.len(), 1);
    }
}

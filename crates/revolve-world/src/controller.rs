//! The lifecycle controller: request ingestion on any thread, step-aligned
//! draining on the step thread.
//!
//! # Threading
//!
//! Request-side methods ([`on_insert_request`], [`on_delete_request`],
//! [`on_external_death_report`], [`dispatch`]) may be called from any
//! number of threads. They take a short lock on one pending structure
//! and never touch the engine.
//!
//! Step-side methods ([`on_begin_step`], [`on_end_step`],
//! [`on_entity_created`]) must be called from the single thread that
//! owns the [`PhysicsWorld`], in that order, once per tick. They receive
//! the world by reference and call it only after releasing every lock.
//!
//! [`on_insert_request`]: LifecycleController::on_insert_request
//! [`on_delete_request`]: LifecycleController::on_delete_request
//! [`on_external_death_report`]: LifecycleController::on_external_death_report
//! [`dispatch`]: LifecycleController::dispatch
//! [`on_begin_step`]: LifecycleController::on_begin_step
//! [`on_end_step`]: LifecycleController::on_end_step
//! [`on_entity_created`]: LifecycleController::on_entity_created

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use revolve_core::{
    EngineError, EntityDescription, EntityHandle, EntityInfo, EntityLookup, InsertedEntity, LifecycleError,
    PhysicsWorld, RejectReason, Request, RequestKind, RequestPayload, Response, ResponseSink,
    SimTime,
};

use crate::config::{ConfigError, ControllerConfig};
use crate::lifespan::LifespanTracker;
use crate::metrics::{bump, ControllerMetrics, MetricCounters};
use crate::pending::{
    AcceptError, CloseOutcome, InsertState, PendingInsert, PendingInsertTable, PendingRemove,
    PendingRemoveQueue, ReplyTo,
};

/// Outcome of one [`LifecycleController::on_begin_step`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeginStepReport {
    /// Removals the engine applied.
    pub removed: usize,
    /// Removals the engine refused.
    pub failed: usize,
    /// Lifespan expiries queued for removal this tick.
    pub expired: usize,
    /// Whether the drain was skipped because the queue lock was busy.
    pub skipped: bool,
}

/// Step-aligned entity lifecycle controller.
///
/// Shared between request threads and the step thread behind an `Arc`.
/// Owns the pending insert table, the pending remove queue and the
/// lifespan sentences; borrows the engine only for the duration of a
/// step-side call.
pub struct LifecycleController {
    inserts: Mutex<PendingInsertTable>,
    removals: Mutex<PendingRemoveQueue>,
    /// Touched only by the step thread.
    lifespans: Mutex<LifespanTracker>,
    lookup: Arc<dyn EntityLookup>,
    sink: Arc<dyn ResponseSink>,
    closed: AtomicBool,
    counters: MetricCounters,
}

impl LifecycleController {
    /// Create a controller with empty pending state.
    ///
    /// `lookup` is the engine's read-only name index and is queried from
    /// request threads. `sink` receives every response.
    pub fn new(
        config: &ControllerConfig,
        lookup: Arc<dyn EntityLookup>,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inserts: Mutex::new(PendingInsertTable::new(config.max_pending_inserts)),
            removals: Mutex::new(PendingRemoveQueue::new(config.max_pending_removals)),
            lifespans: Mutex::new(LifespanTracker::new()),
            lookup,
            sink,
            closed: AtomicBool::new(false),
            counters: MetricCounters::default(),
        })
    }

    // ── request side ────────────────────────────────────────────

    /// Route a transport request to the matching handler.
    pub fn dispatch(&self, request: Request) -> Result<(), LifecycleError> {
        let reply = ReplyTo {
            correlation_id: request.correlation_id,
            origin: request.origin,
        };
        match request.payload {
            RequestPayload::Insert {
                description,
                lifespan,
            } => self.on_insert_request(description, lifespan, reply),
            RequestPayload::Delete { name } => self.on_delete_request(&name, reply),
        }
    }

    /// Accept an insert for the next end-of-step drain.
    ///
    /// A name that is already pending or already live is rejected. Every
    /// rejection publishes one error response before returning the error.
    /// If that response cannot be published the request is lost and
    /// [`LifecycleError::ChannelUnavailable`] is returned instead.
    pub fn on_insert_request(
        &self,
        description: EntityDescription,
        lifespan: Option<Duration>,
        reply: ReplyTo,
    ) -> Result<(), LifecycleError> {
        let name = description.name.clone();
        if self.is_closed() {
            bump(&self.counters.inserts_rejected);
            return self.reject(
                reply,
                RequestKind::Insert,
                RejectReason::ShuttingDown,
                LifecycleError::ShuttingDown,
            );
        }

        // The live check runs under the table lock: an entry is closed
        // only after its entity is visible to the lookup, so a name can
        // never slip between the two checks.
        let (accepted, capacity) = {
            let mut inserts = self.inserts.lock();
            let accepted =
                if inserts.contains(&name) || self.lookup.lookup_by_name(&name).is_some() {
                    Err(AcceptError::Duplicate)
                } else {
                    inserts.accept(PendingInsert::new(reply, description, lifespan))
                };
            (accepted, inserts.capacity())
        };

        match accepted {
            Ok(()) => {
                bump(&self.counters.inserts_accepted);
                debug!(%name, correlation_id = %reply.correlation_id, "insert accepted");
                Ok(())
            }
            Err(AcceptError::Duplicate) => {
                bump(&self.counters.inserts_rejected);
                warn!(%name, correlation_id = %reply.correlation_id, "insert rejected: duplicate");
                self.reject(
                    reply,
                    RequestKind::Insert,
                    RejectReason::DuplicateEntity,
                    LifecycleError::DuplicateEntity { name },
                )
            }
            Err(AcceptError::Full) => {
                bump(&self.counters.inserts_rejected);
                warn!(%name, correlation_id = %reply.correlation_id, capacity, "insert rejected: table full");
                self.reject(
                    reply,
                    RequestKind::Insert,
                    RejectReason::QueueFull,
                    LifecycleError::QueueFull { capacity },
                )
            }
        }
    }

    /// Queue a removal for the next begin-of-step drain.
    ///
    /// An unknown name is rejected with one error response. If a death
    /// report for the same entity is already queued, this request takes
    /// over its reply instead of queueing a second removal.
    pub fn on_delete_request(&self, name: &str, reply: ReplyTo) -> Result<(), LifecycleError> {
        if self.is_closed() {
            bump(&self.counters.removals_rejected);
            return self.reject(
                reply,
                RequestKind::Delete,
                RejectReason::ShuttingDown,
                LifecycleError::ShuttingDown,
            );
        }

        let Some(handle) = self.lookup.lookup_by_name(name) else {
            bump(&self.counters.removals_rejected);
            warn!(%name, correlation_id = %reply.correlation_id, "delete rejected: not found");
            return self.reject(
                reply,
                RequestKind::Delete,
                RejectReason::EntityNotFound,
                LifecycleError::EntityNotFound {
                    name: name.to_string(),
                },
            );
        };

        let queued = {
            let mut removals = self.removals.lock();
            if removals.attach_reply(handle, reply) {
                Ok(())
            } else {
                removals
                    .push(PendingRemove {
                        name: name.to_string(),
                        handle,
                        reply: Some(reply),
                    })
                    .map_err(|_| removals.capacity())
            }
        };

        match queued {
            Ok(()) => {
                bump(&self.counters.removals_accepted);
                debug!(%name, %handle, correlation_id = %reply.correlation_id, "delete queued");
                Ok(())
            }
            Err(capacity) => {
                bump(&self.counters.removals_rejected);
                warn!(%name, correlation_id = %reply.correlation_id, capacity, "delete rejected: queue full");
                self.reject(
                    reply,
                    RequestKind::Delete,
                    RejectReason::QueueFull,
                    LifecycleError::QueueFull { capacity },
                )
            }
        }
    }

    /// Queue a removal that expects no response.
    ///
    /// Used by health monitors that declare an entity dead. Nothing is
    /// published either way; failures are logged and dropped. A report
    /// for an entity whose removal is already queued is a no-op.
    pub fn on_external_death_report(&self, name: &str) -> Result<(), LifecycleError> {
        if self.is_closed() {
            bump(&self.counters.death_reports_dropped);
            debug!(%name, "death report dropped: shutting down");
            return Err(LifecycleError::ShuttingDown);
        }
        let Some(handle) = self.lookup.lookup_by_name(name) else {
            bump(&self.counters.death_reports_dropped);
            warn!(%name, "death report dropped: not found");
            return Err(LifecycleError::EntityNotFound {
                name: name.to_string(),
            });
        };

        let mut removals = self.removals.lock();
        if removals.contains_handle(handle) {
            trace!(%name, "death report ignored: removal already queued");
            return Ok(());
        }
        let entry = PendingRemove {
            name: name.to_string(),
            handle,
            reply: None,
        };
        if removals.push(entry).is_err() {
            let capacity = removals.capacity();
            drop(removals);
            bump(&self.counters.death_reports_dropped);
            warn!(%name, capacity, "death report dropped: queue full");
            return Err(LifecycleError::QueueFull { capacity });
        }
        drop(removals);
        bump(&self.counters.death_reports_accepted);
        debug!(%name, %handle, "death report queued");
        Ok(())
    }

    // ── step side ───────────────────────────────────────────────

    /// Begin-of-step drain: apply every queued removal plus every expired
    /// lifespan.
    ///
    /// Never blocks. If a request thread holds the queue lock the whole
    /// drain is skipped; queued removals and expired sentences stay put
    /// for the next tick. Expiries bypass the queue's capacity, so a full
    /// queue never holds one back.
    pub fn on_begin_step(&self, world: &mut dyn PhysicsWorld) -> BeginStepReport {
        let mut report = BeginStepReport::default();

        let expired = self.lifespans.lock().expired(world.sim_time());
        // Resolved before the queue lock is taken.
        let expired: Vec<(String, Option<EntityHandle>)> = expired
            .into_iter()
            .map(|name| {
                let handle = self.lookup.lookup_by_name(&name);
                (name, handle)
            })
            .collect();

        let mut batch = {
            let Some(mut removals) = self.removals.try_lock() else {
                bump(&self.counters.removal_drains_skipped);
                trace!("removal drain skipped: queue busy");
                report.skipped = true;
                return report;
            };
            removals.take_all()
        };

        for (name, handle) in expired {
            let Some(handle) = handle else {
                self.lifespans.lock().pardon(&name);
                debug!(%name, "sentence dropped: entity already gone");
                continue;
            };
            report.expired += 1;
            if batch.iter().any(|e| e.handle == handle) {
                continue;
            }
            bump(&self.counters.death_reports_accepted);
            debug!(%name, %handle, "lifespan expired");
            batch.push(PendingRemove {
                name,
                handle,
                reply: None,
            });
        }

        if batch.is_empty() {
            return report;
        }
        debug!(count = batch.len(), "draining removals");

        for entry in batch {
            let result = world.remove(entry.handle);
            self.lifespans.lock().pardon(&entry.name);
            match result {
                Ok(()) => {
                    report.removed += 1;
                    bump(&self.counters.removals_applied);
                    info!(name = %entry.name, handle = %entry.handle, "entity removed");
                    if let Some(reply) = entry.reply {
                        // A lost response is already logged and counted.
                        let _ = self.publish(Response::success(
                            reply.correlation_id,
                            reply.origin,
                            RequestKind::Delete,
                        ));
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    bump(&self.counters.removals_failed);
                    warn!(name = %entry.name, handle = %entry.handle, error = %e, "engine refused removal");
                    if let Some(reply) = entry.reply {
                        let reason = match e {
                            EngineError::StaleHandle => RejectReason::EntityNotFound,
                            _ => RejectReason::EngineRejected,
                        };
                        let _ = self.publish(Response::error(
                            reply.correlation_id,
                            reply.origin,
                            RequestKind::Delete,
                            reason,
                        ));
                    }
                }
            }
        }
        report
    }

    /// End-of-step drain: hand at most one waiting insert to the engine.
    ///
    /// Returns the name of the entity handed over. Its entry stays in the
    /// table until [`on_entity_created`](Self::on_entity_created) closes
    /// it. If the engine refuses, the entry is discarded and one error
    /// response is published.
    pub fn on_end_step(&self, world: &mut dyn PhysicsWorld) -> Option<String> {
        let description = self.inserts.lock().claim_next()?;
        bump(&self.counters.inserts_started);

        match world.insert(&description) {
            Ok(()) => {
                debug!(name = %description.name, "insert handed to engine");
                Some(description.name)
            }
            Err(e) => {
                bump(&self.counters.inserts_failed);
                warn!(name = %description.name, error = %e, "engine refused insert");
                let entry = self.inserts.lock().discard(&description.name);
                // Absent if the table was aborted in the meantime; that
                // path already answered the request.
                if let Some(entry) = entry {
                    let _ = self.publish(Response::error(
                        entry.reply.correlation_id,
                        entry.reply.origin,
                        RequestKind::Insert,
                        RejectReason::EngineRejected,
                    ));
                }
                None
            }
        }
    }

    /// Handle the engine's creation notification for `info.name`.
    ///
    /// Closes the matching inserted entry and publishes its success
    /// response stamped with `now`. The entity's lifespan replaces any
    /// sentence left over from an earlier entity of the same name.
    ///
    /// Notifications for unknown names, or for entries not yet handed to
    /// the engine, change nothing and return
    /// [`LifecycleError::SpuriousNotification`].
    pub fn on_entity_created(
        &self,
        info: EntityInfo,
        now: SimTime,
    ) -> Result<(), LifecycleError> {
        let outcome = self.inserts.lock().close(&info.name);
        match outcome {
            CloseOutcome::Closed(entry) => {
                {
                    let mut lifespans = self.lifespans.lock();
                    match entry.lifespan {
                        Some(lifespan) => lifespans.sentence(&info.name, now, lifespan),
                        None => {
                            if lifespans.pardon(&info.name) {
                                debug!(name = %info.name, "stale sentence cleared");
                            }
                        }
                    }
                }
                bump(&self.counters.inserts_completed);
                info!(name = %info.name, handle = %info.handle, time = %now, "entity inserted");
                let _ = self.publish(Response::inserted(
                    entry.reply.correlation_id,
                    entry.reply.origin,
                    InsertedEntity { info, time: now },
                ));
                Ok(())
            }
            CloseOutcome::NotInserted => {
                bump(&self.counters.spurious_notifications);
                warn!(name = %info.name, "creation notification before insertion");
                Err(LifecycleError::SpuriousNotification { name: info.name })
            }
            CloseOutcome::Absent => {
                bump(&self.counters.spurious_notifications);
                debug!(name = %info.name, "creation notification for untracked entity");
                Err(LifecycleError::SpuriousNotification { name: info.name })
            }
        }
    }

    // ── shutdown ────────────────────────────────────────────────

    /// Stop accepting requests. Every later request is rejected with
    /// [`RejectReason::ShuttingDown`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("controller closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Answer every pending request with [`RejectReason::ShuttingDown`]
    /// and clear all pending state. Returns the number of requests
    /// answered.
    ///
    /// Call after the step thread has stopped, so no entry is mid-flight.
    pub fn abort_pending(&self) -> usize {
        let inserts = self.inserts.lock().drain_all();
        let removals = self.removals.lock().take_all();
        self.lifespans.lock().clear();

        let mut answered = 0;
        for entry in inserts {
            if entry.state() == InsertState::Inserted {
                debug!(name = %entry.description.name, "aborting insert already handed to engine");
            }
            answered += 1;
            let _ = self.publish(Response::error(
                entry.reply.correlation_id,
                entry.reply.origin,
                RequestKind::Insert,
                RejectReason::ShuttingDown,
            ));
        }
        for reply in removals.into_iter().filter_map(|e| e.reply) {
            answered += 1;
            let _ = self.publish(Response::error(
                reply.correlation_id,
                reply.origin,
                RequestKind::Delete,
                RejectReason::ShuttingDown,
            ));
        }
        if answered > 0 {
            info!(answered, "pending requests aborted");
        }
        answered
    }

    // ── introspection ───────────────────────────────────────────

    /// State of the pending insert for `name`, if any.
    pub fn insert_state(&self, name: &str) -> Option<InsertState> {
        self.inserts.lock().state(name)
    }

    /// Number of entries in the pending insert table.
    pub fn pending_inserts(&self) -> usize {
        self.inserts.lock().len()
    }

    /// Number of queued removals.
    pub fn pending_removals(&self) -> usize {
        self.removals.lock().len()
    }

    /// Number of outstanding lifespan sentences.
    pub fn pending_sentences(&self) -> usize {
        self.lifespans.lock().len()
    }

    /// Snapshot of the controller's counters.
    pub fn metrics(&self) -> ControllerMetrics {
        let pending_inserts = self.pending_inserts();
        let pending_removals = self.pending_removals();
        self.counters.snapshot(pending_inserts, pending_removals)
    }

    // ── internals ───────────────────────────────────────────────

    fn publish(&self, response: Response) -> Result<(), LifecycleError> {
        let correlation_id = response.correlation_id;
        self.sink.publish(response).map_err(|e| {
            bump(&self.counters.publish_failures);
            warn!(%correlation_id, error = %e, "response lost");
            LifecycleError::from(e)
        })
    }

    fn reject(
        &self,
        reply: ReplyTo,
        kind: RequestKind,
        reason: RejectReason,
        error: LifecycleError,
    ) -> Result<(), LifecycleError> {
        self.publish(Response::error(
            reply.correlation_id,
            reply.origin,
            kind,
            reason,
        ))?;
        Err(error)
    }

    #[cfg(test)]
    pub(crate) fn lock_removals(&self) -> parking_lot::MutexGuard<'_, PendingRemoveQueue> {
        self.removals.lock()
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("pending_inserts", &self.pending_inserts())
            .field("pending_removals", &self.pending_removals())
            .field("closed", &self.is_closed())
            .finish()
    }
}

//! End-to-end lifecycle scenarios driven through `LockstepHost`.
//!
//! Each test wires a `MockWorld`, a `RecordingSink` and a controller,
//! submits requests, steps the host, and checks the published responses.

use std::sync::Arc;
use std::time::Duration;

use revolve_core::{CorrelationId, Outcome, RejectReason, RequestKind, SessionId, SimTime};
use revolve_test_utils::{
    delete_request, insert_request, insert_request_with_lifespan, MockWorld, RecordingSink,
};
use revolve_world::{ControllerConfig, InsertState, LifecycleController, LockstepHost};

fn setup() -> (LockstepHost<MockWorld>, Arc<RecordingSink>) {
    let world = MockWorld::new(Duration::from_millis(10));
    let sink = Arc::new(RecordingSink::new());
    let controller = Arc::new(
        LifecycleController::new(&ControllerConfig::default(), world.lookup(), sink.clone())
            .unwrap(),
    );
    (LockstepHost::new(world, controller), sink)
}

#[test]
fn insert_request_answered_with_metadata_and_time() {
    let (mut host, sink) = setup();
    host.controller().dispatch(insert_request(7, "robotA")).unwrap();

    let first = host.step();
    assert_eq!(first.inserted.as_deref(), Some("robotA"));
    assert_eq!(
        host.controller().insert_state("robotA"),
        Some(InsertState::Inserted)
    );
    assert!(sink.is_empty());

    let second = host.step();
    assert_eq!(second.closed, 1);
    assert_eq!(host.controller().insert_state("robotA"), None);

    let responses = sink.for_id(CorrelationId(7));
    assert_eq!(responses.len(), 1);
    let resp = &responses[0];
    assert_eq!(resp.kind, RequestKind::Insert);
    assert_eq!(resp.outcome, Outcome::Success);
    let payload = resp.payload.as_ref().unwrap();
    assert_eq!(payload.info.name, "robotA");
    assert_eq!(payload.time, second.sim_time);
}

#[test]
fn inserts_are_throttled_to_one_per_tick() {
    let (mut host, sink) = setup();
    for i in 0..10 {
        host.controller()
            .dispatch(insert_request(i, &format!("r{i}")))
            .unwrap();
    }
    for tick in 1..=10 {
        let report = host.step();
        assert!(report.inserted.is_some(), "tick {tick} inserted nothing");
        assert_eq!(host.world().insert_log().len(), tick);
    }
    assert!(host.step().inserted.is_none());
    assert_eq!(sink.len(), 10);
    assert!(sink.responses().iter().all(|r| r.is_success()));
}

#[test]
fn delete_answered_after_next_begin_step() {
    let (mut host, sink) = setup();
    host.world_mut().spawn("crate");
    host.controller().dispatch(delete_request(3, "crate")).unwrap();
    assert!(host.world().contains("crate"));

    let report = host.step();
    assert_eq!(report.removed, 1);
    assert!(!host.world().contains("crate"));
    assert_eq!(sink.for_id(CorrelationId(3))[0].outcome, Outcome::Success);
}

#[test]
fn rejected_requests_answered_immediately() {
    let (mut host, sink) = setup();
    host.world_mut().spawn("live");

    assert!(host.controller().dispatch(insert_request(1, "live")).is_err());
    assert!(host.controller().dispatch(delete_request(2, "ghost")).is_err());

    let outcomes: Vec<_> = sink.responses().into_iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Error(RejectReason::DuplicateEntity),
            Outcome::Error(RejectReason::EntityNotFound),
        ]
    );
}

#[test]
fn lifespan_expiry_is_silent_and_frees_the_name() {
    let (mut host, sink) = setup();
    host.controller()
        .dispatch(insert_request_with_lifespan(1, "temp", Duration::from_millis(50)))
        .unwrap();

    let mut expired_at = None;
    for _ in 0..20 {
        let report = host.step();
        if report.expired == 1 {
            expired_at = Some(report.sim_time);
            break;
        }
    }
    // Closed at 20ms, deadline 70ms, observed at the start of the tick
    // that ends at 80ms.
    assert_eq!(expired_at, Some(SimTime::new(0, 80_000_000)));
    assert!(!host.world().contains("temp"));
    assert_eq!(sink.len(), 1);

    host.controller().dispatch(insert_request(2, "temp")).unwrap();
}

#[test]
fn colliding_ids_from_different_origins_stay_apart() {
    let (mut host, sink) = setup();
    host.world_mut().spawn("x");
    host.controller()
        .dispatch(delete_request(1, "x").with_origin(SessionId(1)))
        .unwrap();
    host.controller()
        .dispatch(insert_request(1, "y").with_origin(SessionId(2)))
        .unwrap();
    host.run(3);

    let responses = sink.for_id(CorrelationId(1));
    assert_eq!(responses.len(), 2);
    let delete = responses.iter().find(|r| r.kind == RequestKind::Delete).unwrap();
    let insert = responses.iter().find(|r| r.kind == RequestKind::Insert).unwrap();
    assert_eq!(delete.origin, Some(SessionId(1)));
    assert_eq!(insert.origin, Some(SessionId(2)));
}

#[test]
fn metrics_track_the_whole_lifecycle() {
    let (mut host, _sink) = setup();
    host.world_mut().spawn("old");
    host.controller().dispatch(insert_request(1, "new")).unwrap();
    host.controller().dispatch(delete_request(2, "old")).unwrap();
    host.controller().on_external_death_report("missing").ok();
    host.run(2);

    let m = host.controller().metrics();
    assert_eq!(m.inserts_accepted, 1);
    assert_eq!(m.inserts_started, 1);
    assert_eq!(m.inserts_completed, 1);
    assert_eq!(m.removals_accepted, 1);
    assert_eq!(m.removals_applied, 1);
    assert_eq!(m.death_reports_dropped, 1);
    assert_eq!(m.pending_inserts, 0);
    assert_eq!(m.pending_removals, 0);
}

//! Stress test: concurrent request threads against a ticking world.
//!
//! Several threads submit inserts, deletes and death reports while the
//! world steps. Afterwards every request must have received exactly one
//! response, and no pending state may remain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use revolve_core::{CorrelationId, RequestKind};
use revolve_test_utils::{delete_request, insert_request, MockWorld, RecordingSink};
use revolve_world::{
    ControllerConfig, HostConfig, LifecycleController, LockstepHost, RealtimeHost, SubmitError,
};

const THREADS: i64 = 4;
const PER_THREAD: i64 = 40;

fn id(thread: i64, k: i64) -> i64 {
    thread * 10_000 + k
}

#[test]
fn lockstep_with_concurrent_request_threads() {
    let world = MockWorld::new(Duration::from_millis(1));
    let sink = Arc::new(RecordingSink::new());
    let controller = Arc::new(
        LifecycleController::new(&ControllerConfig::default(), world.lookup(), sink.clone())
            .unwrap(),
    );
    let mut host = LockstepHost::new(world, Arc::clone(&controller));
    let done = Arc::new(AtomicBool::new(false));

    let mut submitters = Vec::new();
    for t in 0..THREADS {
        let controller = Arc::clone(&controller);
        submitters.push(thread::spawn(move || {
            let mut submitted = Vec::new();
            for k in 0..PER_THREAD {
                let name = format!("t{t}-{}", k / 2);
                // Even k inserts, odd k deletes the same name. The delete
                // may race ahead of the insert and be rejected; either
                // way it is answered once.
                let request = if k % 2 == 0 {
                    insert_request(id(t, k), &name)
                } else {
                    delete_request(id(t, k), &name)
                };
                let _ = controller.dispatch(request);
                submitted.push(id(t, k));
                if k % 5 == 0 {
                    let _ = controller.on_external_death_report(&format!("t{t}-0"));
                }
                thread::yield_now();
            }
            submitted
        }));
    }

    let stepper_done = Arc::clone(&done);
    let stepper = thread::spawn(move || {
        while !stepper_done.load(Ordering::Acquire) {
            host.step();
        }
        host
    });

    let mut expected = Vec::new();
    for s in submitters {
        expected.extend(s.join().unwrap());
    }
    done.store(true, Ordering::Release);
    let mut host = stepper.join().unwrap();

    // Flush: every waiting insert needs one tick to start and one to close.
    let deadline = (THREADS * PER_THREAD) as usize * 2 + 4;
    for _ in 0..deadline {
        if controller.pending_inserts() == 0 && controller.pending_removals() == 0 {
            break;
        }
        host.step();
    }
    assert_eq!(controller.pending_inserts(), 0);
    assert_eq!(controller.pending_removals(), 0);

    let mut counts: HashMap<CorrelationId, usize> = HashMap::new();
    for resp in sink.responses() {
        *counts.entry(resp.correlation_id).or_default() += 1;
    }
    for id in &expected {
        assert_eq!(counts.get(&CorrelationId(*id)), Some(&1), "request {id}");
    }
    assert_eq!(counts.len(), expected.len());
}

#[test]
fn realtime_host_answers_every_submitted_request() {
    let world = MockWorld::new(Duration::from_millis(1));
    let lookup = world.lookup();
    let config = HostConfig {
        step_rate_hz: 2000.0,
        request_channel_capacity: 16,
        ..HostConfig::default()
    };
    let host = RealtimeHost::new(world, lookup, config).unwrap();

    let mut submitters = Vec::new();
    for t in 0..THREADS {
        let sender = host.sender();
        submitters.push(thread::spawn(move || {
            let mut inserts = 0usize;
            for k in 0..PER_THREAD {
                let request = if k % 4 == 3 {
                    delete_request(id(t, k), &format!("rt{t}-{}", k - 3))
                } else {
                    inserts += 1;
                    insert_request(id(t, k), &format!("rt{t}-{k}"))
                };
                loop {
                    match sender.submit(request.clone()) {
                        Ok(()) => break,
                        Err(SubmitError::ChannelFull) => thread::yield_now(),
                        Err(SubmitError::Shutdown) => panic!("host shut down early"),
                    }
                }
                if k % 8 == 0 {
                    let _ = sender.report_health(format!("rt{t}-0"), k > 0);
                }
            }
            inserts
        }));
    }
    let inserts: usize = submitters.into_iter().map(|s| s.join().unwrap()).sum();
    let total = (THREADS * PER_THREAD) as usize;

    let mut counts: HashMap<CorrelationId, usize> = HashMap::new();
    let mut insert_responses = 0;
    let deadline = Instant::now() + Duration::from_secs(30);
    while counts.values().sum::<usize>() < total && Instant::now() < deadline {
        if let Ok(resp) = host.responses().recv_timeout(Duration::from_millis(100)) {
            if resp.kind == RequestKind::Insert {
                insert_responses += 1;
            }
            *counts.entry(resp.correlation_id).or_default() += 1;
        }
    }

    assert_eq!(counts.len(), total);
    assert!(counts.values().all(|&c| c == 1));
    assert_eq!(insert_responses, inserts);

    let metrics = host.metrics();
    assert_eq!(metrics.inserts_completed as usize, inserts);
    assert!(host.into_world().is_some());
}

//! Revolve realtime demo: spawn and retire a small population.
//!
//! Demonstrates:
//!   1. Starting a `RealtimeHost` over an in-memory world
//!   2. Submitting insert requests with and without a lifespan
//!   3. A health monitor declaring an entity dead
//!   4. Deleting an entity by name and reading the responses
//!   5. Shutting down and inspecting the recovered world
//!
//! Run with:
//!   RUST_LOG=revolve_world=debug cargo run --example realtime_demo

use std::time::Duration;

use revolve_core::{CorrelationId, Outcome, SessionId};
use revolve_test_utils::{delete_request, insert_request, insert_request_with_lifespan, MockWorld};
use revolve_world::{HostConfig, RealtimeHost};
use tracing_subscriber::{fmt, EnvFilter};

const SESSION: SessionId = SessionId(1);

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    let world = MockWorld::new(Duration::from_millis(10));
    let lookup = world.lookup();
    let config = HostConfig {
        step_rate_hz: 200.0,
        ..HostConfig::default()
    };
    let host = RealtimeHost::new(world, lookup, config).expect("valid host config");
    let sender = host.sender();

    // ─── Populate ───────────────────────────────────────────────
    for i in 0..4 {
        let name = format!("robot_{i}");
        let request = if i == 3 {
            insert_request_with_lifespan(i, &name, Duration::from_millis(200))
        } else {
            insert_request(i, &name)
        };
        sender.submit(request.with_origin(SESSION)).expect("submit insert");
    }
    // A duplicate, rejected immediately.
    sender
        .submit(insert_request(10, "robot_0").with_origin(SESSION))
        .expect("submit duplicate");

    collect(&host, 5);

    // ─── Retire ─────────────────────────────────────────────────
    sender.report_health("robot_1", true).expect("report death");
    sender
        .submit(delete_request(20, "robot_2").with_origin(SESSION))
        .expect("submit delete");
    sender
        .submit(delete_request(21, "nobody").with_origin(SESSION))
        .expect("submit delete");
    collect(&host, 2);

    // Let robot_3's lifespan run out.
    host.wait_ticks(60, Duration::from_secs(5));

    println!("metrics: {:#?}", host.metrics());
    let world = host.into_world().expect("step thread joined");
    println!(
        "survivors: robot_0={} robot_1={} robot_2={} robot_3={}",
        world.contains("robot_0"),
        world.contains("robot_1"),
        world.contains("robot_2"),
        world.contains("robot_3"),
    );
}

fn collect(host: &RealtimeHost<MockWorld>, n: usize) {
    for _ in 0..n {
        match host.responses().recv_timeout(Duration::from_secs(5)) {
            Ok(resp) => {
                let CorrelationId(id) = resp.correlation_id;
                match (resp.outcome, resp.payload) {
                    (Outcome::Success, Some(inserted)) => println!(
                        "#{id} {:?}: {} created at {}",
                        resp.kind, inserted.info.name, inserted.time
                    ),
                    (Outcome::Success, None) => println!("#{id} {:?}: ok", resp.kind),
                    (Outcome::Error(reason), _) => println!("#{id} {:?}: {reason}", resp.kind),
                }
            }
            Err(_) => {
                println!("timed out waiting for responses");
                return;
            }
        }
    }
}

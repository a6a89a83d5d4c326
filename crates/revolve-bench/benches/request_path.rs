//! Criterion micro-benchmarks for request ingestion.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use revolve_bench::{entity_names, reference_profile};
use revolve_test_utils::{delete_request, insert_request};

/// Accept 256 inserts into an empty table.
fn bench_accept_inserts(c: &mut Criterion) {
    let names = entity_names("new", 256);
    c.bench_function("accept_256_inserts", |b| {
        b.iter_batched(
            || reference_profile(1000, 1024),
            |(world, controller)| {
                for (i, name) in names.iter().enumerate() {
                    let _ = controller.dispatch(insert_request(i as i64, name));
                }
                black_box((world, controller))
            },
            BatchSize::SmallInput,
        );
    });
}

/// Reject an insert whose name is already live.
fn bench_reject_duplicate(c: &mut Criterion) {
    let (_world, controller) = reference_profile(1000, 1024);
    c.bench_function("reject_live_duplicate", |b| {
        b.iter(|| black_box(controller.dispatch(insert_request(1, "live_500")).is_err()));
    });
}

/// Queue 256 deletes for live entities.
fn bench_queue_deletes(c: &mut Criterion) {
    let names = entity_names("live", 256);
    c.bench_function("queue_256_deletes", |b| {
        b.iter_batched(
            || reference_profile(256, 1024),
            |(world, controller)| {
                for (i, name) in names.iter().enumerate() {
                    let _ = controller.dispatch(delete_request(i as i64, name));
                }
                black_box((world, controller))
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_accept_inserts,
    bench_reject_duplicate,
    bench_queue_deletes
);
criterion_main!(benches);

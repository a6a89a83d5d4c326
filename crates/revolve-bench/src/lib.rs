//! Benchmark profiles for the Revolve lifecycle controller.
//!
//! - [`reference_profile`]: a world with a live population and a controller
//!   publishing into a discarding sink
//! - [`entity_names`]: deterministic entity names for request streams

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;
use std::time::Duration;

use revolve_core::{PublishError, Response, ResponseSink};
use revolve_test_utils::MockWorld;
use revolve_world::{ControllerConfig, LifecycleController};

/// Response sink that drops everything, so benchmarks measure the
/// controller rather than a channel.
#[derive(Debug, Default)]
pub struct DiscardSink;

impl ResponseSink for DiscardSink {
    fn publish(&self, _response: Response) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Build a world with `population` live entities named by
/// [`entity_names`], plus a controller sized to hold `capacity` pending
/// requests of each kind.
pub fn reference_profile(population: usize, capacity: usize) -> (MockWorld, LifecycleController) {
    let mut world = MockWorld::new(Duration::from_millis(1));
    for name in entity_names("live", population) {
        world.spawn(&name);
    }
    let config = ControllerConfig {
        max_pending_inserts: capacity.max(1),
        max_pending_removals: capacity.max(1),
    };
    let controller = LifecycleController::new(&config, world.lookup(), Arc::new(DiscardSink))
        .expect("benchmark profile config is valid");
    (world, controller)
}

/// `count` distinct names of the form `{prefix}_{i}`.
pub fn entity_names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}_{i}")).collect()
}

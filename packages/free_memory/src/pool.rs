//! The allocator pool: many threads retaining random buffers until the heap runs low.

use std::fmt;
use std::num::NonZero;
use std::panic;
use std::thread;

use heap_budget::HeapSnapshot;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

use crate::output::LineSink;
use crate::pal::Platform;
use crate::store::{Buffer, SharedStore};
use crate::{BUFFER_SIZE, RunError};

/// What one allocator worker did before it stopped.
///
/// The [`Display`][fmt::Display] implementation renders the `[done]`-tagged report line that the
/// worker prints when it stops.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkerReport {
    worker_index: usize,
    iterations: u64,
    final_snapshot: HeapSnapshot,
}

impl WorkerReport {
    /// Index of the worker in the pool, starting from zero.
    #[must_use]
    pub const fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Number of buffers the worker allocated and inserted.
    #[must_use]
    pub const fn iterations(&self) -> u64 {
        self.iterations
    }

    /// The heap snapshot on which the worker decided to stop.
    #[must_use]
    pub const fn final_snapshot(&self) -> HeapSnapshot {
        self.final_snapshot
    }
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[done] {}", self.final_snapshot)
    }
}

/// Runs `worker_count` allocator workers and waits for all of them to stop.
///
/// Every worker decides on its own when to stop, based on its own heap samples. There is no
/// shared stop flag, so workers that have not sampled yet keep allocating after another worker
/// has already observed the heap below `threshold_percentage`.
///
/// Each worker emits its `[done]` line into `sink` as it stops.
pub(crate) fn allocate_until_below(
    platform: &impl Platform,
    store: &SharedStore,
    sink: &impl LineSink,
    worker_count: NonZero<usize>,
    threshold_percentage: f64,
) -> Result<Vec<WorkerReport>, RunError> {
    // If a spawn fails, the workers already started still run to completion before the scope
    // returns the error.
    thread::scope(|scope| {
        let workers = (0..worker_count.get())
            .map(|worker_index| {
                thread::Builder::new()
                    .name(format!("allocator-{worker_index}"))
                    .spawn_scoped(scope, move || {
                        run_worker(worker_index, platform, store, sink, threshold_percentage)
                    })
                    .map_err(|source| RunError::SpawnWorker {
                        index: worker_index,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(worker_count = workers.len(), "allocator workers started");

        Ok(workers
            .into_iter()
            .map(|worker| {
                worker
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload))
            })
            .collect())
    })
}

fn run_worker(
    worker_index: usize,
    platform: &impl Platform,
    store: &SharedStore,
    sink: &impl LineSink,
    threshold_percentage: f64,
) -> WorkerReport {
    let mut rng = SmallRng::from_rng(&mut rand::rng());
    let mut iterations: u64 = 0;

    loop {
        let mut buffer: Buffer = Box::new([0; BUFFER_SIZE]);
        rng.fill_bytes(buffer.as_mut_slice());

        store.insert(rng.random(), buffer);
        iterations = iterations.saturating_add(1);

        let snapshot = platform.heap_snapshot();

        if snapshot.is_below(threshold_percentage) {
            let report = WorkerReport {
                worker_index,
                iterations,
                final_snapshot: snapshot,
            };

            sink.emit_line(&report);
            return report;
        }
    }
}

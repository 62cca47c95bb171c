//! Resolution of the command line input into the settings the workload runs with.

use std::num::NonZero;
use std::time::Duration;

use heap_budget::HeapLimits;

use crate::{ConfigError, RunInput};

/// Maximum heap size used when none is given on the command line.
pub const DEFAULT_MAX_HEAP_MIB: u64 = 2048;

/// Workers stop allocating once the free heap percentage falls below this value.
pub const FREE_HEAP_THRESHOLD_PERCENTAGE: f64 = 12.0;

/// Time between two heap reports once the allocation workload has finished.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Size of each buffer a worker allocates and retains.
pub const BUFFER_SIZE: usize = 1024;

/// How many allocator workers to start per available processor, unless overridden.
pub const WORKERS_PER_PROCESSOR: usize = 4;

/// Validated settings for one run of the workload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Config {
    limits: HeapLimits,
    worker_count: NonZero<usize>,
}

impl Config {
    /// Validates the input, filling in defaults.
    ///
    /// The default worker count is [`WORKERS_PER_PROCESSOR`] times `available_parallelism`.
    pub(crate) fn resolve(
        input: &RunInput,
        available_parallelism: NonZero<usize>,
    ) -> Result<Self, ConfigError> {
        let initial_heap_mib = input.initial_heap_mib.unwrap_or(input.max_heap_mib);
        let limits = HeapLimits::from_mib(input.max_heap_mib, initial_heap_mib)?;

        let worker_count = match input.workers {
            Some(workers) => NonZero::new(workers).ok_or(ConfigError::ZeroWorkers)?,
            None => default_worker_count(available_parallelism),
        };

        Ok(Self {
            limits,
            worker_count,
        })
    }

    pub(crate) const fn limits(&self) -> HeapLimits {
        self.limits
    }

    pub(crate) const fn worker_count(&self) -> NonZero<usize> {
        self.worker_count
    }
}

fn default_worker_count(available_parallelism: NonZero<usize>) -> NonZero<usize> {
    available_parallelism.saturating_mul(
        NonZero::new(WORKERS_PER_PROCESSOR).expect("constant is non-zero"),
    )
}

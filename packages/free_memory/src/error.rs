use std::io;

use heap_budget::LimitsError;
use thiserror::Error;

/// Errors in the settings supplied on the command line.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The heap sizes do not describe a usable heap.
    #[error(transparent)]
    Limits(#[from] LimitsError),

    /// At least one worker is needed to put pressure on the heap.
    #[error("worker count must be greater than zero")]
    ZeroWorkers,
}

/// Errors that stop the workload before it reaches the reporting phase.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The settings supplied on the command line were rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The operating system refused to start an allocator worker thread.
    #[error("failed to spawn allocator worker {index}: {source}")]
    SpawnWorker {
        /// Index of the worker that could not be started.
        index: usize,

        /// The underlying error reported by the operating system.
        #[source]
        source: io::Error,
    },
}

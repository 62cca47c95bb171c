#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Drives the heap towards exhaustion from many threads and reports heap usage while it does.
//!
//! The workload starts four allocator workers per available processor. Each worker keeps
//! allocating 1 KiB buffers of random bytes and retaining them in a shared concurrent map until
//! its own sample of the heap shows less than 12% of the maximum heap available. Once all
//! workers have stopped, the heap is reported every 5 seconds until the process is terminated.
//!
//! The heap is the one accounted by the budgeted global allocator from [`heap_budget`], which
//! this crate installs. Exceeding its maximum size aborts the process.
//!
//! This crate provides the core logic, exposed via the [`run`] function. The binary entry point
//! is in `main.rs`.

use std::convert::Infallible;

use heap_budget::{Allocator, HeapSnapshot};
use tracing::info;

use crate::output::{LineSink, StdoutLines};

mod config;
mod error;
mod output;
mod pal;
mod pool;
mod reporter;
mod store;
mod types;
mod workload;

pub use config::{
    BUFFER_SIZE, DEFAULT_MAX_HEAP_MIB, FREE_HEAP_THRESHOLD_PERCENTAGE, REPORT_INTERVAL,
    WORKERS_PER_PROCESSOR,
};
pub use error::*;
pub use pool::WorkerReport;
pub use reporter::Reporter;
pub use types::*;
pub use workload::Workload;

#[global_allocator]
pub(crate) static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

const END_OF_RUN_BANNER: &str = "\n\n\nEnd of run...now we expect to see actual used-memory value";

/// Core logic of the tool, extracted for testability.
///
/// Applies the heap limits, runs the allocator pool until every worker has stopped and then
/// reports the heap every [`REPORT_INTERVAL`] forever. Only returns if the workload cannot
/// be started.
#[doc(hidden)]
// Never returns on success - exercised through `exhaust_then_report` instead.
#[cfg_attr(test, mutants::skip)]
#[cfg_attr(coverage_nightly, coverage(off))]
pub fn run(input: &RunInput) -> Result<Infallible, RunError> {
    let workload = Workload::new(input)?;

    exhaust_then_report(&workload, workload.reporter(REPORT_INTERVAL), &StdoutLines)?;

    unreachable!("the reporter yields heap snapshots forever")
}

/// Runs the allocator pool to completion, then emits the end-of-run banner followed by one
/// line per snapshot in `reports`.
fn exhaust_then_report(
    workload: &Workload,
    reports: impl IntoIterator<Item = HeapSnapshot>,
    sink: &impl LineSink,
) -> Result<(), RunError> {
    workload.allocate_until_exhausted_into(sink)?;

    sink.emit_line(&END_OF_RUN_BANNER);

    info!("reporting heap usage until terminated");

    for snapshot in reports {
        sink.emit_line(&snapshot);
    }

    Ok(())
}

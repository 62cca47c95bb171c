#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the free_memory tool.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - the process only ends when it is killed.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use argh::FromArgs;
use free_memory::{DEFAULT_MAX_HEAP_MIB, RunInput, run};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

/// Allocates memory from many threads until less than 12% of the heap is available, then
/// reports heap usage every 5 seconds until terminated.
#[derive(FromArgs)]
struct Args {
    /// maximum heap size in MiB (default: 2048)
    #[argh(option, default = "DEFAULT_MAX_HEAP_MIB")]
    max_heap_mib: u64,

    /// heap size in MiB that is committed from the start (default: the maximum heap size)
    #[argh(option)]
    initial_heap_mib: Option<u64>,

    /// number of allocator worker threads (default: 4 per available processor)
    #[argh(option)]
    workers: Option<usize>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    let args: Args = argh::from_env();

    // Diagnostics go to stderr; stdout carries only the heap report lines.
    diagnostics_subscriber(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        io::stderr,
        io::stderr().is_terminal(),
    )
    .init();

    let input = RunInput {
        max_heap_mib: args.max_heap_mib,
        initial_heap_mib: args.initial_heap_mib,
        workers: args.workers,
    };

    match run(&input) {
        Ok(never) => match never {},
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the diagnostic log subscriber. Color codes are only emitted when `ansi` is set, so
/// that redirected logs stay plain text.
fn diagnostics_subscriber<W>(
    filter: EnvFilter,
    make_writer: W,
    ansi: bool,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_ansi(ansi)
        .with_thread_names(true)
        .finish()
}

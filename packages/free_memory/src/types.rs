// Public API types for free_memory.
//
// These types are used by main.rs and exposed via the crate's public API.

/// Input parameters for the `run` function.
///
/// This is the parsed command line that the core logic operates on. Values are validated when
/// the workload starts.
#[doc(hidden)]
#[derive(Clone, Debug, Eq, PartialEq)]
#[allow(
    clippy::exhaustive_structs,
    reason = "This is a hidden struct for internal/test use only"
)]
pub struct RunInput {
    /// Maximum heap size in MiB.
    pub max_heap_mib: u64,
    /// Initially committed heap size in MiB. Defaults to the maximum heap size.
    pub initial_heap_mib: Option<u64>,
    /// Number of allocating worker threads. Defaults to four per available processor.
    pub workers: Option<usize>,
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            max_heap_mib: crate::DEFAULT_MAX_HEAP_MIB,
            initial_heap_mib: None,
            workers: None,
        }
    }
}

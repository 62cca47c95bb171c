// Platform trait abstraction for mocking in tests.

use std::fmt::Debug;
use std::num::NonZero;

use heap_budget::{HeapLimits, HeapSnapshot};

/// Abstraction over the process-wide facilities the allocation workload depends on.
///
/// This trait is automatically mocked by mockall in test builds, generating `MockPlatform`.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Applies the maximum and initial heap sizes to the global heap.
    fn apply_limits(&self, limits: HeapLimits);

    /// Takes a snapshot of the global heap at this point in time.
    fn heap_snapshot(&self) -> HeapSnapshot;

    /// Returns the number of processors this process may run on in parallel.
    ///
    /// Falls back to one if the platform cannot tell.
    fn available_parallelism(&self) -> NonZero<usize>;
}

// Real platform implementation that delegates to the global allocator and many_cpus.
//
// This is a trivial forwarder and is excluded from coverage and mutation testing.

use std::num::NonZero;

use heap_budget::{HeapLimits, HeapSnapshot};
use many_cpus::SystemHardware;

use crate::ALLOCATOR;
use crate::pal::Platform;

/// Real platform implementation backed by the budgeted global allocator.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetPlatform;

// Trivial forwarder to system APIs - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Platform for BuildTargetPlatform {
    fn apply_limits(&self, limits: HeapLimits) {
        ALLOCATOR.apply_limits(limits);
    }

    fn heap_snapshot(&self) -> HeapSnapshot {
        ALLOCATOR.snapshot()
    }

    fn available_parallelism(&self) -> NonZero<usize> {
        // Processors this process may run on, after affinity and quota are applied.
        NonZero::new(SystemHardware::current().processors().len())
            .unwrap_or(NonZero::<usize>::MIN)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parallelism_counts_processors_available_to_process() {
        let platform = BuildTargetPlatform;

        assert_eq!(
            platform.available_parallelism().get(),
            SystemHardware::current().processors().len()
        );
    }
}

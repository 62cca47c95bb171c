use std::time::Duration;

use heap_budget::HeapSnapshot;
use tracing::info;

use crate::config::Config;
use crate::output::{LineSink, StdoutLines};
use crate::pal::{Platform, PlatformFacade};
use crate::pool::allocate_until_below;
use crate::store::SharedStore;
use crate::{FREE_HEAP_THRESHOLD_PERCENTAGE, Reporter, RunError, RunInput, WorkerReport};

/// The heap pressure workload: validated settings plus the store that retains everything the
/// workers allocate.
///
/// Creating a workload applies the heap limits to the global heap. The retained buffers are
/// released only when the workload is dropped.
#[doc(hidden)]
#[derive(Debug)]
pub struct Workload {
    platform: PlatformFacade,
    config: Config,
    store: SharedStore,
}

impl Workload {
    /// Validates the input and applies the heap limits to the global heap.
    ///
    /// # Errors
    ///
    /// Returns an error if the input does not describe a usable configuration.
    pub fn new(input: &RunInput) -> Result<Self, RunError> {
        Self::with_platform(input, PlatformFacade::target())
    }

    pub(crate) fn with_platform(
        input: &RunInput,
        platform: PlatformFacade,
    ) -> Result<Self, RunError> {
        let config = Config::resolve(input, platform.available_parallelism())?;

        info!(
            max_heap_bytes = config.limits().max_bytes(),
            initial_heap_bytes = config.limits().initial_bytes(),
            worker_count = config.worker_count().get(),
            threshold_percentage = FREE_HEAP_THRESHOLD_PERCENTAGE,
            "applying heap limits"
        );

        platform.apply_limits(config.limits());

        Ok(Self {
            platform,
            config,
            store: SharedStore::new(),
        })
    }

    /// Runs the allocator pool until every worker has observed the free heap percentage
    /// below the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be started.
    pub fn allocate_until_exhausted(&self) -> Result<Vec<WorkerReport>, RunError> {
        self.allocate_until_exhausted_into(&StdoutLines)
    }

    /// Like [`allocate_until_exhausted()`][Self::allocate_until_exhausted] but emits the
    /// `[done]` lines into `sink`.
    pub(crate) fn allocate_until_exhausted_into(
        &self,
        sink: &impl LineSink,
    ) -> Result<Vec<WorkerReport>, RunError> {
        info!(
            worker_count = self.config.worker_count().get(),
            "starting allocator workers"
        );

        let reports = allocate_until_below(
            &self.platform,
            &self.store,
            sink,
            self.config.worker_count(),
            FREE_HEAP_THRESHOLD_PERCENTAGE,
        )?;

        for report in &reports {
            info!(
                worker_index = report.worker_index(),
                iterations = report.iterations(),
                free_heap_percentage = report.final_snapshot().free_heap_percentage(),
                "allocator worker stopped"
            );
        }

        info!(
            retained_entries = self.store.len(),
            "all allocator workers stopped"
        );

        Ok(reports)
    }

    /// Number of distinct keys the store currently retains.
    #[must_use]
    pub fn retained_entries(&self) -> usize {
        self.store.len()
    }

    /// Takes a snapshot of the global heap at this point in time.
    #[must_use]
    pub fn heap_snapshot(&self) -> HeapSnapshot {
        self.platform.heap_snapshot()
    }

    /// Returns an endless sequence of heap snapshots spaced by `interval`.
    #[must_use]
    pub fn reporter(&self, interval: Duration) -> Reporter<'_> {
        Reporter::new(&self.platform, interval)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;

    use heap_budget::{BYTES_PER_MIB, HeapLimits};
    use mockall::predicate::eq;

    use super::*;
    use crate::ConfigError;
    use crate::output::CapturedLines;
    use crate::pal::MockPlatform;

    #[test]
    fn new_workload_applies_limits_once() {
        let mut mock = MockPlatform::new();
        mock.expect_available_parallelism()
            .returning(|| NonZero::new(2).unwrap());
        mock.expect_apply_limits()
            .with(eq(HeapLimits::from_mib(64, 16).unwrap()))
            .times(1)
            .return_const(());

        let input = RunInput {
            max_heap_mib: 64,
            initial_heap_mib: Some(16),
            workers: None,
        };

        let workload = Workload::with_platform(&input, PlatformFacade::from_mock(mock)).unwrap();

        assert_eq!(workload.config.worker_count().get(), 8);
        assert_eq!(workload.retained_entries(), 0);
    }

    #[test]
    fn invalid_input_does_not_touch_heap() {
        let mut mock = MockPlatform::new();
        mock.expect_available_parallelism()
            .returning(|| NonZero::new(2).unwrap());
        mock.expect_apply_limits().never();

        let input = RunInput {
            workers: Some(0),
            ..RunInput::default()
        };

        let result = Workload::with_platform(&input, PlatformFacade::from_mock(mock));

        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::ZeroWorkers))
        ));
    }

    #[test]
    fn workers_default_to_four_per_processor() {
        let mut mock = MockPlatform::new();
        mock.expect_available_parallelism()
            .returning(|| NonZero::new(8).unwrap());
        mock.expect_apply_limits().return_const(());
        mock.expect_heap_snapshot()
            .returning(|| HeapSnapshot::from_counters(100, 100, 95));

        let workload =
            Workload::with_platform(&RunInput::default(), PlatformFacade::from_mock(mock)).unwrap();

        let lines = CapturedLines::default();
        let reports = workload.allocate_until_exhausted_into(&lines).unwrap();

        assert_eq!(reports.len(), 32);
        assert_eq!(lines.lines().len(), 32);
        assert!(workload.retained_entries() >= 1);
    }

    #[test]
    fn heap_snapshot_comes_from_platform() {
        let mut mock = MockPlatform::new();
        mock.expect_available_parallelism()
            .returning(|| NonZero::new(1).unwrap());
        mock.expect_apply_limits().return_const(());
        mock.expect_heap_snapshot()
            .returning(|| HeapSnapshot::from_counters(4 * BYTES_PER_MIB, BYTES_PER_MIB, 0));

        let workload =
            Workload::with_platform(&RunInput::default(), PlatformFacade::from_mock(mock)).unwrap();

        assert_eq!(workload.heap_snapshot().available_heap(), 4 * BYTES_PER_MIB);
        assert_eq!(
            workload
                .reporter(Duration::ZERO)
                .next_report()
                .total_heap(),
            BYTES_PER_MIB
        );
    }
}

use std::thread;
use std::time::Duration;

use heap_budget::HeapSnapshot;

use crate::pal::{Platform, PlatformFacade};

/// Samples the heap at a fixed interval, forever.
///
/// The first snapshot is taken immediately; every later one after sleeping for the interval.
/// As an [`Iterator`], the reporter never returns `None`.
#[doc(hidden)]
#[derive(Debug)]
pub struct Reporter<'a> {
    platform: &'a PlatformFacade,
    interval: Duration,
    started: bool,
}

impl<'a> Reporter<'a> {
    pub(crate) const fn new(platform: &'a PlatformFacade, interval: Duration) -> Self {
        Self {
            platform,
            interval,
            started: false,
        }
    }

    /// Waits until the next report is due and takes a heap snapshot.
    pub fn next_report(&mut self) -> HeapSnapshot {
        if self.started {
            thread::sleep(self.interval);
        }

        self.started = true;
        self.platform.heap_snapshot()
    }
}

impl Iterator for Reporter<'_> {
    type Item = HeapSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_report())
    }
}

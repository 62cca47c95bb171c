//! Point-in-time heap statistics and their report line.

use std::fmt;

use crate::BYTES_PER_MIB;

/// A point-in-time view of the heap.
///
/// The snapshot stores the maximum, committed and free heap sizes. Used and available heap, as
/// well as the free heap percentage, are derived from those on demand:
///
/// * `used = total - free`
/// * `available = free + (max - total)`
/// * `free_heap_percentage = 100 * available / max`
///
/// A snapshot always satisfies `free <= total <= max`.
///
/// The [`Display`][fmt::Display] implementation renders the fixed-layout report line, with byte
/// counts in mebibytes (rounded half to even) and the percentage with two decimals.
///
/// # Examples
///
/// ```
/// use heap_budget::{BYTES_PER_MIB, HeapSnapshot};
///
/// const MIB: u64 = BYTES_PER_MIB;
///
/// let snapshot = HeapSnapshot::from_counters(100 * MIB, 80 * MIB, 70 * MIB);
///
/// assert_eq!(snapshot.free_heap(), 10 * MIB);
/// assert_eq!(snapshot.available_heap(), 30 * MIB);
/// assert_eq!(
///     snapshot.to_string(),
///     "runtime.maxMemory=100M, runtime.totalMemory=80M, runtime.freeMemory=10M, \
///      runtime.usedMemory=70M, runTime.availableMemory=30M, freeHeapPercentage=30.00"
/// );
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeapSnapshot {
    max_heap: u64,
    total_heap: u64,
    free_heap: u64,
}

impl HeapSnapshot {
    /// Builds a snapshot from raw allocator counters.
    ///
    /// The counters may have been read at slightly different moments while other threads were
    /// allocating, so they are clamped into a consistent view: the committed heap is raised to
    /// cover the live bytes and lowered to the maximum, and live bytes are capped at the
    /// committed heap.
    #[must_use]
    pub fn from_counters(max_heap: u64, committed_heap: u64, live_bytes: u64) -> Self {
        let total_heap = committed_heap.max(live_bytes).min(max_heap);
        let used_heap = live_bytes.min(total_heap);

        Self {
            max_heap,
            total_heap,
            free_heap: total_heap
                .checked_sub(used_heap)
                .expect("used heap was capped at total heap above"),
        }
    }

    /// The heap size the allocator is permitted to grow to.
    #[must_use]
    pub const fn max_heap(&self) -> u64 {
        self.max_heap
    }

    /// The heap size currently committed.
    #[must_use]
    pub const fn total_heap(&self) -> u64 {
        self.total_heap
    }

    /// Committed heap that is not occupied by live allocations.
    #[must_use]
    pub const fn free_heap(&self) -> u64 {
        self.free_heap
    }

    /// Committed heap occupied by live allocations.
    #[must_use]
    pub const fn used_heap(&self) -> u64 {
        self.total_heap
            .checked_sub(self.free_heap)
            .expect("free heap never exceeds total heap")
    }

    /// Free committed heap plus the headroom the heap may still grow into.
    #[must_use]
    pub const fn available_heap(&self) -> u64 {
        let headroom = self
            .max_heap
            .checked_sub(self.total_heap)
            .expect("total heap never exceeds max heap");

        self.free_heap
            .checked_add(headroom)
            .expect("available heap is at most max heap")
    }

    /// Available heap as a percentage of the maximum heap size.
    ///
    /// A heap with a maximum size of zero has nothing available, so this returns zero for it.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "heap sizes stay far below 2^53 bytes, a percentage tolerates any rounding"
    )]
    pub fn free_heap_percentage(&self) -> f64 {
        if self.max_heap == 0 {
            return 0.0;
        }

        100.0 * self.available_heap() as f64 / self.max_heap as f64
    }

    /// Whether the free heap percentage has fallen below `threshold_percentage`.
    #[must_use]
    pub fn is_below(&self, threshold_percentage: f64) -> bool {
        self.free_heap_percentage() < threshold_percentage
    }
}

impl fmt::Display for HeapSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runtime.maxMemory={}M, runtime.totalMemory={}M, runtime.freeMemory={}M, \
             runtime.usedMemory={}M, runTime.availableMemory={}M, freeHeapPercentage={:.2}",
            bytes_to_mib(self.max_heap),
            bytes_to_mib(self.total_heap),
            bytes_to_mib(self.free_heap),
            bytes_to_mib(self.used_heap()),
            bytes_to_mib(self.available_heap()),
            self.free_heap_percentage()
        )
    }
}

/// Converts a byte count to whole mebibytes, rounding half to even.
///
/// # Examples
///
/// ```
/// use heap_budget::bytes_to_mib;
///
/// assert_eq!(bytes_to_mib(1024 * 1024), 1);
/// assert_eq!(bytes_to_mib(1024 * 1024 + 1024 * 512), 2);
/// assert_eq!(bytes_to_mib(1024 * 512), 0);
/// ```
#[must_use]
pub fn bytes_to_mib(bytes: u64) -> u64 {
    let whole = bytes
        .checked_div(BYTES_PER_MIB)
        .expect("divisor is a non-zero constant");
    let remainder = bytes
        .checked_rem(BYTES_PER_MIB)
        .expect("divisor is a non-zero constant");
    let half = BYTES_PER_MIB / 2;

    let round_up = remainder > half || (remainder == half && whole % 2 == 1);

    if round_up {
        whole.checked_add(1).expect("whole is at most u64::MAX / 2^20")
    } else {
        whole
    }
}

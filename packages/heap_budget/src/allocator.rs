//! Allocation wrapper that enforces a heap budget.

use std::alloc::{GlobalAlloc, Layout};
use std::fmt;
use std::sync::atomic::{self, AtomicU64};

use crate::{BYTES_PER_MIB, HeapLimits, HeapSnapshot};

/// The committed heap grows in steps of this many bytes.
pub const COMMIT_GRANULE_BYTES: u64 = BYTES_PER_MIB;

/// A memory allocator that accounts for live bytes and refuses to grow past a maximum heap size.
///
/// This allocator wraps any [`GlobalAlloc`] implementation. Every allocation is first reserved
/// against the maximum heap size; if the reservation would exceed it, the allocation is refused
/// by returning a null pointer and the inner allocator is never called. Successful allocations
/// also grow the committed heap, in [`COMMIT_GRANULE_BYTES`] steps, so that it covers all live
/// bytes. The committed heap never shrinks.
///
/// Until [`apply_limits()`][Self::apply_limits] is called, the maximum heap size is unlimited.
///
/// # Examples
///
/// ```rust
/// use heap_budget::Allocator;
///
/// #[global_allocator]
/// static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();
/// ```
pub struct Allocator<A: GlobalAlloc> {
    inner: A,

    live_bytes: AtomicU64,
    committed_bytes: AtomicU64,
    max_bytes: AtomicU64,
}

impl<A: GlobalAlloc> fmt::Debug for Allocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("inner", &"<allocator>")
            .field("live_bytes", &self.live_bytes)
            .field("committed_bytes", &self.committed_bytes)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl Allocator<std::alloc::System> {
    /// Creates a new budgeted allocator using the system's default allocator.
    #[must_use]
    #[inline]
    pub const fn system() -> Self {
        Self::new(std::alloc::System)
    }
}

impl<A: GlobalAlloc> Allocator<A> {
    /// Creates a new budgeted allocator that forwards to the provided allocator.
    #[must_use]
    #[inline]
    pub const fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            live_bytes: AtomicU64::new(0),
            committed_bytes: AtomicU64::new(0),
            max_bytes: AtomicU64::new(u64::MAX),
        }
    }

    /// Applies the maximum and initial heap sizes.
    ///
    /// The committed heap is raised to the initial size and lowered to the maximum size if it
    /// had already grown beyond it. Live bytes are never affected; allocations made before the
    /// limits were applied stay valid even if they exceed the new maximum.
    pub fn apply_limits(&self, limits: HeapLimits) {
        // Relaxed is sufficient: readers only need eventual visibility of the new limits.
        self.max_bytes
            .store(limits.max_bytes(), atomic::Ordering::Relaxed);
        self.committed_bytes
            .fetch_min(limits.max_bytes(), atomic::Ordering::Relaxed);
        self.committed_bytes
            .fetch_max(limits.initial_bytes(), atomic::Ordering::Relaxed);
    }

    /// Takes a snapshot of the heap counters at this point in time.
    #[must_use]
    pub fn snapshot(&self) -> HeapSnapshot {
        // An allocation in flight may have bumped live bytes but not yet the committed heap.
        // The snapshot constructor clamps such a torn read into a consistent view.
        let live_bytes = self.live_bytes.load(atomic::Ordering::Relaxed);
        let committed_bytes = self.committed_bytes.load(atomic::Ordering::Relaxed);
        let max_bytes = self.max_bytes.load(atomic::Ordering::Relaxed);

        HeapSnapshot::from_counters(max_bytes, committed_bytes, live_bytes)
    }

    /// Bytes currently held by live allocations.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(atomic::Ordering::Relaxed)
    }

    /// Reserves `bytes` against the maximum heap size, growing the committed heap as needed.
    ///
    /// Returns `false` if the reservation would exceed the maximum heap size, in which case
    /// nothing was reserved.
    fn reserve(&self, bytes: u64) -> bool {
        let max_bytes = self.max_bytes.load(atomic::Ordering::Relaxed);

        let previous = self.live_bytes.fetch_add(bytes, atomic::Ordering::Relaxed);

        let Some(live_bytes) = previous.checked_add(bytes).filter(|live| *live <= max_bytes)
        else {
            self.release(bytes);
            return false;
        };

        self.commit(live_bytes, max_bytes);
        true
    }

    fn release(&self, bytes: u64) {
        self.live_bytes.fetch_sub(bytes, atomic::Ordering::Relaxed);
    }

    fn commit(&self, live_bytes: u64, max_bytes: u64) {
        let target = live_bytes
            .div_ceil(COMMIT_GRANULE_BYTES)
            .saturating_mul(COMMIT_GRANULE_BYTES)
            .min(max_bytes);

        self.committed_bytes
            .fetch_max(target, atomic::Ordering::Relaxed);
    }
}

fn size_as_u64(size: usize) -> u64 {
    size.try_into().expect("usize always fits into u64")
}

// SAFETY: We delegate all allocation operations to the underlying allocator,
// which already implements GlobalAlloc safely, while adding budget accounting.
unsafe impl<A: GlobalAlloc> GlobalAlloc for Allocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let size = size_as_u64(layout.size());

        if !self.reserve(size) {
            return std::ptr::null_mut();
        }

        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        let ptr = unsafe { self.inner.alloc(layout) };

        if ptr.is_null() {
            self.release(size);
        }

        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        unsafe { self.inner.dealloc(ptr, layout) }

        self.release(size_as_u64(layout.size()));
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let size = size_as_u64(layout.size());

        if !self.reserve(size) {
            return std::ptr::null_mut();
        }

        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };

        if ptr.is_null() {
            self.release(size);
        }

        ptr
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let old_size = size_as_u64(layout.size());
        let new_size_u64 = size_as_u64(new_size);

        if let Some(growth) = new_size_u64.checked_sub(old_size) {
            if !self.reserve(growth) {
                return std::ptr::null_mut();
            }

            // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
            let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };

            if new_ptr.is_null() {
                self.release(growth);
            }

            new_ptr
        } else {
            // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
            let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };

            if !new_ptr.is_null() {
                self.release(
                    old_size
                        .checked_sub(new_size_u64)
                        .expect("guarded by the growth branch above"),
                );
            }

            new_ptr
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::alloc::System;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    // Static assertions for thread safety
    static_assertions::assert_impl_all!(Allocator<System>: Send, Sync);

    const MIB: u64 = BYTES_PER_MIB;

    /// Allocates through `allocator` directly, without installing it as the global allocator.
    fn allocate(allocator: &Allocator<System>, size: usize) -> Option<(*mut u8, Layout)> {
        let layout = Layout::from_size_align(size, 8).unwrap();

        // SAFETY: Layout has a non-zero size in all callers.
        let ptr = unsafe { allocator.alloc(layout) };

        (!ptr.is_null()).then_some((ptr, layout))
    }

    fn deallocate(allocator: &Allocator<System>, (ptr, layout): (*mut u8, Layout)) {
        // SAFETY: The pointer was returned by `allocate()` with the same layout.
        unsafe { allocator.dealloc(ptr, layout) };
    }

    #[test]
    fn fresh_allocator_is_unlimited_and_empty() {
        let allocator = Allocator::system();
        let snapshot = allocator.snapshot();

        assert_eq!(snapshot.max_heap(), u64::MAX);
        assert_eq!(snapshot.total_heap(), 0);
        assert_eq!(snapshot.used_heap(), 0);
    }

    #[test]
    fn alloc_and_dealloc_track_live_bytes() {
        let allocator = Allocator::system();

        let first = allocate(&allocator, 1024).unwrap();
        let second = allocate(&allocator, 4096).unwrap();
        assert_eq!(allocator.live_bytes(), 5120);

        deallocate(&allocator, first);
        assert_eq!(allocator.live_bytes(), 4096);

        deallocate(&allocator, second);
        assert_eq!(allocator.live_bytes(), 0);
    }

    #[test]
    fn committed_heap_grows_in_granules_and_never_shrinks() {
        let allocator = Allocator::system();

        let small = allocate(&allocator, 10).unwrap();
        assert_eq!(allocator.snapshot().total_heap(), COMMIT_GRANULE_BYTES);

        let large = allocate(&allocator, 1_500_000).unwrap();
        assert_eq!(allocator.snapshot().total_heap(), 2 * COMMIT_GRANULE_BYTES);

        deallocate(&allocator, large);
        deallocate(&allocator, small);

        let snapshot = allocator.snapshot();
        assert_eq!(snapshot.total_heap(), 2 * COMMIT_GRANULE_BYTES);
        assert_eq!(snapshot.free_heap(), 2 * COMMIT_GRANULE_BYTES);
    }

    #[test]
    fn apply_limits_commits_initial_heap() {
        let allocator = Allocator::system();
        allocator.apply_limits(HeapLimits::new(64 * MIB, 16 * MIB).unwrap());

        let snapshot = allocator.snapshot();
        assert_eq!(snapshot.max_heap(), 64 * MIB);
        assert_eq!(snapshot.total_heap(), 16 * MIB);
        assert_eq!(snapshot.free_heap(), 16 * MIB);
        assert_eq!(snapshot.available_heap(), 64 * MIB);
    }

    #[test]
    fn apply_limits_caps_committed_heap_at_max() {
        let allocator = Allocator::system();

        let block = allocate(&allocator, 3 * MIB as usize).unwrap();
        deallocate(&allocator, block);
        assert_eq!(allocator.snapshot().total_heap(), 3 * MIB);

        allocator.apply_limits(HeapLimits::new(2 * MIB, 0).unwrap());
        assert_eq!(allocator.snapshot().total_heap(), 2 * MIB);
    }

    #[test]
    fn committed_heap_growth_stops_at_max() {
        let allocator = Allocator::system();
        allocator.apply_limits(HeapLimits::new(MIB + 100, 0).unwrap());

        let block = allocate(&allocator, MIB as usize + 50).unwrap();

        let snapshot = allocator.snapshot();
        assert_eq!(snapshot.total_heap(), MIB + 100);
        assert_eq!(snapshot.free_heap(), 50);

        deallocate(&allocator, block);
    }

    #[test]
    fn allocation_beyond_max_is_refused() {
        let allocator = Allocator::system();
        allocator.apply_limits(HeapLimits::new(4096, 0).unwrap());

        let fits = allocate(&allocator, 4000).unwrap();
        assert!(allocate(&allocator, 100).is_none());
        assert_eq!(allocator.live_bytes(), 4000);

        deallocate(&allocator, fits);
        let after_release = allocate(&allocator, 100).unwrap();
        assert_eq!(allocator.live_bytes(), 100);

        deallocate(&allocator, after_release);
    }

    #[test]
    fn realloc_accounts_for_growth_and_shrinkage() {
        let allocator = Allocator::system();
        let (ptr, layout) = allocate(&allocator, 1000).unwrap();

        // SAFETY: ptr was allocated by this allocator with this layout; new size is non-zero.
        let grown = unsafe { allocator.realloc(ptr, layout, 3000) };
        assert!(!grown.is_null());
        assert_eq!(allocator.live_bytes(), 3000);

        let grown_layout = Layout::from_size_align(3000, 8).unwrap();
        // SAFETY: grown was allocated by this allocator with grown_layout; new size is non-zero.
        let shrunk = unsafe { allocator.realloc(grown, grown_layout, 500) };
        assert!(!shrunk.is_null());
        assert_eq!(allocator.live_bytes(), 500);

        deallocate(
            &allocator,
            (shrunk, Layout::from_size_align(500, 8).unwrap()),
        );
        assert_eq!(allocator.live_bytes(), 0);
    }

    #[test]
    fn realloc_beyond_max_is_refused_and_keeps_original() {
        let allocator = Allocator::system();
        allocator.apply_limits(HeapLimits::new(2048, 0).unwrap());
        let (ptr, layout) = allocate(&allocator, 1024).unwrap();

        // SAFETY: ptr was allocated by this allocator with this layout; new size is non-zero.
        let grown = unsafe { allocator.realloc(ptr, layout, 4096) };
        assert!(grown.is_null());
        assert_eq!(allocator.live_bytes(), 1024);

        // The original block is still valid after a refused realloc.
        deallocate(&allocator, (ptr, layout));
        assert_eq!(allocator.live_bytes(), 0);
    }

    #[test]
    fn concurrent_allocations_are_all_accounted() {
        const THREADS: usize = 8;
        const BLOCKS_PER_THREAD: usize = 200;

        let allocator = Arc::new(Allocator::system());

        let handles = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                // Raw pointers are not Send, so the blocks travel back as addresses.
                thread::spawn(move || {
                    (0..BLOCKS_PER_THREAD)
                        .map(|_| allocate(&allocator, 1024).unwrap())
                        .map(|(ptr, layout)| (ptr as usize, layout))
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        let blocks = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(
            allocator.live_bytes(),
            (THREADS * BLOCKS_PER_THREAD * 1024) as u64
        );

        let snapshot = allocator.snapshot();
        assert!(snapshot.total_heap() >= snapshot.used_heap());

        for (address, layout) in blocks {
            deallocate(&allocator, (address as *mut u8, layout));
        }

        assert_eq!(allocator.live_bytes(), 0);
    }
}

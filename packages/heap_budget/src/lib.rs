//! Heap budget accounting for Rust processes.
//!
//! Rust programs have no managed heap with a configurable ceiling. This package provides one:
//! a global allocator wrapper that accounts for every live byte, tracks a committed heap size
//! that grows in fixed granules and refuses allocations that would exceed a configured maximum.
//!
//! The core functionality includes:
//! - [`Allocator`] - A memory allocator wrapper that enforces the budget and keeps the counters
//! - [`HeapLimits`] - The maximum and initially committed heap sizes
//! - [`HeapSnapshot`] - A point-in-time view of the heap counters, formatted as one report line
//!
//! # Usage
//!
//! ```
//! use heap_budget::{Allocator, HeapLimits};
//!
//! #[global_allocator]
//! static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();
//!
//! fn main() {
//!     let limits = HeapLimits::from_mib(512, 64).unwrap();
//!     ALLOCATOR.apply_limits(limits);
//!
//!     let _data = vec![0_u8; 1024];
//!
//!     println!("{}", ALLOCATOR.snapshot());
//! }
//! ```
//!
//! # Exhaustion
//!
//! An allocation that would push live bytes past the maximum heap size is refused by returning
//! a null pointer. Most callers then hit the global allocation error handler, which aborts the
//! process. Fallible APIs such as [`Vec::try_reserve`] observe the refusal as an error instead.
//!
//! # Miri compatibility
//!
//! Miri replaces the global allocator with its own logic, so you cannot execute code that
//! installs this allocator under Miri.

mod allocator;
mod limits;
mod snapshot;

pub use allocator::*;
pub use limits::*;
pub use snapshot::*;

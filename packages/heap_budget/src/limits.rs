use thiserror::Error;

/// Number of bytes in one mebibyte, the unit used for heap sizes in reports and configuration.
pub const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Errors that can occur when defining heap limits.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum LimitsError {
    /// A heap that can never hold a single byte cannot be used.
    #[error("maximum heap size must be greater than zero")]
    ZeroMaximum,

    /// The initially committed heap cannot be larger than the heap is ever allowed to grow.
    #[error("initial heap size {initial_bytes} bytes exceeds maximum heap size {max_bytes} bytes")]
    InitialExceedsMaximum {
        /// The requested initially committed size.
        initial_bytes: u64,

        /// The requested maximum size.
        max_bytes: u64,
    },

    /// The size in mebibytes does not fit into a byte count.
    #[error("heap size of {mib} MiB is too large to be expressed in bytes")]
    TooLarge {
        /// The requested size in mebibytes.
        mib: u64,
    },
}

/// The bounds within which the heap accounted by [`Allocator`][crate::Allocator] operates.
///
/// `max_bytes` is the hard ceiling: allocations that would push live bytes past it are refused.
/// `initial_bytes` is the heap size that is considered committed from the start, before any
/// growth is necessary.
///
/// # Examples
///
/// ```
/// use heap_budget::{BYTES_PER_MIB, HeapLimits};
///
/// let limits = HeapLimits::from_mib(2048, 256).unwrap();
///
/// assert_eq!(limits.max_bytes(), 2048 * BYTES_PER_MIB);
/// assert_eq!(limits.initial_bytes(), 256 * BYTES_PER_MIB);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeapLimits {
    max_bytes: u64,
    initial_bytes: u64,
}

impl HeapLimits {
    /// Creates heap limits from byte counts.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_bytes` is zero or `initial_bytes` is greater than `max_bytes`.
    pub const fn new(max_bytes: u64, initial_bytes: u64) -> Result<Self, LimitsError> {
        if max_bytes == 0 {
            return Err(LimitsError::ZeroMaximum);
        }

        if initial_bytes > max_bytes {
            return Err(LimitsError::InitialExceedsMaximum {
                initial_bytes,
                max_bytes,
            });
        }

        Ok(Self {
            max_bytes,
            initial_bytes,
        })
    }

    /// Creates heap limits from sizes in mebibytes.
    ///
    /// # Errors
    ///
    /// Returns an error if either size does not fit into a byte count, if the maximum is zero
    /// or if the initial size is greater than the maximum.
    pub fn from_mib(max_mib: u64, initial_mib: u64) -> Result<Self, LimitsError> {
        Self::new(mib_to_bytes(max_mib)?, mib_to_bytes(initial_mib)?)
    }

    /// The ceiling that live bytes may never exceed.
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// The heap size that is committed before any allocation takes place.
    #[must_use]
    pub const fn initial_bytes(&self) -> u64 {
        self.initial_bytes
    }
}

fn mib_to_bytes(mib: u64) -> Result<u64, LimitsError> {
    mib.checked_mul(BYTES_PER_MIB)
        .ok_or(LimitsError::TooLarge { mib })
}

// Facade that dispatches to either the real platform or a mock in tests.

use std::num::NonZero;
#[cfg(test)]
use std::sync::Arc;

use heap_budget::{HeapLimits, HeapSnapshot};

#[cfg(test)]
use crate::pal::MockPlatform;
use crate::pal::{BuildTargetPlatform, Platform};

/// Facade over platform operations, dispatching to real or mock implementation.
///
/// In production, this always uses `BuildTargetPlatform`. In tests, it can also wrap a
/// `MockPlatform` for controlled test scenarios.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    /// Real platform implementation.
    Target(&'static BuildTargetPlatform),

    /// Mock platform for testing.
    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

// Debug implementations have no API contract to test.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl std::fmt::Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(_) => f.debug_struct("PlatformFacade::Target").finish(),
            #[cfg(test)]
            Self::Mock(_) => f.debug_struct("PlatformFacade::Mock").finish(),
        }
    }
}

/// Static instance of the real platform for production use.
static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl PlatformFacade {
    /// Creates a facade using the real platform.
    pub(crate) const fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    /// Creates a facade wrapping a mock platform (test builds only).
    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Platform for PlatformFacade {
    fn apply_limits(&self, limits: HeapLimits) {
        match self {
            Self::Target(platform) => platform.apply_limits(limits),
            #[cfg(test)]
            Self::Mock(mock) => mock.apply_limits(limits),
        }
    }

    fn heap_snapshot(&self) -> HeapSnapshot {
        match self {
            Self::Target(platform) => platform.heap_snapshot(),
            #[cfg(test)]
            Self::Mock(mock) => mock.heap_snapshot(),
        }
    }

    fn available_parallelism(&self) -> NonZero<usize> {
        match self {
            Self::Target(platform) => platform.available_parallelism(),
            #[cfg(test)]
            Self::Mock(mock) => mock.available_parallelism(),
        }
    }
}

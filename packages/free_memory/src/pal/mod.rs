// Platform abstraction layer for free_memory.
//
// This module provides abstractions over the process-wide heap and the hardware parallelism so
// that the workload logic can be exercised against mocks. The pattern follows the three-layer
// approach: abstraction (trait) → facade (enum) → real implementation.

mod platform;

pub(crate) use platform::*;

use std::fmt;

use crate::BUFFER_SIZE;

/// One retained allocation.
pub(crate) type Buffer = Box<[u8; BUFFER_SIZE]>;

/// Keeps every buffer the workers insert alive, so the heap can only grow.
///
/// Workers insert concurrently without external locking. Entries are never read back or removed;
/// an insert under a key that is already present replaces the older buffer, which is released.
#[derive(Default)]
pub(crate) struct SharedStore {
    entries: scc::HashMap<i32, Buffer>,
}

impl fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedStore")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl SharedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: i32, buffer: Buffer) {
        _ = self.entries.upsert(key, buffer);
    }

    /// Number of distinct keys currently retained.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

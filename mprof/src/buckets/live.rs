use std::collections::HashMap;

use crate::domain::BucketId;

/// Maps live pointers to the bucket that allocated them
///
/// Entries are overwritten when the allocator reuses a pointer and are kept
/// after the matching free; the map holds bucket handles, never buckets.
#[derive(Debug, Default)]
pub struct LiveAllocations {
    by_ptr: HashMap<u64, BucketId>,
}

impl LiveAllocations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `ptr` with `bucket`, replacing any earlier association
    pub fn record(&mut self, ptr: u64, bucket: BucketId) {
        self.by_ptr.insert(ptr, bucket);
    }

    #[must_use]
    pub fn lookup(&self, ptr: u64) -> Option<BucketId> {
        self.by_ptr.get(&ptr).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_ptr.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_ptr.is_empty()
    }
}

use crate::domain::{Address, BucketId, StackTrace};

/// Number of hash slots used when no size is configured
pub const DEFAULT_HASH_SLOTS: usize = 179_999;

/// Fold one value into the running hash
fn mix(hash: u64, value: u64) -> u64 {
    let mut h = hash.wrapping_add(value);
    h = h.wrapping_add(h << 10);
    h ^ (h >> 6)
}

/// Bucket identity hash over the stack frames followed by the size
///
/// The exact sequence is part of the de-duplication contract, not just a
/// lookup hint: equal inputs must always land in the same slot.
#[must_use]
pub fn stack_hash(stack: &[Address], size: u64) -> u64 {
    let mut h = stack.iter().fold(0u64, |h, addr| mix(h, addr.0));
    h = mix(h, size);
    h = h.wrapping_add(h << 3);
    h ^ (h >> 11)
}

/// Aggregated statistics for one call-site
#[derive(Debug, Clone)]
pub struct Bucket {
    pub stack: StackTrace,
    pub requested_size: u64,
    pub hash: u64,
    pub alloc_objects: u64,
    pub alloc_bytes: u64,
    pub free_objects: u64,
    pub free_bytes: u64,
    /// Next bucket in the same hash slot
    next: Option<BucketId>,
}

impl Bucket {
    fn new(stack: StackTrace, requested_size: u64, hash: u64) -> Self {
        Self {
            stack,
            requested_size,
            hash,
            alloc_objects: 0,
            alloc_bytes: 0,
            free_objects: 0,
            free_bytes: 0,
            next: None,
        }
    }

    fn matches(&self, hash: u64, stack: &[Address], size: u64) -> bool {
        self.hash == hash
            && self.requested_size == size
            && self.stack.len() == stack.len()
            && self.stack.as_slice() == stack
    }

    pub fn record_alloc(&mut self, size: u64) {
        self.alloc_objects = self.alloc_objects.saturating_add(1);
        self.alloc_bytes = self.alloc_bytes.saturating_add(size);
    }

    pub fn record_free(&mut self, size: u64) {
        self.free_objects = self.free_objects.saturating_add(1);
        self.free_bytes = self.free_bytes.saturating_add(size);
    }
}

/// Owns every bucket; buckets are created on demand and never removed
#[derive(Debug)]
pub struct BucketTable {
    buckets: Vec<Bucket>,
    slots: Vec<Option<BucketId>>,
}

impl BucketTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_slots(DEFAULT_HASH_SLOTS)
    }

    /// Create a table with `slot_count` hash slots (at least one)
    #[must_use]
    pub fn with_slots(slot_count: usize) -> Self {
        Self { buckets: Vec::new(), slots: vec![None; slot_count.max(1)] }
    }

    /// Return the bucket for (`stack`, `size`), creating it on first sight
    ///
    /// The hash only narrows the search; identity is decided by comparing
    /// size, depth and every frame.
    pub fn find_or_create(&mut self, stack: &StackTrace, size: u64) -> BucketId {
        let hash = stack_hash(stack, size);
        let slot = self.slot_of(hash);

        let mut cursor = self.slots[slot];
        while let Some(id) = cursor {
            let bucket = &self.buckets[id.0];
            if bucket.matches(hash, stack, size) {
                return id;
            }
            cursor = bucket.next;
        }

        let id = BucketId(self.buckets.len());
        let mut bucket = Bucket::new(*stack, size, hash);
        bucket.next = self.slots[slot];
        self.slots[slot] = Some(id);
        self.buckets.push(bucket);
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    fn slot_of(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    #[must_use]
    pub fn get(&self, id: BucketId) -> &Bucket {
        &self.buckets[id.0]
    }

    pub fn get_mut(&mut self, id: BucketId) -> &mut Bucket {
        &mut self.buckets[id.0]
    }

    /// All buckets in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self::new()
    }
}

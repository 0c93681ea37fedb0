use crate::buckets::DEFAULT_HASH_SLOTS;

/// Tunables for a [`super::Profiler`] instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Number of hash slots in the bucket table
    pub hash_slots: usize,
    /// Begin in the `Active` state instead of waiting for `start`
    pub start_active: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self { hash_slots: DEFAULT_HASH_SLOTS, start_active: false }
    }
}

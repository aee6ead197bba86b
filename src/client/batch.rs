use crate::pipeline::entry::Entry;
use std::time::Duration;
use tokio::time::Instant;

/// Entries accumulated for a single push.
///
/// Owned by the shipping client's accumulation task only. `size` is measured
/// in bytes (see [`Entry::encoded_len`]).
#[derive(Debug)]
pub struct Batch {
    entries: Vec<Entry>,
    size: usize,
    created_at: Instant,
}

impl Batch {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            size: 0,
            created_at: Instant::now(),
        }
    }

    /// Append an entry, keeping arrival order.
    pub fn add(&mut self, entry: Entry) {
        self.size += entry.encoded_len();
        self.entries.push(entry);
    }

    /// True once the accumulated size strictly exceeds `threshold`.
    pub fn is_ready(&self, threshold: usize) -> bool {
        self.size > threshold
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

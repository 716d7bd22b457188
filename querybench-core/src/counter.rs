//! Aggregation of successful operations across tasks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts operations that completed successfully.
///
/// The counter only ever grows. It is shared between tasks behind an `Arc` and read once after
/// all of them have been joined.
#[derive(Debug, Default)]
pub struct CompletionCounter(AtomicU64);

impl CompletionCounter {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one successful operation.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of recorded operations.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

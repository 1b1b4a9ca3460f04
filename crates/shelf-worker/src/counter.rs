//! Processed-record counter shared by the ingestion workers and the status page

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Count of records successfully enriched since process start
///
/// Cloning shares the same underlying count.
#[derive(Debug, Clone, Default)]
pub struct ProcessedCounter {
    count: Arc<AtomicU64>,
}

impl ProcessedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful update and return the new total
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }
}

//! Canned lookup results for tests and embedding

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{LookupError, MetadataLookup};
use crate::models::VolumeInfo;

/// Answers lookups from a fixed title -> candidates table
#[derive(Clone, Default)]
pub struct StaticLookup {
    results: Arc<RwLock<HashMap<String, Vec<VolumeInfo>>>>,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, title: impl Into<String>, candidates: Vec<VolumeInfo>) {
        self.results.write().await.insert(title.into(), candidates);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataLookup for StaticLookup {
    async fn lookup(&self, title: &str) -> Result<Vec<VolumeInfo>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LookupError::Unavailable(format!("lookup of {title:?} disabled")));
        }
        Ok(self.results.read().await.get(title).cloned().unwrap_or_default())
    }
}

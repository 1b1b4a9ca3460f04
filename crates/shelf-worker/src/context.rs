//! Shared handles passed to every worker component

use std::sync::Arc;

use crate::cache::VersionedCache;
use crate::counter::ProcessedCounter;
use crate::index::SearchIndex;
use crate::lookup::MetadataLookup;
use crate::store::BookStore;

/// Collaborators and process-wide state, built once at startup
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<dyn BookStore>,
    pub lookup: Arc<dyn MetadataLookup>,
    pub index: Arc<dyn SearchIndex>,
    pub cache: Arc<dyn VersionedCache>,
    pub processed: ProcessedCounter,
}

impl WorkerContext {
    pub fn new(
        store: Arc<dyn BookStore>,
        lookup: Arc<dyn MetadataLookup>,
        index: Arc<dyn SearchIndex>,
        cache: Arc<dyn VersionedCache>,
    ) -> Self {
        Self {
            store,
            lookup,
            index,
            cache,
            processed: ProcessedCounter::new(),
        }
    }
}

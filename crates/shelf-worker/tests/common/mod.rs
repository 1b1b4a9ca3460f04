//! Shared fixtures for worker integration tests
//!
//! Every collaborator is the in-memory backend, so the whole pipeline runs
//! without Postgres or network access.

#![allow(dead_code)]

use std::sync::Arc;

use shelf_worker::{
    cache::{MemoryCache, VersionedCache, BOOKS_KEY},
    index::MemorySearchIndex,
    ingest::{IngestError, Ingestor, PoolConfig},
    lookup::{MetadataLookup, StaticLookup},
    models::{Book, BookId, ImageLinks, VolumeInfo},
    queue::{MemoryQueue, Publisher},
    store::MemoryBookStore,
    WorkerContext,
};

pub struct Harness {
    pub store: MemoryBookStore,
    pub lookup: StaticLookup,
    pub index: MemorySearchIndex,
    pub cache: MemoryCache,
    pub queue: MemoryQueue,
    pub ctx: WorkerContext,
}

impl Harness {
    pub async fn new() -> Self {
        let lookup = StaticLookup::new();
        Self::build(lookup.clone(), Arc::new(lookup)).await
    }

    /// Harness whose context uses `lookup` instead of the canned one
    pub async fn with_lookup(lookup: Arc<dyn MetadataLookup>) -> Self {
        Self::build(StaticLookup::new(), lookup).await
    }

    async fn build(canned: StaticLookup, lookup: Arc<dyn MetadataLookup>) -> Self {
        let store = MemoryBookStore::new();
        let index = MemorySearchIndex::new();
        let cache = MemoryCache::new();
        cache.add(BOOKS_KEY, serde_json::json!([])).await.unwrap();

        let ctx = WorkerContext::new(
            Arc::new(store.clone()),
            lookup,
            Arc::new(index.clone()),
            Arc::new(cache.clone()),
        );

        Self {
            store,
            lookup: canned,
            index,
            cache,
            queue: MemoryQueue::new(),
            ctx,
        }
    }

    /// Store `title` under `id` and give the lookup one candidate for it
    pub async fn known_book(&self, id: BookId, title: &str) {
        self.store.insert(book(id, title)).await;
        self.lookup.set(title, vec![volume(title)]).await;
    }

    pub async fn publish(&self, ids: impl IntoIterator<Item = BookId>) -> Vec<String> {
        let mut message_ids = Vec::new();
        for id in ids {
            message_ids.push(self.queue.publish(id).await.unwrap());
        }
        message_ids
    }

    pub fn ingestor(&self, pool: PoolConfig) -> Ingestor {
        Ingestor::new(&self.ctx, Arc::new(self.queue.clone()), pool)
    }

    /// Close the queue and run ingestion until it has drained everything
    pub async fn drain(&self, pool: PoolConfig) -> IngestError {
        self.queue.close();
        self.ingestor(pool)
            .run()
            .await
            .expect_err("a closed queue always ends ingestion with an error")
    }
}

pub fn book(id: BookId, title: &str) -> Book {
    Book {
        id,
        title: title.to_string(),
        created_by: "tests".to_string(),
        ..Book::default()
    }
}

pub fn volume(title: &str) -> VolumeInfo {
    VolumeInfo {
        title: format!("{title} (Enriched)"),
        authors: vec!["A. Author".to_string()],
        published_date: "2001".to_string(),
        description: format!("About {title}"),
        image_links: Some(ImageLinks {
            thumbnail: format!("http://covers.example/{}.jpg", title.to_lowercase()),
        }),
    }
}

pub fn small_pool() -> PoolConfig {
    PoolConfig {
        workers: 2,
        backlog: 2,
    }
}

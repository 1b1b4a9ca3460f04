//! Bookshelf enrichment worker
//!
//! Consumes book ids from a queue, enriches each stored book with metadata
//! from an external lookup, and keeps a versioned read-side cache of the
//! full book list in step with the store.
//!
//! # Components
//!
//! - **Ingestion loop** ([`ingest::Ingestor`]): pulls messages, decodes book
//!   ids and feeds a bounded pool of workers. Each message is acked or
//!   nacked exactly once.
//! - **Record updater** ([`ingest::RecordUpdater`]): fetch, look up, merge,
//!   persist, then refresh the search document.
//! - **Cache synchronizer** ([`cache::CacheSynchronizer`]): on a fixed
//!   interval, swaps a fresh snapshot of the store into the cache under
//!   optimistic versioning, retrying with [`retry::retry`].
//! - **Status endpoint** ([`status::router`]): reports how many books this
//!   process has enriched.
//!
//! Every collaborator sits behind a trait with a Postgres or HTTP backend
//! and an in-memory one. [`context::WorkerContext`] carries them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shelf_worker::{
//!     cache::MemoryCache, context::WorkerContext, index::MemorySearchIndex,
//!     ingest::{Ingestor, PoolConfig}, lookup::StaticLookup, queue::MemoryQueue,
//!     store::MemoryBookStore,
//! };
//!
//! # async fn run() -> Result<(), shelf_worker::ingest::IngestError> {
//! let ctx = WorkerContext::new(
//!     Arc::new(MemoryBookStore::new()),
//!     Arc::new(StaticLookup::new()),
//!     Arc::new(MemorySearchIndex::new()),
//!     Arc::new(MemoryCache::new()),
//! );
//! let queue = MemoryQueue::new();
//! Ingestor::new(&ctx, Arc::new(queue), PoolConfig::default()).run().await
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cache;
pub mod config;
pub mod context;
pub mod counter;
pub mod db;
pub mod error;
pub mod index;
pub mod ingest;
pub mod lookup;
pub mod models;
pub mod queue;
pub mod retry;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use context::WorkerContext;
pub use counter::ProcessedCounter;
pub use error::AppError;
pub use models::{Book, BookId};

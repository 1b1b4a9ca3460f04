//! Versioned read-side cache
//!
//! Every entry carries a [`CacheVersion`]. Writers read an entry, then
//! [`VersionedCache::compare_and_swap`] it back presenting the version they
//! read; a stale version is rejected with [`CacheError::Conflict`] and the
//! whole read-modify-write has to start again.

pub mod memory;
pub mod postgres;
pub mod sync;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryCache;
pub use postgres::PgCache;
pub use sync::{CacheSynchronizer, SyncOutcome};

/// Cache key holding the full book list.
pub const BOOKS_KEY: &str = "books";

/// Opaque version token; a successful swap always yields a greater one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheVersion(pub i64);

#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem {
    pub payload: Value,
    pub version: CacheVersion,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache miss for key {0:?}")]
    Miss(String),

    #[error("stale version for key {0:?}")]
    Conflict(String),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait VersionedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError>;

    /// Write `payload` only if the entry is still at `expected`
    async fn compare_and_swap(
        &self,
        key: &str,
        payload: Value,
        expected: CacheVersion,
    ) -> Result<CacheVersion, CacheError>;

    /// Create the entry if it does not exist yet; `Conflict` if it does
    async fn add(&self, key: &str, payload: Value) -> Result<CacheVersion, CacheError>;
}

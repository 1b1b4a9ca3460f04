//! Full-text search index over book titles

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::BookId;

pub use memory::MemorySearchIndex;
pub use postgres::PgSearchIndex;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Search index query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("search index unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create or replace the document for `id`
    async fn upsert(&self, id: BookId, title: &str) -> Result<(), IndexError>;

    async fn delete(&self, id: BookId) -> Result<(), IndexError>;

    /// Ids of documents matching every word of `term`
    async fn search(&self, term: &str) -> Result<Vec<BookId>, IndexError>;
}

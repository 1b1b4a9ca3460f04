//! Book record store

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Book, BookId};

pub use memory::MemoryBookStore;
pub use postgres::PgBookStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("book {0} not found")]
    NotFound(BookId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: BookId) -> Result<Book, StoreError>;

    /// Overwrite the stored record with the same id
    async fn update(&self, book: &Book) -> Result<(), StoreError>;

    /// Every record, ordered by title
    async fn list(&self) -> Result<Vec<Book>, StoreError>;
}

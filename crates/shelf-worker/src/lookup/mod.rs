//! Metadata lookup for book enrichment

pub mod google_books;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::VolumeInfo;

pub use google_books::{GoogleBooksClient, GoogleBooksConfig};
pub use memory::StaticLookup;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metadata service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("metadata service unavailable: {0}")]
    Unavailable(String),
}

/// Finds candidate metadata for a title
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Candidates in the service's relevance order; empty when nothing matched
    async fn lookup(&self, title: &str) -> Result<Vec<VolumeInfo>, LookupError>;
}

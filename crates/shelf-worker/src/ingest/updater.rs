//! Per-message enrichment transaction
//!
//! Fetch the book, look its title up, merge the first candidate in, save it,
//! then refresh its search document. Store and lookup failures surface as
//! [`UpdateError`] so the message is redelivered; index failures are only
//! logged.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use crate::context::WorkerContext;
use crate::index::SearchIndex;
use crate::lookup::{LookupError, MetadataLookup};
use crate::models::{Book, BookId, VolumeInfo};
use crate::store::{BookStore, StoreError};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("could not fetch book {id}: {source}")]
    StoreFetch {
        id: BookId,
        #[source]
        source: StoreError,
    },

    #[error("metadata lookup for book {id} failed: {source}")]
    Lookup {
        id: BookId,
        #[source]
        source: LookupError,
    },

    #[error("could not save book {id}: {source}")]
    StoreUpdate {
        id: BookId,
        #[source]
        source: StoreError,
    },
}

/// What a successful update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record was merged with a candidate and saved
    Enriched,
    /// The lookup had nothing; the record was left alone
    NoCandidates,
}

#[derive(Clone)]
pub struct RecordUpdater {
    store: Arc<dyn BookStore>,
    lookup: Arc<dyn MetadataLookup>,
    index: Arc<dyn SearchIndex>,
}

impl RecordUpdater {
    pub fn new(ctx: &WorkerContext) -> Self {
        Self {
            store: ctx.store.clone(),
            lookup: ctx.lookup.clone(),
            index: ctx.index.clone(),
        }
    }

    pub async fn update(&self, id: BookId) -> Result<UpdateOutcome, UpdateError> {
        let mut book = self
            .store
            .get(id)
            .await
            .map_err(|source| UpdateError::StoreFetch { id, source })?;

        let candidates = self
            .lookup
            .lookup(&book.title)
            .await
            .map_err(|source| UpdateError::Lookup { id, source })?;

        let Some(info) = candidates.first() else {
            debug!(book_id = id, title = %book.title, "No metadata candidates, leaving book as is");
            return Ok(UpdateOutcome::NoCandidates);
        };

        merge_volume(&mut book, id, info);

        self.store
            .update(&book)
            .await
            .map_err(|source| UpdateError::StoreUpdate { id, source })?;

        if let Err(e) = self.index.upsert(book.id, &book.title).await {
            error!(book_id = book.id, error = %e, "search: failed to update index");
        }

        Ok(UpdateOutcome::Enriched)
    }
}

/// Merge a lookup candidate into `book`
///
/// Title, author and published date always take the candidate's values.
/// Description and image are only filled in when the book has none.
pub fn merge_volume(book: &mut Book, id: BookId, info: &VolumeInfo) {
    book.id = id;
    book.title = info.title.clone();
    book.author = info.authors.join(", ");
    book.published_date = info.published_date.clone();

    if book.description.is_empty() {
        book.description = info.description.clone();
    }

    if book.image_url.is_empty() {
        if let Some(ref links) = info.image_links {
            book.image_url = secure_image_url(&links.thumbnail);
        }
    }
}

/// Rewrite the first `http://` to `https://`; anything else is returned as is
pub fn secure_image_url(url: &str) -> String {
    url.replacen("http://", "https://", 1)
}

//! Postgres full-text index over the `book_search` table
//!
//! `book_search.document` is a generated `tsvector` of the title using the
//! `simple` configuration, so matching is per word without stemming.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use super::{IndexError, SearchIndex};
use crate::models::BookId;

#[derive(Clone)]
pub struct PgSearchIndex {
    pool: PgPool,
}

impl PgSearchIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchIndex for PgSearchIndex {
    async fn upsert(&self, id: BookId, title: &str) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            INSERT INTO book_search (book_id, title)
            VALUES ($1, $2)
            ON CONFLICT (book_id) DO UPDATE SET title = EXCLUDED.title, indexed_at = NOW()
            "#,
        )
        .bind(id)
        .bind(title)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: BookId) -> Result<(), IndexError> {
        sqlx::query("DELETE FROM book_search WHERE book_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn search(&self, term: &str) -> Result<Vec<BookId>, IndexError> {
        let ids: Vec<BookId> = sqlx::query_scalar(
            r#"
            SELECT book_id
            FROM book_search, plainto_tsquery('simple', $1) AS query
            WHERE document @@ query
            ORDER BY ts_rank(document, query) DESC, book_id
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        info!(term, hits = ids.len(), "Search finished");
        Ok(ids)
    }
}

//! Postgres book store over the `books` table

use async_trait::async_trait;
use sqlx::PgPool;

use super::{BookStore, StoreError};
use crate::models::{Book, BookId};

#[derive(Clone)]
pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PgBookStore {
    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, published_date, description, image_url, created_by
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, book: &Book) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2,
                author = $3,
                published_date = $4,
                description = $5,
                image_url = $6,
                created_by = $7,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.published_date)
        .bind(&book.description)
        .bind(&book.image_url)
        .bind(&book.created_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(book.id));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, published_date, description, image_url, created_by
            FROM books
            ORDER BY title, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}

//! Postgres versioned cache over the `cache_entries` table

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{CacheError, CacheItem, CacheVersion, VersionedCache};

#[derive(Clone)]
pub struct PgCache {
    pool: PgPool,
}

impl PgCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VersionedCache for PgCache {
    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError> {
        let row: Option<(Json<Value>, i64)> =
            sqlx::query_as("SELECT payload, version FROM cache_entries WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(payload), version)| CacheItem {
            payload,
            version: CacheVersion(version),
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        payload: Value,
        expected: CacheVersion,
    ) -> Result<CacheVersion, CacheError> {
        let swapped: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE cache_entries
            SET payload = $2, version = version + 1, updated_at = NOW()
            WHERE key = $1 AND version = $3
            RETURNING version
            "#,
        )
        .bind(key)
        .bind(Json(payload))
        .bind(expected.0)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((version,)) = swapped {
            return Ok(CacheVersion(version));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cache_entries WHERE key = $1)")
                .bind(key)
                .fetch_one(&self.pool)
                .await?;

        if exists {
            Err(CacheError::Conflict(key.to_string()))
        } else {
            Err(CacheError::Miss(key.to_string()))
        }
    }

    async fn add(&self, key: &str, payload: Value) -> Result<CacheVersion, CacheError> {
        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO cache_entries (key, payload, version)
            VALUES ($1, $2, 1)
            ON CONFLICT (key) DO NOTHING
            RETURNING version
            "#,
        )
        .bind(key)
        .bind(Json(payload))
        .fetch_optional(&self.pool)
        .await?;

        inserted
            .map(|(version,)| CacheVersion(version))
            .ok_or_else(|| CacheError::Conflict(key.to_string()))
    }
}

//! Postgres-backed queue
//!
//! Messages live in `book_queue`. A pull claims the oldest visible row with
//! `FOR UPDATE SKIP LOCKED` and hides it for the ack deadline; a row that is
//! neither acked nor nacked before the deadline becomes visible again and is
//! redelivered. Ack deletes the row, nack makes it visible after the
//! redelivery delay.
//!
//! Every claim bumps `delivery_count`, and the message id carries the count
//! it was claimed with (`<row>.<delivery>`). A settle only touches the row
//! while that count is still current, so a delivery whose lease expired
//! cannot ack or nack on behalf of the one that replaced it.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{encode_book_id, Acker, Message, Publisher, QueueError, Subscription};
use crate::models::BookId;

/// Timing knobs for [`PgQueue`]
#[derive(Debug, Clone)]
pub struct PgQueueConfig {
    pub name: String,
    /// Sleep between polls while the queue is empty
    pub poll_interval: Duration,
    /// How long a claimed message stays hidden before redelivery
    pub ack_deadline: Duration,
    /// Delay before a nacked message is offered again
    pub redelivery_delay: Duration,
}

impl Default for PgQueueConfig {
    fn default() -> Self {
        Self {
            name: super::DEFAULT_QUEUE_NAME.to_string(),
            poll_interval: Duration::from_millis(500),
            ack_deadline: Duration::from_secs(60),
            redelivery_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
    config: Arc<PgQueueConfig>,
}

impl PgQueue {
    pub fn new(pool: PgPool, config: PgQueueConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    /// Claim the next visible message, if any
    pub async fn try_pull(&self) -> Result<Option<Message>, QueueError> {
        let claimed: Option<(i64, i32, Vec<u8>)> = sqlx::query_as(
            r#"
            UPDATE book_queue
            SET visible_at = NOW() + make_interval(secs => $2),
                delivery_count = delivery_count + 1
            WHERE id = (
                SELECT id FROM book_queue
                WHERE queue = $1 AND visible_at <= NOW()
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, delivery_count, payload
            "#,
        )
        .bind(&self.config.name)
        .bind(self.config.ack_deadline.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.map(|(id, delivery, payload)| {
            let acker: Arc<dyn Acker> = Arc::new(self.clone());
            Message::new(delivery_id(id, delivery), payload, acker)
        }))
    }
}

#[async_trait]
impl Subscription for PgQueue {
    async fn pull(&self) -> Result<Message, QueueError> {
        loop {
            if let Some(message) = self.try_pull().await? {
                return Ok(message);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

#[async_trait]
impl Acker for PgQueue {
    async fn done(&self, message_id: &str, success: bool) -> Result<(), QueueError> {
        let (row_id, delivery) = parse_delivery_id(message_id)
            .ok_or_else(|| QueueError::UnknownMessage(message_id.to_string()))?;

        let result = if success {
            sqlx::query("DELETE FROM book_queue WHERE id = $1 AND delivery_count = $2")
                .bind(row_id)
                .bind(delivery)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query(
                r#"
                UPDATE book_queue
                SET visible_at = NOW() + make_interval(secs => $3)
                WHERE id = $1 AND delivery_count = $2
                "#,
            )
            .bind(row_id)
            .bind(delivery)
            .bind(self.config.redelivery_delay.as_secs_f64())
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(QueueError::Superseded(message_id.to_string()));
        }

        debug!(message_id, success, "Message settled");
        Ok(())
    }
}

fn delivery_id(row_id: i64, delivery: i32) -> String {
    format!("{row_id}.{delivery}")
}

fn parse_delivery_id(message_id: &str) -> Option<(i64, i32)> {
    let (row_id, delivery) = message_id.split_once('.')?;
    Some((row_id.parse().ok()?, delivery.parse().ok()?))
}

#[async_trait]
impl Publisher for PgQueue {
    async fn publish(&self, id: BookId) -> Result<String, QueueError> {
        let (row_id,): (i64,) =
            sqlx::query_as("INSERT INTO book_queue (queue, payload) VALUES ($1, $2) RETURNING id")
                .bind(&self.config.name)
                .bind(encode_book_id(id))
                .fetch_one(&self.pool)
                .await?;

        Ok(row_id.to_string())
    }
}

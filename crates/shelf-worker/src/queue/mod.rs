//! Durable queue abstraction
//!
//! A [`Subscription`] hands out [`Message`]s one at a time. Every message
//! must be settled exactly once with [`Message::ack`] (processed, drop it)
//! or [`Message::nack`] (failed, redeliver it later). Both consume the
//! message, so a second decision does not compile.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::models::BookId;

pub use memory::{Decision, MemoryQueue};
pub use postgres::PgQueue;

/// Default subscription name, shared by the worker and the publisher.
pub const DEFAULT_QUEUE_NAME: &str = "book-worker-sub";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Subscription closed")]
    Closed,

    #[error("Unknown message id: {0}")]
    UnknownMessage(String),

    #[error("Message {0} was redelivered; this delivery can no longer settle it")]
    Superseded(String),
}

/// Payload could not be read as a book id
#[derive(Debug, Error)]
#[error("could not decode message data {data:?}: {source}")]
pub struct DecodeError {
    data: String,
    #[source]
    source: serde_json::Error,
}

/// Backend hook that settles a delivered message
#[async_trait]
pub trait Acker: Send + Sync {
    async fn done(&self, message_id: &str, success: bool) -> Result<(), QueueError>;
}

/// One delivery from a subscription
pub struct Message {
    id: String,
    data: Vec<u8>,
    acker: Arc<dyn Acker>,
}

impl Message {
    pub fn new(id: impl Into<String>, data: Vec<u8>, acker: Arc<dyn Acker>) -> Self {
        Self {
            id: id.into(),
            data,
            acker,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the payload as a JSON-encoded book id
    pub fn decode(&self) -> Result<BookId, DecodeError> {
        serde_json::from_slice(&self.data).map_err(|source| DecodeError {
            data: String::from_utf8_lossy(&self.data).into_owned(),
            source,
        })
    }

    /// Settle as processed
    pub async fn ack(self) -> Result<(), QueueError> {
        self.acker.done(&self.id, true).await
    }

    /// Settle as failed so the queue offers it again
    pub async fn nack(self) -> Result<(), QueueError> {
        self.acker.done(&self.id, false).await
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("data", &String::from_utf8_lossy(&self.data))
            .finish()
    }
}

/// Pull side of the queue
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Wait for the next message. An error means the subscription is unusable.
    async fn pull(&self) -> Result<Message, QueueError>;
}

/// Publish side of the queue
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueue a book id and return the message id
    async fn publish(&self, id: BookId) -> Result<String, QueueError>;
}

/// Wire encoding of a book id, as [`Message::decode`] expects it
pub fn encode_book_id(id: BookId) -> Vec<u8> {
    id.to_string().into_bytes()
}

//! Ingestion loop
//!
//! One task pulls messages and decodes them. Decoded messages go through a
//! bounded backlog to a fixed pool of workers; when the backlog is full the
//! pull loop waits, so in-flight work never exceeds `workers + backlog`.
//!
//! Message handling policy:
//! - undecodable payload: logged and acked so it is never redelivered
//! - update failed: logged and nacked, counter untouched
//! - update succeeded: counter incremented, then acked
//!
//! A pull failure stops the loop. Work already handed to the pool is
//! finished before [`Ingestor::run`] returns the error.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use super::updater::RecordUpdater;
use crate::context::WorkerContext;
use crate::counter::ProcessedCounter;
use crate::models::BookId;
use crate::queue::{Message, QueueError, Subscription};

/// Default number of concurrent message handlers.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Default capacity of the decoded-message backlog.
pub const DEFAULT_BACKLOG: usize = 64;

/// Worker pool sizing; both values must be non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub backlog: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            backlog: DEFAULT_BACKLOG,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not pull: {0}")]
    Pull(#[source] QueueError),

    #[error("all message workers have stopped")]
    WorkersStopped,
}

type Job = (BookId, Message);

pub struct Ingestor {
    subscription: Arc<dyn Subscription>,
    handler: MessageHandler,
    pool: PoolConfig,
}

impl Ingestor {
    pub fn new(ctx: &WorkerContext, subscription: Arc<dyn Subscription>, pool: PoolConfig) -> Self {
        Self {
            subscription,
            handler: MessageHandler {
                updater: RecordUpdater::new(ctx),
                processed: ctx.processed.clone(),
            },
            pool,
        }
    }

    /// Pull and dispatch until the subscription fails
    pub async fn run(self) -> Result<(), IngestError> {
        let (tx, rx) = mpsc::channel::<Job>(self.pool.backlog);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = JoinSet::new();
        for worker in 0..self.pool.workers {
            let rx = rx.clone();
            let handler = self.handler.clone();
            workers.spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some((id, message)) = job else {
                        break;
                    };
                    let span = info_span!("message", worker, book_id = id, message_id = %message.id());
                    handler.handle(id, message).instrument(span).await;
                }
            });
        }

        info!(
            workers = self.pool.workers,
            backlog = self.pool.backlog,
            "Ingestion loop started"
        );

        let result = loop {
            let message = match self.subscription.pull().await {
                Ok(message) => message,
                Err(e) => break Err(IngestError::Pull(e)),
            };

            let id = match message.decode() {
                Ok(id) => id,
                Err(e) => {
                    warn!(message = ?message, error = %e, "could not decode message data");
                    if let Err(e) = message.ack().await {
                        warn!(error = %e, "could not ack undecodable message");
                    }
                    continue;
                },
            };

            info!(book_id = id, "Processing");
            if tx.send((id, message)).await.is_err() {
                break Err(IngestError::WorkersStopped);
            }
        };

        drop(tx);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Message worker panicked");
            }
        }

        if let Err(ref e) = result {
            error!(error = %e, "Ingestion loop stopped");
        }
        result
    }
}

#[derive(Clone)]
struct MessageHandler {
    updater: RecordUpdater,
    processed: ProcessedCounter,
}

impl MessageHandler {
    async fn handle(&self, id: BookId, message: Message) {
        match self.updater.update(id).await {
            Err(e) => {
                error!(book_id = id, error = %e, "could not update");
                if let Err(e) = message.nack().await {
                    warn!(book_id = id, error = %e, "could not nack message");
                }
            },
            Ok(outcome) => {
                let total = self.processed.increment();
                match message.ack().await {
                    Ok(()) => info!(book_id = id, ?outcome, processed = total, "ACK"),
                    Err(e) => warn!(book_id = id, error = %e, "could not ack message"),
                }
            },
        }
    }
}

//! In-process queue for tests and embedding

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use super::{encode_book_id, Acker, Message, Publisher, QueueError, Subscription};
use crate::models::BookId;

/// How a message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ack,
    Nack,
}

/// Queue held in memory
///
/// Nacked messages go back to the end of the queue only when built with
/// [`MemoryQueue::with_redelivery`]; otherwise they are parked so tests see
/// a bounded number of deliveries. Once [`MemoryQueue::close`] is called,
/// `pull` drains what is pending and then fails with [`QueueError::Closed`].
#[derive(Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    pending: Mutex<VecDeque<(String, Vec<u8>)>>,
    in_flight: Mutex<Vec<(String, Vec<u8>)>>,
    decisions: Mutex<Vec<(String, Decision)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    redeliver: bool,
    arrivals: Notify,
    settled: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redelivery() -> Self {
        Self {
            inner: Arc::new(Inner {
                redeliver: true,
                ..Inner::default()
            }),
        }
    }

    /// Enqueue an arbitrary payload and return its message id
    pub async fn push_raw(&self, data: impl Into<Vec<u8>>) -> String {
        let id = format!("mem-{}", self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.inner
            .pending
            .lock()
            .await
            .push_back((id.clone(), data.into()));
        self.inner.arrivals.notify_waiters();
        id
    }

    /// Stop handing out new messages once the backlog is drained
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.arrivals.notify_waiters();
    }

    /// Every settlement so far, in order
    pub async fn decisions(&self) -> Vec<(String, Decision)> {
        self.inner.decisions.lock().await.clone()
    }

    pub async fn pending_len(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Wait until at least `count` settlements have been recorded
    pub async fn wait_settled(&self, count: usize) {
        loop {
            let notified = self.inner.settled.notified();
            if self.inner.decisions.lock().await.len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Subscription for MemoryQueue {
    async fn pull(&self) -> Result<Message, QueueError> {
        loop {
            let notified = self.inner.arrivals.notified();

            let next = self.inner.pending.lock().await.pop_front();
            if let Some((id, data)) = next {
                self.inner
                    .in_flight
                    .lock()
                    .await
                    .push((id.clone(), data.clone()));
                let acker: Arc<dyn Acker> = Arc::new(self.clone());
                return Ok(Message::new(id, data, acker));
            }

            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed);
            }

            notified.await;
        }
    }
}

#[async_trait]
impl Acker for MemoryQueue {
    async fn done(&self, message_id: &str, success: bool) -> Result<(), QueueError> {
        let delivery = {
            let mut in_flight = self.inner.in_flight.lock().await;
            let position = in_flight
                .iter()
                .position(|(id, _)| id == message_id)
                .ok_or_else(|| QueueError::UnknownMessage(message_id.to_string()))?;
            in_flight.swap_remove(position)
        };

        let decision = if success { Decision::Ack } else { Decision::Nack };
        self.inner
            .decisions
            .lock()
            .await
            .push((message_id.to_string(), decision));

        if !success && self.inner.redeliver {
            self.inner.pending.lock().await.push_back(delivery);
            self.inner.arrivals.notify_waiters();
        }

        self.inner.settled.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl Publisher for MemoryQueue {
    async fn publish(&self, id: BookId) -> Result<String, QueueError> {
        Ok(self.push_raw(encode_book_id(id)).await)
    }
}

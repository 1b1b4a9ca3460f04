//! Periodic reconciliation of the book list into the cache
//!
//! Each cycle snapshots the store once, then tries to swap that snapshot
//! into [`BOOKS_KEY`] under the [`RetryPolicy`]. A failed snapshot skips the
//! cycle. An exhausted retry abandons it. Neither stops the loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::{CacheError, CacheVersion, VersionedCache, BOOKS_KEY};
use crate::context::WorkerContext;
use crate::retry::{retry, RetryPolicy};
use crate::store::BookStore;

/// Default time between reconciliation cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cache now holds `books` records under `version`
    Synced { books: usize, version: CacheVersion },
    /// The store could not be listed; nothing was attempted
    ListFailed,
    /// Every attempt failed; the cache was left as it was
    Abandoned { attempts: u32 },
}

pub struct CacheSynchronizer {
    store: Arc<dyn BookStore>,
    cache: Arc<dyn VersionedCache>,
    interval: Duration,
    policy: RetryPolicy,
}

impl CacheSynchronizer {
    pub fn new(ctx: &WorkerContext, interval: Duration, policy: RetryPolicy) -> Self {
        Self {
            store: ctx.store.clone(),
            cache: ctx.cache.clone(),
            interval,
            policy,
        }
    }

    /// Tick forever, one cycle per tick
    ///
    /// A cycle that outlasts the interval delays the next tick instead of
    /// letting ticks pile up.
    pub async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; start one full interval in.
        ticker.tick().await;

        info!(interval_secs = self.interval.as_secs_f64(), "Cache synchronizer started");
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    pub async fn run_cycle(&self) -> SyncOutcome {
        let books = match self.store.list().await {
            Ok(books) => books,
            Err(e) => {
                error!(error = %e, "could not list books, skipping cache sync");
                return SyncOutcome::ListFailed;
            },
        };

        let payload = match serde_json::to_value(&books) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "could not serialize book list, skipping cache sync");
                return SyncOutcome::ListFailed;
            },
        };

        let swapped = retry(&self.policy, |attempt| {
            let payload = payload.clone();
            async move {
                debug!(attempt, "Reconciling book cache");
                let current = self
                    .cache
                    .get(BOOKS_KEY)
                    .await?
                    .ok_or_else(|| CacheError::Miss(BOOKS_KEY.to_string()))?;
                let version = self
                    .cache
                    .compare_and_swap(BOOKS_KEY, payload, current.version)
                    .await?;
                Ok::<_, CacheError>(version)
            }
        })
        .await;

        match swapped {
            Ok(version) => {
                info!(books = books.len(), version = version.0, "Cache synchronized");
                SyncOutcome::Synced {
                    books: books.len(),
                    version,
                }
            },
            Err(e) => {
                warn!(error = %e, "Abandoning cache sync until next tick");
                SyncOutcome::Abandoned {
                    attempts: e.attempts(),
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::index::MemorySearchIndex;
    use crate::lookup::StaticLookup;
    use crate::models::Book;
    use crate::store::MemoryBookStore;
    use serde_json::json;
    use tokio::time::Instant;

    fn book(id: i64, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            ..Book::default()
        }
    }

    fn assert_backoff_waited(started: Instant) {
        let off = started.elapsed().abs_diff(Duration::from_millis(20 + 40 + 80 + 160));
        assert!(off < Duration::from_millis(1), "backoff off by {off:?}");
    }

    async fn setup(books: Vec<Book>) -> (MemoryBookStore, MemoryCache, CacheSynchronizer) {
        let store = MemoryBookStore::with_books(books).await;
        let cache = MemoryCache::new();
        cache.add(BOOKS_KEY, json!([])).await.unwrap();

        let ctx = WorkerContext::new(
            Arc::new(store.clone()),
            Arc::new(StaticLookup::new()),
            Arc::new(MemorySearchIndex::new()),
            Arc::new(cache.clone()),
        );
        let sync = CacheSynchronizer::new(&ctx, DEFAULT_SYNC_INTERVAL, RetryPolicy::default());
        (store, cache, sync)
    }

    #[tokio::test]
    async fn test_cycle_writes_store_snapshot() {
        let (_store, cache, sync) = setup(vec![book(2, "Emma"), book(1, "Dracula")]).await;
        let before = cache.get(BOOKS_KEY).await.unwrap().unwrap().version;

        let outcome = sync.run_cycle().await;

        let item = cache.get(BOOKS_KEY).await.unwrap().unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                books: 2,
                version: item.version
            }
        );
        assert!(item.version > before);
        let cached: Vec<Book> = serde_json::from_value(item.payload).unwrap();
        assert_eq!(cached, vec![book(1, "Dracula"), book(2, "Emma")]);
    }

    #[tokio::test]
    async fn test_list_failure_skips_cycle() {
        let (store, cache, sync) = setup(vec![book(1, "Emma")]).await;
        store.fail_list(true);

        assert_eq!(sync.run_cycle().await, SyncOutcome::ListFailed);
        assert_eq!(cache.get(BOOKS_KEY).await.unwrap().unwrap().payload, json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_conflicts_abandon_then_next_cycle_recovers() {
        let (_store, cache, sync) = setup(vec![book(1, "Emma")]).await;
        cache.conflict_next(5);

        let started = Instant::now();
        assert_eq!(sync.run_cycle().await, SyncOutcome::Abandoned { attempts: 5 });
        assert_backoff_waited(started);

        let stale = cache.get(BOOKS_KEY).await.unwrap().unwrap();
        assert_eq!(stale.payload, json!([]));

        match sync.run_cycle().await {
            SyncOutcome::Synced { books, version } => {
                assert_eq!(books, 1);
                assert!(version > stale.version);
            },
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_abandon_then_recover() {
        let (_store, cache, sync) = setup(vec![book(1, "Emma"), book(2, "Persuasion")]).await;
        cache.fail_reads(true);

        let started = Instant::now();
        assert_eq!(sync.run_cycle().await, SyncOutcome::Abandoned { attempts: 5 });
        assert_backoff_waited(started);

        cache.fail_reads(false);
        assert_eq!(cache.get(BOOKS_KEY).await.unwrap().unwrap().payload, json!([]));
        assert!(matches!(sync.run_cycle().await, SyncOutcome::Synced { books: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_resolved_within_budget() {
        let (_store, cache, sync) = setup(vec![book(1, "Emma")]).await;
        cache.conflict_next(2);

        assert!(matches!(sync.run_cycle().await, SyncOutcome::Synced { books: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_entry_counts_as_failed_attempt() {
        let store = MemoryBookStore::with_books(vec![book(1, "Emma")]).await;
        let ctx = WorkerContext::new(
            Arc::new(store),
            Arc::new(StaticLookup::new()),
            Arc::new(MemorySearchIndex::new()),
            Arc::new(MemoryCache::new()),
        );
        let sync = CacheSynchronizer::new(
            &ctx,
            DEFAULT_SYNC_INTERVAL,
            RetryPolicy::new(3, Duration::from_millis(1)),
        );

        assert_eq!(sync.run_cycle().await, SyncOutcome::Abandoned { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval() {
        let (store, cache, sync) = setup(vec![]).await;
        let handle = tokio::spawn(sync.run());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(cache.get(BOOKS_KEY).await.unwrap().unwrap().payload, json!([]));

        store.insert(book(3, "Persuasion")).await;
        tokio::time::sleep(Duration::from_millis(5_200)).await;
        let item = cache.get(BOOKS_KEY).await.unwrap().unwrap();
        assert_eq!(item.payload.as_array().map(Vec::len), Some(1));

        handle.abort();
    }
}

//! In-memory versioned cache

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{CacheError, CacheItem, CacheVersion, VersionedCache};

/// Versioned cache held in memory
///
/// [`MemoryCache::conflict_next`] makes the next swaps fail as if another
/// writer got there first.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheItem>>>,
    forced_conflicts: Arc<AtomicU32>,
    failing_reads: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the entry's version behind the caller's back on the next `n` swaps
    pub fn conflict_next(&self, n: u32) {
        self.forced_conflicts.store(n, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl VersionedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheItem>, CacheError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        payload: Value,
        expected: CacheVersion,
    ) -> Result<CacheVersion, CacheError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| CacheError::Miss(key.to_string()))?;

        let forced = self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            entry.version = CacheVersion(entry.version.0 + 1);
        }

        if entry.version != expected {
            return Err(CacheError::Conflict(key.to_string()));
        }

        entry.payload = payload;
        entry.version = CacheVersion(entry.version.0 + 1);
        Ok(entry.version)
    }

    async fn add(&self, key: &str, payload: Value) -> Result<CacheVersion, CacheError> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Err(CacheError::Conflict(key.to_string()));
        }
        let version = CacheVersion(1);
        entries.insert(key.to_string(), CacheItem { payload, version });
        Ok(version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_swap_with_current_version_succeeds() {
        let cache = MemoryCache::new();
        let v1 = cache.add("k", json!([])).await.unwrap();

        let v2 = cache.compare_and_swap("k", json!([1]), v1).await.unwrap();

        assert!(v2 > v1);
        let item = cache.get("k").await.unwrap().unwrap();
        assert_eq!(item.payload, json!([1]));
        assert_eq!(item.version, v2);
    }

    #[tokio::test]
    async fn test_swap_with_stale_version_conflicts() {
        let cache = MemoryCache::new();
        let v1 = cache.add("k", json!([])).await.unwrap();
        cache.compare_and_swap("k", json!([1]), v1).await.unwrap();

        let err = cache.compare_and_swap("k", json!([2]), v1).await.unwrap_err();
        assert!(matches!(err, CacheError::Conflict(_)));
        assert_eq!(cache.get("k").await.unwrap().unwrap().payload, json!([1]));
    }

    #[tokio::test]
    async fn test_swap_on_missing_key_is_a_miss() {
        let cache = MemoryCache::new();
        let err = cache
            .compare_and_swap("nope", json!(null), CacheVersion(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Miss(_)));
    }

    #[tokio::test]
    async fn test_add_refuses_existing_key() {
        let cache = MemoryCache::new();
        cache.add("k", json!([])).await.unwrap();
        assert!(matches!(
            cache.add("k", json!([1])).await,
            Err(CacheError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_forced_conflicts_run_out() {
        let cache = MemoryCache::new();
        cache.add("k", json!([])).await.unwrap();
        cache.conflict_next(1);

        let read = cache.get("k").await.unwrap().unwrap();
        assert!(cache.compare_and_swap("k", json!([1]), read.version).await.is_err());

        let read = cache.get("k").await.unwrap().unwrap();
        assert!(cache.compare_and_swap("k", json!([1]), read.version).await.is_ok());
    }
}

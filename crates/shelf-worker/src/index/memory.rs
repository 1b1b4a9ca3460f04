//! In-memory search index

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{IndexError, SearchIndex};
use crate::models::BookId;

/// Word-match index kept in memory
#[derive(Clone, Default)]
pub struct MemorySearchIndex {
    documents: Arc<RwLock<BTreeMap<BookId, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail until switched back off
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn document(&self, id: BookId) -> Option<String> {
        self.documents.read().await.get(&id).cloned()
    }

    fn check(&self) -> Result<(), IndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IndexError::Unavailable("index disabled".to_string()));
        }
        Ok(())
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, id: BookId, title: &str) -> Result<(), IndexError> {
        self.check()?;
        self.documents.write().await.insert(id, title.to_string());
        Ok(())
    }

    async fn delete(&self, id: BookId) -> Result<(), IndexError> {
        self.check()?;
        self.documents.write().await.remove(&id);
        Ok(())
    }

    async fn search(&self, term: &str) -> Result<Vec<BookId>, IndexError> {
        self.check()?;
        let wanted: Vec<String> = words(term).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|(_, title)| {
                let have: Vec<String> = words(title).collect();
                wanted.iter().all(|w| have.contains(w))
            })
            .map(|(id, _)| *id)
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_matches_all_words_case_insensitively() {
        let index = MemorySearchIndex::new();
        index.upsert(1, "The Left Hand of Darkness").await.unwrap();
        index.upsert(2, "Darkness Visible").await.unwrap();
        index.upsert(3, "The Dispossessed").await.unwrap();

        assert_eq!(index.search("darkness").await.unwrap(), vec![1, 2]);
        assert_eq!(index.search("LEFT darkness").await.unwrap(), vec![1]);
        assert!(index.search("  ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_delete_removes() {
        let index = MemorySearchIndex::new();
        index.upsert(1, "Draft Title").await.unwrap();
        index.upsert(1, "Final Title").await.unwrap();
        assert!(index.search("draft").await.unwrap().is_empty());

        index.delete(1).await.unwrap();
        assert!(index.search("final").await.unwrap().is_empty());
    }
}

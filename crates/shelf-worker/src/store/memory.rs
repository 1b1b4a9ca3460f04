//! In-memory book store

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{BookStore, StoreError};
use crate::models::{Book, BookId};

/// Book store held in memory
///
/// Failures can be switched on per operation to exercise error paths.
#[derive(Clone, Default)]
pub struct MemoryBookStore {
    books: Arc<RwLock<BTreeMap<BookId, Book>>>,
    fail_get: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        let store = Self::new();
        for book in books {
            store.insert(book).await;
        }
        store
    }

    pub async fn insert(&self, book: Book) {
        self.books.write().await.insert(book.id, book);
    }

    /// Current stored copy, bypassing failure injection
    pub async fn snapshot(&self, id: BookId) -> Option<Book> {
        self.books.read().await.get(&id).cloned()
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn get(&self, id: BookId) -> Result<Book, StoreError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("get disabled".to_string()));
        }
        self.snapshot(id).await.ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, book: &Book) -> Result<(), StoreError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("update disabled".to_string()));
        }
        let mut books = self.books.write().await;
        match books.get_mut(&book.id) {
            Some(stored) => {
                *stored = book.clone();
                Ok(())
            },
            None => Err(StoreError::NotFound(book.id)),
        }
    }

    async fn list(&self) -> Result<Vec<Book>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("list disabled".to_string()));
        }
        let mut books: Vec<Book> = self.books.read().await.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn book(id: BookId, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            ..Book::default()
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_title() {
        let store = MemoryBookStore::with_books([book(1, "Zen"), book(2, "Anathem")]).await;
        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Anathem", "Zen"]);
    }

    #[tokio::test]
    async fn test_update_of_missing_book_is_not_found() {
        let store = MemoryBookStore::new();
        let err = store.update(&book(9, "Ghost")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryBookStore::with_books([book(1, "Emma")]).await;
        store.fail_get(true);
        assert!(matches!(store.get(1).await, Err(StoreError::Unavailable(_))));
        store.fail_get(false);
        assert_eq!(store.get(1).await.unwrap().title, "Emma");
    }
}

//! ISBN to book-id resolution with a TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::BookId;
use domain::Book;
use store::{BookstoreStore, Result, StoreSession};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// How long a cached ISBN mapping stays fresh.
pub const DEFAULT_BOOK_REF_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    book_id: BookId,
    cached_at: Instant,
}

/// Maps ISBNs to book IDs, caching positive lookups for a bounded TTL.
///
/// A book's ID never changes, so entries only go stale if a book is
/// removed from the catalog; the TTL bounds how long such a stale
/// mapping can be served. Negative lookups are never cached: a miss
/// always goes back to the store, so a freshly added book is visible
/// immediately.
pub struct BookRefCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl BookRefCache {
    /// Creates a cache whose entries stay fresh for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves an ISBN to a book ID, reading through to the store on a
    /// cache miss. Returns `None` if no such book exists; this is a
    /// pure read path with no side effects on the catalog.
    pub async fn resolve<S: BookstoreStore>(
        &self,
        store: &S,
        isbn: &str,
    ) -> Result<Option<BookId>> {
        if let Some(book_id) = self.fresh_entry(isbn).await {
            debug!(%isbn, %book_id, "book ref cache hit");
            return Ok(Some(book_id));
        }

        match store.get_book_by_isbn(isbn).await? {
            Some(book) => {
                self.insert_entry(isbn, book.id).await;
                debug!(%isbn, book_id = %book.id, "book ref cached from store");
                Ok(Some(book.id))
            }
            None => Ok(None),
        }
    }

    /// Resolves an ISBN, inserting `candidate` into the catalog if no
    /// book carries that ISBN yet. This is the explicitly
    /// side-effecting variant used by the demo seeder; `resolve` never
    /// creates anything.
    pub async fn resolve_or_create<S: BookstoreStore>(
        &self,
        store: &S,
        candidate: Book,
    ) -> Result<BookId> {
        if let Some(book_id) = self.resolve(store, &candidate.isbn).await? {
            return Ok(book_id);
        }

        let isbn = candidate.isbn.clone();
        let book_id = candidate.id;
        let mut session = store.begin().await?;
        session.insert_book(&candidate).await?;
        session.commit().await?;

        self.insert_entry(&isbn, book_id).await;
        info!(%isbn, %book_id, title = %candidate.title, "created catalog book for ISBN");
        Ok(book_id)
    }

    async fn fresh_entry(&self, isbn: &str) -> Option<BookId> {
        let entries = self.entries.read().await;
        entries
            .get(isbn)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.book_id)
    }

    async fn insert_entry(&self, isbn: &str, book_id: BookId) {
        let mut entries = self.entries.write().await;
        entries.insert(
            isbn.to_string(),
            CacheEntry {
                book_id,
                cached_at: Instant::now(),
            },
        );
    }
}

impl Default for BookRefCache {
    fn default() -> Self {
        Self::new(DEFAULT_BOOK_REF_TTL)
    }
}

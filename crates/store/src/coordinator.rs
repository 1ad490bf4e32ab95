//! Transaction coordination with retry on transient conflicts.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::store::{BookstoreStore, StoreSession};

/// Classification of failures into retryable and permanent.
///
/// The coordinator consults this capability instead of matching
/// store-specific error codes, so it stays portable across backends.
pub trait TransientError {
    /// Returns true if the operation may succeed when repeated in a
    /// fresh transaction.
    fn is_transient(&self) -> bool;
}

/// Retry policy for [`TransactionCoordinator::run_in_transaction_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,

    /// Base delay; the nth retry sleeps `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// A unit of work executed inside one store transaction.
///
/// All reads and writes must go through the session argument so they
/// belong to the same atomic unit; touching the store directly from
/// inside `run` would escape the transaction.
#[async_trait]
pub trait TransactionalWork<S: StoreSession>: Send + Sync {
    /// Value produced when the work (and the commit) succeeds.
    type Output: Send;

    /// Failure type; must absorb store errors and classify transience.
    type Error: From<StoreError> + TransientError + std::fmt::Display + Send;

    /// Runs the body against the open transaction.
    async fn run(&self, session: &mut S) -> Result<Self::Output, Self::Error>;
}

/// Wraps units of work in begin/commit-or-abort cycles.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator<S: BookstoreStore> {
    store: S,
}

impl<S: BookstoreStore> TransactionCoordinator<S> {
    /// Creates a coordinator over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `work` in one transaction.
    ///
    /// On success the transaction is committed and the work's output
    /// returned; a commit failure surfaces as the work's error type. On
    /// failure the transaction is aborted and the original error
    /// returned; an abort failure is logged but never masks the error
    /// that caused it. The session is consumed on every path.
    pub async fn run_in_transaction<W>(&self, work: &W) -> Result<W::Output, W::Error>
    where
        W: TransactionalWork<S::Session>,
    {
        let mut session = self.store.begin().await.map_err(W::Error::from)?;

        match work.run(&mut session).await {
            Ok(output) => {
                session.commit().await.map_err(W::Error::from)?;
                Ok(output)
            }
            Err(err) => {
                if let Err(abort_err) = session.abort().await {
                    warn!(error = %abort_err, "failed to abort transaction");
                }
                Err(err)
            }
        }
    }

    /// Runs `work`, repeating the full begin/run/commit-or-abort cycle
    /// when the failure is transient.
    ///
    /// Permanent errors return immediately. The nth retry sleeps
    /// `retry_delay * n`; once `max_retries` retries are spent, the
    /// last error is returned.
    pub async fn run_in_transaction_with_retry<W>(
        &self,
        work: &W,
        policy: &RetryPolicy,
    ) -> Result<W::Output, W::Error>
    where
        W: TransactionalWork<S::Session>,
    {
        let mut attempt: u32 = 0;

        loop {
            match self.run_in_transaction(work).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.retry_delay * attempt;
                    metrics::counter!("transaction_retries_total").increment(1);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying transaction after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(
                            attempts = attempt + 1,
                            error = %err,
                            "transient conflict persisted through all retries"
                        );
                        metrics::counter!("transactions_failed_total").increment(1);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::memory::{InMemorySession, InMemoryStore};
    use crate::store::StoreSession;
    use domain::{Book, Money};

    /// Fails transiently a fixed number of times, then succeeds.
    struct FlakyWork {
        transient_failures: u32,
        calls: AtomicU32,
    }

    impl FlakyWork {
        fn new(transient_failures: u32) -> Self {
            Self {
                transient_failures,
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TransactionalWork<InMemorySession> for FlakyWork {
        type Output = u32;
        type Error = StoreError;

        async fn run(&self, _session: &mut InMemorySession) -> Result<u32, StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.transient_failures {
                Err(StoreError::WriteConflict {
                    collection: "books",
                    id: "contended".to_string(),
                })
            } else {
                Ok(call)
            }
        }
    }

    /// Always fails with a permanent error.
    struct PermanentFailureWork {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TransactionalWork<InMemorySession> for PermanentFailureWork {
        type Output = ();
        type Error = StoreError;

        async fn run(&self, _session: &mut InMemorySession) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::DuplicateDocument {
                collection: "orders",
                id: "dup".to_string(),
            })
        }
    }

    /// Inserts a book, then optionally fails so the insert must roll back.
    struct InsertBookWork {
        book: Book,
        fail_after_insert: bool,
    }

    #[async_trait]
    impl TransactionalWork<InMemorySession> for InsertBookWork {
        type Output = ();
        type Error = StoreError;

        async fn run(&self, session: &mut InMemorySession) -> Result<(), StoreError> {
            session.insert_book(&self.book).await?;
            if self.fail_after_insert {
                return Err(StoreError::DuplicateDocument {
                    collection: "orders",
                    id: "boom".to_string(),
                });
            }
            Ok(())
        }
    }

    fn test_book() -> Book {
        Book::new("isbn-1", "Dune", "Frank Herbert", Money::from_cents(1000), 0, 5).unwrap()
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn commits_work_on_success() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store.clone());
        let book = test_book();
        let id = book.id;

        coordinator
            .run_in_transaction(&InsertBookWork {
                book,
                fail_after_insert: false,
            })
            .await
            .unwrap();

        assert!(store.get_book(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn aborts_work_on_failure() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store.clone());
        let book = test_book();
        let id = book.id;

        let result = coordinator
            .run_in_transaction(&InsertBookWork {
                book,
                fail_after_insert: true,
            })
            .await;

        assert!(result.is_err());
        assert!(store.get_book(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store);
        let work = FlakyWork::new(2);

        let output = coordinator
            .run_in_transaction_with_retry(&work, &fast_policy(3))
            .await
            .unwrap();

        assert_eq!(output, 3);
        assert_eq!(work.call_count(), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store);
        let work = PermanentFailureWork {
            calls: AtomicU32::new(0),
        };

        let result = coordinator
            .run_in_transaction_with_retry(&work, &fast_policy(5))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::DuplicateDocument { .. })
        ));
        assert_eq!(work.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store);
        let work = FlakyWork::new(10);

        let result = coordinator
            .run_in_transaction_with_retry(&work, &fast_policy(2))
            .await;

        assert!(matches!(result, Err(StoreError::WriteConflict { .. })));
        // One initial attempt plus two retries.
        assert_eq!(work.call_count(), 3);
    }

    #[tokio::test]
    async fn zero_max_retries_means_single_attempt() {
        let store = InMemoryStore::new();
        let coordinator = TransactionCoordinator::new(store);
        let work = FlakyWork::new(1);

        let result = coordinator
            .run_in_transaction_with_retry(&work, &fast_policy(0))
            .await;

        assert!(result.is_err());
        assert_eq!(work.call_count(), 1);
    }
}

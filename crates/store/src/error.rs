use domain::DomainError;
use thiserror::Error;

use crate::coordinator::TransientError;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another transaction changed a document between this session's
    /// read and its commit.
    #[error("Write conflict on {collection} document {id}")]
    WriteConflict {
        collection: &'static str,
        id: String,
    },

    /// An insert targeted an identifier or unique key that already exists.
    #[error("Duplicate {collection} document: {id}")]
    DuplicateDocument {
        collection: &'static str,
        id: String,
    },

    /// A write would store a document that violates a domain rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Retryable SQLSTATEs: serialization_failure, deadlock_detected,
/// lock_not_available, query_canceled (statement timeout).
const TRANSIENT_SQLSTATES: [&str; 4] = ["40001", "40P01", "55P03", "57014"];

impl TransientError for StoreError {
    fn is_transient(&self) -> bool {
        match self {
            StoreError::WriteConflict { .. } => true,
            StoreError::Database(sqlx::Error::Database(db_err)) => db_err
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())),
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_conflict_is_transient() {
        let err = StoreError::WriteConflict {
            collection: "books",
            id: "abc".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn duplicate_document_is_permanent() {
        let err = StoreError::DuplicateDocument {
            collection: "orders",
            id: "abc".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn row_not_found_is_permanent() {
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn domain_refusal_is_permanent() {
        let err = StoreError::Domain(DomainError::InvalidDiscount {
            discount_percent: 150,
        });
        assert!(!err.is_transient());
    }
}

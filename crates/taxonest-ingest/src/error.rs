//! Error types for taxonest imports
//!
//! [`ImportError::Common`] rejects invalid settings before a transaction
//! opens. Every other variant is fatal to a run: the enclosing transaction
//! is rolled back before the error reaches the caller. Duplicate subtrees
//! are not errors and never show up here.

use taxonest_common::TaxonestError;
use thiserror::Error;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Failure of an import run
#[derive(Error, Debug)]
pub enum ImportError {
    /// Malformed or truncated markup
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// The store refused to open the run's transaction
    #[error("Failed to begin import transaction: {0}")]
    StoreBegin(#[source] StoreError),

    /// Flushing a batch of pending inserts failed
    #[error("Failed to write batch {batch}: {source}")]
    StoreWrite {
        batch: u64,
        #[source]
        source: StoreError,
    },

    /// The final commit failed
    #[error("Failed to commit import: {0}")]
    StoreCommit(#[source] StoreError),

    /// The input could not be opened or read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error(transparent)]
    Common(#[from] TaxonestError),
}

impl ImportError {
    /// Whether the failure came from the record store rather than the input
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            ImportError::StoreBegin(_) | ImportError::StoreWrite { .. } | ImportError::StoreCommit(_)
        )
    }
}

/// Failure reported by a record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store rejected the operation outright
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

//! Record store collaborators
//!
//! The importer only sees the two traits here. A [`NodeStore`] hands out
//! one [`NodeTransaction`] per run; the transaction buffers inserts,
//! persists them on [`flush_pending`](NodeTransaction::flush_pending)
//! without making them durable, and ends with exactly one of
//! [`commit`](NodeTransaction::commit) or
//! [`rollback`](NodeTransaction::rollback).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::tree::PersistedNode;

pub use memory::{MemoryNodeStore, MemoryTransaction};
pub use sqlite::{SqliteNodeStore, SqliteTransaction};

/// Source of import transactions
#[async_trait]
pub trait NodeStore: Send + Sync {
    type Transaction: NodeTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// One atomic unit of writes
#[async_trait]
pub trait NodeTransaction: Send {
    /// Queue a record; nothing reaches the store until the next flush
    fn enqueue_insert(&mut self, node: PersistedNode);

    /// Number of queued records not yet flushed
    fn pending(&self) -> usize;

    /// Write queued records inside the transaction. Returns how many were written.
    async fn flush_pending(&mut self) -> Result<u64, StoreError>;

    /// Make every flushed record durable
    async fn commit(self) -> Result<(), StoreError>;

    /// Discard every record written in this transaction
    async fn rollback(self) -> Result<(), StoreError>;
}

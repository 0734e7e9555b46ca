//! Batched unit of work over one store transaction
//!
//! The writer opens a single transaction when created and is the only
//! thing that touches it. Intermediate flushes are checkpoints inside that
//! transaction, never independent commits: if anything fails after the
//! transaction opens, every record of the run is rolled back, including
//! batches that were already flushed.

use tracing::{debug, error, info};

use crate::config::BatchConfig;
use crate::error::{ImportError, Result, StoreError};
use crate::store::{NodeStore, NodeTransaction};
use crate::tree::PersistedNode;

/// Outcome of one flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// 1-based batch number
    pub batch: u64,
    /// Records written by this flush
    pub written: u64,
    /// Records written so far in the run
    pub persisted: u64,
}

/// Totals for a committed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterSummary {
    pub batches: u64,
    pub persisted: u64,
}

/// Accumulates accepted nodes and flushes them in bounded batches
pub struct BatchWriter<T: NodeTransaction> {
    /// `None` once the transaction has been rolled back
    tx: Option<T>,
    batch_size: usize,
    pending: usize,
    batches: u64,
    persisted: u64,
}

impl<T: NodeTransaction> BatchWriter<T> {
    /// Open the run's transaction. A zero `batch_size` is rejected before
    /// the store is touched.
    pub async fn begin<S>(store: &S, batch_size: usize) -> Result<Self>
    where
        S: NodeStore<Transaction = T>,
    {
        BatchConfig { batch_size }.validate()?;

        let tx = store.begin().await.map_err(ImportError::StoreBegin)?;
        debug!(batch_size, "Import transaction opened");

        Ok(Self {
            tx: Some(tx),
            batch_size,
            pending: 0,
            batches: 0,
            persisted: 0,
        })
    }

    /// Queue an accepted node, flushing once more than `batch_size` are pending
    pub async fn accept(&mut self, node: PersistedNode) -> Result<Option<FlushReport>> {
        let batch = self.batches + 1;
        let tx = self.tx.as_mut().ok_or_else(|| closed_error(batch))?;

        tx.enqueue_insert(node);
        self.pending += 1;

        if self.pending > self.batch_size {
            return self.flush().await.map(Some);
        }

        Ok(None)
    }

    /// Write pending records without committing. Rolls back on failure.
    pub async fn flush(&mut self) -> Result<FlushReport> {
        let batch = self.batches + 1;
        let tx = self.tx.as_mut().ok_or_else(|| closed_error(batch))?;

        let result = tx.flush_pending().await;
        match result {
            Ok(written) => {
                self.pending = 0;
                self.batches = batch;
                self.persisted += written;

                info!(batch, written, persisted = self.persisted, "Batch flushed");

                Ok(FlushReport {
                    batch,
                    written,
                    persisted: self.persisted,
                })
            },
            Err(source) => {
                self.abort().await;
                Err(ImportError::StoreWrite { batch, source })
            },
        }
    }

    /// Flush the remainder and commit. Rolls back on failure.
    pub async fn finish(mut self) -> Result<WriterSummary> {
        if self.pending > 0 {
            self.flush().await?;
        }

        let tx = self.tx.take().ok_or_else(|| closed_error(self.batches + 1))?;

        // A failed commit consumes the transaction; sqlx rolls back on drop
        // and the memory store never publishes uncommitted records.
        if let Err(e) = tx.commit().await {
            error!(error = %e, "Commit failed, import rolled back");
            return Err(ImportError::StoreCommit(e));
        }

        info!(
            batches = self.batches,
            persisted = self.persisted,
            "Import transaction committed"
        );

        Ok(WriterSummary {
            batches: self.batches,
            persisted: self.persisted,
        })
    }

    /// Roll back the transaction if it is still open
    pub async fn abort(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        match tx.rollback().await {
            Ok(()) => info!(
                discarded = self.persisted + self.pending as u64,
                "Import transaction rolled back"
            ),
            Err(e) => error!(error = %e, "Rollback failed"),
        }
    }

    /// Records queued since the last flush
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }
}

fn closed_error(batch: u64) -> ImportError {
    ImportError::StoreWrite {
        batch,
        source: StoreError::unavailable("transaction already rolled back"),
    }
}

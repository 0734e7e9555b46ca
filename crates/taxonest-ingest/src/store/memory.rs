//! In-memory record store
//!
//! Used for dry runs and for exercising the writer's rollback paths. A
//! transaction keeps its flushed records aside and only appends them to the
//! shared committed set on commit, mirroring a real database transaction.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{NodeStore, NodeTransaction};
use crate::error::StoreError;
use crate::tree::PersistedNode;

#[derive(Debug, Default)]
struct MemoryState {
    committed: Vec<PersistedNode>,
    committed_count: u64,
    retain: bool,
    fail_on_flush: Option<u64>,
    fail_on_commit: bool,
    begun: u64,
    rollbacks: u64,
}

/// Node store holding committed records in process memory
#[derive(Debug, Clone)]
pub struct MemoryNodeStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNodeStore {
    /// Store that keeps every committed record
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                retain: true,
                ..MemoryState::default()
            })),
        }
    }

    /// Store that only counts committed records, for dry runs over large inputs
    pub fn counting() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
        }
    }

    /// Make the `n`th flush (1-based) of every transaction fail
    pub fn fail_on_flush(self, n: u64) -> Self {
        self.lock().fail_on_flush = Some(n);
        self
    }

    /// Make every commit fail
    pub fn fail_on_commit(self) -> Self {
        self.lock().fail_on_commit = true;
        self
    }

    /// Committed records, in commit order
    pub fn committed(&self) -> Vec<PersistedNode> {
        self.lock().committed.clone()
    }

    pub fn committed_count(&self) -> u64 {
        self.lock().committed_count
    }

    /// Number of transactions opened so far
    pub fn transactions_begun(&self) -> u64 {
        self.lock().begun
    }

    /// Number of transactions rolled back so far
    pub fn rollbacks(&self) -> u64 {
        self.lock().rollbacks
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        self.lock().begun += 1;
        Ok(MemoryTransaction {
            store: self.clone(),
            pending: Vec::new(),
            flushed: Vec::new(),
            flushed_count: 0,
            flushes: 0,
        })
    }
}

/// Transaction against a [`MemoryNodeStore`]
#[derive(Debug)]
pub struct MemoryTransaction {
    store: MemoryNodeStore,
    pending: Vec<PersistedNode>,
    flushed: Vec<PersistedNode>,
    flushed_count: u64,
    flushes: u64,
}

#[async_trait]
impl NodeTransaction for MemoryTransaction {
    fn enqueue_insert(&mut self, node: PersistedNode) {
        self.pending.push(node);
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn flush_pending(&mut self) -> Result<u64, StoreError> {
        self.flushes += 1;

        let (fail_on, retain) = {
            let state = self.store.lock();
            (state.fail_on_flush, state.retain)
        };
        if fail_on == Some(self.flushes) {
            return Err(StoreError::unavailable(format!(
                "flush {} rejected",
                self.flushes
            )));
        }

        let written = self.pending.len() as u64;
        if retain {
            self.flushed.append(&mut self.pending);
        } else {
            self.pending.clear();
        }
        self.flushed_count += written;

        Ok(written)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if !self.pending.is_empty() {
            self.flush_pending().await?;
        }

        let mut state = self.store.lock();
        if state.fail_on_commit {
            return Err(StoreError::unavailable("commit rejected"));
        }
        state.committed.append(&mut self.flushed);
        state.committed_count += self.flushed_count;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.store.lock().rollbacks += 1;
        Ok(())
    }
}

//! SQLite record store
//!
//! Writes go through a single `sqlx` transaction per import. Reads are
//! plain pool queries over the nested-set columns.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{NodeStore, NodeTransaction};
use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::tree::PersistedNode;

/// Rows per INSERT statement. Six bound parameters per row keeps each
/// statement well under SQLite's 32766 parameter limit.
const INSERT_CHUNK_ROWS: usize = 1000;

const NODE_COLUMNS: &str = "id, name, child_count, left_index, right_index, parent_id";

/// Node store backed by a SQLite pool
#[derive(Clone)]
pub struct SqliteNodeStore {
    pool: SqlitePool,
}

impl SqliteNodeStore {
    /// Connect to the configured database, creating the file if needed
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        info!(url = %config.url, "Connected to database");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply embedded schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Database migrations applied");
        Ok(())
    }

    /// Total number of persisted nodes
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<PersistedNode>, StoreError> {
        let node = sqlx::query_as::<_, PersistedNode>(&format!(
            "SELECT {} FROM nodes WHERE id = ?1",
            NODE_COLUMNS
        ))
        .bind(id.hyphenated())
        .fetch_optional(&self.pool)
        .await?;
        Ok(node)
    }

    /// Nodes without a parent, in document order
    pub async fn roots(&self) -> Result<Vec<PersistedNode>, StoreError> {
        let nodes = sqlx::query_as::<_, PersistedNode>(&format!(
            "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY left_index",
            NODE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Direct children of a node, in document order
    pub async fn children(&self, parent_id: Uuid) -> Result<Vec<PersistedNode>, StoreError> {
        let nodes = sqlx::query_as::<_, PersistedNode>(&format!(
            "SELECT {} FROM nodes WHERE parent_id = ?1 ORDER BY left_index",
            NODE_COLUMNS
        ))
        .bind(parent_id.hyphenated())
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Every node strictly inside `node`'s interval, in document order
    ///
    /// Coordinates restart at 1 on every import, so the range only
    /// identifies a subtree when the table holds a single import.
    pub async fn descendants(&self, node: &PersistedNode) -> Result<Vec<PersistedNode>, StoreError> {
        let nodes = sqlx::query_as::<_, PersistedNode>(&format!(
            "SELECT {} FROM nodes WHERE left_index > ?1 AND right_index < ?2 ORDER BY left_index",
            NODE_COLUMNS
        ))
        .bind(node.left)
        .bind(node.right)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Number of nodes strictly inside `node`'s interval
    ///
    /// Counted rather than derived from `(right - left - 1) / 2` because
    /// discarded duplicates leave gaps in the numbering.
    pub async fn descendant_count(&self, node: &PersistedNode) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM nodes WHERE left_index > ?1 AND right_index < ?2",
        )
        .bind(node.left)
        .bind(node.right)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// All nodes in document order
    pub async fn all(&self) -> Result<Vec<PersistedNode>, StoreError> {
        let nodes = sqlx::query_as::<_, PersistedNode>(&format!(
            "SELECT {} FROM nodes ORDER BY left_index",
            NODE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }
}

#[async_trait]
impl NodeStore for SqliteNodeStore {
    type Transaction = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(SqliteTransaction {
            tx,
            pending: Vec::new(),
        })
    }
}

/// Open SQLite transaction with an in-memory insert queue
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    pending: Vec<PersistedNode>,
}

#[async_trait]
impl NodeTransaction for SqliteTransaction {
    fn enqueue_insert(&mut self, node: PersistedNode) {
        self.pending.push(node);
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn flush_pending(&mut self) -> Result<u64, StoreError> {
        let pending = std::mem::take(&mut self.pending);
        let mut written = 0;

        for chunk in pending.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("INSERT INTO nodes ({}) ", NODE_COLUMNS));

            builder.push_values(chunk, |mut b, node| {
                b.push_bind(node.id.hyphenated())
                    .push_bind(&node.name)
                    .push_bind(node.child_count)
                    .push_bind(node.left)
                    .push_bind(node.right)
                    .push_bind(node.parent_id.map(Uuid::hyphenated));
            });

            let result = builder.build().execute(&mut *self.tx).await?;
            written += result.rows_affected();
        }

        Ok(written)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if !self.pending.is_empty() {
            self.flush_pending().await?;
        }
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

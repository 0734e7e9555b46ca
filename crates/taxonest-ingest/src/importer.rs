//! Streaming tree import
//!
//! Drives a [`StreamWalker`] through the input, feeds every event to a
//! [`TraversalContext`] and hands accepted nodes to a [`BatchWriter`].
//! Processing is strictly sequential in document order. The run either
//! ends with one committed transaction or fails with nothing durable
//! written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info, instrument, trace};

use crate::config::{BatchConfig, TreeConfig};
use crate::error::Result;
use crate::progress::ImportObserver;
use crate::store::{NodeStore, NodeTransaction};
use crate::tree::{CloseOutcome, TraversalContext};
use crate::walker::{StreamWalker, TreeEvent};
use crate::writer::BatchWriter;

/// Statistics for a committed import
#[derive(Debug, Clone, Serialize)]
pub struct ImportStats {
    pub started_at: DateTime<Utc>,
    /// Nodes persisted
    pub accepted: u64,
    /// Elements dropped because their composite name was already accepted
    pub duplicates: u64,
    /// Flushes performed inside the transaction
    pub batches: u64,
    /// Deepest element nesting encountered
    pub max_depth: usize,
    /// Last traversal counter value; exceeds `2 * accepted` when duplicates left gaps
    pub last_index: i64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

/// Imports markup trees into a [`NodeStore`]
pub struct TreeImporter<S> {
    store: S,
    tree: TreeConfig,
    batch: BatchConfig,
}

impl<S: NodeStore> TreeImporter<S> {
    pub fn new(store: S, tree: TreeConfig, batch: BatchConfig) -> Self {
        Self { store, tree, batch }
    }

    /// Import a file from disk
    pub async fn import_file(
        &self,
        path: impl AsRef<Path>,
        observer: &mut dyn ImportObserver,
    ) -> Result<ImportStats> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await.map(|m| m.len()).unwrap_or(0);

        info!(path = %path.display(), bytes = size, "Importing tree");

        self.import(BufReader::with_capacity(64 * 1024, file), observer)
            .await
    }

    /// Import from any buffered async reader
    ///
    /// Invalid tree or batch settings fail with
    /// [`ImportError::Common`](crate::error::ImportError::Common)
    /// before a transaction is opened.
    #[instrument(skip_all, fields(element = %self.tree.element_name))]
    pub async fn import<R>(&self, input: R, observer: &mut dyn ImportObserver) -> Result<ImportStats>
    where
        R: AsyncBufRead + Unpin,
    {
        self.tree.validate()?;
        self.batch.validate()?;

        let started_at = Utc::now();
        let timer = Instant::now();

        let mut walker = StreamWalker::new(input, &self.tree);
        let mut context = TraversalContext::new(&self.tree);
        let mut writer = BatchWriter::begin(&self.store, self.batch.batch_size).await?;
        let mut run = RunCounters::default();

        let walked = drive(
            &mut walker,
            &mut context,
            &mut writer,
            &mut run,
            observer,
            timer,
        )
        .await;

        if let Err(e) = walked {
            writer.abort().await;
            return Err(e);
        }

        let summary = writer.finish().await?;

        let stats = ImportStats {
            started_at,
            accepted: run.accepted,
            duplicates: run.duplicates,
            batches: summary.batches,
            max_depth: context.max_depth(),
            last_index: context.counter(),
            elapsed: timer.elapsed(),
        };

        observer.finished(&stats);

        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    accepted: u64,
    duplicates: u64,
}

async fn drive<R, T>(
    walker: &mut StreamWalker<R>,
    context: &mut TraversalContext,
    writer: &mut BatchWriter<T>,
    run: &mut RunCounters,
    observer: &mut dyn ImportObserver,
    timer: Instant,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    T: NodeTransaction,
{
    while let Some(event) = walker.next_event().await? {
        match event {
            TreeEvent::Open { label } => {
                context.open(label.as_deref());
            },
            TreeEvent::Close => match context.close() {
                CloseOutcome::Accepted(node) => {
                    trace!(node = %node.name, left = node.left, right = node.right, "Node accepted");
                    run.accepted += 1;

                    if let Some(report) = writer.accept(node).await? {
                        observer.batch_flushed(&report, timer.elapsed());
                    }
                    observer.node_closed(run.accepted, timer.elapsed());
                },
                CloseOutcome::Duplicate { name, left } => {
                    debug!(node = %name, left, "Duplicate node discarded");
                    run.duplicates += 1;
                    observer.duplicate(&name);
                },
                CloseOutcome::Ignored => {},
            },
        }
    }

    Ok(())
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

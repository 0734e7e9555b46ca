//! Taxonest Ingest Library
//!
//! Streams a large hierarchical XML document (a taxonomy of nested labeled
//! elements, such as the ImageNet synset tree) into a nested-set table
//! without holding the document in memory.
//!
//! # Pipeline
//!
//! - [`walker`]: forward-only open/close events for one tag
//! - [`tree`]: nested-set coordinates, child counts, duplicate suppression
//! - [`writer`]: bounded batches inside a single transaction
//! - [`store`]: SQLite and in-memory record stores
//! - [`importer`]: wires the above together and reports progress
//!
//! # Example
//!
//! ```no_run
//! use taxonest_ingest::config::ImportConfig;
//! use taxonest_ingest::importer::TreeImporter;
//! use taxonest_ingest::progress::TracingObserver;
//! use taxonest_ingest::store::SqliteNodeStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ImportConfig::load()?;
//!     let store = SqliteNodeStore::connect(&config.database).await?;
//!     store.migrate().await?;
//!
//!     let importer = TreeImporter::new(store, config.tree, config.batch);
//!     let stats = importer
//!         .import_file("structure_released.xml", &mut TracingObserver)
//!         .await?;
//!     println!("{} nodes imported", stats.accepted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod importer;
pub mod progress;
pub mod store;
pub mod tree;
pub mod walker;
pub mod writer;

pub use error::{ImportError, Result, StoreError};
pub use importer::{ImportStats, TreeImporter};

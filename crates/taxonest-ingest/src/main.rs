//! Taxonest Ingest - nested-set tree importer

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taxonest_common::logging::{init_logging, LogConfig, LogLevel};
use taxonest_ingest::config::ImportConfig;
use taxonest_ingest::importer::{ImportStats, TreeImporter};
use taxonest_ingest::progress::{ImportObserver, SpinnerObserver, TracingObserver};
use taxonest_ingest::store::{MemoryNodeStore, SqliteNodeStore};
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "taxonest-ingest")]
#[command(author, version, about = "Import XML taxonomies into a nested-set table")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream an XML document into the nodes table
    Import {
        /// XML file to import
        #[arg(short, long)]
        input: PathBuf,

        /// Database URL (overrides DATABASE_URL)
        #[arg(short, long)]
        database: Option<String>,

        /// Pending nodes tolerated before a batch is flushed
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Tag of the elements that form the tree
        #[arg(long)]
        element: Option<String>,

        /// Attribute holding each element's label
        #[arg(long)]
        label_attribute: Option<String>,

        /// Walk and validate the document without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Print run statistics as JSON
        #[arg(long)]
        json: bool,

        /// Disable the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// List root nodes, or the children of one node
    Show {
        /// Database URL (overrides DATABASE_URL)
        #[arg(short, long)]
        database: Option<String>,

        /// Node whose children to list
        #[arg(short, long)]
        parent: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("taxonest-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = ImportConfig::load()?;

    match cli.command {
        Command::Import {
            input,
            database,
            batch_size,
            element,
            label_attribute,
            dry_run,
            json,
            no_progress,
        } => {
            let mut config = config;
            if let Some(url) = database {
                config = config.with_database_url(url);
            }
            if let Some(batch_size) = batch_size {
                config = config.with_batch_size(batch_size);
            }
            if let Some(element) = element {
                config = config.with_element_name(element);
            }
            if let Some(label_attribute) = label_attribute {
                config = config.with_label_attribute(label_attribute);
            }
            config.validate()?;

            let mut observer: Box<dyn ImportObserver> = if no_progress || json {
                Box::new(TracingObserver)
            } else {
                Box::new(SpinnerObserver::new())
            };

            let stats = if dry_run {
                info!("Dry run, nothing will be written");
                let importer =
                    TreeImporter::new(MemoryNodeStore::counting(), config.tree, config.batch);
                importer.import_file(&input, observer.as_mut()).await?
            } else {
                let store = SqliteNodeStore::connect(&config.database).await?;
                store.migrate().await?;
                let importer = TreeImporter::new(store, config.tree, config.batch);
                importer.import_file(&input, observer.as_mut()).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        },
        Command::Show { database, parent } => {
            let config = match database {
                Some(url) => config.with_database_url(url),
                None => config,
            };
            let store = SqliteNodeStore::connect(&config.database).await?;
            store.migrate().await?;
            show(&store, parent).await?;
        },
    }

    Ok(())
}

fn print_stats(stats: &ImportStats) {
    println!("Imported {} nodes in {} batch(es)", stats.accepted, stats.batches);
    println!("Skipped {} duplicate(s)", stats.duplicates);
    println!("Max depth {}", stats.max_depth);
    println!(
        "Elapsed {}",
        taxonest_ingest::progress::format_elapsed(stats.elapsed)
    );
}

async fn show(store: &SqliteNodeStore, parent: Option<Uuid>) -> Result<()> {
    let nodes = match parent {
        Some(id) => {
            let node = store
                .find(id)
                .await?
                .with_context(|| format!("Node {} not found", id))?;
            println!("{}", node.name);
            store.children(id).await?
        },
        None => store.roots().await?,
    };

    if nodes.is_empty() {
        println!("(no nodes)");
        return Ok(());
    }

    for node in &nodes {
        let descendants = store.descendant_count(node).await?;
        println!(
            "{}  [children: {}, descendants: {}]  {}",
            node.name, node.child_count, descendants, node.id
        );
    }

    Ok(())
}

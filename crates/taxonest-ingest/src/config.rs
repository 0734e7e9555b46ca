//! Import configuration
//!
//! Values come from the environment (after loading `.env`) and fall back to
//! the `DEFAULT_*` constants below. CLI flags override both.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use taxonest_common::{Result, TaxonestError};

// ============================================================================
// Database Defaults
// ============================================================================

/// Default SQLite database, created on first use.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://taxonest.db";

/// Default maximum connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 4;

/// Default time to wait for a pooled connection, in seconds.
pub const DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Import Defaults
// ============================================================================

/// Default number of pending nodes tolerated before a batch is flushed.
///
/// Lower values shorten each write lock; higher values mean fewer round trips.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default tag of the elements that make up the tree.
pub const DEFAULT_ELEMENT_NAME: &str = "synset";

/// Default attribute holding an element's own label.
pub const DEFAULT_LABEL_ATTRIBUTE: &str = "words";

/// Label used when an element has no label attribute.
pub const DEFAULT_FALLBACK_LABEL: &str = "Unknown";

/// Separator between ancestor labels in a composite name.
pub const DEFAULT_NAME_SEPARATOR: &str = " > ";

/// Full configuration for an import run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    pub database: DatabaseConfig,
    pub tree: TreeConfig,
    pub batch: BatchConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// How the markup maps onto tree nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub element_name: String,
    pub label_attribute: String,
    pub fallback_label: String,
    pub separator: String,
}

/// Batch writer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            element_name: DEFAULT_ELEMENT_NAME.to_string(),
            label_attribute: DEFAULT_LABEL_ATTRIBUTE.to_string(),
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            separator: DEFAULT_NAME_SEPARATOR.to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportConfig {
    /// Load configuration from `.env`, the environment and defaults
    ///
    /// Environment variables:
    /// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`, `DATABASE_ACQUIRE_TIMEOUT`
    /// - `TAXONEST_BATCH_SIZE`
    /// - `TAXONEST_ELEMENT`, `TAXONEST_LABEL_ATTRIBUTE`
    /// - `TAXONEST_FALLBACK_LABEL`, `TAXONEST_SEPARATOR`
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = ImportConfig {
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                )?,
                acquire_timeout_secs: env_parse(
                    "DATABASE_ACQUIRE_TIMEOUT",
                    DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
                )?,
            },
            tree: TreeConfig {
                element_name: env_string("TAXONEST_ELEMENT", DEFAULT_ELEMENT_NAME),
                label_attribute: env_string("TAXONEST_LABEL_ATTRIBUTE", DEFAULT_LABEL_ATTRIBUTE),
                fallback_label: env_string("TAXONEST_FALLBACK_LABEL", DEFAULT_FALLBACK_LABEL),
                separator: env_string("TAXONEST_SEPARATOR", DEFAULT_NAME_SEPARATOR),
            },
            batch: BatchConfig {
                batch_size: env_parse("TAXONEST_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Set the database URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database.url = url.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch.batch_size = batch_size;
        self
    }

    /// Set the element tag that forms the tree
    pub fn with_element_name(mut self, element_name: impl Into<String>) -> Self {
        self.tree.element_name = element_name.into();
        self
    }

    /// Set the attribute read as each element's label
    pub fn with_label_attribute(mut self, label_attribute: impl Into<String>) -> Self {
        self.tree.label_attribute = label_attribute.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(TaxonestError::config("Database URL cannot be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(TaxonestError::config(
                "Database max_connections must be greater than 0",
            ));
        }

        self.tree.validate()?;
        self.batch.validate()?;

        Ok(())
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.element_name.is_empty() {
            return Err(TaxonestError::config("Element name cannot be empty"));
        }

        if self.label_attribute.is_empty() {
            return Err(TaxonestError::config("Label attribute cannot be empty"));
        }

        Ok(())
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TaxonestError::config("Batch size must be greater than 0"));
        }

        Ok(())
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| TaxonestError::invalid_value(key, value)),
        Err(_) => Ok(default),
    }
}

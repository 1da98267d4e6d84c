//! Table client configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, InsertMethod, MAX_BATCH_SIZE, MAX_PAGE_SIZE, Result};

/// Configuration for table clients with sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct TablesConfig {
    /// Maximum entities requested per round trip by bounded queries (1-1000)
    #[cfg_attr(
        feature = "config",
        arg(long = "tables-page-size", env = "TABLES_PAGE_SIZE")
    )]
    #[serde(default)]
    pub tables_page_size: Option<usize>,

    /// Maximum entities written per batch call (1-100)
    #[cfg_attr(
        feature = "config",
        arg(long = "tables-batch-size", env = "TABLES_BATCH_SIZE")
    )]
    #[serde(default)]
    pub tables_batch_size: Option<usize>,

    /// Insert method used by batch writes that do not specify one
    #[cfg_attr(
        feature = "config",
        arg(long = "tables-insert-method", env = "TABLES_INSERT_METHOD", value_enum)
    )]
    #[serde(default)]
    pub tables_insert_method: Option<InsertMethod>,

    /// Maximum batch chunks in flight at once (unbounded if unset)
    #[cfg_attr(
        feature = "config",
        arg(long = "tables-batch-concurrency", env = "TABLES_BATCH_CONCURRENCY")
    )]
    #[serde(default)]
    pub tables_batch_concurrency: Option<usize>,

    /// Prefix prepended to every table name
    #[cfg_attr(
        feature = "config",
        arg(long = "tables-prefix", env = "TABLES_PREFIX")
    )]
    #[serde(default)]
    pub tables_prefix: Option<String>,
}

impl TablesConfig {
    /// Creates a configuration using every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the page size, using the provider limit if not set.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.tables_page_size.unwrap_or(MAX_PAGE_SIZE)
    }

    /// Returns the batch size, using the provider limit if not set.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.tables_batch_size.unwrap_or(MAX_BATCH_SIZE)
    }

    /// Returns the default insert method.
    #[inline]
    pub fn insert_method(&self) -> InsertMethod {
        self.tables_insert_method.unwrap_or_default()
    }

    /// Returns the batch concurrency limit, if any.
    #[inline]
    pub fn batch_concurrency(&self) -> Option<usize> {
        self.tables_batch_concurrency
    }

    /// Returns the full table name for `name`, including the prefix.
    pub fn table_name(&self, name: &str) -> String {
        match &self.tables_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_owned(),
        }
    }

    /// Set the page size of bounded queries.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.tables_page_size = Some(page_size);
        self
    }

    /// Set the batch chunk size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.tables_batch_size = Some(batch_size);
        self
    }

    /// Set the default insert method.
    #[must_use]
    pub fn with_insert_method(mut self, method: InsertMethod) -> Self {
        self.tables_insert_method = Some(method);
        self
    }

    /// Set the batch concurrency limit.
    #[must_use]
    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.tables_batch_concurrency = Some(limit);
        self
    }

    /// Set the table name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tables_prefix = Some(prefix.into());
        self
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<()> {
        let page_size = self.page_size();
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::configuration().with_message(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }

        let batch_size = self.batch_size();
        if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(Error::configuration().with_message(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
            )));
        }

        if self.batch_concurrency() == Some(0) {
            return Err(Error::configuration().with_message("batch concurrency cannot be zero"));
        }

        if let Some(prefix) = &self.tables_prefix {
            if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(Error::configuration()
                    .with_message(format!("table prefix must be alphanumeric, got '{prefix}'")));
            }
        }

        Ok(())
    }
}

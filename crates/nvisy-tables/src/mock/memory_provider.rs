//! In-memory table provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{MemoryTable, MemoryTableConfig};
use crate::{Error, Result, TableHandle, TableProvider};

/// Provider handing out [`MemoryTable`]s.
///
/// Creating an existing table returns the existing one, like a
/// create-if-not-exists call against the remote store. Every call is
/// counted so tests can verify how often tables were created.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    config: MemoryTableConfig,
    tables: Mutex<HashMap<String, Arc<MemoryTable>>>,
    create_calls: AtomicUsize,
    create_delay: Option<Duration>,
    create_failures: usize,
}

impl MemoryProvider {
    /// Creates a provider whose tables use the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration of tables created from now on.
    #[must_use]
    pub fn with_table_config(mut self, config: MemoryTableConfig) -> Self {
        self.config = config;
        self
    }

    /// Delays every create call.
    #[must_use]
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Fails the first `count` create calls with a transport error.
    #[must_use]
    pub fn with_create_failures(mut self, count: usize) -> Self {
        self.create_failures = count;
        self
    }

    /// Returns the number of create calls, including failed ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Returns a created table for inspection.
    pub fn table(&self, name: &str) -> Option<Arc<MemoryTable>> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl TableProvider for MemoryProvider {
    async fn create_table(&self, name: &str) -> Result<Arc<dyn TableHandle>> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        if call < self.create_failures {
            return Err(Error::transport().with_message(format!("failed to create table '{name}'")));
        }

        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let table = tables
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(MemoryTable::with_config(name, self.config.clone())));

        Ok(Arc::clone(table) as Arc<dyn TableHandle>)
    }
}

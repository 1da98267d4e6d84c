//! Memoized, concurrency-safe table handle resolution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

use crate::{Result, TRACING_TARGET_RESOLVER, TableHandle, TableProvider};

type HandleCell = Arc<OnceCell<Arc<dyn TableHandle>>>;

/// Resolves table names to handles, creating each table at most once.
///
/// Every name owns a lazily initialized cell. Concurrent first resolutions
/// of the same name wait on that cell, so the provider sees a single
/// `create_table` call. A failed creation leaves the cell empty and the
/// next resolution tries again.
pub struct TableResolver {
    provider: Arc<dyn TableProvider>,
    handles: RwLock<HashMap<String, HandleCell>>,
}

impl TableResolver {
    /// Creates a resolver backed by `provider`.
    pub fn new(provider: Arc<dyn TableProvider>) -> Self {
        Self {
            provider,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the handle for `name`, creating the table on first use.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_RESOLVER)]
    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn TableHandle>> {
        let cell = self.cell(name).await;

        let handle = cell
            .get_or_try_init(|| async {
                tracing::debug!(
                    target: TRACING_TARGET_RESOLVER,
                    table = %name,
                    "Creating table handle"
                );
                self.provider.create_table(name).await
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    /// Returns true if a handle for `name` has already been created.
    pub async fn is_resolved(&self, name: &str) -> bool {
        self.handles
            .read()
            .await
            .get(name)
            .is_some_and(|cell| cell.initialized())
    }

    /// Drops the cached handle for `name`.
    ///
    /// The next resolution calls the provider again. Returns true if a
    /// handle was cached.
    pub async fn evict(&self, name: &str) -> bool {
        let removed = self.handles.write().await.remove(name);
        let evicted = removed.is_some_and(|cell| cell.initialized());

        tracing::debug!(
            target: TRACING_TARGET_RESOLVER,
            table = %name,
            evicted,
            "Evicted table handle"
        );

        evicted
    }

    async fn cell(&self, name: &str) -> HandleCell {
        if let Some(cell) = self.handles.read().await.get(name) {
            return Arc::clone(cell);
        }

        let mut handles = self.handles.write().await;
        Arc::clone(handles.entry(name.to_owned()).or_default())
    }
}

impl fmt::Debug for TableResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableResolver").finish_non_exhaustive()
    }
}

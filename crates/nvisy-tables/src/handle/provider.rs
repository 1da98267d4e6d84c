//! Table handle creation.

use std::sync::Arc;

use async_trait::async_trait;

use super::TableHandle;
use crate::Result;

/// Creates handles for named tables.
///
/// Implementations connect to the remote store and create the backing
/// table if it does not exist yet. Callers are expected to go through
/// [`TableResolver`](crate::TableResolver), which memoizes handles and
/// guarantees a single `create_table` call per name.
#[async_trait]
pub trait TableProvider: Send + Sync {
    /// Returns a handle for `name`, creating the table if needed.
    async fn create_table(&self, name: &str) -> Result<Arc<dyn TableHandle>>;
}

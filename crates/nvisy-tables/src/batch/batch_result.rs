//! Per-entity outcome of a batch write.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::EntityKey;

/// Outcome of writing one entity as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Key of the written entity.
    pub key: EntityKey,
    /// Version tag assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Modification time assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl BatchResult {
    /// Creates a result for `key` without store metadata.
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            etag: None,
            timestamp: None,
        }
    }

    /// Sets the version tag.
    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Sets the modification time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

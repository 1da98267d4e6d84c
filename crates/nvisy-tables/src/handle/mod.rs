//! Capabilities exposed by a remote table.
//!
//! The engines in this crate only rely on two provider primitives:
//! - [`SegmentSource`]: one cursor-paged fetch of at most [`MAX_PAGE_SIZE`] entities
//! - [`BatchWriter`]: one batch write of at most [`MAX_BATCH_SIZE`] entities
//!
//! [`EntityStore`] carries the single-entity pass-through operations, and
//! [`TableHandle`] bundles all three for a resolved table.
//!
//! [`MAX_PAGE_SIZE`]: crate::MAX_PAGE_SIZE
//! [`MAX_BATCH_SIZE`]: crate::MAX_BATCH_SIZE

mod provider;

use std::fmt;

use async_trait::async_trait;

pub use self::provider::TableProvider;
use crate::batch::{BatchResult, InsertMethod};
use crate::{ContinuationToken, Entity, EntityKey, Result, Segment, TableQuery};

/// Cursor-paged fetch primitive of a remote table.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Fetches one segment of entities matching `query`.
    ///
    /// `continuation = None` starts a new scan. When `query.take` is set the
    /// segment holds at most that many entities. A returned segment without
    /// a continuation marks the end of the result set.
    async fn fetch_segment(
        &self,
        query: &TableQuery,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Segment>;
}

/// Batch write primitive of a remote table.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Writes up to [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) entities with
    /// the same insert method.
    ///
    /// Returns one result per entity, in input order.
    async fn execute_batch(
        &self,
        entities: &[Entity],
        method: InsertMethod,
    ) -> Result<Vec<BatchResult>>;
}

/// Single-entity operations of a remote table.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Returns the entity stored under `key`, if any.
    async fn get(&self, key: &EntityKey) -> Result<Option<Entity>>;

    /// Inserts a new entity, failing with a conflict if the key exists.
    async fn insert(&self, entity: &Entity) -> Result<Entity>;

    /// Replaces an existing entity.
    ///
    /// When `etag` is set the write only succeeds if it matches the stored
    /// version.
    async fn replace(&self, entity: &Entity, etag: Option<&str>) -> Result<Entity>;

    /// Deletes an existing entity, optionally guarded by an etag.
    async fn delete(&self, key: &EntityKey, etag: Option<&str>) -> Result<()>;
}

/// A resolved table supporting fetches, batch writes and entity operations.
pub trait TableHandle: SegmentSource + BatchWriter + EntityStore + fmt::Debug {
    /// Returns the name of the backing table.
    fn name(&self) -> &str;
}

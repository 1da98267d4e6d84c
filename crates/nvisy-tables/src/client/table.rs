//! Resolved table with paging, batching and entity operations.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::batch::{BatchDispatcher, BatchResult, InsertMethod};
use crate::cancel::run_cancellable;
use crate::query::query_bounded_with;
use crate::scan::{EntityStream, scan_all_with, scan_with};
use crate::{
    Entity, EntityKey, EntityStore, Result, TRACING_TARGET_CLIENT, TableHandle, TableQuery,
};

/// A resolved table.
///
/// Cheap to clone; clones share the underlying handle. Every round trip
/// made through a `Table` is aborted when its cancellation token fires.
#[derive(Clone)]
pub struct Table {
    handle: Arc<dyn TableHandle>,
    dispatcher: BatchDispatcher,
    insert_method: InsertMethod,
    page_size: usize,
    cancel: CancellationToken,
}

impl Table {
    /// Wraps a resolved handle.
    pub(crate) fn new(
        handle: Arc<dyn TableHandle>,
        dispatcher: BatchDispatcher,
        insert_method: InsertMethod,
        page_size: usize,
    ) -> Self {
        Self {
            handle,
            dispatcher,
            insert_method,
            page_size,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a copy of this table whose round trips abort when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the name of the backing table.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Returns the underlying handle.
    pub fn handle(&self) -> &Arc<dyn TableHandle> {
        &self.handle
    }

    /// Lazily scans every entity matching `query`.
    pub fn scan(&self, query: TableQuery) -> EntityStream<'_> {
        scan_with(self.handle.as_ref(), query, self.cancel.clone())
    }

    /// Scans every entity matching `query` into a vector.
    #[tracing::instrument(skip(self), fields(table = %self.name()), target = TRACING_TARGET_CLIENT)]
    pub async fn scan_all(&self, query: TableQuery) -> Result<Vec<Entity>> {
        scan_all_with(self.handle.as_ref(), query, self.cancel.clone()).await
    }

    /// Returns exactly `min(count, available)` entities matching `query`.
    ///
    /// The per-page cap is written into `query.take` on every round trip.
    #[tracing::instrument(skip(self), fields(table = %self.name()), target = TRACING_TARGET_CLIENT)]
    pub async fn query(&self, query: &mut TableQuery, count: usize) -> Result<Vec<Entity>> {
        query_bounded_with(
            self.handle.as_ref(),
            query,
            count,
            self.page_size,
            &self.cancel,
        )
        .await
    }

    /// Runs `query` as a bounded query when `take` is set, as a full scan
    /// otherwise.
    pub async fn execute_query(&self, query: &mut TableQuery) -> Result<Vec<Entity>> {
        match query.take {
            Some(count) => self.query(query, count).await,
            None => self.scan_all(query.clone()).await,
        }
    }

    /// Writes `entities` with the configured default insert method.
    pub async fn insert_batch(&self, entities: &[Entity]) -> Result<Vec<BatchResult>> {
        self.insert_batch_with(entities, self.insert_method).await
    }

    /// Writes `entities` with `method`, returning results in input order.
    ///
    /// Writes larger than one batch are split into chunks that commit
    /// independently; on failure some chunks may already be written.
    #[tracing::instrument(
        skip(self, entities),
        fields(table = %self.name(), entities = entities.len()),
        target = TRACING_TARGET_CLIENT
    )]
    pub async fn insert_batch_with(
        &self,
        entities: &[Entity],
        method: InsertMethod,
    ) -> Result<Vec<BatchResult>> {
        self.dispatcher
            .dispatch_with(self.handle.as_ref(), entities, method, &self.cancel)
            .await
    }

    /// Returns the entity stored under `key`, if any.
    #[tracing::instrument(skip(self), fields(table = %self.name()), target = TRACING_TARGET_CLIENT)]
    pub async fn get(&self, key: &EntityKey) -> Result<Option<Entity>> {
        run_cancellable(&self.cancel, self.handle.get(key)).await
    }

    /// Inserts a new entity.
    #[tracing::instrument(skip(self, entity), fields(table = %self.name(), key = %entity.key()), target = TRACING_TARGET_CLIENT)]
    pub async fn insert(&self, entity: &Entity) -> Result<Entity> {
        run_cancellable(&self.cancel, self.handle.insert(entity)).await
    }

    /// Replaces an existing entity, optionally guarded by an etag.
    #[tracing::instrument(skip(self, entity), fields(table = %self.name(), key = %entity.key()), target = TRACING_TARGET_CLIENT)]
    pub async fn replace(&self, entity: &Entity, etag: Option<&str>) -> Result<Entity> {
        run_cancellable(&self.cancel, self.handle.replace(entity, etag)).await
    }

    /// Deletes an existing entity, optionally guarded by an etag.
    #[tracing::instrument(skip(self), fields(table = %self.name()), target = TRACING_TARGET_CLIENT)]
    pub async fn delete(&self, key: &EntityKey, etag: Option<&str>) -> Result<()> {
        run_cancellable(&self.cancel, self.handle.delete(key, etag)).await
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("dispatcher", &self.dispatcher)
            .field("insert_method", &self.insert_method)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

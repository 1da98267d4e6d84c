//! In-memory table honoring the remote store's paging and batch limits.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jiff::Timestamp;

use crate::batch::{BatchResult, InsertMethod};
use crate::{
    BatchWriter, ContinuationToken, Entity, EntityKey, EntityStore, Error, ErrorKind,
    MAX_BATCH_SIZE, MAX_PAGE_SIZE, Result, Segment, SegmentSource, TableHandle, TableQuery,
};

/// Behavior knobs of a [`MemoryTable`].
#[derive(Debug, Clone)]
pub struct MemoryTableConfig {
    /// Page sizes used by consecutive fetches, cycled.
    pub page_sizes: Vec<usize>,
    /// Delays applied to consecutive batch calls, indexed by call order.
    pub batch_delays: Vec<Duration>,
    /// Fetch call index that fails, with the error kind to return.
    pub fetch_failure: Option<(usize, ErrorKind)>,
    /// Batch call index that fails, with the error kind to return.
    pub batch_failure: Option<(usize, ErrorKind)>,
}

impl Default for MemoryTableConfig {
    fn default() -> Self {
        Self {
            page_sizes: vec![MAX_PAGE_SIZE],
            batch_delays: Vec::new(),
            fetch_failure: None,
            batch_failure: None,
        }
    }
}

impl MemoryTableConfig {
    /// Sets the page sizes of consecutive fetches.
    ///
    /// Each size is clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn with_page_sizes(mut self, page_sizes: Vec<usize>) -> Self {
        self.page_sizes = page_sizes
            .into_iter()
            .map(|size| size.clamp(1, MAX_PAGE_SIZE))
            .collect();
        if self.page_sizes.is_empty() {
            self.page_sizes.push(MAX_PAGE_SIZE);
        }
        self
    }

    /// Delays consecutive batch calls before they are applied.
    #[must_use]
    pub fn with_batch_delays(mut self, delays: Vec<Duration>) -> Self {
        self.batch_delays = delays;
        self
    }

    /// Fails the fetch call with the given index.
    #[must_use]
    pub fn with_fetch_failure(mut self, call: usize, kind: ErrorKind) -> Self {
        self.fetch_failure = Some((call, kind));
        self
    }

    /// Fails the batch call with the given index.
    #[must_use]
    pub fn with_batch_failure(mut self, call: usize, kind: ErrorKind) -> Self {
        self.batch_failure = Some((call, kind));
        self
    }
}

#[derive(Debug, Default)]
struct TableState {
    rows: BTreeMap<EntityKey, Entity>,
    version: u64,
    requested_takes: Vec<Option<usize>>,
    batch_sizes: Vec<usize>,
    completed_batches: Vec<usize>,
}

impl TableState {
    fn stamp(&mut self, mut entity: Entity) -> Entity {
        self.version += 1;
        entity.etag = Some(format!("W/\"{}\"", self.version));
        entity.timestamp = Some(Timestamp::now());
        entity
    }
}

/// In-memory table keyed by `(partition key, row key)`.
///
/// Entities are returned in key order. Fetches return at most
/// `min(take, page size)` entities with an opaque continuation token while
/// more matches remain. Batches are applied atomically and reject more than
/// [`MAX_BATCH_SIZE`] entities, duplicate keys and missing keys.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    config: MemoryTableConfig,
    state: Mutex<TableState>,
    fetch_calls: AtomicUsize,
    batch_calls: AtomicUsize,
}

impl MemoryTable {
    /// Creates an empty table with default behavior.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, MemoryTableConfig::default())
    }

    /// Creates an empty table with the given behavior.
    pub fn with_config(name: impl Into<String>, config: MemoryTableConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(TableState::default()),
            fetch_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Stores entities directly, bypassing limits and call recording.
    pub fn seed(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut state = self.state();
        for entity in entities {
            let entity = state.stamp(entity);
            state.rows.insert(entity.key(), entity);
        }
    }

    /// Returns a stored entity.
    pub fn entity(&self, key: &EntityKey) -> Option<Entity> {
        self.state().rows.get(key).cloned()
    }

    /// Returns the number of stored entities.
    pub fn len(&self) -> usize {
        self.state().rows.len()
    }

    /// Returns true if no entity is stored.
    pub fn is_empty(&self) -> bool {
        self.state().rows.is_empty()
    }

    /// Returns the number of fetch calls, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Returns the `take` of every fetch call, in call order.
    pub fn requested_takes(&self) -> Vec<Option<usize>> {
        self.state().requested_takes.clone()
    }

    /// Returns the entity count of every batch call, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state().batch_sizes.clone()
    }

    /// Returns batch call indices in the order the calls completed.
    pub fn completed_batches(&self) -> Vec<usize> {
        self.state().completed_batches.clone()
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn page_size(&self, call: usize) -> usize {
        self.config.page_sizes[call % self.config.page_sizes.len()]
    }

    fn injected(failure: Option<(usize, ErrorKind)>, call: usize) -> Result<()> {
        match failure {
            Some((index, kind)) if index == call => {
                Err(Error::new(kind).with_message(format!("injected failure on call {call}")))
            }
            _ => Ok(()),
        }
    }

    fn apply_batch(
        &self,
        call: usize,
        entities: &[Entity],
        method: InsertMethod,
    ) -> Result<Vec<BatchResult>> {
        let mut state = self.state();
        let mut seen = HashSet::with_capacity(entities.len());

        for entity in entities {
            if !entity.has_key() {
                return Err(Error::invalid_entity()
                    .with_message(format!("entity '{}' is missing a key part", entity.key())));
            }
            if !seen.insert(entity.key()) {
                return Err(Error::invalid_input()
                    .with_message(format!("duplicate key '{}' in batch", entity.key())));
            }
            if !method.allows_existing() && state.rows.contains_key(&entity.key()) {
                return Err(Error::conflict()
                    .with_message(format!("entity '{}' already exists", entity.key())));
            }
        }

        let mut results = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = entity.key();
            let merged = match (method, state.rows.get(&key)) {
                (InsertMethod::InsertOrMerge, Some(existing)) => {
                    let mut merged = existing.clone();
                    merged.properties.extend(entity.properties.clone());
                    merged
                }
                _ => entity.clone(),
            };

            let stored = state.stamp(merged);
            results.push(BatchResult {
                key: key.clone(),
                etag: stored.etag.clone(),
                timestamp: stored.timestamp,
            });
            state.rows.insert(key, stored);
        }

        state.completed_batches.push(call);
        Ok(results)
    }
}

#[async_trait]
impl SegmentSource for MemoryTable {
    async fn fetch_segment(
        &self,
        query: &TableQuery,
        continuation: Option<&ContinuationToken>,
    ) -> Result<Segment> {
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        state.requested_takes.push(query.take);
        Self::injected(self.config.fetch_failure, call)?;

        let start = match continuation {
            Some(token) => Bound::Included(decode_token(token)?),
            None => Bound::Unbounded,
        };
        let limit = query.take.map_or(self.page_size(call), |take| {
            take.min(self.page_size(call))
        });

        let mut matches = state
            .rows
            .range((start, Bound::Unbounded))
            .map(|(_, entity)| entity)
            .filter(|entity| query.filter.as_ref().is_none_or(|f| f.matches(entity)));

        let entities: Vec<Entity> = matches
            .by_ref()
            .take(limit)
            .map(|entity| project(entity, query.select.as_deref()))
            .collect();
        let continuation = matches.next().map(|next| encode_token(&next.key()));

        Ok(Segment::new(entities, continuation))
    }
}

#[async_trait]
impl BatchWriter for MemoryTable {
    async fn execute_batch(
        &self,
        entities: &[Entity],
        method: InsertMethod,
    ) -> Result<Vec<BatchResult>> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.state().batch_sizes.push(entities.len());

        if let Some(delay) = self.config.batch_delays.get(call).filter(|d| !d.is_zero()) {
            tokio::time::sleep(*delay).await;
        }

        Self::injected(self.config.batch_failure, call)?;

        if entities.len() > MAX_BATCH_SIZE {
            return Err(Error::invalid_input().with_message(format!(
                "batch of {} entities exceeds the limit of {}",
                entities.len(),
                MAX_BATCH_SIZE
            )));
        }

        self.apply_batch(call, entities, method)
    }
}

#[async_trait]
impl EntityStore for MemoryTable {
    async fn get(&self, key: &EntityKey) -> Result<Option<Entity>> {
        Ok(self.entity(key))
    }

    async fn insert(&self, entity: &Entity) -> Result<Entity> {
        if !entity.has_key() {
            return Err(Error::invalid_entity().with_message("entity is missing a key part"));
        }

        let mut state = self.state();
        let key = entity.key();
        if state.rows.contains_key(&key) {
            return Err(Error::conflict().with_message(format!("entity '{key}' already exists")));
        }

        let stored = state.stamp(entity.clone());
        state.rows.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(&self, entity: &Entity, etag: Option<&str>) -> Result<Entity> {
        let mut state = self.state();
        let key = entity.key();
        let existing = state
            .rows
            .get(&key)
            .ok_or_else(|| Error::not_found().with_message(format!("entity '{key}' not found")))?;
        check_etag(existing, etag)?;

        let stored = state.stamp(entity.clone());
        state.rows.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, key: &EntityKey, etag: Option<&str>) -> Result<()> {
        let mut state = self.state();
        let existing = state
            .rows
            .get(key)
            .ok_or_else(|| Error::not_found().with_message(format!("entity '{key}' not found")))?;
        check_etag(existing, etag)?;

        state.rows.remove(key);
        Ok(())
    }
}

impl TableHandle for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }
}

fn check_etag(existing: &Entity, etag: Option<&str>) -> Result<()> {
    match etag {
        Some(expected) if existing.etag.as_deref() != Some(expected) => {
            Err(Error::precondition_failed().with_message(format!(
                "etag mismatch for entity '{}'",
                existing.key()
            )))
        }
        _ => Ok(()),
    }
}

fn project(entity: &Entity, select: Option<&[String]>) -> Entity {
    let Some(select) = select else {
        return entity.clone();
    };

    let mut projected = entity.clone();
    projected
        .properties
        .retain(|name, _| select.iter().any(|selected| selected == name));
    projected
}

fn encode_token(key: &EntityKey) -> ContinuationToken {
    let raw = format!("{}\n{}", key.partition_key, key.row_key);
    ContinuationToken::new(URL_SAFE_NO_PAD.encode(raw))
}

fn decode_token(token: &ContinuationToken) -> Result<EntityKey> {
    let invalid = || Error::invalid_input().with_message("malformed continuation token");

    let bytes = URL_SAFE_NO_PAD
        .decode(token.as_str())
        .map_err(|e| invalid().with_source(e))?;
    let raw = String::from_utf8(bytes).map_err(|e| invalid().with_source(e))?;
    let (partition_key, row_key) = raw.split_once('\n').ok_or_else(invalid)?;

    Ok(EntityKey::new(partition_key, row_key))
}

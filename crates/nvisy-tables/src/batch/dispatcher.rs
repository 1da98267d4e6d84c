//! Chunked, concurrent batch dispatch.

use futures::future::join_all;
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use super::{BatchResult, InsertMethod};
use crate::cancel::run_cancellable;
use crate::{
    BatchFailure, BatchWriter, Entity, Error, MAX_BATCH_SIZE, Result, TRACING_TARGET_BATCH,
};

/// Splits writes into provider-sized chunks and dispatches them concurrently.
///
/// Results are reassembled by chunk submission position, so the output
/// order always matches the input order regardless of which chunk
/// completes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDispatcher {
    batch_size: usize,
    concurrency: Option<usize>,
}

impl Default for BatchDispatcher {
    fn default() -> Self {
        Self::new(MAX_BATCH_SIZE)
    }
}

impl BatchDispatcher {
    /// Creates a dispatcher writing at most `batch_size` entities per call.
    ///
    /// The size is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.clamp(1, MAX_BATCH_SIZE),
            concurrency: None,
        }
    }

    /// Limits the number of chunks in flight at once.
    ///
    /// Without a limit every chunk is dispatched immediately.
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit.max(1));
        self
    }

    /// Returns the chunk size.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the number of chunks a write of `len` entities is split into.
    #[inline]
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }

    /// Writes all `entities` using `method`.
    ///
    /// See [`BatchDispatcher::dispatch_with`].
    pub async fn dispatch<W>(
        &self,
        writer: &W,
        entities: &[Entity],
        method: InsertMethod,
    ) -> Result<Vec<BatchResult>>
    where
        W: BatchWriter + ?Sized,
    {
        self.dispatch_with(writer, entities, method, &CancellationToken::new())
            .await
    }

    /// Writes all `entities` using `method`, aborting in-flight chunks when
    /// `cancel` fires.
    ///
    /// Every chunk is awaited before returning. If no chunk committed, the
    /// first chunk error is returned as is. If some chunks committed and
    /// others failed, the error has kind
    /// [`PartialBatch`](crate::ErrorKind::PartialBatch), wraps the error of
    /// the first failed chunk, and reports the committed chunks through
    /// [`Error::batch_failure`].
    pub async fn dispatch_with<W>(
        &self,
        writer: &W,
        entities: &[Entity],
        method: InsertMethod,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>>
    where
        W: BatchWriter + ?Sized,
    {
        let chunks = self.chunk_count(entities.len());
        if chunks == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!(
            target: TRACING_TARGET_BATCH,
            entities = entities.len(),
            chunks,
            batch_size = self.batch_size,
            method = %method,
            "Dispatching batch write"
        );

        let requests = entities
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, chunk)| async move {
                let outcome = run_cancellable(cancel, writer.execute_batch(chunk, method))
                    .await
                    .and_then(|results| check_len(index, chunk.len(), results));

                tracing::trace!(
                    target: TRACING_TARGET_BATCH,
                    chunk = index,
                    entities = chunk.len(),
                    success = outcome.is_ok(),
                    "Chunk completed"
                );

                (index, outcome)
            });

        let outcomes: Vec<_> = match self.concurrency {
            Some(limit) => stream::iter(requests).buffer_unordered(limit).collect().await,
            None => join_all(requests).await,
        };

        let mut slots: Vec<Option<Vec<BatchResult>>> = (0..chunks).map(|_| None).collect();
        let mut failure: Option<(usize, Error)> = None;

        for (index, outcome) in outcomes {
            match outcome {
                Ok(results) => slots[index] = Some(results),
                Err(error) => {
                    if failure.as_ref().is_none_or(|(first, _)| index < *first) {
                        failure = Some((index, error));
                    }
                }
            }
        }

        if let Some((chunk, error)) = failure {
            let committed: Vec<usize> = slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| slot.is_some().then_some(index))
                .collect();

            tracing::warn!(
                target: TRACING_TARGET_BATCH,
                chunk,
                chunks,
                committed = committed.len(),
                error = %error,
                "Batch write failed"
            );

            if committed.is_empty() {
                return Err(error);
            }

            let failure = BatchFailure {
                chunk,
                chunks,
                committed,
            };
            return Err(Error::partial_batch(failure, error));
        }

        let results: Vec<BatchResult> = slots.into_iter().flatten().flatten().collect();

        tracing::debug!(
            target: TRACING_TARGET_BATCH,
            results = results.len(),
            chunks,
            "Batch write completed"
        );

        Ok(results)
    }
}

fn check_len(index: usize, expected: usize, results: Vec<BatchResult>) -> Result<Vec<BatchResult>> {
    if results.len() == expected {
        return Ok(results);
    }

    Err(Error::provider().with_message(format!(
        "chunk {} returned {} results for {} entities",
        index,
        results.len(),
        expected
    )))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{MemoryTable, MemoryTableConfig};
    use crate::{EntityKey, ErrorKind};

    fn entities(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|i| Entity::new(format!("p{}", i / 100), format!("r{i:05}")).with_property("Seq", i))
            .collect()
    }

    #[tokio::test]
    async fn test_chunk_sizes() {
        for (count, expected) in [
            (0, vec![]),
            (1, vec![1]),
            (99, vec![99]),
            (100, vec![100]),
            (101, vec![100, 1]),
            (250, vec![100, 100, 50]),
            (300, vec![100, 100, 100]),
        ] {
            let table = MemoryTable::new("batch");
            let dispatcher = BatchDispatcher::default();

            let results = dispatcher
                .dispatch(&table, &entities(count), InsertMethod::Insert)
                .await
                .unwrap();

            assert_eq!(results.len(), count);
            assert_eq!(dispatcher.chunk_count(count), expected.len());
            let mut sizes = table.batch_sizes();
            sizes.sort_unstable_by(|a, b| b.cmp(a));
            assert_eq!(sizes, expected);
            assert_eq!(table.len(), count);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_follow_input_order() {
        let config = MemoryTableConfig::default().with_batch_delays(vec![
            Duration::from_millis(300),
            Duration::from_millis(200),
            Duration::from_millis(100),
            Duration::ZERO,
        ]);
        let table = MemoryTable::with_config("batch", config);
        let input = entities(350);

        let results = BatchDispatcher::default()
            .dispatch(&table, &input, InsertMethod::Insert)
            .await
            .unwrap();

        assert_eq!(table.completed_batches(), vec![3, 2, 1, 0]);
        let keys: Vec<EntityKey> = results.into_iter().map(|r| r.key).collect();
        let expected: Vec<EntityKey> = input.iter().map(Entity::key).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_concurrency_keeps_order() {
        let config = MemoryTableConfig::default().with_batch_delays(vec![
            Duration::from_millis(50),
            Duration::ZERO,
            Duration::from_millis(10),
        ]);
        let table = MemoryTable::with_config("batch", config);
        let input = entities(250);

        let results = BatchDispatcher::new(100)
            .with_concurrency(2)
            .dispatch(&table, &input, InsertMethod::Insert)
            .await
            .unwrap();

        assert_eq!(table.completed_batches(), vec![1, 2, 0]);
        let keys: Vec<EntityKey> = results.iter().map(|r| r.key.clone()).collect();
        let expected: Vec<EntityKey> = input.iter().map(Entity::key).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_custom_batch_size() {
        let table = MemoryTable::new("batch");

        BatchDispatcher::new(30)
            .dispatch(&table, &entities(100), InsertMethod::Insert)
            .await
            .unwrap();

        assert_eq!(table.batch_sizes(), vec![30, 30, 30, 10]);
    }

    #[tokio::test]
    async fn test_batch_size_is_clamped() {
        assert_eq!(BatchDispatcher::new(0).batch_size(), 1);
        assert_eq!(BatchDispatcher::new(500).batch_size(), MAX_BATCH_SIZE);
    }

    #[tokio::test]
    async fn test_insert_conflicts_on_existing_key() {
        let table = MemoryTable::new("batch");
        table.seed([Entity::new("p0", "r00001").with_property("Seq", "old")]);

        let error = BatchDispatcher::default()
            .dispatch(&table, &entities(2), InsertMethod::Insert)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_or_replace_overwrites() {
        let table = MemoryTable::new("batch");
        table.seed([Entity::new("p0", "r00001")
            .with_property("Seq", "old")
            .with_property("Stale", true)]);

        BatchDispatcher::default()
            .dispatch(&table, &entities(2), InsertMethod::InsertOrReplace)
            .await
            .unwrap();

        let stored = table.entity(&EntityKey::new("p0", "r00001")).unwrap();
        assert_eq!(stored.property("Seq"), Some(&serde_json::json!(1)));
        assert_eq!(stored.property("Stale"), None);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_or_merge_keeps_other_properties() {
        let table = MemoryTable::new("batch");
        table.seed([Entity::new("p0", "r00001")
            .with_property("Seq", "old")
            .with_property("Stale", true)]);

        BatchDispatcher::default()
            .dispatch(&table, &entities(2), InsertMethod::InsertOrMerge)
            .await
            .unwrap();

        let stored = table.entity(&EntityKey::new("p0", "r00001")).unwrap();
        assert_eq!(stored.property("Seq"), Some(&serde_json::json!(1)));
        assert_eq!(stored.property("Stale"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_partial_failure_reports_committed_chunks() {
        let config = MemoryTableConfig::default().with_batch_failure(1, ErrorKind::Throttled);
        let table = MemoryTable::with_config("batch", config);

        let error = BatchDispatcher::default()
            .dispatch(&table, &entities(250), InsertMethod::Insert)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::PartialBatch);
        assert_eq!(error.root_kind(), ErrorKind::Throttled);
        let failure = error.batch_failure().unwrap();
        assert_eq!(failure.chunk, 1);
        assert_eq!(failure.chunks, 3);
        assert_eq!(failure.committed, vec![0, 2]);
        assert_eq!(table.len(), 150);
    }

    #[tokio::test]
    async fn test_single_chunk_failure_is_unmodified() {
        let config = MemoryTableConfig::default().with_batch_failure(0, ErrorKind::Transport);
        let table = MemoryTable::with_config("batch", config);

        let error = BatchDispatcher::default()
            .dispatch(&table, &entities(10), InsertMethod::Insert)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert!(error.batch_failure().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_rejected_by_provider() {
        let table = MemoryTable::new("batch");
        let mut input = entities(3);
        input[1].row_key.clear();

        let error = BatchDispatcher::default()
            .dispatch(&table, &input, InsertMethod::Insert)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::InvalidEntity);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_input_is_not_mutated() {
        let table = MemoryTable::new("batch");
        let input = entities(120);
        let snapshot = input.clone();

        BatchDispatcher::default()
            .dispatch(&table, &input, InsertMethod::Insert)
            .await
            .unwrap();

        assert_eq!(input, snapshot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_pending_chunks() {
        let config = MemoryTableConfig::default().with_batch_delays(vec![
            Duration::ZERO,
            Duration::from_secs(60),
        ]);
        let table = MemoryTable::with_config("batch", config);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let error = BatchDispatcher::default()
            .dispatch_with(&table, &entities(200), InsertMethod::Insert, &cancel)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::PartialBatch);
        assert_eq!(error.root_kind(), ErrorKind::Cancelled);
        assert_eq!(table.len(), 100);
    }
}

//! Full-table scans over a cursor-paged source.
//!
//! A scan follows the continuation chain of a [`SegmentSource`] until the
//! provider stops returning a token. Entities are yielded lazily, one
//! segment fetch per suspension point, in provider iteration order.

use async_stream::try_stream;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::{ContinuationToken, Entity, Result, SegmentSource, TRACING_TARGET_SCAN, TableQuery};

/// A boxed stream of scanned entities.
pub type EntityStream<'a> = BoxStream<'a, Result<Entity>>;

/// Lazily scans every entity matching `query`.
///
/// Each call starts a fresh continuation chain. The stream ends after the
/// first segment without a continuation, or with the first fetch error.
pub fn scan<'a, S>(source: &'a S, query: TableQuery) -> EntityStream<'a>
where
    S: SegmentSource + ?Sized,
{
    scan_with(source, query, CancellationToken::new())
}

/// Lazily scans every entity matching `query`, aborting when `cancel` fires.
pub fn scan_with<'a, S>(
    source: &'a S,
    query: TableQuery,
    cancel: CancellationToken,
) -> EntityStream<'a>
where
    S: SegmentSource + ?Sized,
{
    let stream = try_stream! {
        let mut continuation: Option<ContinuationToken> = None;
        let mut segments = 0usize;
        let mut total = 0usize;

        loop {
            let round_trip = source.fetch_segment(&query, continuation.as_ref());
            let segment = run_cancellable(&cancel, round_trip).await?;
            let (entities, next) = segment.into_parts();

            segments += 1;
            total += entities.len();
            tracing::trace!(
                target: TRACING_TARGET_SCAN,
                segment = segments,
                entities = entities.len(),
                has_more = next.is_some(),
                "Fetched scan segment"
            );

            for entity in entities {
                yield entity;
            }

            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_SCAN,
            segments,
            total,
            "Scan completed"
        );
    };

    Box::pin(stream)
}

/// Scans every entity matching `query` into a vector.
///
/// On failure the entities collected so far are dropped and only the
/// error is returned.
pub async fn scan_all<S>(source: &S, query: TableQuery) -> Result<Vec<Entity>>
where
    S: SegmentSource + ?Sized,
{
    scan(source, query).try_collect().await
}

/// Like [`scan_all`], aborting when `cancel` fires.
pub async fn scan_all_with<S>(
    source: &S,
    query: TableQuery,
    cancel: CancellationToken,
) -> Result<Vec<Entity>>
where
    S: SegmentSource + ?Sized,
{
    scan_with(source, query, cancel).try_collect().await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use futures::StreamExt;

    use super::*;
    use crate::mock::{MemoryTable, MemoryTableConfig};
    use crate::{ErrorKind, Filter};

    fn seeded(rows: usize, config: MemoryTableConfig) -> MemoryTable {
        let table = MemoryTable::with_config("scan", config);
        table.seed((0..rows).map(|i| Entity::new(format!("p{}", i % 3), format!("r{i:05}"))));
        table
    }

    #[tokio::test]
    async fn test_scan_crosses_page_boundaries() {
        for page_sizes in [vec![1], vec![7], vec![3, 1, 5], vec![1000], vec![250, 999]] {
            let table = seeded(1234, MemoryTableConfig::default().with_page_sizes(page_sizes));

            let entities = scan_all(&table, TableQuery::new()).await.unwrap();
            let keys: HashSet<_> = entities.iter().map(Entity::key).collect();

            assert_eq!(entities.len(), 1234);
            assert_eq!(keys.len(), 1234);
        }
    }

    #[tokio::test]
    async fn test_scan_round_trips() {
        let table = seeded(25, MemoryTableConfig::default().with_page_sizes(vec![10]));

        let entities = scan_all(&table, TableQuery::new()).await.unwrap();

        assert_eq!(entities.len(), 25);
        assert_eq!(table.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_table_single_fetch() {
        let table = seeded(0, MemoryTableConfig::default());

        let entities = scan_all(&table, TableQuery::new()).await.unwrap();

        assert!(entities.is_empty());
        assert_eq!(table.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_scan_is_repeatable() {
        let table = seeded(57, MemoryTableConfig::default().with_page_sizes(vec![4, 9]));
        let query = TableQuery::new().with_filter(Filter::partition("p1"));

        let first = scan_all(&table, query.clone()).await.unwrap();
        let second = scan_all(&table, query).await.unwrap();

        assert_eq!(first.len(), 19);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scan_is_lazy() {
        let table = seeded(30, MemoryTableConfig::default().with_page_sizes(vec![10]));

        let first: Vec<_> = scan(&table, TableQuery::new()).take(5).collect().await;

        assert_eq!(first.len(), 5);
        assert_eq!(table.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_scan() {
        let config = MemoryTableConfig::default()
            .with_page_sizes(vec![10])
            .with_fetch_failure(2, ErrorKind::Transport);
        let table = seeded(50, config);

        let error = scan_all(&table, TableQuery::new()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(table.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let table = seeded(50, MemoryTableConfig::default().with_page_sizes(vec![10]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = scan_all_with(&table, TableQuery::new(), cancel)
            .await
            .unwrap_err();

        assert!(error.is_cancelled());
        assert_eq!(table.fetch_count(), 0);
    }
}

//! Count-bounded queries.

use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::{
    ContinuationToken, Entity, MAX_PAGE_SIZE, Result, SegmentSource, TRACING_TARGET_QUERY,
    TableQuery,
};

/// Returns exactly `min(count, available)` entities matching `query`.
///
/// Uses the provider page limit of [`MAX_PAGE_SIZE`]. See
/// [`query_bounded_with`] for details.
pub async fn query_bounded<S>(
    source: &S,
    query: &mut TableQuery,
    count: usize,
) -> Result<Vec<Entity>>
where
    S: SegmentSource + ?Sized,
{
    query_bounded_with(source, query, count, MAX_PAGE_SIZE, &CancellationToken::new()).await
}

/// Returns exactly `min(count, available)` entities matching `query`.
///
/// Every round trip writes `min(remaining, max_page_size)` into
/// `query.take`, and `remaining` shrinks by that requested cap rather than
/// by the number of entities the provider returned. Fetching stops once
/// `count` entities are collected, once the continuation chain ends, or
/// once the requested caps add up to `count`. In the last case a provider
/// that returned short pages leaves the result below `count`.
///
/// `count = 0` performs no fetch. `max_page_size` is clamped to
/// `1..=MAX_PAGE_SIZE`.
pub async fn query_bounded_with<S>(
    source: &S,
    query: &mut TableQuery,
    count: usize,
    max_page_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Entity>>
where
    S: SegmentSource + ?Sized,
{
    let max_page_size = max_page_size.clamp(1, MAX_PAGE_SIZE);
    let mut entities = Vec::with_capacity(count.min(max_page_size));

    if count == 0 {
        tracing::debug!(target: TRACING_TARGET_QUERY, "Zero entities requested, skipping fetch");
        return Ok(entities);
    }

    let mut remaining = count;
    let mut continuation: Option<ContinuationToken> = None;
    let mut round_trips = 0usize;

    loop {
        let cap = remaining.min(max_page_size);
        query.take = Some(cap);

        let round_trip = source.fetch_segment(query, continuation.as_ref());
        let (page, next) = run_cancellable(cancel, round_trip).await?.into_parts();

        round_trips += 1;
        tracing::trace!(
            target: TRACING_TARGET_QUERY,
            round_trip = round_trips,
            requested = cap,
            returned = page.len(),
            has_more = next.is_some(),
            "Fetched bounded segment"
        );

        entities.extend(page);
        remaining = remaining.saturating_sub(cap);
        continuation = next;

        if entities.len() >= count || continuation.is_none() {
            break;
        }

        if remaining == 0 {
            tracing::warn!(
                target: TRACING_TARGET_QUERY,
                requested = count,
                returned = entities.len(),
                "Provider returned short pages, stopping before the requested count"
            );
            break;
        }
    }

    entities.truncate(count);

    tracing::debug!(
        target: TRACING_TARGET_QUERY,
        requested = count,
        returned = entities.len(),
        round_trips,
        "Bounded query completed"
    );

    Ok(entities)
}

//! Continuation tokens and query segments.

use derive_more::{AsRef, Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::Entity;

/// Opaque resumption token returned by a segment fetch.
///
/// Only the provider that issued a token knows how to read it; callers pass
/// it back unchanged to continue a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRef, Display, From, Into)]
#[as_ref(str)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wraps a provider-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One bounded page of entities returned by a single fetch.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    /// Entities in provider iteration order.
    pub entities: Vec<Entity>,
    /// Token for the next segment, `None` once the result set is exhausted.
    pub continuation: Option<ContinuationToken>,
}

impl Segment {
    /// Creates a segment.
    pub fn new(entities: Vec<Entity>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            entities,
            continuation,
        }
    }

    /// Creates a final segment with no continuation.
    pub fn last(entities: Vec<Entity>) -> Self {
        Self::new(entities, None)
    }

    /// Returns true if another segment follows this one.
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }

    /// Returns the number of entities in this segment.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the segment carries no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Splits the segment into its entities and continuation.
    pub fn into_parts(self) -> (Vec<Entity>, Option<ContinuationToken>) {
        (self.entities, self.continuation)
    }
}

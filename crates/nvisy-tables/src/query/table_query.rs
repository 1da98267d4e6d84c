//! Query descriptor passed to segment sources.

use serde::{Deserialize, Serialize};

use super::Filter;

/// Query descriptor: filter, projection and requested count.
///
/// `take` doubles as the per-page cap a segment source must honor. The
/// bounded query engine rewrites it on every round trip, which is why the
/// engine borrows the query mutably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableQuery {
    /// Filter expression, `None` matches every entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    /// Property names to return, `None` returns all properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// Requested number of entities, `None` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<usize>,
}

impl TableQuery {
    /// Creates a query matching every entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Restricts the returned properties.
    #[must_use]
    pub fn with_select<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the requested number of entities.
    #[must_use]
    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }

    /// Returns the rendered filter expression, if any.
    pub fn filter_string(&self) -> Option<String> {
        self.filter.as_ref().map(ToString::to_string)
    }

    /// Returns true if the query asks for a bounded number of entities.
    pub fn is_bounded(&self) -> bool {
        self.take.is_some()
    }
}

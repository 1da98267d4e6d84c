#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for full-table scans.
///
/// Use this target for logging segment fetches driven by the scan iterator.
pub const TRACING_TARGET_SCAN: &str = "nvisy_tables::scan";

/// Tracing target for count-bounded queries.
///
/// Use this target for logging page caps and round trips of bounded queries.
pub const TRACING_TARGET_QUERY: &str = "nvisy_tables::query";

/// Tracing target for batch dispatch.
///
/// Use this target for logging chunk partitioning, dispatch and reassembly.
pub const TRACING_TARGET_BATCH: &str = "nvisy_tables::batch";

/// Tracing target for table handle resolution.
///
/// Use this target for logging handle cache hits, misses and table creation.
pub const TRACING_TARGET_RESOLVER: &str = "nvisy_tables::resolver";

/// Tracing target for client-level operations.
pub const TRACING_TARGET_CLIENT: &str = "nvisy_tables::client";

/// Hard limit on entities returned by a single segment fetch.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Hard limit on entities written by a single batch call.
pub const MAX_BATCH_SIZE: usize = 100;

mod cancel;
mod entity;
mod error;
mod resolver;
mod segment;

pub mod batch;
pub mod client;
pub mod handle;
pub mod prelude;
pub mod query;
pub mod scan;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use batch::{BatchDispatcher, BatchResult, InsertMethod};
pub use client::{Table, TableClient, TablesConfig};
pub use entity::{Entity, EntityKey};
pub use error::{BatchFailure, BoxedError, Error, ErrorKind, Result};
pub use handle::{BatchWriter, EntityStore, SegmentSource, TableHandle, TableProvider};
pub use query::{Filter, TableQuery};
pub use resolver::TableResolver;
pub use segment::{ContinuationToken, Segment};

//! Query descriptors and count-bounded query execution.
//!
//! - [`TableQuery`]: filter, projection and requested count
//! - [`Filter`]: composable filter expressions
//! - [`query_bounded`]: returns exactly `min(take, available)` entities

mod bounded;
mod filter;
mod table_query;

pub use bounded::{query_bounded, query_bounded_with};
pub use filter::{CompareOp, Filter, PARTITION_KEY, ROW_KEY};
pub use table_query::TableQuery;

//! Prelude module for nvisy-tables.
//!
//! This module re-exports the most commonly used types and traits from
//! nvisy-tables, making it easy to import everything you need with a single
//! `use` statement.
//!
//! # Example
//!
//! ```rust,ignore
//! use nvisy_tables::prelude::*;
//!
//! # async fn example(provider: std::sync::Arc<dyn TableProvider>) -> Result<()> {
//! let client = TableClient::new(provider, TablesConfig::new())?;
//! let users = client.table("users").await?;
//! let first = users.query(&mut TableQuery::new(), 10).await?;
//! # Ok(())
//! # }
//! ```

// Client types
pub use crate::client::{Table, TableClient, TablesConfig};
// Data types
pub use crate::entity::{Entity, EntityKey};
pub use crate::segment::{ContinuationToken, Segment};
// Query types
pub use crate::query::{CompareOp, Filter, TableQuery};
// Batch types
pub use crate::batch::{BatchDispatcher, BatchResult, InsertMethod};
// Collaborator traits
pub use crate::handle::{BatchWriter, EntityStore, SegmentSource, TableHandle, TableProvider};
// Error types
pub use crate::{BatchFailure, Error, ErrorKind, Result};

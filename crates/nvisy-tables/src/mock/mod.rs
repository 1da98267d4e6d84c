//! In-memory table store for testing.
//!
//! [`MemoryTable`] implements every table capability with the same limits
//! as the remote store (pages of at most 1000 entities, batches of at most
//! 100) and records each call, so paging and batching behavior can be
//! asserted without a network. [`MemoryProvider`] hands out tables and
//! counts creations.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! nvisy-tables = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nvisy_tables::mock::{MemoryTable, MemoryTableConfig};
//!
//! let table = MemoryTable::with_config(
//!     "users",
//!     MemoryTableConfig::default().with_page_sizes(vec![10]),
//! );
//! table.seed(entities);
//! let all = nvisy_tables::scan::scan_all(&table, TableQuery::new()).await?;
//! assert_eq!(table.fetch_count(), all.len().div_ceil(10));
//! ```

mod memory_provider;
mod memory_table;

pub use memory_provider::MemoryProvider;
pub use memory_table::{MemoryTable, MemoryTableConfig};

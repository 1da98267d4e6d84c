//! Table client, configuration and resolved tables.

mod table;
mod table_client;
mod tables_config;

pub use table::Table;
pub use table_client::TableClient;
pub use tables_config::TablesConfig;

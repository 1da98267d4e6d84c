//! Table client wrapper and handle resolution.

use std::sync::Arc;

use super::{Table, TablesConfig};
use crate::batch::BatchDispatcher;
use crate::{Error, Result, TRACING_TARGET_CLIENT, TableProvider, TableResolver};

/// Minimum length of a table name.
const MIN_TABLE_NAME_LEN: usize = 3;

/// Maximum length of a table name.
const MAX_TABLE_NAME_LEN: usize = 63;

/// Entry point for working with tables of one store.
///
/// This wrapper is cheaply cloneable and thread-safe. Clones share the
/// configuration and the handle cache, so a table is created at most once
/// per client no matter how many tasks ask for it concurrently.
#[derive(Debug, Clone)]
pub struct TableClient {
    inner: Arc<TableClientInner>,
}

#[derive(Debug)]
struct TableClientInner {
    resolver: TableResolver,
    config: TablesConfig,
}

impl TableClient {
    /// Creates a client for tables handed out by `provider`.
    #[tracing::instrument(skip(provider), target = TRACING_TARGET_CLIENT)]
    pub fn new(provider: Arc<dyn TableProvider>, config: TablesConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            page_size = config.page_size(),
            batch_size = config.batch_size(),
            insert_method = %config.insert_method(),
            "Table client created"
        );

        Ok(Self {
            inner: Arc::new(TableClientInner {
                resolver: TableResolver::new(provider),
                config,
            }),
        })
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &TablesConfig {
        &self.inner.config
    }

    /// Returns the table called `name`, creating it on first use.
    ///
    /// The configured prefix is prepended before resolution.
    #[tracing::instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn table(&self, name: &str) -> Result<Table> {
        let config = &self.inner.config;
        let full_name = config.table_name(name);
        validate_table_name(&full_name)?;

        let handle = self.inner.resolver.resolve(&full_name).await?;

        let mut dispatcher = BatchDispatcher::new(config.batch_size());
        if let Some(limit) = config.batch_concurrency() {
            dispatcher = dispatcher.with_concurrency(limit);
        }

        Ok(Table::new(
            handle,
            dispatcher,
            config.insert_method(),
            config.page_size(),
        ))
    }

    /// Forgets the cached handle of `name`.
    pub async fn evict(&self, name: &str) -> bool {
        let full_name = self.inner.config.table_name(name);
        self.inner.resolver.evict(&full_name).await
    }
}

/// Checks that `name` is 3 to 63 alphanumeric characters starting with a letter.
fn validate_table_name(name: &str) -> Result<()> {
    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let alphanumeric = name.chars().all(|c| c.is_ascii_alphanumeric());
    let length_ok = (MIN_TABLE_NAME_LEN..=MAX_TABLE_NAME_LEN).contains(&name.len());

    if starts_with_letter && alphanumeric && length_ok {
        return Ok(());
    }

    Err(Error::invalid_input().with_message(format!(
        "invalid table name '{name}': expected {MIN_TABLE_NAME_LEN}-{MAX_TABLE_NAME_LEN} \
         alphanumeric characters starting with a letter"
    )))
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::mock::{MemoryProvider, MemoryTableConfig};
    use crate::{Entity, EntityKey, ErrorKind, Filter, InsertMethod, TableQuery};

    fn client(config: TablesConfig) -> (Arc<MemoryProvider>, TableClient) {
        let provider = Arc::new(MemoryProvider::new());
        let client = TableClient::new(provider.clone(), config).unwrap();
        (provider, client)
    }

    fn users(count: usize) -> Vec<Entity> {
        (0..count)
            .map(|i| Entity::new("users", format!("{i:04}")).with_property("Age", i % 90))
            .collect()
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("Users2024").is_ok());
        assert!(validate_table_name("ab").is_err());
        assert!(validate_table_name("2users").is_err());
        assert!(validate_table_name("user_events").is_err());
        assert!(validate_table_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let provider = Arc::new(MemoryProvider::new());
        let error = TableClient::new(provider, TablesConfig::new().with_batch_size(0)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_prefix_and_caching() {
        let (provider, client) = client(TablesConfig::new().with_prefix("dev"));

        let table = client.table("users").await.unwrap();
        client.clone().table("users").await.unwrap();

        assert_eq!(table.name(), "devusers");
        assert!(provider.table("devusers").is_some());
        assert_eq!(provider.create_calls(), 1);

        assert!(client.evict("users").await);
        client.table("users").await.unwrap();
        assert_eq!(provider.create_calls(), 2);
    }

    #[tokio::test]
    async fn test_write_then_read_back() {
        let (_, client) = client(TablesConfig::new());
        let table = client.table("users").await.unwrap();
        let input = users(345);

        let results = table.insert_batch(&input).await.unwrap();
        assert_eq!(results.len(), 345);
        assert!(results.iter().all(|r| r.etag.is_some()));

        let scanned = table.scan_all(TableQuery::new()).await.unwrap();
        let keys: Vec<EntityKey> = scanned.iter().map(Entity::key).collect();
        let expected: Vec<EntityKey> = input.iter().map(Entity::key).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_execute_query_dispatch() {
        let provider = Arc::new(
            MemoryProvider::new().with_table_config(MemoryTableConfig::default().with_page_sizes(vec![40])),
        );
        let client = TableClient::new(provider.clone(), TablesConfig::new()).unwrap();
        let table = client.table("users").await.unwrap();
        table.insert_batch(&users(200)).await.unwrap();

        let mut unbounded = TableQuery::new().with_filter(Filter::lt("Age", 50));
        let matching = table.execute_query(&mut unbounded).await.unwrap();
        assert_eq!(matching.len(), 120);

        let mut bounded = TableQuery::new().with_take(30);
        let first = table.execute_query(&mut bounded).await.unwrap();
        assert_eq!(first.len(), 30);
        assert_eq!(first[29].row_key, "0029");
    }

    #[tokio::test]
    async fn test_configured_page_size_caps_requests() {
        let (provider, client) = client(TablesConfig::new().with_page_size(250));
        let table = client.table("users").await.unwrap();
        table.insert_batch(&users(600)).await.unwrap();

        let mut query = TableQuery::new();
        let entities = table.query(&mut query, 600).await.unwrap();

        assert_eq!(entities.len(), 600);
        let memory = provider.table("users").unwrap();
        assert_eq!(
            memory.requested_takes(),
            vec![Some(250), Some(250), Some(100)]
        );
    }

    #[tokio::test]
    async fn test_default_insert_method_from_config() {
        let (_, client) =
            client(TablesConfig::new().with_insert_method(InsertMethod::InsertOrReplace));
        let table = client.table("users").await.unwrap();

        table.insert_batch(&users(3)).await.unwrap();
        table.insert_batch(&users(3)).await.unwrap();

        let error = table
            .insert_batch_with(&users(3), InsertMethod::Insert)
            .await
            .unwrap_err();
        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn test_entity_round_trip() {
        let (_, client) = client(TablesConfig::new());
        let table = client.table("users").await.unwrap();
        let key = EntityKey::new("users", "ada");

        let stored = table
            .insert(&Entity::new("users", "ada").with_property("Age", 36))
            .await
            .unwrap();
        assert!(table.insert(&stored).await.unwrap_err().is_conflict());

        let updated = table
            .replace(&stored.clone().with_property("Age", 37), stored.etag.as_deref())
            .await
            .unwrap();
        assert_eq!(
            table.get(&key).await.unwrap().unwrap().property("Age"),
            Some(&serde_json::json!(37))
        );

        table.delete(&key, updated.etag.as_deref()).await.unwrap();
        assert!(table.get(&key).await.unwrap().is_none());

        let error = table.delete(&key, None).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancelled_table() {
        let (_, client) = client(TablesConfig::new());
        let cancel = CancellationToken::new();
        let table = client
            .table("users")
            .await
            .unwrap()
            .with_cancellation(cancel.clone());
        cancel.cancel();

        let error = table.scan(TableQuery::new()).try_collect::<Vec<_>>().await.unwrap_err();
        assert!(error.is_cancelled());

        let error = table.insert_batch(&users(150)).await.unwrap_err();
        assert!(error.is_cancelled());
    }
}

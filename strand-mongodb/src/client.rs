//! MongoDB client wrapper with built-in connection pooling.

use std::sync::Arc;

use bson::Document;
use mongodb::{Client, ClientSession, Collection, Database};
use strand_query::{Broadcaster, SharedSubscriber, TransactionSubscriber};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};
use crate::runner::MongoQueryRunner;

/// A MongoDB client with connection pooling.
///
/// The driver pools connections internally. Cloning the client is cheap and
/// every clone shares the pool, the configuration and the registered
/// transaction subscribers. Query runners are created per unit of work with
/// [`create_query_runner`](Self::create_query_runner).
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
    subscribers: Broadcaster,
}

impl MongoClient {
    /// Create a new client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            uri = %config.uri,
            database = %config.database,
            transactions = config.transactions,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
            subscribers: Broadcaster::new(),
        })
    }

    /// Create a client from `STRAND_MONGODB_*` environment variables.
    pub async fn from_env() -> MongoResult<Self> {
        Self::new(MongoConfig::from_env()?).await
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Register a transaction subscriber for runners created afterwards.
    pub fn subscribe(&mut self, subscriber: SharedSubscriber) {
        self.subscribers.push(subscriber);
    }

    /// Register a transaction subscriber (builder style).
    pub fn with_subscriber<S: TransactionSubscriber + 'static>(mut self, subscriber: S) -> Self {
        self.subscribers = self.subscribers.with(subscriber);
        self
    }

    /// Subscribers handed to new query runners.
    pub fn subscribers(&self) -> &Broadcaster {
        &self.subscribers
    }

    /// Create a query runner for one unit of work.
    ///
    /// Runners are not pooled; create one per request or migration step and
    /// release it when done.
    pub fn create_query_runner(&self) -> MongoQueryRunner<MongoClient> {
        MongoQueryRunner::new(self.clone(), self.subscribers.clone())
    }

    /// Get a collection with BSON documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get a different database from the same client.
    pub fn get_database(&self, name: &str) -> Database {
        self.client.database(name)
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Drop a collection.
    pub async fn drop_collection(&self, name: &str) -> MongoResult<()> {
        debug!(collection = %name, "Dropping collection");
        self.database
            .collection::<Document>(name)
            .drop(None)
            .await?;
        Ok(())
    }

    /// Drop a database, the configured one when `name` is `None`.
    pub async fn drop_database(&self, name: Option<&str>) -> MongoResult<()> {
        let database = match name {
            Some(name) => self.get_database(name),
            None => self.database.clone(),
        };
        debug!(database = %database.name(), "Dropping database");
        database.drop(None).await?;
        Ok(())
    }

    /// Start a client session for transactions.
    pub async fn start_session(&self) -> MongoResult<ClientSession> {
        let session = self.client.start_session(None).await?;
        Ok(session)
    }
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("database", &self.config.database)
            .field("transactions", &self.config.transactions)
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    min_pool_size: Option<u32>,
    connect_timeout: Option<std::time::Duration>,
    direct_connection: Option<bool>,
    transactions: Option<bool>,
    subscribers: Broadcaster,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Enable or disable multi-document transactions.
    pub fn transactions(mut self, enabled: bool) -> Self {
        self.transactions = Some(enabled);
        self
    }

    /// Register a transaction subscriber.
    pub fn subscriber<S: TransactionSubscriber + 'static>(mut self, subscriber: S) -> Self {
        self.subscribers = self.subscribers.with(subscriber);
        self
    }

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }

        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }

        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }

        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }

        if let Some(min_pool) = self.min_pool_size {
            config_builder = config_builder.min_pool_size(min_pool);
        }

        if let Some(timeout) = self.connect_timeout {
            config_builder = config_builder.connect_timeout(timeout);
        }

        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        if let Some(enabled) = self.transactions {
            config_builder = config_builder.transactions(enabled);
        }

        let config = config_builder.build()?;
        let mut client = MongoClient::new(config).await?;
        client.subscribers = self.subscribers;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_query::QueryRunner;

    struct Noop;

    impl TransactionSubscriber for Noop {}

    #[test]
    fn test_client_builder() {
        let builder = MongoClientBuilder::new()
            .uri("mongodb://localhost:27017")
            .database("test")
            .max_pool_size(20)
            .transactions(true)
            .subscriber(Noop);

        assert_eq!(builder.uri, Some("mongodb://localhost:27017".to_string()));
        assert_eq!(builder.database, Some("test".to_string()));
        assert_eq!(builder.max_pool_size, Some(20));
        assert_eq!(builder.transactions, Some(true));
        assert_eq!(builder.subscribers.len(), 1);
    }

    #[tokio::test]
    async fn test_runner_inherits_client_state() {
        // Client creation is lazy; no server is contacted here.
        let client = MongoClient::builder()
            .uri("mongodb://localhost:27017")
            .database("shop")
            .transactions(true)
            .build()
            .await
            .unwrap()
            .with_subscriber(Noop);

        assert_eq!(client.subscribers().len(), 1);
        assert_eq!(client.database().name(), "shop");
        assert_eq!(client.collection_doc("orders").name(), "orders");

        let runner = client.create_query_runner();
        assert_eq!(runner.broadcaster().len(), 1);
        assert!(runner.store().config().transactions);
    }

    #[test]
    fn test_client_builder_requires_database() {
        let result = tokio_test::block_on(MongoClientBuilder::new().build());
        assert!(matches!(result, Err(MongoError::Config(_))));
    }
}

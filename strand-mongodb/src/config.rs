//! MongoDB connection configuration.

use std::time::Duration;

use mongodb::options::{ClientOptions, TransactionOptions};
use strand_query::env::{EnvSource, StdEnvSource};

use crate::error::{MongoError, MongoResult};

/// Environment variable holding the connection URI.
pub const ENV_URI: &str = "STRAND_MONGODB_URI";
/// Environment variable holding the database name.
pub const ENV_DATABASE: &str = "STRAND_MONGODB_DATABASE";
/// Environment variable holding the application name.
pub const ENV_APP_NAME: &str = "STRAND_MONGODB_APP_NAME";
/// Environment variable enabling multi-document transactions.
pub const ENV_TRANSACTIONS: &str = "STRAND_MONGODB_TRANSACTIONS";
/// Environment variable holding the maximum pool size.
pub const ENV_MAX_POOL_SIZE: &str = "STRAND_MONGODB_MAX_POOL_SIZE";

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_APP_NAME: &str = "strand";

/// MongoDB connection configuration.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Read preference.
    pub read_preference: Option<ReadPreference>,
    /// Write concern.
    pub write_concern: Option<WriteConcern>,
    /// Retry writes.
    pub retry_writes: Option<bool>,
    /// Retry reads.
    pub retry_reads: Option<bool>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
    /// Enable multi-document transactions.
    ///
    /// When disabled, query runners treat start/commit/rollback as no-ops.
    /// Requires a replica set or sharded cluster.
    pub transactions: bool,
    /// Read concern for transactions.
    pub transaction_read_concern: Option<ReadConcernLevel>,
    /// Write concern for transactions.
    pub transaction_write_concern: Option<WriteConcern>,
    /// Maximum time a commit may run on the server.
    pub max_commit_time: Option<Duration>,
}

/// MongoDB read preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPreference {
    /// Read from primary only.
    #[default]
    Primary,
    /// Read from primary preferred, fallback to secondary.
    PrimaryPreferred,
    /// Read from secondary only.
    Secondary,
    /// Read from secondary preferred, fallback to primary.
    SecondaryPreferred,
    /// Read from nearest member.
    Nearest,
}

impl ReadPreference {
    fn to_selection_criteria(self) -> mongodb::options::SelectionCriteria {
        use mongodb::options::ReadPreference as Driver;

        let preference = match self {
            Self::Primary => Driver::Primary,
            Self::PrimaryPreferred => Driver::PrimaryPreferred {
                options: Default::default(),
            },
            Self::Secondary => Driver::Secondary {
                options: Default::default(),
            },
            Self::SecondaryPreferred => Driver::SecondaryPreferred {
                options: Default::default(),
            },
            Self::Nearest => Driver::Nearest {
                options: Default::default(),
            },
        };

        mongodb::options::SelectionCriteria::ReadPreference(preference)
    }
}

/// MongoDB write concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteConcern {
    /// Acknowledge writes from the specified number of nodes.
    W(u32),
    /// Acknowledge writes from majority of nodes.
    Majority,
    /// Custom tag set.
    Custom(String),
}

impl WriteConcern {
    fn to_driver(&self) -> mongodb::options::WriteConcern {
        use mongodb::options::Acknowledgment;

        let acknowledgment = match self {
            Self::W(n) => Acknowledgment::Nodes(*n),
            Self::Majority => Acknowledgment::Majority,
            Self::Custom(tag) => Acknowledgment::Custom(tag.clone()),
        };

        mongodb::options::WriteConcern::builder()
            .w(acknowledgment)
            .build()
    }
}

/// Read concern level for transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConcernLevel {
    /// Most recent data on the queried node.
    Local,
    /// Data acknowledged by a majority of the replica set.
    Majority,
    /// Majority-committed snapshot taken at transaction start.
    Snapshot,
}

impl ReadConcernLevel {
    fn to_driver(self) -> mongodb::options::ReadConcern {
        match self {
            Self::Local => mongodb::options::ReadConcern::local(),
            Self::Majority => mongodb::options::ReadConcern::majority(),
            Self::Snapshot => mongodb::options::ReadConcern::snapshot(),
        }
    }
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some(DEFAULT_APP_NAME.to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: Some(ReadPreference::Primary),
            write_concern: None,
            retry_writes: Some(true),
            retry_reads: Some(true),
            direct_connection: None,
            transactions: false,
            transaction_read_concern: None,
            transaction_write_concern: None,
            max_commit_time: None,
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Load configuration from the process environment.
    ///
    /// See [`from_env_source`](Self::from_env_source) for the variables read.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_env_source(&StdEnvSource)
    }

    /// Load configuration from an environment source.
    ///
    /// Reads `STRAND_MONGODB_URI`, `STRAND_MONGODB_DATABASE` (required),
    /// `STRAND_MONGODB_APP_NAME`, `STRAND_MONGODB_TRANSACTIONS` and
    /// `STRAND_MONGODB_MAX_POOL_SIZE`.
    pub fn from_env_source<S: EnvSource>(source: &S) -> MongoResult<Self> {
        let mut builder = Self::builder();

        if let Some(uri) = source.get(ENV_URI) {
            builder = builder.uri(uri);
        }

        if let Some(database) = source.get(ENV_DATABASE) {
            builder = builder.database(database);
        }

        if let Some(app_name) = source.get(ENV_APP_NAME) {
            builder = builder.app_name(app_name);
        }

        if source.contains(ENV_TRANSACTIONS) {
            let enabled = source.get_bool(ENV_TRANSACTIONS).ok_or_else(|| {
                MongoError::config(format!("{} must be a boolean flag", ENV_TRANSACTIONS))
            })?;
            builder = builder.transactions(enabled);
        }

        if let Some(size) = source.get(ENV_MAX_POOL_SIZE) {
            let size = size.trim().parse::<u32>().map_err(|e| {
                MongoError::config(format!("invalid {}: {}", ENV_MAX_POOL_SIZE, e))
            })?;
            builder = builder.max_pool_size(size);
        }

        builder.build()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(max_idle) = self.max_idle_time {
            options.max_idle_time = Some(max_idle);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(read_pref) = self.read_preference {
            options.selection_criteria = Some(read_pref.to_selection_criteria());
        }

        if let Some(ref wc) = self.write_concern {
            options.write_concern = Some(wc.to_driver());
        }

        if let Some(retry_writes) = self.retry_writes {
            options.retry_writes = Some(retry_writes);
        }

        if let Some(retry_reads) = self.retry_reads {
            options.retry_reads = Some(retry_reads);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }

    /// Options used when a query runner begins a transaction.
    pub fn transaction_options(&self) -> TransactionOptions {
        let mut options = TransactionOptions::default();
        options.read_concern = self.transaction_read_concern.map(ReadConcernLevel::to_driver);
        options.write_concern = self
            .transaction_write_concern
            .as_ref()
            .map(WriteConcern::to_driver);
        options.max_commit_time = self.max_commit_time;
        options
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
    retry_writes: Option<bool>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
    transactions: Option<bool>,
    transaction_read_concern: Option<ReadConcernLevel>,
    transaction_write_concern: Option<WriteConcern>,
    max_commit_time: Option<Duration>,
}

impl MongoConfigBuilder {
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

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the read preference.
    pub fn read_preference(mut self, pref: ReadPreference) -> Self {
        self.read_preference = Some(pref);
        self
    }

    /// Set the write concern.
    pub fn write_concern(mut self, wc: WriteConcern) -> Self {
        self.write_concern = Some(wc);
        self
    }

    /// Enable or disable retry writes.
    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = Some(enabled);
        self
    }

    /// Enable or disable retry reads.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
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

    /// Set the read concern used inside transactions.
    pub fn transaction_read_concern(mut self, level: ReadConcernLevel) -> Self {
        self.transaction_read_concern = Some(level);
        self
    }

    /// Set the write concern used when committing transactions.
    pub fn transaction_write_concern(mut self, wc: WriteConcern) -> Self {
        self.transaction_write_concern = Some(wc);
        self
    }

    /// Set the maximum server-side commit time.
    pub fn max_commit_time(mut self, duration: Duration) -> Self {
        self.max_commit_time = Some(duration);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        Ok(MongoConfig {
            uri: self.uri.unwrap_or_else(|| DEFAULT_URI.to_string()),
            database,
            app_name: self.app_name.or(Some(DEFAULT_APP_NAME.to_string())),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(Some(10)),
            max_idle_time: self.max_idle_time.or(Some(Duration::from_secs(300))),
            connect_timeout: self.connect_timeout.or(Some(Duration::from_secs(10))),
            server_selection_timeout: self
                .server_selection_timeout
                .or(Some(Duration::from_secs(30))),
            read_preference: self.read_preference.or(Some(ReadPreference::Primary)),
            write_concern: self.write_concern,
            retry_writes: self.retry_writes.or(Some(true)),
            retry_reads: self.retry_reads.or(Some(true)),
            direct_connection: self.direct_connection,
            transactions: self.transactions.unwrap_or(false),
            transaction_read_concern: self.transaction_read_concern,
            transaction_write_concern: self.transaction_write_concern,
            max_commit_time: self.max_commit_time,
        })
    }
}

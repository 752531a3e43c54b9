//! Integration tests for the facade crate.
//!
//! These tests verify that the re-exports compose:
//! - The contract is reachable through `query` and the prelude
//! - MongoDB configuration loads from an environment source
//! - The MongoDB runner is usable as a `dyn QueryRunner`

use strand_orm::mongodb::{MongoConfig, MongoQueryRunner, ReadConcernLevel};
use strand_orm::prelude::*;
use strand_orm::query::env::MapEnvSource;
use strand_orm::query::RunnerOperation;

/// Test that rejection errors carry their stable code
#[test]
fn test_unsupported_error_code() {
    let err = RunnerOperation::DropTable.unsupported("MongoDB");
    assert_eq!(err.code, ErrorCode::NotSupported);
    assert_eq!(err.code.code(), "S5006");
    assert!(err.is_not_supported());
}

/// Test that every contract operation has a rejection message
#[test]
fn test_all_operations_listed() {
    assert!(RunnerOperation::ALL.len() >= 50);
    assert!(RunnerOperation::ALL.contains(&RunnerOperation::Query));
    assert!(RunnerOperation::ALL.contains(&RunnerOperation::DropIndices));
}

/// Test configuration from an explicit environment source
#[test]
fn test_config_from_env_source() {
    let source = MapEnvSource::new()
        .set("STRAND_MONGODB_URI", "mongodb://localhost:27017/?replicaSet=rs0")
        .set("STRAND_MONGODB_DATABASE", "shop")
        .set("STRAND_MONGODB_TRANSACTIONS", "true");

    let config = MongoConfig::from_env_source(&source).expect("valid configuration");
    assert_eq!(config.database, "shop");
    assert!(config.transactions);
    assert_eq!(config.app_name.as_deref(), Some("strand"));
}

/// Test transaction options built from the configuration
#[test]
fn test_transaction_options() {
    let config = MongoConfig::builder()
        .database("shop")
        .transaction_read_concern(ReadConcernLevel::Majority)
        .build()
        .expect("valid configuration");

    assert!(config.transaction_options().read_concern.is_some());
}

/// Test that the MongoDB runner satisfies the object-safe contract
#[test]
fn test_runner_is_object_safe() {
    fn accepts(_runner: Option<Box<dyn QueryRunner>>) {}

    let runner: Option<MongoQueryRunner> = None;
    accepts(runner.map(|r| Box::new(r) as Box<dyn QueryRunner>));
}

/// Test that isolation levels render as SQL
#[test]
fn test_isolation_level_sql() {
    assert_eq!(IsolationLevel::Serializable.as_sql(), "SERIALIZABLE");
}

//! # strand-query
//!
//! Backend-agnostic query runner contract for the Strand ORM.
//!
//! This crate provides:
//! - The [`QueryRunner`] trait every backend implements
//! - Error types with stable codes ([`QueryError`], [`ErrorCode`])
//! - Schema descriptors for the DDL half of the contract
//! - Transaction subscribers and their [`Broadcaster`]
//! - Per-runner scratch data ([`RunnerData`])
//! - Logging bootstrap and environment sources for backend configuration
//!
//! ## Unsupported Operations
//!
//! Backends reject what they cannot do with a typed error instead of leaving
//! methods out of the contract:
//!
//! ```rust
//! use strand_query::{ErrorCode, RunnerOperation};
//!
//! let err = RunnerOperation::CreateTable.unsupported("MongoDB");
//! assert_eq!(err.code, ErrorCode::NotSupported);
//! assert_eq!(err.message, "Table create queries are not supported by MongoDB driver");
//! ```
//!
//! ## Scratch Data
//!
//! ```rust
//! use strand_query::RunnerData;
//!
//! let mut data = RunnerData::new();
//! data.insert("request_id", "req-42");
//! assert!(data.contains("request_id"));
//! ```

pub mod env;
pub mod error;
#[macro_use]
pub mod logging;
pub mod runner;
pub mod schema;
pub mod transaction;

pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use runner::{
    Broadcaster, OperationFamily, QueryOutput, QueryRunner, RecordStream, RunnerData,
    RunnerOperation, SharedSubscriber, TransactionEvent, TransactionPhase, TransactionSubscriber,
};
pub use schema::{
    ColumnChange, ReferentialAction, Table, TableCheck, TableColumn, TableExclusion,
    TableForeignKey, TableIndex, TableUnique, View,
};
pub use transaction::{IsolationLevel, TransactionState};

//! # Strand
//!
//! A uniform query runner contract for relational and document backends.
//!
//! Strand provides:
//! - The [`QueryRunner`](query::QueryRunner) trait generic framework code is
//!   written against
//! - Transaction subscribers notified around transaction boundaries
//! - A MongoDB driver whose runner forwards data operations with the active
//!   session and rejects schema-definition operations with a typed error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strand_orm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     strand_orm::init_logging();
//!
//!     let client = MongoClient::from_env().await?;
//!     let mut runner = client.create_query_runner();
//!
//!     runner.start_transaction(None).await?;
//!     runner.insert_one("users", doc! { "email": "a@example.com" }, None).await?;
//!     runner.commit_transaction().await?;
//!
//!     // Schema operations are rejected on document stores
//!     let err = runner.create_table(&Table::new("users"), true, false, false).await;
//!     assert!(err.is_err());
//!
//!     runner.release().await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Backend-agnostic query runner contract.
pub mod query {
    pub use strand_query::*;
}

/// MongoDB driver.
#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
pub mod mongodb {
    pub use strand_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strand_query::{
        Broadcaster, ErrorCode, IsolationLevel, QueryError, QueryResult, QueryRunner, RunnerData,
        Table, TableColumn, TransactionEvent, TransactionPhase, TransactionSubscriber, View,
    };

    #[cfg(feature = "mongodb")]
    pub use strand_mongodb::{
        BulkWriteOperation, BulkWriteOptions, MongoClient, MongoConfig, MongoError,
        MongoQueryRunner, doc,
    };
}

// Re-export key types at the crate root
pub use strand_query::{QueryError, QueryResult, QueryRunner};

/// Initialize logging from `STRAND_DEBUG`, `STRAND_LOG_LEVEL` and `STRAND_LOG_FORMAT`.
///
/// Does nothing unless the `logging` feature is enabled.
pub fn init_logging() {
    strand_query::logging::init();
}

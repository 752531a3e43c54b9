//! # strand-mongodb
//!
//! MongoDB query runner for the Strand ORM.
//!
//! This crate provides:
//! - Connection management with the official MongoDB driver
//! - Built-in connection pooling
//! - [`MongoQueryRunner`], the [`QueryRunner`](strand_query::QueryRunner)
//!   implementation for MongoDB
//! - Session-scoped multi-document transactions with subscriber events
//! - Pass-through collection operations (find, aggregate, writes, indexes,
//!   change streams and legacy commands)
//!
//! Schema-definition methods of the contract (tables, columns, constraints,
//! foreign keys, SQL indices) and raw SQL fail with a `NotSupported` error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strand_mongodb::{MongoClient, doc};
//! use strand_query::QueryRunner;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017/?replicaSet=rs0")
//!         .database("shop")
//!         .transactions(true)
//!         .build()
//!         .await?;
//!
//!     let mut runner = client.create_query_runner();
//!     runner.start_transaction(None).await?;
//!     runner.insert_one("orders", doc! { "sku": "A-1", "qty": 2 }, None).await?;
//!     runner.commit_transaction().await?;
//!     runner.release().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod runner;
pub mod store;
pub mod types;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder, ReadConcernLevel, ReadPreference, WriteConcern};
pub use error::{MongoError, MongoResult};
pub use runner::{BACKEND_NAME, MongoQueryRunner};
pub use store::{ChangeEventStream, DocumentStore, StoreSession};
pub use types::{
    BulkWriteOperation, BulkWriteOptions, BulkWriteResult, DeleteResult, GeoSearchOptions,
    GroupSpec, InsertManyResult, InsertOneResult, MapReduceOptions, UpdateResult,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::error::{MongoError, MongoResult};
    pub use crate::runner::MongoQueryRunner;
    pub use crate::store::{DocumentStore, StoreSession};
    pub use crate::types::{BulkWriteOperation, BulkWriteOptions};
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
    pub use strand_query::QueryRunner;
}

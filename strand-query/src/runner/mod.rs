//! The query runner contract shared by every backend.
//!
//! A query runner is created per unit of work. Generic framework code (entity
//! managers, migration runners, transaction helpers) talks to it through
//! [`QueryRunner`] without knowing which database sits behind it. Operations a
//! backend cannot perform are still implemented, and fail fast with a
//! [`NotSupported`](crate::ErrorCode::NotSupported) error built by
//! [`RunnerOperation::unsupported`].
//!
//! ```rust,ignore
//! async fn in_transaction(runner: &mut dyn QueryRunner) -> QueryResult<()> {
//!     runner.start_transaction(None).await?;
//!     // ... work ...
//!     match runner.commit_transaction().await {
//!         Ok(()) => Ok(()),
//!         Err(e) => {
//!             runner.rollback_transaction().await?;
//!             Err(e)
//!         }
//!     }
//! }
//! ```

mod data;
mod operation;
mod subscriber;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::QueryResult;
use crate::schema::{
    ColumnChange, Table, TableCheck, TableColumn, TableExclusion, TableForeignKey, TableIndex,
    TableUnique, View,
};
use crate::transaction::{IsolationLevel, TransactionState};

pub use data::RunnerData;
pub use operation::{OperationFamily, RunnerOperation};
pub use subscriber::{
    Broadcaster, SharedSubscriber, TransactionEvent, TransactionPhase, TransactionSubscriber,
};

/// Result of a raw query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// Returned records.
    pub records: Vec<Value>,
    /// Number of affected rows, when the backend reports one.
    pub affected: Option<u64>,
}

/// Stream of raw query records.
pub type RecordStream = BoxStream<'static, QueryResult<Value>>;

/// Uniform per-unit-of-work database contract.
///
/// Every async method takes `&mut self`: a runner owns at most one session and
/// must not run two operations on it at once.
#[async_trait]
pub trait QueryRunner: Send {
    /// Display name of the backend, used in error messages.
    fn backend_name(&self) -> &'static str;

    /// Whether [`release`](Self::release) has been called.
    fn is_released(&self) -> bool;

    /// Whether a transaction is open on this runner.
    fn is_transaction_active(&self) -> bool;

    /// Transaction lifecycle state.
    fn transaction_state(&self) -> TransactionState {
        TransactionState::from_active(self.is_transaction_active())
    }

    /// Scratch data shared with transaction subscribers.
    fn data(&self) -> &RunnerData;

    /// Mutable scratch data.
    fn data_mut(&mut self) -> &mut RunnerData;

    /// Subscribers notified around transaction boundaries.
    fn broadcaster(&self) -> &Broadcaster;

    /// Tables loaded by introspection.
    fn loaded_tables(&self) -> &[Table];

    /// Views loaded by introspection.
    fn loaded_views(&self) -> &[View];

    // ============== Lifecycle ==============

    /// Acquire whatever connection the runner needs.
    async fn connect(&mut self) -> QueryResult<()>;

    /// Release the runner's connection and scratch data.
    async fn release(&mut self) -> QueryResult<()>;

    // ============== Transactions ==============

    /// Open a transaction.
    async fn start_transaction(&mut self, isolation: Option<IsolationLevel>) -> QueryResult<()>;

    /// Commit the open transaction.
    async fn commit_transaction(&mut self) -> QueryResult<()>;

    /// Roll back the open transaction.
    async fn rollback_transaction(&mut self) -> QueryResult<()>;

    // ============== Raw SQL ==============

    /// Execute a raw query.
    async fn query(&mut self, sql: &str, params: Vec<Value>) -> QueryResult<QueryOutput>;

    /// Execute a raw query and stream its records.
    async fn stream(&mut self, sql: &str, params: Vec<Value>) -> QueryResult<RecordStream>;

    // ============== Introspection ==============

    /// List databases.
    async fn get_databases(&mut self) -> QueryResult<Vec<String>>;

    /// Check if a database exists.
    async fn has_database(&mut self, database: &str) -> QueryResult<bool>;

    /// Name of the current database.
    async fn get_current_database(&mut self) -> QueryResult<String>;

    /// List schemas, optionally within a database.
    async fn get_schemas(&mut self, database: Option<&str>) -> QueryResult<Vec<String>>;

    /// Check if a schema exists.
    async fn has_schema(&mut self, schema: &str) -> QueryResult<bool>;

    /// Name of the current schema.
    async fn get_current_schema(&mut self) -> QueryResult<String>;

    /// Load one table.
    async fn get_table(&mut self, table_path: &str) -> QueryResult<Option<Table>>;

    /// Load tables, all of them when `table_paths` is `None`.
    async fn get_tables(&mut self, table_paths: Option<&[String]>) -> QueryResult<Vec<Table>>;

    /// Load one view.
    async fn get_view(&mut self, view_path: &str) -> QueryResult<Option<View>>;

    /// Load views, all of them when `view_paths` is `None`.
    async fn get_views(&mut self, view_paths: Option<&[String]>) -> QueryResult<Vec<View>>;

    /// Check if a table exists.
    async fn has_table(&mut self, table: &str) -> QueryResult<bool>;

    /// Check if a table has a column.
    async fn has_column(&mut self, table: &str, column: &str) -> QueryResult<bool>;

    // ============== Databases, schemas, tables, views ==============

    /// Create a database.
    async fn create_database(&mut self, database: &str, if_not_exists: bool) -> QueryResult<()>;

    /// Drop a database.
    async fn drop_database(&mut self, database: &str, if_exists: bool) -> QueryResult<()>;

    /// Create a schema.
    async fn create_schema(&mut self, schema_path: &str, if_not_exists: bool) -> QueryResult<()>;

    /// Drop a schema.
    async fn drop_schema(
        &mut self,
        schema_path: &str,
        if_exists: bool,
        cascade: bool,
    ) -> QueryResult<()>;

    /// Create a table with, optionally, its foreign keys and indices.
    async fn create_table(
        &mut self,
        table: &Table,
        if_not_exists: bool,
        create_foreign_keys: bool,
        create_indices: bool,
    ) -> QueryResult<()>;

    /// Drop a table with, optionally, its foreign keys and indices.
    async fn drop_table(
        &mut self,
        table: &str,
        if_exists: bool,
        drop_foreign_keys: bool,
        drop_indices: bool,
    ) -> QueryResult<()>;

    /// Rename a table.
    async fn rename_table(&mut self, old_name: &str, new_name: &str) -> QueryResult<()>;

    /// Create a view.
    async fn create_view(&mut self, view: &View) -> QueryResult<()>;

    /// Drop a view.
    async fn drop_view(&mut self, view: &str) -> QueryResult<()>;

    // ============== Columns ==============

    /// Add a column.
    async fn add_column(&mut self, table: &str, column: &TableColumn) -> QueryResult<()>;

    /// Add several columns.
    async fn add_columns(&mut self, table: &str, columns: &[TableColumn]) -> QueryResult<()>;

    /// Rename a column.
    async fn rename_column(&mut self, table: &str, old_name: &str, new_name: &str)
    -> QueryResult<()>;

    /// Change a column definition.
    async fn change_column(
        &mut self,
        table: &str,
        old_column: &str,
        new_column: &TableColumn,
    ) -> QueryResult<()>;

    /// Change several column definitions.
    async fn change_columns(&mut self, table: &str, changes: &[ColumnChange]) -> QueryResult<()>;

    /// Drop a column.
    async fn drop_column(&mut self, table: &str, column: &str) -> QueryResult<()>;

    /// Drop several columns.
    async fn drop_columns(&mut self, table: &str, columns: &[String]) -> QueryResult<()>;

    // ============== Primary keys ==============

    /// Create a primary key.
    async fn create_primary_key(
        &mut self,
        table: &str,
        column_names: &[String],
        constraint_name: Option<&str>,
    ) -> QueryResult<()>;

    /// Replace the primary key with the given columns.
    async fn update_primary_keys(&mut self, table: &str, columns: &[TableColumn])
    -> QueryResult<()>;

    /// Drop the primary key.
    async fn drop_primary_key(&mut self, table: &str, constraint_name: Option<&str>)
    -> QueryResult<()>;

    // ============== Unique constraints ==============

    /// Create a unique constraint.
    async fn create_unique_constraint(&mut self, table: &str, unique: &TableUnique)
    -> QueryResult<()>;

    /// Create several unique constraints.
    async fn create_unique_constraints(
        &mut self,
        table: &str,
        uniques: &[TableUnique],
    ) -> QueryResult<()>;

    /// Drop a unique constraint by name.
    async fn drop_unique_constraint(&mut self, table: &str, name: &str) -> QueryResult<()>;

    /// Drop several unique constraints.
    async fn drop_unique_constraints(&mut self, table: &str, uniques: &[TableUnique])
    -> QueryResult<()>;

    // ============== Check constraints ==============

    /// Create a check constraint.
    async fn create_check_constraint(&mut self, table: &str, check: &TableCheck)
    -> QueryResult<()>;

    /// Create several check constraints.
    async fn create_check_constraints(&mut self, table: &str, checks: &[TableCheck])
    -> QueryResult<()>;

    /// Drop a check constraint by name.
    async fn drop_check_constraint(&mut self, table: &str, name: &str) -> QueryResult<()>;

    /// Drop several check constraints.
    async fn drop_check_constraints(&mut self, table: &str, checks: &[TableCheck])
    -> QueryResult<()>;

    // ============== Exclusion constraints ==============

    /// Create an exclusion constraint.
    async fn create_exclusion_constraint(
        &mut self,
        table: &str,
        exclusion: &TableExclusion,
    ) -> QueryResult<()>;

    /// Create several exclusion constraints.
    async fn create_exclusion_constraints(
        &mut self,
        table: &str,
        exclusions: &[TableExclusion],
    ) -> QueryResult<()>;

    /// Drop an exclusion constraint by name.
    async fn drop_exclusion_constraint(&mut self, table: &str, name: &str) -> QueryResult<()>;

    /// Drop several exclusion constraints.
    async fn drop_exclusion_constraints(
        &mut self,
        table: &str,
        exclusions: &[TableExclusion],
    ) -> QueryResult<()>;

    // ============== Foreign keys ==============

    /// Create a foreign key.
    async fn create_foreign_key(&mut self, table: &str, foreign_key: &TableForeignKey)
    -> QueryResult<()>;

    /// Create several foreign keys.
    async fn create_foreign_keys(
        &mut self,
        table: &str,
        foreign_keys: &[TableForeignKey],
    ) -> QueryResult<()>;

    /// Drop a foreign key by name.
    async fn drop_foreign_key(&mut self, table: &str, name: &str) -> QueryResult<()>;

    /// Drop several foreign keys.
    async fn drop_foreign_keys(
        &mut self,
        table: &str,
        foreign_keys: &[TableForeignKey],
    ) -> QueryResult<()>;

    // ============== Indices ==============

    /// Create an index.
    async fn create_index(&mut self, table: &str, index: &TableIndex) -> QueryResult<()>;

    /// Create several indices.
    async fn create_indices(&mut self, table: &str, indices: &[TableIndex]) -> QueryResult<()>;

    /// Drop an index by name.
    async fn drop_index(&mut self, table: &str, name: &str) -> QueryResult<()>;

    /// Drop several indices.
    async fn drop_indices(&mut self, table: &str, indices: &[TableIndex]) -> QueryResult<()>;

    // ============== Data removal ==============

    /// Remove every row or document of a table.
    async fn clear_table(&mut self, table: &str) -> QueryResult<()>;

    /// Remove everything in a database, the current one when `database` is `None`.
    async fn clear_database(&mut self, database: Option<&str>) -> QueryResult<()>;
}

//! The MongoDB query runner.
//!
//! [`MongoQueryRunner`] implements the backend-agnostic
//! [`QueryRunner`] contract on top of a [`DocumentStore`]. Data operations are
//! inherent methods (see `operations`) that forward to the store together with
//! the runner's active session. Transaction control lives in `transaction`.
//! Every schema-definition and SQL method of the contract fails fast with a
//! `NotSupported` error and never touches the store.

mod operations;
mod transaction;

use async_trait::async_trait;
use serde_json::Value;
use strand_query::{
    Broadcaster, ColumnChange, IsolationLevel, QueryError, QueryOutput, QueryResult, QueryRunner,
    RecordStream, RunnerData, RunnerOperation, Table, TableCheck, TableColumn, TableExclusion,
    TableForeignKey, TableIndex, TableUnique, View,
};
use tracing::debug;
use uuid::Uuid;

use crate::client::MongoClient;
use crate::store::DocumentStore;

/// Backend name reported in errors and subscriber events.
pub const BACKEND_NAME: &str = "MongoDB";

/// A per-unit-of-work runner over a MongoDB store.
///
/// Holds at most one session, which exists exactly while a transaction is
/// active. Dropping the runner drops the session, which the driver treats as an
/// abort.
pub struct MongoQueryRunner<S: DocumentStore = MongoClient> {
    store: S,
    session: Option<S::Session>,
    transaction_active: bool,
    released: bool,
    data: RunnerData,
    broadcaster: Broadcaster,
    id: Uuid,
}

impl<S: DocumentStore> MongoQueryRunner<S> {
    /// Create a runner over `store`, notifying `broadcaster` around transactions.
    pub fn new(store: S, broadcaster: Broadcaster) -> Self {
        let id = Uuid::new_v4();
        debug!(runner_id = %id, database = store.database_name(), "Query runner created");

        Self {
            store,
            session: None,
            transaction_active: false,
            released: false,
            data: RunnerData::new(),
            broadcaster,
            id,
        }
    }

    /// Unique id of this runner, used as a tracing field.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The store this runner forwards to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the runner currently holds a session.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn unsupported<T>(&self, operation: RunnerOperation) -> QueryResult<T> {
        debug!(runner_id = %self.id, operation = %operation, "Rejected unsupported operation");
        Err(operation.unsupported(BACKEND_NAME))
    }
}

impl<S: DocumentStore> std::fmt::Debug for MongoQueryRunner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoQueryRunner")
            .field("id", &self.id)
            .field("database", &self.store.database_name())
            .field("transaction_active", &self.transaction_active)
            .field("has_session", &self.session.is_some())
            .field("released", &self.released)
            .finish()
    }
}

#[async_trait]
impl<S: DocumentStore> QueryRunner for MongoQueryRunner<S> {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn is_released(&self) -> bool {
        self.released
    }

    fn is_transaction_active(&self) -> bool {
        self.transaction_active
    }

    fn data(&self) -> &RunnerData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut RunnerData {
        &mut self.data
    }

    fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    fn loaded_tables(&self) -> &[Table] {
        &[]
    }

    fn loaded_views(&self) -> &[View] {
        &[]
    }

    async fn connect(&mut self) -> QueryResult<()> {
        Ok(())
    }

    async fn release(&mut self) -> QueryResult<()> {
        debug!(runner_id = %self.id, "Query runner released");
        self.released = true;
        self.data.clear();
        Ok(())
    }

    async fn start_transaction(&mut self, isolation: Option<IsolationLevel>) -> QueryResult<()> {
        self.begin_transaction(isolation).await
    }

    async fn commit_transaction(&mut self) -> QueryResult<()> {
        self.finish_transaction(transaction::Outcome::Commit).await
    }

    async fn rollback_transaction(&mut self) -> QueryResult<()> {
        self.finish_transaction(transaction::Outcome::Rollback).await
    }

    async fn query(&mut self, _sql: &str, _params: Vec<Value>) -> QueryResult<QueryOutput> {
        self.unsupported(RunnerOperation::Query)
    }

    async fn stream(&mut self, _sql: &str, _params: Vec<Value>) -> QueryResult<RecordStream> {
        let err: QueryError = RunnerOperation::Stream.unsupported(BACKEND_NAME);
        debug!(runner_id = %self.id, operation = "stream", "Rejected unsupported operation");
        Err(err.with_suggestion("Use MongoQueryRunner::watch to follow collection changes"))
    }

    async fn get_databases(&mut self) -> QueryResult<Vec<String>> {
        self.unsupported(RunnerOperation::GetDatabases)
    }

    async fn has_database(&mut self, _database: &str) -> QueryResult<bool> {
        self.unsupported(RunnerOperation::HasDatabase)
    }

    async fn get_current_database(&mut self) -> QueryResult<String> {
        self.unsupported(RunnerOperation::GetCurrentDatabase)
    }

    async fn get_schemas(&mut self, _database: Option<&str>) -> QueryResult<Vec<String>> {
        self.unsupported(RunnerOperation::GetSchemas)
    }

    async fn has_schema(&mut self, _schema: &str) -> QueryResult<bool> {
        self.unsupported(RunnerOperation::HasSchema)
    }

    async fn get_current_schema(&mut self) -> QueryResult<String> {
        self.unsupported(RunnerOperation::GetCurrentSchema)
    }

    async fn get_table(&mut self, _table_path: &str) -> QueryResult<Option<Table>> {
        self.unsupported(RunnerOperation::GetTable)
    }

    async fn get_tables(&mut self, _table_paths: Option<&[String]>) -> QueryResult<Vec<Table>> {
        self.unsupported(RunnerOperation::GetTables)
    }

    async fn get_view(&mut self, _view_path: &str) -> QueryResult<Option<View>> {
        self.unsupported(RunnerOperation::GetView)
    }

    async fn get_views(&mut self, _view_paths: Option<&[String]>) -> QueryResult<Vec<View>> {
        self.unsupported(RunnerOperation::GetViews)
    }

    async fn has_table(&mut self, _table: &str) -> QueryResult<bool> {
        self.unsupported(RunnerOperation::HasTable)
    }

    async fn has_column(&mut self, _table: &str, _column: &str) -> QueryResult<bool> {
        self.unsupported(RunnerOperation::HasColumn)
    }

    async fn create_database(&mut self, _database: &str, _if_not_exists: bool) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateDatabase)
    }

    async fn drop_database(&mut self, _database: &str, _if_exists: bool) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropDatabase)
    }

    async fn create_schema(&mut self, _schema_path: &str, _if_not_exists: bool) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateSchema)
    }

    async fn drop_schema(
        &mut self,
        _schema_path: &str,
        _if_exists: bool,
        _cascade: bool,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropSchema)
    }

    async fn create_table(
        &mut self,
        _table: &Table,
        _if_not_exists: bool,
        _create_foreign_keys: bool,
        _create_indices: bool,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateTable)
    }

    async fn drop_table(
        &mut self,
        _table: &str,
        _if_exists: bool,
        _drop_foreign_keys: bool,
        _drop_indices: bool,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropTable)
    }

    async fn rename_table(&mut self, _old_name: &str, _new_name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::RenameTable)
    }

    async fn create_view(&mut self, _view: &View) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateView)
    }

    async fn drop_view(&mut self, _view: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropView)
    }

    async fn add_column(&mut self, _table: &str, _column: &TableColumn) -> QueryResult<()> {
        self.unsupported(RunnerOperation::AddColumn)
    }

    async fn add_columns(&mut self, _table: &str, _columns: &[TableColumn]) -> QueryResult<()> {
        self.unsupported(RunnerOperation::AddColumns)
    }

    async fn rename_column(
        &mut self,
        _table: &str,
        _old_name: &str,
        _new_name: &str,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::RenameColumn)
    }

    async fn change_column(
        &mut self,
        _table: &str,
        _old_column: &str,
        _new_column: &TableColumn,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::ChangeColumn)
    }

    async fn change_columns(&mut self, _table: &str, _changes: &[ColumnChange]) -> QueryResult<()> {
        self.unsupported(RunnerOperation::ChangeColumns)
    }

    async fn drop_column(&mut self, _table: &str, _column: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropColumn)
    }

    async fn drop_columns(&mut self, _table: &str, _columns: &[String]) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropColumns)
    }

    async fn create_primary_key(
        &mut self,
        _table: &str,
        _column_names: &[String],
        _constraint_name: Option<&str>,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreatePrimaryKey)
    }

    async fn update_primary_keys(
        &mut self,
        _table: &str,
        _columns: &[TableColumn],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::UpdatePrimaryKeys)
    }

    async fn drop_primary_key(
        &mut self,
        _table: &str,
        _constraint_name: Option<&str>,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropPrimaryKey)
    }

    async fn create_unique_constraint(
        &mut self,
        _table: &str,
        _unique: &TableUnique,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateUniqueConstraint)
    }

    async fn create_unique_constraints(
        &mut self,
        _table: &str,
        _uniques: &[TableUnique],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateUniqueConstraints)
    }

    async fn drop_unique_constraint(&mut self, _table: &str, _name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropUniqueConstraint)
    }

    async fn drop_unique_constraints(
        &mut self,
        _table: &str,
        _uniques: &[TableUnique],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropUniqueConstraints)
    }

    async fn create_check_constraint(
        &mut self,
        _table: &str,
        _check: &TableCheck,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateCheckConstraint)
    }

    async fn create_check_constraints(
        &mut self,
        _table: &str,
        _checks: &[TableCheck],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateCheckConstraints)
    }

    async fn drop_check_constraint(&mut self, _table: &str, _name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropCheckConstraint)
    }

    async fn drop_check_constraints(
        &mut self,
        _table: &str,
        _checks: &[TableCheck],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropCheckConstraints)
    }

    async fn create_exclusion_constraint(
        &mut self,
        _table: &str,
        _exclusion: &TableExclusion,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateExclusionConstraint)
    }

    async fn create_exclusion_constraints(
        &mut self,
        _table: &str,
        _exclusions: &[TableExclusion],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateExclusionConstraints)
    }

    async fn drop_exclusion_constraint(&mut self, _table: &str, _name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropExclusionConstraint)
    }

    async fn drop_exclusion_constraints(
        &mut self,
        _table: &str,
        _exclusions: &[TableExclusion],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropExclusionConstraints)
    }

    async fn create_foreign_key(
        &mut self,
        _table: &str,
        _foreign_key: &TableForeignKey,
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateForeignKey)
    }

    async fn create_foreign_keys(
        &mut self,
        _table: &str,
        _foreign_keys: &[TableForeignKey],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateForeignKeys)
    }

    async fn drop_foreign_key(&mut self, _table: &str, _name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropForeignKey)
    }

    async fn drop_foreign_keys(
        &mut self,
        _table: &str,
        _foreign_keys: &[TableForeignKey],
    ) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropForeignKeys)
    }

    async fn create_index(&mut self, _table: &str, _index: &TableIndex) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateIndex)
    }

    async fn create_indices(&mut self, _table: &str, _indices: &[TableIndex]) -> QueryResult<()> {
        self.unsupported(RunnerOperation::CreateIndices)
    }

    async fn drop_index(&mut self, _table: &str, _name: &str) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropIndex)
    }

    async fn drop_indices(&mut self, _table: &str, _indices: &[TableIndex]) -> QueryResult<()> {
        self.unsupported(RunnerOperation::DropIndices)
    }

    async fn clear_table(&mut self, table: &str) -> QueryResult<()> {
        debug!(runner_id = %self.id, collection = %table, "Clearing collection");
        self.store.drop_collection(table).await?;
        Ok(())
    }

    async fn clear_database(&mut self, database: Option<&str>) -> QueryResult<()> {
        debug!(
            runner_id = %self.id,
            database = database.unwrap_or(self.store.database_name()),
            "Clearing database"
        );
        self.store.drop_database(database).await?;
        Ok(())
    }
}

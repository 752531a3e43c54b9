//! Names and families of the query runner contract's schema and SQL methods.
//!
//! Backends that cannot perform an operation reject it with
//! [`RunnerOperation::unsupported`], which produces a
//! [`ErrorCode::NotSupported`](crate::ErrorCode::NotSupported) error whose
//! message depends on the operation's [`OperationFamily`].

use std::fmt;

use crate::error::QueryError;

/// Group of operations sharing one rejection message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationFamily {
    /// Raw SQL execution.
    SqlQuery,
    /// Raw SQL result streaming.
    Stream,
    /// Database introspection.
    CheckDatabase,
    /// Schema, table, view and column introspection.
    CheckSchema,
    /// `CREATE DATABASE`.
    DatabaseCreate,
    /// `DROP DATABASE`.
    DatabaseDrop,
    /// `CREATE SCHEMA`.
    SchemaCreate,
    /// `DROP SCHEMA`.
    SchemaDrop,
    /// `CREATE TABLE`.
    TableCreate,
    /// `DROP TABLE`.
    TableDrop,
    /// `ALTER TABLE ... RENAME`.
    TableRename,
    /// `CREATE VIEW`.
    ViewCreate,
    /// `DROP VIEW`.
    ViewDrop,
    /// Column, key, constraint and index changes.
    SchemaUpdate,
}

impl OperationFamily {
    /// Human-readable rejection message for a backend.
    pub fn rejection(&self, backend: &str) -> String {
        match self {
            Self::SqlQuery => format!("Executing SQL query is not supported by {} driver", backend),
            Self::Stream => format!("Stream is not supported by {} driver", backend),
            other => format!(
                "{} queries are not supported by {} driver",
                other.subject(),
                backend
            ),
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            Self::SqlQuery => "SQL",
            Self::Stream => "Stream",
            Self::CheckDatabase => "Check database",
            Self::CheckSchema => "Check schema",
            Self::DatabaseCreate => "Database create",
            Self::DatabaseDrop => "Database drop",
            Self::SchemaCreate => "Schema create",
            Self::SchemaDrop => "Schema drop",
            Self::TableCreate => "Table create",
            Self::TableDrop => "Table drop",
            Self::TableRename => "Table rename",
            Self::ViewCreate => "View create",
            Self::ViewDrop => "View drop",
            Self::SchemaUpdate => "Schema update",
        }
    }
}

macro_rules! runner_operations {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $family:ident; )+) => {
        /// A schema or SQL method of the [`QueryRunner`](super::QueryRunner) contract.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RunnerOperation {
            $( $(#[$doc])* $variant, )+
        }

        impl RunnerOperation {
            /// Every operation, in contract order.
            pub const ALL: &'static [RunnerOperation] = &[ $( Self::$variant, )+ ];

            /// The contract method name.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }

            /// The family this operation belongs to.
            pub fn family(&self) -> OperationFamily {
                match self {
                    $( Self::$variant => OperationFamily::$family, )+
                }
            }
        }
    };
}

runner_operations! {
    /// `query`
    Query => "query", SqlQuery;
    /// `stream`
    Stream => "stream", Stream;
    /// `get_databases`
    GetDatabases => "get_databases", CheckDatabase;
    /// `has_database`
    HasDatabase => "has_database", CheckDatabase;
    /// `get_current_database`
    GetCurrentDatabase => "get_current_database", CheckDatabase;
    /// `get_schemas`
    GetSchemas => "get_schemas", CheckSchema;
    /// `has_schema`
    HasSchema => "has_schema", CheckSchema;
    /// `get_current_schema`
    GetCurrentSchema => "get_current_schema", CheckSchema;
    /// `get_table`
    GetTable => "get_table", CheckSchema;
    /// `get_tables`
    GetTables => "get_tables", CheckSchema;
    /// `get_view`
    GetView => "get_view", CheckSchema;
    /// `get_views`
    GetViews => "get_views", CheckSchema;
    /// `has_table`
    HasTable => "has_table", CheckSchema;
    /// `has_column`
    HasColumn => "has_column", CheckSchema;
    /// `create_database`
    CreateDatabase => "create_database", DatabaseCreate;
    /// `drop_database`
    DropDatabase => "drop_database", DatabaseDrop;
    /// `create_schema`
    CreateSchema => "create_schema", SchemaCreate;
    /// `drop_schema`
    DropSchema => "drop_schema", SchemaDrop;
    /// `create_table`
    CreateTable => "create_table", TableCreate;
    /// `drop_table`
    DropTable => "drop_table", TableDrop;
    /// `rename_table`
    RenameTable => "rename_table", TableRename;
    /// `create_view`
    CreateView => "create_view", ViewCreate;
    /// `drop_view`
    DropView => "drop_view", ViewDrop;
    /// `add_column`
    AddColumn => "add_column", SchemaUpdate;
    /// `add_columns`
    AddColumns => "add_columns", SchemaUpdate;
    /// `rename_column`
    RenameColumn => "rename_column", SchemaUpdate;
    /// `change_column`
    ChangeColumn => "change_column", SchemaUpdate;
    /// `change_columns`
    ChangeColumns => "change_columns", SchemaUpdate;
    /// `drop_column`
    DropColumn => "drop_column", SchemaUpdate;
    /// `drop_columns`
    DropColumns => "drop_columns", SchemaUpdate;
    /// `create_primary_key`
    CreatePrimaryKey => "create_primary_key", SchemaUpdate;
    /// `update_primary_keys`
    UpdatePrimaryKeys => "update_primary_keys", SchemaUpdate;
    /// `drop_primary_key`
    DropPrimaryKey => "drop_primary_key", SchemaUpdate;
    /// `create_unique_constraint`
    CreateUniqueConstraint => "create_unique_constraint", SchemaUpdate;
    /// `create_unique_constraints`
    CreateUniqueConstraints => "create_unique_constraints", SchemaUpdate;
    /// `drop_unique_constraint`
    DropUniqueConstraint => "drop_unique_constraint", SchemaUpdate;
    /// `drop_unique_constraints`
    DropUniqueConstraints => "drop_unique_constraints", SchemaUpdate;
    /// `create_check_constraint`
    CreateCheckConstraint => "create_check_constraint", SchemaUpdate;
    /// `create_check_constraints`
    CreateCheckConstraints => "create_check_constraints", SchemaUpdate;
    /// `drop_check_constraint`
    DropCheckConstraint => "drop_check_constraint", SchemaUpdate;
    /// `drop_check_constraints`
    DropCheckConstraints => "drop_check_constraints", SchemaUpdate;
    /// `create_exclusion_constraint`
    CreateExclusionConstraint => "create_exclusion_constraint", SchemaUpdate;
    /// `create_exclusion_constraints`
    CreateExclusionConstraints => "create_exclusion_constraints", SchemaUpdate;
    /// `drop_exclusion_constraint`
    DropExclusionConstraint => "drop_exclusion_constraint", SchemaUpdate;
    /// `drop_exclusion_constraints`
    DropExclusionConstraints => "drop_exclusion_constraints", SchemaUpdate;
    /// `create_foreign_key`
    CreateForeignKey => "create_foreign_key", SchemaUpdate;
    /// `create_foreign_keys`
    CreateForeignKeys => "create_foreign_keys", SchemaUpdate;
    /// `drop_foreign_key`
    DropForeignKey => "drop_foreign_key", SchemaUpdate;
    /// `drop_foreign_keys`
    DropForeignKeys => "drop_foreign_keys", SchemaUpdate;
    /// `create_index`
    CreateIndex => "create_index", SchemaUpdate;
    /// `create_indices`
    CreateIndices => "create_indices", SchemaUpdate;
    /// `drop_index`
    DropIndex => "drop_index", SchemaUpdate;
    /// `drop_indices`
    DropIndices => "drop_indices", SchemaUpdate;
}

impl RunnerOperation {
    /// Build the rejection error a backend returns for this operation.
    pub fn unsupported(&self, backend: &str) -> QueryError {
        QueryError::not_supported(self.name(), self.family().rejection(backend))
    }
}

impl fmt::Display for RunnerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

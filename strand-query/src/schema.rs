//! Schema descriptors used by the DDL half of the query runner contract.
//!
//! Relational backends build and diff these during migrations. Document
//! backends never populate them; they exist so every runner accepts the same
//! method signatures.

use serde::{Deserialize, Serialize};

/// A table column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Database type, e.g. `varchar` or `int`.
    pub column_type: String,
    /// Whether NULL is allowed.
    pub is_nullable: bool,
    /// Whether the column is part of the primary key.
    pub is_primary: bool,
    /// Whether the column carries a single-column unique constraint.
    pub is_unique: bool,
    /// Default value expression.
    pub default: Option<String>,
    /// Column length for sized types.
    pub length: Option<String>,
}

impl TableColumn {
    /// Create a column with a name and type.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ..Self::default()
        }
    }

    /// Mark the column nullable.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Mark the column as part of the primary key.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// A pair of column definitions describing an in-place column change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// The column as it exists now.
    pub old_column: TableColumn,
    /// The column as it should become.
    pub new_column: TableColumn,
}

/// An index over one or more columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndex {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub column_names: Vec<String>,
    /// Whether the index is unique.
    pub is_unique: bool,
    /// Partial index predicate.
    pub where_clause: Option<String>,
}

impl TableIndex {
    /// Create an index over the given columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            column_names: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Make the index unique.
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Refuse the change.
    #[default]
    NoAction,
    /// Same as no action, checked immediately.
    Restrict,
    /// Propagate the change.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their defaults.
    SetDefault,
}

/// A foreign key constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableForeignKey {
    /// Constraint name.
    pub name: String,
    /// Columns on the owning table.
    pub column_names: Vec<String>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns.
    pub referenced_column_names: Vec<String>,
    /// Action on delete.
    pub on_delete: ReferentialAction,
    /// Action on update.
    pub on_update: ReferentialAction,
}

/// A unique constraint over one or more columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableUnique {
    /// Constraint name.
    pub name: String,
    /// Constrained columns.
    pub column_names: Vec<String>,
}

/// A check constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheck {
    /// Constraint name.
    pub name: String,
    /// Boolean SQL expression.
    pub expression: String,
}

/// An exclusion constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableExclusion {
    /// Constraint name.
    pub name: String,
    /// Exclusion expression.
    pub expression: String,
}

/// A table with its columns and constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name, optionally schema-qualified.
    pub name: String,
    /// Columns.
    pub columns: Vec<TableColumn>,
    /// Indices.
    pub indices: Vec<TableIndex>,
    /// Foreign keys.
    pub foreign_keys: Vec<TableForeignKey>,
    /// Unique constraints.
    pub uniques: Vec<TableUnique>,
    /// Check constraints.
    pub checks: Vec<TableCheck>,
    /// Exclusion constraints.
    pub exclusions: Vec<TableExclusion>,
}

impl Table {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a column.
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: TableIndex) -> Self {
        self.indices.push(index);
        self
    }

    /// Find a column by name.
    pub fn find_column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary key columns.
    pub fn primary_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// A database view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: String,
    /// Defining query.
    pub expression: String,
    /// Whether the view is materialized.
    pub materialized: bool,
}

impl View {
    /// Create a view from a name and its defining query.
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            materialized: false,
        }
    }
}

//! Reconciliation operations.
//!
//! Each [`Operation`] is one DDL step. The differ emits them already sorted by
//! [`Operation::phase`], which is the order they must be applied in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::ColumnDefinition;

/// A single DDL step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a table with its primary key established inline.
    CreateTable {
        /// Table name.
        table: String,
        /// Column definitions, primary key first.
        columns: Vec<ColumnDefinition>,
        /// Primary key column.
        primary_key: String,
    },

    /// Add a column to a table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnDefinition,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Change a column's type, limit, nullability or default in place.
    ChangeColumn {
        /// Table name.
        table: String,
        /// New column definition.
        column: ColumnDefinition,
        /// Live definition being replaced.
        from: ColumnDefinition,
    },

    /// Create an index.
    AddIndex {
        /// Table name.
        table: String,
        /// Resolved index name.
        name: String,
        /// Columns to index.
        columns: Vec<String>,
        /// Whether this is a unique index.
        unique: bool,
    },

    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
}

impl Operation {
    /// Creates a `CreateTable` operation.
    #[must_use]
    pub fn create_table(
        table: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self::CreateTable {
            table: table.into(),
            columns,
            primary_key: primary_key.into(),
        }
    }

    /// Creates an `AddColumn` operation.
    #[must_use]
    pub fn add_column(table: impl Into<String>, column: ColumnDefinition) -> Self {
        Self::AddColumn {
            table: table.into(),
            column,
        }
    }

    /// Creates a `DropColumn` operation.
    #[must_use]
    pub fn drop_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DropColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a `ChangeColumn` operation.
    #[must_use]
    pub fn change_column(
        table: impl Into<String>,
        column: ColumnDefinition,
        from: ColumnDefinition,
    ) -> Self {
        Self::ChangeColumn {
            table: table.into(),
            column,
            from,
        }
    }

    /// Creates an `AddIndex` operation.
    #[must_use]
    pub fn add_index(
        table: impl Into<String>,
        name: impl Into<String>,
        columns: Vec<String>,
        unique: bool,
    ) -> Self {
        Self::AddIndex {
            table: table.into(),
            name: name.into(),
            columns,
            unique,
        }
    }

    /// Creates a `DropIndex` operation.
    #[must_use]
    pub fn drop_index(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropIndex {
            table: table.into(),
            name: name.into(),
        }
    }

    /// Returns the table this operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ChangeColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. } => table,
        }
    }

    /// Position in the apply order. Index drops precede column drops so no
    /// index is left pointing at a missing column; column additions precede
    /// index creation.
    #[must_use]
    pub fn phase(&self) -> u8 {
        match self {
            Self::CreateTable { .. } => 0,
            Self::DropIndex { .. } => 1,
            Self::DropColumn { .. } => 2,
            Self::ChangeColumn { .. } => 3,
            Self::AddColumn { .. } => 4,
            Self::AddIndex { .. } => 5,
        }
    }

    /// Returns `true` if the operation discards stored data.
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn { .. })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                write!(
                    f,
                    "create table {table} ({}) primary key {primary_key}",
                    names.join(", ")
                )
            }
            Self::AddColumn { table, column } => write!(
                f,
                "add column {table}.{} {}",
                column.name, column.column_type
            ),
            Self::DropColumn { table, column } => write!(f, "drop column {table}.{column}"),
            Self::ChangeColumn { table, column, from } => write!(
                f,
                "change column {table}.{} {} -> {}",
                column.name, from.column_type, column.column_type
            ),
            Self::AddIndex {
                table,
                name,
                columns,
                unique,
            } => write!(
                f,
                "add {}index {name} on {table} ({})",
                if *unique { "unique " } else { "" },
                columns.join(", ")
            ),
            Self::DropIndex { table, name } => write!(f, "drop index {name} on {table}"),
        }
    }
}

/// Sorts operations into apply order. The sort is stable, so operations of
/// the same phase keep the order they were produced in.
pub fn sort_operations(operations: &mut [Operation]) {
    operations.sort_by_key(Operation::phase);
}

//! Database driver capability.
//!
//! Driver crates (autoschema-sqlite, etc.) implement [`SchemaDriver`] to read
//! the live schema and issue DDL. The core crate defines only the trait so it
//! stays driver-agnostic.

use crate::error::DriverError;
use crate::operations::Operation;
use crate::schema::{ColumnDefinition, IndexDefinition, LiveSchema};

/// Introspection and DDL primitives the reconciler needs from a database.
///
/// Calls are awaited one at a time; implementations may assume a single
/// writer for the duration of a reconciliation.
#[allow(async_fn_in_trait)]
pub trait SchemaDriver {
    /// Maximum identifier length in bytes.
    fn max_identifier_length(&self) -> usize;

    /// Returns `true` if the table exists.
    async fn table_exists(&self, table: &str) -> Result<bool, DriverError>;

    /// Returns the table's columns in table order.
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDefinition>, DriverError>;

    /// Returns the table's indexes, each with its actual name. Indexes the
    /// backend creates implicitly for primary keys are not included.
    async fn indexes(&self, table: &str) -> Result<Vec<IndexDefinition>, DriverError>;

    /// Returns the primary key column, if any.
    async fn primary_key(&self, table: &str) -> Result<Option<String>, DriverError>;

    /// Creates a table with `primary_key` established in the same statement.
    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        primary_key: &str,
    ) -> Result<(), DriverError>;

    /// Adds a column.
    async fn add_column(&self, table: &str, column: &ColumnDefinition) -> Result<(), DriverError>;

    /// Drops a column.
    async fn drop_column(&self, table: &str, column: &str) -> Result<(), DriverError>;

    /// Alters a column in place, keeping its rows.
    async fn change_column(
        &self,
        table: &str,
        column: &ColumnDefinition,
    ) -> Result<(), DriverError>;

    /// Creates an index.
    async fn add_index(
        &self,
        table: &str,
        name: &str,
        columns: &[String],
        unique: bool,
    ) -> Result<(), DriverError>;

    /// Drops an index.
    async fn drop_index(&self, table: &str, name: &str) -> Result<(), DriverError>;

    /// Reads a fresh snapshot of the table, or `None` if it does not exist.
    async fn inspect(&self, table: &str) -> Result<Option<LiveSchema>, DriverError> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }
        Ok(Some(LiveSchema {
            table_name: table.to_string(),
            primary_key: self.primary_key(table).await?,
            columns: self.columns(table).await?,
            indexes: self.indexes(table).await?,
        }))
    }

    /// Applies one operation.
    async fn apply(&self, operation: &Operation) -> Result<(), DriverError> {
        match operation {
            Operation::CreateTable {
                table,
                columns,
                primary_key,
            } => self.create_table(table, columns, primary_key).await,
            Operation::AddColumn { table, column } => self.add_column(table, column).await,
            Operation::DropColumn { table, column } => self.drop_column(table, column).await,
            Operation::ChangeColumn { table, column, .. } => {
                self.change_column(table, column).await
            }
            Operation::AddIndex {
                table,
                name,
                columns,
                unique,
            } => self.add_index(table, name, columns, *unique).await,
            Operation::DropIndex { table, name } => self.drop_index(table, name).await,
        }
    }
}

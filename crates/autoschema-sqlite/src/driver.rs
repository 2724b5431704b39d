//! [`SchemaDriver`] implementation over an sqlx SQLite pool.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use autoschema_core::driver::SchemaDriver;
use autoschema_core::error::{DriverError, DriverErrorKind};
use autoschema_core::schema::{ColumnDefinition, IndexDefinition, LiveSchema};

use crate::dialect::SqliteDialect;
use crate::introspect;

/// Identifier limit applied to index names unless configured otherwise.
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 64;

/// SQLite schema driver.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
    dialect: SqliteDialect,
    max_identifier_length: usize,
}

impl SqliteDriver {
    /// Creates a driver over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dialect: SqliteDialect::new(),
            max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
        }
    }

    /// Opens a database, creating the file if it does not exist.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Sets the identifier limit used for index names.
    #[must_use]
    pub fn with_max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = length;
        self
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the SQL dialect.
    pub fn dialect(&self) -> &SqliteDialect {
        &self.dialect
    }

    /// Drops a table. Reconciliation never drops tables; this is for callers
    /// retiring an entity.
    pub async fn drop_table(&self, table: &str) -> Result<(), DriverError> {
        info!(table, "Dropping table");
        self.execute(&self.dialect.drop_table_sql(table)).await
    }

    async fn execute(&self, sql: &str) -> Result<(), DriverError> {
        debug!(sql = %sql, "Executing SQL");
        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(to_driver_error)?;
        Ok(())
    }

    async fn live_schema(&self, table: &str) -> Result<LiveSchema, DriverError> {
        self.inspect(table).await?.ok_or_else(|| {
            DriverError::new(DriverErrorKind::Other, format!("no such table: {table}"))
        })
    }
}

/// Classifies an sqlx error. Unique violations become
/// [`DriverErrorKind::ConstraintViolation`].
pub fn to_driver_error(err: sqlx::Error) -> DriverError {
    let kind = match err.as_database_error() {
        Some(db) if db.is_unique_violation() => DriverErrorKind::ConstraintViolation,
        _ => DriverErrorKind::Other,
    };
    DriverError::from_source(kind, err)
}

impl SchemaDriver for SqliteDriver {
    fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    async fn table_exists(&self, table: &str) -> Result<bool, DriverError> {
        introspect::table_exists(&self.pool, table)
            .await
            .map_err(to_driver_error)
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDefinition>, DriverError> {
        introspect::columns(&self.pool, &self.dialect, table)
            .await
            .map_err(to_driver_error)
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexDefinition>, DriverError> {
        introspect::indexes(&self.pool, table)
            .await
            .map_err(to_driver_error)
    }

    async fn primary_key(&self, table: &str) -> Result<Option<String>, DriverError> {
        introspect::primary_key(&self.pool, table)
            .await
            .map_err(to_driver_error)
    }

    async fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        primary_key: &str,
    ) -> Result<(), DriverError> {
        self.execute(&self.dialect.create_table_sql(table, columns, primary_key))
            .await
    }

    async fn add_column(&self, table: &str, column: &ColumnDefinition) -> Result<(), DriverError> {
        self.execute(&self.dialect.add_column_sql(table, column))
            .await
    }

    async fn drop_column(&self, table: &str, column: &str) -> Result<(), DriverError> {
        self.execute(&self.dialect.drop_column_sql(table, column))
            .await
    }

    /// Rebuilds the table inside one transaction; on failure the original
    /// table is left untouched.
    async fn change_column(
        &self,
        table: &str,
        column: &ColumnDefinition,
    ) -> Result<(), DriverError> {
        let live = self.live_schema(table).await?;
        let statements = self.dialect.rebuild_table_sql(&live, column);
        info!(table, column = %column.name, "Rebuilding table");

        let mut tx = self.pool.begin().await.map_err(to_driver_error)?;
        for sql in &statements {
            debug!(sql = %sql, "Executing SQL");
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(to_driver_error)?;
        }
        tx.commit().await.map_err(to_driver_error)
    }

    async fn add_index(
        &self,
        table: &str,
        name: &str,
        columns: &[String],
        unique: bool,
    ) -> Result<(), DriverError> {
        self.execute(&self.dialect.create_index_sql(table, name, columns, unique))
            .await
    }

    async fn drop_index(&self, _table: &str, name: &str) -> Result<(), DriverError> {
        self.execute(&self.dialect.drop_index_sql(name)).await
    }
}

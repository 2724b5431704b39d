//! Live schema queries against `sqlite_master` and the table pragmas.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use autoschema_core::schema::{ColumnDefinition, IndexDefinition};

use crate::dialect::SqliteDialect;

/// Returns `true` if a table named `table` exists.
pub(crate) async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await?;
    Ok(row.0 > 0)
}

/// Row of `PRAGMA table_info`.
struct TableInfo {
    name: String,
    declared_type: String,
    not_null: bool,
    default: Option<String>,
    pk: i64,
}

async fn table_info(pool: &SqlitePool, table: &str) -> Result<Vec<TableInfo>, sqlx::Error> {
    let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
        "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(name, declared_type, not_null, default, pk)| TableInfo {
            name,
            declared_type,
            not_null: not_null != 0,
            default,
            pk,
        })
        .collect())
}

/// Reads the columns of `table` in table order.
pub(crate) async fn columns(
    pool: &SqlitePool,
    dialect: &SqliteDialect,
    table: &str,
) -> Result<Vec<ColumnDefinition>, sqlx::Error> {
    let columns = table_info(pool, table)
        .await?
        .into_iter()
        .map(|info| {
            let mut column = dialect.parse_column(&info.name, &info.declared_type);
            column.options.null = !info.not_null;
            column.options.default = info.default.as_deref().map(|raw| dialect.parse_default(raw));
            column
        })
        .collect::<Vec<_>>();
    debug!(table, columns = columns.len(), "Read columns");
    Ok(columns)
}

/// Returns the primary key column. Composite keys report their first
/// column; tables keyed only by the implicit rowid report `None`.
pub(crate) async fn primary_key(
    pool: &SqlitePool,
    table: &str,
) -> Result<Option<String>, sqlx::Error> {
    Ok(table_info(pool, table)
        .await?
        .into_iter()
        .filter(|info| info.pk > 0)
        .min_by_key(|info| info.pk)
        .map(|info| info.name))
}

/// Reads the indexes created with `CREATE INDEX`. Indexes SQLite creates
/// for primary keys and inline UNIQUE constraints are left out.
pub(crate) async fn indexes(
    pool: &SqlitePool,
    table: &str,
) -> Result<Vec<IndexDefinition>, sqlx::Error> {
    let list: Vec<(String, i64)> = sqlx::query_as(
        "SELECT name, \"unique\" FROM pragma_index_list(?) WHERE origin = 'c' ORDER BY name",
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    let mut indexes = Vec::with_capacity(list.len());
    for (name, unique) in list {
        let columns: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                .bind(&name)
                .fetch_all(pool)
                .await?;
        indexes.push(IndexDefinition {
            name: Some(name),
            columns: columns.into_iter().filter_map(|(c,)| c).collect(),
            unique: unique != 0,
        });
    }
    debug!(table, indexes = indexes.len(), "Read indexes");
    Ok(indexes)
}

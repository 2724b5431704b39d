//! SQLite DDL generation.
//!
//! SQLite cannot alter a column in place, so [`Operation::ChangeColumn`] uses
//! the "table recreation" strategy: create a replacement table, copy the rows,
//! drop the old table, rename the replacement and recreate its indexes. See
//! [`SqliteDialect::rebuild_table_sql`].

use autoschema_core::operations::Operation;
use autoschema_core::schema::{ColumnDefinition, ColumnType, DefaultValue, LiveSchema};

/// Prefix of the scratch table used while rebuilding.
const REBUILD_PREFIX: &str = "_autoschema_rebuild_";

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Quotes an identifier.
    #[must_use]
    pub fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Returns the declared SQLite type for a column.
    #[must_use]
    pub fn type_name(&self, column: &ColumnDefinition) -> String {
        let options = &column.options;
        match column.column_type {
            ColumnType::String => match options.limit {
                Some(limit) => format!("varchar({limit})"),
                None => "varchar".to_string(),
            },
            ColumnType::Text => "text".to_string(),
            ColumnType::Integer | ColumnType::References => "integer".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Float => "float".to_string(),
            ColumnType::Decimal => match (options.precision, options.scale) {
                (Some(p), Some(s)) => format!("decimal({p},{s})"),
                (Some(p), None) => format!("decimal({p})"),
                _ => "decimal".to_string(),
            },
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "datetime".to_string(),
            ColumnType::Binary => match options.limit {
                Some(limit) => format!("blob({limit})"),
                None => "blob".to_string(),
            },
        }
    }

    /// Parses a declared type as reported by `PRAGMA table_info` into a
    /// column of that shape. Types this dialect never writes are mapped by
    /// SQLite's affinity rules.
    #[must_use]
    pub fn parse_column(&self, name: &str, declared: &str) -> ColumnDefinition {
        let declared = declared.trim().to_ascii_lowercase();
        let (base, args) = match declared.split_once('(') {
            Some((base, rest)) => (base.trim(), rest.trim_end_matches(')')),
            None => (declared.as_str(), ""),
        };
        let mut args = args.split(',').filter_map(|a| a.trim().parse::<u32>().ok());
        let first = args.next();
        let second = args.next();

        let mut column = ColumnDefinition::new(name, ColumnType::Text);
        column.column_type = match base {
            "varchar" | "character varying" | "string" => {
                column.options.limit = first;
                ColumnType::String
            }
            "text" | "clob" => ColumnType::Text,
            "integer" | "int" => ColumnType::Integer,
            "bigint" => ColumnType::BigInt,
            "float" | "real" | "double" => ColumnType::Float,
            "decimal" | "numeric" => {
                column.options.precision = first.and_then(|p| u8::try_from(p).ok());
                column.options.scale = second.and_then(|s| u8::try_from(s).ok());
                ColumnType::Decimal
            }
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "datetime" | "timestamp" => ColumnType::DateTime,
            "blob" | "binary" => {
                column.options.limit = first;
                ColumnType::Binary
            }
            other if other.contains("int") => ColumnType::Integer,
            other if other.contains("char") => {
                column.options.limit = first;
                ColumnType::String
            }
            other if other.contains("real") || other.contains("floa") || other.contains("doub") => {
                ColumnType::Float
            }
            "" => ColumnType::Binary,
            _ => ColumnType::Text,
        };
        column
    }

    /// Parses a `dflt_value` from `PRAGMA table_info`.
    #[must_use]
    pub fn parse_default(&self, raw: &str) -> DefaultValue {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("null") {
            return DefaultValue::Null;
        }
        if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
            return DefaultValue::String(raw[1..raw.len() - 1].replace("''", "'"));
        }
        if let Ok(value) = raw.parse::<i64>() {
            return DefaultValue::Integer(value);
        }
        if let Ok(value) = raw.parse::<f64>() {
            return DefaultValue::Float(value);
        }
        if raw.eq_ignore_ascii_case("true") {
            return DefaultValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return DefaultValue::Bool(false);
        }
        DefaultValue::Expression(raw.to_string())
    }

    /// Generates a column definition for `CREATE TABLE` or `ADD COLUMN`.
    #[must_use]
    pub fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), self.type_name(column)];
        if !column.options.null {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.options.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }
        parts.join(" ")
    }

    /// Generates the inline primary key definition. Integer keys are
    /// auto-incrementing row ids.
    #[must_use]
    pub fn primary_key_definition(&self, column: &ColumnDefinition) -> String {
        let name = self.quote_identifier(&column.name);
        match column.column_type {
            ColumnType::Integer | ColumnType::References => {
                format!("{name} integer PRIMARY KEY AUTOINCREMENT NOT NULL")
            }
            _ => format!("{name} {} NOT NULL PRIMARY KEY", self.type_name(column)),
        }
    }

    /// Generates SQL for creating a table with its primary key inline.
    #[must_use]
    pub fn create_table_sql(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        primary_key: &str,
    ) -> String {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| {
                if c.name == primary_key {
                    self.primary_key_definition(c)
                } else {
                    self.column_definition(c)
                }
            })
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(table),
            definitions.join(", ")
        )
    }

    /// Generates SQL for dropping a table.
    #[must_use]
    pub fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    /// Generates SQL for renaming a table.
    #[must_use]
    pub fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }

    /// Generates SQL for adding a column.
    #[must_use]
    pub fn add_column_sql(&self, table: &str, column: &ColumnDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(table),
            self.column_definition(column)
        )
    }

    /// Generates SQL for dropping a column (SQLite 3.35.0+).
    #[must_use]
    pub fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Generates SQL for creating an index.
    #[must_use]
    pub fn create_index_sql(&self, table: &str, name: &str, columns: &[String], unique: bool) -> String {
        let quoted: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote_identifier(name),
            self.quote_identifier(table),
            quoted.join(", ")
        )
    }

    /// Generates SQL for dropping an index.
    #[must_use]
    pub fn drop_index_sql(&self, name: &str) -> String {
        format!("DROP INDEX {}", self.quote_identifier(name))
    }

    /// Generates the statements that rebuild `live` with `changed` replacing
    /// the column of the same name. Rows are copied column by column; the
    /// primary key and all indexes are carried over.
    #[must_use]
    pub fn rebuild_table_sql(&self, live: &LiveSchema, changed: &ColumnDefinition) -> Vec<String> {
        let table = live.table_name.as_str();
        let scratch = format!("{REBUILD_PREFIX}{table}");
        let columns: Vec<ColumnDefinition> = live
            .columns
            .iter()
            .map(|c| if c.name == changed.name { changed.clone() } else { c.clone() })
            .collect();

        let definitions: Vec<String> = columns
            .iter()
            .map(|c| {
                if live.primary_key.as_deref() == Some(c.name.as_str()) {
                    self.primary_key_definition(c)
                } else {
                    self.column_definition(c)
                }
            })
            .collect();
        let names: Vec<String> = columns.iter().map(|c| self.quote_identifier(&c.name)).collect();
        let names = names.join(", ");

        let mut statements = vec![
            format!(
                "CREATE TABLE {} ({})",
                self.quote_identifier(&scratch),
                definitions.join(", ")
            ),
            format!(
                "INSERT INTO {} ({names}) SELECT {names} FROM {}",
                self.quote_identifier(&scratch),
                self.quote_identifier(table)
            ),
            self.drop_table_sql(table),
            self.rename_table_sql(&scratch, table),
        ];
        for index in &live.indexes {
            if let Some(name) = &index.name {
                statements.push(self.create_index_sql(table, name, &index.columns, index.unique));
            }
        }
        statements
    }

    /// Generates SQL for an operation. A column change needs the live table
    /// and is rendered as a comment; drivers call
    /// [`rebuild_table_sql`](Self::rebuild_table_sql) instead.
    #[must_use]
    pub fn generate_sql(&self, operation: &Operation) -> Vec<String> {
        match operation {
            Operation::CreateTable {
                table,
                columns,
                primary_key,
            } => vec![self.create_table_sql(table, columns, primary_key)],
            Operation::AddColumn { table, column } => vec![self.add_column_sql(table, column)],
            Operation::DropColumn { table, column } => vec![self.drop_column_sql(table, column)],
            Operation::ChangeColumn { table, column, .. } => vec![format!(
                "-- rebuild {} with {}",
                self.quote_identifier(table),
                self.column_definition(column)
            )],
            Operation::AddIndex {
                table,
                name,
                columns,
                unique,
            } => vec![self.create_index_sql(table, name, columns, *unique)],
            Operation::DropIndex { name, .. } => vec![self.drop_index_sql(name)],
        }
    }
}

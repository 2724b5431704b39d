//! Schema representation types.
//!
//! A [`TableDefinition`] is the desired shape of a table as declared in code.
//! A [`LiveSchema`] is the shape a driver read back from the database. Both
//! share [`ColumnDefinition`] and [`IndexDefinition`] so that the differ can
//! compare them directly.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Primary key column used when none is declared.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Discriminator column used for shared tables when none is configured.
pub const DEFAULT_INHERITANCE_COLUMN: &str = "type";

/// Limit given to string columns declared without one.
pub const DEFAULT_STRING_LIMIT: u32 = 255;

/// Column types understood by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Bounded character string.
    String,
    /// Unbounded text.
    Text,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    #[serde(rename = "bigint")]
    BigInt,
    /// Floating point.
    Float,
    /// Fixed-point decimal with optional precision and scale.
    Decimal,
    /// Boolean.
    Boolean,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time.
    #[serde(rename = "datetime")]
    DateTime,
    /// Binary data.
    Binary,
    /// Reference to another table. A column `x` becomes integer `x_id`.
    References,
}

impl ColumnType {
    /// Returns the lowercase name used in manifests and messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Binary => "binary",
            Self::References => "references",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g., "CURRENT_TIMESTAMP").
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    ///
    /// Two defaults are considered equal when they render to the same SQL, so
    /// `Bool(true)` and an introspected `Integer(1)` compare equal.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(i) => i.to_string(),
            // -0.0 would render as "-0", which reads back as integer 0.
            Self::Float(f) if *f == 0.0 => "0".to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// The closed set of options a column declaration accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnOptions {
    /// Maximum length (string and binary columns).
    pub limit: Option<u32>,
    /// Whether NULL is allowed.
    pub null: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Back the column with a unique index.
    pub unique: bool,
    /// Back the column with a plain index.
    pub index: bool,
    /// Total digits (decimal columns).
    pub precision: Option<u8>,
    /// Digits after the decimal point (decimal columns).
    pub scale: Option<u8>,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            limit: None,
            null: true,
            default: None,
            unique: false,
            index: false,
            precision: None,
            scale: None,
        }
    }
}

/// A single column, either declared or introspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Declared options.
    #[serde(default)]
    pub options: ColumnOptions,
}

impl ColumnDefinition {
    /// Creates a nullable column with no options.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: ColumnOptions::default(),
        }
    }

    /// Replaces all options at once.
    #[must_use]
    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the length limit.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.options.null = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.options.default = Some(value);
        self
    }

    /// Backs the column with a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Backs the column with a plain index.
    #[must_use]
    pub fn index(mut self) -> Self {
        self.options.index = true;
        self
    }

    /// Sets decimal precision and scale.
    #[must_use]
    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.options.precision = Some(precision);
        self.options.scale = Some(scale);
        self
    }

    /// Resolves references and default limits into the stored shape.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        match self.column_type {
            ColumnType::References => {
                if !self.name.ends_with("_id") {
                    self.name.push_str("_id");
                }
                self.column_type = ColumnType::Integer;
            }
            ColumnType::String => {
                self.options.limit.get_or_insert(DEFAULT_STRING_LIMIT);
            }
            _ => {}
        }
        self
    }

    /// Returns `true` if the storage shape matches: type, limit, nullability,
    /// default and decimal precision. Index options are not part of the shape.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.column_type == other.column_type
            && self.options.limit == other.options.limit
            && self.options.null == other.options.null
            && self.options.precision == other.options.precision
            && self.options.scale == other.options.scale
            && self.default_sql() == other.default_sql()
    }

    /// Rendered default, with an explicit NULL default treated as none.
    fn default_sql(&self) -> Option<String> {
        self.options
            .default
            .as_ref()
            .filter(|value| **value != DefaultValue::Null)
            .map(DefaultValue::to_sql)
    }

    fn validate(&self, table: &str) -> Result<(), ConfigError> {
        let invalid = |option| ConfigError::InvalidOption {
            table: table.to_string(),
            column: self.name.clone(),
            option,
            column_type: self.column_type,
        };
        let takes_limit = matches!(self.column_type, ColumnType::String | ColumnType::Binary);
        if self.options.limit.is_some() && !takes_limit {
            return Err(invalid("limit"));
        }
        if self.column_type != ColumnType::Decimal {
            if self.options.precision.is_some() {
                return Err(invalid("precision"));
            }
            if self.options.scale.is_some() {
                return Err(invalid("scale"));
            }
        } else if self.options.scale.is_some() && self.options.precision.is_none() {
            return Err(invalid("scale"));
        }
        Ok(())
    }
}

/// An index, either declared or introspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Explicit name. Declared indexes usually leave this empty and let the
    /// name resolver derive one; introspected indexes always carry it.
    #[serde(default)]
    pub name: Option<String>,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn on<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Marks the index as unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Overrides the derived name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns `true` if both indexes cover the same columns with the same
    /// uniqueness. Names are not compared.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

/// The declared shape of one table, or one entity's fragment of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name.
    pub table_name: String,
    /// Explicitly declared primary key, if any.
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// Explicitly declared indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// Discriminator column for shared tables.
    #[serde(default)]
    pub inheritance_column: Option<String>,
    #[serde(skip)]
    rejected_primary_keys: Vec<String>,
}

impl TableDefinition {
    /// Creates an empty declaration for a table.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            inheritance_column: None,
            rejected_primary_keys: Vec::new(),
        }
    }

    /// Adds a column. Re-adding an identical column is a no-op.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        let column = column.normalized();
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    /// Adds several columns sharing one type.
    #[must_use]
    pub fn columns_of<I, S>(mut self, names: I, column_type: ColumnType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self = self.column(ColumnDefinition::new(name, column_type));
        }
        self
    }

    /// Adds nullable `created_at` and `updated_at` datetime columns.
    #[must_use]
    pub fn timestamps(self) -> Self {
        self.column(ColumnDefinition::new("created_at", ColumnType::DateTime))
            .column(ColumnDefinition::new("updated_at", ColumnType::DateTime))
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        if !self.indexes.contains(&index) {
            self.indexes.push(index);
        }
        self
    }

    /// Declares the primary key column. Declaring a second, different key is
    /// reported by [`validate`](Self::validate).
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        match &self.primary_key {
            Some(existing) if *existing != column => {
                if !self.rejected_primary_keys.contains(&column) {
                    self.rejected_primary_keys.push(column);
                }
            }
            Some(_) => {}
            None => self.primary_key = Some(column),
        }
        self
    }

    /// Sets the discriminator column used when the table is shared.
    #[must_use]
    pub fn inheritance_column(mut self, column: impl Into<String>) -> Self {
        self.inheritance_column = Some(column.into());
        self
    }

    /// Returns the primary key column name, falling back to `id`.
    #[must_use]
    pub fn primary_key_name(&self) -> &str {
        self.primary_key.as_deref().unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// Returns the primary key column: the declared column of that name, or
    /// a NOT NULL integer.
    #[must_use]
    pub fn primary_key_column(&self) -> ColumnDefinition {
        let name = self.primary_key_name();
        self.get_column(name).cloned().map_or_else(
            || ColumnDefinition::new(name, ColumnType::Integer).not_null(),
            |mut column| {
                column.options.null = false;
                column
            },
        )
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns every index this declaration implies: explicit indexes followed
    /// by those requested through column `index`/`unique` options.
    #[must_use]
    pub fn index_definitions(&self) -> Vec<IndexDefinition> {
        let mut indexes = self.indexes.clone();
        for column in &self.columns {
            if column.options.index || column.options.unique {
                let mut index = IndexDefinition::on([column.name.clone()]);
                index.unique = column.options.unique;
                if !indexes.contains(&index) {
                    indexes.push(index);
                }
            }
        }
        indexes
    }

    /// Checks the fragment on its own: primary key, column options,
    /// duplicate columns and empty indexes. Index columns are not checked
    /// here because siblings sharing the table may declare them.
    pub fn validate_local(&self) -> Result<(), ConfigError> {
        if let Some(second) = self.rejected_primary_keys.first() {
            return Err(ConfigError::DuplicatePrimaryKey {
                table: self.table_name.clone(),
                first: self.primary_key_name().to_string(),
                second: second.clone(),
            });
        }

        let mut seen = BTreeSet::new();
        for column in &self.columns {
            column.validate(&self.table_name)?;
            if !seen.insert(column.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    table: self.table_name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        if self.indexes.iter().any(|i| i.columns.is_empty()) {
            return Err(ConfigError::EmptyIndex {
                table: self.table_name.clone(),
            });
        }
        Ok(())
    }

    /// Checks that every index column is declared. The primary key and the
    /// discriminator count as declared.
    pub fn validate_index_columns(&self) -> Result<(), ConfigError> {
        let known = |name: &str| {
            name == self.primary_key_name()
                || self.inheritance_column.as_deref() == Some(name)
                || self.get_column(name).is_some()
        };
        for index in self.index_definitions() {
            if let Some(missing) = index.columns.iter().find(|c| !known(c)) {
                return Err(ConfigError::UnknownIndexColumn {
                    table: self.table_name.clone(),
                    index: index
                        .name
                        .clone()
                        .unwrap_or_else(|| index.columns.join(", ")),
                    column: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Runs every structural check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_local()?;
        self.validate_index_columns()
    }
}

/// The shape of a table as read from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSchema {
    /// Table name.
    pub table_name: String,
    /// Primary key column, if the table has one.
    pub primary_key: Option<String>,
    /// Columns in table order.
    pub columns: Vec<ColumnDefinition>,
    /// Indexes, each carrying its actual name.
    pub indexes: Vec<IndexDefinition>,
}

impl LiveSchema {
    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns column names in table order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns index names, sorted.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().filter_map(|i| i.name.clone()).collect();
        names.sort();
        names
    }
}

//! JSON declaration manifest.
//!
//! Lets entities be declared outside of Rust code, e.g. for the CLI:
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "name": "Person",
//!       "table": "people",
//!       "columns": [
//!         { "name": "name", "type": "string", "index": true },
//!         { "name": "age", "type": "integer", "null": false, "default": { "integer": 0 } }
//!       ],
//!       "indexes": [{ "columns": ["name", "age"], "unique": true }]
//!     }
//!   ]
//! }
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::SchemaRegistry;
use crate::schema::{
    ColumnDefinition, ColumnOptions, ColumnType, DefaultValue, IndexDefinition, TableDefinition,
};

/// A list of entity declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Entities in registration order.
    #[serde(default)]
    pub entities: Vec<EntityManifest>,
}

/// One entity and its fragment of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityManifest {
    /// Entity name.
    pub name: String,
    /// Table the entity is stored in.
    pub table: String,
    /// Primary key column, `id` if omitted.
    #[serde(default)]
    pub primary_key: Option<String>,
    /// Discriminator column, `type` if omitted and the table is shared.
    #[serde(default)]
    pub inheritance_column: Option<String>,
    /// Adds `created_at` and `updated_at`.
    #[serde(default)]
    pub timestamps: bool,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnManifest>,
    /// Multi-column or explicitly named indexes.
    #[serde(default)]
    pub indexes: Vec<IndexManifest>,
}

/// A column declaration. Options sit next to `name` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnManifest {
    /// Column name. A `references` column `x` is stored as `x_id`.
    pub name: String,
    /// Column type, `string` if omitted.
    #[serde(rename = "type", default = "default_column_type")]
    pub column_type: ColumnType,
    /// Maximum length (string and binary columns).
    #[serde(default)]
    pub limit: Option<u32>,
    /// Whether NULL is allowed. Defaults to `true`.
    #[serde(default = "default_null")]
    pub null: bool,
    /// Default value, e.g. `{ "integer": 0 }`.
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Back the column with a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Back the column with a plain index.
    #[serde(default)]
    pub index: bool,
    /// Total digits (decimal columns).
    #[serde(default)]
    pub precision: Option<u8>,
    /// Digits after the decimal point. Requires `precision`.
    #[serde(default)]
    pub scale: Option<u8>,
}

fn default_column_type() -> ColumnType {
    ColumnType::String
}

fn default_null() -> bool {
    true
}

/// An index declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexManifest {
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
    /// Explicit name. Derived from the table and columns if omitted.
    #[serde(default)]
    pub name: Option<String>,
}

impl Manifest {
    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Registers every entity, in document order.
    pub fn into_registry(self) -> Result<SchemaRegistry, ConfigError> {
        let mut registry = SchemaRegistry::new();
        for entity in self.entities {
            let definition = entity.to_definition();
            registry.register(entity.name, definition)?;
        }
        Ok(registry)
    }
}

impl FromStr for Manifest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

impl EntityManifest {
    /// Builds the entity's declaration fragment.
    #[must_use]
    pub fn to_definition(&self) -> TableDefinition {
        let mut definition = TableDefinition::new(&self.table);
        if let Some(pk) = &self.primary_key {
            definition = definition.primary_key(pk);
        }
        if let Some(column) = &self.inheritance_column {
            definition = definition.inheritance_column(column);
        }
        for column in &self.columns {
            definition = definition.column(column.to_definition());
        }
        if self.timestamps {
            definition = definition.timestamps();
        }
        for index in &self.indexes {
            definition = definition.index(index.to_definition());
        }
        definition
    }
}

impl ColumnManifest {
    fn to_definition(&self) -> ColumnDefinition {
        ColumnDefinition::new(&self.name, self.column_type).with_options(ColumnOptions {
            limit: self.limit,
            null: self.null,
            default: self.default.clone(),
            unique: self.unique,
            index: self.index,
            precision: self.precision,
            scale: self.scale,
        })
    }
}

impl IndexManifest {
    fn to_definition(&self) -> IndexDefinition {
        IndexDefinition {
            name: self.name.clone(),
            columns: self.columns.clone(),
            unique: self.unique,
        }
    }
}

//! Single-table inheritance merging.
//!
//! Entities that share one physical table each declare a fragment of it. The
//! merger folds every fragment of a group into one canonical
//! [`TableDefinition`], so a column declared by any sibling is part of the
//! table for all of them.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::naming::IndexNameResolver;
use crate::schema::{
    ColumnDefinition, ColumnType, IndexDefinition, TableDefinition, DEFAULT_INHERITANCE_COLUMN,
};

/// Merges the fragments of all entities bound to `table_name`.
///
/// Fragments are visited in the given order. A column declared identically by
/// several siblings is kept once; the same name with a different storage shape
/// is a [`ConfigError::ConflictingColumn`]. Index options may differ between
/// siblings and are unioned. When more than one fragment is given,
/// or any fragment configures a discriminator, the discriminator column is
/// added as a nullable string unless a fragment already declares it.
///
/// Every index in the result carries its resolved name.
pub fn merge<'a, I>(
    table_name: &str,
    fragments: I,
    resolver: &IndexNameResolver,
) -> Result<TableDefinition, ConfigError>
where
    I: IntoIterator<Item = &'a TableDefinition>,
{
    let fragments: Vec<&TableDefinition> = fragments.into_iter().collect();
    let mut merged = TableDefinition::new(table_name);

    for fragment in &fragments {
        fragment.validate_local()?;

        if let Some(pk) = &fragment.primary_key {
            match &merged.primary_key {
                Some(existing) if existing != pk => {
                    return Err(ConfigError::ConflictingPrimaryKey {
                        table: table_name.to_string(),
                        first: existing.clone(),
                        second: pk.clone(),
                    });
                }
                Some(_) => {}
                None => merged.primary_key = Some(pk.clone()),
            }
        }

        if let Some(column) = &fragment.inheritance_column {
            match &merged.inheritance_column {
                Some(existing) if existing != column => {
                    return Err(ConfigError::ConflictingInheritanceColumn {
                        table: table_name.to_string(),
                        first: existing.clone(),
                        second: column.clone(),
                    });
                }
                Some(_) => {}
                None => merged.inheritance_column = Some(column.clone()),
            }
        }

        for column in &fragment.columns {
            match merged.get_column(&column.name) {
                Some(existing) if !existing.same_shape(column) => {
                    return Err(ConfigError::ConflictingColumn {
                        table: table_name.to_string(),
                        column: column.name.clone(),
                    });
                }
                Some(_) => {}
                None => merged.columns.push(column.clone()),
            }
        }
    }

    if fragments.len() > 1 && merged.inheritance_column.is_none() {
        merged.inheritance_column = Some(DEFAULT_INHERITANCE_COLUMN.to_string());
    }
    if let Some(discriminator) = merged.inheritance_column.clone() {
        if discriminator != merged.primary_key_name() && merged.get_column(&discriminator).is_none()
        {
            merged
                .columns
                .push(ColumnDefinition::new(discriminator, ColumnType::String).normalized());
        }
    }

    let mut indexes: BTreeMap<String, IndexDefinition> = BTreeMap::new();
    for fragment in &fragments {
        for index in fragment.index_definitions() {
            let name = resolver.resolve_index(table_name, &index);
            match indexes.get(&name) {
                Some(existing) if !existing.same_shape(&index) => {
                    return Err(ConfigError::ConflictingIndex {
                        table: table_name.to_string(),
                        index: name,
                    });
                }
                Some(_) => {}
                None => {
                    let resolved = IndexDefinition {
                        name: Some(name.clone()),
                        ..index
                    };
                    indexes.insert(name, resolved);
                }
            }
        }
    }

    // Column-level index options are now explicit indexes.
    for column in &mut merged.columns {
        column.options.index = false;
        column.options.unique = false;
    }
    merged.indexes = indexes.into_values().collect();

    merged.validate()?;
    Ok(merged)
}

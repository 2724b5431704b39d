//! Schema differ.
//!
//! Compares a declared [`TableDefinition`] with the [`LiveSchema`] read from
//! the database and returns the operations that bring the live table in line
//! with the declaration.

use std::collections::BTreeMap;

use tracing::warn;

use crate::naming::IndexNameResolver;
use crate::operations::{sort_operations, Operation};
use crate::schema::{ColumnDefinition, ColumnType, IndexDefinition, LiveSchema, TableDefinition};

/// Computes DDL operations from a declared and a live schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaDiffer {
    resolver: IndexNameResolver,
}

impl SchemaDiffer {
    /// Creates a differ that names indexes with `resolver`.
    #[must_use]
    pub fn new(resolver: IndexNameResolver) -> Self {
        Self { resolver }
    }

    /// Returns the operations needed to move `live` to `declared`, in apply
    /// order. `None` means the table does not exist yet.
    #[must_use]
    pub fn diff(&self, declared: &TableDefinition, live: Option<&LiveSchema>) -> Vec<Operation> {
        let Some(live) = live else {
            return self.create(declared);
        };

        let mut operations = Vec::new();
        let table = declared.table_name.as_str();
        let declared_pk = declared.primary_key_name();
        let live_pk = live.primary_key.as_deref().unwrap_or(declared_pk);

        if live_pk != declared_pk {
            warn!(
                table,
                live = live_pk,
                declared = declared_pk,
                "Primary key differs from declaration; keeping the live key"
            );
        }
        let is_key = |name: &str| name == declared_pk || name == live_pk;

        // Only the live key is off limits. A declared key the table does not
        // use is diffed like any other column.
        for column in declared.columns.iter().filter(|c| c.name != live_pk) {
            match live.get_column(&column.name) {
                None => operations.push(Operation::add_column(table, column.clone())),
                Some(existing) if !column.same_shape(existing) => operations.push(
                    Operation::change_column(table, column.clone(), existing.clone()),
                ),
                Some(_) => {}
            }
        }
        if live_pk != declared_pk
            && declared.get_column(declared_pk).is_none()
            && live.get_column(declared_pk).is_none()
        {
            operations.push(Operation::add_column(
                table,
                ColumnDefinition::new(declared_pk, ColumnType::Integer),
            ));
        }

        let discriminator = declared.inheritance_column.as_deref();
        for column in &live.columns {
            let name = column.name.as_str();
            if is_key(name) || discriminator == Some(name) {
                continue;
            }
            if declared.get_column(name).is_none() {
                operations.push(Operation::drop_column(table, name));
            }
        }

        let wanted = self.declared_indexes(declared);
        let present: BTreeMap<&str, &IndexDefinition> = live
            .indexes
            .iter()
            .filter_map(|i| i.name.as_deref().map(|name| (name, i)))
            .collect();

        for (name, index) in &present {
            match wanted.get(*name) {
                None => operations.push(Operation::drop_index(table, *name)),
                Some(target) if !target.same_shape(index) => {
                    operations.push(Operation::drop_index(table, *name));
                    operations.push(Operation::add_index(
                        table,
                        *name,
                        target.columns.clone(),
                        target.unique,
                    ));
                }
                Some(_) => {}
            }
        }
        for (name, index) in &wanted {
            if !present.contains_key(name.as_str()) {
                operations.push(Operation::add_index(
                    table,
                    name.clone(),
                    index.columns.clone(),
                    index.unique,
                ));
            }
        }

        sort_operations(&mut operations);
        operations
    }

    /// A missing table is created in one statement with its primary key
    /// inline, followed by its indexes.
    fn create(&self, declared: &TableDefinition) -> Vec<Operation> {
        let pk = declared.primary_key_column();
        let mut columns = vec![pk.clone()];
        columns.extend(
            declared
                .columns
                .iter()
                .filter(|c| c.name != pk.name)
                .cloned(),
        );

        let mut operations = vec![Operation::create_table(
            declared.table_name.clone(),
            columns,
            pk.name,
        )];
        for (name, index) in self.declared_indexes(declared) {
            operations.push(Operation::add_index(
                declared.table_name.clone(),
                name,
                index.columns,
                index.unique,
            ));
        }
        operations
    }

    fn declared_indexes(&self, declared: &TableDefinition) -> BTreeMap<String, IndexDefinition> {
        declared
            .index_definitions()
            .into_iter()
            .map(|index| (self.resolver.resolve_index(&declared.table_name, &index), index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultValue;

    fn differ() -> SchemaDiffer {
        SchemaDiffer::new(IndexNameResolver::new(64))
    }

    fn people(columns: &[&str]) -> TableDefinition {
        TableDefinition::new("people").columns_of(columns.iter().copied(), ColumnType::String)
    }

    fn live_of(declared: &TableDefinition) -> LiveSchema {
        let ops = differ().diff(declared, None);
        let mut live = LiveSchema {
            table_name: declared.table_name.clone(),
            primary_key: None,
            columns: vec![],
            indexes: vec![],
        };
        for op in ops {
            match op {
                Operation::CreateTable {
                    columns,
                    primary_key,
                    ..
                } => {
                    live.columns = columns;
                    live.primary_key = Some(primary_key);
                }
                Operation::AddIndex {
                    name,
                    columns,
                    unique,
                    ..
                } => live.indexes.push(IndexDefinition {
                    name: Some(name),
                    columns,
                    unique,
                }),
                other => panic!("unexpected {other:?}"),
            }
        }
        live
    }

    #[test]
    fn missing_table_is_created_with_inline_primary_key() {
        let declared = people(&["name"]).index(IndexDefinition::on(["name"]));
        let ops = differ().diff(&declared, None);

        assert_eq!(ops.len(), 2);
        match &ops[0] {
            Operation::CreateTable {
                columns,
                primary_key,
                ..
            } => {
                assert_eq!(primary_key, "id");
                assert_eq!(columns[0].name, "id");
                assert_eq!(columns[1].name, "name");
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
        assert!(matches!(&ops[1], Operation::AddIndex { name, .. } if name == "index_people_on_name"));
    }

    #[test]
    fn custom_primary_key_is_not_duplicated() {
        let declared = TableDefinition::new("genders")
            .primary_key("name")
            .column(ColumnDefinition::new("name", ColumnType::String));
        let ops = differ().diff(&declared, None);
        match &ops[0] {
            Operation::CreateTable { columns, primary_key, .. } => {
                assert_eq!(primary_key, "name");
                assert_eq!(columns.len(), 1);
                assert!(!columns[0].options.null);
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_declaration_is_a_noop() {
        let declared = people(&["name", "surname"])
            .column(ColumnDefinition::new("age", ColumnType::Integer).index())
            .index(IndexDefinition::on(["name", "surname"]).unique());
        let live = live_of(&declared);
        assert!(differ().diff(&declared, Some(&live)).is_empty());
    }

    #[test]
    fn added_and_removed_columns() {
        let live = live_of(&people(&["name", "surname"]));
        let ops = differ().diff(&people(&["name", "email"]), Some(&live));

        assert_eq!(
            ops,
            vec![
                Operation::drop_column("people", "surname"),
                Operation::add_column(
                    "people",
                    ColumnDefinition::new("email", ColumnType::String).normalized()
                ),
            ]
        );
    }

    #[test]
    fn changed_type_becomes_change_column() {
        let live = live_of(&people(&["name"]));
        let declared =
            TableDefinition::new("people").column(ColumnDefinition::new("name", ColumnType::Text));
        let ops = differ().diff(&declared, Some(&live));

        assert_eq!(ops.len(), 1);
        match &ops[0] {
            Operation::ChangeColumn { column, from, .. } => {
                assert_eq!(column.column_type, ColumnType::Text);
                assert_eq!(from.column_type, ColumnType::String);
            }
            other => panic!("expected ChangeColumn, got {other:?}"),
        }
    }

    #[test]
    fn changed_default_and_nullability_become_change_column() {
        let live = live_of(&people(&["name"]));
        let declared = TableDefinition::new("people").column(
            ColumnDefinition::new("name", ColumnType::String)
                .not_null()
                .default(DefaultValue::String("anon".to_string())),
        );
        let ops = differ().diff(&declared, Some(&live));
        assert!(matches!(ops.as_slice(), [Operation::ChangeColumn { .. }]));
    }

    #[test]
    fn primary_key_is_never_dropped_or_altered() {
        let live = live_of(&people(&["name"]));
        let declared = people(&["name"])
            .column(ColumnDefinition::new("id", ColumnType::BigInt).not_null());
        assert!(differ().diff(&declared, Some(&live)).is_empty());

        let declared = people(&["name"]).primary_key("name");
        let ops = differ().diff(&declared, Some(&live));
        assert!(ops.iter().all(|op| !matches!(op, Operation::DropColumn { column, .. } if column == "id")));
    }

    #[test]
    fn declared_key_missing_from_live_table_is_added() {
        let live = live_of(&people(&["name"]));
        let declared = people(&["name"])
            .primary_key("code")
            .column(ColumnDefinition::new("code", ColumnType::String));
        let ops = differ().diff(&declared, Some(&live));
        assert_eq!(
            ops,
            vec![Operation::add_column(
                "people",
                ColumnDefinition::new("code", ColumnType::String).normalized()
            )]
        );

        let declared = people(&["name"]).primary_key("serial");
        let ops = differ().diff(&declared, Some(&live));
        assert_eq!(
            ops,
            vec![Operation::add_column(
                "people",
                ColumnDefinition::new("serial", ColumnType::Integer)
            )]
        );

        let mut added = live.clone();
        added
            .columns
            .push(ColumnDefinition::new("serial", ColumnType::Integer));
        assert!(differ().diff(&declared, Some(&added)).is_empty());
    }

    #[test]
    fn discriminator_is_kept_even_when_not_declared() {
        let mut live = live_of(&people(&["name"]));
        live.columns
            .push(ColumnDefinition::new("type", ColumnType::String).normalized());

        let declared = people(&["name"]).inheritance_column("type");
        assert!(differ().diff(&declared, Some(&live)).is_empty());

        let ops = differ().diff(&people(&["name"]), Some(&live));
        assert_eq!(ops, vec![Operation::drop_column("people", "type")]);
    }

    #[test]
    fn index_drop_precedes_column_drop() {
        let live = live_of(
            &people(&["name"]).column(ColumnDefinition::new("nick", ColumnType::String).index()),
        );
        let ops = differ().diff(&people(&["name"]), Some(&live));
        assert_eq!(
            ops,
            vec![
                Operation::drop_index("people", "index_people_on_nick"),
                Operation::drop_column("people", "nick"),
            ]
        );
    }

    #[test]
    fn column_add_precedes_index_add() {
        let live = live_of(&people(&["name"]));
        let declared = people(&["name"])
            .column(ColumnDefinition::new("category", ColumnType::References).index());
        let ops = differ().diff(&declared, Some(&live));
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Operation::AddColumn { column, .. } if column.name == "category_id"));
        assert!(matches!(&ops[1], Operation::AddIndex { name, .. } if name == "index_people_on_category_id"));
    }

    #[test]
    fn uniqueness_change_recreates_index() {
        let live = live_of(&people(&["email"]).index(IndexDefinition::on(["email"])));
        let declared = people(&["email"]).index(IndexDefinition::on(["email"]).unique());
        let ops = differ().diff(&declared, Some(&live));
        assert_eq!(
            ops,
            vec![
                Operation::drop_index("people", "index_people_on_email"),
                Operation::add_index(
                    "people",
                    "index_people_on_email",
                    vec!["email".to_string()],
                    true
                ),
            ]
        );
    }

    #[test]
    fn unknown_live_index_is_dropped() {
        let mut live = live_of(&people(&["name"]));
        live.indexes
            .push(IndexDefinition::on(["name"]).named("legacy_name_idx"));
        let ops = differ().diff(&people(&["name"]), Some(&live));
        assert_eq!(ops, vec![Operation::drop_index("people", "legacy_name_idx")]);
    }
}

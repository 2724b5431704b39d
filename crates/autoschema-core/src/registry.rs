//! Entity registry.
//!
//! The registry is the explicit list of entities the reconciler knows about.
//! Each entity owns one declaration fragment; entities whose fragments name
//! the same table form a table-sharing group.

use std::collections::BTreeSet;

use crate::error::{ConfigError, Result, SchemaError};
use crate::merge::merge;
use crate::naming::IndexNameResolver;
use crate::schema::TableDefinition;

/// An entity bound to a table through its declaration fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Entity name.
    pub name: String,
    /// The entity's own declaration.
    pub definition: TableDefinition,
}

impl EntityDescriptor {
    /// Returns the table this entity is stored in.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.definition.table_name
    }
}

/// All registered entities, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: Vec<EntityDescriptor>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity with its initial declaration.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        definition: TableDefinition,
    ) -> std::result::Result<(), ConfigError> {
        let name = name.into();
        if self.entity(&name).is_some() {
            return Err(ConfigError::DuplicateEntity(name));
        }
        self.entities.push(EntityDescriptor { name, definition });
        Ok(())
    }

    /// Extends an entity's declaration. `f` receives the current fragment and
    /// returns its replacement.
    pub fn declare<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(TableDefinition) -> TableDefinition,
    {
        let entity = self.entity_mut(name)?;
        let table = entity.definition.table_name.clone();
        let current = std::mem::replace(&mut entity.definition, TableDefinition::new(table));
        entity.definition = f(current);
        Ok(())
    }

    /// Replaces an entity's declaration outright.
    pub fn redeclare(&mut self, name: &str, definition: TableDefinition) -> Result<()> {
        self.entity_mut(name)?.definition = definition;
        Ok(())
    }

    /// Clears an entity's declaration so the next one starts from scratch.
    /// The table binding is kept; primary key and discriminator revert to
    /// their defaults.
    pub fn reset_table_definition(&mut self, name: &str) -> Result<()> {
        let entity = self.entity_mut(name)?;
        entity.definition = TableDefinition::new(entity.definition.table_name.clone());
        Ok(())
    }

    /// Returns the entity's own declaration fragment.
    pub fn declared_schema(&self, name: &str) -> Result<&TableDefinition> {
        self.entity(name)
            .map(|e| &e.definition)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Iterates entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    /// Returns the distinct table names, sorted.
    #[must_use]
    pub fn tables(&self) -> BTreeSet<&str> {
        self.entities.iter().map(EntityDescriptor::table_name).collect()
    }

    /// Returns every entity bound to `table`, in registration order.
    #[must_use]
    pub fn group(&self, table: &str) -> Vec<&EntityDescriptor> {
        self.entities
            .iter()
            .filter(|e| e.table_name() == table)
            .collect()
    }

    /// Merges the declarations of every entity sharing `name`'s table.
    pub fn canonical_schema(
        &self,
        name: &str,
        resolver: &IndexNameResolver,
    ) -> Result<TableDefinition> {
        let entity = self
            .entity(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))?;
        let table = entity.table_name();
        let group = self.group(table);
        Ok(merge(table, group.iter().map(|e| &e.definition), resolver)?)
    }

    /// Returns `true` if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    fn entity_mut(&mut self, name: &str) -> Result<&mut EntityDescriptor> {
        self.entities
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDefinition, ColumnType};

    fn pets() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register(
                "Pet",
                TableDefinition::new("pets")
                    .column(ColumnDefinition::new("name", ColumnType::String)),
            )
            .unwrap();
        registry
            .register("Dog", TableDefinition::new("pets"))
            .unwrap();
        registry
            .register("Cat", TableDefinition::new("pets"))
            .unwrap();
        registry
            .register(
                "Person",
                TableDefinition::new("people")
                    .column(ColumnDefinition::new("name", ColumnType::String)),
            )
            .unwrap();
        registry
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = pets();
        assert!(matches!(
            registry.register("Dog", TableDefinition::new("dogs")),
            Err(ConfigError::DuplicateEntity(name)) if name == "Dog"
        ));
    }

    #[test]
    fn groups_follow_registration_order() {
        let registry = pets();
        let names: Vec<&str> = registry
            .group("pets")
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Pet", "Dog", "Cat"]);
        assert_eq!(registry.tables().into_iter().collect::<Vec<_>>(), vec!["people", "pets"]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn declare_appends_to_the_fragment() {
        let mut registry = pets();
        registry
            .declare("Person", |t| {
                t.column(ColumnDefinition::new("surname", ColumnType::String))
            })
            .unwrap();
        let declared = registry.declared_schema("Person").unwrap();
        assert!(declared.get_column("name").is_some());
        assert!(declared.get_column("surname").is_some());
    }

    #[test]
    fn reset_clears_the_fragment_but_keeps_the_table() {
        let mut registry = pets();
        registry.reset_table_definition("Person").unwrap();
        let declared = registry.declared_schema("Person").unwrap();
        assert_eq!(declared.table_name, "people");
        assert!(declared.columns.is_empty());
    }

    #[test]
    fn sibling_declarations_are_visible_through_the_canonical_schema() {
        let mut registry = pets();
        let resolver = IndexNameResolver::default();
        registry
            .declare("Dog", |t| t.column(ColumnDefinition::new("bau", ColumnType::String)))
            .unwrap();

        let cat = registry.canonical_schema("Cat", &resolver).unwrap();
        let dog = registry.canonical_schema("Dog", &resolver).unwrap();
        assert_eq!(cat, dog);
        assert!(cat.get_column("bau").is_some());
        assert!(cat.get_column("type").is_some());
        assert!(registry.declared_schema("Cat").unwrap().columns.is_empty());
    }

    #[test]
    fn unknown_entity_is_reported() {
        let mut registry = pets();
        assert!(matches!(
            registry.declared_schema("Ghost"),
            Err(SchemaError::UnknownEntity(_))
        ));
        assert!(registry.reset_table_definition("Ghost").is_err());
    }
}

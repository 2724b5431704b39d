//! Upgrade orchestration.
//!
//! [`Reconciler::auto_upgrade`] merges an entity's table group, inspects the
//! live table, diffs, applies the operations one by one and re-reads the
//! table. Nothing is cached between invocations: every call starts from the
//! live schema, so calling it again is always safe and, once the table
//! matches, does nothing.

use tracing::{debug, info, warn};

use crate::diff::SchemaDiffer;
use crate::driver::SchemaDriver;
use crate::error::{DriverError, DriverErrorKind, Result, SchemaError};
use crate::naming::IndexNameResolver;
use crate::operations::Operation;
use crate::registry::SchemaRegistry;
use crate::schema::{LiveSchema, TableDefinition};

/// Reconciler settings.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Overrides the driver's identifier limit for index names.
    pub max_identifier_length: Option<usize>,
}

impl ReconcileOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier limit used for index names.
    #[must_use]
    pub fn with_max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = Some(length);
        self
    }
}

/// Outcome of reconciling one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Entity that was reconciled.
    pub entity: String,
    /// Table it is stored in.
    pub table: String,
    /// Whether the table was created by this run.
    pub created: bool,
    /// Operations applied, in order.
    pub operations: Vec<Operation>,
    /// The table as re-read after applying.
    pub live: LiveSchema,
}

impl ReconcileReport {
    /// Returns `true` if nothing had to change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Brings live tables in line with registered declarations.
#[derive(Debug)]
pub struct Reconciler<D> {
    driver: D,
    options: ReconcileOptions,
}

impl<D: SchemaDriver> Reconciler<D> {
    /// Creates a reconciler with default options.
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, ReconcileOptions::default())
    }

    /// Creates a reconciler with custom options.
    pub fn with_options(driver: D, options: ReconcileOptions) -> Self {
        Self { driver, options }
    }

    /// Returns the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the index name resolver for this driver.
    pub fn resolver(&self) -> IndexNameResolver {
        IndexNameResolver::new(
            self.options
                .max_identifier_length
                .unwrap_or_else(|| self.driver.max_identifier_length()),
        )
    }

    /// Returns the entity's own declaration fragment.
    pub fn declared_schema<'r>(
        &self,
        registry: &'r SchemaRegistry,
        entity: &str,
    ) -> Result<&'r TableDefinition> {
        registry.declared_schema(entity)
    }

    /// Returns the merged declaration of the entity's table group.
    pub fn canonical_schema(
        &self,
        registry: &SchemaRegistry,
        entity: &str,
    ) -> Result<TableDefinition> {
        registry.canonical_schema(entity, &self.resolver())
    }

    /// Computes the operations `auto_upgrade` would apply, without applying
    /// them.
    pub async fn plan(&self, registry: &SchemaRegistry, entity: &str) -> Result<Vec<Operation>> {
        let declared = self.canonical_schema(registry, entity)?;
        let live = self.live_schema(&declared.table_name).await?;
        Ok(SchemaDiffer::new(self.resolver()).diff(&declared, live.as_ref()))
    }

    /// Reconciles one entity's table.
    ///
    /// Stops at the first failing operation and returns it; operations
    /// already applied stay applied. A later call diffs against whatever the
    /// table looks like then and applies only what is still missing.
    pub async fn auto_upgrade(
        &self,
        registry: &SchemaRegistry,
        entity: &str,
    ) -> Result<ReconcileReport> {
        let declared = self.canonical_schema(registry, entity)?;
        let table = declared.table_name.clone();

        let live = self.live_schema(&table).await?;
        let created = live.is_none();
        let operations = SchemaDiffer::new(self.resolver()).diff(&declared, live.as_ref());

        info!(
            entity,
            table = %table,
            operations = operations.len(),
            "Reconciling schema"
        );

        for operation in &operations {
            debug!(%operation, "Applying operation");
            if let Err(source) = self.driver.apply(operation).await {
                warn!(
                    entity,
                    %operation,
                    error = %source,
                    "Operation failed, aborting reconciliation"
                );
                return Err(SchemaError::Apply {
                    operation: Box::new(operation.clone()),
                    source,
                });
            }
        }

        let live = self
            .live_schema(&table)
            .await?
            .ok_or_else(|| SchemaError::Inspect {
                table: table.clone(),
                source: DriverError::new(
                    DriverErrorKind::Other,
                    "table is missing after reconciliation",
                ),
            })?;

        if operations.is_empty() {
            debug!(entity, table = %table, "Schema already up to date");
        } else {
            info!(entity, table = %table, "Schema reconciled");
        }

        Ok(ReconcileReport {
            entity: entity.to_string(),
            table,
            created,
            operations,
            live,
        })
    }

    /// Reconciles every registered entity, one at a time in registration
    /// order. A failing entity does not stop the others.
    pub async fn auto_upgrade_all(
        &self,
        registry: &SchemaRegistry,
    ) -> Vec<(String, Result<ReconcileReport>)> {
        let mut results = Vec::with_capacity(registry.len());
        for entity in registry.entities() {
            let result = self.auto_upgrade(registry, &entity.name).await;
            results.push((entity.name.clone(), result));
        }
        results
    }

    /// Reads a fresh snapshot of a table.
    pub async fn live_schema(&self, table: &str) -> Result<Option<LiveSchema>> {
        self.driver
            .inspect(table)
            .await
            .map_err(|source| SchemaError::Inspect {
                table: table.to_string(),
                source,
            })
    }

    /// Returns the table's column names in table order; empty if the table
    /// does not exist.
    pub async fn live_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .live_schema(table)
            .await?
            .map(|live| live.column_names())
            .unwrap_or_default())
    }

    /// Returns the table's index names, sorted; empty if the table does not
    /// exist.
    pub async fn live_indexes(&self, table: &str) -> Result<Vec<String>> {
        Ok(self
            .live_schema(table)
            .await?
            .map(|live| live.index_names())
            .unwrap_or_default())
    }
}

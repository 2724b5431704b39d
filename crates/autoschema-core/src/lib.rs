//! Declarative schema reconciliation for Rust.
//!
//! `autoschema-core` keeps a database table in line with the columns, primary
//! key and indexes declared for it in code. There is no migration history:
//! each reconciliation reads the live table, diffs it against the declaration
//! and applies the minimal set of DDL operations.
//!
//! # Architecture
//!
//! - **Schema** - Declared ([`TableDefinition`](schema::TableDefinition)) and
//!   introspected ([`LiveSchema`](schema::LiveSchema)) table shapes
//! - **Registry** - Entities and the tables they are stored in
//! - **Merge** - Folds the declarations of entities sharing a table
//! - **Diff** - Computes ordered operations from declared vs live schema
//! - **Driver** - The database capability a backend implements
//! - **Reconciler** - Inspects, diffs and applies, one entity at a time
//!
//! # Example
//!
//! ```rust,ignore
//! use autoschema_core::prelude::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(
//!     "Person",
//!     TableDefinition::new("people")
//!         .columns_of(["name", "surname"], ColumnType::String)
//!         .column(ColumnDefinition::new("email", ColumnType::String).unique())
//!         .timestamps(),
//! )?;
//!
//! let reconciler = Reconciler::new(driver);
//! let report = reconciler.auto_upgrade(&registry, "Person").await?;
//! for operation in &report.operations {
//!     println!("{operation}");
//! }
//! ```

pub mod diff;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod naming;
pub mod operations;
pub mod reconciler;
pub mod registry;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::diff::SchemaDiffer;
    pub use crate::driver::SchemaDriver;
    pub use crate::error::{
        ConfigError, DriverError, DriverErrorKind, Result, SchemaError,
    };
    pub use crate::manifest::Manifest;
    pub use crate::merge::merge;
    pub use crate::naming::IndexNameResolver;
    pub use crate::operations::Operation;
    pub use crate::reconciler::{ReconcileOptions, ReconcileReport, Reconciler};
    pub use crate::registry::{EntityDescriptor, SchemaRegistry};
    pub use crate::schema::{
        ColumnDefinition, ColumnOptions, ColumnType, DefaultValue, IndexDefinition, LiveSchema,
        TableDefinition,
    };
}

//! Error types for schema reconciliation.

use std::error::Error as StdError;
use std::fmt;

use crate::operations::Operation;
use crate::schema::ColumnType;

/// A declaration is structurally invalid.
///
/// Detected before any driver call, so the database is never touched when one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One fragment declared two different primary keys.
    #[error("table '{table}' declares two primary keys: '{first}' and '{second}'")]
    DuplicatePrimaryKey {
        /// Table name.
        table: String,
        /// The primary key declared first.
        first: String,
        /// The conflicting later declaration.
        second: String,
    },

    /// One fragment declared the same column twice with different options.
    #[error("column '{column}' on table '{table}' is declared twice with different options")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// An option was used on a column type it does not apply to.
    #[error("option '{option}' is not valid for {column_type} column '{column}' on table '{table}'")]
    InvalidOption {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Offending option.
        option: &'static str,
        /// Declared column type.
        column_type: ColumnType,
    },

    /// An index was declared without columns.
    #[error("an index on table '{table}' has no columns")]
    EmptyIndex {
        /// Table name.
        table: String,
    },

    /// An index names a column that is not declared.
    #[error("index '{index}' on table '{table}' references undeclared column '{column}'")]
    UnknownIndexColumn {
        /// Table name.
        table: String,
        /// Resolved index name.
        index: String,
        /// The missing column.
        column: String,
    },

    /// Entities sharing a table declare one column with different options.
    #[error("entities sharing table '{table}' declare column '{column}' with different options")]
    ConflictingColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Entities sharing a table declare different primary keys.
    #[error("entities sharing table '{table}' declare different primary keys: '{first}' and '{second}'")]
    ConflictingPrimaryKey {
        /// Table name.
        table: String,
        /// First primary key seen.
        first: String,
        /// Conflicting primary key.
        second: String,
    },

    /// Entities sharing a table declare different discriminator columns.
    #[error("entities sharing table '{table}' declare different inheritance columns: '{first}' and '{second}'")]
    ConflictingInheritanceColumn {
        /// Table name.
        table: String,
        /// First discriminator seen.
        first: String,
        /// Conflicting discriminator.
        second: String,
    },

    /// Two index declarations resolve to one name but differ in shape.
    #[error("index '{index}' on table '{table}' is declared twice with different definitions")]
    ConflictingIndex {
        /// Table name.
        table: String,
        /// Resolved index name.
        index: String,
    },

    /// An entity name was registered twice.
    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),

    /// The declaration manifest could not be parsed.
    #[error("invalid schema manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Broad classification of a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// A uniqueness or other integrity constraint rejected the statement.
    ConstraintViolation,
    /// Anything else: connectivity, syntax, permissions.
    Other,
}

/// A failure reported by the database driver.
#[derive(Debug)]
pub struct DriverError {
    kind: DriverErrorKind,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl DriverError {
    /// Creates a driver error without an underlying cause.
    #[must_use]
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a driver-level error.
    #[must_use]
    pub fn from_source(
        kind: DriverErrorKind,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error classification.
    #[must_use]
    pub fn kind(&self) -> DriverErrorKind {
        self.kind
    }

    /// Returns `true` for constraint violations.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        self.kind == DriverErrorKind::ConstraintViolation
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DriverError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Errors surfaced by the reconciliation entry points.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The declaration is invalid; nothing was sent to the database.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Reading the live schema failed.
    #[error("failed to inspect table '{table}': {source}")]
    Inspect {
        /// Table being inspected.
        table: String,
        /// Driver failure.
        #[source]
        source: DriverError,
    },

    /// Applying a DDL operation failed. Later operations were not attempted.
    #[error("failed to apply `{operation}`: {source}")]
    Apply {
        /// The operation that failed.
        operation: Box<Operation>,
        /// Driver failure.
        #[source]
        source: DriverError,
    },

    /// The entity is not registered.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),
}

impl SchemaError {
    /// Returns the driver error, if this failure came from the driver.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Inspect { source, .. } | Self::Apply { source, .. } => Some(source),
            Self::Configuration(_) | Self::UnknownEntity(_) => None,
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

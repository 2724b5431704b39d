//! # autoschema-sqlite
//!
//! SQLite driver for `autoschema-core`.
//!
//! # How SQLite is handled
//!
//! - **Introspection**: tables come from `sqlite_master`, columns from
//!   [`PRAGMA table_info`], indexes from [`PRAGMA index_list`] and
//!   [`PRAGMA index_info`]. Only indexes created with `CREATE INDEX` are
//!   reported; the ones SQLite builds for primary keys are not.
//! - **Primary keys**: always inline in `CREATE TABLE`. An integer key is
//!   declared `PRIMARY KEY AUTOINCREMENT` so it aliases the rowid.
//! - **Limited [ALTER TABLE]**: columns are added and dropped in place
//!   (`DROP COLUMN` needs SQLite 3.35.0). Changing a column rebuilds the
//!   table inside one transaction.
//!
//! [`PRAGMA table_info`]: https://www.sqlite.org/pragma.html#pragma_table_info
//! [`PRAGMA index_list`]: https://www.sqlite.org/pragma.html#pragma_index_list
//! [`PRAGMA index_info`]: https://www.sqlite.org/pragma.html#pragma_index_info
//! [ALTER TABLE]: https://www.sqlite.org/lang_altertable.html
//!
//! ## Example
//!
//! ```rust,ignore
//! use autoschema_core::prelude::*;
//! use autoschema_sqlite::SqliteDriver;
//!
//! let driver = SqliteDriver::connect("sqlite:app.db").await?;
//! let reconciler = Reconciler::new(driver);
//! reconciler.auto_upgrade(&registry, "Person").await?;
//! ```

pub mod dialect;
pub mod driver;
mod introspect;

pub use dialect::SqliteDialect;
pub use driver::{to_driver_error, SqliteDriver, DEFAULT_MAX_IDENTIFIER_LENGTH};

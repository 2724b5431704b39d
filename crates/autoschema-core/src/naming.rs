//! Deterministic index naming.
//!
//! Index names follow the `index_<table>_on_<a>_and_<b>` convention. Names
//! longer than the backend's identifier limit are cut and suffixed with a
//! short SHA-256 digest of the full name, so the same declaration always maps
//! to the same identifier and distinct indexes keep distinct names.

use sha2::{Digest, Sha256};

use crate::schema::IndexDefinition;

/// Identifier limit used when a backend does not report one (PostgreSQL).
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 63;

/// Hex digits of the digest kept in truncated names.
const HASH_LEN: usize = 10;

/// Derives canonical, length-bounded index names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexNameResolver {
    max_length: usize,
}

impl Default for IndexNameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDENTIFIER_LENGTH)
    }
}

impl IndexNameResolver {
    /// Creates a resolver for a backend with the given identifier limit in
    /// bytes.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Returns the identifier limit.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns the untruncated conventional name.
    #[must_use]
    pub fn canonical<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
        let columns: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        format!("index_{}_on_{}", table, columns.join("_and_"))
    }

    /// Resolves the name for an index over `columns`. An explicit name is
    /// returned verbatim.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        explicit: Option<&str>,
    ) -> String {
        if let Some(name) = explicit {
            return name.to_string();
        }
        let full = Self::canonical(table, columns);
        if full.len() <= self.max_length {
            return full;
        }
        self.shorten(&full)
    }

    /// Resolves the name of a declared index on `table`.
    #[must_use]
    pub fn resolve_index(&self, table: &str, index: &IndexDefinition) -> String {
        self.resolve(table, &index.columns, index.name.as_deref())
    }

    fn shorten(&self, full: &str) -> String {
        let digest = format!("{:x}", Sha256::digest(full.as_bytes()));
        let hash = &digest[..HASH_LEN];

        if self.max_length <= HASH_LEN + 1 {
            return hash[..self.max_length.min(HASH_LEN)].to_string();
        }

        let prefix = truncate_at_char_boundary(full, self.max_length - HASH_LEN - 1);
        format!("{}_{}", prefix.trim_end_matches('_'), hash)
    }
}

/// Returns the longest prefix of `s` that is at most `max` bytes and ends on
/// a character boundary.
fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

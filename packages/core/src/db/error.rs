//! Store Error Types
//!
//! This module defines error types for the tree repository contract,
//! covering transaction misuse and the uniqueness constraints the schema
//! carries (`path` unique, `(slug, depth)` unique).

use thiserror::Error;

/// Repository operation errors
///
/// Raised by [`TreeStore`](crate::db::TreeStore) implementations. Service
/// code treats these as transactional failures: the enclosing transaction is
/// rolled back and the error is propagated with operation context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A row with this materialized path already exists
    #[error("Duplicate path: {path:?}")]
    DuplicatePath { path: String },

    /// The `(slug, depth)` unique index rejected the row
    #[error("Duplicate slug {slug:?} at depth {depth}")]
    DuplicateSlug { slug: String, depth: u32 },

    /// A transaction is already open and was not passed in for reuse
    #[error("A transaction is already open; structural mutations must be serialized")]
    TransactionBusy,

    /// The supplied handle does not match the open transaction
    #[error("Stale or unknown transaction handle")]
    StaleTransaction,

    /// Write attempted outside any transaction
    #[error("Operation requires an open transaction")]
    NoTransaction,

    /// Backend-specific failure (connection loss, constraint we do not model)
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a duplicate path error
    pub fn duplicate_path(path: impl Into<String>) -> Self {
        Self::DuplicatePath { path: path.into() }
    }

    /// Create a duplicate slug error
    pub fn duplicate_slug(slug: impl Into<String>, depth: u32) -> Self {
        Self::DuplicateSlug {
            slug: slug.into(),
            depth,
        }
    }

    /// Create a backend error with context
    pub fn backend(context: impl Into<String>) -> Self {
        Self::Backend(context.into())
    }
}

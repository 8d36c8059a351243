//! Service Layer Error Types
//!
//! This module defines error types for tree operations. Precondition
//! violations carry the operation name and the offending path or id so
//! callers can log or display them without extra lookups; none of these are
//! retried by this crate; retry is caller policy.

use crate::db::StoreError;
use crate::models::ValidationError;
use crate::path::PathError;
use thiserror::Error;

/// Tree operation errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// Node not found by primary key
    #[error("Node not found: {pk}")]
    NotFound { pk: i64 },

    /// Input validation failed (blank title, bad slug)
    #[error("Node validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Path arithmetic failed (overflow, malformed path)
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Repository operation failed
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// Operation requires a persisted node but the path is empty
    #[error("{op}: node has no path (not yet persisted?)")]
    EmptyPath { op: &'static str },

    /// Operation requires an unsaved node but a path is already set
    #[error("{op}: node already has path {path:?}")]
    PathAlreadySet { op: &'static str, path: String },

    /// Operation is not defined for root nodes
    #[error("{op}: not allowed on a root node")]
    RootForbidden { op: &'static str },

    /// Moving a node into its own subtree
    #[error("Cannot move node {node:?} under its own descendant {target:?}")]
    CyclicMove { node: String, target: String },

    /// Moving a node under itself
    #[error("Cannot move node {pk} under itself")]
    SelfMove { pk: i64 },

    /// A before-delete observer refused the deletion
    #[error("Delete of node {pk} vetoed: {reason}")]
    DeleteVetoed { pk: i64, reason: String },

    /// An ancestor row implied by a path is missing from the store
    #[error("Missing ancestor row for path {path:?}")]
    MissingAncestor { path: String },

    /// A specific object references a content type with no registered store
    #[error("No specific store registered for content type {content_type:?}")]
    UnregisteredContentType { content_type: String },

    /// A structural update matched zero rows (the expected row vanished)
    #[error("{op}: no rows changed")]
    NoChanges { op: &'static str },
}

impl TreeServiceError {
    /// Create a not-found error
    pub fn not_found(pk: i64) -> Self {
        Self::NotFound { pk }
    }

    /// Create an empty-path precondition error
    pub fn empty_path(op: &'static str) -> Self {
        Self::EmptyPath { op }
    }

    /// Create a path-already-set precondition error
    pub fn path_already_set(op: &'static str, path: impl Into<String>) -> Self {
        Self::PathAlreadySet {
            op,
            path: path.into(),
        }
    }

    /// Create a cyclic-move error
    pub fn cyclic_move(node: impl Into<String>, target: impl Into<String>) -> Self {
        Self::CyclicMove {
            node: node.into(),
            target: target.into(),
        }
    }

    /// Create a delete-vetoed error
    pub fn delete_vetoed(pk: i64, reason: impl Into<String>) -> Self {
        Self::DeleteVetoed {
            pk,
            reason: reason.into(),
        }
    }

    /// Create a no-changes error
    pub fn no_changes(op: &'static str) -> Self {
        Self::NoChanges { op }
    }
}

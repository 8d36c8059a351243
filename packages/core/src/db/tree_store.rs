//! TreeStore Trait - Repository Abstraction Layer
//!
//! This module defines the `TreeStore` trait that abstracts row access for
//! the page tree. The tree logic (mutator, reader, rebuilder, resolver)
//! never generates SQL and never sees a connection: it speaks in
//! [`NodeFilter`] predicates and [`UpdateSet`] change sets, and the adapter
//! behind this trait turns them into whatever the backing store executes.
//!
//! # Transactions
//!
//! Transactions are explicit, reentrant handles. An operation calls
//! [`TreeStore::begin_or_reuse`] with the handle it was given (if any): when
//! a caller already holds an open transaction the same handle comes back
//! with `is_new == false` and the inner operation must neither commit nor
//! roll back; the outer owner does, exactly once. There is no ambient or
//! context-keyed transaction state.
//!
//! # Cancellation
//!
//! Dropping an operation future abandons it before its final commit;
//! uncommitted transaction state is discarded by rollback or by the next
//! owner-level cleanup, so a cancelled mutation is never partially visible.

use async_trait::async_trait;

use crate::db::{NodeFilter, NodeQuery, StoreError, UpdateSet};
use crate::models::{Field, PageNode};

/// Opaque, cloneable handle to an open store transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHandle(pub(crate) u64);

/// Abstraction layer for page-tree persistence.
///
/// Implementations must be `Send + Sync`; services hold them behind
/// `Arc<dyn TreeStore>` and may be used from any task.
///
/// Reads accept an optional transaction handle (pass `None` for a plain
/// read); writes require one. `update`, `bulk_update` and `delete` return
/// the number of rows affected; mapping "zero rows where one was expected"
/// to an error is service-layer policy, because for some statements
/// (URL-path propagation below a leaf) zero is a perfectly good answer.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Open a new transaction, or join `tx` if the caller already owns one.
    ///
    /// Returns the handle plus `is_new`; only the caller that received
    /// `is_new == true` may commit or roll back.
    async fn begin_or_reuse(&self, tx: Option<&TxHandle>) -> Result<(TxHandle, bool), StoreError>;

    /// Commit an owned transaction.
    async fn commit(&self, tx: TxHandle) -> Result<(), StoreError>;

    /// Roll back an owned transaction, discarding every write made under it.
    async fn rollback(&self, tx: TxHandle) -> Result<(), StoreError>;

    /// Point lookup by primary key. `Ok(None)` when the row does not exist.
    async fn get(&self, tx: Option<&TxHandle>, pk: i64) -> Result<Option<PageNode>, StoreError>;

    /// Filtered, ordered, paginated read.
    async fn select(
        &self,
        tx: Option<&TxHandle>,
        query: NodeQuery,
    ) -> Result<Vec<PageNode>, StoreError>;

    /// Count rows matching a filter.
    async fn count(&self, tx: Option<&TxHandle>, filter: NodeFilter) -> Result<u64, StoreError>;

    /// Insert a row, assigning its primary key. Returns the stored row.
    async fn insert(&self, tx: &TxHandle, node: PageNode) -> Result<PageNode, StoreError>;

    /// Apply a change set to every row matching the filter.
    async fn update(
        &self,
        tx: &TxHandle,
        filter: NodeFilter,
        set: UpdateSet,
    ) -> Result<u64, StoreError>;

    /// Write the named columns of each given node back to its row by pk.
    ///
    /// Rows without a matching pk are skipped, not errors; the returned
    /// count says how many were written.
    async fn bulk_update(
        &self,
        tx: &TxHandle,
        nodes: &[PageNode],
        fields: &[Field],
    ) -> Result<u64, StoreError>;

    /// Delete every row matching the filter, returning the count.
    async fn delete(&self, tx: &TxHandle, filter: NodeFilter) -> Result<u64, StoreError>;
}

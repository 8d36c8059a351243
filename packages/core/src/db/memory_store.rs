//! In-Memory Store Adapter
//!
//! Reference implementation of [`TreeStore`] over a `BTreeMap`, used by the
//! test suite and as the executable specification of the repository
//! contract. It enforces the same uniqueness the production schema carries
//! (`path` unique, `(slug, depth)` unique) and implements the reentrant
//! transaction handle with snapshot-on-begin / restore-on-rollback.
//!
//! One open transaction at a time: structural mutations are caller-
//! serialized (see the concurrency notes on [`TreeStore`]), so a second
//! `begin_or_reuse(None)` while a transaction is open reports
//! [`StoreError::TransactionBusy`] instead of silently interleaving.

use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use crate::db::{NodeFilter, NodeQuery, StoreError, TreeStore, TxHandle, UpdateSet};
use crate::models::{Field, FieldValue, PageNode, StatusFlags, FIELDS};

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<i64, PageNode>,
    next_pk: i64,
    next_tx: u64,
    open: Option<OpenTx>,
}

#[derive(Debug)]
struct OpenTx {
    id: u64,
    snapshot: BTreeMap<i64, PageNode>,
}

/// In-memory [`TreeStore`] adapter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed rows directly, bypassing the transactional path. Test helper for
    /// constructing deliberately inconsistent trees (fix_tree input).
    pub fn seed(&self, nodes: Vec<PageNode>) {
        let mut inner = self.lock();
        for mut node in nodes {
            if node.pk == 0 {
                inner.next_pk += 1;
                node.pk = inner.next_pk;
            } else {
                inner.next_pk = inner.next_pk.max(node.pk);
            }
            inner.rows.insert(node.pk, node);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Mutex poisoning only happens if a previous caller panicked while
        // holding the lock; tests want the panic, not a deadlock.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn check_write_tx(&self, tx: &TxHandle) -> Result<(), StoreError> {
        match &self.open {
            Some(open) if open.id == tx.0 => Ok(()),
            Some(_) => Err(StoreError::StaleTransaction),
            None => Err(StoreError::NoTransaction),
        }
    }

    fn check_read_tx(&self, tx: Option<&TxHandle>) -> Result<(), StoreError> {
        match (tx, &self.open) {
            (Some(handle), Some(open)) if open.id != handle.0 => {
                Err(StoreError::StaleTransaction)
            }
            (Some(_), None) => Err(StoreError::StaleTransaction),
            _ => Ok(()),
        }
    }

    /// Re-check the unique indexes over the full row set.
    fn check_unique(&self) -> Result<(), StoreError> {
        let mut paths: HashSet<&str> = HashSet::with_capacity(self.rows.len());
        let mut slugs: HashSet<(&str, u32)> = HashSet::with_capacity(self.rows.len());
        for node in self.rows.values() {
            if !paths.insert(&node.path) {
                return Err(StoreError::duplicate_path(&node.path));
            }
            if !slugs.insert((&node.slug, node.depth)) {
                return Err(StoreError::duplicate_slug(&node.slug, node.depth));
            }
        }
        Ok(())
    }
}

/// Copy one named column from `src` into `dst`, going through the
/// compile-time descriptor table.
fn write_field(dst: &mut PageNode, src: &PageNode, field: Field) {
    let descriptor = match FIELDS.iter().find(|d| d.field == field) {
        Some(d) => d,
        None => return,
    };
    match (field, (descriptor.get)(src)) {
        (Field::Title, FieldValue::Str(v)) => dst.title = v,
        (Field::Slug, FieldValue::Str(v)) => dst.slug = v,
        (Field::Path, FieldValue::Str(v)) => dst.path = v,
        (Field::Depth, FieldValue::Int(v)) => dst.depth = v as u32,
        (Field::Numchild, FieldValue::Int(v)) => dst.numchild = v as u32,
        (Field::UrlPath, FieldValue::Str(v)) => dst.url_path = v,
        (Field::Status, FieldValue::Int(v)) => dst.status = StatusFlags(v as u32),
        (Field::PageId, FieldValue::OptInt(v)) => dst.page_id = v,
        (Field::ContentType, FieldValue::OptStr(v)) => dst.content_type = v,
        (Field::LatestRevisionId, FieldValue::OptInt(v)) => dst.latest_revision_id = v,
        (Field::UpdatedAt, FieldValue::Time(v)) => dst.updated_at = v,
        _ => {}
    }
}

fn cmp_field(a: &PageNode, b: &PageNode, field: Field) -> Ordering {
    match field {
        Field::Title => a.title.cmp(&b.title),
        Field::Slug => a.slug.cmp(&b.slug),
        Field::Path => a.path.cmp(&b.path),
        Field::Depth => a.depth.cmp(&b.depth),
        Field::Numchild => a.numchild.cmp(&b.numchild),
        Field::UrlPath => a.url_path.cmp(&b.url_path),
        Field::Status => a.status.0.cmp(&b.status.0),
        Field::PageId => a.page_id.cmp(&b.page_id),
        Field::ContentType => a.content_type.cmp(&b.content_type),
        Field::LatestRevisionId => a.latest_revision_id.cmp(&b.latest_revision_id),
        Field::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl TreeStore for MemoryStore {
    async fn begin_or_reuse(&self, tx: Option<&TxHandle>) -> Result<(TxHandle, bool), StoreError> {
        let mut inner = self.lock();
        match (tx, &inner.open) {
            (Some(handle), Some(open)) if open.id == handle.0 => Ok((handle.clone(), false)),
            (Some(_), _) => Err(StoreError::StaleTransaction),
            (None, Some(_)) => Err(StoreError::TransactionBusy),
            (None, None) => {
                inner.next_tx += 1;
                let id = inner.next_tx;
                let snapshot = inner.rows.clone();
                inner.open = Some(OpenTx { id, snapshot });
                Ok((TxHandle(id), true))
            }
        }
    }

    async fn commit(&self, tx: TxHandle) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.open.take() {
            Some(open) if open.id == tx.0 => Ok(()),
            Some(open) => {
                inner.open = Some(open);
                Err(StoreError::StaleTransaction)
            }
            None => Err(StoreError::StaleTransaction),
        }
    }

    async fn rollback(&self, tx: TxHandle) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.open.take() {
            Some(open) if open.id == tx.0 => {
                inner.rows = open.snapshot;
                Ok(())
            }
            Some(open) => {
                inner.open = Some(open);
                Err(StoreError::StaleTransaction)
            }
            None => Err(StoreError::StaleTransaction),
        }
    }

    async fn get(&self, tx: Option<&TxHandle>, pk: i64) -> Result<Option<PageNode>, StoreError> {
        let inner = self.lock();
        inner.check_read_tx(tx)?;
        Ok(inner.rows.get(&pk).cloned())
    }

    async fn select(
        &self,
        tx: Option<&TxHandle>,
        query: NodeQuery,
    ) -> Result<Vec<PageNode>, StoreError> {
        let inner = self.lock();
        inner.check_read_tx(tx)?;
        let mut rows: Vec<PageNode> = inner
            .rows
            .values()
            .filter(|n| query.filter.matches(n))
            .cloned()
            .collect();
        if query.order_by.is_empty() {
            rows.sort_by(|a, b| a.path.cmp(&b.path));
        } else {
            rows.sort_by(|a, b| {
                for order in &query.order_by {
                    let ord = cmp_field(a, b, order.field);
                    let ord = if order.descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.path.cmp(&b.path)
            });
        }
        let offset = query.offset.unwrap_or(0);
        let rows: Vec<PageNode> = match query.limit {
            Some(limit) => rows.into_iter().skip(offset).take(limit).collect(),
            None => rows.into_iter().skip(offset).collect(),
        };
        Ok(rows)
    }

    async fn count(&self, tx: Option<&TxHandle>, filter: NodeFilter) -> Result<u64, StoreError> {
        let inner = self.lock();
        inner.check_read_tx(tx)?;
        Ok(inner.rows.values().filter(|n| filter.matches(n)).count() as u64)
    }

    async fn insert(&self, tx: &TxHandle, mut node: PageNode) -> Result<PageNode, StoreError> {
        let mut inner = self.lock();
        inner.check_write_tx(tx)?;
        if node.pk == 0 {
            inner.next_pk += 1;
            node.pk = inner.next_pk;
        } else if inner.rows.contains_key(&node.pk) {
            return Err(StoreError::backend(format!(
                "primary key {} already exists",
                node.pk
            )));
        }
        let pk = node.pk;
        inner.rows.insert(pk, node.clone());
        if let Err(e) = inner.check_unique() {
            inner.rows.remove(&pk);
            return Err(e);
        }
        Ok(node)
    }

    async fn update(
        &self,
        tx: &TxHandle,
        filter: NodeFilter,
        set: UpdateSet,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.check_write_tx(tx)?;
        let matched: Vec<i64> = inner
            .rows
            .values()
            .filter(|n| filter.matches(n))
            .map(|n| n.pk)
            .collect();
        // Apply on a copy first so a uniqueness violation leaves rows intact
        // within the statement, like a real constraint would.
        let mut changed: HashMap<i64, PageNode> = HashMap::with_capacity(matched.len());
        for pk in &matched {
            let mut row = inner.rows[pk].clone();
            set.apply(&mut row);
            changed.insert(*pk, row);
        }
        let saved: Vec<(i64, PageNode)> = matched
            .iter()
            .map(|pk| (*pk, inner.rows[pk].clone()))
            .collect();
        for (pk, row) in &changed {
            inner.rows.insert(*pk, row.clone());
        }
        if let Err(e) = inner.check_unique() {
            for (pk, row) in saved {
                inner.rows.insert(pk, row);
            }
            return Err(e);
        }
        Ok(matched.len() as u64)
    }

    async fn bulk_update(
        &self,
        tx: &TxHandle,
        nodes: &[PageNode],
        fields: &[Field],
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.check_write_tx(tx)?;
        let mut written = 0u64;
        let saved = inner.rows.clone();
        for node in nodes {
            if let Some(mut row) = inner.rows.get(&node.pk).cloned() {
                for field in fields {
                    write_field(&mut row, node, *field);
                }
                inner.rows.insert(node.pk, row);
                written += 1;
            }
        }
        if let Err(e) = inner.check_unique() {
            inner.rows = saved;
            return Err(e);
        }
        Ok(written)
    }

    async fn delete(&self, tx: &TxHandle, filter: NodeFilter) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        inner.check_write_tx(tx)?;
        let doomed: Vec<i64> = inner
            .rows
            .values()
            .filter(|n| filter.matches(n))
            .map(|n| n.pk)
            .collect();
        for pk in &doomed {
            inner.rows.remove(pk);
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NodeOrder;

    fn node(title: &str, path: &str, depth: u32) -> PageNode {
        let mut n = PageNode::new(title);
        n.path = path.to_string();
        n.depth = depth;
        n
    }

    #[tokio::test]
    async fn test_insert_assigns_pk_and_select_orders_by_path() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();

        let b = store.insert(&tx, node("B", "002", 0)).await.unwrap();
        let a = store.insert(&tx, node("A", "001", 0)).await.unwrap();
        assert!(a.pk > 0 && b.pk > 0 && a.pk != b.pk);
        store.commit(tx).await.unwrap();

        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        let titles: Vec<&str> = rows.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_rollback_restores_snapshot() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        store.insert(&tx, node("A", "001", 0)).await.unwrap();
        store.commit(tx).await.unwrap();

        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        store.insert(&tx, node("B", "002", 0)).await.unwrap();
        store
            .update(
                &tx,
                NodeFilter::new().path("001"),
                UpdateSet::new().title("Changed"),
            )
            .await
            .unwrap();
        store.rollback(tx).await.unwrap();

        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "A");
    }

    #[tokio::test]
    async fn test_begin_or_reuse_is_reentrant() {
        let store = MemoryStore::new();
        let (outer, is_new) = store.begin_or_reuse(None).await.unwrap();
        assert!(is_new);

        let (inner, is_new) = store.begin_or_reuse(Some(&outer)).await.unwrap();
        assert!(!is_new);
        assert_eq!(inner, outer);

        // A second independent begin must not interleave.
        assert_eq!(
            store.begin_or_reuse(None).await.unwrap_err(),
            StoreError::TransactionBusy
        );
        store.rollback(outer).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_path_and_slug_depth() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        store.insert(&tx, node("Home", "001", 0)).await.unwrap();

        let err = store.insert(&tx, node("Other", "001", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePath { .. }));

        // Same slug at the same depth, different subtree: rejected.
        let err = store.insert(&tx, node("Home", "002", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlug { .. }));

        // Same slug at a different depth is fine.
        store.insert(&tx, node("Home", "002001", 1)).await.unwrap();
        store.commit(tx).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_update_writes_named_fields_only() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        let stored = store.insert(&tx, node("A", "001", 0)).await.unwrap();

        let mut patch = stored.clone();
        patch.path = "003".to_string();
        patch.depth = 0;
        patch.title = "Should not be written".to_string();

        let written = store
            .bulk_update(&tx, &[patch], &[Field::Path, Field::Depth])
            .await
            .unwrap();
        assert_eq!(written, 1);
        store.commit(tx).await.unwrap();

        let row = store.get(None, stored.pk).await.unwrap().unwrap();
        assert_eq!(row.path, "003");
        assert_eq!(row.title, "A");
    }

    #[tokio::test]
    async fn test_update_applies_relative_and_predicate_forms() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        let mut root = node("Root", "001", 0);
        root.url_path = "/root".to_string();
        let mut child = node("News", "001001", 1);
        child.url_path = "/root/news".to_string();
        store.insert(&tx, root).await.unwrap();
        store.insert(&tx, child).await.unwrap();

        let affected = store
            .update(
                &tx,
                NodeFilter::new().path_starts_with("001").depth_gt(0),
                UpdateSet::new().replace_url_path_prefix("/root", "/home"),
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
        store.commit(tx).await.unwrap();

        let rows = store
            .select(
                None,
                NodeQuery::default().order_by(NodeOrder::asc(Field::Depth)),
            )
            .await
            .unwrap();
        assert_eq!(rows[0].url_path, "/root");
        assert_eq!(rows[1].url_path, "/home/news");
    }

    #[tokio::test]
    async fn test_delete_by_prefix() {
        let store = MemoryStore::new();
        let (tx, _) = store.begin_or_reuse(None).await.unwrap();
        store.insert(&tx, node("A", "001", 0)).await.unwrap();
        store.insert(&tx, node("B", "001001", 1)).await.unwrap();
        store.insert(&tx, node("C", "002", 0)).await.unwrap();

        let removed = store
            .delete(&tx, NodeFilter::new().path_starts_with("001"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        store.commit(tx).await.unwrap();

        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "C");
    }

    #[tokio::test]
    async fn test_write_outside_transaction_fails() {
        let store = MemoryStore::new();
        let bogus = TxHandle(42);
        let err = store.insert(&bogus, node("A", "001", 0)).await.unwrap_err();
        assert_eq!(err, StoreError::NoTransaction);
    }
}

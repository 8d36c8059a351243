//! Tree Mutator - Structural Operations
//!
//! This module provides the write side of the page tree:
//!
//! - add_root / add_child - node creation with sibling-index allocation
//! - update_node - title/slug edits with URL-path propagation to descendants
//! - move_node - subtree relocation (path/depth rewrite for every descendant)
//! - delete_node - subtree removal plus bound specific-object cleanup
//! - publish_node / unpublish_node - status bitmask, optionally cascading
//! - fix_tree - whole-table repair through [`TreeRebuilder`]
//!
//! # Transactions
//!
//! Every operation takes an optional [`TxHandle`]. Passing `None` makes the
//! operation open and own its transaction; passing a caller's handle joins
//! it, and the caller keeps commit/rollback responsibility. Either way the
//! operation commits or rolls back on every exit path, so a failure never
//! leaves a partial structural change visible.
//!
//! # Concurrency
//!
//! Sibling-index allocation reads the parent's `numchild` and then inserts,
//! which is not atomic from the caller's perspective: concurrent `add_child`
//! calls against the same parent must be serialized by the caller. The
//! `numchild` adjustments themselves are relative updates and safe under
//! row-level locking. `fix_tree` is a maintenance operation and must not run
//! concurrently with any other structural mutation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::{NodeFilter, NodeQuery, TreeStore, TxHandle, UpdateSet};
use crate::models::{validate_slug, Field, PageNode, StatusFlags, ValidationError};
use crate::path;
use crate::services::{
    ContentTypeRegistry, MutationEvent, TreeObserver, TreeRebuilder, TreeServiceError,
};

/// Write-side service over the page tree.
pub struct TreeMutator {
    store: Arc<dyn TreeStore>,
    registry: Arc<ContentTypeRegistry>,
    observers: Vec<Arc<dyn TreeObserver>>,
}

impl TreeMutator {
    pub fn new(store: Arc<dyn TreeStore>, registry: Arc<ContentTypeRegistry>) -> Self {
        Self {
            store,
            registry,
            observers: Vec::new(),
        }
    }

    /// Register an observer for mutation notifications.
    pub fn add_observer(&mut self, observer: Arc<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    /// Commit or roll back an owned transaction, passing the result through.
    async fn finish<T>(
        &self,
        owned: bool,
        tx: TxHandle,
        result: Result<T, TreeServiceError>,
    ) -> Result<T, TreeServiceError> {
        match result {
            Ok(value) => {
                if owned {
                    self.store.commit(tx).await?;
                }
                Ok(value)
            }
            Err(e) => {
                if owned {
                    // The original error is what the caller needs; a
                    // rollback failure on top of it only gets logged.
                    if let Err(rb) = self.store.rollback(tx).await {
                        tracing::error!("Rollback failed after error: {}", rb);
                    }
                }
                Err(e)
            }
        }
    }

    async fn notify(&self, event: MutationEvent) {
        tracing::debug!("Emitting {}", event.event_type());
        for observer in &self.observers {
            observer.notify(&event).await;
        }
    }

    async fn get_required(
        &self,
        tx: Option<&TxHandle>,
        pk: i64,
    ) -> Result<PageNode, TreeServiceError> {
        self.store
            .get(tx, pk)
            .await?
            .ok_or(TreeServiceError::NotFound { pk })
    }

    /// Create a new root node.
    ///
    /// The node must be unsaved (empty path); its sibling index is the
    /// current root count, so roots keep creation order.
    pub async fn add_root(
        &self,
        tx: Option<&TxHandle>,
        node: PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        if !node.path.is_empty() {
            return Err(TreeServiceError::path_already_set("add_root", &node.path));
        }
        node.validate_input()?;

        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.add_root_in_tx(&tx, node).await;
        let created = self.finish(owned, tx, result).await?;

        tracing::info!(
            "Created root {:?} at path {}",
            created.slug,
            created.path
        );
        self.notify(MutationEvent::RootCreated {
            node: created.clone(),
        })
        .await;
        Ok(created)
    }

    async fn add_root_in_tx(
        &self,
        tx: &TxHandle,
        mut node: PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        let roots = self
            .store
            .count(Some(tx), NodeFilter::new().depth(0))
            .await?;
        node.path = path::encode(roots as u32)?;
        node.depth = 0;
        node.url_path = PageNode::derive_url_path("", &node.slug);
        Ok(self.store.insert(tx, node).await?)
    }

    /// Create a new child under the node with pk `parent_pk`.
    ///
    /// The parent row is re-read inside the transaction so the sibling index
    /// comes from its current `numchild`, and the count is incremented with
    /// a relative update scoped by primary key.
    pub async fn add_child(
        &self,
        tx: Option<&TxHandle>,
        parent_pk: i64,
        node: PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        if !node.path.is_empty() {
            return Err(TreeServiceError::path_already_set("add_child", &node.path));
        }
        node.validate_input()?;

        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.add_child_in_tx(&tx, parent_pk, node).await;
        let created = self.finish(owned, tx, result).await?;

        tracing::info!(
            "Created child {:?} of {} at path {}",
            created.slug,
            parent_pk,
            created.path
        );
        self.notify(MutationEvent::ChildCreated {
            parent_pk,
            node: created.clone(),
        })
        .await;
        Ok(created)
    }

    async fn add_child_in_tx(
        &self,
        tx: &TxHandle,
        parent_pk: i64,
        mut node: PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        let parent = self.get_required(Some(tx), parent_pk).await?;
        if parent.path.is_empty() {
            return Err(TreeServiceError::empty_path("add_child"));
        }

        node.path = path::child_path(&parent.path, parent.numchild)?;
        node.depth = parent.depth + 1;
        node.url_path = PageNode::derive_url_path(&parent.url_path, &node.slug);
        let created = self.store.insert(tx, node).await?;

        let bumped = self
            .store
            .update(
                tx,
                NodeFilter::new().pk(parent_pk),
                UpdateSet::new().numchild_delta(1),
            )
            .await?;
        if bumped == 0 {
            // Parent row vanished between the read and the update.
            return Err(TreeServiceError::no_changes("add_child"));
        }
        Ok(created)
    }

    /// Update a node's own row (title, slug, revision pointer).
    ///
    /// A slug change recomputes `url_path` from the parent and rewrites the
    /// URL-path prefix of every descendant in one bulk statement; zero
    /// affected descendants just means the node is a leaf.
    pub async fn update_node(
        &self,
        tx: Option<&TxHandle>,
        node: &PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("update_node"));
        }
        if node.pk == 0 {
            return Err(TreeServiceError::not_found(0));
        }
        if node.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle.into());
        }
        validate_slug(&node.slug)?;

        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.update_node_in_tx(&tx, node).await;
        let updated = self.finish(owned, tx, result).await?;

        self.notify(MutationEvent::NodeUpdated {
            node: updated.clone(),
        })
        .await;
        Ok(updated)
    }

    async fn update_node_in_tx(
        &self,
        tx: &TxHandle,
        node: &PageNode,
    ) -> Result<PageNode, TreeServiceError> {
        let stored = self.get_required(Some(tx), node.pk).await?;

        let url_path = if stored.slug != node.slug {
            let parent_url = match stored.parent_path() {
                Some(parent_path) => {
                    self.node_at_path(tx, parent_path).await?.url_path
                }
                None => String::new(),
            };
            let new_url = PageNode::derive_url_path(&parent_url, &node.slug);
            let touched = self
                .store
                .update(
                    tx,
                    NodeFilter::new()
                        .path_starts_with(&stored.path)
                        .depth_gt(stored.depth),
                    UpdateSet::new().replace_url_path_prefix(&stored.url_path, &new_url),
                )
                .await?;
            tracing::debug!(
                "Slug change {:?} -> {:?} propagated to {} descendant(s)",
                stored.slug,
                node.slug,
                touched
            );
            new_url
        } else {
            stored.url_path.clone()
        };

        let changed = self
            .store
            .update(
                tx,
                NodeFilter::new().pk(node.pk),
                UpdateSet::new()
                    .title(&node.title)
                    .slug(&node.slug)
                    .url_path(&url_path)
                    .latest_revision_id(node.latest_revision_id),
            )
            .await?;
        if changed == 0 {
            return Err(TreeServiceError::no_changes("update_node"));
        }
        self.get_required(Some(tx), node.pk).await
    }

    async fn node_at_path(
        &self,
        tx: &TxHandle,
        node_path: &str,
    ) -> Result<PageNode, TreeServiceError> {
        let rows = self
            .store
            .select(
                Some(tx),
                NodeQuery::filtered(NodeFilter::new().path(node_path)).limit(1),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| TreeServiceError::MissingAncestor {
                path: node_path.to_string(),
            })
    }

    /// Move a subtree under a new parent, appending it as the last child.
    ///
    /// Rewrites path and depth for the node and every descendant, propagates
    /// the URL-path change, and adjusts both parents' child counts, all in
    /// one transaction. Roots cannot be moved.
    pub async fn move_node(
        &self,
        tx: Option<&TxHandle>,
        node_pk: i64,
        new_parent_pk: i64,
    ) -> Result<PageNode, TreeServiceError> {
        if node_pk == new_parent_pk {
            return Err(TreeServiceError::SelfMove { pk: node_pk });
        }

        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.move_node_in_tx(&tx, node_pk, new_parent_pk).await;
        let (moved, descendants) = self.finish(owned, tx, result).await?;

        tracing::info!(
            "Moved {:?} under parent {} ({} descendant(s))",
            moved.slug,
            new_parent_pk,
            descendants.len()
        );
        self.notify(MutationEvent::NodeMoved {
            node: moved.clone(),
            descendants,
        })
        .await;
        Ok(moved)
    }

    async fn move_node_in_tx(
        &self,
        tx: &TxHandle,
        node_pk: i64,
        new_parent_pk: i64,
    ) -> Result<(PageNode, Vec<PageNode>), TreeServiceError> {
        let node = self.get_required(Some(tx), node_pk).await?;
        let new_parent = self.get_required(Some(tx), new_parent_pk).await?;
        if node.path.is_empty() || new_parent.path.is_empty() {
            return Err(TreeServiceError::empty_path("move_node"));
        }
        if new_parent.path.starts_with(&node.path) {
            return Err(TreeServiceError::cyclic_move(&node.path, &new_parent.path));
        }
        let old_parent_path = match node.parent_path() {
            Some(p) => p.to_string(),
            None => return Err(TreeServiceError::RootForbidden { op: "move_node" }),
        };

        let mut descendants = self
            .store
            .select(
                Some(tx),
                NodeQuery::filtered(
                    NodeFilter::new()
                        .path_starts_with(&node.path)
                        .depth_gt(node.depth),
                ),
            )
            .await?;

        let new_path = path::child_path(&new_parent.path, new_parent.numchild)?;
        let new_depth = new_parent.depth + 1;
        let depth_shift = new_depth as i64 - node.depth as i64;
        let new_url = PageNode::derive_url_path(&new_parent.url_path, &node.slug);
        let old_url = node.url_path.clone();

        // Rewrite the subtree below the node: swap the ancestor prefix and
        // shift depth, preserving everything after the old prefix.
        for descendant in &mut descendants {
            let suffix = descendant.path[node.path.len()..].to_string();
            descendant.path = format!("{}{}", new_path, suffix);
            descendant.depth = (descendant.depth as i64 + depth_shift) as u32;
        }
        self.store
            .bulk_update(tx, &descendants, &[Field::Path, Field::Depth])
            .await?;

        // Relocate the node itself.
        let changed = self
            .store
            .update(
                tx,
                NodeFilter::new().pk(node_pk),
                UpdateSet::new()
                    .path(&new_path)
                    .depth(new_depth)
                    .url_path(&new_url),
            )
            .await?;
        if changed == 0 {
            return Err(TreeServiceError::no_changes("move_node"));
        }

        // URL-path propagation below the moved node; zero rows for a leaf.
        let touched = self
            .store
            .update(
                tx,
                NodeFilter::new()
                    .path_starts_with(&new_path)
                    .depth_gt(new_depth),
                UpdateSet::new().replace_url_path_prefix(&old_url, &new_url),
            )
            .await?;
        for descendant in &mut descendants {
            if descendant.url_path.starts_with(&old_url) {
                descendant.url_path =
                    format!("{}{}", new_url, &descendant.url_path[old_url.len()..]);
            }
        }
        tracing::debug!("URL-path propagation touched {} row(s)", touched);

        // Child counts: gain on the new parent, loss on the old. Relative
        // updates keep this correct even when both are the same row.
        let gained = self
            .store
            .update(
                tx,
                NodeFilter::new().pk(new_parent_pk),
                UpdateSet::new().numchild_delta(1),
            )
            .await?;
        if gained == 0 {
            return Err(TreeServiceError::no_changes("move_node"));
        }
        let lost = self
            .store
            .update(
                tx,
                NodeFilter::new().path(&old_parent_path),
                UpdateSet::new().numchild_delta(-1),
            )
            .await?;
        if lost == 0 {
            return Err(TreeServiceError::no_changes("move_node"));
        }

        let moved = self.get_required(Some(tx), node_pk).await?;
        Ok((moved, descendants))
    }

    /// Delete a node and its whole subtree, plus any bound specific objects.
    ///
    /// Every doomed node is offered to the `before_delete` observers first
    /// (node, then descendants in pre-order); any veto rolls the whole
    /// operation back. Returns the number of removed tree rows.
    pub async fn delete_node(
        &self,
        tx: Option<&TxHandle>,
        node_pk: i64,
    ) -> Result<u64, TreeServiceError> {
        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.delete_node_in_tx(&tx, node_pk).await;
        let removed = self.finish(owned, tx, result).await?;

        let count = removed.len() as u64;
        tracing::info!("Deleted node {} and subtree ({} row(s))", node_pk, count);
        self.notify(MutationEvent::NodeDeleted { removed }).await;
        Ok(count)
    }

    async fn delete_node_in_tx(
        &self,
        tx: &TxHandle,
        node_pk: i64,
    ) -> Result<Vec<PageNode>, TreeServiceError> {
        let node = self.get_required(Some(tx), node_pk).await?;
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("delete_node"));
        }

        // Pre-order: prefix select sorts by path, node itself first.
        let doomed = self
            .store
            .select(
                Some(tx),
                NodeQuery::filtered(NodeFilter::new().path_starts_with(&node.path)),
            )
            .await?;

        for row in &doomed {
            for observer in &self.observers {
                if let Err(veto) = observer.before_delete(row).await {
                    return Err(TreeServiceError::delete_vetoed(row.pk, veto.reason));
                }
            }
        }

        // Resolve every specific store up front: an unregistered content
        // type must fail the delete before anything is destroyed.
        let mut by_type: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for row in &doomed {
            if let (Some(content_type), Some(page_id)) = (&row.content_type, row.page_id) {
                by_type.entry(content_type.as_str()).or_default().push(page_id);
            }
        }
        let mut cleanups = Vec::with_capacity(by_type.len());
        for (content_type, page_ids) in by_type {
            cleanups.push((self.registry.require(content_type)?.clone(), page_ids));
        }

        let deleted = self
            .store
            .delete(tx, NodeFilter::new().path_starts_with(&node.path))
            .await?;
        if deleted == 0 {
            return Err(TreeServiceError::no_changes("delete_node"));
        }

        if let Some(parent_path) = node.parent_path() {
            let lost = self
                .store
                .update(
                    tx,
                    NodeFilter::new().path(parent_path),
                    UpdateSet::new().numchild_delta(-1),
                )
                .await?;
            if lost == 0 {
                return Err(TreeServiceError::no_changes("delete_node"));
            }
        }

        // External payloads go last, when no in-store step is left to fail.
        for (store, page_ids) in cleanups {
            store.delete_many(&page_ids).await?;
        }
        Ok(doomed)
    }

    /// Set the published bit on a node, optionally on its whole subtree.
    pub async fn publish_node(
        &self,
        tx: Option<&TxHandle>,
        node_pk: i64,
        cascade: bool,
    ) -> Result<PageNode, TreeServiceError> {
        self.set_status(tx, node_pk, cascade, true).await
    }

    /// Clear the published bit on a node, optionally on its whole subtree.
    pub async fn unpublish_node(
        &self,
        tx: Option<&TxHandle>,
        node_pk: i64,
        cascade: bool,
    ) -> Result<PageNode, TreeServiceError> {
        self.set_status(tx, node_pk, cascade, false).await
    }

    async fn set_status(
        &self,
        tx: Option<&TxHandle>,
        node_pk: i64,
        cascade: bool,
        publish: bool,
    ) -> Result<PageNode, TreeServiceError> {
        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self
            .set_status_in_tx(&tx, node_pk, cascade, publish)
            .await;
        let node = self.finish(owned, tx, result).await?;

        self.notify(MutationEvent::StatusChanged {
            node: node.clone(),
            cascaded: cascade,
        })
        .await;
        Ok(node)
    }

    async fn set_status_in_tx(
        &self,
        tx: &TxHandle,
        node_pk: i64,
        cascade: bool,
        publish: bool,
    ) -> Result<PageNode, TreeServiceError> {
        let node = self.get_required(Some(tx), node_pk).await?;
        let set = if publish {
            UpdateSet::new().set_status(StatusFlags::PUBLISHED)
        } else {
            UpdateSet::new().clear_status(StatusFlags::PUBLISHED)
        };

        let changed = self
            .store
            .update(tx, NodeFilter::new().pk(node_pk), set.clone())
            .await?;
        if changed == 0 {
            return Err(TreeServiceError::not_found(node_pk));
        }
        if cascade {
            let touched = self
                .store
                .update(
                    tx,
                    NodeFilter::new()
                        .path_starts_with(&node.path)
                        .depth_gt(node.depth),
                    set,
                )
                .await?;
            tracing::debug!("Status cascade touched {} descendant(s)", touched);
        }
        self.get_required(Some(tx), node_pk).await
    }

    /// Repair the whole tree: rebuild the forest from the stored rows and
    /// write back corrected `path`/`depth`/`numchild`/`url_path` in one
    /// transaction. Returns the number of rows rewritten.
    ///
    /// Must be externally serialized against all other structural mutations.
    pub async fn fix_tree(&self, tx: Option<&TxHandle>) -> Result<u64, TreeServiceError> {
        let (tx, owned) = self.store.begin_or_reuse(tx).await?;
        let result = self.fix_tree_in_tx(&tx).await;
        let rewritten = self.finish(owned, tx, result).await?;
        tracing::info!("fix_tree rewrote {} row(s)", rewritten);
        Ok(rewritten)
    }

    async fn fix_tree_in_tx(&self, tx: &TxHandle) -> Result<u64, TreeServiceError> {
        let rows = self.store.select(Some(tx), NodeQuery::default()).await?;
        if rows.is_empty() {
            return Ok(0);
        }
        let mut forest = TreeRebuilder::build(rows)?;
        forest.fix()?;
        forest.recompute_url_paths();
        let fixed = forest.flat_list();
        let written = self
            .store
            .bulk_update(
                tx,
                &fixed,
                &[Field::Path, Field::Depth, Field::Numchild, Field::UrlPath],
            )
            .await?;
        Ok(written)
    }
}

#[cfg(test)]
#[path = "mutator_tree_test.rs"]
mod mutator_tree_test;

//! Path Resolver - Reverse URL Generation
//!
//! Reconstructs the full slug path of a node (`/slug0/.../slugN`) by walking
//! its ancestor prefixes one point lookup at a time, without reading the
//! denormalized `url_path` column. Useful exactly when `url_path` cannot be
//! trusted, for example while a repair is recomputing it.

use std::sync::Arc;

use crate::db::{NodeFilter, NodeQuery, TreeStore};
use crate::path;
use crate::services::TreeServiceError;

/// Reverse-resolves node identities into slug paths.
pub struct PathResolver {
    store: Arc<dyn TreeStore>,
}

impl PathResolver {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// Full slug path of the node with the given pk, root to leaf.
    ///
    /// Each ancestor level is one point lookup against the `path` index; a
    /// level with no row is reported as [`TreeServiceError::MissingAncestor`]
    /// rather than silently skipped, since it means the tree is broken.
    pub async fn resolve(&self, pk: i64) -> Result<String, TreeServiceError> {
        let node = self
            .store
            .get(None, pk)
            .await?
            .ok_or(TreeServiceError::NotFound { pk })?;
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("resolve"));
        }

        let mut slugs = Vec::with_capacity(node.depth as usize + 1);
        for ancestor in path::ancestor_paths(&node.path)? {
            let rows = self
                .store
                .select(
                    None,
                    NodeQuery::filtered(NodeFilter::new().path(&ancestor)).limit(1),
                )
                .await?;
            match rows.into_iter().next() {
                Some(row) => slugs.push(row.slug),
                None => return Err(TreeServiceError::MissingAncestor { path: ancestor }),
            }
        }
        slugs.push(node.slug);

        Ok(format!("/{}", slugs.join("/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::PageNode;

    fn node(title: &str, path: &str, depth: u32) -> PageNode {
        let mut n = PageNode::new(title);
        n.path = path.to_string();
        n.depth = depth;
        n
    }

    #[tokio::test]
    async fn test_resolve_walks_ancestors() {
        let store = MemoryStore::new();
        store.seed(vec![
            node("Home", "001", 0),
            node("Sport", "001001", 1),
            node("Football", "001001001", 2),
        ]);
        let store = Arc::new(store);
        let resolver = PathResolver::new(store.clone());

        let rows = store
            .select(None, NodeQuery::default())
            .await
            .unwrap();
        let football = rows.iter().find(|n| n.slug == "football").unwrap();

        let slug_path = resolver.resolve(football.pk).await.unwrap();
        assert_eq!(slug_path, "/home/sport/football");
    }

    #[tokio::test]
    async fn test_resolve_root() {
        let store = MemoryStore::new();
        store.seed(vec![node("Home", "001", 0)]);
        let store = Arc::new(store);
        let resolver = PathResolver::new(store.clone());

        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        assert_eq!(resolver.resolve(rows[0].pk).await.unwrap(), "/home");
    }

    #[tokio::test]
    async fn test_resolve_reports_missing_ancestor() {
        let store = MemoryStore::new();
        // Orphan row: claims depth 1 under a parent that has no row.
        store.seed(vec![node("Orphan", "001001", 1)]);
        let store = Arc::new(store);
        let resolver = PathResolver::new(store.clone());

        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        let err = resolver.resolve(rows[0].pk).await.unwrap_err();
        assert!(matches!(
            err,
            TreeServiceError::MissingAncestor { path } if path == "001"
        ));
    }

    #[tokio::test]
    async fn test_resolve_unknown_pk() {
        let resolver = PathResolver::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            resolver.resolve(42).await,
            Err(TreeServiceError::NotFound { pk: 42 })
        ));
    }
}

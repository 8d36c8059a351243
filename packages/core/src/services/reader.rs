//! Tree Reader - Derivation Queries
//!
//! Ancestor, descendant, child and sibling reads are all derived from
//! `path`/`depth` predicates, never recursive queries:
//!
//! - ancestors: `path IN` the node's ancestor prefixes
//! - descendants: `path LIKE prefix% AND depth > d`
//! - children: `path LIKE prefix% AND depth = d + 1`
//! - siblings: the parent prefix at the node's own depth (roots are
//!   siblings of the other roots)

use std::sync::Arc;

use crate::db::{NodeFilter, NodeOrder, NodeQuery, TreeStore};
use crate::models::{PageNode, StatusFlags};
use crate::path;
use crate::services::TreeServiceError;

/// Pass-through read options: status filter, pagination, ordering.
///
/// `inclusive` adds the subject node itself to the result where that makes
/// sense (ancestors, descendants, siblings).
#[derive(Debug, Clone, Default)]
pub struct ReadOpts {
    pub inclusive: bool,
    pub status_any: Option<StatusFlags>,
    pub order_by: Vec<NodeOrder>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ReadOpts {
    pub fn inclusive() -> Self {
        Self {
            inclusive: true,
            ..Self::default()
        }
    }

    /// Only rows whose status intersects `flags` (e.g. live pages only).
    pub fn with_status(mut self, flags: StatusFlags) -> Self {
        self.status_any = Some(flags);
        self
    }

    fn into_query(self, filter: NodeFilter) -> NodeQuery {
        let filter = match self.status_any {
            Some(flags) => filter.status_any(flags),
            None => filter,
        };
        NodeQuery {
            filter,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Read-side service over the page tree.
pub struct TreeReader {
    store: Arc<dyn TreeStore>,
}

impl TreeReader {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self { store }
    }

    /// All root nodes in sibling order.
    pub async fn roots(&self, opts: ReadOpts) -> Result<Vec<PageNode>, TreeServiceError> {
        let query = opts.into_query(NodeFilter::new().depth(0));
        Ok(self.store.select(None, query).await?)
    }

    /// Ancestors of `node`, root first. `opts.inclusive` appends the node
    /// itself (it sorts last: deepest path).
    pub async fn ancestors(
        &self,
        node: &PageNode,
        opts: ReadOpts,
    ) -> Result<Vec<PageNode>, TreeServiceError> {
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("ancestors"));
        }
        let mut paths = path::ancestor_paths(&node.path)?;
        if opts.inclusive {
            paths.push(node.path.clone());
        }
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let query = opts.into_query(NodeFilter::new().path_in(paths));
        Ok(self.store.select(None, query).await?)
    }

    /// Descendants of `node` in pre-order; `opts.inclusive` keeps the node
    /// itself at the front.
    pub async fn descendants(
        &self,
        node: &PageNode,
        opts: ReadOpts,
    ) -> Result<Vec<PageNode>, TreeServiceError> {
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("descendants"));
        }
        let mut filter = NodeFilter::new().path_starts_with(&node.path);
        if !opts.inclusive {
            filter = filter.depth_gt(node.depth);
        }
        let query = opts.into_query(filter);
        Ok(self.store.select(None, query).await?)
    }

    /// Direct children of `node` in sibling order.
    pub async fn children(
        &self,
        node: &PageNode,
        opts: ReadOpts,
    ) -> Result<Vec<PageNode>, TreeServiceError> {
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("children"));
        }
        let filter = NodeFilter::new()
            .path_starts_with(&node.path)
            .depth(node.depth + 1);
        Ok(self.store.select(None, opts.into_query(filter)).await?)
    }

    /// Siblings of `node` in sibling order, self excluded unless
    /// `opts.inclusive`. For a root, the siblings are the other roots.
    pub async fn siblings(
        &self,
        node: &PageNode,
        opts: ReadOpts,
    ) -> Result<Vec<PageNode>, TreeServiceError> {
        if node.path.is_empty() {
            return Err(TreeServiceError::empty_path("siblings"));
        }
        let mut filter = match node.parent_path() {
            Some(parent) => NodeFilter::new()
                .path_starts_with(parent)
                .depth(node.depth),
            None => NodeFilter::new().depth(0),
        };
        if !opts.inclusive {
            filter = filter.exclude_pk(node.pk);
        }
        Ok(self.store.select(None, opts.into_query(filter)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Field;

    /// home(001) -> news(001001), sport(001002) -> football(001002001);
    /// about(002). news is published, the rest are drafts.
    async fn seeded_reader() -> (TreeReader, Vec<PageNode>) {
        let mut home = PageNode::new("Home");
        home.path = "001".into();
        home.numchild = 2;
        let mut news = PageNode::new("News");
        news.path = "001001".into();
        news.depth = 1;
        news.status.insert(StatusFlags::PUBLISHED);
        let mut sport = PageNode::new("Sport");
        sport.path = "001002".into();
        sport.depth = 1;
        sport.numchild = 1;
        let mut football = PageNode::new("Football");
        football.path = "001002001".into();
        football.depth = 2;
        let mut about = PageNode::new("About");
        about.path = "002".into();

        let store = MemoryStore::new();
        store.seed(vec![
            home.clone(),
            news.clone(),
            sport.clone(),
            football.clone(),
            about.clone(),
        ]);
        let store: Arc<dyn TreeStore> = Arc::new(store);
        let reader = TreeReader::new(store.clone());

        // Re-read to pick up assigned pks.
        let rows = store.select(None, NodeQuery::default()).await.unwrap();
        (reader, rows)
    }

    fn by_slug<'a>(nodes: &'a [PageNode], slug: &str) -> &'a PageNode {
        nodes.iter().find(|n| n.slug == slug).unwrap()
    }

    #[tokio::test]
    async fn test_ancestors_root_first() {
        let (reader, nodes) = seeded_reader().await;
        let football = by_slug(&nodes, "football");

        let ancestors = reader.ancestors(football, ReadOpts::default()).await.unwrap();
        let slugs: Vec<&str> = ancestors.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["home", "sport"]);

        let inclusive = reader.ancestors(football, ReadOpts::inclusive()).await.unwrap();
        assert_eq!(inclusive.len(), 3);
        assert_eq!(inclusive.last().unwrap().slug, "football");
    }

    #[tokio::test]
    async fn test_descendants_preorder() {
        let (reader, nodes) = seeded_reader().await;
        let home = by_slug(&nodes, "home");

        let descendants = reader.descendants(home, ReadOpts::default()).await.unwrap();
        let slugs: Vec<&str> = descendants.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["news", "sport", "football"]);

        let inclusive = reader.descendants(home, ReadOpts::inclusive()).await.unwrap();
        assert_eq!(inclusive[0].slug, "home");
        assert_eq!(inclusive.len(), 4);
    }

    #[tokio::test]
    async fn test_children_only_direct() {
        let (reader, nodes) = seeded_reader().await;
        let home = by_slug(&nodes, "home");

        let children = reader.children(home, ReadOpts::default()).await.unwrap();
        let slugs: Vec<&str> = children.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["news", "sport"]);
    }

    #[tokio::test]
    async fn test_siblings_and_root_siblings() {
        let (reader, nodes) = seeded_reader().await;

        let news = by_slug(&nodes, "news");
        let siblings = reader.siblings(news, ReadOpts::default()).await.unwrap();
        let slugs: Vec<&str> = siblings.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["sport"]);

        let home = by_slug(&nodes, "home");
        let root_siblings = reader.siblings(home, ReadOpts::default()).await.unwrap();
        let slugs: Vec<&str> = root_siblings.iter().map(|n| n.slug.as_str()).collect();
        assert_eq!(slugs, vec!["about"]);

        let inclusive = reader.siblings(home, ReadOpts::inclusive()).await.unwrap();
        assert_eq!(inclusive.len(), 2);
    }

    #[tokio::test]
    async fn test_status_filter_and_pagination() {
        let (reader, nodes) = seeded_reader().await;
        let home = by_slug(&nodes, "home");

        let published = reader
            .descendants(home, ReadOpts::default().with_status(StatusFlags::PUBLISHED))
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slug, "news");

        let paged = reader
            .descendants(
                home,
                ReadOpts {
                    limit: Some(1),
                    offset: Some(1),
                    ..ReadOpts::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].slug, "sport");
    }

    #[tokio::test]
    async fn test_order_by_passthrough() {
        let (reader, nodes) = seeded_reader().await;
        let home = by_slug(&nodes, "home");

        let deepest_first = reader
            .descendants(
                home,
                ReadOpts {
                    order_by: vec![NodeOrder::desc(Field::Depth)],
                    ..ReadOpts::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(deepest_first[0].slug, "football");
    }

    #[tokio::test]
    async fn test_unsaved_node_is_a_precondition_error() {
        let (reader, _) = seeded_reader().await;
        let unsaved = PageNode::new("Unsaved");
        assert!(matches!(
            reader.children(&unsaved, ReadOpts::default()).await,
            Err(TreeServiceError::EmptyPath { .. })
        ));
    }
}

//! Query and Change-Set Types
//!
//! Declarative predicates and change sets consumed by [`TreeStore`]
//! implementations. All filter fields are combined with AND logic and `None`
//! values are ignored, so an empty filter matches every row.
//!
//! The in-process adapter evaluates these directly ([`NodeFilter::matches`],
//! [`UpdateSet::apply`]); a SQL adapter would compile them to `WHERE` and
//! `SET` clauses instead.
//!
//! [`TreeStore`]: crate::db::TreeStore

use chrono::Utc;

use crate::models::{Field, PageNode, StatusFlags};

/// AND-combined row predicates over the persisted columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeFilter {
    pub pk_eq: Option<i64>,
    pub pk_ne: Option<i64>,
    pub path_eq: Option<String>,
    pub path_ne: Option<String>,
    pub path_starts_with: Option<String>,
    pub path_in: Option<Vec<String>>,
    pub depth_eq: Option<u32>,
    pub depth_gt: Option<u32>,
    /// Rows whose status intersects these bits
    pub status_any: Option<StatusFlags>,
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pk(mut self, pk: i64) -> Self {
        self.pk_eq = Some(pk);
        self
    }

    pub fn exclude_pk(mut self, pk: i64) -> Self {
        self.pk_ne = Some(pk);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path_eq = Some(path.into());
        self
    }

    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.path_ne = Some(path.into());
        self
    }

    pub fn path_starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.path_starts_with = Some(prefix.into());
        self
    }

    pub fn path_in(mut self, paths: Vec<String>) -> Self {
        self.path_in = Some(paths);
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth_eq = Some(depth);
        self
    }

    pub fn depth_gt(mut self, depth: u32) -> Self {
        self.depth_gt = Some(depth);
        self
    }

    pub fn status_any(mut self, flags: StatusFlags) -> Self {
        self.status_any = Some(flags);
        self
    }

    /// Evaluate the predicate against one row.
    pub fn matches(&self, node: &PageNode) -> bool {
        if let Some(pk) = self.pk_eq {
            if node.pk != pk {
                return false;
            }
        }
        if let Some(pk) = self.pk_ne {
            if node.pk == pk {
                return false;
            }
        }
        if let Some(ref path) = self.path_eq {
            if &node.path != path {
                return false;
            }
        }
        if let Some(ref path) = self.path_ne {
            if &node.path == path {
                return false;
            }
        }
        if let Some(ref prefix) = self.path_starts_with {
            if !node.path.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(ref paths) = self.path_in {
            if !paths.iter().any(|p| p == &node.path) {
                return false;
            }
        }
        if let Some(depth) = self.depth_eq {
            if node.depth != depth {
                return false;
            }
        }
        if let Some(depth) = self.depth_gt {
            if node.depth <= depth {
                return false;
            }
        }
        if let Some(flags) = self.status_any {
            if !node.status.intersects(flags) {
                return false;
            }
        }
        true
    }
}

/// Sort key for a query: column plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOrder {
    pub field: Field,
    pub descending: bool,
}

impl NodeOrder {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// A read: filter plus ordering and pagination pass-through.
///
/// With no explicit ordering, rows come back in lexicographic `path` order,
/// which is pre-order traversal order of the tree.
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub filter: NodeFilter,
    pub order_by: Vec<NodeOrder>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl NodeQuery {
    pub fn filtered(filter: NodeFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order: NodeOrder) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Prefix rewrite for the single-statement URL-path propagation:
/// `url_path = new_prefix || substring(url_path, len(old_prefix) + 1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPathReplace {
    pub old_prefix: String,
    pub new_prefix: String,
}

/// Change set for an `UPDATE` scoped by a [`NodeFilter`].
///
/// Absolute assignments are plain `Option`s; the three relational forms the
/// tree logic needs (`numchild` delta, URL-path prefix rewrite, status bit
/// edits) are expressed explicitly so adapters can emit them as single
/// statements instead of read-modify-write loops.
#[derive(Debug, Clone, Default)]
pub struct UpdateSet {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub path: Option<String>,
    pub depth: Option<u32>,
    pub numchild: Option<u32>,
    pub url_path: Option<String>,
    pub latest_revision_id: Option<Option<i64>>,
    /// Relative child-count adjustment (`numchild = numchild + delta`)
    pub numchild_delta: Option<i64>,
    /// URL-path prefix rewrite (§ descendant propagation)
    pub url_path_replace: Option<UrlPathReplace>,
    /// Status bits to set
    pub status_set: Option<StatusFlags>,
    /// Status bits to clear
    pub status_clear: Option<StatusFlags>,
    /// Refresh `updated_at` (on by default)
    pub touch: bool,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self {
            touch: true,
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn url_path(mut self, url_path: impl Into<String>) -> Self {
        self.url_path = Some(url_path.into());
        self
    }

    pub fn latest_revision_id(mut self, revision_id: Option<i64>) -> Self {
        self.latest_revision_id = Some(revision_id);
        self
    }

    pub fn numchild_delta(mut self, delta: i64) -> Self {
        self.numchild_delta = Some(delta);
        self
    }

    pub fn replace_url_path_prefix(
        mut self,
        old_prefix: impl Into<String>,
        new_prefix: impl Into<String>,
    ) -> Self {
        self.url_path_replace = Some(UrlPathReplace {
            old_prefix: old_prefix.into(),
            new_prefix: new_prefix.into(),
        });
        self
    }

    pub fn set_status(mut self, flags: StatusFlags) -> Self {
        self.status_set = Some(flags);
        self
    }

    pub fn clear_status(mut self, flags: StatusFlags) -> Self {
        self.status_clear = Some(flags);
        self
    }

    pub fn no_touch(mut self) -> Self {
        self.touch = false;
        self
    }

    /// Apply the change set to one row in place.
    pub fn apply(&self, node: &mut PageNode) {
        if let Some(ref title) = self.title {
            node.title = title.clone();
        }
        if let Some(ref slug) = self.slug {
            node.slug = slug.clone();
        }
        if let Some(ref path) = self.path {
            node.path = path.clone();
        }
        if let Some(depth) = self.depth {
            node.depth = depth;
        }
        if let Some(numchild) = self.numchild {
            node.numchild = numchild;
        }
        if let Some(ref url_path) = self.url_path {
            node.url_path = url_path.clone();
        }
        if let Some(revision_id) = self.latest_revision_id {
            node.latest_revision_id = revision_id;
        }
        if let Some(delta) = self.numchild_delta {
            node.numchild = (node.numchild as i64 + delta).max(0) as u32;
        }
        if let Some(ref replace) = self.url_path_replace {
            if node.url_path.starts_with(&replace.old_prefix) {
                node.url_path = format!(
                    "{}{}",
                    replace.new_prefix,
                    &node.url_path[replace.old_prefix.len()..]
                );
            }
        }
        if let Some(flags) = self.status_set {
            node.status.insert(flags);
        }
        if let Some(flags) = self.status_clear {
            node.status.remove(flags);
        }
        if self.touch {
            node.updated_at = Utc::now();
        }
    }
}

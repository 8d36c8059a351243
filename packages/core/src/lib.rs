//! PageTree Core
//!
//! Storage-agnostic engine for a hierarchical page tree persisted as
//! materialized paths: every node's position is a single fixed-width string
//! column whose lexicographic order is pre-order traversal order, so
//! ancestry, depth and sibling rank need no recursive queries.
//!
//! # Modules
//!
//! - [`path`] - fixed-width, one-based segment codec and the arithmetic
//!   over it (depth, ancestors, child paths)
//! - [`models`] - the persisted [`PageNode`] row with its denormalized
//!   `depth`/`numchild`/`url_path` columns, status bitmask, slug validation
//!   and the compile-time field-descriptor table
//! - [`db`] - the [`TreeStore`] repository trait with explicit reentrant
//!   transactions, declarative filters/change sets, and the in-memory
//!   reference adapter
//! - [`services`] - [`TreeMutator`] (structural writes), [`TreeReader`]
//!   (hierarchy queries), [`PathResolver`] (URL resolution) and
//!   [`TreeRebuilder`] (the `fix_tree` repair pass), plus the observer and
//!   content-type extension points
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pagetree_core::db::MemoryStore;
//! use pagetree_core::models::PageNode;
//! use pagetree_core::services::{ContentTypeRegistry, TreeMutator, TreeReader};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let mutator = TreeMutator::new(store.clone(), Arc::new(ContentTypeRegistry::new()));
//!
//! let home = mutator.add_root(None, PageNode::new("Home")).await?;
//! let news = mutator.add_child(None, home.pk, PageNode::new("News")).await?;
//! assert_eq!(news.path, "001001");
//! assert_eq!(news.url_path, "/home/news");
//!
//! let reader = TreeReader::new(store);
//! let children = reader.children(&home, Default::default()).await?;
//! assert_eq!(children.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod models;
pub mod path;
pub mod services;

pub use db::{
    MemoryStore, NodeFilter, NodeOrder, NodeQuery, StoreError, TreeStore, TxHandle, UpdateSet,
};
pub use models::{PageNode, StatusFlags};
pub use services::{
    ContentTypeRegistry, MutationEvent, PathResolver, SpecificStore, TreeMutator, TreeObserver,
    TreeReader, TreeRebuilder, TreeServiceError,
};

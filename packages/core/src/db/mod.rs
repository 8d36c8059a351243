//! Repository Layer
//!
//! This module defines the abstract repository the tree logic runs against:
//!
//! - [`TreeStore`] - the async trait every backing store implements
//! - [`NodeFilter`] / [`NodeQuery`] / [`UpdateSet`] - declarative predicates
//!   and change sets (no SQL anywhere in this crate)
//! - [`MemoryStore`] - in-process reference adapter with full transaction
//!   and uniqueness semantics, used by the test suite
//!
//! Production deployments bind [`TreeStore`] to the external relational
//! query engine; this crate deliberately contains no SQL generation.

mod error;
mod memory_store;
mod query;
mod tree_store;

pub use error::StoreError;
pub use memory_store::MemoryStore;
pub use query::{NodeFilter, NodeOrder, NodeQuery, UpdateSet, UrlPathReplace};
pub use tree_store::{TreeStore, TxHandle};

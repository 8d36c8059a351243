//! Mutation Events and Observers
//!
//! Structural mutations notify external collaborators (audit log, cache
//! invalidation, menu rebuild) through an explicit observer list owned by
//! the mutator; no global signal pools. Most notifications fire after the
//! transaction commits; `before_delete` is the exception: it runs inside
//! the delete transaction and may veto it by returning an error.

use async_trait::async_trait;

use crate::models::PageNode;

/// Domain events emitted by the tree mutator.
///
/// Each event carries the affected node(s) as they were committed.
#[derive(Debug, Clone)]
pub enum MutationEvent {
    /// A new root was created
    RootCreated { node: PageNode },

    /// A child was created under `parent_pk`
    ChildCreated { parent_pk: i64, node: PageNode },

    /// A node's own row changed (title/slug/url_path)
    NodeUpdated { node: PageNode },

    /// A subtree was relocated; `descendants` lists every moved node below it
    NodeMoved {
        node: PageNode,
        descendants: Vec<PageNode>,
    },

    /// A subtree was removed; `removed` is the pre-delete row set, pre-order
    NodeDeleted { removed: Vec<PageNode> },

    /// Published bit flipped (possibly cascaded)
    StatusChanged { node: PageNode, cascaded: bool },
}

impl MutationEvent {
    /// Stable string tag, for logging and dispatch tables.
    pub fn event_type(&self) -> &'static str {
        match self {
            MutationEvent::RootCreated { .. } => "node:root-created",
            MutationEvent::ChildCreated { .. } => "node:child-created",
            MutationEvent::NodeUpdated { .. } => "node:updated",
            MutationEvent::NodeMoved { .. } => "node:moved",
            MutationEvent::NodeDeleted { .. } => "node:deleted",
            MutationEvent::StatusChanged { .. } => "node:status-changed",
        }
    }
}

/// Veto returned by a `before_delete` observer.
#[derive(Debug, Clone)]
pub struct DeleteVeto {
    pub reason: String,
}

impl DeleteVeto {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Observer hooks fired at defined mutation points.
///
/// Implementations must be cheap or hand work off: `notify` runs on the
/// mutation path. The default implementations do nothing, so an observer
/// only overrides the hooks it cares about.
#[async_trait]
pub trait TreeObserver: Send + Sync {
    /// Post-commit notification of any mutation event.
    async fn notify(&self, _event: &MutationEvent) {}

    /// In-transaction hook fired once per node about to be deleted
    /// (the node itself first, then its descendants in pre-order).
    /// Returning a veto aborts and rolls back the whole delete.
    async fn before_delete(&self, _node: &PageNode) -> Result<(), DeleteVeto> {
        Ok(())
    }
}

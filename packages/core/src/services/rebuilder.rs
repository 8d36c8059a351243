//! Tree Rebuilder (fix_tree)
//!
//! Rebuilds an ordered in-memory forest from an unordered flat node list and
//! recomputes every denormalized column (`path`, `depth`, `numchild`,
//! `url_path`) from the structure alone. The only thing it trusts from the
//! input is the *prefix relation* between existing paths: depth, child
//! counts and URL paths may all be wrong, which is exactly the situation the
//! repair exists for.
//!
//! The same structure doubles as a general subtree snapshot: `find`,
//! `for_each` and `flat_list` support non-repair uses such as building a
//! navigation menu without touching the store per level.
//!
//! # Algorithm
//!
//! 1. Sort nodes by `path` lexicographically, so ancestors precede
//!    descendants and siblings group contiguously.
//! 2. Walk each path in fixed [`STEP_LEN`](crate::path::STEP_LEN) strides
//!    from the root, creating or reusing one forest entry per unique prefix.
//!    A prefix with no matching row becomes a placeholder entry: it keeps
//!    its children ordered and consumes a sibling slot, but produces no
//!    output row and contributes no URL segment.
//! 3. Renumber: forest roots get segment 0, 1, 2, ... in encounter order;
//!    each entry's children likewise. Depth is the level, `numchild` the
//!    child-list length.
//!
//! Applying the rebuild to its own output is a no-op: renumbered paths are
//! contiguous and sorted, so a second pass reproduces them exactly.

use std::collections::HashMap;

use crate::models::PageNode;
use crate::path::{self, PathError};

#[derive(Debug)]
struct Entry {
    node: Option<PageNode>,
    children: Vec<usize>,
}

/// Ordered in-memory forest over a flat node list.
#[derive(Debug, Default)]
pub struct TreeRebuilder {
    arena: Vec<Entry>,
    by_original_path: HashMap<String, usize>,
    roots: Vec<usize>,
}

impl TreeRebuilder {
    /// Build the forest from an unordered node list.
    ///
    /// Fails only on malformed paths (empty or not whole segments); every
    /// structurally valid input produces a forest.
    pub fn build(mut nodes: Vec<PageNode>) -> Result<Self, PathError> {
        nodes.sort_by(|a, b| a.path.cmp(&b.path));

        let mut forest = Self::default();
        for node in nodes {
            path::validate(&node.path)?;
            let mut entry_idx: Option<usize> = None;
            let levels = node.path.len() / path::STEP_LEN;
            for level in 1..=levels {
                let prefix = &node.path[..level * path::STEP_LEN];
                entry_idx = Some(forest.entry_for(prefix, entry_idx));
            }
            // levels >= 1 after validate, so entry_idx is set
            if let Some(idx) = entry_idx {
                forest.arena[idx].node = Some(node);
            }
        }
        Ok(forest)
    }

    fn entry_for(&mut self, prefix: &str, parent: Option<usize>) -> usize {
        if let Some(&idx) = self.by_original_path.get(prefix) {
            return idx;
        }
        let idx = self.arena.len();
        self.arena.push(Entry {
            node: None,
            children: Vec::new(),
        });
        self.by_original_path.insert(prefix.to_string(), idx);
        match parent {
            Some(p) => self.arena[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    /// Recompute `path`, `depth` and `numchild` for every node in the
    /// forest, renumbering segments in encounter order.
    pub fn fix(&mut self) -> Result<(), PathError> {
        let roots = self.roots.clone();
        for (index, root) in roots.into_iter().enumerate() {
            let root_path = path::encode(index as u32)?;
            self.fix_entry(root, root_path, 0)?;
        }
        Ok(())
    }

    fn fix_entry(&mut self, idx: usize, new_path: String, depth: u32) -> Result<(), PathError> {
        let children = self.arena[idx].children.clone();
        if let Some(node) = self.arena[idx].node.as_mut() {
            node.path = new_path.clone();
            node.depth = depth;
            node.numchild = children.len() as u32;
        }
        for (index, child) in children.into_iter().enumerate() {
            let child_path = path::child_path(&new_path, index as u32)?;
            self.fix_entry(child, child_path, depth + 1)?;
        }
        Ok(())
    }

    /// Recompute `url_path` from the slugs along the rebuilt edges.
    ///
    /// Placeholder entries pass their parent's prefix through unchanged, so
    /// descendants of a missing row still get a deterministic route.
    pub fn recompute_url_paths(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.recompute_urls_from(root, String::new());
        }
    }

    fn recompute_urls_from(&mut self, idx: usize, parent_url: String) {
        let url = match self.arena[idx].node.as_mut() {
            Some(node) => {
                node.url_path = PageNode::derive_url_path(&parent_url, &node.slug);
                node.url_path.clone()
            }
            None => parent_url,
        };
        let children = self.arena[idx].children.clone();
        for child in children {
            self.recompute_urls_from(child, url.clone());
        }
    }

    /// Look up a node by the path it had in the *input* list.
    pub fn find(&self, original_path: &str) -> Option<&PageNode> {
        self.by_original_path
            .get(original_path)
            .and_then(|&idx| self.arena[idx].node.as_ref())
    }

    /// Visit every real node in pre-order.
    pub fn for_each<F: FnMut(&PageNode)>(&self, mut f: F) {
        for &root in &self.roots {
            self.visit(root, &mut f);
        }
    }

    fn visit<F: FnMut(&PageNode)>(&self, idx: usize, f: &mut F) {
        if let Some(node) = self.arena[idx].node.as_ref() {
            f(node);
        }
        for &child in &self.arena[idx].children {
            self.visit(child, f);
        }
    }

    /// All real nodes in pre-order, cloned out of the forest.
    pub fn flat_list(&self) -> Vec<PageNode> {
        let mut out = Vec::new();
        self.for_each(|node| out.push(node.clone()));
        out
    }

    /// Number of real nodes in the forest.
    pub fn len(&self) -> usize {
        self.arena.iter().filter(|e| e.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

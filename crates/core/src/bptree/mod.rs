//! Read-only B+-tree over the continuous attribute.
//!
//! The tree is bulk-loaded once from a sorted pass over the dataset and
//! never mutated afterwards. Nodes live in an index-addressed arena owned by
//! the tree; leaves form a singly linked chain in ascending key order for
//! sequential range scans. Duplicate keys are permitted and appear once per
//! occurrence.

/// Bottom-up bulk loading.
mod build;
/// Arena node types: tagged leaf / internal records.
mod node;
/// Descent, point probe, and leaf-walk range scan.
mod search;

use node::{LeafNode, Node, NodeId};


/// A bulk-loaded, immutable B+-tree mapping continuous keys to point ids.
#[derive(Debug)]
pub struct BPlusTree {
    order: usize,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    len: usize,
}

impl BPlusTree {
    /// The tree order: leaves and internal nodes hold at most `2 * order`
    /// keys.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Total number of keys (one per dataset point).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree was built over an empty dataset.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of levels from the root to the leaves; 0 for an empty tree,
    /// 1 when the root is itself a leaf.
    pub fn depth(&self) -> usize {
        let Some(mut cur) = self.root else { return 0 };
        let mut depth = 1;
        while let Node::Internal(internal) = &self.nodes[cur] {
            cur = internal.children[0];
            depth += 1;
        }
        depth
    }

    #[inline]
    pub(crate) fn leaf(&self, id: NodeId) -> &LeafNode {
        match &self.nodes[id] {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => unreachable!("leaf chain references an internal node"),
        }
    }

    /// `(key, id)` pairs in leaf-chain order. Used by the invariant tests.
    #[cfg(test)]
    pub(crate) fn leaf_entries(&self) -> Vec<(f32, u32)> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.leftmost_leaf();
        while let Some(id) = cur {
            let leaf = self.leaf(id);
            out.extend(leaf.keys.iter().copied().zip(leaf.ids.iter().copied()));
            cur = leaf.next;
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut cur = self.root?;
        while let Node::Internal(internal) = &self.nodes[cur] {
            cur = internal.children[0];
        }
        Some(cur)
    }
}

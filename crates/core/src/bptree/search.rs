//! Tree descent and range scans.
//!
//! Internal descent takes the child at the strict upper bound of the probe
//! key, matching the bulk-load convention that a separator is the first key
//! of the subtree to its right. Range scans walk the leaf chain from the
//! lower bound and stop at the first key past `r`.

use crate::bptree::node::{Node, NodeId};
use crate::bptree::BPlusTree;

impl BPlusTree {
    /// Descend to the leaf that would hold `key`.
    ///
    /// Returns the leaf's arena id and the lower-bound position of `key`
    /// within it (which may be one past the last slot). `None` iff the tree
    /// is empty.
    pub(crate) fn traverse_to_leaf(&self, key: f32) -> Option<(NodeId, usize)> {
        let mut cur = self.root?;
        loop {
            match &self.nodes[cur] {
                Node::Internal(internal) => {
                    let idx = internal.keys.partition_point(|&k| k <= key);
                    cur = internal.children[idx];
                }
                Node::Leaf(leaf) => {
                    let idx = leaf.keys.partition_point(|&k| k < key);
                    return Some((cur, idx));
                }
            }
        }
    }

    /// First leaf position holding a key `>= key`, hopping to the next leaf
    /// when the lower bound falls past the end of the found one. `None` when
    /// every key is smaller or the tree is empty.
    fn lower_bound(&self, key: f32) -> Option<(NodeId, usize)> {
        let (leaf_id, idx) = self.traverse_to_leaf(key)?;
        let leaf = self.leaf(leaf_id);
        if idx < leaf.keys.len() {
            Some((leaf_id, idx))
        } else {
            Some((leaf.next?, 0))
        }
    }

    /// Whether any point carries exactly this continuous key.
    pub fn contains(&self, key: f32) -> bool {
        match self.traverse_to_leaf(key) {
            Some((leaf_id, idx)) => self.leaf(leaf_id).keys.get(idx) == Some(&key),
            None => false,
        }
    }

    /// Ids of all points whose key lies in the closed interval `[l, r]`,
    /// ascending by key; ties keep leaf-storage order.
    ///
    /// An empty tree or an inverted interval yields an empty vec.
    pub fn search_range(&self, l: f32, r: f32) -> Vec<u32> {
        let Some((mut leaf_id, mut idx)) = self.lower_bound(l) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        loop {
            let leaf = self.leaf(leaf_id);
            while idx < leaf.keys.len() {
                if leaf.keys[idx] > r {
                    return result;
                }
                result.push(leaf.ids[idx]);
                idx += 1;
            }
            match leaf.next {
                Some(next) => {
                    leaf_id = next;
                    idx = 0;
                }
                None => return result,
            }
        }
    }
}

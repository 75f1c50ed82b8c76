//! Bottom-up bulk loading.
//!
//! The dataset is sorted once by continuous key, packed into a leaf chain,
//! and internal levels are built over it until a single root remains. The
//! resulting tree is never rebalanced; it is read-only from here on.

use crate::bptree::node::{InternalNode, LeafNode, Node, NodeId};
use crate::bptree::BPlusTree;
use crate::dataset::PointSet;
use crate::error::{EngineError, Result};

impl BPlusTree {
    /// Bulk-load a tree over the continuous attribute of `points`.
    ///
    /// Leaves receive `floor(2 * order * fill_factor)` keys each (at least
    /// one; the last leaf takes the remainder). Ties in the key keep input
    /// order, so ids stay ascending within a run of duplicates. An empty
    /// dataset yields a tree with no root.
    pub fn bulk_load(points: &PointSet, order: usize, fill_factor: f32) -> Result<Self> {
        if order == 0 {
            return Err(EngineError::InvalidParameter(
                "tree order must be at least 1".into(),
            ));
        }
        if !(fill_factor > 0.0 && fill_factor <= 1.0) {
            return Err(EngineError::InvalidParameter(format!(
                "fill factor {fill_factor} is outside (0, 1]"
            )));
        }

        let max_keys_per_leaf = 2 * order;
        let keys_per_leaf = ((max_keys_per_leaf as f32 * fill_factor) as usize).max(1);

        let mut pairs: Vec<(f32, u32)> = (0..points.len() as u32)
            .map(|id| (points.continuous(id), id))
            .collect();
        pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut nodes: Vec<Node> = Vec::new();

        // Leaf level: pack sorted pairs, chain siblings, remember the first
        // key of each non-first leaf as a separator for the level above.
        let mut level: Vec<NodeId> = Vec::new();
        let mut separators: Vec<f32> = Vec::new();
        let mut i = 0;
        while i < pairs.len() {
            let end = (i + keys_per_leaf).min(pairs.len());
            let leaf = LeafNode {
                keys: pairs[i..end].iter().map(|&(k, _)| k).collect(),
                ids: pairs[i..end].iter().map(|&(_, id)| id).collect(),
                next: None,
            };
            let id = nodes.len();
            if let Some(&prev) = level.last() {
                match &mut nodes[prev] {
                    Node::Leaf(prev_leaf) => prev_leaf.next = Some(id),
                    Node::Internal(_) => unreachable!("leaf level holds only leaves"),
                }
            }
            nodes.push(Node::Leaf(leaf));
            level.push(id);
            i = end;
            if i < pairs.len() {
                separators.push(pairs[i].0);
            }
        }

        // Internal levels: group children under parents. When the last key
        // slot of a parent would consume a separator that still has siblings
        // to its right, the separator is promoted to the level above instead,
        // so each separator appears exactly once across all ancestor levels.
        while level.len() > 1 {
            let mut next_level: Vec<NodeId> = Vec::new();
            let mut next_separators: Vec<f32> = Vec::new();

            let mut i = 0;
            while i < level.len() {
                let mut keys: Vec<f32> = Vec::new();
                let mut children: Vec<NodeId> = vec![level[i]];
                i += 1;

                for slot in 0..max_keys_per_leaf {
                    if i >= level.len() {
                        break;
                    }
                    if slot == max_keys_per_leaf - 1 && i < level.len() - 1 {
                        break;
                    }
                    keys.push(separators[i - 1]);
                    children.push(level[i]);
                    i += 1;
                }

                let id = nodes.len();
                nodes.push(Node::Internal(InternalNode { keys, children }));
                next_level.push(id);
                if i < level.len() - 1 {
                    next_separators.push(separators[i - 1]);
                }
            }

            level = next_level;
            separators = next_separators;
        }

        let root = level.first().copied();
        let tree = Self {
            order,
            nodes,
            root,
            len: pairs.len(),
        };
        tracing::debug!(
            keys = tree.len,
            depth = tree.depth(),
            order,
            "bulk load complete"
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bptree::node::Node;
    use crate::bptree::testutil::{points_from_keys, tiny_dataset};

    /// Collect the depth of every leaf by walking all root-to-leaf paths.
    fn leaf_depths(tree: &BPlusTree) -> Vec<usize> {
        let Some(root) = tree.root else {
            return Vec::new();
        };
        let mut depths = Vec::new();
        let mut stack = vec![(root, 1)];
        while let Some((id, depth)) = stack.pop() {
            match &tree.nodes[id] {
                Node::Leaf(_) => depths.push(depth),
                Node::Internal(internal) => {
                    for &child in &internal.children {
                        stack.push((child, depth + 1));
                    }
                }
            }
        }
        depths
    }

    #[test]
    fn test_tiny_bulk_load_leaf_sequence() {
        let points = tiny_dataset();
        let tree = BPlusTree::bulk_load(&points, 1, 1.0).unwrap();

        let entries = tree.leaf_entries();
        let keys: Vec<f32> = entries.iter().map(|&(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                3.0, 4.0, 6.0, 9.0, 10.0, 11.0, 12.0, 13.0, 20.0, 22.0, 23.0, 31.0, 35.0, 36.0,
                38.0, 38.0, 41.0, 44.0, 50.0, 70.0
            ]
        );
    }

    #[test]
    fn test_sort_consistency() {
        let points = tiny_dataset();
        let tree = BPlusTree::bulk_load(&points, 1, 1.0).unwrap();

        let entries = tree.leaf_entries();
        assert_eq!(entries.len(), points.len());
        for pair in entries.windows(2) {
            assert!(pair[0].0 <= pair[1].0, "leaf chain out of order: {pair:?}");
        }
        // Multiset of keys equals the dataset's continuous attributes.
        let mut from_tree: Vec<f32> = entries.iter().map(|&(k, _)| k).collect();
        let mut from_data: Vec<f32> =
            (0..points.len() as u32).map(|i| points.continuous(i)).collect();
        from_tree.sort_by(f32::total_cmp);
        from_data.sort_by(f32::total_cmp);
        assert_eq!(from_tree, from_data);
        // Every id appears exactly once.
        let mut ids: Vec<u32> = entries.iter().map(|&(_, id)| id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..points.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_duplicate_keys_keep_input_order() {
        let points = tiny_dataset();
        let tree = BPlusTree::bulk_load(&points, 1, 1.0).unwrap();
        let entries = tree.leaf_entries();
        let dup_ids: Vec<u32> = entries
            .iter()
            .filter(|&&(k, _)| k == 38.0)
            .map(|&(_, id)| id)
            .collect();
        assert_eq!(dup_ids, vec![0, 1]);
    }

    #[test]
    fn test_all_leaves_share_one_depth() {
        for order in [1usize, 2, 3] {
            let points = tiny_dataset();
            let tree = BPlusTree::bulk_load(&points, order, 1.0).unwrap();
            let depths = leaf_depths(&tree);
            assert!(!depths.is_empty());
            assert!(
                depths.iter().all(|&d| d == depths[0]),
                "order={order}: uneven leaf depths {depths:?}"
            );
            assert_eq!(depths[0], tree.depth());
        }
    }

    #[test]
    fn test_internal_fanout_and_separator_uniqueness() {
        let points = tiny_dataset();
        let tree = BPlusTree::bulk_load(&points, 1, 1.0).unwrap();

        let mut separator_count = 0;
        for (id, node) in tree.nodes.iter().enumerate() {
            if let Node::Internal(internal) = node {
                assert_eq!(internal.children.len(), internal.keys.len() + 1);
                if Some(id) != tree.root {
                    assert!(
                        internal.children.len() >= 2,
                        "non-root internal node with a single child"
                    );
                }
                separator_count += internal.keys.len();
            }
        }
        // One separator per leaf boundary, each appearing exactly once
        // across all internal levels.
        let leaf_count = tree
            .nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf(_)))
            .count();
        assert_eq!(separator_count, leaf_count - 1);
    }

    #[test]
    fn test_empty_dataset_has_no_root() {
        let points = points_from_keys(&[]);
        let tree = BPlusTree::bulk_load(&points, 1, 1.0).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_single_leaf_root() {
        let points = points_from_keys(&[
            (0.0, 5.0),
            (0.0, 1.0),
            (0.0, 9.0),
            (0.0, 3.0),
            (0.0, 7.0),
        ]);
        let tree = BPlusTree::bulk_load(&points, 100, 1.0).unwrap();
        assert_eq!(tree.depth(), 1);
        assert!(matches!(
            tree.nodes[tree.root.unwrap()],
            Node::Leaf(_)
        ));
        let keys: Vec<f32> = tree.leaf_entries().iter().map(|&(k, _)| k).collect();
        assert_eq!(keys, vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_fill_factor_shrinks_leaves() {
        let points = tiny_dataset();
        let full = BPlusTree::bulk_load(&points, 2, 1.0).unwrap();
        let half = BPlusTree::bulk_load(&points, 2, 0.5).unwrap();
        let count_leaves = |t: &BPlusTree| {
            t.nodes
                .iter()
                .filter(|n| matches!(n, Node::Leaf(_)))
                .count()
        };
        assert!(count_leaves(&half) > count_leaves(&full));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let points = tiny_dataset();
        assert!(BPlusTree::bulk_load(&points, 0, 1.0).is_err());
        assert!(BPlusTree::bulk_load(&points, 1, 0.0).is_err());
        assert!(BPlusTree::bulk_load(&points, 1, 1.5).is_err());
    }
}

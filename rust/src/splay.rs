//! The self-adjusting search index.
//!
//! Nodes are owned by a [`CompactArena`] and linked by [`NodeId`] handles.
//! Every access that finds or places a node rotates it to the root, so pages
//! touched in runs stay near the top of the tree. This module holds the type,
//! its rotations and the link-only in-order navigation; lookups, inserts and
//! removals live in their own modules.

use crate::compact_arena::{CompactArena, CompactArenaStats};
use crate::types::{natural_order, IndexNode, Key, KeyComparator, NodeId, NULL_NODE};

/// Ordered, key-unique index of arena-owned nodes.
///
/// # Examples
///
/// ```
/// use paged_containers::SplayIndex;
///
/// let mut index = SplayIndex::new();
/// let a = index.insert(20, "twenty").unwrap();
/// index.insert(10, "ten").unwrap();
///
/// assert_eq!(index.len(), 2);
/// assert_eq!(index.min().and_then(|id| index.key(id)), Some(10));
/// assert_eq!(index.next(index.min().unwrap()), Some(a));
/// ```
#[derive(Debug)]
pub struct SplayIndex<T> {
    pub(crate) arena: CompactArena<IndexNode<T>>,
    pub(crate) root: NodeId,
    pub(crate) min: NodeId,
    pub(crate) max: NodeId,
    pub(crate) count: usize,
    pub(crate) compare: KeyComparator,
}

// ============================================================================
// CONSTRUCTION AND SIZE
// ============================================================================

impl<T> SplayIndex<T> {
    /// An empty index ordered by natural key order.
    pub fn new() -> Self {
        Self::with_comparator(natural_order)
    }

    /// An empty index ordered by `compare`.
    pub fn with_comparator(compare: KeyComparator) -> Self {
        Self {
            arena: CompactArena::new(),
            root: NULL_NODE,
            min: NULL_NODE,
            max: NULL_NODE,
            count: 0,
            compare,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn root(&self) -> Option<NodeId> {
        handle(self.root)
    }

    /// Node with the smallest key, in O(1).
    pub fn min(&self) -> Option<NodeId> {
        handle(self.min)
    }

    /// Node with the largest key, in O(1).
    pub fn max(&self) -> Option<NodeId> {
        handle(self.max)
    }

    /// Whether `id` refers to a live node of this index.
    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    /// Releases every node.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = NULL_NODE;
        self.min = NULL_NODE;
        self.max = NULL_NODE;
        self.count = 0;
    }

    pub fn arena_stats(&self) -> CompactArenaStats {
        self.arena.stats()
    }

    // ============================================================================
    // NAVIGATION
    // ============================================================================

    /// In-order successor of `id`, using the node links only.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        if !self.arena.contains(id) {
            return None;
        }
        let right = self.arena[id].right;
        if right != NULL_NODE {
            return Some(self.leftmost(right));
        }

        let mut child = id;
        let mut parent = self.arena[id].parent;
        while parent != NULL_NODE && self.arena[parent].right == child {
            child = parent;
            parent = self.arena[parent].parent;
        }
        handle(parent)
    }

    /// In-order predecessor of `id`, using the node links only.
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        if !self.arena.contains(id) {
            return None;
        }
        let left = self.arena[id].left;
        if left != NULL_NODE {
            return Some(self.rightmost(left));
        }

        let mut child = id;
        let mut parent = self.arena[id].parent;
        while parent != NULL_NODE && self.arena[parent].left == child {
            child = parent;
            parent = self.arena[parent].parent;
        }
        handle(parent)
    }

    /// Calls `f` for every node in key order.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(NodeId, Key, &T),
    {
        let mut current = self.min;
        while current != NULL_NODE {
            let node = &self.arena[current];
            f(current, node.key, &node.value);
            current = self.next(current).unwrap_or(NULL_NODE);
        }
    }

    pub(crate) fn leftmost(&self, mut id: NodeId) -> NodeId {
        while self.arena[id].left != NULL_NODE {
            id = self.arena[id].left;
        }
        id
    }

    pub(crate) fn rightmost(&self, mut id: NodeId) -> NodeId {
        while self.arena[id].right != NULL_NODE {
            id = self.arena[id].right;
        }
        id
    }

    // ============================================================================
    // SHAPE MAINTENANCE
    // ============================================================================

    /// Makes `new` take the place of `old` under `parent`.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent == NULL_NODE {
            self.root = new;
        } else if self.arena[parent].left == old {
            self.arena[parent].left = new;
        } else {
            self.arena[parent].right = new;
        }
    }

    /// Rotates `x` above its parent.
    fn rotate(&mut self, x: NodeId) {
        let parent = self.arena[x].parent;
        let grandparent = self.arena[parent].parent;

        if self.arena[parent].left == x {
            let inner = self.arena[x].right;
            self.arena[parent].left = inner;
            if inner != NULL_NODE {
                self.arena[inner].parent = parent;
            }
            self.arena[x].right = parent;
        } else {
            let inner = self.arena[x].left;
            self.arena[parent].right = inner;
            if inner != NULL_NODE {
                self.arena[inner].parent = parent;
            }
            self.arena[x].left = parent;
        }

        self.arena[parent].parent = x;
        self.arena[x].parent = grandparent;
        self.replace_child(grandparent, parent, x);
    }

    /// Moves `x` to the root through zig, zig-zig and zig-zag steps.
    pub(crate) fn splay(&mut self, x: NodeId) {
        while self.arena[x].parent != NULL_NODE {
            let parent = self.arena[x].parent;
            let grandparent = self.arena[parent].parent;

            if grandparent == NULL_NODE {
                self.rotate(x);
            } else if (self.arena[grandparent].left == parent) == (self.arena[parent].left == x) {
                self.rotate(parent);
                self.rotate(x);
            } else {
                self.rotate(x);
                self.rotate(x);
            }
        }
    }

    /// Depth of the deepest node; zero when empty.
    pub fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack = Vec::new();
        if self.root != NULL_NODE {
            stack.push((self.root, 1));
        }
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = &self.arena[id];
            for child in [node.left, node.right] {
                if child != NULL_NODE {
                    stack.push((child, depth + 1));
                }
            }
        }
        deepest
    }
}

impl<T> Default for SplayIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn handle(id: NodeId) -> Option<NodeId> {
    (id != NULL_NODE).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_in_order<T>(index: &SplayIndex<T>) -> Vec<Key> {
        let mut keys = Vec::new();
        index.walk(|_, key, _| keys.push(key));
        keys
    }

    #[test]
    fn test_empty_index() {
        let index: SplayIndex<()> = SplayIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.root(), None);
        assert_eq!(index.min(), None);
        assert_eq!(index.max(), None);
        assert_eq!(index.height(), 0);
        assert_eq!(index.next(0), None);
    }

    #[test]
    fn test_navigation_both_ways() {
        let mut index = SplayIndex::new();
        for key in [50u64, 20, 80, 10, 30, 70, 90] {
            index.insert(key, key * 2).unwrap();
        }
        assert_eq!(keys_in_order(&index), vec![10, 20, 30, 50, 70, 80, 90]);

        let mut backward = Vec::new();
        let mut current = index.max();
        while let Some(id) = current {
            backward.push(index.key(id).unwrap());
            current = index.prev(id);
        }
        assert_eq!(backward, vec![90, 80, 70, 50, 30, 20, 10]);
    }

    #[test]
    fn test_splay_brings_node_to_root() {
        let mut index = SplayIndex::new();
        let ids: Vec<NodeId> = (0..32u64).map(|k| index.insert(k, ()).unwrap()).collect();
        // Sequential inserts leave the newest key at the root.
        assert_eq!(index.root(), Some(ids[31]));

        index.splay(ids[3]);
        assert_eq!(index.root(), Some(ids[3]));
        assert_eq!(index.arena[ids[3]].parent, NULL_NODE);
        assert_eq!(keys_in_order(&index), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_custom_comparator() {
        fn descending(a: &Key, b: &Key) -> std::cmp::Ordering {
            b.cmp(a)
        }
        let mut index = SplayIndex::with_comparator(descending);
        for key in [3u64, 1, 2] {
            index.insert(key, ()).unwrap();
        }
        assert_eq!(keys_in_order(&index), vec![3, 2, 1]);
        assert_eq!(index.min().and_then(|id| index.key(id)), Some(3));
    }

    #[test]
    fn test_clear() {
        let mut index = SplayIndex::new();
        for key in 0..10u64 {
            index.insert(key, key).unwrap();
        }
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.min(), None);
        assert_eq!(index.arena_stats().allocated_count, 0);
        index.insert(5, 5).unwrap();
        assert_eq!(index.len(), 1);
    }
}

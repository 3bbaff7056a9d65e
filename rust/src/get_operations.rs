//! GET operations for SplayIndex.
//!
//! `find` is the self-adjusting lookup: a hit is splayed to the root. `lookup`
//! answers the same question through a shared borrow and leaves the shape
//! alone; iterators and `&self` queries use it.

use std::cmp::Ordering;

use crate::splay::SplayIndex;
use crate::types::{Key, NodeId, NULL_NODE};

impl<T> SplayIndex<T> {
    // ============================================================================
    // PUBLIC GET OPERATIONS
    // ============================================================================

    /// Exact-match search that splays the hit to the root.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    ///
    /// # Returns
    ///
    /// The node holding `key`, or `None`. A miss does not change the shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use paged_containers::SplayIndex;
    ///
    /// let mut index = SplayIndex::new();
    /// for key in 1..=5u64 {
    ///     index.insert(key, key * 10).unwrap();
    /// }
    /// let hit = index.find(2).unwrap();
    /// assert_eq!(index.root(), Some(hit));
    /// assert_eq!(index.find(9), None);
    /// ```
    pub fn find(&mut self, key: Key) -> Option<NodeId> {
        let id = self.lookup(key)?;
        self.splay(id);
        Some(id)
    }

    /// Exact-match search without restructuring.
    pub fn lookup(&self, key: Key) -> Option<NodeId> {
        let mut current = self.root;
        while current != NULL_NODE {
            let node = &self.arena[current];
            current = match (self.compare)(&key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(current),
            };
        }
        None
    }

    /// Key of a live node.
    pub fn key(&self, id: NodeId) -> Option<Key> {
        self.arena.get(id).map(|node| node.key)
    }

    /// Payload of a live node.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|node| &mut node.value)
    }

    /// Payload stored under `key`, splaying it on a hit.
    pub fn find_value(&mut self, key: Key) -> Option<&mut T> {
        let id = self.find(key)?;
        self.get_mut(id)
    }
}

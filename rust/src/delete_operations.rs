//! DELETE operations for SplayIndex.
//!
//! Removal is the standard search-tree deletion with in-order successor
//! promotion for two-child nodes, followed by a splay of the former parent
//! (or the promoted successor). The cached extrema are advanced before any
//! link changes, while the neighbour is still reachable.

use crate::error::{ContainerError, IndexResult};
use crate::splay::SplayIndex;
use crate::types::{Direction, Key, NodeId, NULL_NODE};

impl<T> SplayIndex<T> {
    /// Detaches and releases `id`, returning its payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use paged_containers::SplayIndex;
    ///
    /// let mut index = SplayIndex::new();
    /// let id = index.insert(1, "one").unwrap();
    /// index.insert(2, "two").unwrap();
    /// assert_eq!(index.remove(id), Ok("one"));
    /// assert!(index.remove(id).is_err());
    /// assert_eq!(index.len(), 1);
    /// ```
    pub fn remove(&mut self, id: NodeId) -> IndexResult<T> {
        if !self.arena.contains(id) {
            return Err(ContainerError::invalid_handle("remove", id));
        }

        if self.min == id {
            self.min = self.next(id).unwrap_or(NULL_NODE);
        }
        if self.max == id {
            self.max = self.prev(id).unwrap_or(NULL_NODE);
        }

        let (left, right, parent) = {
            let node = &self.arena[id];
            (node.left, node.right, node.parent)
        };

        let splay_from = if left == NULL_NODE {
            self.transplant(id, right);
            parent
        } else if right == NULL_NODE {
            self.transplant(id, left);
            parent
        } else {
            let successor = self.leftmost(right);
            if self.arena[successor].parent != id {
                let successor_right = self.arena[successor].right;
                self.transplant(successor, successor_right);
                self.arena[successor].right = right;
                self.arena[right].parent = successor;
            }
            self.transplant(id, successor);
            self.arena[successor].left = left;
            self.arena[left].parent = successor;
            successor
        };

        let node = self
            .arena
            .deallocate(id)
            .ok_or_else(|| ContainerError::invalid_handle("remove", id))?;
        self.count -= 1;

        if splay_from != NULL_NODE {
            self.splay(splay_from);
        }
        Ok(node.value)
    }

    /// Removes the node holding `key`, if any.
    pub fn remove_key(&mut self, key: Key) -> Option<T> {
        let id = self.lookup(key)?;
        self.remove(id).ok()
    }

    /// Keeps only the nodes for which `keep` returns true; returns how many
    /// were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(Key, &mut T) -> bool,
    {
        let mut removed = 0;
        let mut cursor = self.cursor(Direction::Forward);
        while let Some(id) = cursor.next(self) {
            let kept = {
                let node = &mut self.arena[id];
                keep(node.key, &mut node.value)
            };
            if !kept && self.remove(id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Puts the subtree rooted at `new` where `old` was.
    fn transplant(&mut self, old: NodeId, new: NodeId) {
        let parent = self.arena[old].parent;
        self.replace_child(parent, old, new);
        if new != NULL_NODE {
            self.arena[new].parent = parent;
        }
    }
}

//! INSERT operations for SplayIndex.

use std::cmp::Ordering;

use crate::error::{ContainerError, IndexResult};
use crate::splay::SplayIndex;
use crate::types::{IndexNode, Key, NodeId, NULL_NODE};

impl<T> SplayIndex<T> {
    /// Places a new node under `key` and splays it to the root.
    ///
    /// # Returns
    ///
    /// The handle of the new node. An equal key already present fails with
    /// [`ContainerError::DuplicateKey`] and leaves the index untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use paged_containers::{ContainerError, SplayIndex};
    ///
    /// let mut index = SplayIndex::new();
    /// let id = index.insert(3, 'c').unwrap();
    /// assert_eq!(index.root(), Some(id));
    /// assert_eq!(index.insert(3, 'x'), Err(ContainerError::DuplicateKey(3)));
    /// ```
    pub fn insert(&mut self, key: Key, value: T) -> IndexResult<NodeId> {
        let mut parent = NULL_NODE;
        let mut current = self.root;
        let mut goes_left = false;

        while current != NULL_NODE {
            parent = current;
            let node = &self.arena[current];
            match (self.compare)(&key, &node.key) {
                Ordering::Less => {
                    goes_left = true;
                    current = node.left;
                }
                Ordering::Greater => {
                    goes_left = false;
                    current = node.right;
                }
                Ordering::Equal => return Err(ContainerError::duplicate_key(key)),
            }
        }

        let id = self.arena.try_allocate(IndexNode::new(key, value))?;
        self.arena[id].parent = parent;
        if parent == NULL_NODE {
            self.root = id;
        } else if goes_left {
            self.arena[parent].left = id;
        } else {
            self.arena[parent].right = id;
        }

        if self.min == NULL_NODE
            || (self.compare)(&key, &self.arena[self.min].key) == Ordering::Less
        {
            self.min = id;
        }
        if self.max == NULL_NODE
            || (self.compare)(&key, &self.arena[self.max].key) == Ordering::Greater
        {
            self.max = id;
        }
        self.count += 1;

        self.splay(id);
        Ok(id)
    }
}

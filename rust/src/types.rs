//! Core types shared by the splay index and the paged containers.
//!
//! Nodes live in a [`CompactArena`](crate::compact_arena::CompactArena) and
//! refer to each other through [`NodeId`] handles instead of references, so
//! removing a node can never leave a dangling link behind.

use std::cmp::Ordering;

// ============================================================================
// TYPE DEFINITIONS
// ============================================================================

/// Node ID type for arena-based allocation
pub type NodeId = u32;

/// Special node ID meaning "no node"
pub const NULL_NODE: NodeId = u32::MAX;

/// Opaque index key.
///
/// Keys are fixed at 64 bits regardless of the host pointer width, so the
/// serialized form is identical on every architecture.
pub type Key = u64;

/// Ordering function used by a [`SplayIndex`](crate::SplayIndex).
pub type KeyComparator = fn(&Key, &Key) -> Ordering;

/// Default comparator: natural integer order.
pub fn natural_order(a: &Key, b: &Key) -> Ordering {
    a.cmp(b)
}

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A node of the splay index.
///
/// The three links are handles into the owning arena. `parent` is kept
/// consistent with the children's `left`/`right` at all times.
#[derive(Debug, Clone)]
pub struct IndexNode<T> {
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    pub(crate) parent: NodeId,
    pub(crate) key: Key,
    pub(crate) value: T,
}

impl<T> IndexNode<T> {
    /// Creates an unlinked node.
    pub fn new(key: Key, value: T) -> Self {
        Self {
            left: NULL_NODE,
            right: NULL_NODE,
            parent: NULL_NODE,
            key,
            value,
        }
    }

    /// The node's key.
    pub fn key(&self) -> Key {
        self.key
    }

    /// The node's payload.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Iteration direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// The opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

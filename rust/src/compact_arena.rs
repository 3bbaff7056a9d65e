//! Slot storage for index nodes.
//!
//! Released slots are emptied and go on a free list, so a stale handle finds
//! an empty slot rather than someone else's node until the slot is reused.

use std::ops::{Index, IndexMut};

use crate::error::{ContainerError, ContainerResult};
use crate::types::{NodeId, NULL_NODE};

/// Occupancy snapshot of an arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactArenaStats {
    pub total_capacity: usize,
    pub allocated_count: usize,
    pub free_count: usize,
    /// Live slots over reserved capacity.
    pub utilization: f64,
    /// Free-listed slots over all slots ever handed out.
    pub fragmentation: f64,
}

/// Arena owning every node of a [`SplayIndex`](crate::SplayIndex).
#[derive(Debug)]
pub struct CompactArena<T> {
    slots: Vec<Option<T>>,
    free: Vec<NodeId>,
    live_count: usize,
}

impl<T> CompactArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live_count: 0,
        }
    }

    /// Stores `item` and returns its handle, reusing a released slot first.
    ///
    /// Fails with [`ContainerError::AllocationError`] when the allocator
    /// refuses to grow the slot vector or the handle space is exhausted.
    pub fn try_allocate(&mut self, item: T) -> ContainerResult<NodeId> {
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(item);
                id
            }
            None => {
                let id = NodeId::try_from(self.slots.len())
                    .ok()
                    .filter(|&id| id != NULL_NODE)
                    .ok_or_else(|| {
                        ContainerError::allocation_error(
                            "arena slot",
                            "node handle space exhausted",
                        )
                    })?;
                self.slots
                    .try_reserve(1)
                    .map_err(|e| {
                        ContainerError::allocation_error("arena slot", &e.to_string())
                    })?;
                self.slots.push(Some(item));
                id
            }
        };
        self.live_count += 1;
        Ok(id)
    }

    /// Releases the slot behind `id` and hands back its content.
    pub fn deallocate(&mut self, id: NodeId) -> Option<T> {
        let item = self.slots.get_mut(id as usize)?.take()?;
        self.free.push(id);
        self.live_count -= 1;
        Some(item)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    /// Whether `id` names a live slot.
    pub fn contains(&self, id: NodeId) -> bool {
        id != NULL_NODE && self.slots.get(id as usize).is_some_and(Option::is_some)
    }

    pub fn stats(&self) -> CompactArenaStats {
        let total_capacity = self.slots.capacity();
        let allocated_count = self.live_count;
        let free_count = self.free.len();
        let utilization = if total_capacity > 0 {
            allocated_count as f64 / total_capacity as f64
        } else {
            0.0
        };
        let fragmentation = if self.slots.is_empty() {
            0.0
        } else {
            free_count as f64 / self.slots.len() as f64
        };

        CompactArenaStats {
            total_capacity,
            allocated_count,
            free_count,
            utilization,
            fragmentation,
        }
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Drops every node; all outstanding handles become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live_count = 0;
    }
}

impl<T> Default for CompactArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Link traversal inside the index only follows live handles.
impl<T> Index<NodeId> for CompactArena<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: NodeId) -> &T {
        match self.slots.get(id as usize) {
            Some(Some(item)) => item,
            _ => panic!("stale node handle {}", id),
        }
    }
}

impl<T> IndexMut<NodeId> for CompactArena<T> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        match self.slots.get_mut(id as usize) {
            Some(Some(item)) => item,
            _ => panic!("stale node handle {}", id),
        }
    }
}

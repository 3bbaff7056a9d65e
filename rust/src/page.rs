//! Page payloads stored in the splay index of each container.
//!
//! A page is zero-filled when it is allocated and only then linked into the
//! index, so no page is ever observed partially valid.

use crate::bitmap::PageBitmap;
use crate::construction::Geometry;
use crate::error::{ContainerError, ContainerResult};
use crate::persist::ContainerKind;
use crate::types::{NodeId, NULL_NODE};

/// Allocates `len` zero bytes, reporting allocator refusal as an error.
pub(crate) fn zeroed_bytes(len: usize) -> ContainerResult<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|e| {
            ContainerError::allocation_error(&format!("{} byte page", len), &e.to_string())
        })?;
    bytes.resize(len, 0);
    Ok(bytes)
}

/// A page of a [`SparseArray`](crate::SparseArray).
#[derive(Debug, Clone)]
pub struct ArrayPage {
    pub(crate) tag: [u8; 4],
    /// Handle of the index node holding this page; diagnostic only.
    pub(crate) echo: NodeId,
    pub(crate) bitmap: PageBitmap,
    pub(crate) data: Vec<u8>,
}

impl ArrayPage {
    pub(crate) fn allocate(geometry: &Geometry) -> ContainerResult<Self> {
        Ok(Self {
            tag: ContainerKind::Array.page_tag(),
            echo: NULL_NODE,
            bitmap: PageBitmap::new(geometry.elem_num()),
            data: zeroed_bytes(geometry.data_size())?,
        })
    }

    pub(crate) fn from_parts(geometry: &Geometry, bitmap: &[u8], data: Vec<u8>) -> Self {
        Self {
            tag: ContainerKind::Array.page_tag(),
            echo: NULL_NODE,
            bitmap: PageBitmap::from_bytes(bitmap, geometry.elem_num()),
            data,
        }
    }

    /// Whether `slot` holds a written element.
    pub fn is_set(&self, slot: usize) -> bool {
        self.bitmap.get(slot)
    }

    /// Bytes of `slot`, initialized or not.
    pub fn slot(&self, slot: usize, elem_size: usize) -> &[u8] {
        &self.data[slot * elem_size..(slot + 1) * elem_size]
    }

    pub(crate) fn slots_mut(&mut self, slot: usize, count: usize, elem_size: usize) -> &mut [u8] {
        &mut self.data[slot * elem_size..(slot + count) * elem_size]
    }

    /// Initialized slots in this page.
    pub fn population(&self) -> usize {
        self.bitmap.count_ones()
    }
}

/// A page of a [`PagedVector`](crate::PagedVector).
#[derive(Debug, Clone)]
pub struct VectorPage {
    pub(crate) tag: [u8; 4],
    pub(crate) echo: NodeId,
    pub(crate) data: Vec<u8>,
}

impl VectorPage {
    pub(crate) fn allocate(geometry: &Geometry) -> ContainerResult<Self> {
        Ok(Self {
            tag: ContainerKind::Vector.page_tag(),
            echo: NULL_NODE,
            data: zeroed_bytes(geometry.data_size())?,
        })
    }

    pub(crate) fn from_data(data: Vec<u8>) -> Self {
        Self {
            tag: ContainerKind::Vector.page_tag(),
            echo: NULL_NODE,
            data,
        }
    }

    pub fn slot(&self, slot: usize, elem_size: usize) -> &[u8] {
        &self.data[slot * elem_size..(slot + 1) * elem_size]
    }

    pub(crate) fn slots_mut(&mut self, slot: usize, count: usize, elem_size: usize) -> &mut [u8] {
        &mut self.data[slot * elem_size..(slot + count) * elem_size]
    }

    /// Zeroes every slot from `slot` to the end of the page.
    pub(crate) fn zero_from(&mut self, slot: usize, elem_size: usize) {
        let start = (slot * elem_size).min(self.data.len());
        self.data[start..].fill(0);
    }
}

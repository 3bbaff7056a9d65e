//! Splay-indexed paged containers.
//!
//! This crate provides a self-adjusting search index ([`SplayIndex`]) and two
//! page-backed containers built on it: a [`SparseArray`] that allocates pages
//! on first touch and tracks initialized elements in a per-page bitmap, and a
//! [`PagedVector`] whose logical size drives page allocation. Both containers
//! save to and load from a portable byte stream and can be moved between
//! processes over a datagram [`Transport`].
//!
//! # Examples
//!
//! ```
//! use paged_containers::{PagedVector, SparseArray};
//!
//! let mut array = SparseArray::new(4).unwrap();
//! for index in [52u64, 53, 167, 223] {
//!     array.put_u32(index, index as u32).unwrap();
//! }
//! let indices: Vec<u64> = array.iter().map(|(index, _)| index).collect();
//! assert_eq!(indices, vec![52, 53, 167, 223]);
//!
//! let mut vector = PagedVector::new("table", 4).unwrap();
//! vector.resize(10).unwrap();
//! let mut saved = Vec::new();
//! vector.save(&mut saved).unwrap();
//! let loaded = PagedVector::load(&saved[..]).unwrap();
//! assert_eq!(loaded.size(), 10);
//! ```

#[macro_use]
mod macros;

mod array;
mod bitmap;
mod compact_arena;
mod construction;
mod delete_operations;
mod error;
mod get_operations;
mod hash;
mod insert_operations;
mod iteration;
mod page;
mod persist;
mod splay;
mod transport;
mod types;
mod validation;
mod vector;

#[cfg(test)]
mod proptests;

pub use array::SparseArray;
pub use bitmap::{bitmap_size, PageBitmap};
pub use compact_arena::{CompactArena, CompactArenaStats};
pub use construction::validation::{
    recommended_page_size, validate_elem_size, validate_name, validate_page_size,
};
pub use construction::{
    ArrayConfig, Geometry, VectorConfig, DEFAULT_ELEM_SIZE, DEFAULT_PAGE_SIZE, MAX_ELEM_SIZE,
    MAX_PAGE_SIZE, MIN_ELEM_SIZE, MIN_PAGE_SIZE, NAME_SIZE, PAGE_HEADER_SIZE,
};
pub use error::{
    ContainerError, ContainerResult, ContainerResultExt, IndexResult, InitResult, PersistResult,
};
pub use hash::{key_page, page_hash, page_key, page_unhash};
pub use iteration::{ArrayCursor, ArrayIter, IndexCursor, Iter, VectorIter};
pub use page::{ArrayPage, VectorPage};
pub use persist::{
    ContainerHeader, ContainerKind, Endian, FieldReader, FieldWriter, PageImage, PageRecord,
    PageSink, PageSource, StreamSink, StreamSource,
};
pub use splay::SplayIndex;
pub use transport::{
    ChannelTransport, DatagramSink, DatagramSource, Transport, DEFAULT_MAX_DATAGRAM,
};
pub use types::{natural_order, Direction, IndexNode, Key, KeyComparator, NodeId, NULL_NODE};
pub use vector::PagedVector;

//! Paged vector: dense, resizable, bounds-checked sequence of fixed-size
//! elements.
//!
//! The logical size drives the page set: after every resize exactly
//! `ceil(size / elem_num)` pages exist, numbered from zero, each indexed by
//! its hashed page number.

use std::io::{Read, Write};

use log::{debug, trace, warn};

use crate::construction::{Geometry, VectorConfig};
use crate::error::{
    ContainerError, ContainerResult, ContainerResultExt, InitResult, PersistResult,
};
use crate::hash::{key_page, page_key};
use crate::iteration::VectorIter;
use crate::page::VectorPage;
use crate::persist::{
    ContainerHeader, ContainerKind, Endian, PageImage, PageSink, PageSource, StreamSink,
    StreamSource,
};
use crate::splay::SplayIndex;
use crate::transport::{DatagramSink, DatagramSource, Transport};
use crate::types::{Direction, NodeId};

/// Dense sequence of fixed-size elements stored in pages.
///
/// # Examples
///
/// ```
/// use paged_containers::PagedVector;
///
/// let mut vector = PagedVector::new("offsets", 8).unwrap();
/// vector.resize(3000).unwrap();
/// vector.put_u64(2999, 42).unwrap();
/// assert_eq!(vector.get_u64(2999).unwrap(), 42);
/// assert_eq!(vector.pages(), 6);
/// assert!(vector.put_u64(3000, 1).is_err());
/// ```
#[derive(Debug)]
pub struct PagedVector {
    pub(crate) name: String,
    pub(crate) geometry: Geometry,
    pub(crate) endian: Endian,
    /// Logical element count.
    pub(crate) size: u64,
    pub(crate) index: SplayIndex<VectorPage>,
}

impl PagedVector {
    // ============================================================================
    // CONSTRUCTION
    // ============================================================================

    /// An empty vector with the default page size.
    pub fn new(name: &str, elem_size: usize) -> InitResult<Self> {
        Self::from_config(VectorConfig::new(name, elem_size))
    }

    pub fn with_page_size(name: &str, elem_size: usize, page_size: usize) -> InitResult<Self> {
        Self::from_config(VectorConfig::new(name, elem_size).with_page_size(page_size))
    }

    pub fn from_config(config: VectorConfig) -> InitResult<Self> {
        let geometry = config.geometry()?;
        debug!(
            "vector '{}' created: elem_size={} page_size={} elem_num={}",
            config.name,
            geometry.elem_size(),
            geometry.page_size(),
            geometry.elem_num()
        );
        Ok(Self {
            name: config.name,
            geometry,
            endian: config.endian,
            size: 0,
            index: SplayIndex::new(),
        })
    }

    // ============================================================================
    // ELEMENT ACCESS
    // ============================================================================

    /// Writes one element inside the logical size.
    pub fn put(&mut self, index: u64, bytes: &[u8]) -> ContainerResult<()> {
        self.put_many(index, bytes, 1)
    }

    /// Writes `count` contiguous elements; the whole run must lie inside the
    /// logical size.
    pub fn put_many(&mut self, index: u64, bytes: &[u8], count: usize) -> ContainerResult<()> {
        let elem_size = self.geometry.elem_size();
        self.check_buffer("put_many", bytes.len(), count)?;
        self.check_bounds(index, count)?;

        let mut done = 0;
        while done < count {
            let (page_no, slot) = self.geometry.locate(index + done as u64);
            let run = (count - done).min(self.geometry.elem_num() - slot);
            let id = self.page_id(page_no)?;
            self.page_mut(id)?
                .slots_mut(slot, run, elem_size)
                .copy_from_slice(&bytes[done * elem_size..(done + run) * elem_size]);
            done += run;
        }
        Ok(())
    }

    /// Reads one element inside the logical size.
    pub fn get(&mut self, index: u64, out: &mut [u8]) -> ContainerResult<()> {
        self.get_many(index, out, 1)
    }

    /// Reads `count` contiguous elements into `out`.
    pub fn get_many(&mut self, index: u64, out: &mut [u8], count: usize) -> ContainerResult<()> {
        let elem_size = self.geometry.elem_size();
        self.check_buffer("get_many", out.len(), count)?;
        self.check_bounds(index, count)?;

        let mut done = 0;
        while done < count {
            let (page_no, slot) = self.geometry.locate(index + done as u64);
            let run = (count - done).min(self.geometry.elem_num() - slot);
            let id = self.page_id(page_no)?;
            let page = self.page_mut(id)?;
            out[done * elem_size..(done + run) * elem_size]
                .copy_from_slice(&page.data[slot * elem_size..(slot + run) * elem_size]);
            done += run;
        }
        Ok(())
    }

    /// Borrowed view of one element.
    pub fn at(&mut self, index: u64) -> ContainerResult<&[u8]> {
        let elem_size = self.geometry.elem_size();
        self.check_bounds(index, 1)?;
        let (page_no, slot) = self.geometry.locate(index);
        let id = self.page_id(page_no)?;
        Ok(self.page_mut(id)?.slot(slot, elem_size))
    }

    // ============================================================================
    // RESIZING
    // ============================================================================

    /// Sets the logical size, allocating or releasing whole pages.
    ///
    /// Growth allocates every missing page or none of them. Shrinking
    /// releases trailing pages and zeroes the dropped slots of the last page
    /// kept, so growing again exposes zeroed elements. `resize(0)` releases
    /// everything.
    pub fn resize(&mut self, new_size: u64) -> ContainerResult<()> {
        if new_size == 0 {
            self.release();
            return Ok(());
        }

        let old_pages = self.index.len() as u64;
        let new_pages = self.geometry.pages_for(new_size);
        page_key(new_pages - 1).with_operation("resize")?;

        if new_pages > old_pages {
            for page_no in old_pages..new_pages {
                if let Err(e) = self.allocate_page(page_no) {
                    for allocated in (old_pages..page_no).rev() {
                        if let Err(undo) = self.release_page(allocated) {
                            warn!(
                                "vector '{}' kept page {} after a failed grow: {}",
                                self.name, allocated, undo
                            );
                        }
                    }
                    return Err(e).with_operation("resize");
                }
            }
        } else {
            for page_no in (new_pages..old_pages).rev() {
                self.release_page(page_no)?;
            }
        }

        debug!(
            "vector '{}' resized: {} -> {} elements, {} -> {} pages",
            self.name, self.size, new_size, old_pages, new_pages
        );
        let shrunk = new_size < self.size;
        self.size = new_size;
        if shrunk {
            self.zero_tail()?;
        }
        Ok(())
    }

    /// Releases every page; the vector keeps its name and geometry.
    pub fn clear(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.index.is_empty() {
            debug!(
                "vector '{}' released: {} pages",
                self.name,
                self.index.len()
            );
        }
        self.index.clear();
        self.size = 0;
    }

    fn allocate_page(&mut self, page_no: u64) -> ContainerResult<()> {
        let key = page_key(page_no)?;
        let page = VectorPage::allocate(&self.geometry)?;
        let id = self.index.insert(key, page)?;
        self.page_mut(id)?.echo = id;
        trace!("vector page {} allocated as node {}", page_no, id);
        Ok(())
    }

    fn release_page(&mut self, page_no: u64) -> ContainerResult<()> {
        let key = page_key(page_no)?;
        let id = self.index.lookup(key).ok_or_else(|| {
            ContainerError::corrupted("vector", &format!("page {} is not indexed", page_no))
        })?;
        self.index.remove(id)?;
        trace!("vector page {} released", page_no);
        Ok(())
    }

    // ============================================================================
    // SIZE AND GEOMETRY
    // ============================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical element count.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Allocated pages.
    pub fn pages(&self) -> usize {
        self.index.len()
    }

    /// Elements the allocated pages can hold.
    pub fn capacity(&self) -> u64 {
        self.index.len() as u64 * self.geometry.elem_num() as u64
    }

    pub fn elem_size(&self) -> usize {
        self.geometry.elem_size()
    }

    pub fn page_size(&self) -> usize {
        self.geometry.page_size()
    }

    /// Elements per page.
    pub fn elem_num(&self) -> usize {
        self.geometry.elem_num()
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    // ============================================================================
    // ITERATION
    // ============================================================================

    pub fn iter(&self) -> VectorIter<'_> {
        VectorIter::new(self, Direction::Forward)
    }

    pub fn iter_rev(&self) -> VectorIter<'_> {
        VectorIter::new(self, Direction::Backward)
    }

    // ============================================================================
    // PERSISTENCE AND TRANSFER
    // ============================================================================

    /// Writes the header and every page to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> PersistResult<()> {
        let mut sink = StreamSink::new(writer);
        self.emit(&mut sink).with_operation("save vector")?;
        debug!(
            "vector '{}' saved: {} pages, {} bytes",
            self.name,
            self.pages(),
            sink.written()
        );
        Ok(())
    }

    /// Reads a vector previously written by [`save`](Self::save).
    pub fn load<R: Read>(reader: R) -> PersistResult<Self> {
        let mut source =
            StreamSource::open(reader, ContainerKind::Vector).with_operation("load vector")?;
        let vector = Self::assemble(&mut source).with_operation("load vector")?;
        debug!(
            "vector '{}' loaded: {} elements in {} pages",
            vector.name,
            vector.size,
            vector.pages()
        );
        Ok(vector)
    }

    /// Sends the header, then one datagram per page.
    pub fn send<T: Transport + ?Sized>(&self, transport: &mut T) -> PersistResult<()> {
        let mut sink = DatagramSink::new(transport);
        self.emit(&mut sink).with_operation("send vector")?;
        debug!("vector '{}' sent: {} datagrams", self.name, sink.sent());
        Ok(())
    }

    /// Receives a vector sent by [`send`](Self::send).
    pub fn receive<T: Transport + ?Sized>(transport: &mut T) -> PersistResult<Self> {
        let mut source = DatagramSource::open(transport, ContainerKind::Vector)
            .with_operation("receive vector")?;
        let vector = Self::assemble(&mut source).with_operation("receive vector")?;
        debug!("vector '{}' received: {} elements", vector.name, vector.size);
        Ok(vector)
    }

    pub(crate) fn header(&self) -> ContainerHeader {
        ContainerHeader {
            kind: ContainerKind::Vector,
            version: ContainerHeader::VERSION,
            endian: self.endian,
            name: self.name.clone(),
            page_size: self.geometry.page_size() as u64,
            page_count: self.index.len() as u64,
            elem_size: self.geometry.elem_size() as u64,
            elem_num: self.geometry.elem_num() as u64,
            size: self.size,
            bounds: None,
        }
    }

    fn emit<S: PageSink + ?Sized>(&self, sink: &mut S) -> PersistResult<()> {
        sink.header(&self.header())?;
        for (key, page) in self.index.iter() {
            sink.page(
                ContainerKind::Vector,
                &PageImage {
                    key,
                    bitmap: Vec::new(),
                    data: &page.data,
                },
            )?;
        }
        sink.finish()
    }

    fn assemble<S: PageSource + ?Sized>(source: &mut S) -> PersistResult<Self> {
        let header = source.header().clone();
        let geometry = *source.geometry();
        let expected_pages = geometry.pages_for(header.size);
        if header.page_count != expected_pages {
            return Err(ContainerError::corrupted(
                "vector header",
                &format!(
                    "{} pages stored for {} elements, expected {}",
                    header.page_count, header.size, expected_pages
                ),
            ));
        }

        let mut vector = Self {
            name: header.name.clone(),
            geometry,
            endian: header.endian,
            size: header.size,
            index: SplayIndex::new(),
        };

        while let Some(record) = source.next_page()? {
            match key_page(record.key) {
                Some(page_no) if page_no < expected_pages => {}
                _ => {
                    return Err(ContainerError::corrupted(
                        "vector page",
                        &format!(
                            "key {:#x} names no page below {}",
                            record.key, expected_pages
                        ),
                    ))
                }
            }
            let id = vector.index.insert(record.key, VectorPage::from_data(record.data))?;
            vector.page_mut(id)?.echo = id;
        }
        // Bytes past the logical end are not data; a writer may leave anything there.
        vector.zero_tail()?;
        Ok(vector)
    }

    // ============================================================================
    // HELPERS
    // ============================================================================

    /// Zeroes the slots of the last page that lie past the logical size.
    fn zero_tail(&mut self) -> ContainerResult<()> {
        let (last_page, tail) = self.geometry.locate(self.size);
        // A tail of zero means the size ends on a page boundary.
        if tail != 0 {
            let elem_size = self.geometry.elem_size();
            let id = self.page_id(last_page)?;
            self.page_mut(id)?.zero_from(tail, elem_size);
        }
        Ok(())
    }

    fn page_id(&mut self, page_no: u64) -> ContainerResult<NodeId> {
        let key = page_key(page_no)?;
        self.index.find(key).ok_or_else(|| {
            ContainerError::corrupted("vector", &format!("page {} is not indexed", page_no))
        })
    }

    fn page_mut(&mut self, id: NodeId) -> ContainerResult<&mut VectorPage> {
        self.index
            .get_mut(id)
            .ok_or_else(|| ContainerError::invalid_handle("vector page", id))
    }

    fn check_buffer(&self, operation: &str, len: usize, count: usize) -> ContainerResult<()> {
        let expected = count.checked_mul(self.geometry.elem_size());
        if expected != Some(len) {
            return Err(ContainerError::invalid_argument(
                operation,
                &format!(
                    "buffer of {} bytes for {} elements of {} bytes",
                    len,
                    count,
                    self.geometry.elem_size()
                ),
            ));
        }
        Ok(())
    }

    fn check_bounds(&self, index: u64, count: usize) -> ContainerResult<()> {
        let end = index
            .checked_add(count as u64)
            .ok_or_else(|| ContainerError::overflow("vector access", index, count as u64))?;
        if end > self.size {
            return Err(ContainerError::out_of_bounds(index, count as u64, self.size));
        }
        Ok(())
    }
}

impl_typed_accessors!(PagedVector: u8, u16, u32, u64, i32, i64);

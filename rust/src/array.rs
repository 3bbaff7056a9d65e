//! Sparse array: unbounded element index, pages allocated on first touch.
//!
//! Element `i` lives in page `i / elem_num` at slot `i % elem_num`. Pages are
//! found through a [`SplayIndex`] keyed by the hashed page number, and every
//! page carries a bitmap of which of its slots have been written.

use std::io::{Read, Write};

use log::{debug, trace};

use crate::construction::{ArrayConfig, Geometry};
use crate::error::{ContainerError, ContainerResult, ContainerResultExt, InitResult, PersistResult};
use crate::hash::{key_page, page_key};
use crate::iteration::{ArrayCursor, ArrayIter};
use crate::page::ArrayPage;
use crate::persist::{
    ContainerHeader, ContainerKind, Endian, PageImage, PageSink, PageSource, StreamSink,
    StreamSource,
};
use crate::splay::SplayIndex;
use crate::transport::{DatagramSink, DatagramSource, Transport};
use crate::types::{Direction, NodeId};

/// Sparse mapping from a `u64` index to a fixed-size element.
///
/// # Examples
///
/// ```
/// use paged_containers::{ContainerError, SparseArray};
///
/// let mut array = SparseArray::new(4).unwrap();
/// array.put(1_000_000, &7u32.to_ne_bytes()).unwrap();
///
/// let mut out = [0u8; 4];
/// array.get(1_000_000, &mut out).unwrap();
/// assert_eq!(u32::from_ne_bytes(out), 7);
/// assert_eq!(array.get(5, &mut out), Err(ContainerError::UninitializedElement(5)));
/// assert_eq!(array.size(), 1);
/// ```
#[derive(Debug)]
pub struct SparseArray {
    pub(crate) geometry: Geometry,
    pub(crate) endian: Endian,
    /// Number of initialized elements.
    pub(crate) size: u64,
    /// Lowest and highest index ever resolved to a page.
    pub(crate) bounds: Option<(u64, u64)>,
    pub(crate) index: SplayIndex<ArrayPage>,
}

impl SparseArray {
    // ============================================================================
    // CONSTRUCTION
    // ============================================================================

    /// An empty array with the default page size.
    pub fn new(elem_size: usize) -> InitResult<Self> {
        Self::from_config(ArrayConfig::new(elem_size))
    }

    pub fn with_page_size(elem_size: usize, page_size: usize) -> InitResult<Self> {
        Self::from_config(ArrayConfig::new(elem_size).with_page_size(page_size))
    }

    pub fn from_config(config: ArrayConfig) -> InitResult<Self> {
        let geometry = config.geometry()?;
        debug!(
            "array created: elem_size={} page_size={} elem_num={}",
            geometry.elem_size(),
            geometry.page_size(),
            geometry.elem_num()
        );
        Ok(Self {
            geometry,
            endian: config.endian,
            size: 0,
            bounds: None,
            index: SplayIndex::new(),
        })
    }

    // ============================================================================
    // ELEMENT ACCESS
    // ============================================================================

    /// Writes one element.
    pub fn put(&mut self, index: u64, bytes: &[u8]) -> ContainerResult<()> {
        self.put_many(index, bytes, 1)
    }

    /// Writes `count` contiguous elements starting at `index`.
    ///
    /// `bytes` must hold exactly `count * elem_size` bytes. Pages are
    /// allocated as needed and each newly set bit counts one more
    /// initialized element.
    pub fn put_many(&mut self, index: u64, bytes: &[u8], count: usize) -> ContainerResult<()> {
        let elem_size = self.geometry.elem_size();
        self.check_buffer("put_many", bytes.len(), count)?;
        if count == 0 {
            return Ok(());
        }
        self.check_span("put_many", index, count)?;

        let mut done = 0;
        while done < count {
            let at = index + done as u64;
            let (page_no, slot) = self.geometry.locate(at);
            let run = (count - done).min(self.geometry.elem_num() - slot);
            let id = self.page_for(page_no)?;
            self.widen(at, at + run as u64 - 1);

            let page = self.page_mut(id)?;
            let mut fresh = 0;
            for s in slot..slot + run {
                if !page.bitmap.set(s, true) {
                    fresh += 1;
                }
            }
            page.slots_mut(slot, run, elem_size)
                .copy_from_slice(&bytes[done * elem_size..(done + run) * elem_size]);

            self.size += fresh;
            done += run;
        }
        Ok(())
    }

    /// Reads one element into `out`.
    pub fn get(&mut self, index: u64, out: &mut [u8]) -> ContainerResult<()> {
        self.get_many(index, out, 1)
    }

    /// Reads `count` contiguous elements starting at `index` into `out`.
    ///
    /// Touching a page that does not exist yet allocates it. The first unset
    /// element fails the call with [`ContainerError::UninitializedElement`];
    /// elements before it have already been copied.
    pub fn get_many(&mut self, index: u64, out: &mut [u8], count: usize) -> ContainerResult<()> {
        let elem_size = self.geometry.elem_size();
        self.check_buffer("get_many", out.len(), count)?;
        if count == 0 {
            return Ok(());
        }
        self.check_span("get_many", index, count)?;

        let mut done = 0;
        while done < count {
            let at = index + done as u64;
            let (page_no, slot) = self.geometry.locate(at);
            let run = (count - done).min(self.geometry.elem_num() - slot);
            let id = self.page_for(page_no)?;
            self.widen(at, at + run as u64 - 1);

            let page = self.page_mut(id)?;
            if let Some(unset) = (slot..slot + run).find(|&s| !page.is_set(s)) {
                let copied = unset - slot;
                out[done * elem_size..(done + copied) * elem_size]
                    .copy_from_slice(&page.data[slot * elem_size..unset * elem_size]);
                return Err(ContainerError::uninitialized(at + copied as u64));
            }
            out[done * elem_size..(done + run) * elem_size]
                .copy_from_slice(&page.data[slot * elem_size..(slot + run) * elem_size]);
            done += run;
        }
        Ok(())
    }

    /// Borrowed view of one initialized element.
    pub fn at(&mut self, index: u64) -> ContainerResult<&[u8]> {
        let elem_size = self.geometry.elem_size();
        let (page_no, slot) = self.geometry.locate(index);
        let id = self.page_for(page_no)?;
        self.widen(index, index);

        let page = self.page_mut(id)?;
        if !page.is_set(slot) {
            return Err(ContainerError::uninitialized(index));
        }
        Ok(page.slot(slot, elem_size))
    }

    /// Whether `index` holds a written element. Never allocates.
    pub fn status(&self, index: u64) -> bool {
        let (page_no, slot) = self.geometry.locate(index);
        page_key(page_no)
            .ok()
            .and_then(|key| self.index.lookup(key))
            .and_then(|id| self.index.get(id))
            .is_some_and(|page| page.is_set(slot))
    }

    /// Overwrites the initialized bit of `index` without touching its bytes
    /// and returns the previous bit. Allocates the page if needed.
    pub fn set_status(&mut self, index: u64, set: bool) -> ContainerResult<bool> {
        let (page_no, slot) = self.geometry.locate(index);
        let id = self.page_for(page_no)?;
        self.widen(index, index);

        let previous = self.page_mut(id)?.bitmap.set(slot, set);
        match (previous, set) {
            (false, true) => self.size += 1,
            (true, false) => self.size -= 1,
            _ => {}
        }
        Ok(previous)
    }

    /// Releases every page and forgets the touched range.
    pub fn clear(&mut self) {
        self.index.clear();
        self.size = 0;
        self.bounds = None;
        debug!("array released");
    }

    // ============================================================================
    // SIZE AND GEOMETRY
    // ============================================================================

    /// Number of initialized elements.
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

    /// Width of the touched range, `high - low + 1`; zero when untouched.
    pub fn capacity(&self) -> u64 {
        self.bounds
            .map_or(0, |(low, high)| (high - low).saturating_add(1))
    }

    /// Lowest index ever touched.
    pub fn low(&self) -> Option<u64> {
        self.bounds.map(|(low, _)| low)
    }

    /// Highest index ever touched.
    pub fn high(&self) -> Option<u64> {
        self.bounds.map(|(_, high)| high)
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

    /// Byte order used by `save` and `send`.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    // ============================================================================
    // ITERATION
    // ============================================================================

    /// Initialized elements in ascending index order.
    pub fn iter(&self) -> ArrayIter<'_> {
        ArrayIter::new(self, Direction::Forward)
    }

    /// Initialized elements in descending index order.
    pub fn iter_rev(&self) -> ArrayIter<'_> {
        ArrayIter::new(self, Direction::Backward)
    }

    /// Delete-safe cursor over initialized indices.
    pub fn cursor(&self, direction: Direction) -> ArrayCursor {
        ArrayCursor::new(self, direction)
    }

    // ============================================================================
    // PERSISTENCE AND TRANSFER
    // ============================================================================

    /// Writes the header and every page to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> PersistResult<()> {
        let mut sink = StreamSink::new(writer);
        self.emit(&mut sink).with_operation("save array")?;
        debug!(
            "array saved: {} pages, {} elements, {} bytes",
            self.pages(),
            self.size,
            sink.written()
        );
        Ok(())
    }

    /// Reads an array previously written by [`save`](Self::save).
    pub fn load<R: Read>(reader: R) -> PersistResult<Self> {
        let mut source =
            StreamSource::open(reader, ContainerKind::Array).with_operation("load array")?;
        let array = Self::assemble(&mut source).with_operation("load array")?;
        debug!("array loaded: {} pages, {} elements", array.pages(), array.size);
        Ok(array)
    }

    /// Sends the header, then one datagram per page.
    pub fn send<T: Transport + ?Sized>(&self, transport: &mut T) -> PersistResult<()> {
        let mut sink = DatagramSink::new(transport);
        self.emit(&mut sink).with_operation("send array")?;
        debug!("array sent: {} datagrams", sink.sent());
        Ok(())
    }

    /// Receives an array sent by [`send`](Self::send).
    pub fn receive<T: Transport + ?Sized>(transport: &mut T) -> PersistResult<Self> {
        let mut source =
            DatagramSource::open(transport, ContainerKind::Array).with_operation("receive array")?;
        let array = Self::assemble(&mut source).with_operation("receive array")?;
        debug!("array received: {} pages, {} elements", array.pages(), array.size);
        Ok(array)
    }

    pub(crate) fn header(&self) -> ContainerHeader {
        ContainerHeader {
            kind: ContainerKind::Array,
            version: ContainerHeader::VERSION,
            endian: self.endian,
            name: String::new(),
            page_size: self.geometry.page_size() as u64,
            page_count: self.index.len() as u64,
            elem_size: self.geometry.elem_size() as u64,
            elem_num: self.geometry.elem_num() as u64,
            size: self.size,
            bounds: self.bounds,
        }
    }

    fn emit<S: PageSink + ?Sized>(&self, sink: &mut S) -> PersistResult<()> {
        sink.header(&self.header())?;
        for (key, page) in self.index.iter() {
            sink.page(
                ContainerKind::Array,
                &PageImage {
                    key,
                    bitmap: page.bitmap.to_bytes(self.geometry.bitmap_size()),
                    data: &page.data,
                },
            )?;
        }
        sink.finish()
    }

    fn assemble<S: PageSource + ?Sized>(source: &mut S) -> PersistResult<Self> {
        let header = source.header().clone();
        let geometry = *source.geometry();
        let mut array = Self {
            geometry,
            endian: header.endian,
            size: 0,
            bounds: header.bounds,
            index: SplayIndex::new(),
        };

        while let Some(record) = source.next_page()? {
            let page_no = key_page(record.key).ok_or_else(|| {
                ContainerError::corrupted(
                    "array page",
                    &format!("key {:#x} is not a page key", record.key),
                )
            })?;
            let page = ArrayPage::from_parts(&geometry, &record.bitmap, record.data);
            let population = page.population() as u64;
            // The touched range covers every initialized element, whatever the header says.
            let first = page.bitmap.first_set_from(0);
            if let (Some(first), Some(last)) = (first, page.bitmap.last_set_through(usize::MAX)) {
                let base = page_no * geometry.elem_num() as u64;
                array.widen(base + first as u64, base + last as u64);
            }
            let id = array.index.insert(record.key, page)?;
            if let Some(page) = array.index.get_mut(id) {
                page.echo = id;
            }
            array.size += population;
        }

        if array.size != header.size {
            return Err(ContainerError::corrupted(
                "array",
                &format!(
                    "header records {} elements, pages hold {}",
                    header.size, array.size
                ),
            ));
        }
        if array.bounds.is_none() && !array.index.is_empty() {
            return Err(ContainerError::corrupted(
                "array",
                "pages present without a touched range",
            ));
        }
        Ok(array)
    }

    // ============================================================================
    // PAGE RESOLUTION
    // ============================================================================

    /// Finds the page for `page_no`, allocating and linking a zeroed page on
    /// first touch.
    fn page_for(&mut self, page_no: u64) -> ContainerResult<NodeId> {
        let key = page_key(page_no)?;
        if let Some(id) = self.index.find(key) {
            return Ok(id);
        }

        let page = ArrayPage::allocate(&self.geometry)?;
        let id = self.index.insert(key, page)?;
        self.page_mut(id)?.echo = id;
        trace!("array page {} allocated as node {}", page_no, id);
        Ok(id)
    }

    fn page_mut(&mut self, id: NodeId) -> ContainerResult<&mut ArrayPage> {
        self.index
            .get_mut(id)
            .ok_or_else(|| ContainerError::invalid_handle("array page", id))
    }

    fn widen(&mut self, low: u64, high: u64) {
        self.bounds = Some(match self.bounds {
            Some((l, h)) => (l.min(low), h.max(high)),
            None => (low, high),
        });
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

    /// Fails before any page is touched if the last index of the span is not
    /// addressable.
    fn check_span(&self, operation: &str, index: u64, count: usize) -> ContainerResult<()> {
        let last = index
            .checked_add(count as u64 - 1)
            .ok_or_else(|| ContainerError::overflow(operation, index, count as u64))?;
        page_key(self.geometry.locate(last).0).map(|_| ())
    }
}

impl_typed_accessors!(SparseArray: u8, u16, u32, u64, i32, i64);

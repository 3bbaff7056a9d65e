//! Portable save/load format shared by both containers.
//!
//! A stream is one [`ContainerHeader`] followed by `page_count` pages in
//! ascending index-key order. Header and page fields are fixed-width
//! integers in the byte order named by the header flags; element bytes are
//! copied verbatim. Index linkage is process-local and is written as zero,
//! only the page key survives.

use std::io::{Read, Write};

use crate::construction::{Geometry, NAME_SIZE, PAGE_HEADER_SIZE};
use crate::error::{ContainerError, PersistResult};
use crate::page::zeroed_bytes;
use crate::types::Key;

const FLAG_LITTLE: u8 = 0b01;
const FLAG_BIG: u8 = 0b10;

/// Byte order of the integer fields in a saved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the running host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    fn flags(self) -> u8 {
        match self {
            Endian::Little => FLAG_LITTLE,
            Endian::Big => FLAG_BIG,
        }
    }

    fn from_flags(flags: u8) -> PersistResult<Self> {
        match flags & (FLAG_LITTLE | FLAG_BIG) {
            FLAG_LITTLE => Ok(Endian::Little),
            FLAG_BIG => Ok(Endian::Big),
            other => Err(ContainerError::corrupted(
                "header",
                &format!("byte order flags {:#04b} name neither or both orders", other),
            )),
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Self::native()
    }
}

/// The two container kinds sharing the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Vector,
}

impl ContainerKind {
    /// Identification bytes at the start of the header.
    pub fn magic(self) -> [u8; 4] {
        match self {
            ContainerKind::Array => *b"ARRY",
            ContainerKind::Vector => *b"VCTR",
        }
    }

    /// Tag at the start of every page.
    pub fn page_tag(self) -> [u8; 4] {
        match self {
            ContainerKind::Array => *b"ARPG",
            ContainerKind::Vector => *b"VCPG",
        }
    }

    /// Serialized size of one page.
    pub fn page_len(self, geometry: &Geometry) -> usize {
        PAGE_HEADER_SIZE + geometry.bitmap_size() + geometry.data_size()
    }
}

// ============================================================================
// FIELD CODEC
// ============================================================================

/// Writes fixed-width fields in a chosen byte order.
pub struct FieldWriter<W> {
    inner: W,
    endian: Endian,
    operation: &'static str,
    written: usize,
}

impl<W: Write> FieldWriter<W> {
    pub fn new(inner: W, endian: Endian, operation: &'static str) -> Self {
        Self {
            inner,
            endian,
            operation,
            written: 0,
        }
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Writes raw bytes, unaffected by byte order.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> PersistResult<()> {
        self.inner.write_all(bytes).map_err(|e| {
            ContainerError::io(
                &format!("{} at byte {}", self.operation, self.written),
                &e,
                bytes.len(),
            )
        })?;
        self.written += bytes.len();
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> PersistResult<()> {
        self.inner
            .flush()
            .map_err(|e| ContainerError::io(self.operation, &e, self.written))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads fixed-width fields in a chosen byte order.
pub struct FieldReader<R> {
    inner: R,
    endian: Endian,
    operation: &'static str,
    consumed: usize,
}

impl<R: Read> FieldReader<R> {
    pub fn new(inner: R, operation: &'static str) -> Self {
        Self {
            inner,
            endian: Endian::native(),
            operation,
            consumed: 0,
        }
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Fills `buf` completely or fails with an `Io` error; a short stream
    /// reports `UnexpectedEof`.
    pub fn take_exact(&mut self, buf: &mut [u8]) -> PersistResult<()> {
        self.inner.read_exact(buf).map_err(|e| {
            ContainerError::io(
                &format!("{} at byte {}", self.operation, self.consumed),
                &e,
                buf.len(),
            )
        })?;
        self.consumed += buf.len();
        Ok(())
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl_field_codec!(u8, u32, u64);

// ============================================================================
// HEADER
// ============================================================================

/// Identification and geometry of a saved container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub kind: ContainerKind,
    pub version: (u8, u8, u8),
    pub endian: Endian,
    pub name: String,
    pub page_size: u64,
    pub page_count: u64,
    pub elem_size: u64,
    pub elem_num: u64,
    pub size: u64,
    /// Lowest and highest touched index; arrays only.
    pub bounds: Option<(u64, u64)>,
}

impl ContainerHeader {
    /// Current format version.
    pub const VERSION: (u8, u8, u8) = (1, 0, 0);

    /// Encoded size of a header of the given kind.
    pub fn encoded_len(kind: ContainerKind) -> usize {
        let base = 4 + 4 + NAME_SIZE + 5 * 8;
        match kind {
            ContainerKind::Array => base + 2 * 8,
            ContainerKind::Vector => base,
        }
    }

    pub fn encode<W: Write>(&self, w: &mut FieldWriter<W>) -> PersistResult<()> {
        w.set_endian(self.endian);
        w.put_bytes(&self.kind.magic())?;
        let (major, minor, patch) = self.version;
        w.put_bytes(&[major, minor, patch, self.endian.flags()])?;

        let mut name = [0u8; NAME_SIZE];
        let bytes = self.name.as_bytes();
        if bytes.len() > NAME_SIZE {
            return Err(ContainerError::invalid_argument(
                "encode header",
                &format!("name is {} bytes, field holds {}", bytes.len(), NAME_SIZE),
            ));
        }
        name[..bytes.len()].copy_from_slice(bytes);
        w.put_bytes(&name)?;

        w.put_u64(self.page_size)?;
        w.put_u64(self.page_count)?;
        w.put_u64(self.elem_size)?;
        w.put_u64(self.elem_num)?;
        w.put_u64(self.size)?;

        if self.kind == ContainerKind::Array {
            let (low, high) = self.bounds.unwrap_or((u64::MAX, 0));
            w.put_u64(low)?;
            w.put_u64(high)?;
        }
        Ok(())
    }

    /// Reads a header, checking identification and version.
    pub fn decode<R: Read>(r: &mut FieldReader<R>, kind: ContainerKind) -> PersistResult<Self> {
        let mut magic = [0u8; 4];
        r.take_exact(&mut magic)?;
        if magic != kind.magic() {
            return Err(ContainerError::tag_mismatch("header", &kind.magic(), &magic));
        }

        let mut ident = [0u8; 4];
        r.take_exact(&mut ident)?;
        let [major, minor, patch, flags] = ident;
        if major != Self::VERSION.0 {
            return Err(ContainerError::corrupted(
                "header",
                &format!(
                    "format version {}.{}.{} is not readable by {}.{}.{}",
                    major,
                    minor,
                    patch,
                    Self::VERSION.0,
                    Self::VERSION.1,
                    Self::VERSION.2
                ),
            ));
        }
        let endian = Endian::from_flags(flags)?;
        r.set_endian(endian);

        let mut name = [0u8; NAME_SIZE];
        r.take_exact(&mut name)?;
        let end = name.iter().position(|&b| b == 0).unwrap_or(NAME_SIZE);
        let name = String::from_utf8(name[..end].to_vec())
            .map_err(|e| ContainerError::corrupted("header name", &e.to_string()))?;

        let page_size = r.take_u64()?;
        let page_count = r.take_u64()?;
        let elem_size = r.take_u64()?;
        let elem_num = r.take_u64()?;
        let size = r.take_u64()?;

        let bounds = match kind {
            ContainerKind::Array => {
                let low = r.take_u64()?;
                let high = r.take_u64()?;
                if low == u64::MAX && high == 0 {
                    None
                } else if low > high {
                    return Err(ContainerError::corrupted(
                        "header",
                        &format!("low bound {} above high bound {}", low, high),
                    ));
                } else {
                    Some((low, high))
                }
            }
            ContainerKind::Vector => None,
        };

        Ok(Self {
            kind,
            version: (major, minor, patch),
            endian,
            name,
            page_size,
            page_count,
            elem_size,
            elem_num,
            size,
            bounds,
        })
    }

    /// Rebuilds the page layout named by the header and checks it against
    /// the stored element count per page.
    pub fn geometry(&self) -> PersistResult<Geometry> {
        let elem_size = usize::try_from(self.elem_size)
            .map_err(|_| ContainerError::corrupted("header", "element size overflows usize"))?;
        let page_size = usize::try_from(self.page_size)
            .map_err(|_| ContainerError::corrupted("header", "page size overflows usize"))?;

        let geometry = match self.kind {
            ContainerKind::Array => Geometry::for_array(elem_size, page_size),
            ContainerKind::Vector => Geometry::for_vector(elem_size, page_size),
        }
        .map_err(|e| ContainerError::corrupted("header", &e.to_string()))?;

        if geometry.elem_num() as u64 != self.elem_num {
            return Err(ContainerError::corrupted(
                "header",
                &format!(
                    "{} elements per page stored, geometry gives {}",
                    self.elem_num,
                    geometry.elem_num()
                ),
            ));
        }
        Ok(geometry)
    }
}

// ============================================================================
// PAGE CODEC
// ============================================================================

/// A page on its way out: key plus borrowed content.
#[derive(Debug)]
pub struct PageImage<'a> {
    pub key: Key,
    /// Serialized bitmap; empty for vector pages.
    pub bitmap: Vec<u8>,
    pub data: &'a [u8],
}

/// A page read back from a stream.
#[derive(Debug)]
pub struct PageRecord {
    pub key: Key,
    pub bitmap: Vec<u8>,
    pub data: Vec<u8>,
}

pub fn encode_page<W: Write>(
    w: &mut FieldWriter<W>,
    kind: ContainerKind,
    page: &PageImage<'_>,
) -> PersistResult<()> {
    w.put_bytes(&kind.page_tag())?;
    w.put_u32(0)?;
    // echo, left, right, parent
    for _ in 0..4 {
        w.put_u64(0)?;
    }
    w.put_u64(page.key)?;
    w.put_bytes(&page.bitmap)?;
    w.put_bytes(page.data)
}

pub fn decode_page<R: Read>(
    r: &mut FieldReader<R>,
    kind: ContainerKind,
    geometry: &Geometry,
) -> PersistResult<PageRecord> {
    let mut tag = [0u8; 4];
    r.take_exact(&mut tag)?;
    if tag != kind.page_tag() {
        return Err(ContainerError::tag_mismatch("page", &kind.page_tag(), &tag));
    }
    let _reserved = r.take_u32()?;
    for _ in 0..4 {
        r.take_u64()?;
    }
    let key = r.take_u64()?;

    let mut bitmap = zeroed_bytes(geometry.bitmap_size())?;
    r.take_exact(&mut bitmap)?;
    let mut data = zeroed_bytes(geometry.data_size())?;
    r.take_exact(&mut data)?;

    Ok(PageRecord { key, bitmap, data })
}

// ============================================================================
// SINKS AND SOURCES
// ============================================================================

/// Destination of a serialized container.
pub trait PageSink {
    fn header(&mut self, header: &ContainerHeader) -> PersistResult<()>;
    fn page(&mut self, kind: ContainerKind, page: &PageImage<'_>) -> PersistResult<()>;
    fn finish(&mut self) -> PersistResult<()>;
}

/// Origin of a serialized container.
pub trait PageSource {
    fn header(&self) -> &ContainerHeader;
    fn geometry(&self) -> &Geometry;
    /// Next page, or `None` once `page_count` pages have been produced.
    fn next_page(&mut self) -> PersistResult<Option<PageRecord>>;
}

/// Writes a container to a byte stream.
pub struct StreamSink<W> {
    writer: FieldWriter<W>,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: FieldWriter::new(writer, Endian::native(), "save"),
        }
    }

    pub fn written(&self) -> usize {
        self.writer.written()
    }
}

impl<W: Write> PageSink for StreamSink<W> {
    fn header(&mut self, header: &ContainerHeader) -> PersistResult<()> {
        header.encode(&mut self.writer)
    }

    fn page(&mut self, kind: ContainerKind, page: &PageImage<'_>) -> PersistResult<()> {
        encode_page(&mut self.writer, kind, page)
    }

    fn finish(&mut self) -> PersistResult<()> {
        self.writer.flush()
    }
}

/// Reads a container from a byte stream.
pub struct StreamSource<R> {
    reader: FieldReader<R>,
    header: ContainerHeader,
    geometry: Geometry,
    remaining: u64,
}

impl<R: Read> StreamSource<R> {
    /// Reads and validates the header; pages follow through `next_page`.
    pub fn open(reader: R, kind: ContainerKind) -> PersistResult<Self> {
        let mut reader = FieldReader::new(reader, "load");
        let header = ContainerHeader::decode(&mut reader, kind)?;
        let geometry = header.geometry()?;
        Ok(Self {
            reader,
            remaining: header.page_count,
            header,
            geometry,
        })
    }
}

impl<R: Read> PageSource for StreamSource<R> {
    fn header(&self) -> &ContainerHeader {
        &self.header
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn next_page(&mut self) -> PersistResult<Option<PageRecord>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let record = decode_page(&mut self.reader, self.header.kind, &self.geometry)?;
        self.remaining -= 1;
        Ok(Some(record))
    }
}

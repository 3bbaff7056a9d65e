//! Datagram transfer of whole containers between processes.
//!
//! A container goes out as its header in one datagram followed by one
//! datagram per page, using the same byte layout as `save`. The transport
//! itself is opaque: anything that can move bounded-size byte buffers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::construction::{Geometry, MAX_PAGE_SIZE};
use crate::error::{ContainerError, PersistResult};
use crate::persist::{
    decode_page, encode_page, ContainerHeader, ContainerKind, Endian, FieldReader, FieldWriter,
    PageImage, PageRecord, PageSink, PageSource,
};

/// Largest datagram a [`ChannelTransport`] accepts unless told otherwise.
pub const DEFAULT_MAX_DATAGRAM: usize = MAX_PAGE_SIZE;

/// Fixed-maximum-size datagram exchange.
pub trait Transport {
    /// Largest buffer `send` accepts.
    fn max_datagram(&self) -> usize;

    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;

    /// Next datagram, in send order.
    fn receive(&mut self) -> io::Result<Vec<u8>>;
}

type Queue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One end of an in-process datagram channel.
///
/// # Examples
///
/// ```
/// use paged_containers::{ChannelTransport, Transport};
///
/// let (mut a, mut b) = ChannelTransport::pair();
/// a.send(b"ping").unwrap();
/// assert_eq!(b.receive().unwrap(), b"ping");
/// ```
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    outgoing: Queue,
    incoming: Queue,
    max_datagram: usize,
}

impl ChannelTransport {
    /// Two connected endpoints: what one sends the other receives.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_limit(DEFAULT_MAX_DATAGRAM)
    }

    pub fn pair_with_limit(max_datagram: usize) -> (Self, Self) {
        let a_to_b: Queue = Rc::new(RefCell::new(VecDeque::new()));
        let b_to_a: Queue = Rc::new(RefCell::new(VecDeque::new()));
        (
            Self {
                outgoing: Rc::clone(&a_to_b),
                incoming: Rc::clone(&b_to_a),
                max_datagram,
            },
            Self {
                outgoing: b_to_a,
                incoming: a_to_b,
                max_datagram,
            },
        )
    }

    /// Datagrams waiting to be received at this end.
    pub fn pending(&self) -> usize {
        self.incoming.borrow().len()
    }
}

impl Transport for ChannelTransport {
    fn max_datagram(&self) -> usize {
        self.max_datagram
    }

    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if datagram.len() > self.max_datagram {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "datagram of {} bytes exceeds limit of {}",
                    datagram.len(),
                    self.max_datagram
                ),
            ));
        }
        self.outgoing.borrow_mut().push_back(datagram.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        self.incoming
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no datagram queued"))
    }
}

// ============================================================================
// CONTAINER FRAMING
// ============================================================================

/// Sends a container as header and page datagrams.
pub struct DatagramSink<'t, T: ?Sized> {
    transport: &'t mut T,
    endian: Endian,
    sent: usize,
}

impl<'t, T: Transport + ?Sized> DatagramSink<'t, T> {
    pub fn new(transport: &'t mut T) -> Self {
        Self {
            transport,
            endian: Endian::native(),
            sent: 0,
        }
    }

    /// Datagrams sent so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn send(&mut self, datagram: &[u8]) -> PersistResult<()> {
        let limit = self.transport.max_datagram();
        if datagram.len() > limit {
            return Err(ContainerError::invalid_argument(
                "send",
                &format!(
                    "datagram {} is {} bytes, transport limit is {}",
                    self.sent,
                    datagram.len(),
                    limit
                ),
            ));
        }
        self.transport
            .send(datagram)
            .map_err(|e| {
                ContainerError::io(&format!("send datagram {}", self.sent), &e, datagram.len())
            })?;
        self.sent += 1;
        Ok(())
    }
}

impl<T: Transport + ?Sized> PageSink for DatagramSink<'_, T> {
    fn header(&mut self, header: &ContainerHeader) -> PersistResult<()> {
        self.endian = header.endian;
        let mut w = FieldWriter::new(Vec::new(), self.endian, "send header");
        header.encode(&mut w)?;
        self.send(&w.into_inner())
    }

    fn page(&mut self, kind: ContainerKind, page: &PageImage<'_>) -> PersistResult<()> {
        let mut w = FieldWriter::new(Vec::new(), self.endian, "send page");
        encode_page(&mut w, kind, page)?;
        self.send(&w.into_inner())
    }

    fn finish(&mut self) -> PersistResult<()> {
        Ok(())
    }
}

/// Receives a container sent through a [`DatagramSink`].
pub struct DatagramSource<'t, T: ?Sized> {
    transport: &'t mut T,
    header: ContainerHeader,
    geometry: Geometry,
    remaining: u64,
    received: usize,
}

impl<'t, T: Transport + ?Sized> DatagramSource<'t, T> {
    /// Receives and validates the header datagram.
    pub fn open(transport: &'t mut T, kind: ContainerKind) -> PersistResult<Self> {
        let datagram = receive(&mut *transport, 0)?;
        let mut r = FieldReader::new(&datagram[..], "receive header");
        let header = ContainerHeader::decode(&mut r, kind)?;
        expect_consumed(r, 0)?;
        let geometry = header.geometry()?;
        Ok(Self {
            transport,
            remaining: header.page_count,
            header,
            geometry,
            received: 1,
        })
    }
}

impl<T: Transport + ?Sized> PageSource for DatagramSource<'_, T> {
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
        let datagram = receive(&mut *self.transport, self.received)?;
        let mut r = FieldReader::new(&datagram[..], "receive page");
        r.set_endian(self.header.endian);
        let record = decode_page(&mut r, self.header.kind, &self.geometry)?;
        expect_consumed(r, self.received)?;
        self.received += 1;
        self.remaining -= 1;
        Ok(Some(record))
    }
}

fn receive<T: Transport + ?Sized>(transport: &mut T, sequence: usize) -> PersistResult<Vec<u8>> {
    transport
        .receive()
        .map_err(|e| ContainerError::io(&format!("receive datagram {}", sequence), &e, 0))
}

fn expect_consumed(reader: FieldReader<&[u8]>, sequence: usize) -> PersistResult<()> {
    let trailing = reader.into_inner().len();
    if trailing != 0 {
        return Err(ContainerError::corrupted(
            "datagram",
            &format!("{} trailing bytes in datagram {}", trailing, sequence),
        ));
    }
    Ok(())
}

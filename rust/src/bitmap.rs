//! Fixed-size per-page bit set recording which array slots hold data.

use bitvec::prelude::*;

/// One bit per element slot of an array page.
///
/// The length is fixed at construction. The on-disk form is least significant
/// bit first within each byte, padded with zero bytes to the requested size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBitmap {
    bits: BitVec<u8, Lsb0>,
}

impl PageBitmap {
    /// A bitmap of `len` clear bits.
    pub fn new(len: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, len),
        }
    }

    /// Rebuilds a bitmap of `len` bits from its serialized bytes.
    ///
    /// Bits past `len` in the input are ignored.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Self {
        let mut bitmap = Self::new(len);
        for (i, mut bit) in bitmap.bits.iter_mut().enumerate() {
            *bit = bytes
                .get(i / 8)
                .map_or(false, |byte| (byte >> (i % 8)) & 1 == 1);
        }
        bitmap
    }

    /// Serializes into exactly `size` bytes.
    pub fn to_bytes(&self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        for i in self.bits.iter_ones() {
            if let Some(byte) = bytes.get_mut(i / 8) {
                *byte |= 1 << (i % 8);
            }
        }
        bytes
    }

    /// Number of slots covered.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Bit `i`; out-of-range bits read as clear.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).map_or(false, |bit| *bit)
    }

    /// Sets bit `i` to `value` and returns its previous state.
    ///
    /// Out-of-range indices are ignored and report `false`.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) -> bool {
        if i >= self.bits.len() {
            return false;
        }
        let previous = self.bits[i];
        self.bits.set(i, value);
        previous
    }

    /// Clears bit `i` and returns its previous state.
    pub fn clear(&mut self, i: usize) -> bool {
        self.set(i, false)
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// First set bit at or after `from`.
    pub fn first_set_from(&self, from: usize) -> Option<usize> {
        if from >= self.bits.len() {
            return None;
        }
        self.bits[from..].first_one().map(|i| i + from)
    }

    /// Last set bit at or before `through`.
    pub fn last_set_through(&self, through: usize) -> Option<usize> {
        if self.bits.is_empty() {
            return None;
        }
        let end = through.min(self.bits.len() - 1);
        self.bits[..=end].last_one()
    }

    /// Iterator over the indices of set bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

/// Serialized bitmap size for `len` slots: whole bytes, rounded up to 4.
pub fn bitmap_size(len: usize) -> usize {
    len.div_ceil(8).div_ceil(4) * 4
}

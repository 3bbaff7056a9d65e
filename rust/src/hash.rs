//! Page-number hashing.
//!
//! Pages are touched in rising or falling runs, which would turn a plain
//! ordered index into a list. Keys are therefore the page number passed
//! through the 32-bit murmur3 finaliser. The mix is a bijection on `u32`, so
//! [`page_unhash`] recovers the page number from a stored key.

use crate::error::{ContainerError, ContainerResult};
use crate::types::Key;

/// Mixes a page number into a pseudo-random 32-bit value.
#[inline]
pub fn page_hash(page: u32) -> u32 {
    let mut h = page;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Exact inverse of [`page_hash`].
#[inline]
pub fn page_unhash(hash: u32) -> u32 {
    let mut h = hash;
    h ^= h >> 16;
    h = h.wrapping_mul(0x7ed1_b41d);
    h ^= (h >> 13) ^ (h >> 26);
    h = h.wrapping_mul(0xa5cb_9243);
    h ^= h >> 16;
    h
}

/// Index key for a page number.
///
/// Page numbers are limited to `u32`; larger numbers fail with
/// [`ContainerError::IndexOverflow`].
pub fn page_key(page: u64) -> ContainerResult<Key> {
    let page = u32::try_from(page).map_err(|_| ContainerError::overflow("page_key", page, 1))?;
    Ok(Key::from(page_hash(page)))
}

/// Page number stored under `key`, or `None` if the key is not a page key.
pub fn key_page(key: Key) -> Option<u64> {
    u32::try_from(key).ok().map(|h| u64::from(page_unhash(h)))
}

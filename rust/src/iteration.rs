//! Iterator implementations for the index and both containers.
//!
//! Borrowing iterators (`Iter`, `ArrayIter`, `VectorIter`) hold a shared
//! reference and never restructure the index. Cursors (`IndexCursor`,
//! `ArrayCursor`) hold no borrow at all: each step takes the container
//! explicitly and the next position is computed before the current one is
//! handed out, so the caller may delete the yielded element between steps.

use crate::array::SparseArray;
use crate::bitmap::PageBitmap;
use crate::hash::{key_page, page_key};
use crate::page::VectorPage;
use crate::splay::SplayIndex;
use crate::types::{Direction, Key, NodeId, NULL_NODE};
use crate::vector::PagedVector;

// ============================================================================
// INDEX CURSOR
// ============================================================================

/// Delete-safe position in a [`SplayIndex`].
///
/// `safe` is the neighbour of `current` in the cursor's direction, captured
/// before `current` is returned. Removing `current` (and only `current`)
/// between steps does not disturb the walk.
///
/// # Examples
///
/// ```
/// use paged_containers::{Direction, SplayIndex};
///
/// let mut index = SplayIndex::new();
/// for key in 0..10u64 {
///     index.insert(key, key).unwrap();
/// }
/// let mut cursor = index.cursor(Direction::Forward);
/// while let Some(id) = cursor.next(&index) {
///     if index.key(id).unwrap() % 2 == 1 {
///         index.remove(id).unwrap();
///     }
/// }
/// assert_eq!(index.len(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    current: NodeId,
    safe: NodeId,
    direction: Direction,
}

impl IndexCursor {
    pub(crate) fn new<T>(index: &SplayIndex<T>, direction: Direction) -> Self {
        let start = match direction {
            Direction::Forward => index.min,
            Direction::Backward => index.max,
        };
        Self {
            current: NULL_NODE,
            safe: start,
            direction,
        }
    }

    /// Advances to the precomputed neighbour and returns it.
    pub fn next<T>(&mut self, index: &SplayIndex<T>) -> Option<NodeId> {
        if self.safe == NULL_NODE || !index.contains(self.safe) {
            self.current = NULL_NODE;
            self.safe = NULL_NODE;
            return None;
        }
        self.current = self.safe;
        self.safe = match self.direction {
            Direction::Forward => index.next(self.current),
            Direction::Backward => index.prev(self.current),
        }
        .unwrap_or(NULL_NODE);
        Some(self.current)
    }

    /// Node most recently returned by `next`.
    pub fn current(&self) -> Option<NodeId> {
        (self.current != NULL_NODE).then_some(self.current)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Borrowing iterator over `(key, &value)` in key order.
pub struct Iter<'a, T> {
    index: &'a SplayIndex<T>,
    cursor: IndexCursor,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (Key, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor.next(self.index)?;
        self.remaining = self.remaining.saturating_sub(1);
        let node = self.index.arena.get(id)?;
        Some((node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> SplayIndex<T> {
    /// Delete-safe cursor starting at the minimum (forward) or maximum
    /// (backward) node.
    pub fn cursor(&self, direction: Direction) -> IndexCursor {
        IndexCursor::new(self, direction)
    }

    /// Iterates `(key, &value)` in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        self.iter_in(Direction::Forward)
    }

    /// Iterates `(key, &value)` in descending key order.
    pub fn iter_rev(&self) -> Iter<'_, T> {
        self.iter_in(Direction::Backward)
    }

    fn iter_in(&self, direction: Direction) -> Iter<'_, T> {
        Iter {
            index: self,
            cursor: self.cursor(direction),
            remaining: self.count,
        }
    }
}

// ============================================================================
// SPARSE ARRAY TRAVERSAL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotPos {
    page: usize,
    slot: usize,
}

/// Snapshot of an array's pages sorted by page number.
///
/// The index is ordered by hashed key; unhashing each key gives the page
/// number back, which is what makes ascending element order reachable.
#[derive(Debug, Clone)]
struct PageWalk {
    pages: Vec<(u64, NodeId)>,
    elem_num: usize,
}

impl PageWalk {
    fn of(array: &SparseArray) -> Self {
        let mut pages = Vec::with_capacity(array.index.len());
        array.index.walk(|id, key, _| {
            if let Some(page) = key_page(key) {
                pages.push((page, id));
            }
        });
        pages.sort_unstable_by_key(|&(page, _)| page);
        Self {
            pages,
            elem_num: array.geometry.elem_num(),
        }
    }

    fn bitmap<'a>(&self, array: &'a SparseArray, page: usize) -> Option<&'a PageBitmap> {
        let &(_, id) = self.pages.get(page)?;
        array.index.get(id).map(|p| &p.bitmap)
    }

    fn index_of(&self, pos: SlotPos) -> u64 {
        self.pages[pos.page].0 * self.elem_num as u64 + pos.slot as u64
    }

    fn first(&self, array: &SparseArray, direction: Direction) -> Option<SlotPos> {
        match direction {
            Direction::Forward => self.scan_forward(array, 0, 0),
            Direction::Backward => {
                let last = self.pages.len().checked_sub(1)?;
                self.scan_backward(array, last, Some(usize::MAX))
            }
        }
    }

    fn step(&self, array: &SparseArray, from: SlotPos, direction: Direction) -> Option<SlotPos> {
        match direction {
            Direction::Forward => self.scan_forward(array, from.page, from.slot + 1),
            Direction::Backward => self.scan_backward(array, from.page, from.slot.checked_sub(1)),
        }
    }

    /// First set slot at or after `(page, slot)`.
    fn scan_forward(&self, array: &SparseArray, page: usize, slot: usize) -> Option<SlotPos> {
        (page..self.pages.len()).find_map(|p| {
            let from = if p == page { slot } else { 0 };
            self.bitmap(array, p)?
                .first_set_from(from)
                .map(|slot| SlotPos { page: p, slot })
        })
    }

    /// Last set slot at or before `(page, through)`; `None` as `through`
    /// skips straight to the previous page.
    fn scan_backward(
        &self,
        array: &SparseArray,
        page: usize,
        through: Option<usize>,
    ) -> Option<SlotPos> {
        (0..=page).rev().find_map(|p| {
            let through = if p == page { through? } else { usize::MAX };
            self.bitmap(array, p)?
                .last_set_through(through)
                .map(|slot| SlotPos { page: p, slot })
        })
    }
}

/// Borrowing iterator over the initialized elements of a [`SparseArray`].
///
/// Yields `(index, bytes)` in ascending (or, from `iter_rev`, descending)
/// index order; unset slots are skipped.
pub struct ArrayIter<'a> {
    array: &'a SparseArray,
    walk: PageWalk,
    position: Option<SlotPos>,
    direction: Direction,
}

impl<'a> ArrayIter<'a> {
    pub(crate) fn new(array: &'a SparseArray, direction: Direction) -> Self {
        let walk = PageWalk::of(array);
        let position = walk.first(array, direction);
        Self {
            array,
            walk,
            position,
            direction,
        }
    }

    /// Element at the current position, or `None` past either end.
    pub fn elem(&self) -> Option<&'a [u8]> {
        let pos = self.position?;
        let &(_, id) = self.walk.pages.get(pos.page)?;
        let page = self.array.index.get(id)?;
        Some(page.slot(pos.slot, self.array.geometry.elem_size()))
    }

    /// Logical index of the current position.
    pub fn index(&self) -> Option<u64> {
        self.position.map(|pos| self.walk.index_of(pos))
    }

    /// Moves `n` initialized elements in the iterator's direction.
    pub fn inc(&mut self, n: usize) -> &mut Self {
        self.shift(n, self.direction);
        self
    }

    /// Moves `n` initialized elements against the iterator's direction.
    pub fn dec(&mut self, n: usize) -> &mut Self {
        self.shift(n, self.direction.reverse());
        self
    }

    fn shift(&mut self, n: usize, direction: Direction) {
        for _ in 0..n {
            match self.position {
                Some(pos) => self.position = self.walk.step(self.array, pos, direction),
                None => break,
            }
        }
    }
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = (u64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let item = (self.index()?, self.elem()?);
        self.inc(1);
        Some(item)
    }
}

/// Delete-safe cursor over the initialized indices of a [`SparseArray`].
///
/// Clearing the status of the index just returned does not disturb the
/// walk. Pages allocated after the cursor was created are not visited.
#[derive(Debug, Clone)]
pub struct ArrayCursor {
    walk: PageWalk,
    current: Option<SlotPos>,
    safe: Option<SlotPos>,
    direction: Direction,
}

impl ArrayCursor {
    pub(crate) fn new(array: &SparseArray, direction: Direction) -> Self {
        let walk = PageWalk::of(array);
        let safe = walk.first(array, direction);
        Self {
            walk,
            current: None,
            safe,
            direction,
        }
    }

    /// Advances to the precomputed next index and returns it.
    pub fn next(&mut self, array: &SparseArray) -> Option<u64> {
        self.current = self.safe;
        let pos = self.current?;
        self.safe = self.walk.step(array, pos, self.direction);
        Some(self.walk.index_of(pos))
    }

    /// Index most recently returned by `next`.
    pub fn current(&self) -> Option<u64> {
        self.current.map(|pos| self.walk.index_of(pos))
    }
}

// ============================================================================
// PAGED VECTOR TRAVERSAL
// ============================================================================

/// Borrowing iterator over the elements of a [`PagedVector`].
///
/// The current page is cached between steps; the index is consulted only
/// when a step crosses a page boundary.
pub struct VectorIter<'a> {
    vector: &'a PagedVector,
    position: Option<u64>,
    cached: Option<(u64, &'a VectorPage)>,
    direction: Direction,
}

impl<'a> VectorIter<'a> {
    pub(crate) fn new(vector: &'a PagedVector, direction: Direction) -> Self {
        let position = match direction {
            Direction::Forward => (vector.size > 0).then_some(0),
            Direction::Backward => vector.size.checked_sub(1),
        };
        let mut iter = Self {
            vector,
            position,
            cached: None,
            direction,
        };
        iter.refresh_page();
        iter
    }

    fn refresh_page(&mut self) {
        let Some(position) = self.position else {
            self.cached = None;
            return;
        };
        let (page, _) = self.vector.geometry.locate(position);
        if matches!(self.cached, Some((cached, _)) if cached == page) {
            return;
        }
        self.cached = page_key(page)
            .ok()
            .and_then(|key| self.vector.index.lookup(key))
            .and_then(|id| self.vector.index.get(id))
            .map(|data| (page, data));
    }

    pub fn elem(&self) -> Option<&'a [u8]> {
        let position = self.position?;
        let (_, page) = self.cached?;
        let (_, slot) = self.vector.geometry.locate(position);
        Some(page.slot(slot, self.vector.geometry.elem_size()))
    }

    pub fn index(&self) -> Option<u64> {
        self.position
    }

    /// Moves `n` elements in the iterator's direction.
    pub fn inc(&mut self, n: u64) -> &mut Self {
        self.shift(n, self.direction);
        self
    }

    /// Moves `n` elements against the iterator's direction.
    pub fn dec(&mut self, n: u64) -> &mut Self {
        self.shift(n, self.direction.reverse());
        self
    }

    fn shift(&mut self, n: u64, direction: Direction) {
        let size = self.vector.size;
        self.position = self.position.and_then(|position| match direction {
            Direction::Forward => position.checked_add(n).filter(|&p| p < size),
            Direction::Backward => position.checked_sub(n),
        });
        self.refresh_page();
    }
}

impl<'a> Iterator for VectorIter<'a> {
    type Item = (u64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let item = (self.index()?, self.elem()?);
        self.inc(1);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = match (self.position, self.direction) {
            (None, _) => 0,
            (Some(p), Direction::Forward) => self.vector.size - p,
            (Some(p), Direction::Backward) => p + 1,
        };
        let left = usize::try_from(left).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl ExactSizeIterator for VectorIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_cursor_both_directions() {
        let mut index = SplayIndex::new();
        for key in [5u64, 1, 9, 3, 7] {
            index.insert(key, ()).unwrap();
        }

        let mut forward = Vec::new();
        let mut cursor = index.cursor(Direction::Forward);
        while let Some(id) = cursor.next(&index) {
            forward.push(index.key(id).unwrap());
        }
        assert_eq!(forward, vec![1, 3, 5, 7, 9]);
        assert_eq!(cursor.current(), None);

        let backward: Vec<Key> = index.iter_rev().map(|(k, _)| k).collect();
        assert_eq!(backward, vec![9, 7, 5, 3, 1]);
        assert_eq!(index.iter().len(), 5);
    }

    #[test]
    fn test_index_cursor_survives_removal_of_current() {
        let mut index = SplayIndex::new();
        for key in 0..50u64 {
            index.insert(key * 7 % 50, key).unwrap();
        }
        let mut seen = Vec::new();
        let mut cursor = index.cursor(Direction::Backward);
        while let Some(id) = cursor.next(&index) {
            seen.push(index.key(id).unwrap());
            index.remove(id).unwrap();
        }
        assert_eq!(seen, (0..50).rev().collect::<Vec<_>>());
        assert!(index.is_empty());
    }

    #[test]
    fn test_array_iter_elem_inc_dec() {
        let mut array = SparseArray::with_page_size(2, 128).unwrap();
        let per_page = array.elem_num() as u64;
        for index in [3, per_page - 1, per_page * 4 + 2] {
            array.put(index, &(index as u16).to_ne_bytes()).unwrap();
        }

        let mut iter = array.iter();
        assert_eq!(iter.index(), Some(3));
        iter.inc(2);
        assert_eq!(iter.index(), Some(per_page * 4 + 2));
        assert_eq!(
            iter.elem(),
            Some(&((per_page * 4 + 2) as u16).to_ne_bytes()[..])
        );
        iter.dec(1);
        assert_eq!(iter.index(), Some(per_page - 1));
        iter.inc(5);
        assert_eq!(iter.index(), None);
        assert_eq!(iter.elem(), None);

        let reversed: Vec<u64> = array.iter_rev().map(|(i, _)| i).collect();
        assert_eq!(reversed, vec![per_page * 4 + 2, per_page - 1, 3]);
    }

    #[test]
    fn test_array_cursor_allows_clearing_current() {
        let mut array = SparseArray::new(1).unwrap();
        for index in [10u64, 11, 5000, 70_000] {
            array.put(index, &[1]).unwrap();
        }
        let mut visited = Vec::new();
        let mut cursor = array.cursor(Direction::Forward);
        while let Some(index) = cursor.next(&array) {
            visited.push(index);
            array.set_status(index, false).unwrap();
        }
        assert_eq!(visited, vec![10, 11, 5000, 70_000]);
        assert_eq!(array.size(), 0);
        assert_eq!(array.iter().count(), 0);
    }

    #[test]
    fn test_vector_iter_crosses_pages() {
        let mut vector = PagedVector::with_page_size("iter", 8, 128).unwrap();
        let per_page = vector.elem_num() as u64;
        vector.resize(per_page * 3 + 1).unwrap();
        for i in 0..vector.size() {
            vector.put(i, &i.to_ne_bytes()).unwrap();
        }

        let forward: Vec<u64> = vector
            .iter()
            .map(|(i, bytes)| {
                assert_eq!(bytes, &i.to_ne_bytes()[..]);
                i
            })
            .collect();
        assert_eq!(forward, (0..per_page * 3 + 1).collect::<Vec<_>>());

        let mut iter = vector.iter_rev();
        assert_eq!(iter.len(), (per_page * 3 + 1) as usize);
        iter.inc(per_page);
        assert_eq!(iter.index(), Some(per_page * 2));
        iter.dec(1);
        assert_eq!(iter.elem(), Some(&(per_page * 2 + 1).to_ne_bytes()[..]));
        iter.inc(per_page * 10);
        assert_eq!(iter.index(), None);
    }
}

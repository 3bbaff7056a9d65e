//! Validation and debugging utilities for the index and both containers.
//!
//! The `check_invariants_detailed` methods walk the whole structure and
//! report the first violation found; they are meant for tests and for
//! diagnosing a suspect container, not for hot paths.

use std::cmp::Ordering;
use std::io::{self, Write};

use crate::array::SparseArray;
use crate::error::{ContainerError, ContainerResult};
use crate::hash::key_page;
use crate::persist::ContainerKind;
use crate::splay::SplayIndex;
use crate::types::{NodeId, NULL_NODE};
use crate::vector::PagedVector;

// ============================================================================
// INDEX VALIDATION
// ============================================================================

impl<T> SplayIndex<T> {
    /// Check if the index maintains its invariants.
    pub fn check_invariants(&self) -> bool {
        self.check_invariants_detailed().is_ok()
    }

    /// Check invariants with detailed error reporting.
    pub fn check_invariants_detailed(&self) -> Result<(), String> {
        if (self.count == 0) != (self.root == NULL_NODE) {
            return Err(format!(
                "count {} disagrees with root {}",
                self.count, self.root
            ));
        }
        if self.count != self.arena.len() {
            return Err(format!(
                "count {} but {} nodes allocated in arena",
                self.count,
                self.arena.len()
            ));
        }
        if self.root == NULL_NODE {
            if self.min != NULL_NODE || self.max != NULL_NODE {
                return Err("empty index caches an extremum".to_string());
            }
            return Ok(());
        }
        if self.arena.get(self.root).map(|n| n.parent) != Some(NULL_NODE) {
            return Err(format!("root {} has a parent or is not allocated", self.root));
        }

        self.check_links()?;
        self.check_order()?;

        let leftmost = self.leftmost(self.root);
        let rightmost = self.rightmost(self.root);
        if self.min != leftmost {
            return Err(format!("cached min {} but leftmost node is {}", self.min, leftmost));
        }
        if self.max != rightmost {
            return Err(format!("cached max {} but rightmost node is {}", self.max, rightmost));
        }
        Ok(())
    }

    /// Alias for check_invariants_detailed.
    pub fn validate(&self) -> Result<(), String> {
        self.check_invariants_detailed()
    }

    /// Parent links agree with child links, and every node is reached once.
    fn check_links(&self) -> Result<(), String> {
        let mut reached = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            reached += 1;
            if reached > self.count {
                return Err("cycle in child links".to_string());
            }
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| format!("link to unallocated node {}", id))?;
            for child in [node.left, node.right] {
                if child == NULL_NODE {
                    continue;
                }
                let parent = self.arena.get(child).map(|c| c.parent);
                if parent != Some(id) {
                    return Err(format!(
                        "node {} is a child of {} but records parent {:?}",
                        child, id, parent
                    ));
                }
                stack.push(child);
            }
        }
        if reached != self.count {
            return Err(format!("{} nodes reachable, count is {}", reached, self.count));
        }
        Ok(())
    }

    /// In-order walk yields strictly increasing keys.
    fn check_order(&self) -> Result<(), String> {
        let mut previous: Option<(NodeId, u64)> = None;
        let mut current = self.leftmost(self.root);
        let mut steps = 0;
        while current != NULL_NODE {
            let key = self.arena[current].key;
            if let Some((prev_id, prev_key)) = previous {
                if (self.compare)(&prev_key, &key) != Ordering::Less {
                    return Err(format!(
                        "node {} (key {:#x}) does not precede node {} (key {:#x})",
                        prev_id, prev_key, current, key
                    ));
                }
            }
            previous = Some((current, key));
            steps += 1;
            if steps > self.count {
                return Err("in-order walk does not terminate".to_string());
            }
            current = self.next(current).unwrap_or(NULL_NODE);
        }
        Ok(())
    }

    /// Writes the tree shape, one node per line, indented by depth.
    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "SplayIndex: {} nodes, height {}",
            self.count,
            self.height()
        )?;
        let mut stack = Vec::new();
        if self.root != NULL_NODE {
            stack.push((self.root, 0usize, "root"));
        }
        while let Some((id, depth, side)) = stack.pop() {
            let node = &self.arena[id];
            writeln!(
                out,
                "{}{} node={} key={:#x}",
                "  ".repeat(depth),
                side,
                id,
                node.key
            )?;
            if node.right != NULL_NODE {
                stack.push((node.right, depth + 1, "R"));
            }
            if node.left != NULL_NODE {
                stack.push((node.left, depth + 1, "L"));
            }
        }
        Ok(())
    }

    /// Prints the tree shape for debugging.
    pub fn print_tree(&self) {
        let _ = self.dump(io::stdout().lock());
    }
}

// ============================================================================
// CONTAINER VALIDATION
// ============================================================================

impl SparseArray {
    /// Check index, page and counter invariants with detailed reporting.
    pub fn check_invariants_detailed(&self) -> Result<(), String> {
        self.index.check_invariants_detailed()?;

        let mut population = 0u64;
        let mut failure = None;
        self.index.walk(|id, key, page| {
            if failure.is_some() {
                return;
            }
            let Some(page_no) = key_page(key) else {
                failure = Some(format!("node {} holds non-page key {:#x}", id, key));
                return;
            };
            if page.tag != ContainerKind::Array.page_tag() {
                failure = Some(format!("page {} has tag {:02x?}", page_no, page.tag));
            } else if page.echo != id {
                failure = Some(format!(
                    "page {} echoes node {}, lives in {}",
                    page_no, page.echo, id
                ));
            } else if page.bitmap.len() != self.geometry.elem_num()
                || page.data.len() != self.geometry.data_size()
            {
                failure = Some(format!("page {} has the wrong shape", page_no));
            } else if let Some(first) = page.bitmap.first_set_from(0) {
                let base = page_no * self.geometry.elem_num() as u64;
                let first = base + first as u64;
                let last = base + page.bitmap.last_set_through(usize::MAX).unwrap_or(0) as u64;
                let outside = match self.bounds {
                    Some((low, high)) => first < low || last > high,
                    None => true,
                };
                if outside {
                    failure = Some(format!(
                        "elements {}..={} reach outside the touched range {:?}",
                        first, last, self.bounds
                    ));
                }
            }
            population += page.population() as u64;
        });
        if let Some(failure) = failure {
            return Err(failure);
        }

        if population != self.size {
            return Err(format!(
                "size {} but bitmaps hold {} elements",
                self.size, population
            ));
        }
        if self.bounds.is_none() && !self.index.is_empty() {
            return Err("pages allocated without a touched range".to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> ContainerResult<()> {
        self.check_invariants_detailed()
            .map_err(|e| ContainerError::corrupted("array", &e))
    }

    /// Writes every initialized element as hex, grouped by page.
    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "SparseArray: elem_size={} elem_num={} size={} pages={} range={:?}",
            self.geometry.elem_size(),
            self.geometry.elem_num(),
            self.size,
            self.pages(),
            self.bounds
        )?;
        let mut last_page = None;
        for (index, bytes) in self.iter() {
            let page_no = index / self.geometry.elem_num() as u64;
            if last_page != Some(page_no) {
                writeln!(out, "page {}:", page_no)?;
                last_page = Some(page_no);
            }
            writeln!(out, "  [{}] {}", index, hex(bytes))?;
        }
        Ok(())
    }
}

impl PagedVector {
    /// Check index, page and size invariants with detailed reporting.
    pub fn check_invariants_detailed(&self) -> Result<(), String> {
        self.index.check_invariants_detailed()?;

        let expected = self.geometry.pages_for(self.size);
        if self.index.len() as u64 != expected {
            return Err(format!(
                "{} pages for size {}, expected {}",
                self.index.len(),
                self.size,
                expected
            ));
        }

        let elem_size = self.geometry.elem_size();
        let (last_page, tail) = self.geometry.locate(self.size);
        let mut failure = None;
        self.index.walk(|id, key, page| {
            if failure.is_some() {
                return;
            }
            let page_no = match key_page(key) {
                Some(page_no) if page_no < expected => page_no,
                _ => {
                    failure = Some(format!("node {} holds stray key {:#x}", id, key));
                    return;
                }
            };
            if page.tag != ContainerKind::Vector.page_tag() {
                failure = Some(format!("page {} has tag {:02x?}", page_no, page.tag));
            } else if page.echo != id {
                failure = Some(format!(
                    "page {} echoes node {}, lives in {}",
                    page_no, page.echo, id
                ));
            } else if page.data.len() != self.geometry.data_size() {
                failure = Some(format!("page {} has {} data bytes", page_no, page.data.len()));
            } else if page_no == last_page
                && page.data[tail * elem_size..].iter().any(|&b| b != 0)
            {
                failure = Some(format!("page {} has data past the logical end", page_no));
            }
        });
        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    pub fn validate(&self) -> ContainerResult<()> {
        self.check_invariants_detailed()
            .map_err(|e| ContainerError::corrupted("vector", &e))
    }

    /// Writes every element as hex, one per line.
    pub fn dump<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(
            out,
            "PagedVector '{}': elem_size={} elem_num={} size={} pages={}",
            self.name,
            self.geometry.elem_size(),
            self.geometry.elem_num(),
            self.size,
            self.pages()
        )?;
        for (index, bytes) in self.iter() {
            writeln!(out, "  [{}] {}", index, hex(bytes))?;
        }
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

//! Construction and configuration of container geometry.
//!
//! A container is described by its element size and page size. From those
//! the number of elements per page (and, for arrays, the bitmap size) is
//! derived once and never changes for the lifetime of the container.

use crate::bitmap::bitmap_size;
use crate::error::{ContainerError, InitResult};
use crate::persist::Endian;

/// Smallest supported element size in bytes
pub const MIN_ELEM_SIZE: usize = 1;

/// Largest supported element size in bytes
pub const MAX_ELEM_SIZE: usize = 2048;

/// Smallest supported page size in bytes
pub const MIN_PAGE_SIZE: usize = 128;

/// Largest supported page size in bytes
pub const MAX_PAGE_SIZE: usize = 1 << 20;

/// Page size used when none is given
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Element size used by `ArrayConfig::default()`
pub const DEFAULT_ELEM_SIZE: usize = 8;

/// Bytes of every page taken by the page tag and index linkage
pub const PAGE_HEADER_SIZE: usize = 48;

/// Fixed size of the name field in a container header
pub const NAME_SIZE: usize = 40;

/// Derived page layout of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub(crate) elem_size: usize,
    pub(crate) page_size: usize,
    pub(crate) elem_num: usize,
    pub(crate) bitmap_size: usize,
}

impl Geometry {
    /// Layout of a sparse array page: header, bitmap, elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use paged_containers::Geometry;
    ///
    /// let geometry = Geometry::for_array(4, 4096).unwrap();
    /// assert_eq!(geometry.elem_num(), 981);
    /// assert_eq!(geometry.bitmap_size(), 124);
    /// ```
    pub fn for_array(elem_size: usize, page_size: usize) -> InitResult<Self> {
        validation::validate_elem_size(elem_size)?;
        validation::validate_page_size(page_size)?;

        let usable = page_size - PAGE_HEADER_SIZE;
        let mut elem_num = usable * 8 / (8 * elem_size + 1);
        while elem_num > 0 && bitmap_size(elem_num) + elem_num * elem_size > usable {
            elem_num -= 1;
        }
        if elem_num == 0 {
            return Err(ContainerError::InvalidGeometry(format!(
                "element size {} does not fit an array page of {} bytes",
                elem_size, page_size
            )));
        }

        Ok(Self {
            elem_size,
            page_size,
            elem_num,
            bitmap_size: bitmap_size(elem_num),
        })
    }

    /// Layout of a vector page: header, elements.
    pub fn for_vector(elem_size: usize, page_size: usize) -> InitResult<Self> {
        validation::validate_elem_size(elem_size)?;
        validation::validate_page_size(page_size)?;

        let elem_num = (page_size - PAGE_HEADER_SIZE) / elem_size;
        if elem_num == 0 {
            return Err(ContainerError::InvalidGeometry(format!(
                "element size {} does not fit a vector page of {} bytes",
                elem_size, page_size
            )));
        }

        Ok(Self {
            elem_size,
            page_size,
            elem_num,
            bitmap_size: 0,
        })
    }

    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Elements per page.
    pub fn elem_num(&self) -> usize {
        self.elem_num
    }

    /// Serialized bitmap bytes per page (zero for vectors).
    pub fn bitmap_size(&self) -> usize {
        self.bitmap_size
    }

    /// Element bytes per page.
    pub fn data_size(&self) -> usize {
        self.elem_num * self.elem_size
    }

    /// Page number and slot within the page for a logical index.
    #[inline]
    pub(crate) fn locate(&self, index: u64) -> (u64, usize) {
        let per_page = self.elem_num as u64;
        (index / per_page, (index % per_page) as usize)
    }

    /// Pages needed to hold `size` elements.
    #[inline]
    pub(crate) fn pages_for(&self, size: u64) -> u64 {
        size.div_ceil(self.elem_num as u64)
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Settings for building a [`SparseArray`](crate::SparseArray).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayConfig {
    pub elem_size: usize,
    pub page_size: usize,
    pub endian: Endian,
}

impl ArrayConfig {
    pub fn new(elem_size: usize) -> Self {
        Self {
            elem_size,
            page_size: DEFAULT_PAGE_SIZE,
            endian: Endian::native(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Validates the settings and derives the page layout.
    pub fn geometry(&self) -> InitResult<Geometry> {
        Geometry::for_array(self.elem_size, self.page_size)
    }
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ELEM_SIZE)
    }
}

/// Settings for building a [`PagedVector`](crate::PagedVector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorConfig {
    pub name: String,
    pub elem_size: usize,
    pub page_size: usize,
    pub endian: Endian,
}

impl VectorConfig {
    pub fn new(name: &str, elem_size: usize) -> Self {
        Self {
            name: name.to_string(),
            elem_size,
            page_size: DEFAULT_PAGE_SIZE,
            endian: Endian::native(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Validates the settings and derives the page layout.
    pub fn geometry(&self) -> InitResult<Geometry> {
        validation::validate_name(&self.name)?;
        Geometry::for_vector(self.elem_size, self.page_size)
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self::new("", DEFAULT_ELEM_SIZE)
    }
}

/// Validation utilities for construction
pub mod validation {
    use super::*;

    /// Validate that an element size is within the supported range.
    pub fn validate_elem_size(elem_size: usize) -> InitResult<()> {
        if !(MIN_ELEM_SIZE..=MAX_ELEM_SIZE).contains(&elem_size) {
            return Err(ContainerError::invalid_geometry(
                "element size",
                elem_size,
                MIN_ELEM_SIZE,
                MAX_ELEM_SIZE,
            ));
        }
        Ok(())
    }

    /// Validate that a page size is a power of two within the supported range.
    pub fn validate_page_size(page_size: usize) -> InitResult<()> {
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ContainerError::invalid_geometry(
                "page size",
                page_size,
                MIN_PAGE_SIZE,
                MAX_PAGE_SIZE,
            ));
        }
        if !page_size.is_power_of_two() {
            return Err(ContainerError::InvalidGeometry(format!(
                "page size {} is not a power of two",
                page_size
            )));
        }
        Ok(())
    }

    /// Validate that a container name fits the fixed header field.
    pub fn validate_name(name: &str) -> InitResult<()> {
        if name.len() > NAME_SIZE {
            return Err(ContainerError::invalid_argument(
                "name",
                &format!("{} bytes exceeds the {} byte name field", name.len(), NAME_SIZE),
            ));
        }
        Ok(())
    }

    /// Get the recommended page size for an element size.
    ///
    /// Returns the smallest supported page holding at least 64 elements,
    /// or the largest supported page when none does.
    pub fn recommended_page_size(elem_size: usize) -> usize {
        let wanted = elem_size.saturating_mul(64).saturating_add(PAGE_HEADER_SIZE);
        wanted
            .checked_next_power_of_two()
            .unwrap_or(MAX_PAGE_SIZE)
            .clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

//! Error handling and result types for index and container operations.
//!
//! Every failure path in the crate returns a [`ContainerError`]. Variants fall
//! into three groups: usage errors (bad handles, bad geometry, out-of-range
//! addressing), data errors (uninitialized reads, duplicate keys, corrupt
//! streams) and resource errors (allocation and I/O failures).

use std::io;

use crate::types::{Key, NodeId};

/// Error type for index and container operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// A node handle does not refer to a live node.
    InvalidHandle(String),
    /// Element size or page size outside the supported bounds.
    InvalidGeometry(String),
    /// Caller supplied a buffer or argument of the wrong shape.
    InvalidArgument(String),
    /// Index outside the logical size of a dense container.
    IndexOutOfBounds(String),
    /// Index arithmetic does not fit the addressable range.
    IndexOverflow(String),
    /// Read of an element whose initialized bit is clear.
    UninitializedElement(u64),
    /// Insert of a key that is already present in the index.
    DuplicateKey(Key),
    /// Identification bytes did not match the expected container or page kind.
    TagMismatch(String),
    /// Stream content is structurally invalid.
    CorruptedData(String),
    /// Memory for a page could not be reserved.
    AllocationError(String),
    /// Underlying stream or transport failure.
    Io {
        operation: String,
        kind: io::ErrorKind,
        code: Option<i32>,
        detail: String,
    },
}

impl ContainerError {
    /// Create an InvalidHandle error with context
    pub fn invalid_handle(operation: &str, id: NodeId) -> Self {
        Self::InvalidHandle(format!("{}: node {} is not allocated", operation, id))
    }

    /// Create an InvalidGeometry error with context
    pub fn invalid_geometry(what: &str, value: usize, min: usize, max: usize) -> Self {
        Self::InvalidGeometry(format!(
            "{} {} is invalid (supported range: {}..={})",
            what, value, min, max
        ))
    }

    /// Create an InvalidArgument error with context
    pub fn invalid_argument(operation: &str, details: &str) -> Self {
        Self::InvalidArgument(format!("{}: {}", operation, details))
    }

    /// Create an IndexOutOfBounds error with context
    pub fn out_of_bounds(index: u64, count: u64, size: u64) -> Self {
        Self::IndexOutOfBounds(format!(
            "elements {}..{} exceed logical size {}",
            index,
            index.saturating_add(count),
            size
        ))
    }

    /// Create an IndexOverflow error with context
    pub fn overflow(operation: &str, index: u64, count: u64) -> Self {
        Self::IndexOverflow(format!(
            "{}: index {} with count {} overflows the addressable range",
            operation, index, count
        ))
    }

    /// Create an UninitializedElement error
    pub fn uninitialized(index: u64) -> Self {
        Self::UninitializedElement(index)
    }

    /// Create a DuplicateKey error
    pub fn duplicate_key(key: Key) -> Self {
        Self::DuplicateKey(key)
    }

    /// Create a TagMismatch error with context
    pub fn tag_mismatch(what: &str, expected: &[u8], found: &[u8]) -> Self {
        Self::TagMismatch(format!(
            "{}: expected {:02x?}, found {:02x?}",
            what, expected, found
        ))
    }

    /// Create a CorruptedData error with context
    pub fn corrupted(component: &str, details: &str) -> Self {
        Self::CorruptedData(format!("{} corruption: {}", component, details))
    }

    /// Create an AllocationError with context
    pub fn allocation_error(resource: &str, reason: &str) -> Self {
        Self::AllocationError(format!("Failed to allocate {}: {}", resource, reason))
    }

    /// Wrap an I/O error, recording the operation and the byte count involved.
    pub fn io(operation: &str, err: &io::Error, bytes: usize) -> Self {
        Self::Io {
            operation: operation.to_string(),
            kind: err.kind(),
            code: err.raw_os_error(),
            detail: format!("{} ({} bytes)", err, bytes),
        }
    }

    /// Null or stale handles, bad geometry, bad arguments, bad addressing.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHandle(_)
                | Self::InvalidGeometry(_)
                | Self::InvalidArgument(_)
                | Self::IndexOutOfBounds(_)
                | Self::IndexOverflow(_)
        )
    }

    /// Conditions about the stored data itself.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::UninitializedElement(_)
                | Self::DuplicateKey(_)
                | Self::TagMismatch(_)
                | Self::CorruptedData(_)
        )
    }

    /// Allocation and stream failures.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, Self::AllocationError(_) | Self::Io { .. })
    }

    /// Check if this error reports a stream that ended early
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            Self::Io {
                kind: io::ErrorKind::UnexpectedEof,
                ..
            }
        )
    }
}

impl std::fmt::Display for ContainerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerError::InvalidHandle(msg) => write!(f, "Invalid handle: {}", msg),
            ContainerError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            ContainerError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            ContainerError::IndexOutOfBounds(msg) => write!(f, "Index out of bounds: {}", msg),
            ContainerError::IndexOverflow(msg) => write!(f, "Index overflow: {}", msg),
            ContainerError::UninitializedElement(index) => {
                write!(f, "Element {} is uninitialized", index)
            }
            ContainerError::DuplicateKey(key) => write!(f, "Duplicate key {:#x}", key),
            ContainerError::TagMismatch(msg) => write!(f, "Tag mismatch: {}", msg),
            ContainerError::CorruptedData(msg) => write!(f, "Corrupted data: {}", msg),
            ContainerError::AllocationError(msg) => write!(f, "Allocation error: {}", msg),
            ContainerError::Io {
                operation,
                code,
                detail,
                ..
            } => match code {
                Some(code) => write!(
                    f,
                    "I/O error during {}: {} (os error {})",
                    operation, detail, code
                ),
                None => write!(f, "I/O error during {}: {}", operation, detail),
            },
        }
    }
}

impl std::error::Error for ContainerError {}

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Result type for index operations
pub type IndexResult<T> = Result<T, ContainerError>;

/// Result type for container construction and geometry validation
pub type InitResult<T> = Result<T, ContainerError>;

/// Result type for save/load and transport operations
pub type PersistResult<T> = Result<T, ContainerError>;

/// Result extension trait for improved error handling
pub trait ContainerResultExt<T> {
    /// Prefix the error message with additional context
    fn with_context(self, context: &str) -> ContainerResult<T>;

    /// Prefix the error message with the name of an operation
    fn with_operation(self, operation: &str) -> ContainerResult<T>;

    /// Log error and continue with default value
    fn or_default_with_log(self) -> T
    where
        T: Default;
}

impl<T> ContainerResultExt<T> for Result<T, ContainerError> {
    fn with_context(self, context: &str) -> ContainerResult<T> {
        self.map_err(|e| match e {
            ContainerError::InvalidHandle(msg) => {
                ContainerError::InvalidHandle(format!("{}: {}", context, msg))
            }
            ContainerError::InvalidGeometry(msg) => {
                ContainerError::InvalidGeometry(format!("{}: {}", context, msg))
            }
            ContainerError::InvalidArgument(msg) => ContainerError::invalid_argument(context, &msg),
            ContainerError::IndexOutOfBounds(msg) => {
                ContainerError::IndexOutOfBounds(format!("{}: {}", context, msg))
            }
            ContainerError::IndexOverflow(msg) => {
                ContainerError::IndexOverflow(format!("{}: {}", context, msg))
            }
            ContainerError::TagMismatch(msg) => {
                ContainerError::TagMismatch(format!("{}: {}", context, msg))
            }
            ContainerError::CorruptedData(msg) => ContainerError::corrupted(context, &msg),
            ContainerError::AllocationError(msg) => ContainerError::allocation_error(context, &msg),
            ContainerError::Io {
                operation,
                kind,
                code,
                detail,
            } => ContainerError::Io {
                operation: format!("{}: {}", context, operation),
                kind,
                code,
                detail,
            },
            // Branchable conditions keep their payload untouched.
            other @ (ContainerError::UninitializedElement(_) | ContainerError::DuplicateKey(_)) => {
                other
            }
        })
    }

    fn with_operation(self, operation: &str) -> ContainerResult<T> {
        self.with_context(&format!("Operation '{}'", operation))
    }

    fn or_default_with_log(self) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(e) => {
                log::warn!("container operation failed, using default: {}", e);
                T::default()
            }
        }
    }
}

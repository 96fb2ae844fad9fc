//! Error types for grblas

use thiserror::Error;

/// Result type alias using grblas's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in grblas operations
///
/// Every operation checks its inputs before touching the output, so an error
/// never leaves a caller-visible matrix half modified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An allocation failed; safe to retry after releasing memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Operand shapes are incompatible
    #[error("Dimension mismatch in {op}: {detail}")]
    DimensionMismatch {
        /// The operation being attempted
        op: &'static str,
        /// Description of the offending shapes
        detail: String,
    },

    /// Types or operators cannot be combined
    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),

    /// A structural invariant of an object is violated
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// The requested entry is not present
    #[error("No value present")]
    NoValue,

    /// The caller violated the API contract
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A row or column index is out of range
    #[error("Index {index} out of bounds for dimension of size {size}")]
    InvalidIndex {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },
}

impl Error {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(op: &'static str, detail: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            op,
            detail: detail.into(),
        }
    }

    /// Create a domain mismatch error
    pub fn domain_mismatch(detail: impl Into<String>) -> Self {
        Self::DomainMismatch(detail.into())
    }

    /// Create an invalid object error
    pub fn invalid_object(detail: impl Into<String>) -> Self {
        Self::InvalidObject(detail.into())
    }

    /// Create an invalid value error
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::InvalidValue(detail.into())
    }

    /// Create an out-of-memory error for `count` elements of type `T`
    pub fn out_of_memory<T>(count: usize) -> Self {
        Self::OutOfMemory {
            size: count.saturating_mul(std::mem::size_of::<T>()),
        }
    }

    /// Returns true if this is the "entry not present" sentinel
    pub fn is_no_value(&self) -> bool {
        matches!(self, Error::NoValue)
    }
}

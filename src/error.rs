//! Error types for the crossbar PIM core.
//!
//! We use `thiserror` for automatic `Display`/`Error` impls, matching the
//! unified-error-enum pattern used elsewhere in the retrieval pack. Every
//! error kind corresponds exactly to one of the four kinds in the design's
//! error model; no kind is recovered internally here.

use thiserror::Error;

/// Result alias for fallible crossbar-pim operations.
pub type Result<T> = std::result::Result<T, PimError>;

/// Error kinds surfaced by the allocator, vector, and algorithm layers.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PimError {
    /// The allocator scanned a full revolution of the fabric without
    /// finding a register index free across the requested contiguous tile
    /// run. The reference treats this as a terminal process abort; this
    /// crate surfaces it as a typed, recoverable error instead.
    #[error("out of memory: no free register spans {0} contiguous crossbars")]
    OutOfMemory(usize),

    /// A binary operator was invoked on vectors of unequal length.
    #[error("shape mismatch: left side has {expected} elements, right side has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// An element subscript fell outside `[0, n)`.
    #[error("index {index} out of range for vector of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// An operation other than drop was attempted on a moved-from vector.
    #[error("operation attempted on a moved-from vector")]
    InvalidMove,
}

//! Error type for scancount aux construction.

use thiserror::Error;

/// Result type for scancount aux operations.
pub type ScancountAuxResult<T> = Result<T, ScancountAuxError>;

/// Errors raised while building a [`crate::ScancountAux`].
#[derive(Debug, Error)]
pub enum ScancountAuxError {
    /// The source posting list had no elements.
    #[error("posting list is empty")]
    EmptyList,
    /// The cache window was zero or not a multiple of 64.
    #[error("cache window {window} must be a non-zero multiple of 64")]
    InvalidWindow {
        /// The offending window size.
        window: u32,
    },
    /// The unroll factor was zero or not a power of two.
    #[error("unroll factor {unroll} must be a power of two")]
    InvalidUnroll {
        /// The offending unroll factor.
        unroll: u32,
    },
}

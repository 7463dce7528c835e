//! Error type for the bitscan engine.

use thiserror::Error;

/// Result type for bitscan operations.
pub type BitscanResult<T> = Result<T, BitscanError>;

/// Errors raised by [`crate::build_bitmaps`] or [`crate::bitscan`].
#[derive(Debug, Error)]
pub enum BitscanError {
    /// The query threshold was not strictly less than `MAX_T`.
    #[error("threshold {threshold} must be less than MAX_T ({max_t})")]
    ThresholdTooLarge {
        /// The offending threshold.
        threshold: u8,
        /// The crate-wide threshold ceiling.
        max_t: u8,
    },
    /// A query named a list index the corpus does not have.
    #[error("query references list index {index}, but the corpus has {list_count} lists")]
    ListIndexOutOfRange {
        /// The offending list index.
        index: u32,
        /// Number of lists actually present in the corpus.
        list_count: usize,
    },
    /// Bitmap construction failed (e.g. an empty posting list).
    #[error(transparent)]
    Bitmap(#[from] bitmap::BitmapError),
}

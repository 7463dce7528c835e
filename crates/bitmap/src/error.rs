//! Error type for compressed-bitmap construction.

use thiserror::Error;

/// Result type for compressed-bitmap operations.
pub type BitmapResult<T> = Result<T, BitmapError>;

/// Errors that can occur while building or querying a [`crate::CompressedBitmap`].
#[derive(Debug, Error)]
pub enum BitmapError {
    /// The source posting list had no elements.
    #[error("posting list is empty")]
    EmptyList,
    /// A chunk index passed to [`crate::CompressedBitmap::expand`] was out of range.
    #[error("chunk index {index} out of range (bitmap has {chunk_count} chunks)")]
    ChunkOutOfRange { index: usize, chunk_count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_error_message() {
        assert_eq!(BitmapError::EmptyList.to_string(), "posting list is empty");
    }

    #[test]
    fn chunk_out_of_range_error_message() {
        let err = BitmapError::ChunkOutOfRange {
            index: 5,
            chunk_count: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }
}

//! Error type for the scancount driver.

use thiserror::Error;

/// Result type for scancount operations.
pub type ScancountResult<T> = Result<T, ScancountError>;

/// Errors raised by [`crate::build_scancount_aux`] or [`crate::scancount`].
#[derive(Debug, Error)]
pub enum ScancountError {
    /// A posting list supplied at build time had no elements.
    #[error("posting list {index} is empty")]
    EmptyList {
        /// Index of the offending list.
        index: usize,
    },
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
    /// The query named more lists than an 8-bit counter can track safely.
    #[error("query names {list_count} lists, exceeding the {max} supported by an 8-bit counter")]
    TooManyListsForCounter {
        /// Number of lists named by the query.
        list_count: usize,
        /// Maximum number of lists a single query may name.
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_lists_message_contains_values() {
        let err = ScancountError::TooManyListsForCounter {
            list_count: 300,
            max: 255,
        };
        assert!(err.to_string().contains("300"));
        assert!(err.to_string().contains("255"));
    }

    #[test]
    fn empty_list_message_contains_index() {
        let err = ScancountError::EmptyList { index: 7 };
        assert!(err.to_string().contains('7'));
    }
}

//! The shared error type every sub-crate's failures convert into.

use thiserror::Error;

/// Result type for the `threshold-count` facade.
pub type ThresholdCountResult<T> = Result<T, ThresholdCountError>;

/// Errors raised anywhere in this workspace's build-time or query-time
/// entry points.
#[derive(Debug, Error)]
pub enum ThresholdCountError {
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

impl From<bitscan::BitscanError> for ThresholdCountError {
    fn from(err: bitscan::BitscanError) -> Self {
        match err {
            bitscan::BitscanError::ThresholdTooLarge { threshold, max_t } => {
                Self::ThresholdTooLarge { threshold, max_t }
            }
            bitscan::BitscanError::ListIndexOutOfRange { index, list_count } => {
                Self::ListIndexOutOfRange { index, list_count }
            }
            // `crate::build_bitmaps` rejects empty lists (with the offending
            // index) before ever calling `bitscan::build_bitmaps`, and a
            // corpus-internal chunk index is never exposed past construction,
            // so this arm is unreachable through the public API.
            bitscan::BitscanError::Bitmap(_) => {
                unreachable!("crate::build_bitmaps pre-validates every list before delegating")
            }
        }
    }
}

impl From<scancount::ScancountError> for ThresholdCountError {
    fn from(err: scancount::ScancountError) -> Self {
        match err {
            scancount::ScancountError::EmptyList { index } => Self::EmptyList { index },
            scancount::ScancountError::ThresholdTooLarge { threshold, max_t } => {
                Self::ThresholdTooLarge { threshold, max_t }
            }
            scancount::ScancountError::ListIndexOutOfRange { index, list_count } => {
                Self::ListIndexOutOfRange { index, list_count }
            }
            scancount::ScancountError::InvalidWindow { window } => Self::InvalidWindow { window },
            scancount::ScancountError::InvalidUnroll { unroll } => Self::InvalidUnroll { unroll },
            scancount::ScancountError::TooManyListsForCounter { list_count, max } => {
                Self::TooManyListsForCounter { list_count, max }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scancount_error_converts_field_for_field() {
        let err = scancount::ScancountError::TooManyListsForCounter { list_count: 300, max: 255 };
        let converted: ThresholdCountError = err.into();
        assert!(matches!(
            converted,
            ThresholdCountError::TooManyListsForCounter { list_count: 300, max: 255 }
        ));
    }

    #[test]
    fn bitscan_error_converts_threshold_too_large() {
        let err = bitscan::BitscanError::ThresholdTooLarge { threshold: 20, max_t: 16 };
        let converted: ThresholdCountError = err.into();
        assert!(matches!(
            converted,
            ThresholdCountError::ThresholdTooLarge { threshold: 20, max_t: 16 }
        ));
    }

    #[test]
    fn empty_list_message_contains_index() {
        let err = ThresholdCountError::EmptyList { index: 4 };
        assert!(err.to_string().contains('4'));
    }
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `accumulator` implements the saturating carry-save bit accumulator used by
//! the bitscan threshold-counting engine. Conceptually a word of `WORD_BITS`
//! bits holds `WORD_BITS` independent `B`-bit counters stacked in parallel:
//! [`Accumulator::accept`] increments every counter whose corresponding bit
//! of the addend is set, and once a counter would overflow past `2^B - 1` its
//! saturation flag sticks.
//!
//! # Design
//!
//! - [`word`] abstracts the bitwise primitives (AND/OR/XOR/NOT, bit test,
//!   per-lane full/half adders) behind the [`Word`] trait, with a portable
//!   back end ([`ScalarWord`]) and two x86_64 SIMD back ends
//!   ([`Avx2Word`], [`Avx512Word`]) selected at runtime.
//! - [`Accumulator`] implements the Wallace-tree reduction
//!   (`accept7`/`accept8`) and the weighted carry chain (`accept_weighted`)
//!   on top of `Word`.
//!
//! # Invariants
//!
//! - Once a saturation bit is set it is never cleared by further accepts
//!   (monotonic saturation).
//! - `accept_weighted` and `accept7`/`accept8` are equivalent, bit for bit,
//!   to repeated calls to `accept`; the Wallace-tree forms exist purely for
//!   instruction-level parallelism.
//!
//! # Errors
//!
//! This crate has no fallible operations; malformed const-generic widths are
//! caught as compile errors in [`bits_for_threshold`]'s callers, not at
//! runtime.
//!
//! # Examples
//!
//! ```
//! use accumulator::{Accumulator, ScalarWord, Word};
//!
//! let mut acc = Accumulator::<2, ScalarWord>::new(0);
//! acc.accept(ScalarWord::all_ones());
//! acc.accept(ScalarWord::all_ones());
//! acc.accept(ScalarWord::all_ones());
//! // Three accepts into a 2-bit counter (max value 3) must not saturate yet.
//! assert!(!acc.get_saturated().test_bit(0));
//! acc.accept(ScalarWord::all_ones());
//! assert!(acc.get_saturated().test_bit(0));
//! ```

mod accum;
mod word;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod avx512;

pub use accum::Accumulator;
pub use word::{ScalarWord, Word};

#[cfg(target_arch = "x86_64")]
pub use avx2::Avx2Word;
#[cfg(target_arch = "x86_64")]
pub use avx512::Avx512Word;

/// Upper bound (exclusive) on the threshold values the bitscan engine will
/// dispatch on. Fixed well above the historical `11` to leave headroom while
/// keeping the per-threshold accumulator dispatch table small.
pub const MAX_T: u8 = 16;

/// Number of accumulator bits needed so that biasing at `2^B - t - 1` and
/// accepting `t + 1` addends saturates exactly at the `(t+1)`th hit, i.e.
/// `ceil(log2(t + 1))`, floored at `1` (a zero-width counter has nowhere to
/// store the bias).
#[must_use]
pub const fn bits_for_threshold(t: u8) -> u32 {
    let target = t as u64 + 1;
    let mut bits = 1u32;
    while (1u64 << bits) < target {
        bits += 1;
    }
    bits
}

//! AVX2 word back end: two `__m256i` halves make up one 512-bit word.
//!
//! # Safety
//!
//! Every intrinsic called here requires the `avx2` target feature. Callers
//! must check [`Avx2Word::is_available`] (backed by
//! `is_x86_feature_detected!("avx2")`) before constructing or operating on
//! any `Avx2Word`; the constructors assert this in debug builds only, since
//! the check belongs once at the dispatcher that picks a back end, not on
//! every word operation in the hot loop.

#![allow(unsafe_code)]

use std::arch::x86_64::*;
use std::fmt;

use crate::word::Word;

/// A 512-bit word backed by two AVX2 (`__m256i`) halves.
#[derive(Clone, Copy)]
pub struct Avx2Word {
    lo: __m256i,
    hi: __m256i,
}

impl Avx2Word {
    /// Reports whether the current CPU supports the `avx2` target feature
    /// this back end requires.
    #[must_use]
    pub fn is_available() -> bool {
        is_x86_feature_detected!("avx2")
    }

    /// Builds a word directly from its two 256-bit halves.
    #[must_use]
    pub fn from_halves(lo: __m256i, hi: __m256i) -> Self {
        debug_assert!(Self::is_available());
        Self { lo, hi }
    }
}

impl fmt::Debug for Avx2Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Avx2Word")
            .field(&self.to_u64_lanes())
            .finish()
    }
}

impl PartialEq for Avx2Word {
    fn eq(&self, other: &Self) -> bool {
        self.to_u64_lanes() == other.to_u64_lanes()
    }
}

impl Word for Avx2Word {
    fn zero() -> Self {
        debug_assert!(Self::is_available());
        unsafe {
            Self {
                lo: _mm256_setzero_si256(),
                hi: _mm256_setzero_si256(),
            }
        }
    }

    fn all_ones() -> Self {
        debug_assert!(Self::is_available());
        unsafe {
            let ones = _mm256_set1_epi32(-1);
            Self { lo: ones, hi: ones }
        }
    }

    fn and(self, rhs: Self) -> Self {
        unsafe {
            Self {
                lo: _mm256_and_si256(self.lo, rhs.lo),
                hi: _mm256_and_si256(self.hi, rhs.hi),
            }
        }
    }

    fn or(self, rhs: Self) -> Self {
        unsafe {
            Self {
                lo: _mm256_or_si256(self.lo, rhs.lo),
                hi: _mm256_or_si256(self.hi, rhs.hi),
            }
        }
    }

    fn xor(self, rhs: Self) -> Self {
        unsafe {
            Self {
                lo: _mm256_xor_si256(self.lo, rhs.lo),
                hi: _mm256_xor_si256(self.hi, rhs.hi),
            }
        }
    }

    fn not(self) -> Self {
        let all_ones = Self::all_ones();
        self.xor(all_ones)
    }

    fn test_bit(&self, idx: usize) -> bool {
        self.to_u64_lanes()[idx / 64] >> (idx % 64) & 1 == 1
    }

    fn to_u64_lanes(self) -> [u64; 8] {
        let mut lanes = [0u64; 8];
        unsafe {
            let mut lo_arr = [0u64; 4];
            let mut hi_arr = [0u64; 4];
            _mm256_storeu_si256(lo_arr.as_mut_ptr().cast(), self.lo);
            _mm256_storeu_si256(hi_arr.as_mut_ptr().cast(), self.hi);
            lanes[0..4].copy_from_slice(&lo_arr);
            lanes[4..8].copy_from_slice(&hi_arr);
        }
        lanes
    }

    fn from_u64_lanes(lanes: [u64; 8]) -> Self {
        debug_assert!(Self::is_available());
        unsafe {
            let lo = _mm256_loadu_si256(lanes[0..4].as_ptr().cast());
            let hi = _mm256_loadu_si256(lanes[4..8].as_ptr().cast());
            Self { lo, hi }
        }
    }
}

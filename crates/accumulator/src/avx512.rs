//! AVX-512 word back end: one native `__m512i` register is one 512-bit word.
//!
//! # Safety
//!
//! Every intrinsic here requires `avx512f`. Callers must check
//! [`Avx512Word::is_available`] before constructing or operating on any
//! `Avx512Word`, exactly as for [`crate::Avx2Word`].

#![allow(unsafe_code)]

use std::arch::x86_64::*;
use std::fmt;

use crate::word::Word;

/// Majority(a, b, c) truth table for `_mm512_ternarylogic_epi32`: bit `i` of
/// the result is set iff at least two of bits `i` of `a`, `b`, `c` are set.
const TERNARY_MAJORITY: i32 = 0xE8;
/// Parity(a, b, c) truth table: bit `i` of the result is the XOR of bits `i`
/// of `a`, `b`, `c`.
const TERNARY_PARITY: i32 = 0x96;
/// NOT(a) expressed as a ternary-logic table ignoring `b` and `c`.
const TERNARY_NOT_A: i32 = 0x0F;

/// A 512-bit word backed by one native AVX-512 (`__m512i`) register.
#[derive(Clone, Copy)]
pub struct Avx512Word(__m512i);

impl Avx512Word {
    /// Reports whether the current CPU supports `avx512f`.
    #[must_use]
    pub fn is_available() -> bool {
        is_x86_feature_detected!("avx512f")
    }

    /// Builds a word directly from a native register.
    #[must_use]
    pub fn from_register(reg: __m512i) -> Self {
        debug_assert!(Self::is_available());
        Self(reg)
    }

    /// Exposes the underlying register for callers that need to feed it
    /// straight into other AVX-512 intrinsics (e.g. compressed-bitmap
    /// mask-expand).
    #[must_use]
    pub fn into_register(self) -> __m512i {
        self.0
    }
}

impl fmt::Debug for Avx512Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Avx512Word")
            .field(&self.to_u64_lanes())
            .finish()
    }
}

impl PartialEq for Avx512Word {
    fn eq(&self, other: &Self) -> bool {
        self.to_u64_lanes() == other.to_u64_lanes()
    }
}

impl Word for Avx512Word {
    fn zero() -> Self {
        debug_assert!(Self::is_available());
        unsafe { Self(_mm512_setzero_si512()) }
    }

    fn all_ones() -> Self {
        debug_assert!(Self::is_available());
        unsafe { Self(_mm512_set1_epi32(-1)) }
    }

    fn and(self, rhs: Self) -> Self {
        unsafe { Self(_mm512_and_si512(self.0, rhs.0)) }
    }

    fn or(self, rhs: Self) -> Self {
        unsafe { Self(_mm512_or_si512(self.0, rhs.0)) }
    }

    fn xor(self, rhs: Self) -> Self {
        unsafe { Self(_mm512_xor_si512(self.0, rhs.0)) }
    }

    fn not(self) -> Self {
        unsafe { Self(_mm512_ternarylogic_epi32(self.0, self.0, self.0, TERNARY_NOT_A)) }
    }

    fn test_bit(&self, idx: usize) -> bool {
        self.to_u64_lanes()[idx / 64] >> (idx % 64) & 1 == 1
    }

    fn to_u64_lanes(self) -> [u64; 8] {
        let mut lanes = [0u64; 8];
        unsafe {
            _mm512_storeu_si512(lanes.as_mut_ptr().cast(), self.0);
        }
        lanes
    }

    fn from_u64_lanes(lanes: [u64; 8]) -> Self {
        debug_assert!(Self::is_available());
        unsafe { Self(_mm512_loadu_si512(lanes.as_ptr().cast())) }
    }

    fn add2(a: Self, b: Self) -> (Self, Self) {
        unsafe {
            let carry = _mm512_and_si512(a.0, b.0);
            let sum = _mm512_xor_si512(a.0, b.0);
            (Self(carry), Self(sum))
        }
    }

    fn add3(a: Self, b: Self, c: Self) -> (Self, Self) {
        unsafe {
            let carry = _mm512_ternarylogic_epi32(a.0, b.0, c.0, TERNARY_MAJORITY);
            let sum = _mm512_ternarylogic_epi32(a.0, b.0, c.0, TERNARY_PARITY);
            (Self(carry), Self(sum))
        }
    }
}

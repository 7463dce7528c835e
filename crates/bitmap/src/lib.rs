#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `bitmap` implements the two-level compressed bitmap used to represent a
//! single posting list for the bitscan threshold-counting engine: a
//! per-chunk control word marking which 32-bit sub-chunks of a 512-bit chunk
//! hold any set bit, and a packed elements array holding only those
//! non-zero sub-chunks.
//!
//! # Design
//!
//! The identifier universe is split into contiguous 512-bit chunks. Each
//! chunk's 16 sub-chunks (32 bits each, for the `u32` element type this
//! crate fixes on) are summarised by one `u16` control word; only non-zero
//! sub-chunks are stored, in chunk-then-sub-chunk order. [`CompressedBitmap::expand`]
//! walks the control word's set bits to reconstruct a chunk's dense 512-bit
//! representation on demand.
//!
//! # Invariants
//!
//! - `popcount(control[c])` summed over every chunk `c` equals the number of
//!   stored elements.
//! - Every stored element is non-zero (a sub-chunk with no set bits is never
//!   recorded).
//! - A trailing cushion of unused element slots lets a 64-byte-wide gather
//!   load (used by the AVX-512 fast path) never read past the allocation.
//!
//! # Errors
//!
//! [`BitmapError::EmptyList`] is returned by [`CompressedBitmap::build`] for
//! an empty source list; [`BitmapError::ChunkOutOfRange`] guards
//! [`CompressedBitmap::expand`] against an out-of-range chunk index.
//!
//! # Examples
//!
//! ```
//! use bitmap::CompressedBitmap;
//!
//! let bm = CompressedBitmap::build(&[3, 5, 900], None).unwrap();
//! assert_eq!(bm.indices(), vec![3, 5, 900]);
//! ```

mod error;

pub use error::{BitmapError, BitmapResult};

use accumulator::{ScalarWord, Word};

/// Width of one chunk, in bits.
pub const CHUNK_BITS: usize = 512;
/// Width of one sub-chunk, in bits (fixed to the `u32` element type).
pub const SUBCHUNK_BITS: usize = 32;
/// Number of sub-chunks per chunk.
pub const SUBCHUNKS_PER_CHUNK: usize = CHUNK_BITS / SUBCHUNK_BITS;
/// Trailing unused element slots reserved past the real data, sized to cover
/// one 64-byte (16-element) SIMD gather load.
pub const ELEMENT_CUSHION: usize = 64 / std::mem::size_of::<u32>();

/// A compressed bitmap over a sorted, unique `u32` posting list.
#[derive(Clone, Debug)]
pub struct CompressedBitmap {
    control: Vec<u16>,
    elements: Vec<u32>,
    real_len: usize,
}

fn flush_chunk(chunk: usize, dense: &mut [u32; SUBCHUNKS_PER_CHUNK], control: &mut [u16], elements: &mut Vec<u32>) {
    let mut mask: u16 = 0;
    for (k, &word) in dense.iter().enumerate() {
        if word != 0 {
            mask |= 1 << k;
            elements.push(word);
        }
    }
    control[chunk] = mask;
    *dense = [0u32; SUBCHUNKS_PER_CHUNK];
}

impl CompressedBitmap {
    /// Builds a compressed bitmap from a sorted, unique list of identifiers.
    ///
    /// `largest`, if given, fixes the identifier universe (and therefore the
    /// chunk count) independently of this list's own maximum; callers
    /// building a corpus of several lists that must share a chunk count
    /// (every bitscan query folds several bitmaps together chunk by chunk)
    /// always pass the corpus-wide maximum here.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::EmptyList`] if `sorted` has no elements.
    pub fn build(sorted: &[u32], largest: Option<u32>) -> BitmapResult<Self> {
        let Some(&own_largest) = sorted.last() else {
            return Err(BitmapError::EmptyList);
        };
        let largest = largest.unwrap_or(own_largest);
        let chunk_count = largest as usize / CHUNK_BITS + 1;

        let mut control = vec![0u16; chunk_count];
        let mut elements = Vec::new();
        let mut dense = [0u32; SUBCHUNKS_PER_CHUNK];
        let mut cur_chunk = 0usize;

        for &v in sorted {
            let chunk = v as usize / CHUNK_BITS;
            if chunk != cur_chunk {
                flush_chunk(cur_chunk, &mut dense, &mut control, &mut elements);
                cur_chunk = chunk;
            }
            let within = v as usize % CHUNK_BITS;
            let sub = within / SUBCHUNK_BITS;
            let subbit = within % SUBCHUNK_BITS;
            dense[sub] |= 1u32 << subbit;
        }
        flush_chunk(cur_chunk, &mut dense, &mut control, &mut elements);

        let real_len = elements.len();
        elements.resize(real_len + ELEMENT_CUSHION, 0);

        Ok(Self {
            control,
            elements,
            real_len,
        })
    }

    /// Number of 512-bit chunks in this bitmap.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.control.len()
    }

    /// Expands chunk `chunk_idx` to its dense 512-bit representation,
    /// advancing `eptr` by `popcount(control[chunk_idx])`.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::ChunkOutOfRange`] if `chunk_idx` is not a
    /// valid chunk of this bitmap.
    pub fn expand(&self, chunk_idx: usize, eptr: &mut usize) -> BitmapResult<ScalarWord> {
        if chunk_idx >= self.chunk_count() {
            return Err(BitmapError::ChunkOutOfRange {
                index: chunk_idx,
                chunk_count: self.chunk_count(),
            });
        }
        let mut mask = self.control[chunk_idx];
        let mut lanes = [0u64; 8];
        while mask != 0 {
            let k = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            debug_assert!(*eptr < self.real_len, "eptr walked past real element data");
            let word = self.elements[*eptr];
            *eptr += 1;
            let lane = k / 2;
            let shift = (k % 2) * 32;
            lanes[lane] |= u64::from(word) << shift;
        }
        Ok(ScalarWord::from_u64_lanes(lanes))
    }

    /// Reconstructs the complete sorted identifier list by walking every
    /// chunk. Used as a reference path by tests and by [`CompressedBitmap::build`]'s
    /// own round-trip doc example; not on the bitscan query hot path.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut eptr = 0usize;
        for chunk in 0..self.chunk_count() {
            let word = self
                .expand(chunk, &mut eptr)
                .expect("chunk index is in range by construction of the loop bound");
            for bit in word.set_bit_positions() {
                out.push(chunk as u32 * CHUNK_BITS as u32 + bit);
            }
        }
        out
    }

    /// Total size in bytes of the control words plus the real (non-cushion)
    /// element data.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.control.len() * std::mem::size_of::<u16>() + self.real_len * std::mem::size_of::<u32>()
    }
}

#[cfg(target_arch = "x86_64")]
mod avx512_expand {
    use super::{BitmapError, BitmapResult, CompressedBitmap};
    use accumulator::Avx512Word;
    use std::arch::x86_64::{_mm512_loadu_si512, _mm512_maskz_expand_epi32};

    impl CompressedBitmap {
        /// AVX-512 fast path for [`CompressedBitmap::expand`]: a hardware
        /// mask-expand (`_mm512_maskz_expand_epi32`) of a contiguous run of
        /// `popcount(control[chunk_idx])` elements into the lanes selected
        /// by the control word, in one instruction.
        ///
        /// # Safety
        ///
        /// The caller must have verified `Avx512Word::is_available()`; this
        /// function unconditionally executes `avx512f` intrinsics.
        ///
        /// # Errors
        ///
        /// Returns [`BitmapError::ChunkOutOfRange`] if `chunk_idx` is not a
        /// valid chunk of this bitmap.
        #[allow(unsafe_code)]
        pub fn expand_avx512(&self, chunk_idx: usize, eptr: &mut usize) -> BitmapResult<Avx512Word> {
            if chunk_idx >= self.chunk_count() {
                return Err(BitmapError::ChunkOutOfRange {
                    index: chunk_idx,
                    chunk_count: self.chunk_count(),
                });
            }
            let mask = self.control[chunk_idx];
            let popcount = mask.count_ones() as usize;
            debug_assert!(
                *eptr + popcount <= self.elements.len(),
                "gather load must stay within the element buffer's cushion"
            );
            // SAFETY: `elements` always carries ELEMENT_CUSHION trailing
            // zeroed u32 slots past `real_len`, so a 64-byte (16-lane) load
            // starting at `*eptr` never reads past the allocation even when
            // `popcount` is small and the load reads unused lanes.
            let word = unsafe {
                let src = _mm512_loadu_si512(self.elements[*eptr..].as_ptr().cast());
                _mm512_maskz_expand_epi32(mask, src)
            };
            *eptr += popcount;
            Ok(Avx512Word::from_register(word))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_sorted_list() {
        let bm = CompressedBitmap::build(&[3, 5, 900], None).unwrap();
        assert_eq!(bm.indices(), vec![3, 5, 900]);
    }

    #[test]
    fn single_element_at_chunk_boundaries() {
        for v in [0u32, 511, 512, 1023] {
            let bm = CompressedBitmap::build(&[v], None).unwrap();
            assert_eq!(bm.indices(), vec![v]);
        }
    }

    #[test]
    fn boundary_chunks_have_expected_control_words() {
        // L1 = {512}: chunk 0 is entirely empty, chunk 1 has exactly one bit.
        let bm = CompressedBitmap::build(&[512], None).unwrap();
        assert_eq!(bm.chunk_count(), 2);
        let mut eptr = 0;
        let chunk0 = bm.expand(0, &mut eptr).unwrap();
        assert!(chunk0.is_zero());
        let chunk1 = bm.expand(1, &mut eptr).unwrap();
        assert_eq!(chunk1.set_bit_positions(), vec![0]);
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            CompressedBitmap::build(&[], None),
            Err(BitmapError::EmptyList)
        ));
    }

    #[test]
    fn popcount_of_control_matches_element_count() {
        let values: Vec<u32> = (0..2000).step_by(7).collect();
        let bm = CompressedBitmap::build(&values, None).unwrap();
        let mut eptr = 0usize;
        for chunk in 0..bm.chunk_count() {
            bm.expand(chunk, &mut eptr).unwrap();
        }
        // Every expand call together consume exactly the real (non-cushion)
        // element data, which is what byte_size() reports.
        assert_eq!(
            eptr * std::mem::size_of::<u32>() + bm.chunk_count() * std::mem::size_of::<u16>(),
            bm.byte_size()
        );
        assert_eq!(bm.indices(), values);
    }

    #[test]
    fn expand_rejects_out_of_range_chunk() {
        let bm = CompressedBitmap::build(&[1], None).unwrap();
        let mut eptr = 0;
        assert!(matches!(
            bm.expand(bm.chunk_count(), &mut eptr),
            Err(BitmapError::ChunkOutOfRange { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_preserves_any_sorted_unique_list(
                mut values in prop::collection::btree_set(0u32..100_000, 1..200)
            ) {
                let sorted: Vec<u32> = values.drain().collect();
                let bm = CompressedBitmap::build(&sorted, None).unwrap();
                prop_assert_eq!(bm.indices(), sorted);
            }
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx512_expand_matches_scalar_expand() {
        use accumulator::{Avx512Word, Word};

        if !Avx512Word::is_available() {
            return;
        }
        let values: Vec<u32> = (0..5000).step_by(3).collect();
        let bm = CompressedBitmap::build(&values, None).unwrap();
        for chunk in 0..bm.chunk_count() {
            let mut scalar_eptr = 0;
            let mut avx_eptr = 0;
            for earlier in 0..chunk {
                let _ = bm.expand(earlier, &mut scalar_eptr);
                let _ = bm.expand_avx512(earlier, &mut avx_eptr);
            }
            let scalar = bm.expand(chunk, &mut scalar_eptr).unwrap();
            let avx = bm.expand_avx512(chunk, &mut avx_eptr).unwrap();
            assert_eq!(scalar.to_u64_lanes(), avx.to_u64_lanes());
        }
    }
}

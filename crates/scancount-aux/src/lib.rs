#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `scancount-aux` rewrites a single posting list into the cache-blocked
//! layout the scancount kernel sweeps: each cache window's elements are
//! rebased to a small non-negative offset, packed contiguously, padded to a
//! multiple of the unroll factor, and annotated with an overshoot count for
//! elements that spilled past the window boundary.
//!
//! # Design
//!
//! Every list in a corpus is built against the same `universe_largest` (the
//! maximum identifier across the whole corpus, not just this list) so that
//! every list's aux has the same number of chunks, letting the scancount
//! driver zip per-list descriptors together chunk by chunk even when lists
//! have very different lengths.
//!
//! # Invariants
//!
//! - `iter >= 1` for every chunk, even one with no elements in its window
//!   (the builder still emits one filler-only block of `unroll` zeros, so
//!   the kernel never special-cases an empty chunk).
//! - `overshoot < window`.
//! - Every rewritten value fits a `u32` and is either the filler sentinel
//!   `0` or in `[offset, offset + window + overshoot)`.
//!
//! # Errors
//!
//! [`ScancountAuxError::EmptyList`], [`ScancountAuxError::InvalidWindow`],
//! [`ScancountAuxError::InvalidUnroll`].

mod error;

pub use error::{ScancountAuxError, ScancountAuxResult};

/// Default cache window size, in identifiers. A multiple of 64; sized so a
/// window's counters fit comfortably in L1/L2 cache.
pub const DEFAULT_WINDOW: u32 = 40_000;
/// Default unroll factor for the scancount kernel's inner loop.
pub const DEFAULT_UNROLL: u32 = 16;
/// Default counter offset `K`: filler writes land in `[0, K)`, which the hit
/// extractor never scans.
pub const DEFAULT_OFFSET: u32 = 64;

/// Per-chunk metadata describing one list's contribution to one cache
/// window: where its rewritten data starts, how many unrolled iterations to
/// run, and how many of its elements spilled past the window boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChunkDescriptor {
    /// Offset into the owning [`ScancountAux`]'s rewritten data where this
    /// chunk's block starts.
    pub start: u32,
    /// Number of `unroll`-wide iterations the kernel must run for this
    /// chunk (always at least 1).
    pub iter: u32,
    /// Number of elements whose rewritten value lands past `window`,
    /// carried forward into the next chunk's counter scratch.
    pub overshoot: u32,
}

/// Rewritten-data preprocessing for a single posting list.
#[derive(Clone, Debug)]
pub struct ScancountAux {
    rewritten: Vec<u32>,
    chunks: Vec<ChunkDescriptor>,
    window: u32,
    unroll: u32,
    offset: u32,
}

impl ScancountAux {
    /// Builds the rewritten-data layout for `list` against a shared
    /// `universe_largest` (typically the maximum identifier across an
    /// entire corpus, not just this list), so that every list built for the
    /// same corpus ends up with the same chunk count.
    ///
    /// # Errors
    ///
    /// Returns [`ScancountAuxError::EmptyList`] if `list` is empty,
    /// [`ScancountAuxError::InvalidWindow`] if `window` is zero or not a
    /// multiple of 64, or [`ScancountAuxError::InvalidUnroll`] if `unroll`
    /// is zero or not a power of two.
    pub fn build(
        list: &[u32],
        universe_largest: u32,
        window: u32,
        unroll: u32,
        offset: u32,
    ) -> ScancountAuxResult<Self> {
        if list.is_empty() {
            return Err(ScancountAuxError::EmptyList);
        }
        if window == 0 || window % 64 != 0 {
            return Err(ScancountAuxError::InvalidWindow { window });
        }
        if unroll == 0 || !unroll.is_power_of_two() {
            return Err(ScancountAuxError::InvalidUnroll { unroll });
        }

        let mut rewritten = Vec::new();
        let mut chunks = Vec::new();
        let mut pos = 0usize;
        let mut rstart: u32 = 0;

        loop {
            let rend = u64::from(rstart) + u64::from(window);
            let spos = pos;
            while pos < list.len() && u64::from(list[pos]) < rend {
                pos = (pos + unroll as usize).min(list.len());
            }
            let block = &list[spos..pos];

            let start = u32::try_from(rewritten.len()).expect("rewritten data fits in u32");
            for &v in block {
                debug_assert!(v >= rstart, "block elements must not precede their own window");
                rewritten.push(v - rstart + offset);
            }
            let padded = block.len().div_ceil(unroll as usize).max(1) * unroll as usize;
            rewritten.resize(start as usize + padded, 0);

            let overshoot = block.last().map_or(0, |&last| {
                let last = u64::from(last);
                if last >= rend {
                    u32::try_from(last - rend + 1).expect("overshoot fits in u32 since it is < window")
                } else {
                    0
                }
            });

            chunks.push(ChunkDescriptor {
                start,
                iter: (padded / unroll as usize) as u32,
                overshoot,
            });

            if u64::from(rstart) >= u64::from(universe_largest) {
                break;
            }
            rstart += window;
        }

        Ok(Self {
            rewritten,
            chunks,
            window,
            unroll,
            offset,
        })
    }

    /// Number of cache-window chunks this aux was built over.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The descriptor for chunk `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.chunk_count()`; the scancount driver always
    /// iterates `0..chunk_count()` shared across every list in a corpus.
    #[must_use]
    pub fn descriptor(&self, idx: usize) -> ChunkDescriptor {
        self.chunks[idx]
    }

    /// Borrows the rewritten data belonging to `descriptor`.
    #[must_use]
    pub fn rewritten_slice(&self, descriptor: ChunkDescriptor) -> &[u32] {
        let start = descriptor.start as usize;
        let len = descriptor.iter as usize * self.unroll as usize;
        &self.rewritten[start..start + len]
    }

    /// Cache window size this aux was built with.
    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Unroll factor this aux was built with.
    #[must_use]
    pub fn unroll(&self) -> u32 {
        self.unroll
    }

    /// Counter offset `K` this aux was built with.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

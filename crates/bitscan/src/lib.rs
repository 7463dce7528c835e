#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `bitscan` answers threshold-counting queries over a corpus of
//! [`bitmap::CompressedBitmap`]s by folding expanded chunks through
//! [`accumulator::Accumulator`] trees, eight lists at a time, and emitting
//! every identifier whose accumulator saturates (meaning it was hit by
//! strictly more than `t` of the queried lists).
//!
//! # Design
//!
//! The corpus is swept in passes of 128 chunks. Within a pass, lists are
//! processed eight at a time via [`accumulator::Accumulator::accept8`]
//! (a 3-level Wallace-tree carry-save reduction); any remaining 0-7 lists
//! use plain [`accumulator::Accumulator::accept`]. Each accumulator is
//! pre-biased so its saturation flag flips at exactly `t + 1` accepted
//! hits, turning threshold detection into reading the saturation word.
//!
//! The accumulator's bit width `B = ceil(log2(t + 1))` is picked at query
//! time and threaded through a small compile-time dispatch (`B` ranges from
//! 1 to 4, since `MAX_T` is fixed at 16) so the hot loop always runs against
//! a const-generic specialisation.
//!
//! # Invariants
//!
//! - Output is produced in ascending identifier order (chunks are visited in
//!   ascending order; saturated bits are read low to high within a chunk).
//! - `t` must be strictly less than [`accumulator::MAX_T`].
//!
//! # Errors
//!
//! [`BitscanError`] covers an out-of-range query threshold, a query
//! referencing an unknown list, and bitmap construction failures.
//!
//! # Examples
//!
//! ```
//! use bitscan::{build_bitmaps, bitscan};
//!
//! let lists = vec![vec![1, 3], vec![3, 5], vec![3]];
//! let corpus = build_bitmaps(&lists).unwrap();
//! let hits = bitscan(&corpus, &[0, 1, 2], 1).unwrap();
//! assert_eq!(hits, vec![3]);
//! ```

mod error;

pub use error::{BitscanError, BitscanResult};

use accumulator::{bits_for_threshold, Accumulator, ScalarWord, Word, MAX_T};
use bitmap::CompressedBitmap;

/// Number of chunks processed per pass before accumulators are reset and
/// their saturated bits drained into the output.
const PASS_CHUNKS: usize = 128;

/// Immutable, corpus-wide collection of compressed bitmaps, one per posting
/// list, built to share a single chunk count so any subset of lists can be
/// folded together chunk-for-chunk.
#[derive(Debug)]
pub struct BitmapCorpus {
    bitmaps: Vec<CompressedBitmap>,
    chunk_count: usize,
}

impl BitmapCorpus {
    /// Number of posting lists stored in this corpus.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.bitmaps.len()
    }

    /// Number of 512-bit chunks shared by every bitmap in this corpus.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

/// Builds a [`BitmapCorpus`] from a collection of sorted, unique posting
/// lists, one compressed bitmap per list, all sharing the corpus-wide
/// maximum identifier so any subset of lists can be intersected chunk by
/// chunk.
///
/// # Errors
///
/// Returns [`BitscanError::Bitmap`] (wrapping [`bitmap::BitmapError::EmptyList`])
/// if any posting list is empty.
pub fn build_bitmaps(lists: &[Vec<u32>]) -> BitscanResult<BitmapCorpus> {
    let largest = lists.iter().filter_map(|l| l.last().copied()).max();
    let Some(largest) = largest else {
        return Ok(BitmapCorpus {
            bitmaps: Vec::new(),
            chunk_count: 0,
        });
    };

    let mut bitmaps = Vec::with_capacity(lists.len());
    for list in lists {
        bitmaps.push(CompressedBitmap::build(list, Some(largest))?);
    }
    let chunk_count = bitmaps.first().map_or(0, CompressedBitmap::chunk_count);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        list_count = bitmaps.len(),
        chunk_count,
        "built bitmap corpus"
    );

    Ok(BitmapCorpus {
        bitmaps,
        chunk_count,
    })
}

fn validate_query(corpus: &BitmapCorpus, list_ids: &[u32], t: u8) -> BitscanResult<()> {
    if t >= MAX_T {
        return Err(BitscanError::ThresholdTooLarge {
            threshold: t,
            max_t: MAX_T,
        });
    }
    for &id in list_ids {
        if id as usize >= corpus.list_count() {
            return Err(BitscanError::ListIndexOutOfRange {
                index: id,
                list_count: corpus.list_count(),
            });
        }
    }
    Ok(())
}

/// Runs a threshold-counting query over `corpus`, returning every identifier
/// that occurs in strictly more than `t` of the named lists, in ascending
/// order.
///
/// # Errors
///
/// See [`BitscanError`]: an out-of-range threshold or list index.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(corpus)))]
pub fn bitscan(corpus: &BitmapCorpus, list_ids: &[u32], t: u8) -> BitscanResult<Vec<u32>> {
    validate_query(corpus, list_ids, t)?;
    let b = bits_for_threshold(t);
    let hits = match b {
        1 => bitscan_with_width::<1>(corpus, list_ids, t),
        2 => bitscan_with_width::<2>(corpus, list_ids, t),
        3 => bitscan_with_width::<3>(corpus, list_ids, t),
        4 => bitscan_with_width::<4>(corpus, list_ids, t),
        _ => unreachable!("validate_query bounds t below MAX_T, so b is at most 4"),
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(query_width = list_ids.len(), threshold = t, hit_count = hits.len(), "bitscan query complete");

    hits
}

fn bitscan_with_width<const B: usize>(
    corpus: &BitmapCorpus,
    list_ids: &[u32],
    t: u8,
) -> BscResult {
    let bias = (1usize << B) - t as usize - 1;
    let mut cursors = vec![0usize; list_ids.len()];
    let mut out = Vec::new();

    let mut pass_start = 0usize;
    while pass_start < corpus.chunk_count {
        let pass_len = PASS_CHUNKS.min(corpus.chunk_count - pass_start);
        let mut accums: Vec<Accumulator<B, ScalarWord>> =
            (0..pass_len).map(|_| Accumulator::new(bias)).collect();

        let mut group_start = 0usize;
        while group_start < list_ids.len() {
            let group_end = (group_start + 8).min(list_ids.len());
            let group = &list_ids[group_start..group_end];

            if group.len() == 8 {
                for (local, acc) in accums.iter_mut().enumerate() {
                    let chunk = pass_start + local;
                    let mut words = [ScalarWord::zero(); 8];
                    for (gi, &lid) in group.iter().enumerate() {
                        words[gi] = expand_chunk(corpus, lid, chunk, &mut cursors[group_start + gi]);
                    }
                    acc.accept8(
                        words[0], words[1], words[2], words[3], words[4], words[5], words[6],
                        words[7],
                    );
                }
            } else {
                for (local, acc) in accums.iter_mut().enumerate() {
                    let chunk = pass_start + local;
                    for (gi, &lid) in group.iter().enumerate() {
                        let w = expand_chunk(corpus, lid, chunk, &mut cursors[group_start + gi]);
                        acc.accept(w);
                    }
                }
            }
            group_start = group_end;
        }

        for (local, acc) in accums.iter().enumerate() {
            let global_chunk = (pass_start + local) as u32;
            for bit in acc.get_saturated().set_bit_positions() {
                out.push(global_chunk * bitmap::CHUNK_BITS as u32 + bit);
            }
        }
        pass_start += pass_len;
    }

    Ok(out)
}

type BscResult = BitscanResult<Vec<u32>>;

fn expand_chunk(corpus: &BitmapCorpus, list_id: u32, chunk: usize, eptr: &mut usize) -> ScalarWord {
    corpus.bitmaps[list_id as usize]
        .expand(chunk, eptr)
        .expect("every bitmap in a corpus shares chunk_count, so chunk is always in range")
}

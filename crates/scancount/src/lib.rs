#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `scancount` answers threshold-counting queries by sweeping cache-window
//! chunks of [`scancount_aux::ScancountAux`] rewritten data through a plain
//! 8-bit-per-identifier counter array, then extracting every identifier
//! whose counter exceeds the query threshold.
//!
//! # Design
//!
//! Per chunk: the counting [`kernel::Kernel`] increments one byte per
//! rewritten value across every participating list's block for this
//! window; the [`extract`] module then scans the live portion of the
//! counter buffer for bytes strictly greater than `t`; finally any counts
//! that spilled past the window (recorded per list as
//! [`scancount_aux::ChunkDescriptor::overshoot`]) are carried forward as
//! the starting state for the next chunk, and the scratch buffer is
//! rewound to a clean slate before the next chunk's kernel pass.
//!
//! Carrying overshoot forward zeroes a full window-sized span starting
//! right after the copied-down prefix, rather than only the span up to the
//! window boundary: this also clears the upper half of the scratch buffer
//! that the copy just read from, which the kernel will otherwise pollute
//! with stale counts on the next pass.
//!
//! # Invariants
//!
//! - `t` must be strictly less than [`MAX_T`].
//! - A query may name at most [`MAX_LISTS_PER_QUERY`] lists, so an 8-bit
//!   counter cannot overflow even if every named list hits the same
//!   identifier.
//! - Output is produced in ascending identifier order.
//!
//! # Errors
//!
//! [`ScancountError`] covers an out-of-range query threshold, a query
//! referencing an unknown list, a too-wide query, and invalid build-time
//! tuning parameters.
//!
//! # Examples
//!
//! ```
//! use scancount::{build_scancount_aux, scancount, QueryExecutor};
//!
//! let lists = vec![vec![1, 3], vec![3, 5], vec![3]];
//! let corpus = build_scancount_aux(&lists, 64, 16, 64).unwrap();
//! let mut executor = QueryExecutor::new();
//! let hits = scancount(&mut executor, &corpus, &[0, 1, 2], 1).unwrap();
//! assert_eq!(hits, vec![3]);
//! ```

mod error;
mod extract;
mod kernel;
mod scratch;

pub use error::{ScancountError, ScancountResult};
pub use kernel::Kernel;

use scancount_aux::{ChunkDescriptor, ScancountAux, ScancountAuxError};
use scratch::AlignedCounters;

/// Crate-wide threshold ceiling; a query threshold must be strictly less
/// than this.
pub const MAX_T: u8 = 16;

/// Largest number of lists a single query may name, bounded by what an
/// 8-bit counter can accumulate without risk of overflow.
pub const MAX_LISTS_PER_QUERY: usize = u8::MAX as usize;

/// Immutable, corpus-wide collection of per-list rewritten-data builders,
/// one [`ScancountAux`] per posting list, all sharing a chunk count.
#[derive(Debug)]
pub struct ScancountCorpus {
    auxes: Vec<ScancountAux>,
    window: u32,
    unroll: u32,
    offset: u32,
    chunk_count: usize,
}

impl ScancountCorpus {
    /// Number of posting lists stored in this corpus.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.auxes.len()
    }

    /// Number of cache-window chunks shared by every list in this corpus.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Cache window size this corpus was built with.
    #[must_use]
    pub fn window(&self) -> u32 {
        self.window
    }
}

/// Builds a [`ScancountCorpus`] from a collection of sorted, unique posting
/// lists, one rewritten-data aux per list, all sharing the corpus-wide
/// maximum identifier so any subset of lists can be swept chunk by chunk.
///
/// # Errors
///
/// Returns [`ScancountError::EmptyList`] if any posting list is empty,
/// [`ScancountError::InvalidWindow`] if `window` is zero or not a multiple
/// of 64, or [`ScancountError::InvalidUnroll`] if `unroll` is zero or not a
/// power of two.
pub fn build_scancount_aux(
    lists: &[Vec<u32>],
    window: u32,
    unroll: u32,
    offset: u32,
) -> ScancountResult<ScancountCorpus> {
    for (index, list) in lists.iter().enumerate() {
        if list.is_empty() {
            return Err(ScancountError::EmptyList { index });
        }
    }
    if window == 0 || window % 64 != 0 {
        return Err(ScancountError::InvalidWindow { window });
    }
    if unroll == 0 || !unroll.is_power_of_two() {
        return Err(ScancountError::InvalidUnroll { unroll });
    }

    let largest = lists.iter().filter_map(|l| l.last().copied()).max().unwrap_or(0);

    let mut auxes = Vec::with_capacity(lists.len());
    for (index, list) in lists.iter().enumerate() {
        let aux = ScancountAux::build(list, largest, window, unroll, offset).map_err(|e| match e {
            ScancountAuxError::EmptyList => ScancountError::EmptyList { index },
            ScancountAuxError::InvalidWindow { window } => ScancountError::InvalidWindow { window },
            ScancountAuxError::InvalidUnroll { unroll } => ScancountError::InvalidUnroll { unroll },
        })?;
        auxes.push(aux);
    }
    let chunk_count = auxes.first().map_or(0, ScancountAux::chunk_count);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        list_count = auxes.len(),
        chunk_count,
        window,
        unroll,
        "built scancount aux corpus"
    );

    Ok(ScancountCorpus {
        auxes,
        window,
        unroll,
        offset,
        chunk_count,
    })
}

/// Per-worker owner of the counting kernel's scratch state: a 64-byte
/// aligned counter buffer reused across queries. Cheap to construct,
/// expensive to share — each concurrent caller needs its own.
pub struct QueryExecutor {
    counters: AlignedCounters,
    kernel: Kernel,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExecutor {
    /// Builds an executor using the kernel [`Kernel::detect`] picks for the
    /// running CPU.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: AlignedCounters::new(0),
            kernel: Kernel::detect(),
        }
    }

    /// Builds an executor pinned to a specific kernel back end, bypassing
    /// runtime feature detection. Correctness tests use this to exercise
    /// [`Kernel::Portable`] unconditionally.
    #[must_use]
    pub fn with_kernel(kernel: Kernel) -> Self {
        Self {
            counters: AlignedCounters::new(0),
            kernel,
        }
    }
}

fn validate_query(corpus: &ScancountCorpus, list_ids: &[u32], t: u8) -> ScancountResult<()> {
    if t >= MAX_T {
        return Err(ScancountError::ThresholdTooLarge { threshold: t, max_t: MAX_T });
    }
    if list_ids.len() > MAX_LISTS_PER_QUERY {
        return Err(ScancountError::TooManyListsForCounter {
            list_count: list_ids.len(),
            max: MAX_LISTS_PER_QUERY,
        });
    }
    for &id in list_ids {
        if id as usize >= corpus.list_count() {
            return Err(ScancountError::ListIndexOutOfRange {
                index: id,
                list_count: corpus.list_count(),
            });
        }
    }
    Ok(())
}

/// Runs a threshold-counting query over `corpus`, returning every
/// identifier that occurs in strictly more than `t` of the named lists, in
/// ascending order.
///
/// # Errors
///
/// See [`ScancountError`]: an out-of-range threshold, list index, or a
/// query naming more lists than an 8-bit counter can track.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(executor, corpus)))]
pub fn scancount(
    executor: &mut QueryExecutor,
    corpus: &ScancountCorpus,
    list_ids: &[u32],
    t: u8,
) -> ScancountResult<Vec<u32>> {
    validate_query(corpus, list_ids, t)?;

    let window = corpus.window as usize;
    let offset = corpus.offset as usize;
    let total_len = offset + 2 * window;
    executor.counters.ensure_len(total_len);
    executor.counters.zero();

    let mut out = Vec::new();

    for chunk in 0..corpus.chunk_count {
        let descriptors: Vec<ChunkDescriptor> = list_ids
            .iter()
            .map(|&id| corpus.auxes[id as usize].descriptor(chunk))
            .collect();
        let blocks: Vec<&[u32]> = list_ids
            .iter()
            .zip(&descriptors)
            .map(|(&id, &d)| corpus.auxes[id as usize].rewritten_slice(d))
            .collect();

        executor.kernel.run(&mut executor.counters[..total_len], &blocks);

        let rstart = u32::try_from(chunk as u64 * u64::from(corpus.window))
            .expect("chunk start fits in u32 for any corpus built by build_scancount_aux");
        let window_slice = &executor.counters[offset..offset + window];
        extract::extract_hits_auto(window_slice, t, rstart, &mut out);

        let max_overshoot = descriptors.iter().map(|d| d.overshoot as usize).max().unwrap_or(0);
        if max_overshoot > 0 {
            executor
                .counters
                .copy_within(offset + window..offset + window + max_overshoot, offset);
        }
        // Zero a full `window`-byte span starting right after the
        // copied-down overshoot prefix. This covers both the stale tail of
        // the lower half and the upper-half entries the copy just read
        // from, matching the original's `memzero(counters + overshoot, W)`
        // rather than only zeroing up to the window boundary.
        let zero_start = offset + max_overshoot;
        executor.counters[zero_start..zero_start + window].fill(0);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(query_width = list_ids.len(), threshold = t, hit_count = out.len(), "scancount query complete");

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> QueryExecutor {
        // Correctness tests run the portable kernel unconditionally.
        QueryExecutor::with_kernel(Kernel::Portable)
    }

    #[test]
    fn scenario_three_lists_threshold_one() {
        let lists = vec![vec![1, 3], vec![3, 5], vec![3]];
        let corpus = build_scancount_aux(&lists, 64, 16, 64).unwrap();
        let mut exec = executor();
        assert_eq!(scancount(&mut exec, &corpus, &[0, 1, 2], 1).unwrap(), vec![3]);
    }

    #[test]
    fn scenario_overlapping_ranges() {
        let l0: Vec<u32> = (0..=600).collect();
        let l1: Vec<u32> = (500..=700).collect();
        let corpus = build_scancount_aux(&[l0, l1], 64, 16, 64).unwrap();
        let mut exec = executor();

        let union = scancount(&mut exec, &corpus, &[0, 1], 0).unwrap();
        let expected_union: Vec<u32> = (0..=700).collect();
        assert_eq!(union, expected_union);

        let overlap = scancount(&mut exec, &corpus, &[0, 1], 1).unwrap();
        let expected_overlap: Vec<u32> = (500..=600).collect();
        assert_eq!(overlap, expected_overlap);
    }

    #[test]
    fn scenario_adjacent_chunk_boundary() {
        let corpus = build_scancount_aux(&[vec![63], vec![64]], 64, 16, 64).unwrap();
        let mut exec = executor();
        assert_eq!(scancount(&mut exec, &corpus, &[0, 1], 0).unwrap(), vec![63, 64]);
    }

    #[test]
    fn threshold_at_max_t_is_rejected() {
        let corpus = build_scancount_aux(&[vec![1]], 64, 16, 64).unwrap();
        let mut exec = executor();
        let err = scancount(&mut exec, &corpus, &[0], MAX_T).unwrap_err();
        assert!(matches!(err, ScancountError::ThresholdTooLarge { .. }));
    }

    #[test]
    fn out_of_range_list_index_is_rejected() {
        let corpus = build_scancount_aux(&[vec![1]], 64, 16, 64).unwrap();
        let mut exec = executor();
        let err = scancount(&mut exec, &corpus, &[5], 0).unwrap_err();
        assert!(matches!(err, ScancountError::ListIndexOutOfRange { .. }));
    }

    #[test]
    fn empty_list_is_rejected_at_build_time() {
        let err = build_scancount_aux(&[vec![1], vec![]], 64, 16, 64).unwrap_err();
        assert!(matches!(err, ScancountError::EmptyList { index: 1 }));
    }

    #[test]
    fn too_many_lists_is_rejected_before_running_the_kernel() {
        let lists: Vec<Vec<u32>> = (0..300u32).map(|i| vec![i]).collect();
        let corpus = build_scancount_aux(&lists, 64, 16, 64).unwrap();
        let mut exec = executor();
        let ids: Vec<u32> = (0..300).collect();
        let err = scancount(&mut exec, &corpus, &ids, 0).unwrap_err();
        assert!(matches!(err, ScancountError::TooManyListsForCounter { .. }));
    }

    #[test]
    fn query_spanning_many_chunks_with_overshoot_matches_brute_force() {
        use std::collections::BTreeMap;

        let l0: Vec<u32> = (0..20_000).step_by(7).collect();
        let l1: Vec<u32> = (0..20_000).step_by(11).collect();
        let l2: Vec<u32> = (0..20_000).step_by(13).collect();
        let corpus = build_scancount_aux(&[l0.clone(), l1.clone(), l2.clone()], 64, 16, 64).unwrap();
        let mut exec = executor();

        let hits = scancount(&mut exec, &corpus, &[0, 1, 2], 1).unwrap();

        let mut tally: BTreeMap<u32, u32> = BTreeMap::new();
        for v in l0.into_iter().chain(l1).chain(l2) {
            *tally.entry(v).or_insert(0) += 1;
        }
        let expected: Vec<u32> = tally.into_iter().filter(|&(_, c)| c > 1).map(|(v, _)| v).collect();
        assert_eq!(hits, expected);
    }

    #[test]
    fn repeated_queries_reuse_the_executor_without_stale_state() {
        let corpus = build_scancount_aux(&[vec![1, 65], vec![1]], 64, 16, 64).unwrap();
        let mut exec = executor();
        assert_eq!(scancount(&mut exec, &corpus, &[0, 1], 1).unwrap(), vec![1]);
        assert_eq!(scancount(&mut exec, &corpus, &[0], 0).unwrap(), vec![1, 65]);
        assert_eq!(scancount(&mut exec, &corpus, &[0, 1], 1).unwrap(), vec![1]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn brute_force(lists: &[Vec<u32>], list_ids: &[u32], t: u8) -> Vec<u32> {
            let mut tally: BTreeMap<u32, u32> = BTreeMap::new();
            for &lid in list_ids {
                for &v in &lists[lid as usize] {
                    *tally.entry(v).or_insert(0) += 1;
                }
            }
            tally.into_iter().filter(|&(_, count)| count > u32::from(t)).map(|(v, _)| v).collect()
        }

        proptest! {
            #[test]
            fn agrees_with_brute_force_reference(
                lists in prop::collection::vec(
                    prop::collection::btree_set(0u32..5_000, 1..80),
                    2..6,
                ),
                t in 0u8..6,
            ) {
                let lists: Vec<Vec<u32>> = lists.into_iter().map(|s| s.into_iter().collect()).collect();
                let corpus = build_scancount_aux(&lists, 64, 16, 64).unwrap();
                let mut exec = QueryExecutor::with_kernel(Kernel::Portable);
                let ids: Vec<u32> = (0..lists.len() as u32).collect();
                let hits = scancount(&mut exec, &corpus, &ids, t).unwrap();
                prop_assert_eq!(hits, brute_force(&lists, &ids, t));
            }
        }
    }
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `threshold-count` answers "which identifiers occur in more than `t` of
//! these posting lists" queries two ways — [`bitscan`] over compressed
//! bitmaps and [`scancount`] over a cache-blocked rewritten-data sweep —
//! and wires both engines to a shared build-time façade, [`Corpus`], plus
//! a slow reference implementation, [`naive_scancount`], used by this
//! crate's own tests to check the two fast engines against ground truth.
//!
//! # Design
//!
//! Each engine lives in its own sub-crate ([`accumulator`], [`bitmap`],
//! [`bitscan`], [`scancount_aux`], [`scancount`]); this crate only
//! aggregates their build/query entry points behind one error type,
//! [`ThresholdCountError`], and adds the ambient concerns neither engine
//! needs on its own: a reference implementation for tests, structured
//! logging spans, and an optional `rayon`-backed batch query helper.
//!
//! # Invariants
//!
//! Every exposed entry point validates its arguments eagerly (empty
//! lists, out-of-range thresholds or list indices, oversized queries)
//! before doing any work; see [`ThresholdCountError`].
//!
//! # Errors
//!
//! [`ThresholdCountError`] is the single error type returned by every
//! entry point in this crate.
//!
//! # Examples
//!
//! ```
//! use threshold_count::Corpus;
//!
//! let lists = vec![vec![1, 3], vec![3, 5], vec![3]];
//! let corpus = Corpus::build(&lists).unwrap();
//! assert_eq!(corpus.bitscan(&[0, 1, 2], 1).unwrap(), vec![3]);
//! assert_eq!(corpus.bitscan(&[0, 1, 2], 1).unwrap(), corpus.scancount(&[0, 1, 2], 1).unwrap());
//! ```

mod error;

pub use error::{ThresholdCountError, ThresholdCountResult};

pub use bitscan::BitmapCorpus;
pub use scancount::{Kernel, QueryExecutor, ScancountCorpus};

use rustc_hash::FxHashMap;
use std::sync::Mutex;

/// Crate-wide threshold ceiling; shared by every engine in this workspace.
pub const MAX_T: u8 = accumulator::MAX_T;

/// Builds a [`BitmapCorpus`], one compressed bitmap per posting list.
///
/// # Errors
///
/// Returns [`ThresholdCountError::EmptyList`] if any list is empty.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(lists)))]
pub fn build_bitmaps(lists: &[Vec<u32>]) -> ThresholdCountResult<BitmapCorpus> {
    for (index, list) in lists.iter().enumerate() {
        if list.is_empty() {
            return Err(ThresholdCountError::EmptyList { index });
        }
    }
    let corpus = bitscan::build_bitmaps(lists)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(list_count = corpus.list_count(), chunk_count = corpus.chunk_count(), "built bitmap corpus");

    Ok(corpus)
}

/// Builds a [`ScancountCorpus`], one rewritten-data aux per posting list.
///
/// # Errors
///
/// Returns [`ThresholdCountError::EmptyList`], [`ThresholdCountError::InvalidWindow`],
/// or [`ThresholdCountError::InvalidUnroll`] on invalid input.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(lists)))]
pub fn build_scancount_aux(
    lists: &[Vec<u32>],
    window: u32,
    unroll: u32,
    offset: u32,
) -> ThresholdCountResult<ScancountCorpus> {
    let corpus = scancount::build_scancount_aux(lists, window, unroll, offset)?;

    #[cfg(feature = "tracing")]
    tracing::debug!(list_count = corpus.list_count(), chunk_count = corpus.chunk_count(), "built scancount aux corpus");

    Ok(corpus)
}

/// Runs a threshold-counting query over a [`BitmapCorpus`] via the bitscan
/// engine, returning every identifier in strictly more than `t` of the
/// named lists, in ascending order.
///
/// # Errors
///
/// See [`ThresholdCountError`]: an out-of-range threshold or list index.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(corpus)))]
pub fn bitscan(corpus: &BitmapCorpus, list_ids: &[u32], t: u8) -> ThresholdCountResult<Vec<u32>> {
    Ok(bitscan::bitscan(corpus, list_ids, t)?)
}

/// Runs a threshold-counting query over a [`ScancountCorpus`] via the
/// scancount engine, returning every identifier in strictly more than `t`
/// of the named lists, in ascending order.
///
/// # Errors
///
/// See [`ThresholdCountError`]: an out-of-range threshold, list index, or a
/// query naming more lists than an 8-bit counter can track.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(executor, corpus)))]
pub fn scancount(
    executor: &mut QueryExecutor,
    corpus: &ScancountCorpus,
    list_ids: &[u32],
    t: u8,
) -> ThresholdCountResult<Vec<u32>> {
    Ok(scancount::scancount(executor, corpus, list_ids, t)?)
}

/// `O(sum of list lengths)` reference implementation, used by this crate's
/// own tests and doc examples to check [`bitscan`] and [`scancount`]
/// against ground truth. Not tuned for production use.
///
/// # Errors
///
/// See [`ThresholdCountError`]: an empty list, an out-of-range threshold,
/// or an out-of-range list index.
pub fn naive_scancount(lists: &[Vec<u32>], list_ids: &[u32], t: u8) -> ThresholdCountResult<Vec<u32>> {
    for (index, list) in lists.iter().enumerate() {
        if list.is_empty() {
            return Err(ThresholdCountError::EmptyList { index });
        }
    }
    if t >= MAX_T {
        return Err(ThresholdCountError::ThresholdTooLarge { threshold: t, max_t: MAX_T });
    }
    for &id in list_ids {
        if id as usize >= lists.len() {
            return Err(ThresholdCountError::ListIndexOutOfRange { index: id, list_count: lists.len() });
        }
    }

    let mut tally: FxHashMap<u32, u32> = FxHashMap::default();
    for &id in list_ids {
        for &v in &lists[id as usize] {
            *tally.entry(v).or_insert(0) += 1;
        }
    }
    let mut hits: Vec<u32> = tally
        .into_iter()
        .filter(|&(_, count)| count > u32::from(t))
        .map(|(v, _)| v)
        .collect();
    hits.sort_unstable();
    Ok(hits)
}

/// Build-time convenience wrapper owning both representations of a corpus
/// (compressed bitmaps and scancount rewritten-data), built with default
/// tuning. A [`QueryExecutor`] is owned internally and reused across
/// [`Corpus::scancount`] calls through a mutex, trading a small amount of
/// contention under concurrent queries for a simpler single-corpus API;
/// callers needing lock-free concurrency should build a [`ScancountCorpus`]
/// directly via [`build_scancount_aux`] and own one [`QueryExecutor`] per
/// worker.
pub struct Corpus {
    bitmaps: BitmapCorpus,
    scancount_aux: ScancountCorpus,
    executor: Mutex<QueryExecutor>,
}

impl Corpus {
    /// Builds both representations of a corpus from the same posting
    /// lists, using [`scancount_aux::DEFAULT_WINDOW`],
    /// [`scancount_aux::DEFAULT_UNROLL`] and [`scancount_aux::DEFAULT_OFFSET`]
    /// for the scancount tuning.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdCountError::EmptyList`] if any list is empty.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(lists)))]
    pub fn build(lists: &[Vec<u32>]) -> ThresholdCountResult<Self> {
        let bitmaps = build_bitmaps(lists)?;
        let scancount_aux = build_scancount_aux(
            lists,
            scancount_aux::DEFAULT_WINDOW,
            scancount_aux::DEFAULT_UNROLL,
            scancount_aux::DEFAULT_OFFSET,
        )?;
        Ok(Self {
            bitmaps,
            scancount_aux,
            executor: Mutex::new(QueryExecutor::new()),
        })
    }

    /// Number of posting lists in this corpus.
    #[must_use]
    pub fn list_count(&self) -> usize {
        self.bitmaps.list_count()
    }

    /// Borrows the compressed-bitmap representation.
    #[must_use]
    pub fn bitmaps(&self) -> &BitmapCorpus {
        &self.bitmaps
    }

    /// Borrows the scancount rewritten-data representation.
    #[must_use]
    pub fn scancount_aux(&self) -> &ScancountCorpus {
        &self.scancount_aux
    }

    /// Runs a query via the bitscan engine.
    ///
    /// # Errors
    ///
    /// See [`bitscan`].
    pub fn bitscan(&self, list_ids: &[u32], t: u8) -> ThresholdCountResult<Vec<u32>> {
        bitscan(&self.bitmaps, list_ids, t)
    }

    /// Runs a query via the scancount engine, using this corpus's shared,
    /// mutex-guarded [`QueryExecutor`].
    ///
    /// # Errors
    ///
    /// See [`scancount`].
    pub fn scancount(&self, list_ids: &[u32], t: u8) -> ThresholdCountResult<Vec<u32>> {
        let mut executor = self.executor.lock().expect("query executor mutex is never poisoned by a panicking query");
        scancount(&mut executor, &self.scancount_aux, list_ids, t)
    }
}

/// Runs a batch of independent queries across a `rayon` thread pool, one
/// [`QueryExecutor`] per task.
///
/// # Errors
///
/// Each element of the returned vector carries its own
/// [`ThresholdCountResult`]; a failure in one query never aborts the rest
/// of the batch.
#[cfg(feature = "parallel")]
pub fn scancount_batch(
    corpus: &ScancountCorpus,
    queries: &[(Vec<u32>, u8)],
) -> Vec<ThresholdCountResult<Vec<u32>>> {
    use rayon::prelude::*;

    queries
        .par_iter()
        .map(|(list_ids, t)| {
            let mut executor = QueryExecutor::new();
            scancount(&mut executor, corpus, list_ids, *t)
        })
        .collect()
}

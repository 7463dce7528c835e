//! The counting kernel: one portable Rust loop and a hand-unrolled,
//! bounds-check-free variant selected at runtime on `x86_64` via AVX2
//! detection.
//!
//! Both back ends share the same contract: given the counter scratch and a
//! list of per-list rewritten-data blocks for one cache window, increment
//! `counters[e]` for every rewritten value `e` in every block. Callers are
//! responsible for the invariant the aux builder guarantees: every value in
//! a block is a valid index into `counters`.

/// Selects which kernel back end [`crate::QueryExecutor`] runs.
///
/// Tests exercise [`Kernel::Portable`] unconditionally (per the workspace's
/// SIMD-vs-scalar parity convention) and additionally compare against
/// [`Kernel::Avx2`] wherever the host supports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    /// Plain, bounds-checked Rust loop. Runs on every platform.
    Portable,
    /// Hand-unrolled, pointer-based loop with no per-element bounds check.
    /// Falls back to [`Kernel::Portable`] at call time if AVX2 is not
    /// actually available on the running CPU.
    Avx2,
}

impl Kernel {
    /// Picks [`Kernel::Avx2`] when the running CPU supports it, otherwise
    /// [`Kernel::Portable`].
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return Kernel::Avx2;
            }
        }
        Kernel::Portable
    }

    /// Runs this kernel over `blocks` (one rewritten-data slice per
    /// participating list, already padded to a multiple of the aux
    /// builder's unroll factor), incrementing `counters` in place.
    pub fn run(self, counters: &mut [u8], blocks: &[&[u32]]) {
        match self {
            Kernel::Portable => run_portable(counters, blocks),
            Kernel::Avx2 => {
                #[cfg(target_arch = "x86_64")]
                {
                    if is_x86_feature_detected!("avx2") {
                        avx2::run_avx2(counters, blocks);
                        return;
                    }
                }
                run_portable(counters, blocks);
            }
        }
    }
}

/// Portable counting loop: plain, bounds-checked slice indexing.
pub fn run_portable(counters: &mut [u8], blocks: &[&[u32]]) {
    for block in blocks {
        for &e in *block {
            let slot = &mut counters[e as usize];
            debug_assert!(
                *slot < u8::MAX,
                "counter overflow; TooManyListsForCounter should have rejected this query"
            );
            *slot = slot.wrapping_add(1);
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
mod avx2 {
    /// Hand-unrolled counting loop, 8 increments per stride, using raw
    /// pointer arithmetic to skip the per-element bounds check the portable
    /// loop pays for. Relies entirely on the aux builder's invariant that
    /// every block is padded to a multiple of its configured unroll factor
    /// (always a multiple of 8 for the default tuning) and that every
    /// rewritten value is a valid index into `counters`.
    ///
    /// # Safety (caller contract, not an `unsafe fn`)
    ///
    /// Every value in every block of `blocks` must be `< counters.len()`;
    /// the aux builder that produces `blocks` guarantees this.
    pub fn run_avx2(counters: &mut [u8], blocks: &[&[u32]]) {
        let cap = counters.len();
        let base = counters.as_mut_ptr();
        for block in blocks {
            let n = block.len();
            let mut i = 0usize;
            while i + 8 <= n {
                macro_rules! bump {
                    ($k:expr) => {{
                        // SAFETY: `i + $k < n <= block.len()`, and every
                        // rewritten value is `< cap` by the aux builder's
                        // contract documented on this function.
                        unsafe {
                            let idx = *block.get_unchecked(i + $k) as usize;
                            debug_assert!(idx < cap, "rewritten index out of counter scratch bounds");
                            let slot = base.add(idx);
                            *slot = (*slot).wrapping_add(1);
                        }
                    }};
                }
                bump!(0);
                bump!(1);
                bump!(2);
                bump!(3);
                bump!(4);
                bump!(5);
                bump!(6);
                bump!(7);
                i += 8;
            }
            while i < n {
                // SAFETY: see above; `i < n == block.len()`.
                unsafe {
                    let idx = *block.get_unchecked(i) as usize;
                    debug_assert!(idx < cap, "rewritten index out of counter scratch bounds");
                    let slot = base.add(idx);
                    *slot = (*slot).wrapping_add(1);
                }
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portable_kernel_counts_every_occurrence() {
        let mut counters = vec![0u8; 16];
        let a = [1u32, 2, 3, 1];
        let b = [1u32, 3];
        run_portable(&mut counters, &[&a, &b]);
        assert_eq!(counters[1], 2);
        assert_eq!(counters[2], 1);
        assert_eq!(counters[3], 2);
        assert_eq!(counters[0], 0);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_kernel_agrees_with_portable_kernel() {
        if !is_x86_feature_detected!("avx2") {
            return;
        }
        let blocks_owned: Vec<Vec<u32>> = vec![
            (0..37u32).map(|i| (i * 7) % 64).collect(),
            (0..21u32).map(|i| (i * 11) % 64).collect(),
        ];
        let blocks: Vec<&[u32]> = blocks_owned.iter().map(Vec::as_slice).collect();

        let mut portable = vec![0u8; 64];
        run_portable(&mut portable, &blocks);

        let mut via_avx2 = vec![0u8; 64];
        avx2::run_avx2(&mut via_avx2, &blocks);

        assert_eq!(portable, via_avx2);
    }

    #[test]
    fn detect_returns_a_kernel_that_runs_without_panicking() {
        let kernel = Kernel::detect();
        let mut counters = vec![0u8; 8];
        let a = [0u32, 7];
        kernel.run(&mut counters, &[&a]);
        assert_eq!(counters[0], 1);
        assert_eq!(counters[7], 1);
    }
}

//! Hit extraction: scanning a window of per-identifier counters for bytes
//! strictly greater than the query threshold.
//!
//! The AVX2 path scans 64 bytes at a time with a SIMD "any byte greater
//! than `t`" test (mirroring `find_next_gt2` in the original), falling back
//! to a byte-wise scan only over a 64-byte block that actually reports a
//! hit, plus any residual tail shorter than 64 bytes. The portable scalar
//! fallback is what correctness tests exercise directly.

/// Scans `window` byte by byte, pushing `start + i` for every `window[i] > t`.
pub fn extract_hits_scalar(window: &[u8], t: u8, start: u32, out: &mut Vec<u32>) {
    for (i, &count) in window.iter().enumerate() {
        if count > t {
            out.push(start + i as u32);
        }
    }
}

/// Picks the AVX2 extractor when the running CPU supports it, otherwise the
/// scalar fallback.
pub fn extract_hits_auto(window: &[u8], t: u8, start: u32, out: &mut Vec<u32>) {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            extract_hits_avx2(window, t, start, out);
            return;
        }
    }
    extract_hits_scalar(window, t, start, out);
}

#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
/// AVX2 hit extractor: scans `window` 64 bytes at a time with a vectorised
/// "any byte greater than `t`" test, only falling through to a byte-wise
/// scan for blocks that actually report a hit, plus any residual tail.
///
/// # Safety
///
/// Caller must have verified `is_x86_feature_detected!("avx2")`; this
/// function unconditionally executes AVX2 intrinsics.
pub fn extract_hits_avx2(window: &[u8], t: u8, start: u32, out: &mut Vec<u32>) {
    use std::arch::x86_64::{
        _mm256_cmpgt_epi8, _mm256_loadu_si256, _mm256_movemask_epi8, _mm256_or_si256,
        _mm256_set1_epi8, _mm256_xor_si256,
    };

    let len = window.len();
    let mut i = 0usize;
    while i + 64 <= len {
        // SAFETY: `window[i..i + 64]` is in bounds by the loop guard; both
        // loads read 32 unaligned bytes each from that span.
        let any_hit = unsafe {
            let block = window.as_ptr().add(i);
            let lo = _mm256_loadu_si256(block.cast());
            let hi = _mm256_loadu_si256(block.add(32).cast());
            // `_mm256_cmpgt_epi8` compares signed bytes; XOR both operands
            // with the sign bit first so the comparison behaves unsigned.
            let bias = _mm256_set1_epi8(i8::MIN);
            let tv = _mm256_set1_epi8((t as i8).wrapping_add(i8::MIN));
            let lo_gt = _mm256_cmpgt_epi8(_mm256_xor_si256(lo, bias), tv);
            let hi_gt = _mm256_cmpgt_epi8(_mm256_xor_si256(hi, bias), tv);
            _mm256_movemask_epi8(_mm256_or_si256(lo_gt, hi_gt)) != 0
        };
        if any_hit {
            extract_hits_scalar(&window[i..i + 64], t, start + i as u32, out);
        }
        i += 64;
    }
    if i < len {
        extract_hits_scalar(&window[i..], t, start + i as u32, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_extractor_emits_identifiers_strictly_above_threshold() {
        let window = [0u8, 1, 2, 3, 0, 5];
        let mut out = Vec::new();
        extract_hits_scalar(&window, 2, 100, &mut out);
        assert_eq!(out, vec![103, 105]);
    }

    #[test]
    fn scalar_extractor_with_threshold_zero_is_a_union() {
        let window = [0u8, 1, 0, 1];
        let mut out = Vec::new();
        extract_hits_scalar(&window, 0, 0, &mut out);
        assert_eq!(out, vec![1, 3]);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_extractor_agrees_with_scalar_across_block_and_tail() {
        if !is_x86_feature_detected!("avx2") {
            return;
        }
        let mut window = vec![0u8; 140];
        window[0] = 5;
        window[63] = 9;
        window[64] = 9;
        window[127] = 1;
        window[139] = 4;

        for t in 0..10u8 {
            let mut scalar = Vec::new();
            extract_hits_scalar(&window, t, 1000, &mut scalar);

            let mut vectorised = Vec::new();
            extract_hits_avx2(&window, t, 1000, &mut vectorised);

            assert_eq!(scalar, vectorised, "mismatch at threshold {t}");
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_extractor_handles_an_all_zero_block_with_no_hits() {
        if !is_x86_feature_detected!("avx2") {
            return;
        }
        let window = vec![0u8; 64];
        let mut out = Vec::new();
        extract_hits_avx2(&window, 0, 0, &mut out);
        assert!(out.is_empty());
    }
}

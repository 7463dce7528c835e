//! The saturating accumulator itself, generic over [`Word`] and a
//! const-generic bit width `B`.

use crate::word::Word;

/// A vertical `B`-bit saturating counter, one per bit lane of `W`.
///
/// `B` must be at least 1. Construction biases every lane to the same
/// initial value by repeatedly accepting all-ones words, exactly as the
/// reference implementation does; this keeps [`Accumulator::accept`] as the
/// single source of truth for the carry-save arithmetic.
#[derive(Clone, Copy, Debug)]
pub struct Accumulator<const B: usize, W: Word> {
    bits: [W; B],
    saturated: W,
}

impl<const B: usize, W: Word> Accumulator<B, W> {
    /// Builds an accumulator with every lane pre-loaded to `initial`.
    ///
    /// `initial` must be `< 2^B`; this is an internal invariant upheld by
    /// every caller in this workspace (the bitscan engine derives `initial`
    /// from `bits_for_threshold`), so it is checked with `debug_assert!`
    /// rather than a fallible constructor.
    #[must_use]
    pub fn new(initial: usize) -> Self {
        debug_assert!(B >= 1, "accumulator width must be at least one bit");
        debug_assert!(initial < (1usize << B), "initial value does not fit in B bits");
        let mut acc = Self {
            bits: [W::zero(); B],
            saturated: W::zero(),
        };
        for _ in 0..initial {
            acc.accept(W::all_ones());
        }
        acc
    }

    /// Increments every lane whose corresponding bit of `addend` is set,
    /// saturating (stickily) on overflow.
    pub fn accept(&mut self, addend: W) {
        let mut carry = addend;
        for bit in &mut self.bits {
            let sum = bit.xor(carry);
            carry = bit.and(carry);
            *bit = sum;
        }
        self.saturated = self.saturated.or(carry);
    }

    /// Folds in three words pre-weighted `1, 2, 4` via a carry chain that
    /// starts at bit 0 and propagates up through bit `B - 1`; any carry past
    /// the top bit, and any weighted bit that never had a counter slot to
    /// land in (only possible when `B < 3`), is OR-ed directly into the
    /// saturation word.
    pub fn accept_weighted(&mut self, w0: W, w1: W, w2: W) {
        let values = [w0, w1, w2];
        let (mut carry, sum0) = W::add2(values[0], self.bits[0]);
        self.bits[0] = sum0;
        for (p, bit) in self.bits.iter_mut().enumerate().skip(1) {
            let (c, s) = if p < values.len() {
                W::add3(carry, values[p], *bit)
            } else {
                W::add2(carry, *bit)
            };
            *bit = s;
            carry = c;
        }
        self.saturated = self.saturated.or(carry);
        for &v in values.iter().skip(B.max(1)) {
            self.saturated = self.saturated.or(v);
        }
    }

    /// Folds in seven words via a three-level Wallace-tree carry-save
    /// reduction (three full-adders reduce the seven inputs to three
    /// weighted outputs, which `accept_weighted` then folds in).
    #[allow(clippy::many_single_char_names)]
    pub fn accept7(&mut self, v0: W, v1: W, v2: W, v3: W, v4: W, v5: W, v6: W) {
        let (c0, s0) = W::add3(v0, v1, v2);
        let (c1, s1) = W::add3(v3, v4, v5);
        let (c2, s2) = W::add3(v6, s0, s1);
        let (c3, s3) = W::add3(c0, c1, c2);
        self.accept_weighted(s2, s3, c3);
    }

    /// Folds in eight words: the Wallace-tree reduction of the first seven
    /// (see [`Accumulator::accept7`]) followed by a plain [`Accumulator::accept`]
    /// of the eighth. This matches the documented critical-path shape (four
    /// adder levels dominate; the eighth lane only adds one more half-adder
    /// row) while staying obviously correct against `accept` applied eight
    /// times.
    #[allow(clippy::many_single_char_names, clippy::too_many_arguments)]
    pub fn accept8(&mut self, v0: W, v1: W, v2: W, v3: W, v4: W, v5: W, v6: W, v7: W) {
        self.accept7(v0, v1, v2, v3, v4, v5, v6);
        self.accept(v7);
    }

    /// Returns the saturation word: bit `i` set iff lane `i` has reached
    /// `2^B` accepted addends.
    #[must_use]
    pub fn get_saturated(&self) -> W {
        self.saturated
    }

    /// Returns the full per-lane integer sums, treating saturation as the
    /// value `2^B`. Exists only to make the accumulator's arithmetic
    /// testable directly; production code only ever consults
    /// [`Accumulator::get_saturated`].
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn get_sums(&self) -> Vec<u64> {
        (0..W::BITS)
            .map(|lane| {
                if self.saturated.test_bit(lane) {
                    1u64 << B
                } else {
                    let mut sum = 0u64;
                    for (pos, bit) in self.bits.iter().enumerate() {
                        if bit.test_bit(lane) {
                            sum |= 1u64 << pos;
                        }
                    }
                    sum
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::ScalarWord;

    fn addend_with_bits(bits: &[usize]) -> ScalarWord {
        let mut w = ScalarWord::zero();
        for &b in bits {
            w = w.or(ScalarWord::single_bit(b));
        }
        w
    }

    #[test]
    fn accept_matches_plain_integer_counting() {
        let mut acc = Accumulator::<3, ScalarWord>::new(0);
        for _ in 0..5 {
            acc.accept(ScalarWord::single_bit(0));
        }
        assert_eq!(acc.get_sums()[0], 5);
        assert!(!acc.get_saturated().test_bit(0));
    }

    #[test]
    fn accept_saturates_at_2_pow_b() {
        let mut acc = Accumulator::<2, ScalarWord>::new(0);
        for _ in 0..4 {
            acc.accept(ScalarWord::all_ones());
        }
        assert!(acc.get_saturated().test_bit(0));
        assert_eq!(acc.get_sums()[0], 4);
        // Further accepts must not clear the saturation flag (monotonic).
        acc.accept(ScalarWord::zero());
        assert!(acc.get_saturated().test_bit(0));
    }

    #[test]
    fn accept7_matches_seven_individual_accepts() {
        let words = [
            addend_with_bits(&[0, 10]),
            addend_with_bits(&[0]),
            addend_with_bits(&[0, 20]),
            addend_with_bits(&[]),
            addend_with_bits(&[0]),
            addend_with_bits(&[10]),
            addend_with_bits(&[0, 10, 20]),
        ];

        let mut tree = Accumulator::<4, ScalarWord>::new(0);
        tree.accept7(words[0], words[1], words[2], words[3], words[4], words[5], words[6]);

        let mut sequential = Accumulator::<4, ScalarWord>::new(0);
        for w in words {
            sequential.accept(w);
        }

        assert_eq!(tree.get_sums(), sequential.get_sums());
        assert_eq!(
            tree.get_saturated().to_u64_lanes(),
            sequential.get_saturated().to_u64_lanes()
        );
    }

    #[test]
    fn accept8_matches_eight_individual_accepts() {
        let words: Vec<ScalarWord> = (0..8)
            .map(|i| addend_with_bits(&[0, i]))
            .collect();

        let mut tree = Accumulator::<4, ScalarWord>::new(0);
        tree.accept8(
            words[0], words[1], words[2], words[3], words[4], words[5], words[6], words[7],
        );

        let mut sequential = Accumulator::<4, ScalarWord>::new(0);
        for w in &words {
            sequential.accept(*w);
        }

        assert_eq!(tree.get_sums(), sequential.get_sums());
    }

    #[test]
    fn bias_initial_value_saturates_on_exact_threshold_crossing() {
        // t = 2 -> B = 2, bias = 2^2 - 2 - 1 = 1.
        let mut acc = Accumulator::<2, ScalarWord>::new(1);
        acc.accept(ScalarWord::single_bit(0));
        acc.accept(ScalarWord::single_bit(0));
        assert!(!acc.get_saturated().test_bit(0), "two hits must not saturate t=2");
        acc.accept(ScalarWord::single_bit(0));
        assert!(acc.get_saturated().test_bit(0), "three hits must saturate t=2");
    }
}

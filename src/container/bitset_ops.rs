//! Word wise operations between bitsets

use crate::container::bitset::{BitsetContainer, BITSET_SIZE_IN_WORDS};
use crate::utils::Packed;

macro_rules! bitset_op {
    ($(#[$meta:meta])* $name:ident, $op:expr) => {
        $(#[$meta])*
        pub fn $name(a: Packed<'_, u64>, b: Packed<'_, u64>) -> BitsetContainer {
            let op: fn(u64, u64) -> u64 = $op;

            let words: Box<[u64]> = (0..BITSET_SIZE_IN_WORDS)
                .map(|index| op(a.get(index), b.get(index)))
                .collect();

            BitsetContainer::from_words(words)
        }
    };
}

bitset_op!(
    /// Union of two bitsets
    or, |a, b| a | b
);

bitset_op!(
    /// Intersection of two bitsets
    and, |a, b| a & b
);

bitset_op!(
    /// Bits of `a` not set in `b`
    and_not, |a, b| a & !b
);

bitset_op!(
    /// Bits set in exactly one of the bitsets
    xor, |a, b| a ^ b
);

/// Number of bits set in both bitsets
pub fn and_cardinality(a: Packed<'_, u64>, b: Packed<'_, u64>) -> usize {
    (0..BITSET_SIZE_IN_WORDS)
        .map(|index| (a.get(index) & b.get(index)).count_ones() as usize)
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn word_ops() {
        let a = BitsetContainer::from_spans(vec![(0, 5000)]);
        let b = BitsetContainer::from_spans(vec![(4000, 10000)]);
        let (a, b) = (a.as_ref().words(), b.as_ref().words());

        assert_eq!(or(a, b).cardinality(), 10000);
        assert_eq!(and(a, b).cardinality(), 1000);
        assert_eq!(and_not(a, b).cardinality(), 4000);
        assert_eq!(xor(a, b).cardinality(), 9000);
        assert_eq!(and_cardinality(a, b), 1000);
    }
}

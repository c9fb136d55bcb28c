use crate::utils::Packed;

/// The size of the bitset in 64bit words
pub const BITSET_SIZE_IN_WORDS: usize = 1024;

/// Call `f` with the index and mask of every word overlapping `[start, end)`
#[inline]
fn for_each_word<F>(start: u32, end: u32, mut f: F)
    where F: FnMut(usize, u64)
{
    if start >= end {
        return;
    }

    let first = (start >> 6) as usize;
    let last = ((end - 1) >> 6) as usize;

    for index in first..=last {
        let lo = if index == first { start & 0x3F } else { 0 };
        let hi = if index == last { ((end - 1) & 0x3F) + 1 } else { 64 };

        let mask = if hi - lo == 64 {
            std::u64::MAX
        }
        else {
            ((1_u64 << (hi - lo)) - 1) << lo
        };

        f(index, mask);
    }
}

/// A bitset container used in a roaring bitmap.
///
/// # Structure
/// Contents are stored as 1024 64bit words, bit `i` of word `w` holds the value `w * 64 + i`
#[derive(Clone, Debug)]
pub struct BitsetContainer {
    bitset: Box<[u64]>,
    cardinality: usize
}

impl Default for BitsetContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitsetContainer {
    /// Create a new empty bitset
    pub fn new() -> Self {
        Self {
            bitset: vec![0; BITSET_SIZE_IN_WORDS].into_boxed_slice(),
            cardinality: 0
        }
    }

    /// Create a bitset with every bit set
    pub fn full() -> Self {
        Self {
            bitset: vec![std::u64::MAX; BITSET_SIZE_IN_WORDS].into_boxed_slice(),
            cardinality: 1 << 16
        }
    }

    /// Create a bitset from raw words, computing the cardinality
    pub(crate) fn from_words(bitset: Box<[u64]>) -> Self {
        debug_assert_eq!(bitset.len(), BITSET_SIZE_IN_WORDS);

        let cardinality = bitset.iter()
            .map(|word| word.count_ones() as usize)
            .sum();

        Self {
            bitset,
            cardinality
        }
    }

    /// Create a bitset holding every value yielded by `values`
    pub fn from_values<I: IntoIterator<Item = u16>>(values: I) -> Self {
        let mut bitset = Self::new();
        bitset.set_list(values);

        bitset
    }

    /// Create a bitset from half open spans of values
    pub fn from_spans<I: IntoIterator<Item = (u32, u32)>>(spans: I) -> Self {
        let mut bitset = Self::new();
        for (start, end) in spans {
            bitset.set_range(start, end);
        }

        bitset
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.bitset
    }

    /// Add `value` to the set and return true if it was not set before
    pub fn add(&mut self, value: u16) -> bool {
        let word_index = (value >> 6) as usize;
        let bit = 1_u64 << (value & 0x3F);
        let word = self.bitset[word_index];

        self.bitset[word_index] = word | bit;

        let added = word & bit == 0;
        self.cardinality += added as usize;

        added
    }

    /// Remove `value` from the set and return true if it was set
    pub fn remove(&mut self, value: u16) -> bool {
        let word_index = (value >> 6) as usize;
        let bit = 1_u64 << (value & 0x3F);
        let word = self.bitset[word_index];

        self.bitset[word_index] = word & !bit;

        let removed = word & bit != 0;
        self.cardinality -= removed as usize;

        removed
    }

    /// Set all the bits within `[start, end)`
    pub fn set_range(&mut self, start: u32, end: u32) {
        let bitset = &mut self.bitset;
        let mut cardinality = self.cardinality;

        for_each_word(start, end, |index, mask| {
            let word = bitset[index];
            cardinality += (!word & mask).count_ones() as usize;
            bitset[index] = word | mask;
        });

        self.cardinality = cardinality;
    }

    /// Clear all the bits within `[start, end)`
    pub fn unset_range(&mut self, start: u32, end: u32) {
        let bitset = &mut self.bitset;
        let mut cardinality = self.cardinality;

        for_each_word(start, end, |index, mask| {
            let word = bitset[index];
            cardinality -= (word & mask).count_ones() as usize;
            bitset[index] = word & !mask;
        });

        self.cardinality = cardinality;
    }

    /// Flip all the bits within `[start, end)`
    pub fn flip_range(&mut self, start: u32, end: u32) {
        let bitset = &mut self.bitset;
        let mut cardinality = self.cardinality;

        for_each_word(start, end, |index, mask| {
            let word = bitset[index];
            let set = (word & mask).count_ones() as usize;

            cardinality = cardinality - set + (mask.count_ones() as usize - set);
            bitset[index] = word ^ mask;
        });

        self.cardinality = cardinality;
    }

    /// Set bits for the elements in `list`
    pub fn set_list<I: IntoIterator<Item = u16>>(&mut self, list: I) {
        for value in list {
            self.add(value);
        }
    }

    /// Clear the elements specified in the list from the bitset
    pub fn clear_list<I: IntoIterator<Item = u16>>(&mut self, list: I) {
        for value in list {
            self.remove(value);
        }
    }

    /// Flip the bits of the elements in `list`
    pub fn flip_list<I: IntoIterator<Item = u16>>(&mut self, list: I) {
        for value in list {
            let word_index = (value >> 6) as usize;
            let bit = 1_u64 << (value & 0x3F);
            let word = self.bitset[word_index];

            self.bitset[word_index] = word ^ bit;

            if word & bit == 0 {
                self.cardinality += 1;
            }
            else {
                self.cardinality -= 1;
            }
        }
    }

    /// Combine each word with the matching word of `other` and recompute the cardinality
    pub(crate) fn combine<F>(&mut self, other: Packed<'_, u64>, op: F)
        where F: Fn(u64, u64) -> u64
    {
        let mut cardinality = 0;

        for (index, word) in self.bitset.iter_mut().enumerate() {
            *word = op(*word, other.get(index));
            cardinality += word.count_ones() as usize;
        }

        self.cardinality = cardinality;
    }

    #[inline]
    pub fn as_ref(&self) -> BitsetRef<'_> {
        BitsetRef::new(Packed::Native(&self.bitset), self.cardinality)
    }
}

/// A borrowed bitset container, either owned by a bitmap or encoded in a buffer
#[derive(Clone, Copy, Debug)]
pub struct BitsetRef<'a> {
    words: Packed<'a, u64>,
    cardinality: usize
}

impl<'a> BitsetRef<'a> {
    pub(crate) fn new(words: Packed<'a, u64>, cardinality: usize) -> Self {
        debug_assert_eq!(words.len(), BITSET_SIZE_IN_WORDS);

        Self {
            words,
            cardinality
        }
    }

    #[inline]
    pub fn words(&self) -> Packed<'a, u64> {
        self.words
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cardinality == 1 << 16
    }

    /// Get the value of the bit at `value`
    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        let word = self.words.get((value >> 6) as usize);

        (word >> (value & 0x3F)) & 1 == 1
    }

    /// Check if all bits within `[start, end)` are set
    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        let mut covered = true;
        for_each_word(start, end, |index, mask| {
            covered &= self.words.get(index) & mask == mask;
        });

        covered
    }

    pub fn min(&self) -> Option<u16> {
        self.words.iter()
            .enumerate()
            .find(|(_, word)| *word != 0)
            .map(|(index, word)| (index * 64 + word.trailing_zeros() as usize) as u16)
    }

    pub fn max(&self) -> Option<u16> {
        (0..self.words.len())
            .rev()
            .map(|index| (index, self.words.get(index)))
            .find(|(_, word)| *word != 0)
            .map(|(index, word)| (index * 64 + 63 - word.leading_zeros() as usize) as u16)
    }

    /// Number of values smaller or equal to `value`
    pub fn rank(&self, value: u16) -> usize {
        let word_index = (value >> 6) as usize;

        let mut rank: usize = self.words.iter()
            .take(word_index)
            .map(|word| word.count_ones() as usize)
            .sum();

        let shift = 63 - (value & 0x3F);
        rank += (self.words.get(word_index) << shift).count_ones() as usize;

        rank
    }

    /// The value with `rank` smaller values in the container
    pub fn select(&self, rank: usize) -> Option<u16> {
        if rank >= self.cardinality {
            return None;
        }

        let mut remaining = rank;
        for (index, mut word) in self.words.iter().enumerate() {
            let count = word.count_ones() as usize;
            if remaining < count {
                for _ in 0..remaining {
                    word &= word - 1;
                }

                return Some((index * 64 + word.trailing_zeros() as usize) as u16);
            }

            remaining -= count;
        }

        None
    }

    /// Compute the number of runs of set bits
    pub fn num_runs(&self) -> usize {
        let mut num_runs = 0;
        let mut carry = 0;

        for word in self.words.iter() {
            // A run starts wherever a set bit follows a clear bit
            num_runs += (word & !((word << 1) | carry)).count_ones() as usize;
            carry = word >> 63;
        }

        num_runs
    }

    pub fn iter(&self) -> BitsetIter<'a> {
        BitsetIter {
            words: self.words,
            index: 0,
            word: self.words.get(0)
        }
    }

    /// Iterate over maximal spans of set bits
    pub fn spans(&self) -> BitsetSpans<'a> {
        BitsetSpans {
            words: self.words,
            index: 0,
            word: self.words.get(0)
        }
    }

    /// Copy into an owned container. The cardinality is recounted from the words
    pub fn to_owned(&self) -> BitsetContainer {
        BitsetContainer::from_words(self.words.to_vec().into_boxed_slice())
    }
}

/// An iterator over the values of a bitset
#[derive(Clone, Debug)]
pub struct BitsetIter<'a> {
    words: Packed<'a, u64>,
    index: usize,
    word: u64
}

impl<'a> Iterator for BitsetIter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.word == 0 {
            self.index += 1;
            if self.index >= self.words.len() {
                return None;
            }

            self.word = self.words.get(self.index);
        }

        let value = self.index * 64 + self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;

        Some(value as u16)
    }
}

/// An iterator over the maximal spans of set bits in a bitset
#[derive(Clone, Debug)]
pub struct BitsetSpans<'a> {
    words: Packed<'a, u64>,
    index: usize,
    word: u64
}

impl<'a> Iterator for BitsetSpans<'a> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        while self.word == 0 {
            self.index += 1;
            if self.index >= self.words.len() {
                return None;
            }

            self.word = self.words.get(self.index);
        }

        let start = self.index as u32 * 64 + self.word.trailing_zeros();

        // Fill in the bits below the run so it becomes a block of trailing ones
        let mut word = self.word | (self.word - 1);
        while word == std::u64::MAX {
            self.index += 1;
            if self.index >= self.words.len() {
                self.word = 0;

                return Some((start, 1 << 16));
            }

            word = self.words.get(self.index);
        }

        let end = self.index as u32 * 64 + (!word).trailing_zeros();

        // Clear the trailing ones
        self.word = word & (word + 1);

        Some((start, end))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_remove() {
        let mut bitset = BitsetContainer::new();
        assert!(bitset.add(0));
        assert!(bitset.add(64));
        assert!(bitset.add(65535));
        assert!(!bitset.add(64));
        assert_eq!(bitset.cardinality(), 3);

        assert!(bitset.remove(64));
        assert!(!bitset.remove(64));
        assert_eq!(bitset.cardinality(), 2);
        assert!(bitset.as_ref().contains(65535));
        assert!(!bitset.as_ref().contains(64));
    }

    #[test]
    fn ranges() {
        let mut bitset = BitsetContainer::new();
        bitset.set_range(10, 200);
        assert_eq!(bitset.cardinality(), 190);
        assert!(bitset.as_ref().contains_range(10, 200));
        assert!(!bitset.as_ref().contains_range(9, 200));

        bitset.unset_range(60, 70);
        assert_eq!(bitset.cardinality(), 180);

        bitset.flip_range(0, 1 << 16);
        assert_eq!(bitset.cardinality(), (1 << 16) - 180);
        assert!(bitset.as_ref().contains(65));
        assert!(!bitset.as_ref().contains(100));

        bitset.set_range(0, 1 << 16);
        assert_eq!(bitset.cardinality(), 1 << 16);
        assert!(bitset.as_ref().is_full());
    }

    #[test]
    fn queries() {
        let bitset = BitsetContainer::from_values(vec![3, 64, 65, 66, 1000, 65535]);
        let view = bitset.as_ref();

        assert_eq!(view.min(), Some(3));
        assert_eq!(view.max(), Some(65535));
        assert_eq!(view.rank(2), 0);
        assert_eq!(view.rank(3), 1);
        assert_eq!(view.rank(65), 3);
        assert_eq!(view.rank(65535), 6);
        assert_eq!(view.select(0), Some(3));
        assert_eq!(view.select(4), Some(1000));
        assert_eq!(view.select(6), None);
        assert_eq!(view.num_runs(), 4);

        let values: Vec<u16> = view.iter().collect();
        assert_eq!(values, vec![3, 64, 65, 66, 1000, 65535]);
    }

    #[test]
    fn spans_cross_words() {
        let bitset = BitsetContainer::from_spans(vec![(0, 1), (60, 200), (65000, 65536)]);
        let spans: Vec<(u32, u32)> = bitset.as_ref().spans().collect();

        assert_eq!(spans, vec![(0, 1), (60, 200), (65000, 65536)]);
        assert_eq!(bitset.as_ref().num_runs(), 3);

        let full = BitsetContainer::full();
        let spans: Vec<(u32, u32)> = full.as_ref().spans().collect();
        assert_eq!(spans, vec![(0, 1 << 16)]);
        assert_eq!(full.as_ref().num_runs(), 1);
    }

    #[test]
    fn combine_words() {
        let mut a = BitsetContainer::from_spans(vec![(0, 100)]);
        let b = BitsetContainer::from_spans(vec![(50, 150)]);

        a.combine(b.as_ref().words(), |x, y| x & y);
        assert_eq!(a.cardinality(), 50);
        assert_eq!(a.as_ref().min(), Some(50));
    }
}

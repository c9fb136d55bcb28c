use std::iter::FromIterator;

use crate::utils::{LeValue, Packed, PackedIter};

/// A run of consecutive values. Covers `[value, value + length]`, both ends inclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rle16 {
    /// The first value in the run
    pub value: u16,

    /// The number of values in the run minus one
    pub length: u16
}

impl Rle16 {
    pub fn new(value: u16, length: u16) -> Self {
        Self {
            value,
            length
        }
    }

    /// Create a run covering the half open span `[start, end)`
    #[inline]
    pub(crate) fn from_span(start: u32, end: u32) -> Self {
        debug_assert!(start < end && end <= 1 << 16);

        Self {
            value: start as u16,
            length: (end - start - 1) as u16
        }
    }

    /// The first value in the run
    #[inline]
    pub fn start(&self) -> u32 {
        u32::from(self.value)
    }

    /// One past the last value in the run
    #[inline]
    pub fn end(&self) -> u32 {
        u32::from(self.value) + u32::from(self.length) + 1
    }

    /// Number of values covered by the run
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.length as usize + 1
    }
}

impl LeValue for Rle16 {
    const WIDTH: usize = 4;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        Self {
            value: u16::from_le_bytes([bytes[0], bytes[1]]),
            length: u16::from_le_bytes([bytes[2], bytes[3]])
        }
    }

    #[inline]
    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.length.to_le_bytes());
    }
}

/// A container of run length encoded values.
///
/// Runs are sorted by their start and never overlap
#[derive(Clone, Debug, Default)]
pub struct RunContainer {
    runs: Vec<Rle16>,
    cardinality: usize
}

impl RunContainer {
    /// Create a new empty run container
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            cardinality: 0
        }
    }

    /// Create a run container holding every value in the container's domain
    pub fn full() -> Self {
        Self {
            runs: vec![Rle16::new(0, std::u16::MAX)],
            cardinality: 1 << 16
        }
    }

    /// Create a run container from sorted runs. Assumes they don't overlap
    pub(crate) fn from_runs(runs: Vec<Rle16>) -> Self {
        let cardinality = runs.iter()
            .map(Rle16::cardinality)
            .sum();

        Self {
            runs,
            cardinality
        }
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    #[inline]
    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    #[inline]
    pub fn runs(&self) -> &[Rle16] {
        &self.runs
    }

    pub fn shrink_to_fit(&mut self) {
        self.runs.shrink_to_fit();
    }

    /// Add a value to the container. Returns true if the value was not present before
    pub fn add(&mut self, value: u16) -> bool {
        if self.as_ref().contains(value) {
            return false;
        }

        let value = u32::from(value);
        self.add_range(value, value + 1);

        true
    }

    /// Remove a value from the container. Returns true if the value was present
    pub fn remove(&mut self, value: u16) -> bool {
        if !self.as_ref().contains(value) {
            return false;
        }

        let value = u32::from(value);
        self.remove_range(value, value + 1);

        true
    }

    /// Add all values in `[start, end)`. Runs that overlap or touch the range are merged into it
    pub fn add_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        // Runs in `lo..hi` overlap or are adjacent to the new range
        let lo = self.runs.partition_point(|run| run.end() < start);
        let hi = self.runs.partition_point(|run| run.start() <= end);

        let mut merged_start = start;
        let mut merged_end = end;
        if lo < hi {
            merged_start = merged_start.min(self.runs[lo].start());
            merged_end = merged_end.max(self.runs[hi - 1].end());
        }

        let removed: usize = self.runs[lo..hi].iter()
            .map(Rle16::cardinality)
            .sum();

        self.runs.splice(lo..hi, Some(Rle16::from_span(merged_start, merged_end)));
        self.cardinality = self.cardinality - removed + (merged_end - merged_start) as usize;
    }

    /// Remove all values in `[start, end)`
    pub fn remove_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        // Runs in `lo..hi` overlap the range
        let lo = self.runs.partition_point(|run| run.end() <= start);
        let hi = self.runs.partition_point(|run| run.start() < end);
        if lo >= hi {
            return;
        }

        let first = self.runs[lo];
        let last = self.runs[hi - 1];

        let mut remainder = Vec::with_capacity(2);
        if first.start() < start {
            remainder.push(Rle16::from_span(first.start(), start));
        }

        if last.end() > end {
            remainder.push(Rle16::from_span(end, last.end()));
        }

        let removed: usize = self.runs[lo..hi].iter()
            .map(Rle16::cardinality)
            .sum();

        let added: usize = remainder.iter()
            .map(Rle16::cardinality)
            .sum();

        self.runs.splice(lo..hi, remainder);
        self.cardinality = self.cardinality - removed + added;
    }

    #[inline]
    pub fn as_ref(&self) -> RunRef<'_> {
        RunRef::new(Packed::Native(&self.runs), self.cardinality)
    }
}

impl FromIterator<(u32, u32)> for RunContainer {
    /// Build a container from sorted half open spans
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        let mut runs: Vec<Rle16> = Vec::new();
        for (start, end) in iter {
            match runs.last_mut() {
                Some(last) if last.end() == start => {
                    *last = Rle16::from_span(last.start(), end);
                },
                _ => runs.push(Rle16::from_span(start, end))
            }
        }

        Self::from_runs(runs)
    }
}

/// A borrowed run container, either owned by a bitmap or encoded in a buffer
#[derive(Clone, Copy, Debug)]
pub struct RunRef<'a> {
    runs: Packed<'a, Rle16>,
    cardinality: usize
}

impl<'a> RunRef<'a> {
    pub(crate) fn new(runs: Packed<'a, Rle16>, cardinality: usize) -> Self {
        Self {
            runs,
            cardinality
        }
    }

    #[inline]
    pub fn runs(&self) -> Packed<'a, Rle16> {
        self.runs
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Number of maximal runs. Touching runs from a decoded buffer count once
    pub fn num_runs(&self) -> usize {
        self.spans().count()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cardinality == 1 << 16
    }

    /// Index of the first run that ends after `value`
    #[inline]
    fn seek(&self, value: u32) -> usize {
        self.runs.partition_point(|run| run.end() <= value)
    }

    pub fn contains(&self, value: u16) -> bool {
        let value = u32::from(value);
        let index = self.seek(value);

        index < self.runs.len() && self.runs.get(index).start() <= value
    }

    /// Check if all values in `[start, end)` are present
    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        if start >= end {
            return true;
        }

        let mut index = self.seek(start);
        if index >= self.runs.len() || self.runs.get(index).start() > start {
            return false;
        }

        // Decoded containers may hold touching runs
        let mut covered = self.runs.get(index).end();
        while covered < end {
            index += 1;
            if index >= self.runs.len() || self.runs.get(index).start() != covered {
                return false;
            }

            covered = self.runs.get(index).end();
        }

        true
    }

    pub fn min(&self) -> Option<u16> {
        if self.runs.is_empty() {
            None
        }
        else {
            Some(self.runs.get(0).value)
        }
    }

    pub fn max(&self) -> Option<u16> {
        if self.runs.is_empty() {
            None
        }
        else {
            Some((self.runs.get(self.runs.len() - 1).end() - 1) as u16)
        }
    }

    /// Number of values smaller or equal to `value`
    pub fn rank(&self, value: u16) -> usize {
        let value = u32::from(value);
        let mut rank = 0;

        for run in self.runs.iter() {
            if run.end() <= value {
                rank += run.cardinality();
            }
            else {
                if run.start() <= value {
                    rank += (value - run.start()) as usize + 1;
                }

                break;
            }
        }

        rank
    }

    /// The value with `rank` smaller values in the container
    pub fn select(&self, rank: usize) -> Option<u16> {
        let mut remaining = rank;

        for run in self.runs.iter() {
            let card = run.cardinality();
            if remaining < card {
                return Some((run.start() as usize + remaining) as u16);
            }

            remaining -= card;
        }

        None
    }

    pub fn iter(&self) -> RunIter<'a> {
        RunIter {
            runs: self.runs.iter(),
            next: 0,
            end: 0
        }
    }

    /// Iterate over maximal spans of consecutive values. Adjacent runs are joined
    pub fn spans(&self) -> RunSpans<'a> {
        RunSpans {
            runs: self.runs.iter().peekable()
        }
    }

    /// Copy into an owned container, joining touching runs
    pub fn to_owned(&self) -> RunContainer {
        self.spans().collect()
    }
}

/// An iterator over the values of a run container
#[derive(Clone, Debug)]
pub struct RunIter<'a> {
    runs: PackedIter<'a, Rle16>,
    next: u32,
    end: u32
}

impl<'a> Iterator for RunIter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.next >= self.end {
            let run = self.runs.next()?;

            self.next = run.start();
            self.end = run.end();
        }

        let value = self.next as u16;
        self.next += 1;

        Some(value)
    }
}

/// An iterator over the maximal spans of a run container
#[derive(Clone, Debug)]
pub struct RunSpans<'a> {
    runs: std::iter::Peekable<PackedIter<'a, Rle16>>
}

impl<'a> Iterator for RunSpans<'a> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let run = self.runs.next()?;
        let start = run.start();
        let mut end = run.end();

        while let Some(next) = self.runs.next_if(|next| next.start() == end) {
            end = next.end();
        }

        Some((start, end))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn spans(container: &RunContainer) -> Vec<(u32, u32)> {
        container.as_ref().spans().collect()
    }

    #[test]
    fn add_merges_neighbours() {
        let mut container = RunContainer::new();
        container.add_range(10, 20);
        container.add_range(30, 40);

        assert_eq!(container.num_runs(), 2);
        assert_eq!(container.cardinality(), 20);

        // Fill the gap exactly, both neighbours touch the new range
        container.add_range(20, 30);

        assert_eq!(container.num_runs(), 1);
        assert_eq!(container.cardinality(), 30);
        assert_eq!(spans(&container), vec![(10, 40)]);

        assert!(container.add(40));
        assert!(!container.add(40));
        assert_eq!(spans(&container), vec![(10, 41)]);
    }

    #[test]
    fn remove_splits_runs() {
        let mut container = RunContainer::from_runs(vec![Rle16::from_span(0, 100)]);
        container.remove_range(40, 60);

        assert_eq!(spans(&container), vec![(0, 40), (60, 100)]);
        assert_eq!(container.cardinality(), 80);

        assert!(container.remove(0));
        assert!(!container.remove(0));
        assert!(container.remove(99));
        assert_eq!(spans(&container), vec![(1, 40), (60, 99)]);
        assert_eq!(container.cardinality(), 78);

        container.remove_range(0, 1 << 16);
        assert_eq!(container.cardinality(), 0);
        assert_eq!(container.num_runs(), 0);
    }

    #[test]
    fn queries() {
        let container: RunContainer = vec![(5, 10), (20, 21), (65530, 65536)].into_iter().collect();
        let view = container.as_ref();

        assert_eq!(view.cardinality(), 12);
        assert!(view.contains(5));
        assert!(view.contains(9));
        assert!(!view.contains(10));
        assert!(view.contains(65535));
        assert_eq!(view.min(), Some(5));
        assert_eq!(view.max(), Some(65535));
        assert_eq!(view.rank(4), 0);
        assert_eq!(view.rank(7), 3);
        assert_eq!(view.rank(20), 6);
        assert_eq!(view.rank(65535), 12);
        assert_eq!(view.select(0), Some(5));
        assert_eq!(view.select(5), Some(20));
        assert_eq!(view.select(6), Some(65530));
        assert_eq!(view.select(12), None);
        assert!(view.contains_range(6, 10));
        assert!(!view.contains_range(6, 11));

        let values: Vec<u16> = view.iter().collect();
        assert_eq!(values, vec![5, 6, 7, 8, 9, 20, 65530, 65531, 65532, 65533, 65534, 65535]);
    }

    #[test]
    fn spans_join_adjacent_runs() {
        let runs = vec![Rle16::from_span(0, 4), Rle16::from_span(4, 8), Rle16::from_span(9, 10)];
        let container = RunContainer::from_runs(runs);

        assert_eq!(spans(&container), vec![(0, 8), (9, 10)]);
    }
}

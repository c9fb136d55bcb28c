use crate::utils::{Packed, PackedIter};

/// An array container. Elements are sorted numerically and represented as individual values in the array
#[derive(Clone, Debug, Default)]
pub struct ArrayContainer {
    array: Vec<u16>
}

impl ArrayContainer {
    /// Create a new array container
    pub fn new() -> Self {
        Self {
            array: Vec::new()
        }
    }

    /// Create a new array container with a specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            array: Vec::with_capacity(capacity)
        }
    }

    /// Wrap a vector of sorted, deduplicated values
    pub(crate) fn from_vec(array: Vec<u16>) -> Self {
        debug_assert!(array.windows(2).all(|pair| pair[0] < pair[1]));

        Self {
            array
        }
    }

    /// The cardinality of the array container
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.array.len()
    }

    /// Shrink the capacity of the array container to match the cardinality
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.array.shrink_to_fit();
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.array
    }

    /// Add a value to the array. Returns true if the value was not present before
    ///
    /// # Notes
    /// The array may grow past `DEFAULT_MAX_SIZE`, the owning container is responsible for converting it
    pub fn add(&mut self, value: u16) -> bool {
        // Appending is the common case when building from sorted data
        match self.array.last() {
            Some(last) if *last < value => {
                self.array.push(value);
                return true;
            },
            None => {
                self.array.push(value);
                return true;
            },
            _ => ()
        }

        match self.array.binary_search(&value) {
            Ok(_index) => false,
            Err(index) => {
                self.array.insert(index, value);

                true
            }
        }
    }

    /// Remove a specified value from the array. Returns true if the value was present
    pub fn remove(&mut self, value: u16) -> bool {
        match self.array.binary_search(&value) {
            Ok(index) => {
                self.array.remove(index);

                true
            },
            Err(_index) => false
        }
    }

    /// Add all values in `[start, end)`
    pub fn add_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        let lo = self.array.partition_point(|value| u32::from(*value) < start);
        let hi = self.array.partition_point(|value| u32::from(*value) < end);

        self.array.splice(lo..hi, (start..end).map(|value| value as u16));
    }

    /// Remove all values in `[start, end)`
    pub fn remove_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }

        let lo = self.array.partition_point(|value| u32::from(*value) < start);
        let hi = self.array.partition_point(|value| u32::from(*value) < end);

        self.array.drain(lo..hi);
    }

    /// Keep only the values for which `f` returns true
    pub fn retain<F>(&mut self, f: F)
        where F: FnMut(&u16) -> bool
    {
        self.array.retain(f);
    }

    #[inline]
    pub fn as_ref(&self) -> ArrayRef<'_> {
        ArrayRef::new(Packed::Native(&self.array))
    }
}

/// A borrowed array container, either owned by a bitmap or encoded in a buffer
#[derive(Clone, Copy, Debug)]
pub struct ArrayRef<'a> {
    values: Packed<'a, u16>
}

impl<'a> ArrayRef<'a> {
    pub(crate) fn new(values: Packed<'a, u16>) -> Self {
        Self {
            values
        }
    }

    #[inline]
    pub fn values(&self) -> Packed<'a, u16> {
        self.values
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, value: u16) -> bool {
        let index = self.values.partition_point(|v| v < value);

        index < self.values.len() && self.values.get(index) == value
    }

    /// Check if all values in `[start, end)` are present
    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        if start >= end {
            return true;
        }

        let span = (end - start) as usize;
        let index = self.values.partition_point(|v| u32::from(v) < start);
        if index + span > self.values.len() {
            return false;
        }

        // Values are unique and sorted so the span is covered iff both ends are present
        u32::from(self.values.get(index)) == start
            && u32::from(self.values.get(index + span - 1)) == end - 1
    }

    /// The smallest element in the array. Returns `None` if `cardinality` is 0
    pub fn min(&self) -> Option<u16> {
        if self.values.is_empty() {
            None
        }
        else {
            Some(self.values.get(0))
        }
    }

    /// The largest element in the array. Returns `None` if the cardinality is 0
    pub fn max(&self) -> Option<u16> {
        if self.values.is_empty() {
            None
        }
        else {
            Some(self.values.get(self.values.len() - 1))
        }
    }

    /// Return the number of values equal to or smaller than `value`
    #[inline]
    pub fn rank(&self, value: u16) -> usize {
        self.values.partition_point(|v| v <= value)
    }

    #[inline]
    pub fn select(&self, rank: usize) -> Option<u16> {
        if rank < self.values.len() {
            Some(self.values.get(rank))
        }
        else {
            None
        }
    }

    /// Compute the number of runs in the array
    pub fn num_runs(&self) -> usize {
        let mut num_runs = 0;
        let mut previous: Option<u16> = None;

        for value in self.values.iter() {
            match previous {
                Some(previous) if u32::from(previous) + 1 == u32::from(value) => (),
                _ => num_runs += 1
            }

            previous = Some(value);
        }

        num_runs
    }

    /// Get an iterator over the elements of the array
    #[inline]
    pub fn iter(&self) -> PackedIter<'a, u16> {
        self.values.iter()
    }

    /// Iterate over maximal spans of consecutive values
    pub fn spans(&self) -> ArraySpans<'a> {
        ArraySpans {
            values: self.values.iter().peekable()
        }
    }

    pub fn to_owned(&self) -> ArrayContainer {
        ArrayContainer {
            array: self.values.to_vec()
        }
    }
}

/// An iterator over the maximal spans of an array container
#[derive(Clone, Debug)]
pub struct ArraySpans<'a> {
    values: std::iter::Peekable<PackedIter<'a, u16>>
}

impl<'a> Iterator for ArraySpans<'a> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let start = u32::from(self.values.next()?);
        let mut end = start + 1;

        while self.values.next_if(|value| u32::from(*value) == end).is_some() {
            end += 1;
        }

        Some((start, end))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_and_remove() {
        let mut container = ArrayContainer::new();
        assert!(container.add(10));
        assert!(container.add(3));
        assert!(container.add(65535));
        assert!(!container.add(3));

        assert_eq!(container.as_slice(), &[3, 10, 65535]);

        assert!(container.remove(10));
        assert!(!container.remove(10));
        assert_eq!(container.as_slice(), &[3, 65535]);
    }

    #[test]
    fn ranges() {
        let mut container = ArrayContainer::from_vec(vec![1, 5, 9, 200]);
        container.add_range(4, 12);

        assert_eq!(container.as_slice(), &[1, 4, 5, 6, 7, 8, 9, 10, 11, 200]);
        assert!(container.as_ref().contains_range(4, 12));
        assert!(!container.as_ref().contains_range(3, 12));

        container.remove_range(5, 201);
        assert_eq!(container.as_slice(), &[1, 4]);

        container.add_range(65530, 65536);
        assert_eq!(container.as_ref().max(), Some(65535));
        assert_eq!(container.cardinality(), 8);
    }

    #[test]
    fn queries() {
        let container = ArrayContainer::from_vec(vec![2, 3, 4, 10, 12, 13]);
        let view = container.as_ref();

        assert_eq!(view.min(), Some(2));
        assert_eq!(view.max(), Some(13));
        assert_eq!(view.rank(1), 0);
        assert_eq!(view.rank(4), 3);
        assert_eq!(view.rank(11), 4);
        assert_eq!(view.select(3), Some(10));
        assert_eq!(view.select(6), None);
        assert_eq!(view.num_runs(), 3);

        let spans: Vec<(u32, u32)> = view.spans().collect();
        assert_eq!(spans, vec![(2, 5), (10, 11), (12, 14)]);
    }

    #[test]
    fn empty() {
        let container = ArrayContainer::new();
        let view = container.as_ref();

        assert_eq!(view.min(), None);
        assert_eq!(view.max(), None);
        assert_eq!(view.num_runs(), 0);
        assert_eq!(view.spans().count(), 0);
    }
}

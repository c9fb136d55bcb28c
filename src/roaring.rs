use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::mem;
use std::ops::RangeBounds;

use crate::container::{advance_until, Container, ContainerRef};
use crate::immutable::{ImmutableBitmap, Iter};
use crate::utils::IntoBound;

/// A Roaring Bitmap
///
/// Roaring bitmaps are an optimized bitmap implementation for 32 bit integer sets
/// that support high performance queries and a compact memory representation.
///
/// # How it works
/// Internally data is split into a 16 bit key consisting of the upper 16 bits of the value, and a 16 bit
/// value that contains the lower 16 bits. Only the lower 16 bits are stored and the value is reconstructed
/// from the key on demand. The storage method used changes dynamically based on the number of values
/// contained within the bitmap.
///
/// Generallly the representation selected is as follows
///  - Up to 4096 elements       : Array
///  - More than 4096 elements   : Bitset
///  - Long runs of values       : RLE encoded, after [`run_optimize`](RoaringBitmap::run_optimize)
///
/// Queries and set operations live on the [`ImmutableBitmap`] trait so they work the same way on
/// owned bitmaps and on [`RoaringView`](crate::RoaringView)s of serialized data.
///
/// # Performance Remarks
/// Frequent modification of a bitmap may result in high memory churn due to transitions between
/// in memory representations of the bitmap contents. As such, if the bitmap is to be modified frequently
/// it is best to aggregate operations and apply them at once.
///
/// Once a bitmap is built queries done via the `inplace_<op>` variants will only incur a cost for the query bitmap.
/// Queries using the normal ops will create a new bitmap for every operation.
#[derive(Clone, Default)]
pub struct RoaringBitmap {
    /// List of containers in this roaring bitmap
    containers: Vec<Container>,

    /// List of keys corresponding to the containers in the bitmap
    keys: Vec<u16>
}

impl RoaringBitmap {
    /// Create a new empty roaring bitmap
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new roaring bitmap with the specified capacity for storing containers
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            containers: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity)
        }
    }

    /// Create a new roaring bitmap holding every value in `range`
    pub fn from_range<R: RangeBounds<u32>>(range: R) -> Self {
        let mut bitmap = Self::new();
        bitmap.add_range(range);

        bitmap
    }

    /// Create a new roaring bitmap from a set of elements
    pub fn from_slice(slice: &[u32]) -> Self {
        let mut bitmap = Self::new();
        bitmap.add_slice(slice);

        bitmap
    }

    /// Append a container. Keys must be pushed in increasing order and the container must not be empty
    #[inline]
    pub(crate) fn push_container(&mut self, key: u16, container: Container) {
        debug_assert!(self.keys.last().map_or(true, |last| *last < key));
        debug_assert!(!container.is_empty());

        self.keys.push(key);
        self.containers.push(container);
    }

    /// Append a container unless it is empty
    #[inline]
    pub(crate) fn push_nonempty(&mut self, key: u16, container: Container) {
        if !container.is_empty() {
            self.push_container(key, container);
        }
    }

    /// Get the index of the container for `key`, inserting an empty one if it doesn't exist.
    /// The caller must add a value to an inserted container
    fn index_or_insert(&mut self, key: u16) -> usize {
        match self.keys.binary_search(&key) {
            Ok(index) => index,
            Err(index) => {
                self.keys.insert(index, key);
                self.containers.insert(index, Container::default());

                index
            }
        }
    }

    /// Add a value to the bitmap
    pub fn add(&mut self, value: u32) {
        let index = self.index_or_insert((value >> 16) as u16);

        self.containers[index].add(value as u16);
    }

    /// Add a range of values to the bitmap
    pub fn add_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range.into_bound();

        self.update_span(start, end, |container, lo, hi| {
            match container {
                Some(mut container) => {
                    container.add_range(lo, hi);
                    Some(container)
                },
                None => Some(Container::from_range(lo, hi))
            }
        });
    }

    /// Add a list of values to the bitmap
    pub fn add_slice(&mut self, slice: &[u32]) {
        let mut cached: Option<(u16, usize)> = None;

        for value in slice.iter() {
            let key = (*value >> 16) as u16;

            // Consecutive values usually share a container, skip the search for those
            let index = match cached {
                Some((cached_key, index)) if cached_key == key => index,
                _ => self.index_or_insert(key)
            };

            self.containers[index].add(*value as u16);
            cached = Some((key, index));
        }
    }

    /// Remove a value from the bitmap
    pub fn remove(&mut self, value: u32) {
        if let Ok(index) = self.keys.binary_search(&((value >> 16) as u16)) {
            self.containers[index].remove(value as u16);

            if self.containers[index].is_empty() {
                self.containers.remove(index);
                self.keys.remove(index);
            }
        }
    }

    /// Remove a range of values from the bitmap
    pub fn remove_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range.into_bound();

        self.remove_span(start, end);
    }

    /// Remove a list of values from the bitmap
    pub fn remove_slice(&mut self, slice: &[u32]) {
        for value in slice.iter() {
            self.remove(*value);
        }
    }

    /// Clear the contents of this bitmap
    #[inline]
    pub fn clear(&mut self) {
        self.containers.clear();
        self.keys.clear();
    }

    /// Shrink the memory used by the bitmap to fit it's contents
    pub fn shrink_to_fit(&mut self) {
        self.containers.shrink_to_fit();
        self.keys.shrink_to_fit();

        for container in self.containers.iter_mut() {
            container.shrink_to_fit();
        }
    }

    /// Convert containers to run length encoding wherever that is strictly smaller, and back where
    /// it isn't. Returns true if any run container remains
    pub fn run_optimize(&mut self) -> bool {
        let mut has_run = false;
        for container in self.containers.iter_mut() {
            has_run |= container.run_optimize();
        }

        has_run
    }

    /// Convert every run container back to an array or bitset. Returns true if anything changed
    pub fn remove_run_compression(&mut self) -> bool {
        let mut changed = false;
        for container in self.containers.iter_mut() {
            changed |= container.remove_run_compression();
        }

        changed
    }

    /// Or `other` into this bitmap (union)
    pub fn inplace_or<B>(&mut self, other: &B)
        where B: ImmutableBitmap + ?Sized
    {
        let len1 = other.container_count();
        if len1 == 0 {
            return;
        }

        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);
        self.keys.reserve(keys.len() + len1);
        self.containers.reserve(keys.len() + len1);

        let mut entries = keys.into_iter().zip(containers).peekable();

        for i1 in 0..len1 {
            let k1 = other.key_at(i1);

            while let Some((key, container)) = entries.next_if(|(key, _)| *key < k1) {
                self.push_container(key, container);
            }

            match entries.next_if(|(key, _)| *key == k1) {
                Some((key, mut container)) => {
                    container.inplace_or(&other.container_at(i1));
                    self.push_container(key, container);
                },
                None => {
                    self.push_container(k1, other.container_at(i1).to_owned());
                }
            }
        }

        for (key, container) in entries {
            self.push_container(key, container);
        }
    }

    /// And this bitmap with `other` (intersect)
    pub fn inplace_and<B>(&mut self, other: &B)
        where B: ImmutableBitmap + ?Sized
    {
        let len1 = other.container_count();

        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);

        let mut i1 = 0;
        for (key, mut container) in keys.into_iter().zip(containers) {
            i1 = advance_until(|i| other.key_at(i), len1, i1, key);
            if i1 >= len1 {
                break;
            }

            if other.key_at(i1) == key {
                container.inplace_and(&other.container_at(i1));
                self.push_nonempty(key, container);
            }
        }
    }

    /// Remove the values of `other` from this bitmap (difference)
    pub fn inplace_and_not<B>(&mut self, other: &B)
        where B: ImmutableBitmap + ?Sized
    {
        let len1 = other.container_count();
        if len1 == 0 {
            return;
        }

        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);
        self.keys.reserve(keys.len());
        self.containers.reserve(keys.len());

        let mut i1 = 0;
        for (key, mut container) in keys.into_iter().zip(containers) {
            i1 = advance_until(|i| other.key_at(i), len1, i1, key);

            if i1 < len1 && other.key_at(i1) == key {
                container.inplace_and_not(&other.container_at(i1));
                self.push_nonempty(key, container);
            }
            else {
                self.push_container(key, container);
            }
        }
    }

    /// Xor this bitmap with `other` (symmetric difference)
    pub fn inplace_xor<B>(&mut self, other: &B)
        where B: ImmutableBitmap + ?Sized
    {
        let len1 = other.container_count();
        if len1 == 0 {
            return;
        }

        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);
        self.keys.reserve(keys.len() + len1);
        self.containers.reserve(keys.len() + len1);

        let mut entries = keys.into_iter().zip(containers).peekable();

        for i1 in 0..len1 {
            let k1 = other.key_at(i1);

            while let Some((key, container)) = entries.next_if(|(key, _)| *key < k1) {
                self.push_container(key, container);
            }

            match entries.next_if(|(key, _)| *key == k1) {
                Some((key, mut container)) => {
                    container.inplace_xor(&other.container_at(i1));
                    self.push_nonempty(key, container);
                },
                None => {
                    self.push_container(k1, other.container_at(i1).to_owned());
                }
            }
        }

        for (key, container) in entries {
            self.push_container(key, container);
        }
    }

    /// Complement the values in `range`, leaving everything outside of it untouched
    pub fn inplace_flip<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = range.into_bound();

        self.update_span(start, end, |container, lo, hi| {
            match container {
                Some(container) => Some(container.as_ref().flip(lo, hi)),
                None => Some(Container::from_range(lo, hi))
            }
        });
    }

    /// Remove every value in `[start, end)`. `end` may be `1 << 32`
    pub(crate) fn remove_span(&mut self, start: u64, end: u64) {
        if start >= end || self.keys.is_empty() {
            return;
        }

        let first_key = (start >> 16) as u16;
        let last_key = ((end - 1) >> 16) as u16;

        let lo = self.keys.partition_point(|key| *key < first_key);
        let hi = self.keys.partition_point(|key| *key <= last_key);

        for index in lo..hi {
            let (container_start, container_end) = local_bounds(self.keys[index], start, end);
            self.containers[index].remove_range(container_start, container_end);
        }

        self.drop_empty(lo..hi);
    }

    /// Remove empty containers within `range` of indices
    fn drop_empty(&mut self, range: std::ops::Range<usize>) {
        let mut write = range.start;
        for read in range.clone() {
            if !self.containers[read].is_empty() {
                self.keys.swap(write, read);
                self.containers.swap(write, read);
                write += 1;
            }
        }

        self.keys.drain(write..range.end);
        self.containers.drain(write..range.end);
    }

    /// Rebuild every container whose key intersects `[start, end)`, including keys that are absent.
    ///
    /// `f` receives the existing container, if any, and the local bounds of the span within it. Empty
    /// results are dropped
    fn update_span<F>(&mut self, start: u64, end: u64, mut f: F)
        where F: FnMut(Option<Container>, u32, u32) -> Option<Container>
    {
        if start >= end {
            return;
        }

        let first_key = (start >> 16) as u16;
        let last_key = ((end - 1) >> 16) as u16;

        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);
        let capacity = keys.len() + usize::from(last_key - first_key) + 1;
        self.keys.reserve(capacity);
        self.containers.reserve(capacity);

        let mut entries = keys.into_iter().zip(containers).peekable();

        while let Some((key, container)) = entries.next_if(|(key, _)| *key < first_key) {
            self.push_container(key, container);
        }

        for key in first_key..=last_key {
            let (lo, hi) = local_bounds(key, start, end);
            let existing = entries.next_if(|(found, _)| *found == key)
                .map(|(_, container)| container);

            if let Some(container) = f(existing, lo, hi) {
                self.push_nonempty(key, container);
            }
        }

        for (key, container) in entries {
            self.push_container(key, container);
        }
    }
}

/// The part of `[start, end)` that falls in the container for `key`, relative to the container
#[inline]
fn local_bounds(key: u16, start: u64, end: u64) -> (u32, u32) {
    let base = u64::from(key) << 16;
    let lo = start.max(base) - base;
    let hi = end.min(base + (1 << 16)) - base;

    (lo as u32, hi as u32)
}

impl ImmutableBitmap for RoaringBitmap {
    #[inline]
    fn container_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    fn key_at(&self, index: usize) -> u16 {
        self.keys[index]
    }

    #[inline]
    fn container_at(&self, index: usize) -> ContainerRef<'_> {
        self.containers[index].as_ref()
    }

    #[inline]
    fn find_key(&self, key: u16) -> Result<usize, usize> {
        self.keys.binary_search(&key)
    }
}

impl<B: ImmutableBitmap> PartialEq<B> for RoaringBitmap {
    fn eq(&self, other: &B) -> bool {
        self.bitmap_eq(other)
    }
}

impl Eq for RoaringBitmap { }

impl Hash for RoaringBitmap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_contents(state);
    }
}

impl fmt::Debug for RoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        debug_bitmap("RoaringBitmap", self, f)
    }
}

/// Number of values printed by `Debug`
const DEBUG_PREVIEW: usize = 16;

/// Write a bounded preview of the values of `bitmap`
pub(crate) fn debug_bitmap<B>(name: &str, bitmap: &B, f: &mut fmt::Formatter) -> fmt::Result
    where B: ImmutableBitmap
{
    let cardinality = bitmap.cardinality();
    write!(f, "{}<{} values>[", name, cardinality)?;

    for (index, value) in bitmap.iter().take(DEBUG_PREVIEW).enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }

        write!(f, "{}", value)?;
    }

    if cardinality > DEBUG_PREVIEW as u64 {
        f.write_str(", ..")?;
    }

    f.write_str("]")
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        bitmap.extend(iter);

        bitmap
    }
}

impl Extend<u32> for RoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a, RoaringBitmap>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

use std::hash::Hasher;
use std::io::{self, Write};
use std::ops::RangeBounds;

use crate::container::{advance_until, ContainerIter, ContainerRef};
use crate::utils::IntoBound;
use crate::{serialization, RoaringBitmap, RoaringStatistics};

/// Read access to a roaring bitmap.
///
/// Implemented by the owned [`RoaringBitmap`] and by [`RoaringView`](crate::RoaringView), which reads a
/// serialized bitmap in place. Every query and set operation is available on both, and operands of
/// different types can be mixed freely.
///
/// Implementors only describe their containers, keys must be strictly increasing and no container may be empty
pub trait ImmutableBitmap {
    /// Number of containers in the bitmap
    fn container_count(&self) -> usize;

    /// The high 16 bits shared by the values of the container at `index`
    fn key_at(&self, index: usize) -> u16;

    /// The container at `index`
    fn container_at(&self, index: usize) -> ContainerRef<'_>;

    /// Find the index of the container with `key`, or the index where it would be inserted
    fn find_key(&self, key: u16) -> Result<usize, usize> {
        let mut low = 0;
        let mut high = self.container_count();

        while low < high {
            let middle = low + (high - low) / 2;
            let found = self.key_at(middle);

            if found < key {
                low = middle + 1;
            }
            else if found > key {
                high = middle;
            }
            else {
                return Ok(middle);
            }
        }

        Err(low)
    }

    /// Check if the bitmap contains `value`
    fn contains(&self, value: u32) -> bool {
        match self.find_key((value >> 16) as u16) {
            Ok(index) => self.container_at(index).contains(value as u16),
            Err(_) => false
        }
    }

    /// Check if the bitmap contains every value in `range`
    fn contains_range<R: RangeBounds<u32>>(&self, range: R) -> bool
        where Self: Sized
    {
        let (start, end) = range.into_bound();
        if start >= end {
            return true;
        }

        let first_key = (start >> 16) as u16;
        let last_key = ((end - 1) >> 16) as u16;

        let first = match self.find_key(first_key) {
            Ok(index) => index,
            Err(_) => return false
        };

        // Every key in between must be present
        let span = usize::from(last_key - first_key);
        if first + span >= self.container_count() || self.key_at(first + span) != last_key {
            return false;
        }

        (0..=span).all(|offset| {
            let key = first_key as u64 + offset as u64;
            let lo = (start.max(key << 16) - (key << 16)) as u32;
            let hi = (end.min((key + 1) << 16) - (key << 16)) as u32;

            self.container_at(first + offset).contains_range(lo, hi)
        })
    }

    /// The number of values in the bitmap
    fn cardinality(&self) -> u64 {
        (0..self.container_count())
            .map(|index| self.container_at(index).cardinality() as u64)
            .sum()
    }

    fn is_empty(&self) -> bool {
        self.container_count() == 0
    }

    /// The smallest value in the bitmap, `None` if it is empty
    fn min(&self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }

        let key = u32::from(self.key_at(0)) << 16;

        self.container_at(0)
            .min()
            .map(|low| key | u32::from(low))
    }

    /// The largest value in the bitmap, `None` if it is empty
    fn max(&self) -> Option<u32> {
        let last = self.container_count().checked_sub(1)?;
        let key = u32::from(self.key_at(last)) << 16;

        self.container_at(last)
            .max()
            .map(|low| key | u32::from(low))
    }

    /// The number of values smaller or equal to `value`
    fn rank(&self, value: u32) -> u64 {
        let (below, found) = match self.find_key((value >> 16) as u16) {
            Ok(index) => (index, Some(index)),
            Err(index) => (index, None)
        };

        let mut rank: u64 = (0..below)
            .map(|index| self.container_at(index).cardinality() as u64)
            .sum();

        if let Some(index) = found {
            rank += self.container_at(index).rank(value as u16) as u64;
        }

        rank
    }

    /// The value with `rank` smaller values in the bitmap, `None` if `rank >= cardinality`
    fn select(&self, rank: u64) -> Option<u32> {
        let mut remaining = rank;

        for index in 0..self.container_count() {
            let container = self.container_at(index);
            let cardinality = container.cardinality() as u64;

            if remaining < cardinality {
                let key = u32::from(self.key_at(index)) << 16;

                return container.select(remaining as usize)
                    .map(|low| key | u32::from(low));
            }

            remaining -= cardinality;
        }

        None
    }

    /// Iterate over the values of the bitmap in ascending order
    fn iter(&self) -> Iter<'_, Self>
        where Self: Sized
    {
        Iter {
            bitmap: self,
            index: 0,
            key: 0,
            iter: None
        }
    }

    /// Copy the values into a vector in ascending order
    fn to_vec(&self) -> Vec<u32> {
        let mut values = Vec::with_capacity(self.cardinality() as usize);

        for index in 0..self.container_count() {
            let key = u32::from(self.key_at(index)) << 16;
            values.extend(self.container_at(index).iter().map(|low| key | u32::from(low)));
        }

        values
    }

    /// Deep copy into an owned bitmap
    fn to_bitmap(&self) -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::with_capacity(self.container_count());
        for index in 0..self.container_count() {
            bitmap.push_nonempty(self.key_at(index), self.container_at(index).to_owned());
        }

        bitmap
    }

    /// Or this bitmap with `other` (union)
    fn or<B>(&self, other: &B) -> RoaringBitmap
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();

        let mut result = RoaringBitmap::with_capacity(len0 + len1);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.key_at(i0);
            let k1 = other.key_at(i1);

            if k0 == k1 {
                let c = self.container_at(i0).or(&other.container_at(i1));
                result.push_container(k0, c);

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                result.push_container(k0, self.container_at(i0).to_owned());

                i0 += 1;
            }
            else {
                result.push_container(k1, other.container_at(i1).to_owned());

                i1 += 1;
            }
        }

        for index in i0..len0 {
            result.push_container(self.key_at(index), self.container_at(index).to_owned());
        }

        for index in i1..len1 {
            result.push_container(other.key_at(index), other.container_at(index).to_owned());
        }

        result
    }

    /// And this bitmap with `other` (intersect)
    fn and<B>(&self, other: &B) -> RoaringBitmap
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();

        let mut result = RoaringBitmap::with_capacity(len0.min(len1));
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.key_at(i0);
            let k1 = other.key_at(i1);

            if k0 == k1 {
                let c = self.container_at(i0).and(&other.container_at(i1));
                result.push_nonempty(k0, c);

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                i0 = advance_until(|i| self.key_at(i), len0, i0, k1);
            }
            else {
                i1 = advance_until(|i| other.key_at(i), len1, i1, k0);
            }
        }

        result
    }

    /// And not this bitmap with `other` (difference)
    fn and_not<B>(&self, other: &B) -> RoaringBitmap
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();

        let mut result = RoaringBitmap::with_capacity(len0);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.key_at(i0);
            let k1 = other.key_at(i1);

            if k0 == k1 {
                let c = self.container_at(i0).and_not(&other.container_at(i1));
                result.push_nonempty(k0, c);

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                result.push_container(k0, self.container_at(i0).to_owned());

                i0 += 1;
            }
            else {
                i1 = advance_until(|i| other.key_at(i), len1, i1, k0);
            }
        }

        for index in i0..len0 {
            result.push_container(self.key_at(index), self.container_at(index).to_owned());
        }

        result
    }

    /// Xor this bitmap with `other` (symmetric difference)
    fn xor<B>(&self, other: &B) -> RoaringBitmap
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();

        let mut result = RoaringBitmap::with_capacity(len0 + len1);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.key_at(i0);
            let k1 = other.key_at(i1);

            if k0 == k1 {
                let c = self.container_at(i0).xor(&other.container_at(i1));
                result.push_nonempty(k0, c);

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                result.push_container(k0, self.container_at(i0).to_owned());

                i0 += 1;
            }
            else {
                result.push_container(k1, other.container_at(i1).to_owned());

                i1 += 1;
            }
        }

        for index in i0..len0 {
            result.push_container(self.key_at(index), self.container_at(index).to_owned());
        }

        for index in i1..len1 {
            result.push_container(other.key_at(index), other.container_at(index).to_owned());
        }

        result
    }

    /// Number of values shared with `other`, without building the intersection
    fn and_cardinality<B>(&self, other: &B) -> u64
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();

        let mut cardinality = 0;
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.key_at(i0);
            let k1 = other.key_at(i1);

            if k0 == k1 {
                cardinality += self.container_at(i0).and_cardinality(&other.container_at(i1)) as u64;

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                i0 = advance_until(|i| self.key_at(i), len0, i0, k1);
            }
            else {
                i1 = advance_until(|i| other.key_at(i), len1, i1, k0);
            }
        }

        cardinality
    }

    /// Number of values in the union with `other`
    fn or_cardinality<B>(&self, other: &B) -> u64
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        self.cardinality() + other.cardinality() - self.and_cardinality(other)
    }

    /// Number of values in the difference with `other`
    fn and_not_cardinality<B>(&self, other: &B) -> u64
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        self.cardinality() - self.and_cardinality(other)
    }

    /// Number of values in the symmetric difference with `other`
    fn xor_cardinality<B>(&self, other: &B) -> u64
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        self.cardinality() + other.cardinality() - 2 * self.and_cardinality(other)
    }

    /// Check if every value of this bitmap is also in `other`
    fn is_subset<B>(&self, other: &B) -> bool
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let len0 = self.container_count();
        let len1 = other.container_count();
        if len0 > len1 {
            return false;
        }

        let mut i1 = 0;
        for i0 in 0..len0 {
            let key = self.key_at(i0);

            i1 = advance_until(|i| other.key_at(i), len1, i1, key);
            if i1 >= len1 || other.key_at(i1) != key {
                return false;
            }

            if !self.container_at(i0).is_subset(&other.container_at(i1)) {
                return false;
            }

            i1 += 1;
        }

        true
    }

    /// Complement the values in `range`, leaving everything outside of it untouched
    fn flip<R: RangeBounds<u32>>(&self, range: R) -> RoaringBitmap
        where Self: Sized
    {
        let mut result = self.to_bitmap();
        result.inplace_flip(range);

        result
    }

    /// The serialized bytes backing the bitmap, if it reads straight out of a buffer.
    /// Serializing such a bitmap copies these bytes
    fn encoded_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// Exact number of bytes [`serialize`](ImmutableBitmap::serialize) writes
    fn serialized_size(&self) -> usize {
        match self.encoded_bytes() {
            Some(bytes) => bytes.len(),
            None => serialization::serialized_size(self)
        }
    }

    /// Serialize the bitmap to a stream in the portable roaring format.
    ///
    /// # Returns
    /// The number of bytes written to the buffer
    fn serialize<W: Write>(&self, buf: &mut W) -> io::Result<usize>
        where Self: Sized
    {
        if let Some(bytes) = self.encoded_bytes() {
            buf.write_all(bytes)?;

            return Ok(bytes.len());
        }

        serialization::serialize(self, buf)
    }

    /// Collect statistics about the composition of the bitmap
    fn statistics(&self) -> RoaringStatistics {
        RoaringStatistics::collect(self)
    }

    /// Value equality with any other bitmap, regardless of how the containers are represented
    fn bitmap_eq<B>(&self, other: &B) -> bool
        where Self: Sized,
              B: ImmutableBitmap + ?Sized
    {
        let count = self.container_count();
        if count != other.container_count() {
            return false;
        }

        (0..count).all(|index| {
            self.key_at(index) == other.key_at(index)
                && self.container_at(index) == other.container_at(index)
        })
    }

    /// Feed the contents to `state`. Equal bitmaps hash equally whatever their representation
    fn hash_contents<H: Hasher>(&self, state: &mut H)
        where Self: Sized
    {
        use std::hash::Hash;

        state.write_usize(self.container_count());

        for index in 0..self.container_count() {
            state.write_u16(self.key_at(index));
            self.container_at(index).hash(state);
        }
    }
}

impl<'a, T> ImmutableBitmap for &'a T
    where T: ImmutableBitmap + ?Sized
{
    #[inline]
    fn container_count(&self) -> usize {
        (**self).container_count()
    }

    #[inline]
    fn key_at(&self, index: usize) -> u16 {
        (**self).key_at(index)
    }

    #[inline]
    fn container_at(&self, index: usize) -> ContainerRef<'_> {
        (**self).container_at(index)
    }

    #[inline]
    fn find_key(&self, key: u16) -> Result<usize, usize> {
        (**self).find_key(key)
    }

    #[inline]
    fn encoded_bytes(&self) -> Option<&[u8]> {
        (**self).encoded_bytes()
    }
}

/// An iterator over the values of a bitmap in ascending order
pub struct Iter<'a, B: ?Sized> {
    /// The bitmap we're iterating
    bitmap: &'a B,

    /// The index of the next container to iterate
    index: usize,

    /// The key of the container we're currently iterating, shifted into place
    key: u32,

    /// The container iterator we're currently iterating
    iter: Option<ContainerIter<'a>>
}

impl<'a, B> Iterator for Iter<'a, B>
    where B: ImmutableBitmap + ?Sized
{
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some(low) = self.iter.as_mut().and_then(|iter| iter.next()) {
                return Some(self.key | u32::from(low));
            }

            // Advance to the next container
            if self.index >= self.bitmap.container_count() {
                self.iter = None;

                return None;
            }

            self.key = u32::from(self.bitmap.key_at(self.index)) << 16;
            self.iter = Some(self.bitmap.container_at(self.index).iter());
            self.index += 1;
        }
    }
}

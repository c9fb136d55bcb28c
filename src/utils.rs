use std::io::{self, Write};
use std::ops::{Bound, RangeBounds};

/// Convert a range over `u32` into a half open `[start, end)` pair of `u64`.
///
/// `end` may be `1 << 32` so the full domain is expressible. Inverted ranges collapse to an empty range at `start`
pub trait IntoBound {
    fn into_bound(self) -> (u64, u64);
}

impl<R: RangeBounds<u32>> IntoBound for R {
    fn into_bound(self) -> (u64, u64) {
        let start = match self.start_bound() {
            Bound::Included(value) => u64::from(*value),
            Bound::Excluded(value) => u64::from(*value) + 1,
            Bound::Unbounded => 0
        };

        let end = match self.end_bound() {
            Bound::Included(value) => u64::from(*value) + 1,
            Bound::Excluded(value) => u64::from(*value),
            Bound::Unbounded => 1 << 32
        };

        (start, end.max(start))
    }
}

/// A fixed width value with a little endian wire representation
pub trait LeValue: Copy {
    /// Width of the encoded value in bytes
    const WIDTH: usize;

    /// Decode a value from the first `WIDTH` bytes of `bytes`
    fn read_le(bytes: &[u8]) -> Self;

    /// Append the encoded value to `out`
    fn write_le(&self, out: &mut Vec<u8>);
}

impl LeValue for u16 {
    const WIDTH: usize = 2;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    #[inline]
    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl LeValue for u64 {
    const WIDTH: usize = 8;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        let mut word = [0; 8];
        word.copy_from_slice(&bytes[..8]);

        u64::from_le_bytes(word)
    }

    #[inline]
    fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// A read only sequence of values that is either a native slice owned by a container
/// or the little endian encoding of the values inside a foreign buffer.
///
/// The encoded form makes no alignment assumptions, every access is an unaligned read
#[derive(Clone, Copy, Debug)]
pub enum Packed<'a, T> {
    /// Values in native memory
    Native(&'a [T]),

    /// Values encoded as little endian bytes
    Le(&'a [u8])
}

impl<'a, T: LeValue> Packed<'a, T> {
    /// Number of values in the sequence
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Packed::Native(values) => values.len(),
            Packed::Le(bytes) => bytes.len() / T::WIDTH
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the value at `index`. Panics if out of bounds
    #[inline]
    pub fn get(&self, index: usize) -> T {
        match self {
            Packed::Native(values) => values[index],
            Packed::Le(bytes) => {
                let start = index * T::WIDTH;
                T::read_le(&bytes[start..(start + T::WIDTH)])
            }
        }
    }

    /// The underlying native slice, if there is one
    #[inline]
    pub fn as_native(&self) -> Option<&'a [T]> {
        match self {
            Packed::Native(values) => Some(values),
            Packed::Le(_) => None
        }
    }

    /// Return the index of the first value for which `pred` is false.
    /// Assumes the sequence is partitioned by `pred`
    pub fn partition_point<P>(&self, mut pred: P) -> usize
        where P: FnMut(T) -> bool
    {
        if let Packed::Native(values) = self {
            return values.partition_point(|value| pred(*value));
        }

        let mut low = 0;
        let mut high = self.len();
        while low < high {
            let middle = low + (high - low) / 2;

            if pred(self.get(middle)) {
                low = middle + 1;
            }
            else {
                high = middle;
            }
        }

        low
    }

    /// Iterate over the values in order
    #[inline]
    pub fn iter(&self) -> PackedIter<'a, T> {
        PackedIter {
            packed: *self,
            index: 0,
            len: self.len()
        }
    }

    /// Copy the values into an owned vector
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Packed::Native(values) => values.to_vec(),
            Packed::Le(bytes) => {
                bytes.chunks_exact(T::WIDTH)
                    .map(T::read_le)
                    .collect()
            }
        }
    }

    /// Write the little endian encoding of the sequence. Encoded sequences are written as is
    pub fn write_le<W: Write>(&self, buf: &mut W) -> io::Result<usize> {
        match self {
            Packed::Le(bytes) => {
                buf.write_all(bytes)?;

                Ok(bytes.len())
            },
            Packed::Native(values) => {
                let mut bytes = Vec::with_capacity(values.len() * T::WIDTH);
                for value in values.iter() {
                    value.write_le(&mut bytes);
                }

                buf.write_all(&bytes)?;

                Ok(bytes.len())
            }
        }
    }
}

impl<'a, T: LeValue + PartialEq> PartialEq for Packed<'a, T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Packed::Native(a), Packed::Native(b)) => a == b,
            (Packed::Le(a), Packed::Le(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter())
        }
    }
}

/// An iterator over the values of a [`Packed`] sequence
#[derive(Clone, Debug)]
pub struct PackedIter<'a, T> {
    packed: Packed<'a, T>,
    index: usize,
    len: usize
}

impl<'a, T: LeValue> Iterator for PackedIter<'a, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.index < self.len {
            let value = self.packed.get(self.index);
            self.index += 1;

            Some(value)
        }
        else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;

        (remaining, Some(remaining))
    }
}

impl<'a, T: LeValue> ExactSizeIterator for PackedIter<'a, T> { }

/// Read a little endian `u16` at `offset`. Assumes the bounds were checked by the caller
#[inline]
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Read a little endian `u32` at `offset`. Assumes the bounds were checked by the caller
#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3]
    ])
}

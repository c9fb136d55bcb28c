mod array;
mod array_ops;
mod bitset;
mod bitset_ops;
mod run;
mod run_ops;

use std::hash::{Hash, Hasher};
use std::io::{self, Write};

use tracing::trace;

use crate::utils::PackedIter;

pub(crate) use self::array_ops::advance_until;
pub use self::array::{ArrayContainer, ArrayRef, ArraySpans};
pub use self::bitset::{BitsetContainer, BitsetIter, BitsetRef, BitsetSpans, BITSET_SIZE_IN_WORDS};
pub use self::run::{Rle16, RunContainer, RunIter, RunRef, RunSpans};

/// Default maximum size of an array container before it is converted to another type
pub const DEFAULT_MAX_SIZE: usize = 4096;

/// Serialized size of a bitset container in bytes
const BITSET_BYTES: usize = BITSET_SIZE_IN_WORDS * 8;

/// The physical representation of a container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Bitset,
    Run
}

impl ContainerKind {
    /// Select the most compact representation for a container with `cardinality` values in `runs` runs.
    ///
    /// Arrays hold up to `DEFAULT_MAX_SIZE` values and bitsets everything else. A run container is only
    /// chosen when it is strictly smaller than the alternative
    pub fn best(cardinality: usize, runs: usize) -> Self {
        let (kind, size) = if cardinality <= DEFAULT_MAX_SIZE {
            (ContainerKind::Array, 2 * cardinality)
        }
        else {
            (ContainerKind::Bitset, BITSET_BYTES)
        };

        if 2 + 4 * runs < size {
            ContainerKind::Run
        }
        else {
            kind
        }
    }

    /// Size in bytes of the serialized body for a container of this kind
    pub fn serialized_size(self, cardinality: usize, runs: usize) -> usize {
        match self {
            ContainerKind::Array => 2 * cardinality,
            ContainerKind::Bitset => BITSET_BYTES,
            ContainerKind::Run => 2 + 4 * runs
        }
    }
}

/// Enum representing a container of any type
#[derive(Clone, Debug)]
pub enum Container {
    /// Array container
    Array(ArrayContainer),

    /// Bitset container
    Bitset(BitsetContainer),

    /// Run container
    Run(RunContainer)
}

impl Default for Container {
    fn default() -> Self {
        Container::Array(ArrayContainer::new())
    }
}

impl Container {
    /// Create a container with all values in `[start, end)`
    pub fn from_range(start: u32, end: u32) -> Self {
        let size = end.saturating_sub(start) as usize;

        // Result is an array
        if size <= DEFAULT_MAX_SIZE {
            let mut container = ArrayContainer::with_capacity(size);
            container.add_range(start, end);

            Container::Array(container)
        }
        // Result is a bitset
        else {
            let mut container = BitsetContainer::new();
            container.set_range(start, end);

            Container::Bitset(container)
        }
    }

    /// Wrap sorted values in an array, or a bitset if there are too many of them
    pub(crate) fn from_sorted(values: Vec<u16>) -> Self {
        if values.len() <= DEFAULT_MAX_SIZE {
            Container::Array(ArrayContainer::from_vec(values))
        }
        else {
            Container::Bitset(BitsetContainer::from_values(values))
        }
    }

    /// Wrap a bitset, converting it to an array if it is sparse enough
    pub(crate) fn from_bitset(bitset: BitsetContainer) -> Self {
        if bitset.cardinality() <= DEFAULT_MAX_SIZE {
            Container::Array(ArrayContainer::from_vec(bitset.as_ref().iter().collect()))
        }
        else {
            Container::Bitset(bitset)
        }
    }

    /// Build the most compact container for a sorted sequence of disjoint, non touching spans
    pub(crate) fn from_spans(spans: &[(u32, u32)]) -> Self {
        let cardinality = run_ops::cardinality(spans);

        match ContainerKind::best(cardinality, spans.len()) {
            ContainerKind::Array => {
                let mut array = Vec::with_capacity(cardinality);
                for &(start, end) in spans {
                    array.extend((start..end).map(|value| value as u16));
                }

                Container::Array(ArrayContainer::from_vec(array))
            },
            ContainerKind::Bitset => {
                Container::Bitset(BitsetContainer::from_spans(spans.iter().copied()))
            },
            ContainerKind::Run => {
                Container::Run(spans.iter().copied().collect())
            }
        }
    }

    #[inline]
    pub fn as_ref(&self) -> ContainerRef<'_> {
        match self {
            Container::Array(c) => ContainerRef::Array(c.as_ref()),
            Container::Bitset(c) => ContainerRef::Bitset(c.as_ref()),
            Container::Run(c) => ContainerRef::Run(c.as_ref())
        }
    }

    #[inline]
    pub fn kind(&self) -> ContainerKind {
        self.as_ref().kind()
    }

    /// Get the cardinality of the container
    #[inline]
    pub fn cardinality(&self) -> usize {
        match self {
            Container::Array(c) => c.cardinality(),
            Container::Bitset(c) => c.cardinality(),
            Container::Run(c) => c.cardinality()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.as_ref().contains(value)
    }

    /// Shrink the container it fit it's content
    pub fn shrink_to_fit(&mut self) {
        match self {
            Container::Array(c) => c.shrink_to_fit(),
            Container::Bitset(_c) => (),            // Bitsets are fixed in size
            Container::Run(c) => c.shrink_to_fit()
        }
    }

    /// Add a value to the underlying container
    pub fn add(&mut self, value: u16) {
        match self {
            Container::Array(c) => {
                if c.cardinality() < DEFAULT_MAX_SIZE {
                    c.add(value);
                }
                else if !c.as_ref().contains(value) {
                    let mut bitset = BitsetContainer::from_values(c.as_ref().iter());
                    bitset.add(value);

                    *self = Container::Bitset(bitset);
                }
            },
            Container::Bitset(c) => {
                c.add(value);
            },
            Container::Run(c) => {
                c.add(value);
            }
        }
    }

    /// Remove a value from the underlying container
    pub fn remove(&mut self, value: u16) {
        match self {
            Container::Array(c) => {
                c.remove(value);
            },
            Container::Bitset(c) => {
                if c.remove(value) && c.cardinality() <= DEFAULT_MAX_SIZE {
                    *self = Container::from_bitset(std::mem::take(c));
                }
            },
            Container::Run(c) => {
                c.remove(value);
            }
        }
    }

    /// Add all values in `[start, end)`
    pub fn add_range(&mut self, start: u32, end: u32) {
        match self {
            Container::Array(c) => c.add_range(start, end),
            Container::Bitset(c) => c.set_range(start, end),
            Container::Run(c) => c.add_range(start, end)
        }

        self.normalize();
    }

    /// Remove all values in `[start, end)`
    pub fn remove_range(&mut self, start: u32, end: u32) {
        match self {
            Container::Array(c) => c.remove_range(start, end),
            Container::Bitset(c) => c.unset_range(start, end),
            Container::Run(c) => c.remove_range(start, end)
        }

        self.normalize();
    }

    /// Restore the array/bitset size invariant after a mutation. Run containers are left as they are
    pub(crate) fn normalize(&mut self) {
        match self {
            Container::Array(c) if c.cardinality() > DEFAULT_MAX_SIZE => {
                *self = Container::Bitset(BitsetContainer::from_values(c.as_ref().iter()));
            },
            Container::Bitset(c) if c.cardinality() <= DEFAULT_MAX_SIZE => {
                *self = Container::from_bitset(std::mem::take(c));
            },
            _ => ()
        }
    }

    /// Convert to a run container if it is strictly smaller, and away from one if it isn't.
    /// Returns true if the container is a run container afterwards
    pub fn run_optimize(&mut self) -> bool {
        let current = self.kind();
        let best = {
            let view = self.as_ref();
            ContainerKind::best(view.cardinality(), view.num_runs())
        };

        if best != current {
            trace!(from = ?current, to = ?best, cardinality = self.cardinality(), "converting container");

            *self = self.as_ref().convert(best);
        }

        best == ContainerKind::Run
    }

    /// Convert a run container back to an array or bitset. Returns true if the container changed
    pub fn remove_run_compression(&mut self) -> bool {
        if self.kind() != ContainerKind::Run {
            return false;
        }

        let kind = if self.cardinality() <= DEFAULT_MAX_SIZE {
            ContainerKind::Array
        }
        else {
            ContainerKind::Bitset
        };

        *self = self.as_ref().convert(kind);

        true
    }

    /// Union `other` into `self`
    pub fn inplace_or(&mut self, other: &ContainerRef<'_>) {
        let handled = match (&mut *self, other) {
            (Container::Bitset(a), ContainerRef::Array(b)) => {
                a.set_list(b.iter());
                true
            },
            (Container::Bitset(a), ContainerRef::Bitset(b)) => {
                a.combine(b.words(), |x, y| x | y);
                true
            },
            _ => false
        };

        if !handled {
            *self = self.as_ref().or(other);
        }
    }

    /// Intersect `self` with `other`
    pub fn inplace_and(&mut self, other: &ContainerRef<'_>) {
        let handled = match (&mut *self, other) {
            (Container::Array(a), ContainerRef::Array(b)) => {
                a.retain(|value| b.contains(*value));
                true
            },
            (Container::Array(a), ContainerRef::Bitset(b)) => {
                a.retain(|value| b.contains(*value));
                true
            },
            (Container::Bitset(a), ContainerRef::Bitset(b)) => {
                a.combine(b.words(), |x, y| x & y);
                true
            },
            _ => false
        };

        if handled {
            self.normalize();
        }
        else {
            *self = self.as_ref().and(other);
        }
    }

    /// Remove the values of `other` from `self`
    pub fn inplace_and_not(&mut self, other: &ContainerRef<'_>) {
        let handled = match (&mut *self, other) {
            (Container::Array(a), ContainerRef::Array(b)) => {
                a.retain(|value| !b.contains(*value));
                true
            },
            (Container::Array(a), ContainerRef::Bitset(b)) => {
                a.retain(|value| !b.contains(*value));
                true
            },
            (Container::Bitset(a), ContainerRef::Array(b)) => {
                a.clear_list(b.iter());
                true
            },
            (Container::Bitset(a), ContainerRef::Bitset(b)) => {
                a.combine(b.words(), |x, y| x & !y);
                true
            },
            _ => false
        };

        if handled {
            self.normalize();
        }
        else {
            *self = self.as_ref().and_not(other);
        }
    }

    /// Symmetric difference of `self` and `other`, stored in `self`
    pub fn inplace_xor(&mut self, other: &ContainerRef<'_>) {
        let handled = match (&mut *self, other) {
            (Container::Bitset(a), ContainerRef::Array(b)) => {
                a.flip_list(b.iter());
                true
            },
            (Container::Bitset(a), ContainerRef::Bitset(b)) => {
                a.combine(b.words(), |x, y| x ^ y);
                true
            },
            _ => false
        };

        if handled {
            self.normalize();
        }
        else {
            *self = self.as_ref().xor(other);
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl Eq for Container { }

impl Hash for Container {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ref().hash(state);
    }
}

/// A borrowed container of any type. The values either live in an owned container
/// or are read in place from a serialized buffer
#[derive(Clone, Copy, Debug)]
pub enum ContainerRef<'a> {
    Array(ArrayRef<'a>),
    Bitset(BitsetRef<'a>),
    Run(RunRef<'a>)
}

impl<'a> ContainerRef<'a> {
    #[inline]
    pub fn kind(&self) -> ContainerKind {
        match self {
            ContainerRef::Array(_) => ContainerKind::Array,
            ContainerRef::Bitset(_) => ContainerKind::Bitset,
            ContainerRef::Run(_) => ContainerKind::Run
        }
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        match self {
            ContainerRef::Array(c) => c.cardinality(),
            ContainerRef::Bitset(c) => c.cardinality(),
            ContainerRef::Run(c) => c.cardinality()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cardinality() == 1 << 16
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        match self {
            ContainerRef::Array(c) => c.contains(value),
            ContainerRef::Bitset(c) => c.contains(value),
            ContainerRef::Run(c) => c.contains(value)
        }
    }

    /// Check if all values in `[start, end)` are present
    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        match self {
            ContainerRef::Array(c) => c.contains_range(start, end),
            ContainerRef::Bitset(c) => c.contains_range(start, end),
            ContainerRef::Run(c) => c.contains_range(start, end)
        }
    }

    pub fn min(&self) -> Option<u16> {
        match self {
            ContainerRef::Array(c) => c.min(),
            ContainerRef::Bitset(c) => c.min(),
            ContainerRef::Run(c) => c.min()
        }
    }

    pub fn max(&self) -> Option<u16> {
        match self {
            ContainerRef::Array(c) => c.max(),
            ContainerRef::Bitset(c) => c.max(),
            ContainerRef::Run(c) => c.max()
        }
    }

    /// Find the number of values smaller or equal to `value`
    pub fn rank(&self, value: u16) -> usize {
        match self {
            ContainerRef::Array(c) => c.rank(value),
            ContainerRef::Bitset(c) => c.rank(value),
            ContainerRef::Run(c) => c.rank(value)
        }
    }

    /// Find the value with `rank` smaller values in the container
    pub fn select(&self, rank: usize) -> Option<u16> {
        match self {
            ContainerRef::Array(c) => c.select(rank),
            ContainerRef::Bitset(c) => c.select(rank),
            ContainerRef::Run(c) => c.select(rank)
        }
    }

    /// Number of runs of consecutive values
    pub fn num_runs(&self) -> usize {
        match self {
            ContainerRef::Array(c) => c.num_runs(),
            ContainerRef::Bitset(c) => c.num_runs(),
            ContainerRef::Run(c) => c.num_runs()
        }
    }

    pub fn iter(&self) -> ContainerIter<'a> {
        match self {
            ContainerRef::Array(c) => ContainerIter::Array(c.iter()),
            ContainerRef::Bitset(c) => ContainerIter::Bitset(c.iter()),
            ContainerRef::Run(c) => ContainerIter::Run(c.iter())
        }
    }

    /// Iterate over the maximal spans of consecutive values as half open ranges
    pub fn spans(&self) -> SpanIter<'a> {
        match self {
            ContainerRef::Array(c) => SpanIter::Array(c.spans()),
            ContainerRef::Bitset(c) => SpanIter::Bitset(c.spans()),
            ContainerRef::Run(c) => SpanIter::Run(c.spans())
        }
    }

    /// Size in bytes of the container body in the serialized format
    pub fn serialized_size(&self) -> usize {
        self.kind().serialized_size(self.cardinality(), self.num_runs_stored())
    }

    /// Number of runs as stored, without joining adjacent ones
    #[inline]
    fn num_runs_stored(&self) -> usize {
        match self {
            ContainerRef::Run(c) => c.runs().len(),
            _ => 0
        }
    }

    /// Write the container body in the serialized format
    pub fn serialize<W: Write>(&self, buf: &mut W) -> io::Result<usize> {
        match self {
            ContainerRef::Array(c) => c.values().write_le(buf),
            ContainerRef::Bitset(c) => c.words().write_le(buf),
            ContainerRef::Run(c) => {
                let runs = c.runs();
                buf.write_all(&(runs.len() as u16).to_le_bytes())?;

                Ok(2 + runs.write_le(buf)?)
            }
        }
    }

    /// Deep copy into an owned container with the same representation. A bitset whose recounted
    /// cardinality fits an array becomes one
    pub fn to_owned(&self) -> Container {
        match self {
            ContainerRef::Array(c) => Container::Array(c.to_owned()),
            ContainerRef::Bitset(c) => Container::from_bitset(c.to_owned()),
            ContainerRef::Run(c) => Container::Run(c.to_owned())
        }
    }

    /// Copy the values into an owned container of the given kind
    pub fn convert(&self, kind: ContainerKind) -> Container {
        match kind {
            ContainerKind::Array => Container::Array(ArrayContainer::from_vec(self.iter().collect())),
            ContainerKind::Bitset => {
                match self {
                    ContainerRef::Bitset(c) => Container::Bitset(c.to_owned()),
                    _ => Container::Bitset(BitsetContainer::from_spans(self.spans()))
                }
            },
            ContainerKind::Run => Container::Run(self.spans().collect())
        }
    }

    /// Or this container with `other` (union)
    pub fn or(&self, other: &ContainerRef<'_>) -> Container {
        match (*self, *other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => {
                Container::from_sorted(array_ops::or(a.values(), b.values()))
            },
            (ContainerRef::Array(a), ContainerRef::Bitset(b)) |
            (ContainerRef::Bitset(b), ContainerRef::Array(a)) => {
                let mut out = b.to_owned();
                out.set_list(a.iter());

                Container::from_bitset(out)
            },
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => {
                Container::from_bitset(bitset_ops::or(a.words(), b.words()))
            },
            (ContainerRef::Run(r), _) |
            (_, ContainerRef::Run(r)) if r.is_full() => {
                Container::Run(RunContainer::full())
            },
            (ContainerRef::Run(_), _) |
            (_, ContainerRef::Run(_)) => {
                Container::from_spans(&run_ops::sweep(self.spans(), other.spans(), |x, y| x || y))
            }
        }
    }

    /// And this container with `other` (intersect)
    pub fn and(&self, other: &ContainerRef<'_>) -> Container {
        match (*self, *other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => {
                Container::Array(ArrayContainer::from_vec(array_ops::and(a.values(), b.values())))
            },
            (ContainerRef::Array(a), ContainerRef::Bitset(b)) |
            (ContainerRef::Bitset(b), ContainerRef::Array(a)) => {
                let values = a.iter()
                    .filter(|value| b.contains(*value))
                    .collect();

                Container::Array(ArrayContainer::from_vec(values))
            },
            (ContainerRef::Array(a), ContainerRef::Run(r)) |
            (ContainerRef::Run(r), ContainerRef::Array(a)) => {
                let values = a.iter()
                    .filter(|value| r.contains(*value))
                    .collect();

                Container::Array(ArrayContainer::from_vec(values)).into_smallest()
            },
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => {
                Container::from_bitset(bitset_ops::and(a.words(), b.words()))
            },
            (ContainerRef::Bitset(_), ContainerRef::Run(_)) |
            (ContainerRef::Run(_), ContainerRef::Bitset(_)) |
            (ContainerRef::Run(_), ContainerRef::Run(_)) => {
                Container::from_spans(&run_ops::sweep(self.spans(), other.spans(), |x, y| x && y))
            }
        }
    }

    /// And not this container with `other` (difference)
    pub fn and_not(&self, other: &ContainerRef<'_>) -> Container {
        match (*self, *other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => {
                Container::Array(ArrayContainer::from_vec(array_ops::and_not(a.values(), b.values())))
            },
            (ContainerRef::Array(a), ContainerRef::Bitset(b)) => {
                let values = a.iter()
                    .filter(|value| !b.contains(*value))
                    .collect();

                Container::Array(ArrayContainer::from_vec(values))
            },
            (ContainerRef::Array(a), ContainerRef::Run(r)) => {
                let values = a.iter()
                    .filter(|value| !r.contains(*value))
                    .collect();

                Container::Array(ArrayContainer::from_vec(values)).into_smallest()
            },
            (ContainerRef::Bitset(a), ContainerRef::Array(b)) => {
                let mut out = a.to_owned();
                out.clear_list(b.iter());

                Container::from_bitset(out)
            },
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => {
                Container::from_bitset(bitset_ops::and_not(a.words(), b.words()))
            },
            (ContainerRef::Bitset(_), ContainerRef::Run(_)) |
            (ContainerRef::Run(_), _) => {
                Container::from_spans(&run_ops::sweep(self.spans(), other.spans(), |x, y| x && !y))
            }
        }
    }

    /// Xor this container with `other` (symmetric difference)
    pub fn xor(&self, other: &ContainerRef<'_>) -> Container {
        match (*self, *other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => {
                Container::from_sorted(array_ops::xor(a.values(), b.values()))
            },
            (ContainerRef::Array(a), ContainerRef::Bitset(b)) |
            (ContainerRef::Bitset(b), ContainerRef::Array(a)) => {
                let mut out = b.to_owned();
                out.flip_list(a.iter());

                Container::from_bitset(out)
            },
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => {
                Container::from_bitset(bitset_ops::xor(a.words(), b.words()))
            },
            (ContainerRef::Run(_), _) |
            (_, ContainerRef::Run(_)) => {
                Container::from_spans(&run_ops::sweep(self.spans(), other.spans(), |x, y| x != y))
            }
        }
    }

    /// Number of values shared with `other`
    pub fn and_cardinality(&self, other: &ContainerRef<'_>) -> usize {
        match (*self, *other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => {
                array_ops::and_cardinality(a.values(), b.values())
            },
            (ContainerRef::Array(a), ContainerRef::Bitset(b)) |
            (ContainerRef::Bitset(b), ContainerRef::Array(a)) => {
                a.iter().filter(|value| b.contains(*value)).count()
            },
            (ContainerRef::Array(a), ContainerRef::Run(r)) |
            (ContainerRef::Run(r), ContainerRef::Array(a)) => {
                a.iter().filter(|value| r.contains(*value)).count()
            },
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => {
                bitset_ops::and_cardinality(a.words(), b.words())
            },
            (ContainerRef::Bitset(_), ContainerRef::Run(_)) |
            (ContainerRef::Run(_), ContainerRef::Bitset(_)) |
            (ContainerRef::Run(_), ContainerRef::Run(_)) => {
                run_ops::cardinality(&run_ops::sweep(self.spans(), other.spans(), |x, y| x && y))
            }
        }
    }

    /// Check if every value of `self` is in `other`
    pub fn is_subset(&self, other: &ContainerRef<'_>) -> bool {
        let cardinality = self.cardinality();

        cardinality <= other.cardinality() && self.and_cardinality(other) == cardinality
    }

    /// Complement the values in `[start, end)`, leaving everything outside the range untouched
    pub fn flip(&self, start: u32, end: u32) -> Container {
        if start >= end {
            return self.to_owned();
        }

        match self {
            ContainerRef::Array(a) => {
                let values = a.values();
                let lo = values.partition_point(|value| u32::from(value) < start);
                let hi = values.partition_point(|value| u32::from(value) < end);

                let inside = hi - lo;
                let cardinality = a.cardinality() - inside + ((end - start) as usize - inside);

                if cardinality > DEFAULT_MAX_SIZE {
                    let mut bitset = BitsetContainer::from_values(a.iter());
                    bitset.flip_range(start, end);

                    return Container::Bitset(bitset);
                }

                let mut out = Vec::with_capacity(cardinality);
                out.extend(a.iter().take(lo));

                // Fill the gaps between the values inside the range
                let mut next = start;
                for index in lo..hi {
                    let value = u32::from(values.get(index));
                    out.extend((next..value).map(|v| v as u16));
                    next = value + 1;
                }

                out.extend((next..end).map(|v| v as u16));
                out.extend(a.iter().skip(hi));

                Container::Array(ArrayContainer::from_vec(out))
            },
            ContainerRef::Bitset(b) => {
                let mut out = b.to_owned();
                out.flip_range(start, end);

                Container::from_bitset(out)
            },
            ContainerRef::Run(_) => {
                let spans = run_ops::sweep(self.spans(), Some((start, end)), |x, y| x != y);

                Container::from_spans(&spans)
            }
        }
    }
}

impl Container {
    /// Convert to whichever of array, bitset or run is the most compact for the values held
    pub(crate) fn into_smallest(self) -> Self {
        let best = {
            let view = self.as_ref();
            ContainerKind::best(view.cardinality(), view.num_runs())
        };

        if best == self.kind() {
            self
        }
        else {
            self.as_ref().convert(best)
        }
    }
}

impl<'a, 'b> PartialEq<ContainerRef<'b>> for ContainerRef<'a> {
    fn eq(&self, other: &ContainerRef<'b>) -> bool {
        if self.cardinality() != other.cardinality() {
            return false;
        }

        match (self, other) {
            (ContainerRef::Array(a), ContainerRef::Array(b)) => a.values() == b.values(),
            (ContainerRef::Bitset(a), ContainerRef::Bitset(b)) => a.words() == b.words(),
            _ => self.spans().eq(other.spans())
        }
    }
}

impl<'a> Eq for ContainerRef<'a> { }

impl<'a> Hash for ContainerRef<'a> {
    /// Hashes the canonical run decomposition so equal containers hash equally in any representation
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (start, end) in self.spans() {
            state.write_u32(start);
            state.write_u32(end);
        }
    }
}

impl<'a> From<RunRef<'a>> for ContainerRef<'a> {
    fn from(container: RunRef<'a>) -> Self {
        ContainerRef::Run(container)
    }
}

impl<'a> From<ArrayRef<'a>> for ContainerRef<'a> {
    fn from(container: ArrayRef<'a>) -> Self {
        ContainerRef::Array(container)
    }
}

impl<'a> From<BitsetRef<'a>> for ContainerRef<'a> {
    fn from(container: BitsetRef<'a>) -> Self {
        ContainerRef::Bitset(container)
    }
}

/// An iterator over the values of a container
#[derive(Clone, Debug)]
pub enum ContainerIter<'a> {
    Array(PackedIter<'a, u16>),
    Bitset(BitsetIter<'a>),
    Run(RunIter<'a>)
}

impl<'a> Iterator for ContainerIter<'a> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(iter) => iter.next(),
            ContainerIter::Bitset(iter) => iter.next(),
            ContainerIter::Run(iter) => iter.next()
        }
    }
}

/// An iterator over the maximal spans of a container
#[derive(Clone, Debug)]
pub enum SpanIter<'a> {
    Array(ArraySpans<'a>),
    Bitset(BitsetSpans<'a>),
    Run(RunSpans<'a>)
}

impl<'a> Iterator for SpanIter<'a> {
    type Item = (u32, u32);

    #[inline]
    fn next(&mut self) -> Option<(u32, u32)> {
        match self {
            SpanIter::Array(iter) => iter.next(),
            SpanIter::Bitset(iter) => iter.next(),
            SpanIter::Run(iter) => iter.next()
        }
    }
}

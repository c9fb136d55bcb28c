use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::container::{ContainerKind, ContainerRef, BITSET_SIZE_IN_WORDS};
use crate::error::DeserializeError;
use crate::serialization::{body_ref, validate_body, validate_runs, Header, NO_OFFSET_THRESHOLD};
use crate::utils::{read_u16, Packed};
use crate::ImmutableBitmap;

/// Size of a serialized bitset body
const BITSET_BYTES: usize = BITSET_SIZE_IN_WORDS * 8;

/// A read only roaring bitmap that reads a serialized bitmap in place.
///
/// Construction validates the header, the body offsets and extents, and the runs of run containers.
/// Container bodies are never copied, every query reads the buffer through unaligned little endian
/// accesses, so the buffer may come from anywhere, including a memory mapped file.
///
/// The view borrows the buffer for its whole lifetime. When the buffer is a memory map the caller must
/// keep the underlying file unmodified for as long as the view is alive.
///
/// # Remarks
/// Array ordering and bitset populations are trusted. Use
/// [`RoaringBitmap::deserialize_from_slice`](crate::RoaringBitmap::deserialize_from_slice) to fully
/// validate untrusted input
#[derive(Clone, Copy)]
pub struct RoaringView<'a> {
    /// The buffer, starting at the cookie
    data: &'a [u8],

    /// The parsed header
    header: Header<'a>,

    /// Body positions for headers without an offset section
    positions: [usize; NO_OFFSET_THRESHOLD],

    /// Number of bytes covered by the bitmap
    size: usize
}

impl<'a> RoaringView<'a> {
    /// Create a view over the serialized bitmap at the start of `data`. Trailing bytes are ignored
    pub fn new(data: &'a [u8]) -> Result<Self, DeserializeError> {
        debug!(bytes = data.len(), "reading bitmap view");

        Self::parse(data).map_err(|err| {
            debug!(error = %err, "rejected serialized bitmap");
            err
        })
    }

    fn parse(data: &'a [u8]) -> Result<Self, DeserializeError> {
        let header = Header::parse(data)?;
        let mut positions = [0; NO_OFFSET_THRESHOLD];
        let mut position = header.size;

        for index in 0..header.count {
            header.check_offset(index, position)?;

            if index < NO_OFFSET_THRESHOLD {
                positions[index] = position;
            }

            let cardinality = header.cardinality(index);
            let len = match header.kind(index) {
                ContainerKind::Array => 2 * cardinality,
                ContainerKind::Bitset => BITSET_BYTES,
                ContainerKind::Run => {
                    extent(data, position + 2)?;

                    let end = position + 2 + 4 * read_u16(data, position) as usize;
                    extent(data, end)?;

                    let runs = Packed::Le(&data[(position + 2)..end]);
                    validate_runs(header.key(index), runs, cardinality)?;

                    end - position
                }
            };

            extent(data, position + len)?;
            position += len;
        }

        Ok(Self {
            data,
            header,
            positions,
            size: position
        })
    }

    /// The bytes covered by the bitmap
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.data[..self.size]
    }

    /// Check array ordering and bitset populations of every container
    pub(crate) fn validate_bodies(&self) -> Result<(), DeserializeError> {
        for index in 0..self.header.count {
            validate_body(self.header.key(index), &self.container(index))?;
        }

        Ok(())
    }

    /// Body position of the container at `index`
    #[inline]
    fn position(&self, index: usize) -> usize {
        self.header.offset(index)
            .map_or_else(|| self.positions[index], |offset| offset as usize)
    }

    /// Borrow the container at `index` for the lifetime of the buffer
    fn container(&self, index: usize) -> ContainerRef<'a> {
        let position = self.position(index);
        let cardinality = self.header.cardinality(index);
        let kind = self.header.kind(index);

        let body = match kind {
            ContainerKind::Array => &self.data[position..(position + 2 * cardinality)],
            ContainerKind::Bitset => &self.data[position..(position + BITSET_BYTES)],
            ContainerKind::Run => {
                let runs = read_u16(self.data, position) as usize;
                &self.data[(position + 2)..(position + 2 + 4 * runs)]
            }
        };

        body_ref(kind, cardinality, body)
    }
}

/// Check that the buffer holds at least `needed` bytes
#[inline]
fn extent(data: &[u8], needed: usize) -> Result<(), DeserializeError> {
    if data.len() < needed {
        Err(DeserializeError::UnexpectedEof { needed, available: data.len() })
    }
    else {
        Ok(())
    }
}

impl<'a> ImmutableBitmap for RoaringView<'a> {
    #[inline]
    fn container_count(&self) -> usize {
        self.header.count
    }

    #[inline]
    fn key_at(&self, index: usize) -> u16 {
        self.header.key(index)
    }

    #[inline]
    fn container_at(&self, index: usize) -> ContainerRef<'_> {
        self.container(index)
    }

    /// The covered bytes. The next bitmap of a sequence starts right after them
    #[inline]
    fn encoded_bytes(&self) -> Option<&[u8]> {
        Some(self.as_bytes())
    }
}

impl<'a, B: ImmutableBitmap> PartialEq<B> for RoaringView<'a> {
    fn eq(&self, other: &B) -> bool {
        self.bitmap_eq(other)
    }
}

impl<'a> Eq for RoaringView<'a> { }

impl<'a> Hash for RoaringView<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_contents(state);
    }
}

impl<'a> fmt::Debug for RoaringView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        crate::roaring::debug_bitmap("RoaringView", self, f)
    }
}

impl<'a, 'b> IntoIterator for &'b RoaringView<'a> {
    type Item = u32;
    type IntoIter = crate::Iter<'b, RoaringView<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use std::collections::hash_map::DefaultHasher;

    use super::*;
    use crate::test::{generate_seeded_data, op_test, OpType};
    use crate::RoaringBitmap;

    fn sample() -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::from_slice(&generate_seeded_data(0..3_000_000, 300_000, 11));
        bitmap.add_range(10_000_000..10_300_000);
        bitmap.add_slice(&generate_seeded_data(20_000_000..40_000_000, 2_000, 12));
        bitmap.run_optimize();

        bitmap
    }

    fn bytes_of(bitmap: &RoaringBitmap) -> Vec<u8> {
        let mut bytes = Vec::new();
        bitmap.serialize(&mut bytes).unwrap();

        bytes
    }

    fn hash<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);

        hasher.finish()
    }

    /// Views borrow, so the shim keeps the serialized bytes alive for the duration of the test
    struct ViewShim(Vec<u8>);

    impl crate::test::TestShim<u32> for ViewShim {
        fn from_data(data: &[u32]) -> Self {
            ViewShim(bytes_of(&RoaringBitmap::from_slice(data)))
        }

        fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = u32> + 'a> {
            Box::new(RoaringView::new(&self.0).unwrap().to_vec().into_iter())
        }

        fn card(&self) -> usize {
            RoaringView::new(&self.0).unwrap().cardinality() as usize
        }
    }

    #[test]
    fn queries_match_owned() {
        let bitmap = sample();
        let bytes = bytes_of(&bitmap);
        let view = RoaringView::new(&bytes).unwrap();

        assert_eq!(view.container_count(), bitmap.container_count());
        assert_eq!(view.cardinality(), bitmap.cardinality());
        assert_eq!(view.min(), bitmap.min());
        assert_eq!(view.max(), bitmap.max());
        assert_eq!(view.to_vec(), bitmap.to_vec());
        assert!(view.iter().eq(bitmap.iter()));

        for value in (0..45_000_000).step_by(997) {
            assert_eq!(view.contains(value), bitmap.contains(value));
            assert_eq!(view.rank(value), bitmap.rank(value));
        }

        for rank in (0..bitmap.cardinality()).step_by(1013) {
            assert_eq!(view.select(rank), bitmap.select(rank));
        }

        assert!(view.contains_range(10_000_000..10_300_000));
        assert_eq!(view.statistics(), bitmap.statistics());
    }

    #[test]
    fn equality_and_hash() {
        let bitmap = sample();
        let bytes = bytes_of(&bitmap);
        let view = RoaringView::new(&bytes).unwrap();

        assert_eq!(view, bitmap);
        assert_eq!(bitmap, view);
        assert_eq!(hash(&view), hash(&bitmap));
        assert_eq!(view.to_bitmap(), bitmap);
    }

    #[test]
    fn or() {
        op_test::<ViewShim, RoaringBitmap, _, RoaringBitmap>(
            OpType::Or, |a, b| RoaringView::new(&a.0).unwrap().or(&b)
        );
    }

    #[test]
    fn and() {
        op_test::<RoaringBitmap, ViewShim, _, RoaringBitmap>(
            OpType::And, |a, b| a.and(&RoaringView::new(&b.0).unwrap())
        );
    }

    #[test]
    fn and_not() {
        op_test::<ViewShim, ViewShim, _, RoaringBitmap>(
            OpType::AndNot, |a, b| RoaringView::new(&a.0).unwrap().and_not(&RoaringView::new(&b.0).unwrap())
        );
    }

    #[test]
    fn xor() {
        op_test::<RoaringBitmap, ViewShim, _, RoaringBitmap>(
            OpType::Xor, |mut a, b| { a.inplace_xor(&RoaringView::new(&b.0).unwrap()); a }
        );
    }

    #[test]
    fn trailing_bytes_and_sequences() {
        let first = sample();
        let second = RoaringBitmap::from_slice(&[1, 2, 3, 1 << 31]);

        let mut bytes = bytes_of(&first);
        bytes.extend(bytes_of(&second));
        bytes.extend_from_slice(&[0xFF; 7]);

        let a = RoaringView::new(&bytes).unwrap();
        assert_eq!(a.serialized_size(), first.serialized_size());
        assert_eq!(a, first);

        let b = RoaringView::new(&bytes[a.serialized_size()..]).unwrap();
        assert_eq!(b, second);
        assert_eq!(a.serialized_size() + b.serialized_size(), bytes.len() - 7);
    }

    #[test]
    fn unaligned_buffer() {
        let bitmap = sample();
        let mut bytes = vec![0];
        bytes.extend(bytes_of(&bitmap));

        let view = RoaringView::new(&bytes[1..]).unwrap();
        assert_eq!(view, bitmap);
    }

    #[test]
    fn serialize_copies_bytes() {
        let bitmap = sample();
        let bytes = bytes_of(&bitmap);
        let view = RoaringView::new(&bytes).unwrap();

        let mut out = Vec::new();
        assert_eq!(view.serialize(&mut out).unwrap(), bytes.len());
        assert_eq!(out, bytes);
        assert_eq!(crate::serialization::serialized_size(&view), bytes.len());
    }

    #[test]
    fn deep_copy_recounts_bitsets() {
        let bitmap: RoaringBitmap = (0..5000u32).map(|value| value * 2).collect();
        let mut bytes = bytes_of(&bitmap);

        // Claim 4500 values for the bitset
        bytes[10..12].copy_from_slice(&4499u16.to_le_bytes());

        let view = RoaringView::new(&bytes).unwrap();
        let owned = view.to_bitmap();

        assert_eq!(owned.cardinality(), 5000);
        assert_eq!(owned.to_vec(), bitmap.to_vec());
        assert_eq!(owned.flip(0..10_000).cardinality(), 5000);
        assert!(RoaringBitmap::deserialize_from_slice(&bytes).is_err());

        // A bitset body without any bits set copies to nothing
        for byte in bytes[16..16 + BITSET_BYTES].iter_mut() {
            *byte = 0;
        }

        let owned = RoaringView::new(&bytes).unwrap().to_bitmap();
        assert!(owned.is_empty());
        assert_eq!(owned.container_count(), 0);
    }

    #[test]
    fn references_serialize_like_the_view() {
        // A run cookie although none of the containers is a run container
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&crate::SERIAL_COOKIE.to_le_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        for value in [1u16, 2, 3].iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let view = RoaringView::new(&bytes).unwrap();
        assert_eq!(view.serialized_size(), 15);
        assert_eq!(view.to_bitmap().serialized_size(), 22);

        fn size_of<B: ImmutableBitmap>(bitmap: B) -> usize {
            bitmap.serialized_size()
        }

        fn bytes_from<B: ImmutableBitmap>(bitmap: B) -> Vec<u8> {
            let mut out = Vec::new();
            bitmap.serialize(&mut out).unwrap();

            out
        }

        assert_eq!(size_of(&view), 15);
        assert_eq!(size_of(&&view), 15);
        assert_eq!(bytes_from(&view), bytes);

        let shared: &dyn ImmutableBitmap = &view;
        assert_eq!(shared.serialized_size(), 15);
        assert_eq!(size_of(shared), 15);
    }

    #[test]
    fn empty() {
        let bytes = bytes_of(&RoaringBitmap::new());
        let view = RoaringView::new(&bytes).unwrap();

        assert!(view.is_empty());
        assert_eq!(view.min(), None);
        assert_eq!(view.iter().next(), None);
        assert_eq!(view.serialized_size(), 8);
        assert_eq!(format!("{:?}", view), "RoaringView<0 values>[]");
    }

    #[test]
    fn truncated_body() {
        let bitmap = sample();
        let bytes = bytes_of(&bitmap);

        match RoaringView::new(&bytes[..bytes.len() - 1]) {
            Err(DeserializeError::UnexpectedEof { needed, available }) => {
                assert_eq!(needed, bytes.len());
                assert_eq!(available, bytes.len() - 1);
            },
            other => panic!("unexpected result {:?}", other)
        }
    }
}

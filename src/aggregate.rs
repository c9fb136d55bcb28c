//! Set operations over any number of bitmaps, optionally restricted to a range of values.
//!
//! Operands are anything that implements [`ImmutableBitmap`]: owned bitmaps, views, references to
//! either, or trait objects, freely mixed.
//!
//! ```
//! use mapped_roaring::{aggregate, ImmutableBitmap, RoaringBitmap};
//!
//! let a = RoaringBitmap::from_range(200_000..400_000);
//! let b = RoaringBitmap::from_range(300_000..500_000);
//!
//! let result = aggregate::and_not_range(&a, &b, 250_000, 450_000).unwrap();
//! assert_eq!(result.cardinality(), 50_000);
//! ```

use std::convert::TryFrom;

use crate::error::RangeError;
use crate::immutable::ImmutableBitmap;
use crate::container::ContainerRef;
use crate::RoaringBitmap;

/// End of the 32 bit domain
const DOMAIN_END: i64 = 1 << 32;

/// Intersect all bitmaps. An empty input yields an empty bitmap
pub fn and<I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    let mut bitmaps = bitmaps.into_iter();
    let mut result = match bitmaps.next() {
        Some(first) => first.to_bitmap(),
        None => return RoaringBitmap::new()
    };

    for bitmap in bitmaps {
        if result.is_empty() {
            break;
        }

        result.inplace_and(&bitmap);
    }

    result
}

/// Union of all bitmaps
pub fn or<I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    let mut result = RoaringBitmap::new();
    for bitmap in bitmaps {
        result.inplace_or(&bitmap);
    }

    result
}

/// Values contained in an odd number of the bitmaps
pub fn xor<I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    let mut result = RoaringBitmap::new();
    for bitmap in bitmaps {
        result.inplace_xor(&bitmap);
    }

    result
}

/// Intersect all bitmaps within `[start, end)`
pub fn and_range<I>(bitmaps: I, start: u64, end: u64) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, wide(start), wide(end), |windows| and(windows))
}

/// Union of all bitmaps within `[start, end)`
pub fn or_range<I>(bitmaps: I, start: u64, end: u64) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, wide(start), wide(end), |windows| or(windows))
}

/// Symmetric difference of all bitmaps within `[start, end)`
pub fn xor_range<I>(bitmaps: I, start: u64, end: u64) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, wide(start), wide(end), |windows| xor(windows))
}

/// Values of `a` that are not in `b`, within `[start, end)`
pub fn and_not_range<A, B>(a: A, b: B, start: u64, end: u64) -> Result<RoaringBitmap, RangeError>
    where A: ImmutableBitmap,
          B: ImmutableBitmap
{
    and_not_span(a, b, wide(start), wide(end))
}

/// [`and_range`] with signed bounds. Negative bounds are outside of the domain
pub fn and_range_i32<I>(bitmaps: I, start: i32, end: i32) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, i64::from(start), i64::from(end), |windows| and(windows))
}

/// [`or_range`] with signed bounds. Negative bounds are outside of the domain
pub fn or_range_i32<I>(bitmaps: I, start: i32, end: i32) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, i64::from(start), i64::from(end), |windows| or(windows))
}

/// [`xor_range`] with signed bounds. Negative bounds are outside of the domain
pub fn xor_range_i32<I>(bitmaps: I, start: i32, end: i32) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap
{
    ranged(bitmaps, i64::from(start), i64::from(end), |windows| xor(windows))
}

/// [`and_not_range`] with signed bounds. Negative bounds are outside of the domain
pub fn and_not_range_i32<A, B>(a: A, b: B, start: i32, end: i32) -> Result<RoaringBitmap, RangeError>
    where A: ImmutableBitmap,
          B: ImmutableBitmap
{
    and_not_span(a, b, i64::from(start), i64::from(end))
}

/// Saturate a wide bound into the signed domain used for validation
#[inline]
fn wide(bound: u64) -> i64 {
    i64::try_from(bound).unwrap_or(i64::MAX)
}

/// Validate `[start, end)`. Inverted and empty ranges yield `None`
fn check_range(start: i64, end: i64) -> Result<Option<(u64, u64)>, RangeError> {
    if end <= start {
        return Ok(None);
    }

    if start < 0 || end > DOMAIN_END {
        return Err(RangeError::OutOfDomain { start, end });
    }

    Ok(Some((start as u64, end as u64)))
}

/// Keys covered by a non empty range
#[inline]
fn key_bounds(start: u64, end: u64) -> (u16, u16) {
    ((start >> 16) as u16, ((end - 1) >> 16) as u16)
}

/// Drop every value outside of `[start, end)`
fn clip(result: &mut RoaringBitmap, start: u64, end: u64) {
    result.remove_span(0, start);
    result.remove_span(end, DOMAIN_END as u64);
}

fn ranged<I, F>(bitmaps: I, start: i64, end: i64, op: F) -> Result<RoaringBitmap, RangeError>
    where I: IntoIterator,
          I::Item: ImmutableBitmap,
          F: FnOnce(Vec<KeyWindow<I::Item>>) -> RoaringBitmap
{
    let (start, end) = match check_range(start, end)? {
        Some(range) => range,
        None => return Ok(RoaringBitmap::new())
    };

    let (first_key, last_key) = key_bounds(start, end);
    let windows = bitmaps.into_iter()
        .map(|bitmap| KeyWindow::new(bitmap, first_key, last_key))
        .collect();

    let mut result = op(windows);
    clip(&mut result, start, end);

    Ok(result)
}

fn and_not_span<A, B>(a: A, b: B, start: i64, end: i64) -> Result<RoaringBitmap, RangeError>
    where A: ImmutableBitmap,
          B: ImmutableBitmap
{
    let (start, end) = match check_range(start, end)? {
        Some(range) => range,
        None => return Ok(RoaringBitmap::new())
    };

    let (first_key, last_key) = key_bounds(start, end);
    let a = KeyWindow::new(a, first_key, last_key);
    let b = KeyWindow::new(b, first_key, last_key);

    let mut result = a.and_not(&b);
    clip(&mut result, start, end);

    Ok(result)
}

/// The containers of a bitmap whose keys fall in `[first_key, last_key]`, without copying
struct KeyWindow<B> {
    bitmap: B,

    /// Index of the first container in the window
    start: usize,

    /// Index one past the last container in the window
    end: usize
}

impl<B: ImmutableBitmap> KeyWindow<B> {
    fn new(bitmap: B, first_key: u16, last_key: u16) -> Self {
        let start = match bitmap.find_key(first_key) {
            Ok(index) | Err(index) => index
        };

        let end = match bitmap.find_key(last_key) {
            Ok(index) => index + 1,
            Err(index) => index
        };

        Self {
            bitmap,
            start,
            end: end.max(start)
        }
    }
}

impl<B: ImmutableBitmap> ImmutableBitmap for KeyWindow<B> {
    #[inline]
    fn container_count(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    fn key_at(&self, index: usize) -> u16 {
        self.bitmap.key_at(self.start + index)
    }

    #[inline]
    fn container_at(&self, index: usize) -> ContainerRef<'_> {
        self.bitmap.container_at(self.start + index)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{compute_result, generate_seeded_data, OpType};
    use crate::RoaringView;

    fn inputs() -> Vec<RoaringBitmap> {
        (0..5)
            .map(|seed| {
                let mut bitmap = RoaringBitmap::from_slice(&generate_seeded_data(0..4_000_000, 400_000, seed));
                bitmap.add_range((seed as u32) * 1_000_000..(seed as u32) * 1_000_000 + 300_000);
                if seed % 2 == 0 {
                    bitmap.run_optimize();
                }

                bitmap
            })
            .collect()
    }

    /// Fold the reference algorithm over all inputs
    fn expected(inputs: &[RoaringBitmap], op: OpType) -> Vec<u32> {
        let mut values = inputs[0].to_vec();
        for bitmap in inputs[1..].iter() {
            values = compute_result(&values, &bitmap.to_vec(), op);
        }

        values
    }

    fn restricted(values: Vec<u32>, start: u32, end: u32) -> Vec<u32> {
        values.into_iter()
            .filter(|value| (start..end).contains(value))
            .collect()
    }

    #[test]
    fn n_ary() {
        let inputs = inputs();

        assert_eq!(and(&inputs).to_vec(), expected(&inputs, OpType::And));
        assert_eq!(or(&inputs).to_vec(), expected(&inputs, OpType::Or));
        assert_eq!(xor(&inputs).to_vec(), expected(&inputs, OpType::Xor));
    }

    #[test]
    fn n_ary_empty_input() {
        let none: Vec<RoaringBitmap> = Vec::new();

        assert!(and(&none).is_empty());
        assert!(or(&none).is_empty());
        assert!(xor(&none).is_empty());
    }

    #[test]
    fn n_ary_mixed_operands() {
        let inputs = inputs();
        let bytes: Vec<Vec<u8>> = inputs.iter()
            .map(|bitmap| {
                let mut bytes = Vec::new();
                bitmap.serialize(&mut bytes).unwrap();
                bytes
            })
            .collect();

        let views: Vec<RoaringView> = bytes.iter()
            .map(|bytes| RoaringView::new(bytes).unwrap())
            .collect();

        let mixed: Vec<&dyn ImmutableBitmap> = vec![&inputs[0], &views[1], &inputs[2], &views[3], &views[4]];

        assert_eq!(or(mixed.iter().copied()), or(&inputs));
        assert_eq!(and(mixed.iter().copied()), and(&inputs));
        assert_eq!(xor(&views), xor(&inputs));
    }

    #[test]
    fn ranged() {
        let inputs = inputs();
        let (start, end) = (1_234_567, 3_456_789);

        let ops: [(OpType, fn(&[RoaringBitmap], u64, u64) -> Result<RoaringBitmap, RangeError>); 3] = [
            (OpType::And, |inputs, start, end| and_range(inputs, start, end)),
            (OpType::Or, |inputs, start, end| or_range(inputs, start, end)),
            (OpType::Xor, |inputs, start, end| xor_range(inputs, start, end))
        ];

        for (op, f) in ops.iter() {
            let found = f(&inputs, start as u64, end as u64).unwrap();

            assert_eq!(found.to_vec(), restricted(expected(&inputs, *op), start, end), "{:?}", op);
        }

        let found = and_not_range(&inputs[0], &inputs[1], start as u64, end as u64).unwrap();
        let reference = compute_result(&inputs[0].to_vec(), &inputs[1].to_vec(), OpType::AndNot);
        assert_eq!(found.to_vec(), restricted(reference, start, end));
    }

    #[test]
    fn ranged_cardinalities() {
        let a = RoaringBitmap::from_range(200_000..400_000);
        let b = RoaringBitmap::from_range(300_000..500_000);

        assert_eq!(and_range(&[&a, &b], 350_000, 450_000).unwrap().cardinality(), 50_000);
        assert_eq!(or_range(&[&a, &b], 250_000, 550_000).unwrap().cardinality(), 250_000);
        assert_eq!(xor_range(&[&a, &b], 250_000, 450_000).unwrap().cardinality(), 100_000);
        assert_eq!(and_not_range(&a, &b, 250_000, 450_000).unwrap().cardinality(), 50_000);
        assert_eq!(and_not_range_i32(&a, &b, 250_000, 450_000).unwrap().cardinality(), 50_000);
    }

    #[test]
    fn empty_ranges() {
        let a = RoaringBitmap::from_range(200_000..400_000);
        let b = RoaringBitmap::from_range(300_000..500_000);

        for &(start, end) in [(300_000, 300_000), (400_000, 100_000), (0, 0)].iter() {
            assert!(and_range(&[&a, &b], start, end).unwrap().is_empty());
            assert!(or_range(&[&a, &b], start, end).unwrap().is_empty());
            assert!(xor_range(&[&a, &b], start, end).unwrap().is_empty());
            assert!(and_not_range(&a, &b, start, end).unwrap().is_empty());

            let (start, end) = (start as i32, end as i32);
            assert!(and_range_i32(&[&a, &b], start, end).unwrap().is_empty());
            assert!(or_range_i32(&[&a, &b], start, end).unwrap().is_empty());
            assert!(xor_range_i32(&[&a, &b], start, end).unwrap().is_empty());
            assert!(and_not_range_i32(&a, &b, start, end).unwrap().is_empty());
        }

        // Inverted ranges stay empty even when a bound is outside of the domain
        assert!(or_range(&[&a], std::u64::MAX, 5).unwrap().is_empty());
        assert!(or_range_i32(&[&a], 5, -5).unwrap().is_empty());
    }

    #[test]
    fn signed_and_wide_forms_agree() {
        let inputs = inputs();

        for &(start, end) in [(0, 100), (65_535, 65_537), (999_999, 2_000_001), (0, std::i32::MAX)].iter() {
            let wide = (start as u64, end as u64);

            assert_eq!(and_range_i32(&inputs, start, end).unwrap(), and_range(&inputs, wide.0, wide.1).unwrap());
            assert_eq!(or_range_i32(&inputs, start, end).unwrap(), or_range(&inputs, wide.0, wide.1).unwrap());
            assert_eq!(xor_range_i32(&inputs, start, end).unwrap(), xor_range(&inputs, wide.0, wide.1).unwrap());
            assert_eq!(
                and_not_range_i32(&inputs[0], &inputs[1], start, end).unwrap(),
                and_not_range(&inputs[0], &inputs[1], wide.0, wide.1).unwrap()
            );
        }
    }

    #[test]
    fn out_of_domain() {
        let a = RoaringBitmap::from_slice(&[1, std::u32::MAX]);

        assert_eq!(
            or_range_i32(&[&a], -5, 10),
            Err(RangeError::OutOfDomain { start: -5, end: 10 })
        );
        assert_eq!(
            and_not_range(&a, &a, 0, (1 << 32) + 1),
            Err(RangeError::OutOfDomain { start: 0, end: (1 << 32) + 1 })
        );

        // The full domain is accepted
        assert_eq!(or_range(&[&a], 0, 1 << 32).unwrap(), a);
        assert_eq!(or_range(&[&a], 2, 1 << 32).unwrap().to_vec(), vec![std::u32::MAX]);
    }
}

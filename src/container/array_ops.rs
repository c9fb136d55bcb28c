//! Set operations on sorted sequences of 16 bit values

use crate::utils::Packed;

/// Above this length ratio intersections gallop through the larger operand
const GALLOP_THRESHOLD: usize = 64;

/// Find the first index at or after `index` whose value is not smaller than `min`.
/// `get` reads the sorted sequence of length `len`
pub fn advance_until<F>(get: F, len: usize, index: usize, min: u16) -> usize
    where F: Fn(usize) -> u16
{
    let mut lower = index;
    if lower >= len || get(lower) >= min {
        return lower;
    }

    // Double the step until we overshoot, the answer lies in (lower, bound]
    let mut span_size = 1;
    let mut bound = lower + span_size;

    while bound < len && get(bound) < min {
        lower = bound;
        span_size <<= 1;
        bound = index + span_size;
    }

    let mut upper = bound.min(len);

    // Binary search in (lower, upper)
    while lower + 1 < upper {
        let middle = lower + (upper - lower) / 2;

        if get(middle) < min {
            lower = middle;
        }
        else {
            upper = middle;
        }
    }

    upper
}

/// Union of two sorted sequences
pub fn or(a: Packed<'_, u16>, b: Packed<'_, u16>) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len() + b.len());

    let mut i0 = 0;
    let mut i1 = 0;
    while i0 < a.len() && i1 < b.len() {
        let v0 = a.get(i0);
        let v1 = b.get(i1);

        if v0 < v1 {
            out.push(v0);
            i0 += 1;
        }
        else if v1 < v0 {
            out.push(v1);
            i1 += 1;
        }
        else {
            out.push(v0);
            i0 += 1;
            i1 += 1;
        }
    }

    out.extend((i0..a.len()).map(|i| a.get(i)));
    out.extend((i1..b.len()).map(|i| b.get(i)));

    out
}

/// Intersection of two sorted sequences
pub fn and(a: Packed<'_, u16>, b: Packed<'_, u16>) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    for_each_shared(a, b, |value| out.push(value));

    out
}

/// Number of values shared by two sorted sequences
pub fn and_cardinality(a: Packed<'_, u16>, b: Packed<'_, u16>) -> usize {
    let mut count = 0;
    for_each_shared(a, b, |_| count += 1);

    count
}

fn for_each_shared<F>(a: Packed<'_, u16>, b: Packed<'_, u16>, mut f: F)
    where F: FnMut(u16)
{
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if small.is_empty() {
        return;
    }

    // Very unbalanced inputs, skip through the large side
    if small.len() * GALLOP_THRESHOLD < large.len() {
        let mut index = 0;
        for value in small.iter() {
            index = advance_until(|i| large.get(i), large.len(), index, value);
            if index >= large.len() {
                return;
            }

            if large.get(index) == value {
                f(value);
            }
        }

        return;
    }

    let mut i0 = 0;
    let mut i1 = 0;
    while i0 < small.len() && i1 < large.len() {
        let v0 = small.get(i0);
        let v1 = large.get(i1);

        if v0 < v1 {
            i0 += 1;
        }
        else if v1 < v0 {
            i1 += 1;
        }
        else {
            f(v0);
            i0 += 1;
            i1 += 1;
        }
    }
}

/// Values of `a` not present in `b`
pub fn and_not(a: Packed<'_, u16>, b: Packed<'_, u16>) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len());

    let mut i0 = 0;
    let mut i1 = 0;
    while i0 < a.len() && i1 < b.len() {
        let v0 = a.get(i0);
        let v1 = b.get(i1);

        if v0 < v1 {
            out.push(v0);
            i0 += 1;
        }
        else if v1 < v0 {
            i1 = advance_until(|i| b.get(i), b.len(), i1, v0);
        }
        else {
            i0 += 1;
            i1 += 1;
        }
    }

    out.extend((i0..a.len()).map(|i| a.get(i)));

    out
}

/// Values present in exactly one of the sequences
pub fn xor(a: Packed<'_, u16>, b: Packed<'_, u16>) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len() + b.len());

    let mut i0 = 0;
    let mut i1 = 0;
    while i0 < a.len() && i1 < b.len() {
        let v0 = a.get(i0);
        let v1 = b.get(i1);

        if v0 < v1 {
            out.push(v0);
            i0 += 1;
        }
        else if v1 < v0 {
            out.push(v1);
            i1 += 1;
        }
        else {
            i0 += 1;
            i1 += 1;
        }
    }

    out.extend((i0..a.len()).map(|i| a.get(i)));
    out.extend((i1..b.len()).map(|i| b.get(i)));

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn advance() {
        let values: Vec<u16> = (0..1000).map(|v| v * 3).collect();
        let get = |i: usize| values[i];

        assert_eq!(advance_until(get, values.len(), 0, 0), 0);
        assert_eq!(advance_until(get, values.len(), 0, 1), 1);
        assert_eq!(advance_until(get, values.len(), 0, 300), 100);
        assert_eq!(advance_until(get, values.len(), 10, 301), 101);
        assert_eq!(advance_until(get, values.len(), 0, 2997), 999);
        assert_eq!(advance_until(get, values.len(), 0, 2998), 1000);
        assert_eq!(advance_until(get, values.len(), 500, 3), 500);
    }

    #[test]
    fn merges() {
        let a: Vec<u16> = vec![1, 2, 5, 9, 65535];
        let b: Vec<u16> = vec![2, 3, 9, 10];
        let a = Packed::Native(&a[..]);
        let b = Packed::Native(&b[..]);

        assert_eq!(or(a, b), vec![1, 2, 3, 5, 9, 10, 65535]);
        assert_eq!(and(a, b), vec![2, 9]);
        assert_eq!(and_cardinality(a, b), 2);
        assert_eq!(and_not(a, b), vec![1, 5, 65535]);
        assert_eq!(xor(a, b), vec![1, 3, 5, 10, 65535]);
    }

    #[test]
    fn galloping_intersection() {
        let large: Vec<u16> = (0..4000).map(|v| v * 2).collect();
        let small: Vec<u16> = vec![6, 7, 4000, 7998, 7999];

        let found = and(Packed::Native(&small[..]), Packed::Native(&large[..]));
        assert_eq!(found, vec![6, 4000, 7998]);
    }
}

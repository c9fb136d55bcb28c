//! Set operations on sorted sequences of half open spans
//!
//! Every container can describe itself as spans, which lets any pair involving a run
//! container be combined in time proportional to the number of spans

/// Exclusive upper bound of a container's domain
const DOMAIN_END: u32 = 1 << 16;

/// Append `[start, end)` to `out`, joining it with the last span if they touch
#[inline]
pub fn push_span(out: &mut Vec<(u32, u32)>, start: u32, end: u32) {
    debug_assert!(start < end);

    match out.last_mut() {
        Some(last) if last.1 == start => last.1 = end,
        _ => out.push((start, end))
    }
}

/// Sweep over the boundaries of two span sequences and keep every stretch for which `keep`
/// returns true. `keep` receives membership in `a` and `b` and must return false for `(false, false)`
pub fn sweep<A, B, F>(a: A, b: B, keep: F) -> Vec<(u32, u32)>
    where A: IntoIterator<Item = (u32, u32)>,
          B: IntoIterator<Item = (u32, u32)>,
          F: Fn(bool, bool) -> bool
{
    debug_assert!(!keep(false, false));

    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();
    let mut out = Vec::new();
    let mut position = 0;

    loop {
        // Drop spans that are behind the sweep line
        while a.next_if(|&(_, end)| end <= position).is_some() { }
        while b.next_if(|&(_, end)| end <= position).is_some() { }

        if a.peek().is_none() && b.peek().is_none() {
            break;
        }

        let (in_a, next_a) = state(a.peek(), position);
        let (in_b, next_b) = state(b.peek(), position);
        let next = next_a.min(next_b);

        if keep(in_a, in_b) {
            push_span(&mut out, position, next);
        }

        position = next;
    }

    out
}

/// Membership of `position` in the next pending span and where that membership changes
#[inline]
fn state(span: Option<&(u32, u32)>, position: u32) -> (bool, u32) {
    match span {
        Some(&(start, end)) if start <= position => (true, end),
        Some(&(start, _)) => (false, start),
        None => (false, DOMAIN_END)
    }
}

/// Number of values in a sequence of spans
#[inline]
pub fn cardinality(spans: &[(u32, u32)]) -> usize {
    spans.iter()
        .map(|(start, end)| (end - start) as usize)
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;

    fn a() -> Vec<(u32, u32)> {
        vec![(0, 10), (20, 30), (65530, 65536)]
    }

    fn b() -> Vec<(u32, u32)> {
        vec![(5, 25), (40, 41)]
    }

    #[test]
    fn or() {
        assert_eq!(sweep(a(), b(), |x, y| x || y), vec![(0, 30), (40, 41), (65530, 65536)]);
    }

    #[test]
    fn and() {
        assert_eq!(sweep(a(), b(), |x, y| x && y), vec![(5, 10), (20, 25)]);
    }

    #[test]
    fn and_not() {
        assert_eq!(sweep(a(), b(), |x, y| x && !y), vec![(0, 5), (25, 30), (65530, 65536)]);
    }

    #[test]
    fn xor() {
        let found = sweep(a(), b(), |x, y| x != y);

        assert_eq!(found, vec![(0, 5), (10, 20), (25, 30), (40, 41), (65530, 65536)]);
        assert_eq!(cardinality(&found), 5 + 10 + 5 + 1 + 6);
    }

    #[test]
    fn touching_results_are_joined() {
        let found = sweep(vec![(0, 5)], vec![(5, 9)], |x, y| x || y);

        assert_eq!(found, vec![(0, 9)]);
    }
}

use std::ops::RangeInclusive;

/// Finds the index range of elements in a sorted slice whose keys fall
/// within the given inclusive range.
///
/// The slice must be sorted by the result of `key_fn`; the returned range
/// can be used directly for slicing (`&slice[range]`) and is empty when
/// nothing matches. Two `partition_point` calls, so O(log n).
///
/// ```
/// use mzfeature::utils::binary_search_range_by_key;
///
/// // (spectrum, intensity), sorted by spectrum
/// let signals = [(3u32, 10.0), (5, 80.0), (5, 40.0), (8, 25.0), (11, 5.0)];
/// let range = binary_search_range_by_key(&signals, 4..=9, |s| s.0);
/// assert_eq!(&signals[range], &[(5, 80.0), (5, 40.0), (8, 25.0)]);
///
/// let empty = binary_search_range_by_key(&signals, 12..=20, |s| s.0);
/// assert!(signals[empty].is_empty());
/// ```
pub fn binary_search_range_by_key<T, K, F>(
    slice: &[T],
    key_range: RangeInclusive<K>,
    key_fn: F,
) -> std::ops::Range<usize>
where
    F: Fn(&T) -> K,
    K: Ord,
{
    let start_idx = slice.partition_point(|x| key_fn(x) < *key_range.start());
    let end_idx = start_idx + slice[start_idx..].partition_point(|x| key_fn(x) <= *key_range.end());

    start_idx..end_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_on_duplicated_keys() {
        let vals = [1u32, 2, 2, 2, 3, 7, 7, 9];
        let range = binary_search_range_by_key(&vals, 2..=7, |x| *x);
        assert_eq!(range, 1..7);
    }

    #[test]
    fn test_range_outside_slice() {
        let vals = [4u32, 5, 6];
        assert!(vals[binary_search_range_by_key(&vals, 0..=3, |x| *x)].is_empty());
        assert!(vals[binary_search_range_by_key(&vals, 7..=9, |x| *x)].is_empty());
    }

    #[test]
    fn test_range_on_empty_slice() {
        let vals: [u32; 0] = [];
        let range = binary_search_range_by_key(&vals, 0..=10, |x| *x);
        assert!(range.is_empty());
    }
}

//! Utility functions and helpers

use crate::error::{Error, Result};

/// Computes an exclusive prefix sum (scan) for a vector
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0); // First element is always 0

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}

/// Replace `counts[k]` by the sum of `counts[..k]`, returning the total
///
/// The last slot is usually a spare so that `counts` becomes a vector
/// pointer array in place.
pub fn cumsum_in_place(counts: &mut [usize]) -> usize {
    let mut sum = 0;
    for c in counts.iter_mut() {
        let v = *c;
        *c = sum;
        sum += v;
    }
    sum
}

/// Index of the first element of the sorted `slice` that is `>= target`
#[inline]
pub fn lower_bound(slice: &[usize], target: usize) -> usize {
    slice.partition_point(|&v| v < target)
}

/// Allocate an empty vector with room for `capacity` elements
pub fn try_vec<T>(capacity: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| Error::out_of_memory::<T>(capacity))?;
    Ok(v)
}

/// Allocate a vector of `len` copies of `value`
pub fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = try_vec(len)?;
    v.resize(len, value);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_scan() {
        let input = vec![1, 2, 3, 4];
        let expected = vec![0, 1, 3, 6, 10];
        assert_eq!(exclusive_scan(&input), expected);

        let input = vec![0, 0, 5, 0];
        let expected = vec![0, 0, 0, 5, 5];
        assert_eq!(exclusive_scan(&input), expected);
    }

    #[test]
    fn test_cumsum_in_place() {
        let mut counts = vec![2, 0, 3, 0];
        assert_eq!(cumsum_in_place(&mut counts), 5);
        assert_eq!(counts, vec![0, 2, 2, 5]);
    }

    #[test]
    fn test_lower_bound() {
        let v = [1, 3, 3, 7];
        assert_eq!(lower_bound(&v, 0), 0);
        assert_eq!(lower_bound(&v, 3), 1);
        assert_eq!(lower_bound(&v, 4), 3);
        assert_eq!(lower_bound(&v, 9), 4);
    }

    #[test]
    fn test_try_alloc_reports_size() {
        let err = try_vec::<u64>(usize::MAX / 2).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { .. }));
        assert_eq!(try_filled(3, 7u8).unwrap(), vec![7, 7, 7]);
    }
}

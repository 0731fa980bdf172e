use num_traits::Float;

/// The three disjoint ranges a pivot pair (lo, hi) splits a level into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bucket {
    /// Values `< lo`.
    Low,
    /// Values in the half-open interval `[lo, hi)`.
    Mid,
    /// Values `>= hi`.
    High,
}

#[inline]
fn slot<T: Float>(v: T, lo: T, hi: T) -> usize {
    if v < lo {
        0
    } else if v < hi {
        1
    } else {
        2
    }
}

/// Counts the local bucket sizes `[m0, m1, m2]` in one scan. The triple is
/// fed to a fused all-reduce; the invariant `m0 + m1 + m2 == data.len()`
/// holds for NaN-free input.
#[cfg(not(feature = "rayon"))]
pub(crate) fn bucket_counts<T: Float>(data: &[T], lo: T, hi: T) -> [i64; 3] {
    let mut counts = [0i64; 3];
    for &v in data {
        counts[slot(v, lo, hi)] += 1;
    }
    counts
}

/// Counts the local bucket sizes `[m0, m1, m2]` in one parallel scan.
#[cfg(feature = "rayon")]
pub(crate) fn bucket_counts<T: Float + Send + Sync>(data: &[T], lo: T, hi: T) -> [i64; 3] {
    use rayon::prelude::*;

    data.par_iter()
        .fold(
            || [0i64; 3],
            |mut counts, &v| {
                counts[slot(v, lo, hi)] += 1;
                counts
            },
        )
        .reduce(
            || [0i64; 3],
            |mut a, b| {
                for (acc, v) in a.iter_mut().zip(b) {
                    *acc += v;
                }
                a
            },
        )
}

/// Copies the elements of the chosen bucket into a fresh exactly-sized
/// buffer. Second pass of the count-then-copy scheme: only the kept bucket
/// is ever allocated, and the caller drops the old level buffer right
/// after.
pub(crate) fn take_bucket<T: Float>(
    data: &[T],
    lo: T,
    hi: T,
    bucket: Bucket,
    len: usize,
) -> Vec<T> {
    let mut kept = Vec::with_capacity(len);
    match bucket {
        Bucket::Low => kept.extend(data.iter().copied().filter(|&v| v < lo)),
        Bucket::Mid => kept.extend(data.iter().copied().filter(|&v| lo <= v && v < hi)),
        Bucket::High => kept.extend(data.iter().copied().filter(|&v| v >= hi)),
    }
    debug_assert_eq!(kept.len(), len);
    kept
}

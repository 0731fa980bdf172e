use std::cmp::Ordering;

use num_traits::Float;

// Windows at or below this length are finished with an insertion sort.
const INSERTION_LEN: usize = 16;

/// Places the k-th smallest element of `data` at index `k` and returns it,
/// partially reordering the buffer around it (introselect).
///
/// Expected O(n): iterative quickselect with median-of-three pivots and a
/// three-way partition step, so duplicate runs collapse in one round. A
/// depth budget of 2·log₂(n) bounds the adversarial case; once spent, the
/// remaining window is sorted outright.
///
/// NaN-free input is a precondition of the crate boundary; the fallback
/// sort maps incomparable pairs to `Equal` rather than panicking.
///
/// # Panics
/// Panics if `k >= data.len()`.
pub(crate) fn select_nth<T: Float>(data: &mut [T], k: usize) -> T {
    assert!(
        k < data.len(),
        "selection rank {} out of bounds for a buffer of length {}",
        k,
        data.len()
    );

    let mut begin = 0;
    let mut end = data.len();
    let mut budget = 2 * (usize::BITS - data.len().leading_zeros()) as usize;

    loop {
        if end - begin <= INSERTION_LEN {
            insertion_sort(&mut data[begin..end]);
            return data[k];
        }
        if budget == 0 {
            data[begin..end]
                .sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            return data[k];
        }
        budget -= 1;

        let mid = begin + (end - begin) / 2;
        let pivot = median_of_three(data[begin], data[mid], data[end - 1]);
        let (lt, gt) = partition_at(&mut data[begin..end], pivot);
        let lt = begin + lt;
        let gt = begin + gt;

        if k < lt {
            end = lt;
        } else if k < gt {
            // k lands inside the run equal to the pivot
            return pivot;
        } else {
            begin = gt;
        }
    }
}

/// Three-way in-place partition around `pivot`: on return the window is
/// `[< pivot | == pivot | > pivot]` and the bounds of the equal run are
/// returned as `(lt, gt)`.
fn partition_at<T: Float>(v: &mut [T], pivot: T) -> (usize, usize) {
    let mut lt = 0;
    let mut i = 0;
    let mut gt = v.len();
    while i < gt {
        if v[i] < pivot {
            v.swap(lt, i);
            lt += 1;
            i += 1;
        } else if v[i] > pivot {
            gt -= 1;
            v.swap(i, gt);
        } else {
            i += 1;
        }
    }
    (lt, gt)
}

fn median_of_three<T: Float>(a: T, b: T, c: T) -> T {
    if a < b {
        if b < c {
            b
        } else if a < c {
            c
        } else {
            a
        }
    } else if a < c {
        a
    } else if b < c {
        c
    } else {
        b
    }
}

fn insertion_sort<T: Float>(v: &mut [T]) {
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && v[j] < v[j - 1] {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}

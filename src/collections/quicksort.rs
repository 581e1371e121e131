//! In-place quicksort with median-of-three pivots and Lomuto partitioning.
//!
//! Average O(n log n). Median-of-three keeps sorted and reverse-sorted input
//! fast, but crafted "median-of-three killer" sequences still degrade to
//! O(n²). Not stable. Recursion only descends into the smaller partition, so
//! stack depth stays O(log n) regardless.
//!
//! Works on anything that derefs to a slice: arrays, `Vec`s, sub-slices.

use std::cmp::Ordering;
use std::convert::Infallible;

use super::CollectionError;

/// Sort by `T`'s natural order.
pub fn sort<T: Ord>(items: &mut [T]) {
    sort_by(items, T::cmp);
}

/// Sort by an explicit comparator.
pub fn sort_by<T, F>(items: &mut [T], mut cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let sorted: Result<(), Infallible> = quicksort(items, &mut |a: &T, b: &T| Ok(cmp(a, b)));
    match sorted {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Natural-order sort for partially ordered items (e.g. floats).
///
/// Fails with `InvalidArgument` at the first pair that has no ordering;
/// the slice is then left in an unspecified permutation of its input.
pub fn try_sort<T: PartialOrd>(items: &mut [T]) -> Result<(), CollectionError> {
    try_sort_by(items, |a: &T, b: &T| {
        a.partial_cmp(b)
            .ok_or(CollectionError::InvalidArgument("elements have no natural ordering"))
    })
}

/// Sort by a comparator that may refuse to compare.
pub fn try_sort_by<T, F, E>(items: &mut [T], mut cmp: F) -> Result<(), E>
where
    F: FnMut(&T, &T) -> Result<Ordering, E>,
{
    quicksort(items, &mut cmp)
}

fn quicksort<T, E>(
    mut items: &mut [T],
    cmp: &mut impl FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<(), E> {
    while items.len() > 1 {
        let pivot = partition(items, cmp)?;
        let (left, rest) = std::mem::take(&mut items).split_at_mut(pivot);
        let right = &mut rest[1..];
        if left.len() < right.len() {
            quicksort(left, cmp)?;
            items = right;
        } else {
            quicksort(right, cmp)?;
            items = left;
        }
    }
    Ok(())
}

/// Partition around the median of first, middle and last; returns the
/// pivot's final index. Everything left of it compares `<=` the pivot.
fn partition<T, E>(
    items: &mut [T],
    cmp: &mut impl FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<usize, E> {
    let high = items.len() - 1;
    let mid = high / 2;

    if cmp(&items[0], &items[mid])? == Ordering::Greater {
        items.swap(0, mid);
    }
    if cmp(&items[0], &items[high])? == Ordering::Greater {
        items.swap(0, high);
    }
    if cmp(&items[mid], &items[high])? == Ordering::Greater {
        items.swap(mid, high);
    }
    items.swap(mid, high);

    let mut store = 0;
    for j in 0..high {
        if cmp(&items[j], &items[high])? != Ordering::Greater {
            items.swap(store, j);
            store += 1;
        }
    }
    items.swap(store, high);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sorted_copy(v: &[i32]) -> Vec<i32> {
        let mut out = v.to_vec();
        out.sort();
        out
    }

    #[test]
    fn empty_and_single() {
        let mut empty: Vec<i32> = vec![];
        sort(&mut empty);
        assert!(empty.is_empty());
        let mut one = [7];
        sort(&mut one);
        assert_eq!(one, [7]);
    }

    #[test]
    fn fixed_size_array() {
        let mut arr = [5, 3, 9, 1, 1, 8];
        sort(&mut arr);
        assert_eq!(arr, [1, 1, 3, 5, 8, 9]);
    }

    #[test]
    fn duplicates_sorted_and_reversed() {
        let dups = vec![4, 4, 1, 4, 1, 1, 4];
        let ascending: Vec<i32> = (0..500).collect();
        let descending: Vec<i32> = (0..500).rev().collect();
        for input in [dups, ascending, descending] {
            let mut v = input.clone();
            sort(&mut v);
            assert_eq!(v, sorted_copy(&input));
        }
    }

    #[test]
    fn all_equal() {
        let mut v = vec![3; 1000];
        sort(&mut v);
        assert_eq!(v, vec![3; 1000]);
    }

    #[test]
    fn comparator_descending() {
        let mut v = vec!["b", "c", "a"];
        sort_by(&mut v, |a, b| b.cmp(a));
        assert_eq!(v, vec!["c", "b", "a"]);
    }

    #[test]
    fn sort_by_key_field() {
        let mut sites = vec![("B", 3u64), ("A", 10), ("C", 3)];
        sort_by(&mut sites, |a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        assert_eq!(sites, vec![("A", 10), ("B", 3), ("C", 3)]);
    }

    #[test]
    fn try_sort_orders_floats() {
        let mut v = vec![2.5, -1.0, 0.0, 9.75];
        try_sort(&mut v).unwrap();
        assert_eq!(v, vec![-1.0, 0.0, 2.5, 9.75]);
    }

    #[test]
    fn try_sort_rejects_incomparable() {
        let mut v = vec![1.0, f64::NAN, 0.5];
        let err = try_sort(&mut v).unwrap_err();
        assert_eq!(err, CollectionError::InvalidArgument("elements have no natural ordering"));
        // still a permutation of the input
        assert_eq!(v.len(), 3);
        assert_eq!(v.iter().filter(|x| x.is_nan()).count(), 1);
    }

    #[test]
    fn try_sort_trivial_inputs_never_compare() {
        let mut v = vec![f64::NAN];
        assert!(try_sort(&mut v).is_ok());
        let mut v: Vec<f64> = vec![];
        assert!(try_sort(&mut v).is_ok());
    }

    #[test]
    fn large_sorted_input_is_fine() {
        let mut v: Vec<u32> = (0..100_000).collect();
        sort(&mut v);
        assert!(v.windows(2).all(|w| w[0] <= w[1]));
    }

    proptest! {
        #[test]
        fn matches_std_sort(input in prop::collection::vec(-50i32..50, 0..400)) {
            let mut v = input.clone();
            sort(&mut v);
            prop_assert_eq!(v, sorted_copy(&input));
        }
    }
}

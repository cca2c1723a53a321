//! Fold slicing.

use crate::{Error, Result};

/// Partition `items` into `num_pieces` contiguous slices.
///
/// Slice `p` holds `len / num_pieces` items, plus one more when
/// `p < len % num_pieces`, so sizes differ by at most one and the larger
/// slices come first. Shuffle before calling if a random split is wanted.
///
/// ```rust
/// use phenomatrix::matrix::split_set;
///
/// let slices = split_set(&[1, 2, 3, 4, 5, 6, 7], 3).unwrap();
/// assert_eq!(slices, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);
/// ```
///
/// # Errors
/// `EmptyItemSet` if `items` is empty, `InvalidFolds` if `num_pieces` is zero.
pub fn split_set<T: Clone>(items: &[T], num_pieces: usize) -> Result<Vec<Vec<T>>> {
    if items.is_empty() {
        return Err(Error::EmptyItemSet);
    }
    if num_pieces == 0 {
        return Err(Error::InvalidFolds(vec![0]));
    }

    let base = items.len() / num_pieces;
    let extra = items.len() % num_pieces;

    let mut slices = Vec::with_capacity(num_pieces);
    let mut start = 0;
    for piece in 0..num_pieces {
        let size = base + usize::from(piece < extra);
        slices.push(items[start..start + size].to_vec());
        start += size;
    }
    Ok(slices)
}

/// Concatenate every slice except `leave_out`, keeping slice order and the
/// order inside each slice. An out-of-range `leave_out` keeps everything.
#[must_use]
pub fn combine_all_but_one<T: Clone>(slices: &[Vec<T>], leave_out: usize) -> Vec<T> {
    let total: usize = slices.iter().map(Vec::len).sum();
    let kept = total - slices.get(leave_out).map_or(0, Vec::len);

    let mut combined = Vec::with_capacity(kept);
    for (n, slice) in slices.iter().enumerate() {
        if n != leave_out {
            combined.extend_from_slice(slice);
        }
    }
    combined
}

//! Loop-interchange ordering for strided traversal.
//!
//! Given the shapes and strides of every view participating in a traversal,
//! these routines pick the axis permutation that puts the smallest-stride
//! axis innermost (weighting the destination view double, since stores cost
//! more than loads), fuse axes that are contiguous in every view, and drop
//! size-1 axes so the loop nest stays shallow.

/// Rank of each axis's |stride| among the non-zero strides.
///
/// Zero strides rank first: a broadcast axis revisits one element, so
/// keeping it innermost maximizes reuse.
pub(crate) fn index_order(strides: &[isize]) -> Vec<usize> {
    let n = strides.len();
    let mut out = vec![1usize; n];
    for i in 0..n {
        let si = strides[i].unsigned_abs();
        if si == 0 {
            continue;
        }
        let mut rank = 1usize;
        for &s in strides {
            if s != 0 && s.unsigned_abs() < si {
                rank += 1;
            }
        }
        out[i] = rank;
    }
    out
}

/// Axis permutation for a multi-view traversal, innermost axis first.
///
/// Each view votes for the axes it would like innermost via a bit-packed
/// importance score; the view at `dest` (the one being written) votes with
/// double weight. Size-1 axes get zero importance and sink to the back.
pub(crate) fn loop_order(
    dims: &[usize],
    strides_list: &[&[isize]],
    dest: Option<usize>,
) -> Vec<usize> {
    let rank = dims.len();
    if rank == 0 {
        return Vec::new();
    }
    if strides_list.is_empty() {
        return (0..rank).collect();
    }

    let m = strides_list.len() as u64;
    // Bits needed to keep one view's votes from carrying into the next
    // stride rank's bucket.
    let g = 64 - (m + 1).leading_zeros() as u64;

    let mut importance = vec![0u64; rank];
    for (k, strides) in strides_list.iter().enumerate() {
        let orders = index_order(strides);
        let weight = if dest == Some(k) { 2u64 } else { 1 };
        for i in 0..rank {
            let shift = (g * (rank - orders[i]) as u64).min(63);
            importance[i] = importance[i].saturating_add(weight << shift);
        }
    }
    for i in 0..rank {
        if dims[i] <= 1 {
            importance[i] = 0;
        }
    }

    let mut perm: Vec<usize> = (0..rank).collect();
    perm.sort_by(|&a, &b| importance[b].cmp(&importance[a]));
    perm
}

/// Merge adjacent axes that are contiguous in every view.
///
/// Axis `i` folds into axis `i - 1` when `strides[i] == dims[i-1] *
/// strides[i-1]` holds for all views; the folded axis is left with extent 1
/// for [`compress_dims`] to discard. Expects axes already in iteration
/// order (innermost first).
pub(crate) fn fuse_dims(dims: &[usize], strides_list: &[&[isize]]) -> Vec<usize> {
    let n = dims.len();
    let mut fused = dims.to_vec();
    if n <= 1 || strides_list.is_empty() {
        return fused;
    }

    for i in (1..n).rev() {
        let mergeable = strides_list.iter().all(|strides| {
            strides[i] == fused[i - 1] as isize * strides[i - 1]
        });
        if mergeable {
            fused[i - 1] *= fused[i];
            fused[i] = 1;
        }
    }
    fused
}

/// Drop size-1 axes from a dims/strides bundle.
///
/// A rank of zero can come back (everything was singleton); callers treat
/// that as a single-element traversal.
pub(crate) fn compress_dims(
    dims: &[usize],
    strides_list: &[Vec<isize>],
) -> (Vec<usize>, Vec<Vec<isize>>) {
    let keep: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != 1).collect();
    let out_dims: Vec<usize> = keep.iter().map(|&i| dims[i]).collect();
    let out_strides = strides_list
        .iter()
        .map(|strides| keep.iter().map(|&i| strides[i]).collect())
        .collect();
    (out_dims, out_strides)
}

/// Per-axis traversal cost: twice the smallest |stride| across views, with
/// broadcast (zero-stride) axes costing 1.
pub(crate) fn axis_costs(strides_list: &[&[isize]]) -> Vec<isize> {
    let Some(first) = strides_list.first() else {
        return Vec::new();
    };
    let n = first.len();
    let mut costs = vec![isize::MAX; n];
    for strides in strides_list {
        for i in 0..n {
            costs[i] = costs[i].min(strides[i].abs());
        }
    }
    for c in &mut costs {
        *c = if *c == 0 { 1 } else { *c * 2 };
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_basic() {
        assert_eq!(index_order(&[4, 1, 2]), vec![3, 1, 2]);
        assert_eq!(index_order(&[-4, 1, -2]), vec![3, 1, 2]);
    }

    #[test]
    fn test_index_order_zero_stride_ranks_first() {
        assert_eq!(index_order(&[4, 0, 2]), vec![2, 1, 1]);
    }

    #[test]
    fn test_index_order_ties() {
        assert_eq!(index_order(&[2, 2, 1]), vec![2, 2, 1]);
    }

    #[test]
    fn test_loop_order_row_major() {
        // Smallest stride last -> that axis becomes innermost (first in the
        // returned permutation means highest importance).
        let strides = [5isize, 1];
        let order = loop_order(&[4, 5], &[&strides], Some(0));
        assert_eq!(order[0], 1);
    }

    #[test]
    fn test_loop_order_col_major() {
        let strides = [1isize, 4];
        let order = loop_order(&[4, 5], &[&strides], Some(0));
        assert_eq!(order[0], 0);
    }

    #[test]
    fn test_loop_order_dest_outvotes_src() {
        let dst = [1isize, 4]; // column-major destination
        let src = [5isize, 1]; // row-major source
        let order = loop_order(&[4, 5], &[&dst, &src], Some(0));
        assert_eq!(order[0], 0);
    }

    #[test]
    fn test_loop_order_singletons_last() {
        let strides = [1isize, 4, 4];
        let order = loop_order(&[4, 1, 5], &[&strides], Some(0));
        assert_eq!(order[2], 1);
    }

    #[test]
    fn test_fuse_dims_contiguous_pair() {
        // Ordered innermost-first: [3, 4] with strides [1, 3] fuses to [12, 1].
        let strides = [1isize, 3];
        assert_eq!(fuse_dims(&[3, 4], &[&strides]), vec![12, 1]);
    }

    #[test]
    fn test_fuse_dims_requires_all_views() {
        let a = [1isize, 3];
        let b = [1isize, 10];
        assert_eq!(fuse_dims(&[3, 4], &[&a, &b]), vec![3, 4]);
    }

    #[test]
    fn test_fuse_dims_partial() {
        let strides = [1isize, 2, 100];
        assert_eq!(fuse_dims(&[2, 3, 4], &[&strides]), vec![6, 1, 4]);
    }

    #[test]
    fn test_compress_dims() {
        let strides = vec![vec![1isize, 99, 6]];
        let (dims, strides) = compress_dims(&[6, 1, 4], &strides);
        assert_eq!(dims, vec![6, 4]);
        assert_eq!(strides[0], vec![1, 6]);
    }

    #[test]
    fn test_compress_dims_all_singleton() {
        let strides = vec![vec![5isize]];
        let (dims, strides) = compress_dims(&[1], &strides);
        assert!(dims.is_empty());
        assert!(strides[0].is_empty());
    }

    #[test]
    fn test_axis_costs() {
        let a = [1isize, 4, 0];
        let b = [2isize, 1, 0];
        assert_eq!(axis_costs(&[&a, &b]), vec![2, 2, 1]);
    }
}

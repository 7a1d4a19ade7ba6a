//! Zero-copy view construction.
//!
//! Every function here derives a new view (fresh shape/strides/offset) over
//! the caller's buffer. Nothing is copied, so the returned views alias the
//! original: writes through one are visible through all.

use crate::array::NdArray;
use crate::shape::numel;
use crate::{NdError, Result};

fn check_axis(axis: usize, rank: usize) -> Result<()> {
    if axis >= rank {
        return Err(NdError::InvalidAxis {
            axis: axis as isize,
            rank,
        });
    }
    Ok(())
}

/// Per-axis suffix view: everything from `starts` (inclusive) to the end.
///
/// Negative starts count from the end of the axis. A start equal to the
/// axis extent yields an empty axis.
pub fn slice_from(x: &NdArray, starts: &[isize]) -> Result<NdArray> {
    let rank = x.ndims();
    if starts.len() != rank {
        return Err(NdError::RankMismatch(starts.len(), rank));
    }

    let mut shape = Vec::with_capacity(rank);
    let mut offset = x.offset();
    for (dim, &start) in starts.iter().enumerate() {
        let n = x.shape()[dim];
        let s = if start < 0 { start + n as isize } else { start };
        if s < 0 || s > n as isize {
            return Err(NdError::IndexOutOfBounds {
                index: start,
                dim,
                size: n,
            });
        }
        shape.push(n - s as usize);
        offset += s * x.strides()[dim];
    }
    Ok(x.derived(shape, x.strides().to_vec(), offset))
}

/// Per-axis prefix view: everything before `stops` (exclusive).
///
/// Negative stops count from the end of the axis.
pub fn slice_to(x: &NdArray, stops: &[isize]) -> Result<NdArray> {
    let rank = x.ndims();
    if stops.len() != rank {
        return Err(NdError::RankMismatch(stops.len(), rank));
    }

    let mut shape = Vec::with_capacity(rank);
    for (dim, &stop) in stops.iter().enumerate() {
        let n = x.shape()[dim];
        let s = if stop < 0 { stop + n as isize } else { stop };
        if s < 0 || s > n as isize {
            return Err(NdError::IndexOutOfBounds {
                index: stop,
                dim,
                size: n,
            });
        }
        shape.push(s as usize);
    }
    Ok(x.derived(shape, x.strides().to_vec(), x.offset()))
}

/// Split off the last sub-array along axis 0.
///
/// Returns `(init, last)`: `init` is the array without its final
/// sub-array, `last` the removed sub-array with axis 0 dropped. Both alias
/// the original buffer.
pub fn pop(x: &NdArray) -> Result<(NdArray, NdArray)> {
    let rank = x.ndims();
    check_axis(0, rank)?;
    let n = x.shape()[0];
    if n == 0 {
        return Err(NdError::IndexOutOfBounds {
            index: -1,
            dim: 0,
            size: 0,
        });
    }

    let mut init_shape = x.shape().to_vec();
    init_shape[0] = n - 1;
    let init = x.derived(init_shape, x.strides().to_vec(), x.offset());

    let last_offset = x.offset() + (n as isize - 1) * x.strides()[0];
    let last = x.derived(
        x.shape()[1..].to_vec(),
        x.strides()[1..].to_vec(),
        last_offset,
    );
    Ok((init, last))
}

/// Merge axes `axis..` into one, in the view's advisory order.
///
/// Succeeds only when the actual strides make the merged axes one dense
/// run (size-1 axes never get in the way); otherwise the flattened view
/// cannot exist without copying and the call fails.
pub fn flatten_from(x: &NdArray, axis: usize) -> Result<NdArray> {
    use crate::shape::Order;

    let rank = x.ndims();
    check_axis(axis, rank)?;

    // The axes that actually constrain the merge.
    let wide: Vec<usize> = (axis..rank).filter(|&i| x.shape()[i] > 1).collect();
    let merged_extent = numel(&x.shape()[axis..]);

    let fused_stride = match x.order() {
        Order::RowMajor => {
            for w in wide.windows(2) {
                let (outer, inner) = (w[0], w[1]);
                if x.strides()[outer] != x.shape()[inner] as isize * x.strides()[inner] {
                    return Err(NdError::NonFusableAxes { from: axis });
                }
            }
            wide.last().map_or(1, |&i| x.strides()[i])
        }
        Order::ColMajor => {
            for w in wide.windows(2) {
                let (inner, outer) = (w[0], w[1]);
                if x.strides()[outer] != x.shape()[inner] as isize * x.strides()[inner] {
                    return Err(NdError::NonFusableAxes { from: axis });
                }
            }
            wide.first().map_or(1, |&i| x.strides()[i])
        }
    };

    let mut shape = x.shape()[..axis].to_vec();
    shape.push(merged_extent);
    let mut strides = x.strides()[..axis].to_vec();
    strides.push(fused_stride);
    Ok(x.derived(shape, strides, x.offset()))
}

/// Reorder axes by a permutation of `0..rank`.
pub fn permute_dims(x: &NdArray, perm: &[usize]) -> Result<NdArray> {
    let rank = x.ndims();
    if perm.len() != rank {
        return Err(NdError::RankMismatch(perm.len(), rank));
    }
    let mut seen = vec![false; rank];
    for &p in perm {
        check_axis(p, rank)?;
        if seen[p] {
            return Err(NdError::DuplicateAxis { axis: p });
        }
        seen[p] = true;
    }

    let shape = perm.iter().map(|&p| x.shape()[p]).collect();
    let strides = perm.iter().map(|&p| x.strides()[p]).collect();
    Ok(x.derived(shape, strides, x.offset()))
}

/// Reverse all axes (the rank-N transpose).
pub fn transpose(x: &NdArray) -> Result<NdArray> {
    let perm: Vec<usize> = (0..x.ndims()).rev().collect();
    permute_dims(x, &perm)
}

/// Flip one axis by negating its stride.
pub fn reverse_dim(x: &NdArray, axis: usize) -> Result<NdArray> {
    check_axis(axis, x.ndims())?;
    let n = x.shape()[axis];
    let mut strides = x.strides().to_vec();
    let mut offset = x.offset();
    if n > 0 {
        offset += (n as isize - 1) * strides[axis];
    }
    strides[axis] = -strides[axis];
    Ok(x.derived(x.shape().to_vec(), strides, offset))
}

/// Drop size-1 axes.
///
/// With `dims` given, only those axes are dropped and each must have extent
/// 1; with `None`, every size-1 axis goes.
pub fn squeeze(x: &NdArray, dims: Option<&[usize]>) -> Result<NdArray> {
    let rank = x.ndims();
    let drop: Vec<usize> = match dims {
        Some(axes) => {
            let mut seen = vec![false; rank];
            for &axis in axes {
                check_axis(axis, rank)?;
                if seen[axis] {
                    return Err(NdError::DuplicateAxis { axis });
                }
                seen[axis] = true;
                if x.shape()[axis] != 1 {
                    return Err(NdError::ShapeMismatch(vec![x.shape()[axis]], vec![1]));
                }
            }
            axes.to_vec()
        }
        None => (0..rank).filter(|&i| x.shape()[i] == 1).collect(),
    };

    let keep: Vec<usize> = (0..rank).filter(|i| !drop.contains(i)).collect();
    let shape = keep.iter().map(|&i| x.shape()[i]).collect();
    let strides = keep.iter().map(|&i| x.strides()[i]).collect();
    Ok(x.derived(shape, strides, x.offset()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use crate::dtype::DType;
    use crate::scalar::Scalar;
    use crate::shape::Order;

    fn iota(shape: &[usize]) -> NdArray {
        let n = numel(shape);
        let strides = crate::shape::shape_to_strides(shape, Order::RowMajor);
        NdArray::new(
            DType::Float64,
            Buffer::Float64((0..n).map(|v| v as f64).collect()),
            shape.to_vec(),
            strides,
            0,
            Order::RowMajor,
        )
        .unwrap()
    }

    #[test]
    fn test_slice_from() {
        let x = iota(&[4, 3]);
        let s = slice_from(&x, &[1, 1]).unwrap();
        assert_eq!(s.shape(), &[3, 2]);
        assert_eq!(s.get(&[0, 0]).unwrap(), x.get(&[1, 1]).unwrap());
        assert_eq!(s.get(&[2, 1]).unwrap(), x.get(&[3, 2]).unwrap());
    }

    #[test]
    fn test_slice_from_negative() {
        let x = iota(&[4]);
        let s = slice_from(&x, &[-2]).unwrap();
        assert_eq!(s.shape(), &[2]);
        assert_eq!(s.get(&[0]).unwrap(), Scalar::Float64(2.0));
    }

    #[test]
    fn test_slice_to() {
        let x = iota(&[4, 3]);
        let s = slice_to(&x, &[2, -1]).unwrap();
        assert_eq!(s.shape(), &[2, 2]);
        assert_eq!(s.get(&[1, 1]).unwrap(), x.get(&[1, 1]).unwrap());
    }

    #[test]
    fn test_slice_bounds() {
        let x = iota(&[4]);
        assert!(slice_from(&x, &[5]).is_err());
        assert!(slice_to(&x, &[-5]).is_err());
        assert!(slice_from(&x, &[1, 0]).is_err());
        // Start at the extent: empty, not an error.
        assert_eq!(slice_from(&x, &[4]).unwrap().len(), 0);
    }

    #[test]
    fn test_pop() {
        let x = iota(&[3, 2]);
        let (init, last) = pop(&x).unwrap();
        assert_eq!(init.shape(), &[2, 2]);
        assert_eq!(last.shape(), &[2]);
        assert_eq!(last.get(&[0]).unwrap(), x.get(&[2, 0]).unwrap());
        assert_eq!(last.get(&[1]).unwrap(), x.get(&[2, 1]).unwrap());
    }

    #[test]
    fn test_pop_aliases() {
        let x = iota(&[3]);
        let (init, last) = pop(&x).unwrap();
        x.set(&[2], Scalar::Float64(99.0)).unwrap();
        assert_eq!(last.get(&[]).unwrap(), Scalar::Float64(99.0));
        x.set(&[0], Scalar::Float64(-1.0)).unwrap();
        assert_eq!(init.get(&[0]).unwrap(), Scalar::Float64(-1.0));
    }

    #[test]
    fn test_pop_empty_axis() {
        let x = NdArray::zeros(DType::Float64, &[0, 2], Order::RowMajor);
        assert!(pop(&x).is_err());
        let scalar = NdArray::zeros(DType::Float64, &[], Order::RowMajor);
        assert!(pop(&scalar).is_err());
    }

    #[test]
    fn test_flatten_from_dense() {
        let x = iota(&[2, 3, 4]);
        let f = flatten_from(&x, 1).unwrap();
        assert_eq!(f.shape(), &[2, 12]);
        assert_eq!(f.strides(), &[12, 1]);
        assert_eq!(f.get(&[1, 7]).unwrap(), x.get(&[1, 1, 3]).unwrap());
    }

    #[test]
    fn test_flatten_from_rejects_permuted() {
        let x = iota(&[2, 3, 4]);
        let t = permute_dims(&x, &[0, 2, 1]).unwrap();
        assert!(matches!(
            flatten_from(&t, 1).unwrap_err(),
            NdError::NonFusableAxes { from: 1 }
        ));
    }

    #[test]
    fn test_flatten_from_skips_singletons() {
        let x = iota(&[2, 1, 4]);
        let f = flatten_from(&x, 0).unwrap();
        assert_eq!(f.shape(), &[8]);
        assert_eq!(f.get(&[5]).unwrap(), x.get(&[1, 0, 1]).unwrap());
    }

    #[test]
    fn test_permute_dims() {
        let x = iota(&[2, 3, 4]);
        let p = permute_dims(&x, &[2, 0, 1]).unwrap();
        assert_eq!(p.shape(), &[4, 2, 3]);
        assert_eq!(p.get(&[3, 1, 2]).unwrap(), x.get(&[1, 2, 3]).unwrap());
        assert!(permute_dims(&x, &[0, 0, 1]).is_err());
        assert!(permute_dims(&x, &[0, 1]).is_err());
    }

    #[test]
    fn test_transpose() {
        let x = iota(&[2, 3]);
        let t = transpose(&x).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.get(&[2, 1]).unwrap(), x.get(&[1, 2]).unwrap());
    }

    #[test]
    fn test_reverse_dim() {
        let x = iota(&[4]);
        let r = reverse_dim(&x, 0).unwrap();
        assert_eq!(r.strides(), &[-1]);
        assert_eq!(r.get(&[0]).unwrap(), Scalar::Float64(3.0));
        assert_eq!(r.get(&[3]).unwrap(), Scalar::Float64(0.0));
    }

    #[test]
    fn test_squeeze() {
        let x = iota(&[1, 3, 1, 2]);
        let s = squeeze(&x, None).unwrap();
        assert_eq!(s.shape(), &[3, 2]);
        assert_eq!(s.get(&[2, 1]).unwrap(), x.get(&[0, 2, 0, 1]).unwrap());

        let s = squeeze(&x, Some(&[0])).unwrap();
        assert_eq!(s.shape(), &[3, 1, 2]);
        assert!(squeeze(&x, Some(&[1])).is_err());
    }
}

//! Broadcasting: combining mismatched shapes without copying.
//!
//! Shapes are right-aligned and padded with leading 1s; each aligned
//! dimension takes the maximum extent among inputs whose extent is not 1,
//! and two differing non-1 extents are a fatal incompatibility. Inputs
//! narrower than the broadcast shape become zero-stride views over their
//! original buffer: stepping along a broadcast axis revisits the same
//! element.

use crate::array::NdArray;
use crate::{NdError, Result};

/// Compute the common broadcast shape of a set of shapes.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let max_rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; max_rank];

    for pos in 0..max_rank {
        let at = max_rank - 1 - pos;
        for shape in shapes {
            if pos >= shape.len() {
                continue;
            }
            let dim = shape[shape.len() - 1 - pos];
            if dim == 1 {
                continue;
            }
            if out[at] == 1 {
                out[at] = dim;
            } else if out[at] != dim {
                return Err(NdError::BroadcastIncompatible(out.clone(), shape.to_vec()));
            }
        }
    }
    Ok(out)
}

/// Expand a view to a broadcast shape.
///
/// A view whose shape already matches is returned as-is (the same view over
/// the same buffer — not a fresh copy). Expanded views come back read-only:
/// a store through a zero-stride axis would fan out to many logical
/// positions.
pub fn broadcast_to(x: &NdArray, shape: &[usize]) -> Result<NdArray> {
    if x.shape() == shape {
        return Ok(x.clone());
    }

    let rank = x.ndims();
    let target_rank = shape.len();
    if target_rank < rank {
        return Err(NdError::BroadcastIncompatible(
            x.shape().to_vec(),
            shape.to_vec(),
        ));
    }

    let pad = target_rank - rank;
    let mut strides = vec![0isize; target_rank];
    for i in 0..rank {
        let old = x.shape()[i];
        let new = shape[pad + i];
        if old == new {
            strides[pad + i] = x.strides()[i];
        } else if old == 1 {
            strides[pad + i] = 0;
        } else {
            return Err(NdError::BroadcastIncompatible(
                x.shape().to_vec(),
                shape.to_vec(),
            ));
        }
    }

    Ok(x.derived(shape.to_vec(), strides, x.offset()).into_readonly())
}

/// Broadcast a set of arrays to their common shape.
pub fn broadcast_arrays(arrays: &[&NdArray]) -> Result<Vec<NdArray>> {
    let shapes: Vec<&[usize]> = arrays.iter().map(|a| a.shape()).collect();
    let target = broadcast_shapes(&shapes)?;
    arrays.iter().map(|a| broadcast_to(a, &target)).collect()
}

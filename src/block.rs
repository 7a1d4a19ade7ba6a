//! Cache-blocked tile size computation.
//!
//! Traversals whose working set exceeds the L1 target get their axes
//! partitioned into blocks. The memory-region estimate is cache-line aware:
//! axes with sub-cache-line strides extend a contiguous region, larger
//! strides multiply the number of distinct lines touched.

use crate::order::{axis_costs, index_order};
use crate::{BLOCK_MEMORY_SIZE, CACHE_LINE_SIZE};

/// Per-axis block sizes for a traversal.
///
/// `dims` and every stride vector must already be in iteration order
/// (innermost axis first). `elem_size` is the widest element size among the
/// participating views.
pub(crate) fn block_sizes(dims: &[usize], strides_list: &[Vec<isize>], elem_size: usize) -> Vec<usize> {
    if dims.is_empty() {
        return Vec::new();
    }

    let byte_strides: Vec<Vec<isize>> = strides_list
        .iter()
        .map(|s| s.iter().map(|&x| x * elem_size as isize).collect())
        .collect();
    let stride_orders: Vec<Vec<usize>> = byte_strides.iter().map(|s| index_order(s)).collect();
    let stride_refs: Vec<&[isize]> = strides_list.iter().map(|s| s.as_slice()).collect();
    let costs = axis_costs(&stride_refs);
    let byte_refs: Vec<&[isize]> = byte_strides.iter().map(|s| s.as_slice()).collect();
    let order_refs: Vec<&[usize]> = stride_orders.iter().map(|s| s.as_slice()).collect();

    shrink_blocks(dims, &costs, &byte_refs, &order_refs, BLOCK_MEMORY_SIZE)
}

fn shrink_blocks(
    dims: &[usize],
    costs: &[isize],
    byte_strides: &[&[isize]],
    stride_orders: &[&[usize]],
    budget: usize,
) -> Vec<usize> {
    let n = dims.len();
    if n == 0 {
        return Vec::new();
    }

    if memory_region(dims, byte_strides) <= budget {
        return dims.to_vec();
    }

    // When the leading axis is the smallest-stride axis of every view it
    // stays whole and the remaining axes absorb the shrinking.
    let min_order = stride_orders
        .iter()
        .filter_map(|o| o.iter().min().copied())
        .min()
        .unwrap_or(1);
    if !stride_orders.is_empty()
        && stride_orders.iter().all(|o| !o.is_empty() && o[0] == min_order)
    {
        let tail_strides: Vec<&[isize]> = byte_strides.iter().map(|s| &s[1..]).collect();
        let tail_orders: Vec<&[usize]> = stride_orders.iter().map(|o| &o[1..]).collect();
        let tail = shrink_blocks(&dims[1..], &costs[1..], &tail_strides, &tail_orders, budget);
        let mut blocks = Vec::with_capacity(n);
        blocks.push(dims[0]);
        blocks.extend(tail);
        return blocks;
    }

    // Every element on its own line: blocking cannot help.
    let min_stride = byte_strides
        .iter()
        .filter_map(|s| s.iter().map(|x| x.unsigned_abs()).min())
        .min()
        .unwrap_or(0);
    if min_stride > budget {
        return vec![1; n];
    }

    let mut blocks = dims.to_vec();
    while memory_region(&blocks, byte_strides) >= 2 * budget {
        let Some(i) = costliest_axis(&blocks, costs) else {
            break;
        };
        blocks[i] = blocks[i].div_ceil(2);
    }
    while memory_region(&blocks, byte_strides) > budget {
        let Some(i) = costliest_axis(&blocks, costs) else {
            break;
        };
        blocks[i] -= 1;
    }
    blocks
}

/// Estimate of the bytes of cache touched by one pass over `dims`.
fn memory_region(dims: &[usize], byte_strides: &[&[isize]]) -> usize {
    let mut total = 0usize;
    for strides in byte_strides {
        let mut contiguous_bytes = 0usize;
        let mut line_blocks = 1usize;
        for (&d, &s) in dims.iter().zip(strides.iter()) {
            let s = s.unsigned_abs();
            if s < CACHE_LINE_SIZE {
                contiguous_bytes += d.saturating_sub(1) * s;
            } else {
                line_blocks *= d;
            }
        }
        let lines = contiguous_bytes / CACHE_LINE_SIZE + 1;
        total += CACHE_LINE_SIZE * lines * line_blocks;
    }
    total
}

/// Last axis maximizing `(block - 1) * cost`, ignoring exhausted axes.
fn costliest_axis(blocks: &[usize], costs: &[isize]) -> Option<usize> {
    let mut best = None;
    let mut best_score = 0isize;
    for (i, (&b, &c)) in blocks.iter().zip(costs.iter()).enumerate() {
        if b <= 1 {
            continue;
        }
        let score = (b as isize - 1) * c;
        if score >= best_score {
            best_score = score;
            best = Some(i);
        }
    }
    best
}

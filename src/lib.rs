//! Dynamically-typed strided ndarray engine.
//!
//! This crate implements a strided-view data model over flat, dtype-tagged
//! buffers together with the generic machinery that operates on it:
//!
//! - [`NdArray`]: a lightweight view binding a shared buffer, dtype tag,
//!   shape, strides, offset, and memory-order flag
//! - [`assign`]: the element-wise copy/cast traversal engine, which picks
//!   between direct scans, a contiguous fast path, and cache-blocked nested
//!   loops with loop interchange
//! - [`broadcast_shapes`] / [`broadcast_to`]: NumPy-style shape broadcasting
//!   via zero-stride view expansion, without copying
//! - [`Dispatcher`]: arity-checked dtype dispatch tables mapping input type
//!   signatures to specialized kernels with a generic fallback
//! - [`Reduction`]: reduce-along-dims semantics with `keepdims` and an
//!   accumulation policy that widens narrow integer inputs before summing
//!
//! # Example
//!
//! ```rust
//! use ndstride::{assign, Buffer, DType, NdArray, Order, Scalar};
//!
//! // A reversed view over [1, 2, 3] ...
//! let x = NdArray::new(
//!     DType::Float64,
//!     Buffer::from_f64(vec![1.0, 2.0, 3.0]),
//!     vec![3],
//!     vec![-1],
//!     2,
//!     Order::RowMajor,
//! )
//! .unwrap();
//!
//! // ... assigned into a fresh array comes out as [3, 2, 1].
//! let y = NdArray::zeros(DType::Float64, &[3], Order::RowMajor);
//! assign(&x, &y).unwrap();
//! assert_eq!(y.get(&[0]).unwrap(), Scalar::Float64(3.0));
//! assert_eq!(y.get(&[2]).unwrap(), Scalar::Float64(1.0));
//! ```
//!
//! # Cache optimization
//!
//! Non-contiguous traversals sort loop axes so the smallest-stride axis of
//! the destination runs innermost, fuse axes that are contiguous in every
//! participating view, and tile the remaining loops so the working set per
//! inner pass fits in [`BLOCK_MEMORY_SIZE`].
//!
//! # Concurrency
//!
//! None. Every operation runs to completion on the calling thread; buffers
//! are shared between views with `Rc`, and aliased mutation through
//! overlapping views is the caller's responsibility.

mod array;
mod assign;
mod block;
mod broadcast;
mod buffer;
mod dispatch;
mod dtype;
mod ops;
mod order;
mod reduce;
mod scalar;
mod shape;
mod slice;

pub use array::{Mode, NdArray};
pub use assign::assign;
pub use broadcast::{broadcast_arrays, broadcast_shapes, broadcast_to};
pub use buffer::{Buffer, Element};
pub use dispatch::{Dispatcher, KernelFn};
pub use dtype::{
    accumulation_dtype, is_mostly_safe_cast, is_safe_cast, promote, resolve_output_dtype, DType,
    OutputPolicy, DEFAULT_DTYPE, DEFAULT_INDEX_DTYPE,
};
pub use ops::{copy, fill, max, sum};
pub use reduce::{fold_trailing, ReduceOptions, Reduction};
pub use scalar::Scalar;
pub use shape::{
    is_contiguous, iteration_order, minmax_view_buffer_index, next_cartesian_index,
    next_cartesian_index_assign, numel, shape_to_strides, strided_layout, strides_to_offset, Order,
};
pub use slice::{
    flatten_from, permute_dims, pop, reverse_dim, slice_from, slice_to, squeeze, transpose,
};

/// Block memory size for cache-blocked iteration (L1 data cache target).
///
/// Tiled traversals bound the per-pass working set to this many bytes.
pub const BLOCK_MEMORY_SIZE: usize = 32 * 1024;

/// Cache line size in bytes, used by the memory-region estimate that decides
/// whether a traversal needs tiling at all.
pub const CACHE_LINE_SIZE: usize = 64;

/// Errors surfaced by array construction, traversal, dispatch, and reduction.
#[derive(Debug, thiserror::Error)]
pub enum NdError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Shapes cannot be broadcast to a common shape.
    #[error("broadcast incompatible: {0:?} vs {1:?}")]
    BroadcastIncompatible(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    /// The same axis was listed more than once.
    #[error("duplicate axis {axis}")]
    DuplicateAxis { axis: usize },

    /// Stride array length doesn't match the shape.
    #[error("stride and shape length mismatch: {strides} vs {dims}")]
    StrideLengthMismatch { strides: usize, dims: usize },

    /// Element index out of bounds for a dimension.
    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds { index: isize, dim: usize, size: usize },

    /// The view's reachable index range escapes the underlying buffer.
    #[error("view exceeds buffer: reachable range [{min}, {max}] vs buffer length {len}")]
    ViewOutOfBounds { min: isize, max: isize, len: usize },

    /// Attempted to write through a read-only view.
    #[error("cannot write to a read-only array")]
    ReadOnly,

    /// The requested cast between dtypes is not defined.
    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: DType, to: DType },

    /// No common dtype exists for the given inputs.
    #[error("no common data type for {0} and {1}")]
    NoCommonDType(DType, DType),

    /// Output-dtype policy cannot be applied to the input dtype.
    #[error("policy {policy} does not apply to {dtype}")]
    PolicyMismatch { policy: &'static str, dtype: DType },

    /// Dispatcher invoked with the wrong number of array arguments.
    #[error("expected {expected} array arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Array argument dtype not in the accepted set for its position.
    #[error("argument {pos} has unsupported data type {dtype}")]
    ArgumentDType { pos: usize, dtype: DType },

    /// The buffer does not store elements of the array's dtype.
    #[error("buffer stores {actual}, expected {expected}")]
    BufferDType { expected: DType, actual: DType },

    /// Axes cannot be merged into one without copying.
    #[error("axes {from}.. are not stride-contiguous and cannot be flattened without copying")]
    NonFusableAxes { from: usize },

    /// Integer overflow while computing a buffer index.
    #[error("offset overflow while computing buffer index")]
    OffsetOverflow,
}

/// Result type for ndarray operations.
pub type Result<T> = std::result::Result<T, NdError>;

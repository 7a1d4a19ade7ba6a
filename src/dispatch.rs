//! Dtype dispatch tables.
//!
//! A [`Dispatcher`] maps fixed-arity dtype signatures to specialized kernel
//! functions, with one generic default that accepts any combination. Kernels
//! receive their array arguments as a flat slice — how many are read-only
//! inputs and how many are outputs is configuration, so the same machinery
//! serves unary maps, fills, and reductions alike.
//!
//! Resolution is an exact linear scan over enum signatures; a miss falls
//! back to the default kernel, never to a silent cast.

use crate::array::NdArray;
use crate::dtype::DType;
use crate::{NdError, Result};

/// A dispatchable kernel: operates on `nin` input views followed by `nout`
/// output views.
pub type KernelFn = fn(&[&NdArray]) -> Result<()>;

/// An arity-checked table of dtype-specialized kernels.
#[derive(Clone)]
pub struct Dispatcher {
    nin: usize,
    nout: usize,
    accepted: Vec<Option<Vec<DType>>>,
    entries: Vec<(Vec<DType>, KernelFn)>,
    default_fn: KernelFn,
}

impl Dispatcher {
    /// Create a table for kernels taking `nin` inputs and `nout` outputs,
    /// with `default_fn` as the generic fallback.
    pub fn new(nin: usize, nout: usize, default_fn: KernelFn) -> Dispatcher {
        Dispatcher {
            nin,
            nout,
            accepted: vec![None; nin + nout],
            entries: Vec::new(),
            default_fn,
        }
    }

    pub fn nin(&self) -> usize {
        self.nin
    }

    pub fn nout(&self) -> usize {
        self.nout
    }

    fn nargs(&self) -> usize {
        self.nin + self.nout
    }

    /// Restrict the dtypes accepted at argument position `pos`.
    ///
    /// Positions without a restriction accept every dtype.
    ///
    /// # Panics
    /// Panics if `pos` is not a valid argument position.
    pub fn accept(mut self, pos: usize, dtypes: &[DType]) -> Dispatcher {
        assert!(pos < self.nargs(), "argument position out of range");
        self.accepted[pos] = Some(dtypes.to_vec());
        self
    }

    /// Register a specialized kernel for an exact full-arity signature.
    ///
    /// # Panics
    /// Panics if the signature length does not match the arity.
    pub fn register(mut self, signature: &[DType], f: KernelFn) -> Dispatcher {
        assert_eq!(
            signature.len(),
            self.nargs(),
            "signature length must match arity"
        );
        self.entries.push((signature.to_vec(), f));
        self
    }

    /// Check one argument's dtype against the accepted set for its position.
    pub fn check_arg(&self, pos: usize, dtype: DType) -> Result<()> {
        match self.accepted.get(pos) {
            Some(Some(allowed)) if !allowed.contains(&dtype) => {
                Err(NdError::ArgumentDType { pos, dtype })
            }
            _ => Ok(()),
        }
    }

    /// Resolve the kernel for a dtype signature: exact match, else default.
    pub fn resolve(&self, signature: &[DType]) -> KernelFn {
        for (sig, f) in &self.entries {
            if sig == signature {
                return *f;
            }
        }
        self.default_fn
    }

    /// Validate arity and per-position dtypes, then call the resolved
    /// kernel.
    pub fn invoke(&self, args: &[&NdArray]) -> Result<()> {
        if args.len() != self.nargs() {
            return Err(NdError::ArityMismatch {
                expected: self.nargs(),
                actual: args.len(),
            });
        }
        for (pos, arg) in args.iter().enumerate() {
            self.check_arg(pos, arg.dtype())?;
        }
        let signature: Vec<DType> = args.iter().map(|a| a.dtype()).collect();
        (self.resolve(&signature))(args)
    }
}

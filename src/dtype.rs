//! Data type registry and promotion rules.
//!
//! The dtype set is closed. Promotion is a static, total function with a
//! `None` sentinel for "no common type"; cast compatibility comes in two
//! flavors, `safe` (value-preserving) and `mostly safe` (representable but
//! lossy widenings the reduction engine uses for accumulation). Output-dtype
//! policies are pure functions from input dtypes to a resolved output dtype.

use crate::scalar::Scalar;
use crate::{NdError, Result};

/// Default dtype used when a policy needs a concrete numeric target.
pub const DEFAULT_DTYPE: DType = DType::Float64;

/// Default dtype for index-valued outputs.
pub const DEFAULT_INDEX_DTYPE: DType = DType::Int32;

/// Closed element data type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float64,
    Float32,
    Complex128,
    Complex64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    /// Unsigned 8-bit with clamped (saturating) stores.
    Uint8Clamped,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    /// Heterogeneous dynamically-typed elements.
    Generic,
    /// Raw bytes.
    Binary,
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DType::Float64 => "float64",
            DType::Float32 => "float32",
            DType::Complex128 => "complex128",
            DType::Complex64 => "complex64",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Uint8 => "uint8",
            DType::Uint8Clamped => "uint8c",
            DType::Uint16 => "uint16",
            DType::Uint32 => "uint32",
            DType::Uint64 => "uint64",
            DType::Bool => "bool",
            DType::Generic => "generic",
            DType::Binary => "binary",
        };
        f.write_str(name)
    }
}

impl DType {
    /// Storage size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::Float64 => 8,
            DType::Float32 => 4,
            DType::Complex128 => 16,
            DType::Complex64 => 8,
            DType::Int8 => 1,
            DType::Int16 => 2,
            DType::Int32 => 4,
            DType::Int64 => 8,
            DType::Uint8 | DType::Uint8Clamped => 1,
            DType::Uint16 => 2,
            DType::Uint32 => 4,
            DType::Uint64 => 8,
            DType::Bool => 1,
            DType::Generic => std::mem::size_of::<Scalar>(),
            DType::Binary => 1,
        }
    }

    pub fn is_real_floating_point(self) -> bool {
        matches!(self, DType::Float64 | DType::Float32)
    }

    pub fn is_complex_floating_point(self) -> bool {
        matches!(self, DType::Complex128 | DType::Complex64)
    }

    pub fn is_floating_point(self) -> bool {
        self.is_real_floating_point() || self.is_complex_floating_point()
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(self, DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64)
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            DType::Uint8 | DType::Uint8Clamped | DType::Uint16 | DType::Uint32 | DType::Uint64
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_numeric(self) -> bool {
        self.is_floating_point() || self.is_integer()
    }

    /// Bit width of an integer dtype; zero for everything else.
    fn int_width(self) -> u32 {
        match self {
            DType::Int8 | DType::Uint8 | DType::Uint8Clamped => 8,
            DType::Int16 | DType::Uint16 => 16,
            DType::Int32 | DType::Uint32 => 32,
            DType::Int64 | DType::Uint64 => 64,
            _ => 0,
        }
    }

    fn signed_of_width(width: u32) -> Option<DType> {
        match width {
            8 => Some(DType::Int8),
            16 => Some(DType::Int16),
            32 => Some(DType::Int32),
            64 => Some(DType::Int64),
            _ => None,
        }
    }

    fn unsigned_of_width(width: u32) -> Option<DType> {
        match width {
            8 => Some(DType::Uint8),
            16 => Some(DType::Uint16),
            32 => Some(DType::Uint32),
            64 => Some(DType::Uint64),
            _ => None,
        }
    }
}

/// Promote two dtypes to their common type, or `None` when no common type
/// exists.
///
/// Widening is monotone: integers promote to wider integers or floats,
/// reals promote to complex when paired with complex, and `Generic`
/// absorbs everything. `Binary` promotes only with itself.
pub fn promote(a: DType, b: DType) -> Option<DType> {
    use DType::*;

    if a == b {
        return Some(a);
    }
    if a == Generic || b == Generic {
        return Some(Generic);
    }
    if a == Binary || b == Binary {
        return None;
    }
    // Bool defers to any numeric partner.
    if a == Bool {
        return Some(b);
    }
    if b == Bool {
        return Some(a);
    }

    // The clamped flavor promotes exactly like uint8; a mixed pair loses
    // the clamping semantics.
    let a = if a == Uint8Clamped { Uint8 } else { a };
    let b = if b == Uint8Clamped { Uint8 } else { b };
    if a == b {
        return Some(a);
    }

    if a.is_complex_floating_point() || b.is_complex_floating_point() {
        let (c, other) = if a.is_complex_floating_point() { (a, b) } else { (b, a) };
        if other == Complex128 || c == Complex128 {
            return Some(Complex128);
        }
        if other == Complex64 {
            return Some(Complex64);
        }
        // complex64 paired with a real type widens with the real lattice.
        return match promote(Float32, other)? {
            Float32 => Some(Complex64),
            _ => Some(Complex128),
        };
    }

    if a.is_real_floating_point() || b.is_real_floating_point() {
        let (f, other) = if a.is_real_floating_point() { (a, b) } else { (b, a) };
        if f == Float64 || other == Float64 {
            return Some(Float64);
        }
        if other == Float32 {
            return Some(Float32);
        }
        // float32 holds every integer of width <= 16 exactly.
        return if other.int_width() <= 16 {
            Some(Float32)
        } else {
            Some(Float64)
        };
    }

    // Integer/integer.
    let (wa, wb) = (a.int_width(), b.int_width());
    match (a.is_signed_integer(), b.is_signed_integer()) {
        (true, true) => DType::signed_of_width(wa.max(wb)),
        (false, false) => DType::unsigned_of_width(wa.max(wb)),
        _ => {
            let (ws, wu) = if a.is_signed_integer() { (wa, wb) } else { (wb, wa) };
            if ws > wu {
                DType::signed_of_width(ws)
            } else {
                // The smallest signed type holding the unsigned range.
                match DType::signed_of_width(ws.max(wu * 2)) {
                    Some(d) => Some(d),
                    None => Some(Float64),
                }
            }
        }
    }
}

/// Whether casting `from` to `to` preserves every representable value.
pub fn is_safe_cast(from: DType, to: DType) -> bool {
    use DType::*;

    if from == to || to == Generic {
        return true;
    }
    match from {
        Bool => to.is_numeric(),
        Binary => false,
        Generic => false,
        Uint8 | Uint8Clamped => matches!(
            to,
            Uint8 | Uint8Clamped
                | Uint16
                | Uint32
                | Uint64
                | Int16
                | Int32
                | Int64
                | Float32
                | Float64
                | Complex64
                | Complex128
        ),
        Uint16 => matches!(
            to,
            Uint32 | Uint64 | Int32 | Int64 | Float32 | Float64 | Complex64 | Complex128
        ),
        Uint32 => matches!(to, Uint64 | Int64 | Float64 | Complex128),
        Uint64 => false,
        Int8 => matches!(
            to,
            Int16 | Int32 | Int64 | Float32 | Float64 | Complex64 | Complex128
        ),
        Int16 => matches!(to, Int32 | Int64 | Float32 | Float64 | Complex64 | Complex128),
        Int32 => matches!(to, Int64 | Float64 | Complex128),
        Int64 => false,
        Float32 => matches!(to, Float64 | Complex64 | Complex128),
        Float64 => matches!(to, Complex128),
        Complex64 => matches!(to, Complex128),
        Complex128 => false,
    }
}

/// Whether casting `from` to `to` is safe, or a representable-but-lossy
/// widening acceptable for internal accumulation (e.g. `int64 → float64`).
pub fn is_mostly_safe_cast(from: DType, to: DType) -> bool {
    use DType::*;

    if is_safe_cast(from, to) {
        return true;
    }
    matches!(
        (from, to),
        (Int32, Float32)
            | (Int32, Complex64)
            | (Uint32, Float32)
            | (Uint32, Complex64)
            | (Int64, Float64)
            | (Int64, Complex128)
            | (Uint64, Float64)
            | (Uint64, Complex128)
    )
}

/// The accumulator dtype used to guard reductions against overflow.
///
/// Sub-32-bit integers widen to the 32-bit integer of matching signedness;
/// wider integers and real floats accumulate in themselves; complex inputs
/// accumulate in `complex128`; `bool` counts in the default real float.
pub fn accumulation_dtype(dtype: DType) -> Result<DType> {
    use DType::*;
    match dtype {
        Int8 | Int16 => Ok(Int32),
        Uint8 | Uint8Clamped | Uint16 => Ok(Uint32),
        Int32 | Int64 | Uint32 | Uint64 => Ok(dtype),
        Float32 | Float64 => Ok(dtype),
        Complex64 | Complex128 => Ok(Complex128),
        Bool => Ok(DEFAULT_DTYPE),
        Generic => Ok(Generic),
        Binary => Err(NdError::PolicyMismatch {
            policy: "accumulation",
            dtype,
        }),
    }
}

/// Output-dtype resolution strategy.
///
/// Each variant is a pure rule mapping input dtypes to the dtype an
/// operation's output should take. The category policies carry an
/// `and_generic` flag controlling whether `generic` inputs pass through
/// unchanged or get rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// All inputs must share one dtype; the output takes it.
    Same,
    /// Apply the promotion table across inputs.
    Promoted,
    /// Fixed target dtype.
    Fixed(DType),
    Boolean,
    Default,
    DefaultIndex,
    FloatingPoint { and_generic: bool },
    RealFloatingPoint { and_generic: bool },
    ComplexFloatingPoint { and_generic: bool },
    Numeric { and_generic: bool },
    Integer { and_generic: bool },
    SignedInteger { and_generic: bool },
    UnsignedInteger { and_generic: bool },
    /// Widen to an overflow-resistant accumulator (see
    /// [`accumulation_dtype`]).
    Accumulation,
}

impl OutputPolicy {
    fn name(&self) -> &'static str {
        match self {
            OutputPolicy::Same => "same",
            OutputPolicy::Promoted => "promoted",
            OutputPolicy::Fixed(_) => "fixed",
            OutputPolicy::Boolean => "boolean",
            OutputPolicy::Default => "default",
            OutputPolicy::DefaultIndex => "default_index",
            OutputPolicy::FloatingPoint { .. } => "floating_point",
            OutputPolicy::RealFloatingPoint { .. } => "real_floating_point",
            OutputPolicy::ComplexFloatingPoint { .. } => "complex_floating_point",
            OutputPolicy::Numeric { .. } => "numeric",
            OutputPolicy::Integer { .. } => "integer",
            OutputPolicy::SignedInteger { .. } => "signed_integer",
            OutputPolicy::UnsignedInteger { .. } => "unsigned_integer",
            OutputPolicy::Accumulation => "accumulation",
        }
    }

    fn mismatch(&self, dtype: DType) -> NdError {
        NdError::PolicyMismatch {
            policy: self.name(),
            dtype,
        }
    }
}

/// Resolve the output dtype for a set of input dtypes under a policy.
///
/// Input-dependent policies first promote the inputs to a single dtype and
/// then apply the policy's category rule to the promoted type.
///
/// # Panics
/// Panics when `dtypes` is empty and the policy depends on its inputs.
pub fn resolve_output_dtype(dtypes: &[DType], policy: &OutputPolicy) -> Result<DType> {
    use DType::*;

    match policy {
        OutputPolicy::Fixed(dt) => return Ok(*dt),
        OutputPolicy::Boolean => return Ok(Bool),
        OutputPolicy::Default => return Ok(DEFAULT_DTYPE),
        OutputPolicy::DefaultIndex => return Ok(DEFAULT_INDEX_DTYPE),
        OutputPolicy::Same => {
            let first = dtypes[0];
            for &dt in &dtypes[1..] {
                if dt != first {
                    return Err(NdError::NoCommonDType(first, dt));
                }
            }
            return Ok(first);
        }
        _ => {}
    }

    let mut promoted = dtypes[0];
    for &dt in &dtypes[1..] {
        promoted = promote(promoted, dt).ok_or(NdError::NoCommonDType(promoted, dt))?;
    }

    let generic_ok = |flag: bool| -> Result<DType> {
        if flag {
            Ok(Generic)
        } else {
            Err(policy.mismatch(Generic))
        }
    };

    match policy {
        OutputPolicy::Promoted => Ok(promoted),
        OutputPolicy::Accumulation => accumulation_dtype(promoted),
        OutputPolicy::FloatingPoint { and_generic } => match promoted {
            d if d.is_floating_point() => Ok(d),
            Generic => generic_ok(*and_generic),
            Binary => Err(policy.mismatch(promoted)),
            _ => Ok(DEFAULT_DTYPE),
        },
        OutputPolicy::RealFloatingPoint { and_generic } => match promoted {
            d if d.is_real_floating_point() => Ok(d),
            Generic => generic_ok(*and_generic),
            d if d.is_complex_floating_point() => Err(policy.mismatch(d)),
            Binary => Err(policy.mismatch(promoted)),
            _ => Ok(DEFAULT_DTYPE),
        },
        OutputPolicy::ComplexFloatingPoint { and_generic } => match promoted {
            d if d.is_complex_floating_point() => Ok(d),
            Float32 => Ok(Complex64),
            Generic => generic_ok(*and_generic),
            Binary => Err(policy.mismatch(promoted)),
            _ => Ok(Complex128),
        },
        OutputPolicy::Numeric { and_generic } => match promoted {
            d if d.is_numeric() => Ok(d),
            Generic => generic_ok(*and_generic),
            Bool => Ok(DEFAULT_DTYPE),
            _ => Err(policy.mismatch(promoted)),
        },
        OutputPolicy::Integer { and_generic } => match promoted {
            d if d.is_integer() => Ok(d),
            Generic => generic_ok(*and_generic),
            Bool => Ok(DEFAULT_INDEX_DTYPE),
            _ => Err(policy.mismatch(promoted)),
        },
        OutputPolicy::SignedInteger { and_generic } => match promoted {
            d if d.is_signed_integer() => Ok(d),
            d if d.is_unsigned_integer() => {
                DType::signed_of_width(d.int_width()).ok_or_else(|| policy.mismatch(d))
            }
            Generic => generic_ok(*and_generic),
            Bool => Ok(DEFAULT_INDEX_DTYPE),
            _ => Err(policy.mismatch(promoted)),
        },
        OutputPolicy::UnsignedInteger { and_generic } => match promoted {
            d if d.is_unsigned_integer() => Ok(d),
            d if d.is_signed_integer() => {
                DType::unsigned_of_width(d.int_width()).ok_or_else(|| policy.mismatch(d))
            }
            Generic => generic_ok(*and_generic),
            Bool => Ok(DType::Uint32),
            _ => Err(policy.mismatch(promoted)),
        },
        // Handled above.
        _ => unreachable!(),
    }
}

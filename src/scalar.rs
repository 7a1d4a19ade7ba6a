//! Dynamically-typed element values.
//!
//! A [`Scalar`] holds one element of any concrete dtype. It is the currency
//! of the storage-agnostic accessor path: `generic` buffers store `Scalar`s
//! directly, and every traversal that has no typed kernel reads, casts, and
//! writes through this type.

use crate::dtype::DType;
use crate::Result;
use num_complex::{Complex32, Complex64};

/// One element of any concrete dtype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Float64(f64),
    Float32(f32),
    Complex128(Complex64),
    Complex64(Complex32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
}

/// Exact intermediate used by [`Scalar::cast`] so 64-bit integers never
/// round-trip through `f64`.
enum Num {
    F(f64),
    C(Complex64),
    I(i64),
    U(u64),
    B(bool),
}

impl Scalar {
    /// The natural dtype of this value's variant.
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Float64(_) => DType::Float64,
            Scalar::Float32(_) => DType::Float32,
            Scalar::Complex128(_) => DType::Complex128,
            Scalar::Complex64(_) => DType::Complex64,
            Scalar::Int8(_) => DType::Int8,
            Scalar::Int16(_) => DType::Int16,
            Scalar::Int32(_) => DType::Int32,
            Scalar::Int64(_) => DType::Int64,
            Scalar::Uint8(_) => DType::Uint8,
            Scalar::Uint16(_) => DType::Uint16,
            Scalar::Uint32(_) => DType::Uint32,
            Scalar::Uint64(_) => DType::Uint64,
            Scalar::Bool(_) => DType::Bool,
        }
    }

    /// The additive identity of a dtype.
    pub fn zero(dtype: DType) -> Scalar {
        match dtype {
            DType::Float64 => Scalar::Float64(0.0),
            DType::Float32 => Scalar::Float32(0.0),
            DType::Complex128 => Scalar::Complex128(Complex64::new(0.0, 0.0)),
            DType::Complex64 => Scalar::Complex64(Complex32::new(0.0, 0.0)),
            DType::Int8 => Scalar::Int8(0),
            DType::Int16 => Scalar::Int16(0),
            DType::Int32 => Scalar::Int32(0),
            DType::Int64 => Scalar::Int64(0),
            DType::Uint8 | DType::Uint8Clamped | DType::Binary => Scalar::Uint8(0),
            DType::Uint16 => Scalar::Uint16(0),
            DType::Uint32 => Scalar::Uint32(0),
            DType::Uint64 => Scalar::Uint64(0),
            DType::Bool | DType::Generic => Scalar::Bool(false),
        }
    }

    fn to_num(self) -> Num {
        match self {
            Scalar::Float64(v) => Num::F(v),
            Scalar::Float32(v) => Num::F(v as f64),
            Scalar::Complex128(v) => Num::C(v),
            Scalar::Complex64(v) => Num::C(Complex64::new(v.re as f64, v.im as f64)),
            Scalar::Int8(v) => Num::I(v as i64),
            Scalar::Int16(v) => Num::I(v as i64),
            Scalar::Int32(v) => Num::I(v as i64),
            Scalar::Int64(v) => Num::I(v),
            Scalar::Uint8(v) => Num::U(v as u64),
            Scalar::Uint16(v) => Num::U(v as u64),
            Scalar::Uint32(v) => Num::U(v as u64),
            Scalar::Uint64(v) => Num::U(v),
            Scalar::Bool(v) => Num::B(v),
        }
    }

    /// Cast this value to another dtype.
    ///
    /// Real values gain a zero imaginary part when cast to complex; complex
    /// values keep only their real component when cast to a real target.
    /// Integer narrowing follows native conversion (two's-complement
    /// wrapping), float-to-integer saturates, and `uint8c` rounds floats and
    /// saturates to `[0, 255]`. Casting to `generic` is the identity.
    pub fn cast(self, to: DType) -> Result<Scalar> {
        if to == DType::Generic {
            return Ok(self);
        }
        let num = self.to_num();
        let out = match to {
            DType::Float64 => Scalar::Float64(match num {
                Num::F(v) => v,
                Num::C(c) => c.re,
                Num::I(v) => v as f64,
                Num::U(v) => v as f64,
                Num::B(v) => v as u8 as f64,
            }),
            DType::Float32 => Scalar::Float32(match num {
                Num::F(v) => v as f32,
                Num::C(c) => c.re as f32,
                Num::I(v) => v as f32,
                Num::U(v) => v as f32,
                Num::B(v) => v as u8 as f32,
            }),
            DType::Complex128 => Scalar::Complex128(match num {
                Num::F(v) => Complex64::new(v, 0.0),
                Num::C(c) => c,
                Num::I(v) => Complex64::new(v as f64, 0.0),
                Num::U(v) => Complex64::new(v as f64, 0.0),
                Num::B(v) => Complex64::new(v as u8 as f64, 0.0),
            }),
            DType::Complex64 => Scalar::Complex64(match num {
                Num::F(v) => Complex32::new(v as f32, 0.0),
                Num::C(c) => Complex32::new(c.re as f32, c.im as f32),
                Num::I(v) => Complex32::new(v as f32, 0.0),
                Num::U(v) => Complex32::new(v as f32, 0.0),
                Num::B(v) => Complex32::new(v as u8 as f32, 0.0),
            }),
            DType::Int8 => Scalar::Int8(match num {
                Num::F(v) => v as i8,
                Num::C(c) => c.re as i8,
                Num::I(v) => v as i8,
                Num::U(v) => v as i8,
                Num::B(v) => v as i8,
            }),
            DType::Int16 => Scalar::Int16(match num {
                Num::F(v) => v as i16,
                Num::C(c) => c.re as i16,
                Num::I(v) => v as i16,
                Num::U(v) => v as i16,
                Num::B(v) => v as i16,
            }),
            DType::Int32 => Scalar::Int32(match num {
                Num::F(v) => v as i32,
                Num::C(c) => c.re as i32,
                Num::I(v) => v as i32,
                Num::U(v) => v as i32,
                Num::B(v) => v as i32,
            }),
            DType::Int64 => Scalar::Int64(match num {
                Num::F(v) => v as i64,
                Num::C(c) => c.re as i64,
                Num::I(v) => v,
                Num::U(v) => v as i64,
                Num::B(v) => v as i64,
            }),
            DType::Uint8 | DType::Binary => Scalar::Uint8(match num {
                Num::F(v) => v as u8,
                Num::C(c) => c.re as u8,
                Num::I(v) => v as u8,
                Num::U(v) => v as u8,
                Num::B(v) => v as u8,
            }),
            DType::Uint8Clamped => Scalar::Uint8(match num {
                Num::F(v) => v.round().clamp(0.0, 255.0) as u8,
                Num::C(c) => c.re.round().clamp(0.0, 255.0) as u8,
                Num::I(v) => v.clamp(0, 255) as u8,
                Num::U(v) => v.min(255) as u8,
                Num::B(v) => v as u8,
            }),
            DType::Uint16 => Scalar::Uint16(match num {
                Num::F(v) => v as u16,
                Num::C(c) => c.re as u16,
                Num::I(v) => v as u16,
                Num::U(v) => v as u16,
                Num::B(v) => v as u16,
            }),
            DType::Uint32 => Scalar::Uint32(match num {
                Num::F(v) => v as u32,
                Num::C(c) => c.re as u32,
                Num::I(v) => v as u32,
                Num::U(v) => v as u32,
                Num::B(v) => v as u32,
            }),
            DType::Uint64 => Scalar::Uint64(match num {
                Num::F(v) => v as u64,
                Num::C(c) => c.re as u64,
                Num::I(v) => v as u64,
                Num::U(v) => v,
                Num::B(v) => v as u64,
            }),
            DType::Bool => Scalar::Bool(match num {
                Num::F(v) => v != 0.0,
                Num::C(c) => c.re != 0.0 || c.im != 0.0,
                Num::I(v) => v != 0,
                Num::U(v) => v != 0,
                Num::B(v) => v,
            }),
            DType::Generic => unreachable!(),
        };
        Ok(out)
    }

}

macro_rules! impl_scalar_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Scalar {
                    Scalar::$variant(v)
                }
            }
        )*
    };
}

impl_scalar_from!(
    f64 => Float64,
    f32 => Float32,
    Complex64 => Complex128,
    Complex32 => Complex64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_to_complex_zero_imag() {
        let c = Scalar::Float64(2.5).cast(DType::Complex128).unwrap();
        assert_eq!(c, Scalar::Complex128(Complex64::new(2.5, 0.0)));
    }

    #[test]
    fn test_complex_to_real_truncates() {
        let r = Scalar::Complex128(Complex64::new(3.0, 4.0))
            .cast(DType::Float64)
            .unwrap();
        assert_eq!(r, Scalar::Float64(3.0));
    }

    #[test]
    fn test_integer_wrapping() {
        assert_eq!(Scalar::Int16(300).cast(DType::Uint8).unwrap(), Scalar::Uint8(44));
        assert_eq!(Scalar::Int16(-1).cast(DType::Uint8).unwrap(), Scalar::Uint8(255));
    }

    #[test]
    fn test_clamped_store() {
        assert_eq!(
            Scalar::Int16(300).cast(DType::Uint8Clamped).unwrap(),
            Scalar::Uint8(255)
        );
        assert_eq!(
            Scalar::Int16(-5).cast(DType::Uint8Clamped).unwrap(),
            Scalar::Uint8(0)
        );
        assert_eq!(
            Scalar::Float64(2.6).cast(DType::Uint8Clamped).unwrap(),
            Scalar::Uint8(3)
        );
    }

    #[test]
    fn test_float_to_int_saturates() {
        assert_eq!(
            Scalar::Float64(1e10).cast(DType::Int8).unwrap(),
            Scalar::Int8(127)
        );
    }

    #[test]
    fn test_bool_casts() {
        assert_eq!(Scalar::Bool(true).cast(DType::Float64).unwrap(), Scalar::Float64(1.0));
        assert_eq!(Scalar::Int32(0).cast(DType::Bool).unwrap(), Scalar::Bool(false));
        assert_eq!(
            Scalar::Complex128(Complex64::new(0.0, 2.0)).cast(DType::Bool).unwrap(),
            Scalar::Bool(true)
        );
    }

    #[test]
    fn test_large_int_exact() {
        // i64 values beyond 2^53 keep their identity through int casts.
        let big = (1i64 << 60) + 7;
        assert_eq!(Scalar::Int64(big).cast(DType::Int64).unwrap(), Scalar::Int64(big));
        assert_eq!(
            Scalar::Int64(big).cast(DType::Uint64).unwrap(),
            Scalar::Uint64(big as u64)
        );
    }

    #[test]
    fn test_generic_identity() {
        let v = Scalar::Int8(-3);
        assert_eq!(v.cast(DType::Generic).unwrap(), v);
    }
}

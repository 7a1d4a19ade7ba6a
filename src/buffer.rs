//! Dtype-tagged flat storage and the accessor abstraction.
//!
//! A [`Buffer`] owns the contiguous elements a set of views alias. Higher
//! layers never special-case the storage representation: typed kernels
//! project a buffer to a concrete element slice through [`Element`]
//! (monomorphized, zero-overhead), and everything else goes through the
//! dynamic [`Buffer::get`]/[`Buffer::set`] accessor pair, which speaks
//! [`Scalar`].

use crate::dtype::DType;
use crate::scalar::Scalar;
use crate::Result;
use num_complex::{Complex32, Complex64};

/// Flat element storage for one dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Complex128(Vec<Complex64>),
    Complex64(Vec<Complex32>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint8Clamped(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Bool(Vec<bool>),
    Generic(Vec<Scalar>),
    Binary(Vec<u8>),
}

impl Buffer {
    /// Allocate a zero-filled buffer of `len` elements.
    pub fn zeros(dtype: DType, len: usize) -> Buffer {
        match dtype {
            DType::Float64 => Buffer::Float64(vec![0.0; len]),
            DType::Float32 => Buffer::Float32(vec![0.0; len]),
            DType::Complex128 => Buffer::Complex128(vec![Complex64::new(0.0, 0.0); len]),
            DType::Complex64 => Buffer::Complex64(vec![Complex32::new(0.0, 0.0); len]),
            DType::Int8 => Buffer::Int8(vec![0; len]),
            DType::Int16 => Buffer::Int16(vec![0; len]),
            DType::Int32 => Buffer::Int32(vec![0; len]),
            DType::Int64 => Buffer::Int64(vec![0; len]),
            DType::Uint8 => Buffer::Uint8(vec![0; len]),
            DType::Uint8Clamped => Buffer::Uint8Clamped(vec![0; len]),
            DType::Uint16 => Buffer::Uint16(vec![0; len]),
            DType::Uint32 => Buffer::Uint32(vec![0; len]),
            DType::Uint64 => Buffer::Uint64(vec![0; len]),
            DType::Bool => Buffer::Bool(vec![false; len]),
            DType::Generic => Buffer::Generic(vec![Scalar::Float64(0.0); len]),
            DType::Binary => Buffer::Binary(vec![0; len]),
        }
    }

    /// The dtype whose elements this buffer stores.
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::Float64(_) => DType::Float64,
            Buffer::Float32(_) => DType::Float32,
            Buffer::Complex128(_) => DType::Complex128,
            Buffer::Complex64(_) => DType::Complex64,
            Buffer::Int8(_) => DType::Int8,
            Buffer::Int16(_) => DType::Int16,
            Buffer::Int32(_) => DType::Int32,
            Buffer::Int64(_) => DType::Int64,
            Buffer::Uint8(_) => DType::Uint8,
            Buffer::Uint8Clamped(_) => DType::Uint8Clamped,
            Buffer::Uint16(_) => DType::Uint16,
            Buffer::Uint32(_) => DType::Uint32,
            Buffer::Uint64(_) => DType::Uint64,
            Buffer::Bool(_) => DType::Bool,
            Buffer::Generic(_) => DType::Generic,
            Buffer::Binary(_) => DType::Binary,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            Buffer::Float64(v) => v.len(),
            Buffer::Float32(v) => v.len(),
            Buffer::Complex128(v) => v.len(),
            Buffer::Complex64(v) => v.len(),
            Buffer::Int8(v) => v.len(),
            Buffer::Int16(v) => v.len(),
            Buffer::Int32(v) => v.len(),
            Buffer::Int64(v) => v.len(),
            Buffer::Uint8(v) | Buffer::Uint8Clamped(v) | Buffer::Binary(v) => v.len(),
            Buffer::Uint16(v) => v.len(),
            Buffer::Uint32(v) => v.len(),
            Buffer::Uint64(v) => v.len(),
            Buffer::Bool(v) => v.len(),
            Buffer::Generic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dynamic getter: read the element at `i` as a [`Scalar`].
    ///
    /// # Panics
    /// Panics if `i` is out of bounds, like slice indexing.
    pub fn get(&self, i: usize) -> Scalar {
        match self {
            Buffer::Float64(v) => Scalar::Float64(v[i]),
            Buffer::Float32(v) => Scalar::Float32(v[i]),
            Buffer::Complex128(v) => Scalar::Complex128(v[i]),
            Buffer::Complex64(v) => Scalar::Complex64(v[i]),
            Buffer::Int8(v) => Scalar::Int8(v[i]),
            Buffer::Int16(v) => Scalar::Int16(v[i]),
            Buffer::Int32(v) => Scalar::Int32(v[i]),
            Buffer::Int64(v) => Scalar::Int64(v[i]),
            Buffer::Uint8(v) | Buffer::Uint8Clamped(v) | Buffer::Binary(v) => Scalar::Uint8(v[i]),
            Buffer::Uint16(v) => Scalar::Uint16(v[i]),
            Buffer::Uint32(v) => Scalar::Uint32(v[i]),
            Buffer::Uint64(v) => Scalar::Uint64(v[i]),
            Buffer::Bool(v) => Scalar::Bool(v[i]),
            Buffer::Generic(v) => v[i],
        }
    }

    /// Dynamic setter: cast `value` to this buffer's dtype and store it at
    /// `i`. Stores into a clamped buffer saturate; stores into a `generic`
    /// buffer keep the value unchanged.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds, like slice indexing.
    pub fn set(&mut self, i: usize, value: Scalar) -> Result<()> {
        let dtype = self.dtype();
        if let Buffer::Generic(v) = self {
            v[i] = value;
            return Ok(());
        }
        let cast = value.cast(dtype)?;
        match (self, cast) {
            (Buffer::Float64(v), Scalar::Float64(x)) => v[i] = x,
            (Buffer::Float32(v), Scalar::Float32(x)) => v[i] = x,
            (Buffer::Complex128(v), Scalar::Complex128(x)) => v[i] = x,
            (Buffer::Complex64(v), Scalar::Complex64(x)) => v[i] = x,
            (Buffer::Int8(v), Scalar::Int8(x)) => v[i] = x,
            (Buffer::Int16(v), Scalar::Int16(x)) => v[i] = x,
            (Buffer::Int32(v), Scalar::Int32(x)) => v[i] = x,
            (Buffer::Int64(v), Scalar::Int64(x)) => v[i] = x,
            (Buffer::Uint8(v), Scalar::Uint8(x))
            | (Buffer::Uint8Clamped(v), Scalar::Uint8(x))
            | (Buffer::Binary(v), Scalar::Uint8(x)) => v[i] = x,
            (Buffer::Uint16(v), Scalar::Uint16(x)) => v[i] = x,
            (Buffer::Uint32(v), Scalar::Uint32(x)) => v[i] = x,
            (Buffer::Uint64(v), Scalar::Uint64(x)) => v[i] = x,
            (Buffer::Bool(v), Scalar::Bool(x)) => v[i] = x,
            _ => unreachable!("cast returned a mismatched variant"),
        }
        Ok(())
    }

    /// Convenience constructor used throughout the tests and docs.
    pub fn from_f64(values: Vec<f64>) -> Buffer {
        Buffer::Float64(values)
    }
}

macro_rules! impl_buffer_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$t>> for Buffer {
                fn from(v: Vec<$t>) -> Buffer {
                    Buffer::$variant(v)
                }
            }
        )*
    };
}

impl_buffer_from!(
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

/// Concrete element types typed kernels can be monomorphized over.
///
/// `from_buffer` projects a buffer to a slice of `Self` when the storage
/// representation matches; the `u8` implementation accepts all three
/// u8-backed dtypes (`uint8`, `uint8c`, `binary`).
pub trait Element: Copy + 'static {
    /// The natural dtype of this element type.
    const DTYPE: DType;

    fn from_buffer(buf: &Buffer) -> Option<&[Self]>;
    fn from_buffer_mut(buf: &mut Buffer) -> Option<&mut [Self]>;
    fn to_scalar(self) -> Scalar;
}

macro_rules! impl_element {
    ($t:ty, $dtype:expr, $variant:ident, $scalar:ident) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn from_buffer(buf: &Buffer) -> Option<&[Self]> {
                match buf {
                    Buffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_buffer_mut(buf: &mut Buffer) -> Option<&mut [Self]> {
                match buf {
                    Buffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn to_scalar(self) -> Scalar {
                Scalar::$scalar(self)
            }
        }
    };
}

impl_element!(f64, DType::Float64, Float64, Float64);
impl_element!(f32, DType::Float32, Float32, Float32);
impl_element!(Complex64, DType::Complex128, Complex128, Complex128);
impl_element!(Complex32, DType::Complex64, Complex64, Complex64);
impl_element!(i8, DType::Int8, Int8, Int8);
impl_element!(i16, DType::Int16, Int16, Int16);
impl_element!(i32, DType::Int32, Int32, Int32);
impl_element!(i64, DType::Int64, Int64, Int64);
impl_element!(u16, DType::Uint16, Uint16, Uint16);
impl_element!(u32, DType::Uint32, Uint32, Uint32);
impl_element!(u64, DType::Uint64, Uint64, Uint64);
impl_element!(bool, DType::Bool, Bool, Bool);

impl Element for u8 {
    const DTYPE: DType = DType::Uint8;

    fn from_buffer(buf: &Buffer) -> Option<&[Self]> {
        match buf {
            Buffer::Uint8(v) | Buffer::Uint8Clamped(v) | Buffer::Binary(v) => Some(v),
            _ => None,
        }
    }

    fn from_buffer_mut(buf: &mut Buffer) -> Option<&mut [Self]> {
        match buf {
            Buffer::Uint8(v) | Buffer::Uint8Clamped(v) | Buffer::Binary(v) => Some(v),
            _ => None,
        }
    }

    fn to_scalar(self) -> Scalar {
        Scalar::Uint8(self)
    }
}

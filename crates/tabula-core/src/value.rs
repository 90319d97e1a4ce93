//! Value types a numeric table can store.
//!
//! Tables are polymorphic over their storage type and callers request
//! blocks in a possibly different type. [`NumericValue`] is implemented
//! for `f32`, `f64` and `i32` only; the type-erased [`AnySlice`],
//! [`AnySliceMut`] and [`AnyVec`] let a table hand out a zero-copy view
//! when the requested type equals its storage type, without `unsafe` or
//! `TypeId` comparisons.

use std::fmt;

/// Runtime tag of a [`NumericValue`] type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit IEEE-754 float.
    F32,
    /// 64-bit IEEE-754 float.
    F64,
    /// 32-bit signed integer.
    I32,
}

impl DataType {
    /// Size of one value in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether values of this type can be NaN or infinite.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::I32 => "i32",
        })
    }
}

/// A shared slice of one of the supported value types.
#[derive(Clone, Copy, Debug)]
pub enum AnySlice<'a> {
    /// `f32` values.
    F32(&'a [f32]),
    /// `f64` values.
    F64(&'a [f64]),
    /// `i32` values.
    I32(&'a [i32]),
}

impl AnySlice<'_> {
    /// Value type of the slice.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Self::F32(s) => s.len(),
            Self::F64(s) => s.len(),
            Self::I32(s) => s.len(),
        }
    }

    /// Returns `true` if the slice holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A mutable slice of one of the supported value types.
#[derive(Debug)]
pub enum AnySliceMut<'a> {
    /// `f32` values.
    F32(&'a mut [f32]),
    /// `f64` values.
    F64(&'a mut [f64]),
    /// `i32` values.
    I32(&'a mut [i32]),
}

impl AnySliceMut<'_> {
    /// Value type of the slice.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    /// Reborrow as a shared slice.
    pub fn as_any_slice(&self) -> AnySlice<'_> {
        match self {
            Self::F32(s) => AnySlice::F32(s),
            Self::F64(s) => AnySlice::F64(s),
            Self::I32(s) => AnySlice::I32(s),
        }
    }

    /// Reborrow mutably for a shorter lifetime.
    pub fn reborrow(&mut self) -> AnySliceMut<'_> {
        match self {
            Self::F32(s) => AnySliceMut::F32(s),
            Self::F64(s) => AnySliceMut::F64(s),
            Self::I32(s) => AnySliceMut::I32(s),
        }
    }
}

/// An owned buffer of one of the supported value types.
#[derive(Clone, Debug, PartialEq)]
pub enum AnyVec {
    /// `f32` values.
    F32(Vec<f32>),
    /// `f64` values.
    F64(Vec<f64>),
    /// `i32` values.
    I32(Vec<i32>),
}

impl AnyVec {
    /// Value type of the buffer.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.as_any_slice().len()
    }

    /// Returns `true` if the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow as a shared type-erased slice.
    pub fn as_any_slice(&self) -> AnySlice<'_> {
        match self {
            Self::F32(v) => AnySlice::F32(v),
            Self::F64(v) => AnySlice::F64(v),
            Self::I32(v) => AnySlice::I32(v),
        }
    }

    /// Borrow as a mutable type-erased slice.
    pub fn as_any_slice_mut(&mut self) -> AnySliceMut<'_> {
        match self {
            Self::F32(v) => AnySliceMut::F32(v),
            Self::F64(v) => AnySliceMut::F64(v),
            Self::I32(v) => AnySliceMut::I32(v),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for i32 {}
}

/// A value type storable in a numeric table.
///
/// Conversions go through `f64`, which represents every `f32` and `i32`
/// exactly. Float-to-integer conversion truncates toward zero and
/// saturates (NaN maps to 0), matching Rust's `as` semantics.
pub trait NumericValue:
    sealed::Sealed
    + Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
{
    /// Runtime tag of this type.
    const DATA_TYPE: DataType;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`.
    fn from_f64(v: f64) -> Self;

    /// Whether the value is neither NaN nor infinite.
    fn is_finite_value(self) -> bool;

    /// Erase the type of a shared slice.
    fn into_any(slice: &[Self]) -> AnySlice<'_>;

    /// Recover a typed shared slice; `None` on type mismatch.
    fn from_any(any: AnySlice<'_>) -> Option<&[Self]>;

    /// Erase the type of a mutable slice.
    fn into_any_mut(slice: &mut [Self]) -> AnySliceMut<'_>;

    /// Recover a typed mutable slice; `None` on type mismatch.
    ///
    /// Use [`AnySliceMut::reborrow`] to keep the erased slice.
    fn from_any_mut(any: AnySliceMut<'_>) -> Option<&mut [Self]>;

    /// Wrap an owned buffer.
    fn into_any_vec(v: Vec<Self>) -> AnyVec;

    /// Borrow the typed contents of an owned buffer; `None` on type mismatch.
    fn vec_ref(any: &AnyVec) -> Option<&[Self]>;

    /// Mutably borrow the typed contents of an owned buffer.
    fn vec_mut(any: &mut AnyVec) -> Option<&mut [Self]>;
}

macro_rules! impl_numeric_value {
    ($ty:ty, $variant:ident, $finite:expr) => {
        impl NumericValue for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn is_finite_value(self) -> bool {
                let f: fn($ty) -> bool = $finite;
                f(self)
            }

            fn into_any(slice: &[Self]) -> AnySlice<'_> {
                AnySlice::$variant(slice)
            }

            fn from_any(any: AnySlice<'_>) -> Option<&[Self]> {
                match any {
                    AnySlice::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn into_any_mut(slice: &mut [Self]) -> AnySliceMut<'_> {
                AnySliceMut::$variant(slice)
            }

            fn from_any_mut(any: AnySliceMut<'_>) -> Option<&mut [Self]> {
                match any {
                    AnySliceMut::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn into_any_vec(v: Vec<Self>) -> AnyVec {
                AnyVec::$variant(v)
            }

            fn vec_ref(any: &AnyVec) -> Option<&[Self]> {
                match any {
                    AnyVec::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn vec_mut(any: &mut AnyVec) -> Option<&mut [Self]> {
                match any {
                    AnyVec::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_numeric_value!(f32, F32, |v| v.is_finite());
impl_numeric_value!(f64, F64, |v| v.is_finite());
impl_numeric_value!(i32, I32, |_| true);

/// Convert `src` into `dst` element-wise through `f64`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn convert_slice<S: NumericValue, T: NumericValue>(src: &[S], dst: &mut [T]) {
    assert_eq!(src.len(), dst.len(), "convert_slice length mismatch");
    if let Some(same) = T::from_any(S::into_any(src)) {
        dst.copy_from_slice(same);
        return;
    }
    for (d, s) in dst.iter_mut().zip(src) {
        *d = T::from_f64(s.to_f64());
    }
}

/// Convert the whole of `src` into `dst`, dispatching on the runtime types.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn convert_any<T: NumericValue>(src: AnySlice<'_>, dst: &mut [T]) {
    match src {
        AnySlice::F32(s) => convert_slice(s, dst),
        AnySlice::F64(s) => convert_slice(s, dst),
        AnySlice::I32(s) => convert_slice(s, dst),
    }
}

/// Convert typed values into a type-erased destination.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn convert_into_any<S: NumericValue>(src: &[S], dst: AnySliceMut<'_>) {
    match dst {
        AnySliceMut::F32(d) => convert_slice(src, d),
        AnySliceMut::F64(d) => convert_slice(src, d),
        AnySliceMut::I32(d) => convert_slice(src, d),
    }
}

/// Element step and starting offset of a strided copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stride {
    /// Distance between consecutive elements.
    pub step: usize,
    /// Index of the first element.
    pub offset: usize,
}

impl Stride {
    /// Dense, starting at index 0.
    pub const CONTIGUOUS: Stride = Stride { step: 1, offset: 0 };

    /// Every `step`-th element starting at `offset`.
    pub fn new(step: usize, offset: usize) -> Self {
        Self { step, offset }
    }

    #[inline]
    fn at(self, i: usize) -> usize {
        i * self.step + self.offset
    }
}

fn copy_strided_typed<S: NumericValue, T: NumericValue>(
    src: &[S],
    src_stride: Stride,
    dst: &mut [T],
    dst_stride: Stride,
    count: usize,
) {
    if src_stride == Stride::CONTIGUOUS && dst_stride == Stride::CONTIGUOUS {
        convert_slice(&src[..count], &mut dst[..count]);
        return;
    }
    for i in 0..count {
        dst[dst_stride.at(i)] = T::from_f64(src[src_stride.at(i)].to_f64());
    }
}

fn copy_strided_from_any<T: NumericValue>(
    src: AnySlice<'_>,
    src_stride: Stride,
    dst: &mut [T],
    dst_stride: Stride,
    count: usize,
) {
    match src {
        AnySlice::F32(s) => copy_strided_typed(s, src_stride, dst, dst_stride, count),
        AnySlice::F64(s) => copy_strided_typed(s, src_stride, dst, dst_stride, count),
        AnySlice::I32(s) => copy_strided_typed(s, src_stride, dst, dst_stride, count),
    }
}

/// Copy `count` values between type-erased buffers with independent strides,
/// converting through `f64` when the types differ.
///
/// # Panics
///
/// Panics if a strided index falls outside its buffer.
pub fn copy_strided(
    src: AnySlice<'_>,
    src_stride: Stride,
    dst: AnySliceMut<'_>,
    dst_stride: Stride,
    count: usize,
) {
    match dst {
        AnySliceMut::F32(d) => copy_strided_from_any(src, src_stride, d, dst_stride, count),
        AnySliceMut::F64(d) => copy_strided_from_any(src, src_stride, d, dst_stride, count),
        AnySliceMut::I32(d) => copy_strided_from_any(src, src_stride, d, dst_stride, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_tags() {
        assert_eq!(<f32 as NumericValue>::DATA_TYPE, DataType::F32);
        assert_eq!(<f64 as NumericValue>::DATA_TYPE, DataType::F64);
        assert_eq!(<i32 as NumericValue>::DATA_TYPE, DataType::I32);
        assert_eq!(DataType::F64.size_bytes(), 8);
        assert!(!DataType::I32.is_float());
    }

    #[test]
    fn any_round_trip_same_type() {
        let v = [1.0f64, 2.0, 3.0];
        let any = f64::into_any(&v);
        assert_eq!(any.data_type(), DataType::F64);
        assert_eq!(f64::from_any(any), Some(&v[..]));
        assert!(f32::from_any(any).is_none());
    }

    #[test]
    fn any_mut_round_trip() {
        let mut v = [1i32, 2, 3];
        let mut any = i32::into_any_mut(&mut v);
        assert!(f32::from_any_mut(any.reborrow()).is_none());
        i32::from_any_mut(any.reborrow()).unwrap()[1] = 20;
        assert_eq!(v, [1, 20, 3]);
    }

    #[test]
    fn conversion_truncates_and_saturates() {
        let src = [1.9f64, -1.9, f64::NAN, 1e20];
        let mut dst = [0i32; 4];
        convert_slice(&src, &mut dst);
        assert_eq!(dst, [1, -1, 0, i32::MAX]);
    }

    #[test]
    fn conversion_preserves_f32_exactly() {
        let src = [0.1f32, -3.5, f32::INFINITY];
        let mut wide = [0f64; 3];
        convert_slice(&src, &mut wide);
        let mut back = [0f32; 3];
        convert_slice(&wide, &mut back);
        assert_eq!(src, back);
    }

    #[test]
    fn convert_any_dispatches() {
        let v = vec![1i32, 2];
        let mut out = [0f32; 2];
        convert_any(AnyVec::I32(v).as_any_slice(), &mut out);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn strided_gather_and_scatter() {
        // 3x2 row-major, gather column 1 then scatter it back doubled.
        let mut table = AnyVec::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut column = AnyVec::F32(vec![0.0; 3]);
        copy_strided(
            table.as_any_slice(),
            Stride::new(2, 1),
            column.as_any_slice_mut(),
            Stride::CONTIGUOUS,
            3,
        );
        assert_eq!(column, AnyVec::F32(vec![2.0, 4.0, 6.0]));

        if let AnyVec::F32(c) = &mut column {
            c.iter_mut().for_each(|v| *v *= 2.0);
        }
        copy_strided(
            column.as_any_slice(),
            Stride::CONTIGUOUS,
            table.as_any_slice_mut(),
            Stride::new(2, 1),
            3,
        );
        assert_eq!(table, AnyVec::F64(vec![1.0, 4.0, 3.0, 8.0, 5.0, 12.0]));
    }

    #[test]
    fn int_is_always_finite() {
        assert!(i32::MIN.is_finite_value());
        assert!(!f32::NAN.is_finite_value());
        assert!(!f64::NEG_INFINITY.is_finite_value());
    }
}

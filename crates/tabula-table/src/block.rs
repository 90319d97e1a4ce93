//! Block descriptors: transient views into a table's backing store.
//!
//! A [`RawBlock`] is what a [`NumericTable`](crate::NumericTable) hands
//! out. Its buffer is either a zero-copy view of the backing store (when
//! the requested type equals the storage type and the requested region is
//! contiguous) or an owned converted copy. Owned buffers of write-mode
//! blocks are scattered back into the table by [`RawBlock::commit`].
//!
//! [`BlockDescriptor`] is the typed wrapper accessors work with.

use std::borrow::Cow;
use std::marker::PhantomData;

use tabula_core::value::copy_strided;
use tabula_core::{
    AnySlice, AnySliceMut, AnyVec, DataType, Error, ErrorId, NumericValue, ReadWriteMode, Status,
    Stride,
};

use crate::raw::{ReadView, SharedBuffer, WriteView};

/// Allocate a zero-filled owned buffer of `len` values.
///
/// Reservation failure maps to [`ErrorId::MemoryAllocationFailed`]
/// instead of aborting.
pub fn alloc_any(data_type: DataType, len: usize) -> Result<AnyVec, Error> {
    Ok(match data_type {
        DataType::F32 => AnyVec::F32(try_zeroed(len)?),
        DataType::F64 => AnyVec::F64(try_zeroed(len)?),
        DataType::I32 => AnyVec::I32(try_zeroed(len)?),
    })
}

/// Typed counterpart of [`alloc_any`].
pub(crate) fn try_zeroed<T: NumericValue>(len: usize) -> Result<Vec<T>, Error> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|_| {
        Error::new(ErrorId::MemoryAllocationFailed)
            .with_message(format!("cannot reserve {len} values of {}", T::DATA_TYPE))
    })?;
    v.resize(len, T::default());
    Ok(v)
}

/// `a * b`, or [`ErrorId::BufferSizeOverflow`].
pub(crate) fn checked_len(a: usize, b: usize) -> Result<usize, Error> {
    a.checked_mul(b).ok_or_else(|| {
        Error::new(ErrorId::BufferSizeOverflow).with_message(format!("{a} x {b} values"))
    })
}

/// Block over `count` elements of `buf`, every `step`-th element from
/// `first`. Zero-copy when the elements are contiguous and `data_type`
/// is the storage type.
#[allow(clippy::too_many_arguments)]
pub(crate) fn strided_block<'a, S: NumericValue>(
    buf: &'a SharedBuffer<S>,
    first: usize,
    step: usize,
    count: usize,
    shape: BlockShape,
    mode: ReadWriteMode,
    data_type: DataType,
) -> Result<RawBlock<'a>, Error> {
    let elems = if count == 0 {
        0..0
    } else {
        first..first + (count - 1) * step + 1
    };
    if (step == 1 || count <= 1) && data_type == S::DATA_TYPE {
        return Ok(match mode {
            ReadWriteMode::Read => RawBlock::view(shape, buf.read(elems)?),
            _ => RawBlock::view_mut(shape, mode, buf.write(elems)?),
        });
    }
    let mut owned = alloc_any(data_type, count)?;
    let stride = Stride::new(step, 0);
    if mode == ReadWriteMode::Read {
        let view = buf.read(elems)?;
        copy_strided(
            view.data(),
            stride,
            owned.as_any_slice_mut(),
            Stride::CONTIGUOUS,
            count,
        );
        return Ok(RawBlock::owned(shape, owned, vec![view]));
    }
    let target = buf.write(elems)?;
    Ok(RawBlock::owned_write(
        shape,
        mode,
        owned,
        vec![WriteBack {
            target,
            src: Stride::CONTIGUOUS,
            dst: stride,
            count,
        }],
    ))
}

/// One strided scatter performed when an owned write block commits.
pub(crate) struct WriteBack<'a> {
    pub(crate) target: WriteView<'a>,
    /// Stride into the owned block buffer.
    pub(crate) src: Stride,
    /// Stride into `target`.
    pub(crate) dst: Stride,
    pub(crate) count: usize,
}

impl WriteBack<'_> {
    /// Copy the target's current values into the owned buffer.
    fn fill(&self, buf: &mut AnyVec) {
        copy_strided(
            self.target.data(),
            self.dst,
            buf.as_any_slice_mut(),
            self.src,
            self.count,
        );
    }

    fn apply(&mut self, buf: &AnyVec) {
        copy_strided(
            buf.as_any_slice(),
            self.src,
            self.target.data_mut(),
            self.dst,
            self.count,
        );
    }
}

pub(crate) enum BlockData<'a> {
    View(ReadView<'a>),
    ViewMut(WriteView<'a>),
    /// Converted copy; the views keep shared leases on the source rows.
    Owned {
        buf: AnyVec,
        _sources: Vec<ReadView<'a>>,
    },
    OwnedWrite {
        buf: AnyVec,
        write_backs: Vec<WriteBack<'a>>,
    },
}

/// Position and shape of a block inside its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockShape {
    pub(crate) row_offset: usize,
    pub(crate) n_rows: usize,
    pub(crate) n_cols: usize,
}

impl BlockShape {
    pub(crate) fn new(row_offset: usize, n_rows: usize, n_cols: usize) -> Self {
        Self {
            row_offset,
            n_rows,
            n_cols,
        }
    }
}

/// An untyped block of `n_rows x n_cols` values in row-major order.
///
/// Dropping a block without [`commit`](Self::commit) abandons any
/// pending write-back but still releases its leases.
pub struct RawBlock<'a> {
    shape: BlockShape,
    mode: ReadWriteMode,
    data: BlockData<'a>,
}

impl<'a> RawBlock<'a> {
    pub(crate) fn view(shape: BlockShape, view: ReadView<'a>) -> Self {
        Self {
            shape,
            mode: ReadWriteMode::Read,
            data: BlockData::View(view),
        }
    }

    pub(crate) fn view_mut(shape: BlockShape, mode: ReadWriteMode, view: WriteView<'a>) -> Self {
        Self {
            shape,
            mode,
            data: BlockData::ViewMut(view),
        }
    }

    pub(crate) fn owned(shape: BlockShape, buf: AnyVec, sources: Vec<ReadView<'a>>) -> Self {
        Self {
            shape,
            mode: ReadWriteMode::Read,
            data: BlockData::Owned {
                buf,
                _sources: sources,
            },
        }
    }

    /// Owned write block. In `ReadWrite` mode the buffer is filled from
    /// the write-back targets before it is handed out.
    pub(crate) fn owned_write(
        shape: BlockShape,
        mode: ReadWriteMode,
        mut buf: AnyVec,
        write_backs: Vec<WriteBack<'a>>,
    ) -> Self {
        if mode.reads() {
            for wb in &write_backs {
                wb.fill(&mut buf);
            }
        }
        Self {
            shape,
            mode,
            data: BlockData::OwnedWrite { buf, write_backs },
        }
    }

    /// First table row covered by the block.
    pub fn row_offset(&self) -> usize {
        self.shape.row_offset
    }

    /// Number of rows in the block.
    pub fn n_rows(&self) -> usize {
        self.shape.n_rows
    }

    /// Number of columns in the block.
    pub fn n_cols(&self) -> usize {
        self.shape.n_cols
    }

    /// Access mode the block was acquired with.
    pub fn mode(&self) -> ReadWriteMode {
        self.mode
    }

    /// Whether the block borrows the backing store directly.
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.data, BlockData::View(_) | BlockData::ViewMut(_))
    }

    /// Value type of the block buffer.
    pub fn data_type(&self) -> DataType {
        self.data().data_type()
    }

    /// Block contents.
    pub fn data(&self) -> AnySlice<'_> {
        match &self.data {
            BlockData::View(v) => v.data(),
            BlockData::ViewMut(v) => v.data(),
            BlockData::Owned { buf, .. } | BlockData::OwnedWrite { buf, .. } => buf.as_any_slice(),
        }
    }

    /// Mutable block contents; `None` for read-only blocks.
    pub fn data_mut(&mut self) -> Option<AnySliceMut<'_>> {
        match &mut self.data {
            BlockData::ViewMut(v) => Some(v.data_mut()),
            BlockData::OwnedWrite { buf, .. } => Some(buf.as_any_slice_mut()),
            BlockData::View(_) | BlockData::Owned { .. } => None,
        }
    }

    /// Release the block, writing owned write buffers back to the table.
    pub fn commit(self) -> Result<(), Status> {
        if let BlockData::OwnedWrite {
            buf,
            mut write_backs,
        } = self.data
        {
            for wb in &mut write_backs {
                wb.apply(&buf);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for RawBlock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBlock")
            .field("row_offset", &self.shape.row_offset)
            .field("n_rows", &self.shape.n_rows)
            .field("n_cols", &self.shape.n_cols)
            .field("mode", &self.mode)
            .field("data_type", &self.data_type())
            .field("zero_copy", &self.is_zero_copy())
            .finish()
    }
}

/// A typed block descriptor.
///
/// Rows are laid out consecutively: element `(i, j)` of the block is at
/// `i * n_cols + j`.
pub struct BlockDescriptor<'a, T: NumericValue> {
    raw: RawBlock<'a>,
    _marker: PhantomData<T>,
}

impl<'a, T: NumericValue> BlockDescriptor<'a, T> {
    /// Wrap a raw block whose value type must be `T`.
    pub fn from_raw(raw: RawBlock<'a>) -> Result<Self, Error> {
        if raw.data_type() != T::DATA_TYPE {
            return Err(Error::new(ErrorId::DataTypeMismatch).with_message(format!(
                "block holds {}, requested {}",
                raw.data_type(),
                T::DATA_TYPE
            )));
        }
        Ok(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Block contents.
    pub fn as_slice(&self) -> &[T] {
        T::from_any(self.raw.data()).unwrap_or(&[])
    }

    /// Mutable block contents; `None` for read-only blocks.
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        self.raw.data_mut().and_then(T::from_any_mut)
    }

    /// One row of the block.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_rows()`.
    pub fn row(&self, i: usize) -> &[T] {
        let n = self.raw.n_cols();
        &self.as_slice()[i * n..(i + 1) * n]
    }

    /// First table row covered by the block.
    pub fn row_offset(&self) -> usize {
        self.raw.row_offset()
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.raw.n_rows()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.raw.n_cols()
    }

    /// Access mode.
    pub fn mode(&self) -> ReadWriteMode {
        self.raw.mode()
    }

    /// Whether the block borrows the backing store directly.
    pub fn is_zero_copy(&self) -> bool {
        self.raw.is_zero_copy()
    }

    /// Unwrap into the untyped block.
    pub fn into_raw(self) -> RawBlock<'a> {
        self.raw
    }
}

impl<T: NumericValue> std::fmt::Debug for BlockDescriptor<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.raw.fmt(f)
    }
}

/// Stored values of a sparse block.
#[derive(Debug)]
pub(crate) enum CsrValues<'a> {
    Borrowed(AnySlice<'a>),
    Owned(AnyVec),
}

/// An untyped block of CSR rows.
///
/// Column indices and row offsets are one-based; row offsets are rebased
/// so the first offset of the block is 1.
#[derive(Debug)]
pub struct RawCsrBlock<'a> {
    pub(crate) row_offset: usize,
    pub(crate) n_rows: usize,
    pub(crate) n_cols: usize,
    pub(crate) values: CsrValues<'a>,
    pub(crate) col_indices: &'a [usize],
    pub(crate) row_offsets: Cow<'a, [usize]>,
}

impl RawCsrBlock<'_> {
    /// Value type of the stored values.
    pub fn data_type(&self) -> DataType {
        self.values().data_type()
    }

    /// Stored values of the block rows.
    pub fn values(&self) -> AnySlice<'_> {
        match &self.values {
            CsrValues::Borrowed(s) => *s,
            CsrValues::Owned(v) => v.as_any_slice(),
        }
    }

    /// Whether the values borrow the backing store directly.
    pub fn is_zero_copy(&self) -> bool {
        matches!(self.values, CsrValues::Borrowed(_))
    }
}

/// A typed block of CSR rows.
#[derive(Debug)]
pub struct CsrBlock<'a, T: NumericValue> {
    raw: RawCsrBlock<'a>,
    _marker: PhantomData<T>,
}

impl<'a, T: NumericValue> CsrBlock<'a, T> {
    /// Wrap a raw sparse block whose value type must be `T`.
    pub fn from_raw(raw: RawCsrBlock<'a>) -> Result<Self, Error> {
        if raw.data_type() != T::DATA_TYPE {
            return Err(Error::new(ErrorId::DataTypeMismatch).with_message(format!(
                "sparse block holds {}, requested {}",
                raw.data_type(),
                T::DATA_TYPE
            )));
        }
        Ok(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// Stored values.
    pub fn values(&self) -> &[T] {
        T::from_any(self.raw.values()).unwrap_or(&[])
    }

    /// One-based column index of every stored value.
    pub fn col_indices(&self) -> &[usize] {
        self.raw.col_indices
    }

    /// One-based row offsets, `n_rows + 1` entries starting at 1.
    pub fn row_offsets(&self) -> &[usize] {
        &self.raw.row_offsets
    }

    /// Values and one-based column indices of block row `i`.
    pub fn row(&self, i: usize) -> (&[T], &[usize]) {
        let lo = self.raw.row_offsets[i] - 1;
        let hi = self.raw.row_offsets[i + 1] - 1;
        (&self.values()[lo..hi], &self.raw.col_indices[lo..hi])
    }

    /// First table row covered by the block.
    pub fn row_offset(&self) -> usize {
        self.raw.row_offset
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.raw.n_rows
    }

    /// Number of columns of the table.
    pub fn n_cols(&self) -> usize {
        self.raw.n_cols
    }

    /// Number of stored values in the block.
    pub fn nnz(&self) -> usize {
        self.raw.col_indices.len()
    }

    /// Whether the values borrow the backing store directly.
    pub fn is_zero_copy(&self) -> bool {
        self.raw.is_zero_copy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_any_is_zeroed() {
        let v = alloc_any(DataType::I32, 5).unwrap();
        assert_eq!(v, AnyVec::I32(vec![0; 5]));
    }

    #[test]
    fn alloc_any_reports_allocation_failure() {
        let err = alloc_any(DataType::F64, usize::MAX / 4).unwrap_err();
        assert_eq!(err.id(), ErrorId::MemoryAllocationFailed);
    }

    #[test]
    fn checked_len_overflow() {
        assert_eq!(
            checked_len(usize::MAX, 2).unwrap_err().id(),
            ErrorId::BufferSizeOverflow
        );
    }

    #[test]
    fn typed_descriptor_rejects_wrong_type() {
        let buf = SharedBuffer::from_vec(vec![1.0f64, 2.0]);
        let raw = RawBlock::view(BlockShape::new(0, 1, 2), buf.read(0..2).unwrap());
        let err = BlockDescriptor::<f32>::from_raw(raw).unwrap_err();
        assert_eq!(err.id(), ErrorId::DataTypeMismatch);
    }

    #[test]
    fn read_view_has_no_mut_slice() {
        let buf = SharedBuffer::from_vec(vec![1.0f64, 2.0, 3.0, 4.0]);
        let raw = RawBlock::view(BlockShape::new(0, 2, 2), buf.read(0..4).unwrap());
        let mut block = BlockDescriptor::<f64>::from_raw(raw).unwrap();
        assert!(block.is_zero_copy());
        assert_eq!(block.row(1), &[3.0, 4.0]);
        assert!(block.as_mut_slice().is_none());
    }

    #[test]
    fn owned_write_commits_converted_values() {
        // 2x2 f64 table, scatter an f32 column into column 1.
        let buf = SharedBuffer::from_vec(vec![1.0f64, 2.0, 3.0, 4.0]);
        let target = buf.write(0..4).unwrap();
        let raw = RawBlock::owned_write(
            BlockShape::new(0, 2, 1),
            ReadWriteMode::ReadWrite,
            alloc_any(DataType::F32, 2).unwrap(),
            vec![WriteBack {
                target,
                src: Stride::CONTIGUOUS,
                dst: Stride::new(2, 1),
                count: 2,
            }],
        );
        let mut block = BlockDescriptor::<f32>::from_raw(raw).unwrap();
        assert_eq!(block.as_slice(), &[2.0, 4.0]);
        block.as_mut_slice().unwrap()[1] = 40.0;
        block.into_raw().commit().unwrap();
        assert_eq!(buf.to_vec().unwrap(), vec![1.0, 2.0, 3.0, 40.0]);
    }

    #[test]
    fn abandoned_write_block_leaves_table_unchanged() {
        let buf = SharedBuffer::from_vec(vec![1i32, 2]);
        let target = buf.write(0..2).unwrap();
        let mut raw = RawBlock::owned_write(
            BlockShape::new(0, 1, 2),
            ReadWriteMode::Write,
            alloc_any(DataType::F64, 2).unwrap(),
            vec![WriteBack {
                target,
                src: Stride::CONTIGUOUS,
                dst: Stride::CONTIGUOUS,
                count: 2,
            }],
        );
        if let Some(AnySliceMut::F64(s)) = raw.data_mut() {
            s.fill(9.0);
        }
        drop(raw);
        assert_eq!(buf.to_vec().unwrap(), vec![1, 2]);
    }

    #[test]
    fn strided_column_read_converts() {
        // 3x2 i32, column 1 as f64.
        let buf = SharedBuffer::from_vec(vec![1i32, 2, 3, 4, 5, 6]);
        let raw = strided_block(
            &buf,
            1,
            2,
            3,
            BlockShape::new(0, 3, 1),
            ReadWriteMode::Read,
            DataType::F64,
        )
        .unwrap();
        assert!(!raw.is_zero_copy());
        let block = BlockDescriptor::<f64>::from_raw(raw).unwrap();
        assert_eq!(block.as_slice(), &[2.0, 4.0, 6.0]);
    }

    #[test]
    fn strided_contiguous_same_type_is_zero_copy() {
        let buf = SharedBuffer::from_vec(vec![1.0f32; 6]);
        let mut raw = strided_block(
            &buf,
            2,
            1,
            4,
            BlockShape::new(1, 2, 2),
            ReadWriteMode::Write,
            DataType::F32,
        )
        .unwrap();
        assert!(raw.is_zero_copy());
        if let Some(AnySliceMut::F32(s)) = raw.data_mut() {
            s.fill(0.0);
        }
        raw.commit().unwrap();
        assert_eq!(buf.to_vec().unwrap(), vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn strided_empty_block() {
        let buf = SharedBuffer::from_vec(vec![1.0f64; 4]);
        let raw = strided_block(
            &buf,
            9,
            2,
            0,
            BlockShape::new(2, 0, 1),
            ReadWriteMode::Read,
            DataType::F32,
        )
        .unwrap();
        assert_eq!(raw.data().len(), 0);
    }
}

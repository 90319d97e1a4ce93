//! The numeric-table contract.
//!
//! Kernels see every storage layout through [`NumericTable`]: they ask
//! for a block of rows (all columns) or of one column's values in the
//! value type they compute in, work on it, and release it. Tables are
//! shared by reference across worker threads, so every method takes
//! `&self`; concurrent blocks are arbitrated by element-range leases.

use std::ops::Range;

use tabula_core::{
    DataType, Dictionary, Error, ErrorId, MemoryStatus, NumericValue, ReadWriteMode, Status,
    StorageLayout, TableDims,
};

use crate::block::{BlockDescriptor, CsrBlock, RawBlock, RawCsrBlock};

/// A two-dimensional table of numeric values with a pluggable layout.
///
/// Row ranges passed to the block methods must lie inside the table
/// (`rows.end <= n_rows()`); the accessors in [`crate::accessor`] clamp
/// caller requests before they get here.
pub trait NumericTable: Send + Sync {
    /// Row and column counts.
    fn dims(&self) -> TableDims;

    /// Number of rows.
    fn n_rows(&self) -> usize {
        self.dims().n_rows
    }

    /// Number of columns.
    fn n_cols(&self) -> usize {
        self.dims().n_cols
    }

    /// Physical storage layout.
    fn layout(&self) -> StorageLayout;

    /// Per-column metadata.
    fn dictionary(&self) -> &Dictionary;

    /// Ownership state of the backing memory.
    fn memory_status(&self) -> MemoryStatus;

    /// Acquire `rows` (all columns, row-major) as `data_type`.
    fn get_block_of_rows(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status>;

    /// Release a row block, writing owned write buffers back.
    fn release_block_of_rows(&self, block: RawBlock<'_>) -> Result<(), Status> {
        block.commit()
    }

    /// Acquire `rows` of column `col` as `data_type`.
    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status>;

    /// Release a column block, writing owned write buffers back.
    fn release_block_of_column_values(&self, block: RawBlock<'_>) -> Result<(), Status> {
        block.commit()
    }

    /// Sparse access, for tables stored as CSR.
    fn as_csr(&self) -> Option<&dyn CsrAccess> {
        None
    }
}

/// Native sparse access to a CSR table.
pub trait CsrAccess: Send + Sync {
    /// Number of stored values.
    fn nnz(&self) -> usize;

    /// Acquire the stored values of `rows` as `data_type`, read-only.
    fn get_sparse_block(
        &self,
        rows: Range<usize>,
        data_type: DataType,
    ) -> Result<RawCsrBlock<'_>, Status>;
}

/// Typed convenience methods over any [`NumericTable`].
pub trait NumericTableExt: NumericTable {
    /// Acquire a typed row block.
    fn rows<T: NumericValue>(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
    ) -> Result<BlockDescriptor<'_, T>, Status> {
        let raw = self.get_block_of_rows(rows, mode, T::DATA_TYPE)?;
        Ok(BlockDescriptor::from_raw(raw)?)
    }

    /// Acquire a typed column block.
    fn column<T: NumericValue>(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
    ) -> Result<BlockDescriptor<'_, T>, Status> {
        let raw = self.get_block_of_column_values(col, rows, mode, T::DATA_TYPE)?;
        Ok(BlockDescriptor::from_raw(raw)?)
    }

    /// Acquire a typed sparse block; fails with
    /// [`ErrorId::MethodNotSupported`] on non-CSR tables.
    fn sparse_rows<T: NumericValue>(&self, rows: Range<usize>) -> Result<CsrBlock<'_, T>, Status> {
        let csr = self.as_csr().ok_or_else(|| {
            Error::new(ErrorId::MethodNotSupported)
                .with_message(format!("{} table has no sparse access", self.layout()))
        })?;
        let raw = csr.get_sparse_block(rows, T::DATA_TYPE)?;
        Ok(CsrBlock::from_raw(raw)?)
    }
}

impl<N: NumericTable + ?Sized> NumericTableExt for N {}

/// Fail with [`ErrorId::IncorrectIndex`] unless `rows` lies inside a
/// table of `n_rows` rows.
pub(crate) fn check_rows(n_rows: usize, rows: &Range<usize>) -> Result<(), Error> {
    if rows.start > rows.end || rows.end > n_rows {
        return Err(Error::new(ErrorId::IncorrectIndex)
            .with_row(rows.end)
            .with_message(format!(
                "rows {}..{} outside table of {n_rows} rows",
                rows.start, rows.end
            )));
    }
    Ok(())
}

/// Fail with [`ErrorId::IncorrectIndex`] unless `col < n_cols`.
pub(crate) fn check_column(n_cols: usize, col: usize) -> Result<(), Error> {
    if col >= n_cols {
        return Err(Error::new(ErrorId::IncorrectIndex)
            .with_column(col)
            .with_message(format!("column {col} outside table of {n_cols} columns")));
    }
    Ok(())
}

/// Clamp a request for `n` rows from `start` to the table end.
///
/// `start == n_rows` yields an empty range; `start > n_rows` fails with
/// [`ErrorId::IncorrectIndex`].
pub fn clamp_rows(n_rows: usize, start: usize, n: usize) -> Result<Range<usize>, Error> {
    if start > n_rows {
        return Err(Error::new(ErrorId::IncorrectIndex)
            .with_row(start)
            .with_message(format!("start row past table of {n_rows} rows")));
    }
    Ok(start..start + n.min(n_rows - start))
}

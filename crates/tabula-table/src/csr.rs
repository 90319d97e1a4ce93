//! Compressed sparse row table with one-based indexing.
//!
//! Row `i` holds the values `values[row_offsets[i] - 1 .. row_offsets[i + 1] - 1]`
//! at one-based columns `col_indices[..]` of the same range, so
//! `row_offsets[0] == 1` and `row_offsets[n_rows] - 1 == nnz`.
//!
//! The table is read-only: sparse blocks borrow the stored values when
//! the requested type matches, dense row and column reads densify into
//! an owned zero-filled buffer, and dense writes fail with
//! [`ErrorId::MethodNotSupported`].

use std::borrow::Cow;
use std::ops::Range;

use tabula_core::{
    AnyVec, DataType, Dictionary, Error, ErrorId, MemoryStatus, NumericValue, ReadWriteMode, Status,
    StorageLayout, TableDims,
};

use crate::block::{alloc_any, checked_len, BlockShape, CsrValues, RawBlock, RawCsrBlock};
use crate::table::{check_column, check_rows, CsrAccess, NumericTable};

/// A read-only CSR table of one value type.
pub struct CsrNumericTable<S: NumericValue> {
    dims: TableDims,
    dictionary: Dictionary,
    values: Vec<S>,
    col_indices: Vec<usize>,
    row_offsets: Vec<usize>,
}

fn inconsistent(message: String) -> Error {
    Error::new(ErrorId::InconsistentCsrStructure).with_message(message)
}

impl<S: NumericValue> CsrNumericTable<S> {
    /// Build from one-based CSR arrays.
    ///
    /// Fails with [`ErrorId::InconsistentCsrStructure`] unless the offsets
    /// start at 1, never decrease and end at `nnz + 1`, and every column
    /// index lies in `1..=n_cols` and strictly increases within its row.
    pub fn new(
        values: Vec<S>,
        col_indices: Vec<usize>,
        row_offsets: Vec<usize>,
        n_cols: usize,
    ) -> Result<Self, Error> {
        let nnz = values.len();
        if col_indices.len() != nnz {
            return Err(inconsistent(format!(
                "{} column indices for {nnz} values",
                col_indices.len()
            )));
        }
        match row_offsets.first() {
            Some(1) => {}
            Some(first) => return Err(inconsistent(format!("first row offset is {first}, not 1"))),
            None => return Err(inconsistent("row offsets are empty".to_owned())),
        }
        if let Some(i) = row_offsets.windows(2).position(|w| w[1] < w[0]) {
            return Err(inconsistent(format!("row offsets decrease at row {i}")).with_row(i));
        }
        let last = row_offsets[row_offsets.len() - 1];
        if last != nnz + 1 {
            return Err(inconsistent(format!("last row offset {last}, expected {}", nnz + 1)));
        }
        if let Some(k) = col_indices.iter().position(|&c| c == 0 || c > n_cols) {
            return Err(inconsistent(format!(
                "column index {} outside 1..={n_cols}",
                col_indices[k]
            )));
        }
        for (i, w) in row_offsets.windows(2).enumerate() {
            let row = &col_indices[w[0] - 1..w[1] - 1];
            if let Some(k) = row.windows(2).position(|c| c[1] <= c[0]) {
                return Err(inconsistent(format!(
                    "column index {} repeated or out of order in row {i}",
                    row[k + 1]
                ))
                .with_row(i));
            }
        }
        let n_rows = row_offsets.len() - 1;
        Ok(Self {
            dims: TableDims::new(n_rows, n_cols),
            dictionary: Dictionary::homogeneous(n_cols, S::DATA_TYPE),
            values,
            col_indices,
            row_offsets,
        })
    }

    /// Compress a dense row-major matrix, dropping exact zeros.
    pub fn from_dense(dense: &[S], n_rows: usize, n_cols: usize) -> Result<Self, Error> {
        let expected = checked_len(n_rows, n_cols)?;
        if dense.len() != expected {
            return Err(Error::new(ErrorId::IncorrectNumberOfRows)
                .with_argument("dense")
                .with_sizes(expected, dense.len()));
        }
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_offsets = Vec::with_capacity(n_rows + 1);
        row_offsets.push(1);
        for row in dense.chunks(n_cols.max(1)).take(n_rows) {
            for (j, &v) in row.iter().enumerate() {
                if v != S::default() {
                    values.push(v);
                    col_indices.push(j + 1);
                }
            }
            row_offsets.push(values.len() + 1);
        }
        // `chunks` yields nothing for zero columns.
        row_offsets.resize(n_rows + 1, 1);
        Self::new(values, col_indices, row_offsets, n_cols)
    }

    /// Stored values.
    pub fn values(&self) -> &[S] {
        &self.values
    }

    /// One-based column indices.
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// One-based row offsets.
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Zero-based value range of `rows`.
    fn value_range(&self, rows: &Range<usize>) -> Range<usize> {
        self.row_offsets[rows.start] - 1..self.row_offsets[rows.end] - 1
    }

    fn scatter_rows<T: NumericValue>(&self, rows: &Range<usize>, out: &mut [T]) {
        let n_cols = self.dims.n_cols;
        for (i, r) in rows.clone().enumerate() {
            let lo = self.row_offsets[r] - 1;
            let hi = self.row_offsets[r + 1] - 1;
            for k in lo..hi {
                out[i * n_cols + self.col_indices[k] - 1] = T::from_f64(self.values[k].to_f64());
            }
        }
    }

    fn gather_column<T: NumericValue>(&self, col: usize, rows: &Range<usize>, out: &mut [T]) {
        for (i, r) in rows.clone().enumerate() {
            let lo = self.row_offsets[r] - 1;
            let hi = self.row_offsets[r + 1] - 1;
            if let Some(k) = (lo..hi).find(|&k| self.col_indices[k] == col + 1) {
                out[i] = T::from_f64(self.values[k].to_f64());
            }
        }
    }
}

fn read_only(mode: ReadWriteMode) -> Result<(), Error> {
    if mode.writes() {
        return Err(Error::new(ErrorId::MethodNotSupported)
            .with_message(format!("CSR tables are read-only, requested {mode:?}")));
    }
    Ok(())
}

impl<S: NumericValue> NumericTable for CsrNumericTable<S> {
    fn dims(&self) -> TableDims {
        self.dims
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::Csr
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn memory_status(&self) -> MemoryStatus {
        MemoryStatus::UserAllocated
    }

    fn get_block_of_rows(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        read_only(mode)?;
        check_rows(self.dims.n_rows, &rows)?;
        let n_cols = self.dims.n_cols;
        tracing::trace!(start = rows.start, n = rows.len(), %data_type, "csr dense row block");
        let mut buf = alloc_any(data_type, checked_len(rows.len(), n_cols)?)?;
        match &mut buf {
            AnyVec::F32(out) => self.scatter_rows(&rows, out),
            AnyVec::F64(out) => self.scatter_rows(&rows, out),
            AnyVec::I32(out) => self.scatter_rows(&rows, out),
        }
        let shape = BlockShape::new(rows.start, rows.len(), n_cols);
        Ok(RawBlock::owned(shape, buf, Vec::new()))
    }

    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        read_only(mode)?;
        check_column(self.dims.n_cols, col)?;
        check_rows(self.dims.n_rows, &rows)?;
        let mut buf = alloc_any(data_type, rows.len())?;
        match &mut buf {
            AnyVec::F32(out) => self.gather_column(col, &rows, out),
            AnyVec::F64(out) => self.gather_column(col, &rows, out),
            AnyVec::I32(out) => self.gather_column(col, &rows, out),
        }
        let shape = BlockShape::new(rows.start, rows.len(), 1);
        Ok(RawBlock::owned(shape, buf, Vec::new()))
    }

    fn as_csr(&self) -> Option<&dyn CsrAccess> {
        Some(self)
    }
}

impl<S: NumericValue> CsrAccess for CsrNumericTable<S> {
    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn get_sparse_block(
        &self,
        rows: Range<usize>,
        data_type: DataType,
    ) -> Result<RawCsrBlock<'_>, Status> {
        check_rows(self.dims.n_rows, &rows)?;
        let span = self.value_range(&rows);
        tracing::trace!(start = rows.start, n = rows.len(), nnz = span.len(), %data_type, "csr sparse block");
        let stored = &self.values[span.clone()];
        let values = if data_type == S::DATA_TYPE {
            CsrValues::Borrowed(S::into_any(stored))
        } else {
            let mut buf = alloc_any(data_type, stored.len())?;
            tabula_core::value::convert_into_any(stored, buf.as_any_slice_mut());
            CsrValues::Owned(buf)
        };
        let offsets = &self.row_offsets[rows.start..=rows.end];
        let row_offsets = if span.start == 0 {
            Cow::Borrowed(offsets)
        } else {
            Cow::Owned(offsets.iter().map(|o| o - span.start).collect())
        };
        Ok(RawCsrBlock {
            row_offset: rows.start,
            n_rows: rows.len(),
            n_cols: self.dims.n_cols,
            values,
            col_indices: &self.col_indices[span],
            row_offsets,
        })
    }
}

impl<S: NumericValue> std::fmt::Debug for CsrNumericTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrNumericTable")
            .field("dims", &self.dims)
            .field("data_type", &S::DATA_TYPE)
            .field("nnz", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NumericTableExt;

    // [1 0 2]
    // [0 0 0]
    // [0 3 4]
    fn sample() -> CsrNumericTable<f64> {
        CsrNumericTable::new(
            vec![1.0, 2.0, 3.0, 4.0],
            vec![1, 3, 2, 3],
            vec![1, 3, 3, 5],
            3,
        )
        .unwrap()
    }

    #[test]
    fn structure_is_validated() {
        let bad_first = CsrNumericTable::new(vec![1.0f32], vec![1], vec![0, 1], 1);
        assert_eq!(
            bad_first.unwrap_err().id(),
            ErrorId::InconsistentCsrStructure
        );
        let bad_col = CsrNumericTable::new(vec![1.0f32], vec![2], vec![1, 2], 1);
        assert!(bad_col.is_err());
        let bad_last = CsrNumericTable::new(vec![1.0f32], vec![1], vec![1, 1], 1);
        assert!(bad_last.is_err());
        let decreasing = CsrNumericTable::new(vec![1.0f32, 2.0], vec![1, 1], vec![1, 3, 2, 3], 1);
        assert!(decreasing.is_err());
        let repeated = CsrNumericTable::new(vec![1.0f32, 2.0], vec![1, 1], vec![1, 3], 2);
        assert_eq!(repeated.unwrap_err().id(), ErrorId::InconsistentCsrStructure);
        let unsorted = CsrNumericTable::new(vec![1.0f32, 2.0], vec![2, 1], vec![1, 3], 2);
        assert!(unsorted.is_err());
        // Indices restart in each row.
        let two_rows = CsrNumericTable::new(vec![1.0f32, 2.0], vec![2, 1], vec![1, 2, 3], 2);
        assert!(two_rows.is_ok());
    }

    #[test]
    fn from_dense_matches_explicit_arrays() {
        let t = CsrNumericTable::from_dense(&[1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0], 3, 3)
            .unwrap();
        assert_eq!(t.values(), sample().values());
        assert_eq!(t.col_indices(), sample().col_indices());
        assert_eq!(t.row_offsets(), sample().row_offsets());
    }

    #[test]
    fn dense_rows_densify() {
        let t = sample();
        let block = t.rows::<f32>(1..3, ReadWriteMode::Read).unwrap();
        assert_eq!(block.as_slice(), &[0.0, 0.0, 0.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn dense_column() {
        let t = sample();
        let block = t.column::<i32>(2, 0..3, ReadWriteMode::Read).unwrap();
        assert_eq!(block.as_slice(), &[2, 0, 4]);
    }

    #[test]
    fn dense_write_not_supported() {
        let err = sample()
            .rows::<f64>(0..1, ReadWriteMode::Write)
            .unwrap_err();
        assert!(err.contains(ErrorId::MethodNotSupported));
    }

    #[test]
    fn sparse_block_is_rebased() {
        let t = sample();
        let block = t.sparse_rows::<f64>(1..3).unwrap();
        assert!(block.is_zero_copy());
        assert_eq!(block.values(), &[3.0, 4.0]);
        assert_eq!(block.col_indices(), &[2, 3]);
        assert_eq!(block.row_offsets(), &[1, 1, 3]);
        assert_eq!(block.row(1), (&[3.0, 4.0][..], &[2usize, 3][..]));
        assert_eq!(t.nnz(), 4);
    }

    #[test]
    fn sparse_block_converts() {
        let t = sample();
        let block = t.sparse_rows::<f32>(0..1).unwrap();
        assert!(!block.is_zero_copy());
        assert_eq!(block.values(), &[1.0, 2.0]);
        assert_eq!(block.row_offsets(), &[1, 3]);
    }

    #[test]
    fn empty_rows() {
        let t = CsrNumericTable::<f64>::from_dense(&[], 0, 3).unwrap();
        assert_eq!(t.n_rows(), 0);
        assert_eq!(t.row_offsets(), &[1]);
    }
}

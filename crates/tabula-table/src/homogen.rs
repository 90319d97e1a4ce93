//! Dense homogeneous row-major table.

use std::ops::Range;

use tabula_core::{
    DataType, Dictionary, Error, ErrorId, FeatureInfo, MemoryStatus, NumericValue, ReadWriteMode,
    Status, StorageLayout, TableDims,
};

use crate::block::{checked_len, strided_block, try_zeroed, BlockShape, RawBlock};
use crate::raw::SharedBuffer;
use crate::table::{check_column, check_rows, NumericTable};

/// A table of one value type stored as a single contiguous row-major
/// buffer.
///
/// Row blocks in the storage type are zero-copy. Column blocks are
/// strided and therefore copied, except for single-column tables.
pub struct HomogenNumericTable<S: NumericValue> {
    dims: TableDims,
    dictionary: Dictionary,
    memory: MemoryStatus,
    buffer: Option<SharedBuffer<S>>,
}

impl<S: NumericValue> HomogenNumericTable<S> {
    /// Wrap caller data laid out row-major.
    ///
    /// Fails with [`ErrorId::IncorrectNumberOfRows`] when
    /// `data.len() != n_rows * n_cols`.
    pub fn from_vec(data: Vec<S>, n_rows: usize, n_cols: usize) -> Result<Self, Error> {
        let expected = checked_len(n_rows, n_cols)?;
        if data.len() != expected {
            return Err(Error::new(ErrorId::IncorrectNumberOfRows)
                .with_argument("data")
                .with_sizes(expected, data.len()));
        }
        Ok(Self {
            dims: TableDims::new(n_rows, n_cols),
            dictionary: Dictionary::homogeneous(n_cols, S::DATA_TYPE),
            memory: MemoryStatus::UserAllocated,
            buffer: Some(SharedBuffer::from_vec(data)),
        })
    }

    /// Allocate a zero-filled table.
    pub fn zeroed(n_rows: usize, n_cols: usize) -> Result<Self, Error> {
        let len = checked_len(n_rows, n_cols)?;
        let mut table = Self::from_vec(try_zeroed(len)?, n_rows, n_cols)?;
        table.memory = MemoryStatus::InternallyAllocated;
        Ok(table)
    }

    /// A table with dimensions but no data. Every block request fails
    /// with [`ErrorId::NullNumericTable`].
    pub fn unallocated(n_rows: usize, n_cols: usize) -> Self {
        Self {
            dims: TableDims::new(n_rows, n_cols),
            dictionary: Dictionary::homogeneous(n_cols, S::DATA_TYPE),
            memory: MemoryStatus::NotAllocated,
            buffer: None,
        }
    }

    /// Name the columns.
    pub fn with_feature_names<I, N>(mut self, names: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let features: Vec<FeatureInfo> = names
            .into_iter()
            .map(|n| FeatureInfo::continuous(S::DATA_TYPE).named(n))
            .collect();
        if features.len() != self.dims.n_cols {
            return Err(Error::new(ErrorId::IncorrectNumberOfColumns)
                .with_argument("names")
                .with_sizes(self.dims.n_cols, features.len()));
        }
        self.dictionary = Dictionary::from_features(features)?;
        Ok(self)
    }

    /// Copy the table contents out.
    pub fn to_vec(&self) -> Result<Vec<S>, Status> {
        Ok(self.buffer()?.to_vec()?)
    }

    fn buffer(&self) -> Result<&SharedBuffer<S>, Error> {
        self.buffer
            .as_ref()
            .ok_or_else(|| Error::new(ErrorId::NullNumericTable).with_message("no data attached"))
    }
}

impl<S: NumericValue> NumericTable for HomogenNumericTable<S> {
    fn dims(&self) -> TableDims {
        self.dims
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::RowMajor
    }

    fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    fn memory_status(&self) -> MemoryStatus {
        self.memory
    }

    fn get_block_of_rows(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        let buf = self.buffer()?;
        check_rows(self.dims.n_rows, &rows)?;
        let n_cols = self.dims.n_cols;
        let count = checked_len(rows.len(), n_cols)?;
        tracing::trace!(start = rows.start, n = rows.len(), ?mode, %data_type, "homogen row block");
        let shape = BlockShape::new(rows.start, rows.len(), n_cols);
        Ok(strided_block(
            buf,
            rows.start * n_cols,
            1,
            count,
            shape,
            mode,
            data_type,
        )?)
    }

    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        let buf = self.buffer()?;
        check_column(self.dims.n_cols, col)?;
        check_rows(self.dims.n_rows, &rows)?;
        let n_cols = self.dims.n_cols;
        tracing::trace!(col, start = rows.start, n = rows.len(), ?mode, %data_type, "homogen column block");
        let shape = BlockShape::new(rows.start, rows.len(), 1);
        Ok(strided_block(
            buf,
            rows.start * n_cols + col,
            n_cols,
            rows.len(),
            shape,
            mode,
            data_type,
        )?)
    }
}

impl<S: NumericValue> std::fmt::Debug for HomogenNumericTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomogenNumericTable")
            .field("dims", &self.dims)
            .field("data_type", &S::DATA_TYPE)
            .field("memory", &self.memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NumericTableExt;

    fn table_3x2() -> HomogenNumericTable<f64> {
        HomogenNumericTable::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap()
    }

    #[test]
    fn from_vec_checks_length() {
        let err = HomogenNumericTable::from_vec(vec![1.0f32; 5], 3, 2).unwrap_err();
        assert_eq!(err.id(), ErrorId::IncorrectNumberOfRows);
        assert_eq!(err.argument(), Some("data"));
    }

    #[test]
    fn row_block_same_type_is_zero_copy() {
        let t = table_3x2();
        let block = t.rows::<f64>(1..3, ReadWriteMode::Read).unwrap();
        assert!(block.is_zero_copy());
        assert_eq!(block.as_slice(), &[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(block.row_offset(), 1);
    }

    #[test]
    fn row_block_converts() {
        let t = table_3x2();
        let block = t.rows::<i32>(0..1, ReadWriteMode::Read).unwrap();
        assert!(!block.is_zero_copy());
        assert_eq!(block.as_slice(), &[1, 2]);
    }

    #[test]
    fn column_block_read_and_write_back() {
        let t = table_3x2();
        let mut block = t.column::<f32>(1, 0..3, ReadWriteMode::ReadWrite).unwrap();
        assert_eq!(block.as_slice(), &[2.0, 4.0, 6.0]);
        for v in block.as_mut_slice().unwrap() {
            *v *= 10.0;
        }
        t.release_block_of_column_values(block.into_raw()).unwrap();
        assert_eq!(t.to_vec().unwrap(), vec![1.0, 20.0, 3.0, 40.0, 5.0, 60.0]);
    }

    #[test]
    fn write_mode_starts_zeroed() {
        let t = table_3x2();
        let block = t.column::<f32>(0, 0..3, ReadWriteMode::Write).unwrap();
        assert_eq!(block.as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn conflicting_write_is_busy() {
        let t = table_3x2();
        let _held = t.rows::<f64>(0..2, ReadWriteMode::Read).unwrap();
        let err = t.rows::<f64>(1..3, ReadWriteMode::Write).unwrap_err();
        assert!(err.contains(ErrorId::BlockBusy));
        assert!(t.rows::<f64>(2..3, ReadWriteMode::Write).is_ok());
    }

    #[test]
    fn unallocated_table_rejects_blocks() {
        let t = HomogenNumericTable::<f32>::unallocated(4, 2);
        assert_eq!(t.memory_status(), MemoryStatus::NotAllocated);
        let err = t.rows::<f32>(0..1, ReadWriteMode::Read).unwrap_err();
        assert!(err.contains(ErrorId::NullNumericTable));
    }

    #[test]
    fn zeroed_is_internally_allocated() {
        let t = HomogenNumericTable::<i32>::zeroed(2, 3).unwrap();
        assert_eq!(t.memory_status(), MemoryStatus::InternallyAllocated);
        assert_eq!(t.to_vec().unwrap(), vec![0; 6]);
    }

    #[test]
    fn out_of_range_rows_rejected() {
        let t = table_3x2();
        let err = t.rows::<f64>(2..4, ReadWriteMode::Read).unwrap_err();
        assert!(err.contains(ErrorId::IncorrectIndex));
        let err = t.column::<f64>(2, 0..1, ReadWriteMode::Read).unwrap_err();
        assert!(err.contains(ErrorId::IncorrectIndex));
    }

    #[test]
    fn feature_names() {
        let t = table_3x2().with_feature_names(["x", "y"]).unwrap();
        assert_eq!(t.dictionary().index_of("y"), Some(1));
        assert!(table_3x2().with_feature_names(["x"]).is_err());
    }
}

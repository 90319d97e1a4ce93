//! Structure-of-arrays table: one buffer per column.

use std::ops::Range;

use tabula_core::value::copy_strided;
use tabula_core::{
    AnyVec, DataType, Dictionary, Error, ErrorId, FeatureInfo, MemoryStatus, ReadWriteMode, Status,
    StorageLayout, Stride, TableDims,
};

use crate::block::{
    alloc_any, checked_len, strided_block, BlockShape, RawBlock, WriteBack,
};
use crate::raw::{ReadView, SharedBuffer, WriteView};
use crate::table::{check_column, check_rows, NumericTable};

enum TypedBuffer {
    F32(SharedBuffer<f32>),
    F64(SharedBuffer<f64>),
    I32(SharedBuffer<i32>),
}

/// Run `$body` with `$buf` bound to the typed buffer inside `$typed`.
macro_rules! with_buffer {
    ($typed:expr, $buf:ident => $body:expr) => {
        match $typed {
            TypedBuffer::F32($buf) => $body,
            TypedBuffer::F64($buf) => $body,
            TypedBuffer::I32($buf) => $body,
        }
    };
}

impl TypedBuffer {
    fn from_any(values: AnyVec) -> Self {
        match values {
            AnyVec::F32(v) => Self::F32(SharedBuffer::from_vec(v)),
            AnyVec::F64(v) => Self::F64(SharedBuffer::from_vec(v)),
            AnyVec::I32(v) => Self::I32(SharedBuffer::from_vec(v)),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
            Self::I32(_) => DataType::I32,
        }
    }

    fn len(&self) -> usize {
        with_buffer!(self, b => b.len())
    }

    fn read(&self, range: Range<usize>) -> Result<ReadView<'_>, Error> {
        with_buffer!(self, b => b.read(range))
    }

    fn write(&self, range: Range<usize>) -> Result<WriteView<'_>, Error> {
        with_buffer!(self, b => b.write(range))
    }

    fn to_any_vec(&self) -> Result<AnyVec, Error> {
        Ok(match self {
            Self::F32(b) => AnyVec::F32(b.to_vec()?),
            Self::F64(b) => AnyVec::F64(b.to_vec()?),
            Self::I32(b) => AnyVec::I32(b.to_vec()?),
        })
    }
}

/// A table whose columns are stored in separate buffers, each with its
/// own value type.
///
/// Column blocks in the column's storage type are zero-copy. Row blocks
/// gather one value from every column and are always copied (except for
/// single-column tables).
pub struct SoaNumericTable {
    dims: TableDims,
    dictionary: Dictionary,
    columns: Vec<TypedBuffer>,
}

impl SoaNumericTable {
    /// Build from column buffers of equal length.
    ///
    /// Fails with [`ErrorId::IncorrectNumberOfRows`] when column lengths
    /// differ.
    pub fn from_columns(columns: Vec<AnyVec>) -> Result<Self, Error> {
        let n_rows = columns.first().map_or(0, AnyVec::len);
        if let Some((j, c)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(Error::new(ErrorId::IncorrectNumberOfRows)
                .with_argument("columns")
                .with_column(j)
                .with_sizes(n_rows, c.len()));
        }
        let dictionary = Dictionary::from_features(
            columns
                .iter()
                .map(|c| FeatureInfo::continuous(c.data_type()))
                .collect(),
        )?;
        Ok(Self {
            dims: TableDims::new(n_rows, columns.len()),
            dictionary,
            columns: columns.into_iter().map(TypedBuffer::from_any).collect(),
        })
    }

    /// Replace the dictionary. Its column count and value types must
    /// match the stored columns.
    pub fn with_dictionary(mut self, dictionary: Dictionary) -> Result<Self, Error> {
        if dictionary.len() != self.columns.len() {
            return Err(Error::new(ErrorId::IncorrectNumberOfColumns)
                .with_argument("dictionary")
                .with_sizes(self.columns.len(), dictionary.len()));
        }
        for (j, (f, c)) in dictionary.features().iter().zip(&self.columns).enumerate() {
            if f.data_type != c.data_type() {
                return Err(Error::new(ErrorId::DataTypeMismatch)
                    .with_argument("dictionary")
                    .with_column(j));
            }
        }
        self.dictionary = dictionary;
        Ok(self)
    }

    /// Storage type of column `col`.
    pub fn column_data_type(&self, col: usize) -> Option<DataType> {
        self.columns.get(col).map(TypedBuffer::data_type)
    }

    /// Copy column `col` out in its storage type.
    pub fn column_to_vec(&self, col: usize) -> Result<AnyVec, Status> {
        check_column(self.dims.n_cols, col)?;
        Ok(self.columns[col].to_any_vec()?)
    }
}

impl NumericTable for SoaNumericTable {
    fn dims(&self) -> TableDims {
        self.dims
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::Soa
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
        check_rows(self.dims.n_rows, &rows)?;
        let n_cols = self.dims.n_cols;
        let n_rows = rows.len();
        let shape = BlockShape::new(rows.start, n_rows, n_cols);
        tracing::trace!(start = rows.start, n = n_rows, ?mode, %data_type, "soa row block");
        if n_cols == 1 {
            return Ok(with_buffer!(&self.columns[0], b => {
                strided_block(b, rows.start, 1, n_rows, shape, mode, data_type)?
            }));
        }

        let mut buf = alloc_any(data_type, checked_len(n_rows, n_cols)?)?;
        if mode == ReadWriteMode::Read {
            let mut sources = Vec::with_capacity(n_cols);
            for (j, column) in self.columns.iter().enumerate() {
                let view = column.read(rows.clone())?;
                copy_strided(
                    view.data(),
                    Stride::CONTIGUOUS,
                    buf.as_any_slice_mut(),
                    Stride::new(n_cols, j),
                    n_rows,
                );
                sources.push(view);
            }
            return Ok(RawBlock::owned(shape, buf, sources));
        }

        let mut write_backs = Vec::with_capacity(n_cols);
        for (j, column) in self.columns.iter().enumerate() {
            write_backs.push(WriteBack {
                target: column.write(rows.clone())?,
                src: Stride::new(n_cols, j),
                dst: Stride::CONTIGUOUS,
                count: n_rows,
            });
        }
        Ok(RawBlock::owned_write(shape, mode, buf, write_backs))
    }

    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        check_column(self.dims.n_cols, col)?;
        check_rows(self.dims.n_rows, &rows)?;
        tracing::trace!(col, start = rows.start, n = rows.len(), ?mode, %data_type, "soa column block");
        let shape = BlockShape::new(rows.start, rows.len(), 1);
        Ok(with_buffer!(&self.columns[col], b => {
            strided_block(b, rows.start, 1, rows.len(), shape, mode, data_type)?
        }))
    }
}

impl std::fmt::Debug for SoaNumericTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoaNumericTable")
            .field("dims", &self.dims)
            .field(
                "column_types",
                &self.columns.iter().map(TypedBuffer::data_type).collect::<Vec<_>>(),
            )
            .finish()
    }
}

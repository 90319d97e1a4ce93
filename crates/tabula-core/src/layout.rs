//! Table shape, storage layout and block access modes.

use std::fmt;

/// Physical storage layout of a numeric table.
///
/// The layout determines which accessor path executes: contiguous
/// row-major tables hand out zero-copy row blocks, SOA tables hand out
/// zero-copy column blocks, CSR tables densify on row access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageLayout {
    /// Dense homogeneous row-major buffer.
    RowMajor,
    /// Structure of arrays: one buffer per column.
    Soa,
    /// Compressed sparse rows with one-based indices.
    Csr,
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RowMajor => "row-major",
            Self::Soa => "soa",
            Self::Csr => "csr",
        })
    }
}

/// Access mode requested for a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadWriteMode {
    /// Read only; the block is never written back.
    Read,
    /// Write only; an owned buffer starts zeroed and is written back.
    Write,
    /// Read and write; an owned buffer is filled and written back.
    ReadWrite,
}

impl ReadWriteMode {
    /// Whether the block is written back on release.
    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Whether an owned buffer is filled from the table on acquisition.
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }
}

/// Who owns a table's memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryStatus {
    /// No data buffer is attached.
    NotAllocated,
    /// The table allocated its own buffers.
    InternallyAllocated,
    /// The buffers were provided by the caller.
    UserAllocated,
}

/// Row and column counts of a table. Fixed after allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableDims {
    /// Number of rows (observations).
    pub n_rows: usize,
    /// Number of columns (features).
    pub n_cols: usize,
}

impl TableDims {
    /// Create dims.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self { n_rows, n_cols }
    }

    /// Total element count, or `None` on overflow.
    pub fn checked_len(&self) -> Option<usize> {
        self.n_rows.checked_mul(self.n_cols)
    }

    /// Whether the table has no elements.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.n_cols == 0
    }
}

impl fmt::Display for TableDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.n_rows, self.n_cols)
    }
}

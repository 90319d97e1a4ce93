//! Mock tables for error-path and release-accounting tests.
//!
//! - [`FailingTable`]: delegates to an inner table but fails block
//!   acquisition after a fixed number of successful calls.
//! - [`CountingTable`]: delegates and counts acquisitions and releases,
//!   so tests can assert every block is released exactly once.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use tabula_core::{
    DataType, Dictionary, Error, ErrorId, MemoryStatus, ReadWriteMode, Status, StorageLayout,
    TableDims,
};
use tabula_table::{CsrAccess, NumericTable, RawBlock};

/// Fails every block acquisition after `succeed` successful ones.
pub struct FailingTable {
    inner: Box<dyn NumericTable>,
    succeed: usize,
    calls: AtomicUsize,
    error: ErrorId,
}

impl FailingTable {
    pub fn new(inner: Box<dyn NumericTable>, succeed: usize, error: ErrorId) -> Self {
        Self {
            inner,
            succeed,
            calls: AtomicUsize::new(0),
            error,
        }
    }

    /// Number of acquisitions attempted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), Status> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n >= self.succeed {
            return Err(Error::new(self.error)
                .with_message(format!("injected failure on call {n}"))
                .into());
        }
        Ok(())
    }
}

impl NumericTable for FailingTable {
    fn dims(&self) -> TableDims {
        self.inner.dims()
    }

    fn layout(&self) -> StorageLayout {
        self.inner.layout()
    }

    fn dictionary(&self) -> &Dictionary {
        self.inner.dictionary()
    }

    fn memory_status(&self) -> MemoryStatus {
        self.inner.memory_status()
    }

    fn get_block_of_rows(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        self.gate()?;
        self.inner.get_block_of_rows(rows, mode, data_type)
    }

    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        self.gate()?;
        self.inner
            .get_block_of_column_values(col, rows, mode, data_type)
    }
}

/// Counts acquisitions and releases of an inner table.
pub struct CountingTable {
    inner: Box<dyn NumericTable>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingTable {
    pub fn new(inner: Box<dyn NumericTable>) -> Self {
        Self {
            inner,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl NumericTable for CountingTable {
    fn dims(&self) -> TableDims {
        self.inner.dims()
    }

    fn layout(&self) -> StorageLayout {
        self.inner.layout()
    }

    fn dictionary(&self) -> &Dictionary {
        self.inner.dictionary()
    }

    fn memory_status(&self) -> MemoryStatus {
        self.inner.memory_status()
    }

    fn get_block_of_rows(
        &self,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        let block = self.inner.get_block_of_rows(rows, mode, data_type)?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(block)
    }

    fn release_block_of_rows(&self, block: RawBlock<'_>) -> Result<(), Status> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release_block_of_rows(block)
    }

    fn get_block_of_column_values(
        &self,
        col: usize,
        rows: Range<usize>,
        mode: ReadWriteMode,
        data_type: DataType,
    ) -> Result<RawBlock<'_>, Status> {
        let block = self
            .inner
            .get_block_of_column_values(col, rows, mode, data_type)?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(block)
    }

    fn release_block_of_column_values(&self, block: RawBlock<'_>) -> Result<(), Status> {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release_block_of_column_values(block)
    }

    fn as_csr(&self) -> Option<&dyn CsrAccess> {
        self.inner.as_csr()
    }
}

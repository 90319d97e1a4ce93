//! Layout-polymorphic numeric tables for Tabula.
//!
//! Kernels never touch a table's storage directly. They request a block
//! of rows or of one column's values in the value type they compute in,
//! and the table hands back either a zero-copy view of its backing store
//! or an owned converted copy that is written back on release.
//!
//! # Architecture
//!
//! ```text
//! NumericTable (get/release block contract)
//! ├── HomogenNumericTable<S>   one row-major SharedBuffer<S>
//! ├── SoaNumericTable          one SharedBuffer per column, mixed types
//! └── CsrNumericTable<S>       read-only, one-based CSR arrays (CsrAccess)
//!
//! SharedBuffer<S> ── LeaseRegistry ── LeaseGuard (held by every block)
//! RawBlock ─ BlockDescriptor<T> ─ ReadRows / WriteRows / WriteOnlyRows / ...
//! ```
//!
//! # Concurrency
//!
//! Tables are shared by `&` reference across worker threads. Every block
//! leases the element range it views: shared leases overlap freely,
//! exclusive (write) leases overlap nothing, and a conflicting request
//! fails with [`ErrorId::BlockBusy`](tabula_core::ErrorId::BlockBusy).
//! Workers that own disjoint row ranges therefore write one destination
//! table concurrently without further locking.
//!
//! All `unsafe` code lives in the private `raw` module.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod accessor;
pub mod block;
pub mod csr;
pub mod homogen;
pub mod lease;
mod raw;
pub mod soa;
pub mod table;
pub mod validate;

pub use accessor::{
    ReadColumns, ReadRows, ReadRowsCsr, WriteOnlyColumns, WriteOnlyRows, WriteRows,
};
pub use block::{alloc_any, BlockDescriptor, CsrBlock, RawBlock, RawCsrBlock};
pub use csr::CsrNumericTable;
pub use homogen::HomogenNumericTable;
pub use soa::SoaNumericTable;
pub use table::{clamp_rows, CsrAccess, NumericTable, NumericTableExt};
pub use validate::{check_numeric_table, CheckOptions};

//! Tabula: layout-polymorphic numeric tables, runtime CPU dispatch and
//! threaded reduction kernels.
//!
//! This is the facade crate that re-exports the public API of every Tabula
//! sub-crate. Most users only need `tabula` as a dependency.
//!
//! # Quick start
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! # fn main() -> Result<(), Status> {
//! // Six points in two groups, stored row-major.
//! let data = HomogenNumericTable::from_vec(
//!     vec![0.0, 0.1, 0.2, 0.0, 0.1, 0.2, 8.0, 8.1, 8.2, 8.0, 8.1, 8.2],
//!     6,
//!     2,
//! )?;
//! assert!(all_values_are_finite(&data, false)?);
//!
//! // Read two rows through a scoped block.
//! let mut rows = ReadRows::<f64>::new(&data, 0, 2)?;
//! assert_eq!(rows.row(1), &[0.2, 0.0]);
//! rows.release()?;
//!
//! let result = tabula::kernels::kmeans::fit(&data, &KMeansParams::new(2))?;
//! assert_eq!(result.assignments.n_rows(), 6);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tabula-core` | `ErrorId`, `Status`, `SafeStatus`, value types, metadata |
//! | [`table`] | `tabula-table` | `NumericTable`, concrete tables, block accessors, validation |
//! | [`dispatch`] | `tabula-dispatch` | CPU detection, `DispatchTable`, cache heuristics |
//! | [`threading`] | `tabula-threading` | `Threader`, `Tls`, threading config |
//! | [`kernels`] | `tabula-kernels` | finiteness, k-means, norms |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Error classification, status accumulation and value types
/// (`tabula-core`).
///
/// Everything fallible in Tabula returns `Result<_, `[`types::Status`]`>`.
pub use tabula_core as types;

/// The numeric-table contract and its dense, SOA and CSR implementations
/// (`tabula-table`).
///
/// Kernels read tables through the scoped accessors such as
/// [`table::ReadRows`] and [`table::WriteOnlyRows`].
pub use tabula_table as table;

/// Runtime CPU feature detection and per-ISA dispatch (`tabula-dispatch`).
pub use tabula_dispatch as dispatch;

/// Fork/join data-parallel regions (`tabula-threading`).
pub use tabula_threading as threading;

/// Reduction kernels (`tabula-kernels`).
pub use tabula_kernels as kernels;

/// Common imports for typical Tabula usage.
///
/// ```rust
/// use tabula::prelude::*;
/// ```
pub mod prelude {
    // Status and values
    pub use tabula_core::{
        DataType, Error, ErrorId, NumericValue, ReadWriteMode, SafeStatus, Status, StorageLayout,
    };

    // Tables and accessors
    pub use tabula_table::{
        check_numeric_table, CheckOptions, CsrNumericTable, HomogenNumericTable, NumericTable,
        NumericTableExt, ReadColumns, ReadRows, ReadRowsCsr, SoaNumericTable, WriteOnlyColumns,
        WriteOnlyRows, WriteRows,
    };

    // Dispatch and threading
    pub use tabula_dispatch::{CpuType, DispatchConfig, DispatchTable};
    pub use tabula_threading::{Threader, ThreadingConfig, Tls};

    // Kernels
    pub use tabula_kernels::kmeans::{InitMethod, KMeans, KMeansParams, KMeansResult};
    pub use tabula_kernels::norms::{frobenius_norm, max_abs_norm, row_l2_norms};
    pub use tabula_kernels::{all_values_are_finite, all_values_are_finite_with};
}

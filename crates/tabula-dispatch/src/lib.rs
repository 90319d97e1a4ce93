//! Runtime CPU dispatch for Tabula kernels.
//!
//! Kernels register one implementation per instruction-set tier in a
//! [`DispatchTable`]. At call time the table resolves to the best entry
//! not above the effective [`CpuType`]: the tier the running CPU supports,
//! optionally capped by `TABULA_CPU_MAX` or a [`DispatchConfig`].
//!
//! [`CacheInfo`] supplies the cache sizes the threaded kernels use to
//! pick row block sizes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod config;
pub mod cpu;
pub mod table;

pub use cache::{CacheInfo, MAX_BLOCK_ROWS, MIN_BLOCK_ROWS};
pub use config::{ConfigError, DispatchConfig, CPU_MAX_ENV};
pub use cpu::{detect, detected_cpu_type, effective_cpu_type, CpuFeatures, CpuType};
pub use table::DispatchTable;

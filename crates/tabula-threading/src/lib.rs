//! Data-parallel fork/join threading for Tabula kernels.
//!
//! A [`Threader`] runs one region at a time on scoped workers: the index
//! space is cut into blocks, workers (including the calling thread)
//! claim block indices from a shared atomic cursor, and the region joins before returning. There is no cancellation; kernels
//! record per-block failures into a
//! [`SafeStatus`](tabula_core::SafeStatus) and skip remaining work once it
//! is no longer ok.
//!
//! Per-worker scratch lives in [`Tls`] and is reduced sequentially after
//! the join.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod threader;
pub mod tls;

pub use config::{ConfigError, ThreadingConfig, MAX_THREADS};
pub use threader::Threader;
pub use tls::Tls;

//! Threader configuration, validation, and error types.

use std::error::Error as StdError;
use std::fmt;

use tabula_core::{Error, ErrorId};
use tabula_dispatch::MIN_BLOCK_ROWS;

/// Upper bound on explicitly configured worker counts.
pub const MAX_THREADS: usize = 256;

/// Configuration for a [`Threader`](crate::Threader).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadingConfig {
    /// Number of workers per region, the calling thread included.
    /// `None` = `available_parallelism`.
    pub num_threads: Option<usize>,
    /// Floor for cache-derived row block sizes. Default: 32.
    pub min_block_rows: usize,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            min_block_rows: MIN_BLOCK_ROWS,
        }
    }
}

impl ThreadingConfig {
    /// Config with an explicit worker count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Self::default()
        }
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, MAX_THREADS]`.
    pub fn resolved_num_threads(&self) -> usize {
        match self.num_threads {
            Some(n) => n.clamp(1, MAX_THREADS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        if self.min_block_rows == 0 {
            return Err(ConfigError::ZeroBlockRows);
        }
        Ok(())
    }
}

/// Errors detected by [`ThreadingConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `num_threads` is `Some(0)`.
    ZeroThreads,
    /// `min_block_rows` is zero.
    ZeroBlockRows,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThreads => write!(f, "num_threads must be at least 1"),
            Self::ZeroBlockRows => write!(f, "min_block_rows must be at least 1"),
        }
    }
}

impl StdError for ConfigError {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        let argument = match err {
            ConfigError::ZeroThreads => "num_threads",
            ConfigError::ZeroBlockRows => "min_block_rows",
        };
        Error::new(ErrorId::IncorrectParameter)
            .with_argument(argument)
            .with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_counts_are_clamped() {
        assert_eq!(ThreadingConfig::with_threads(0).resolved_num_threads(), 1);
        assert_eq!(ThreadingConfig::with_threads(3).resolved_num_threads(), 3);
        assert_eq!(
            ThreadingConfig::with_threads(10_000).resolved_num_threads(),
            MAX_THREADS
        );
    }

    #[test]
    fn auto_detect_is_at_least_one() {
        assert!(ThreadingConfig::default().resolved_num_threads() >= 1);
    }

    #[test]
    fn validate_rejects_zeroes() {
        assert_eq!(ThreadingConfig::default().validate(), Ok(()));
        assert_eq!(
            ThreadingConfig::with_threads(0).validate(),
            Err(ConfigError::ZeroThreads)
        );
        let cfg = ThreadingConfig {
            min_block_rows: 0,
            ..ThreadingConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroBlockRows));
    }

    #[test]
    fn config_error_maps_to_incorrect_parameter() {
        let err: Error = ConfigError::ZeroBlockRows.into();
        assert_eq!(err.id(), ErrorId::IncorrectParameter);
        assert_eq!(err.argument(), Some("min_block_rows"));
    }
}

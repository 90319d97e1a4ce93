//! Dispatch configuration and its error type.

use std::error::Error as StdError;
use std::fmt;

use tabula_core::{Error, ErrorId};

use crate::cpu::{detected_cpu_type, CpuType};

/// Environment variable capping the dispatch tier.
pub const CPU_MAX_ENV: &str = "TABULA_CPU_MAX";

/// Caps which kernel variants may be selected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Highest tier to dispatch to. `None` = whatever the CPU supports.
    pub max_cpu: Option<CpuType>,
}

impl DispatchConfig {
    /// Read the cap from [`CPU_MAX_ENV`]. Unset or empty means no cap.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_value(std::env::var(CPU_MAX_ENV).ok().as_deref())
    }

    /// Parse the cap from a raw environment value.
    pub fn from_env_value(value: Option<&str>) -> Result<Self, ConfigError> {
        let max_cpu = match value.map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(v.parse()?),
        };
        Ok(Self { max_cpu })
    }

    /// The detected tier capped by `max_cpu`.
    pub fn effective_cpu_type(&self) -> CpuType {
        self.cap(detected_cpu_type())
    }

    /// `detected` capped by `max_cpu`.
    pub fn cap(&self, detected: CpuType) -> CpuType {
        match self.max_cpu {
            Some(max) => detected.min(max),
            None => detected,
        }
    }
}

/// Invalid dispatch configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The value does not name a [`CpuType`].
    UnknownCpuType {
        /// The rejected value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCpuType { value } => write!(
                f,
                "unknown cpu type '{value}' (expected sse2, sse42, avx2 or avx512)"
            ),
        }
    }
}

impl StdError for ConfigError {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::new(ErrorId::IncorrectParameter)
            .with_argument(CPU_MAX_ENV)
            .with_message(err.to_string())
    }
}

//! CPU instruction-set detection.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::{ConfigError, DispatchConfig};

/// Instruction-set tiers kernels can be specialised for, in increasing
/// capability order.
///
/// `Sse2` is the baseline every build supports; kernels registered for it
/// are plain scalar code. On non-x86 targets it is the only tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CpuType {
    /// Baseline (scalar kernels).
    Sse2,
    /// SSE4.2.
    Sse42,
    /// AVX2 with 256-bit vectors.
    Avx2,
    /// AVX-512F with 512-bit vectors.
    Avx512,
}

impl CpuType {
    /// Every tier, lowest first.
    pub const ALL: [CpuType; 4] = [Self::Sse2, Self::Sse42, Self::Avx2, Self::Avx512];

    /// Lower-case name as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Sse2 => "sse2",
            Self::Sse42 => "sse42",
            Self::Avx2 => "avx2",
            Self::Avx512 => "avx512",
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CpuType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or(ConfigError::UnknownCpuType { value: s.to_owned() })
    }
}

/// Instruction-set extensions present on the running CPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    /// SSE2.
    pub sse2: bool,
    /// SSE4.2.
    pub sse42: bool,
    /// AVX2.
    pub avx2: bool,
    /// FMA3.
    pub fma: bool,
    /// AVX-512 Foundation.
    pub avx512f: bool,
}

impl CpuFeatures {
    /// Query the running CPU.
    pub fn query() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                sse2: is_x86_feature_detected!("sse2"),
                sse42: is_x86_feature_detected!("sse4.2"),
                avx2: is_x86_feature_detected!("avx2"),
                fma: is_x86_feature_detected!("fma"),
                avx512f: is_x86_feature_detected!("avx512f"),
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self::default()
        }
    }

    /// Highest tier whose extensions are all present.
    pub fn best(&self) -> CpuType {
        if self.avx512f && self.avx2 {
            CpuType::Avx512
        } else if self.avx2 {
            CpuType::Avx2
        } else if self.sse42 {
            CpuType::Sse42
        } else {
            CpuType::Sse2
        }
    }
}

static FEATURES: OnceLock<CpuFeatures> = OnceLock::new();
static EFFECTIVE: OnceLock<CpuType> = OnceLock::new();

/// Features of the running CPU, queried once per process.
pub fn detect() -> &'static CpuFeatures {
    FEATURES.get_or_init(|| {
        let features = CpuFeatures::query();
        tracing::debug!(?features, best = %features.best(), "detected cpu features");
        features
    })
}

/// Highest tier the running CPU supports.
pub fn detected_cpu_type() -> CpuType {
    detect().best()
}

/// The tier kernels dispatch on: the detected tier capped by the
/// process-wide [`DispatchConfig`] (read once from `TABULA_CPU_MAX`).
///
/// An invalid `TABULA_CPU_MAX` is logged and ignored here; call
/// [`DispatchConfig::from_env`] directly to surface it as an error.
pub fn effective_cpu_type() -> CpuType {
    *EFFECTIVE.get_or_init(|| {
        let config = DispatchConfig::from_env().unwrap_or_else(|err| {
            tracing::warn!(%err, "ignoring dispatch configuration");
            DispatchConfig::default()
        });
        let cpu = config.effective_cpu_type();
        tracing::debug!(%cpu, max = ?config.max_cpu, "effective cpu type");
        cpu
    })
}

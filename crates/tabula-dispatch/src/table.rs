//! Per-tier kernel tables.

use smallvec::SmallVec;

use crate::cpu::{detected_cpu_type, effective_cpu_type, CpuType};

/// Kernel variants keyed by [`CpuType`], with a mandatory baseline.
///
/// `F` is normally a plain `fn` pointer. Resolution picks the highest
/// registered tier not above the requested tier *and* not above what the
/// running CPU supports, so a variant compiled with
/// `#[target_feature(enable = "avx2")]` is only ever returned on a CPU
/// with AVX2.
///
/// ```
/// use tabula_dispatch::{CpuType, DispatchTable};
///
/// fn scalar(x: &[f64]) -> f64 { x.iter().sum() }
/// fn wide(x: &[f64]) -> f64 { x.iter().sum() }
///
/// let table = DispatchTable::new("sum", scalar as fn(&[f64]) -> f64)
///     .with(CpuType::Avx2, wide);
/// assert_eq!(table.resolve_for(CpuType::Sse42).0, CpuType::Sse2);
/// assert_eq!((table.resolve())(&[1.0, 2.0]), 3.0);
/// ```
#[derive(Clone, Debug)]
pub struct DispatchTable<F> {
    name: &'static str,
    /// Sorted by tier, highest first; always ends with the baseline.
    entries: SmallVec<[(CpuType, F); 4]>,
}

impl<F: Copy> DispatchTable<F> {
    /// A table with only the baseline (`Sse2`) variant.
    pub fn new(name: &'static str, baseline: F) -> Self {
        let mut entries = SmallVec::new();
        entries.push((CpuType::Sse2, baseline));
        Self { name, entries }
    }

    /// Register `f` for `cpu`, replacing any previous entry for that tier.
    pub fn with(mut self, cpu: CpuType, f: F) -> Self {
        match self.entries.iter_mut().find(|(c, _)| *c == cpu) {
            Some(entry) => entry.1 = f,
            None => {
                self.entries.push((cpu, f));
                self.entries.sort_by(|a, b| b.0.cmp(&a.0));
            }
        }
        self
    }

    /// Kernel name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registered tiers, highest first.
    pub fn variants(&self) -> impl Iterator<Item = CpuType> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    /// Best variant for `cpu`, capped by the detected CPU.
    pub fn resolve_for(&self, cpu: CpuType) -> (CpuType, F) {
        let limit = cpu.min(detected_cpu_type());
        self.entries
            .iter()
            .copied()
            .find(|(c, _)| *c <= limit)
            .unwrap_or(self.entries[self.entries.len() - 1])
    }

    /// Best variant for the process-wide effective CPU type.
    pub fn resolve(&self) -> F {
        let (cpu, f) = self.resolve_for(effective_cpu_type());
        tracing::debug!(kernel = self.name, variant = %cpu, "dispatch resolved");
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Probe = fn() -> CpuType;

    fn scalar() -> CpuType {
        CpuType::Sse2
    }
    fn avx2() -> CpuType {
        CpuType::Avx2
    }
    fn avx512() -> CpuType {
        CpuType::Avx512
    }

    fn full() -> DispatchTable<Probe> {
        DispatchTable::new("probe", scalar as Probe)
            .with(CpuType::Avx512, avx512)
            .with(CpuType::Avx2, avx2)
    }

    #[test]
    fn entries_sorted_highest_first() {
        let tiers: Vec<_> = full().variants().collect();
        assert_eq!(tiers, vec![CpuType::Avx512, CpuType::Avx2, CpuType::Sse2]);
    }

    #[test]
    fn baseline_always_resolves() {
        let (cpu, f) = full().resolve_for(CpuType::Sse2);
        assert_eq!(cpu, CpuType::Sse2);
        assert_eq!(f(), CpuType::Sse2);
        let (cpu, _) = full().resolve_for(CpuType::Sse42);
        assert_eq!(cpu, CpuType::Sse2);
    }

    #[test]
    fn never_above_requested_or_detected() {
        let table = full();
        for requested in CpuType::ALL {
            let (cpu, f) = table.resolve_for(requested);
            assert!(cpu <= requested);
            assert!(cpu <= detected_cpu_type());
            assert_eq!(f(), cpu);
        }
    }

    #[test]
    fn with_replaces_existing_tier() {
        let table = DispatchTable::new("probe", scalar as Probe).with(CpuType::Sse2, avx2);
        assert_eq!(table.variants().count(), 1);
        assert_eq!((table.resolve_for(CpuType::Sse2).1)(), CpuType::Avx2);
    }
}

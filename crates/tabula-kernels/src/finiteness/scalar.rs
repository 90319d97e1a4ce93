//! Baseline variants, also used for SIMD tails.

pub(super) const F64_EXP: u64 = 0x7ff0_0000_0000_0000;
pub(super) const F64_FRAC: u64 = 0x000f_ffff_ffff_ffff;
pub(super) const F32_EXP: u32 = 0x7f80_0000;
pub(super) const F32_FRAC: u32 = 0x007f_ffff;

pub(super) fn sum_f64(x: &[f64]) -> f64 {
    x.iter().sum()
}

pub(super) fn sum_f32(x: &[f32]) -> f32 {
    x.iter().sum()
}

/// Exponent all ones is NaN or Inf; a zero fraction narrows it to Inf.
pub(super) fn any_non_finite_f64(x: &[f64], allow_nan: bool) -> bool {
    x.iter().any(|v| {
        let bits = v.to_bits();
        bits & F64_EXP == F64_EXP && (!allow_nan || bits & F64_FRAC == 0)
    })
}

pub(super) fn any_non_finite_f32(x: &[f32], allow_nan: bool) -> bool {
    x.iter().any(|v| {
        let bits = v.to_bits();
        bits & F32_EXP == F32_EXP && (!allow_nan || bits & F32_FRAC == 0)
    })
}

//! AVX2 variants: 4 x f64 or 8 x f32 per iteration.
//!
//! The safe wrappers are only registered for [`CpuType::Avx2`] and above,
//! and a `DispatchTable` never resolves a tier the running CPU lacks.
//!
//! [`CpuType::Avx2`]: tabula_dispatch::CpuType::Avx2

#![allow(unsafe_code)]

use std::arch::x86_64::*;

use super::scalar::{self, F32_EXP, F32_FRAC, F64_EXP, F64_FRAC};

pub(super) fn sum_f64(x: &[f64]) -> f64 {
    // SAFETY: resolved only on CPUs reporting AVX2.
    unsafe { sum_f64_impl(x) }
}

pub(super) fn sum_f32(x: &[f32]) -> f32 {
    // SAFETY: resolved only on CPUs reporting AVX2.
    unsafe { sum_f32_impl(x) }
}

pub(super) fn any_non_finite_f64(x: &[f64], allow_nan: bool) -> bool {
    // SAFETY: resolved only on CPUs reporting AVX2.
    unsafe { any_non_finite_f64_impl(x, allow_nan) }
}

pub(super) fn any_non_finite_f32(x: &[f32], allow_nan: bool) -> bool {
    // SAFETY: resolved only on CPUs reporting AVX2.
    unsafe { any_non_finite_f32_impl(x, allow_nan) }
}

#[target_feature(enable = "avx2")]
unsafe fn sum_f64_impl(x: &[f64]) -> f64 {
    let chunks = x.chunks_exact(4);
    let tail = chunks.remainder();
    let mut acc = _mm256_setzero_pd();
    for c in chunks {
        // SAFETY: `c` holds exactly 4 values; unaligned load.
        acc = _mm256_add_pd(acc, unsafe { _mm256_loadu_pd(c.as_ptr()) });
    }
    let mut lanes = [0.0f64; 4];
    // SAFETY: `lanes` holds exactly 4 values.
    unsafe { _mm256_storeu_pd(lanes.as_mut_ptr(), acc) };
    lanes.iter().sum::<f64>() + scalar::sum_f64(tail)
}

#[target_feature(enable = "avx2")]
unsafe fn sum_f32_impl(x: &[f32]) -> f32 {
    let chunks = x.chunks_exact(8);
    let tail = chunks.remainder();
    let mut acc = _mm256_setzero_ps();
    for c in chunks {
        // SAFETY: `c` holds exactly 8 values; unaligned load.
        acc = _mm256_add_ps(acc, unsafe { _mm256_loadu_ps(c.as_ptr()) });
    }
    let mut lanes = [0.0f32; 8];
    // SAFETY: `lanes` holds exactly 8 values.
    unsafe { _mm256_storeu_ps(lanes.as_mut_ptr(), acc) };
    lanes.iter().sum::<f32>() + scalar::sum_f32(tail)
}

#[target_feature(enable = "avx2")]
unsafe fn any_non_finite_f64_impl(x: &[f64], allow_nan: bool) -> bool {
    let exp = _mm256_set1_epi64x(F64_EXP as i64);
    let frac = _mm256_set1_epi64x(F64_FRAC as i64);
    let zero = _mm256_setzero_si256();
    let chunks = x.chunks_exact(4);
    let tail = chunks.remainder();
    let mut bad = zero;
    for c in chunks {
        // SAFETY: `c` holds exactly 4 values; unaligned load.
        let bits = _mm256_castpd_si256(unsafe { _mm256_loadu_pd(c.as_ptr()) });
        let mut hit = _mm256_cmpeq_epi64(_mm256_and_si256(bits, exp), exp);
        if allow_nan {
            let inf = _mm256_cmpeq_epi64(_mm256_and_si256(bits, frac), zero);
            hit = _mm256_and_si256(hit, inf);
        }
        bad = _mm256_or_si256(bad, hit);
    }
    _mm256_testz_si256(bad, bad) == 0 || scalar::any_non_finite_f64(tail, allow_nan)
}

#[target_feature(enable = "avx2")]
unsafe fn any_non_finite_f32_impl(x: &[f32], allow_nan: bool) -> bool {
    let exp = _mm256_set1_epi32(F32_EXP as i32);
    let frac = _mm256_set1_epi32(F32_FRAC as i32);
    let zero = _mm256_setzero_si256();
    let chunks = x.chunks_exact(8);
    let tail = chunks.remainder();
    let mut bad = zero;
    for c in chunks {
        // SAFETY: `c` holds exactly 8 values; unaligned load.
        let bits = _mm256_castps_si256(unsafe { _mm256_loadu_ps(c.as_ptr()) });
        let mut hit = _mm256_cmpeq_epi32(_mm256_and_si256(bits, exp), exp);
        if allow_nan {
            let inf = _mm256_cmpeq_epi32(_mm256_and_si256(bits, frac), zero);
            hit = _mm256_and_si256(hit, inf);
        }
        bad = _mm256_or_si256(bad, hit);
    }
    _mm256_testz_si256(bad, bad) == 0 || scalar::any_non_finite_f32(tail, allow_nan)
}

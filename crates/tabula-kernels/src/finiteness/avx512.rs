//! AVX-512F variants: 8 x f64 or 16 x f32 per iteration.
//!
//! Registered for [`CpuType::Avx512`](tabula_dispatch::CpuType::Avx512)
//! only; see the AVX2 module for the dispatch contract.

#![allow(unsafe_code)]

use std::arch::x86_64::*;

use super::scalar::{self, F32_EXP, F32_FRAC, F64_EXP, F64_FRAC};

pub(super) fn sum_f64(x: &[f64]) -> f64 {
    // SAFETY: resolved only on CPUs reporting AVX-512F.
    unsafe { sum_f64_impl(x) }
}

pub(super) fn sum_f32(x: &[f32]) -> f32 {
    // SAFETY: resolved only on CPUs reporting AVX-512F.
    unsafe { sum_f32_impl(x) }
}

pub(super) fn any_non_finite_f64(x: &[f64], allow_nan: bool) -> bool {
    // SAFETY: resolved only on CPUs reporting AVX-512F.
    unsafe { any_non_finite_f64_impl(x, allow_nan) }
}

pub(super) fn any_non_finite_f32(x: &[f32], allow_nan: bool) -> bool {
    // SAFETY: resolved only on CPUs reporting AVX-512F.
    unsafe { any_non_finite_f32_impl(x, allow_nan) }
}

#[target_feature(enable = "avx512f")]
unsafe fn sum_f64_impl(x: &[f64]) -> f64 {
    let chunks = x.chunks_exact(8);
    let tail = chunks.remainder();
    let mut acc = _mm512_setzero_pd();
    for c in chunks {
        // SAFETY: `c` holds exactly 8 values; unaligned load.
        acc = _mm512_add_pd(acc, unsafe { _mm512_loadu_pd(c.as_ptr()) });
    }
    let mut lanes = [0.0f64; 8];
    // SAFETY: `lanes` holds exactly 8 values.
    unsafe { _mm512_storeu_pd(lanes.as_mut_ptr(), acc) };
    lanes.iter().sum::<f64>() + scalar::sum_f64(tail)
}

#[target_feature(enable = "avx512f")]
unsafe fn sum_f32_impl(x: &[f32]) -> f32 {
    let chunks = x.chunks_exact(16);
    let tail = chunks.remainder();
    let mut acc = _mm512_setzero_ps();
    for c in chunks {
        // SAFETY: `c` holds exactly 16 values; unaligned load.
        acc = _mm512_add_ps(acc, unsafe { _mm512_loadu_ps(c.as_ptr()) });
    }
    let mut lanes = [0.0f32; 16];
    // SAFETY: `lanes` holds exactly 16 values.
    unsafe { _mm512_storeu_ps(lanes.as_mut_ptr(), acc) };
    lanes.iter().sum::<f32>() + scalar::sum_f32(tail)
}

#[target_feature(enable = "avx512f")]
unsafe fn any_non_finite_f64_impl(x: &[f64], allow_nan: bool) -> bool {
    let exp = _mm512_set1_epi64(F64_EXP as i64);
    let frac = _mm512_set1_epi64(F64_FRAC as i64);
    let zero = _mm512_setzero_si512();
    let chunks = x.chunks_exact(8);
    let tail = chunks.remainder();
    for c in chunks {
        // SAFETY: `c` holds exactly 8 values; unaligned load.
        let bits = _mm512_castpd_si512(unsafe { _mm512_loadu_pd(c.as_ptr()) });
        let mut hit = _mm512_cmpeq_epi64_mask(_mm512_and_si512(bits, exp), exp);
        if allow_nan {
            hit &= _mm512_cmpeq_epi64_mask(_mm512_and_si512(bits, frac), zero);
        }
        if hit != 0 {
            return true;
        }
    }
    scalar::any_non_finite_f64(tail, allow_nan)
}

#[target_feature(enable = "avx512f")]
unsafe fn any_non_finite_f32_impl(x: &[f32], allow_nan: bool) -> bool {
    let exp = _mm512_set1_epi32(F32_EXP as i32);
    let frac = _mm512_set1_epi32(F32_FRAC as i32);
    let zero = _mm512_setzero_si512();
    let chunks = x.chunks_exact(16);
    let tail = chunks.remainder();
    for c in chunks {
        // SAFETY: `c` holds exactly 16 values; unaligned load.
        let bits = _mm512_castps_si512(unsafe { _mm512_loadu_ps(c.as_ptr()) });
        let mut hit = _mm512_cmpeq_epi32_mask(_mm512_and_si512(bits, exp), exp);
        if allow_nan {
            hit &= _mm512_cmpeq_epi32_mask(_mm512_and_si512(bits, frac), zero);
        }
        if hit != 0 {
            return true;
        }
    }
    scalar::any_non_finite_f32(tail, allow_nan)
}

//! Squared Euclidean distance kernel.
//!
//! The engine only ever compares distances, so the square root is never
//! taken; ordering is unchanged and the hot loop stays multiply-add only.
//! Provides NEON (aarch64) and AVX2+FMA (x86_64) implementations with a
//! scalar fallback for other targets or when AVX2 is unavailable at runtime.
//! The SIMD paths cover the full 4- or 8-lane chunks and hand the remainder
//! back to the scalar kernel.

/// Squared Euclidean distance between two f32 slices of equal length.
///
/// Callers pass the contiguous vector lanes of a point and a query; the
/// scalar metadata lanes must already be stripped.
#[inline]
#[allow(unreachable_code)]
pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { neon_euclidean_sq(a, b) };
    }
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") && std::arch::is_x86_feature_detected!("fma")
        {
            return unsafe { avx2_euclidean_sq(a, b) };
        }
    }
    scalar_euclidean_sq(a, b)
}

fn scalar_euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

// ============================================================================
// NEON implementation (aarch64)
// ============================================================================

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

#[cfg(target_arch = "aarch64")]
unsafe fn neon_euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    // Two independent accumulators, eight lanes per step, so the fused
    // multiply-adds of consecutive iterations do not serialize on one
    // register.
    let mut acc0 = vdupq_n_f32(0.0);
    let mut acc1 = vdupq_n_f32(0.0);

    let steps = a.len() / 8;
    for i in 0..steps {
        let at = a.as_ptr().add(i * 8);
        let bt = b.as_ptr().add(i * 8);
        let d0 = vsubq_f32(vld1q_f32(at), vld1q_f32(bt));
        let d1 = vsubq_f32(vld1q_f32(at.add(4)), vld1q_f32(bt.add(4)));
        acc0 = vfmaq_f32(acc0, d0, d0);
        acc1 = vfmaq_f32(acc1, d1, d1);
    }

    let done = steps * 8;
    vaddvq_f32(acc0) + vaddvq_f32(acc1) + scalar_euclidean_sq(&a[done..], &b[done..])
}

// ============================================================================
// AVX2+FMA implementation (x86_64)
// ============================================================================

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = _mm256_setzero_ps();

    let steps = a.len() / 8;
    for i in 0..steps {
        let va = _mm256_loadu_ps(a.as_ptr().add(i * 8));
        let vb = _mm256_loadu_ps(b.as_ptr().add(i * 8));
        let d = _mm256_sub_ps(va, vb);
        acc = _mm256_fmadd_ps(d, d, acc);
    }

    // Fold the eight partial sums: add the two 128-bit halves, then two
    // horizontal-add rounds collapse the remaining four lanes.
    let halves = _mm_add_ps(_mm256_castps256_ps128(acc), _mm256_extractf128_ps(acc, 1));
    let pairs = _mm_hadd_ps(halves, halves);
    let total = _mm_cvtss_f32(_mm_hadd_ps(pairs, pairs));

    let done = steps * 8;
    total + scalar_euclidean_sq(&a[done..], &b[done..])
}

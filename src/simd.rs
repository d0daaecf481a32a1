//! Vector kernels used by scoring and representation lookups.
//!
//! All arithmetic is `f32`. Portable implementations; the zipped loops
//! auto-vectorize.
//!
//! ```rust
//! use decayrank::simd::{dot, norm};
//!
//! let a = [1.0_f32, 2.0, 3.0];
//! assert_eq!(dot(&a, &a), 14.0);
//! assert!((norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
//! ```

/// Dot product of two vectors. Extra trailing elements of the longer slice are ignored.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Accumulate `scale * row` into `out` (`out += scale * row`).
#[inline]
pub fn axpy(out: &mut [f32], scale: f32, row: &[f32]) {
    for (o, r) in out.iter_mut().zip(row.iter()) {
        *o += scale * r;
    }
}

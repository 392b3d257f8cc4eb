//! Distance functions for equal-dimension vectors.
//!
//! All functions work directly with slices. Lower value = more similar.

/// Computes the Euclidean (L2) distance between two vectors.
///
/// This is the metric reported by the virtual table's `distance` column.
#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    euclidean_squared(a, b).sqrt()
}

/// Computes the squared Euclidean distance between two vectors.
///
/// Faster than [`euclidean`] as it avoids the sqrt operation; the square
/// preserves ranking order, so query execution scores with this and takes
/// the root only for rows it actually streams out.
#[inline]
pub fn euclidean_squared(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len());
    let mut sum = 0.0;
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }
    sum
}

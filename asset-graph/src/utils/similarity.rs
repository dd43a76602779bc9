//! Vector similarity functions.

use ndarray::ArrayView1;

/// Compute the cosine similarity between two f32 slices.
///
/// Returns `0.0` for empty slices, mismatched lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (a, b) = (ArrayView1::from(a), ArrayView1::from(b));
    let denom = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    a.dot(&b) / denom
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = ArrayView1::from(&*v).dot(&ArrayView1::from(&*v)).sqrt();
    if norm == 0.0 {
        return;
    }
    v.iter_mut().for_each(|x| *x /= norm);
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_cosine_identical_and_opposite() {
        let v = [1.0_f32, 2.0, 3.0];
        let neg = [-1.0_f32, -2.0, -3.0];
        assert!(approx_eq(cosine_similarity(&v, &v), 1.0));
        assert!(approx_eq(cosine_similarity(&v, &neg), -1.0));
    }

    #[test]
    fn test_cosine_known_vectors() {
        // dot = 24, |a| = |b| = 5
        assert!(approx_eq(cosine_similarity(&[3.0, 4.0], &[4.0, 3.0]), 0.96));
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_normalize_l2_unit_magnitude() {
        let mut v = [3.0_f32, 4.0];
        normalize_l2(&mut v);
        assert!(approx_eq(v[0], 0.6));
        assert!(approx_eq(v[1], 0.8));
    }

    #[test]
    fn test_normalize_l2_zero_vector_unchanged() {
        let mut v = [0.0_f32; 3];
        normalize_l2(&mut v);
        assert_eq!(v, [0.0, 0.0, 0.0]);
    }
}

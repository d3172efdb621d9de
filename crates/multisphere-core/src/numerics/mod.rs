pub mod special;

pub use special::DenseComplexMatrix;

use num_complex::Complex64;

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;
    for value in values {
        kahan_add(&mut sum, &mut correction, value);
    }
    sum
}

/// Hermitian inner product `Σ conj(x_i) y_i`.
pub fn inner_product(lhs: &[Complex64], rhs: &[Complex64]) -> Complex64 {
    debug_assert_eq!(lhs.len(), rhs.len(), "inner product length mismatch");
    lhs.iter().zip(rhs).map(|(x, y)| x.conj() * y).sum()
}

pub fn vector_norm(values: &[Complex64]) -> f64 {
    stable_sum(values.iter().map(|value| value.norm_sqr())).sqrt()
}

pub fn squared_distance3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    let dx = lhs[0] - rhs[0];
    let dy = lhs[1] - rhs[1];
    let dz = lhs[2] - rhs[2];
    dx * dx + dy * dy + dz * dz
}

pub fn distance3(lhs: [f64; 3], rhs: [f64; 3]) -> f64 {
    squared_distance3(lhs, rhs).sqrt()
}

/// Largest entry-wise modulus of `lhs - rhs`; `None` on length mismatch.
pub fn max_abs_difference(lhs: &[Complex64], rhs: &[Complex64]) -> Option<f64> {
    if lhs.len() != rhs.len() {
        return None;
    }
    Some(
        lhs.iter()
            .zip(rhs)
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max),
    )
}

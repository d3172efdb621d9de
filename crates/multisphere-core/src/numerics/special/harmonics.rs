use crate::common::constants::FOUR_PI;
use num_complex::Complex64;

/// Orthonormal spherical harmonic `Y_n^m(θ, φ)` with the Condon–Shortley phase.
///
/// Indices outside `0 <= |m| <= n` give zero, which lets ladder identities
/// reference neighbours without bounds checks.
pub fn y_lm(degree: i32, order: i32, theta: f64, phi: f64) -> Complex64 {
    if degree < 0 || order.abs() > degree {
        return Complex64::new(0.0, 0.0);
    }

    let degree = degree as usize;
    let positive_order = order.unsigned_abs() as usize;
    let positive = y_lm_nonnegative_order(degree, positive_order, theta, phi);
    if order >= 0 {
        positive
    } else if positive_order % 2 == 0 {
        positive.conj()
    } else {
        -positive.conj()
    }
}

fn y_lm_nonnegative_order(degree: usize, order: usize, theta: f64, phi: f64) -> Complex64 {
    let legendre = associated_legendre(degree, order, theta.cos());
    let normalization = (((2 * degree + 1) as f64) * factorial_ratio(degree, order) / FOUR_PI).sqrt();
    Complex64::from_polar(normalization * legendre, (order as f64) * phi)
}

/// `∂Y_n^m/∂θ` from the ladder identity, finite at the poles.
pub fn y_lm_theta_derivative(degree: i32, order: i32, theta: f64, phi: f64) -> Complex64 {
    if degree < 0 || order.abs() > degree {
        return Complex64::new(0.0, 0.0);
    }
    let n = f64::from(degree);
    let m = f64::from(order);
    let raising = ((n - m) * (n + m + 1.0)).sqrt()
        * Complex64::from_polar(1.0, -phi)
        * y_lm(degree, order + 1, theta, phi);
    let lowering = ((n + m) * (n - m + 1.0)).sqrt()
        * Complex64::from_polar(1.0, phi)
        * y_lm(degree, order - 1, theta, phi);
    0.5 * (raising - lowering)
}

/// `m Y_n^m / sin θ`, expressed through degree `n - 1` so it stays finite
/// at the poles.
pub fn y_lm_over_sin(degree: i32, order: i32, theta: f64, phi: f64) -> Complex64 {
    if degree < 1 || order.abs() > degree {
        return Complex64::new(0.0, 0.0);
    }
    let n = f64::from(degree);
    let m = f64::from(order);
    let lower = ((n + m) * (n + m - 1.0)).max(0.0).sqrt()
        * Complex64::from_polar(1.0, phi)
        * y_lm(degree - 1, order - 1, theta, phi);
    let upper = ((n - m) * (n - m - 1.0)).max(0.0).sqrt()
        * Complex64::from_polar(1.0, -phi)
        * y_lm(degree - 1, order + 1, theta, phi);
    -0.5 * ((2.0 * n + 1.0) / (2.0 * n - 1.0)).sqrt() * (lower + upper)
}

/// `P_n^m(x)` for `m >= 0`, Condon–Shortley phase included.
pub fn associated_legendre(degree: usize, order: usize, x: f64) -> f64 {
    if order > degree {
        return 0.0;
    }

    let root = (1.0 - x * x).max(0.0).sqrt();
    let mut p_mm = 1.0;
    for k in 1..=order {
        p_mm *= -((2 * k - 1) as f64) * root;
    }
    if degree == order {
        return p_mm;
    }

    let mut previous = p_mm;
    let mut current = x * ((2 * order + 1) as f64) * p_mm;
    for l in (order + 2)..=degree {
        let next = (((2 * l - 1) as f64) * x * current - ((l + order - 1) as f64) * previous)
            / ((l - order) as f64);
        previous = current;
        current = next;
    }
    current
}

/// `(n - m)! / (n + m)!`
fn factorial_ratio(degree: usize, order: usize) -> f64 {
    ((degree - order + 1)..=(degree + order)).fold(1.0, |ratio, term| ratio / term as f64)
}

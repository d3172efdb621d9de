//! Direct evaluation of scalar and vector spherical waves for tests.

use crate::domain::Spherical;
use crate::numerics::special::{RadialKind, spherical_h1, spherical_j, y_lm};
use num_complex::Complex64;

pub type Vector3 = [Complex64; 3];

const STEP: f64 = 1.0e-4;

/// `f_n(k r) Y_n^m(θ, φ)`.
pub fn scalar_wave(
    kind: RadialKind,
    degree: i32,
    order: i32,
    wavenumber: Complex64,
    point: [f64; 3],
) -> Complex64 {
    let position = Spherical::from_cartesian(point);
    let argument = wavenumber * position.radius;
    let radial = match kind {
        RadialKind::Regular => spherical_j(degree as usize, argument),
        RadialKind::Singular => spherical_h1(degree as usize, argument),
    };
    radial * y_lm(degree, order, position.theta, position.phi)
}

/// `M = ∇ψ × r / sqrt(n(n+1))` and `N = ∇ × M / k`, by central differences.
pub fn vector_waves(
    kind: RadialKind,
    degree: i32,
    order: i32,
    wavenumber: Complex64,
    point: [f64; 3],
) -> (Vector3, Vector3) {
    let m_wave = |at: [f64; 3]| -> Vector3 {
        let gradient = central_difference(
            |p| [scalar_wave(kind, degree, order, wavenumber, p)],
            at,
        );
        let radius = at.map(|value| Complex64::new(value, 0.0));
        let norm = f64::from(degree * (degree + 1)).sqrt();
        cross(&[gradient[0][0], gradient[1][0], gradient[2][0]], &radius).map(|c| c / norm)
    };

    // jacobian[i][c] = ∂_i M_c
    let jacobian = central_difference(&m_wave, point);
    let curl = [
        jacobian[1][2] - jacobian[2][1],
        jacobian[2][0] - jacobian[0][2],
        jacobian[0][1] - jacobian[1][0],
    ];
    (m_wave(point), curl.map(|c| c / wavenumber))
}

fn central_difference<const C: usize>(
    field: impl Fn([f64; 3]) -> [Complex64; C],
    point: [f64; 3],
) -> [[Complex64; C]; 3] {
    let mut derivatives = [[Complex64::new(0.0, 0.0); C]; 3];
    for (axis, derivative) in derivatives.iter_mut().enumerate() {
        let mut forward = point;
        let mut backward = point;
        forward[axis] += STEP;
        backward[axis] -= STEP;
        let ahead = field(forward);
        let behind = field(backward);
        for component in 0..C {
            derivative[component] = (ahead[component] - behind[component]) / (2.0 * STEP);
        }
    }
    derivatives
}

pub fn cross(lhs: &Vector3, rhs: &Vector3) -> Vector3 {
    [
        lhs[1] * rhs[2] - lhs[2] * rhs[1],
        lhs[2] * rhs[0] - lhs[0] * rhs[2],
        lhs[0] * rhs[1] - lhs[1] * rhs[0],
    ]
}

/// Field synthesized from `[M coefficients; N coefficients]` of regular waves.
pub fn regular_field(
    coefficients: &[Complex64],
    n_max: usize,
    wavenumber: Complex64,
    point: [f64; 3],
) -> Vector3 {
    let block = coefficients.len() / 2;
    let mut field = [Complex64::new(0.0, 0.0); 3];
    let mut position = 0;
    for degree in 1..=n_max as i32 {
        for order in -degree..=degree {
            let (m_wave, n_wave) =
                vector_waves(RadialKind::Regular, degree, order, wavenumber, point);
            for axis in 0..3 {
                field[axis] += coefficients[position] * m_wave[axis]
                    + coefficients[block + position] * n_wave[axis];
            }
            position += 1;
        }
    }
    field
}

pub fn assert_vector_close(label: &str, expected: &Vector3, actual: &Vector3, rel_tol: f64) {
    let scale = expected.iter().map(|value| value.norm()).fold(0.0, f64::max);
    for axis in 0..3 {
        let diff = (expected[axis] - actual[axis]).norm();
        assert!(
            diff <= rel_tol * scale,
            "{label} component {axis}: diff={diff:.3e} scale={scale:.3e}"
        );
    }
}

//! Analytic single-sphere response (Bohren–Huffman coefficients).

use crate::numerics::special::{riccati_derivatives, spherical_h1_sequence, spherical_j_sequence};
use num_complex::Complex64;

const I: Complex64 = Complex64::new(0.0, 1.0);

/// Mie coefficients for degrees `1..=n_max`, index `n - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MieCoefficients {
    /// `a_n`, electric (TM, `N` waves).
    pub electric: Vec<Complex64>,
    /// `b_n`, magnetic (TE, `M` waves).
    pub magnetic: Vec<Complex64>,
    /// `-d_n / a_n`, internal over scattered for `N` waves.
    pub internal_electric: Vec<Complex64>,
    /// `-c_n / b_n`, internal over scattered for `M` waves.
    pub internal_magnetic: Vec<Complex64>,
}

impl MieCoefficients {
    /// `size_parameter` is `k_background · radius`; permeabilities are
    /// relative values of the background and the sphere.
    pub fn new(
        n_max: usize,
        size_parameter: Complex64,
        relative_index: Complex64,
        mu_background: Complex64,
        mu_sphere: Complex64,
    ) -> Self {
        let x = size_parameter;
        let mx = relative_index * x;
        let j_outer = spherical_j_sequence(n_max, x);
        let h_outer = spherical_h1_sequence(n_max, x);
        let j_inner = spherical_j_sequence(n_max, mx);
        let dj_outer = riccati_derivatives(&j_outer, x);
        let dh_outer = riccati_derivatives(&h_outer, x);
        let dj_inner = riccati_derivatives(&j_inner, mx);

        let m2 = relative_index * relative_index;
        // Wronskian j [x h]' - h [x j]' = i / x
        let wronskian = I / x;

        let mut coefficients = Self {
            electric: Vec::with_capacity(n_max),
            magnetic: Vec::with_capacity(n_max),
            internal_electric: Vec::with_capacity(n_max),
            internal_magnetic: Vec::with_capacity(n_max),
        };
        for n in 1..=n_max {
            let (j, h, jm) = (j_outer[n], h_outer[n], j_inner[n]);
            let (dj, dh, djm) = (dj_outer[n - 1], dh_outer[n - 1], dj_inner[n - 1]);

            let numerator_a = mu_background * m2 * jm * dj - mu_sphere * j * djm;
            let denominator_a = mu_background * m2 * jm * dh - mu_sphere * h * djm;
            let numerator_b = mu_sphere * jm * dj - mu_background * j * djm;
            let denominator_b = mu_sphere * jm * dh - mu_background * h * djm;

            coefficients.electric.push(numerator_a / denominator_a);
            coefficients.magnetic.push(numerator_b / denominator_b);
            coefficients
                .internal_electric
                .push(-mu_sphere * relative_index * wronskian / numerator_a);
            coefficients
                .internal_magnetic
                .push(-mu_sphere * wronskian / numerator_b);
        }
        coefficients
    }

    pub fn n_max(&self) -> usize {
        self.electric.len()
    }

    /// Diagonal of the local T-matrix in `[M; N]` block order: `-b_n` then `-a_n`,
    /// each repeated over the `2n + 1` orders.
    pub fn t_matrix_diagonal(&self) -> Vec<Complex64> {
        let magnetic = self.magnetic.iter().map(|b| -b);
        let electric = self.electric.iter().map(|a| -a);
        expand_over_orders(magnetic)
            .into_iter()
            .chain(expand_over_orders(electric))
            .collect()
    }

    /// Diagonal mapping scattered to internal coefficients, same layout.
    pub fn internal_diagonal(&self) -> Vec<Complex64> {
        expand_over_orders(self.internal_magnetic.iter().copied())
            .into_iter()
            .chain(expand_over_orders(self.internal_electric.iter().copied()))
            .collect()
    }
}

fn expand_over_orders(per_degree: impl Iterator<Item = Complex64>) -> Vec<Complex64> {
    per_degree
        .enumerate()
        .flat_map(|(index, value)| std::iter::repeat_n(value, 2 * (index + 1) + 1))
        .collect()
}

//! Vector translation coefficients between two sphere centers.
//!
//! For a displacement `d = (R, θ, φ)` the outgoing `M`/`N` waves about the
//! old center re-expand into regular waves about the new one as
//!
//! ```text
//! M_nm = Σ_lk A[(n,m),(l,k)] M_lk + B[(n,m),(l,k)] N_lk
//! N_nm = Σ_lk B[(n,m),(l,k)] M_lk + A[(n,m),(l,k)] N_lk
//! ```
//!
//! `A` and `B` are obtained from coaxial coefficients along `R` rotated onto
//! the direction of `d`.

pub mod recurrence;

pub use recurrence::{CoaxialRecurrence, coefficient_a, coefficient_b};

use crate::domain::Spherical;
use crate::modules::indexing::vector_block_size;
use crate::numerics::special::{DenseComplexMatrix, RadialKind, WignerMatrix};
use num_complex::Complex64;

#[derive(Debug, Clone, PartialEq)]
pub struct Coupling {
    pub diagonal: DenseComplexMatrix,
    pub offdiagonal: DenseComplexMatrix,
}

impl Coupling {
    pub fn new(displacement: [f64; 3], wavenumber: Complex64, n_max: usize) -> Self {
        Self::rectangular(displacement, wavenumber, n_max, n_max)
    }

    /// Rows span source degrees `1..=source_n_max`, columns span target
    /// degrees `1..=target_n_max`.
    pub fn rectangular(
        displacement: [f64; 3],
        wavenumber: Complex64,
        source_n_max: usize,
        target_n_max: usize,
    ) -> Self {
        let axis = Spherical::from_cartesian(displacement);
        if axis.radius == 0.0 {
            return Self::self_term(source_n_max, target_n_max);
        }

        let rows = vector_block_size(source_n_max);
        let cols = vector_block_size(target_n_max);
        let mut diagonal = DenseComplexMatrix::zeros(rows, cols);
        let mut offdiagonal = DenseComplexMatrix::zeros(rows, cols);

        let max_degree = source_n_max.max(target_n_max);
        let mut table = CoaxialRecurrence::with_capacity(
            axis.radius,
            wavenumber,
            RadialKind::Singular,
            max_degree + 1,
        );
        let rotations: Vec<WignerMatrix> = (0..=max_degree as i32)
            .map(|degree| WignerMatrix::new(degree, axis.theta))
            .collect();
        let kr = wavenumber * axis.radius;

        for n in 1..=source_n_max as i32 {
            for p in 1..=target_n_max as i32 {
                let shared = n.min(p);
                let coaxial: Vec<(Complex64, Complex64)> = (-shared..=shared)
                    .map(|mu| coaxial_pair(&mut table, kr, n, mu, p))
                    .collect();

                for m in -n..=n {
                    let row = vector_position(n, m);
                    for k in -p..=p {
                        let col = vector_position(p, k);
                        let mut a_sum = Complex64::new(0.0, 0.0);
                        let mut b_sum = Complex64::new(0.0, 0.0);
                        for (mu, &(a_coaxial, b_coaxial)) in (-shared..=shared).zip(&coaxial) {
                            let weight = rotations[n as usize].get(m, mu)
                                * rotations[p as usize].get(k, mu);
                            a_sum += weight * a_coaxial;
                            b_sum += weight * b_coaxial;
                        }
                        let phase = Complex64::from_polar(1.0, f64::from(m - k) * axis.phi);
                        diagonal[(row, col)] = phase * a_sum;
                        offdiagonal[(row, col)] = phase * b_sum;
                    }
                }
            }
        }

        Self {
            diagonal,
            offdiagonal,
        }
    }

    /// Coincident centers: identity on `A`, nothing across polarizations.
    fn self_term(source_n_max: usize, target_n_max: usize) -> Self {
        let rows = vector_block_size(source_n_max);
        let cols = vector_block_size(target_n_max);
        let mut diagonal = DenseComplexMatrix::zeros(rows, cols);
        for index in 0..rows.min(cols) {
            diagonal[(index, index)] = Complex64::new(1.0, 0.0);
        }
        Self {
            diagonal,
            offdiagonal: DenseComplexMatrix::zeros(rows, cols),
        }
    }

    /// `[[Aᵀ, Bᵀ], [Bᵀ, Aᵀ]]`, mapping outgoing `[M; N]` coefficients about
    /// the source center to regular coefficients about the target center.
    pub fn translation_operator(&self) -> DenseComplexMatrix {
        let rows = self.diagonal.nrows();
        let cols = self.diagonal.ncols();
        let mut operator = DenseComplexMatrix::zeros(2 * cols, 2 * rows);
        for row in 0..rows {
            for col in 0..cols {
                let same = self.diagonal[(row, col)];
                let cross = self.offdiagonal[(row, col)];
                operator[(col, row)] = same;
                operator[(cols + col, rows + row)] = same;
                operator[(col, rows + row)] = cross;
                operator[(cols + col, row)] = cross;
            }
        }
        operator
    }

    pub fn is_self_term(&self) -> bool {
        let rows = self.diagonal.nrows();
        let cols = self.diagonal.ncols();
        (0..rows).all(|row| {
            (0..cols).all(|col| {
                let expected = if row == col { 1.0 } else { 0.0 };
                self.diagonal[(row, col)] == Complex64::new(expected, 0.0)
                    && self.offdiagonal[(row, col)] == Complex64::new(0.0, 0.0)
            })
        })
    }
}

pub fn compute_coupling(displacement: [f64; 3], wavenumber: Complex64, n_max: usize) -> Coupling {
    Coupling::new(displacement, wavenumber, n_max)
}

/// Normalized coaxial `(Ã, B̃)` for source degree `n`, order `mu`, target degree `p`.
fn coaxial_pair(
    table: &mut CoaxialRecurrence,
    kr: Complex64,
    n: i32,
    mu: i32,
    p: i32,
) -> (Complex64, Complex64) {
    let pf = f64::from(p);
    let nf = f64::from(n);
    let center = table.get(n, mu, p);
    let a_coaxial = center
        + kr * (table.get(n, mu, p + 1) * coefficient_a(p, mu) / (pf + 1.0)
            + table.get(n, mu, p - 1) * coefficient_a(p - 1, mu) / pf);
    let b_coaxial = Complex64::new(0.0, f64::from(mu)) * kr * center / (pf * (pf + 1.0));
    let scale = (pf * (pf + 1.0) / (nf * (nf + 1.0))).sqrt();
    (a_coaxial * scale, b_coaxial * scale)
}

fn vector_position(degree: i32, order: i32) -> usize {
    (degree * degree + degree + order - 1) as usize
}

//! Iterative solvers for `A x = b` on abstract complex operators.
//!
//! All three methods start from `x = 0` and measure convergence by the
//! relative residual `‖b − A x‖ / ‖b‖`. A zero right-hand side converges
//! immediately to the zero vector.

use crate::common::config::SolverConfig;
use crate::numerics::special::{DenseComplexMatrix, matvec};
use crate::numerics::{inner_product, vector_norm};
use num_complex::Complex64;

const ZERO_RHS_NORM: f64 = 1.0e-15;
const BREAKDOWN_TOLERANCE: f64 = 1.0e-14;
const DEGENERATE: f64 = 1.0e-30;

pub trait LinearOperator: Send + Sync {
    fn dimension(&self) -> usize;

    fn apply(&self, x: &[Complex64]) -> Vec<Complex64>;
}

impl LinearOperator for DenseComplexMatrix {
    fn dimension(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, x: &[Complex64]) -> Vec<Complex64> {
        matvec(self, x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrylovConfig {
    pub tolerance: f64,
    /// Upper bound on operator applications inside the iteration.
    pub max_iterations: usize,
    /// GMRES subspace size between restarts.
    pub restart: usize,
}

impl KrylovConfig {
    pub fn from_solver(config: &SolverConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            restart: config.restart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrylovStatus {
    Converged,
    IterationLimit,
    /// A scalar the recurrence divides by vanished.
    Breakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KrylovSolution {
    pub x: Vec<Complex64>,
    pub iterations: usize,
    pub residual: f64,
    pub status: KrylovStatus,
}

impl KrylovSolution {
    pub fn converged(&self) -> bool {
        self.status == KrylovStatus::Converged
    }

    fn trivial(len: usize) -> Self {
        Self {
            x: vec![Complex64::new(0.0, 0.0); len],
            iterations: 0,
            residual: 0.0,
            status: KrylovStatus::Converged,
        }
    }
}

/// Restarted GMRES with modified Gram-Schmidt Arnoldi and Givens rotations.
pub fn gmres<A: LinearOperator + ?Sized>(
    operator: &A,
    b: &[Complex64],
    config: &KrylovConfig,
) -> KrylovSolution {
    let b_norm = vector_norm(b);
    if b_norm < ZERO_RHS_NORM {
        return KrylovSolution::trivial(b.len());
    }

    let restart = config.restart.max(1);
    let mut x = vec![Complex64::new(0.0, 0.0); b.len()];
    let mut iterations = 0;

    while iterations < config.max_iterations {
        let r = residual(operator, b, &x);
        let beta = vector_norm(&r);
        if beta / b_norm < config.tolerance {
            return KrylovSolution {
                x,
                iterations,
                residual: beta / b_norm,
                status: KrylovStatus::Converged,
            };
        }

        let mut basis = vec![scaled(&r, 1.0 / beta)];
        let mut hessenberg: Vec<Vec<Complex64>> = Vec::with_capacity(restart);
        let mut rotations: Vec<(Complex64, Complex64)> = Vec::with_capacity(restart);
        let mut g = vec![Complex64::new(0.0, 0.0); restart + 1];
        g[0] = Complex64::new(beta, 0.0);

        let steps = restart.min(config.max_iterations - iterations);
        let mut estimate = beta / b_norm;
        let mut exhausted = false;

        for j in 0..steps {
            iterations += 1;
            let mut w = operator.apply(&basis[j]);
            let mut column = vec![Complex64::new(0.0, 0.0); j + 2];
            for (i, vector) in basis.iter().enumerate() {
                let projection = inner_product(vector, &w);
                column[i] = projection;
                axpy(-projection, vector, &mut w);
            }
            let w_norm = vector_norm(&w);
            column[j + 1] = Complex64::new(w_norm, 0.0);

            for (i, &(c, s)) in rotations.iter().enumerate() {
                let rotated = c.conj() * column[i] + s.conj() * column[i + 1];
                column[i + 1] = -s * column[i] + c * column[i + 1];
                column[i] = rotated;
            }
            let (c, s) = givens_rotation(column[j], column[j + 1]);
            column[j] = c.conj() * column[j] + s.conj() * column[j + 1];
            column[j + 1] = Complex64::new(0.0, 0.0);
            let rotated = c.conj() * g[j] + s.conj() * g[j + 1];
            g[j + 1] = -s * g[j] + c * g[j + 1];
            g[j] = rotated;

            rotations.push((c, s));
            hessenberg.push(column);
            estimate = g[j + 1].norm() / b_norm;

            if w_norm < BREAKDOWN_TOLERANCE {
                exhausted = true;
                break;
            }
            basis.push(scaled(&w, 1.0 / w_norm));
            if estimate < config.tolerance {
                break;
            }
        }

        let y = solve_upper_triangular(&hessenberg, &g);
        for (coefficient, vector) in y.iter().zip(&basis) {
            axpy(*coefficient, vector, &mut x);
        }
        let degenerate = hessenberg
            .iter()
            .enumerate()
            .any(|(i, column)| column[i].norm() <= DEGENERATE);
        if exhausted || degenerate {
            // Krylov space exhausted: judge by the true residual.
            let mut solution = finish(operator, b, x, iterations, b_norm, config.tolerance);
            if !solution.converged() {
                solution.status = KrylovStatus::Breakdown;
            }
            return solution;
        }
        if estimate < config.tolerance {
            return KrylovSolution {
                x,
                iterations,
                residual: estimate,
                status: KrylovStatus::Converged,
            };
        }
    }

    finish(operator, b, x, iterations, b_norm, config.tolerance)
}

/// BiCGSTAB with the initial residual as shadow vector.
pub fn bicgstab<A: LinearOperator + ?Sized>(
    operator: &A,
    b: &[Complex64],
    config: &KrylovConfig,
) -> KrylovSolution {
    let n = b.len();
    let b_norm = vector_norm(b);
    if b_norm < ZERO_RHS_NORM {
        return KrylovSolution::trivial(n);
    }

    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let mut x = vec![zero; n];
    let mut r = b.to_vec();
    let shadow = b.to_vec();
    let (mut rho, mut alpha, mut omega) = (one, one, one);
    let mut p = vec![zero; n];
    let mut v = vec![zero; n];

    let breakdown = |x: Vec<Complex64>, r: &[Complex64], iterations: usize| KrylovSolution {
        x,
        iterations,
        residual: vector_norm(r) / b_norm,
        status: KrylovStatus::Breakdown,
    };

    for iteration in 0..config.max_iterations {
        let rho_next = inner_product(&shadow, &r);
        if rho_next.norm() < DEGENERATE {
            return breakdown(x, &r, iteration);
        }
        let beta = (rho_next / rho) * (alpha / omega);
        rho = rho_next;

        for index in 0..n {
            p[index] = r[index] + beta * (p[index] - omega * v[index]);
        }
        v = operator.apply(&p);

        let shadow_v = inner_product(&shadow, &v);
        if shadow_v.norm() < DEGENERATE {
            return breakdown(x, &r, iteration);
        }
        alpha = rho / shadow_v;

        let s: Vec<Complex64> = r.iter().zip(&v).map(|(r, v)| r - alpha * v).collect();
        let s_norm = vector_norm(&s);
        if s_norm / b_norm < config.tolerance {
            axpy(alpha, &p, &mut x);
            return KrylovSolution {
                x,
                iterations: iteration + 1,
                residual: s_norm / b_norm,
                status: KrylovStatus::Converged,
            };
        }

        let t = operator.apply(&s);
        let tt = inner_product(&t, &t);
        if tt.norm() < DEGENERATE {
            return breakdown(x, &r, iteration);
        }
        omega = inner_product(&t, &s) / tt;

        axpy(alpha, &p, &mut x);
        axpy(omega, &s, &mut x);
        r = s.iter().zip(&t).map(|(s, t)| s - omega * t).collect();

        let relative = vector_norm(&r) / b_norm;
        if relative < config.tolerance {
            return KrylovSolution {
                x,
                iterations: iteration + 1,
                residual: relative,
                status: KrylovStatus::Converged,
            };
        }
        if omega.norm() < DEGENERATE {
            return breakdown(x, &r, iteration + 1);
        }
    }

    let relative = vector_norm(&r) / b_norm;
    KrylovSolution {
        x,
        iterations: config.max_iterations,
        residual: relative,
        status: KrylovStatus::IterationLimit,
    }
}

/// Richardson iteration `x ← x + (b − A x)`; converges when `‖I − A‖ < 1`.
pub fn fixed_point<A: LinearOperator + ?Sized>(
    operator: &A,
    b: &[Complex64],
    config: &KrylovConfig,
) -> KrylovSolution {
    let b_norm = vector_norm(b);
    if b_norm < ZERO_RHS_NORM {
        return KrylovSolution::trivial(b.len());
    }

    let mut x = vec![Complex64::new(0.0, 0.0); b.len()];
    for iteration in 0..config.max_iterations {
        let r = residual(operator, b, &x);
        let relative = vector_norm(&r) / b_norm;
        if !relative.is_finite() {
            return KrylovSolution {
                x,
                iterations: iteration,
                residual: relative,
                status: KrylovStatus::Breakdown,
            };
        }
        if relative < config.tolerance {
            return KrylovSolution {
                x,
                iterations: iteration,
                residual: relative,
                status: KrylovStatus::Converged,
            };
        }
        axpy(Complex64::new(1.0, 0.0), &r, &mut x);
    }

    finish(operator, b, x, config.max_iterations, b_norm, config.tolerance)
}

fn finish<A: LinearOperator + ?Sized>(
    operator: &A,
    b: &[Complex64],
    x: Vec<Complex64>,
    iterations: usize,
    b_norm: f64,
    tolerance: f64,
) -> KrylovSolution {
    let relative = vector_norm(&residual(operator, b, &x)) / b_norm;
    let status = if relative < tolerance {
        KrylovStatus::Converged
    } else {
        KrylovStatus::IterationLimit
    };
    KrylovSolution {
        x,
        iterations,
        residual: relative,
        status,
    }
}

fn residual<A: LinearOperator + ?Sized>(
    operator: &A,
    b: &[Complex64],
    x: &[Complex64],
) -> Vec<Complex64> {
    operator
        .apply(x)
        .iter()
        .zip(b)
        .map(|(ax, b)| b - ax)
        .collect()
}

fn axpy(alpha: Complex64, x: &[Complex64], y: &mut [Complex64]) {
    for (slot, value) in y.iter_mut().zip(x) {
        *slot += alpha * value;
    }
}

fn scaled(values: &[Complex64], factor: f64) -> Vec<Complex64> {
    values.iter().map(|value| value * factor).collect()
}

fn givens_rotation(a: Complex64, b: Complex64) -> (Complex64, Complex64) {
    if b.norm() < DEGENERATE {
        return (Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0));
    }
    if a.norm() < DEGENERATE {
        return (Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0));
    }
    let r = (a.norm_sqr() + b.norm_sqr()).sqrt();
    (a / r, b / r)
}

/// Back substitution on the rotated Hessenberg columns.
fn solve_upper_triangular(columns: &[Vec<Complex64>], g: &[Complex64]) -> Vec<Complex64> {
    let k = columns.len();
    let mut y = vec![Complex64::new(0.0, 0.0); k];
    for row in (0..k).rev() {
        let mut sum = g[row];
        for col in (row + 1)..k {
            sum -= columns[col][row] * y[col];
        }
        let diagonal = columns[row][row];
        if diagonal.norm() > DEGENERATE {
            y[row] = sum / diagonal;
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::{KrylovConfig, KrylovStatus, LinearOperator, bicgstab, fixed_point, gmres};
    use crate::numerics::max_abs_difference;
    use crate::numerics::special::{DenseComplexMatrix, lu_solve};
    use num_complex::Complex64;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn system() -> (DenseComplexMatrix, Vec<Complex64>) {
        let entries = [
            [c(4.0, 0.0), c(1.0, 0.0), c(0.0, 0.5)],
            [c(0.3, 0.0), c(3.0, -1.0), c(1.0, 0.0)],
            [c(0.0, 0.0), c(0.2, 0.0), c(2.0, 0.5)],
        ];
        let matrix = DenseComplexMatrix::from_fn(3, 3, |row, col| entries[row][col]);
        (matrix, vec![c(1.0, 0.0), c(0.0, 1.0), c(-0.5, 0.25)])
    }

    fn config(max_iterations: usize, restart: usize) -> KrylovConfig {
        KrylovConfig {
            tolerance: 1.0e-12,
            max_iterations,
            restart,
        }
    }

    #[test]
    fn gmres_and_bicgstab_match_direct_solution() {
        let (matrix, rhs) = system();
        let expected = lu_solve(&matrix, &rhs).expect("lu");

        for (label, solution) in [
            ("gmres", gmres(&matrix, &rhs, &config(50, 30))),
            ("gmres(2)", gmres(&matrix, &rhs, &config(50, 2))),
            ("bicgstab", bicgstab(&matrix, &rhs, &config(50, 30))),
        ] {
            assert_eq!(solution.status, KrylovStatus::Converged, "{label}");
            let error = max_abs_difference(&expected, &solution.x).expect("lengths");
            assert!(error <= 1.0e-10, "{label} error={error:.3e}");
        }
    }

    #[test]
    fn fixed_point_converges_for_contractive_coupling() {
        let mut matrix = DenseComplexMatrix::from_fn(3, 3, |row, col| {
            c(0.1 * (row as f64 - col as f64), 0.05 * (row + col) as f64)
        });
        for index in 0..3 {
            matrix[(index, index)] = c(1.0, 0.0);
        }
        let rhs = vec![c(1.0, -1.0), c(0.5, 0.0), c(0.0, 2.0)];
        let solution = fixed_point(&matrix, &rhs, &config(500, 1));
        assert!(solution.converged());
        assert!(solution.iterations > 1);

        let expected = lu_solve(&matrix, &rhs).expect("lu");
        let error = max_abs_difference(&expected, &solution.x).expect("lengths");
        assert!(error <= 1.0e-10);
    }

    #[test]
    fn iteration_limit_is_reported_not_hidden() {
        let (matrix, rhs) = system();
        let solution = gmres(&matrix, &rhs, &config(1, 1));
        assert_eq!(solution.status, KrylovStatus::IterationLimit);
        assert_eq!(solution.iterations, 1);
        assert!(solution.residual > 1.0e-12);
    }

    #[test]
    fn gmres_breakdown_on_singular_operator_is_not_convergence() {
        let singular = DenseComplexMatrix::from_fn(2, 2, |row, col| {
            if row == 0 && col == 0 { c(1.0, 0.0) } else { c(0.0, 0.0) }
        });
        let solution = gmres(&singular, &[c(0.0, 0.0), c(1.0, 0.0)], &config(10, 5));
        assert_eq!(solution.status, KrylovStatus::Breakdown);
        assert!((solution.residual - 1.0).abs() <= 1.0e-12, "residual={}", solution.residual);
    }

    #[test]
    fn gmres_exact_breakdown_on_invariant_subspace_converges() {
        let diagonal = DenseComplexMatrix::from_fn(2, 2, |row, col| {
            if row == col { c(2.0 + row as f64, 0.0) } else { c(0.0, 0.0) }
        });
        let solution = gmres(&diagonal, &[c(1.0, 0.0), c(0.0, 0.0)], &config(10, 5));
        assert_eq!(solution.status, KrylovStatus::Converged);
        assert_eq!(solution.iterations, 1);
        assert!((solution.x[0] - c(0.5, 0.0)).norm() <= 1.0e-14);
        assert_eq!(solution.x[1], c(0.0, 0.0));
    }

    #[test]
    fn zero_rhs_returns_zero_without_iterating() {
        let (matrix, _) = system();
        let zeros = vec![c(0.0, 0.0); 3];
        for solution in [
            gmres(&matrix, &zeros, &config(10, 5)),
            bicgstab(&matrix, &zeros, &config(10, 5)),
            fixed_point(&matrix, &zeros, &config(10, 5)),
        ] {
            assert!(solution.converged());
            assert_eq!(solution.iterations, 0);
            assert_eq!(solution.x, zeros);
        }
        assert_eq!(matrix.dimension(), 3);
    }
}

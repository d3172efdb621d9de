//! Linear-system back-ends and the policy that picks one.

pub mod grid;
pub mod krylov;

pub use grid::{
    BlockCyclicLayout, BlockCyclicMatrix, ColumnSlab, LocalGroup, SerialGroup, WorkerGroup,
    block_cyclic_lu, partition_objects,
};
pub use krylov::{
    KrylovConfig, KrylovSolution, KrylovStatus, LinearOperator, bicgstab, fixed_point, gmres,
};

use crate::common::config::SolverConfig;
use crate::domain::{SolverError, SolverResult};
use crate::numerics::special::{DenseComplexMatrix, LuError, QrError, lu_factorize, qr_factorize};
use num_complex::Complex64;
use std::fmt::{Display, Formatter};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KrylovMethod {
    Gmres,
    BiCgstab,
    FixedPoint,
}

impl KrylovMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gmres => "gmres",
            Self::BiCgstab => "bicgstab",
            Self::FixedPoint => "fixed-point",
        }
    }

    pub fn run<A: LinearOperator + ?Sized>(
        self,
        operator: &A,
        rhs: &[Complex64],
        config: &KrylovConfig,
    ) -> KrylovSolution {
        match self {
            Self::Gmres => gmres(operator, rhs, config),
            Self::BiCgstab => bicgstab(operator, rhs, config),
            Self::FixedPoint => fixed_point(operator, rhs, config),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Single-process column-pivoted QR.
    Dense,
    /// Block-cyclic LU over the worker grid.
    Distributed,
    Krylov(KrylovMethod),
}

impl Backend {
    /// Resolves a configured name. `auto` means the distributed factorization
    /// when a multi-worker grid is engaged and dense QR otherwise.
    pub fn select(name: &str, grid_engaged: bool) -> SolverResult<Self> {
        let backend = match name.trim().to_ascii_lowercase().as_str() {
            "gmres" => Self::Krylov(KrylovMethod::Gmres),
            "bicgstab" => Self::Krylov(KrylovMethod::BiCgstab),
            "fixed-point" | "fixedpoint" => Self::Krylov(KrylovMethod::FixedPoint),
            "scalapack" | "lu" => Self::Distributed,
            "dense" | "qr" => Self::Dense,
            "auto" | "" if grid_engaged => Self::Distributed,
            "auto" | "" => Self::Dense,
            other => {
                return Err(SolverError::input_validation(
                    "CONFIG.BACKEND",
                    format!(
                        "unknown solver backend '{other}'; expected auto, dense, qr, scalapack, lu, gmres, bicgstab or fixed-point"
                    ),
                ));
            }
        };
        debug!(requested = name, grid_engaged, backend = %backend, "selected linear-system backend");
        Ok(backend)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "dense",
            Self::Distributed => "scalapack",
            Self::Krylov(method) => method.as_str(),
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    pub x: Vec<Complex64>,
    pub backend: Backend,
    /// Operator applications; zero for factorizations.
    pub iterations: usize,
    pub residual: f64,
}

impl BackendSolution {
    fn factored(x: Vec<Complex64>, backend: Backend) -> Self {
        Self {
            x,
            backend,
            iterations: 0,
            residual: 0.0,
        }
    }
}

/// Solves a system held in one process.
pub fn solve_dense(
    backend: Backend,
    matrix: &DenseComplexMatrix,
    rhs: &[Complex64],
    config: &SolverConfig,
) -> SolverResult<BackendSolution> {
    if rhs.is_empty() {
        return Ok(BackendSolution::factored(Vec::new(), backend));
    }
    let solution = match backend {
        Backend::Dense => BackendSolution::factored(qr_solve_logged(matrix, rhs)?, backend),
        Backend::Distributed => {
            let factors = lu_factorize(matrix).map_err(lu_failure)?;
            BackendSolution::factored(factors.solve(rhs).map_err(lu_failure)?, backend)
        }
        Backend::Krylov(method) => krylov_solution(method, matrix, rhs, config)?,
    };
    log_summary(&solution, rhs.len());
    Ok(solution)
}

/// Solves a system laid out block-cyclically over `group`.
pub fn solve_on_grid<W: WorkerGroup>(
    group: &W,
    backend: Backend,
    matrix: BlockCyclicMatrix,
    rhs: &[Complex64],
    config: &SolverConfig,
) -> SolverResult<BackendSolution> {
    if rhs.is_empty() {
        return Ok(BackendSolution::factored(Vec::new(), backend));
    }
    let solution = match backend {
        Backend::Dense => BackendSolution::factored(qr_solve_logged(&matrix.to_dense(), rhs)?, backend),
        Backend::Distributed => BackendSolution::factored(
            group.collective_solve(matrix, rhs).map_err(lu_failure)?,
            backend,
        ),
        Backend::Krylov(method) => krylov_solution(method, &matrix, rhs, config)?,
    };
    log_summary(&solution, rhs.len());
    Ok(solution)
}

fn qr_solve_logged(matrix: &DenseComplexMatrix, rhs: &[Complex64]) -> SolverResult<Vec<Complex64>> {
    let factors = qr_factorize(matrix).map_err(qr_failure)?;
    if !factors.is_full_rank() {
        warn!(
            rank = factors.rank(),
            dimension = factors.dimension(),
            "system matrix is rank deficient; returning the basic solution"
        );
    }
    factors.solve(rhs).map_err(qr_failure)
}

fn krylov_solution<A: LinearOperator + ?Sized>(
    method: KrylovMethod,
    operator: &A,
    rhs: &[Complex64],
    config: &SolverConfig,
) -> SolverResult<BackendSolution> {
    let solution = method.run(operator, rhs, &KrylovConfig::from_solver(config));
    match solution.status {
        KrylovStatus::Converged => Ok(BackendSolution {
            x: solution.x,
            backend: Backend::Krylov(method),
            iterations: solution.iterations,
            residual: solution.residual,
        }),
        KrylovStatus::IterationLimit => Err(SolverError::computation(
            "SOLVE.NOT_CONVERGED",
            format!(
                "{} did not converge after {} iterations: relative residual {:.3e} > tolerance {:.3e}",
                method.as_str(),
                solution.iterations,
                solution.residual,
                config.tolerance
            ),
        )),
        KrylovStatus::Breakdown => Err(SolverError::computation(
            "SOLVE.BREAKDOWN",
            format!(
                "{} broke down after {} iterations at relative residual {:.3e}",
                method.as_str(),
                solution.iterations,
                solution.residual
            ),
        )),
    }
}

fn lu_failure(error: LuError) -> SolverError {
    match error {
        LuError::SingularMatrix { .. } => SolverError::computation("SOLVE.SINGULAR", error.to_string()),
        _ => SolverError::internal("SOLVE.SHAPE", error.to_string()),
    }
}

fn qr_failure(error: QrError) -> SolverError {
    SolverError::internal("SOLVE.SHAPE", error.to_string())
}

fn log_summary(solution: &BackendSolution, dimension: usize) {
    info!(
        backend = %solution.backend,
        dimension,
        iterations = solution.iterations,
        residual = solution.residual,
        "linear system solved"
    );
}

#[cfg(test)]
mod tests {
    use super::{
        Backend, BlockCyclicLayout, BlockCyclicMatrix, KrylovMethod, LocalGroup, solve_dense,
        solve_on_grid,
    };
    use crate::common::config::SolverConfig;
    use crate::domain::SolverErrorCategory;
    use crate::numerics::max_abs_difference;
    use crate::numerics::special::DenseComplexMatrix;
    use num_complex::Complex64;

    fn near_identity(size: usize) -> DenseComplexMatrix {
        DenseComplexMatrix::from_fn(size, size, |row, col| {
            let coupling = Complex64::new(
                0.04 * ((row * 5 + col * 3) % 7) as f64 - 0.12,
                0.03 * ((row + col) % 4) as f64,
            );
            if row == col {
                Complex64::new(1.0, 0.0) + coupling
            } else {
                coupling
            }
        })
    }

    fn rhs(size: usize) -> Vec<Complex64> {
        (0..size)
            .map(|index| Complex64::new(1.0 - 0.1 * index as f64, 0.2 * index as f64))
            .collect()
    }

    #[test]
    fn selection_prefers_krylov_then_grid_then_dense() {
        let cases = [
            ("gmres", true, Backend::Krylov(KrylovMethod::Gmres)),
            ("BiCGSTAB", false, Backend::Krylov(KrylovMethod::BiCgstab)),
            ("fixed-point", true, Backend::Krylov(KrylovMethod::FixedPoint)),
            ("scalapack", false, Backend::Distributed),
            ("lu", true, Backend::Distributed),
            ("auto", true, Backend::Distributed),
            ("auto", false, Backend::Dense),
            ("qr", true, Backend::Dense),
        ];
        for (name, engaged, expected) in cases {
            assert_eq!(Backend::select(name, engaged).expect(name), expected, "{name}");
        }

        let error = Backend::select("belos", false).expect_err("unknown backend");
        assert_eq!(error.placeholder(), "CONFIG.BACKEND");
        assert_eq!(error.category(), SolverErrorCategory::InputValidationError);
        assert_eq!(Backend::Distributed.to_string(), "scalapack");
    }

    #[test]
    fn every_backend_reaches_the_same_solution() {
        let matrix = near_identity(8);
        let b = rhs(8);
        let config = SolverConfig {
            tolerance: 1.0e-12,
            ..SolverConfig::default()
        };
        let reference = solve_dense(Backend::Dense, &matrix, &b, &config).expect("qr").x;

        for backend in [
            Backend::Distributed,
            Backend::Krylov(KrylovMethod::Gmres),
            Backend::Krylov(KrylovMethod::BiCgstab),
            Backend::Krylov(KrylovMethod::FixedPoint),
        ] {
            let solution = solve_dense(backend, &matrix, &b, &config).expect("solve");
            let error = max_abs_difference(&reference, &solution.x).expect("len");
            assert!(error <= 1.0e-9, "{backend} error={error:.3e}");
        }

        let group = LocalGroup::new(4);
        let layout = BlockCyclicLayout::new(8, 8, [2, 2], [3, 3]);
        for backend in [Backend::Distributed, Backend::Krylov(KrylovMethod::Gmres), Backend::Dense] {
            let distributed = BlockCyclicMatrix::from_dense(layout, &matrix);
            let solution = solve_on_grid(&group, backend, distributed, &b, &config).expect("grid");
            let error = max_abs_difference(&reference, &solution.x).expect("len");
            assert!(error <= 1.0e-9, "grid {backend} error={error:.3e}");
        }
    }

    #[test]
    fn iterative_failure_and_singular_pivot_are_computation_errors() {
        let matrix = near_identity(6);
        let config = SolverConfig {
            tolerance: 1.0e-14,
            max_iterations: 1,
            restart: 1,
            ..SolverConfig::default()
        };
        let error = solve_dense(Backend::Krylov(KrylovMethod::Gmres), &matrix, &rhs(6), &config)
            .expect_err("one iteration is not enough");
        assert_eq!(error.placeholder(), "SOLVE.NOT_CONVERGED");
        assert_eq!(error.exit_code(), 4);

        let singular = DenseComplexMatrix::zeros(3, 3);
        let error = solve_dense(Backend::Distributed, &singular, &rhs(3), &SolverConfig::default())
            .expect_err("singular");
        assert_eq!(error.placeholder(), "SOLVE.SINGULAR");
    }

    #[test]
    fn gmres_breakdown_on_singular_system_is_a_computation_error() {
        let singular = DenseComplexMatrix::from_fn(2, 2, |row, col| {
            if row == 0 && col == 0 { Complex64::new(1.0, 0.0) } else { Complex64::new(0.0, 0.0) }
        });
        let b = [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)];
        let error = solve_dense(Backend::Krylov(KrylovMethod::Gmres), &singular, &b, &SolverConfig::default())
            .expect_err("no Krylov solution exists");
        assert_eq!(error.placeholder(), "SOLVE.BREAKDOWN");
        assert_eq!(error.category(), SolverErrorCategory::ComputationError);
        assert_eq!(error.exit_code(), 4);
    }

    #[test]
    fn empty_system_solves_to_empty_vector() {
        let solution = solve_dense(
            Backend::Distributed,
            &DenseComplexMatrix::zeros(0, 0),
            &[],
            &SolverConfig::default(),
        )
        .expect("empty");
        assert!(solution.x.is_empty());
    }
}

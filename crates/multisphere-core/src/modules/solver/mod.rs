//! Solver facade: owns the global system and drives assembly and back-ends.

use crate::common::config::SolverConfig;
use crate::domain::{SolverError, SolverMethod, SolverResult, SolverState};
use crate::modules::assembly::{
    GlobalSystem, common_degree, direct_system, indirect_system, source_vector,
    staged_source_vector,
};
use crate::modules::backend::{
    Backend, BackendSolution, BlockCyclicLayout, BlockCyclicMatrix, WorkerGroup, solve_dense,
    solve_on_grid,
};
use crate::modules::indexing::object_block_size;
use crate::modules::traits::{Excitation, ScattererRegistry};
use crate::numerics::special::{DenseComplexMatrix, matvec};
use num_complex::Complex64;
use std::ptr;
use tracing::{debug, info};

/// Coefficients of one solve, `2B` per scatterer in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteringResult {
    pub scattered: Vec<Complex64>,
    pub internal: Vec<Complex64>,
    pub n_max: usize,
    pub backend: Backend,
    pub iterations: usize,
    pub residual: f64,
}

impl ScatteringResult {
    pub fn object_count(&self) -> usize {
        self.scattered.len() / object_block_size(self.n_max)
    }

    pub fn scattered_for(&self, index: usize) -> &[Complex64] {
        let block = object_block_size(self.n_max);
        &self.scattered[index * block..(index + 1) * block]
    }

    pub fn internal_for(&self, index: usize) -> &[Complex64] {
        let block = object_block_size(self.n_max);
        &self.internal[index * block..(index + 1) * block]
    }
}

/// Multiple-scattering solver for one registry, excitation and degree.
///
/// Construction assembles the system. `solve` leaves it untouched and can be
/// repeated; `update` and a change of first-harmonic result rebuild it.
pub struct Solver<'a, G, E>
where
    G: ScattererRegistry,
    E: Excitation,
{
    registry: G,
    excitation: E,
    n_max: usize,
    config: SolverConfig,
    first_harmonic: Option<&'a ScatteringResult>,
    system: GlobalSystem,
    state: SolverState,
}

impl<'a, G, E> Solver<'a, G, E>
where
    G: ScattererRegistry,
    E: Excitation,
{
    pub fn new(registry: G, excitation: E, n_max: usize, config: SolverConfig) -> SolverResult<Self> {
        config.validate()?;
        let mut solver = Self {
            registry,
            excitation,
            n_max,
            system: GlobalSystem {
                matrix: DenseComplexMatrix::zeros(0, 0),
                rhs: Vec::new(),
                method: config.method,
                n_max,
            },
            config,
            first_harmonic: None,
            state: SolverState::Uninitialized,
        };
        solver.populate()?;
        Ok(solver)
    }

    /// Replaces the problem and drops any first-harmonic result.
    pub fn update(&mut self, registry: G, excitation: E, n_max: usize) -> SolverResult<()> {
        self.registry = registry;
        self.excitation = excitation;
        self.n_max = n_max;
        self.first_harmonic = None;
        self.populate()
    }

    /// Switches between first-harmonic (`None`) and second-harmonic sources.
    /// The system is rebuilt only when `result` is a different result object.
    pub fn second_harmonic(&mut self, result: Option<&'a ScatteringResult>) -> SolverResult<&mut Self> {
        let unchanged = match (self.first_harmonic, result) {
            (Some(current), Some(next)) => ptr::eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(self);
        }
        if let Some(first) = result {
            if first.n_max != self.n_max {
                return Err(SolverError::input_validation(
                    "CONFIG.MIXED_DEGREE",
                    format!(
                        "first-harmonic result has nMax={}, solver uses nMax={}",
                        first.n_max, self.n_max
                    ),
                ));
            }
        }
        self.first_harmonic = result;
        self.populate()?;
        Ok(self)
    }

    pub fn solve(&mut self) -> SolverResult<ScatteringResult> {
        let method = self.ready()?;
        let backend = Backend::select(&self.config.solver, false)?;
        let solution = solve_dense(backend, &self.system.matrix, &self.system.rhs, &self.config)?;
        let result = self.finish(solution);
        self.state = SolverState::Solved(method);
        Ok(result)
    }

    /// Solves on the grid of `group`; every worker of the group receives the
    /// result, in rank order.
    pub fn solve_distributed<W: WorkerGroup>(&mut self, group: &W) -> SolverResult<Vec<ScatteringResult>> {
        let method = self.ready()?;
        group.validate(self.config.block_size)?;
        let backend = Backend::select(&self.config.solver, group.is_engaged())?;

        let dimension = self.system.dimension();
        let layout = BlockCyclicLayout::new(dimension, dimension, group.grid(), self.config.block_size);
        let matrix = BlockCyclicMatrix::from_dense(layout, &self.system.matrix);
        let solution = solve_on_grid(group, backend, matrix, &self.system.rhs, &self.config)?;
        let result = self.finish(solution);
        self.state = SolverState::Solved(method);

        let scattered = group.broadcast(&result.scattered);
        let internal = group.broadcast(&result.internal);
        Ok(scattered
            .into_iter()
            .zip(internal)
            .map(|(scattered, internal)| ScatteringResult {
                scattered,
                internal,
                ..result.clone()
            })
            .collect())
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn system(&self) -> &GlobalSystem {
        &self.system
    }

    pub fn registry(&self) -> &G {
        &self.registry
    }

    pub fn excitation(&self) -> &E {
        &self.excitation
    }

    pub fn n_max(&self) -> usize {
        self.n_max
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn is_second_harmonic(&self) -> bool {
        self.first_harmonic.is_some()
    }

    fn populate(&mut self) -> SolverResult<()> {
        self.state = SolverState::Uninitialized;
        common_degree(&self.registry, self.n_max)?;

        let incoming = match self.first_harmonic {
            Some(first) => {
                self.registry
                    .set_sources(&self.excitation, &first.internal, self.n_max);
                staged_source_vector(&self.registry, &self.excitation, self.n_max)?
            }
            None => source_vector(&self.registry, &self.excitation, self.n_max)?,
        };
        let method = self.config.method;
        self.system = match method {
            SolverMethod::Direct => direct_system(&self.registry, &self.excitation, &incoming, self.n_max)?,
            SolverMethod::Indirect => {
                indirect_system(&self.registry, &self.excitation, &incoming, self.n_max)?
            }
        };
        debug!(
            %method,
            second_harmonic = self.first_harmonic.is_some(),
            dimension = self.system.dimension(),
            "populated global system"
        );
        self.state = SolverState::Populated(method);
        Ok(())
    }

    fn ready(&self) -> SolverResult<SolverMethod> {
        match self.state {
            SolverState::Populated(method) | SolverState::Solved(method) => Ok(method),
            SolverState::Uninitialized => Err(SolverError::internal(
                "SOLVER.UNINITIALIZED",
                "the global system was not assembled; update the solver with a valid problem",
            )),
        }
    }

    fn finish(&self, solution: BackendSolution) -> ScatteringResult {
        let scattered = match self.system.method {
            SolverMethod::Direct => solution.x,
            SolverMethod::Indirect => self.convert_indirect(&solution.x),
        };
        let internal = self.internal_coefficients(&scattered);
        info!(
            objects = self.registry.objects().len(),
            method = %self.system.method,
            backend = %solution.backend,
            iterations = solution.iterations,
            "scattering problem solved"
        );
        ScatteringResult {
            scattered,
            internal,
            n_max: self.n_max,
            backend: solution.backend,
            iterations: solution.iterations,
            residual: solution.residual,
        }
    }

    /// Exciting fields to scattered coefficients, `X_i = T_i · y_i`.
    fn convert_indirect(&self, exciting: &[Complex64]) -> Vec<Complex64> {
        let block = object_block_size(self.n_max);
        let omega = self.excitation.omega();
        exciting
            .chunks(block)
            .enumerate()
            .flat_map(|(index, field)| {
                matvec(&self.registry.local_operator(omega, index, self.n_max), field)
            })
            .collect()
    }

    fn internal_coefficients(&self, scattered: &[Complex64]) -> Vec<Complex64> {
        let block = object_block_size(self.n_max);
        let omega = self.excitation.omega();
        scattered
            .chunks(block)
            .enumerate()
            .flat_map(|(index, coefficients)| {
                self.registry
                    .internal_auxiliary(omega, index, self.n_max)
                    .into_iter()
                    .zip(coefficients)
                    .map(|(auxiliary, value)| auxiliary * value)
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

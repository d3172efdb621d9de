//! Multiple-scattering T-matrix engine for systems of spheres.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;

pub use common::config::{CaseDefinition, SolverConfig, load_case};
pub use domain::{SolverError, SolverMethod, SolverResult, SolverState};
pub use modules::{
    Backend, Geometry, LocalGroup, PlaneWave, ScatteringResult, SerialGroup, Solver, WorkerGroup,
};

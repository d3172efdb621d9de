pub mod config;
pub mod constants;

pub use config::{
    CaseDefinition, CaseLoadError, ComplexPair, ExcitationDefinition, MaterialDefinition,
    PolarizationDefinition, SolverConfig, SphereDefinition, WorkerDefinition, complex_from_pair,
    complex_to_pair, load_case,
};

pub mod assembly;
pub mod backend;
pub mod coupling;
pub mod excitation;
pub mod indexing;
pub mod registry;
pub mod solver;
pub mod traits;

#[cfg(test)]
pub(crate) mod wave_fields;

pub use assembly::GlobalSystem;
pub use backend::{Backend, KrylovMethod, LocalGroup, SerialGroup, WorkerGroup};
pub use coupling::{Coupling, compute_coupling};
pub use excitation::PlaneWave;
pub use registry::{ElectroMagnetic, Geometry, Scatterer};
pub use solver::{ScatteringResult, Solver};
pub use traits::{Excitation, ScattererRegistry};

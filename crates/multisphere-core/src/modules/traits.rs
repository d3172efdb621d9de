use crate::modules::registry::{ElectroMagnetic, Scatterer};
use crate::numerics::special::DenseComplexMatrix;
use num_complex::Complex64;

/// Incident field, expanded in regular vector waves about any point.
pub trait Excitation: Send + Sync {
    fn omega(&self) -> f64;

    fn wavenumber(&self) -> Complex64;

    /// Regular-wave coefficients `[M block; N block]` about `center`.
    fn incoming_local(&self, center: [f64; 3], n_max: usize) -> Vec<Complex64>;
}

/// The set of scatterers and their single-object operators.
pub trait ScattererRegistry: Send + Sync {
    fn objects(&self) -> &[Scatterer];

    fn background(&self) -> ElectroMagnetic;

    /// Local T-matrix of object `index`, `2B x 2B`.
    fn local_operator(&self, omega: f64, index: usize, n_max: usize) -> DenseComplexMatrix;

    /// Diagonal mapping scattered to internal coefficients of object `index`.
    fn internal_auxiliary(&self, omega: f64, index: usize, n_max: usize) -> Vec<Complex64>;

    /// Stages second-harmonic sources from first-harmonic internal coefficients.
    fn set_sources(
        &mut self,
        excitation: &dyn Excitation,
        first_harmonic_internal: &[Complex64],
        n_max: usize,
    );

    /// Local source coefficients seen by object `index`.
    fn source_local(&self, index: usize, excitation: &dyn Excitation, n_max: usize)
    -> Vec<Complex64>;
}

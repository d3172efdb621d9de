//! Sphere registry with analytic (Mie) local operators.

pub mod mie;

pub use mie::MieCoefficients;

use crate::common::config::{CaseDefinition, MaterialDefinition, complex_from_pair};
use crate::common::constants::SPEED_OF_LIGHT;
use crate::domain::{SolverError, SolverResult, Spherical, displacement};
use crate::modules::coupling::Coupling;
use crate::modules::indexing::object_block_size;
use crate::modules::traits::{Excitation, ScattererRegistry};
use crate::numerics::distance3;
use crate::numerics::special::{DenseComplexMatrix, matvec};
use num_complex::Complex64;
use tracing::warn;

/// Relative permittivity and permeability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectroMagnetic {
    pub epsilon: Complex64,
    pub mu: Complex64,
}

impl ElectroMagnetic {
    pub const VACUUM: Self = Self {
        epsilon: Complex64::new(1.0, 0.0),
        mu: Complex64::new(1.0, 0.0),
    };

    pub const fn new(epsilon: Complex64, mu: Complex64) -> Self {
        Self { epsilon, mu }
    }

    pub fn from_definition(definition: &MaterialDefinition) -> Self {
        Self::new(
            complex_from_pair(definition.epsilon),
            complex_from_pair(definition.mu),
        )
    }

    pub fn refractive_index(&self) -> Complex64 {
        (self.epsilon * self.mu).sqrt()
    }

    pub fn wavenumber(&self, omega: f64) -> Complex64 {
        omega / SPEED_OF_LIGHT * self.refractive_index()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatterer {
    pub center: [f64; 3],
    pub elmag: ElectroMagnetic,
    pub radius: f64,
    pub n_max: usize,
    /// Effective second-order susceptibility.
    pub chi2: Complex64,
    /// Second-harmonic source coefficients, `[M; N]`, empty until staged.
    pub source_coefficients: Vec<Complex64>,
}

impl Scatterer {
    pub fn new(center: [f64; 3], elmag: ElectroMagnetic, radius: f64, n_max: usize) -> Self {
        Self {
            center,
            elmag,
            radius,
            n_max,
            chi2: Complex64::new(0.0, 0.0),
            source_coefficients: Vec::new(),
        }
    }

    pub fn at_spherical(
        position: Spherical,
        elmag: ElectroMagnetic,
        radius: f64,
        n_max: usize,
    ) -> Self {
        Self::new(position.to_cartesian(), elmag, radius, n_max)
    }

    pub fn with_chi2(mut self, chi2: Complex64) -> Self {
        self.chi2 = chi2;
        self
    }

    pub fn mie(&self, omega: f64, background: ElectroMagnetic, n_max: usize) -> MieCoefficients {
        let size_parameter = background.wavenumber(omega) * self.radius;
        let relative_index = self.elmag.refractive_index() / background.refractive_index();
        MieCoefficients::new(
            n_max,
            size_parameter,
            relative_index,
            background.mu,
            self.elmag.mu,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    background: ElectroMagnetic,
    objects: Vec<Scatterer>,
}

impl Geometry {
    pub fn new(background: ElectroMagnetic) -> Self {
        Self {
            background,
            objects: Vec::new(),
        }
    }

    /// Adds a sphere; overlapping spheres are rejected.
    pub fn push_object(&mut self, scatterer: Scatterer) -> SolverResult<()> {
        if let Some(index) = self.objects.iter().position(|existing| {
            distance3(existing.center, scatterer.center) < existing.radius + scatterer.radius
        }) {
            return Err(SolverError::input_validation(
                "CONFIG.OVERLAP",
                format!(
                    "sphere {} overlaps sphere {index}",
                    self.objects.len()
                ),
            ));
        }
        self.objects.push(scatterer);
        Ok(())
    }

    pub fn with_object(mut self, scatterer: Scatterer) -> SolverResult<Self> {
        self.push_object(scatterer)?;
        Ok(self)
    }

    pub fn from_case(case: &CaseDefinition) -> SolverResult<Self> {
        let mut geometry = Self::new(ElectroMagnetic::from_definition(&case.background));
        for (index, sphere) in case.spheres.iter().enumerate() {
            let degree = case.sphere_degree(index).unwrap_or(case.n_max);
            let scatterer = Scatterer::new(
                sphere.center,
                ElectroMagnetic::from_definition(&sphere.material),
                sphere.radius,
                degree,
            )
            .with_chi2(sphere.chi2.map(complex_from_pair).unwrap_or_default());
            geometry.push_object(scatterer)?;
        }
        Ok(geometry)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ScattererRegistry for Geometry {
    fn objects(&self) -> &[Scatterer] {
        &self.objects
    }

    fn background(&self) -> ElectroMagnetic {
        self.background
    }

    fn local_operator(&self, omega: f64, index: usize, n_max: usize) -> DenseComplexMatrix {
        let diagonal = self.objects[index]
            .mie(omega, self.background, n_max)
            .t_matrix_diagonal();
        let mut operator = DenseComplexMatrix::zeros(diagonal.len(), diagonal.len());
        for (position, value) in diagonal.into_iter().enumerate() {
            operator[(position, position)] = value;
        }
        operator
    }

    fn internal_auxiliary(&self, omega: f64, index: usize, n_max: usize) -> Vec<Complex64> {
        self.objects[index]
            .mie(omega, self.background, n_max)
            .internal_diagonal()
    }

    /// Sources are `χ2 · X_int` of each sphere.
    fn set_sources(
        &mut self,
        _excitation: &dyn Excitation,
        first_harmonic_internal: &[Complex64],
        n_max: usize,
    ) {
        let block = object_block_size(n_max);
        for (index, object) in self.objects.iter_mut().enumerate() {
            let internal = first_harmonic_internal.get(index * block..(index + 1) * block);
            object.source_coefficients = match internal {
                Some(internal) => internal.iter().map(|value| object.chi2 * value).collect(),
                None => {
                    warn!(
                        object = index,
                        "first-harmonic result has no coefficients for this object; sources zeroed"
                    );
                    vec![Complex64::new(0.0, 0.0); block]
                }
            };
        }
    }

    /// Own sources plus those of every other sphere translated onto this one.
    fn source_local(
        &self,
        index: usize,
        excitation: &dyn Excitation,
        n_max: usize,
    ) -> Vec<Complex64> {
        let block = object_block_size(n_max);
        let wavenumber = excitation.wavenumber();
        let target = &self.objects[index];
        let mut local = padded(&target.source_coefficients, block);

        for (other, source) in self.objects.iter().enumerate() {
            if other == index {
                continue;
            }
            let operator = Coupling::new(displacement(target.center, source.center), wavenumber, n_max)
                .translation_operator();
            let translated = matvec(&operator, &padded(&source.source_coefficients, block));
            for (slot, value) in local.iter_mut().zip(translated) {
                *slot += value;
            }
        }
        local
    }
}

fn padded(values: &[Complex64], len: usize) -> Vec<Complex64> {
    let mut output = vec![Complex64::new(0.0, 0.0); len];
    for (slot, value) in output.iter_mut().zip(values) {
        *slot = *value;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{ElectroMagnetic, Geometry, Scatterer};
    use crate::common::config::CaseDefinition;
    use crate::common::constants::{PI, angular_frequency};
    use crate::domain::Spherical;
    use crate::modules::excitation::PlaneWave;
    use crate::modules::indexing::object_block_size;
    use crate::modules::traits::ScattererRegistry;
    use num_complex::Complex64;

    fn glass() -> ElectroMagnetic {
        ElectroMagnetic::new(Complex64::new(2.25, 0.0), Complex64::new(1.0, 0.0))
    }

    #[test]
    fn wavenumber_scales_with_refractive_index() {
        let omega = angular_frequency(1.0);
        let k = glass().wavenumber(omega);
        assert!((k - Complex64::new(1.5 * 2.0 * PI, 0.0)).norm() <= 1.0e-12);
        assert!((ElectroMagnetic::VACUUM.refractive_index() - 1.0).norm() <= 1.0e-15);
    }

    #[test]
    fn push_object_rejects_overlapping_spheres() {
        let geometry = Geometry::new(ElectroMagnetic::VACUUM)
            .with_object(Scatterer::new([0.0, 0.0, 0.0], glass(), 0.5, 2))
            .expect("first sphere");
        let error = geometry
            .clone()
            .with_object(Scatterer::new([0.8, 0.0, 0.0], glass(), 0.5, 2))
            .expect_err("overlap");
        assert_eq!(error.placeholder(), "CONFIG.OVERLAP");

        let spherical = Scatterer::at_spherical(Spherical::new(2.0, PI / 2.0, 0.0), glass(), 0.5, 2);
        let geometry = geometry.with_object(spherical).expect("disjoint sphere");
        assert_eq!(geometry.len(), 2);
        assert!((geometry.objects()[1].center[0] - 2.0).abs() <= 1.0e-15);
    }

    #[test]
    fn local_operator_is_diagonal_mie_matrix() {
        let geometry = Geometry::new(ElectroMagnetic::VACUUM)
            .with_object(Scatterer::new([0.0; 3], glass(), 0.3, 2))
            .expect("sphere");
        let omega = angular_frequency(1.0);
        let operator = geometry.local_operator(omega, 0, 2);
        let mie = geometry.objects()[0].mie(omega, geometry.background(), 2);

        assert_eq!(operator.nrows(), object_block_size(2));
        assert_eq!(operator[(0, 0)], -mie.magnetic[0]);
        assert_eq!(operator[(8, 8)], -mie.electric[0]);
        assert_eq!(operator[(0, 1)], Complex64::new(0.0, 0.0));
        assert_eq!(geometry.internal_auxiliary(omega, 0, 2).len(), 16);
    }

    #[test]
    fn staged_sources_scale_internal_coefficients_and_accumulate_translations() {
        let chi2 = Complex64::new(0.0, 2.0);
        let mut geometry = Geometry::new(ElectroMagnetic::VACUUM)
            .with_object(Scatterer::new([0.0; 3], glass(), 0.3, 1).with_chi2(chi2))
            .expect("first")
            .with_object(Scatterer::new([3.0, 0.0, 0.0], glass(), 0.3, 1))
            .expect("second");
        let excitation = PlaneWave::new(
            angular_frequency(0.5),
            (0.0, 0.0),
            (Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)),
            ElectroMagnetic::VACUUM,
        );
        let internal: Vec<Complex64> = (0..12).map(|index| Complex64::new(index as f64, 1.0)).collect();

        geometry.set_sources(&excitation, &internal, 1);
        assert_eq!(geometry.objects()[0].source_coefficients[2], chi2 * internal[2]);
        assert!(geometry.objects()[1].source_coefficients.iter().all(|value| value.norm() == 0.0));

        let own = geometry.source_local(0, &excitation, 1);
        assert_eq!(own, geometry.objects()[0].source_coefficients);

        let translated = geometry.source_local(1, &excitation, 1);
        assert_eq!(translated.len(), 6);
        assert!(translated.iter().any(|value| value.norm() > 0.0));

        geometry.set_sources(&excitation, &internal[..6], 1);
        assert_eq!(geometry.objects()[1].source_coefficients.len(), 6);
    }

    #[test]
    fn from_case_keeps_per_sphere_degrees_and_susceptibility() {
        let case: CaseDefinition = serde_json::from_str(
            r#"{
                "nMax": 2,
                "spheres": [
                    { "center": [0, 0, 0], "radius": 0.2, "material": { "epsilon": [4.0, 0.0] } },
                    { "center": [1, 0, 0], "radius": 0.2, "material": { "epsilon": [4.0, 0.0] },
                      "nMax": 3, "chi2": [0.5, 0.0] }
                ],
                "excitation": { "wavelength": 1.0, "polarization": { "theta": [1, 0], "phi": [0, 0] } }
            }"#,
        )
        .expect("case");
        let geometry = Geometry::from_case(&case).expect("geometry");
        assert_eq!(geometry.objects()[0].n_max, 2);
        assert_eq!(geometry.objects()[1].n_max, 3);
        assert_eq!(geometry.objects()[1].chi2, Complex64::new(0.5, 0.0));
        assert_eq!(geometry.background(), ElectroMagnetic::VACUUM);
    }
}

//! Plane-wave illumination.

use crate::common::config::{ExcitationDefinition, complex_from_pair};
use crate::common::constants::{FOUR_PI, angular_frequency};
use crate::modules::indexing::{HarmonicIndex, vector_block_size};
use crate::modules::registry::ElectroMagnetic;
use crate::modules::traits::Excitation;
use crate::numerics::special::{y_lm_over_sin, y_lm_theta_derivative};
use num_complex::Complex64;

const I: Complex64 = Complex64::new(0.0, 1.0);

/// `E = (e_θ θ̂ + e_φ φ̂) exp(i k k̂·r)`, with `k̂` at polar angles `(θ, φ)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneWave {
    omega: f64,
    theta: f64,
    phi: f64,
    e_theta: Complex64,
    e_phi: Complex64,
    background: ElectroMagnetic,
}

impl PlaneWave {
    pub fn new(
        omega: f64,
        (theta, phi): (f64, f64),
        (e_theta, e_phi): (Complex64, Complex64),
        background: ElectroMagnetic,
    ) -> Self {
        Self {
            omega,
            theta,
            phi,
            e_theta,
            e_phi,
            background,
        }
    }

    pub fn from_definition(definition: &ExcitationDefinition, background: ElectroMagnetic) -> Self {
        Self::new(
            angular_frequency(definition.wavelength),
            (definition.theta, definition.phi),
            (
                complex_from_pair(definition.polarization.theta),
                complex_from_pair(definition.polarization.phi),
            ),
            background,
        )
    }

    /// Same wave at `harmonic` times the frequency.
    pub fn at_harmonic(&self, harmonic: u32) -> Self {
        Self {
            omega: self.omega * f64::from(harmonic),
            ..*self
        }
    }

    pub fn direction(&self) -> [f64; 3] {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        [sin_theta * cos_phi, sin_theta * sin_phi, cos_theta]
    }

    /// Cartesian polarization vector.
    pub fn polarization(&self) -> [Complex64; 3] {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let theta_hat = [cos_theta * cos_phi, cos_theta * sin_phi, -sin_theta];
        let phi_hat = [-sin_phi, cos_phi, 0.0];
        [0, 1, 2].map(|axis| self.e_theta * theta_hat[axis] + self.e_phi * phi_hat[axis])
    }

    /// Field value at a point.
    pub fn field_at(&self, point: [f64; 3]) -> [Complex64; 3] {
        let phase = self.phase_at(point);
        self.polarization().map(|component| component * phase)
    }

    fn phase_at(&self, point: [f64; 3]) -> Complex64 {
        let direction = self.direction();
        let projection: f64 = (0..3).map(|axis| direction[axis] * point[axis]).sum();
        (I * self.wavenumber() * projection).exp()
    }
}

impl Excitation for PlaneWave {
    fn omega(&self) -> f64 {
        self.omega
    }

    fn wavenumber(&self) -> Complex64 {
        self.background.wavenumber(self.omega)
    }

    /// `p_nm = 4π iⁿ⁺¹ ê·X*_nm(k̂)`, `q_nm = 4π iⁿ ê·(k̂ × X*_nm(k̂))`, times
    /// the phase of the wave at `center`.
    fn incoming_local(&self, center: [f64; 3], n_max: usize) -> Vec<Complex64> {
        let block = vector_block_size(n_max);
        let phase = self.phase_at(center);
        let mut coefficients = vec![Complex64::new(0.0, 0.0); 2 * block];

        for index in HarmonicIndex::vector_iter(n_max) {
            let (n, m) = (index.degree(), index.order());
            let norm = f64::from(n * (n + 1)).sqrt();
            let x_theta = (-y_lm_over_sin(n, m, self.theta, self.phi) / norm).conj();
            let x_phi = (-I * y_lm_theta_derivative(n, m, self.theta, self.phi) / norm).conj();

            let p = FOUR_PI * i_power(n + 1) * (self.e_theta * x_theta + self.e_phi * x_phi);
            let q = FOUR_PI * i_power(n) * (self.e_phi * x_theta - self.e_theta * x_phi);

            let position = index.flat() - 1;
            coefficients[position] = phase * p;
            coefficients[block + position] = phase * q;
        }
        coefficients
    }
}

fn i_power(exponent: i32) -> Complex64 {
    match exponent.rem_euclid(4) {
        0 => Complex64::new(1.0, 0.0),
        1 => Complex64::new(0.0, 1.0),
        2 => Complex64::new(-1.0, 0.0),
        _ => Complex64::new(0.0, -1.0),
    }
}

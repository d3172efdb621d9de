//! Mathematical and physical constants shared by the scattering kernels.

pub const PI: f64 = std::f64::consts::PI;
pub const PI2: f64 = 2.0 * PI;
pub const FOUR_PI: f64 = 4.0 * PI;
/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

pub fn angular_frequency(wavelength: f64) -> f64 {
    PI2 * SPEED_OF_LIGHT / wavelength
}

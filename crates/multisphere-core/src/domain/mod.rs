pub mod errors;

pub use errors::{ExitPlaceholder, SolverError, SolverErrorCategory, SolverResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Global formulation of the multiple-scattering system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Local operators folded into the matrix; unknowns are scattered coefficients.
    Direct,
    /// Preconditioned form; unknowns are exciting fields, converted after the solve.
    #[default]
    Indirect,
}

impl SolverMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
        }
    }
}

impl Display for SolverMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverState {
    Uninitialized,
    Populated(SolverMethod),
    Solved(SolverMethod),
}

/// Point in spherical coordinates, angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Spherical {
    pub radius: f64,
    pub theta: f64,
    pub phi: f64,
}

impl Spherical {
    pub const fn new(radius: f64, theta: f64, phi: f64) -> Self {
        Self { radius, theta, phi }
    }

    pub fn from_cartesian(point: [f64; 3]) -> Self {
        let [x, y, z] = point;
        let radius = (x * x + y * y + z * z).sqrt();
        if radius == 0.0 {
            return Self::default();
        }

        let theta = (z / radius).clamp(-1.0, 1.0).acos();
        let phi = if x == 0.0 && y == 0.0 { 0.0 } else { y.atan2(x) };
        Self { radius, theta, phi }
    }

    pub fn to_cartesian(self) -> [f64; 3] {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        [
            self.radius * sin_theta * cos_phi,
            self.radius * sin_theta * sin_phi,
            self.radius * cos_theta,
        ]
    }
}

pub fn displacement(to: [f64; 3], from: [f64; 3]) -> [f64; 3] {
    [to[0] - from[0], to[1] - from[1], to[2] - from[2]]
}

#[cfg(test)]
mod tests {
    use super::{SolverMethod, Spherical, displacement};
    use crate::common::constants::PI;

    #[test]
    fn spherical_roundtrip_covers_axis_and_generic_points() {
        for point in [[0.0, 0.0, 2.0], [0.0, 0.0, -1.5], [1.0, -2.0, 0.5]] {
            let spherical = Spherical::from_cartesian(point);
            let back = spherical.to_cartesian();
            for axis in 0..3 {
                assert!((back[axis] - point[axis]).abs() <= 1.0e-14);
            }
        }

        let down = Spherical::from_cartesian([0.0, 0.0, -3.0]);
        assert_eq!(down.radius, 3.0);
        assert!((down.theta - PI).abs() <= 1.0e-15);
        assert_eq!(down.phi, 0.0);
    }

    #[test]
    fn origin_maps_to_zero_spherical_point() {
        assert_eq!(Spherical::from_cartesian([0.0; 3]), Spherical::default());
        assert_eq!(displacement([1.0, 2.0, 3.0], [1.0, 2.0, 3.0]), [0.0; 3]);
    }

    #[test]
    fn solver_method_parses_lowercase_names() {
        let method: SolverMethod = serde_json::from_str("\"direct\"").expect("parse");
        assert_eq!(method, SolverMethod::Direct);
        assert_eq!(SolverMethod::default().to_string(), "indirect");
    }
}

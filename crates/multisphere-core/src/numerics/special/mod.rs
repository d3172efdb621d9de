pub mod bessel;
pub mod harmonics;
pub mod linalg;
pub mod wigner;

pub use bessel::{
    RadialKind, radial_sequence, riccati_derivatives, spherical_h1, spherical_h1_sequence,
    spherical_j, spherical_j_sequence, spherical_y, spherical_y_sequence,
};
pub use harmonics::{associated_legendre, y_lm, y_lm_over_sin, y_lm_theta_derivative};
pub use linalg::{
    LuDecomposition, LuError, QrDecomposition, QrError, identity, lu_factorize, lu_solve, matvec,
    multiply, qr_factorize, qr_solve,
};
pub use wigner::{WignerMatrix, wigner_small_d};

use faer::Mat;
use num_complex::Complex64;

pub type DenseComplexMatrix = Mat<Complex64>;

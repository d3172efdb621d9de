//! Solver settings and the JSON case file read by the command-line front end.

use crate::domain::{SolverError, SolverMethod, SolverResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complex scalar serialized as `[re, im]`.
pub type ComplexPair = [f64; 2];

pub fn complex_from_pair(pair: ComplexPair) -> Complex64 {
    Complex64::new(pair[0], pair[1])
}

pub fn complex_to_pair(value: Complex64) -> ComplexPair {
    [value.re, value.im]
}

pub const DEFAULT_BACKEND_NAME: &str = "auto";
pub const DEFAULT_TOLERANCE: f64 = 1.0e-8;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_RESTART: usize = 300;
pub const DEFAULT_BLOCK_SIZE: [usize; 2] = [64, 64];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Backend name: `auto`, `dense`/`qr`, `scalapack`/`lu`, `gmres`, `bicgstab`, `fixed-point`.
    pub solver: String,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub restart: usize,
    pub block_size: [usize; 2],
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            solver: DEFAULT_BACKEND_NAME.to_string(),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            restart: DEFAULT_RESTART,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl SolverConfig {
    pub fn with_method(mut self, method: SolverMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    pub fn validate(&self) -> SolverResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SolverError::input_validation(
                "CONFIG.TOLERANCE",
                format!("solver tolerance must be positive, got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 || self.restart == 0 {
            return Err(SolverError::input_validation(
                "CONFIG.ITERATIONS",
                "maxIterations and restart must both be at least 1",
            ));
        }
        if self.block_size.contains(&0) {
            return Err(SolverError::input_validation(
                "CONFIG.WORKER_GRID",
                format!(
                    "block size must be positive, got {}x{}",
                    self.block_size[0], self.block_size[1]
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MaterialDefinition {
    pub epsilon: ComplexPair,
    #[serde(default = "unit_pair")]
    pub mu: ComplexPair,
}

impl Default for MaterialDefinition {
    fn default() -> Self {
        Self {
            epsilon: unit_pair(),
            mu: unit_pair(),
        }
    }
}

fn unit_pair() -> ComplexPair {
    [1.0, 0.0]
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SphereDefinition {
    pub center: [f64; 3],
    pub radius: f64,
    pub material: MaterialDefinition,
    /// Per-sphere degree; falls back to the case-wide `nMax`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chi2: Option<ComplexPair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PolarizationDefinition {
    pub theta: ComplexPair,
    pub phi: ComplexPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ExcitationDefinition {
    /// Vacuum wavelength, in the length unit of the sphere geometry.
    pub wavelength: f64,
    #[serde(default)]
    pub theta: f64,
    #[serde(default)]
    pub phi: f64,
    pub polarization: PolarizationDefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkerDefinition {
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<[usize; 2]>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDefinition {
    pub n_max: usize,
    #[serde(default)]
    pub background: MaterialDefinition,
    #[serde(default)]
    pub spheres: Vec<SphereDefinition>,
    pub excitation: ExcitationDefinition,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<WorkerDefinition>,
}

impl CaseDefinition {
    pub fn sphere_degree(&self, index: usize) -> Option<usize> {
        self.spheres
            .get(index)
            .map(|sphere| sphere.n_max.unwrap_or(self.n_max))
    }

    /// Checks everything that can be checked without assembling a system.
    pub fn validate(&self) -> SolverResult<()> {
        if self.n_max == 0 {
            return Err(SolverError::input_validation(
                "CONFIG.DEGREE",
                "nMax must be at least 1",
            ));
        }
        if !(self.excitation.wavelength.is_finite() && self.excitation.wavelength > 0.0) {
            return Err(SolverError::input_validation(
                "CONFIG.EXCITATION",
                format!(
                    "excitation wavelength must be positive, got {}",
                    self.excitation.wavelength
                ),
            ));
        }
        validate_material("background", &self.background)?;

        for (index, sphere) in self.spheres.iter().enumerate() {
            if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
                return Err(SolverError::input_validation(
                    "CONFIG.SPHERE",
                    format!("sphere {index} radius must be positive, got {}", sphere.radius),
                ));
            }
            validate_material(&format!("sphere {index}"), &sphere.material)?;

            let degree = sphere.n_max.unwrap_or(self.n_max);
            if degree != self.n_max {
                return Err(SolverError::input_validation(
                    "CONFIG.MIXED_DEGREE",
                    format!(
                        "sphere {index} uses nMax={degree} but the case uses nMax={}",
                        self.n_max
                    ),
                ));
            }
        }

        if let Some(workers) = self.workers {
            if workers.count == 0 {
                return Err(SolverError::input_validation(
                    "CONFIG.WORKER_GRID",
                    "worker count must be at least 1",
                ));
            }
        }
        self.solver.validate()
    }
}

fn validate_material(label: &str, material: &MaterialDefinition) -> SolverResult<()> {
    let epsilon = complex_from_pair(material.epsilon);
    let mu = complex_from_pair(material.mu);
    if epsilon.norm() == 0.0 || mu.norm() == 0.0 || !epsilon.is_finite() || !mu.is_finite() {
        return Err(SolverError::input_validation(
            "CONFIG.MATERIAL",
            format!("{label} material must have finite non-zero epsilon and mu"),
        ));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CaseLoadError {
    #[error("failed to read case file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse case file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<CaseLoadError> for SolverError {
    fn from(error: CaseLoadError) -> Self {
        match &error {
            CaseLoadError::Read { .. } => SolverError::io_system("IO.CASE_READ", error.to_string()),
            CaseLoadError::Parse { .. } => {
                SolverError::input_validation("INPUT.CASE_PARSE", error.to_string())
            }
        }
    }
}

pub fn load_case(case_path: impl AsRef<Path>) -> Result<CaseDefinition, CaseLoadError> {
    let case_path = case_path.as_ref();
    let source = fs::read_to_string(case_path).map_err(|source| CaseLoadError::Read {
        path: case_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| CaseLoadError::Parse {
        path: case_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{CaseDefinition, CaseLoadError, SolverConfig, load_case};
    use crate::domain::{SolverErrorCategory, SolverMethod};
    use std::fs;
    use tempfile::TempDir;

    const TWO_SPHERE_CASE: &str = r#"{
        "nMax": 2,
        "background": { "epsilon": [1.0, 0.0] },
        "spheres": [
            { "center": [0.0, 0.0, 0.0], "radius": 0.3, "material": { "epsilon": [2.25, 0.0] } },
            { "center": [2.0, 0.0, 0.0], "radius": 0.3, "material": { "epsilon": [2.25, 0.1] },
              "chi2": [1.0e-3, 0.0] }
        ],
        "excitation": {
            "wavelength": 1.0,
            "polarization": { "theta": [1.0, 0.0], "phi": [0.0, 0.0] }
        },
        "solver": { "method": "direct", "solver": "gmres", "maxIterations": 50 }
    }"#;

    #[test]
    fn solver_config_defaults_match_documented_values() {
        let config = SolverConfig::default();
        assert_eq!(config.method, SolverMethod::Indirect);
        assert_eq!(config.solver, "auto");
        assert_eq!(config.tolerance, 1.0e-8);
        assert_eq!(config.max_iterations, 1000);
        assert_eq!(config.restart, 300);
        assert_eq!(config.block_size, [64, 64]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn solver_config_rejects_non_positive_tolerance_and_block_size() {
        let mut config = SolverConfig {
            tolerance: 0.0,
            ..SolverConfig::default()
        };
        let error = config.validate().expect_err("zero tolerance");
        assert_eq!(error.placeholder(), "CONFIG.TOLERANCE");

        config.tolerance = 1.0e-6;
        config.block_size = [0, 8];
        let error = config.validate().expect_err("zero block");
        assert_eq!(error.placeholder(), "CONFIG.WORKER_GRID");
        assert_eq!(error.category(), SolverErrorCategory::InputValidationError);
    }

    #[test]
    fn load_case_reads_camel_case_fields_and_partial_solver_block() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("case.json");
        fs::write(&path, TWO_SPHERE_CASE).expect("write case");

        let case = load_case(&path).expect("case should load");
        assert_eq!(case.n_max, 2);
        assert_eq!(case.spheres.len(), 2);
        assert_eq!(case.background.mu, [1.0, 0.0]);
        assert_eq!(case.spheres[1].chi2, Some([1.0e-3, 0.0]));
        assert_eq!(case.solver.method, SolverMethod::Direct);
        assert_eq!(case.solver.solver, "gmres");
        assert_eq!(case.solver.max_iterations, 50);
        assert_eq!(case.solver.restart, 300);
        assert_eq!(case.excitation.theta, 0.0);
        assert!(case.workers.is_none());
        assert!(case.validate().is_ok());
    }

    #[test]
    fn validate_reports_mixed_degrees() {
        let mut case: CaseDefinition = serde_json::from_str(TWO_SPHERE_CASE).expect("parse");
        case.spheres[1].n_max = Some(3);
        assert_eq!(case.sphere_degree(1), Some(3));

        let error = case.validate().expect_err("mixed degree");
        assert_eq!(error.placeholder(), "CONFIG.MIXED_DEGREE");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn validate_rejects_degenerate_geometry() {
        let mut case: CaseDefinition = serde_json::from_str(TWO_SPHERE_CASE).expect("parse");
        case.spheres[0].radius = -1.0;
        assert_eq!(
            case.validate().expect_err("radius").placeholder(),
            "CONFIG.SPHERE"
        );

        let mut case: CaseDefinition = serde_json::from_str(TWO_SPHERE_CASE).expect("parse");
        case.excitation.wavelength = 0.0;
        assert_eq!(
            case.validate().expect_err("wavelength").placeholder(),
            "CONFIG.EXCITATION"
        );
    }

    #[test]
    fn load_case_distinguishes_read_and_parse_failures() {
        let temp = TempDir::new().expect("tempdir");
        let missing = temp.path().join("missing.json");
        let error = load_case(&missing).expect_err("missing file");
        assert!(matches!(error, CaseLoadError::Read { .. }));
        assert_eq!(crate::domain::SolverError::from(error).exit_code(), 3);

        let broken = temp.path().join("broken.json");
        fs::write(&broken, "{ not json").expect("write");
        let error = load_case(&broken).expect_err("broken file");
        assert!(matches!(error, CaseLoadError::Parse { .. }));
        assert_eq!(crate::domain::SolverError::from(error).exit_code(), 2);
    }
}

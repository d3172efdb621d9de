use anyhow::Context;
use multisphere_core::common::config::{ComplexPair, complex_to_pair};
use multisphere_core::domain::SolverError;
use multisphere_core::modules::registry::Geometry;
use multisphere_core::modules::solver::ScatteringResult;
use multisphere_core::modules::traits::ScattererRegistry;
use serde::Serialize;
use std::fs;
use std::path::Path;

use super::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SolveReport {
    pub(super) case: String,
    pub(super) n_max: usize,
    pub(super) method: String,
    pub(super) workers: usize,
    pub(super) first_harmonic: HarmonicReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) second_harmonic: Option<HarmonicReport>,
}

/// Coefficients are `[re, im]` pairs in `[M; N]` order; index-matched
/// spheres have no internal expansion and report `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HarmonicReport {
    omega: f64,
    backend: String,
    iterations: usize,
    residual: f64,
    spheres: Vec<SphereReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SphereReport {
    index: usize,
    center: [f64; 3],
    radius: f64,
    scattered: Vec<ComplexPair>,
    internal: Vec<ComplexPair>,
}

impl HarmonicReport {
    pub(super) fn new(omega: f64, geometry: &Geometry, result: &ScatteringResult) -> Self {
        let spheres = geometry
            .objects()
            .iter()
            .enumerate()
            .map(|(index, object)| SphereReport {
                index,
                center: object.center,
                radius: object.radius,
                scattered: pairs(result.scattered_for(index)),
                internal: pairs(result.internal_for(index)),
            })
            .collect();
        Self {
            omega,
            backend: result.backend.to_string(),
            iterations: result.iterations,
            residual: result.residual,
            spheres,
        }
    }
}

fn pairs(values: &[num_complex::Complex64]) -> Vec<ComplexPair> {
    values.iter().copied().map(complex_to_pair).collect()
}

pub(super) fn write_report(path: &Path, report: &SolveReport) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(report).context("failed to serialize solve report")?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| {
            SolverError::io_system(
                "IO.REPORT_WRITE",
                format!("failed to create '{}': {error}", parent.display()),
            )
        })?;
    }
    fs::write(path, rendered).map_err(|error| {
        SolverError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write report '{}': {error}", path.display()),
        )
    })?;
    Ok(())
}

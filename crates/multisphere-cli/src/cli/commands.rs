use super::CliError;
use super::report::{HarmonicReport, SolveReport, write_report};
use multisphere_core::common::config::{CaseDefinition, load_case};
use multisphere_core::domain::{SolverError, SolverResult};
use multisphere_core::modules::backend::{Backend, LocalGroup, WorkerGroup};
use multisphere_core::modules::excitation::PlaneWave;
use multisphere_core::modules::registry::{ElectroMagnetic, Geometry};
use multisphere_core::modules::solver::{ScatteringResult, Solver};
use multisphere_core::modules::traits::Excitation;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(clap::Args)]
pub(super) struct SolveArgs {
    /// Case definition (JSON)
    case: PathBuf,

    /// Report output path [default: <case>.report.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of in-process workers; overrides the case file
    #[arg(long)]
    workers: Option<usize>,

    /// Worker grid as ROWSxCOLS; overrides the case file
    #[arg(long, value_parser = parse_grid)]
    grid: Option<[usize; 2]>,

    /// Solve the second-harmonic problem driven by the first-harmonic fields
    #[arg(long)]
    second_harmonic: bool,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    /// Case definition (JSON)
    case: PathBuf,
}

pub(super) fn run_solve_command(args: SolveArgs) -> Result<i32, CliError> {
    let case = load_checked_case(&args.case)?;
    let geometry = Geometry::from_case(&case)?;
    let excitation = PlaneWave::from_definition(
        &case.excitation,
        ElectroMagnetic::from_definition(&case.background),
    );
    let group = worker_group(&case, args.workers, args.grid);

    let mut solver = Solver::new(geometry.clone(), excitation, case.n_max, case.solver.clone())?;
    let first = solve_once(&mut solver, group.as_ref())?;

    let second = if args.second_harmonic {
        let harmonic = excitation.at_harmonic(2);
        let mut solver = Solver::new(geometry.clone(), harmonic, case.n_max, case.solver.clone())?;
        solver.second_harmonic(Some(&first))?;
        Some(HarmonicReport::new(
            harmonic.omega(),
            &geometry,
            &solve_once(&mut solver, group.as_ref())?,
        ))
    } else {
        None
    };

    let report = SolveReport {
        case: args.case.display().to_string(),
        n_max: case.n_max,
        method: case.solver.method.to_string(),
        workers: group.as_ref().map_or(1, |group| group.size()),
        first_harmonic: HarmonicReport::new(excitation.omega(), &geometry, &first),
        second_harmonic: second,
    };
    let output = args
        .output
        .unwrap_or_else(|| default_report_path(&args.case));
    write_report(&output, &report)?;

    println!(
        "Solved {} spheres (nMax={}, method={}, backend={}) -> {}",
        geometry.len(),
        case.n_max,
        case.solver.method,
        first.backend,
        output.display()
    );
    Ok(0)
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let case = load_checked_case(&args.case)?;
    let geometry = Geometry::from_case(&case)?;
    let group = worker_group(&case, None, None);
    if let Some(group) = &group {
        group.validate(case.solver.block_size)?;
    }
    let backend = Backend::select(
        &case.solver.solver,
        group.as_ref().is_some_and(|group| group.is_engaged()),
    )?;

    println!(
        "Case OK: {} spheres, nMax={}, method={}, backend={}",
        geometry.len(),
        case.n_max,
        case.solver.method,
        backend
    );
    Ok(0)
}

fn load_checked_case(path: &Path) -> SolverResult<CaseDefinition> {
    let case = load_case(path).map_err(SolverError::from)?;
    case.validate()?;
    info!(
        case = %path.display(),
        spheres = case.spheres.len(),
        n_max = case.n_max,
        "loaded case"
    );
    Ok(case)
}

/// Command-line flags override the case file; no flags and no `workers`
/// entry means a plain in-process solve.
fn worker_group(
    case: &CaseDefinition,
    workers: Option<usize>,
    grid: Option<[usize; 2]>,
) -> Option<LocalGroup> {
    let workers = workers.or(case.workers.map(|definition| definition.count));
    let grid = grid.or(case.workers.and_then(|definition| definition.grid));
    match (workers, grid) {
        (None, None) => None,
        (Some(count), None) => Some(LocalGroup::new(count)),
        (Some(count), Some(grid)) => Some(LocalGroup::with_grid(count, grid)),
        (None, Some(grid)) => Some(LocalGroup::with_grid(grid[0] * grid[1], grid)),
    }
}

fn solve_once<E: Excitation>(
    solver: &mut Solver<'_, Geometry, E>,
    group: Option<&LocalGroup>,
) -> SolverResult<ScatteringResult> {
    let Some(group) = group else {
        return solver.solve();
    };
    solver.solve_distributed(group)?.into_iter().next().ok_or_else(|| {
        SolverError::internal("SOLVER.BROADCAST", "worker group returned no result")
    })
}

fn default_report_path(case: &Path) -> PathBuf {
    let stem = case
        .file_stem()
        .map_or_else(|| "case".to_string(), |stem| stem.to_string_lossy().into_owned());
    case.with_file_name(format!("{stem}.report.json"))
}

fn parse_grid(value: &str) -> Result<[usize; 2], String> {
    let (rows, cols) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{value}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|error| format!("invalid grid dimension '{part}': {error}"))
    };
    Ok([parse(rows)?, parse(cols)?])
}

mod commands;
mod report;

use clap::Parser;
use multisphere_core::domain::SolverError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().collect();
    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let solver_error = error.as_solver_error();
            eprintln!("{}", solver_error.diagnostic_line());
            if let Some(summary_line) = solver_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            solver_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(&cli.log_level);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` wins over `--log-level`; output goes to stderr so reports can be piped.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "multisphere",
    version,
    about = "Multiple-scattering T-matrix solver for systems of spheres"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Solve a case file and write a JSON report
    Solve(commands::SolveArgs),
    /// Check a case file without solving it
    Validate(commands::ValidateArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Solve(args) => commands::run_solve_command(args),
        CliCommand::Validate(args) => commands::run_validate_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SolverError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SolverError> for CliError {
    fn from(error: SolverError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_solver_error(&self) -> SolverError {
        match self {
            Self::Usage(message) => SolverError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SolverError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

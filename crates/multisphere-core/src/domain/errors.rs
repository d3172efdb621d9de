use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl SolverErrorCategory {
    pub const fn exit_placeholder(self) -> ExitPlaceholder {
        match self {
            Self::Success => ExitPlaceholder {
                exit_code: 0,
                category: "Success",
                class: "SUCCESS",
            },
            Self::InputValidationError => ExitPlaceholder {
                exit_code: 2,
                category: "InputValidationError",
                class: "CONFIG_FATAL",
            },
            Self::IoSystemError => ExitPlaceholder {
                exit_code: 3,
                category: "IoSystemError",
                class: "IO_FATAL",
            },
            Self::ComputationError => ExitPlaceholder {
                exit_code: 4,
                category: "ComputationError",
                class: "SOLVE_FATAL",
            },
            Self::InternalError => ExitPlaceholder {
                exit_code: 5,
                category: "InternalError",
                class: "SYS_FATAL",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_placeholder().exit_code
    }

    pub const fn name(self) -> &'static str {
        self.exit_placeholder().category
    }

    pub const fn class(self) -> &'static str {
        self.exit_placeholder().class
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPlaceholder {
    pub exit_code: i32,
    pub category: &'static str,
    pub class: &'static str,
}

/// Fatal condition reported to the caller of the solver facade.
///
/// `placeholder` is a stable dotted code (`CONFIG.MIXED_DEGREE`,
/// `SOLVE.NOT_CONVERGED`, ...) that scripts can match on; `message` is the
/// human readable cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverError {
    category: SolverErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl SolverError {
    pub fn new(
        category: SolverErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            SolverErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SolverErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SolverErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(SolverErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> SolverErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for SolverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for SolverError {}

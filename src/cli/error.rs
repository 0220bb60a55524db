//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use crate::exitcode;

        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Command { .. } => exitcode::SOFTWARE,
                InfraError::Parse { .. } => exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Fetch { .. } => exitcode::UNAVAILABLE,
                    ApplicationError::Write { .. } => exitcode::CANTCREAT,
                    ApplicationError::Install { .. } => exitcode::IOERR,
                    ApplicationError::Reload { .. } => exitcode::OSERR,
                    ApplicationError::Lifecycle { .. } => exitcode::SOFTWARE,
                    ApplicationError::Dependencies { .. } => exitcode::TEMPFAIL,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                },
            },
        }
    }
}

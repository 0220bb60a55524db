//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
///
/// Every failure variant names its target (path, unit, service) and, where an
/// external command was involved, its exit code.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("fetch parameters from {path} ({region}): {message}")]
    Fetch {
        path: String,
        region: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("write env file {path}: {message}")]
    Write {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("install {file} into {dir}: {message}")]
    Install {
        file: PathBuf,
        dir: PathBuf,
        message: String,
    },

    #[error("reload service manager definitions: {message}")]
    Reload {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("service {service}: {action} failed: {status}")]
    Lifecycle {
        service: String,
        action: String,
        status: String,
        exit_code: Option<i32>,
    },

    #[error("install runtime dependencies: {message}")]
    Dependencies {
        message: String,
        exit_code: Option<i32>,
    },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

//! Infrastructure-level errors (wraps application errors)

use std::process::Output;

use thiserror::Error;

use crate::application::ApplicationError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed: {message}")]
    Command {
        program: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("unexpected output from {program}: {message}")]
    Parse { program: String, message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failure from a finished process, using its stderr
    /// (or stdout when stderr is empty) as the message.
    pub fn command(program: impl Into<String>, output: &Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        let message = if message.is_empty() {
            format!("exited with {}", output.status)
        } else {
            message
        };
        Self::Command {
            program: program.into(),
            message,
            exit_code: output.status.code(),
        }
    }

    /// Exit code of the failed external command, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Command { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;

//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent business logic violations.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid environment variable name: {0:?}")]
    InvalidVariableName(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidVariableValue { name: String, reason: String },
}

//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::domain::{ServiceState, StepOutcome, StepStatus};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print plain output (no color, for data/export statements)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    print!("{}", msg);
}

/// Print one pipeline step result
pub fn step(outcome: &StepOutcome) {
    let index = format!("{:>2}.", outcome.index);
    match &outcome.status {
        StepStatus::Succeeded(detail) => {
            println!("{} {} {}: {}", index, "✓".green(), outcome.step, detail)
        }
        StepStatus::Skipped(reason) => {
            println!("{} {} {}: {}", index, "-".yellow(), outcome.step, reason)
        }
        StepStatus::Failed(reason) => {
            println!("{} {} {}: {}", index, "✗".red(), outcome.step, reason)
        }
    }
}

/// Print a unit state row
pub fn unit_state(unit: &str, state: ServiceState) {
    let state_str = match state {
        ServiceState::Active => state.as_str().green(),
        ServiceState::Inactive => state.as_str().red(),
        ServiceState::Unknown => state.as_str().yellow(),
    };
    println!("{:<40} {}", unit, state_str);
}

//! systemd service manager driven through `systemctl`

use std::sync::Arc;

use tracing::debug;

use crate::domain::ServiceState;
use crate::infrastructure::traits::{CommandRunner, ServiceManager, UnitStatus};
use crate::infrastructure::{InfraError, InfraResult};

/// `ServiceManager` backed by the `systemctl` binary.
pub struct SystemctlManager {
    cmd: Arc<dyn CommandRunner>,
    program: String,
}

impl SystemctlManager {
    pub fn new(cmd: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            cmd,
            program: program.into(),
        }
    }

    /// Run `systemctl <args>` and require a zero exit.
    fn run_checked(&self, args: &[&str]) -> InfraResult<()> {
        debug!("{} {}", self.program, args.join(" "));
        let output = self
            .cmd
            .run(&self.program, args)
            .map_err(|e| InfraError::io(format!("run {} {}", self.program, args.join(" ")), e))?;

        if !output.status.success() {
            return Err(InfraError::command(
                format!("{} {}", self.program, args.join(" ")),
                &output,
            ));
        }
        Ok(())
    }
}

/// Extract the `Active:` line of `systemctl status` output.
fn active_line(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Active:"))
        .map(str::trim)
}

impl ServiceManager for SystemctlManager {
    fn reload(&self) -> InfraResult<()> {
        self.run_checked(&["daemon-reload"])
    }

    fn enable(&self, unit: &str) -> InfraResult<()> {
        self.run_checked(&["enable", unit])
    }

    fn restart(&self, unit: &str) -> InfraResult<()> {
        self.run_checked(&["restart", unit])
    }

    fn status(&self, unit: &str) -> InfraResult<UnitStatus> {
        let args = ["status", "--no-pager", unit];
        debug!("{} {}", self.program, args.join(" "));
        let output = self
            .cmd
            .run(&self.program, &args)
            .map_err(|e| InfraError::io(format!("run {} status {}", self.program, unit), e))?;

        // Non-zero exit is an answer here (3 = not running, 4 = no such unit)
        let stdout = String::from_utf8_lossy(&output.stdout);
        let exit_code = output.status.code();
        let (state, summary) = match active_line(&stdout) {
            Some(line) => {
                let word = line.split_whitespace().next().unwrap_or_default();
                (ServiceState::from_is_active(word), line.to_string())
            }
            None => {
                let state = match exit_code {
                    Some(0) => ServiceState::Active,
                    Some(3) => ServiceState::Inactive,
                    _ => ServiceState::Unknown,
                };
                let stderr = String::from_utf8_lossy(&output.stderr);
                let summary = match stderr.trim() {
                    "" => format!("{state} (exit {})", output.status),
                    msg => msg.to_string(),
                };
                (state, summary)
            }
        };

        Ok(UnitStatus {
            state,
            exit_code,
            summary,
        })
    }

    fn is_active(&self, unit: &str) -> InfraResult<ServiceState> {
        let args = ["is-active", unit];
        debug!("{} {}", self.program, args.join(" "));
        let output = self
            .cmd
            .run(&self.program, &args)
            .map_err(|e| InfraError::io(format!("run {} is-active {}", self.program, unit), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let state = ServiceState::from_is_active(&stdout);
        debug!("is_active: unit={}, state={}", unit, state);
        Ok(state)
    }
}

//! Test support: logging setup and in-memory fakes for the I/O traits

use std::collections::{HashMap, VecDeque};
use std::env;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Mutex, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::DependencyMode;
use crate::domain::{Parameter, ServiceState};
use crate::infrastructure::traits::{
    CommandRunner, DependencyInstaller, ParameterStore, ServiceManager, UnitStatus,
};
use crate::infrastructure::{InfraError, InfraResult};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = [""];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Build a finished-process `Output` with the given exit code.
pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    Output {
        status: ExitStatus::from_raw(code << 8),
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

fn failed(program: &str, message: &str, exit_code: i32) -> InfraError {
    InfraError::Command {
        program: program.to_string(),
        message: message.to_string(),
        exit_code: Some(exit_code),
    }
}

// ============================================================
// CommandRunner
// ============================================================

/// Command runner that replays scripted outputs and records invocations.
///
/// Once the script is exhausted every call succeeds with empty output.
#[derive(Default)]
pub struct ScriptedCommandRunner {
    responses: Mutex<VecDeque<Output>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCommandRunner {
    pub fn new(responses: Vec<Output>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let mut call = vec![cmd.to_string()];
        call.extend(args.iter().map(|a| a.to_string()));
        self.calls.lock().unwrap().push(call);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| output(0, "", "")))
    }
}

// ============================================================
// ServiceManager
// ============================================================

/// In-memory service manager.
///
/// Restarting a unit makes it active unless it was marked as stuck.
#[derive(Default)]
pub struct FakeServiceManager {
    states: Mutex<HashMap<String, ServiceState>>,
    calls: Mutex<Vec<String>>,
    fail_reload: bool,
    fail_restart: Option<String>,
    stuck: Option<String>,
}

impl FakeServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, unit: &str, state: ServiceState) -> Self {
        self.states.lock().unwrap().insert(unit.to_string(), state);
        self
    }

    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    pub fn failing_restart(mut self, unit: &str) -> Self {
        self.fail_restart = Some(unit.to_string());
        self
    }

    /// `unit` stays inactive after a restart.
    pub fn stuck(mut self, unit: &str) -> Self {
        self.stuck = Some(unit.to_string());
        self
    }

    pub fn state(&self, unit: &str) -> ServiceState {
        self.states
            .lock()
            .unwrap()
            .get(unit)
            .copied()
            .unwrap_or(ServiceState::Inactive)
    }

    /// Every call, e.g. `is-active drones.service`, `daemon-reload`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that change manager state (`daemon-reload`, `enable`, `restart`).
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("is-active") && !c.starts_with("status"))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ServiceManager for FakeServiceManager {
    fn reload(&self) -> InfraResult<()> {
        self.record("daemon-reload".into());
        if self.fail_reload {
            return Err(failed("systemctl daemon-reload", "reload refused", 1));
        }
        Ok(())
    }

    fn enable(&self, unit: &str) -> InfraResult<()> {
        self.record(format!("enable {unit}"));
        Ok(())
    }

    fn restart(&self, unit: &str) -> InfraResult<()> {
        self.record(format!("restart {unit}"));
        if self.fail_restart.as_deref() == Some(unit) {
            return Err(failed("systemctl restart", "job failed", 1));
        }
        if self.stuck.as_deref() != Some(unit) {
            self.states
                .lock()
                .unwrap()
                .insert(unit.to_string(), ServiceState::Active);
        }
        Ok(())
    }

    fn status(&self, unit: &str) -> InfraResult<UnitStatus> {
        self.record(format!("status {unit}"));
        let state = self.state(unit);
        Ok(UnitStatus {
            state,
            exit_code: Some(if state.is_active() { 0 } else { 3 }),
            summary: state.to_string(),
        })
    }

    fn is_active(&self, unit: &str) -> InfraResult<ServiceState> {
        self.record(format!("is-active {unit}"));
        Ok(self.state(unit))
    }
}

// ============================================================
// ParameterStore
// ============================================================

/// In-memory parameter store.
#[derive(Default)]
pub struct FakeParameterStore {
    by_path: HashMap<String, Vec<Parameter>>,
    named: HashMap<String, Parameter>,
    unreachable: bool,
}

impl FakeParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, path: &str, name: &str, value: &str) -> Self {
        let full = format!("{}/{}", path.trim_end_matches('/'), name);
        self.by_path
            .entry(path.to_string())
            .or_default()
            .push(Parameter::new(full, value));
        self
    }

    pub fn with_named(mut self, name: &str, value: &str) -> Self {
        self.named
            .insert(name.to_string(), Parameter::new(name, value));
        self
    }

    /// Every call fails like a client that cannot reach the store.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

impl ParameterStore for FakeParameterStore {
    fn get_parameters_by_path(&self, path: &str, _region: &str) -> InfraResult<Vec<Parameter>> {
        if self.unreachable {
            return Err(failed("aws ssm", "could not connect to the endpoint URL", 255));
        }
        Ok(self.by_path.get(path).cloned().unwrap_or_default())
    }

    fn get_parameter(&self, name: &str, _region: &str) -> InfraResult<Parameter> {
        if self.unreachable {
            return Err(failed("aws ssm", "could not connect to the endpoint URL", 255));
        }
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| failed("aws ssm", "ParameterNotFound", 254))
    }
}

// ============================================================
// DependencyInstaller
// ============================================================

/// Dependency installer that records calls.
#[derive(Default)]
pub struct FakeDependencyInstaller {
    calls: Mutex<Vec<(PathBuf, DependencyMode)>>,
    fail: bool,
}

impl FakeDependencyInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, DependencyMode)> {
        self.calls.lock().unwrap().clone()
    }
}

impl DependencyInstaller for FakeDependencyInstaller {
    fn install(&self, app_dir: &Path, mode: DependencyMode) -> InfraResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((app_dir.to_path_buf(), mode));
        if self.fail {
            return Err(failed("pip", "No matching distribution found", 1));
        }
        Ok(())
    }
}

// test
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_stuck_unit_when_restarting_then_state_is_unchanged() {
        let manager = FakeServiceManager::new().stuck("drones.service");

        manager.restart("drones.service").unwrap();

        assert_eq!(manager.state("drones.service"), ServiceState::Inactive);
    }
}

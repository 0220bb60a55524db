//! Domain entities: core data structures

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::domain::DomainError;

/// State of a unit as observed through the service manager.
///
/// The orchestrator never owns this state, it only queries it right before
/// deciding what to do with a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Inactive,
    Unknown,
}

impl ServiceState {
    /// Map the first line printed by `systemctl is-active` onto a state.
    pub fn from_is_active(output: &str) -> Self {
        match output.lines().next().unwrap_or_default().trim() {
            "active" | "reloading" => Self::Active,
            "inactive" | "failed" | "deactivating" => Self::Inactive,
            _ => Self::Unknown,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a service in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    /// Shared infrastructure dependency (at most one instance)
    Cache,
    /// The API process
    Primary,
    /// Periodic job driven by a timer unit
    Companion,
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cache => "cache",
            Self::Primary => "primary",
            Self::Companion => "companion",
        };
        f.write_str(s)
    }
}

/// How a service is brought to its desired end state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RestartPolicy {
    /// Leave the unit untouched when it is already active.
    pub skip_if_active: bool,
    /// Enable the restart target for future boots before restarting it.
    pub enable: bool,
    /// Query status after the restart and fail unless the unit is active.
    pub verify_active: bool,
}

/// One service of the fleet, fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub role: ServiceRole,
    /// Unit file name, e.g. `drones.service`
    pub unit_name: String,
    /// Companion timer file name, e.g. `drones-statistics.timer`
    pub timer_name: Option<String>,
    /// Directory holding the unit templates
    pub source_dir: PathBuf,
    /// Service manager unit directory
    pub install_dir: PathBuf,
    pub policy: RestartPolicy,
}

impl ServiceDefinition {
    /// Unit that receives `enable`/`restart`.
    ///
    /// Timer-driven services are restarted through their timer, which re-arms
    /// the schedule without forcing an immediate run of the service.
    pub fn restart_target(&self) -> &str {
        self.timer_name.as_deref().unwrap_or(&self.unit_name)
    }

    /// Source paths of every definition file for this service (unit first).
    pub fn definition_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.source_dir.join(&self.unit_name)];
        if let Some(timer) = &self.timer_name {
            files.push(self.source_dir.join(timer));
        }
        files
    }
}

/// A single entry returned by the parameter store.
#[derive(Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full parameter name, e.g. `/drones/prod/DRONES_DB_URI`
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Environment variable name: last path segment, upper-cased.
    pub fn env_name(&self) -> String {
        self.name
            .rsplit('/')
            .next()
            .unwrap_or(&self.name)
            .to_uppercase()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

fn variable_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

/// Secrets to materialize as an environment file.
///
/// Keys are unique and kept sorted so the rendered file is deterministic.
/// `Debug` only shows keys.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    variables: BTreeMap<String, String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, DomainError> {
        let name = name.into();
        let value = value.into();

        if !variable_name_regex().is_match(&name) {
            return Err(DomainError::InvalidVariableName(name));
        }
        if value.contains('\0') {
            return Err(DomainError::InvalidVariableValue {
                name,
                reason: "contains NUL byte".into(),
            });
        }
        // One variable per line in the rendered file
        if value.contains(['\n', '\r']) {
            return Err(DomainError::InvalidVariableValue {
                name,
                reason: "contains line break".into(),
            });
        }

        Ok(self.variables.insert(name, value))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Render as `KEY=VALUE` lines, optionally prefixed with `export `.
    pub fn render(&self, with_export: bool) -> String {
        let prefix = if with_export { "export " } else { "" };
        let mut out = String::new();
        for (name, value) in &self.variables {
            out.push_str(prefix);
            out.push_str(name);
            out.push('=');
            out.push_str(&quote_value(value));
            out.push('\n');
        }
        out
    }
}

impl fmt::Debug for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.variables.keys()).finish()
    }
}

fn is_shell_safe(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '_' | '.' | '/' | ':' | '@' | '%' | '+' | ',' | '=' | '-')
    })
}

/// Leave shell-safe values bare, double-quote everything else.
fn quote_value(value: &str) -> Cow<'_, str> {
    if is_shell_safe(value) {
        return Cow::Borrowed(value);
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// A step of the deployment pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStep {
    /// Install the runtime dependencies of the business logic
    Dependencies,
    /// Fetch secrets and write the environment file
    Parameters,
    /// Bring one fleet service to its desired state
    Service { name: String, role: ServiceRole },
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependencies => f.write_str("install-dependencies"),
            Self::Parameters => f.write_str("fetch-parameters"),
            Self::Service { name, role } => write!(f, "{role}:{name}"),
        }
    }
}

/// Result of a single pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded(String),
    Skipped(String),
    Failed(String),
}

/// A step together with its 1-based position and result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub index: usize,
    pub step: DeployStep,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }
}

/// Expand environment variables in a path string.
///
/// Supports:
/// - `$VAR` syntax
/// - `${VAR}` syntax
/// - `~` for home directory
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

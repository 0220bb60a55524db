//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/drones-deploy/drones-deploy.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `DRONES_DEPLOY_*` prefix (`__` separates nested keys)
//! 5. CLI flags (applied by the caller via [`Settings::with_overrides`])

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::expand_env_vars;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "DRONES_DEPLOY";

const DEFAULT_REGION: &str = "us-east-1";

/// Secrets the API needs that live outside the default parameter path.
const DEFAULT_NAMED_PARAMETERS: &[(&str, &str)] = &[
    ("SPIRE_CORS_ALLOWED_ORIGINS", "/spire/prod/SPIRE_CORS_ALLOWED_ORIGINS"),
    ("BROOD_CORS_ALLOWED_ORIGINS", "/brood/prod/BROOD_CORS_ALLOWED_ORIGINS"),
    ("SPIRE_DB_URI", "/spire/prod/SPIRE_DB_URI"),
    ("SPIRE_DB_URI_READ_ONLY", "/spire/prod/SPIRE_DB_URI_READ_ONLY"),
    ("BROOD_DB_URI", "/brood/prod/BROOD_DB_URI"),
    ("BROOD_DB_URI_READ_ONLY", "/brood/prod/BROOD_DB_URI_READ_ONLY"),
    ("AWS_S3_DRONES_BUCKET", "/spire/prod/AWS_S3_DRONES_BUCKET"),
    (
        "AWS_S3_DRONES_BUCKET_STATISTICS_PREFIX",
        "/spire/prod/AWS_S3_DRONES_BUCKET_STATISTICS_PREFIX",
    ),
    ("BUGOUT_AUTH_URL", "/spire/prod/BUGOUT_AUTH_URL"),
    ("BUGOUT_CLIENT_ID_HEADER", "/spire/prod/BUGOUT_CLIENT_ID_HEADER"),
    (
        "BUGOUT_BOT_INSTALLATION_TOKEN_HEADER",
        "/spire/prod/BUGOUT_BOT_INSTALLATION_TOKEN_HEADER",
    ),
];

/// How runtime dependencies are pinned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// `pip install -r <requirements_file>`
    #[default]
    Locked,
    /// `pip install -U -e <app_dir>`
    Unpinned,
}

impl std::str::FromStr for DependencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "locked" => Ok(Self::Locked),
            "unpinned" => Ok(Self::Unpinned),
            other => Err(format!("unknown dependency mode: {other}")),
        }
    }
}

/// Parameter store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParametersConfig {
    /// Path whose direct children become env vars (empty disables it)
    pub path: Option<String>,
    /// Region of the parameter store
    pub region: String,
    /// Prefix every env line with `export `
    pub export: bool,
    /// `aws` CLI binary
    pub aws_cli: String,
    /// Extra parameters outside `path`: ENV_NAME -> full parameter name
    /// (an empty name drops a default entry)
    pub named: BTreeMap<String, String>,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.into());
        Self {
            path: Some("/drones/prod".into()),
            region,
            export: false,
            aws_cli: "aws".into(),
            named: DEFAULT_NAMED_PARAMETERS
                .iter()
                .map(|(env, name)| (env.to_string(), name.to_string()))
                .collect(),
        }
    }
}

/// Runtime dependency installation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DependenciesConfig {
    pub mode: DependencyMode,
    /// Requirements file relative to `app_dir` (locked mode)
    pub requirements_file: String,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            mode: DependencyMode::Locked,
            requirements_file: "requirements.txt".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawParametersConfig {
    pub path: Option<String>,
    pub region: Option<String>,
    pub export: Option<bool>,
    pub aws_cli: Option<String>,
    pub named: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDependenciesConfig {
    pub mode: Option<DependencyMode>,
    pub requirements_file: Option<String>,
}

/// Raw settings for intermediate parsing (`None` = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub app_dir: Option<PathBuf>,
    pub python_env_dir: Option<PathBuf>,
    pub secrets_dir: Option<PathBuf>,
    pub env_file_name: Option<String>,
    pub unit_dir: Option<PathBuf>,
    pub deploy_cache: Option<bool>,
    pub systemctl: Option<String>,
    pub parameters: RawParametersConfig,
    pub dependencies: RawDependenciesConfig,
}

/// Deployment configuration, loaded once per run and shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Install root of the application checkout
    pub app_dir: PathBuf,
    /// Python virtualenv hosting the application
    pub python_env_dir: PathBuf,
    /// Directory receiving the environment file
    pub secrets_dir: PathBuf,
    /// Environment file name inside `secrets_dir`
    pub env_file_name: String,
    /// Service manager unit directory
    pub unit_dir: PathBuf,
    /// Deploy the shared cache service
    pub deploy_cache: bool,
    /// `systemctl` binary
    pub systemctl: String,
    pub parameters: ParametersConfig,
    pub dependencies: DependenciesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from("/home/ubuntu/drones"),
            python_env_dir: PathBuf::from("/home/ubuntu/drones-env"),
            secrets_dir: PathBuf::from("/home/ubuntu/drones-secrets"),
            env_file_name: "app.env".into(),
            unit_dir: PathBuf::from("/etc/systemd/system"),
            deploy_cache: true,
            systemctl: "systemctl".into(),
            parameters: ParametersConfig::default(),
            dependencies: DependenciesConfig::default(),
        }
    }
}

/// Get the XDG config directory for drones-deploy.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "drones-deploy").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("drones-deploy.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Full path of the environment file.
    pub fn env_file_path(&self) -> PathBuf {
        self.secrets_dir.join(&self.env_file_name)
    }

    /// Directory holding the unit templates shipped with the application.
    pub fn units_source_dir(&self) -> PathBuf {
        self.app_dir.join("deploy")
    }

    /// Parameter path, with an empty string meaning "no path source".
    pub fn parameter_path(&self) -> Option<&str> {
        self.parameters.path.as_deref().filter(|p| !p.is_empty())
    }

    /// Named parameters as `(env name, parameter name)`, skipping entries
    /// disabled with an empty parameter name.
    pub fn named_parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters
            .named
            .iter()
            .filter(|(_, name)| !name.is_empty())
            .map(|(env, name)| (env.as_str(), name.as_str()))
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        for path in [
            &mut self.app_dir,
            &mut self.python_env_dir,
            &mut self.secrets_dir,
            &mut self.unit_dir,
        ] {
            let expanded = expand_env_vars(path.to_string_lossy().as_ref());
            *path = PathBuf::from(expanded);
        }
    }

    /// Overlay a raw config onto self: scalars replace when specified,
    /// `named` parameters are unioned with overlay entries winning.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut named = self.parameters.named.clone();
        if let Some(extra) = &overlay.parameters.named {
            named.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        Self {
            app_dir: overlay.app_dir.clone().unwrap_or_else(|| self.app_dir.clone()),
            python_env_dir: overlay
                .python_env_dir
                .clone()
                .unwrap_or_else(|| self.python_env_dir.clone()),
            secrets_dir: overlay
                .secrets_dir
                .clone()
                .unwrap_or_else(|| self.secrets_dir.clone()),
            env_file_name: overlay
                .env_file_name
                .clone()
                .unwrap_or_else(|| self.env_file_name.clone()),
            unit_dir: overlay
                .unit_dir
                .clone()
                .unwrap_or_else(|| self.unit_dir.clone()),
            deploy_cache: overlay.deploy_cache.unwrap_or(self.deploy_cache),
            systemctl: overlay
                .systemctl
                .clone()
                .unwrap_or_else(|| self.systemctl.clone()),
            parameters: ParametersConfig {
                path: overlay
                    .parameters
                    .path
                    .clone()
                    .or_else(|| self.parameters.path.clone()),
                region: overlay
                    .parameters
                    .region
                    .clone()
                    .unwrap_or_else(|| self.parameters.region.clone()),
                export: overlay.parameters.export.unwrap_or(self.parameters.export),
                aws_cli: overlay
                    .parameters
                    .aws_cli
                    .clone()
                    .unwrap_or_else(|| self.parameters.aws_cli.clone()),
                named,
            },
            dependencies: DependenciesConfig {
                mode: overlay.dependencies.mode.unwrap_or(self.dependencies.mode),
                requirements_file: overlay
                    .dependencies
                    .requirements_file
                    .clone()
                    .unwrap_or_else(|| self.dependencies.requirements_file.clone()),
            },
        }
    }

    /// Load settings with layered precedence from the process environment.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_with_env(config_file, None)
    }

    /// Like [`Settings::load`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current, env)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply DRONES_DEPLOY_* environment variables as explicit overrides.
    fn apply_env_overrides(
        mut settings: Self,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("app_dir") {
            settings.app_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("python_env_dir") {
            settings.python_env_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("secrets_dir") {
            settings.secrets_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("env_file_name") {
            settings.env_file_name = val;
        }
        if let Ok(val) = config.get_string("unit_dir") {
            settings.unit_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("deploy_cache") {
            settings.deploy_cache = val;
        }
        if let Ok(val) = config.get_string("systemctl") {
            settings.systemctl = val;
        }
        if let Ok(val) = config.get_string("parameters.path") {
            settings.parameters.path = Some(val);
        }
        if let Ok(val) = config.get_string("parameters.region") {
            settings.parameters.region = val;
        }
        if let Ok(val) = config.get_bool("parameters.export") {
            settings.parameters.export = val;
        }
        if let Ok(val) = config.get_string("parameters.aws_cli") {
            settings.parameters.aws_cli = val;
        }
        if let Ok(val) = config.get_string("dependencies.mode") {
            settings.dependencies.mode = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_string("dependencies.requirements_file") {
            settings.dependencies.requirements_file = val;
        }

        Ok(settings)
    }

    /// Apply CLI flag overrides (highest precedence).
    pub fn with_overrides(
        mut self,
        region: Option<String>,
        parameter_path: Option<String>,
    ) -> Self {
        if let Some(region) = region {
            self.parameters.region = region;
        }
        if let Some(path) = parameter_path {
            self.parameters.path = Some(path);
        }
        self
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# drones-deploy configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/drones-deploy/drones-deploy.toml
#   Explicit: drones-deploy --config <file>
#   Env:      DRONES_DEPLOY_* environment variables, e.g.
#             DRONES_DEPLOY_APP_DIR, DRONES_DEPLOY_PARAMETERS__REGION
#   Flags:    --region, --parameter-path

# Application checkout (unit templates are read from <app_dir>/deploy)
# app_dir = "/home/ubuntu/drones"

# Python virtualenv used for dependency installation
# python_env_dir = "/home/ubuntu/drones-env"

# Environment file location: <secrets_dir>/<env_file_name>
# secrets_dir = "/home/ubuntu/drones-secrets"
# env_file_name = "app.env"

# Service manager unit directory
# unit_dir = "/etc/systemd/system"

# Deploy the shared cache service (left alone when already running)
# deploy_cache = true

# systemctl = "systemctl"

[parameters]
# Every parameter directly under this path becomes an env var ("" disables)
# path = "/drones/prod"

# Defaults to $AWS_DEFAULT_REGION, then us-east-1
# region = "us-east-1"

# Write "export KEY=VALUE" lines
# export = false

# aws_cli = "aws"

# Parameters living outside the path: ENV_NAME = "full parameter name".
# Entries are added to the built-in mapping (see `params print`); an empty
# name drops a built-in entry.
# [parameters.named]
# BUGOUT_AUTH_URL = "/spire/prod/BUGOUT_AUTH_URL"
# SPIRE_DB_URI_READ_ONLY = ""

[dependencies]
# "locked" installs <requirements_file>, "unpinned" installs the app editable
# mode = "locked"
# requirements_file = "requirements.txt"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

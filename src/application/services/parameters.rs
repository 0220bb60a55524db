//! Parameter fetching and environment file materialization
//!
//! Pulls secrets from the parameter store (a path source plus explicitly
//! named parameters) and writes them as a `KEY=VALUE` environment file that
//! only the owning account can read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{DomainError, ParameterSet};
use crate::infrastructure::traits::{FileSystem, ParameterStore};
use crate::infrastructure::InfraError;

/// Permission bits of the environment file (owner read/write).
pub const ENV_FILE_MODE: u32 = 0o600;

/// Result of writing the environment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedEnv {
    pub path: PathBuf,
    pub variables: usize,
}

/// Fetches parameters and renders them into the environment file.
pub struct ParameterService {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn ParameterStore>,
    settings: Arc<Settings>,
}

impl ParameterService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn ParameterStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            store,
            settings,
        }
    }

    fn fetch_error(
        &self,
        target: &str,
        message: String,
        exit_code: Option<i32>,
    ) -> ApplicationError {
        ApplicationError::Fetch {
            path: target.to_string(),
            region: self.settings.parameters.region.clone(),
            message,
            exit_code,
        }
    }

    fn from_infra(&self, target: &str, e: InfraError) -> ApplicationError {
        let exit_code = e.exit_code();
        self.fetch_error(target, e.to_string(), exit_code)
    }

    fn from_domain(&self, target: &str, e: DomainError) -> ApplicationError {
        self.fetch_error(target, e.to_string(), None)
    }

    /// Fetch the complete parameter set.
    ///
    /// Named parameters are inserted first, then everything under the
    /// configured path; a path parameter overrides a named one with the same
    /// env name. Two path parameters mapping to one env name (names differing
    /// only in case) keep the one listed last.
    pub fn fetch(&self) -> ApplicationResult<ParameterSet> {
        let region = &self.settings.parameters.region;
        let mut set = ParameterSet::new();
        // env name -> (parameter name, came from the path source)
        let mut sources: BTreeMap<String, (String, bool)> = BTreeMap::new();

        for (env_name, param_name) in self.settings.named_parameters() {
            debug!("fetch: named parameter {} -> {}", param_name, env_name);
            let param = self
                .store
                .get_parameter(param_name, region)
                .map_err(|e| self.from_infra(param_name, e))?;
            set.insert(env_name, param.value)
                .map_err(|e| self.from_domain(param_name, e))?;
            sources.insert(env_name.to_string(), (param.name, false));
        }

        if let Some(path) = self.settings.parameter_path() {
            let params = self
                .store
                .get_parameters_by_path(path, region)
                .map_err(|e| self.from_infra(path, e))?;
            if params.is_empty() {
                return Err(self.fetch_error(path, "path yielded no parameters".into(), None));
            }
            for param in params {
                let env_name = param.env_name();
                set.insert(env_name.clone(), param.value)
                    .map_err(|e| self.from_domain(&param.name, e))?;
                match sources.insert(env_name.clone(), (param.name.clone(), true)) {
                    Some((previous, true)) => warn!(
                        "{} and {} both map to {}, keeping {}",
                        previous, param.name, env_name, param.name
                    ),
                    Some((previous, false)) => debug!(
                        "fetch: {} overrides named parameter {} for {}",
                        param.name, previous, env_name
                    ),
                    None => {}
                }
            }
        }

        if set.is_empty() {
            return Err(self.fetch_error(
                self.settings.parameter_path().unwrap_or("<none>"),
                "no parameters configured".into(),
                None,
            ));
        }

        debug!("fetch: keys={:?}", set);
        Ok(set)
    }

    /// Write `set` to `dest`, creating parent directories as needed.
    ///
    /// The previous file at `dest` stays in place until the new one is
    /// complete and permissioned.
    pub fn write(&self, set: &ParameterSet, dest: &Path) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(dest)
            .or_write_error("create parent directory", dest)?;
        self.fs
            .write_atomic(dest, &set.render(self.settings.parameters.export), ENV_FILE_MODE)
            .or_write_error("write", dest)?;
        Ok(())
    }

    /// Fetch and write to the configured environment file.
    pub fn materialize(&self) -> ApplicationResult<MaterializedEnv> {
        let set = self.fetch()?;
        let path = self.settings.env_file_path();
        self.write(&set, &path)?;
        info!("wrote {} variables to {}", set.len(), path.display());
        Ok(MaterializedEnv {
            path,
            variables: set.len(),
        })
    }
}

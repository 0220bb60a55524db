//! Python dependency installation with the virtualenv's `pip`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::DependencyMode;
use crate::infrastructure::traits::{CommandRunner, DependencyInstaller};
use crate::infrastructure::{InfraError, InfraResult};

/// `DependencyInstaller` that runs `<python_env>/bin/pip`.
pub struct PipInstaller {
    cmd: Arc<dyn CommandRunner>,
    pip: PathBuf,
    requirements_file: String,
}

impl PipInstaller {
    pub fn new(
        cmd: Arc<dyn CommandRunner>,
        python_env_dir: &Path,
        requirements_file: impl Into<String>,
    ) -> Self {
        Self {
            cmd,
            pip: python_env_dir.join("bin").join("pip"),
            requirements_file: requirements_file.into(),
        }
    }

    /// Arguments for one install run.
    pub fn install_args(&self, app_dir: &Path, mode: DependencyMode) -> Vec<String> {
        match mode {
            DependencyMode::Locked => vec![
                "install".into(),
                "-r".into(),
                app_dir.join(&self.requirements_file).display().to_string(),
            ],
            DependencyMode::Unpinned => vec![
                "install".into(),
                "-U".into(),
                "-e".into(),
                app_dir.display().to_string(),
            ],
        }
    }
}

impl DependencyInstaller for PipInstaller {
    fn install(&self, app_dir: &Path, mode: DependencyMode) -> InfraResult<()> {
        let pip = self.pip.display().to_string();
        let args = self.install_args(app_dir, mode);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!("{} {}", pip, args.join(" "));

        let output = self
            .cmd
            .run(&pip, &args)
            .map_err(|e| InfraError::io(format!("run {pip}"), e))?;
        if !output.status.success() {
            return Err(InfraError::command(pip, &output));
        }
        Ok(())
    }
}

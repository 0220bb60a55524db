//! Unit definition installation
//!
//! Copies unit (and timer) templates into the service manager's unit
//! directory and asks the manager to reload its definitions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::hash::{content_hash, short_hash};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::infrastructure::traits::{FileSystem, ServiceManager};

/// Permission bits of installed unit files (world-readable, owner-writable).
pub const UNIT_FILE_MODE: u32 = 0o644;

/// One definition file after installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledUnit {
    pub name: String,
    pub path: PathBuf,
    /// False when the installed content was already identical
    pub changed: bool,
}

/// Installs definition files and reloads the service manager.
pub struct UnitInstaller {
    fs: Arc<dyn FileSystem>,
    manager: Arc<dyn ServiceManager>,
}

impl UnitInstaller {
    pub fn new(fs: Arc<dyn FileSystem>, manager: Arc<dyn ServiceManager>) -> Self {
        Self { fs, manager }
    }

    /// Install every file in `files` into `install_dir`, then reload once.
    ///
    /// A reload failure is returned as `Reload`: the manager may still be
    /// running stale definitions.
    pub fn install(
        &self,
        files: &[PathBuf],
        install_dir: &Path,
    ) -> ApplicationResult<Vec<InstalledUnit>> {
        let mut installed = Vec::with_capacity(files.len());
        for source in files {
            installed.push(self.install_file(source, install_dir)?);
        }

        self.manager.reload().map_err(|e| ApplicationError::Reload {
            exit_code: e.exit_code(),
            message: e.to_string(),
        })?;
        debug!("install: reloaded after {} file(s)", installed.len());

        Ok(installed)
    }

    fn install_file(&self, source: &Path, install_dir: &Path) -> ApplicationResult<InstalledUnit> {
        let install_error = |message: &str| ApplicationError::Install {
            file: source.to_path_buf(),
            dir: install_dir.to_path_buf(),
            message: message.to_string(),
        };

        if !self.fs.is_file(source) {
            return Err(install_error("source file not found"));
        }
        if !self.fs.is_dir(install_dir) {
            return Err(install_error("install directory does not exist"));
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| install_error("source has no file name"))?;
        let dest = install_dir.join(&name);

        let new_hash = content_hash(
            &self
                .fs
                .read(source)
                .or_install_error("read", source, install_dir)?,
        );
        let old_hash = if self.fs.is_file(&dest) {
            self.fs.read(&dest).ok().map(|content| content_hash(&content))
        } else {
            None
        };

        self.fs
            .copy(source, &dest)
            .or_install_error("copy", source, install_dir)?;
        self.fs
            .set_mode(&dest, UNIT_FILE_MODE)
            .or_install_error("set permissions", source, install_dir)?;

        let changed = old_hash.as_deref() != Some(new_hash.as_str());
        if changed {
            info!("installed {} ({})", dest.display(), short_hash(&new_hash));
        } else {
            debug!("install: {} unchanged", dest.display());
        }

        Ok(InstalledUnit {
            name,
            path: dest,
            changed,
        })
    }
}

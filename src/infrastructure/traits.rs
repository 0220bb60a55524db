//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Output;

use crate::config::DependencyMode;
use crate::domain::{Parameter, ServiceState};
use crate::infrastructure::InfraResult;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents as bytes.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file from source to destination, overwriting it.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Set unix permission bits.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;

    /// Replace `path` with `content` so readers see either the old or the new
    /// file, never a partial one. The new file has `mode` before it becomes
    /// visible under `path`.
    fn write_atomic(&self, path: &Path, content: &str, mode: u32) -> io::Result<()>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments, blocking until it exits.
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

/// Remote key/value secret store.
pub trait ParameterStore: Send + Sync {
    /// Fetch every parameter directly under `path` (not recursive), decrypted.
    fn get_parameters_by_path(&self, path: &str, region: &str) -> InfraResult<Vec<Parameter>>;

    /// Fetch a single parameter by its full name, decrypted.
    fn get_parameter(&self, name: &str, region: &str) -> InfraResult<Parameter>;
}

/// Status of a unit as reported by the service manager's status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    pub state: ServiceState,
    /// Exit code of the status query itself
    pub exit_code: Option<i32>,
    /// One-line human summary, e.g. `active (running) since ...`
    pub summary: String,
}

/// Service manager lifecycle operations.
///
/// `status` and `is_active` have no side effects.
pub trait ServiceManager: Send + Sync {
    /// Re-read unit definitions from disk.
    fn reload(&self) -> InfraResult<()>;

    fn enable(&self, unit: &str) -> InfraResult<()>;

    fn restart(&self, unit: &str) -> InfraResult<()>;

    fn status(&self, unit: &str) -> InfraResult<UnitStatus>;

    fn is_active(&self, unit: &str) -> InfraResult<ServiceState>;
}

/// Installs the runtime dependencies of the application code.
pub trait DependencyInstaller: Send + Sync {
    fn install(&self, app_dir: &Path, mode: DependencyMode) -> InfraResult<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn write_atomic(&self, path: &Path, content: &str, mode: u32) -> io::Result<()> {
        use std::io::Write;

        // Temp file in the target directory so the rename stays on one filesystem
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".drones-deploy-")
            .tempfile_in(dir)?;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        std::process::Command::new(cmd).args(args).output()
    }
}

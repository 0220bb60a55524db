//! Error conversion helpers for common I/O operations
//!
//! Maps `io::Result` onto the application error that names the failing target.
//!
//! ```ignore
//! fs.copy(&src, &dest).or_install_error("copy", &src, &dir)?;
//! ```

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult`.
pub trait IoResultExt<T> {
    /// Map an I/O error onto a `Write` failure for the env file at `path`.
    fn or_write_error(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Map an I/O error onto an `Install` failure for `file` into `dir`.
    fn or_install_error(self, action: &str, file: &Path, dir: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn or_write_error(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Write {
            path: path.to_path_buf(),
            message: format!("{action}: {e}"),
            source: e,
        })
    }

    fn or_install_error(self, action: &str, file: &Path, dir: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::Install {
            file: file.to_path_buf(),
            dir: dir.to_path_buf(),
            message: format!("{action}: {e}"),
        })
    }
}

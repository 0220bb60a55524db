//! Tests for RealFileSystem

use std::fs;
use std::os::unix::fs::PermissionsExt;

use tempfile::TempDir;

use drones_deploy::infrastructure::traits::{FileSystem, RealFileSystem};

// ============================================================
// write_atomic tests
// ============================================================

#[test]
fn given_new_file_when_write_atomic_then_has_content_and_mode() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.env");
    let fs = RealFileSystem;

    // Act
    fs.write_atomic(&path, "A=1\n", 0o600).unwrap();

    // Assert
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "A=1\n");
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn given_existing_file_when_write_atomic_then_replaces_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.env");
    fs::write(&path, "OLD=1\nLONGER=content\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    RealFileSystem.write_atomic(&path, "NEW=2\n", 0o600).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "NEW=2\n");
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn given_missing_parent_when_write_atomic_then_errors_without_creating_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("missing").join("app.env");

    let result = RealFileSystem.write_atomic(&path, "A=1\n", 0o600);

    assert!(result.is_err());
    assert!(!path.exists());
}

// ============================================================
// copy / set_mode / ensure_parent tests
// ============================================================

#[test]
fn given_unit_file_when_copy_and_set_mode_then_destination_matches() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("drones.service");
    let dst = temp.path().join("installed.service");
    fs::write(&src, "[Unit]\n").unwrap();
    let fs_impl = RealFileSystem;

    fs_impl.copy(&src, &dst).unwrap();
    fs_impl.set_mode(&dst, 0o644).unwrap();

    assert_eq!(fs_impl.read(&dst).unwrap(), b"[Unit]\n");
    let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
    assert!(fs_impl.is_file(&src));
}

#[test]
fn given_nested_path_when_ensure_parent_then_creates_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a/b/c/app.env");

    RealFileSystem.ensure_parent(&path).unwrap();

    assert!(RealFileSystem.is_dir(&temp.path().join("a/b/c")));
    assert!(!path.exists());
}

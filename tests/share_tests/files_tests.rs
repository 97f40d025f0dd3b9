//! Tests for shared directory access
//!
//! These tests verify:
//! - Listing only regular files, never subdirectories
//! - Empty listings for missing or non-directory paths
//! - Filename validation and path escape rejection
//! - Staged writes replacing existing files

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use fileshare::share::{list_files, open_file, resolve, validate_filename, write_file};
use fileshare::ShareError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn as_set(names: Vec<String>) -> HashSet<String> {
    names.into_iter().collect()
}

fn set_of(names: &[&str]) -> HashSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_list_regular_files_only() {
    let (_temp, dir) = setup_temp_dir();
    fs::write(dir.join("a.txt"), b"a").unwrap();
    fs::write(dir.join("b.csv"), b"b").unwrap();
    fs::create_dir(dir.join("subdir")).unwrap();
    fs::write(dir.join("subdir").join("nested.txt"), b"n").unwrap();

    assert_eq!(as_set(list_files(&dir)), set_of(&["a.txt", "b.csv"]));
}

#[test]
fn test_list_empty_directory() {
    let (_temp, dir) = setup_temp_dir();
    assert!(list_files(&dir).is_empty());
}

#[test]
fn test_list_missing_directory() {
    let (_temp, dir) = setup_temp_dir();
    assert!(list_files(dir.join("does-not-exist")).is_empty());
}

#[test]
fn test_list_path_is_a_file() {
    let (_temp, dir) = setup_temp_dir();
    let file = dir.join("plain.txt");
    fs::write(&file, b"x").unwrap();

    assert!(list_files(&file).is_empty());
}

#[test]
fn test_list_only_subdirectories() {
    let (_temp, dir) = setup_temp_dir();
    fs::create_dir(dir.join("one")).unwrap();
    fs::create_dir(dir.join("two")).unwrap();

    assert!(list_files(&dir).is_empty());
}

#[test]
fn test_list_many_files() {
    let (_temp, dir) = setup_temp_dir();
    let expected: HashSet<String> = (0..50).map(|i| format!("file_{:02}.dat", i)).collect();
    for name in &expected {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    assert_eq!(as_set(list_files(&dir)), expected);
}

// =============================================================================
// Filename Validation Tests
// =============================================================================

#[test]
fn test_validate_accepts_plain_names() {
    for name in ["a.txt", "no_extension", ".hidden", "spaces in name.md", "ünïcödé"] {
        assert!(validate_filename(name).is_ok(), "{} should be valid", name);
    }
}

#[test]
fn test_validate_rejects_escapes() {
    for name in ["", ".", "..", "../secret", "a/b", "/etc/passwd", "..\\up", "nul\0byte"] {
        let result = validate_filename(name);
        assert!(
            matches!(result, Err(ShareError::PathEscape(_))),
            "{:?} should be rejected",
            name
        );
    }
}

#[test]
fn test_resolve_joins_directory() {
    let (_temp, dir) = setup_temp_dir();
    assert_eq!(resolve(&dir, "a.txt").unwrap(), dir.join("a.txt"));
}

#[cfg(unix)]
#[test]
fn test_resolve_rejects_symlink_outside() {
    let (_temp, dir) = setup_temp_dir();
    let (_outside_temp, outside) = setup_temp_dir();
    fs::write(outside.join("secret.txt"), b"secret").unwrap();
    std::os::unix::fs::symlink(outside.join("secret.txt"), dir.join("link.txt")).unwrap();

    let result = resolve(&dir, "link.txt");
    assert!(matches!(result, Err(ShareError::PathEscape(_))));
}

#[cfg(unix)]
#[test]
fn test_resolve_allows_symlink_inside() {
    let (_temp, dir) = setup_temp_dir();
    fs::write(dir.join("real.txt"), b"real").unwrap();
    std::os::unix::fs::symlink(dir.join("real.txt"), dir.join("alias.txt")).unwrap();

    assert!(resolve(&dir, "alias.txt").is_ok());
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_write_then_open() {
    let (_temp, dir) = setup_temp_dir();
    let content = vec![0x00, 0xFF, 0x0A, 0x0D];

    write_file(&dir, "c.bin", &mut content.as_slice(), content.len() as u64).unwrap();

    let (_file, len) = open_file(&dir, "c.bin").unwrap();
    assert_eq!(len, 4);
    assert_eq!(fs::read(dir.join("c.bin")).unwrap(), content);
}

#[test]
fn test_write_overwrites_existing() {
    let (_temp, dir) = setup_temp_dir();
    fs::write(dir.join("notes.txt"), b"first version, longer").unwrap();

    let second = b"second".to_vec();
    write_file(&dir, "notes.txt", &mut second.as_slice(), second.len() as u64).unwrap();

    assert_eq!(fs::read(dir.join("notes.txt")).unwrap(), second);
}

#[test]
fn test_write_short_input_leaves_no_trace() {
    let (_temp, dir) = setup_temp_dir();
    fs::write(dir.join("keep.txt"), b"original").unwrap();

    let short = b"abc".to_vec();
    let result = write_file(&dir, "keep.txt", &mut short.as_slice(), 10);

    assert!(matches!(result, Err(ShareError::MalformedCommand(_))));
    assert_eq!(fs::read(dir.join("keep.txt")).unwrap(), b"original");
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
}

#[test]
fn test_write_rejects_escape_without_touching_disk() {
    let (_temp, root) = setup_temp_dir();
    let shared = root.join("shared");
    fs::create_dir(&shared).unwrap();

    let data = b"evil".to_vec();
    let result = write_file(&shared, "../evil.txt", &mut data.as_slice(), 4);

    assert!(matches!(result, Err(ShareError::PathEscape(_))));
    assert!(!root.join("evil.txt").exists());
    assert_eq!(fs::read_dir(&shared).unwrap().count(), 0);
}

#[test]
fn test_open_missing_file() {
    let (_temp, dir) = setup_temp_dir();
    let result = open_file(&dir, "nonexistent.txt");
    assert!(matches!(result, Err(ShareError::NotFound(_))));
}

#[test]
fn test_open_directory_is_not_found() {
    let (_temp, dir) = setup_temp_dir();
    fs::create_dir(dir.join("folder")).unwrap();

    let result = open_file(&dir, "folder");
    assert!(matches!(result, Err(ShareError::NotFound(_))));
}

#[test]
fn test_open_escape_checked_before_existence() {
    let (_temp, dir) = setup_temp_dir();
    let result = open_file(&dir, "../nonexistent.txt");
    assert!(matches!(result, Err(ShareError::PathEscape(_))));
}

//! Shared directory file access
//!
//! Listing, filename resolution, and staged writes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, ShareError};

/// Prefix of in-progress upload files
const STAGING_PREFIX: &str = ".fileshare-";

/// Suffix of in-progress upload files
const STAGING_SUFFIX: &str = ".partial";

/// Distinguishes staging files created by concurrent writers in one process
static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// List the regular files directly inside `path`
///
/// Returns an empty list if `path` does not exist or is not a directory.
/// Subdirectories, names that are not valid UTF-8, and in-progress upload
/// staging files are skipped. Order is whatever the filesystem yields.
pub fn list_files(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    for entry in entries.flatten() {
        // fs::metadata follows symlinks, so a link to a regular file counts
        let is_file = fs::metadata(entry.path())
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) if is_staging_name(&name) => {}
            Ok(name) => names.push(name),
            Err(raw) => tracing::debug!("Skipping non UTF-8 filename {:?}", raw),
        }
    }

    names
}

/// Check that `filename` is exactly one normal path segment
pub fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(ShareError::PathEscape("empty filename".to_string()));
    }

    if filename.contains(['/', '\\', '\0']) {
        return Err(ShareError::PathEscape(filename.to_string()));
    }

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ShareError::PathEscape(filename.to_string())),
    }
}

/// Resolve `filename` against the shared directory `dir`
///
/// Fails with `PathEscape` if the name is not a single segment, or if it
/// names an existing symlink whose target lies outside `dir`.
pub fn resolve(dir: &Path, filename: &str) -> Result<PathBuf> {
    validate_filename(filename)?;

    let path = dir.join(filename);

    let is_symlink = fs::symlink_metadata(&path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);

    if is_symlink {
        // A dangling link cannot be read, and rename replaces the link itself
        if let Ok(target) = path.canonicalize() {
            let root = dir.canonicalize()?;
            if !target.starts_with(&root) {
                tracing::warn!(
                    "Symlink {} resolves outside shared directory to {}",
                    path.display(),
                    target.display()
                );
                return Err(ShareError::PathEscape(filename.to_string()));
            }
        }
    }

    Ok(path)
}

/// Open a regular file in the shared directory for reading
///
/// Returns the file and its length. Missing files and anything that is not
/// a regular file yield `NotFound`.
pub fn open_file(dir: &Path, filename: &str) -> Result<(File, u64)> {
    let path = resolve(dir, filename)?;

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ShareError::NotFound(filename.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(ShareError::NotFound(filename.to_string()));
    }

    Ok((file, metadata.len()))
}

/// Write exactly `len` bytes from `reader` to `dir/filename`
///
/// Data is staged in a hidden file in the same directory, synced, then
/// renamed over the target, so readers see either the old or the new
/// content. An existing file of the same name is replaced. If `reader`
/// ends early the frame was malformed: the staging file is removed and
/// the target is untouched.
pub fn write_file<R: Read>(dir: &Path, filename: &str, reader: &mut R, len: u64) -> Result<u64> {
    let target = resolve(dir, filename)?;
    let staging = dir.join(staging_name());

    if let Err(e) = stage(&staging, reader, len) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    tracing::debug!("Wrote {} bytes to {}", len, target.display());
    Ok(len)
}

/// Copy `len` bytes into a freshly created staging file and sync it
fn stage<R: Read>(staging: &Path, reader: &mut R, len: u64) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)?;

    let copied = io::copy(&mut reader.take(len), &mut file)?;
    if copied < len {
        return Err(ShareError::MalformedCommand(format!(
            "UPLOAD command: incomplete payload (expected {}, got {})",
            len, copied
        )));
    }

    file.sync_all()?;
    Ok(())
}

fn staging_name() -> String {
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}{}-{}{}", STAGING_PREFIX, process::id(), n, STAGING_SUFFIX)
}

fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX)
}

//! Shared location handle
//!
//! The configured directory, swappable at runtime. Readers take a snapshot
//! so a reconfiguration never changes the directory under an in-flight
//! handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::list_files;

/// Reconfigurable shared directory path
#[derive(Debug, Clone)]
pub struct SharedLocation {
    current: Arc<RwLock<Arc<PathBuf>>>,
}

impl SharedLocation {
    /// Create a location pointing at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(path.into()))),
        }
    }

    /// Take a snapshot of the current path
    pub fn snapshot(&self) -> Arc<PathBuf> {
        Arc::clone(&*self.current.read())
    }

    /// Point every clone of this handle at a new directory
    ///
    /// Handlers that already took a snapshot keep the old path.
    pub fn set(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!("Shared directory set to {}", path.display());
        *self.current.write() = Arc::new(path);
    }

    /// List the regular files in the current directory
    pub fn list_files(&self) -> Vec<String> {
        list_files(self.snapshot().as_path())
    }
}

impl From<&Path> for SharedLocation {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

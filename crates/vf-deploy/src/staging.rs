//! Per-session scratch directory.

use std::io;
use std::path::{Path, PathBuf};

use forcepack_vf_archive::clear_dir;
use tracing::debug;

use crate::error::Result;

/// Staging directory holding the rendered build file and, on retrieve,
/// the descriptor and the retrieved components.
///
/// Concurrent sessions must use distinct roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staging {
    root: PathBuf,
}

impl Default for Staging {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(format!("forcepack-{}", std::process::id())))
    }
}

impl Staging {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding the build file.
    pub fn ant_dir(&self) -> PathBuf {
        self.root.join("ant")
    }

    pub fn build_file(&self) -> PathBuf {
        self.ant_dir().join("build.xml")
    }

    /// Remove anything left from a previous run, then create the layout.
    pub fn reset(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(self.ant_dir())?;
        debug!(root = %self.root.display(), "Staging directory ready");
        Ok(())
    }

    /// Remove the staging directory. Failures are logged, not returned.
    pub fn clear(&self) {
        clear_dir(&self.root);
    }

    /// Remove only the build file folder, keeping anything retrieved
    /// into the staging root.
    pub fn clear_build_file(&self) {
        clear_dir(&self.ant_dir());
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }
}

//! Scoped ownership of temporary files created while processing an upload.

use std::io;
use std::path::{Path, PathBuf};

/// A temporary file that is removed exactly once: on `remove()` or on drop.
///
/// Removing a file that does not exist counts as success, so a stage that
/// never produced its output can still hand its artifact back for cleanup.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    removed: bool,
}

impl TempArtifact {
    /// Take ownership of `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    /// Create a uniquely named empty file in `dir` and own it.
    pub fn create_in(
        dir: &Path,
        prefix: &str,
        suffix: &str,
    ) -> io::Result<(Self, std::fs::File)> {
        let named = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?;
        let (file, path) = named.keep().map_err(|e| e.error)?;
        Ok((Self::new(path), file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now, reporting failures other than "already gone".
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_if_present(&self.path)
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temporary artifact"
            );
        }
    }
}

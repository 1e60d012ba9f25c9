//! Per-request working directory
//!
//! Every execution gets a fresh directory under the temp root. Source files
//! and compiler output live there and it is removed when the request ends.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, instrument};

use crate::process::ProcessError;

const PREFIX: &str = "codecell-";

/// A uniquely named scratch directory
///
/// Call [`cleanup()`](Self::cleanup) to observe removal errors. Dropping the
/// workspace also removes it, silently.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `root`, or the system temp dir when `None`
    #[instrument]
    pub fn create(root: Option<&Path>) -> Result<Self, ProcessError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(PREFIX);
            builder
        };

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(ProcessError::Workspace)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(ProcessError::Workspace)?;

        debug!(path = %dir.path().display(), "workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace
    ///
    /// Returns an error if the name would escape the workspace.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, ProcessError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(ProcessError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.dir.path().join(name))
    }

    /// Write a file into the workspace and return its path
    #[instrument(skip(self, content))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, ProcessError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content).await?;
        debug!(path = %path.display(), len = content.len(), "wrote file to workspace");
        Ok(path)
    }

    /// Remove the workspace and everything in it
    #[must_use = "cleanup errors should be handled"]
    pub fn cleanup(self) -> Result<(), ProcessError> {
        let path = self.dir.path().display().to_string();
        self.dir
            .close()
            .map_err(|source| ProcessError::CleanupFailed { path, source })
    }
}

use std::{
    io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create harness workspace: {source}")]
    Create {
        #[source]
        source: io::Error,
    },
}

/// Temporary home directory handed to the stack CLI as `STACK_HOME`, so a
/// run never touches the operator's real configuration. Deleted on drop,
/// kept on disk when the environment is preserved.
#[derive(Debug)]
pub struct HarnessWorkspace {
    root: TempDir,
}

impl HarnessWorkspace {
    pub fn create(run_name: &str) -> Result<Self, WorkspaceError> {
        let root = tempfile::Builder::new()
            .prefix(&format!("stack-harness-{run_name}-"))
            .tempdir()
            .map_err(|source| WorkspaceError::Create { source })?;
        info!(home = %root.path().display(), "harness workspace created");
        Ok(Self { root })
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        self.root.path()
    }

    /// Consume the workspace, leaving the directory on disk.
    #[must_use]
    pub fn keep(self) -> PathBuf {
        self.root.keep()
    }
}

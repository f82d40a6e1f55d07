//! Working directory ownership
//!
//! A [`Workdir`] is the exclusively-owned temporary subtree holding one
//! request's generated files. It exists for at most the lifetime of one
//! orchestrator invocation and is removed on every exit path: the
//! orchestrator calls [`Workdir::cleanup`] explicitly, and `Drop` covers
//! panics or early returns. Removal failures are logged at warn level and
//! never escalated.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Exclusively-owned temporary working directory for one creation request
#[derive(Debug)]
pub struct Workdir {
    root: PathBuf,
    project_dir: PathBuf,
    cleaned: bool,
}

impl Workdir {
    pub(crate) fn new(root: PathBuf, project_dir: PathBuf) -> Self {
        Self {
            root,
            project_dir,
            cleaned: false,
        }
    }

    /// Directory containing the generated project tree.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Root of the temporary subtree (parent of the project directory).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove the entire working directory.
    ///
    /// Removal failure is swallowed: it must never override the outcome of
    /// the pipeline steps that ran before cleanup.
    pub async fn cleanup(mut self) {
        self.cleaned = true;
        debug!(path = %self.root.display(), "removing working directory");
        if let Err(err) = tokio::fs::remove_dir_all(&self.root).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), %err, "failed to remove working directory");
            }
        }
    }
}

impl Drop for Workdir {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(err) = std::fs::remove_dir_all(&self.root) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), %err, "failed to remove working directory");
            }
        }
    }
}

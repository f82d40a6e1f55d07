//! Application state
//!
//! Wires the concrete pipeline collaborators together once at startup and
//! carries the immutable configuration plus the job-queue handle through
//! the axum router.

use crate::config::Config;
use crate::git::GitCli;
use crate::github::GitHubClient;
use crate::orchestrator::Orchestrator;
use crate::queue::{self, JobQueue};
use crate::reporter::{DxReporter, WorkflowReporter};
use crate::templates::CookiecutterMaterializer;
use std::sync::Arc;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable process-wide configuration
    pub config: Arc<Config>,
    /// Handle for submitting creation jobs
    pub queue: JobQueue,
}

impl AppState {
    /// Build the production wiring: cookiecutter materializer, GitHub API
    /// client, git CLI publisher, DX reporter, and the worker pool.
    ///
    /// Must be called within a tokio runtime (workers are spawned here).
    #[must_use]
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let materializer = Arc::new(CookiecutterMaterializer::new(&config.templates));
        let repo_host = Arc::new(GitHubClient::new(&config.github));
        let vcs = Arc::new(GitCli::new(&config.github));
        let orchestrator = Arc::new(Orchestrator::new(materializer, repo_host, vcs));
        let reporter: Arc<dyn WorkflowReporter> = Arc::new(DxReporter::new(&config.dx));

        let queue = queue::spawn_workers(
            config.queue.capacity,
            config.queue.workers,
            orchestrator,
            reporter,
        );

        Self { config, queue }
    }
}

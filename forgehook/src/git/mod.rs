//! Local version-control client
//!
//! Shells out to the `git` binary to initialize the generated project,
//! commit everything in one commit, and push it to the freshly created
//! remote with upstream tracking.
//!
//! The push URL embeds the access token; [`GitCli`] redacts it from any
//! error text before it can reach logs.

use crate::config::GitHubConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

/// Remote name registered for the push
pub const REMOTE_NAME: &str = "origin";

/// Branch the initial commit is pushed to
pub const DEFAULT_BRANCH: &str = "main";

/// Commit message for the generated tree
pub const COMMIT_MESSAGE: &str = "Initial commit from template";

/// Identity recorded on the generated commit
const COMMITTER_NAME: &str = "forgehook";
const COMMITTER_EMAIL: &str = "forgehook@localhost";

/// Local version-control operations over one working directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VcsPublisher: Send + Sync {
    /// Initialize a repository rooted at `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Vcs`] when the underlying command fails.
    async fn init(&self, project_dir: &Path) -> Result<(), PipelineError>;

    /// Stage all files, commit once, attach the authenticated remote, and
    /// push the target branch with upstream tracking.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Vcs`] with `owner/repo` context when any
    /// underlying command fails.
    async fn publish(
        &self,
        project_dir: &Path,
        owner: &str,
        repo: &str,
    ) -> Result<(), PipelineError>;
}

/// `git` CLI implementation
pub struct GitCli {
    token: Option<String>,
    exclude_workflows: bool,
}

impl GitCli {
    /// Build a client from GitHub configuration.
    #[must_use]
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            token: config.token.clone(),
            exclude_workflows: config.exclude_workflows,
        }
    }

    /// Strip the access token from text destined for errors or logs.
    fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) if !token.is_empty() => text.replace(token.as_str(), "***"),
            _ => text.to_string(),
        }
    }

    fn authenticated_remote_url(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<String, PipelineError> {
        let token = self.token.as_deref().filter(|t| !t.is_empty()).ok_or_else(|| {
            vcs_err("remote", format!("{owner}/{repo}"), "GitHub token not configured")
        })?;
        Ok(format!("https://{token}@github.com/{owner}/{repo}"))
    }

    async fn run_git(
        &self,
        dir: &Path,
        args: &[&str],
        context: &str,
    ) -> Result<(), PipelineError> {
        let subcommand = command_name(args);
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .await
            .map_err(|err| vcs_err(subcommand, context, format!("failed to run git: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(vcs_err(
                subcommand,
                context,
                self.redact(stderr.trim()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VcsPublisher for GitCli {
    async fn init(&self, project_dir: &Path) -> Result<(), PipelineError> {
        info!(path = %project_dir.display(), "initializing git repository");
        self.run_git(
            project_dir,
            &["init", "--initial-branch", DEFAULT_BRANCH],
            "init",
        )
        .await
    }

    async fn publish(
        &self,
        project_dir: &Path,
        owner: &str,
        repo: &str,
    ) -> Result<(), PipelineError> {
        let context = format!("{owner}/{repo}");

        if self.exclude_workflows {
            remove_workflow_files(project_dir).await;
        }

        info!(%context, "staging generated files");
        self.run_git(project_dir, &["add", "--all"], &context).await?;

        info!(%context, "creating initial commit");
        self.run_git(
            project_dir,
            &[
                "-c",
                &format!("user.name={COMMITTER_NAME}"),
                "-c",
                &format!("user.email={COMMITTER_EMAIL}"),
                "commit",
                "-m",
                COMMIT_MESSAGE,
            ],
            &context,
        )
        .await?;

        let remote_url = self.authenticated_remote_url(owner, repo)?;
        self.run_git(
            project_dir,
            &["remote", "add", REMOTE_NAME, &remote_url],
            &context,
        )
        .await?;

        info!(%context, branch = DEFAULT_BRANCH, "pushing to remote");
        self.run_git(
            project_dir,
            &["push", "--set-upstream", REMOTE_NAME, DEFAULT_BRANCH],
            &context,
        )
        .await?;

        info!(%context, "pushed all files to remote");
        Ok(())
    }
}

/// First non-flag argument, used as step context in errors.
fn command_name<'a>(args: &[&'a str]) -> &'a str {
    args.iter()
        .find(|arg| !arg.starts_with('-') && !arg.contains('='))
        .copied()
        .unwrap_or("git")
}

/// Remove `.github/workflows` (and a then-empty `.github`) before staging.
///
/// Needed when the push token lacks the `workflow` scope; GitHub rejects
/// pushes that add workflow definitions with such tokens.
async fn remove_workflow_files(project_dir: &Path) {
    let workflows = project_dir.join(".github").join("workflows");
    if !workflows.exists() {
        return;
    }

    warn!(path = %workflows.display(), "removing workflow definitions before commit");
    if let Err(err) = tokio::fs::remove_dir_all(&workflows).await {
        warn!(%err, "failed to remove workflow directory");
        return;
    }

    let github_dir = project_dir.join(".github");
    let empty = match std::fs::read_dir(&github_dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    };
    if empty {
        let _ = tokio::fs::remove_dir(&github_dir).await;
    }
}

fn vcs_err(
    command: impl Into<String>,
    context: impl Into<String>,
    message: impl Into<String>,
) -> PipelineError {
    PipelineError::Vcs {
        command: command.into(),
        context: context.into(),
        message: message.into(),
    }
}

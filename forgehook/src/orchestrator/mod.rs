//! Create-and-publish orchestration pipeline
//!
//! The core of the service: a strictly ordered sequence of side-effecting
//! steps with all-or-nothing semantics.
//!
//! 1. Materialize the template into a fresh unique working directory
//! 2. Create the remote repository (hard failure if it already exists)
//! 3. Initialize a local git repository in the working directory
//! 4. Commit everything and push with upstream tracking
//!
//! Any step failure short-circuits the remainder, is logged with the
//! originating step's context, and reduces to [`Outcome::Failure`]. The
//! working directory is removed unconditionally after the steps; cleanup
//! failure never overrides the step outcome. No retries, no state retained
//! after return.
//!
//! [`run_creation_job`] wraps one pipeline run with the status-reporting
//! protocol back to the originating workflow run.

use crate::error::PipelineError;
use crate::git::VcsPublisher;
use crate::github::RepoHost;
use crate::reporter::{RunStatus, WorkflowReporter};
use crate::templates::{Materializer, TemplateKind, Workdir};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Binary result of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All four steps completed
    Success,
    /// Some step failed; the cause was logged and reported
    Failure,
}

/// One validated creation request, consumed exactly once by a worker
#[derive(Debug)]
pub struct CreationRequest {
    /// Caller-supplied correlation handle for status reporting
    pub workflow_run_id: String,
    /// Template family
    pub template: TemplateKind,
    /// Target GitHub organization or username
    pub owner: String,
    /// Target repository name
    pub repo: String,
    /// Resolved cookiecutter source locator
    pub source_url: String,
    /// Render context forwarded verbatim to the template engine
    pub parameters: BTreeMap<String, String>,
    /// Repository description
    pub description: String,
}

/// Runs the four-step creation pipeline over its three collaborators
pub struct Orchestrator {
    materializer: Arc<dyn Materializer>,
    repo_host: Arc<dyn RepoHost>,
    vcs: Arc<dyn VcsPublisher>,
}

impl Orchestrator {
    /// Wire an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        materializer: Arc<dyn Materializer>,
        repo_host: Arc<dyn RepoHost>,
        vcs: Arc<dyn VcsPublisher>,
    ) -> Self {
        Self {
            materializer,
            repo_host,
            vcs,
        }
    }

    /// Run the pipeline for one request and reduce it to an [`Outcome`].
    pub async fn create(
        &self,
        owner: &str,
        repo: &str,
        source_url: &str,
        parameters: &BTreeMap<String, String>,
        description: &str,
    ) -> Outcome {
        info!(owner, repo, "starting service creation");

        // Step 1: materialize. If this fails there is nothing to clean up.
        let workdir = match self.materializer.materialize(source_url, parameters).await {
            Ok(workdir) => workdir,
            Err(err) => {
                error!(owner, repo, step = err.step(), %err, "service creation failed");
                return Outcome::Failure;
            }
        };

        // Steps 2-4, then unconditional cleanup regardless of their result.
        let result = self.publish(&workdir, owner, repo, description).await;
        workdir.cleanup().await;

        match result {
            Ok(()) => {
                info!(owner, repo, "service created successfully");
                Outcome::Success
            }
            Err(err) => {
                error!(owner, repo, step = err.step(), %err, "service creation failed");
                Outcome::Failure
            }
        }
    }

    async fn publish(
        &self,
        workdir: &Workdir,
        owner: &str,
        repo: &str,
        description: &str,
    ) -> Result<(), PipelineError> {
        // The remote must start empty so the push is the sole source of
        // initial content; an existing repository is a hard failure.
        if self.repo_host.repo_exists(owner, repo).await? {
            return Err(PipelineError::RemoteRepo {
                owner: owner.to_string(),
                repo: repo.to_string(),
                message: "repository already exists".to_string(),
            });
        }
        self.repo_host
            .create_repo(owner, repo, true, description)
            .await?;

        self.vcs.init(workdir.project_dir()).await?;
        self.vcs.publish(workdir.project_dir(), owner, repo).await?;
        Ok(())
    }
}

/// Run one creation job end to end, including the status protocol.
///
/// Reporter deliveries are best-effort and never affect the outcome.
pub async fn run_creation_job(
    orchestrator: &Orchestrator,
    reporter: &dyn WorkflowReporter,
    request: CreationRequest,
) {
    let run_id = &request.workflow_run_id;
    info!(run_id, owner = %request.owner, repo = %request.repo, "processing service creation");

    reporter
        .post_message(
            run_id,
            &format!(
                "🚀 Starting creation of **{}** service in `{}/{}`",
                request.template.name(),
                request.owner,
                request.repo
            ),
        )
        .await;

    if request.template == TemplateKind::Custom {
        reporter
            .post_message(
                run_id,
                &format!("📦 Using custom template: `{}`", request.source_url),
            )
            .await;
    }

    reporter
        .post_message(run_id, "⚙️ Generating project from cookiecutter template...")
        .await;

    let outcome = orchestrator
        .create(
            &request.owner,
            &request.repo,
            &request.source_url,
            &request.parameters,
            &request.description,
        )
        .await;

    match outcome {
        Outcome::Success => {
            let repository_url =
                format!("https://github.com/{}/{}", request.owner, request.repo);
            reporter
                .add_link(
                    run_id,
                    &repository_url,
                    &format!("Repository: {}/{}", request.owner, request.repo),
                    Some("github"),
                )
                .await;
            reporter
                .post_message(
                    run_id,
                    "✅ Successfully created repository and pushed initial code!",
                )
                .await;
            reporter.change_status(run_id, RunStatus::Succeeded).await;
        }
        Outcome::Failure => {
            reporter.post_message(run_id, "❌ Failed to create service").await;
            reporter.change_status(run_id, RunStatus::Failed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockVcsPublisher;
    use crate::github::MockRepoHost;
    use crate::reporter::{Delivery, MockWorkflowReporter};
    use crate::templates::MockMaterializer;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use std::path::PathBuf;

    /// Workdir over a real temp directory so cleanup is observable.
    fn test_workdir() -> (Workdir, PathBuf) {
        let base = tempfile::tempdir().expect("tempdir").keep();
        let project = base.join("generated");
        std::fs::create_dir_all(&project).expect("create project dir");
        (Workdir::new(base.clone(), project), base)
    }

    fn materializer_returning_workdir() -> (MockMaterializer, PathBuf) {
        let (workdir, root) = test_workdir();
        let mut materializer = MockMaterializer::new();
        materializer
            .expect_materialize()
            .times(1)
            .return_once(move |_, _| Ok(workdir));
        (materializer, root)
    }

    fn failing_materializer() -> MockMaterializer {
        let mut materializer = MockMaterializer::new();
        materializer
            .expect_materialize()
            .times(1)
            .returning(|_, _| Err(PipelineError::TemplateRender("fetch failed".into())));
        materializer
    }

    #[tokio::test]
    async fn test_successful_pipeline_removes_workdir() {
        let (materializer, root) = materializer_returning_workdir();

        let mut repo_host = MockRepoHost::new();
        repo_host
            .expect_repo_exists()
            .with(eq("acme"), eq("svc-go"))
            .times(1)
            .returning(|_, _| Ok(false));
        repo_host
            .expect_create_repo()
            .with(eq("acme"), eq("svc-go"), eq(true), eq("a Go service"))
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(1).returning(|_| Ok(()));
        vcs.expect_publish()
            .with(mockall::predicate::always(), eq("acme"), eq("svc-go"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let orchestrator = Orchestrator::new(
            Arc::new(materializer),
            Arc::new(repo_host),
            Arc::new(vcs),
        );

        let outcome = orchestrator
            .create("acme", "svc-go", "https://tpl", &BTreeMap::new(), "a Go service")
            .await;

        assert_eq!(outcome, Outcome::Success);
        assert!(!root.exists(), "working directory must be removed");
    }

    #[tokio::test]
    async fn test_materialize_failure_short_circuits() {
        let materializer = failing_materializer();

        let mut repo_host = MockRepoHost::new();
        repo_host.expect_repo_exists().times(0);
        repo_host.expect_create_repo().times(0);
        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(0);
        vcs.expect_publish().times(0);

        let orchestrator = Orchestrator::new(
            Arc::new(materializer),
            Arc::new(repo_host),
            Arc::new(vcs),
        );

        let outcome = orchestrator
            .create("acme", "svc-go", "https://tpl", &BTreeMap::new(), "")
            .await;
        assert_eq!(outcome, Outcome::Failure);
    }

    #[tokio::test]
    async fn test_existing_remote_is_hard_failure() {
        let (materializer, root) = materializer_returning_workdir();

        let mut repo_host = MockRepoHost::new();
        repo_host
            .expect_repo_exists()
            .times(1)
            .returning(|_, _| Ok(true));
        repo_host.expect_create_repo().times(0);

        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(0);
        vcs.expect_publish().times(0);

        let orchestrator = Orchestrator::new(
            Arc::new(materializer),
            Arc::new(repo_host),
            Arc::new(vcs),
        );

        let outcome = orchestrator
            .create("acme", "svc-go", "https://tpl", &BTreeMap::new(), "")
            .await;

        assert_eq!(outcome, Outcome::Failure);
        assert!(!root.exists(), "working directory must be removed on failure");
    }

    #[tokio::test]
    async fn test_remote_creation_failure_skips_push() {
        let (materializer, root) = materializer_returning_workdir();

        let mut repo_host = MockRepoHost::new();
        repo_host
            .expect_repo_exists()
            .times(1)
            .returning(|_, _| Ok(false));
        repo_host
            .expect_create_repo()
            .times(1)
            .returning(|owner, repo, _, _| {
                Err(PipelineError::RemoteRepo {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    message: "name already exists on this account".to_string(),
                })
            });

        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(0);
        vcs.expect_publish().times(0);

        let orchestrator = Orchestrator::new(
            Arc::new(materializer),
            Arc::new(repo_host),
            Arc::new(vcs),
        );

        let outcome = orchestrator
            .create("acme", "svc-go", "https://tpl", &BTreeMap::new(), "")
            .await;

        assert_eq!(outcome, Outcome::Failure);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_push_failure_still_cleans_up() {
        let (materializer, root) = materializer_returning_workdir();

        let mut repo_host = MockRepoHost::new();
        repo_host
            .expect_repo_exists()
            .times(1)
            .returning(|_, _| Ok(false));
        repo_host
            .expect_create_repo()
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(1).returning(|_| Ok(()));
        vcs.expect_publish().times(1).returning(|_, _, _| {
            Err(PipelineError::Vcs {
                command: "push".into(),
                context: "acme/svc-go".into(),
                message: "remote rejected".into(),
            })
        });

        let orchestrator = Orchestrator::new(
            Arc::new(materializer),
            Arc::new(repo_host),
            Arc::new(vcs),
        );

        let outcome = orchestrator
            .create("acme", "svc-go", "https://tpl", &BTreeMap::new(), "")
            .await;

        assert_eq!(outcome, Outcome::Failure);
        assert!(!root.exists());
    }

    fn successful_orchestrator() -> Orchestrator {
        let (materializer, _root) = materializer_returning_workdir();
        let mut repo_host = MockRepoHost::new();
        repo_host
            .expect_repo_exists()
            .times(1)
            .returning(|_, _| Ok(false));
        repo_host
            .expect_create_repo()
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(1).returning(|_| Ok(()));
        vcs.expect_publish().times(1).returning(|_, _, _| Ok(()));
        Orchestrator::new(Arc::new(materializer), Arc::new(repo_host), Arc::new(vcs))
    }

    fn failing_orchestrator() -> Orchestrator {
        let materializer = failing_materializer();
        let mut repo_host = MockRepoHost::new();
        repo_host.expect_repo_exists().times(0);
        repo_host.expect_create_repo().times(0);
        let mut vcs = MockVcsPublisher::new();
        vcs.expect_init().times(0);
        vcs.expect_publish().times(0);
        Orchestrator::new(Arc::new(materializer), Arc::new(repo_host), Arc::new(vcs))
    }

    fn go_request() -> CreationRequest {
        CreationRequest {
            workflow_run_id: "run-42".to_string(),
            template: TemplateKind::Go,
            owner: "acme".to_string(),
            repo: "svc-go".to_string(),
            source_url: "https://github.com/lacion/cookiecutter-golang".to_string(),
            parameters: BTreeMap::new(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_job_reports_success_protocol_in_order() {
        let orchestrator = successful_orchestrator();
        let mut reporter = MockWorkflowReporter::new();
        let mut seq = Sequence::new();

        reporter
            .expect_post_message()
            .withf(|run_id, message| run_id == "run-42" && message.contains("Starting creation"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Delivery::Sent);
        reporter
            .expect_post_message()
            .withf(|_, message| message.contains("Generating project"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Delivery::Sent);
        reporter
            .expect_add_link()
            .withf(|run_id, url, label, icon| {
                run_id == "run-42"
                    && url == "https://github.com/acme/svc-go"
                    && label.contains("acme/svc-go")
                    && *icon == Some("github")
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Delivery::Sent);
        reporter
            .expect_post_message()
            .withf(|_, message| message.contains("Successfully created"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Delivery::Sent);
        reporter
            .expect_change_status()
            .with(eq("run-42"), eq(RunStatus::Succeeded))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Delivery::Sent);

        run_creation_job(&orchestrator, &reporter, go_request()).await;
    }

    #[tokio::test]
    async fn test_job_reports_failure_status() {
        let orchestrator = failing_orchestrator();
        let mut reporter = MockWorkflowReporter::new();

        reporter
            .expect_post_message()
            .times(3)
            .returning(|_, _| Delivery::Sent);
        reporter.expect_add_link().times(0);
        reporter
            .expect_change_status()
            .with(eq("run-42"), eq(RunStatus::Failed))
            .times(1)
            .returning(|_, _| Delivery::Sent);

        run_creation_job(&orchestrator, &reporter, go_request()).await;
    }

    #[tokio::test]
    async fn test_job_mentions_custom_template_url() {
        let orchestrator = failing_orchestrator();
        let mut reporter = MockWorkflowReporter::new();

        reporter
            .expect_post_message()
            .withf(|_, message| message.contains("custom template"))
            .times(1)
            .returning(|_, _| Delivery::Sent);
        reporter
            .expect_post_message()
            .withf(|_, message| !message.contains("custom template"))
            .times(3)
            .returning(|_, _| Delivery::Sent);
        reporter
            .expect_change_status()
            .times(1)
            .returning(|_, _| Delivery::Sent);

        let request = CreationRequest {
            template: TemplateKind::Custom,
            source_url: "https://example.com/my-template".to_string(),
            ..go_request()
        };
        run_creation_job(&orchestrator, &reporter, request).await;
    }

    #[tokio::test]
    async fn test_undelivered_reports_do_not_change_outcome() {
        // Reporting transport is down everywhere; the pipeline still succeeds
        // and the final status call is still attempted.
        let orchestrator = successful_orchestrator();
        let mut reporter = MockWorkflowReporter::new();

        reporter
            .expect_post_message()
            .returning(|_, _| Delivery::NotSent);
        reporter
            .expect_add_link()
            .returning(|_, _, _, _| Delivery::NotSent);
        reporter
            .expect_change_status()
            .with(eq("run-42"), eq(RunStatus::Succeeded))
            .times(1)
            .returning(|_, _| Delivery::NotSent);

        run_creation_job(&orchestrator, &reporter, go_request()).await;
    }
}

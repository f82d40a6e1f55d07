//! GitHub remote repository client
//!
//! Thin wrapper over the GitHub REST API covering exactly what the pipeline
//! needs: create a repository (under the authenticated account or an
//! organization) and check whether one exists.
//!
//! The create call never auto-initializes the repository: it must start
//! empty so the subsequent push is the sole source of initial content.

use crate::config::GitHubConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

/// Remote repository host operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Create `owner/name`, non-auto-initialized.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RemoteRepo`] on any API failure, including
    /// the name already being taken.
    async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        private: bool,
        description: &str,
    ) -> Result<(), PipelineError>;

    /// Check whether `owner/name` exists.
    ///
    /// A not-found condition is `Ok(false)`, never an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RemoteRepo`] for transport or auth failures.
    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

/// GitHub REST API client
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Build a client from configuration.
    ///
    /// A missing token is not a startup error: API calls fail with a
    /// [`PipelineError::RemoteRepo`] at pipeline time instead.
    #[must_use]
    pub fn new(config: &GitHubConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn token(&self, owner: &str, repo: &str) -> Result<&str, PipelineError> {
        self.token
            .as_deref()
            .ok_or_else(|| remote_err(owner, repo, "GitHub token not configured"))
    }

    fn request(&self, method: reqwest::Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_url))
            .bearer_auth(token)
            .header("User-Agent", crate::SERVICE_NAME)
            .header("Accept", "application/vnd.github+json")
    }

    /// Login of the identity the token authenticates as.
    async fn authenticated_login(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<String, PipelineError> {
        let token = self.token(owner, repo)?;
        let response = self
            .request(reqwest::Method::GET, "/user", token)
            .send()
            .await
            .map_err(|err| remote_err(owner, repo, format!("user lookup failed: {err}")))?;

        if !response.status().is_success() {
            return Err(remote_err(
                owner,
                repo,
                format!("user lookup failed: HTTP {}", response.status()),
            ));
        }

        let user: AuthenticatedUser = response
            .json()
            .await
            .map_err(|err| remote_err(owner, repo, format!("user lookup failed: {err}")))?;
        Ok(user.login)
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn create_repo(
        &self,
        owner: &str,
        name: &str,
        private: bool,
        description: &str,
    ) -> Result<(), PipelineError> {
        let token = self.token(owner, name)?.to_string();
        let login = self.authenticated_login(owner, name).await?;

        // Owner may be the authenticated account itself or a distinct org;
        // GitHub uses different endpoints for the two cases.
        let path = if login == owner {
            "/user/repos".to_string()
        } else {
            format!("/orgs/{owner}/repos")
        };

        info!(owner, name, "creating remote repository");
        let response = self
            .request(reqwest::Method::POST, &path, &token)
            .json(&json!({
                "name": name,
                "private": private,
                "description": description,
                "auto_init": false,
            }))
            .send()
            .await
            .map_err(|err| remote_err(owner, name, format!("create failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(remote_err(
                owner,
                name,
                format!("create failed: HTTP {status}: {}", body.trim()),
            ));
        }

        info!(owner, name, "remote repository created");
        Ok(())
    }

    async fn repo_exists(&self, owner: &str, name: &str) -> Result<bool, PipelineError> {
        let token = self.token(owner, name)?;
        let response = self
            .request(reqwest::Method::GET, &format!("/repos/{owner}/{name}"), token)
            .send()
            .await
            .map_err(|err| remote_err(owner, name, format!("existence check failed: {err}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(owner, name, "repository does not exist");
            return Ok(false);
        }
        if response.status().is_success() {
            return Ok(true);
        }
        Err(remote_err(
            owner,
            name,
            format!("existence check failed: HTTP {}", response.status()),
        ))
    }
}

fn remote_err(owner: &str, repo: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::RemoteRepo {
        owner: owner.to_string(),
        repo: repo.to_string(),
        message: message.into(),
    }
}

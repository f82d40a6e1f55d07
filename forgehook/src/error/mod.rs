//! Error types and error handling
//!
//! Two failure domains with deliberately different propagation rules:
//!
//! - [`ApiError`]: synchronous request failures, rendered as JSON HTTP
//!   responses (400 validation, 401 signature, 503 overload, 500 internal).
//! - [`PipelineError`]: failures inside the background creation pipeline.
//!   These never reach the HTTP cycle; the orchestrator reduces them to a
//!   binary outcome and they surface to the caller only through the
//!   workflow-status API.
//!
//! Status-report failures have no type here at all: the reporter swallows
//! them by contract.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Synchronous request-handling error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or incomplete inbound request (400)
    #[error("validation error: {0}")]
    Validation(String),

    /// Webhook signature missing or mismatched (401)
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// Creation queue is full (503)
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Unexpected handler error (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Signature(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Failure of one pipeline step
///
/// Every variant carries enough context to log the originating step; the
/// orchestrator converts any of these into a `Failure` outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Template rendering failed (network fetch, bad parameter, hook script)
    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    /// Remote repository creation or lookup failed
    #[error("remote repository operation failed for {owner}/{repo}: {message}")]
    RemoteRepo {
        /// Target organization or user
        owner: String,
        /// Target repository name
        repo: String,
        /// Underlying cause
        message: String,
    },

    /// Local git command failed
    #[error("git {command} failed ({context}): {message}")]
    Vcs {
        /// Failing git subcommand
        command: String,
        /// Remote/branch context, e.g. `acme/svc-go`
        context: String,
        /// Underlying cause (credential-redacted)
        message: String,
    },
}

impl PipelineError {
    /// Short name of the originating step, for log fields.
    #[must_use]
    pub const fn step(&self) -> &'static str {
        match self {
            Self::TemplateRender(_) => "template",
            Self::RemoteRepo { .. } => "remote-repo",
            Self::Vcs { .. } => "vcs",
        }
    }
}

//! HTTP surface
//!
//! Three routes: the service-creation webhook, a health check, and root
//! metadata. The webhook handler validates the request synchronously
//! (signature over raw bytes first, then schema, then template dispatch),
//! enqueues the pipeline as a background job, and acknowledges with
//! `PENDING` before any pipeline step executes.

pub mod signature;

use crate::error::ApiError;
use crate::orchestrator::CreationRequest;
use crate::queue::EnqueueError;
use crate::state::AppState;
use crate::templates::TemplateKind;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Signature header set by the workflow platform
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Inbound service-creation request from the DX self-service platform
#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    /// Workflow run handle, forwarded on every status call
    pub dx_workflow_run_id: String,
    /// Template type (django, go, cpp, python, custom)
    pub template_type: String,
    /// Target GitHub organization or username
    pub github_organization: String,
    /// Target repository name
    pub github_repository: String,

    /// Template parameter: project name
    #[serde(default)]
    pub project_name: Option<String>,
    /// Template parameter and repository description
    #[serde(default)]
    pub description: Option<String>,
    /// Template parameter: application name (Go templates)
    #[serde(default)]
    pub app_name: Option<String>,
    /// Template parameter and fallback repository description
    #[serde(default)]
    pub project_short_description: Option<String>,
    /// Template parameter: project slug (Python packages)
    #[serde(default)]
    pub project_slug: Option<String>,
    /// Template parameter: author name
    #[serde(default)]
    pub author_name: Option<String>,
    /// Template parameter: full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// Template parameter: email address
    #[serde(default)]
    pub email: Option<String>,

    /// Template source for `custom` requests
    #[serde(default)]
    pub cookiecutter_url: Option<String>,

    /// DX entity identifier (unused; accepted for schema compatibility)
    #[serde(default)]
    pub entity_identifier: Option<String>,
    /// DX entity name (unused; accepted for schema compatibility)
    #[serde(default)]
    pub entity_name: Option<String>,
}

impl WorkflowRequest {
    /// Fold the optional scalar fields into the cookiecutter render context.
    ///
    /// Absent fields are omitted; the template ignores keys it does not
    /// recognize.
    #[must_use]
    pub fn parameters(&self) -> BTreeMap<String, String> {
        let fields = [
            ("project_name", &self.project_name),
            ("description", &self.description),
            ("app_name", &self.app_name),
            ("project_short_description", &self.project_short_description),
            ("project_slug", &self.project_slug),
            ("author_name", &self.author_name),
            ("full_name", &self.full_name),
            ("email", &self.email),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| {
                value.as_ref().map(|v| (key.to_string(), v.clone()))
            })
            .collect()
    }

    /// Repository description: `description`, falling back to
    /// `project_short_description`.
    #[must_use]
    pub fn repo_description(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.project_short_description.clone())
            .unwrap_or_default()
    }
}

/// Synchronous acknowledgment returned to the workflow platform
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    /// Always `PENDING` on acceptance
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Correlation handle (echoes the workflow run id)
    pub execution_id: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/service", post(create_service))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": crate::SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "webhook_endpoint": "/api/service",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": crate::SERVICE_NAME,
    }))
}

/// Webhook endpoint handling service-creation requests.
///
/// Signature verification runs over the raw bytes before the body is
/// interpreted; validation failures are synchronous client errors and
/// schedule no background work.
async fn create_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let provided_signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    signature::verify(
        state.config.webhook.secret.as_deref(),
        provided_signature,
        &body,
    )?;

    let request: WorkflowRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::Validation(format!("invalid request body: {err}")))?;

    for (field, value) in [
        ("dx_workflow_run_id", &request.dx_workflow_run_id),
        ("github_organization", &request.github_organization),
        ("github_repository", &request.github_repository),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{field} must not be empty")));
        }
    }

    let Some(template) = TemplateKind::parse(&request.template_type) else {
        return Err(ApiError::Validation(format!(
            "unknown template type: {}. Supported types: {}",
            request.template_type,
            TemplateKind::supported_list()
        )));
    };

    let source_url = template
        .source_url(&state.config.templates, request.cookiecutter_url.as_deref())
        .ok_or_else(|| {
            ApiError::Validation("custom template requires cookiecutter_url".to_string())
        })?
        .to_string();

    let creation = CreationRequest {
        workflow_run_id: request.dx_workflow_run_id.clone(),
        template,
        owner: request.github_organization.clone(),
        repo: request.github_repository.clone(),
        source_url,
        parameters: request.parameters(),
        description: request.repo_description(),
    };

    state.queue.enqueue(creation).map_err(|err| match err {
        EnqueueError::Full => ApiError::Unavailable(err.to_string()),
        EnqueueError::Closed => ApiError::Internal(err.to_string()),
    })?;

    info!(
        run_id = %request.dx_workflow_run_id,
        template = template.name(),
        owner = %request.github_organization,
        repo = %request.github_repository,
        "queued service creation"
    );

    Ok(Json(WorkflowResponse {
        status: "PENDING".to_string(),
        message: format!(
            "Service creation queued for {}/{}",
            request.github_organization, request.github_repository
        ),
        execution_id: request.dx_workflow_run_id,
    }))
}

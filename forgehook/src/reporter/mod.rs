//! Workflow status reporter
//!
//! Posts progress messages, result links, and the final status to the DX
//! self-service workflow run that triggered a request. Every call is
//! best-effort: reporting is observability, not control flow. An
//! unconfigured reporter is a no-op, and transport failures are logged and
//! swallowed; they must never change the orchestrator's outcome or the
//! caller's HTTP acknowledgment.

use crate::config::DxConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Whether a status report actually went out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The remote API accepted the call
    Sent,
    /// Reporter unconfigured, or the call failed and was swallowed
    NotSent,
}

/// Final status of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Pipeline completed successfully
    Succeeded,
    /// Pipeline failed
    Failed,
}

impl RunStatus {
    /// Wire representation expected by the workflow-status API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
        }
    }
}

/// Best-effort status reporting keyed by workflow-run handle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowReporter: Send + Sync {
    /// Post a free-text (markdown) progress message.
    async fn post_message(&self, run_id: &str, message: &str) -> Delivery;

    /// Attach a result link to the run.
    async fn add_link<'a>(&self, run_id: &str, url: &str, label: &str, icon: Option<&'a str>)
        -> Delivery;

    /// Set the final run status.
    async fn change_status(&self, run_id: &str, status: RunStatus) -> Delivery;
}

/// Reporter backed by the DX workflow-runs API
pub struct DxReporter {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl DxReporter {
    /// Build a reporter from configuration.
    #[must_use]
    pub fn new(config: &DxConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn call(&self, endpoint: &str, run_id: &str, payload: Value) -> Delivery {
        let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) else {
            debug!(endpoint, run_id, "workflow status API not configured, skipping report");
            return Delivery::NotSent;
        };
        if self.api_url.is_empty() {
            debug!(endpoint, run_id, "workflow status API not configured, skipping report");
            return Delivery::NotSent;
        }

        let url = format!("{}/workflowRuns.{endpoint}", self.api_url);
        let result = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(endpoint, run_id, "status report delivered");
                Delivery::Sent
            }
            Ok(response) => {
                warn!(endpoint, run_id, status = %response.status(), "status report rejected");
                Delivery::NotSent
            }
            Err(err) => {
                warn!(endpoint, run_id, %err, "status report failed");
                Delivery::NotSent
            }
        }
    }
}

#[async_trait]
impl WorkflowReporter for DxReporter {
    async fn post_message(&self, run_id: &str, message: &str) -> Delivery {
        self.call(
            "postMessage",
            run_id,
            json!({ "workflow_run_id": run_id, "message": message }),
        )
        .await
    }

    async fn add_link<'a>(
        &self,
        run_id: &str,
        url: &str,
        label: &str,
        icon: Option<&'a str>,
    ) -> Delivery {
        let mut link = json!({ "url": url, "label": label });
        if let (Some(icon), Some(map)) = (icon, link.as_object_mut()) {
            map.insert("icon".to_string(), Value::String(icon.to_string()));
        }
        self.call(
            "addLink",
            run_id,
            json!({ "workflow_run_id": run_id, "link": link }),
        )
        .await
    }

    async fn change_status(&self, run_id: &str, status: RunStatus) -> Delivery {
        self.call(
            "changeStatus",
            run_id,
            json!({ "workflow_run_id": run_id, "status": status.as_str() }),
        )
        .await
    }
}

//! Configuration management for forgehook
//!
//! Configuration is loaded once at startup into an immutable [`Config`] value
//! and passed explicitly to the components that need it. Sources are merged
//! with clear precedence:
//!
//! 1. Environment variables (highest priority, `FORGEHOOK_` prefix, `__` for
//!    nesting, e.g. `FORGEHOOK_GITHUB__TOKEN`)
//! 2. `./config.toml`
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [github]
//! token = "ghp_..."
//! exclude_workflows = false
//!
//! [dx]
//! api_url = "https://api.getdx.com"
//! api_key = "dx_..."
//!
//! [templates]
//! accept_hooks = false
//!
//! [webhook]
//! secret = "shared-secret"
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// GitHub API and push credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token used for the API and the authenticated push URL
    pub token: Option<String>,

    /// GitHub REST API base URL
    pub api_url: String,

    /// Drop `.github/workflows` from generated commits (for tokens lacking
    /// the `workflow` scope)
    pub exclude_workflows: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
            exclude_workflows: false,
        }
    }
}

/// DX workflow-status API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DxConfig {
    /// Workflow-status API base URL
    pub api_url: String,

    /// API key; status reporting is a no-op when unset
    pub api_key: Option<String>,

    /// Per-call timeout for status reports, in seconds
    pub timeout_secs: u64,
}

impl Default for DxConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.getdx.com".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Template source locators and rendering policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Django (web framework) template source
    pub django_url: String,

    /// Go (compiled language) template source
    pub go_url: String,

    /// C++ (systems language) template source
    pub cpp_url: String,

    /// Python (scripting language) template source
    pub python_url: String,

    /// Working-directory pattern; `{uuid}` is replaced per request
    pub output_dir: String,

    /// Run template post-generation hook scripts. Disabled by default since
    /// hooks may require tools not present on the host; the produced tree can
    /// then be incomplete relative to the template's full setup.
    pub accept_hooks: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            django_url: "https://github.com/cookiecutter/cookiecutter-django".to_string(),
            go_url: "https://github.com/lacion/cookiecutter-golang".to_string(),
            cpp_url: "https://github.com/DerThorsten/cpp_cookiecutter".to_string(),
            python_url: "https://github.com/audreyfeldroy/cookiecutter-pypackage".to_string(),
            output_dir: "cookiecutter_output/{uuid}".to_string(),
            accept_hooks: false,
        }
    }
}

/// Inbound webhook authentication
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret for HMAC-SHA256 signature verification; verification is
    /// disabled when unset
    pub secret: Option<String>,
}

/// Background work queue sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of queued creation jobs before requests are shed
    pub capacity: usize,

    /// Number of worker tasks draining the queue
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            workers: 4,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// GitHub credentials and policy
    pub github: GitHubConfig,

    /// Workflow-status API settings
    pub dx: DxConfig,

    /// Template sources and rendering policy
    pub templates: TemplateConfig,

    /// Webhook authentication
    pub webhook: WebhookConfig,

    /// Background queue sizing
    pub queue: QueueConfig,
}

impl Config {
    /// Load configuration from defaults, `./config.toml`, and environment
    /// variables (highest priority).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - `./config.toml` exists but cannot be parsed
    /// - Merged values fail type conversion
    pub fn load() -> anyhow::Result<Self> {
        let mut figment =
            Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        figment = figment.merge(Env::prefixed("FORGEHOOK_").split("__").lowercase(true));

        let config = figment.extract()?;
        Ok(config)
    }
}

//! Template variants and the cookiecutter materializer
//!
//! Template dispatch is a strategy table, not a class hierarchy: every
//! [`TemplateKind`] resolves to a cookiecutter source locator (a fixed URL
//! from configuration for the named variants, or the request-supplied URL
//! for [`TemplateKind::Custom`]), and a single [`Materializer`]
//! implementation renders any of them.
//!
//! The template engine itself is an external black box: the materializer
//! shells out to the `cookiecutter` CLI and hands it the parameter mapping
//! verbatim. Keys the template does not recognize are ignored downstream,
//! never validated here.

mod workdir;

pub use workdir::Workdir;

use crate::config::TemplateConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Known template families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Django web-framework template
    Django,
    /// Go service template
    Go,
    /// C++ project template
    Cpp,
    /// Python package template
    Python,
    /// Caller-supplied cookiecutter URL
    Custom,
}

impl TemplateKind {
    /// Parse a template type from the inbound request, case-insensitively.
    ///
    /// Accepts `c++` as an alias for `cpp`. Returns `None` for unknown types.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "django" => Some(Self::Django),
            "go" => Some(Self::Go),
            "cpp" | "c++" => Some(Self::Cpp),
            "python" => Some(Self::Python),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Django => "django",
            Self::Go => "go",
            Self::Cpp => "cpp",
            Self::Python => "python",
            Self::Custom => "custom",
        }
    }

    /// Comma-separated list of accepted template types, for error messages.
    #[must_use]
    pub const fn supported_list() -> &'static str {
        "django, go, cpp, python, custom"
    }

    /// Resolve the cookiecutter source for this variant.
    ///
    /// Named variants read their fixed URL from configuration; `Custom` uses
    /// the request-supplied URL and yields `None` when it is absent.
    #[must_use]
    pub fn source_url<'a>(
        self,
        templates: &'a TemplateConfig,
        custom_url: Option<&'a str>,
    ) -> Option<&'a str> {
        match self {
            Self::Django => Some(&templates.django_url),
            Self::Go => Some(&templates.go_url),
            Self::Cpp => Some(&templates.cpp_url),
            Self::Python => Some(&templates.python_url),
            Self::Custom => custom_url,
        }
    }
}

/// Renders a template source into a working directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Materialize `source_url` with the given render context.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TemplateRender`] on any rendering failure:
    /// template fetch, invalid parameter, or hook-script failure.
    async fn materialize(
        &self,
        source_url: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Workdir, PipelineError>;
}

/// Materializer backed by the `cookiecutter` CLI
pub struct CookiecutterMaterializer {
    binary: String,
    output_dir_pattern: String,
    accept_hooks: bool,
}

impl CookiecutterMaterializer {
    /// Build a materializer from template configuration.
    #[must_use]
    pub fn new(templates: &TemplateConfig) -> Self {
        Self {
            binary: "cookiecutter".to_string(),
            output_dir_pattern: templates.output_dir.clone(),
            accept_hooks: templates.accept_hooks,
        }
    }

    #[cfg(test)]
    fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Fresh collision-free output root for one request.
    fn unique_output_root(&self) -> PathBuf {
        PathBuf::from(
            self.output_dir_pattern
                .replace("{uuid}", &Uuid::new_v4().to_string()),
        )
    }

    async fn render_into(
        &self,
        root: &Path,
        source_url: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<PathBuf, PipelineError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--no-input")
            .arg("--output-dir")
            .arg(root)
            .arg("--accept-hooks")
            .arg(if self.accept_hooks { "yes" } else { "no" })
            .arg(source_url);
        for (key, value) in parameters {
            cmd.arg(format!("{key}={value}"));
        }

        debug!(source_url, output = %root.display(), "running cookiecutter");
        let output = cmd.output().await.map_err(|err| {
            PipelineError::TemplateRender(format!("failed to run cookiecutter: {err}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::TemplateRender(format!(
                "cookiecutter exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        find_project_dir(root).await
    }
}

#[async_trait]
impl Materializer for CookiecutterMaterializer {
    async fn materialize(
        &self,
        source_url: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Workdir, PipelineError> {
        let root = self.unique_output_root();
        tokio::fs::create_dir_all(&root).await.map_err(|err| {
            PipelineError::TemplateRender(format!(
                "failed to create working directory {}: {err}",
                root.display()
            ))
        })?;

        match self.render_into(&root, source_url, parameters).await {
            Ok(project_dir) => {
                info!(project_dir = %project_dir.display(), "template materialized");
                Ok(Workdir::new(root, project_dir))
            }
            Err(err) => {
                // nothing generated worth keeping
                if let Err(remove_err) = tokio::fs::remove_dir_all(&root).await {
                    warn!(
                        path = %root.display(),
                        error = %remove_err,
                        "failed to remove working directory after render failure"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Locate the project directory cookiecutter produced under `root`.
///
/// Cookiecutter renders exactly one top-level directory (named after the
/// project slug) into the output dir.
async fn find_project_dir(root: &Path) -> Result<PathBuf, PipelineError> {
    let mut entries = tokio::fs::read_dir(root).await.map_err(|err| {
        PipelineError::TemplateRender(format!("failed to read output directory: {err}"))
    })?;

    while let Some(entry) = entries.next_entry().await.map_err(|err| {
        PipelineError::TemplateRender(format!("failed to read output directory: {err}"))
    })? {
        let path = entry.path();
        if path.is_dir() {
            return Ok(path);
        }
    }

    Err(PipelineError::TemplateRender(
        "template produced no project directory".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_types() {
        assert_eq!(TemplateKind::parse("django"), Some(TemplateKind::Django));
        assert_eq!(TemplateKind::parse("GO"), Some(TemplateKind::Go));
        assert_eq!(TemplateKind::parse("cpp"), Some(TemplateKind::Cpp));
        assert_eq!(TemplateKind::parse("C++"), Some(TemplateKind::Cpp));
        assert_eq!(TemplateKind::parse("Python"), Some(TemplateKind::Python));
        assert_eq!(TemplateKind::parse("custom"), Some(TemplateKind::Custom));
    }

    #[test]
    fn test_parse_unknown_type() {
        assert_eq!(TemplateKind::parse("rust"), None);
        assert_eq!(TemplateKind::parse(""), None);
    }

    #[test]
    fn test_source_url_dispatch() {
        let templates = TemplateConfig::default();
        assert_eq!(
            TemplateKind::Go.source_url(&templates, None),
            Some(templates.go_url.as_str())
        );
        assert_eq!(
            TemplateKind::Custom.source_url(&templates, Some("https://example.com/tpl")),
            Some("https://example.com/tpl")
        );
        assert_eq!(TemplateKind::Custom.source_url(&templates, None), None);
        // custom URL is ignored for named variants
        assert_eq!(
            TemplateKind::Django.source_url(&templates, Some("https://example.com/tpl")),
            Some(templates.django_url.as_str())
        );
    }

    #[tokio::test]
    async fn test_find_project_dir() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = base.path().join("generated-project");
        std::fs::create_dir(&project).expect("create project dir");
        std::fs::write(base.path().join("stray-file"), "x").expect("write");

        let found = find_project_dir(base.path()).await.expect("should find dir");
        assert_eq!(found, project);
    }

    #[tokio::test]
    async fn test_find_project_dir_empty_output() {
        let base = tempfile::tempdir().expect("tempdir");
        let err = find_project_dir(base.path()).await.unwrap_err();
        assert!(err.to_string().contains("no project directory"));
    }

    #[tokio::test]
    async fn test_materialize_failure_removes_output_root() {
        let base = tempfile::tempdir().expect("tempdir");
        let pattern = base
            .path()
            .join("out-{uuid}")
            .to_string_lossy()
            .into_owned();
        let templates = TemplateConfig {
            output_dir: pattern,
            ..TemplateConfig::default()
        };
        // `false` exits non-zero without touching the output dir
        let materializer = CookiecutterMaterializer::new(&templates).with_binary("false");

        let err = materializer
            .materialize("https://example.com/tpl", &BTreeMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.step(), "template");

        let leftovers = std::fs::read_dir(base.path()).expect("read base").count();
        assert_eq!(leftovers, 0, "failed render must leave no working directory");
    }

    #[tokio::test]
    async fn test_materialize_missing_binary() {
        let base = tempfile::tempdir().expect("tempdir");
        let pattern = base
            .path()
            .join("out-{uuid}")
            .to_string_lossy()
            .into_owned();
        let templates = TemplateConfig {
            output_dir: pattern,
            ..TemplateConfig::default()
        };
        let materializer =
            CookiecutterMaterializer::new(&templates).with_binary("cookiecutter-missing-binary");

        let err = materializer
            .materialize("https://example.com/tpl", &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to run cookiecutter"));
    }
}

//! forgehook: webhook-driven repository scaffolding service
//!
//! Forgehook receives service-creation requests from a self-service workflow
//! platform (DX), materializes a cookiecutter template into a temporary
//! working directory, creates the target GitHub repository, pushes the
//! generated files as the initial commit, and streams progress back to the
//! originating workflow run.
//!
//! # Architecture
//!
//! The pipeline is a strictly ordered sequence of side-effecting steps with
//! all-or-nothing semantics:
//!
//! 1. Materialize the template into a unique working directory
//! 2. Create the remote repository (must start empty)
//! 3. Initialize a local git repository
//! 4. Commit and push everything with upstream tracking
//!
//! Requests are acknowledged synchronously with a `PENDING` status; the
//! pipeline itself runs on a bounded background work queue. Pipeline failures
//! are reduced to a binary outcome and reported asynchronously through the
//! workflow-status API, never through the original HTTP response.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use forgehook::{config::Config, handlers, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     forgehook::observability::init()?;
//!     let config = Config::load()?;
//!     let addr = format!("{}:{}", config.server.host, config.server.port);
//!     let app = handlers::router(AppState::new(config));
//!     let listener = tokio::net::TcpListener::bind(&addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod handlers;
pub mod observability;
pub mod orchestrator;
pub mod queue;
pub mod reporter;
pub mod state;
pub mod templates;

/// Service name used in logs, HTTP metadata, and outbound user agents.
pub const SERVICE_NAME: &str = "forgehook";

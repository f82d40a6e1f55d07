//! Background work queue
//!
//! Decouples HTTP acceptance latency from pipeline duration: the webhook
//! handler enqueues a [`CreationRequest`] and answers immediately, while a
//! small worker pool drains the bounded channel and runs one pipeline per
//! job. There is no inter-request coordination, since each job owns its
//! working directory exclusively, and no retries: a job that fails is
//! reported failed and dropped.
//!
//! The queue boundary is also where a timeout or cancellation policy would
//! be added if one were ever required; current behavior needs neither.

use crate::orchestrator::{run_creation_job, CreationRequest, Orchestrator};
use crate::reporter::WorkflowReporter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

/// Enqueue failure
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The queue is at capacity; the request is shed
    #[error("creation queue is full")]
    Full,
    /// All workers have stopped
    #[error("creation workers are not running")]
    Closed,
}

/// Handle for submitting creation jobs to the worker pool
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<CreationRequest>,
}

impl JobQueue {
    /// Enqueue one creation job without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::Full`] when the queue is at capacity and
    /// [`EnqueueError::Closed`] when no worker is listening.
    pub fn enqueue(&self, request: CreationRequest) -> Result<(), EnqueueError> {
        self.tx.try_send(request).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

/// Spawn the worker pool and return the queue handle.
///
/// Workers share one receiver and each drains jobs until the queue handle
/// (and every clone) is dropped. At least one worker is always spawned.
pub fn spawn_workers(
    capacity: usize,
    workers: usize,
    orchestrator: Arc<Orchestrator>,
    reporter: Arc<dyn WorkflowReporter>,
) -> JobQueue {
    let (tx, rx) = mpsc::channel::<CreationRequest>(capacity.max(1));
    let rx = Arc::new(Mutex::new(rx));

    for worker in 0..workers.max(1) {
        let rx = Arc::clone(&rx);
        let orchestrator = Arc::clone(&orchestrator);
        let reporter = Arc::clone(&reporter);
        tokio::spawn(async move {
            debug!(worker, "creation worker started");
            loop {
                let request = rx.lock().await.recv().await;
                match request {
                    Some(request) => {
                        info!(
                            worker,
                            run_id = %request.workflow_run_id,
                            owner = %request.owner,
                            repo = %request.repo,
                            "creation job picked up"
                        );
                        run_creation_job(&orchestrator, reporter.as_ref(), request).await;
                    }
                    None => {
                        debug!(worker, "creation worker stopping");
                        break;
                    }
                }
            }
        });
    }

    JobQueue { tx }
}

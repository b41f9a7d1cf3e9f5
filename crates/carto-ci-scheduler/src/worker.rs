//! Worker that drains the job queue.

use crate::queue::JobReceiver;
use crate::runner::JobRunner;
use carto_ci_core::job::JobOutcome;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};

/// Takes jobs off the queue and runs each one as its own task.
pub struct Worker {
    id: String,
    runner: Arc<JobRunner>,
    limit: Arc<Semaphore>,
    max_concurrent: usize,
    outcomes: Option<mpsc::UnboundedSender<JobOutcome>>,
}

impl Worker {
    pub fn new(id: impl Into<String>, runner: Arc<JobRunner>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            id: id.into(),
            runner,
            limit: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            outcomes: None,
        }
    }

    /// Send every job's outcome to `tx` as it completes.
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<JobOutcome>) -> Self {
        self.outcomes = Some(tx);
        self
    }

    /// Run until the queue closes, then wait for in-flight jobs.
    pub async fn run(self, mut rx: JobReceiver) {
        info!(worker_id = %self.id, max_concurrent = self.max_concurrent, "Starting worker");
        let mut tasks = JoinSet::new();

        while let Some(job) = rx.recv().await {
            while let Some(result) = tasks.try_join_next() {
                self.reap(result);
            }

            let Ok(permit) = self.limit.clone().acquire_owned().await else {
                break;
            };

            info!(
                worker_id = %self.id,
                job_id = %job.id.short(),
                context = %job.spec.context_label(),
                "Dispatching job"
            );

            let runner = self.runner.clone();
            let outcomes = self.outcomes.clone();
            tasks.spawn(async move {
                let outcome = runner.run(job).await;
                drop(permit);
                if let Some(tx) = outcomes {
                    let _ = tx.send(outcome);
                }
            });
        }

        info!(worker_id = %self.id, in_flight = tasks.len(), "Job queue closed, draining");
        while let Some(result) = tasks.join_next().await {
            self.reap(result);
        }
        info!(worker_id = %self.id, "Worker stopped");
    }

    fn reap(&self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            error!(worker_id = %self.id, error = %e, "Job task panicked");
        }
    }
}

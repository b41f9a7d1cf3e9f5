//! In-memory job queue.

use carto_ci_core::job::Job;
use carto_ci_core::{Error, Result};
use tokio::sync::mpsc;

/// Receiving end of a [`JobQueue`], owned by the worker.
pub type JobReceiver = mpsc::UnboundedReceiver<Job>;

/// Sending end of the job queue.
///
/// Unbounded so that enqueueing never waits on running builds; the worker
/// applies the concurrency limit.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl JobQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue a job. Fails only once the worker has shut down.
    pub fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| Error::Internal(format!("job queue closed, dropped job {}", e.0.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_ci_core::matrix::{Arch, JobSpec, Platform};

    #[tokio::test]
    async fn test_enqueue_preserves_order() {
        let (queue, mut rx) = JobQueue::new();
        queue
            .enqueue(Job::for_commit(JobSpec::new(Platform::Linux, Arch::Amd64), "a"))
            .unwrap();
        queue
            .enqueue(Job::for_commit(JobSpec::new(Platform::Linux, Arch::Arm64), "a"))
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().spec.arch, Arch::Amd64);
        assert_eq!(rx.recv().await.unwrap().spec.arch, Arch::Arm64);
    }

    #[test]
    fn test_enqueue_after_shutdown() {
        let (queue, rx) = JobQueue::new();
        drop(rx);
        let result = queue.enqueue(Job::for_commit(JobSpec::new(Platform::Linux, Arch::Amd64), "a"));
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}

//! Event orchestrator: interprets webhook events and dispatches matrix jobs.

use crate::queue::JobQueue;
use carto_ci_core::event::{Event, RefKind};
use carto_ci_core::job::Job;
use carto_ci_core::matrix::Matrix;
use carto_ci_core::release::{Release, ReleasePublisher, is_release_tag};
use carto_ci_core::{Error, JobId, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// What one event dispatched.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub jobs: Vec<JobId>,
    pub release: Option<Arc<Release>>,
}

impl Dispatch {
    pub fn is_ignored(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Turns events into jobs.
///
/// Dispatch is fire-and-forget: jobs are enqueued and `handle_event`
/// returns without waiting for any of them. Job results are observed
/// through commit statuses, release assets, and the worker's outcomes.
pub struct Orchestrator {
    repository: String,
    tag_prefix: String,
    matrix: Matrix,
    queue: JobQueue,
    releases: Option<Arc<dyn ReleasePublisher>>,
}

impl Orchestrator {
    pub fn new(
        repository: impl Into<String>,
        tag_prefix: impl Into<String>,
        matrix: Matrix,
        queue: JobQueue,
    ) -> Self {
        Self {
            repository: repository.into(),
            tag_prefix: tag_prefix.into(),
            matrix,
            queue,
            releases: None,
        }
    }

    pub fn with_release_publisher(mut self, publisher: Arc<dyn ReleasePublisher>) -> Self {
        self.releases = Some(publisher);
        self
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Interpret one event and enqueue its jobs.
    ///
    /// Fails only when nothing could be dispatched: a release was required
    /// but could not be created, the queue is gone, or the event names a ref
    /// that cannot be built.
    pub async fn handle_event(&self, event: Event) -> Result<Dispatch> {
        match event.validated()? {
            Event::Push {
                head_commit: Some(commit),
            } => self.dispatch_push(&commit),
            Event::Push { head_commit: None } => {
                info!("Push without a head commit, nothing to build");
                Ok(Dispatch::default())
            }
            Event::TagCreate {
                ref_name,
                ref_kind: RefKind::Tag,
            } if is_release_tag(&ref_name, &self.tag_prefix) => {
                self.dispatch_release(&ref_name).await
            }
            Event::TagCreate { ref_name, ref_kind } => {
                info!(
                    git_ref = %ref_name,
                    ref_kind = ?ref_kind,
                    prefix = %self.tag_prefix,
                    "Ref is not a release tag, ignoring"
                );
                Ok(Dispatch::default())
            }
            Event::Other => {
                debug!("Unhandled event, ignoring");
                Ok(Dispatch::default())
            }
        }
    }

    fn dispatch_push(&self, commit: &str) -> Result<Dispatch> {
        let jobs = self
            .matrix
            .expand()
            .into_iter()
            .map(|spec| Job::for_commit(spec, commit))
            .collect();
        let jobs = self.enqueue_all(jobs)?;
        info!(commit = %commit, jobs = jobs.len(), "Dispatched push");
        Ok(Dispatch {
            jobs,
            release: None,
        })
    }

    async fn dispatch_release(&self, tag: &str) -> Result<Dispatch> {
        let publisher = self.releases.as_ref().ok_or_else(|| {
            Error::CollaboratorUnavailable(format!(
                "no release publisher configured, cannot release {}",
                tag
            ))
        })?;

        // Exactly once per tag event; every leg shares this record.
        let release = Arc::new(
            publisher
                .create_draft_release(&self.repository, tag)
                .await?,
        );
        info!(release_id = release.id, tag = %tag, "Created draft release");

        let jobs = self
            .matrix
            .expand()
            .into_iter()
            .map(|spec| Job::for_release(spec, release.clone()))
            .collect();
        let jobs = self.enqueue_all(jobs)?;
        info!(tag = %tag, jobs = jobs.len(), "Dispatched release");
        Ok(Dispatch {
            jobs,
            release: Some(release),
        })
    }

    fn enqueue_all(&self, jobs: Vec<Job>) -> Result<Vec<JobId>> {
        let mut ids = Vec::with_capacity(jobs.len());
        for job in jobs {
            let id = job.id;
            debug!(job_id = %id.short(), context = %job.spec.context_label(), "Enqueueing job");
            self.queue.enqueue(job)?;
            ids.push(id);
        }
        Ok(ids)
    }
}

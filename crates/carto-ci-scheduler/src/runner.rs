//! Runs one job: status, build, status, upload.

use carto_ci_core::executor::{BuildExecutor, BuildOutput};
use carto_ci_core::job::{Job, JobOutcome, JobState};
use carto_ci_core::matrix::JobSpec;
use carto_ci_core::release::{Artifact, Release, ReleasePublisher};
use carto_ci_core::status::{StatusHandle, StatusReporter, TerminalState};
use carto_ci_core::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span, warn};

/// Executes jobs against the configured collaborators.
///
/// Status reporting and release publishing are optional: without a
/// reporter, commit jobs build but record the missing status in their
/// outcome; without a publisher, release jobs fail at upload time.
pub struct JobRunner {
    repository: String,
    executor: Arc<dyn BuildExecutor>,
    status: Option<Arc<dyn StatusReporter>>,
    releases: Option<Arc<dyn ReleasePublisher>>,
    discard_outputs: bool,
}

impl JobRunner {
    pub fn new(repository: impl Into<String>, executor: Arc<dyn BuildExecutor>) -> Self {
        Self {
            repository: repository.into(),
            executor,
            status: None,
            releases: None,
            discard_outputs: false,
        }
    }

    pub fn with_status_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.status = Some(reporter);
        self
    }

    pub fn with_release_publisher(mut self, publisher: Arc<dyn ReleasePublisher>) -> Self {
        self.releases = Some(publisher);
        self
    }

    /// Have the executor remove each build's output once the job is done
    /// with it. Without this, outputs are left where the executor put them.
    pub fn with_discarded_outputs(mut self) -> Self {
        self.discard_outputs = true;
        self
    }

    /// Run a job to completion. Never fails; every error ends up in the outcome.
    pub async fn run(&self, job: Job) -> JobOutcome {
        let span = info_span!(
            "job",
            job_id = %job.id.short(),
            context = %job.spec.context_label(),
            trigger = %job.trigger,
        );
        self.run_inner(job).instrument(span).await
    }

    /// Run several jobs concurrently and collect their outcomes in order.
    pub async fn run_all(&self, jobs: Vec<Job>) -> Vec<JobOutcome> {
        futures::future::join_all(jobs.into_iter().map(|job| self.run(job))).await
    }

    async fn run_inner(&self, job: Job) -> JobOutcome {
        let context = job.spec.context_label();
        let mut status_error = None;

        let handle = match &job.commit {
            Some(commit) => match self.open_status(commit, &context).await {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "Could not open commit status");
                    status_error = Some(e.to_string());
                    None
                }
            },
            None => None,
        };

        info!(executor = self.executor.name(), source = %job.source, "Starting build");
        let result = self.executor.execute(job.id, &job.spec, &job.source).await;

        if let Some(handle) = handle {
            let (state, description) = match &result {
                Ok(output) => (TerminalState::Success, output.describe()),
                Err(e) => (TerminalState::Failure, e.to_string()),
            };
            if let Err(e) = self.close_status(handle, state, &description).await {
                warn!(error = %e, "Could not close commit status");
                status_error = Some(e.to_string());
            }
        }

        let mut uploaded = false;
        let state = match result {
            Err(e) => {
                error!(error = %e, "Build failed");
                JobState::BuildFailed {
                    message: e.to_string(),
                }
            }
            Ok(output) => {
                info!(result = %output.describe(), "Build succeeded");
                let state = match &job.release {
                    None => JobState::Succeeded,
                    Some(release) => match self.publish(release, &job.spec, &output).await {
                        Ok(()) => {
                            uploaded = true;
                            JobState::Succeeded
                        }
                        Err(e) => {
                            error!(release = %release.tag, error = %e, "Artifact upload failed");
                            JobState::PublishFailed {
                                message: e.to_string(),
                            }
                        }
                    },
                };
                if self.discard_outputs {
                    if let Err(e) = self.executor.discard_output(&output).await {
                        warn!(error = %e, "Could not remove build output");
                    }
                }
                state
            }
        };

        JobOutcome {
            job_id: job.id,
            context,
            state,
            status_error,
            uploaded,
            finished_at: Utc::now(),
        }
    }

    async fn open_status(&self, commit: &str, context: &str) -> Result<StatusHandle> {
        let reporter = self.status.as_ref().ok_or_else(|| {
            Error::CollaboratorUnavailable("no status reporter configured".to_string())
        })?;
        reporter.open(&self.repository, commit, context).await
    }

    async fn close_status(
        &self,
        handle: StatusHandle,
        state: TerminalState,
        description: &str,
    ) -> Result<()> {
        let reporter = self.status.as_ref().ok_or_else(|| {
            Error::CollaboratorUnavailable("no status reporter configured".to_string())
        })?;
        reporter.close(handle, state, description).await
    }

    async fn publish(&self, release: &Release, spec: &JobSpec, output: &BuildOutput) -> Result<()> {
        let publisher = self.releases.as_ref().ok_or_else(|| {
            Error::CollaboratorUnavailable("no release publisher configured".to_string())
        })?;

        let name = spec.artifact_name();
        let file_name = output
            .artifact_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if file_name != name {
            return Err(Error::PublishFailed(format!(
                "build produced '{}', expected '{}'",
                output.artifact_path.display(),
                name
            )));
        }

        let content = tokio::fs::read(&output.artifact_path).await.map_err(|e| {
            Error::PublishFailed(format!(
                "reading {}: {}",
                output.artifact_path.display(),
                e
            ))
        })?;

        publisher
            .upload_artifact(release, Artifact::binary(name.clone(), content))
            .await?;
        info!(artifact = %name, release = %release.tag, "Uploaded artifact");
        Ok(())
    }
}

//! Jobs: one spawned unit of work per matrix leg per triggering event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::JobId;
use crate::executor::SourceRef;
use crate::matrix::JobSpec;
use crate::release::Release;

/// One matrix leg bound to the event that triggered it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub spec: JobSpec,
    /// Commit whose status this job reports against.
    pub commit: Option<String>,
    /// Release this job's artifact is attached to.
    pub release: Option<Arc<Release>>,
    /// Source tree to build.
    pub source: SourceRef,
    /// Triggering ref, for log correlation only.
    pub trigger: String,
}

impl Job {
    pub fn for_commit(spec: JobSpec, commit: impl Into<String>) -> Self {
        let commit = commit.into();
        Self {
            id: JobId::new(),
            spec,
            source: SourceRef::Commit(commit.clone()),
            trigger: commit.clone(),
            commit: Some(commit),
            release: None,
        }
    }

    pub fn for_release(spec: JobSpec, release: Arc<Release>) -> Self {
        Self {
            id: JobId::new(),
            spec,
            commit: None,
            source: SourceRef::Tag(release.tag.clone()),
            trigger: release.tag.clone(),
            release: Some(release),
        }
    }

    /// Also report status against `commit`, keeping the source as is.
    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// A job with neither status nor release side effects.
    pub fn standalone(spec: JobSpec, source: SourceRef) -> Self {
        Self {
            id: JobId::new(),
            spec,
            commit: None,
            release: None,
            trigger: source.to_string(),
            source,
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Succeeded,
    BuildFailed { message: String },
    PublishFailed { message: String },
}

/// Completion signal emitted once per job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub context: String,
    #[serde(flatten)]
    pub state: JobState,
    /// Set when the commit status could not be written; the build result
    /// stands but the host shows stale or missing status.
    pub status_error: Option<String>,
    pub uploaded: bool,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.state, JobState::Succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Arch, Platform};

    fn release() -> Arc<Release> {
        Arc::new(Release {
            id: 7,
            repository: "b1naryth1ef/carto".to_string(),
            tag: "v1.0.0".to_string(),
            name: "v1.0.0".to_string(),
            draft: true,
            upload_url: "https://uploads.example/7/assets".to_string(),
        })
    }

    #[test]
    fn test_commit_job_source() {
        let job = Job::for_commit(JobSpec::new(Platform::Linux, Arch::Amd64), "abc");
        assert_eq!(job.source, SourceRef::Commit("abc".to_string()));
        assert_eq!(job.trigger, "abc");
        assert!(job.release.is_none());
    }

    #[test]
    fn test_release_job_source() {
        let job = Job::for_release(JobSpec::new(Platform::Linux, Arch::Amd64), release());
        assert_eq!(job.source, SourceRef::Tag("v1.0.0".to_string()));
        assert!(job.commit.is_none());
    }

    #[test]
    fn test_standalone_job_has_no_side_effects() {
        let job = Job::standalone(
            JobSpec::new(Platform::Windows, Arch::Amd64),
            SourceRef::Commit("0123456789".to_string()),
        );
        assert!(job.commit.is_none());
        assert!(job.release.is_none());
        assert_eq!(job.trigger, "0123456");
    }

    #[test]
    fn test_outcome_serializes_state_inline() {
        let outcome = JobOutcome {
            job_id: JobId::new(),
            context: "carto-linux-amd64".to_string(),
            state: JobState::BuildFailed {
                message: "exit 1".to_string(),
            },
            status_error: None,
            uploaded: false,
            finished_at: Utc::now(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["state"], "build_failed");
        assert_eq!(value["message"], "exit 1");
        assert!(!outcome.is_success());
    }
}

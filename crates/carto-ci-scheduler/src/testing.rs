//! Recording fakes of the collaborator traits.

use async_trait::async_trait;
use carto_ci_core::executor::{BuildExecutor, BuildOutput, SourceRef};
use carto_ci_core::matrix::JobSpec;
use carto_ci_core::release::{Artifact, Release, ReleasePublisher, ReleaseRequest};
use carto_ci_core::status::{CommitState, StatusHandle, StatusReporter, TerminalState};
use carto_ci_core::{Error, JobId, Result};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Writes a small artifact per job, failing the legs it is told to fail.
pub struct FakeExecutor {
    dir: TempDir,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    pub calls: Mutex<Vec<(JobId, String, SourceRef)>>,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
    /// Artifact paths whose outputs were discarded.
    pub discarded: Mutex<Vec<PathBuf>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            failing: HashSet::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            discarded: Mutex::new(Vec::new()),
        }
    }

    /// Fail the leg with this context label.
    pub fn failing(mut self, context: &str) -> Self {
        self.failing.insert(context.to_string());
        self
    }

    pub fn delayed(mut self, context: &str, delay: Duration) -> Self {
        self.delays.insert(context.to_string(), delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BuildExecutor for FakeExecutor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn execute(&self, job_id: JobId, spec: &JobSpec, source: &SourceRef) -> Result<BuildOutput> {
        let context = spec.context_label();
        self.calls
            .lock()
            .unwrap()
            .push((job_id, context.clone(), source.clone()));

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        let delay = self
            .delays
            .get(&context)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&context) {
            return Err(Error::BuildFailed("exit code 1".to_string()));
        }

        let job_dir = self.dir.path().join(job_id.short());
        std::fs::create_dir_all(&job_dir).unwrap();
        let artifact_path = job_dir.join(spec.artifact_name());
        std::fs::write(&artifact_path, context.as_bytes()).unwrap();

        Ok(BuildOutput {
            artifact_path,
            size_bytes: context.len() as u64,
            duration: delay,
        })
    }

    async fn discard_output(&self, output: &BuildOutput) -> Result<()> {
        if let Some(dir) = output.artifact_path.parent() {
            std::fs::remove_dir_all(dir).map_err(|e| Error::Internal(e.to_string()))?;
        }
        self.discarded
            .lock()
            .unwrap()
            .push(output.artifact_path.clone());
        Ok(())
    }
}

/// Records every status transition, per context label.
#[derive(Default)]
pub struct RecordingReporter {
    pub transitions: Mutex<Vec<(String, CommitState)>>,
    pub fail_open: bool,
    pub fail_close: bool,
}

impl RecordingReporter {
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Default::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Default::default()
        }
    }

    /// Transitions seen for one context, in order.
    pub fn states_for(&self, context: &str) -> Vec<CommitState> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == context)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn count(&self, state: CommitState) -> usize {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == state)
            .count()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn open(&self, repository: &str, commit: &str, context: &str) -> Result<StatusHandle> {
        if self.fail_open {
            return Err(Error::StatusFailed("host unreachable".to_string()));
        }
        self.transitions
            .lock()
            .unwrap()
            .push((context.to_string(), CommitState::Pending));
        Ok(StatusHandle::new(repository, commit, context))
    }

    async fn close(&self, handle: StatusHandle, state: TerminalState, _description: &str) -> Result<()> {
        if self.fail_close {
            return Err(Error::StatusFailed("host unreachable".to_string()));
        }
        self.transitions
            .lock()
            .unwrap()
            .push((handle.context().to_string(), state.into()));
        Ok(())
    }
}

/// Records created releases and uploaded artifact names.
#[derive(Default)]
pub struct RecordingPublisher {
    pub created: Mutex<Vec<ReleaseRequest>>,
    pub uploads: Mutex<Vec<(u64, String)>>,
    pub fail_create: bool,
    pub fail_upload: bool,
}

impl RecordingPublisher {
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Default::default()
        }
    }

    pub fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Default::default()
        }
    }

    pub fn upload_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ReleasePublisher for RecordingPublisher {
    async fn create_release(&self, repository: &str, request: &ReleaseRequest) -> Result<Release> {
        if self.fail_create {
            return Err(Error::PublishFailed("401 Bad credentials".to_string()));
        }
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = created.len() as u64;
        Ok(Release {
            id,
            repository: repository.to_string(),
            tag: request.tag.clone(),
            name: request.name.clone(),
            draft: request.draft,
            upload_url: format!("https://uploads.example/{}/assets", id),
        })
    }

    async fn upload_artifact(&self, release: &Release, artifact: Artifact) -> Result<()> {
        if self.fail_upload {
            return Err(Error::PublishFailed("422 already_exists".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((release.id, artifact.name));
        Ok(())
    }
}

/// A shared release for runner and worker tests.
pub fn release(tag: &str) -> Release {
    Release {
        id: 99,
        repository: "b1naryth1ef/carto".to_string(),
        tag: tag.to_string(),
        name: tag.to_string(),
        draft: true,
        upload_url: "https://uploads.example/99/assets".to_string(),
    }
}

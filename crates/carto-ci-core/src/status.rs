//! Commit status reporting.
//!
//! A status is opened once as `pending` and closed exactly once to a terminal
//! state. [`StatusHandle`] is not `Clone` and [`StatusReporter::close`] takes it
//! by value, so a second terminal transition does not type-check.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// State of a commit status on the source-control host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "pending"),
            CommitState::Success => write!(f, "success"),
            CommitState::Failure => write!(f, "failure"),
        }
    }
}

/// The states a status may be closed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Success,
    Failure,
}

impl From<TerminalState> for CommitState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Success => CommitState::Success,
            TerminalState::Failure => CommitState::Failure,
        }
    }
}

/// A status record as sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub repository: String,
    pub commit: String,
    pub context: String,
    pub state: CommitState,
    pub description: String,
}

/// An opened, still-pending status.
#[derive(Debug)]
pub struct StatusHandle {
    repository: String,
    commit: String,
    context: String,
}

impl StatusHandle {
    pub fn new(
        repository: impl Into<String>,
        commit: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            commit: commit.into(),
            context: context.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// The terminal record this handle closes to.
    pub fn into_status(self, state: TerminalState, description: impl Into<String>) -> CommitStatus {
        CommitStatus {
            repository: self.repository,
            commit: self.commit,
            context: self.context,
            state: state.into(),
            description: description.into(),
        }
    }
}

/// Trait for commit status hosts.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Create a `pending` status for `context` on `commit`.
    async fn open(&self, repository: &str, commit: &str, context: &str) -> Result<StatusHandle>;

    /// Move an opened status to its terminal state.
    async fn close(
        &self,
        handle: StatusHandle,
        state: TerminalState,
        description: &str,
    ) -> Result<()>;
}

//! Build executor contract.
//!
//! Executors run one leg's toolchain invocation in an isolated environment
//! (a container, a VM) and report where the artifact landed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::matrix::JobSpec;
use crate::{Error, JobId, Result};

/// What source tree a build should check out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceRef {
    Commit(String),
    Tag(String),
    /// Whatever the default branch points at.
    DefaultBranch,
}

impl SourceRef {
    /// A commit source, checked to be a (possibly abbreviated) hex object id.
    pub fn commit(id: impl Into<String>) -> Result<Self> {
        let source = SourceRef::Commit(id.into());
        source.check()?;
        Ok(source)
    }

    /// A tag source, checked against [`is_tag_name`].
    pub fn tag(name: impl Into<String>) -> Result<Self> {
        let source = SourceRef::Tag(name.into());
        source.check()?;
        Ok(source)
    }

    /// Fail unless the ref can be handed to a build as-is.
    pub fn check(&self) -> Result<()> {
        match self {
            SourceRef::Commit(id) if !is_commit_id(id) => {
                Err(Error::InvalidInput(format!("not a commit id: {:?}", id)))
            }
            SourceRef::Tag(name) if !is_tag_name(name) => {
                Err(Error::InvalidInput(format!("not a usable tag name: {:?}", name)))
            }
            _ => Ok(()),
        }
    }

    /// The ref a checkout should land on, if any.
    pub fn git_ref(&self) -> Option<&str> {
        match self {
            SourceRef::Commit(id) => Some(id.as_str()),
            SourceRef::Tag(name) => Some(name.as_str()),
            SourceRef::DefaultBranch => None,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceRef::Commit(sha) => {
                let short: String = sha.chars().take(7).collect();
                write!(f, "{}", short)
            }
            SourceRef::Tag(tag) => write!(f, "{}", tag),
            SourceRef::DefaultBranch => write!(f, "HEAD"),
        }
    }
}

/// Hex object id, abbreviated to at least 4 digits, up to a full SHA-256.
pub fn is_commit_id(id: &str) -> bool {
    (4..=64).contains(&id.len()) && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether a tag name is well formed and made only of `[A-Za-z0-9._+/-]`.
///
/// Narrower than git's ref-format rules; shell metacharacters never pass.
pub fn is_tag_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 255 {
        return false;
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'/' | b'-'))
    {
        return false;
    }
    if name.starts_with('-') || name.ends_with('.') || name.ends_with(".lock") {
        return false;
    }
    if name.contains("..") {
        return false;
    }
    name.split('/')
        .all(|component| !component.is_empty() && !component.starts_with('.'))
}

/// Result of a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Host path of the produced artifact.
    pub artifact_path: PathBuf,
    pub size_bytes: u64,
    pub duration: Duration,
}

impl BuildOutput {
    /// Human summary used as the success status description.
    pub fn describe(&self) -> String {
        format!(
            "Built {} in {}ms",
            format_size(self.size_bytes),
            self.duration.as_millis()
        )
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Trait for build executors.
///
/// Any error is terminal for the job; callers do not retry.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Name of this executor.
    fn name(&self) -> &'static str;

    /// Build one leg at the given source ref.
    async fn execute(&self, job_id: JobId, spec: &JobSpec, source: &SourceRef)
    -> Result<BuildOutput>;

    /// Remove what a build left on the host once its artifact has been read.
    async fn discard_output(&self, _output: &BuildOutput) -> Result<()> {
        Ok(())
    }
}

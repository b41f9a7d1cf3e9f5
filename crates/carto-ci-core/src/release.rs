//! Releases and the artifacts attached to them.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Content type of uploaded build outputs.
pub const ARTIFACT_CONTENT_TYPE: &str = "application/octet-stream";

/// A release record on the source-control host.
///
/// Jobs share one release through an `Arc` and only ever append artifacts to
/// it; the metadata is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Host-assigned id.
    pub id: u64,
    pub repository: String,
    pub tag: String,
    pub name: String,
    pub draft: bool,
    /// Where assets for this release are uploaded.
    pub upload_url: String,
}

/// Parameters for creating a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub tag: String,
    pub name: String,
    pub draft: bool,
}

impl ReleaseRequest {
    /// A draft release named after its tag.
    pub fn draft(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            name: tag.clone(),
            tag,
            draft: true,
        }
    }
}

/// One build output ready for upload.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub content_type: String,
    pub content: Bytes,
}

impl Artifact {
    pub fn binary(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: ARTIFACT_CONTENT_TYPE.to_string(),
            content: content.into(),
        }
    }
}

/// Whether `tag` follows the release naming convention: the prefix followed
/// by at least one more character.
pub fn is_release_tag(tag: &str, prefix: &str) -> bool {
    tag.strip_prefix(prefix)
        .is_some_and(|version| !version.is_empty())
}

/// Trait for release hosts.
#[async_trait]
pub trait ReleasePublisher: Send + Sync {
    /// Create a release. Not idempotent: two calls make two releases.
    async fn create_release(&self, repository: &str, request: &ReleaseRequest) -> Result<Release>;

    /// Create a draft release named after `tag`.
    async fn create_draft_release(&self, repository: &str, tag: &str) -> Result<Release> {
        self.create_release(repository, &ReleaseRequest::draft(tag))
            .await
    }

    /// Attach one named artifact to `release`.
    async fn upload_artifact(&self, release: &Release, artifact: Artifact) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_tag_convention() {
        assert!(is_release_tag("v1.2.3", "v"));
        assert!(is_release_tag("v0.1.0-rc1", "v"));
        assert!(!is_release_tag("1.2.3", "v"));
        assert!(!is_release_tag("v", "v"));
        assert!(!is_release_tag("feature/x", "v"));
    }

    #[test]
    fn test_draft_request_uses_tag_as_name() {
        let request = ReleaseRequest::draft("v2.0.0");
        assert_eq!(request.name, "v2.0.0");
        assert!(request.draft);
    }

    #[test]
    fn test_binary_artifact() {
        let artifact = Artifact::binary("carto-linux-amd64", vec![0x7f, b'E', b'L', b'F']);
        assert_eq!(artifact.content_type, "application/octet-stream");
        assert_eq!(artifact.content.len(), 4);
    }
}

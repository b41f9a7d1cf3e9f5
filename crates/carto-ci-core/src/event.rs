//! Inbound source-control events.

use serde::{Deserialize, Serialize};

use crate::executor::{is_commit_id, is_tag_name};
use crate::{Error, Result};

/// Kind of ref named by a create event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
    #[serde(other)]
    Unknown,
}

/// Wire shape of a webhook delivery: at most one of the branches is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub push: Option<PushPayload>,
    #[serde(default)]
    pub create: Option<CreatePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    /// Null for branch deletions.
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadCommit {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: RefKind,
}

/// An interpreted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Push { head_commit: Option<String> },
    TagCreate { ref_name: String, ref_kind: RefKind },
    Other,
}

impl Event {
    /// Parse an envelope-shaped JSON body (`{push: ...}` / `{create: ...}`).
    pub fn from_envelope_json(body: &[u8]) -> Result<Self> {
        let envelope: WebhookEnvelope =
            serde_json::from_slice(body).map_err(|e| Error::MalformedEvent(e.to_string()))?;
        Event::from(envelope).validated()
    }

    /// Interpret a native GitHub delivery, where the event name travels in the
    /// `X-GitHub-Event` header and the body is the bare payload.
    pub fn from_github(event_type: &str, payload: serde_json::Value) -> Result<Self> {
        let envelope = match event_type {
            "push" => WebhookEnvelope {
                push: Some(
                    serde_json::from_value(payload)
                        .map_err(|e| Error::MalformedEvent(format!("push payload: {}", e)))?,
                ),
                create: None,
            },
            "create" => WebhookEnvelope {
                push: None,
                create: Some(
                    serde_json::from_value(payload)
                        .map_err(|e| Error::MalformedEvent(format!("create payload: {}", e)))?,
                ),
            },
            _ => WebhookEnvelope::default(),
        };
        Event::from(envelope).validated()
    }

    /// Reject refs that cannot be handed to a build: commit ids must be hex,
    /// tag names must pass [`is_tag_name`]. Branch creates are never built.
    pub fn validated(self) -> Result<Self> {
        let problem = match &self {
            Event::Push {
                head_commit: Some(id),
            } if !is_commit_id(id) => Some(format!("head commit {:?} is not an object id", id)),
            Event::TagCreate {
                ref_name,
                ref_kind: RefKind::Tag,
            } if !is_tag_name(ref_name) => Some(format!("tag {:?} is not a valid ref", ref_name)),
            _ => None,
        };
        match problem {
            Some(reason) => Err(Error::MalformedEvent(reason)),
            None => Ok(self),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Push { .. } => "push",
            Event::TagCreate { .. } => "create",
            Event::Other => "other",
        }
    }
}

impl From<WebhookEnvelope> for Event {
    fn from(envelope: WebhookEnvelope) -> Self {
        if let Some(push) = envelope.push {
            let head_commit = push
                .head_commit
                .map(|c| c.id)
                .filter(|id| !id.trim().is_empty());
            Event::Push { head_commit }
        } else if let Some(create) = envelope.create {
            Event::TagCreate {
                ref_name: create.git_ref,
                ref_kind: create.ref_type,
            }
        } else {
            Event::Other
        }
    }
}

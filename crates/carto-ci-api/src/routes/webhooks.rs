//! GitHub webhook endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use carto_ci_core::event::Event;
use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/github", post(github_webhook))
}

/// Handle a GitHub delivery.
///
/// Answers as soon as the jobs are enqueued; builds are never awaited here.
async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let event_type = headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok());
    let delivery = headers
        .get("X-GitHub-Delivery")
        .and_then(|v| v.to_str().ok());

    if let Some(secret) = &state.webhook_secret {
        let signature = headers
            .get("X-Hub-Signature-256")
            .and_then(|v| v.to_str().ok());
        if !verify_github_signature(secret, &body, signature) {
            warn!(delivery = ?delivery, "Invalid webhook signature");
            return Err(ApiError::Unauthorized("invalid webhook signature".to_string()));
        }
    }

    // Without the header the body is the combined `{push, create}` envelope.
    let event = match event_type {
        Some("ping") => {
            info!(delivery = ?delivery, "Ping received, webhook is configured");
            return Ok((StatusCode::OK, Json(json!({ "status": "pong" }))));
        }
        Some(event_type) => {
            let payload: Value = serde_json::from_slice(&body)
                .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;
            Event::from_github(event_type, payload)?
        }
        None => Event::from_envelope_json(&body)?,
    };

    info!(event = event.kind(), delivery = ?delivery, "Received webhook");
    let dispatch = state.orchestrator.handle_event(event).await?;

    if dispatch.is_ignored() {
        return Ok((StatusCode::OK, Json(json!({ "status": "ignored" }))));
    }

    let jobs: Vec<String> = dispatch.jobs.iter().map(|id| id.to_string()).collect();
    let release = dispatch.release.as_deref().map(|r| {
        json!({
            "id": r.id,
            "tag": r.tag,
            "name": r.name,
            "draft": r.draft,
        })
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "dispatched",
            "jobs": jobs,
            "release": release,
        })),
    ))
}

/// Verify GitHub webhook signature.
fn verify_github_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        return false;
    };

    // Signature format: "sha256=<hex>"
    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}

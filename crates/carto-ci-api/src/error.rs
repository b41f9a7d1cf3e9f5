//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    /// A collaborator needed to proceed is not configured.
    ServiceUnavailable(String),
    /// The source-control host rejected a request.
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<carto_ci_core::Error> for ApiError {
    fn from(err: carto_ci_core::Error) -> Self {
        use carto_ci_core::Error;

        warn!(error = %err, "Request failed");
        match err {
            Error::MalformedEvent(_) | Error::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::CollaboratorUnavailable(_) => ApiError::ServiceUnavailable(err.to_string()),
            Error::PublishFailed(_) | Error::StatusFailed(_) => ApiError::BadGateway(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carto_ci_core::Error;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (Error::MalformedEvent("x".into()), StatusCode::BAD_REQUEST),
            (Error::CollaboratorUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::PublishFailed("x".into()), StatusCode::BAD_GATEWAY),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}

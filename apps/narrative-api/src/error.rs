//! Error types for the narrative API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use narrative_engine::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),

    #[error("No active configuration: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Conflict(msg) => ApiError::Conflict(msg),
            EngineError::MissingConfiguration(msg) => ApiError::Unavailable(msg),
            EngineError::InvalidDefinition(msg) => ApiError::InvalidRequest(msg),
            EngineError::Json(e) => ApiError::InvalidRequest(format!("Invalid JSON: {}", e)),
            EngineError::Store(msg) => ApiError::Store(msg),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => {
                tracing::warn!("Publish conflict: {}", msg);
                (
                    StatusCode::CONFLICT,
                    "Another configuration was published concurrently, try again".to_string(),
                )
            }
            ApiError::Unavailable(msg) => {
                tracing::error!("No active configuration: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "No questionnaire configuration is available".to_string(),
                )
            }
            ApiError::Store(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use narrative_engine::TemplateError;

    #[test]
    fn test_engine_errors_map_to_status_codes() {
        let cases = [
            (EngineError::Conflict("two active".into()), StatusCode::CONFLICT),
            (
                EngineError::MissingConfiguration("empty".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                EngineError::InvalidDefinition("no pages".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                EngineError::Template(TemplateError::Unclosed(0)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                EngineError::Store("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_store_failure_hides_details() {
        let response = ApiError::from(EngineError::Store("disk I/O error at /var/db".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Storage error");
        assert_eq!(body["status"], 500);
    }
}

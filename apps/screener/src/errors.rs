use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::batch::report::ReportError;
use crate::batch::BatchError;
use crate::parsing::ParseError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Requirement extraction failed: {0}")]
    Requirements(ParseError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            e @ BatchError::EmptyJobDescription => AppError::Validation(e.to_string()),
            BatchError::Requirements(e) => AppError::Requirements(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Multipart(e) => (e.status(), "INVALID_UPLOAD", e.body_text()),
            AppError::Requirements(e) => {
                tracing::error!("Requirement extraction failed: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "REQUIREMENTS_ERROR",
                    format!("Could not extract requirements from the job description: {e}"),
                )
            }
            AppError::Report(e) => {
                tracing::error!("Report error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REPORT_ERROR",
                    "The report could not be generated".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_envelope() {
        let response = AppError::from(BatchError::EmptyJobDescription).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Job description is empty");
    }

    #[tokio::test]
    async fn test_requirement_failure_is_bad_gateway() {
        let err = BatchError::Requirements(ParseError::MalformedResponse("nope".to_string()));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "REQUIREMENTS_ERROR");
    }

    #[tokio::test]
    async fn test_report_error_hides_details() {
        let err = ReportError::Buffer("secret detail".to_string());
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "The report could not be generated");
    }
}

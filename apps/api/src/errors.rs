use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classify::ClassifierError;
use crate::extract::ExtractError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// User-input failures map to 400 with a descriptive message; everything else
/// is logged server-side and answered with a generic 500 body. Internal detail
/// never reaches the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no file part in multipart form")]
    MissingFilePart,

    #[error("empty filename in upload")]
    EmptySelectedFile,

    #[error("malformed multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MissingFilePart => (StatusCode::BAD_REQUEST, "No file part".to_string()),
            AppError::EmptySelectedFile => {
                (StatusCode::BAD_REQUEST, "No selected file".to_string())
            }
            AppError::Multipart(e) => {
                tracing::debug!("Malformed multipart request: {e}");
                (
                    StatusCode::BAD_REQUEST,
                    "Invalid multipart form data".to_string(),
                )
            }
            AppError::Extraction(e) => {
                tracing::debug!("Text extraction failed: {e}");
                (
                    StatusCode::BAD_REQUEST,
                    "Could not extract text from the resume".to_string(),
                )
            }
            AppError::Classifier(ClassifierError::NoKnownTokens) => (
                StatusCode::BAD_REQUEST,
                "Tokenization failed: No valid words found in resume.".to_string(),
            ),
            AppError::Classifier(e) => {
                tracing::error!("Classifier error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

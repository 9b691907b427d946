use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        ErrorResponse {
            error: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(message: &str, details: impl Into<String>) -> Self {
        ErrorResponse {
            error: message.to_string(),
            details: Some(details.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image provided")]
    MissingImage,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid multipart body")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // Body-limit breaches surface here as 413.
            ApiError::Multipart(e) => (
                e.status(),
                ErrorResponse::with_details(&self.to_string(), e.body_text()),
            ),
            _ => (StatusCode::BAD_REQUEST, ErrorResponse::new(&self.to_string())),
        };
        (status, Json(body)).into_response()
    }
}

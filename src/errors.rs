use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const NO_IMAGE_PROVIDED: &str = "No image file provided.";
pub const NO_IMAGE_SELECTED: &str = "No image file selected.";
pub const PARSE_FAILURE: &str = "Failed to parse the response from the AI model.";

/// Every way an analyze request can fail, mapped 1:1 onto a JSON error body.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Failed to parse the response from the AI model.")]
    UpstreamParseFailure { raw_response: String },

    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl AnalyzeError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnalyzeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::UpstreamParseFailure { .. } | AnalyzeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AnalyzeError::UpstreamParseFailure { raw_response } => json!({
                "error": PARSE_FAILURE,
                "raw_response": raw_response,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AnalyzeError {
    fn from(err: anyhow::Error) -> Self {
        AnalyzeError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AnalyzeError {
    fn from(err: tokio::task::JoinError) -> Self {
        AnalyzeError::Internal(format!("image preprocessing task failed: {}", err))
    }
}

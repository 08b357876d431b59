use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::jobs::control::RunJobResponse;

/// Errors the admin API reports in the same `{"success": false, "error": "..."}`
/// shape as a failed run.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Job '{0}' not found")]
    JobNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
        };

        (status, Json(RunJobResponse::failure(self.to_string()))).into_response()
    }
}

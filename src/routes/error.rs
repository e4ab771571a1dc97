//! API error type and status mapping.
//!
//! Every error response is JSON of the form `{ "message": string }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use crate::services::workspace::WorkspaceError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("internal error")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "message": self.to_string() }))).into_response()
    }
}

pub(crate) fn workspace_error_to_api(err: WorkspaceError) -> ApiError {
    match err {
        WorkspaceError::NotFound { .. } => ApiError::NotFound(err.to_string()),
        WorkspaceError::Invalid { reason, .. } => ApiError::Validation(reason.to_string()),
        WorkspaceError::Database(e) => {
            error!(error = %e, "workspace database error");
            ApiError::Internal
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

//! Maps domain errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cs_core::AppError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

/// Store errors arrive as `anyhow`. Domain errors inside keep their status;
/// anything else is an internal failure.
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<AppError>() {
            Ok(app) => Self(app),
            Err(other) => Self(AppError::Internal(other.to_string())),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidSession(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(error = %self.0, "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_wrapped_domain_errors_keep_their_status() {
        let wrapped = anyhow::Error::from(AppError::NotFound("Submission".into(), "x".into()));
        assert_eq!(ApiError::from(wrapped).status(), StatusCode::NOT_FOUND);

        let opaque = anyhow::anyhow!("disk on fire");
        let err = ApiError::from(opaque);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.0, AppError::Internal("disk on fire".into()));
    }

    #[test]
    fn validation_is_unprocessable() {
        let err = ApiError::from(AppError::ValidationError("imgCount".into()));
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

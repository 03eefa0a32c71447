//! Unified error handling for the app's JSON surface.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::compositor::CompositorError;
use crate::db::RepositoryError;
use crate::pinterest::PinterestError;
use crate::shopify::AdminShopifyError;

/// Application-level error type.
///
/// Every handler converts failures into a JSON `{error}` envelope:
/// validation problems answer 400, everything else answers 500.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed client input.
    #[error("{0}")]
    Validation(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// Pinterest API operation failed.
    #[error("Pinterest error: {0}")]
    Pinterest(#[from] PinterestError),

    /// Image compositing failed.
    #[error("Compositor error: {0}")]
    Compositor(#[from] CompositorError),

    /// A polling loop ran out of time before reaching a terminal status.
    #[error("Processing timed out: {0}")]
    ProcessingTimeout(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry; validation noise stays local
        if !matches!(self, Self::Validation(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Validation("No image provided".to_string());
        assert_eq!(err.to_string(), "No image provided");

        let err = AppError::Internal("boom".to_string());
        assert_eq!(err.to_string(), "Internal error: boom");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::ProcessingTimeout("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

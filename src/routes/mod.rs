//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//!
//! # Publishing
//! POST /app/upload             - Composite + upload an image, tag the product
//! POST /app/pin                - Publish a pin directly via the Pinterest API
//! POST /app/pin_url            - Build a pre-filled pin-create link
//! GET  /app/boards             - List Pinterest boards
//!
//! # Catalog
//! GET  /app/products           - Tag-filtered product views (?view=...)
//! GET  /app/products/{id}      - Product detail
//! GET  /app/pinned             - Mirrored status records (?status=...)
//! GET  /app/collections        - Collections for the filter dropdown
//!
//! # Status management
//! POST /app/mark_published     - Tag a product as published
//! POST /app/ignore             - Tag a product as ignored
//! POST /app/reset_tags         - Reset one product to unprocessed
//! POST /app/reset_all_tags     - Bulk reset (up to 50 per call)
//! POST /app/restore_product    - Remove the ignored marker
//!
//! # Settings & session
//! GET  /api/settings           - Shop settings blob
//! PUT  /api/settings           - Merge-write settings
//! GET  /app/session            - Stored session snapshot
//! PUT  /app/session            - Persist session snapshot
//! DELETE /app/session          - Discard session snapshot
//! ```
//!
//! Every endpoint answers a JSON envelope: `{"success": true, ...}` or
//! `{"error": "..."}` with 400 for validation failures and 500 otherwise.

pub mod pins;
pub mod products;
pub mod session;
pub mod settings;
pub mod tags;
pub mod upload;

use axum::Router;
use axum::extract::FromRequest;
use base64::Engine as _;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejection answers the `{error}` envelope
/// with a 400 instead of axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub(crate) struct AppJson<T>(pub T);

/// Tag marking a product as published to Pinterest.
pub const PUBLISHED_TAG: &str = "Pinterest Published";

/// Tag marking a product as deliberately skipped.
pub const IGNORED_TAG: &str = "Pinterest Ignored";

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(upload::router())
        .merge(pins::router())
        .merge(products::router())
        .merge(tags::router())
        .merge(settings::router())
        .merge(session::router())
}

/// Decode a client-supplied image payload: either a bare base64 string or
/// a `data:image/...;base64,` URL.
pub(crate) fn decode_image_payload(payload: &str) -> Result<Vec<u8>, AppError> {
    if payload.is_empty() {
        return Err(AppError::Validation("No image provided".to_string()));
    }

    let data = payload
        .rsplit_once(',')
        .map_or(payload, |(_, data)| data);

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|_| AppError::Validation("Invalid image format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode, header};
    use axum::routing::post;
    use serde_json::json;
    use tower::ServiceExt;

    #[derive(serde::Deserialize)]
    struct NamePayload {
        name: String,
    }

    async fn echo_name(AppJson(payload): AppJson<NamePayload>) -> axum::Json<serde_json::Value> {
        axum::Json(json!({ "success": true, "name": payload.name }))
    }

    #[tokio::test]
    async fn malformed_json_body_answers_the_error_envelope() {
        let app = Router::new().route("/echo", post(echo_name));

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"other": 1}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json envelope");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn well_formed_json_body_passes_through() {
        let app = Router::new().route("/echo", post(echo_name));

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"name": "mala"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn decode_accepts_data_urls_and_bare_base64() {
        let bytes = decode_image_payload("data:image/jpeg;base64,aGk=").expect("data url");
        assert_eq!(bytes, b"hi");

        let bytes = decode_image_payload("aGk=").expect("bare base64");
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn decode_rejects_empty_and_malformed_payloads() {
        assert!(matches!(
            decode_image_payload(""),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            decode_image_payload("data:image/jpeg;base64,!!!"),
            Err(AppError::Validation(_))
        ));
    }
}

//! Direct publishing through the Pinterest API.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AppJson, decode_image_payload};
use crate::{
    error::AppError,
    pin_url::{self, UrlMode},
    pinterest::{Board, NewPin},
    state::AppState,
};

/// Ceiling imposed on the whole publish pipeline; the media poll itself
/// is unbounded.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the pins router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/boards", get(boards))
        .route("/app/pin", post(create_pin))
        .route("/app/pin_url", post(generate_pin_url))
}

/// Response for the boards endpoint.
#[derive(Debug, Serialize)]
pub struct BoardsResponse {
    pub success: bool,
    pub boards: Vec<Board>,
}

/// List the authenticated account's boards.
///
/// # Errors
///
/// Returns an error if the Pinterest API call fails.
#[instrument(skip(state))]
pub async fn boards(State(state): State<AppState>) -> Result<Json<BoardsResponse>, AppError> {
    let boards = state.pinterest().boards().await?;
    Ok(Json(BoardsResponse {
        success: true,
        boards,
    }))
}

/// Request for the direct-publish endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePinRequest {
    #[serde(default)]
    pub board_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    /// Image bytes as base64 or a data URL; absence fails validation.
    #[serde(default)]
    pub image: String,
}

/// Response for the direct-publish endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePinResponse {
    pub success: bool,
    pub pin_id: String,
}

/// Publish a pin from raw image bytes via register / upload / poll /
/// create.
///
/// # Errors
///
/// Returns a validation error for missing board or image, a timeout
/// error when the pipeline exceeds its deadline, and a server error for
/// any failing remote step.
#[instrument(skip(state, body), fields(board_id = %body.board_id))]
pub async fn create_pin(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreatePinRequest>,
) -> Result<Json<CreatePinResponse>, AppError> {
    if body.board_id.is_empty() {
        return Err(AppError::Validation("No board provided".to_string()));
    }
    let bytes = decode_image_payload(&body.image)?;

    let pin = NewPin {
        board_id: body.board_id,
        title: body.title,
        description: body.description,
        link: body.link,
    };

    let published = tokio::time::timeout(
        PUBLISH_TIMEOUT,
        state.pinterest().publish_pin(&pin, bytes),
    )
    .await
    .map_err(|_| AppError::ProcessingTimeout("Pinterest media processing".to_string()))??;

    Ok(Json(CreatePinResponse {
        success: true,
        pin_id: published.id,
    }))
}

/// Request for pin-create link generation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinUrlRequest {
    #[serde(default)]
    pub product_id: String,
    /// Public URL of the cropped image to pin.
    #[serde(default)]
    pub media_url: String,
    /// "custom" routes the destination through `custom_domain`; anything
    /// else uses the product's store URL.
    #[serde(default)]
    pub url_mode: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
}

/// Response for pin-create link generation.
#[derive(Debug, Serialize)]
pub struct PinUrlResponse {
    pub success: bool,
    pub url: String,
}

/// Build a pre-filled pin-create link for the manual publishing flow.
///
/// # Errors
///
/// Returns a validation error for a missing product or media URL,
/// otherwise any catalog failure.
#[instrument(skip(state, body), fields(product_id = %body.product_id))]
pub async fn generate_pin_url(
    State(state): State<AppState>,
    AppJson(body): AppJson<PinUrlRequest>,
) -> Result<Json<PinUrlResponse>, AppError> {
    if body.product_id.is_empty() {
        return Err(AppError::Validation("Missing Product ID".to_string()));
    }
    if body.media_url.is_empty() {
        return Err(AppError::Validation("No image provided".to_string()));
    }

    let Some(product) = state.shopify().get_product(&body.product_id).await? else {
        return Err(AppError::Validation("Product not found".to_string()));
    };

    let mode = match body.url_mode.as_deref() {
        Some("custom") => UrlMode::Custom,
        _ => UrlMode::StoreUrl,
    };

    let destination =
        pin_url::destination_url(&product, state.shop(), mode, body.custom_domain.as_deref());
    let description = pin_url::pin_description(&product);
    let url = pin_url::pin_create_url(&destination, &body.media_url, &description);

    Ok(Json(PinUrlResponse { success: true, url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_deserializes_and_fails_field_validation() {
        let body: CreatePinRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(body.board_id.is_empty());
        assert!(body.image.is_empty());

        let body: PinUrlRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(body.product_id.is_empty());
        assert!(body.media_url.is_empty());
    }
}

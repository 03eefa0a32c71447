//! Upload + tag endpoint: composite the crop, publish it as a Shopify
//! file, and mark the product published.

use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AppJson, PUBLISHED_TAG, decode_image_payload};
use crate::{
    compositor::{self, CropRect, Flip, WatermarkSpec},
    db,
    error::AppError,
    models::{NewPinnedProduct, PinStatus},
    shopify::files,
    state::AppState,
};

/// Build the upload router.
pub fn router() -> Router<AppState> {
    Router::new().route("/app/upload", post(upload))
}

/// Request for the upload endpoint.
///
/// `crop` triggers server-side compositing; without it the payload is
/// uploaded as-is (the client already rendered the final image).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Image bytes as base64 or a data URL; absence fails validation.
    #[serde(default)]
    pub image: String,
    /// Product to tag as published once the upload succeeds.
    pub product_id: Option<String>,
    pub crop: Option<CropRect>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub flip: Flip,
    pub watermark: Option<WatermarkSpec>,
}

/// Response for the upload endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// May be null when Shopify hadn't finished processing within the
    /// poll budget; the file exists and the URL resolves later.
    pub image_url: Option<String>,
    pub file_id: String,
}

/// Composite (if crop data is present), upload as a managed file, then
/// tag the product and mirror its published status.
///
/// # Errors
///
/// Returns a validation error for a missing or undecodable image, and a
/// server error if any pipeline step fails.
#[instrument(skip(state, body), fields(product_id = ?body.product_id))]
pub async fn upload(
    State(state): State<AppState>,
    AppJson(body): AppJson<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let bytes = decode_image_payload(&body.image)?;

    let bytes = match body.crop {
        Some(crop) => compositor::composite(
            &bytes,
            crop,
            body.rotation,
            body.flip,
            body.watermark.as_ref(),
        )?,
        None => bytes,
    };

    let filename = format!("pinterest-crop-{}.jpg", Utc::now().timestamp_millis());
    let result = files::upload_image(state.shopify(), bytes, &filename).await?;

    if let Some(product_id) = &body.product_id {
        state
            .shopify()
            .tags_add(product_id, &[PUBLISHED_TAG])
            .await?;

        if let Some(product) = state.shopify().get_product(product_id).await? {
            let image_url = result
                .url
                .clone()
                .or_else(|| product.images.first().map(|i| i.url.clone()))
                .unwrap_or_default();

            db::pinned_products::upsert_status(
                state.pool(),
                NewPinnedProduct {
                    shop: state.shop().to_string(),
                    product_id: product.id,
                    product_handle: product.handle,
                    title: product.title,
                    image_url,
                    status: PinStatus::Published,
                },
            )
            .await?;
        }
    }

    Ok(Json(UploadResponse {
        success: true,
        image_url: result.url,
        file_id: result.id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_field_fails_validation_not_deserialization() {
        let body: UploadRequest =
            serde_json::from_str(r#"{"productId": "gid://shopify/Product/1"}"#)
                .expect("deserialize without image");
        assert!(body.image.is_empty());

        let err = decode_image_payload(&body.image).expect_err("must fail");
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "No image provided");
    }
}

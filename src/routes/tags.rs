//! Status management: tagging products and mirroring the decision into
//! the catalog status store.

use axum::{Json, Router, extract::State, routing::post};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AppJson, IGNORED_TAG, PUBLISHED_TAG};
use crate::{
    db,
    error::AppError,
    models::{NewPinnedProduct, PinStatus},
    state::AppState,
};

/// Bulk reset page size; repeated invocations drain larger sets.
const BULK_RESET_LIMIT: i64 = 50;

/// Build the tags router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/mark_published", post(mark_published))
        .route("/app/ignore", post(ignore))
        .route("/app/reset_tags", post(reset_tags))
        .route("/app/reset_all_tags", post(reset_all_tags))
        .route("/app/restore_product", post(restore_product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductIdRequest {
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

fn require_product_id(body: &ProductIdRequest) -> Result<&str, AppError> {
    body.product_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing Product ID".to_string()))
}

/// Mark a product published: add the tag, then mirror the decision.
///
/// # Errors
///
/// Returns a validation error without a product ID, otherwise any tag or
/// database failure.
#[instrument(skip(state, body))]
pub async fn mark_published(
    State(state): State<AppState>,
    AppJson(body): AppJson<ProductIdRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let product_id = require_product_id(&body)?;

    state.shopify().tags_add(product_id, &[PUBLISHED_TAG]).await?;
    mirror_status(&state, product_id, PinStatus::Published).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Mark a product ignored: add the tag, then mirror the decision.
///
/// # Errors
///
/// Returns a validation error without a product ID, otherwise any tag or
/// database failure.
#[instrument(skip(state, body))]
pub async fn ignore(
    State(state): State<AppState>,
    AppJson(body): AppJson<ProductIdRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let product_id = require_product_id(&body)?;

    state.shopify().tags_add(product_id, &[IGNORED_TAG]).await?;
    mirror_status(&state, product_id, PinStatus::Ignored).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Record the decision in the status store, replacing any previous one.
async fn mirror_status(
    state: &AppState,
    product_id: &str,
    status: PinStatus,
) -> Result<(), AppError> {
    let Some(product) = state.shopify().get_product(product_id).await? else {
        return Ok(());
    };

    db::pinned_products::upsert_status(
        state.pool(),
        NewPinnedProduct {
            shop: state.shop().to_string(),
            product_id: product.id,
            product_handle: product.handle,
            title: product.title,
            image_url: product.images.first().map(|i| i.url.clone()).unwrap_or_default(),
            status,
        },
    )
    .await?;

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ResetTagsResponse {
    pub success: bool,
    pub tags: Vec<String>,
}

/// Reset one product to unprocessed: delete its status record, then strip
/// the published marker from its tag set.
///
/// # Errors
///
/// Returns a validation error without a product ID, otherwise any tag or
/// database failure.
#[instrument(skip(state, body))]
pub async fn reset_tags(
    State(state): State<AppState>,
    AppJson(body): AppJson<ProductIdRequest>,
) -> Result<Json<ResetTagsResponse>, AppError> {
    let product_id = require_product_id(&body)?;

    db::pinned_products::clear_status(state.pool(), state.shop(), product_id).await?;

    let Some(product) = state.shopify().get_product(product_id).await? else {
        return Err(AppError::Validation("Product not found".to_string()));
    };

    let new_tags = strip_tag(&product.tags, PUBLISHED_TAG);
    if new_tags.len() != product.tags.len() {
        state.shopify().update_tags(product_id, &new_tags).await?;
    }

    Ok(Json(ResetTagsResponse {
        success: true,
        tags: new_tags,
    }))
}

#[derive(Debug, Serialize)]
pub struct ResetAllResponse {
    pub success: bool,
    /// Number of products whose tags were actually reset.
    pub count: usize,
    /// True when a full page was fetched; call again to keep draining.
    pub remaining: bool,
}

/// Bulk reset: strip the published marker from up to 50 tagged products.
///
/// The per-product updates are fanned out concurrently and joined; a
/// failing sibling doesn't cancel the others and the response reports the
/// aggregate count rather than itemized failures.
///
/// # Errors
///
/// Returns an error only if the initial catalog query fails.
#[instrument(skip(state))]
pub async fn reset_all_tags(
    State(state): State<AppState>,
) -> Result<Json<ResetAllResponse>, AppError> {
    let products = state
        .shopify()
        .products_by_query(
            &format!("tag:'{PUBLISHED_TAG}'"),
            BULK_RESET_LIMIT,
        )
        .await?;

    let fetched = products.len();
    if fetched == 0 {
        return Ok(Json(ResetAllResponse {
            success: true,
            count: 0,
            remaining: false,
        }));
    }

    let updates = products.into_iter().filter_map(|product| {
        let new_tags = strip_tag(&product.tags, PUBLISHED_TAG);
        // Double check: skip if the marker is somehow already gone
        if new_tags.len() == product.tags.len() {
            return None;
        }
        let shopify = state.shopify().clone();
        Some(async move { shopify.update_tags(&product.id, &new_tags).await })
    });

    let results = join_all(updates).await;
    let count = results.iter().filter(|r| r.is_ok()).count();

    for result in results {
        if let Err(e) = result {
            tracing::warn!(error = %e, "bulk tag reset: product update failed");
        }
    }

    #[allow(clippy::cast_sign_loss)]
    let remaining = fetched == BULK_RESET_LIMIT as usize;

    Ok(Json(ResetAllResponse {
        success: true,
        count,
        remaining,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    pub product_id: Option<String>,
    /// Tag to remove; defaults to the ignored marker.
    pub tag: Option<String>,
}

/// Remove the ignored marker (or a caller-specified tag) and clear the
/// product's status record.
///
/// # Errors
///
/// Returns a validation error without a product ID, otherwise any tag or
/// database failure.
#[instrument(skip(state, body))]
pub async fn restore_product(
    State(state): State<AppState>,
    AppJson(body): AppJson<RestoreRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let product_id = body
        .product_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Missing Product ID".to_string()))?;

    let tag = body.tag.as_deref().unwrap_or(IGNORED_TAG);

    state.shopify().tags_remove(product_id, &[tag]).await?;
    db::pinned_products::clear_status(state.pool(), state.shop(), product_id).await?;

    Ok(Json(SuccessResponse { success: true }))
}

fn strip_tag(tags: &[String], tag: &str) -> Vec<String> {
    tags.iter().filter(|t| *t != tag).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tag_removes_only_the_marker() {
        let tags = vec![
            "Summer".to_string(),
            PUBLISHED_TAG.to_string(),
            "Sale".to_string(),
        ];
        assert_eq!(strip_tag(&tags, PUBLISHED_TAG), vec!["Summer", "Sale"]);
    }

    #[test]
    fn strip_tag_is_a_no_op_without_the_marker() {
        let tags = vec!["Summer".to_string()];
        assert_eq!(strip_tag(&tags, PUBLISHED_TAG), tags);
    }

    #[test]
    fn missing_product_id_fails_validation() {
        let body = ProductIdRequest { product_id: None };
        assert!(require_product_id(&body).is_err());

        let body = ProductIdRequest {
            product_id: Some(String::new()),
        };
        assert!(require_product_id(&body).is_err());

        let body = ProductIdRequest {
            product_id: Some("gid://shopify/Product/1".to_string()),
        };
        assert_eq!(require_product_id(&body).expect("id"), "gid://shopify/Product/1");
    }
}

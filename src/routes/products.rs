//! Catalog views: product detail, tag-filtered listings, mirrored status
//! records and the collection filter.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{IGNORED_TAG, PUBLISHED_TAG};
use crate::{
    db,
    error::AppError,
    models::{PinStatus, PinnedProduct},
    shopify::types::AdminProduct,
    state::AppState,
};

/// Page size for catalog views and bulk operations.
const PAGE_SIZE: i64 = 50;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/products", get(list_products))
        .route("/app/products/{id}", get(product_detail))
        .route("/app/pinned", get(list_pinned))
        .route("/app/collections", get(list_collections))
}

/// Which tag-filtered slice of the catalog to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductView {
    #[default]
    Unpublished,
    Published,
    Ignored,
}

impl ProductView {
    /// The Shopify search query for this view.
    #[must_use]
    pub fn catalog_query(self) -> String {
        match self {
            Self::Unpublished => {
                format!("-tag:'{PUBLISHED_TAG}' -tag:'{IGNORED_TAG}' status:active")
            }
            Self::Published => format!("tag:'{PUBLISHED_TAG}' status:active"),
            Self::Ignored => format!("tag:'{IGNORED_TAG}' status:active"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub view: ProductView,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<AdminProduct>,
}

/// List products for a tag-filtered view.
///
/// The unpublished view drops products without images: there is nothing
/// to pin for them.
///
/// # Errors
///
/// Returns an error if the catalog query fails.
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<ProductsResponse>, AppError> {
    let products = state
        .shopify()
        .products_by_query(&query.view.catalog_query(), PAGE_SIZE)
        .await?;

    let products = match query.view {
        ProductView::Unpublished => products
            .into_iter()
            .filter(|p| !p.images.is_empty())
            .collect(),
        _ => products,
    };

    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductDetailResponse {
    pub success: bool,
    pub product: Option<AdminProduct>,
}

/// Fetch one product's full detail (description, URL, images, tags).
///
/// # Errors
///
/// Returns an error if the catalog query fails.
#[instrument(skip(state))]
pub async fn product_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetailResponse>, AppError> {
    let product = state.shopify().get_product(&id).await?;
    Ok(Json(ProductDetailResponse {
        success: true,
        product,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListPinnedQuery {
    pub status: PinStatus,
}

#[derive(Debug, Serialize)]
pub struct PinnedResponse {
    pub success: bool,
    pub products: Vec<PinnedProduct>,
}

/// List the mirrored status records for a status, newest first.
///
/// Answers "what has been processed" without a catalog round-trip.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip(state))]
pub async fn list_pinned(
    State(state): State<AppState>,
    Query(query): Query<ListPinnedQuery>,
) -> Result<Json<PinnedResponse>, AppError> {
    let products =
        db::pinned_products::list_by_status(state.pool(), state.shop(), query.status).await?;

    Ok(Json(PinnedResponse {
        success: true,
        products,
    }))
}

/// A collection as a label/value pair for the filter dropdown.
#[derive(Debug, Serialize)]
pub struct CollectionOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct CollectionsResponse {
    pub success: bool,
    pub collections: Vec<CollectionOption>,
}

/// List collections sorted by title.
///
/// # Errors
///
/// Returns an error if the catalog query fails.
#[instrument(skip(state))]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<CollectionsResponse>, AppError> {
    let collections = state
        .shopify()
        .collections()
        .await?
        .into_iter()
        .map(|c| CollectionOption {
            label: c.title,
            value: c.id,
        })
        .collect();

    Ok(Json(CollectionsResponse {
        success: true,
        collections,
    }))
}

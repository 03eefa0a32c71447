//! Catalog status store.
//!
//! Records whether a product has been published to or ignored for
//! Pinterest, so catalog views don't have to re-query Shopify for tags.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{NewPinnedProduct, PinStatus, PinnedProduct};

/// Replace any existing status record for (shop, `product_id`) with a fresh
/// one carrying the new status.
///
/// Status transitions (e.g. published -> ignored) are whole-record
/// replacements, so this is a delete-then-insert inside one transaction:
/// concurrent readers never observe a duplicate or a missing row for a
/// product that has a current status.
///
/// # Errors
///
/// Returns an error if the transaction fails.
pub async fn upsert_status(
    pool: &PgPool,
    record: NewPinnedProduct,
) -> Result<PinnedProduct, RepositoryError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM pinned_products WHERE shop = $1 AND product_id = $2")
        .bind(&record.shop)
        .bind(&record.product_id)
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query_as::<_, PinnedProduct>(
        r"
        INSERT INTO pinned_products (shop, product_id, product_handle, title, image_url, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, shop, product_id, product_handle, title, image_url, status, created_at
        ",
    )
    .bind(&record.shop)
    .bind(&record.product_id)
    .bind(&record.product_handle)
    .bind(&record.title)
    .bind(&record.image_url)
    .bind(record.status.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(row)
}

/// List a shop's records with the given status, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list_by_status(
    pool: &PgPool,
    shop: &str,
    status: PinStatus,
) -> Result<Vec<PinnedProduct>, RepositoryError> {
    let rows = sqlx::query_as::<_, PinnedProduct>(
        r"
        SELECT id, shop, product_id, product_handle, title, image_url, status, created_at
        FROM pinned_products
        WHERE shop = $1 AND status = $2
        ORDER BY created_at DESC
        ",
    )
    .bind(shop)
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Remove the record for (shop, `product_id`), returning the product to
/// "unprocessed". Removing a record that doesn't exist is not an error.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn clear_status(
    pool: &PgPool,
    shop: &str,
    product_id: &str,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM pinned_products WHERE shop = $1 AND product_id = $2")
        .bind(shop)
        .bind(product_id)
        .execute(pool)
        .await?;

    Ok(())
}

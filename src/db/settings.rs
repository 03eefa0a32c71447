//! Shop settings storage.
//!
//! One JSONB blob per shop with read-merge-write update semantics: an
//! update merges the new partial object over the stored one, it never
//! replaces the blob wholesale.

use serde_json::{Map, Value as JsonValue};
use sqlx::PgPool;

use super::RepositoryError;

/// Get a shop's settings blob.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_settings(pool: &PgPool, shop: &str) -> Result<Option<JsonValue>, RepositoryError> {
    let result =
        sqlx::query_scalar::<_, JsonValue>("SELECT settings FROM shop_settings WHERE shop = $1")
            .bind(shop)
            .fetch_optional(pool)
            .await?;

    Ok(result)
}

/// Merge a partial settings object over the stored blob and persist it.
///
/// Keys present in `partial` win; keys absent from it are preserved.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_settings(
    pool: &PgPool,
    shop: &str,
    partial: &JsonValue,
) -> Result<JsonValue, RepositoryError> {
    let existing = get_settings(pool, shop)
        .await?
        .unwrap_or_else(|| JsonValue::Object(Map::new()));

    let merged = merge(existing, partial);

    sqlx::query(
        r"
        INSERT INTO shop_settings (shop, settings)
        VALUES ($1, $2)
        ON CONFLICT (shop) DO UPDATE SET settings = EXCLUDED.settings
        ",
    )
    .bind(shop)
    .bind(&merged)
    .execute(pool)
    .await?;

    Ok(merged)
}

/// Shallow merge of `partial` over `base`. Non-object inputs fall back to
/// taking `partial` wholesale.
fn merge(base: JsonValue, partial: &JsonValue) -> JsonValue {
    match (base, partial) {
        (JsonValue::Object(mut base_map), JsonValue::Object(partial_map)) => {
            for (key, value) in partial_map {
                base_map.insert(key.clone(), value.clone());
            }
            JsonValue::Object(base_map)
        }
        (_, partial) => partial.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overlays_new_keys_and_keeps_old_ones() {
        let base = json!({"urlMode": "default", "customDomain": "https://a.example"});
        let partial = json!({"urlMode": "custom"});

        let merged = merge(base, &partial);

        assert_eq!(merged["urlMode"], "custom");
        assert_eq!(merged["customDomain"], "https://a.example");
    }

    #[test]
    fn merge_replaces_non_object_base() {
        let merged = merge(JsonValue::Null, &json!({"a": 1}));
        assert_eq!(merged, json!({"a": 1}));
    }
}

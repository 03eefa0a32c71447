//! Shop settings endpoint: a JSONB blob per shop with merge-write
//! update semantics.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use serde_json::{Value as JsonValue, json};
use tracing::instrument;

use super::AppJson;
use crate::{db, error::AppError, state::AppState};

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/api/settings", put(update_settings))
}

/// Read the shop's settings blob; an empty object if nothing is stored.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip(state))]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<JsonValue>, AppError> {
    let settings = db::settings::get_settings(state.pool(), state.shop())
        .await?
        .unwrap_or_else(|| json!({}));

    Ok(Json(settings))
}

/// Merge a partial settings object over the stored blob.
///
/// # Errors
///
/// Returns a validation error for a non-object body, otherwise any
/// database failure.
#[instrument(skip(state, body))]
pub async fn update_settings(
    State(state): State<AppState>,
    AppJson(body): AppJson<JsonValue>,
) -> Result<Json<JsonValue>, AppError> {
    if !body.is_object() {
        return Err(AppError::Validation(
            "Settings must be a JSON object".to_string(),
        ));
    }

    db::settings::update_settings(state.pool(), state.shop(), &body).await?;

    Ok(Json(json!({ "success": true })))
}

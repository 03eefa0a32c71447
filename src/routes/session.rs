//! Session persistence endpoint: the client checkpoints its working
//! queue here and restores it after a reload.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, put},
};
use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use super::AppJson;
use crate::{
    error::AppError,
    session::{PgSnapshotStore, SessionSnapshot, SnapshotStore},
    state::AppState,
};

/// Build the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/app/session", get(load_session))
        .route("/app/session", put(save_session))
        .route("/app/session", delete(clear_session))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: Option<SessionSnapshot>,
}

/// Load the stored snapshot, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
#[instrument(skip(state))]
pub async fn load_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let store = PgSnapshotStore::new(state.pool().clone());
    let session = store.load(state.shop()).await?;

    Ok(Json(SessionResponse {
        success: true,
        session,
    }))
}

/// Persist a snapshot, replacing any previous one.
///
/// # Errors
///
/// Returns an error if the database operation fails.
#[instrument(skip(state, snapshot))]
pub async fn save_session(
    State(state): State<AppState>,
    AppJson(snapshot): AppJson<SessionSnapshot>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = PgSnapshotStore::new(state.pool().clone());
    store.save(state.shop(), &snapshot).await?;

    Ok(Json(json!({ "success": true })))
}

/// Discard the stored snapshot.
///
/// # Errors
///
/// Returns an error if the database operation fails.
#[instrument(skip(state))]
pub async fn clear_session(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let store = PgSnapshotStore::new(state.pool().clone());
    store.clear(state.shop()).await?;

    Ok(Json(json!({ "success": true })))
}

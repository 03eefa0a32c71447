//! Snapshot persistence.
//!
//! The storage medium is injectable: handlers use the Postgres-backed
//! store (the snapshot rides in the shop's settings blob under the
//! session key), tests use the in-memory one.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::json;
use sqlx::PgPool;

use super::{STATE_PREFIX, SessionSnapshot};
use crate::db::{self, RepositoryError};

/// Settings-blob key the snapshot is stored under.
fn session_key() -> String {
    format!("{STATE_PREFIX}:session")
}

/// Durable storage for session snapshots.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    /// Load the stored snapshot for a shop, if any.
    async fn load(&self, shop: &str) -> Result<Option<SessionSnapshot>, RepositoryError>;

    /// Persist a snapshot for a shop, replacing any previous one.
    async fn save(&self, shop: &str, snapshot: &SessionSnapshot) -> Result<(), RepositoryError>;

    /// Discard a shop's snapshot.
    async fn clear(&self, shop: &str) -> Result<(), RepositoryError>;
}

/// Postgres-backed store; the snapshot lives in `shop_settings` so it
/// shares the settings read-merge-write machinery.
#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SnapshotStore for PgSnapshotStore {
    async fn load(&self, shop: &str) -> Result<Option<SessionSnapshot>, RepositoryError> {
        let Some(settings) = db::settings::get_settings(&self.pool, shop).await? else {
            return Ok(None);
        };

        match settings.get(session_key()) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    async fn save(&self, shop: &str, snapshot: &SessionSnapshot) -> Result<(), RepositoryError> {
        let partial = json!({ session_key(): serde_json::to_value(snapshot)? });
        db::settings::update_settings(&self.pool, shop, &partial).await?;
        Ok(())
    }

    async fn clear(&self, shop: &str) -> Result<(), RepositoryError> {
        let partial = json!({ session_key(): serde_json::Value::Null });
        db::settings::update_settings(&self.pool, shop, &partial).await?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<String, SessionSnapshot>>,
}

impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, shop: &str) -> Result<Option<SessionSnapshot>, RepositoryError> {
        Ok(self
            .snapshots
            .lock()
            .map_err(|_| RepositoryError::NotFound)?
            .get(shop)
            .cloned())
    }

    async fn save(&self, shop: &str, snapshot: &SessionSnapshot) -> Result<(), RepositoryError> {
        self.snapshots
            .lock()
            .map_err(|_| RepositoryError::NotFound)?
            .insert(shop.to_string(), snapshot.clone());
        Ok(())
    }

    async fn clear(&self, shop: &str) -> Result<(), RepositoryError> {
        self.snapshots
            .lock()
            .map_err(|_| RepositoryError::NotFound)?
            .remove(shop);
        Ok(())
    }
}

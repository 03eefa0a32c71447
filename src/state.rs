//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{config::Config, pinterest::PinterestClient, shopify::AdminClient};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    shopify_client: AdminClient,
    pinterest_client: PinterestClient,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: Config,
        pool: PgPool,
        shopify_client: AdminClient,
        pinterest_client: PinterestClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                shopify_client,
                pinterest_client,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn shopify(&self) -> &AdminClient {
        &self.inner.shopify_client
    }

    #[must_use]
    pub fn pinterest(&self) -> &PinterestClient {
        &self.inner.pinterest_client
    }

    /// The shop domain all persisted records are keyed by.
    #[must_use]
    pub fn shop(&self) -> &str {
        &self.inner.config.shopify.store
    }
}

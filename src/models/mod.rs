//! Persistence models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Processing decision recorded for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinStatus {
    Published,
    Ignored,
}

impl PinStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "PUBLISHED",
            Self::Ignored => "IGNORED",
        }
    }
}

impl std::str::FromStr for PinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLISHED" => Ok(Self::Published),
            "IGNORED" => Ok(Self::Ignored),
            other => Err(format!("unknown pin status: {other}")),
        }
    }
}

impl std::fmt::Display for PinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `pinned_products` table.
///
/// At most one live row exists per (shop, `product_id`); the store's
/// transactional delete-then-insert upholds this without a database-level
/// unique constraint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PinnedProduct {
    pub id: i64,
    pub shop: String,
    pub product_id: String,
    pub product_handle: String,
    pub title: String,
    pub image_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating (or replacing) a pinned product record.
#[derive(Debug, Clone)]
pub struct NewPinnedProduct {
    pub shop: String,
    pub product_id: String,
    pub product_handle: String,
    pub title: String,
    pub image_url: String,
    pub status: PinStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_status_round_trips_through_db_strings() {
        assert_eq!("PUBLISHED".parse::<PinStatus>(), Ok(PinStatus::Published));
        assert_eq!("IGNORED".parse::<PinStatus>(), Ok(PinStatus::Ignored));
        assert!("published".parse::<PinStatus>().is_err());
        assert_eq!(PinStatus::Ignored.as_str(), "IGNORED");
    }
}

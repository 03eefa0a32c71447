//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! The Admin API token grants full catalog access; this module is the only
//! place that talks to the Admin GraphQL endpoint. Query documents are
//! hand-written strings sent through `graphql_client`'s request/response
//! envelope types.

mod admin;
pub mod files;
pub mod types;

pub use admin::AdminClient;

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<graphql_client::Error>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Mutation reported user errors.
    #[error("User error: {0}")]
    UserError(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Staged upload target rejected the file payload.
    #[error("Upload failed with status {status}: {body}")]
    Upload { status: u16, body: String },

    /// Shopify explicitly reported failed file processing.
    #[error("File processing failed: {0}")]
    ProcessingFailed(String),
}

fn format_graphql_errors(errors: &[graphql_client::Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_error_carries_response_body() {
        let err = AdminShopifyError::Upload {
            status: 403,
            body: "<Error>SignatureDoesNotMatch</Error>".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("SignatureDoesNotMatch"));
    }
}

//! Common Shopify Admin API types, normalized from the GraphQL shapes.

use serde::Serialize;

/// A catalog product as the app consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct AdminProduct {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description_html: Option<String>,
    pub online_store_url: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<ProductImage>,
}

/// A product image.
#[derive(Debug, Clone, Serialize)]
pub struct ProductImage {
    pub id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
}

/// A collection, reduced to what the collection filter needs.
#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
}

/// A staged upload target returned by `stagedUploadsCreate`.
#[derive(Debug, Clone)]
pub struct StagedUploadTarget {
    /// URL to POST the file to.
    pub url: String,
    /// URL to reference the uploaded blob in `fileCreate`.
    pub resource_url: String,
    /// Form parameters, in the order Shopify returned them.
    pub parameters: Vec<(String, String)>,
}

/// A managed file, normalized from the `MediaImage` / `GenericFile` union
/// to a single shape.
#[derive(Debug, Clone)]
pub struct CreatedFile {
    pub id: String,
    /// Public URL; absent while Shopify is still processing the asset.
    pub url: Option<String>,
    /// Raw `fileStatus` (e.g. "READY", "PROCESSING", "FAILED").
    pub status: Option<String>,
}

impl CreatedFile {
    /// Whether Shopify reported terminal processing failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some("FAILED")
    }
}

/// Outcome of the asset-publishing pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub id: String,
    /// May be `None` when the poll budget ran out before the platform
    /// produced a public URL; callers must handle the absence.
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_status_is_terminal() {
        let file = CreatedFile {
            id: "gid://shopify/MediaImage/1".to_string(),
            url: None,
            status: Some("FAILED".to_string()),
        };
        assert!(file.is_failed());

        let file = CreatedFile {
            id: "gid://shopify/MediaImage/1".to_string(),
            url: None,
            status: Some("PROCESSING".to_string()),
        };
        assert!(!file.is_failed());
    }
}

//! Admin API GraphQL client.
//!
//! One `execute` method posts a query document plus variables to the
//! versioned GraphQL endpoint and funnels transport errors, rate limits,
//! GraphQL errors and mutation user errors into `AdminShopifyError`.

use std::sync::Arc;

use graphql_client::{QueryBody, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::instrument;

use super::{
    AdminShopifyError,
    types::{AdminProduct, Collection, CreatedFile, ProductImage, StagedUploadTarget},
};
use crate::config::ShopifyConfig;

const GET_PRODUCT_QUERY: &str = r"
query getProduct($id: ID!) {
  product(id: $id) {
    id
    title
    handle
    descriptionHtml
    onlineStoreUrl
    tags
    images(first: 20) {
      nodes {
        id
        url
        altText
      }
    }
  }
}";

const GET_PRODUCTS_QUERY: &str = r"
query getProducts($first: Int!, $query: String) {
  products(first: $first, query: $query) {
    nodes {
      id
      title
      handle
      descriptionHtml
      onlineStoreUrl
      tags
      images(first: 10) {
        nodes {
          id
          url
          altText
        }
      }
    }
  }
}";

const TAGS_ADD_MUTATION: &str = r"
mutation addTags($id: ID!, $tags: [String!]!) {
  tagsAdd(id: $id, tags: $tags) {
    userErrors {
      field
      message
    }
  }
}";

const TAGS_REMOVE_MUTATION: &str = r"
mutation removeTags($id: ID!, $tags: [String!]!) {
  tagsRemove(id: $id, tags: $tags) {
    userErrors {
      field
      message
    }
  }
}";

const PRODUCT_UPDATE_TAGS_MUTATION: &str = r"
mutation updateTags($input: ProductInput!) {
  productUpdate(input: $input) {
    userErrors {
      field
      message
    }
  }
}";

const GET_COLLECTIONS_QUERY: &str = r"
query getCollections {
  collections(first: 250, sortKey: TITLE) {
    nodes {
      id
      title
    }
  }
}";

const STAGED_UPLOADS_CREATE_MUTATION: &str = r"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters {
        name
        value
      }
    }
    userErrors {
      field
      message
    }
  }
}";

const FILE_CREATE_MUTATION: &str = r"
mutation fileCreate($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files {
      id
      fileStatus
      ... on MediaImage {
        image {
          url
        }
      }
      ... on GenericFile {
        url
      }
    }
    userErrors {
      field
      message
    }
  }
}";

const FILE_STATUS_QUERY: &str = r"
query getFile($id: ID!) {
  node(id: $id) {
    ... on MediaImage {
      fileStatus
      image {
        url
      }
    }
    ... on GenericFile {
      fileStatus
      url
    }
  }
}";

/// Shopify Admin API GraphQL client.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    store: String,
    api_version: String,
    access_token: SecretString,
}

impl AdminClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client: reqwest::Client::new(),
                store: config.store.clone(),
                api_version: config.api_version.clone(),
                access_token: config.access_token.clone(),
            }),
        }
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// The underlying HTTP client, shared with the staged-upload POST.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Execute a GraphQL query document.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: JsonValue,
    ) -> Result<T, AdminShopifyError> {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.store, self.inner.api_version
        );

        let body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&endpoint)
            .header(
                "X-Shopify-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: Response<T> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(AdminShopifyError::GraphQL(errors));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![graphql_client::Error {
                message: "No data in response".to_string(),
                locations: None,
                path: None,
                extensions: None,
            }])
        })
    }

    // =========================================================================
    // Products and tags
    // =========================================================================

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &str) -> Result<Option<AdminProduct>, AdminShopifyError> {
        let data: ProductData = self
            .execute("getProduct", GET_PRODUCT_QUERY, json!({ "id": id }))
            .await?;

        Ok(data.product.map(ProductNode::into_product))
    }

    /// Get products matching a catalog search query (tag filters etc).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self))]
    pub async fn products_by_query(
        &self,
        query: &str,
        first: i64,
    ) -> Result<Vec<AdminProduct>, AdminShopifyError> {
        let data: ProductsData = self
            .execute(
                "getProducts",
                GET_PRODUCTS_QUERY,
                json!({ "first": first, "query": query }),
            )
            .await?;

        Ok(data
            .products
            .nodes
            .into_iter()
            .map(ProductNode::into_product)
            .collect())
    }

    /// Add tags to a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self))]
    pub async fn tags_add(&self, id: &str, tags: &[&str]) -> Result<(), AdminShopifyError> {
        let data: TagsAddData = self
            .execute(
                "addTags",
                TAGS_ADD_MUTATION,
                json!({ "id": id, "tags": tags }),
            )
            .await?;

        check_user_errors(data.tags_add.map(|p| p.user_errors).unwrap_or_default())
    }

    /// Remove tags from a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self))]
    pub async fn tags_remove(&self, id: &str, tags: &[&str]) -> Result<(), AdminShopifyError> {
        let data: TagsRemoveData = self
            .execute(
                "removeTags",
                TAGS_REMOVE_MUTATION,
                json!({ "id": id, "tags": tags }),
            )
            .await?;

        check_user_errors(data.tags_remove.map(|p| p.user_errors).unwrap_or_default())
    }

    /// Replace a product's whole tag set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self, tags))]
    pub async fn update_tags(&self, id: &str, tags: &[String]) -> Result<(), AdminShopifyError> {
        let data: ProductUpdateData = self
            .execute(
                "updateTags",
                PRODUCT_UPDATE_TAGS_MUTATION,
                json!({ "input": { "id": id, "tags": tags } }),
            )
            .await?;

        check_user_errors(
            data.product_update
                .map(|p| p.user_errors)
                .unwrap_or_default(),
        )
    }

    /// List collections (id + title), sorted by title.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self))]
    pub async fn collections(&self) -> Result<Vec<Collection>, AdminShopifyError> {
        let data: CollectionsData = self
            .execute("getCollections", GET_COLLECTIONS_QUERY, json!({}))
            .await?;

        Ok(data
            .collections
            .nodes
            .into_iter()
            .map(|n| Collection {
                id: n.id,
                title: n.title,
            })
            .collect())
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Create a staged upload target for a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, reports user errors, or
    /// returns no target.
    #[instrument(skip(self))]
    pub async fn create_staged_upload(
        &self,
        filename: &str,
        mime_type: &str,
        file_size: usize,
    ) -> Result<StagedUploadTarget, AdminShopifyError> {
        let data: StagedUploadsData = self
            .execute(
                "stagedUploadsCreate",
                STAGED_UPLOADS_CREATE_MUTATION,
                json!({
                    "input": [{
                        "resource": "FILE",
                        "filename": filename,
                        "mimeType": mime_type,
                        "fileSize": file_size.to_string(),
                        "httpMethod": "POST",
                    }]
                }),
            )
            .await?;

        let payload = data
            .staged_uploads_create
            .ok_or_else(|| no_data("Staged upload creation failed"))?;
        check_user_errors(payload.user_errors)?;

        let target = payload
            .staged_targets
            .into_iter()
            .next()
            .ok_or_else(|| no_data("No staged upload target returned"))?;

        Ok(StagedUploadTarget {
            url: target.url,
            resource_url: target.resource_url,
            parameters: target
                .parameters
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        })
    }

    /// Register an uploaded blob as a managed file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, reports user errors, or
    /// returns no file.
    #[instrument(skip(self))]
    pub async fn file_create(
        &self,
        resource_url: &str,
        alt: &str,
    ) -> Result<CreatedFile, AdminShopifyError> {
        let data: FileCreateData = self
            .execute(
                "fileCreate",
                FILE_CREATE_MUTATION,
                json!({
                    "files": [{
                        "originalSource": resource_url,
                        "alt": alt,
                        "contentType": "IMAGE",
                    }]
                }),
            )
            .await?;

        let payload = data
            .file_create
            .ok_or_else(|| no_data("File creation failed"))?;
        check_user_errors(payload.user_errors)?;

        let file = payload
            .files
            .into_iter()
            .next()
            .ok_or_else(|| no_data("No file returned by fileCreate"))?;

        Ok(CreatedFile {
            url: file.public_url(),
            status: file.file_status,
            id: file.id.unwrap_or_default(),
        })
    }

    /// Poll a managed file's status and URL by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self))]
    pub async fn file_status(&self, id: &str) -> Result<CreatedFile, AdminShopifyError> {
        let data: FileStatusData = self
            .execute("getFile", FILE_STATUS_QUERY, json!({ "id": id }))
            .await?;

        let node = data.node.unwrap_or_default();
        Ok(CreatedFile {
            url: node.public_url(),
            status: node.file_status,
            id: id.to_string(),
        })
    }
}

fn check_user_errors(errors: Vec<UserError>) -> Result<(), AdminShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }

    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            format!("{}: {}", field, e.message)
        })
        .collect();
    Err(AdminShopifyError::UserError(messages.join("; ")))
}

fn no_data(message: &str) -> AdminShopifyError {
    AdminShopifyError::GraphQL(vec![graphql_client::Error {
        message: message.to_string(),
        locations: None,
        path: None,
        extensions: None,
    }])
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct UserError {
    field: Option<Vec<String>>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProductData {
    product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: ProductConnection,
}

#[derive(Debug, Deserialize)]
struct ProductConnection {
    #[serde(default)]
    nodes: Vec<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    id: String,
    title: String,
    handle: String,
    description_html: Option<String>,
    online_store_url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    images: ImageConnection,
}

impl ProductNode {
    fn into_product(self) -> AdminProduct {
        AdminProduct {
            id: self.id,
            title: self.title,
            handle: self.handle,
            description_html: self.description_html,
            online_store_url: self.online_store_url,
            tags: self.tags,
            images: self
                .images
                .nodes
                .into_iter()
                .map(|n| ProductImage {
                    id: n.id,
                    url: n.url,
                    alt_text: n.alt_text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ImageConnection {
    #[serde(default)]
    nodes: Vec<ImageNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageNode {
    id: Option<String>,
    url: String,
    alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsAddData {
    tags_add: Option<UserErrorsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagsRemoveData {
    tags_remove: Option<UserErrorsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductUpdateData {
    product_update: Option<UserErrorsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserErrorsPayload {
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct CollectionsData {
    collections: CollectionConnection,
}

#[derive(Debug, Deserialize)]
struct CollectionConnection {
    #[serde(default)]
    nodes: Vec<CollectionNode>,
}

#[derive(Debug, Deserialize)]
struct CollectionNode {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedUploadsData {
    staged_uploads_create: Option<StagedUploadsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedUploadsPayload {
    #[serde(default)]
    staged_targets: Vec<StagedTargetNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StagedTargetNode {
    url: String,
    resource_url: String,
    #[serde(default)]
    parameters: Vec<StagedParameter>,
}

#[derive(Debug, Deserialize)]
struct StagedParameter {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileCreateData {
    file_create: Option<FileCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileCreatePayload {
    #[serde(default)]
    files: Vec<FileNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileStatusData {
    node: Option<FileNode>,
}

/// Tagged-union file node: `MediaImage` carries a nested `image.url`,
/// `GenericFile` a top-level `url`. `public_url` is the normalization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileNode {
    id: Option<String>,
    file_status: Option<String>,
    image: Option<ImageUrl>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: Option<String>,
}

impl FileNode {
    fn public_url(&self) -> Option<String> {
        self.image
            .as_ref()
            .and_then(|i| i.url.clone())
            .or_else(|| self.url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_image_and_generic_file_normalize_to_one_shape() {
        let media_image: FileNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/MediaImage/1",
            "fileStatus": "READY",
            "image": { "url": "https://cdn.shopify.com/a.jpg" }
        }))
        .expect("deserialize");
        assert_eq!(
            media_image.public_url().as_deref(),
            Some("https://cdn.shopify.com/a.jpg")
        );

        let generic: FileNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/GenericFile/2",
            "fileStatus": "READY",
            "url": "https://cdn.shopify.com/b.pdf"
        }))
        .expect("deserialize");
        assert_eq!(
            generic.public_url().as_deref(),
            Some("https://cdn.shopify.com/b.pdf")
        );

        let pending: FileNode = serde_json::from_value(serde_json::json!({
            "id": "gid://shopify/MediaImage/3",
            "fileStatus": "PROCESSING"
        }))
        .expect("deserialize");
        assert_eq!(pending.public_url(), None);
    }

    #[test]
    fn user_errors_are_joined_with_field_paths() {
        let errors = vec![
            UserError {
                field: Some(vec!["input".to_string(), "tags".to_string()]),
                message: "too many tags".to_string(),
            },
            UserError {
                field: None,
                message: "invalid id".to_string(),
            },
        ];

        let err = check_user_errors(errors).expect_err("must fail");
        let msg = err.to_string();
        assert!(msg.contains("input.tags: too many tags"));
        assert!(msg.contains(": invalid id"));
    }

    #[test]
    fn empty_user_errors_pass() {
        assert!(check_user_errors(vec![]).is_ok());
    }
}

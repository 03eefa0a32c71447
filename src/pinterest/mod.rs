//! Pinterest v5 API client for boards, media uploads and pin creation.
//!
//! # API Reference
//!
//! - Base URL: `https://api.pinterest.com/v5`
//! - Authentication: bearer token via `Authorization: Bearer <token>`
//! - Media flow: register media -> upload to signed URL -> poll status ->
//!   create pin referencing the media id

mod media;

pub use media::{Board, MediaStatus, MediaUpload, NewPin, Pin};

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::PinterestConfig;

/// Pinterest API base URL.
const BASE_URL: &str = "https://api.pinterest.com/v5";

/// Errors that can occur when interacting with the Pinterest API.
#[derive(Debug, Error)]
pub enum PinterestError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// Rate limited by Pinterest.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unauthorized (invalid or expired token).
    #[error("Unauthorized: invalid access token")]
    Unauthorized,

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Pinterest reported terminal media processing failure.
    #[error("Media processing failed for media {0}")]
    MediaProcessingFailed(String),
}

/// Pinterest API client.
#[derive(Clone)]
pub struct PinterestClient {
    inner: Arc<PinterestClientInner>,
}

struct PinterestClientInner {
    client: reqwest::Client,
    /// Bare client without default headers, for signed upload targets
    /// (AWS rejects a foreign Authorization header).
    upload_client: reqwest::Client,
}

impl PinterestClient {
    /// Create a new Pinterest API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &PinterestConfig) -> Result<Self, PinterestError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.access_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PinterestError::Parse(format!("Invalid access token format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;
        let upload_client = reqwest::Client::new();

        Ok(Self {
            inner: Arc::new(PinterestClientInner {
                client,
                upload_client,
            }),
        })
    }

    /// Execute a GET request against the API.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, PinterestError> {
        let url = format!("{BASE_URL}{path}");
        let response = self.inner.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Execute a POST request against the API.
    pub(crate) async fn post<T: serde::de::DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PinterestError> {
        let url = format!("{BASE_URL}{path}");
        let response = self.inner.client.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// The header-free client used for signed upload targets.
    pub(crate) fn upload_http(&self) -> &reqwest::Client {
        &self.inner.upload_client
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PinterestError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PinterestError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Parse an error response.
    async fn parse_error(response: reqwest::Response) -> PinterestError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return PinterestError::RateLimited(retry_after);
        }

        if status == 401 || status == 403 {
            return PinterestError::Unauthorized;
        }

        let body = response.text().await.unwrap_or_default();
        PinterestError::Api { status, body }
    }
}

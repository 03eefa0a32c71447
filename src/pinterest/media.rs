//! Boards, media registration and pin creation.
//!
//! Publishing a pin from raw bytes is a strictly sequential four-step
//! pipeline: register a media placeholder, upload the bytes to the signed
//! target, poll the media until it is processed, create the pin. Any
//! failing step aborts the rest; there is no rollback.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{PinterestClient, PinterestError};

/// Delay between media status polls.
const MEDIA_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A Pinterest board.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

/// Registered media placeholder with its signed upload target.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUpload {
    pub media_id: String,
    pub upload_url: String,
    #[serde(default)]
    pub upload_parameters: HashMap<String, String>,
}

/// Media processing status reported by `GET /media/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    Registered,
    Registering,
    Processing,
    Succeeded,
    Failed,
    /// Status string this client doesn't know; treated as terminal
    /// success so a new upstream status doesn't wedge the poll.
    #[serde(other)]
    Unknown,
}

impl MediaStatus {
    /// Whether the poll loop should keep waiting.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Registered | Self::Registering | Self::Processing)
    }
}

/// Metadata for a pin to create.
#[derive(Debug, Clone)]
pub struct NewPin {
    pub board_id: String,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// A created pin.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Pin {
    pub id: String,
    #[serde(default)]
    pub board_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoardList {
    #[serde(default)]
    items: Vec<Board>,
}

#[derive(Debug, Deserialize)]
struct MediaStatusResponse {
    status: MediaStatus,
}

impl PinterestClient {
    /// List the authenticated user's boards.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn boards(&self) -> Result<Vec<Board>, PinterestError> {
        let list: BoardList = self.get("/boards").await?;
        Ok(list.items)
    }

    /// Register a media placeholder, declaring intent to upload an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn register_media(&self) -> Result<MediaUpload, PinterestError> {
        self.post("/media", &json!({ "media_type": "image" })).await
    }

    /// Upload raw image bytes to the signed target from `register_media`.
    ///
    /// Upload parameters go first, the file field last.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload target answers non-2xx.
    #[instrument(skip(self, upload, bytes), fields(media_id = %upload.media_id, size = bytes.len()))]
    pub async fn upload_media(
        &self,
        upload: &MediaUpload,
        bytes: Vec<u8>,
    ) -> Result<(), PinterestError> {
        let mut form = Form::new();
        for (name, value) in &upload.upload_parameters {
            form = form.text(name.clone(), value.clone());
        }
        let part = Part::bytes(bytes).mime_str("image/jpeg")?;
        form = form.part("file", part);

        let response = self
            .upload_http()
            .post(&upload.upload_url)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PinterestError::Api { status, body });
        }

        Ok(())
    }

    /// Fetch a media item's processing status.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn media_status(&self, media_id: &str) -> Result<MediaStatus, PinterestError> {
        let response: MediaStatusResponse = self.get(&format!("/media/{media_id}")).await?;
        Ok(response.status)
    }

    /// Poll a media item every second until it leaves the pending states.
    ///
    /// Unbounded, mirroring the upstream API contract; callers that need a
    /// ceiling wrap this in `tokio::time::timeout`.
    ///
    /// # Errors
    ///
    /// Returns `MediaProcessingFailed` if Pinterest reports failure, or any
    /// transport error from the status polls.
    #[instrument(skip(self))]
    pub async fn wait_for_media(&self, media_id: &str) -> Result<(), PinterestError> {
        let client = self.clone();
        let id = media_id.to_string();

        poll_media(media_id, move || {
            let client = client.clone();
            let id = id.clone();
            async move { client.media_status(&id).await }
        })
        .await
    }

    /// Create a pin referencing an already-processed media item.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, pin), fields(board_id = %pin.board_id))]
    pub async fn create_pin(&self, pin: &NewPin, media_id: &str) -> Result<Pin, PinterestError> {
        let payload = json!({
            "board_id": pin.board_id,
            "title": pin.title,
            "description": pin.description,
            "link": pin.link,
            "media_source": {
                "source_type": "image_id",
                "cover_image_id": media_id,
            }
        });

        self.post("/pins", &payload).await
    }

    /// Publish a pin from raw image bytes: register, upload, wait, create.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; later steps are not
    /// attempted and nothing is rolled back.
    #[instrument(skip(self, pin, bytes), fields(board_id = %pin.board_id, size = bytes.len()))]
    pub async fn publish_pin(&self, pin: &NewPin, bytes: Vec<u8>) -> Result<Pin, PinterestError> {
        let upload = self.register_media().await?;
        self.upload_media(&upload, bytes).await?;
        self.wait_for_media(&upload.media_id).await?;
        self.create_pin(pin, &upload.media_id).await
    }
}

/// Drive the media poll against a status source: sleep, fetch, repeat
/// while pending. `Failed` aborts; any other non-pending status (including
/// ones this client doesn't know) ends the wait successfully.
async fn poll_media<F, Fut>(media_id: &str, mut fetch: F) -> Result<(), PinterestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<MediaStatus, PinterestError>>,
{
    loop {
        tokio::time::sleep(MEDIA_POLL_INTERVAL).await;

        let status = fetch().await?;
        tracing::debug!(media_id, ?status, "media poll");

        if status == MediaStatus::Failed {
            return Err(PinterestError::MediaProcessingFailed(media_id.to_string()));
        }
        if !status.is_pending() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn poll_resolves_after_the_status_sequence_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sequence = [
            MediaStatus::Registering,
            MediaStatus::Processing,
            MediaStatus::Succeeded,
        ];

        poll_media("m1", move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = sequence[n];
            async move { Ok(status) }
        })
        .await
        .expect("poll");

        // pin creation happens once, only after the third poll answers
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_media_aborts_the_poll() {
        let result = poll_media("m1", move || async { Ok(MediaStatus::Failed) }).await;

        assert!(matches!(
            result,
            Err(PinterestError::MediaProcessingFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_ends_the_wait_successfully() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        poll_media("m1", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(MediaStatus::Unknown) }
        })
        .await
        .expect("poll");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pending_statuses_keep_the_poll_going() {
        assert!(MediaStatus::Registering.is_pending());
        assert!(MediaStatus::Processing.is_pending());
        assert!(!MediaStatus::Succeeded.is_pending());
        assert!(!MediaStatus::Failed.is_pending());
    }

    #[test]
    fn media_status_deserializes_from_api_strings() {
        let status: MediaStatusResponse =
            serde_json::from_str(r#"{"status": "succeeded"}"#).expect("deserialize");
        assert_eq!(status.status, MediaStatus::Succeeded);

        let status: MediaStatusResponse =
            serde_json::from_str(r#"{"status": "registering"}"#).expect("deserialize");
        assert!(status.status.is_pending());

        let status: MediaStatusResponse =
            serde_json::from_str(r#"{"status": "optimizing"}"#).expect("deserialize");
        assert_eq!(status.status, MediaStatus::Unknown);
        assert!(!status.status.is_pending());
    }

    #[test]
    fn media_upload_tolerates_missing_parameters() {
        let upload: MediaUpload = serde_json::from_str(
            r#"{"media_id": "m1", "upload_url": "https://up.example/x"}"#,
        )
        .expect("deserialize");
        assert!(upload.upload_parameters.is_empty());
    }
}

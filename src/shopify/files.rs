//! Asset publishing: staged upload -> file registration -> readiness poll.
//!
//! Shopify's staged-upload pattern: request a signed temporary target,
//! POST the bytes straight to it (bypassing the Admin API), then adopt the
//! blob as a managed file. File processing is asynchronous, so the public
//! URL may lag registration; a bounded poll covers that window.

use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    types::{CreatedFile, UploadResult},
};

/// How many times to poll for a public URL before giving up.
const URL_POLL_ATTEMPTS: u32 = 10;

/// Delay between poll attempts.
const URL_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upload image bytes as a Shopify managed file and resolve its public URL.
///
/// When the poll budget runs out without a URL the result carries
/// `url: None`; that is not an error, the caller decides how to proceed.
/// A partial failure (blob uploaded, registration failed) leaves an
/// orphaned blob behind; reconciling those is out of scope.
///
/// # Errors
///
/// Returns an error if any remote round-trip fails, the upload target
/// answers non-2xx, or Shopify reports terminal processing failure.
#[instrument(skip(admin, bytes), fields(filename = %filename, size = bytes.len()))]
pub async fn upload_image(
    admin: &AdminClient,
    bytes: Vec<u8>,
    filename: &str,
) -> Result<UploadResult, AdminShopifyError> {
    let target = admin
        .create_staged_upload(filename, "image/jpeg", bytes.len())
        .await?;

    // Parameters must precede the file field, in the order Shopify returned them
    let mut form = Form::new();
    for (name, value) in target.parameters {
        form = form.text(name, value);
    }
    let part = Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("image/jpeg")?;
    form = form.part("file", part);

    let response = admin.http().post(&target.url).multipart(form).send().await?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(AdminShopifyError::Upload { status, body });
    }

    let created = admin
        .file_create(&target.resource_url, "Pinterest Cropped Image")
        .await?;

    resolve_url(admin, created).await
}

/// Poll for the file's public URL if registration didn't return one.
async fn resolve_url(
    admin: &AdminClient,
    created: CreatedFile,
) -> Result<UploadResult, AdminShopifyError> {
    let admin = admin.clone();
    let id = created.id.clone();

    poll_for_url(created, move || {
        let admin = admin.clone();
        let id = id.clone();
        async move { admin.file_status(&id).await }
    })
    .await
}

/// Drive the readiness poll against a status source.
///
/// A registration response that already carries a URL short-circuits
/// without polling. Otherwise the source is queried up to
/// [`URL_POLL_ATTEMPTS`] times at [`URL_POLL_INTERVAL`], stopping early on
/// a URL or a terminal FAILED status.
async fn poll_for_url<F, Fut>(
    created: CreatedFile,
    mut fetch: F,
) -> Result<UploadResult, AdminShopifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<CreatedFile, AdminShopifyError>>,
{
    if created.url.is_some() {
        return Ok(UploadResult {
            id: created.id,
            url: created.url,
        });
    }

    tracing::debug!(file_id = %created.id, "URL missing, polling for readiness");

    for attempt in 1..=URL_POLL_ATTEMPTS {
        tokio::time::sleep(URL_POLL_INTERVAL).await;

        let polled = fetch().await?;
        tracing::debug!(attempt, status = ?polled.status, "file poll");

        if polled.url.is_some() {
            return Ok(UploadResult {
                id: created.id,
                url: polled.url,
            });
        }
        if polled.is_failed() {
            return Err(AdminShopifyError::ProcessingFailed(created.id));
        }
    }

    // Budget exhausted without a terminal status; hand back what we have
    Ok(UploadResult {
        id: created.id,
        url: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn file(url: Option<&str>, status: Option<&str>) -> CreatedFile {
        CreatedFile {
            id: "gid://shopify/MediaImage/1".to_string(),
            url: url.map(ToString::to_string),
            status: status.map(ToString::to_string),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_url_short_circuits_without_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = poll_for_url(file(Some("https://cdn.shopify.com/a.jpg"), Some("READY")), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(file(None, None)) }
        })
        .await
        .expect("resolve");

        assert_eq!(result.url.as_deref(), Some("https://cdn.shopify.com/a.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn url_appearing_mid_poll_stops_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = poll_for_url(file(None, Some("PROCESSING")), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Ok(file(None, Some("PROCESSING")))
                } else {
                    Ok(file(Some("https://cdn.shopify.com/b.jpg"), Some("READY")))
                }
            }
        })
        .await
        .expect("resolve");

        assert_eq!(result.url.as_deref(), Some("https://cdn.shopify.com/b.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_yields_no_url_after_ten_polls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = poll_for_url(file(None, Some("PROCESSING")), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(file(None, Some("PROCESSING"))) }
        })
        .await
        .expect("resolve");

        assert_eq!(result.url, None);
        assert_eq!(calls.load(Ordering::SeqCst), URL_POLL_ATTEMPTS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_aborts_the_poll() {
        let result = poll_for_url(file(None, Some("PROCESSING")), move || async {
            Ok(file(None, Some("FAILED")))
        })
        .await;

        assert!(matches!(
            result,
            Err(AdminShopifyError::ProcessingFailed(_))
        ));
    }
}

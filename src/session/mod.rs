//! Operator session: the product work queue and its resumable snapshot.
//!
//! The queue is an ordered list of products, each with an ordered list of
//! images. Advancing prefers the next unprocessed image of the current
//! product, then the next product's first image, and finally returns to
//! `Empty` signalling queue completion. The whole session serializes to a
//! `SessionSnapshot` that is persisted on every change and rehydrated on
//! session start, so a refresh never loses progress.

mod store;

pub use store::{MemorySnapshotStore, PgSnapshotStore, SnapshotStore};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Key prefix all persisted client state lives under.
pub const STATE_PREFIX: &str = "pinpublish";

/// A product image reference in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: Option<String>,
    pub url: String,
}

/// A queued product awaiting processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub product_id: String,
    pub handle: String,
    pub title: String,
    pub images: Vec<ImageRef>,
    /// Set once an image of this product has been uploaded; idempotent.
    #[serde(default)]
    pub published: bool,
    /// Indices of images already processed this session.
    #[serde(default)]
    pub processed: BTreeSet<usize>,
}

impl QueueItem {
    fn first_unprocessed(&self) -> Option<usize> {
        (0..self.images.len()).find(|i| !self.processed.contains(i))
    }
}

/// Where the operator currently is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No product selected (fresh session or queue exhausted).
    Empty,
    /// A product is selected, no image picked yet.
    ProductSelected { product: usize },
    /// An image is selected and being cropped.
    Cropping { product: usize, image: usize },
    /// The cropped image has been uploaded; awaiting the next action.
    Uploaded { product: usize, image: usize },
}

/// Result of an `advance` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to another image of the same product.
    NextImage,
    /// Moved to the first image of the next product.
    NextProduct,
    /// Queue exhausted; back to `Empty`.
    Complete,
}

/// The ordered work queue and current position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionQueue {
    pub items: Vec<QueueItem>,
    pub state: SessionState,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Empty
    }
}

impl SessionQueue {
    /// Start a session over the given products.
    #[must_use]
    pub fn new(items: Vec<QueueItem>) -> Self {
        let state = if items.is_empty() {
            SessionState::Empty
        } else {
            SessionState::ProductSelected { product: 0 }
        };
        Self { items, state }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the currently selected product, if any.
    #[must_use]
    pub const fn current_product(&self) -> Option<usize> {
        match self.state {
            SessionState::Empty => None,
            SessionState::ProductSelected { product }
            | SessionState::Cropping { product, .. }
            | SessionState::Uploaded { product, .. } => Some(product),
        }
    }

    /// Select an image of the current product and enter `Cropping`.
    ///
    /// Out-of-range indices are ignored and the state is unchanged.
    pub fn select_image(&mut self, image: usize) {
        if let Some(product) = self.current_product()
            && self
                .items
                .get(product)
                .is_some_and(|item| image < item.images.len())
        {
            self.state = SessionState::Cropping { product, image };
        }
    }

    /// Record a successful upload for the image being cropped.
    ///
    /// Sets the product's published marker; already-published products
    /// keep a single marker (the flag is idempotent).
    pub fn mark_uploaded(&mut self) {
        if let SessionState::Cropping { product, image } = self.state {
            if let Some(item) = self.items.get_mut(product) {
                item.published = true;
            }
            self.state = SessionState::Uploaded { product, image };
        }
    }

    /// Move to the next piece of work.
    ///
    /// The current image (if any) is counted as processed. Preference
    /// order: next unprocessed image of the current product, first image
    /// of the next product, otherwise `Empty` with a completion signal.
    pub fn advance(&mut self) -> Advance {
        let (product, image) = match self.state {
            SessionState::Empty => return Advance::Complete,
            SessionState::ProductSelected { product } => (product, None),
            SessionState::Cropping { product, image }
            | SessionState::Uploaded { product, image } => (product, Some(image)),
        };

        if let Some(image) = image
            && let Some(item) = self.items.get_mut(product)
        {
            item.processed.insert(image);
        }

        if let Some(next) = self.items.get(product).and_then(QueueItem::first_unprocessed) {
            self.state = SessionState::Cropping {
                product,
                image: next,
            };
            return Advance::NextImage;
        }

        let next_product = product + 1;
        if next_product < self.items.len() {
            self.state = SessionState::Cropping {
                product: next_product,
                image: 0,
            };
            return Advance::NextProduct;
        }

        self.state = SessionState::Empty;
        Advance::Complete
    }
}

/// Everything needed to resume an interrupted session exactly where it
/// left off. Persisted on every state change under [`STATE_PREFIX`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub queue: SessionQueue,
    pub active_tab: Option<String>,
    pub modal_open: bool,
    pub selected_image: Option<ImageRef>,
    /// Generated pin-create URL awaiting the operator.
    pub pinterest_url: Option<String>,
    /// "default" (store URL) or "custom".
    pub url_mode: Option<String>,
    pub custom_domain: Option<String>,
    pub collection_filter: Option<String>,
    /// Operator's watermark configuration, stored opaquely.
    pub watermark: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, image_count: usize) -> QueueItem {
        QueueItem {
            product_id: product_id.to_string(),
            handle: format!("{product_id}-handle"),
            title: format!("Product {product_id}"),
            images: (0..image_count)
                .map(|i| ImageRef {
                    id: Some(format!("{product_id}-img-{i}")),
                    url: format!("https://cdn.example/{product_id}/{i}.jpg"),
                })
                .collect(),
            published: false,
            processed: BTreeSet::new(),
        }
    }

    #[test]
    fn empty_queue_starts_empty() {
        let queue = SessionQueue::new(vec![]);
        assert_eq!(queue.state(), SessionState::Empty);
        assert_eq!(queue.clone().advance(), Advance::Complete);
    }

    #[test]
    fn advance_prefers_next_image_of_current_product() {
        let mut queue = SessionQueue::new(vec![item("p1", 3)]);
        queue.select_image(0);

        assert_eq!(queue.advance(), Advance::NextImage);
        assert_eq!(
            queue.state(),
            SessionState::Cropping {
                product: 0,
                image: 1
            }
        );
    }

    #[test]
    fn advance_moves_to_next_product_when_images_are_exhausted() {
        let mut queue = SessionQueue::new(vec![item("p1", 1), item("p2", 2)]);
        queue.select_image(0);

        assert_eq!(queue.advance(), Advance::NextProduct);
        assert_eq!(
            queue.state(),
            SessionState::Cropping {
                product: 1,
                image: 0
            }
        );
    }

    #[test]
    fn advance_past_the_last_image_of_the_last_product_empties_the_queue() {
        let mut queue = SessionQueue::new(vec![item("p1", 1)]);
        queue.select_image(0);

        assert_eq!(queue.advance(), Advance::Complete);
        assert_eq!(queue.state(), SessionState::Empty);
    }

    #[test]
    fn skipped_images_are_revisited_before_moving_on() {
        let mut queue = SessionQueue::new(vec![item("p1", 3)]);
        queue.select_image(1);

        // image 1 processed; 0 is still unprocessed and comes first
        assert_eq!(queue.advance(), Advance::NextImage);
        assert_eq!(
            queue.state(),
            SessionState::Cropping {
                product: 0,
                image: 0
            }
        );
    }

    #[test]
    fn mark_uploaded_sets_published_idempotently() {
        let mut queue = SessionQueue::new(vec![item("p1", 2)]);
        queue.select_image(0);
        queue.mark_uploaded();

        assert!(queue.items[0].published);
        assert_eq!(
            queue.state(),
            SessionState::Uploaded {
                product: 0,
                image: 0
            }
        );

        queue.advance();
        queue.mark_uploaded();
        assert!(queue.items[0].published);
    }

    #[test]
    fn select_image_out_of_range_is_ignored() {
        let mut queue = SessionQueue::new(vec![item("p1", 1)]);
        queue.select_image(5);
        assert_eq!(queue.state(), SessionState::ProductSelected { product: 0 });
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut queue = SessionQueue::new(vec![item("p1", 2)]);
        queue.select_image(1);
        let snapshot = SessionSnapshot {
            queue,
            active_tab: Some("unpublished".to_string()),
            modal_open: true,
            url_mode: Some("custom".to_string()),
            custom_domain: Some("https://shop.example".to_string()),
            ..SessionSnapshot::default()
        };

        let json = serde_json::to_string(&snapshot).expect("serialize");
        let restored: SessionSnapshot = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.queue.state(), snapshot.queue.state());
        assert_eq!(restored.active_tab.as_deref(), Some("unpublished"));
        assert!(restored.modal_open);
    }
}

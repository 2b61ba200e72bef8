use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One normalized entry from a feed (post, article, update).
///
/// Items are value-like records: merge and the mark operations on
/// [`crate::feed::Feed`] replace the whole item list rather than mutating
/// items in place, so holding a clone of an `Item` is always safe.
///
/// `title` and `author` are empty strings when the source element omits
/// them; `link`, `comments`, and the two timestamps are `None` when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Entry title, plain text. Empty when the source omits it.
    pub title: String,
    /// Entry author, plain text. Empty when the source omits it.
    pub author: String,
    /// Raw markup/text content as provided by the source format.
    pub content: String,
    /// Plain-text rendering of `content` (tags stripped, whitespace
    /// collapsed). Whoever changes `content` recomputes this, so it is
    /// never stale.
    pub stripped_content: String,
    /// Primary URL identifying the entry. Absent for malformed entries.
    pub link: Option<String>,
    /// Discussion-page URL, when the feed provides one.
    pub comments: Option<String>,
    /// Publication time. Drives the descending ordering of a feed's items.
    pub published: Option<DateTime<Utc>>,
    /// Last-updated time. Informational; used to detect content changes.
    pub updated: Option<DateTime<Utc>>,
    /// True once the item has been surfaced to the user via notification.
    pub notified: bool,
    /// True once the user has opened/read the item.
    pub viewed: bool,
}

impl Item {
    /// The value used to recognize "the same entry" across refreshes.
    ///
    /// The link is the natural identity when the feed provides one. For
    /// link-less entries we fall back to a digest of title + published
    /// time, which is stable across refreshes as long as the publisher
    /// does not edit both at once.
    pub fn identity_key(&self) -> String {
        match &self.link {
            Some(link) if !link.trim().is_empty() => link.trim().to_string(),
            _ => {
                let input = format!(
                    "{}|{}",
                    self.title,
                    self.published
                        .map(|p| p.timestamp().to_string())
                        .unwrap_or_default()
                );
                let hash = Sha256::digest(input.as_bytes());
                format!("{:x}", hash)
            }
        }
    }

    /// Chronological comparison by publication date.
    ///
    /// An absent `published` compares as earlier than any present one, so a
    /// stable descending sort with this comparator puts dated items first
    /// and undated items last, preserving their relative order.
    pub fn compare_by_published(&self, other: &Item) -> Ordering {
        self.published.cmp(&other.published)
    }

    /// Copy of this item with `viewed` set.
    pub(crate) fn with_viewed(&self) -> Item {
        Item {
            viewed: true,
            ..self.clone()
        }
    }

    /// Copy of this item with `notified` set.
    pub(crate) fn with_notified(&self) -> Item {
        Item {
            notified: true,
            ..self.clone()
        }
    }
}

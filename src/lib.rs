//! Track one syndicated feed (RSS or ATOM) and maintain a locally merged,
//! de-duplicated, date-ordered list of its entries.
//!
//! The crate centers on [`feed::Feed`]: give it a URL, call
//! [`refresh()`](feed::Feed::refresh), and observe completion through
//! [`subscribe()`](feed::Feed::subscribe). Each refresh fetches the feed
//! document, detects its format from the root element, normalizes every
//! entry into an [`item::Item`], and merges the result into the held item
//! list, preserving per-item `viewed`/`notified` state across refreshes
//! and across content edits, so an already-seen entry is never
//! re-surfaced as new.
//!
//! Failure isolation follows the document structure: a malformed date
//! costs one field, an unusable entry costs one entry, and only a
//! whole-document problem (network failure, invalid XML, unknown root)
//! fails the refresh, in which case the previously held items are kept.
//!
//! # Example
//!
//! ```ignore
//! use feedwatch::feed::{Feed, FeedEvent};
//! use feedwatch::util::parse_feed_url;
//!
//! let feed = Feed::new(parse_feed_url("https://example.com/feed.xml")?);
//! let mut events = feed.subscribe();
//! feed.refresh();
//!
//! match events.recv().await {
//!     Some(FeedEvent::Updated { result: Ok(summary), .. }) => {
//!         println!("{} items, {} new", summary.total, summary.new_items);
//!     }
//!     Some(FeedEvent::Updated { result: Err(e), .. }) => {
//!         eprintln!("refresh failed: {e}");
//!     }
//!     None => unreachable!("feed outlives the subscription"),
//! }
//! ```

pub mod config;
pub mod dates;
pub mod feed;
pub mod item;
pub mod util;
pub mod xml;

pub use feed::{Feed, FeedEvent, FeedFormat};
pub use item::Item;

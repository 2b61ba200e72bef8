//! Feed tracking: the refresh/parse/merge pipeline.
//!
//! This module owns everything between "I have a feed URL" and "I have an
//! up-to-date, de-duplicated, date-ordered item list":
//!
//! - [`fetcher`] - HTTP retrieval of the feed document with timeout and
//!   size limiting
//! - [`document`] - format detection at the document root and the
//!   per-entry normalization loop
//! - [`normalize`] - conversion of one RSS `item` / ATOM `entry` element
//!   into an [`crate::item::Item`]
//! - [`merge`] - reconciliation of freshly parsed items against the
//!   previously held list, preserving per-item user state
//! - [`controller`] - the [`Feed`] type that drives one
//!   fetch-parse-merge cycle per `refresh()` call and announces completion
//!
//! # Example
//!
//! ```ignore
//! use feedwatch::feed::Feed;
//!
//! let feed = Feed::new(url);
//! let mut events = feed.subscribe();
//! feed.refresh();
//! let event = events.recv().await; // one announcement per refresh
//! ```

mod controller;
mod document;
mod fetcher;
mod merge;
mod normalize;

pub use controller::{Feed, FeedEvent, RefreshError, RefreshPhase, RefreshSummary};
pub use document::{parse_document, DocumentError, ParsedDocument};
pub use fetcher::{fetch_document, FetchError, FetchOptions};
pub use merge::merge;
pub use normalize::{from_atom_entry, from_rss_item, normalize, NormalizeError};

use std::fmt;

/// Format family of a feed document.
///
/// Selected once from the document's root element shape and carried
/// through normalization and date parsing as a parameter, so per-entry
/// code never re-detects the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedFormat {
    /// RSS 2.0: `<rss><channel><item>...`, RFC 822-style dates.
    Rss,
    /// ATOM: `<feed><entry>...`, RFC 3339 dates.
    Atom,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFormat::Rss => f.write_str("RSS"),
            FeedFormat::Atom => f.write_str("ATOM"),
        }
    }
}

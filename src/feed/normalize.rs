use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dates::parse_date;
use crate::feed::FeedFormat;
use crate::item::Item;
use crate::util::strip_markup;
use crate::xml::Element;

/// An entry element with no usable structure at all.
///
/// Normalization is best-effort: any single usable field (title, link,
/// content, or a publication date) yields a partial item, so this error
/// only fires for entries that carry none of them.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// No title, link, content, or publication date was found.
    #[error("entry has no recognizable fields")]
    EmptyEntry,
}

/// Converts one parsed entry element into a normalized [`Item`].
///
/// `format` selects the per-family field mapping; it was decided once at
/// the document root and is carried through rather than re-detected per
/// entry. Missing optional fields yield empty/absent values, and a
/// present-but-malformed date yields a field-level warning with the date
/// absent; neither is an error.
///
/// # Errors
///
/// [`NormalizeError::EmptyEntry`] when the element has no usable field.
pub fn normalize(element: &Element, format: FeedFormat) -> Result<Item, NormalizeError> {
    match format {
        FeedFormat::Rss => from_rss_item(element),
        FeedFormat::Atom => from_atom_entry(element),
    }
}

/// Builds an [`Item`] from one RSS `<item>` element.
///
/// Field mapping: `title`, `link` (element text), `content:encoded`
/// preferred over `description` for content, `pubDate`, `author` with
/// `dc:creator` fallback, `comments`. RSS has no per-entry updated time.
pub fn from_rss_item(element: &Element) -> Result<Item, NormalizeError> {
    let title = text_of(element, "title");
    let link = optional_text(element, "link");
    let author = match text_of(element, "author") {
        author if author.is_empty() => text_of(element, "creator"),
        author => author,
    };
    // Richest content wins: content:encoded carries full markup where
    // description is often a truncated summary
    let content = match text_of(element, "encoded") {
        encoded if encoded.is_empty() => text_of(element, "description"),
        encoded => encoded,
    };
    let comments = optional_text(element, "comments");
    let published = date_field(element, "pubDate", FeedFormat::Rss);

    finish(
        title,
        author,
        content,
        link,
        comments,
        published,
        None,
    )
}

/// Builds an [`Item`] from one ATOM `<entry>` element.
///
/// Field mapping: `title`, `link` via the `href` attribute (preferring
/// `rel="alternate"` or unqualified links), `content` preferred over
/// `summary`, `published`, `updated`, `author/name`.
pub fn from_atom_entry(element: &Element) -> Result<Item, NormalizeError> {
    let title = text_of(element, "title");
    let link = atom_link(element);
    let author = element
        .child("author")
        .and_then(|a| a.child("name"))
        .map(|n| n.text().to_string())
        .unwrap_or_default();
    let content = match text_of(element, "content") {
        content if content.is_empty() => text_of(element, "summary"),
        content => content,
    };
    let published = date_field(element, "published", FeedFormat::Atom);
    let updated = date_field(element, "updated", FeedFormat::Atom);

    finish(title, author, content, link, None, published, updated)
}

/// ATOM entries may carry several `<link>` elements distinguished by
/// `rel`; the entry's primary location is the `alternate` one, which is
/// also the default when `rel` is omitted.
fn atom_link(element: &Element) -> Option<String> {
    let links: Vec<&Element> = element.children("link").collect();
    links
        .iter()
        .find(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .or_else(|| links.first())
        .and_then(|l| l.attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn text_of(element: &Element, name: &str) -> String {
    element
        .child(name)
        .map(|c| c.text().to_string())
        .unwrap_or_default()
}

fn optional_text(element: &Element, name: &str) -> Option<String> {
    let text = text_of(element, name);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// A missing date field is simply absent; a present-but-malformed one is
/// worth a warning, but the item is still produced without it.
fn date_field(element: &Element, name: &str, format: FeedFormat) -> Option<DateTime<Utc>> {
    let raw = optional_text(element, name)?;
    match parse_date(&raw, format) {
        Ok(dt) => Some(dt),
        Err(e) => {
            tracing::warn!(field = name, error = %e, "Ignoring malformed entry date");
            None
        }
    }
}

fn finish(
    title: String,
    author: String,
    content: String,
    link: Option<String>,
    comments: Option<String>,
    published: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
) -> Result<Item, NormalizeError> {
    if title.is_empty() && link.is_none() && content.is_empty() && published.is_none() {
        return Err(NormalizeError::EmptyEntry);
    }

    let stripped_content = strip_markup(&content).into_owned();
    Ok(Item {
        title,
        author,
        content,
        stripped_content,
        link,
        comments,
        published,
        updated,
        notified: false,
        viewed: false,
    })
}

use thiserror::Error;

use crate::feed::{normalize, FeedFormat};
use crate::item::Item;
use crate::xml::{Element, XmlError};

/// Whole-document failures. Either of these aborts the refresh and leaves
/// the previously held items untouched.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The bytes are not a well-formed XML document.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The root element is neither RSS (`<rss>`) nor ATOM (`<feed>`).
    #[error("unrecognized root element <{0}>")]
    UnrecognizedRoot(String),
}

/// Result of parsing one feed document.
#[derive(Debug)]
pub struct ParsedDocument {
    /// Format family detected from the root element shape.
    pub format: FeedFormat,
    /// Normalized items, in document order.
    pub items: Vec<Item>,
    /// Entries skipped because they had no usable structure.
    pub skipped: usize,
}

/// Parses feed document bytes into normalized items.
///
/// The format is detected once from the root element (RSS documents are
/// `<rss><channel><item>…`, ATOM documents are `<feed><entry>…`) and
/// carried into per-entry normalization. A single unusable entry is
/// skipped with a warning and counted; it never fails the document.
///
/// # Errors
///
/// [`DocumentError::Xml`] when the bytes are not well-formed XML,
/// [`DocumentError::UnrecognizedRoot`] for any other root element.
pub fn parse_document(bytes: &[u8]) -> Result<ParsedDocument, DocumentError> {
    let root = Element::parse(bytes)?;

    let (format, entries): (FeedFormat, Vec<&Element>) = match root.name() {
        "rss" => (
            FeedFormat::Rss,
            root.child("channel")
                .map(|channel| channel.children("item").collect())
                .unwrap_or_default(),
        ),
        "feed" => (FeedFormat::Atom, root.children("entry").collect()),
        other => return Err(DocumentError::UnrecognizedRoot(other.to_string())),
    };

    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for entry in entries {
        match normalize(entry, format) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                tracing::warn!(format = %format, error = %e, "Skipping unusable feed entry");
            }
        }
    }

    Ok(ParsedDocument {
        format,
        items,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS_DOC: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <item><title>First</title><link>https://example.com/1</link></item>
    <item><title>Second</title><link>https://example.com/2</link></item>
</channel></rss>"#;

    const ATOM_DOC: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Example</title>
    <entry><title>First</title><link href="https://example.com/1"/></entry>
</feed>"#;

    #[test]
    fn test_rss_document_detected_and_parsed() {
        let doc = parse_document(RSS_DOC.as_bytes()).unwrap();
        assert_eq!(doc.format, FeedFormat::Rss);
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.skipped, 0);
        assert_eq!(doc.items[0].title, "First");
        assert_eq!(doc.items[1].link.as_deref(), Some("https://example.com/2"));
    }

    #[test]
    fn test_atom_document_detected_and_parsed() {
        let doc = parse_document(ATOM_DOC.as_bytes()).unwrap();
        assert_eq!(doc.format, FeedFormat::Atom);
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].link.as_deref(), Some("https://example.com/1"));
    }

    #[test]
    fn test_unrecognized_root_is_an_error() {
        let err = parse_document(b"<html><body/></html>").unwrap_err();
        match err {
            DocumentError::UnrecognizedRoot(name) => assert_eq!(name, "html"),
            e => panic!("Expected UnrecognizedRoot, got {:?}", e),
        }
    }

    #[test]
    fn test_invalid_xml_is_an_error() {
        assert!(matches!(
            parse_document(b"<not valid xml"),
            Err(DocumentError::Xml(_))
        ));
    }

    #[test]
    fn test_bad_entry_skipped_not_fatal() {
        let doc = parse_document(
            br#"<rss version="2.0"><channel>
                <item></item>
                <item><title>Good</title></item>
            </channel></rss>"#,
        )
        .unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.skipped, 1);
        assert_eq!(doc.items[0].title, "Good");
    }

    #[test]
    fn test_empty_channel_yields_no_items() {
        let doc = parse_document(br#"<rss version="2.0"><channel></channel></rss>"#).unwrap();
        assert_eq!(doc.items.len(), 0);
        assert_eq!(doc.skipped, 0);
    }
}

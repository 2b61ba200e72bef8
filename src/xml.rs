//! A small navigable element tree built on `quick-xml`.
//!
//! Feed normalization needs exactly three capabilities from an XML
//! document: child elements by tag name, attribute values by name, and
//! element text content. This module provides that surface and nothing
//! else, so the rest of the crate never touches the tokenizer directly.
//!
//! Entity handling: `quick-xml` (pinned in Cargo.toml) never parses
//! `<!ENTITY>` declarations, so only the five XML builtins resolve and a
//! custom entity is a parse error rather than an expansion. Element and
//! attribute names are matched on their local part, which is what lets
//! `content:encoded`, `dc:creator`, and default-namespaced ATOM documents
//! resolve with plain names.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Maximum allowed element nesting depth. Feed documents are shallow;
/// anything deeper is malformed or hostile.
const MAX_ELEMENT_DEPTH: usize = 50;

/// Errors from building an element tree out of document bytes.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The tokenizer rejected the input.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Element nesting exceeds the safety limit.
    #[error("element nesting exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// The document contains no root element.
    #[error("document has no root element")]
    NoRoot,
}

/// One XML element: name, attributes, child elements, and text content.
#[derive(Debug, Clone, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    /// Parses document bytes into the root element.
    ///
    /// Comments, processing instructions, and the XML declaration are
    /// skipped; anything after the root element's close tag is ignored.
    ///
    /// # Errors
    ///
    /// [`XmlError::Parse`] on malformed XML, [`XmlError::MaxDepthExceeded`]
    /// past the nesting cap, [`XmlError::NoRoot`] when the document holds
    /// no element at all.
    pub fn parse(bytes: &[u8]) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if stack.len() >= MAX_ELEMENT_DEPTH {
                        return Err(XmlError::MaxDepthExceeded(MAX_ELEMENT_DEPTH));
                    }
                    stack.push(element_from_start(&e, &reader)?);
                }
                Ok(Event::Empty(e)) => {
                    let element = element_from_start(&e, &reader)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        // A self-closing root is a complete document
                        None => return Ok(element),
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack.pop().ok_or_else(|| {
                        XmlError::Parse("close tag without matching open tag".to_string())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| XmlError::Parse(e.to_string()))?;
                        push_text(&mut top.text, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                        push_text(&mut top.text, &text);
                    }
                }
                Ok(Event::Eof) => return Err(XmlError::NoRoot),
                Err(e) => return Err(XmlError::Parse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    /// Local name of this element (namespace prefix stripped).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the named attribute, matched on its local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements with the given local name, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Concatenated text and CDATA content of this element, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }
}

fn element_from_start(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Element, XmlError> {
    let name = local_name(e.name().as_ref());

    let mut attributes = Vec::new();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed XML attribute");
                continue;
            }
        };
        let key = local_name(attr.key.as_ref());
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.into_owned(),
    }
}

fn push_text(target: &mut String, text: &str) {
    if !target.is_empty() && !text.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

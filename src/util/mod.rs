//! Utility functions shared across the crate.
//!
//! - **Text processing**: markup stripping for plain-text previews
//! - **URL validation**: scheme checking for user-supplied feed URLs

mod text;

pub use text::strip_markup;

use thiserror::Error;
use url::Url;

/// A user-supplied feed URL that cannot be fetched.
#[derive(Debug, Error)]
pub enum UrlError {
    /// Not parseable as a URL at all.
    #[error("invalid URL: {0}")]
    Invalid(#[from] url::ParseError),

    /// Parseable, but not an HTTP(S) location.
    #[error("unsupported URL scheme {0:?} (only http and https are fetchable)")]
    UnsupportedScheme(String),
}

/// Parses and validates a feed URL from user input.
///
/// Accepts only `http` and `https` URLs: a feed location is always an
/// HTTP resource, and rejecting other schemes up front gives a clearer
/// error than a transport failure later.
pub fn parse_feed_url(input: &str) -> Result<Url, UrlError> {
    let url = Url::parse(input.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_and_https_accepted() {
        assert!(parse_feed_url("https://example.com/feed.xml").is_ok());
        assert!(parse_feed_url("http://example.com/rss").is_ok());
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert!(matches!(
            parse_feed_url("file:///etc/passwd"),
            Err(UrlError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_feed_url("ftp://example.com/feed"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            parse_feed_url("not a url"),
            Err(UrlError::Invalid(_))
        ));
    }

    #[test]
    fn test_surrounding_whitespace_tolerated() {
        assert!(parse_feed_url("  https://example.com/feed.xml\n").is_ok());
    }
}

//! Feed date parsing.
//!
//! RSS carries RFC 822-style dates (`Tue, 10 Jun 2003 04:00:00 GMT`), ATOM
//! carries ISO 8601/RFC 3339 (`2003-12-13T18:30:02Z`). Real-world feeds
//! deviate in small, well-known ways within their own family, so each
//! family tries a short list of variants, but a date is never interpreted
//! against the other family's formats, since a malformed date must fail
//! loudly rather than silently become a wrong date.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::feed::FeedFormat;

/// A date string that matched none of its format family's known layouts.
#[derive(Debug, Clone, Error)]
#[error("unrecognized {family} date: {value:?}")]
pub struct DateParseError {
    /// Format family the value was parsed against.
    pub family: FeedFormat,
    /// The offending input, verbatim.
    pub value: String,
}

/// RSS variants seen in the wild beyond strict RFC 2822: missing weekday,
/// missing seconds.
const RSS_FALLBACK_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M %z",
];

/// Parses a feed date string according to its format family.
///
/// Pure function of `(value, format)`; returns the instant in UTC.
///
/// # Errors
///
/// [`DateParseError`] when the value matches none of the family's known
/// layouts. Callers treat this as "field absent", never as a fatal error.
pub fn parse_date(value: &str, format: FeedFormat) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = value.trim();
    let parsed = match format {
        FeedFormat::Rss => parse_rss(trimmed),
        FeedFormat::Atom => parse_atom(trimmed),
    };
    parsed.ok_or_else(|| DateParseError {
        family: format,
        value: value.to_string(),
    })
}

fn parse_rss(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // "UTC" is not a legal RFC 2822 zone but some generators emit it
    let normalized;
    let value = if let Some(prefix) = value.strip_suffix("UTC") {
        normalized = format!("{}+0000", prefix);
        if let Ok(dt) = DateTime::parse_from_rfc2822(&normalized) {
            return Some(dt.with_timezone(&Utc));
        }
        normalized.as_str()
    } else {
        value
    };

    for fmt in RSS_FALLBACK_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

fn parse_atom(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Date-only form some generators emit; midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(midnight.and_utc());
    }
    None
}

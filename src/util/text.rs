use std::borrow::Cow;

/// Strips markup from feed content, producing a plain-text preview.
///
/// Tags are removed (treated as word separators), character references
/// are decoded (the XML/HTML builtins, `&nbsp;`, and numeric forms), and
/// whitespace runs collapse to single spaces with the ends trimmed. UI
/// surfaces can render the result without re-parsing markup.
///
/// Returns `Cow::Borrowed` when the input is already plain, normalized
/// text (no tags, no entities, no whitespace to collapse), the common
/// case for feeds that publish plain-text descriptions. A single byte
/// scan decides this before any allocation happens.
pub fn strip_markup(s: &str) -> Cow<'_, str> {
    // Fast path: plain text with already-collapsed spacing
    let mut prev_space = true; // treat start-of-string as a space to catch leading whitespace
    let mut clean = true;
    for &b in s.as_bytes() {
        match b {
            b'<' | b'&' | b'\n' | b'\t' | b'\r' => {
                clean = false;
                break;
            }
            b' ' => {
                if prev_space {
                    clean = false;
                    break;
                }
                prev_space = true;
            }
            _ => prev_space = false,
        }
    }
    if clean && !s.ends_with(' ') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    let mut chars = s.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '<' => {
                // Skip to the closing '>'; an unterminated tag swallows the rest
                for (_, t) in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                }
                // A tag boundary separates words
                if !out.is_empty() {
                    pending_space = true;
                }
            }
            '&' => {
                let rest = &s[idx + 1..];
                match decode_entity(rest) {
                    Some((decoded, consumed)) => {
                        for _ in 0..consumed {
                            chars.next();
                        }
                        if decoded.is_whitespace() {
                            if !out.is_empty() {
                                pending_space = true;
                            }
                        } else {
                            if pending_space {
                                out.push(' ');
                                pending_space = false;
                            }
                            out.push(decoded);
                        }
                    }
                    None => {
                        if pending_space {
                            out.push(' ');
                            pending_space = false;
                        }
                        out.push('&');
                    }
                }
            }
            c if c.is_whitespace() => {
                if !out.is_empty() {
                    pending_space = true;
                }
            }
            c => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }

    Cow::Owned(out)
}

/// Decodes one character reference following a `&`.
///
/// Returns the decoded character and how many chars (excluding the `&`)
/// were consumed, or `None` when the text after `&` is not a recognizable
/// reference; the `&` then passes through literally.
fn decode_entity(rest: &str) -> Option<(char, usize)> {
    let semi = rest.char_indices().take(10).find(|(_, c)| *c == ';')?.0;
    let body = &rest[..semi];
    let consumed = semi + 1;

    let decoded = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)?
        }
    };
    Some((decoded, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_returns_borrowed() {
        let input = "Already plain text.";
        let result = strip_markup(input);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, input);
    }

    #[test]
    fn test_tags_stripped() {
        assert_eq!(strip_markup("<p>Hello <b>world</b></p>"), "Hello world");
    }

    #[test]
    fn test_adjacent_blocks_separated() {
        assert_eq!(strip_markup("<p>One</p><p>Two</p>"), "One Two");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(strip_markup("  a \n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(strip_markup("a &amp; b &lt;tag&gt;"), "a & b <tag>");
        assert_eq!(strip_markup("&quot;q&quot; &apos;a&apos;"), "\"q\" 'a'");
    }

    #[test]
    fn test_numeric_references() {
        assert_eq!(strip_markup("&#65;&#x42;"), "AB");
        assert_eq!(strip_markup("caf&#233;"), "café");
    }

    #[test]
    fn test_nbsp_collapses_like_whitespace() {
        assert_eq!(strip_markup("a&nbsp;&nbsp;b"), "a b");
    }

    #[test]
    fn test_bare_ampersand_preserved() {
        assert_eq!(strip_markup("AT&T and&unknown;"), "AT&T and&unknown;");
    }

    #[test]
    fn test_decoded_angle_brackets_are_not_tags() {
        // `&lt;b&gt;` decodes to literal text, not a tag to strip
        assert_eq!(strip_markup("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
    }

    #[test]
    fn test_unterminated_tag_swallows_rest() {
        assert_eq!(strip_markup("before <a href="), "before");
    }

    #[test]
    fn test_empty_input() {
        let result = strip_markup("");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "");
    }

    #[test]
    fn test_markup_only_input() {
        assert_eq!(strip_markup("<br/><hr/>"), "");
    }

    #[test]
    fn test_unicode_preserved() {
        assert_eq!(strip_markup("<i>日本語</i> テスト"), "日本語 テスト");
    }
}

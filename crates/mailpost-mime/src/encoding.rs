//! MIME encoding and decoding utilities.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding. Every
//! encoder emits CRLF line breaks and keeps lines within the RFC 2045 limit
//! of 76 characters.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length (RFC 2045, section 6.7 and 6.8).
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes per wrapped Base64 line (57 bytes encode to 76 characters).
const BASE64_LINE_BYTES: usize = MAX_LINE_LENGTH / 4 * 3;

/// `=?UTF-8?B?` plus `?=`.
const ENCODED_WORD_OVERHEAD: usize = "=?UTF-8?B?".len() + "?=".len();

/// Encodes data as a single line of Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into CRLF-separated 76-character lines.
///
/// The last line may be shorter and carries the padding. No trailing line
/// break is added.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let lines = data.len().div_ceil(BASE64_LINE_BYTES);
    let mut result = String::with_capacity(lines * (MAX_LINE_LENGTH + 2));

    for (i, chunk) in data.chunks(BASE64_LINE_BYTES).enumerate() {
        if i > 0 {
            result.push_str("\r\n");
        }
        STANDARD.encode_string(chunk, &mut result);
    }

    result
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Source line breaks (`\n` or `\r\n`) become CRLF hard breaks. Soft breaks
/// keep every physical line within [`MAX_LINE_LENGTH`] characters, and the
/// escaped bytes of one UTF-8 character always share a physical line.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 2);

    let mut lines = text.split('\n').peekable();
    while let Some(line) = lines.next() {
        // A CR is part of the break only when an LF follows it.
        let line = if lines.peek().is_some() {
            line.strip_suffix('\r').unwrap_or(line)
        } else {
            line
        };
        encode_qp_line(line, &mut result);
        if lines.peek().is_some() {
            result.push_str("\r\n");
        }
    }

    result
}

fn encode_qp_line(line: &str, out: &mut String) {
    let mut column = 0;
    let mut chars = line.chars().peekable();
    let mut token = String::with_capacity(12);

    while let Some(c) = chars.next() {
        let is_last = chars.peek().is_none();

        token.clear();
        match c {
            '!'..='<' | '>'..='~' => token.push(c),
            // Trailing whitespace would be stripped in transit.
            ' ' | '\t' if !is_last => token.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(token, "={byte:02X}");
                }
            }
        }

        // The last token may use the full width; others leave room for '='.
        let limit = if is_last {
            MAX_LINE_LENGTH
        } else {
            MAX_LINE_LENGTH - 1
        };
        if column > 0 && column + token.len() > limit {
            out.push_str("=\r\n");
            column = 0;
        }

        out.push_str(&token);
        column += token.len();
    }
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// Soft line breaks are removed; hard line breaks are kept as they appear.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let mut result = Vec::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        match bytes.get(i + 1..) {
            Some([b'\r', b'\n', ..]) => i += 3,
            Some([b'\n', ..]) => i += 2,
            Some([hi, lo, ..]) => {
                let hex = [*hi, *lo];
                let byte = std::str::from_utf8(&hex)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding(format!(
                            "Invalid hex escape: ={}",
                            String::from_utf8_lossy(&hex)
                        ))
                    })?;
                result.push(byte);
                i += 3;
            }
            _ => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        }
    }

    String::from_utf8(result).map_err(Into::into)
}

/// Which header field a piece of text is destined for.
///
/// The role decides how much of the first line the header name already
/// occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordRole {
    /// A display name inside an address header.
    Name,
    /// The `Subject` header.
    Subject,
}

impl WordRole {
    /// Columns taken by the header name on the first line.
    const fn prefix_len(self) -> usize {
        match self {
            // Longest address header: "Reply-To: "
            Self::Name => "Reply-To: ".len(),
            Self::Subject => "Subject: ".len(),
        }
    }
}

/// Encodes header text as RFC 2047 encoded-words when it is not pure ASCII.
///
/// Non-ASCII text becomes one or more `=?UTF-8?B?...?=` words, split on
/// character boundaries so each word fits its line, and folded with CRLF
/// followed by a space.
#[must_use]
pub fn encode_header_word(text: &str, role: WordRole) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let first_budget = max_word_bytes(MAX_LINE_LENGTH - role.prefix_len());
    let next_budget = max_word_bytes(MAX_LINE_LENGTH - 1);

    let mut words = Vec::new();
    let mut start = 0;
    let mut budget = first_budget;

    for (i, c) in text.char_indices() {
        if i + c.len_utf8() - start > budget {
            words.push(&text[start..i]);
            start = i;
            budget = next_budget;
        }
    }
    words.push(&text[start..]);

    words
        .iter()
        .map(|word| format!("=?UTF-8?B?{}?=", encode_base64(word.as_bytes())))
        .collect::<Vec<_>>()
        .join("\r\n ")
}

/// Raw bytes whose encoded-word fits in `columns`.
const fn max_word_bytes(columns: usize) -> usize {
    (columns - ENCODED_WORD_OVERHEAD) / 4 * 3
}

/// Decodes every RFC 2047 encoded-word in a header value.
///
/// Whitespace (including folding) between adjacent encoded-words is
/// dropped; text outside encoded-words is kept as is.
///
/// # Errors
///
/// Returns an error if an encoded-word is malformed.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    let mut pending_space = String::new();
    let mut after_word = false;

    while !rest.is_empty() {
        let Some(start) = rest.find("=?") else {
            result.push_str(&pending_space);
            result.push_str(rest);
            return Ok(result);
        };

        let (before, candidate) = rest.split_at(start);
        let Some((word, consumed)) = split_encoded_word(candidate) else {
            result.push_str(&pending_space);
            result.push_str(before);
            result.push_str("=?");
            pending_space.clear();
            after_word = false;
            rest = &candidate[2..];
            continue;
        };

        let between_words = after_word && before.chars().all(char::is_whitespace);
        if !between_words {
            result.push_str(&pending_space);
            result.push_str(before);
        }
        result.push_str(&decode_encoded_word(word)?);

        pending_space.clear();
        after_word = true;
        rest = &candidate[consumed..];

        let trimmed = rest.trim_start();
        if trimmed.starts_with("=?") {
            pending_space.push_str(&rest[..rest.len() - trimmed.len()]);
            rest = trimmed;
        }
    }

    Ok(result)
}

/// Returns `(charset?enc?text, bytes consumed)` for `=?charset?enc?text?=`.
fn split_encoded_word(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix("=?")?;
    let charset_end = inner.find('?')?;
    let enc_end = charset_end + 1 + inner[charset_end + 1..].find('?')?;
    let text_end = enc_end + 1 + inner[enc_end + 1..].find("?=")?;
    Some((&inner[..text_end], text_end + 4))
}

fn decode_encoded_word(word: &str) -> Result<String> {
    let mut parts = word.splitn(3, '?');
    let (Some(_charset), Some(encoding), Some(encoded_text)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidEncoding(
            "Invalid RFC 2047 format".to_string(),
        ));
    };

    match encoding.to_ascii_uppercase().as_str() {
        "B" => String::from_utf8(decode_base64(encoded_text)?).map_err(Into::into),
        "Q" => decode_quoted_printable(&encoded_text.replace('_', " ")),
        other => Err(Error::InvalidEncoding(format!("Unknown encoding: {other}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_line_lengths(encoded: &str) {
        for line in encoded.split("\r\n") {
            assert!(
                line.len() <= MAX_LINE_LENGTH,
                "line too long ({}): {line:?}",
                line.len()
            );
        }
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_wrapped_line_lengths() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let encoded = encode_base64_wrapped(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();

        let (last, full) = lines.split_last().unwrap();
        assert!(full.iter().all(|l| l.len() == MAX_LINE_LENGTH));
        assert!(!last.is_empty() && last.len() <= MAX_LINE_LENGTH);
        assert!(last.ends_with('='));
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64_wrapped_exact_multiple() {
        let data = vec![7u8; BASE64_LINE_BYTES * 2];
        let encoded = encode_base64_wrapped(&data);
        assert_eq!(encoded.len(), MAX_LINE_LENGTH * 2 + 2);
        assert!(!encoded.ends_with("\r\n"));
    }

    #[test]
    fn test_base64_wrapped_large_input() {
        let data: Vec<u8> = (0..500 * 1024).map(|i| (i % 251) as u8).collect();
        let encoded = encode_base64_wrapped(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();

        assert!(lines[..lines.len() - 1].iter().all(|l| l.len() == MAX_LINE_LENGTH));
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_base64_wrapped_empty() {
        assert_eq!(encode_base64_wrapped(b""), "");
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "H=C3=A9llo, W=C3=B8rld!");
    }

    #[test]
    fn test_quoted_printable_equals_sign() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        assert_eq!(encode_quoted_printable("one\ntwo\r\nthree"), "one\r\ntwo\r\nthree");
    }

    #[test]
    fn test_quoted_printable_bare_carriage_return() {
        assert_eq!(encode_quoted_printable("end\r"), "end=0D");
        assert_eq!(encode_quoted_printable("a\rb\r\nc"), "a=0Db\r\nc");
        assert_eq!(decode_quoted_printable("end=0D").unwrap(), "end\r");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        assert_eq!(encode_quoted_printable("end \nnext\t"), "end=20\r\nnext=09");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        assert_line_lengths(&encoded);
        assert!(encoded.contains("=\r\n"));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_exact_width_line() {
        let text = "y".repeat(MAX_LINE_LENGTH);
        assert_eq!(encode_quoted_printable(&text), text);
    }

    #[test]
    fn test_quoted_printable_keeps_characters_together() {
        let text = "é".repeat(40);
        let encoded = encode_quoted_printable(&text);
        assert_line_lengths(&encoded);
        for line in encoded.split("=\r\n") {
            // Each physical line holds whole two-byte characters.
            assert_eq!(line.len() % 6, 0, "split character in {line:?}");
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_decode() {
        let encoded = "Hello, World!";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Hello, World!");

        let encoded = "H=C3=A9llo";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = "Hello=\r\nWorld";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_decode_invalid() {
        assert!(decode_quoted_printable("bad=ZZ").is_err());
        assert!(decode_quoted_printable("cut=4").is_err());
    }

    #[test]
    fn test_header_word_ascii_passthrough() {
        assert_eq!(encode_header_word("Hello", WordRole::Subject), "Hello");
        assert_eq!(encode_header_word("a=?b?=", WordRole::Name), "a=?b?=");
    }

    #[test]
    fn test_header_word_non_ascii() {
        let encoded = encode_header_word("Héllo", WordRole::Name);
        assert_eq!(encoded, "=?UTF-8?B?SMOpbGxv?=");
        assert_eq!(decode_rfc2047(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_header_word_folds_long_text() {
        let text = "Ünïcödé subject line ".repeat(10);
        let encoded = encode_header_word(&text, WordRole::Subject);

        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(format!("Subject: {}", lines[0]).len() <= MAX_LINE_LENGTH);
        for line in &lines[1..] {
            assert!(line.starts_with(' '));
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_header_word_multibyte_boundaries() {
        let text = "日本語のテキスト".repeat(8);
        let encoded = encode_header_word(&text, WordRole::Name);
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_rfc2047_decode() {
        let encoded = "Hello";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Hello");

        let encoded = "=?utf-8?B?SMOpbGxv?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_rfc2047_quoted_printable() {
        let encoded = "=?utf-8?Q?H=C3=A9llo_there?=";
        let decoded = decode_rfc2047(encoded).unwrap();
        assert_eq!(decoded, "Héllo there");
    }

    #[test]
    fn test_rfc2047_mixed_text() {
        let decoded = decode_rfc2047("Re: =?UTF-8?B?SMOpbGxv?= world").unwrap();
        assert_eq!(decoded, "Re: Héllo world");
    }

    #[test]
    fn test_rfc2047_unknown_encoding() {
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_reversible(text in "\\PC{0,300}|[a-z\r\n ]{0,80}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
            let decoded = decode_quoted_printable(&encoded).unwrap();
            prop_assert_eq!(decoded, text.replace("\r\n", "\n").replace('\n', "\r\n"));
        }

        #[test]
        fn prop_header_word_reversible(tail in "\\PC{0,120}") {
            let text = format!("é{tail}");
            let encoded = encode_header_word(&text, WordRole::Subject);
            prop_assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
        }
    }
}

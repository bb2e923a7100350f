//! MIME content type handling.

use crate::error::{Error, Result};
use std::fmt::{self, Write as _};

/// RFC 2045 `tspecials`; parameter values containing them are quoted.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// MIME content type with parameters.
///
/// Parameters keep their insertion order so rendered headers are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into().to_lowercase();
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.parameters.push((key, value)),
        }
        self
    }

    /// Returns a parameter value by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing or not a token.
    pub fn parse(s: &str) -> Result<Self> {
        if s.contains(['\r', '\n']) {
            return Err(Error::InvalidContentType(format!("Line break in: {s:?}")));
        }

        let mut parts = s.split(';');

        let type_str = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = type_str
            .split_once('/')
            .map(|(main, sub)| (main.trim().to_lowercase(), sub.trim().to_lowercase()))
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype: {s}")))?;

        if !is_token(&main_type) || !is_token(&sub_type) {
            return Err(Error::InvalidContentType(s.to_string()));
        }

        let mut content_type = Self::new(main_type, sub_type);

        for param in parts {
            if let Some((key, value)) = param.trim().split_once('=') {
                content_type = content_type.with_parameter(key.trim(), unquote(value.trim()));
            }
        }

        Ok(content_type)
    }
}

/// Strips surrounding quotes and resolves quoted-pairs.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_graphic() && !TSPECIALS.contains(c))
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c)) {
                f.write_str("; ")?;
                f.write_str(key)?;
                f.write_str("=\"")?;
                for c in value.chars() {
                    match c {
                        '"' | '\\' => write!(f, "\\{c}")?,
                        '\r' | '\n' => f.write_char(' ')?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('"')?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_text_plain() {
        let ct = ContentType::text_plain();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.parameter("charset"), Some("utf-8"));
        assert_eq!(ct.to_string(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_octet_stream_has_no_parameters() {
        let ct = ContentType::octet_stream();
        assert_eq!(ct.to_string(), "application/octet-stream");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_boundary_with_specials_is_quoted() {
        let ct = ContentType::multipart_alternative("=_abc");
        assert_eq!(ct.to_string(), "multipart/alternative; boundary=\"=_abc\"");
    }

    #[test]
    fn test_parse_attachment_type() {
        let ct = ContentType::parse("Application/PDF; Name=report.pdf").unwrap();
        assert_eq!(ct.essence(), "application/pdf");
        assert_eq!(ct.parameter("name"), Some("report.pdf"));
        assert_eq!(ct.to_string(), "application/pdf; name=report.pdf");
    }

    #[test]
    fn test_parse_quoted_boundary_roundtrip() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"=_Xy12\"").unwrap();
        assert_eq!(ct.essence(), "multipart/mixed");
        assert_eq!(ct.parameter("boundary"), Some("=_Xy12"));
        assert_eq!(ct, ContentType::multipart_mixed("=_Xy12"));
    }

    #[test]
    fn test_content_type_parse_invalid() {
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("pdf").is_err());
        assert!(ContentType::parse("image/").is_err());
        assert!(ContentType::parse("a b/c").is_err());
    }

    #[test]
    fn test_parse_rejects_line_breaks() {
        let err = ContentType::parse("image/png; name=\"a\r\nX-Injected: yes\"").unwrap_err();
        assert!(matches!(err, Error::InvalidContentType(_)));
        assert!(ContentType::parse("text/plain\n").is_err());
    }

    #[test]
    fn test_quoted_values_escaped() {
        let ct = ContentType::octet_stream().with_parameter("name", "say \"hi\"\\.txt");
        assert_eq!(
            ct.to_string(),
            "application/octet-stream; name=\"say \\\"hi\\\"\\\\.txt\""
        );
        assert_eq!(ContentType::parse(&ct.to_string()).unwrap(), ct);
    }

    #[test]
    fn test_line_breaks_in_values_not_rendered() {
        let ct = ContentType::octet_stream().with_parameter("name", "a\r\nX-Injected: yes");
        let rendered = ct.to_string();
        assert!(!rendered.contains(['\r', '\n']));
        assert_eq!(rendered, "application/octet-stream; name=\"a  X-Injected: yes\"");
    }

    #[test]
    fn test_parameter_order_preserved() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");

        assert_eq!(ct.to_string(), "text/plain; charset=iso-8859-1; format=flowed");
        assert_eq!(ct.parameter("FORMAT"), Some("flowed"));
    }

    #[test]
    fn test_with_parameter_replaces() {
        let ct = ContentType::text_plain().with_parameter("Charset", "us-ascii");
        assert_eq!(ct.parameters.len(), 1);
        assert_eq!(ct.parameter("charset"), Some("us-ascii"));
    }
}

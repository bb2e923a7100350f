//! Ordered header collections.

use std::fmt;

/// Ordered multi-map of header fields.
///
/// Names are matched case-insensitively but rendered exactly as inserted,
/// and fields are rendered in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Appends every field of `other`.
    pub fn extend(&mut self, other: Self) {
        self.fields.extend(other.fields);
    }
}

/// Renders each field as `Name: value` followed by CRLF.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {value}\r\n")?;
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
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_extend_appends_in_order() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");

        let mut part = Headers::new();
        part.add("Content-Type", "text/plain; charset=utf-8");
        part.add("Content-Transfer-Encoding", "quoted-printable");
        headers.extend(part);

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["From", "Content-Type", "Content-Transfer-Encoding"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_headers_display_keeps_order_and_case() {
        let mut headers = Headers::new();
        headers.add("To", "recipient@example.com");
        headers.add("From", "sender@example.com");
        headers.add("x-custom", "value");

        assert_eq!(
            headers.to_string(),
            "To: recipient@example.com\r\nFrom: sender@example.com\r\nx-custom: value\r\n"
        );
    }

    #[test]
    fn test_headers_duplicates_kept() {
        let mut headers = Headers::new();
        headers.add("X-Tag", "a");
        headers.add("x-tag", "b");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("X-TAG"), Some("a"));
        assert_eq!(headers.to_string(), "X-Tag: a\r\nx-tag: b\r\n");
    }
}

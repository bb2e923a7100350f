//! MIME body tree construction and serialization.
//!
//! [`build_tree`] picks the body structure:
//!
//! ```text
//! text only / html only      -> Simple (quoted-printable)
//! text + html                -> multipart/alternative [text/plain, text/html]
//! any attachments            -> multipart/mixed [body, attachment...]
//! ```
//!
//! Boundaries start with `=_`. That sequence never occurs in quoted-printable
//! output (`=` is always followed by a hex digit or a line break) nor in
//! Base64 output, so no encoded body line can collide with a delimiter.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable};
use crate::header::Headers;
use crate::token::TokenSource;
use bytes::Bytes;
use std::fmt::{self, Write as _};

/// Body content of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain text only.
    Text(String),
    /// HTML, optionally with a plain text alternative.
    Html {
        /// HTML body.
        html: String,
        /// Plain text alternative.
        text: Option<String>,
    },
}

impl Content {
    /// Plain text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// HTML-only content.
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        Self::Html {
            html: html.into(),
            text: None,
        }
    }

    /// HTML content with a plain text alternative.
    #[must_use]
    pub fn alternative(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self::Html {
            html: html.into(),
            text: Some(text.into()),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// Attachment whose bytes are already available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type; empty means `application/octet-stream`.
    pub content_type: String,
    /// Content-ID for inline references; empty means none.
    pub content_id: String,
    /// Whether the part is displayed inline.
    pub inline: bool,
    /// Raw attachment bytes.
    pub data: Bytes,
}

/// Content transfer encoding of a leaf part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Base64 => write!(f, "base64"),
        }
    }
}

/// `Content-Disposition` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed within the message body.
    Inline,
    /// Offered as a separate download.
    Attachment,
}

/// `Content-Disposition` of an attachment part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Disposition type.
    pub kind: DispositionKind,
    /// File name parameter.
    pub filename: String,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DispositionKind::Inline => f.write_str("inline")?,
            DispositionKind::Attachment => f.write_str("attachment")?,
        }

        if self.filename.is_empty() {
            Ok(())
        } else if self.filename.is_ascii() && !self.filename.contains(['\r', '\n']) {
            let escaped = self.filename.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "; filename=\"{escaped}\"")
        } else {
            write!(f, "; filename*=UTF-8''{}", percent_encode(&self.filename))
        }
    }
}

/// RFC 2231 extended-value encoding.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Multipart subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartKind {
    /// `multipart/alternative`.
    Alternative,
    /// `multipart/mixed`.
    Mixed,
}

/// Leaf part carrying an encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplePart {
    /// Content type, including the charset for text parts.
    pub content_type: ContentType,
    /// Transfer encoding applied to `body`.
    pub transfer_encoding: TransferEncoding,
    /// Disposition, for attachments.
    pub disposition: Option<Disposition>,
    /// Content-ID, without angle brackets.
    pub content_id: Option<String>,
    /// Transfer-encoded body with CRLF line breaks.
    pub body: String,
}

/// Container part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    /// Multipart subtype.
    pub kind: MultipartKind,
    /// Delimiter token, unique per message.
    pub boundary: String,
    /// Child parts in order.
    pub children: Vec<MimePart>,
}

/// Node of a MIME body tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePart {
    /// Leaf part.
    Simple(SimplePart),
    /// Container part.
    Multipart(Multipart),
}

impl MimePart {
    /// Creates a quoted-printable text leaf.
    #[must_use]
    pub fn text(content_type: ContentType, text: &str) -> Self {
        Self::Simple(SimplePart {
            content_type,
            transfer_encoding: TransferEncoding::QuotedPrintable,
            disposition: None,
            content_id: None,
            body: encode_quoted_printable(text),
        })
    }

    /// Creates a Base64 attachment leaf.
    #[must_use]
    pub fn attachment(attachment: &ResolvedAttachment) -> Self {
        let content_type = attachment_content_type(&attachment.content_type);
        let kind = if attachment.inline {
            DispositionKind::Inline
        } else {
            DispositionKind::Attachment
        };
        let content_id = clean_content_id(&attachment.content_id);

        Self::Simple(SimplePart {
            content_type,
            transfer_encoding: TransferEncoding::Base64,
            disposition: Some(Disposition {
                kind,
                filename: attachment.filename.clone(),
            }),
            content_id: (!content_id.is_empty()).then_some(content_id),
            body: encode_base64_wrapped(&attachment.data),
        })
    }

    /// Returns the content type of this part.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Simple(part) => part.content_type.clone(),
            Self::Multipart(part) => match part.kind {
                MultipartKind::Alternative => ContentType::multipart_alternative(&part.boundary),
                MultipartKind::Mixed => ContentType::multipart_mixed(&part.boundary),
            },
        }
    }

    /// Returns the child parts; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Simple(_) => &[],
            Self::Multipart(part) => &part.children,
        }
    }

    /// Returns the boundary of a multipart node.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        match self {
            Self::Simple(_) => None,
            Self::Multipart(part) => Some(&part.boundary),
        }
    }

    /// Returns the `Content-*` headers describing this part.
    #[must_use]
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.add("Content-Type", self.content_type().to_string());

        if let Self::Simple(part) = self {
            headers.add("Content-Transfer-Encoding", part.transfer_encoding.to_string());
            if let Some(disposition) = &part.disposition {
                headers.add("Content-Disposition", disposition.to_string());
            }
            if let Some(id) = &part.content_id {
                headers.add("Content-ID", format!("<{id}>"));
            }
        }

        headers
    }

    /// Appends the serialized body of this part to `out`.
    ///
    /// The output always ends with CRLF.
    pub fn write_body(&self, out: &mut String) {
        match self {
            Self::Simple(part) => {
                out.push_str(&part.body);
                out.push_str("\r\n");
            }
            Self::Multipart(part) => {
                for child in &part.children {
                    let _ = write!(out, "--{}\r\n{}\r\n", part.boundary, child.headers());
                    child.write_body(out);
                }
                let _ = write!(out, "--{}--\r\n", part.boundary);
            }
        }
    }
}

/// Renders the part as headers, a blank line and the body.
impl fmt::Display for MimePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        self.write_body(&mut body);
        write!(f, "{}\r\n{body}", self.headers())
    }
}

fn attachment_content_type(declared: &str) -> ContentType {
    let declared = declared.trim();
    if declared.is_empty() {
        return ContentType::octet_stream();
    }

    ContentType::parse(declared).unwrap_or_else(|e| {
        tracing::warn!(content_type = declared, error = %e, "Unusable attachment content type");
        ContentType::octet_stream()
    })
}

/// Normalizes a Content-ID to its bare form, without angle brackets.
///
/// Whitespace and control characters cannot appear in a msg-id and are
/// dropped.
fn clean_content_id(declared: &str) -> String {
    let id = declared.trim();
    let id = id.strip_prefix('<').unwrap_or(id);
    let id = id.strip_suffix('>').unwrap_or(id);
    let cleaned: String = id
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '<' | '>'))
        .collect();
    if cleaned.len() != id.len() {
        tracing::warn!(content_id = ?declared, "Removed characters from Content-ID");
    }
    cleaned
}

fn new_boundary(tokens: &dyn TokenSource) -> String {
    format!("=_{}", tokens.token())
}

fn content_part(content: &Content, tokens: &dyn TokenSource) -> MimePart {
    match content {
        Content::Text(text) => MimePart::text(ContentType::text_plain(), text),
        Content::Html { html, text: None } => MimePart::text(ContentType::text_html(), html),
        Content::Html {
            html,
            text: Some(text),
        } => MimePart::Multipart(Multipart {
            kind: MultipartKind::Alternative,
            boundary: new_boundary(tokens),
            children: vec![
                MimePart::text(ContentType::text_plain(), text),
                MimePart::text(ContentType::text_html(), html),
            ],
        }),
    }
}

/// Builds the body tree for `content` and `attachments`.
///
/// Every multipart node gets a fresh boundary from `tokens`.
#[must_use]
pub fn build_tree(
    content: &Content,
    attachments: &[ResolvedAttachment],
    tokens: &dyn TokenSource,
) -> MimePart {
    let body = content_part(content, tokens);
    if attachments.is_empty() {
        return body;
    }

    let mut children = Vec::with_capacity(attachments.len() + 1);
    children.push(body);
    children.extend(attachments.iter().map(MimePart::attachment));

    tracing::trace!(attachments = attachments.len(), "Built multipart/mixed tree");

    MimePart::Multipart(Multipart {
        kind: MultipartKind::Mixed,
        boundary: new_boundary(tokens),
        children,
    })
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
    use crate::token::SequentialTokens;

    fn attachment(filename: &str, content_type: &str) -> ResolvedAttachment {
        ResolvedAttachment {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            content_id: String::new(),
            inline: false,
            data: Bytes::from_static(b"%PDF-1.4 fake"),
        }
    }

    fn essence(part: &MimePart) -> String {
        part.content_type().essence()
    }

    #[test]
    fn test_text_only_is_simple() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(&Content::text("Hello"), &[], &tokens);

        let MimePart::Simple(part) = &tree else {
            panic!("expected simple part");
        };
        assert_eq!(part.content_type.to_string(), "text/plain; charset=utf-8");
        assert_eq!(part.transfer_encoding, TransferEncoding::QuotedPrintable);
        assert_eq!(part.body, "Hello");
        assert_eq!(tokens.issued(), 0);
    }

    #[test]
    fn test_html_only_is_simple() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(&Content::html("<p>Hi</p>"), &[], &tokens);
        assert_eq!(essence(&tree), "text/html");
        assert!(tree.children().is_empty());
    }

    #[test]
    fn test_alternative_order() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(&Content::alternative("Hi", "<p>Hi</p>"), &[], &tokens);

        assert_eq!(essence(&tree), "multipart/alternative");
        assert_eq!(tree.boundary(), Some("=_T0000"));
        let kinds: Vec<String> = tree.children().iter().map(essence).collect();
        assert_eq!(kinds, vec!["text/plain", "text/html"]);
    }

    #[test]
    fn test_mixed_with_attachment() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(
            &Content::text("See attached"),
            &[attachment("report.pdf", "application/pdf")],
            &tokens,
        );

        assert_eq!(essence(&tree), "multipart/mixed");
        let children = tree.children();
        assert_eq!(children.len(), 2);
        assert_eq!(essence(&children[0]), "text/plain");

        let MimePart::Simple(part) = &children[1] else {
            panic!("expected attachment leaf");
        };
        assert_eq!(part.transfer_encoding, TransferEncoding::Base64);
        assert_eq!(part.content_type.essence(), "application/pdf");
        assert_eq!(
            part.disposition.as_ref().unwrap().to_string(),
            "attachment; filename=\"report.pdf\""
        );
        assert!(part.content_id.is_none());
        assert!(children[1].headers().get("Content-ID").is_none());
    }

    #[test]
    fn test_mixed_nests_alternative() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(
            &Content::alternative("Hi", "<p>Hi</p>"),
            &[attachment("a.bin", "")],
            &tokens,
        );

        let children = tree.children();
        assert_eq!(essence(&children[0]), "multipart/alternative");
        assert_eq!(essence(&children[1]), "application/octet-stream");
        assert_ne!(tree.boundary(), children[0].boundary());
    }

    #[test]
    fn test_unparseable_content_type_falls_back() {
        let part = MimePart::attachment(&attachment("x", "not a type"));
        assert_eq!(essence(&part), "application/octet-stream");
    }

    #[test]
    fn test_inline_attachment_with_content_id() {
        let mut inline = attachment("logo.png", "image/png");
        inline.inline = true;
        inline.content_id = "<logo@example.com>".to_string();

        let headers = MimePart::attachment(&inline).headers();
        assert_eq!(
            headers.get("Content-Disposition"),
            Some("inline; filename=\"logo.png\"")
        );
        assert_eq!(headers.get("Content-ID"), Some("<logo@example.com>"));
    }

    #[test]
    fn test_attachment_metadata_stays_in_its_headers() {
        let mut inline = attachment("a.png", "image/png; name=\"a\r\nX-Injected: yes\"");
        inline.inline = true;
        inline.content_id = "id\r\nX-Also: injected".to_string();

        let headers = MimePart::attachment(&inline).headers();
        let rendered = headers.to_string();

        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("Content-Type"), Some("application/octet-stream"));
        assert_eq!(headers.get("Content-ID"), Some("<idX-Also:injected>"));
        for line in rendered.split_terminator("\r\n") {
            assert!(line.starts_with("Content-"), "{line:?}");
        }
    }

    #[test]
    fn test_non_ascii_filename() {
        let disposition = Disposition {
            kind: DispositionKind::Attachment,
            filename: "résumé.pdf".to_string(),
        };
        assert_eq!(
            disposition.to_string(),
            "attachment; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_serialized_structure() {
        let tokens = SequentialTokens::default();
        let tree = build_tree(
            &Content::alternative("Plain", "<b>Rich</b>"),
            &[attachment("f.txt", "text/plain")],
            &tokens,
        );

        let mut body = String::new();
        tree.write_body(&mut body);

        let expected = concat!(
            "--=_T0001\r\n",
            "Content-Type: multipart/alternative; boundary=\"=_T0000\"\r\n",
            "\r\n",
            "--=_T0000\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "Plain\r\n",
            "--=_T0000\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "Content-Transfer-Encoding: quoted-printable\r\n",
            "\r\n",
            "<b>Rich</b>\r\n",
            "--=_T0000--\r\n",
            "--=_T0001\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-Disposition: attachment; filename=\"f.txt\"\r\n",
            "\r\n",
            "JVBERi0xLjQgZmFrZQ==\r\n",
            "--=_T0001--\r\n",
        );
        assert_eq!(body, expected);
    }

    #[test]
    fn test_boundary_never_in_body() {
        let tokens = SequentialTokens::default();
        let tricky = "--=_T0000\n=_T0000 and = signs\n".repeat(5);
        let mut bad = attachment("x.bin", "application/octet-stream");
        bad.data = Bytes::from(tricky.clone().into_bytes());
        let tree = build_tree(&Content::alternative(&tricky, &tricky), &[bad], &tokens);

        let mut body = String::new();
        tree.write_body(&mut body);
        let delimiters = body.lines().filter(|l| l.starts_with("--=_")).count();
        // Two alternative children + close, two mixed children + close.
        assert_eq!(delimiters, 6);
    }
}

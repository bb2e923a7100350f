//! Message composition.
//!
//! Turns a [`Message`] into an [`Envelope`] and a raw RFC 5322 message.
//! Header order is fixed:
//!
//! ```text
//! From, To, Cc?, Reply-To?, Subject, Date, Message-ID, MIME-Version,
//! X-Priority?, X-MSMail-Priority?, custom headers..., Content-Type,
//! Content-Transfer-Encoding?
//! ```

mod config;
mod envelope;

pub use config::{ComposeConfig, ComposeConfigBuilder};
pub use envelope::{ComposedMessage, Envelope};

use crate::error::{Error, Result};
use crate::message::{Attachment, Message};
use crate::time::{Clock, SystemClock};
use mailpost_mime::encoding::{MAX_LINE_LENGTH, WordRole, encode_header_word};
use mailpost_mime::{
    Address, Headers, RandomTokens, ResolvedAttachment, TokenSource, build_tree,
    quote_display_name,
};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Header names the composer owns; custom headers with these names are
/// dropped whether or not the message emits them.
const RESERVED_HEADERS: &[&str] = &[
    "from",
    "to",
    "cc",
    "bcc",
    "reply-to",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "x-priority",
    "x-msmail-priority",
    "content-type",
    "content-transfer-encoding",
    "content-disposition",
    "content-id",
];

/// Builds envelopes and raw MIME messages.
///
/// The composer holds no per-message state and can be shared across tasks.
#[derive(Clone)]
pub struct Composer {
    config: ComposeConfig,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
}

impl Composer {
    /// Creates a composer with random tokens and the system clock.
    #[must_use]
    pub fn new(config: ComposeConfig) -> Self {
        Self {
            config,
            tokens: Arc::new(RandomTokens),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the source of Message-ID and boundary tokens.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Replaces the clock used for the `Date` header.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Composes `message` into an envelope and raw message.
    ///
    /// All attachment content is loaded, in declaration order, before any
    /// encoding starts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AttachmentLoad`] if any attachment fails to load; no
    /// partial output is produced.
    pub async fn compose(&self, message: &Message) -> Result<ComposedMessage> {
        let attachments = resolve_attachments(&message.attachments).await?;

        let envelope = Envelope::for_message(message);
        let message_id = format!(
            "<{}@{}>",
            self.tokens.token(),
            self.config.message_id_domain_for(message.sender.domain())
        );
        let tree = build_tree(&message.content, &attachments, self.tokens.as_ref());

        let mut headers = Headers::new();
        headers.add("From", format_mailbox(&message.sender, "From: ".len()));
        headers.add("To", format_address_list("To", &message.recipients));
        if !message.cc.is_empty() {
            headers.add("Cc", format_address_list("Cc", &message.cc));
        }
        if !message.reply.is_empty() {
            headers.add("Reply-To", format_address_list("Reply-To", &message.reply));
        }
        headers.add(
            "Subject",
            encode_header_word(&single_line(&message.subject), WordRole::Subject),
        );
        headers.add("Date", self.clock.now().to_rfc2822());
        headers.add("Message-ID", message_id.as_str());
        headers.add("MIME-Version", "1.0");
        if let Some((x_priority, ms_priority)) = message.priority.header_values() {
            headers.add("X-Priority", x_priority);
            headers.add("X-MSMail-Priority", ms_priority);
        }

        for (name, value) in message.headers.iter() {
            let name = name.to_ascii_lowercase();
            if RESERVED_HEADERS.contains(&name.as_str()) {
                tracing::debug!(header = %name, "Skipping custom header reserved for the composer");
                continue;
            }
            if !is_field_name(&name) {
                tracing::warn!(header = %name, "Skipping custom header with invalid name");
                continue;
            }
            headers.add(name, single_line(value));
        }
        headers.extend(tree.headers());

        let mut raw = format!("{headers}\r\n");
        tree.write_body(&mut raw);

        tracing::debug!(
            message_id = %message_id,
            recipients = envelope.to.len(),
            attachments = attachments.len(),
            headers = headers.len(),
            bytes = raw.len(),
            "Composed message"
        );

        Ok(ComposedMessage {
            envelope,
            raw,
            message_id,
        })
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(ComposeConfig::default())
    }
}

impl fmt::Debug for Composer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn resolve_attachments(attachments: &[Attachment]) -> Result<Vec<ResolvedAttachment>> {
    let mut resolved = Vec::with_capacity(attachments.len());

    for attachment in attachments {
        let data = attachment
            .content
            .load()
            .await
            .map_err(|source| Error::AttachmentLoad {
                filename: attachment.filename.clone(),
                source,
            })?;
        tracing::trace!(filename = %attachment.filename, bytes = data.len(), "Loaded attachment");

        resolved.push(ResolvedAttachment {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            content_id: attachment.content_id.clone(),
            inline: attachment.inline,
            data,
        });
    }

    Ok(resolved)
}

/// Replaces line breaks so a value cannot start a new header line.
fn single_line(value: &str) -> Cow<'_, str> {
    if value.contains(['\r', '\n']) {
        Cow::Owned(value.replace("\r\n", " ").replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

/// RFC 5322 field name: printable ASCII except `:`.
fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
}

/// Renders one mailbox starting at `column`, encoding a non-ASCII display
/// name.
///
/// The angle address moves to a continuation line when it would not fit
/// after the name.
fn format_mailbox(address: &Address, column: usize) -> String {
    let Some(name) = address.name() else {
        return address.address().to_string();
    };

    let name = single_line(name);
    let rendered = if name.is_ascii() {
        quote_display_name(&name).into_owned()
    } else {
        encode_header_word(&name, WordRole::Name)
    };

    let name_end = match rendered.rfind("\r\n") {
        Some(pos) => rendered.len() - pos - 2,
        None => column + rendered.len(),
    };
    let angle_addr = format!("<{}>", address.address());

    if name_end + 1 + angle_addr.len() > MAX_LINE_LENGTH {
        format!("{rendered}\r\n {angle_addr}")
    } else {
        format!("{rendered} {angle_addr}")
    }
}

/// Renders an address list, folding between addresses to keep lines short.
fn format_address_list(field: &str, addresses: &[Address]) -> String {
    let mut value = String::new();
    let mut column = field.len() + 2;

    for (i, address) in addresses.iter().enumerate() {
        let mut item = if i == 0 {
            format_mailbox(address, column)
        } else {
            format_mailbox(address, column + 2)
        };

        if i > 0 {
            let first_line = item.split("\r\n").next().unwrap_or_default().len();
            if column + 2 + first_line > MAX_LINE_LENGTH {
                value.push_str(",\r\n ");
                column = 1;
                item = format_mailbox(address, column);
            } else {
                value.push_str(", ");
                column += 2;
            }
        }

        column = match item.rfind("\r\n") {
            Some(pos) => item.len() - pos - 2,
            None => column + item.len(),
        };
        value.push_str(&item);
    }

    value
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

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_format_mailbox_plain() {
        assert_eq!(format_mailbox(&addr("a@example.com"), 6), "a@example.com");
        assert_eq!(format_mailbox(&addr("Ann <a@example.com>"), 6), "Ann <a@example.com>");
        assert_eq!(
            format_mailbox(&addr("\"Lee, Ann\" <a@example.com>"), 6),
            "\"Lee, Ann\" <a@example.com>"
        );
    }

    #[test]
    fn test_format_mailbox_encodes_name_only() {
        let rendered = format_mailbox(&addr("Zoë <zoe@example.com>"), 6);
        assert_eq!(rendered, "=?UTF-8?B?Wm/Dqw==?= <zoe@example.com>");
    }

    #[test]
    fn test_format_mailbox_moves_long_address() {
        let address = addr("Ærøskøbing Færgefart Kundeservice <reservations.department@example.com>");
        let rendered = format_mailbox(&address, "From: ".len());

        let header = format!("From: {rendered}");
        for line in header.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line:?}");
        }
        assert!(rendered.ends_with("\r\n <reservations.department@example.com>"));
    }

    #[test]
    fn test_address_list_moves_long_address() {
        let list = vec![
            addr("a@example.com"),
            addr("Ærøskøbing Færgefart <reservations.department@example.com>"),
        ];
        let value = format_address_list("To", &list);

        let header = format!("To: {value}");
        for line in header.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line:?}");
        }
        assert!(value.starts_with("a@example.com, =?UTF-8?B?"));
        assert!(value.ends_with("?=\r\n <reservations.department@example.com>"));
    }

    #[test]
    fn test_address_list_folds() {
        let list: Vec<Address> = (0..10)
            .map(|i| addr(&format!("recipient{i}@example.com")))
            .collect();
        let value = format_address_list("To", &list);

        let header = format!("To: {value}");
        for line in header.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line:?}");
        }
        assert!(value.contains(",\r\n "));
        let unfolded = value.replace("\r\n", "");
        assert_eq!(unfolded.matches("@example.com").count(), 10);
    }

    #[test]
    fn test_address_list_empty() {
        assert_eq!(format_address_list("To", &[]), "");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("plain"), "plain");
        assert_eq!(single_line("a\r\nBcc: x@y"), "a Bcc: x@y");
        assert_eq!(single_line("a\nb\rc"), "a b c");
    }

    #[test]
    fn test_is_field_name() {
        assert!(is_field_name("x-campaign"));
        assert!(!is_field_name("bad name"));
        assert!(!is_field_name("bad:name"));
        assert!(!is_field_name(""));
    }
}

//! SMTP envelope and composition output.

use crate::message::Message;

/// SMTP-level sender and recipients.
///
/// A transport issues `MAIL FROM:<from>` and one `RCPT TO:<addr>` per entry
/// of `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Bare sender address.
    pub from: String,
    /// Bare recipient addresses: recipients, then cc, then bcc. Duplicates
    /// are kept.
    pub to: Vec<String>,
}

impl Envelope {
    /// Derives the envelope of `message`.
    #[must_use]
    pub fn for_message(message: &Message) -> Self {
        Self {
            from: message.sender.address().to_string(),
            to: message
                .all_recipients()
                .map(|addr| addr.address().to_string())
                .collect(),
        }
    }
}

/// A composed message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    /// SMTP envelope.
    pub envelope: Envelope,
    /// RFC 5322 message with CRLF line endings, suitable as the DATA payload.
    pub raw: String,
    /// Generated Message-ID, including angle brackets.
    pub message_id: String,
}

impl ComposedMessage {
    /// Returns the raw message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    /// Splits into envelope and raw message.
    #[must_use]
    pub fn into_parts(self) -> (Envelope, String) {
        (self.envelope, self.raw)
    }
}

//! Provider-agnostic outgoing message model.

mod attachment;
mod builder;

pub use attachment::{Attachment, AttachmentContent, AttachmentLoader, LoadFuture};
pub use builder::MessageBuilder;

use mailpost_mime::{Address, Content, Headers};

/// Message importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Urgent.
    High,
    /// No priority headers are emitted.
    #[default]
    Normal,
    /// Not urgent.
    Low,
}

impl Priority {
    /// Returns the `X-Priority` and `X-MSMail-Priority` values.
    #[must_use]
    pub const fn header_values(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::High => Some(("1", "High")),
            Self::Normal => None,
            Self::Low => Some(("5", "Low")),
        }
    }
}

/// An email message to send.
#[derive(Debug, Clone)]
pub struct Message {
    /// Sender.
    pub sender: Address,
    /// Primary recipients.
    pub recipients: Vec<Address>,
    /// Carbon-copy recipients.
    pub cc: Vec<Address>,
    /// Blind carbon-copy recipients (envelope only).
    pub bcc: Vec<Address>,
    /// Reply-To addresses.
    pub reply: Vec<Address>,
    /// Subject line.
    pub subject: String,
    /// Body content.
    pub content: Content,
    /// Attachments in declaration order.
    pub attachments: Vec<Attachment>,
    /// Importance.
    pub priority: Priority,
    /// Provider tags; not rendered into the MIME message.
    pub tags: Vec<String>,
    /// Extra header fields.
    pub headers: Headers,
}

impl Message {
    /// Starts building a message from `sender`.
    #[must_use]
    pub fn builder(sender: Address) -> MessageBuilder {
        MessageBuilder::new(sender)
    }

    /// Returns every envelope recipient: recipients, then cc, then bcc.
    pub fn all_recipients(&self) -> impl Iterator<Item = &Address> {
        self.recipients
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
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
    fn test_priority_headers() {
        assert_eq!(Priority::High.header_values(), Some(("1", "High")));
        assert_eq!(Priority::Low.header_values(), Some(("5", "Low")));
        assert_eq!(Priority::Normal.header_values(), None);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_all_recipients_order() {
        let message = Message::builder(Address::new("me@example.com").unwrap())
            .bcc(Address::new("c@example.com").unwrap())
            .cc(Address::new("b@example.com").unwrap())
            .to(Address::new("a@example.com").unwrap())
            .to(Address::new("a@example.com").unwrap())
            .build();

        let all: Vec<&str> = message.all_recipients().map(Address::address).collect();
        assert_eq!(
            all,
            vec!["a@example.com", "a@example.com", "b@example.com", "c@example.com"]
        );
    }
}

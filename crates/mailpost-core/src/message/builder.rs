//! Builder for [`Message`].

use super::{Attachment, Message, Priority};
use mailpost_mime::{Address, Content, Headers};

/// Builder for outgoing messages.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    sender: Address,
    recipients: Vec<Address>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    reply: Vec<Address>,
    subject: String,
    text: Option<String>,
    html: Option<String>,
    attachments: Vec<Attachment>,
    priority: Priority,
    tags: Vec<String>,
    headers: Headers,
}

impl MessageBuilder {
    /// Creates a builder for a message from `sender`.
    #[must_use]
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            recipients: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply: Vec::new(),
            subject: String::new(),
            text: None,
            html: None,
            attachments: Vec::new(),
            priority: Priority::Normal,
            tags: Vec::new(),
            headers: Headers::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: Address) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: Address) -> Self {
        self.cc.push(recipient);
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: Address) -> Self {
        self.bcc.push(recipient);
        self
    }

    /// Adds a Reply-To address.
    #[must_use]
    pub fn reply_to(mut self, address: Address) -> Self {
        self.reply.push(address);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a provider tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Appends a custom header field.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Builds the message.
    ///
    /// HTML with or without text becomes [`Content::Html`]; text alone
    /// becomes [`Content::Text`]; no body at all is an empty text body.
    #[must_use]
    pub fn build(self) -> Message {
        let content = match (self.html, self.text) {
            (Some(html), text) => Content::Html { html, text },
            (None, Some(text)) => Content::Text(text),
            (None, None) => Content::default(),
        };

        Message {
            sender: self.sender,
            recipients: self.recipients,
            cc: self.cc,
            bcc: self.bcc,
            reply: self.reply,
            subject: self.subject,
            content,
            attachments: self.attachments,
            priority: self.priority,
            tags: self.tags,
            headers: self.headers,
        }
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

    fn sender() -> Address {
        Address::new("sender@example.com").unwrap()
    }

    #[test]
    fn test_builder_content_variants() {
        let text_only = MessageBuilder::new(sender()).text_body("hi").build();
        assert_eq!(text_only.content, Content::Text("hi".to_string()));

        let html_only = MessageBuilder::new(sender()).html_body("<p>hi</p>").build();
        assert_eq!(html_only.content, Content::html("<p>hi</p>"));

        let both = MessageBuilder::new(sender())
            .text_body("hi")
            .html_body("<p>hi</p>")
            .build();
        assert_eq!(both.content, Content::alternative("hi", "<p>hi</p>"));

        let empty = MessageBuilder::new(sender()).build();
        assert_eq!(empty.content, Content::Text(String::new()));
    }

    #[test]
    fn test_builder_fields() {
        let message = MessageBuilder::new(sender())
            .to(Address::parse("Alice <alice@example.com>").unwrap())
            .reply_to(Address::new("replies@example.com").unwrap())
            .subject("Quarterly report")
            .priority(Priority::High)
            .tag("reports")
            .header("X-Campaign", "q3")
            .attach(Attachment::new("q3.csv", &b"a,b\n1,2\n"[..]))
            .build();

        assert_eq!(message.recipients.len(), 1);
        assert_eq!(message.reply.len(), 1);
        assert_eq!(message.subject, "Quarterly report");
        assert_eq!(message.priority, Priority::High);
        assert_eq!(message.tags, vec!["reports"]);
        assert_eq!(message.headers.get("x-campaign"), Some("q3"));
        assert_eq!(message.attachments.len(), 1);
    }
}

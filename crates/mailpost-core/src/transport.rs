//! Delivery of composed messages.
//!
//! A [`Transport`] receives the SMTP envelope and the raw message. The
//! [`Mailer`] ties a [`Composer`] to a transport.
//!
//! # Example
//!
//! ```ignore
//! use mailpost_core::{Address, Mailer, Message, MemoryTransport};
//!
//! let mailer = Mailer::new(MemoryTransport::new());
//! let message = Message::builder(Address::new("me@example.com")?)
//!     .to(Address::new("you@example.com")?)
//!     .subject("Hello")
//!     .text_body("Hi there")
//!     .build();
//!
//! let report = mailer.deliver(&message).await?;
//! assert_eq!(mailer.transport().len(), 1);
//! ```

use crate::compose::{Composer, Envelope};
use crate::error::{Error, Result};
use crate::message::Message;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sends raw messages to their envelope recipients.
pub trait Transport: Send + Sync {
    /// Sends `raw` to every recipient in `envelope`.
    fn send(&self, envelope: &Envelope, raw: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Message-ID of the sent message.
    pub message_id: String,
    /// Envelope recipients the message was handed off for.
    pub recipients: Vec<String>,
}

/// Composes messages and hands them to a transport.
#[derive(Debug)]
pub struct Mailer<T> {
    composer: Composer,
    transport: T,
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer with a default composer.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_composer(Composer::default(), transport)
    }

    /// Creates a mailer with a custom composer.
    #[must_use]
    pub const fn with_composer(composer: Composer, transport: T) -> Self {
        Self {
            composer,
            transport,
        }
    }

    /// Returns the composer.
    #[must_use]
    pub const fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Composes and sends `message`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipients`] if the message has no recipients at
    /// all, a composition error, or the transport's error.
    pub async fn deliver(&self, message: &Message) -> Result<DeliveryReport> {
        if message.all_recipients().next().is_none() {
            return Err(Error::NoRecipients);
        }

        let composed = self.composer.compose(message).await?;

        match self.transport.send(&composed.envelope, &composed.raw).await {
            Ok(()) => {
                tracing::info!(
                    message_id = %composed.message_id,
                    recipients = composed.envelope.to.len(),
                    "Message delivered"
                );
                Ok(DeliveryReport {
                    message_id: composed.message_id,
                    recipients: composed.envelope.to,
                })
            }
            Err(e) => {
                tracing::error!(message_id = %composed.message_id, error = %e, "Delivery failed");
                Err(e)
            }
        }
    }
}

/// A message captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Envelope the message was sent with.
    pub envelope: Envelope,
    /// Raw message.
    pub raw: String,
}

/// Transport that keeps every message in memory.
///
/// Useful in tests and for previewing output.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    deliveries: Mutex<Vec<Delivery>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Delivery>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of every captured message, oldest first.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    /// Returns the most recently captured message.
    #[must_use]
    pub fn last(&self) -> Option<Delivery> {
        self.lock().last().cloned()
    }

    /// Returns the number of captured messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every captured message.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Transport for MemoryTransport {
    async fn send(&self, envelope: &Envelope, raw: &str) -> Result<()> {
        self.lock().push(Delivery {
            envelope: envelope.clone(),
            raw: raw.to_string(),
        });
        Ok(())
    }
}

/// Transport that only logs messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport {
    full: bool,
}

impl LogTransport {
    /// Logs the envelope and size of each message.
    #[must_use]
    pub const fn new() -> Self {
        Self { full: false }
    }

    /// Also logs the raw message at debug level.
    #[must_use]
    pub const fn full() -> Self {
        Self { full: true }
    }
}

impl Transport for LogTransport {
    async fn send(&self, envelope: &Envelope, raw: &str) -> Result<()> {
        tracing::info!(
            from = %envelope.from,
            to = ?envelope.to,
            bytes = raw.len(),
            "Message sent to log"
        );
        if self.full {
            tracing::debug!(raw = %raw, "Message content");
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
    use mailpost_mime::Address;

    struct FailingTransport;

    impl Transport for FailingTransport {
        async fn send(&self, _envelope: &Envelope, _raw: &str) -> Result<()> {
            Err(Error::transport("connection refused"))
        }
    }

    fn message() -> Message {
        Message::builder(Address::new("me@example.com").unwrap())
            .to(Address::new("you@example.com").unwrap())
            .bcc(Address::new("hidden@example.com").unwrap())
            .subject("Hello")
            .text_body("Hi there")
            .build()
    }

    #[tokio::test]
    async fn test_memory_transport_captures() {
        let mailer = Mailer::new(MemoryTransport::new());
        let report = mailer.deliver(&message()).await.unwrap();

        assert_eq!(report.recipients, vec!["you@example.com", "hidden@example.com"]);
        assert_eq!(mailer.transport().len(), 1);

        let delivery = mailer.transport().last().unwrap();
        assert_eq!(delivery.envelope.from, "me@example.com");
        assert!(delivery.raw.contains(&format!("Message-ID: {}\r\n", report.message_id)));
        assert!(!delivery.raw.contains("hidden@example.com"));

        mailer.transport().clear();
        assert!(mailer.transport().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_without_recipients() {
        let mailer = Mailer::new(MemoryTransport::new());
        let message = Message::builder(Address::new("me@example.com").unwrap()).build();

        let err = mailer.deliver(&message).await.unwrap_err();
        assert!(matches!(err, Error::NoRecipients));
        assert!(mailer.transport().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mailer = Mailer::new(FailingTransport);
        let err = mailer.deliver(&message()).await.unwrap_err();
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[tokio::test]
    async fn test_log_transport() {
        let mailer = Mailer::new(LogTransport::full());
        assert!(mailer.deliver(&message()).await.is_ok());
    }
}

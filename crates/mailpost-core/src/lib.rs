//! # mailpost-core
//!
//! Outgoing message model and MIME composer for `MailPost`.
//!
//! This crate provides:
//! - A provider-agnostic [`Message`] with a fluent builder
//! - Deferred attachments loaded at composition time
//! - The [`Composer`], which turns a message into an SMTP [`Envelope`]
//!   and a raw RFC 5322 message
//! - A [`Transport`] seam with in-memory and logging transports
//!
//! ## Example
//!
//! ```ignore
//! use mailpost_core::{Address, Composer, Message, Priority};
//!
//! let message = Message::builder(Address::parse("Ann Lee <ann@example.com>")?)
//!     .to(Address::new("bob@example.com")?)
//!     .subject("Lunch?")
//!     .text_body("Noon at the usual place.")
//!     .html_body("<p>Noon at the usual place.</p>")
//!     .priority(Priority::High)
//!     .build();
//!
//! let composed = Composer::default().compose(&message).await?;
//! assert_eq!(composed.envelope.to, vec!["bob@example.com"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod compose;
mod error;
pub mod message;
pub mod time;
pub mod transport;

pub use compose::{ComposeConfig, ComposeConfigBuilder, ComposedMessage, Composer, Envelope};
pub use error::{Error, LoadError, Result};
pub use mailpost_mime::{Address, Content, Headers};
pub use message::{
    Attachment, AttachmentContent, AttachmentLoader, LoadFuture, Message, MessageBuilder, Priority,
};
pub use time::{Clock, FixedClock, SystemClock};
pub use transport::{Delivery, DeliveryReport, LogTransport, Mailer, MemoryTransport, Transport};

//! Error types for the core library.

use thiserror::Error;

/// Error returned by an attachment loader.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while composing or delivering a message.
#[derive(Debug, Error)]
pub enum Error {
    /// Address or encoding error from the MIME layer.
    #[error("MIME error: {0}")]
    Mime(#[from] mailpost_mime::Error),

    /// Deferred attachment content could not be loaded.
    #[error("Failed to load attachment {filename:?}: {source}")]
    AttachmentLoad {
        /// File name of the failed attachment.
        filename: String,
        /// Loader error.
        source: LoadError,
    },

    /// The envelope has no recipients.
    #[error("No recipients specified")]
    NoRecipients,

    /// The transport rejected or failed to send the message.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Creates a transport error from any displayable cause.
    #[must_use]
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

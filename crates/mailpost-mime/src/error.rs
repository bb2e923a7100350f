//! Error types for MIME operations.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address does not match the mailbox grammar.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}

impl Error {
    /// Creates an invalid-address error for the given input.
    #[must_use]
    pub fn invalid_address(input: impl Into<String>) -> Self {
        Self::InvalidAddress(input.into())
    }

    /// Returns true if this error reports a malformed address.
    #[must_use]
    pub const fn is_invalid_address(&self) -> bool {
        matches!(self, Self::InvalidAddress(_))
    }
}

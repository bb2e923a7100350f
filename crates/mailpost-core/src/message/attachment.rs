//! Message attachments and deferred attachment content.

use crate::error::LoadError;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by [`AttachmentLoader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<Bytes, LoadError>> + Send + 'a>>;

/// Asynchronous source of attachment bytes.
///
/// The composer calls [`load`](Self::load) once per composition, before the
/// body is built.
pub trait AttachmentLoader: Send + Sync {
    /// Reads the attachment bytes.
    fn load(&self) -> LoadFuture<'_>;
}

struct FnLoader<F>(F);

impl<F, Fut> AttachmentLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes, LoadError>> + Send + 'static,
{
    fn load(&self) -> LoadFuture<'_> {
        Box::pin((self.0)())
    }
}

/// Attachment bytes, either in memory or loaded on demand.
#[derive(Clone)]
pub enum AttachmentContent {
    /// Bytes already in memory.
    Bytes(Bytes),
    /// Bytes produced by a loader at composition time.
    Deferred(Arc<dyn AttachmentLoader>),
}

impl AttachmentContent {
    /// Resolves the content to bytes.
    ///
    /// # Errors
    ///
    /// Returns the loader's error for deferred content.
    pub async fn load(&self) -> Result<Bytes, LoadError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Deferred(loader) => loader.load().await,
        }
    }

    /// Returns true if the content is loaded on demand.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl fmt::Debug for AttachmentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// A file attached to a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Attachment bytes.
    pub content: AttachmentContent,
    /// MIME type; empty means `application/octet-stream`.
    pub content_type: String,
    /// Content-ID for `cid:` references; empty means none.
    pub content_id: String,
    /// Whether the attachment is displayed inline.
    pub inline: bool,
}

impl Attachment {
    /// Creates an attachment from bytes in memory.
    #[must_use]
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::with_content(filename, AttachmentContent::Bytes(data.into()))
    }

    /// Creates an attachment whose bytes come from `loader`.
    #[must_use]
    pub fn deferred(filename: impl Into<String>, loader: impl AttachmentLoader + 'static) -> Self {
        Self::with_content(filename, AttachmentContent::Deferred(Arc::new(loader)))
    }

    /// Creates an attachment whose bytes come from an async closure.
    ///
    /// ```ignore
    /// let report = Attachment::from_fn("report.csv", || async {
    ///     Ok::<_, LoadError>(Bytes::from(tokio::fs::read("report.csv").await?))
    /// });
    /// ```
    #[must_use]
    pub fn from_fn<F, Fut>(filename: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes, LoadError>> + Send + 'static,
    {
        Self::deferred(filename, FnLoader(f))
    }

    fn with_content(filename: impl Into<String>, content: AttachmentContent) -> Self {
        Self {
            filename: filename.into(),
            content,
            content_type: String::new(),
            content_id: String::new(),
            inline: false,
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Marks the attachment inline and sets its Content-ID.
    #[must_use]
    pub fn inline(mut self, content_id: impl Into<String>) -> Self {
        self.inline = true;
        self.content_id = content_id.into();
        self
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

    #[tokio::test]
    async fn test_bytes_content() {
        let attachment = Attachment::new("a.txt", &b"hello"[..]).content_type("text/plain");
        assert!(!attachment.content.is_deferred());
        assert_eq!(attachment.content.load().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(attachment.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_deferred_content() {
        let attachment = Attachment::from_fn("b.bin", || async {
            Ok::<_, LoadError>(Bytes::from_static(b"late"))
        });
        assert!(attachment.content.is_deferred());
        assert_eq!(attachment.content.load().await.unwrap(), Bytes::from_static(b"late"));
    }

    #[tokio::test]
    async fn test_deferred_error() {
        let attachment = Attachment::from_fn("c.bin", || async {
            Err::<Bytes, LoadError>("disk on fire".into())
        });
        let err = attachment.content.load().await.unwrap_err();
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_inline() {
        let attachment = Attachment::new("logo.png", vec![1u8, 2, 3]).inline("logo");
        assert!(attachment.inline);
        assert_eq!(attachment.content_id, "logo");
        assert_eq!(format!("{:?}", attachment.content), "Bytes(3)");
    }
}

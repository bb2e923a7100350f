//! # mailpost-mime
//!
//! RFC 5322 address and MIME encoding library for outgoing email.
//!
//! ## Features
//!
//! - **Addresses**: Parse and format `Display Name <local@domain>` mailboxes
//! - **Encoding**: Line-wrapped Base64, Quoted-Printable, RFC 2047 header words
//! - **Body trees**: `text/plain`, `multipart/alternative` and `multipart/mixed`
//!   structures with collision-free boundaries
//! - **Content types**: Parameterized MIME content types
//!
//! ## Quick Start
//!
//! ### Addresses
//!
//! ```ignore
//! use mailpost_mime::Address;
//!
//! let addr = Address::parse("John Doe <john@example.com>")?;
//! assert_eq!(addr.name(), Some("John Doe"));
//! assert_eq!(addr.to_string(), "John Doe <john@example.com>");
//! ```
//!
//! ### Building a body tree
//!
//! ```ignore
//! use mailpost_mime::{Content, RandomTokens, build_tree};
//!
//! let tree = build_tree(
//!     &Content::alternative("Plain text version", "<h1>HTML version</h1>"),
//!     &[],
//!     &RandomTokens,
//! ); // multipart/alternative
//!
//! let mut body = String::new();
//! tree.write_body(&mut body);
//! ```
//!
//! ### Encoding
//!
//! ```ignore
//! use mailpost_mime::encoding::{encode_base64_wrapped, encode_quoted_printable};
//! use mailpost_mime::encoding::{WordRole, encode_header_word};
//!
//! let body = encode_quoted_printable("Héllo, Wørld!");
//! let attachment = encode_base64_wrapped(&bytes);
//! let subject = encode_header_word("Grüße", WordRole::Subject);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod token;
mod tree;

pub mod encoding;

pub use address::{Address, is_valid_address, quote_display_name};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use token::{RandomTokens, SequentialTokens, TokenSource};
pub use tree::{
    Content, Disposition, DispositionKind, MimePart, Multipart, MultipartKind,
    ResolvedAttachment, SimplePart, TransferEncoding, build_tree,
};

//! Opaque token generation for Message-IDs and multipart boundaries.
//!
//! Generation is behind the [`TokenSource`] trait so tests can swap the
//! random source for a predictable one.

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Length of a random token.
const TOKEN_LEN: usize = 24;

/// Source of unique opaque tokens.
///
/// Tokens must only contain ASCII letters and digits so they are valid in
/// both `Message-ID` local parts and MIME boundaries.
pub trait TokenSource: Send + Sync {
    /// Returns a fresh token.
    fn token(&self) -> String;
}

/// Random alphanumeric tokens from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }
}

/// Predictable tokens in the format "T0000", "T0001", etc.
#[derive(Debug)]
pub struct SequentialTokens {
    counter: AtomicU32,
    prefix: char,
}

impl SequentialTokens {
    /// Creates a sequence with the given alphanumeric prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU32::new(0),
            prefix,
        }
    }

    /// Returns how many tokens have been issued.
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for SequentialTokens {
    fn default() -> Self {
        Self::new('T')
    }
}

impl TokenSource for SequentialTokens {
    fn token(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{:04}", self.prefix, n)
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn token(&self) -> String {
        self.as_ref().token()
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Box<T> {
    fn token(&self) -> String {
        self.as_ref().token()
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
    use std::collections::HashSet;

    #[test]
    fn test_random_tokens_shape() {
        let token = RandomTokens.token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_tokens_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10000 {
            assert!(seen.insert(RandomTokens.token()), "duplicate token generated");
        }
    }

    #[test]
    fn test_sequential_tokens() {
        let tokens = SequentialTokens::default();
        assert_eq!(tokens.token(), "T0000");
        assert_eq!(tokens.token(), "T0001");
        assert_eq!(tokens.issued(), 2);
    }

    #[test]
    fn test_shared_source() {
        let tokens: Arc<dyn TokenSource> = Arc::new(SequentialTokens::new('B'));
        assert_eq!(tokens.token(), "B0000");
        assert_eq!(tokens.clone().token(), "B0001");
    }
}

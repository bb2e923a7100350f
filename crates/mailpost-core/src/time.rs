//! Time abstraction for testability.
//!
//! The composer stamps every message with a `Date` header taken from a
//! [`Clock`], so tests can pin it with [`FixedClock`].
//!
//! # Example
//!
//! ```
//! use mailpost_core::time::{Clock, FixedClock};
//! use chrono::DateTime;
//!
//! let clock = FixedClock::new(DateTime::parse_from_rfc2822("Wed, 18 Feb 2015 23:16:09 +0100").unwrap());
//! assert_eq!(clock.now().to_rfc2822(), "Wed, 18 Feb 2015 23:16:09 +0100");
//! ```

use chrono::{DateTime, FixedOffset, Local};
use std::sync::Arc;

/// Abstraction over wall-clock time.
///
/// In production, use [`SystemClock`]. In tests, use [`FixedClock`].
pub trait Clock: Send + Sync {
    /// Returns the current local time with its UTC offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System clock in the local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    /// Creates a clock that always returns `at`.
    #[must_use]
    pub const fn new(at: DateTime<FixedOffset>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<FixedOffset> {
        self.as_ref().now()
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
    fn test_system_clock() {
        let before = Local::now();
        let from_clock = SystemClock.now();
        let after = Local::now();

        assert!(from_clock >= before);
        assert!(from_clock <= after);
    }

    #[test]
    fn test_fixed_clock() {
        let at = DateTime::parse_from_rfc3339("2024-02-29T12:00:00-05:00").unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now().to_rfc2822(), "Thu, 29 Feb 2024 12:00:00 -0500");
    }

    #[test]
    fn test_shared_clock() {
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(at));
        assert_eq!(clock.now(), at);
    }
}

//! RFC 5322 mailbox addresses.
//!
//! Parsing accepts `Display Name <local@domain>`, `<local@domain>` and bare
//! `local@domain`. Validation is permissive: over-long local parts and
//! domains are logged and accepted, and any host the `url` crate accepts
//! (including internationalized names) is a valid domain.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use url::Host;

/// Soft limit on the local part, in octets.
const MAX_LOCAL_PART: usize = 64;

/// Soft limit on the domain, in octets.
const MAX_DOMAIN: usize = 253;

/// Characters that force an ASCII display name into a quoted string.
const NAME_SPECIALS: &[char] = &[',', '<', '>', '@', ';', ':', '(', ')', '[', ']'];

/// Mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    name: Option<String>,
    address: String,
}

impl Address {
    /// Creates an address without a display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `address` is not a valid mailbox.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        validate_mailbox(&address)?;
        Ok(Self {
            name: None,
            address,
        })
    }

    /// Creates an address with a display name.
    ///
    /// A name that is empty after trimming is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `address` is not a valid mailbox.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        let mut parsed = Self::new(address)?;
        parsed.name = normalize_name(&name.into());
        Ok(parsed)
    }

    /// Parses a free-form address string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the input does not match the
    /// mailbox grammar.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (name, mailbox) =
            split_name_addr(input).ok_or_else(|| Error::invalid_address(input))?;
        validate_mailbox(mailbox)?;

        Ok(Self {
            name: name.and_then(normalize_name),
            address: mailbox.to_string(),
        })
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the bare mailbox (`local@domain`).
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the local part of the mailbox.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map_or(self.address.as_str(), |(local, _)| local)
    }

    /// Returns the domain of the mailbox.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map_or("", |(_, domain)| domain)
    }

    /// Consumes the address and returns `(name, mailbox)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<String>, String) {
        (self.name, self.address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", quote_display_name(name), self.address),
            None => f.write_str(&self.address),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Returns true if `input` parses as an address.
#[must_use]
pub fn is_valid_address(input: &str) -> bool {
    Address::parse(input).is_ok()
}

/// Renders an ASCII display name for a header.
///
/// Names containing RFC 5322 specials are wrapped in double quotes so they
/// parse back to the same name. Names that already contain a double quote
/// are returned unchanged.
#[must_use]
pub fn quote_display_name(name: &str) -> Cow<'_, str> {
    if name.contains('"') || !name.contains(NAME_SPECIALS) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{name}\""))
    }
}

fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Splits `Name <mailbox>` into its parts. Bare mailboxes have no name.
fn split_name_addr(input: &str) -> Option<(Option<&str>, &str)> {
    if !input.ends_with('>') {
        return Some((None, input));
    }

    let open = find_unquoted(input, |c| c == '<')?;
    let mailbox = input[open + 1..input.len() - 1].trim();
    let name = input[..open].trim();
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name);

    Some(((!name.is_empty()).then_some(name), mailbox))
}

/// Finds the first character matching `target` outside a double-quoted run.
fn find_unquoted(s: &str, target: impl Fn(char) -> bool) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if !in_quotes && target(c) => return Some(i),
            _ => {}
        }
    }

    None
}

/// Splits a mailbox on its single unquoted `@`.
fn split_mailbox(mailbox: &str) -> Option<(&str, &str)> {
    let at = find_unquoted(mailbox, |c| c == '@')?;
    let (local, domain) = (&mailbox[..at], &mailbox[at + 1..]);

    if find_unquoted(domain, |c| c == '@').is_some() {
        return None;
    }

    Some((local, domain))
}

fn validate_mailbox(mailbox: &str) -> Result<()> {
    let valid = split_mailbox(mailbox)
        .is_some_and(|(local, domain)| is_valid_local_part(local) && is_valid_domain(domain));

    if valid {
        Ok(())
    } else {
        Err(Error::invalid_address(mailbox))
    }
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() {
        return false;
    }
    if local.len() > MAX_LOCAL_PART {
        tracing::debug!(len = local.len(), "local part longer than {MAX_LOCAL_PART} octets");
    }

    match local
        .strip_prefix('"')
        .and_then(|l| l.strip_suffix('"'))
    {
        Some(inner) => is_valid_quoted_string(inner),
        None => is_dot_atom(local),
    }
}

fn is_valid_quoted_string(inner: &str) -> bool {
    let mut escaped = false;

    for c in inner.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' | '\r' | '\n' => return false,
            _ => {}
        }
    }

    // A trailing backslash would escape the closing quote.
    !escaped
}

fn is_dot_atom(s: &str) -> bool {
    !s.starts_with('.')
        && !s.ends_with('.')
        && !s.contains("..")
        && s.chars().all(|c| c == '.' || is_atext(c))
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~-".contains(c)
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    if domain.len() > MAX_DOMAIN {
        tracing::debug!(len = domain.len(), "domain longer than {MAX_DOMAIN} octets");
    }

    match domain
        .strip_prefix('[')
        .and_then(|d| d.strip_suffix(']'))
    {
        Some(literal) => is_valid_domain_literal(literal),
        None => Host::parse(domain).is_ok(),
    }
}

fn is_valid_domain_literal(literal: &str) -> bool {
    let ipv6 = literal
        .get(..5)
        .filter(|tag| tag.eq_ignore_ascii_case("IPv6:"))
        .map(|_| &literal[5..]);

    match ipv6 {
        Some(addr) => Host::parse(&format!("[{addr}]")).is_ok(),
        None => !literal.is_empty() && Host::parse(literal).is_ok(),
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
    use proptest::prelude::*;

    #[test]
    fn test_parse_bare() {
        let addr = Address::parse("john@example.com").unwrap();
        assert_eq!(addr.name(), None);
        assert_eq!(addr.address(), "john@example.com");
        assert_eq!(addr.local_part(), "john");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn test_parse_name_addr() {
        let addr = Address::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(addr.name(), Some("John Doe"));
        assert_eq!(addr.address(), "john@example.com");
    }

    #[test]
    fn test_parse_angle_only() {
        let addr = Address::parse("<john@example.com>").unwrap();
        assert_eq!(addr.name(), None);
        assert_eq!(addr.address(), "john@example.com");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = Address::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(addr.name(), Some("Doe, John"));
    }

    #[test]
    fn test_parse_quoted_name_with_angle() {
        let addr = Address::parse("\"a <b>\" <john@example.com>").unwrap();
        assert_eq!(addr.name(), Some("a <b>"));
        assert_eq!(addr.address(), "john@example.com");
    }

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address("user.name+tag@example.com"));
        assert!(is_valid_address("x@x"));
        assert!(is_valid_address("\"john doe\"@example.com"));
        assert!(is_valid_address("\"a@b\"@example.com"));
        assert!(is_valid_address("user@[192.168.0.1]"));
        assert!(is_valid_address("user@[IPv6:2001:db8::1]"));
        assert!(is_valid_address("user@münchen.de"));
    }

    #[test]
    fn test_invalid_addresses() {
        for input in [
            "user..name@x",
            ".user@x",
            "user.@x",
            "user@@x",
            "@x",
            "user@",
            "",
            "userexample.com",
            "a@b@c",
            "john doe@example.com",
            "\"unterminated@example.com",
            "user@[]",
            "user@exa mple.com",
            "John <john@example.com",
        ] {
            assert!(!is_valid_address(input), "{input:?} should be invalid");
        }
    }

    #[test]
    fn test_invalid_is_error_value() {
        let err = Address::parse("user@@x").unwrap_err();
        assert!(err.is_invalid_address());
    }

    #[test]
    fn test_long_local_part_accepted() {
        let local = "a".repeat(100);
        assert!(is_valid_address(&format!("{local}@example.com")));
    }

    #[test]
    fn test_quoted_local_part_rules() {
        assert!(is_valid_address("\"a\\\"b\"@example.com"));
        assert!(!is_valid_address("\"a\"b\"@example.com"));
        assert!(!is_valid_address("\"a\nb\"@example.com"));
        assert!(!is_valid_address("\"ab\\\"@example.com"));
    }

    #[test]
    fn test_with_name_blank() {
        let addr = Address::with_name("   ", "john@example.com").unwrap();
        assert_eq!(addr.name(), None);
        assert_eq!(addr.to_string(), "john@example.com");
    }

    #[test]
    fn test_with_name_trims() {
        let addr = Address::with_name("  John  ", "john@example.com").unwrap();
        assert_eq!(addr.name(), Some("John"));
    }

    #[test]
    fn test_format() {
        let addr = Address::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(addr.to_string(), "John Doe <john@example.com>");

        let addr = Address::with_name("Doe, John", "john@example.com").unwrap();
        assert_eq!(addr.to_string(), "\"Doe, John\" <john@example.com>");

        let addr = Address::new("john@example.com").unwrap();
        assert_eq!(addr.to_string(), "john@example.com");
    }

    #[test]
    fn test_round_trip() {
        for s in ["john@example.com", "John Doe <john@example.com>"] {
            let parsed = Address::parse(s).unwrap();
            let reparsed = Address::parse(&parsed.to_string()).unwrap();
            assert_eq!(reparsed, parsed);
        }
    }

    #[test]
    fn test_round_trip_specials() {
        let addr = Address::with_name("Support: Tier 1", "help@example.com").unwrap();
        assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
    }

    #[test]
    fn test_quote_name_with_double_quote_unchanged() {
        assert_eq!(quote_display_name("Bob \"the\" Builder"), "Bob \"the\" Builder");
        assert_eq!(quote_display_name("Plain"), "Plain");
    }

    #[test]
    fn test_from_str() {
        let addr: Address = "Jane <jane@example.org>".parse().unwrap();
        assert_eq!(addr.name(), Some("Jane"));
    }

    proptest! {
        #[test]
        fn prop_format_parse_round_trip(
            name in "[A-Za-z][A-Za-z ,.:]{0,20}[A-Za-z]",
            local in "[a-z0-9]{1,12}",
            domain in "[a-z]{1,10}\\.(com|org|net)",
        ) {
            let addr = Address::with_name(name, format!("{local}@{domain}")).unwrap();
            prop_assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
        }
    }
}

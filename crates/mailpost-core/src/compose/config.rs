//! Composer configuration types.

/// Domain used in Message-IDs when nothing better is available.
const DEFAULT_FALLBACK_DOMAIN: &str = "localhost";

/// Message composition configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeConfig {
    /// Domain placed after `@` in generated Message-IDs. When unset, the
    /// sender's domain is used.
    pub message_id_domain: Option<String>,
    /// Message-ID domain used when the sender's domain is not plain ASCII.
    pub fallback_domain: String,
}

impl ComposeConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            message_id_domain: None,
            fallback_domain: DEFAULT_FALLBACK_DOMAIN.to_string(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ComposeConfigBuilder {
        ComposeConfigBuilder::new()
    }

    /// Picks the Message-ID domain for a message from `sender_domain`.
    #[must_use]
    pub fn message_id_domain_for<'a>(&'a self, sender_domain: &'a str) -> &'a str {
        if let Some(domain) = &self.message_id_domain {
            return domain;
        }
        if !sender_domain.is_empty() && sender_domain.is_ascii() {
            sender_domain
        } else {
            &self.fallback_domain
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for composer configuration.
#[derive(Debug, Clone)]
pub struct ComposeConfigBuilder {
    message_id_domain: Option<String>,
    fallback_domain: Option<String>,
}

impl ComposeConfigBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            message_id_domain: None,
            fallback_domain: None,
        }
    }

    /// Sets a fixed Message-ID domain.
    #[must_use]
    pub fn message_id_domain(mut self, domain: impl Into<String>) -> Self {
        self.message_id_domain = Some(domain.into());
        self
    }

    /// Sets the fallback Message-ID domain.
    #[must_use]
    pub fn fallback_domain(mut self, domain: impl Into<String>) -> Self {
        self.fallback_domain = Some(domain.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ComposeConfig {
        ComposeConfig {
            message_id_domain: self.message_id_domain,
            fallback_domain: self
                .fallback_domain
                .unwrap_or_else(|| DEFAULT_FALLBACK_DOMAIN.to_string()),
        }
    }
}

impl Default for ComposeConfigBuilder {
    fn default() -> Self {
        Self::new()
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
    fn test_config_new() {
        let config = ComposeConfig::new();
        assert_eq!(config.message_id_domain, None);
        assert_eq!(config.fallback_domain, "localhost");
    }

    #[test]
    fn test_message_id_domain_defaults_to_sender() {
        let config = ComposeConfig::default();
        assert_eq!(config.message_id_domain_for("example.com"), "example.com");
        assert_eq!(config.message_id_domain_for("münchen.de"), "localhost");
        assert_eq!(config.message_id_domain_for(""), "localhost");
    }

    #[test]
    fn test_config_builder() {
        let config = ComposeConfig::builder()
            .message_id_domain("mail.example.org")
            .fallback_domain("relay.example.org")
            .build();

        assert_eq!(config.message_id_domain_for("example.com"), "mail.example.org");
        assert_eq!(config.fallback_domain, "relay.example.org");
    }

    #[test]
    fn test_config_builder_default_fallback() {
        let config = ComposeConfig::builder().build();
        assert_eq!(config, ComposeConfig::new());
    }
}

//! Normalized email address newtype.
//!
//! Wraps addresses so the rest of the engine never compares raw user
//! input: construction trims, lowercases, and applies a basic syntax
//! check. The size constraints follow RFC 5321 (64-octet local part,
//! 255-octet domain) without implementing the full grammar — strictness
//! beyond that is the sending provider's concern.

use std::{
    fmt::{self, Display},
    ops::Deref,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing an email address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailParseError {
    /// Input was empty after trimming.
    #[error("Empty email address")]
    Empty,

    /// Missing, leading, or trailing `@`, or more than one `@`.
    #[error("Malformed email address: {0}")]
    Malformed(String),

    /// Local part exceeds 64 octets.
    #[error("Local part exceeds 64 octets")]
    LocalPartTooLong,

    /// Domain exceeds 255 octets.
    #[error("Domain exceeds 255 octets")]
    DomainTooLong,

    /// Domain has no dot or an empty label.
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// A trimmed, lowercased email address.
///
/// The inner `Arc<str>` makes clones cheap; campaigns hold many of these
/// and pass them between the validator, scheduler, and suppression
/// registries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(Arc<str>);

impl EmailAddress {
    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailParseError`] describing the first syntax rule the
    /// input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailParseError> {
        let normalized = input.trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(EmailParseError::Empty);
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(EmailParseError::Malformed(normalized));
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(EmailParseError::Malformed(normalized));
        }

        if local.len() > 64 {
            return Err(EmailParseError::LocalPartTooLong);
        }

        if domain.len() > 255 {
            return Err(EmailParseError::DomainTooLong);
        }

        if local
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>' || c == ',')
        {
            return Err(EmailParseError::Malformed(normalized));
        }

        if !domain.contains('.')
            || domain.split('.').any(str::is_empty)
            || !domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(EmailParseError::InvalidDomain(domain.to_string()));
        }

        Ok(Self(Arc::from(normalized)))
    }

    /// The full normalized address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The domain part (after the `@`).
    #[must_use]
    pub fn domain(&self) -> &str {
        // The constructor guarantees exactly one '@' with a non-empty tail.
        self.0.rsplit('@').next().unwrap_or(&self.0)
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for EmailAddress {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<&str> for EmailAddress {
    type Error = EmailParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let addr = EmailAddress::parse("  Alice.Smith@Example.COM ").unwrap();
        assert_eq!(addr.as_str(), "alice.smith@example.com");
        assert_eq!(addr.domain(), "example.com");
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!(matches!(
            EmailAddress::parse("not-an-address"),
            Err(EmailParseError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(EmailAddress::parse("@example.com").is_err());
        assert!(EmailAddress::parse("user@").is_err());
        assert!(EmailAddress::parse("   ").is_err());
    }

    #[test]
    fn rejects_dotless_domain() {
        assert!(matches!(
            EmailAddress::parse("user@localhost"),
            Err(EmailParseError::InvalidDomain(_))
        ));
    }

    #[test]
    fn rejects_oversize_local_part() {
        let local = "a".repeat(65);
        assert_eq!(
            EmailAddress::parse(&format!("{local}@example.com")),
            Err(EmailParseError::LocalPartTooLong)
        );
    }

    #[test]
    fn rejects_whitespace_in_local_part() {
        assert!(EmailAddress::parse("first last@example.com").is_err());
    }

    #[test]
    fn equality_is_case_insensitive_via_normalization() {
        let a = EmailAddress::parse("USER@EXAMPLE.COM").unwrap();
        let b = EmailAddress::parse("user@example.com").unwrap();
        assert_eq!(a, b);
    }
}

use std::{fmt::Display, ops::Deref, str::FromStr};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A voter's email address, normalised to its trimmed, lowercased form.
///
/// Normalisation happens on parse, so two spellings of the same address can
/// never produce two voter records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    inner: String,
}

impl Deref for Email {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_lowercase();
        let (local, domain) = normalised
            .split_once('@')
            .ok_or_else(|| EmailError(s.to_string()))?;
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(EmailError(s.to_string()));
        }
        Ok(Email { inner: normalised })
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.inner
    }
}

impl From<Email> for Bson {
    fn from(email: Email) -> Self {
        to_bson(&email).unwrap() // Valid because `String` serialization doesn't fail
    }
}

#[derive(Debug, Error)]
#[error("Invalid email address: {0}")]
pub struct EmailError(String);

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Email {
        pub fn example() -> Self {
            "alice@example.edu".parse().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case_and_whitespace() {
        let email: Email = "  Alice@Example.EDU ".parse().unwrap();
        assert_eq!("alice@example.edu", &*email);
        assert_eq!(email, Email::example());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!("".parse::<Email>().is_err());
        assert!("no-at-sign".parse::<Email>().is_err());
        assert!("@example.edu".parse::<Email>().is_err());
        assert!("alice@".parse::<Email>().is_err());
        assert!("alice@nodot".parse::<Email>().is_err());
    }
}

//! # Opal Types
//!
//! Validated primitive types and domain records shared across the opaladmin
//! workspace.
//!
//! Contains:
//! - text newtypes that guarantee their invariants at construction time
//!   (`NonEmptyText`, `EmailAddress`),
//! - the domain records managed by the registry (`records` module),
//! - the relationship status state machine (`status` module).

pub mod records;
pub mod status;

pub use records::{
    CaregiverProfile, HospitalIdentifier, Institution, Language, Patient, RegistrationCode,
    Relationship, RelationshipType, RoleType, SexType, Site,
};
pub use status::{RegistrationCodeStatus, RelationshipStatus};

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was not a plausible email address
    #[error("Invalid email address")]
    InvalidEmail,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An email address with minimal structural validation.
///
/// Guarantees a single `@` with non-empty local part and a domain containing
/// at least one `.`. Full RFC validation is deliberately out of scope; the
/// external identity provider owns address verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses the given input into an `EmailAddress`.
    ///
    /// The input is trimmed before validation.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and
    /// `TextError::InvalidEmail` when the shape is not `local@domain.tld`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let mut parts = trimmed.splitn(2, '@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();

        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(TextError::InvalidEmail);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_accepts() {
        let text = NonEmptyText::new("  hello  ").unwrap();
        assert_eq!(text.as_str(), "hello");
    }

    #[test]
    fn non_empty_text_rejects_whitespace_only() {
        let err = NonEmptyText::new("   ").expect_err("whitespace should be rejected");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn email_accepts_plain_address() {
        let email = EmailAddress::parse("admin@hospital.example").unwrap();
        assert_eq!(email.as_str(), "admin@hospital.example");
    }

    #[test]
    fn email_rejects_missing_domain_dot() {
        let err = EmailAddress::parse("admin@localhost").expect_err("should be rejected");
        assert!(matches!(err, TextError::InvalidEmail));
    }

    #[test]
    fn email_rejects_empty_local_part() {
        let err = EmailAddress::parse("@hospital.example").expect_err("should be rejected");
        assert!(matches!(err, TextError::InvalidEmail));
    }

    #[test]
    fn email_rejects_embedded_whitespace() {
        let err = EmailAddress::parse("ad min@hospital.example").expect_err("should be rejected");
        assert!(matches!(err, TextError::InvalidEmail));
    }
}

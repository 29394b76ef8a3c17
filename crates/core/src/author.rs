//! Author identity for audit commits.
//!
//! Every mutation of the registry is committed with the identity of the
//! administrator (or system process) that performed it. The identity is
//! validated at construction time through the `opal_types` newtypes.

use opal_types::{EmailAddress, NonEmptyText};

/// Represents the author of a registry mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    /// The full name of the author.
    pub name: NonEmptyText,
    /// The email address of the author.
    pub email: EmailAddress,
}

impl Author {
    /// Creates an author from raw name and email strings.
    ///
    /// # Errors
    ///
    /// Returns `None` if the name is blank or the email address is not
    /// structurally valid; callers decide whether to reject the request or
    /// fall back to [`Author::system`].
    pub fn new(name: &str, email: &str) -> Option<Self> {
        let name = NonEmptyText::new(name).ok()?;
        let email = EmailAddress::parse(email).ok()?;
        Some(Self { name, email })
    }

    /// The identity used for mutations not attributable to a request, such
    /// as sweep expiries.
    pub fn system() -> Self {
        Self {
            name: NonEmptyText::new("opaladmin").expect("static author name is non-empty"),
            email: EmailAddress::parse("system@opaladmin.invalid")
                .expect("static author email is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank_name() {
        assert!(Author::new("  ", "admin@hospital.example").is_none());
    }

    #[test]
    fn new_rejects_invalid_email() {
        assert!(Author::new("Admin", "not-an-email").is_none());
    }

    #[test]
    fn system_author_is_constructible() {
        let author = Author::system();
        assert_eq!(author.name.as_str(), "opaladmin");
    }
}

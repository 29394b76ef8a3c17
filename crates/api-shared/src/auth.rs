//! API-key validation for administrative endpoints.
//!
//! The surrounding platform issues and rotates the key; this module only
//! compares the presented value with the configured one.

/// Errors returned by [`validate_api_key`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
}

/// Validates the provided API key against the configured key.
///
/// When no key is configured the check is disabled (development setups);
/// otherwise the header must be present and match exactly.
pub fn validate_api_key(provided: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match provided {
        None => Err(AuthError::MissingKey),
        Some(provided) if provided == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_no_key_configured() {
        assert_eq!(validate_api_key(None, None), Ok(()));
        assert_eq!(validate_api_key(Some("anything"), None), Ok(()));
    }

    #[test]
    fn requires_header_when_configured() {
        assert_eq!(
            validate_api_key(None, Some("secret")),
            Err(AuthError::MissingKey)
        );
    }

    #[test]
    fn rejects_mismatched_key() {
        assert_eq!(
            validate_api_key(Some("wrong"), Some("secret")),
            Err(AuthError::InvalidKey)
        );
    }

    #[test]
    fn accepts_matching_key() {
        assert_eq!(validate_api_key(Some("secret"), Some("secret")), Ok(()));
    }
}

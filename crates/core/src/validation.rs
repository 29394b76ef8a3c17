//! Input validation utilities.
//!
//! Shape checks for identifiers that cross the API boundary. Cross-record
//! validation (uniqueness, referential integrity) belongs to the repository
//! services.

use crate::constants::{REGISTRATION_CODE_LENGTH, VERIFICATION_CODE_LENGTH};
use crate::{AdminError, AdminResult};

/// Validates a provincial health insurance number (RAMQ).
///
/// The expected shape is 12 characters: the first four uppercase letters
/// (derived from the holder's name), followed by eight digits.
///
/// # Errors
///
/// Returns `AdminError::InvalidInput` describing the violated rule.
pub fn validate_ramq(ramq: &str) -> AdminResult<()> {
    if ramq.len() != 12 {
        return Err(AdminError::InvalidInput(
            "RAMQ number must be exactly 12 characters".into(),
        ));
    }

    let (letters, digits) = ramq.split_at(4);
    if !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AdminError::InvalidInput(
            "RAMQ number must start with 4 uppercase letters".into(),
        ));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AdminError::InvalidInput(
            "RAMQ number must end with 8 digits".into(),
        ));
    }

    Ok(())
}

/// Validates the shape of a registration code supplied by a caller.
pub fn validate_registration_code(code: &str) -> AdminResult<()> {
    if code.len() != REGISTRATION_CODE_LENGTH || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AdminError::InvalidInput(format!(
            "registration code must be {REGISTRATION_CODE_LENGTH} alphanumeric characters"
        )));
    }
    Ok(())
}

/// Validates the shape of an email verification code.
pub fn validate_verification_code(code: &str) -> AdminResult<()> {
    if code.len() != VERIFICATION_CODE_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AdminError::InvalidInput(format!(
            "email verification code must be {VERIFICATION_CODE_LENGTH} digits"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_ramq() {
        validate_ramq("MARG99991313").expect("valid RAMQ should pass");
    }

    #[test]
    fn rejects_short_ramq() {
        let err = validate_ramq("MARG9999").expect_err("short RAMQ should fail");
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }

    #[test]
    fn rejects_lowercase_prefix() {
        assert!(validate_ramq("marg99991313").is_err());
    }

    #[test]
    fn rejects_non_digit_suffix() {
        assert!(validate_ramq("MARG9999131A").is_err());
    }

    #[test]
    fn registration_code_shape() {
        validate_registration_code("ABCD2345EFGH").expect("valid code should pass");
        assert!(validate_registration_code("SHORT").is_err());
        assert!(validate_registration_code("ABCD2345EFG!").is_err());
    }

    #[test]
    fn verification_code_shape() {
        validate_verification_code("123456").expect("valid code should pass");
        assert!(validate_verification_code("12345").is_err());
        assert!(validate_verification_code("12345a").is_err());
    }
}

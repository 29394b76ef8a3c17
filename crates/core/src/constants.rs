//! Constants shared across core services.

/// Directory under the data dir that holds the versioned registry.
pub const REGISTRY_DIR_NAME: &str = "registry";

/// Maximum possible patient age for a relationship.
pub const RELATIONSHIP_MAX_AGE: u32 = 150;

/// Length of a registration code.
pub const REGISTRATION_CODE_LENGTH: usize = 12;
/// Length of an email verification code.
pub const VERIFICATION_CODE_LENGTH: usize = 6;
/// Failed verification attempts before a registration code is blocked.
pub const REGISTRATION_ATTEMPT_LIMIT: u32 = 3;
/// Fallback validity window when the issuing institution cannot be resolved.
pub const DEFAULT_CODE_VALID_HOURS: u32 = 72;

/// Alphabet for generated registration codes.
///
/// Uppercase letters and digits with the ambiguous 0/O and 1/I removed, as
/// the codes are read from printed QR-code sheets.
pub const REGISTRATION_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

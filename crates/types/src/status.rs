//! Status enums for relationships and registration codes.
//!
//! The wire representation keeps the three-letter codes used by the legacy
//! database so that records can be correlated across systems without a
//! mapping table.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Lifecycle status of a caregiver-patient relationship.
///
/// The allowed transitions form a small state machine:
///
/// ```text
/// Pending ──confirm──> Confirmed ──sweep──> Expired
///    │                     │
///  deny                  revoke
///    ▼                     ▼
/// Denied                Revoked
/// ```
///
/// `Denied`, `Revoked` and `Expired` are terminal. Only `Confirmed` grants
/// data access; enforcement happens at request time (see `opal_core::access`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RelationshipStatus {
    /// Requested but not yet reviewed by an administrator.
    #[serde(rename = "PEN")]
    Pending,
    /// Approved; grants access to the patient's data.
    #[serde(rename = "CON")]
    Confirmed,
    /// Rejected by an administrator. Terminal.
    #[serde(rename = "DEN")]
    Denied,
    /// Ended automatically by age or end date. Terminal.
    #[serde(rename = "EXP")]
    Expired,
    /// Withdrawn by an administrator. Terminal.
    #[serde(rename = "REV")]
    Revoked,
}

impl RelationshipStatus {
    /// Returns true if the relationship is still active, i.e. counts towards
    /// the duplicate-relationship constraint.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Returns true if no further transitions are allowed from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Denied | Self::Expired | Self::Revoked)
    }

    /// Returns true if the transition from `self` to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Denied)
                | (Self::Confirmed, Self::Expired)
                | (Self::Confirmed, Self::Revoked)
        )
    }

    /// Returns true if a status change to `target` must carry a non-empty
    /// reason.
    pub fn requires_reason(target: Self) -> bool {
        matches!(target, Self::Denied | Self::Revoked)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PEN",
            Self::Confirmed => "CON",
            Self::Denied => "DEN",
            Self::Expired => "EXP",
            Self::Revoked => "REV",
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a registration code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RegistrationCodeStatus {
    /// Issued and usable.
    #[serde(rename = "NEW")]
    New,
    /// Consumed by a completed registration.
    #[serde(rename = "REG")]
    Registered,
    /// Validity window elapsed before use.
    #[serde(rename = "EXP")]
    Expired,
    /// Too many failed verification attempts.
    #[serde(rename = "BLK")]
    Blocked,
}

impl RegistrationCodeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Registered => "REG",
            Self::Expired => "EXP",
            Self::Blocked => "BLK",
        }
    }
}

impl fmt::Display for RegistrationCodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_confirmed_or_denied() {
        assert!(RelationshipStatus::Pending.can_transition_to(RelationshipStatus::Confirmed));
        assert!(RelationshipStatus::Pending.can_transition_to(RelationshipStatus::Denied));
        assert!(!RelationshipStatus::Pending.can_transition_to(RelationshipStatus::Expired));
        assert!(!RelationshipStatus::Pending.can_transition_to(RelationshipStatus::Revoked));
    }

    #[test]
    fn confirmed_can_expire_or_be_revoked() {
        assert!(RelationshipStatus::Confirmed.can_transition_to(RelationshipStatus::Expired));
        assert!(RelationshipStatus::Confirmed.can_transition_to(RelationshipStatus::Revoked));
        assert!(!RelationshipStatus::Confirmed.can_transition_to(RelationshipStatus::Denied));
        assert!(!RelationshipStatus::Confirmed.can_transition_to(RelationshipStatus::Pending));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        for terminal in [
            RelationshipStatus::Denied,
            RelationshipStatus::Expired,
            RelationshipStatus::Revoked,
        ] {
            assert!(terminal.is_terminal());
            for target in [
                RelationshipStatus::Pending,
                RelationshipStatus::Confirmed,
                RelationshipStatus::Denied,
                RelationshipStatus::Expired,
                RelationshipStatus::Revoked,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn no_self_transitions() {
        for status in [
            RelationshipStatus::Pending,
            RelationshipStatus::Confirmed,
            RelationshipStatus::Denied,
            RelationshipStatus::Expired,
            RelationshipStatus::Revoked,
        ] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn only_active_statuses_count_towards_duplicates() {
        assert!(RelationshipStatus::Pending.is_active());
        assert!(RelationshipStatus::Confirmed.is_active());
        assert!(!RelationshipStatus::Denied.is_active());
        assert!(!RelationshipStatus::Expired.is_active());
        assert!(!RelationshipStatus::Revoked.is_active());
    }

    #[test]
    fn deny_and_revoke_require_reason() {
        assert!(RelationshipStatus::requires_reason(RelationshipStatus::Denied));
        assert!(RelationshipStatus::requires_reason(RelationshipStatus::Revoked));
        assert!(!RelationshipStatus::requires_reason(RelationshipStatus::Confirmed));
        assert!(!RelationshipStatus::requires_reason(RelationshipStatus::Expired));
    }

    #[test]
    fn status_serializes_to_legacy_codes() {
        let json = serde_json::to_string(&RelationshipStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CON\"");
        let parsed: RelationshipStatus = serde_json::from_str("\"REV\"").unwrap();
        assert_eq!(parsed, RelationshipStatus::Revoked);
    }
}

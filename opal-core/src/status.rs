//! Method-status translator
//!
//! Maps the one-byte status code found in a method-status trailer to a
//! diagnostic category. Pure lookup, never used for control flow.

use std::fmt;

/// Method status code categories from the TCG core specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodStatus {
    Success,
    NotAuthorized,
    SpBusy,
    SpFailed,
    SpDisabled,
    SpFrozen,
    NoSessionsAvailable,
    UniquenessConflict,
    InsufficientSpace,
    InsufficientRows,
    InvalidParameter,
    TperMalfunction,
    TransactionFailure,
    ResponseOverflow,
    AuthorityLockedOut,
    Fail,
    /// Code not listed in the specification; the raw byte is preserved
    Unknown(u8),
}

/// Code-to-category table; codes absent here translate to `Unknown`
const STATUS_TABLE: &[(u8, MethodStatus)] = &[
    (0x00, MethodStatus::Success),
    (0x01, MethodStatus::NotAuthorized),
    (0x03, MethodStatus::SpBusy),
    (0x04, MethodStatus::SpFailed),
    (0x05, MethodStatus::SpDisabled),
    (0x06, MethodStatus::SpFrozen),
    (0x07, MethodStatus::NoSessionsAvailable),
    (0x08, MethodStatus::UniquenessConflict),
    (0x09, MethodStatus::InsufficientSpace),
    (0x0A, MethodStatus::InsufficientRows),
    (0x0C, MethodStatus::InvalidParameter),
    (0x0F, MethodStatus::TperMalfunction),
    (0x10, MethodStatus::TransactionFailure),
    (0x11, MethodStatus::ResponseOverflow),
    (0x12, MethodStatus::AuthorityLockedOut),
    (0x3F, MethodStatus::Fail),
];

impl MethodStatus {
    /// Translate a raw status byte into its category
    pub fn from_code(code: u8) -> Self {
        STATUS_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, s)| *s)
            .unwrap_or(MethodStatus::Unknown(code))
    }

    /// Raw status byte for this category
    pub fn code(&self) -> u8 {
        match self {
            MethodStatus::Unknown(code) => *code,
            _ => STATUS_TABLE
                .iter()
                .find(|(_, s)| s == self)
                .map(|(c, _)| *c)
                .unwrap_or(0x3F),
        }
    }

    /// Diagnostic label for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodStatus::Success => "SUCCESS",
            MethodStatus::NotAuthorized => "NOT_AUTHORIZED",
            MethodStatus::SpBusy => "SP_BUSY",
            MethodStatus::SpFailed => "SP_FAILED",
            MethodStatus::SpDisabled => "SP_DISABLED",
            MethodStatus::SpFrozen => "SP_FROZEN",
            MethodStatus::NoSessionsAvailable => "NO_SESSIONS_AVAILABLE",
            MethodStatus::UniquenessConflict => "UNIQUENESS_CONFLICT",
            MethodStatus::InsufficientSpace => "INSUFFICIENT_SPACE",
            MethodStatus::InsufficientRows => "INSUFFICIENT_ROWS",
            MethodStatus::InvalidParameter => "INVALID_PARAMETER",
            MethodStatus::TperMalfunction => "TPER_MALFUNCTION",
            MethodStatus::TransactionFailure => "TRANSACTION_FAILURE",
            MethodStatus::ResponseOverflow => "RESPONSE_OVERFLOW",
            MethodStatus::AuthorityLockedOut => "AUTHORITY_LOCKED_OUT",
            MethodStatus::Fail => "FAIL",
            MethodStatus::Unknown(_) => "Unknown status code",
        }
    }

    /// Check whether this status reports success
    pub fn is_success(&self) -> bool {
        matches!(self, MethodStatus::Success)
    }
}

impl fmt::Display for MethodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trips() {
        for (code, status) in STATUS_TABLE {
            assert_eq!(MethodStatus::from_code(*code), *status);
            assert_eq!(status.code(), *code);
        }
    }

    #[test]
    fn test_documented_categories() {
        assert_eq!(MethodStatus::from_code(0x00), MethodStatus::Success);
        assert!(MethodStatus::from_code(0x00).is_success());
        assert_eq!(
            MethodStatus::from_code(0x07),
            MethodStatus::NoSessionsAvailable
        );
        assert_eq!(
            MethodStatus::from_code(0x07).as_str(),
            "NO_SESSIONS_AVAILABLE"
        );
        assert_eq!(
            MethodStatus::from_code(0x12),
            MethodStatus::AuthorityLockedOut
        );
        assert_eq!(MethodStatus::from_code(0x3F), MethodStatus::Fail);
    }

    #[test]
    fn test_unknown_code_preserved() {
        let status = MethodStatus::from_code(0x2A);
        assert_eq!(status, MethodStatus::Unknown(0x2A));
        assert_eq!(status.code(), 0x2A);
        assert_eq!(status.as_str(), "Unknown status code");
        assert!(!status.is_success());
    }
}

use crate::status::MethodStatus;
use thiserror::Error;

/// Sentinel status the protocol reports for a response that cannot be
/// trusted (zero-length framing field or missing method-status trailer).
pub const FRAMING_FAILURE: u8 = 0xFF;

/// Direction of the transport call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Send,
    Recv,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Send => write!(f, "IF-SEND"),
            Phase::Recv => write!(f, "IF-RECV"),
        }
    }
}

/// Main error type for opal session operations
#[derive(Error, Debug)]
pub enum OpalError {
    #[error("transport failure on {phase}: device returned status {status}")]
    Transport { phase: Phase, status: u8 },

    #[error("framing failure: {0}")]
    Framing(String),

    #[error("method failed: {status} (code 0x{code:02X})")]
    Method { code: u8, status: MethodStatus },

    #[error("session error: {0}")]
    Session(String),

    #[error("command build error: {0}")]
    CommandBuild(String),
}

impl OpalError {
    /// Build a method-failure error from the raw status byte, keeping both
    /// the numeric code and its translated category.
    pub fn method(code: u8) -> Self {
        OpalError::Method {
            code,
            status: MethodStatus::from_code(code),
        }
    }

    /// Numeric result code this failure maps to on the wire: the raw method
    /// status byte for a method failure, the transport status for a
    /// transport failure, and [`FRAMING_FAILURE`] for everything else.
    pub fn status_code(&self) -> u8 {
        match self {
            OpalError::Transport { status, .. } => *status,
            OpalError::Method { code, .. } => *code,
            _ => FRAMING_FAILURE,
        }
    }
}

/// Result type alias for opal session operations
pub type OpalResult<T> = Result<T, OpalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_error_carries_both_signals() {
        let err = OpalError::method(0x07);
        match err {
            OpalError::Method { code, status } => {
                assert_eq!(code, 0x07);
                assert_eq!(status, MethodStatus::NoSessionsAvailable);
            }
            _ => panic!("expected method error"),
        }
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(OpalError::method(0x12).status_code(), 0x12);
        assert_eq!(
            OpalError::Transport {
                phase: Phase::Send,
                status: 4
            }
            .status_code(),
            4
        );
        assert_eq!(
            OpalError::Framing("bad trailer".to_string()).status_code(),
            FRAMING_FAILURE
        );
    }
}

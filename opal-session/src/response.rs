//! Response frame parsing and validation
//!
//! Every RECV yields a raw buffer interpreted as three nested length-prefixed
//! segments followed by the token payload:
//!
//! ```text
//! offset  0: com-packet length  u32be
//! offset  4: packet length      u32be
//! offset  8: sub-packet length  u32be
//! offset 12: payload bytes...
//! ```
//!
//! A well-formed method reply ends in the five-byte method-status trailer
//! `[F0][status][00][00][F1]`. The one exception is the TPer's graceful
//! end-of-session acknowledgment: a single payload byte `FA` with no trailer.

use crate::token;
use opal_core::{MethodStatus, OpalError, OpalResult};

/// Byte count of the three length fields preceding the payload
pub const RESPONSE_HEADER_LENGTH: usize = 12;

/// Byte count of the method-status trailer
pub const STATUS_TRAILER_LENGTH: usize = 5;

/// Parsed view of one response frame
#[derive(Debug)]
pub struct ResponseFrame<'a> {
    com_packet_length: u32,
    packet_length: u32,
    sub_packet_length: u32,
    payload: &'a [u8],
}

impl<'a> ResponseFrame<'a> {
    /// Parse the framing layers of a raw response buffer.
    ///
    /// Fails if the buffer is shorter than the header, if any length field
    /// is zero, or if the sub-packet length points past the buffer.
    pub fn parse(buf: &'a [u8]) -> OpalResult<Self> {
        if buf.len() < RESPONSE_HEADER_LENGTH {
            return Err(OpalError::Framing(format!(
                "response buffer of {} bytes is shorter than the frame header",
                buf.len()
            )));
        }
        let com_packet_length = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let packet_length = u32::from_be_bytes(buf[4..8].try_into().unwrap());
        let sub_packet_length = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        if com_packet_length == 0 || packet_length == 0 || sub_packet_length == 0 {
            return Err(OpalError::Framing(
                "one or more header fields have 0 length".to_string(),
            ));
        }
        let region = &buf[RESPONSE_HEADER_LENGTH..];
        if sub_packet_length as usize > region.len() {
            return Err(OpalError::Framing(format!(
                "sub-packet length {} exceeds the {} remaining buffer bytes",
                sub_packet_length,
                region.len()
            )));
        }
        Ok(Self {
            com_packet_length,
            packet_length,
            sub_packet_length,
            payload: &region[..sub_packet_length as usize],
        })
    }

    /// Payload region delimited by the sub-packet length
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn com_packet_length(&self) -> u32 {
        self.com_packet_length
    }

    pub fn packet_length(&self) -> u32 {
        self.packet_length
    }

    pub fn sub_packet_length(&self) -> u32 {
        self.sub_packet_length
    }

    /// Whether this frame is the TPer's end-of-session acknowledgment
    pub fn is_end_of_session_ack(&self) -> bool {
        self.sub_packet_length == 1 && self.payload[0] == token::END_OF_SESSION
    }

    /// Extract the status byte from the method-status trailer.
    ///
    /// Both marker bytes must sit at their expected offsets; a reply without
    /// them cannot be trusted even if a success byte happens to be present.
    pub fn method_status(&self) -> OpalResult<u8> {
        let len = self.payload.len();
        if len < STATUS_TRAILER_LENGTH {
            return Err(OpalError::Framing(format!(
                "payload of {} bytes cannot hold a method-status trailer",
                len
            )));
        }
        if self.payload[len - STATUS_TRAILER_LENGTH] != token::START_LIST
            || self.payload[len - 1] != token::END_LIST
        {
            return Err(OpalError::Framing("method status missing".to_string()));
        }
        Ok(self.payload[len - 4])
    }

    /// Validate the frame as the reply to one exchange.
    ///
    /// Returns `Ok(())` for a zero method status or the end-of-session
    /// acknowledgment; a non-zero status byte becomes a method error
    /// carrying both the raw code and its translated category.
    pub fn validate(&self) -> OpalResult<()> {
        if self.is_end_of_session_ack() {
            return Ok(());
        }
        let code = self.method_status()?;
        if code != 0 {
            log::error!(
                "non-zero method status code {}",
                MethodStatus::from_code(code)
            );
            return Err(OpalError::method(code));
        }
        Ok(())
    }
}

/// Session numbers returned by the TPer's start-session reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSessionReply {
    pub host_session_number: u32,
    pub tper_session_number: u32,
}

impl StartSessionReply {
    /// Read the two big-endian session-number fields from a validated
    /// start-session reply payload
    pub fn parse(frame: &ResponseFrame<'_>) -> OpalResult<Self> {
        let payload = frame.payload();
        if payload.len() < 8 + STATUS_TRAILER_LENGTH {
            return Err(OpalError::Framing(format!(
                "start-session reply payload of {} bytes is too short",
                payload.len()
            )));
        }
        Ok(Self {
            host_session_number: u32::from_be_bytes(payload[0..4].try_into().unwrap()),
            tper_session_number: u32::from_be_bytes(payload[4..8].try_into().unwrap()),
        })
    }
}

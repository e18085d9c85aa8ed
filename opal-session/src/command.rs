//! Method-command builder
//!
//! A [`MethodCommand`] owns the in-progress request frame for one method
//! invocation: the three length-prefixed framing layers, the addressing
//! block the exchange engine stamps just before transmission, and the token
//! payload.
//!
//! Request frame layout:
//!
//! ```text
//! offset  0: com-packet length   u32be  (bytes following this field)
//! offset  4: packet length       u32be  (bytes following this field)
//! offset  8: sub-packet length   u32be  (payload byte count)
//! offset 12: com id              u16be, 2 reserved bytes
//! offset 16: host session number u32be
//! offset 20: tper session number u32be
//! offset 24: token payload...
//! ```

use crate::hexdump::hex_dump;
use crate::token;
use bytes::{BufMut, BytesMut};
use opal_core::{OpalError, OpalResult, Uid};
use opal_transport::IO_BUFFER_LENGTH;

/// Byte count of the request frame header preceding the token payload
pub const HEADER_LENGTH: usize = 24;

const COM_PACKET_LENGTH_OFFSET: usize = 0;
const PACKET_LENGTH_OFFSET: usize = 4;
const SUB_PACKET_LENGTH_OFFSET: usize = 8;
const COM_ID_OFFSET: usize = 12;
const HSN_OFFSET: usize = 16;
const TSN_OFFSET: usize = 20;

/// Token bytes of the empty method-status list appended by [`MethodCommand::finish`]
const STATUS_TRAILER: [u8; 5] = [token::START_LIST, 0x00, 0x00, 0x00, token::END_LIST];

/// In-progress token-encoded method invocation
#[derive(Debug)]
pub struct MethodCommand {
    buf: BytesMut,
    overflow: bool,
}

impl MethodCommand {
    /// Create an empty command with a zeroed header
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(IO_BUFFER_LENGTH);
        buf.resize(HEADER_LENGTH, 0);
        Self {
            buf,
            overflow: false,
        }
    }

    /// Begin a method invocation of `method` on the object `invoker`
    pub fn reset(&mut self, invoker: &Uid, method: &Uid) {
        self.reset_raw();
        self.add_token(token::CALL);
        self.add_uid(invoker);
        self.add_uid(method);
    }

    /// Begin a bare token payload with no method call preamble, used for
    /// the end-of-session token
    pub fn reset_raw(&mut self) {
        self.buf.truncate(0);
        self.buf.resize(HEADER_LENGTH, 0);
        self.overflow = false;
    }

    /// Append a structural token byte
    pub fn add_token(&mut self, token: u8) {
        if self.check_capacity(1) {
            self.buf.put_u8(token);
        }
    }

    /// Append an unsigned integer atom
    pub fn add_uint(&mut self, value: u64) {
        // worst case: short atom tag + 8 significant bytes
        if self.check_capacity(9) {
            token::put_uint(&mut self.buf, value);
        }
    }

    /// Append a byte-string atom
    pub fn add_bytes(&mut self, data: &[u8]) -> OpalResult<()> {
        if self.check_capacity(data.len() + 2) {
            token::put_bytes(&mut self.buf, data)?;
        }
        Ok(())
    }

    /// Append a UID atom
    pub fn add_uid(&mut self, uid: &Uid) {
        if self.check_capacity(9) {
            token::put_uid(&mut self.buf, uid);
        }
    }

    /// Close the command: append the end-of-data token and the empty
    /// method-status list, then back-fill the three length fields
    pub fn finish(&mut self) -> OpalResult<()> {
        if self.check_capacity(1 + STATUS_TRAILER.len()) {
            self.buf.put_u8(token::END_OF_DATA);
            self.buf.put_slice(&STATUS_TRAILER);
        }
        self.seal()
    }

    /// Close the command without a method-status list, used for the
    /// end-of-session token which is not a method invocation
    pub fn finish_without_status(&mut self) -> OpalResult<()> {
        self.seal()
    }

    fn seal(&mut self) -> OpalResult<()> {
        if self.overflow {
            return Err(OpalError::CommandBuild(format!(
                "command exceeds the {} byte I/O unit",
                IO_BUFFER_LENGTH
            )));
        }
        let total = self.buf.len();
        let payload = total - HEADER_LENGTH;
        self.put_u32_at(COM_PACKET_LENGTH_OFFSET, (total - 4) as u32);
        self.put_u32_at(PACKET_LENGTH_OFFSET, (total - 8) as u32);
        self.put_u32_at(SUB_PACKET_LENGTH_OFFSET, payload as u32);
        Ok(())
    }

    /// Stamp the host session number
    pub fn set_hsn(&mut self, hsn: u32) {
        self.put_u32_at(HSN_OFFSET, hsn);
    }

    /// Stamp the TPer session number
    pub fn set_tsn(&mut self, tsn: u32) {
        self.put_u32_at(TSN_OFFSET, tsn);
    }

    /// Stamp the communication channel identifier
    pub fn set_com_id(&mut self, com_id: u16) {
        self.buf[COM_ID_OFFSET..COM_ID_OFFSET + 2].copy_from_slice(&com_id.to_be_bytes());
    }

    /// Full frame bytes, header plus payload
    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable frame bytes, handed to the transport for IF-SEND
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Token payload region after the header
    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_LENGTH..]
    }

    /// Log the frame as a debug-level hex dump
    pub fn dump(&self) {
        hex_dump("request frame", &self.buf);
    }

    fn put_u32_at(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Record whether `additional` more bytes still fit in the I/O unit
    fn check_capacity(&mut self, additional: usize) -> bool {
        if self.buf.len() + additional > IO_BUFFER_LENGTH {
            self.overflow = true;
        }
        !self.overflow
    }
}

impl Default for MethodCommand {
    fn default() -> Self {
        Self::new()
    }
}

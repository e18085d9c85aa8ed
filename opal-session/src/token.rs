//! Token-stream atoms for method payloads
//!
//! The parameter list of a method invocation is a flat token stream:
//! structural bytes delimiting lists and named pairs, and atoms carrying
//! integers and byte strings. The session layer only ever encodes tokens;
//! the single decoded reply field pair is handled by the response parser.

use bytes::{BufMut, BytesMut};
use opal_core::{OpalError, OpalResult, Uid};

/// Open bracket of a parameter list
pub const START_LIST: u8 = 0xF0;
/// Close bracket of a parameter list
pub const END_LIST: u8 = 0xF1;
/// Open bracket of a name/value pair
pub const START_NAME: u8 = 0xF2;
/// Close bracket of a name/value pair
pub const END_NAME: u8 = 0xF3;
/// Method invocation marker
pub const CALL: u8 = 0xF8;
/// End of method parameter data
pub const END_OF_DATA: u8 = 0xF9;
/// End-of-session token; also the single payload byte of the TPer's
/// end-of-session acknowledgment
pub const END_OF_SESSION: u8 = 0xFA;

/// Largest value a tiny atom can carry
const TINY_ATOM_MAX: u64 = 0x3F;
/// Short-atom tag for unsigned integers, low nibble carries the length
const SHORT_UINT_TAG: u8 = 0x80;
/// Short-atom tag for byte strings up to 15 bytes
const SHORT_BYTES_TAG: u8 = 0xA0;
/// Medium-atom tag for byte strings up to 2047 bytes
const MEDIUM_BYTES_TAG: u8 = 0xD0;
/// Maximum byte-string length a medium atom can carry
const MEDIUM_BYTES_MAX: usize = 0x07FF;

/// Encode an unsigned integer as a tiny or short atom
pub fn put_uint(out: &mut BytesMut, value: u64) {
    if value <= TINY_ATOM_MAX {
        out.put_u8(value as u8);
        return;
    }
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.put_u8(SHORT_UINT_TAG | significant.len() as u8);
    out.put_slice(significant);
}

/// Encode a byte string as a short or medium atom
pub fn put_bytes(out: &mut BytesMut, data: &[u8]) -> OpalResult<()> {
    if data.len() < 16 {
        out.put_u8(SHORT_BYTES_TAG | data.len() as u8);
    } else if data.len() <= MEDIUM_BYTES_MAX {
        out.put_u8(MEDIUM_BYTES_TAG | (data.len() >> 8) as u8);
        out.put_u8((data.len() & 0xFF) as u8);
    } else {
        return Err(OpalError::CommandBuild(format!(
            "byte string of {} bytes exceeds the medium-atom limit",
            data.len()
        )));
    }
    out.put_slice(data);
    Ok(())
}

/// Encode an 8-byte UID as a short byte-string atom
pub fn put_uid(out: &mut BytesMut, uid: &Uid) {
    out.put_u8(SHORT_BYTES_TAG | 8);
    out.put_slice(uid);
}

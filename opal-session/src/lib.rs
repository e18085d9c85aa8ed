//! Session layer module for the TCG storage-security protocol
//!
//! This crate implements the stateful exchange with a self-encrypting
//! device's security controller: token-encoded method commands, the nested
//! com-packet/packet/sub-packet response framing, and the session lifecycle
//! from STARTSESSION through end-of-session teardown.

pub mod command;
pub mod response;
pub mod session;
pub mod token;

mod hexdump;

pub use command::{MethodCommand, HEADER_LENGTH};
pub use response::{ResponseFrame, StartSessionReply, RESPONSE_HEADER_LENGTH, STATUS_TRAILER_LENGTH};
pub use session::Session;

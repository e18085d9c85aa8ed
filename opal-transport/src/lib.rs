//! Transport layer module for the TCG storage-security protocol
//!
//! This crate defines the seam between the session layer and the device
//! pass-through that carries security-protocol SEND/RECV commands, plus a
//! scripted in-memory device for protocol testing.

pub mod device;
pub mod scripted;

pub use device::{DeviceTransport, IfDirection, IO_BUFFER_LENGTH, TCG_PROTOCOL};
pub use scripted::ScriptedDevice;

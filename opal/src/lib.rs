//! opal - Rust client for the TCG storage-security session protocol
//!
//! This library drives authenticated sessions with a self-encrypting
//! device's security controller over the vendor security-protocol
//! SEND/RECV pass-through.
//!
//! # Architecture
//!
//! The library is organized as a workspace with multiple crates:
//!
//! - `opal-core`: error type, method-status translator, well-known UIDs
//! - `opal-transport`: device pass-through seam and scripted test device
//! - `opal-session`: method commands, response framing, session lifecycle
//!
//! # Usage
//!
//! ```no_run
//! use opal::{Session, uid};
//! # fn demo(device: &mut impl opal::DeviceTransport) -> opal::OpalResult<()> {
//! let mut session = Session::new(device);
//! session.start_with_auth(&uid::ADMIN_SP, b"password", &uid::SID_AUTHORITY)?;
//! // ... issue commands through session.transact(...) ...
//! session.close()?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use opal_core::{MethodStatus, OpalError, OpalResult, Phase, FRAMING_FAILURE};
pub use opal_core::uid::{self, Uid};

// Re-export the transport seam
pub use opal_transport::{DeviceTransport, IfDirection, ScriptedDevice, IO_BUFFER_LENGTH, TCG_PROTOCOL};

// Re-export the session API
pub use opal_session::{MethodCommand, ResponseFrame, Session, StartSessionReply};
pub use opal_session::token;

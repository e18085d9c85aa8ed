//! Core types for the TCG storage-security session layer
//!
//! This crate provides the shared foundation used by the other opal crates:
//! the error type, the method-status translator, and the well-known UIDs of
//! the protocol.

pub mod error;
pub mod status;
pub mod uid;

pub use error::{OpalError, OpalResult, Phase, FRAMING_FAILURE};
pub use status::MethodStatus;
pub use uid::Uid;

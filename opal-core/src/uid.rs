//! Well-known UIDs from the TCG core specification
//!
//! Objects and methods on the TPer are addressed by 8-byte unique
//! identifiers. The session layer only needs the session-manager object,
//! the security providers it opens sessions to, and the authorities a
//! session can be signed with.

/// 8-byte object or method identifier
pub type Uid = [u8; 8];

/// Session manager, the well-known object STARTSESSION is addressed to
pub const SMUID: Uid = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF];

/// The SP a session is currently open to
pub const THIS_SP: Uid = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];

/// Administrative security provider
pub const ADMIN_SP: Uid = [0x00, 0x00, 0x02, 0x05, 0x00, 0x00, 0x00, 0x01];

/// Locking security provider
pub const LOCKING_SP: Uid = [0x00, 0x00, 0x02, 0x05, 0x00, 0x00, 0x00, 0x02];

/// Anybody authority (no credential required)
pub const ANYBODY_AUTHORITY: Uid = [0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x01];

/// SID authority of the Admin SP
pub const SID_AUTHORITY: Uid = [0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x06];

/// Session-manager method UIDs
pub mod method {
    use super::Uid;

    /// Properties exchange, the first method a host usually invokes
    pub const PROPERTIES: Uid = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x01];

    /// Session establishment
    pub const STARTSESSION: Uid = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x02];

    /// Session establishment reply from the TPer
    pub const SYNCSESSION: Uid = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x03];
}

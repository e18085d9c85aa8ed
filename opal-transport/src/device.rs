//! Device transport trait for security-protocol pass-through

use std::fmt;

/// Maximum transfer unit of one IF-SEND or IF-RECV, in bytes.
///
/// Every session allocates exactly one I/O buffer of this size and every
/// RECV is issued against the full unit.
pub const IO_BUFFER_LENGTH: usize = 2048;

/// Security-protocol number used for TCG communications by default
pub const TCG_PROTOCOL: u8 = 0x01;

/// Direction flag of a security-protocol pass-through command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfDirection {
    /// IF-SEND: host to TPer
    Send,
    /// IF-RECV: TPer to host
    Recv,
}

impl fmt::Display for IfDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfDirection::Send => write!(f, "IF-SEND"),
            IfDirection::Recv => write!(f, "IF-RECV"),
        }
    }
}

/// Interface to a device that forwards security-protocol commands
///
/// Implementations wrap the ioctl-style pass-through of a concrete device
/// (ATA trusted SEND/RECEIVE, SCSI SECURITY PROTOCOL IN/OUT, NVMe security
/// commands). Calls block until the device completes or fails the command.
pub trait DeviceTransport {
    /// Issue one pass-through command in the given direction.
    ///
    /// For [`IfDirection::Send`] the buffer is transmitted to the device;
    /// for [`IfDirection::Recv`] the device fills the buffer.
    ///
    /// # Returns
    ///
    /// The raw transport status: 0 on success; any non-zero value is a
    /// total transport failure and the buffer contents must not be trusted.
    fn send_cmd(
        &mut self,
        direction: IfDirection,
        protocol: u8,
        com_id: u16,
        buffer: &mut [u8],
    ) -> u8;

    /// Communication channel identifier assigned to this device
    fn com_id(&self) -> u16;
}

//! Scripted in-memory device for protocol testing
//!
//! Plays back queued response frames and records every frame the session
//! layer transmits, so tests can assert on the exact exchange sequence
//! without real hardware.

use crate::device::{DeviceTransport, IfDirection};
use std::collections::VecDeque;

/// Transport status reported when a RECV is issued with no scripted
/// response left in the queue.
pub const NO_RESPONSE_SCRIPTED: u8 = 0x01;

/// In-memory device that records sends and replays scripted responses
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    com_id: u16,
    sent: Vec<Vec<u8>>,
    responses: VecDeque<Vec<u8>>,
    recv_calls: usize,
    send_status: u8,
    recv_status: u8,
}

impl ScriptedDevice {
    /// Create a device answering on the given com id
    pub fn new(com_id: u16) -> Self {
        Self {
            com_id,
            ..Default::default()
        }
    }

    /// Queue a response frame for the next RECV
    pub fn push_response(&mut self, frame: Vec<u8>) {
        self.responses.push_back(frame);
    }

    /// Make every subsequent SEND fail with the given transport status
    pub fn fail_send(&mut self, status: u8) {
        self.send_status = status;
    }

    /// Make every subsequent RECV fail with the given transport status
    pub fn fail_recv(&mut self, status: u8) {
        self.recv_status = status;
    }

    /// Frames transmitted so far, in order
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Number of RECV pass-through calls issued so far
    pub fn recv_calls(&self) -> usize {
        self.recv_calls
    }
}

impl DeviceTransport for ScriptedDevice {
    fn send_cmd(
        &mut self,
        direction: IfDirection,
        protocol: u8,
        com_id: u16,
        buffer: &mut [u8],
    ) -> u8 {
        log::trace!(
            "{} protocol 0x{:02X} com id 0x{:04X} ({} bytes)",
            direction,
            protocol,
            com_id,
            buffer.len()
        );
        match direction {
            IfDirection::Send => {
                if self.send_status != 0 {
                    return self.send_status;
                }
                self.sent.push(buffer.to_vec());
                0
            }
            IfDirection::Recv => {
                self.recv_calls += 1;
                if self.recv_status != 0 {
                    return self.recv_status;
                }
                match self.responses.pop_front() {
                    Some(frame) => {
                        let n = frame.len().min(buffer.len());
                        buffer[..n].copy_from_slice(&frame[..n]);
                        0
                    }
                    None => NO_RESPONSE_SCRIPTED,
                }
            }
        }
    }

    fn com_id(&self) -> u16 {
        self.com_id
    }
}

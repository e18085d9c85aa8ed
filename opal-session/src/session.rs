//! Session lifecycle and exchange engine
//!
//! A [`Session`] owns one authenticated conversation with a security
//! provider on a device: it builds the STARTSESSION command, stamps session
//! identifiers into every outgoing frame, drives the one-SEND-one-RECV
//! exchange, and guarantees an end-of-session command on teardown unless an
//! abort is expected.

use crate::command::MethodCommand;
use crate::hexdump::hex_dump;
use crate::response::{ResponseFrame, StartSessionReply};
use crate::token;
use opal_core::{uid, OpalError, OpalResult, Phase, Uid};
use opal_transport::{DeviceTransport, IfDirection, IO_BUFFER_LENGTH, TCG_PROTOCOL};

/// Fixed host session number sent in every STARTSESSION request.
///
/// A static placeholder; a per-session generated number would work as well
/// since the reply echoes whatever the host sent.
const START_HOST_SESSION_NUMBER: u64 = 105;

/// Write-access flag of the STARTSESSION parameter list
const WRITE_SESSION: u64 = 1;

/// Named-parameter id carrying the host challenge
const HOST_CHALLENGE_PARAMETER: u64 = 0;

/// Named-parameter id carrying the signing authority
const SIGN_AUTHORITY_PARAMETER: u64 = 3;

/// Byte count of the reply prefix dumped at debug level
const REPLY_DUMP_LENGTH: usize = 128;

/// Page-aligned response buffer sized to the transport I/O unit
#[repr(align(4096))]
struct IoBuffer([u8; IO_BUFFER_LENGTH]);

/// One authenticated conversation with a security provider
///
/// The session borrows the device for its whole lifetime; parallel commands
/// require independent sessions, each with its own identifier pair and
/// buffer. Dropping an established session emits an end-of-session command
/// through the regular exchange path unless [`Session::expect_abort`] was
/// called; [`Session::close`] does the same but reports the outcome.
pub struct Session<'d, D: DeviceTransport> {
    device: &'d mut D,
    buffer: Box<IoBuffer>,
    host_session_number: u32,
    tper_session_number: u32,
    protocol: u8,
    will_abort: bool,
    closed: bool,
}

impl<'d, D: DeviceTransport> Session<'d, D> {
    /// Create an unestablished session bound to `device`
    pub fn new(device: &'d mut D) -> Self {
        log::debug!("creating session");
        Self {
            device,
            buffer: Box::new(IoBuffer([0; IO_BUFFER_LENGTH])),
            host_session_number: 0,
            tper_session_number: 0,
            protocol: TCG_PROTOCOL,
            will_abort: false,
            closed: false,
        }
    }

    /// Establish an anonymous session to the given security provider
    pub fn start(&mut self, sp: &Uid) -> OpalResult<()> {
        self.start_session(sp, None)
    }

    /// Establish a session signed by `sign_authority`, proving the host
    /// challenge inside the STARTSESSION parameter list
    pub fn start_with_auth(
        &mut self,
        sp: &Uid,
        host_challenge: &[u8],
        sign_authority: &Uid,
    ) -> OpalResult<()> {
        self.start_session(sp, Some((host_challenge, sign_authority)))
    }

    fn start_session(
        &mut self,
        sp: &Uid,
        credentials: Option<(&[u8], &Uid)>,
    ) -> OpalResult<()> {
        if self.is_established() {
            return Err(OpalError::Session(
                "session is already established".to_string(),
            ));
        }
        let mut cmd = MethodCommand::new();
        cmd.reset(&uid::SMUID, &uid::method::STARTSESSION);
        cmd.add_token(token::START_LIST);
        cmd.add_uint(START_HOST_SESSION_NUMBER);
        cmd.add_uid(sp);
        cmd.add_uint(WRITE_SESSION);
        if let Some((host_challenge, sign_authority)) = credentials {
            cmd.add_token(token::START_NAME);
            cmd.add_uint(HOST_CHALLENGE_PARAMETER);
            cmd.add_bytes(host_challenge)?;
            cmd.add_token(token::END_NAME);
            cmd.add_token(token::START_NAME);
            cmd.add_uint(SIGN_AUTHORITY_PARAMETER);
            cmd.add_uid(sign_authority);
            cmd.add_token(token::END_NAME);
        }
        cmd.add_token(token::END_LIST);
        cmd.finish()?;

        self.exchange(&mut cmd)?;

        let frame = ResponseFrame::parse(&self.buffer.0)?;
        let reply = StartSessionReply::parse(&frame)?;
        self.host_session_number = reply.host_session_number;
        self.tper_session_number = reply.tper_session_number;
        log::debug!(
            "session established, HSN {} TSN {}",
            self.host_session_number,
            self.tper_session_number
        );
        Ok(())
    }

    /// Issue one application command through the exchange engine.
    ///
    /// The session identifiers and com id are stamped into `cmd` before
    /// transmission; the validated response remains readable through
    /// [`Session::response`].
    pub fn transact(&mut self, cmd: &mut MethodCommand) -> OpalResult<()> {
        if !self.is_established() {
            return Err(OpalError::Session(
                "session is not established".to_string(),
            ));
        }
        self.exchange(cmd)
    }

    /// Parsed view of the response to the most recent exchange
    pub fn response(&self) -> OpalResult<ResponseFrame<'_>> {
        ResponseFrame::parse(&self.buffer.0)
    }

    /// Select the security-protocol number used on subsequent SEND/RECV
    pub fn set_protocol(&mut self, protocol: u8) {
        self.protocol = protocol;
    }

    /// Currently configured security-protocol number
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Record that the session is already terminated on the device side, so
    /// teardown must not attempt another exchange
    pub fn expect_abort(&mut self) {
        self.will_abort = true;
    }

    /// Whether session identifiers are currently valid
    pub fn is_established(&self) -> bool {
        self.host_session_number != 0 && self.tper_session_number != 0
    }

    /// Host session number, 0 until establishment
    pub fn hsn(&self) -> u32 {
        self.host_session_number
    }

    /// TPer session number, 0 until establishment
    pub fn tsn(&self) -> u32 {
        self.tper_session_number
    }

    /// End the session explicitly, reporting the teardown outcome.
    ///
    /// Dropping the session performs the same teardown but can only log a
    /// failure; closing explicitly gives the caller the result.
    pub fn close(mut self) -> OpalResult<()> {
        self.end_session()
    }

    /// The only path by which a command leaves the process: stamp the
    /// session identifiers, SEND, zero-fill, RECV, validate.
    fn exchange(&mut self, cmd: &mut MethodCommand) -> OpalResult<()> {
        cmd.set_hsn(self.host_session_number);
        cmd.set_tsn(self.tper_session_number);
        cmd.set_com_id(self.device.com_id());
        cmd.dump();

        self.send(cmd)?;

        // stale bytes from a previous reply must never be re-interpreted
        self.buffer.0.fill(0);
        self.receive()?;
        hex_dump("reply frame", &self.buffer.0[..REPLY_DUMP_LENGTH]);

        let frame = ResponseFrame::parse(&self.buffer.0)?;
        frame.validate()
    }

    fn send(&mut self, cmd: &mut MethodCommand) -> OpalResult<()> {
        let com_id = self.device.com_id();
        let status =
            self.device
                .send_cmd(IfDirection::Send, self.protocol, com_id, cmd.buffer_mut());
        if status != 0 {
            log::error!("command failed on send: {}", status);
            return Err(OpalError::Transport {
                phase: Phase::Send,
                status,
            });
        }
        Ok(())
    }

    fn receive(&mut self) -> OpalResult<()> {
        let com_id = self.device.com_id();
        let status = self.device.send_cmd(
            IfDirection::Recv,
            self.protocol,
            com_id,
            &mut self.buffer.0,
        );
        if status != 0 {
            log::error!("command failed on recv: {}", status);
            return Err(OpalError::Transport {
                phase: Phase::Recv,
                status,
            });
        }
        Ok(())
    }

    /// Idempotent teardown: emit one end-of-session command unless an abort
    /// is expected or the session never came up
    fn end_session(&mut self) -> OpalResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.will_abort || !self.is_established() {
            return Ok(());
        }
        let mut cmd = MethodCommand::new();
        cmd.reset_raw();
        cmd.add_token(token::END_OF_SESSION);
        cmd.finish_without_status()?;
        let result = self.exchange(&mut cmd);
        self.host_session_number = 0;
        self.tper_session_number = 0;
        result
    }
}

impl<D: DeviceTransport> Drop for Session<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.end_session() {
            log::error!("end of session failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HEADER_LENGTH;
    use crate::response::RESPONSE_HEADER_LENGTH;
    use opal_core::MethodStatus;
    use opal_transport::ScriptedDevice;

    fn response(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RESPONSE_HEADER_LENGTH + payload.len());
        buf.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32 + 4).to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn start_reply(hsn: u32, tsn: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&hsn.to_be_bytes());
        payload.extend_from_slice(&tsn.to_be_bytes());
        payload.extend_from_slice(&[token::START_LIST, 0x00, 0x00, 0x00, token::END_LIST]);
        response(&payload)
    }

    fn status_reply(code: u8) -> Vec<u8> {
        response(&[token::START_LIST, code, 0x00, 0x00, token::END_LIST])
    }

    fn end_of_session_ack() -> Vec<u8> {
        response(&[token::END_OF_SESSION])
    }

    /// Token payload of a recorded request frame
    fn sent_payload(frame: &[u8]) -> &[u8] {
        let sub = u32::from_be_bytes(frame[8..12].try_into().unwrap()) as usize;
        &frame[HEADER_LENGTH..HEADER_LENGTH + sub]
    }

    #[test]
    fn test_start_builds_expected_token_list() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        {
            let mut session = Session::new(&mut dev);
            session.start(&uid::ADMIN_SP).unwrap();
            assert!(session.is_established());
            assert_eq!(session.hsn(), 105);
            assert_eq!(session.tsn(), 0x1001);
            session.expect_abort();
        }

        let payload = sent_payload(&dev.sent()[0]);
        // method call preamble: Call, SMUID, STARTSESSION
        assert_eq!(payload[0], token::CALL);
        assert_eq!(&payload[2..10], &uid::SMUID);
        assert_eq!(&payload[11..19], &uid::method::STARTSESSION);
        // parameter list always opens with 105, the SP, and the write flag
        assert_eq!(payload[19], token::START_LIST);
        assert_eq!(&payload[20..22], &[0x81, 105]);
        assert_eq!(payload[22], 0xA8);
        assert_eq!(&payload[23..31], &uid::ADMIN_SP);
        assert_eq!(payload[31], 0x01);
        assert_eq!(payload[32], token::END_LIST);
        // bracket balance across the whole payload, trailer included
        let opens = payload.iter().filter(|b| **b == token::START_LIST).count();
        let closes = payload.iter().filter(|b| **b == token::END_LIST).count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn test_start_with_auth_nests_named_pairs() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        {
            let mut session = Session::new(&mut dev);
            session
                .start_with_auth(&uid::ADMIN_SP, b"secret", &uid::SID_AUTHORITY)
                .unwrap();
            session.expect_abort();
        }

        let payload = sent_payload(&dev.sent()[0]);
        let name_opens = payload.iter().filter(|b| **b == token::START_NAME).count();
        let name_closes = payload.iter().filter(|b| **b == token::END_NAME).count();
        assert_eq!(name_opens, 2);
        assert_eq!(name_closes, 2);
        // first pair: parameter 0 carrying the challenge bytes
        let first = payload
            .iter()
            .position(|b| *b == token::START_NAME)
            .unwrap();
        assert_eq!(payload[first + 1], 0x00);
        assert_eq!(payload[first + 2], 0xA0 | 6);
        assert_eq!(&payload[first + 3..first + 9], b"secret");
        assert_eq!(payload[first + 9], token::END_NAME);
        // second pair: parameter 3 carrying the signing authority
        assert_eq!(payload[first + 10], token::START_NAME);
        assert_eq!(payload[first + 11], 0x03);
        assert_eq!(payload[first + 12], 0xA8);
        assert_eq!(&payload[first + 13..first + 21], &uid::SID_AUTHORITY);
        assert_eq!(payload[first + 21], token::END_NAME);
        // named pairs stay nested inside the parameter list
        let list_close = payload.iter().rposition(|b| *b == token::END_LIST).unwrap();
        assert!(first + 21 < list_close);
    }

    #[test]
    fn test_exchange_stamps_identifiers() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        dev.push_response(status_reply(0x00));
        {
            let mut session = Session::new(&mut dev);
            session.start(&uid::ADMIN_SP).unwrap();

            let mut cmd = MethodCommand::new();
            cmd.reset(&uid::THIS_SP, &uid::method::PROPERTIES);
            cmd.add_token(token::START_LIST);
            cmd.add_token(token::END_LIST);
            cmd.finish().unwrap();
            session.transact(&mut cmd).unwrap();
            session.expect_abort();
        }

        // the STARTSESSION frame itself goes out with unset identifiers
        let first = &dev.sent()[0];
        assert_eq!(&first[16..24], &[0u8; 8]);
        let second = &dev.sent()[1];
        assert_eq!(&second[12..14], &[0x07, 0xFE]);
        assert_eq!(u32::from_be_bytes(second[16..20].try_into().unwrap()), 105);
        assert_eq!(
            u32::from_be_bytes(second[20..24].try_into().unwrap()),
            0x1001
        );
    }

    #[test]
    fn test_send_failure_skips_recv() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.fail_send(0x04);
        {
            let mut session = Session::new(&mut dev);
            match session.start(&uid::ADMIN_SP) {
                Err(OpalError::Transport {
                    phase: Phase::Send,
                    status,
                }) => assert_eq!(status, 0x04),
                other => panic!("expected send failure, got {:?}", other),
            }
            assert!(!session.is_established());
        }
        assert_eq!(dev.recv_calls(), 0);
        assert!(dev.sent().is_empty());
    }

    #[test]
    fn test_recv_failure_reported() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.fail_recv(0x09);
        {
            let mut session = Session::new(&mut dev);
            match session.start(&uid::ADMIN_SP) {
                Err(OpalError::Transport {
                    phase: Phase::Recv,
                    status,
                }) => assert_eq!(status, 0x09),
                other => panic!("expected recv failure, got {:?}", other),
            }
        }
        assert_eq!(dev.recv_calls(), 1);
    }

    #[test]
    fn test_failed_start_leaves_session_unusable() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(status_reply(0x01));
        {
            let mut session = Session::new(&mut dev);
            match session.start(&uid::LOCKING_SP) {
                Err(OpalError::Method { code, status }) => {
                    assert_eq!(code, 0x01);
                    assert_eq!(status, MethodStatus::NotAuthorized);
                }
                other => panic!("expected method failure, got {:?}", other),
            }
            assert!(!session.is_established());
            assert_eq!(session.hsn(), 0);
            assert_eq!(session.tsn(), 0);

            let mut cmd = MethodCommand::new();
            cmd.reset(&uid::THIS_SP, &uid::method::PROPERTIES);
            cmd.finish().unwrap();
            assert!(matches!(
                session.transact(&mut cmd),
                Err(OpalError::Session(_))
            ));
        }
        // no teardown exchange for a session that never came up
        assert_eq!(dev.sent().len(), 1);
    }

    #[test]
    fn test_drop_emits_one_end_of_session() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        dev.push_response(end_of_session_ack());
        {
            let mut session = Session::new(&mut dev);
            session.start(&uid::ADMIN_SP).unwrap();
        }
        assert_eq!(dev.sent().len(), 2);
        assert_eq!(sent_payload(&dev.sent()[1]), &[token::END_OF_SESSION]);
    }

    #[test]
    fn test_expect_abort_suppresses_teardown() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        {
            let mut session = Session::new(&mut dev);
            session.start(&uid::ADMIN_SP).unwrap();
            session.expect_abort();
        }
        assert_eq!(dev.sent().len(), 1);
        assert_eq!(dev.recv_calls(), 1);
    }

    #[test]
    fn test_explicit_close_reports_outcome() {
        let mut dev = ScriptedDevice::new(0x07FE);
        dev.push_response(start_reply(105, 0x1001));
        dev.push_response(end_of_session_ack());
        {
            let mut session = Session::new(&mut dev);
            session.start(&uid::ADMIN_SP).unwrap();
            session.close().unwrap();
        }
        assert_eq!(dev.sent().len(), 2);

        // a second session over the same device, with the ack missing,
        // surfaces the teardown failure instead of swallowing it
        dev.push_response(start_reply(105, 0x1002));
        let mut session = Session::new(&mut dev);
        session.start(&uid::ADMIN_SP).unwrap();
        assert!(session.close().is_err());
    }

    #[test]
    fn test_set_protocol() {
        let mut dev = ScriptedDevice::new(0x07FE);
        let mut session = Session::new(&mut dev);
        assert_eq!(session.protocol(), TCG_PROTOCOL);
        session.set_protocol(0x02);
        assert_eq!(session.protocol(), 0x02);
    }
}

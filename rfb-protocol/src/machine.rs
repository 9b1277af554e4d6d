//! RFB client protocol state machine.
//!
//! The machine is a pure function: [`step`] looks at the bytes the transport
//! has accumulated, decodes at most one message for the current [`State`],
//! and describes what should happen next as a [`Step`]: the next state, how
//! many inbound bytes to discard, which bytes to send and which error (if any)
//! to report. It never performs I/O and never consumes part of a message, so
//! a step that lacks input simply returns the current state with nothing
//! consumed and is retried once more bytes arrive.
//!
//! # Handshake
//!
//! ```text
//! AwaitingVersion
//!   ├─ 3.3-3.6 ─> AwaitingSecurityCode ─┐
//!   └─ 3.7+   ──> AwaitingSecurityList ─┴─> Authenticate
//!                                            ├─ None ──────> AwaitingSecurityResult (3.8+) / Initialize
//!                                            ├─ VNC ───────> AwaitingChallenge ─┐
//!                                            └─ ARD ───────> AwaitingDhParams ──┴─> AwaitingSecurityResult
//! AwaitingSecurityResult ─ ok ─> Initialize ─> AwaitingServerInit ─> Setup ─> Connected
//!                        └ fail ─> AwaitingFailureReason ─> Failure
//! ```
//!
//! Any protocol error lands in [`State::Failure`], which is terminal.

use crate::auth::{ard, vnc, DhParams};
use crate::errors::SessionError;
use crate::handshake::{parse_banner, select_security_type, BANNER_LEN};
use crate::io::{WireReader, WireResult, WireWriter};
use crate::messages::client::{ClientInit, SetEncodings};
use crate::messages::server::{
    decode_reason, Bell, FramebufferUpdate, ServerCutText, ServerInit, SetColorMapEntries,
    UpdateError,
};
use crate::messages::types::{
    SecurityType, ENCODING_RAW, MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT,
    MSG_SET_COLOR_MAP_ENTRIES, SECURITY_RESULT_OK, SECURITY_RESULT_TOO_MANY_ATTEMPTS,
};
use crate::session::Session;

/// Protocol state of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    /// Waiting for the server's 12-byte version banner.
    #[default]
    AwaitingVersion,
    /// 3.3-3.6: waiting for the server-dictated security type.
    AwaitingSecurityCode,
    /// 3.7+: waiting for the list of offered security types.
    AwaitingSecurityList,
    /// Dispatching on the negotiated security type.
    Authenticate,
    AwaitingChallenge,
    AwaitingDhParams,
    AwaitingSecurityResult,
    AwaitingFailureReason,
    /// Sending ClientInit.
    Initialize,
    AwaitingServerInit,
    /// Sending SetEncodings.
    Setup,
    /// Handshake complete; dispatching server messages.
    Connected,
    Failure,
}

impl State {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == State::Failure
    }
}

/// Outcome of a single [`step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: State,
    /// Inbound bytes to discard.
    pub consumed: usize,
    /// Bytes to append to the outbound queue.
    pub output: Vec<u8>,
    pub error: Option<SessionError>,
}

impl Step {
    /// Stay in `state` without consuming anything.
    fn hold(state: State) -> Self {
        Self {
            next: state,
            consumed: 0,
            output: Vec::new(),
            error: None,
        }
    }

    fn to(next: State) -> Self {
        Self::hold(next)
    }

    fn consume(mut self, n: usize) -> Self {
        self.consumed = n;
        self
    }

    fn send(mut self, bytes: &[u8]) -> Self {
        self.output.extend_from_slice(bytes);
        self
    }

    fn fail(mut self, error: SessionError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Advance the handshake or dispatch one server message.
pub fn step(state: State, session: &mut Session, inbound: &[u8]) -> Step {
    match state {
        State::AwaitingVersion => read_version(session, inbound),
        State::AwaitingSecurityCode => read_security_code(session, inbound),
        State::AwaitingSecurityList => read_security_list(session, inbound),
        State::Authenticate => authenticate(session),
        State::AwaitingChallenge => answer_challenge(session, inbound),
        State::AwaitingDhParams => answer_dh_params(session, inbound),
        State::AwaitingSecurityResult => read_security_result(inbound),
        State::AwaitingFailureReason => read_failure_reason(session, inbound),
        State::Initialize => {
            let mut out = WireWriter::with_capacity(1);
            ClientInit {
                shared: session.shared(),
            }
            .write_to(&mut out);
            Step::to(State::AwaitingServerInit).send(out.as_slice())
        }
        State::AwaitingServerInit => read_server_init(session, inbound),
        State::Setup => {
            let mut out = WireWriter::with_capacity(8);
            SetEncodings {
                encodings: vec![ENCODING_RAW],
            }
            .write_to(&mut out);
            Step::to(State::Connected).send(out.as_slice())
        }
        State::Connected => dispatch(session, inbound),
        State::Failure => Step::hold(State::Failure),
    }
}

fn read_version(session: &mut Session, inbound: &[u8]) -> Step {
    if inbound.len() < BANNER_LEN {
        return Step::hold(State::AwaitingVersion);
    }
    let mut banner = [0u8; BANNER_LEN];
    banner.copy_from_slice(&inbound[..BANNER_LEN]);

    match parse_banner(&banner) {
        Ok(version) => {
            session.version = Some(version);
            let next = if version.uses_security_list() {
                State::AwaitingSecurityList
            } else {
                State::AwaitingSecurityCode
            };
            Step::to(next).consume(BANNER_LEN).send(&banner)
        }
        Err(error) => Step::to(State::Failure).fail(error),
    }
}

fn read_security_code(session: &mut Session, inbound: &[u8]) -> Step {
    let Ok(code) = WireReader::new(inbound).read_u32() else {
        return Step::hold(State::AwaitingSecurityCode);
    };

    match SecurityType::from(code) {
        SecurityType::Invalid => Step::to(State::Failure)
            .consume(4)
            .fail(SessionError::ServerRefused),
        security_type => {
            session.security_type = Some(security_type);
            Step::to(State::Authenticate).consume(4)
        }
    }
}

fn read_security_list(session: &mut Session, inbound: &[u8]) -> Step {
    let Some(&count) = inbound.first() else {
        return Step::hold(State::AwaitingSecurityList);
    };
    if count == 0 {
        return Step::to(State::AwaitingFailureReason)
            .consume(1)
            .fail(SessionError::ServerRefused);
    }

    let total = 1 + usize::from(count);
    if inbound.len() < total {
        return Step::hold(State::AwaitingSecurityList);
    }
    let offered = &inbound[1..total];

    match select_security_type(offered) {
        Some(security_type) => {
            session.security_type = Some(security_type);
            Step::to(State::Authenticate)
                .consume(total)
                .send(&[security_type.code() as u8])
        }
        None => Step::to(State::Failure)
            .consume(total)
            .fail(SessionError::NoAcceptableSecurity(offered.to_vec())),
    }
}

fn authenticate(session: &Session) -> Step {
    match session.security_type {
        Some(SecurityType::None) => {
            let sends_result = session
                .version
                .is_some_and(|v| v.none_sends_security_result());
            if sends_result {
                Step::to(State::AwaitingSecurityResult)
            } else {
                Step::to(State::Initialize)
            }
        }
        Some(SecurityType::VncAuth) => Step::to(State::AwaitingChallenge),
        Some(SecurityType::AppleRemoteDesktop) => Step::to(State::AwaitingDhParams),
        other => Step::to(State::Failure).fail(SessionError::UnsupportedSecurity(
            other.unwrap_or(SecurityType::Invalid),
        )),
    }
}

fn answer_challenge(session: &Session, inbound: &[u8]) -> Step {
    if inbound.len() < vnc::CHALLENGE_LEN {
        return Step::hold(State::AwaitingChallenge);
    }
    let Some(password) = session.password() else {
        return Step::hold(State::AwaitingChallenge).fail(SessionError::PasswordRequired);
    };

    let mut challenge = [0u8; vnc::CHALLENGE_LEN];
    challenge.copy_from_slice(&inbound[..vnc::CHALLENGE_LEN]);
    let response = vnc::challenge_response(password.as_bytes(), &challenge);

    Step::to(State::AwaitingSecurityResult)
        .consume(vnc::CHALLENGE_LEN)
        .send(&response)
}

fn answer_dh_params(session: &mut Session, inbound: &[u8]) -> Step {
    if session.username().is_none() || session.password().is_none() {
        return Step::hold(State::AwaitingDhParams).fail(SessionError::CredentialsRequired);
    }
    let Ok((params, len)) = DhParams::decode(inbound) else {
        return Step::hold(State::AwaitingDhParams);
    };

    match ard::respond(
        &params,
        session.username.as_bytes(),
        session.password.as_bytes(),
        session.key_source.as_mut(),
    ) {
        Ok(response) => {
            let mut out = WireWriter::with_capacity(ard::CREDENTIAL_BLOCK_LEN + len);
            response.write_to(&mut out);
            Step::to(State::AwaitingSecurityResult)
                .consume(len)
                .send(out.as_slice())
        }
        Err(error) => Step::to(State::Failure).consume(len).fail(error),
    }
}

fn read_security_result(inbound: &[u8]) -> Step {
    let Ok(result) = WireReader::new(inbound).read_u32() else {
        return Step::hold(State::AwaitingSecurityResult);
    };

    match result {
        SECURITY_RESULT_OK => Step::to(State::Initialize).consume(4),
        SECURITY_RESULT_TOO_MANY_ATTEMPTS => Step::to(State::AwaitingFailureReason)
            .consume(4)
            .fail(SessionError::TooManyAttempts),
        _ => Step::to(State::AwaitingFailureReason)
            .consume(4)
            .fail(SessionError::LoginFailed),
    }
}

fn read_failure_reason(session: &mut Session, inbound: &[u8]) -> Step {
    let sends_reason = session.version.is_some_and(|v| v.sends_failure_reason());
    if !sends_reason {
        return Step::to(State::Failure);
    }

    match decode_reason(inbound) {
        Ok((reason, len)) => {
            session.failure_reason = Some(reason);
            Step::to(State::Failure).consume(len)
        }
        Err(_) => Step::hold(State::AwaitingFailureReason),
    }
}

fn read_server_init(session: &mut Session, inbound: &[u8]) -> Step {
    match ServerInit::decode(inbound) {
        Ok((init, len)) => {
            session.display = Some(init.into());
            Step::to(State::Setup).consume(len)
        }
        Err(_) => Step::hold(State::AwaitingServerInit),
    }
}

fn dispatch(session: &mut Session, inbound: &[u8]) -> Step {
    let Some(&tag) = inbound.first() else {
        return Step::hold(State::Connected);
    };

    match tag {
        MSG_FRAMEBUFFER_UPDATE => apply_update(session, inbound),
        MSG_SET_COLOR_MAP_ENTRIES => skip(SetColorMapEntries::decode(inbound).map(|(_, n)| n)),
        MSG_BELL => skip(Bell::decode(inbound).map(|(_, n)| n)),
        MSG_SERVER_CUT_TEXT => skip(ServerCutText::decode(inbound).map(|(_, n)| n)),
        other => Step::to(State::Failure).fail(SessionError::UnsupportedMessage(other)),
    }
}

/// Discard a message whose contents are not modeled once it is complete.
fn skip(framed: WireResult<usize>) -> Step {
    match framed {
        Ok(len) => Step::hold(State::Connected).consume(len),
        Err(_) => Step::hold(State::Connected),
    }
}

fn apply_update(session: &mut Session, inbound: &[u8]) -> Step {
    let bytes_per_pixel = session.display.as_ref().map_or(0, |d| d.bytes_per_pixel);

    match FramebufferUpdate::decode(inbound, bytes_per_pixel) {
        Ok((update, len)) => {
            if session.keep_framebuffer() {
                if let Some(display) = &session.display {
                    for rectangle in &update.rectangles {
                        session.framebuffer.apply_raw(
                            display.width,
                            display.height,
                            display.bytes_per_pixel,
                            rectangle.rect,
                            rectangle.pixels,
                        );
                    }
                }
            }
            Step::hold(State::Connected).consume(len)
        }
        Err(UpdateError::Incomplete(_)) => Step::hold(State::Connected),
        Err(UpdateError::UnsupportedEncoding(encoding)) => {
            Step::to(State::Failure).fail(SessionError::UnsupportedEncoding(encoding))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FixedKeySource;
    use crate::handshake::ProtocolVersion;
    use crate::io::WireWriter;
    use crate::messages::client::write_rectangle_header;
    use crate::session::DisplayInfo;
    use crate::messages::types::PixelFormat;
    use num_bigint::BigUint;
    use pretty_assertions::assert_eq;
    use rfb_common::Rect;

    fn session_at(major: u16, minor: u16) -> Session {
        let mut session = Session::new();
        session.version = Some(ProtocolVersion::new(major, minor));
        session
    }

    fn connected_session(width: u16, height: u16, bpp: u8) -> Session {
        let mut session = session_at(3, 8);
        session.display = Some(DisplayInfo {
            width,
            height,
            bytes_per_pixel: bpp,
            pixel_format: PixelFormat {
                bits_per_pixel: bpp * 8,
                ..PixelFormat::default()
            },
            name: "test".to_string(),
        });
        session
    }

    fn update(rects: &[(Rect, i32, &[u8])]) -> Vec<u8> {
        let mut out = WireWriter::new();
        out.write_u8(MSG_FRAMEBUFFER_UPDATE);
        out.write_u8(0);
        out.write_u16(rects.len() as u16);
        for (rect, encoding, pixels) in rects {
            write_rectangle_header(&mut out, *rect, *encoding);
            out.write_bytes(pixels);
        }
        out.as_slice().to_vec()
    }

    #[test]
    fn test_version_3_8_echoed() {
        let mut session = Session::new();
        let step = step(State::AwaitingVersion, &mut session, b"RFB 003.008\n");

        assert_eq!(step.next, State::AwaitingSecurityList);
        assert_eq!(step.consumed, 12);
        assert_eq!(step.output, b"RFB 003.008\n".to_vec());
        assert_eq!(step.error, None);
        assert_eq!(session.protocol_version(), Some(ProtocolVersion::new(3, 8)));
    }

    #[test]
    fn test_version_3_3_uses_security_code() {
        let mut session = Session::new();
        let step = step(State::AwaitingVersion, &mut session, b"RFB 003.003\nextra");
        assert_eq!(step.next, State::AwaitingSecurityCode);
        assert_eq!(step.consumed, 12);
    }

    #[test]
    fn test_version_partial_holds() {
        let mut session = Session::new();
        let step = step(State::AwaitingVersion, &mut session, b"RFB 003.0");
        assert_eq!(step, Step::hold(State::AwaitingVersion));
    }

    #[test]
    fn test_version_bad_magic() {
        let mut session = Session::new();
        let step = step(State::AwaitingVersion, &mut session, b"HTTP/1.1 400");
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 0);
        assert!(step.output.is_empty());
        assert!(matches!(step.error, Some(SessionError::BadBanner(_))));
    }

    #[test]
    fn test_security_list_prefers_ard() {
        let mut session = session_at(3, 8);
        let step = step(State::AwaitingSecurityList, &mut session, &[2, 2, 30]);

        assert_eq!(step.next, State::Authenticate);
        assert_eq!(step.consumed, 3);
        assert_eq!(step.output, vec![30]);
        assert_eq!(
            session.security_type(),
            Some(SecurityType::AppleRemoteDesktop)
        );
    }

    #[test]
    fn test_security_list_first_accepted() {
        let mut session = session_at(3, 8);
        let step = step(State::AwaitingSecurityList, &mut session, &[2, 1, 2]);
        assert_eq!(step.output, vec![1]);
        assert_eq!(session.security_type(), Some(SecurityType::None));
    }

    #[test]
    fn test_security_list_partial_holds() {
        let mut session = session_at(3, 8);
        let step = step(State::AwaitingSecurityList, &mut session, &[2, 2]);
        assert_eq!(step, Step::hold(State::AwaitingSecurityList));
        assert_eq!(session.security_type(), None);
    }

    #[test]
    fn test_security_list_empty_is_refusal() {
        let mut session = session_at(3, 8);
        let step = step(State::AwaitingSecurityList, &mut session, &[0, 0, 0, 0, 2]);
        assert_eq!(step.next, State::AwaitingFailureReason);
        assert_eq!(step.consumed, 1);
        assert_eq!(step.error, Some(SessionError::ServerRefused));
    }

    #[test]
    fn test_security_list_nothing_acceptable() {
        let mut session = session_at(3, 8);
        let step = step(State::AwaitingSecurityList, &mut session, &[2, 5, 6]);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 3);
        assert!(step.output.is_empty());
        assert_eq!(
            step.error,
            Some(SessionError::NoAcceptableSecurity(vec![5, 6]))
        );
    }

    #[test]
    fn test_security_code() {
        let mut session = session_at(3, 3);
        let step = step(State::AwaitingSecurityCode, &mut session, &[0, 0, 0, 2]);
        assert_eq!(step.next, State::Authenticate);
        assert_eq!(step.consumed, 4);
        assert!(step.output.is_empty());
        assert_eq!(session.security_type(), Some(SecurityType::VncAuth));
    }

    #[test]
    fn test_security_code_refused() {
        let mut session = session_at(3, 3);
        let step = step(State::AwaitingSecurityCode, &mut session, &[0, 0, 0, 0]);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.error, Some(SessionError::ServerRefused));
    }

    #[test]
    fn test_authenticate_none_by_version() {
        let mut session = session_at(3, 8);
        session.security_type = Some(SecurityType::None);
        assert_eq!(
            step(State::Authenticate, &mut session, &[]).next,
            State::AwaitingSecurityResult
        );

        let mut session = session_at(3, 7);
        session.security_type = Some(SecurityType::None);
        assert_eq!(
            step(State::Authenticate, &mut session, &[]).next,
            State::Initialize
        );
    }

    #[test]
    fn test_authenticate_dispatch() {
        let mut session = session_at(3, 8);
        session.security_type = Some(SecurityType::VncAuth);
        assert_eq!(
            step(State::Authenticate, &mut session, &[]).next,
            State::AwaitingChallenge
        );

        session.security_type = Some(SecurityType::AppleRemoteDesktop);
        assert_eq!(
            step(State::Authenticate, &mut session, &[]).next,
            State::AwaitingDhParams
        );
    }

    #[test]
    fn test_authenticate_tight_unsupported() {
        let mut session = session_at(3, 8);
        session.security_type = Some(SecurityType::Tight);
        let step = step(State::Authenticate, &mut session, &[]);
        assert_eq!(step.next, State::Failure);
        assert_eq!(
            step.error,
            Some(SessionError::UnsupportedSecurity(SecurityType::Tight))
        );
    }

    #[test]
    fn test_challenge_requires_password() {
        let mut session = session_at(3, 8);
        let challenge = [0x5Au8; 16];
        let held = step(State::AwaitingChallenge, &mut session, &challenge);
        assert_eq!(held.next, State::AwaitingChallenge);
        assert_eq!(held.consumed, 0);
        assert_eq!(held.error, Some(SessionError::PasswordRequired));

        session.set_password("secret");
        let answered = step(State::AwaitingChallenge, &mut session, &challenge);
        assert_eq!(answered.next, State::AwaitingSecurityResult);
        assert_eq!(answered.consumed, 16);
        assert_eq!(
            answered.output,
            vnc::challenge_response(b"secret", &challenge).to_vec()
        );
        assert_eq!(answered.error, None);
    }

    #[test]
    fn test_challenge_partial_holds() {
        let mut session = session_at(3, 8);
        session.set_password("secret");
        let step = step(State::AwaitingChallenge, &mut session, &[0; 15]);
        assert_eq!(step, Step::hold(State::AwaitingChallenge));
    }

    #[test]
    fn test_dh_requires_credentials() {
        let mut session = session_at(3, 8);
        session.set_password("only-password");
        let step = step(State::AwaitingDhParams, &mut session, &[]);
        assert_eq!(step.next, State::AwaitingDhParams);
        assert_eq!(step.error, Some(SessionError::CredentialsRequired));
    }

    #[test]
    fn test_dh_exchange() {
        let mut session = session_at(3, 8);
        session.set_credentials("admin", "pw");
        session.set_key_source(Box::new(FixedKeySource(BigUint::from(6u8))));

        // g = 5, k = 2, p = 23, y = 19
        let params = [0x00, 0x05, 0x00, 0x02, 0x00, 0x17, 0x00, 0x13];
        let partial = step(State::AwaitingDhParams, &mut session, &params[..7]);
        assert_eq!(partial, Step::hold(State::AwaitingDhParams));

        let step = step(State::AwaitingDhParams, &mut session, &params);
        assert_eq!(step.next, State::AwaitingSecurityResult);
        assert_eq!(step.consumed, 8);
        assert_eq!(step.output.len(), 129);
        assert_eq!(step.output[128], 8);
    }

    #[test]
    fn test_dh_agreement_failure() {
        let mut session = session_at(3, 8);
        session.set_credentials("admin", "pw");
        // Peer public value 1 is degenerate.
        let params = [0x00, 0x05, 0x00, 0x01, 0x17, 0x01];
        let step = step(State::AwaitingDhParams, &mut session, &params);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 6);
        assert!(step.output.is_empty());
        assert_eq!(step.error.map(|e| e.code()), Some(crate::ErrorCode::LoginFailed));
    }

    #[test]
    fn test_security_result() {
        let ok = step(State::AwaitingSecurityResult, &mut session_at(3, 8), &[0, 0, 0, 0]);
        assert_eq!(ok.next, State::Initialize);
        assert_eq!(ok.consumed, 4);

        let failed = step(State::AwaitingSecurityResult, &mut session_at(3, 8), &[0, 0, 0, 1]);
        assert_eq!(failed.next, State::AwaitingFailureReason);
        assert_eq!(failed.error, Some(SessionError::LoginFailed));

        let too_many = step(State::AwaitingSecurityResult, &mut session_at(3, 8), &[0, 0, 0, 2]);
        assert_eq!(too_many.next, State::AwaitingFailureReason);
        assert_eq!(too_many.consumed, 4);
        assert_eq!(too_many.error, Some(SessionError::TooManyAttempts));
    }

    #[test]
    fn test_failure_reason_3_8() {
        let mut session = session_at(3, 8);
        let partial = step(State::AwaitingFailureReason, &mut session, &[0, 0, 0, 5, b'n']);
        assert_eq!(partial, Step::hold(State::AwaitingFailureReason));

        let step = step(
            State::AwaitingFailureReason,
            &mut session,
            &[0, 0, 0, 5, b'n', b'o', b'p', b'e', b'!'],
        );
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 9);
        assert_eq!(session.failure_reason(), Some("nope!"));
    }

    #[test]
    fn test_failure_reason_skipped_before_3_8() {
        let mut session = session_at(3, 7);
        let step = step(State::AwaitingFailureReason, &mut session, &[0, 0, 0, 5]);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 0);
    }

    #[test]
    fn test_initialize_sends_shared_flag() {
        let mut session = session_at(3, 8);
        assert_eq!(step(State::Initialize, &mut session, &[]).output, vec![1]);

        session.set_shared(false);
        let step = step(State::Initialize, &mut session, &[]);
        assert_eq!(step.output, vec![0]);
        assert_eq!(step.next, State::AwaitingServerInit);
    }

    #[test]
    fn test_server_init() {
        let mut data = vec![0x01, 0x00, 0x00, 0xC0];
        data.extend_from_slice(&[32, 24, 0, 1, 0, 255, 0, 255, 0, 255, 16, 8, 0, 0, 0, 0]);
        data.extend_from_slice(&[0, 0, 0, 3]);
        data.extend_from_slice(b"Mac");

        let mut session = session_at(3, 8);
        let partial = step(State::AwaitingServerInit, &mut session, &data[..25]);
        assert_eq!(partial, Step::hold(State::AwaitingServerInit));

        let step = step(State::AwaitingServerInit, &mut session, &data);
        assert_eq!(step.next, State::Setup);
        assert_eq!(step.consumed, 27);
        let display = session.display().unwrap();
        assert_eq!((display.width, display.height), (256, 192));
        assert_eq!(display.bytes_per_pixel, 4);
        assert_eq!(display.name, "Mac");
    }

    #[test]
    fn test_setup_requests_raw() {
        let step = step(State::Setup, &mut session_at(3, 8), &[]);
        assert_eq!(step.next, State::Connected);
        assert_eq!(step.output, vec![2, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_update_applied_when_kept() {
        let mut session = connected_session(4, 2, 1);
        session.set_keep_framebuffer(true);
        let data = update(&[
            (Rect::new(0, 0, 2, 1), ENCODING_RAW, &[1, 2]),
            (Rect::new(2, 1, 2, 1), ENCODING_RAW, &[3, 4]),
        ]);

        let step = step(State::Connected, &mut session, &data);
        assert_eq!(step.next, State::Connected);
        assert_eq!(step.consumed, data.len());
        assert_eq!(session.framebuffer().version(), 2);
        assert_eq!(
            session.framebuffer().data(),
            Some(&[1, 2, 0, 0, 0, 0, 3, 4][..])
        );
    }

    #[test]
    fn test_update_discarded_when_not_kept() {
        let mut session = connected_session(4, 2, 1);
        let data = update(&[(Rect::new(0, 0, 1, 1), ENCODING_RAW, &[1])]);

        let step = step(State::Connected, &mut session, &data);
        assert_eq!(step.consumed, data.len());
        assert_eq!(session.framebuffer().version(), 0);
        assert!(session.framebuffer().data().is_none());
    }

    #[test]
    fn test_update_incomplete_consumes_nothing() {
        let mut session = connected_session(4, 2, 1);
        session.set_keep_framebuffer(true);
        let data = update(&[
            (Rect::new(0, 0, 1, 1), ENCODING_RAW, &[1]),
            (Rect::new(0, 0, 2, 1), ENCODING_RAW, &[2, 3]),
        ]);

        let step = step(State::Connected, &mut session, &data[..data.len() - 1]);
        assert_eq!(step, Step::hold(State::Connected));
        assert_eq!(session.framebuffer().version(), 0);
    }

    #[test]
    fn test_update_unsupported_encoding() {
        let mut session = connected_session(4, 2, 1);
        session.set_keep_framebuffer(true);
        let data = update(&[
            (Rect::new(0, 0, 1, 1), ENCODING_RAW, &[1]),
            (Rect::new(0, 0, 1, 1), 5, &[]),
        ]);

        let step = step(State::Connected, &mut session, &data);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 0);
        assert_eq!(step.error, Some(SessionError::UnsupportedEncoding(5)));
        assert_eq!(session.framebuffer().version(), 0);
    }

    #[test]
    fn test_bell_is_one_byte() {
        let mut session = connected_session(4, 2, 1);
        let step = step(State::Connected, &mut session, &[MSG_BELL, MSG_BELL]);
        assert_eq!(step.next, State::Connected);
        assert_eq!(step.consumed, 1);
    }

    #[test]
    fn test_color_map_and_cut_text_skipped() {
        let mut session = connected_session(4, 2, 1);

        let mut color_map = vec![MSG_SET_COLOR_MAP_ENTRIES, 0, 0, 0, 0, 1];
        color_map.extend_from_slice(&[0xFF; 6]);
        assert_eq!(
            step(State::Connected, &mut session, &color_map[..11]),
            Step::hold(State::Connected)
        );
        assert_eq!(step(State::Connected, &mut session, &color_map).consumed, 12);

        let cut_text = [MSG_SERVER_CUT_TEXT, 0, 0, 0, 0, 0, 0, 2, b'h', b'i'];
        assert_eq!(
            step(State::Connected, &mut session, &cut_text[..9]),
            Step::hold(State::Connected)
        );
        assert_eq!(step(State::Connected, &mut session, &cut_text).consumed, 10);
    }

    #[test]
    fn test_unknown_message() {
        let mut session = connected_session(4, 2, 1);
        let step = step(State::Connected, &mut session, &[0x7F, 0, 0]);
        assert_eq!(step.next, State::Failure);
        assert_eq!(step.consumed, 0);
        assert_eq!(step.error, Some(SessionError::UnsupportedMessage(0x7F)));
    }

    #[test]
    fn test_failure_is_inert() {
        let mut session = connected_session(4, 2, 1);
        let step = step(State::Failure, &mut session, &[0, 0, 0, 0]);
        assert_eq!(step, Step::hold(State::Failure));
        assert!(State::Failure.is_terminal());
    }
}

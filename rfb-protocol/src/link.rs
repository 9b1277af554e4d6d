//! The capability the state machine needs from a transport.
//!
//! [`Link`] exposes exactly what a protocol step uses: a read-only view of the
//! inbound accumulator, a way to discard consumed bytes, an outbound queue and
//! a sticky error slot. The TCP transport implements it; tests substitute an
//! in-memory buffer.

use crate::errors::ErrorCode;
use crate::machine::{self, State, Step};
use crate::session::Session;
use tracing::{debug, warn};

/// Byte queues and error slot backing a protocol session.
pub trait Link {
    /// Append bytes to the outbound queue.
    fn enqueue(&mut self, bytes: &[u8]);

    /// Bytes received and not yet discarded.
    fn inbound(&self) -> &[u8];

    /// Drop up to `n` bytes from the front of the inbound accumulator.
    fn discard(&mut self, n: usize);

    fn error_code(&self) -> ErrorCode;

    /// Record an error. The first description is retained.
    fn set_error(&mut self, code: ErrorCode, description: &str);
}

/// Run one protocol step against `link` and apply its effects.
///
/// Output is queued, the error (if any) recorded and consumed bytes discarded,
/// in that order. The applied [`Step`] is returned so callers can trace it.
pub fn drive<L: Link + ?Sized>(link: &mut L, state: State, session: &mut Session) -> Step {
    let step = machine::step(state, session, link.inbound());

    if !step.output.is_empty() {
        link.enqueue(&step.output);
    }
    if let Some(error) = &step.error {
        if link.error_code() != error.code() {
            warn!(state = ?state, code = error.code().code(), "{}", error);
        }
        link.set_error(error.code(), &error.to_string());
    }
    if step.consumed > 0 {
        link.discard(step.consumed);
    }
    if step.next != state {
        debug!(from = ?state, to = ?step.next, consumed = step.consumed, sent = step.output.len(), "protocol state transition");
    }

    step
}

/// In-memory [`Link`] used by unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct BufferLink {
    pub inbound: Vec<u8>,
    pub outbound: Vec<u8>,
    pub code: ErrorCode,
    pub description: String,
}

#[cfg(test)]
impl Link for BufferLink {
    fn enqueue(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    fn inbound(&self) -> &[u8] {
        &self.inbound
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.inbound.len());
        self.inbound.drain(..n);
    }

    fn error_code(&self) -> ErrorCode {
        self.code
    }

    fn set_error(&mut self, code: ErrorCode, description: &str) {
        if self.description.is_empty() {
            self.description = description.to_string();
        }
        self.code = code;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_drive_applies_step() {
        let mut link = BufferLink {
            inbound: b"RFB 003.008\n\x01\x01".to_vec(),
            ..BufferLink::default()
        };
        let mut session = Session::new();

        let state = drive(&mut link, State::AwaitingVersion, &mut session).next;
        assert_eq!(state, State::AwaitingSecurityList);
        assert_eq!(link.outbound, b"RFB 003.008\n".to_vec());
        assert_eq!(link.inbound, vec![1, 1]);

        let state = drive(&mut link, state, &mut session).next;
        assert_eq!(state, State::Authenticate);
        assert_eq!(link.outbound.last(), Some(&1));
        assert!(link.inbound.is_empty());
    }

    #[test]
    fn test_drive_records_error_without_consuming() {
        let mut link = BufferLink {
            inbound: vec![0xAA; 16],
            ..BufferLink::default()
        };
        let mut session = Session::new();

        let step = drive(&mut link, State::AwaitingChallenge, &mut session);
        assert_eq!(step.next, State::AwaitingChallenge);
        assert_eq!(link.code, ErrorCode::PasswordRequired);
        assert_eq!(link.description, "Your password is needed");
        assert_eq!(link.inbound.len(), 16);
        assert!(link.outbound.is_empty());
    }

    #[test]
    fn test_drive_first_description_wins() {
        let mut link = BufferLink {
            inbound: vec![0; 16],
            ..BufferLink::default()
        };
        let mut session = Session::new();

        drive(&mut link, State::AwaitingChallenge, &mut session);
        drive(&mut link, State::AwaitingDhParams, &mut session);
        assert_eq!(link.code, ErrorCode::CredentialsRequired);
        assert_eq!(link.description, "Your password is needed");
    }
}

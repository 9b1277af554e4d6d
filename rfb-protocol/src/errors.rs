//! Protocol and authentication errors.
//!
//! Every failure the state machine can report is a [`SessionError`]. Callers
//! that only care about the category (and older integrations that log numeric
//! codes) use [`ErrorCode`], which is stable.

use crate::messages::types::SecurityType;
use thiserror::Error;

/// Numeric error category reported through a session's sticky error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    #[default]
    None,
    /// Resolution, connect, poll, send, receive or timeout failure.
    Transport,
    Protocol,
    PasswordRequired,
    LoginFailed,
    Unsupported,
    CredentialsRequired,
}

impl ErrorCode {
    /// Stable numeric value.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::Transport => 1,
            ErrorCode::Protocol => 1001,
            ErrorCode::PasswordRequired => 1002,
            ErrorCode::LoginFailed => 1003,
            ErrorCode::Unsupported => 1004,
            ErrorCode::CredentialsRequired => 1005,
        }
    }

    #[must_use]
    pub fn is_transport(self) -> bool {
        self == ErrorCode::Transport
    }

    /// True for the two codes that clear once credentials are supplied.
    #[must_use]
    pub fn is_credential_request(self) -> bool {
        matches!(
            self,
            ErrorCode::PasswordRequired | ErrorCode::CredentialsRequired
        )
    }
}

/// Errors raised while decoding server messages or authenticating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The 12-byte banner did not start with `RFB `.
    #[error("Unknown remote control protocol: {0:?}")]
    BadBanner(String),

    #[error("Server refused remote control connection")]
    ServerRefused,

    #[error("Server does not support requested authentication mode (offered {0:?})")]
    NoAcceptableSecurity(Vec<u8>),

    #[error("Authentication type {0} is not supported")]
    UnsupportedSecurity(SecurityType),

    #[error("Your password is needed")]
    PasswordRequired,

    #[error("Your username and password are needed")]
    CredentialsRequired,

    #[error("Unable to login to server")]
    LoginFailed,

    #[error("Too many attempts to login to server")]
    TooManyAttempts,

    /// Diffie-Hellman parameters the client refuses to compute with.
    #[error("Key agreement failed: {0}")]
    KeyAgreement(&'static str),

    #[error("Server sent unsupported message type {0}")]
    UnsupportedMessage(u8),

    #[error("Server sent unsupported encoding {0}")]
    UnsupportedEncoding(i32),
}

impl SessionError {
    /// Category reported through the error slot.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::BadBanner(_)
            | SessionError::ServerRefused
            | SessionError::NoAcceptableSecurity(_) => ErrorCode::Protocol,
            SessionError::UnsupportedSecurity(_)
            | SessionError::UnsupportedMessage(_)
            | SessionError::UnsupportedEncoding(_) => ErrorCode::Unsupported,
            SessionError::PasswordRequired => ErrorCode::PasswordRequired,
            SessionError::CredentialsRequired => ErrorCode::CredentialsRequired,
            SessionError::LoginFailed
            | SessionError::TooManyAttempts
            | SessionError::KeyAgreement(_) => ErrorCode::LoginFailed,
        }
    }
}

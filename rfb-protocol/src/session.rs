//! Per-connection protocol data.
//!
//! A [`Session`] holds everything the state machine learns or needs across
//! steps: the negotiated version and security type, the caller's credentials,
//! the display descriptor from ServerInit, and the local framebuffer.

use crate::auth::{PrivateKeySource, RandomKeySource};
use crate::framebuffer::Framebuffer;
use crate::handshake::ProtocolVersion;
use crate::messages::types::{PixelFormat, SecurityType};
use crate::messages::ServerInit;
use std::fmt;

/// Display parameters announced in ServerInit. Fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub width: u16,
    pub height: u16,
    /// Whole bytes per pixel (`bits_per_pixel / 8`).
    pub bytes_per_pixel: u8,
    pub pixel_format: PixelFormat,
    pub name: String,
}

impl From<ServerInit> for DisplayInfo {
    fn from(init: ServerInit) -> Self {
        Self {
            width: init.framebuffer_width,
            height: init.framebuffer_height,
            bytes_per_pixel: init.pixel_format.bits_per_pixel / 8,
            pixel_format: init.pixel_format,
            name: init.name,
        }
    }
}

/// Protocol-layer state shared across state machine steps.
pub struct Session {
    pub(crate) version: Option<ProtocolVersion>,
    pub(crate) security_type: Option<SecurityType>,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) display: Option<DisplayInfo>,
    pub(crate) framebuffer: Framebuffer,
    keep_framebuffer: bool,
    shared: bool,
    pub(crate) failure_reason: Option<String>,
    pub(crate) key_source: Box<dyn PrivateKeySource>,
}

impl Session {
    /// Create a session requesting shared access and discarding pixel data.
    pub fn new() -> Self {
        Self {
            version: None,
            security_type: None,
            username: String::new(),
            password: String::new(),
            display: None,
            framebuffer: Framebuffer::new(),
            keep_framebuffer: false,
            shared: true,
            failure_reason: None,
            key_source: Box::new(RandomKeySource),
        }
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.username = username.into();
        self.password = password.into();
    }

    /// Password, if one has been supplied.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        Some(self.password.as_str()).filter(|p| !p.is_empty())
    }

    /// Username, if one has been supplied.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        Some(self.username.as_str()).filter(|u| !u.is_empty())
    }

    /// Materialize received pixel data into the framebuffer.
    pub fn set_keep_framebuffer(&mut self, keep: bool) {
        self.keep_framebuffer = keep;
    }

    #[must_use]
    pub fn keep_framebuffer(&self) -> bool {
        self.keep_framebuffer
    }

    /// Shared flag sent in ClientInit.
    pub fn set_shared(&mut self, shared: bool) {
        self.shared = shared;
    }

    #[must_use]
    pub fn shared(&self) -> bool {
        self.shared
    }

    /// Replace the Diffie-Hellman private key source.
    pub fn set_key_source(&mut self, source: Box<dyn PrivateKeySource>) {
        self.key_source = source;
    }

    #[must_use]
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    #[must_use]
    pub fn security_type(&self) -> Option<SecurityType> {
        self.security_type
    }

    #[must_use]
    pub fn display(&self) -> Option<&DisplayInfo> {
        self.display.as_ref()
    }

    #[must_use]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Reason the server gave for refusing or failing authentication.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("security_type", &self.security_type)
            .field("username", &self.username)
            .field("password", &self.password().map(|_| "<redacted>"))
            .field("display", &self.display)
            .field("framebuffer_version", &self.framebuffer.version())
            .field("keep_framebuffer", &self.keep_framebuffer)
            .field("shared", &self.shared)
            .field("failure_reason", &self.failure_reason)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let session = Session::new();
        assert!(session.shared());
        assert!(!session.keep_framebuffer());
        assert_eq!(session.password(), None);
        assert_eq!(session.username(), None);
        assert!(session.display().is_none());
        assert_eq!(session.framebuffer().version(), 0);
    }

    #[test]
    fn test_empty_credentials_are_absent() {
        let mut session = Session::new();
        session.set_credentials("", "pw");
        assert_eq!(session.username(), None);
        assert_eq!(session.password(), Some("pw"));

        session.set_password("");
        assert_eq!(session.password(), None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut session = Session::new();
        session.set_credentials("alice", "hunter2");
        let debug = format!("{:?}", session);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_display_from_server_init() {
        let display = DisplayInfo::from(ServerInit {
            framebuffer_width: 800,
            framebuffer_height: 600,
            pixel_format: PixelFormat {
                bits_per_pixel: 16,
                ..PixelFormat::default()
            },
            name: "desk".to_string(),
        });
        assert_eq!(display.bytes_per_pixel, 2);
        assert_eq!(display.name, "desk");
    }
}

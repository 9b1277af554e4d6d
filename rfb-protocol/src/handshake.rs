//! RFB protocol version and security negotiation rules.
//!
//! The handshake itself is driven by [`crate::machine`]; this module holds the
//! pieces of it that are plain functions of the bytes the server sent:
//!
//! 1. **Protocol Version** - The server's 12-byte banner `"RFB xxx.yyy\n"` is
//!    validated and echoed back unchanged, so the client speaks whatever
//!    version the server announced.
//! 2. **Security Selection** - For 3.7 and later the server offers a list of
//!    security types and the client picks one (see [`select_security_type`]).
//!    For 3.3 the server dictates a single four-byte type.
//!
//! Version-dependent behavior:
//!
//! | Version | Security negotiation | `None` sends SecurityResult | Failure reason |
//! |---------|----------------------|-----------------------------|----------------|
//! | 3.3-3.6 | server dictates      | no                          | no             |
//! | 3.7     | client selects       | no                          | no             |
//! | 3.8+    | client selects       | yes                         | yes            |
//!
//! # References
//!
//! - [RFB Protocol 3.8 Specification](https://github.com/rfbproto/rfbproto/blob/master/rfbproto.rst)

use crate::errors::SessionError;
use crate::messages::types::{
    SecurityType, SECURITY_TYPE_ARD, SECURITY_TYPE_NONE, SECURITY_TYPE_TIGHT,
    SECURITY_TYPE_VNC_AUTH,
};
use std::fmt;

/// Length of the protocol version banner.
pub const BANNER_LEN: usize = 12;

const BANNER_MAGIC: &[u8; 4] = b"RFB ";

/// Protocol version announced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// 3.7 and later offer a list of security types instead of dictating one.
    pub fn uses_security_list(&self) -> bool {
        *self >= ProtocolVersion::new(3, 7)
    }

    /// 3.8 and later send a SecurityResult even when no authentication ran.
    pub fn none_sends_security_result(&self) -> bool {
        *self >= ProtocolVersion::new(3, 8)
    }

    /// 3.8 and later follow a failed SecurityResult with a reason string.
    pub fn sends_failure_reason(&self) -> bool {
        *self >= ProtocolVersion::new(3, 8)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Parse a 12-byte `"RFB xxx.yyy\n"` banner.
///
/// Only the `"RFB "` magic is mandatory. Each 3-digit field contributes one
/// digit: the first of its leading two that is not `'0'`, otherwise the
/// last. `"003.889"` is 3.8 and `"003.010"` is 3.1. A non-digit counts as 0.
///
/// # Examples
///
/// ```
/// use rfb_protocol::handshake::{parse_banner, ProtocolVersion};
///
/// let version = parse_banner(b"RFB 003.008\n").unwrap();
/// assert_eq!(version, ProtocolVersion::new(3, 8));
/// assert!(parse_banner(b"HTTP/1.1 200").is_err());
/// ```
pub fn parse_banner(banner: &[u8; BANNER_LEN]) -> Result<ProtocolVersion, SessionError> {
    if &banner[..4] != BANNER_MAGIC {
        return Err(SessionError::BadBanner(
            String::from_utf8_lossy(banner).into_owned(),
        ));
    }

    Ok(ProtocolVersion::new(
        version_digit(&banner[4..7]),
        version_digit(&banner[8..11]),
    ))
}

fn version_digit(field: &[u8]) -> u16 {
    let Some((last, leading)) = field.split_last() else {
        return 0;
    };
    let digit = leading.iter().find(|&&b| b != b'0').unwrap_or(last);
    if digit.is_ascii_digit() {
        u16::from(digit - b'0')
    } else {
        0
    }
}

/// Choose a security type from a server's offer list.
///
/// Apple Remote Desktop is preferred whenever offered. Otherwise the first of
/// None, VNC authentication or Tight in the server's order wins.
pub fn select_security_type(offered: &[u8]) -> Option<SecurityType> {
    if offered.iter().any(|&t| u32::from(t) == SECURITY_TYPE_ARD) {
        return Some(SecurityType::AppleRemoteDesktop);
    }

    offered
        .iter()
        .map(|&t| u32::from(t))
        .find(|&t| {
            t == SECURITY_TYPE_NONE || t == SECURITY_TYPE_VNC_AUTH || t == SECURITY_TYPE_TIGHT
        })
        .map(SecurityType::from)
}

//! Core RFB protocol types.
//!
//! This module defines fundamental types used throughout the RFB protocol:
//! - [`PixelFormat`] - Describes pixel format (bit depths, color channels, endianness)
//! - [`RectangleHeader`] - Rectangle header with encoding type
//! - [`SecurityType`] - Authentication schemes a server may offer
//! - Message tags and encoding constants

use crate::io::{WireReader, WireResult, WireWriter};
use rfb_common::Rect;
use std::fmt;

/// RFB pixel format specification.
///
/// # Wire Format
///
/// PixelFormat is 16 bytes on the wire:
/// - 1 byte: bits_per_pixel
/// - 1 byte: depth
/// - 1 byte: big_endian
/// - 1 byte: true_color
/// - 2 bytes: red_max
/// - 2 bytes: green_max
/// - 2 bytes: blue_max
/// - 1 byte: red_shift
/// - 1 byte: green_shift
/// - 1 byte: blue_shift
/// - 3 bytes: padding
///
/// The client never negotiates a different format, so the server's native
/// format is recorded as-is and pixel data is stored verbatim.
///
/// # Examples
///
/// ```
/// use rfb_protocol::messages::types::PixelFormat;
///
/// let pf = PixelFormat {
///     bits_per_pixel: 32,
///     depth: 24,
///     big_endian: 0,
///     true_color: 1,
///     red_max: 255,
///     green_max: 255,
///     blue_max: 255,
///     red_shift: 16,
///     green_shift: 8,
///     blue_shift: 0,
/// };
///
/// assert_eq!(pf.bytes_per_pixel(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: u8,
    pub true_color: u8,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Encoded size on the wire.
    pub const WIRE_LEN: usize = 16;

    /// Bytes per pixel, rounding partial bytes up.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// Decode a PixelFormat. Padding is skipped without inspection.
    pub fn read_from(reader: &mut WireReader<'_>) -> WireResult<Self> {
        reader.require(Self::WIRE_LEN)?;
        let pf = Self {
            bits_per_pixel: reader.read_u8()?,
            depth: reader.read_u8()?,
            big_endian: reader.read_u8()?,
            true_color: reader.read_u8()?,
            red_max: reader.read_u16()?,
            green_max: reader.read_u16()?,
            blue_max: reader.read_u16()?,
            red_shift: reader.read_u8()?,
            green_shift: reader.read_u8()?,
            blue_shift: reader.read_u8()?,
        };
        reader.skip(3)?;
        Ok(pf)
    }
}

/// Rectangle header for framebuffer updates.
///
/// # Wire Format
///
/// Rectangle header is 12 bytes:
/// - 2 bytes: x position
/// - 2 bytes: y position
/// - 2 bytes: width
/// - 2 bytes: height
/// - 4 bytes: encoding type (signed i32)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectangleHeader {
    pub rect: Rect,
    pub encoding: i32,
}

impl RectangleHeader {
    pub const WIRE_LEN: usize = 12;

    pub fn read_from(reader: &mut WireReader<'_>) -> WireResult<Self> {
        reader.require(Self::WIRE_LEN)?;
        let rect = Rect::new(
            reader.read_u16()?,
            reader.read_u16()?,
            reader.read_u16()?,
            reader.read_u16()?,
        );
        Ok(Self {
            rect,
            encoding: reader.read_i32()?,
        })
    }

    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u16(self.rect.x);
        writer.write_u16(self.rect.y);
        writer.write_u16(self.rect.width);
        writer.write_u16(self.rect.height);
        writer.write_i32(self.encoding);
    }
}

/// Authentication scheme identifiers.
///
/// Versions 3.7 and later advertise a list of one-byte codes; version 3.3
/// dictates a single four-byte code, so the enum is built from `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityType {
    /// Connection refused; a reason string follows.
    Invalid,
    None,
    VncAuth,
    Tight,
    AppleRemoteDesktop,
    Other(u32),
}

impl SecurityType {
    pub fn code(self) -> u32 {
        match self {
            SecurityType::Invalid => SECURITY_TYPE_INVALID,
            SecurityType::None => SECURITY_TYPE_NONE,
            SecurityType::VncAuth => SECURITY_TYPE_VNC_AUTH,
            SecurityType::Tight => SECURITY_TYPE_TIGHT,
            SecurityType::AppleRemoteDesktop => SECURITY_TYPE_ARD,
            SecurityType::Other(code) => code,
        }
    }
}

impl From<u32> for SecurityType {
    fn from(code: u32) -> Self {
        match code {
            SECURITY_TYPE_INVALID => SecurityType::Invalid,
            SECURITY_TYPE_NONE => SecurityType::None,
            SECURITY_TYPE_VNC_AUTH => SecurityType::VncAuth,
            SECURITY_TYPE_TIGHT => SecurityType::Tight,
            SECURITY_TYPE_ARD => SecurityType::AppleRemoteDesktop,
            other => SecurityType::Other(other),
        }
    }
}

impl From<u8> for SecurityType {
    fn from(code: u8) -> Self {
        SecurityType::from(u32::from(code))
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityType::Invalid => f.write_str("invalid"),
            SecurityType::None => f.write_str("none"),
            SecurityType::VncAuth => f.write_str("VNC"),
            SecurityType::Tight => f.write_str("Tight"),
            SecurityType::AppleRemoteDesktop => f.write_str("Apple Remote Desktop"),
            SecurityType::Other(code) => write!(f, "unknown ({code})"),
        }
    }
}

//
// Security type codes
//

pub const SECURITY_TYPE_INVALID: u32 = 0;
pub const SECURITY_TYPE_NONE: u32 = 1;
pub const SECURITY_TYPE_VNC_AUTH: u32 = 2;
pub const SECURITY_TYPE_TIGHT: u32 = 16;
/// Diffie-Hellman based scheme used by macOS screen sharing.
pub const SECURITY_TYPE_ARD: u32 = 30;

//
// Security result codes
//

pub const SECURITY_RESULT_OK: u32 = 0;
pub const SECURITY_RESULT_TOO_MANY_ATTEMPTS: u32 = 2;

//
// Encoding type constants
//

/// Raw encoding - uncompressed pixel data. The only encoding this client requests.
pub const ENCODING_RAW: i32 = 0;

//
// Message tags
//

pub const MSG_FRAMEBUFFER_UPDATE: u8 = 0;
pub const MSG_SET_COLOR_MAP_ENTRIES: u8 = 1;
pub const MSG_BELL: u8 = 2;
pub const MSG_SERVER_CUT_TEXT: u8 = 3;

pub const MSG_SET_ENCODINGS: u8 = 2;
pub const MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;
pub const MSG_KEY_EVENT: u8 = 4;
pub const MSG_POINTER_EVENT: u8 = 5;
pub const MSG_CLIENT_CUT_TEXT: u8 = 6;

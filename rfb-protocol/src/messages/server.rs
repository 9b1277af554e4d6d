//! Server-to-client RFB messages.
//!
//! Decoders here operate on the transport's inbound accumulator as it stands.
//! Each returns the decoded message together with the number of bytes it
//! occupies, or [`Incomplete`] when the buffer does not yet hold the whole
//! message. Nothing is consumed by decoding; the caller discards exactly the
//! reported length once it has acted on the message.

use super::types::{PixelFormat, RectangleHeader, ENCODING_RAW};
use crate::io::{Incomplete, WireReader, WireResult};
use rfb_common::Rect;

/// ServerInit message - initial server parameters.
///
/// # Wire Format
///
/// - 2 bytes: framebuffer width
/// - 2 bytes: framebuffer height
/// - 16 bytes: PixelFormat
/// - 4 bytes: name length
/// - N bytes: name string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInit {
    pub framebuffer_width: u16,
    pub framebuffer_height: u16,
    pub pixel_format: PixelFormat,
    pub name: String,
}

impl ServerInit {
    /// Fixed-size prefix preceding the name.
    pub const HEADER_LEN: usize = 24;

    /// Decode a ServerInit, returning it and its total length.
    ///
    /// Names are decoded leniently; invalid UTF-8 sequences become U+FFFD.
    pub fn decode(buf: &[u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(buf);
        reader.require(Self::HEADER_LEN)?;
        let framebuffer_width = reader.read_u16()?;
        let framebuffer_height = reader.read_u16()?;
        let pixel_format = PixelFormat::read_from(&mut reader)?;
        let name_length = reader.read_u32()? as usize;
        let name = reader.read_bytes(name_length)?;

        Ok((
            Self {
                framebuffer_width,
                framebuffer_height,
                pixel_format,
                name: String::from_utf8_lossy(name).into_owned(),
            },
            reader.position(),
        ))
    }
}

/// One raw-encoded rectangle borrowed from the inbound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRectangle<'a> {
    pub rect: Rect,
    /// Row-major pixel bytes, `width * height * bytes_per_pixel` long.
    pub pixels: &'a [u8],
}

/// Why a FramebufferUpdate could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    Incomplete(Incomplete),
    /// A rectangle header named an encoding other than raw.
    UnsupportedEncoding(i32),
}

impl From<Incomplete> for UpdateError {
    fn from(incomplete: Incomplete) -> Self {
        UpdateError::Incomplete(incomplete)
    }
}

/// FramebufferUpdate message - screen update with raw rectangles.
///
/// # Wire Format
///
/// - 1 byte: message type (0)
/// - 1 byte: padding
/// - 2 bytes: number of rectangles
/// - For each rectangle: 12-byte header (x, y, width, height, encoding)
///   followed by `width * height * bytes_per_pixel` pixel bytes
///
/// Decoding is all-or-nothing: the message is only returned once every
/// rectangle header and payload is buffered. Encodings are checked as soon as
/// each header is available, so an unsupported encoding is reported even if
/// its payload has not arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferUpdate<'a> {
    pub rectangles: Vec<RawRectangle<'a>>,
}

impl<'a> FramebufferUpdate<'a> {
    pub const HEADER_LEN: usize = 4;

    pub fn decode(buf: &'a [u8], bytes_per_pixel: u8) -> Result<(Self, usize), UpdateError> {
        let mut reader = WireReader::new(buf);
        reader.require(Self::HEADER_LEN)?;
        let _tag = reader.read_u8()?;
        reader.skip(1)?; // padding
        let count = reader.read_u16()? as usize;

        let mut rectangles = Vec::with_capacity(count);
        for _ in 0..count {
            let header = RectangleHeader::read_from(&mut reader)?;
            if header.encoding != ENCODING_RAW {
                return Err(UpdateError::UnsupportedEncoding(header.encoding));
            }
            let len = (header.rect.area() as usize).saturating_mul(usize::from(bytes_per_pixel));
            let pixels = reader.read_bytes(len)?;
            rectangles.push(RawRectangle {
                rect: header.rect,
                pixels,
            });
        }

        Ok((Self { rectangles }, reader.position()))
    }
}

/// SetColorMapEntries message - palette update. Only its framing is decoded.
///
/// # Wire Format
///
/// - 1 byte: message type (1)
/// - 1 byte: padding
/// - 2 bytes: first color index
/// - 2 bytes: number of colors
/// - N * 6 bytes: RGB entries (u16 each)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetColorMapEntries {
    pub first_color: u16,
    pub count: u16,
}

impl SetColorMapEntries {
    pub const HEADER_LEN: usize = 6;

    pub fn decode(buf: &[u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(buf);
        reader.require(Self::HEADER_LEN)?;
        reader.skip(2)?; // type + padding
        let first_color = reader.read_u16()?;
        let count = reader.read_u16()?;
        reader.skip(usize::from(count) * 6)?;
        Ok((Self { first_color, count }, reader.position()))
    }
}

/// Bell message - audible alert. The tag byte is the whole message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bell;

impl Bell {
    pub const LEN: usize = 1;

    pub fn decode(buf: &[u8]) -> WireResult<(Self, usize)> {
        WireReader::new(buf).require(Self::LEN)?;
        Ok((Bell, Self::LEN))
    }
}

/// ServerCutText message - clipboard data from the server.
///
/// # Wire Format
///
/// - 1 byte: message type (3)
/// - 3 bytes: padding
/// - 4 bytes: text length
/// - N bytes: Latin-1 text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCutText<'a> {
    pub text: &'a [u8],
}

impl<'a> ServerCutText<'a> {
    pub const HEADER_LEN: usize = 8;

    pub fn decode(buf: &'a [u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(buf);
        reader.require(Self::HEADER_LEN)?;
        reader.skip(4)?; // type + padding
        let length = reader.read_u32()? as usize;
        let text = reader.read_bytes(length)?;
        Ok((Self { text }, reader.position()))
    }
}

/// Length-prefixed reason string sent with refusals and security failures.
///
/// # Wire Format
///
/// - 4 bytes: reason length
/// - N bytes: reason text
pub fn decode_reason(buf: &[u8]) -> WireResult<(String, usize)> {
    let mut reader = WireReader::new(buf);
    let length = reader.read_u32()? as usize;
    let text = reader.read_bytes(length)?;
    Ok((String::from_utf8_lossy(text).into_owned(), reader.position()))
}

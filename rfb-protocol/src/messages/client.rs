//! Client-to-server RFB messages.
//!
//! Every message encodes itself into a [`WireWriter`]; the state machine and
//! the client facade collect the bytes and hand them to the transport.

use super::types::{
    RectangleHeader, MSG_CLIENT_CUT_TEXT, MSG_FRAMEBUFFER_UPDATE_REQUEST, MSG_KEY_EVENT,
    MSG_POINTER_EVENT, MSG_SET_ENCODINGS,
};
use crate::io::WireWriter;
use rfb_common::Rect;

/// ClientInit message - client initialization.
///
/// Sent by the client after the security handshake. Indicates whether the
/// client wants a shared or exclusive connection.
///
/// # Wire Format
///
/// - 1 byte: shared flag (0 = exclusive, 1 = shared)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInit {
    pub shared: bool,
}

impl ClientInit {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u8(u8::from(self.shared));
    }
}

/// SetEncodings message - declare supported encodings.
///
/// # Wire Format
///
/// - 1 byte: message type (2)
/// - 1 byte: padding
/// - 2 bytes: number of encodings
/// - N * 4 bytes: encoding types (signed i32 each)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetEncodings {
    pub encodings: Vec<i32>,
}

impl SetEncodings {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u8(MSG_SET_ENCODINGS);
        writer.write_u8(0); // padding
        writer.write_u16(self.encodings.len() as u16);
        for encoding in &self.encodings {
            writer.write_i32(*encoding);
        }
    }
}

/// FramebufferUpdateRequest message - request screen update.
///
/// # Wire Format
///
/// - 1 byte: message type (3)
/// - 1 byte: incremental (0 = full update, 1 = incremental)
/// - 2 bytes: x position
/// - 2 bytes: y position
/// - 2 bytes: width
/// - 2 bytes: height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdateRequest {
    pub incremental: bool,
    pub rect: Rect,
}

impl FramebufferUpdateRequest {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u8(MSG_FRAMEBUFFER_UPDATE_REQUEST);
        writer.write_u8(u8::from(self.incremental));
        writer.write_u16(self.rect.x);
        writer.write_u16(self.rect.y);
        writer.write_u16(self.rect.width);
        writer.write_u16(self.rect.height);
    }
}

/// KeyEvent message - keyboard input.
///
/// # Wire Format
///
/// - 1 byte: message type (4)
/// - 1 byte: down flag (1 = pressed, 0 = released)
/// - 2 bytes: padding
/// - 4 bytes: keysym
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub down: bool,
    pub key: u32,
}

impl KeyEvent {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u8(MSG_KEY_EVENT);
        writer.write_u8(u8::from(self.down));
        writer.write_u16(0); // padding
        writer.write_u32(self.key);
    }
}

/// PointerEvent message - mouse input.
///
/// # Wire Format
///
/// - 1 byte: message type (5)
/// - 1 byte: button mask (bit 0 = left, bit 1 = middle, bit 2 = right, ...)
/// - 2 bytes: x position
/// - 2 bytes: y position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub button_mask: u8,
    pub x: u16,
    pub y: u16,
}

impl PointerEvent {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u8(MSG_POINTER_EVENT);
        writer.write_u8(self.button_mask);
        writer.write_u16(self.x);
        writer.write_u16(self.y);
    }
}

/// ClientCutText message - clipboard data.
///
/// # Wire Format
///
/// - 1 byte: message type (6)
/// - 3 bytes: padding
/// - 4 bytes: text length
/// - N bytes: Latin-1 text
///
/// Characters outside Latin-1 are sent as `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCutText {
    pub text: String,
}

impl ClientCutText {
    pub fn write_to(&self, writer: &mut WireWriter) {
        let latin1: Vec<u8> = self
            .text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();

        writer.write_u8(MSG_CLIENT_CUT_TEXT);
        writer.write_bytes(&[0, 0, 0]); // padding
        writer.write_u32(latin1.len() as u32);
        writer.write_bytes(&latin1);
    }
}

/// Encode a rectangle header; used by test servers to build updates.
pub fn write_rectangle_header(writer: &mut WireWriter, rect: Rect, encoding: i32) {
    RectangleHeader { rect, encoding }.write_to(writer);
}

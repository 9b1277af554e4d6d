//! RFB protocol message types.
//!
//! This module provides encoders and decoders for the RFB (Remote Framebuffer)
//! messages this client exchanges with a server:
//!
//! - **Core types** ([`types`]) - PixelFormat, rectangle headers, security types and constants
//! - **Server messages** ([`server`]) - Messages sent from server to client
//! - **Client messages** ([`client`]) - Messages sent from client to server
//!
//! # Wire Format Rules
//!
//! 1. **Big-endian byte order** - All multi-byte integers use network byte order
//! 2. **Whole messages only** - Server decoders report [`Incomplete`](crate::io::Incomplete)
//!    until the entire message is buffered and never consume partial input
//! 3. **Raw pixels only** - Any other rectangle encoding is rejected
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::io::WireWriter;
//! use rfb_protocol::messages::client::KeyEvent;
//!
//! let mut out = WireWriter::new();
//! KeyEvent { down: true, key: 0x61 }.write_to(&mut out);
//! assert_eq!(out.as_slice(), &[4, 1, 0, 0, 0, 0, 0, 0x61]);
//! ```

pub mod client;
mod proptest_framing;
pub mod server;
pub mod types;

pub use types::{PixelFormat, RectangleHeader, SecurityType, ENCODING_RAW};

pub use server::{
    Bell, FramebufferUpdate, RawRectangle, ServerCutText, ServerInit, SetColorMapEntries,
    UpdateError,
};

pub use client::{
    ClientCutText, ClientInit, FramebufferUpdateRequest, KeyEvent, PointerEvent, SetEncodings,
};

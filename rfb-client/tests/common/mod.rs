//! Scripted in-memory server shared by the integration tests.

#![allow(dead_code)]

use rfb_client::{Dialer, NetStream, Readiness, TransportError, VncClient};
use rfb_common::Rect;
use rfb_protocol::io::WireWriter;
use rfb_protocol::messages::client::write_rectangle_header;
use rfb_protocol::messages::types::{MSG_BELL, MSG_FRAMEBUFFER_UPDATE, SECURITY_TYPE_NONE};
use rfb_protocol::messages::ENCODING_RAW;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

/// Both directions of a fake socket.
#[derive(Debug, Default)]
pub struct Wire {
    /// Bytes the server will deliver.
    pub incoming: VecDeque<u8>,
    /// Bytes the client sent.
    pub sent: Vec<u8>,
    /// Largest number of bytes a single receive returns (0 = unlimited).
    pub max_read: usize,
    /// Never report the connect as complete.
    pub never_connects: bool,
}

pub type SharedWire = Rc<RefCell<Wire>>;

pub struct ScriptedStream(SharedWire);

impl NetStream for ScriptedStream {
    fn connect(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn poll(&mut self) -> io::Result<Readiness> {
        if self.0.borrow().never_connects {
            Ok(Readiness::empty())
        } else {
            Ok(Readiness::READ | Readiness::WRITE)
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut wire = self.0.borrow_mut();
        if wire.incoming.is_empty() {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let limit = if wire.max_read == 0 {
            buf.len()
        } else {
            wire.max_read.min(buf.len())
        };
        let n = limit.min(wire.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(wire.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

pub struct ScriptedDialer(pub SharedWire);

impl Dialer for ScriptedDialer {
    type Stream = ScriptedStream;

    fn resolve(&mut self, _host: &str, _port: u16) -> Result<ScriptedStream, TransportError> {
        Ok(ScriptedStream(Rc::clone(&self.0)))
    }
}

/// A client wired to an in-memory server.
pub fn scripted_client(wire: Wire) -> (VncClient<ScriptedDialer>, SharedWire) {
    let wire = Rc::new(RefCell::new(wire));
    let client = VncClient::with_dialer("scripted", 5900, ScriptedDialer(Rc::clone(&wire)));
    (client, wire)
}

/// Queue more server bytes.
pub fn deliver(wire: &SharedWire, bytes: &[u8]) {
    wire.borrow_mut().incoming.extend(bytes.iter().copied());
}

/// Advance until `done` holds or `limit` cycles pass. Returns whether `done` held.
pub fn pump<D: Dialer>(
    client: &mut VncClient<D>,
    limit: usize,
    mut done: impl FnMut(&VncClient<D>) -> bool,
) -> bool {
    for _ in 0..limit {
        if done(client) {
            return true;
        }
        if !client.advance(None) {
            return done(client);
        }
    }
    done(client)
}

/// Builds server-to-client byte streams.
#[derive(Default)]
pub struct ServerScript {
    out: WireWriter,
    seed: u8,
}

impl ServerScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn banner(mut self, version: &[u8; 12]) -> Self {
        self.out.write_bytes(version);
        self
    }

    pub fn security_list(mut self, types: &[u8]) -> Self {
        self.out.write_u8(types.len() as u8);
        self.out.write_bytes(types);
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.out.write_u32(value);
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.out.write_bytes(bytes);
        self
    }

    pub fn reason(mut self, text: &str) -> Self {
        self.out.write_u32(text.len() as u32);
        self.out.write_bytes(text.as_bytes());
        self
    }

    pub fn server_init(mut self, width: u16, height: u16, bits_per_pixel: u8, name: &str) -> Self {
        self.out.write_u16(width);
        self.out.write_u16(height);
        self.out
            .write_bytes(&[bits_per_pixel, 24, 0, 1, 0, 255, 0, 255, 0, 255, 16, 8, 0]);
        self.out.write_bytes(&[0, 0, 0]);
        self.out.write_u32(name.len() as u32);
        self.out.write_bytes(name.as_bytes());
        self
    }

    /// A raw update whose pixel bytes follow a deterministic sequence.
    pub fn raw_update(mut self, rects: &[Rect], bytes_per_pixel: usize) -> Self {
        self.out.write_u8(MSG_FRAMEBUFFER_UPDATE);
        self.out.write_u8(0);
        self.out.write_u16(rects.len() as u16);
        for rect in rects {
            write_rectangle_header(&mut self.out, *rect, ENCODING_RAW);
            for _ in 0..rect.area() as usize * bytes_per_pixel {
                self.seed = self.seed.wrapping_add(29);
                self.out.write_u8(self.seed);
            }
        }
        self
    }

    pub fn update_with_encoding(mut self, rect: Rect, encoding: i32) -> Self {
        self.out.write_u8(MSG_FRAMEBUFFER_UPDATE);
        self.out.write_u8(0);
        self.out.write_u16(1);
        write_rectangle_header(&mut self.out, rect, encoding);
        self
    }

    pub fn bell(mut self) -> Self {
        self.out.write_u8(MSG_BELL);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.out.as_slice().to_vec()
    }
}

/// Handshake of a 3.8 server offering only the None security type.
pub fn none_handshake(width: u16, height: u16, bits_per_pixel: u8, name: &str) -> ServerScript {
    ServerScript::new()
        .banner(b"RFB 003.008\n")
        .security_list(&[SECURITY_TYPE_NONE as u8])
        .u32(0)
        .server_init(width, height, bits_per_pixel, name)
}

/// What a client sends for a 3.8 None handshake.
pub fn none_handshake_reply() -> Vec<u8> {
    let mut expected = b"RFB 003.008\n".to_vec();
    expected.push(1); // chosen security type
    expected.push(1); // ClientInit shared
    expected.extend_from_slice(&[2, 0, 0, 1, 0, 0, 0, 0]);
    expected
}

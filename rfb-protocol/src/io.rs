//! Bounds-checked wire readers and writers for RFB protocol data.
//!
//! The client never blocks waiting for bytes: decoders inspect whatever the
//! transport has accumulated so far and either decode a whole message or
//! report how many bytes they still need. [`WireReader`] centralizes that
//! check and the network byte order conversion, so individual decoders never
//! index into a buffer directly.
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::io::{WireReader, WireWriter};
//!
//! let mut out = WireWriter::new();
//! out.write_u8(3);
//! out.write_u16(1920);
//! let bytes = out.into_bytes();
//!
//! let mut input = WireReader::new(&bytes);
//! assert_eq!(input.read_u8(), Ok(3));
//! assert_eq!(input.read_u16(), Ok(1920));
//! assert!(input.read_u32().is_err());
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Returned when a decoder needs more bytes than are currently buffered.
///
/// `needed` is the total length, counted from the start of the reader's
/// buffer, that must be present before the read can succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incomplete {
    pub needed: usize,
}

impl fmt::Display for Incomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "insufficient data: need {} bytes", self.needed)
    }
}

impl std::error::Error for Incomplete {}

/// Result of a bounds-checked read.
pub type WireResult<T> = Result<T, Incomplete>;

/// Sequential big-endian reader over a borrowed byte slice.
///
/// Reads never panic: every accessor verifies the remaining length first and
/// returns [`Incomplete`] without advancing when the data is not there yet.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Ensure at least `n` more bytes are available.
    pub fn require(&self, n: usize) -> WireResult<()> {
        let needed = self.pos.saturating_add(n);
        if needed > self.buf.len() {
            return Err(Incomplete { needed });
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        self.require(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> WireResult<u8> {
        self.take::<1>().map(|b| b[0])
    }

    /// Read a 16-bit unsigned integer in network byte order.
    pub fn read_u16(&mut self) -> WireResult<u16> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    /// Read a 32-bit unsigned integer in network byte order.
    pub fn read_u32(&mut self) -> WireResult<u32> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    /// Read a 32-bit signed integer in network byte order.
    pub fn read_i32(&mut self) -> WireResult<i32> {
        self.take::<4>().map(i32::from_be_bytes)
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> WireResult<&'a [u8]> {
        self.require(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Skip `n` bytes (padding).
    pub fn skip(&mut self, n: usize) -> WireResult<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }
}

/// Growable writer producing big-endian RFB messages.
#[derive(Debug, Default, Clone)]
pub struct WireWriter {
    buffer: BytesMut,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrow the encoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Finish writing and return the encoded bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buffer.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u8() {
        let data = [42u8, 100, 255];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u8(), Ok(42));
        assert_eq!(reader.read_u8(), Ok(100));
        assert_eq!(reader.read_u8(), Ok(255));
        assert_eq!(reader.read_u8(), Err(Incomplete { needed: 4 }));
    }

    #[test]
    fn test_read_u16() {
        let data = [0x12, 0x34, 0xAB, 0xCD];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u16(), Ok(0x1234));
        assert_eq!(reader.read_u16(), Ok(0xABCD));
    }

    #[test]
    fn test_read_u32_and_i32() {
        let data = [0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u32(), Ok(0x12345678));
        assert_eq!(reader.read_i32(), Ok(-2));
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u32(), Err(Incomplete { needed: 4 }));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16(), Ok(0x0102));
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_read_bytes_and_skip() {
        let data = [1, 2, 3, 4, 5];
        let mut reader = WireReader::new(&data);

        reader.skip(1).unwrap();
        assert_eq!(reader.read_bytes(3), Ok(&data[1..4]));
        assert_eq!(reader.read_bytes(2), Err(Incomplete { needed: 6 }));
        assert_eq!(reader.read_u8(), Ok(5));
    }

    #[test]
    fn test_require_saturates() {
        let reader = WireReader::new(&[]);
        assert_eq!(
            reader.require(usize::MAX),
            Err(Incomplete { needed: usize::MAX })
        );
    }

    #[test]
    fn test_writer_big_endian() {
        let mut out = WireWriter::with_capacity(16);
        out.write_u8(42);
        out.write_u16(0x1234);
        out.write_u32(0xDEADBEEF);
        out.write_i32(-2);
        out.write_bytes(b"ok");

        assert_eq!(out.len(), 13);
        assert_eq!(
            out.as_slice(),
            &[42, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFF, 0xFE, b'o', b'k']
        );
    }
}

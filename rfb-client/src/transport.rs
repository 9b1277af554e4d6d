//! Non-blocking byte-queue transport for VNC connections.
//!
//! A [`Connection`] owns one TCP stream and two byte queues. Each call to
//! [`Connection::advance`] performs at most one readiness probe, one send and
//! one receive, and never blocks. Bytes received are appended to the inbound
//! accumulator and stay there until the protocol layer discards a whole
//! message through the [`Link`] capability.
//!
//! The socket is produced by a [`Dialer`], so tests can substitute a scripted
//! byte source for the real network.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::transport::Connection;
//! use std::time::Duration;
//!
//! let mut conn = Connection::new("localhost", 5900);
//! while conn.advance(Some(Duration::from_secs(5))) && !conn.is_established() {}
//! ```

use crate::protocol_trace;
use bitflags::bitflags;
use bytes::{Buf, BytesMut};
use rfb_protocol::{ErrorCode, Link};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Largest slice handed to the socket in one send.
pub const SEND_CHUNK: usize = 2048;

/// Capacity of the reusable receive buffer.
pub const RECV_CHUNK: usize = 2048;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: i32 = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: i32 = 0;

bitflags! {
    /// What a readiness probe reported for the socket.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Readiness: u8 {
        /// Data (or end of stream) can be read.
        const READ = 0b001;
        /// The send buffer has room.
        const WRITE = 0b010;
        /// An error is pending on the socket.
        const ERROR = 0b100;
    }
}

/// Transport-level failures. All are fatal for the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Host name did not resolve to an IPv4 address.
    #[error("could not resolve destination")]
    Resolve,

    /// Socket creation or connect failed.
    #[error("could not initiate network connection: {0}")]
    Connect(String),

    /// Readiness probe failed or reported a socket error.
    #[error("could not check network status: {0}")]
    Poll(String),

    /// Send failed with something other than would-block.
    #[error("could not send data: {0}")]
    Send(String),

    /// Receive failed with something other than would-block.
    #[error("could not read data: {0}")]
    Receive(String),

    /// The deadline seeded by the first timed `advance` passed.
    #[error("request timed out")]
    Timeout,

    /// The connection was closed locally.
    #[error("connection closed")]
    Closed,
}

/// A non-blocking byte stream.
pub trait NetStream {
    /// Start connecting. An in-progress connect is not an error.
    fn connect(&mut self) -> io::Result<()>;

    /// Probe readiness without waiting.
    ///
    /// An empty set means the connect has not completed yet.
    fn poll(&mut self) -> io::Result<Readiness>;

    /// Send some prefix of `buf`, returning how much was accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive into `buf`. `Ok(0)` means the peer closed its side.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Produces an unconnected stream for a host and port.
pub trait Dialer {
    /// Stream type this dialer opens.
    type Stream: NetStream;

    /// Resolve `host` and create a stream ready to [`connect`](NetStream::connect).
    fn resolve(&mut self, host: &str, port: u16) -> Result<Self::Stream, TransportError>;
}

/// Resolves IPv4 addresses and opens [`TcpSocket`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpSocket;

    fn resolve(&mut self, host: &str, port: u16) -> Result<TcpSocket, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve)?
            .find(SocketAddr::is_ipv4)
            .ok_or(TransportError::Resolve)?;
        debug!(%host, %addr, "resolved destination");

        TcpSocket::open(addr).map_err(|e| TransportError::Connect(e.to_string()))
    }
}

/// Non-blocking TCP socket with `TCP_NODELAY` set.
///
/// The socket is shut down when dropped.
#[derive(Debug)]
pub struct TcpSocket {
    socket: Socket,
    addr: SockAddr,
}

impl TcpSocket {
    /// Create a non-blocking socket for `addr` without connecting it.
    pub fn open(addr: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nonblocking(true)?;
        // Small input events must go out immediately.
        socket.set_nodelay(true)?;

        Ok(Self {
            socket,
            addr: addr.into(),
        })
    }
}

impl TcpSocket {
    /// Zero-timeout `poll(2)` on the socket descriptor.
    #[cfg(unix)]
    #[allow(unsafe_code)]
    fn probe(&self) -> io::Result<Readiness> {
        let mut pfd = libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN | libc::POLLOUT,
            revents: 0,
        };
        // SAFETY: one valid pollfd, alive for the duration of the call.
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        match rc {
            0 => Ok(Readiness::empty()),
            n if n > 0 => Ok(readiness_from_revents(pfd.revents)),
            _ => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(Readiness::empty())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Without `poll(2)`, a socket with a peer is treated as ready both ways.
    #[cfg(not(unix))]
    fn probe(&self) -> io::Result<Readiness> {
        if let Some(err) = self.socket.take_error()? {
            return Err(err);
        }
        match self.socket.peer_addr() {
            Ok(_) => Ok(Readiness::READ | Readiness::WRITE),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(Readiness::empty()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn readiness_from_revents(revents: libc::c_short) -> Readiness {
    let mut readiness = Readiness::empty();
    // A hang-up reads as end of stream.
    if revents & (libc::POLLIN | libc::POLLHUP) != 0 {
        readiness |= Readiness::READ;
    }
    if revents & libc::POLLOUT != 0 {
        readiness |= Readiness::WRITE;
    }
    if revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
        readiness |= Readiness::ERROR;
    }
    readiness
}

impl NetStream for TcpSocket {
    fn connect(&mut self) -> io::Result<()> {
        match self.socket.connect(&self.addr) {
            Ok(()) => Ok(()),
            Err(e) if connect_in_progress(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn poll(&mut self) -> io::Result<Readiness> {
        let readiness = self.probe()?;
        if readiness.contains(Readiness::ERROR) {
            if let Some(err) = self.socket.take_error()? {
                return Err(err);
            }
        }
        Ok(readiness)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_with_flags(buf, SEND_FLAGS)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf)
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

fn connect_in_progress(err: &io::Error) -> bool {
    #[cfg(unix)]
    if err.raw_os_error() == Some(libc::EINPROGRESS) {
        return true;
    }
    err.kind() == io::ErrorKind::WouldBlock
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Lifecycle of the underlying stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No stream has been opened, or it was released.
    #[default]
    Unconnected,
    /// Connect issued, completion not yet observed.
    Connecting,
    /// The stream is usable.
    Connected,
}

/// Sticky error record: first description, latest code.
///
/// A transport code is never replaced by a non-transport one, so a dead
/// socket always stops [`Connection::advance`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot {
    code: ErrorCode,
    description: String,
}

impl ErrorSlot {
    /// Code of the most recent error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The first description recorded since the last clear, if any.
    pub fn description(&self) -> Option<&str> {
        (!self.description.is_empty()).then_some(self.description.as_str())
    }

    /// Record an error under the first-description-wins rule.
    pub fn set(&mut self, code: ErrorCode, description: &str) {
        if !(self.code.is_transport() && !code.is_transport()) {
            self.code = code;
        }
        if self.description.is_empty() {
            self.description = description.to_string();
        }
    }

    /// Reset the slot when the current code satisfies `pred`.
    pub fn clear_if(&mut self, pred: impl FnOnce(ErrorCode) -> bool) -> bool {
        if self.code != ErrorCode::None && pred(self.code) {
            *self = Self::default();
            true
        } else {
            false
        }
    }
}

/// A buffered, poll-driven connection to one host and port.
pub struct Connection<D: Dialer = TcpDialer> {
    host: String,
    port: u16,
    dialer: D,
    stream: Option<D::Stream>,
    state: TransportState,
    error: ErrorSlot,
    failure: Option<TransportError>,
    deadline: Option<Instant>,
    outbound: BytesMut,
    inbound: BytesMut,
    scratch: Box<[u8]>,
    peer_closed: bool,
}

impl Connection<TcpDialer> {
    /// Create an unconnected TCP connection. Nothing happens until
    /// [`advance`](Self::advance) is called.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_dialer(host, port, TcpDialer)
    }
}

impl<D: Dialer> Connection<D> {
    /// Create an unconnected connection whose stream comes from `dialer`.
    pub fn with_dialer(host: impl Into<String>, port: u16, dialer: D) -> Self {
        Self {
            host: host.into(),
            port,
            dialer,
            stream: None,
            state: TransportState::Unconnected,
            error: ErrorSlot::default(),
            failure: None,
            deadline: None,
            outbound: BytesMut::with_capacity(SEND_CHUNK),
            inbound: BytesMut::with_capacity(RECV_CHUNK),
            scratch: vec![0; RECV_CHUNK].into_boxed_slice(),
            peer_closed: false,
        }
    }

    /// Run one non-blocking cycle.
    ///
    /// A positive `timeout` seeds a deadline on first use; once it passes the
    /// connection fails with [`TransportError::Timeout`]. Returns `false`
    /// only when a transport error is set.
    pub fn advance(&mut self, timeout: Option<Duration>) -> bool {
        if self.error.code().is_transport() {
            return false;
        }

        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + timeout);
            if Instant::now() > deadline {
                self.fail(TransportError::Timeout);
                return false;
            }
        }

        match self.state {
            TransportState::Unconnected => self.open(),
            TransportState::Connecting | TransportState::Connected => self.pump(),
        }

        !self.error.code().is_transport()
    }

    fn open(&mut self) {
        let mut stream = match self.dialer.resolve(&self.host, self.port) {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };
        if let Err(e) = stream.connect() {
            return self.fail(TransportError::Connect(e.to_string()));
        }

        debug!(host = %self.host, port = self.port, "connecting");
        self.stream = Some(stream);
        self.state = TransportState::Connecting;
    }

    fn pump(&mut self) {
        let Some(stream) = self.stream.as_mut() else {
            return self.fail(TransportError::Closed);
        };

        let readiness = match stream.poll() {
            Ok(r) if r.contains(Readiness::ERROR) => {
                return self.fail(TransportError::Poll("socket error pending".into()));
            }
            Ok(r) => r,
            Err(e) => return self.fail(TransportError::Poll(e.to_string())),
        };

        if self.state == TransportState::Connecting {
            if readiness.is_empty() {
                return;
            }
            self.state = TransportState::Connected;
            info!(host = %self.host, port = self.port, "connected");
        }

        if readiness.contains(Readiness::WRITE) && !self.outbound.is_empty() {
            let chunk = self.outbound.len().min(SEND_CHUNK);
            match stream.send(&self.outbound[..chunk]) {
                Ok(n) => {
                    protocol_trace::hexdump(">>", &self.outbound[..n], 64);
                    self.outbound.advance(n);
                    trace!(sent = n, pending = self.outbound.len(), "send");
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => return self.fail(TransportError::Send(e.to_string())),
            }
        }

        if readiness.contains(Readiness::READ) {
            match stream.recv(&mut self.scratch) {
                Ok(0) => {
                    if !self.peer_closed {
                        debug!(host = %self.host, "peer closed the connection");
                    }
                    self.peer_closed = true;
                }
                Ok(n) => {
                    protocol_trace::hexdump("<<", &self.scratch[..n], 64);
                    self.inbound.extend_from_slice(&self.scratch[..n]);
                    trace!(received = n, buffered = self.inbound.len(), "recv");
                }
                Err(e) if is_transient(&e) => {}
                Err(e) => self.fail(TransportError::Receive(e.to_string())),
            }
        }
    }

    fn fail(&mut self, err: TransportError) {
        self.error.set(ErrorCode::Transport, &err.to_string());
        if self.failure.is_none() {
            warn!(host = %self.host, port = self.port, "{}", err);
            self.failure = Some(err);
        }
    }

    /// Release the socket now. The connection stays failed afterwards.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(host = %self.host, "connection released");
        }
        self.state = TransportState::Unconnected;
        self.fail(TransportError::Closed);
    }

    /// Destination host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Destination port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Current stream lifecycle state.
    pub fn state(&self) -> TransportState {
        self.state
    }

    /// True once the stream reported its connect complete.
    pub fn is_established(&self) -> bool {
        self.state == TransportState::Connected
    }

    /// True after the peer closed its side. Buffered bytes remain readable.
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Bytes queued but not yet accepted by the socket.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// The sticky error slot.
    pub fn error(&self) -> &ErrorSlot {
        &self.error
    }

    /// The first transport failure, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        self.failure.as_ref()
    }

    /// Clear the error if its code satisfies `pred`.
    pub fn clear_error_if(&mut self, pred: impl FnOnce(ErrorCode) -> bool) -> bool {
        self.error.clear_if(pred)
    }
}

impl<D: Dialer> Link for Connection<D> {
    fn enqueue(&mut self, bytes: &[u8]) {
        self.outbound.extend_from_slice(bytes);
    }

    fn inbound(&self) -> &[u8] {
        &self.inbound
    }

    fn discard(&mut self, n: usize) {
        let n = n.min(self.inbound.len());
        self.inbound.advance(n);
    }

    fn error_code(&self) -> ErrorCode {
        self.error.code()
    }

    fn set_error(&mut self, code: ErrorCode, description: &str) {
        self.error.set(code, description);
    }
}

impl<D: Dialer> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state)
            .field("error", &self.error)
            .field("outbound", &self.outbound.len())
            .field("inbound", &self.inbound.len())
            .field("peer_closed", &self.peer_closed)
            .finish()
    }
}

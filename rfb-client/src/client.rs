//! The caller-facing VNC client.
//!
//! [`VncClient`] glues a [`Connection`] to the protocol state machine. The
//! caller owns the loop: every [`advance`](VncClient::advance) runs one
//! transport cycle and, once the socket is up, one protocol step.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::VncClient;
//! use std::time::Duration;
//!
//! let mut client = VncClient::new("localhost", 5900);
//! client.set_password("secret");
//! client.set_keep_framebuffer(true);
//!
//! while client.advance(Some(Duration::from_secs(10))) && !client.is_connected() {}
//! client.request_full_update(false);
//! ```

use crate::config::Config;
use crate::errors::RfbClientError;
use crate::protocol_trace;
use crate::transport::{Connection, Dialer, TcpDialer, TransportError};
use rfb_common::Rect;
use rfb_protocol::auth::PrivateKeySource;
use rfb_protocol::io::WireWriter;
use rfb_protocol::messages::types::{
    MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT, MSG_SET_COLOR_MAP_ENTRIES,
};
use rfb_protocol::messages::{ClientCutText, FramebufferUpdateRequest, KeyEvent, PointerEvent};
use rfb_protocol::{
    drive, ErrorCode, Link, ProtocolVersion, SecurityType, Session, SessionError, State, Step,
};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A poll-driven VNC client session.
///
/// Not thread-safe by itself; wrap it in a lock to share it.
pub struct VncClient<D: Dialer = TcpDialer> {
    connection: Connection<D>,
    state: State,
    session: Session,
    last_error: Option<SessionError>,
}

impl VncClient<TcpDialer> {
    /// Create a client for `host:port`. No I/O happens until the first
    /// [`advance`](Self::advance).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_dialer(host, port, TcpDialer)
    }

    /// Create a client from a validated [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::with_config(config, TcpDialer)
    }
}

impl<D: Dialer> VncClient<D> {
    /// Create a client whose stream is produced by `dialer`.
    pub fn with_dialer(host: impl Into<String>, port: u16, dialer: D) -> Self {
        Self {
            connection: Connection::with_dialer(host, port, dialer),
            state: State::default(),
            session: Session::new(),
            last_error: None,
        }
    }

    /// Create a client from `config` using `dialer`.
    pub fn with_config(config: &Config, dialer: D) -> Self {
        let conn = &config.connection;
        let mut client = Self::with_dialer(conn.host.clone(), conn.port, dialer);

        match (&conn.username, &conn.password) {
            (Some(username), Some(password)) => client.set_credentials(username, password),
            (None, Some(password)) => client.set_password(password),
            _ => {}
        }
        client.session.set_shared(config.session.shared);
        client.set_keep_framebuffer(config.session.keep_framebuffer);
        client
    }

    /// Supply the VNC password. Clears a pending "password required" error.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.session.set_password(password);
        self.connection
            .clear_error_if(|code| code == ErrorCode::PasswordRequired);
    }

    /// Supply a username and password. Clears either pending credential
    /// request.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.session.set_credentials(username, password);
        self.connection.clear_error_if(ErrorCode::is_credential_request);
    }

    /// Replace the Diffie-Hellman private key source.
    pub fn set_key_source(&mut self, source: Box<dyn PrivateKeySource>) {
        self.session.set_key_source(source);
    }

    /// Whether received pixels are copied into the local framebuffer.
    pub fn set_keep_framebuffer(&mut self, keep: bool) {
        self.session.set_keep_framebuffer(keep);
    }

    /// Set the shared flag sent in ClientInit. Only effective before the
    /// handshake reaches that point.
    pub fn set_shared(&mut self, shared: bool) {
        self.session.set_shared(shared);
    }

    /// Run one transport cycle and at most one protocol step.
    ///
    /// Returns `false` only once a transport error is set. Protocol and
    /// authentication failures leave it `true`; check
    /// [`error_code`](Self::error_code) and [`state`](Self::state).
    pub fn advance(&mut self, timeout: Option<Duration>) -> bool {
        if !self.connection.advance(timeout) {
            return false;
        }
        if !self.connection.is_established() || self.state.is_terminal() {
            return true;
        }

        let previous = self.state;
        let tag = self.connection.inbound().first().copied();
        let step = drive(&mut self.connection, previous, &mut self.session);
        self.observe(previous, tag, step);
        true
    }

    fn observe(&mut self, previous: State, tag: Option<u8>, step: Step) {
        if protocol_trace::enabled() {
            if step.consumed > 0 {
                protocol_trace::in_msg(inbound_name(previous, tag), &format!("len={}", step.consumed));
            }
            if !step.output.is_empty() {
                protocol_trace::out_msg(outbound_name(previous), &format!("len={}", step.output.len()));
            }
        }

        if previous == State::AwaitingServerInit && step.next == State::Setup {
            if let Some(desktop) = self.session.display() {
                info!(
                    width = desktop.width,
                    height = desktop.height,
                    bpp = desktop.bytes_per_pixel,
                    name = %desktop.name,
                    "server initialized"
                );
            }
        }
        if step.next == State::Connected && previous != State::Connected {
            info!(host = %self.connection.host(), "session established");
        }
        if let Some(error) = step.error {
            self.last_error = Some(error);
        }
        self.state = step.next;
    }

    /// Drive the session until it is connected.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Timeout`] when `timeout` passes,
    /// [`RfbClientError::Transport`] for other socket failures, and
    /// [`RfbClientError::Session`] when the handshake fails or is waiting for
    /// credentials.
    pub fn wait_until_connected(&mut self, timeout: Duration) -> Result<(), RfbClientError> {
        let started = Instant::now();
        loop {
            if !self.advance(Some(timeout)) {
                return Err(match self.connection.transport_error() {
                    Some(TransportError::Timeout) | None => RfbClientError::Timeout(timeout),
                    Some(e) => RfbClientError::Transport(e.clone()),
                });
            }
            if self.is_connected() {
                debug!(elapsed = ?started.elapsed(), "connected");
                return Ok(());
            }
            if self.state.is_terminal() || self.error_code().is_credential_request() {
                let error = self.last_error.clone().unwrap_or(SessionError::LoginFailed);
                return Err(RfbClientError::Session(error));
            }
            std::thread::yield_now();
        }
    }

    /// True once the handshake has completed and steady-state messages flow.
    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// Current protocol state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<D> {
        &self.connection
    }

    /// The protocol session data.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True after the server closed its side of the socket.
    pub fn peer_closed(&self) -> bool {
        self.connection.peer_closed()
    }

    /// Framebuffer width in pixels (0 before ServerInit).
    pub fn framebuffer_width(&self) -> u16 {
        self.session.display().map_or(0, |d| d.width)
    }

    /// Framebuffer height in pixels (0 before ServerInit).
    pub fn framebuffer_height(&self) -> u16 {
        self.session.display().map_or(0, |d| d.height)
    }

    /// Bytes per pixel (0 before ServerInit).
    pub fn framebuffer_bytes_per_pixel(&self) -> u8 {
        self.session.display().map_or(0, |d| d.bytes_per_pixel)
    }

    /// Number of rectangles applied so far.
    pub fn framebuffer_version(&self) -> u64 {
        self.session.framebuffer().version()
    }

    /// Raw pixel bytes, row-major, once the first rectangle was kept.
    pub fn framebuffer(&self) -> Option<&[u8]> {
        self.session.framebuffer().data()
    }

    /// Desktop name from ServerInit.
    pub fn server_name(&self) -> Option<&str> {
        self.session.display().map(|d| d.name.as_str())
    }

    /// Version negotiated from the server banner.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.session.protocol_version()
    }

    /// Security type chosen during negotiation.
    pub fn security_type(&self) -> Option<SecurityType> {
        self.session.security_type()
    }

    /// Reason text sent by a 3.8 server when it refused the session.
    pub fn failure_reason(&self) -> Option<&str> {
        self.session.failure_reason()
    }

    /// Code of the most recent error, [`ErrorCode::None`] if clean.
    pub fn error_code(&self) -> ErrorCode {
        self.connection.error().code()
    }

    /// Description of the first error recorded since the last clear.
    pub fn error_description(&self) -> Option<&str> {
        self.connection.error().description()
    }

    /// Queue a key press or release. Returns `false` if not connected.
    pub fn send_key(&mut self, key: u32, down: bool) -> bool {
        self.send("KeyEvent", |w| KeyEvent { down, key }.write_to(w))
    }

    /// Queue a press followed by a release of `key`.
    pub fn pulse_key(&mut self, key: u32) -> bool {
        self.send_key(key, true) && self.send_key(key, false)
    }

    /// Queue a pointer position and button mask.
    pub fn send_pointer(&mut self, x: u16, y: u16, button_mask: u8) -> bool {
        self.send("PointerEvent", |w| PointerEvent { button_mask, x, y }.write_to(w))
    }

    /// Queue clipboard text for the server.
    pub fn send_cut_text(&mut self, text: &str) -> bool {
        self.send("ClientCutText", |w| {
            ClientCutText {
                text: text.to_string(),
            }
            .write_to(w)
        })
    }

    /// Ask the server for the pixels in `rect`.
    pub fn request_update(&mut self, incremental: bool, rect: Rect) -> bool {
        self.send("FramebufferUpdateRequest", |w| {
            FramebufferUpdateRequest { incremental, rect }.write_to(w)
        })
    }

    /// Ask the server for the whole framebuffer.
    pub fn request_full_update(&mut self, incremental: bool) -> bool {
        let rect = Rect::new(0, 0, self.framebuffer_width(), self.framebuffer_height());
        self.request_update(incremental, rect)
    }

    fn send(&mut self, name: &str, encode: impl FnOnce(&mut WireWriter)) -> bool {
        if !self.is_connected() {
            debug!(message = name, state = ?self.state, "not connected, dropping message");
            return false;
        }
        let mut writer = WireWriter::new();
        encode(&mut writer);
        protocol_trace::out_msg(name, &format!("len={}", writer.len()));
        self.connection.enqueue(writer.as_slice());
        true
    }

    /// Release the socket immediately. Later calls to
    /// [`advance`](Self::advance) return `false`.
    pub fn disconnect(&mut self) {
        self.connection.close();
    }
}

impl<D: Dialer> std::fmt::Debug for VncClient<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VncClient")
            .field("connection", &self.connection)
            .field("state", &self.state)
            .field("session", &self.session)
            .finish()
    }
}

fn inbound_name(state: State, tag: Option<u8>) -> &'static str {
    match state {
        State::AwaitingVersion => "ProtocolVersion",
        State::AwaitingSecurityCode => "SecurityType",
        State::AwaitingSecurityList => "SecurityTypes",
        State::AwaitingChallenge => "VncAuthChallenge",
        State::AwaitingDhParams => "ArdParameters",
        State::AwaitingSecurityResult => "SecurityResult",
        State::AwaitingFailureReason => "FailureReason",
        State::AwaitingServerInit => "ServerInit",
        State::Connected => match tag {
            Some(MSG_FRAMEBUFFER_UPDATE) => "FramebufferUpdate",
            Some(MSG_SET_COLOR_MAP_ENTRIES) => "SetColorMapEntries",
            Some(MSG_BELL) => "Bell",
            Some(MSG_SERVER_CUT_TEXT) => "ServerCutText",
            _ => "Unknown",
        },
        _ => "Unknown",
    }
}

fn outbound_name(state: State) -> &'static str {
    match state {
        State::AwaitingVersion => "ProtocolVersion",
        State::AwaitingSecurityList => "SecurityType",
        State::AwaitingChallenge => "VncAuthResponse",
        State::AwaitingDhParams => "ArdResponse",
        State::Initialize => "ClientInit",
        State::Setup => "SetEncodings",
        _ => "Unknown",
    }
}

//! RFB (Remote Framebuffer) protocol implementation.
//!
//! This crate provides the I/O-free protocol layer of the VNC client: wire
//! codecs, the handshake and authentication rules, and a state machine that
//! decodes server messages from whatever bytes have arrived so far.
//!
//! # Modules
//!
//! - [`io`] - Bounds-checked big-endian readers and writers
//! - [`messages`] - Client and server message codecs
//! - [`handshake`] - Version banner parsing and security type selection
//! - [`auth`] - VNC (DES) and Apple Remote Desktop (Diffie-Hellman) authentication
//! - [`session`] - Per-connection protocol data
//! - [`framebuffer`] - Local pixel store with a version counter
//! - [`machine`] - The pure step function
//! - [`link`] - Transport capability trait and [`drive`]
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::{step, Session, State};
//!
//! let mut session = Session::new();
//! let step = step(State::AwaitingVersion, &mut session, b"RFB 003.008\n");
//!
//! assert_eq!(step.next, State::AwaitingSecurityList);
//! assert_eq!(step.consumed, 12);
//! assert_eq!(step.output, b"RFB 003.008\n");
//! ```

pub mod auth;
pub mod errors;
pub mod framebuffer;
pub mod handshake;
pub mod io;
pub mod link;
pub mod machine;
pub mod messages;
pub mod session;

// Re-export commonly used types
pub use errors::{ErrorCode, SessionError};
pub use framebuffer::Framebuffer;
pub use handshake::ProtocolVersion;
pub use link::{drive, Link};
pub use machine::{step, State, Step};
pub use messages::SecurityType;
pub use session::{DisplayInfo, Session};

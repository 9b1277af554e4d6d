//! Non-blocking, poll-driven VNC client library.
//!
//! This crate provides the I/O half of the VNC client on top of the pure
//! `rfb-protocol` crate: a buffered TCP transport that never blocks, and a
//! [`VncClient`] facade that feeds the transport's inbound bytes to the
//! protocol state machine one step at a time.
//!
//! # Features
//!
//! - **Cooperative polling**: no threads, no async runtime; the caller loops
//!   on [`VncClient::advance`]
//! - **Security types**: None, VNC password, Apple Remote Desktop
//! - **Raw encoding** into an optional local framebuffer
//! - **Configuration management**: TOML files and command-line arguments
//!   (feature `cli`)
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_client::{Config, VncClient};
//!
//! # fn main() -> Result<(), rfb_client::RfbClientError> {
//! let config = Config::builder()
//!     .host("localhost")
//!     .port(5900)
//!     .password("secret")
//!     .keep_framebuffer(true)
//!     .build()?;
//!
//! rfb_client::net::initialize();
//! let mut client = VncClient::from_config(&config);
//! client.wait_until_connected(std::time::Duration::from_secs(10))?;
//! client.request_full_update(false);
//!
//! let seen = client.framebuffer_version();
//! while client.advance(None) && client.framebuffer_version() == seen {}
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Session progress is reported through a sticky error slot: the first
//! description is kept, and [`ErrorCode`] tells transport failures (which
//! stop [`VncClient::advance`]) from protocol and authentication failures
//! (which move the session to its terminal state). Supplying credentials
//! clears a pending credential request and nothing else.
//!
//! # Safety
//!
//! This crate is `#![deny(unsafe_code)]`. The single exception is the
//! zero-timeout `poll(2)` call behind the TCP readiness probe.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod errors;
pub mod net;
pub mod protocol_trace;
pub mod transport;

// Optional CLI support
#[cfg(feature = "cli")]
pub mod args;

// Re-exports
pub use client::VncClient;
pub use config::Config;
pub use errors::RfbClientError;
pub use rfb_protocol::{ErrorCode, State};
pub use transport::{Connection, Dialer, NetStream, Readiness, TcpDialer, TransportError};

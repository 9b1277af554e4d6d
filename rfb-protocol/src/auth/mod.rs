//! Credential-proving subroutines run during the security handshake.
//!
//! - [`vnc`] - DES challenge-response (security type 2)
//! - [`ard`] - Diffie-Hellman key agreement with AES-encrypted credentials
//!   (security type 30)
//!
//! Both are pure functions of the server's challenge and the credentials, so
//! they can be checked against independently computed values.

pub mod ard;
pub mod vnc;

pub use ard::{ArdResponse, DhParams, FixedKeySource, PrivateKeySource, RandomKeySource};
pub use vnc::challenge_response;

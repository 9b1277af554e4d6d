//! VNC authentication (security type 2).
//!
//! The server sends a random 16-byte challenge. The client encrypts it with
//! DES, using the password as the key, and returns the 16-byte result.
//!
//! Two historical quirks apply to the key:
//! - only the first 8 password bytes are used, shorter passwords are
//!   zero-padded
//! - each key byte has its bits reversed before being handed to DES

use des::cipher::generic_array::GenericArray;
use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Length of the server challenge and of the client response.
pub const CHALLENGE_LEN: usize = 16;

/// Build the 8-byte DES key for `password`.
pub fn password_key(password: &[u8]) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (slot, byte) in key.iter_mut().zip(password) {
        *slot = byte.reverse_bits();
    }
    key
}

/// Encrypt a server challenge with `password`.
///
/// # Examples
///
/// ```
/// use rfb_protocol::auth::vnc::challenge_response;
///
/// let response = challenge_response(b"secret", &[0u8; 16]);
/// assert_eq!(response.len(), 16);
/// // Both halves of an all-zero challenge encrypt identically (ECB).
/// assert_eq!(response[..8], response[8..]);
/// ```
pub fn challenge_response(password: &[u8], challenge: &[u8; CHALLENGE_LEN]) -> [u8; CHALLENGE_LEN] {
    let cipher = Des::new(GenericArray::from_slice(&password_key(password)));

    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    response
}

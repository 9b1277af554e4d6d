//! Apple Remote Desktop authentication (security type 30).
//!
//! # Wire Format
//!
//! The server opens with its Diffie-Hellman parameters:
//! - 2 bytes: generator
//! - 2 bytes: key length `k`
//! - `k` bytes: prime modulus
//! - `k` bytes: server public value
//!
//! The client answers with:
//! - 128 bytes: AES-128-ECB encrypted credentials, keyed with the MD5 digest
//!   of the `k`-byte shared secret. The plaintext is two 64-byte NUL-padded
//!   fields (username, password), each truncated to 63 bytes.
//! - the client public value, big-endian, leading zero bytes stripped
//!
//! The peer public value must satisfy `1 < y < p - 1`; anything else fails the
//! key agreement.

use crate::errors::SessionError;
use crate::io::{WireReader, WireResult, WireWriter};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use md5::{Digest, Md5};
use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;

/// Size of one credential field, including its terminating NUL.
pub const CREDENTIAL_FIELD_LEN: usize = 64;

/// Size of the encrypted credential block.
pub const CREDENTIAL_BLOCK_LEN: usize = 2 * CREDENTIAL_FIELD_LEN;

/// Source of the client's Diffie-Hellman private exponent.
pub trait PrivateKeySource: Send {
    /// Pick a private exponent for the group with modulus `prime` (`prime > 3`).
    fn private_key(&mut self, prime: &BigUint) -> BigUint;
}

/// Draws a fresh exponent in `[2, p - 2]` from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomKeySource;

impl PrivateKeySource for RandomKeySource {
    fn private_key(&mut self, prime: &BigUint) -> BigUint {
        let mut bytes = vec![0u8; prime.to_bytes_be().len() + 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        let span = prime - BigUint::from(3u8);
        BigUint::from_bytes_be(&bytes) % span + BigUint::from(2u8)
    }
}

/// Always returns the same exponent. Useful for reproducible exchanges.
#[derive(Debug, Clone)]
pub struct FixedKeySource(pub BigUint);

impl PrivateKeySource for FixedKeySource {
    fn private_key(&mut self, _prime: &BigUint) -> BigUint {
        self.0.clone()
    }
}

/// Diffie-Hellman parameters announced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DhParams<'a> {
    pub generator: u16,
    pub prime: &'a [u8],
    pub peer_public: &'a [u8],
}

impl<'a> DhParams<'a> {
    pub const HEADER_LEN: usize = 4;

    /// Decode the parameters, returning them and their total length `4 + 2k`.
    pub fn decode(buf: &'a [u8]) -> WireResult<(Self, usize)> {
        let mut reader = WireReader::new(buf);
        let generator = reader.read_u16()?;
        let key_length = reader.read_u16()? as usize;
        reader.require(2 * key_length)?;
        let prime = reader.read_bytes(key_length)?;
        let peer_public = reader.read_bytes(key_length)?;
        Ok((
            Self {
                generator,
                prime,
                peer_public,
            },
            reader.position(),
        ))
    }

    /// Key length `k` in bytes.
    pub fn key_length(&self) -> usize {
        self.prime.len()
    }
}

/// The client's answer to a [`DhParams`] challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArdResponse {
    pub ciphertext: [u8; CREDENTIAL_BLOCK_LEN],
    /// Client public value with leading zero bytes stripped.
    pub public_key: Vec<u8>,
}

impl ArdResponse {
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_bytes(&self.ciphertext);
        writer.write_bytes(&self.public_key);
    }
}

/// Run the key agreement and encrypt the credentials.
pub fn respond(
    params: &DhParams<'_>,
    username: &[u8],
    password: &[u8],
    keys: &mut dyn PrivateKeySource,
) -> Result<ArdResponse, SessionError> {
    let prime = BigUint::from_bytes_be(params.prime);
    if prime <= BigUint::from(3u8) {
        return Err(SessionError::KeyAgreement("prime modulus too small"));
    }

    let generator = BigUint::from(params.generator);
    if generator <= BigUint::one() || generator >= prime {
        return Err(SessionError::KeyAgreement("generator out of range"));
    }

    let peer_public = BigUint::from_bytes_be(params.peer_public);
    if peer_public <= BigUint::one() || peer_public >= &prime - BigUint::one() {
        return Err(SessionError::KeyAgreement("server public value out of range"));
    }

    let private = keys.private_key(&prime);
    let public = generator.modpow(&private, &prime);
    let shared = peer_public.modpow(&private, &prime);

    let key = derive_key(&left_pad(&shared.to_bytes_be(), params.key_length()));
    let ciphertext = encrypt_credentials(&key, &credential_block(username, password));

    Ok(ArdResponse {
        ciphertext,
        public_key: public.to_bytes_be(),
    })
}

/// AES key derived from the raw shared secret.
pub fn derive_key(shared_secret: &[u8]) -> [u8; 16] {
    let mut key = [0u8; 16];
    key.copy_from_slice(&Md5::digest(shared_secret));
    key
}

/// Lay out the plaintext credential block.
pub fn credential_block(username: &[u8], password: &[u8]) -> [u8; CREDENTIAL_BLOCK_LEN] {
    let mut block = [0u8; CREDENTIAL_BLOCK_LEN];
    let (user_field, pass_field) = block.split_at_mut(CREDENTIAL_FIELD_LEN);
    copy_field(user_field, username);
    copy_field(pass_field, password);
    block
}

fn copy_field(field: &mut [u8], value: &[u8]) {
    let len = value.len().min(CREDENTIAL_FIELD_LEN - 1);
    field[..len].copy_from_slice(&value[..len]);
}

fn encrypt_credentials(
    key: &[u8; 16],
    block: &[u8; CREDENTIAL_BLOCK_LEN],
) -> [u8; CREDENTIAL_BLOCK_LEN] {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut out = *block;
    for chunk in out.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    out
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}

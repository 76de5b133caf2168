//! Authenticated encryption for object payloads
//!
//! AES-256-GCM with a fresh random nonce per encryption. An envelope is
//! self-contained and self-delimiting:
//!
//! ```text
//! nonce (12) || ciphertext length (8, LE) || ciphertext + tag (16)
//! ```
//!
//! The length field lets `decrypt` ignore trailing zero padding appended by
//! the erasure layer; everything up to the recorded length is covered by the
//! authentication tag, so a tampered nonce, length field, ciphertext or tag
//! all fail authentication.

use crate::error::{CofferError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use bytes::Bytes;
use std::fmt;

/// AES-256-GCM key size (32 bytes)
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size (12 bytes / 96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the little-endian ciphertext length field
pub const LEN_SIZE: usize = 8;

/// AES-GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Envelope bytes preceding the ciphertext
const HEADER_SIZE: usize = NONCE_SIZE + LEN_SIZE;

/// Fixed overhead added to a plaintext by [`encrypt`]
pub const OVERHEAD: usize = HEADER_SIZE + TAG_SIZE;

/// AES-256-GCM encryption key
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generate a new random encryption key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice (validates length)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != KEY_SIZE {
            return Err(CofferError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: slice.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(slice);
        Ok(Self(key))
    }

    /// Parse from a hex string, as carried in configuration
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| CofferError::Crypto(format!("invalid key hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey([REDACTED])")
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

/// Encrypt a payload, returning the self-delimiting envelope.
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Bytes> {
    use rand::RngCore;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CofferError::Crypto(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CofferError::Crypto(e.to_string()))?;

    let mut envelope = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    envelope.extend_from_slice(&ciphertext);
    Ok(Bytes::from(envelope))
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// Bytes beyond the recorded ciphertext length are ignored, which is how
/// erasure-layer zero padding is shed on the read path. Returns
/// [`CofferError::AuthenticationFailure`] if the envelope was truncated or
/// any covered byte was altered.
pub fn decrypt(envelope: &[u8], key: &EncryptionKey) -> Result<Bytes> {
    if envelope.len() < OVERHEAD {
        return Err(CofferError::AuthenticationFailure);
    }

    let nonce = Nonce::from_slice(&envelope[..NONCE_SIZE]);

    let mut len_bytes = [0u8; LEN_SIZE];
    len_bytes.copy_from_slice(&envelope[NONCE_SIZE..HEADER_SIZE]);
    let ciphertext_len = u64::from_le_bytes(len_bytes) as usize;

    let end = match HEADER_SIZE.checked_add(ciphertext_len) {
        Some(end) if end <= envelope.len() && ciphertext_len >= TAG_SIZE => end,
        _ => return Err(CofferError::AuthenticationFailure),
    };

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CofferError::Crypto(e.to_string()))?;

    let plaintext = cipher
        .decrypt(nonce, &envelope[HEADER_SIZE..end])
        .map_err(|_| CofferError::AuthenticationFailure)?;

    Ok(Bytes::from(plaintext))
}

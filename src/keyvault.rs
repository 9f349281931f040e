// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Symmetric encryption of private spend keys at rest.
//!
//! ## Format
//!
//! Ciphertext at rest is `base64(nonce || aead_ciphertext)` where the cipher
//! is XChaCha20-Poly1305 under a process-wide 32-byte master key loaded from
//! configuration. A fresh 24-byte nonce is drawn per encryption, so equal
//! plaintexts produce different ciphertexts.
//!
//! ## Guarantees
//!
//! - Decryption under a different key, or of tampered data, fails with
//!   [`CryptoError::DecryptFailed`] (the AEAD tag catches it); it never
//!   returns garbage.
//! - Decrypted plaintext is returned as [`Zeroizing<String>`] so transient
//!   copies are wiped when dropped.
//!
//! Key rotation is out of scope; the master key is fixed for the process
//! lifetime.

use base64ct::{Base64, Encoding};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

/// XChaCha20 nonce length in bytes.
const NONCE_LEN: usize = 24;
/// Poly1305 tag length in bytes.
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("ciphertext is malformed: {0}")]
    Malformed(String),

    #[error("decryption failed (wrong key or corrupted ciphertext)")]
    DecryptFailed,

    #[error("encryption failed")]
    EncryptFailed,

    #[error("decrypted payload is not valid UTF-8")]
    NotUtf8,
}

/// Process-wide vault for spend-key encryption. Holds the only copy of the
/// master key material; other components see ciphertext or short-lived
/// [`Zeroizing`] plaintext.
pub struct KeyVault {
    cipher: XChaCha20Poly1305,
}

impl KeyVault {
    /// Build a vault from the 32-byte master key.
    pub fn new(master_key: &[u8; 32]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(master_key.into()),
        }
    }

    /// Encrypt a plaintext spend key for storage.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut buf = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        buf.extend_from_slice(&nonce);
        buf.extend_from_slice(&ciphertext);
        Ok(Base64::encode_string(&buf))
    }

    /// Decrypt a stored spend key. The returned buffer zeroes itself on drop.
    pub fn decrypt(&self, stored: &str) -> Result<Zeroizing<String>, CryptoError> {
        let bytes = Base64::decode_vec(stored)
            .map_err(|e| CryptoError::Malformed(format!("invalid base64: {e}")))?;

        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Malformed(format!(
                "ciphertext too short: {} bytes",
                bytes.len()
            )));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(nonce, ciphertext)
                .map_err(|_| CryptoError::DecryptFailed)?,
        );

        let text = std::str::from_utf8(&plaintext).map_err(|_| CryptoError::NotUtf8)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

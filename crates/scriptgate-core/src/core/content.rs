// crates/scriptgate-core/src/core/content.rs
// ============================================================================
// Module: Content Decryptor
// Description: XChaCha20-Poly1305 framing and one-shot payload decryption.
// Purpose: Turn nonce-prefixed ciphertext into authenticated plaintext.
// Dependencies: chacha20poly1305, rand, thiserror
// ============================================================================

//! ## Overview
//! Encrypted payloads are framed as a 24-byte nonce prefix followed by
//! ciphertext plus the 16-byte Poly1305 tag (the XChaCha20-Poly1305 IETF
//! construction, no additional authenticated data). Decryption is one-shot
//! and atomic: either the full plaintext is returned or a single failure is
//! raised; there is no partial or streaming decryption.
//! Invariants:
//! - Payloads shorter than [`MIN_PAYLOAD_LEN`] are rejected before the cipher
//!   is invoked.
//! - Authentication failures are reported with one coarse message.
//! - Authenticated plaintext must decode as UTF-8; an honest producer never
//!   violates this, but it is handled, not assumed.
//!
//! Security posture: ciphertext originates from an untrusted remote host; a
//! failed tag check means tampering, a wrong key, or corruption and is never
//! partially trusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chacha20poly1305::XChaCha20Poly1305;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::KeyInit;
use chacha20poly1305::aead::generic_array::GenericArray;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::core::keywrap::SymmetricKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Extended nonce length in bytes (192-bit XChaCha20 nonce).
pub const NONCE_LEN: usize = 24;
/// Poly1305 authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Minimum well-formed payload: nonce prefix plus tag for an empty message.
pub const MIN_PAYLOAD_LEN: usize = NONCE_LEN + TAG_LEN;

// ============================================================================
// SECTION: Payload Types
// ============================================================================

/// Raw encrypted payload bytes as fetched: nonce prefix then ciphertext+tag.
///
/// # Invariants
/// - Created per fetch, consumed once, then discarded.
/// - Framing is validated at decryption time, not at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
    /// Wraps fetched bytes without validation.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the payload, returning the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Decrypted (or as-fetched) script text.
///
/// # Invariants
/// - Always valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextScript(String);

impl PlaintextScript {
    /// Wraps already-validated script text.
    #[must_use]
    pub const fn new(text: String) -> Self {
        Self(text)
    }

    /// Returns the script text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the script, returning the owned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

// ============================================================================
// SECTION: Decryption
// ============================================================================

/// Decrypts a nonce-prefixed XChaCha20-Poly1305 payload.
///
/// # Errors
///
/// - [`ContentError::MalformedPayload`] when the payload is shorter than
///   [`MIN_PAYLOAD_LEN`]; the cipher is not invoked in that case.
/// - [`ContentError::DecryptionFailure`] when authentication fails.
/// - [`ContentError::Encoding`] when authenticated plaintext is not UTF-8.
pub fn decrypt_payload(
    payload: &EncryptedPayload,
    key: &SymmetricKey,
) -> Result<PlaintextScript, ContentError> {
    let bytes = payload.as_bytes();
    if bytes.len() < MIN_PAYLOAD_LEN {
        return Err(ContentError::MalformedPayload {
            min_len: MIN_PAYLOAD_LEN,
            actual_len: bytes.len(),
        });
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| ContentError::DecryptionFailure)?;
    let text = String::from_utf8(plaintext)
        .map_err(|err| ContentError::Encoding(err.utf8_error().to_string()))?;
    Ok(PlaintextScript::new(text))
}

// ============================================================================
// SECTION: Sealing (producer side)
// ============================================================================

/// Encrypts plaintext under a fresh random 24-byte nonce, producing the
/// nonce-prefixed framing expected by [`decrypt_payload`].
///
/// Producer-side inverse of the decryptor, used by publishing tooling and by
/// the round-trip tests.
///
/// # Errors
///
/// Returns [`ContentError::DecryptionFailure`] when the cipher rejects the
/// input (plaintext too large for the AEAD construction).
pub fn seal_payload(plaintext: &str, key: &SymmetricKey) -> Result<EncryptedPayload, ContentError> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| ContentError::DecryptionFailure)?;
    let mut framed = nonce.to_vec();
    framed.extend_from_slice(&ciphertext);
    Ok(EncryptedPayload::from_bytes(framed))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Content decryption errors.
///
/// # Invariants
/// - [`ContentError::DecryptionFailure`] carries no detail about which
///   internal check failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    /// Ciphertext shorter than the minimum framing size.
    #[error("payload of {actual_len} bytes is shorter than the {min_len}-byte minimum framing")]
    MalformedPayload {
        /// Minimum well-formed payload length.
        min_len: usize,
        /// Actual payload length.
        actual_len: usize,
    },
    /// AEAD authentication failed: tampering, wrong key, or corruption.
    #[error("content decryption failed")]
    DecryptionFailure,
    /// Authenticated plaintext is not valid UTF-8.
    #[error("decrypted content is not valid UTF-8: {0}")]
    Encoding(String),
}

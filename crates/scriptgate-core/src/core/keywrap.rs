// crates/scriptgate-core/src/core/keywrap.rs
// ============================================================================
// Module: Symmetric Key Unwrap
// Description: RSA-OAEP unwrap of the one-time content encryption key.
// Purpose: Recover a 32-byte symmetric key from hex-encoded wrapped material.
// Dependencies: hex, rand, rsa, sha2, thiserror, zeroize
// ============================================================================

//! ## Overview
//! Producers wrap a one-time 32-byte symmetric key with the recipient's RSA
//! public key (OAEP, SHA-256 for both the hash and the MGF1 hash, no label)
//! and publish it hex-encoded. [`unwrap_key`] inverts that wrap with the
//! caller-supplied PEM private key. The unwrap is deterministic; there is no
//! randomness and no retry.
//! Invariants:
//! - The recovered key is exactly [`SYMMETRIC_KEY_LEN`] bytes.
//! - Key material is zeroed on drop and never appears in error messages.
//! - OAEP failures are reported with a single coarse message so callers
//!   cannot distinguish which internal padding check failed.
//!
//! Security posture: the wrapped key and the private key PEM are untrusted
//! inputs; parse failures fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rsa::Oaep;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::rand_core::CryptoRngCore;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length in bytes of the content encryption key (XChaCha20-Poly1305 key size).
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// PEM label marker for PKCS#1 private keys.
const PKCS1_PEM_MARKER: &str = "BEGIN RSA PRIVATE KEY";

// ============================================================================
// SECTION: Symmetric Key
// ============================================================================

/// A one-time content encryption key recovered from an asymmetric wrap.
///
/// # Invariants
/// - Exists only transiently, for the duration of one decryption.
/// - Zeroed on drop; never written to disk, logs, or error messages.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Wraps raw key bytes. Intended for producers and tests; the consumer
    /// path obtains keys through [`unwrap_key`].
    #[must_use]
    pub const fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes for cipher construction.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes are deliberately not printed.
        f.write_str("SymmetricKey(..)")
    }
}

// ============================================================================
// SECTION: Unwrap
// ============================================================================

/// Recovers the symmetric key from its hex-encoded asymmetric wrap.
///
/// # Errors
///
/// - [`KeyUnwrapError::Decoding`] when the wrapped key is not valid hex or
///   its decoded length does not match the RSA modulus size.
/// - [`KeyUnwrapError::KeyFormat`] when the PEM private key cannot be parsed.
/// - [`KeyUnwrapError::UnwrapFailure`] when OAEP decryption rejects the wrap
///   (wrong key, corrupted wrap, or padding-oracle-shaped input); the message
///   is deliberately generic.
pub fn unwrap_key(
    private_key_pem: &[u8],
    wrapped_key_hex: &str,
) -> Result<SymmetricKey, KeyUnwrapError> {
    let wrapped = hex::decode(wrapped_key_hex.trim())
        .map_err(|err| KeyUnwrapError::Decoding(format!("wrapped key is not valid hex: {err}")))?;
    let private_key = parse_private_key_pem(private_key_pem)?;
    if wrapped.len() != private_key.size() {
        return Err(KeyUnwrapError::Decoding(format!(
            "wrapped key length {} does not match the expected ciphertext size {}",
            wrapped.len(),
            private_key.size()
        )));
    }
    let mut recovered = private_key
        .decrypt(Oaep::new::<Sha256>(), &wrapped)
        .map_err(|_| KeyUnwrapError::UnwrapFailure)?;
    if recovered.len() != SYMMETRIC_KEY_LEN {
        recovered.zeroize();
        return Err(KeyUnwrapError::UnwrapFailure);
    }
    let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
    bytes.copy_from_slice(&recovered);
    recovered.zeroize();
    Ok(SymmetricKey::from_bytes(bytes))
}

/// Parses an unencrypted RSA private key from PKCS#8 or PKCS#1 PEM.
fn parse_private_key_pem(private_key_pem: &[u8]) -> Result<RsaPrivateKey, KeyUnwrapError> {
    let pem = std::str::from_utf8(private_key_pem)
        .map_err(|_| KeyUnwrapError::KeyFormat("private key PEM is not valid UTF-8".to_string()))?;
    if pem.contains(PKCS1_PEM_MARKER) {
        return RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|err| KeyUnwrapError::KeyFormat(format!("invalid PKCS#1 private key: {err}")));
    }
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|err| KeyUnwrapError::KeyFormat(format!("invalid PKCS#8 private key: {err}")))
}

// ============================================================================
// SECTION: Wrap (producer side)
// ============================================================================

/// Wraps a symmetric key with the recipient's RSA public key.
///
/// Producer-side inverse of [`unwrap_key`], used by publishing tooling and by
/// the round-trip tests.
///
/// # Errors
///
/// Returns [`KeyUnwrapError::UnwrapFailure`] when OAEP encryption fails
/// (message too long for the modulus).
pub fn wrap_key<R: CryptoRngCore>(
    rng: &mut R,
    public_key: &RsaPublicKey,
    key: &SymmetricKey,
) -> Result<String, KeyUnwrapError> {
    let wrapped = public_key
        .encrypt(rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|_| KeyUnwrapError::UnwrapFailure)?;
    Ok(hex::encode(wrapped))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key unwrap errors.
///
/// # Invariants
/// - [`KeyUnwrapError::UnwrapFailure`] carries no detail about which internal
///   check rejected the wrap.
#[derive(Debug, Error)]
pub enum KeyUnwrapError {
    /// Hex or length malformation of the wrapped key material.
    #[error("wrapped key decoding failed: {0}")]
    Decoding(String),
    /// The private key PEM could not be parsed.
    #[error("private key format error: {0}")]
    KeyFormat(String),
    /// Asymmetric decryption rejected the wrapped key.
    #[error("asymmetric key unwrap failed")]
    UnwrapFailure,
}

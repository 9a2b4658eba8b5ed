// crates/scriptgate-core/tests/crypto_tests.rs
// ============================================================================
// Module: Crypto Property Tests
// Description: Round-trip, tamper, and framing checks for the crypto modules.
// Purpose: Prove the testable properties of unwrap and decrypt.
// ============================================================================

//! ## Overview
//! Exercises the key unwrap and content decryption modules with fixed
//! vectors and randomized inputs:
//! - `decrypt(seal(P, K)) == P` for random keys and plaintexts.
//! - Round trips under every caller-chosen 24-byte nonce.
//! - Any single-byte flip of a valid payload fails authentication.
//! - `unwrap(priv, wrap(pub, K)) == K`; a different key pair fails coarsely.
//! - Payloads below the framing minimum are rejected before the cipher runs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::OnceLock;

use chacha20poly1305::XChaCha20Poly1305;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::KeyInit;
use chacha20poly1305::aead::generic_array::GenericArray;
use proptest::prelude::*;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use rsa::pkcs8::LineEnding;
use scriptgate_core::ContentError;
use scriptgate_core::EncryptedPayload;
use scriptgate_core::KeyUnwrapError;
use scriptgate_core::MIN_PAYLOAD_LEN;
use scriptgate_core::NONCE_LEN;
use scriptgate_core::SymmetricKey;
use scriptgate_core::decrypt_payload;
use scriptgate_core::seal_payload;
use scriptgate_core::unwrap_key;
use scriptgate_core::wrap_key;

/// RSA key size used by the test fixtures.
const TEST_RSA_BITS: usize = 2048;

/// Lazily generated RSA key pair shared across tests (keygen is slow).
fn test_keypair() -> &'static (RsaPrivateKey, String) {
    static KEYPAIR: OnceLock<(RsaPrivateKey, String)> = OnceLock::new();
    KEYPAIR.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut OsRng, TEST_RSA_BITS).expect("rsa keygen");
        let pem = private_key.to_pkcs8_pem(LineEnding::LF).expect("pkcs8 pem").to_string();
        (private_key, pem)
    })
}

/// A second, unrelated key pair for negative unwrap tests.
fn other_keypair() -> &'static (RsaPrivateKey, String) {
    static KEYPAIR: OnceLock<(RsaPrivateKey, String)> = OnceLock::new();
    KEYPAIR.get_or_init(|| {
        let private_key = RsaPrivateKey::new(&mut OsRng, TEST_RSA_BITS).expect("rsa keygen");
        let pem = private_key.to_pkcs8_pem(LineEnding::LF).expect("pkcs8 pem").to_string();
        (private_key, pem)
    })
}

// ============================================================================
// SECTION: Wrap/Unwrap Tests
// ============================================================================

#[test]
fn unwrap_recovers_wrapped_key() {
    let (private_key, pem) = test_keypair();
    let key = SymmetricKey::from_bytes([7u8; 32]);
    let wrapped_hex =
        wrap_key(&mut OsRng, &private_key.to_public_key(), &key).expect("wrap key");

    let recovered = unwrap_key(pem.as_bytes(), &wrapped_hex).expect("unwrap key");
    assert_eq!(recovered.as_bytes(), key.as_bytes());
}

#[test]
fn unwrap_with_wrong_private_key_fails_coarsely() {
    let (private_key, _) = test_keypair();
    let (_, other_pem) = other_keypair();
    let key = SymmetricKey::from_bytes([42u8; 32]);
    let wrapped_hex =
        wrap_key(&mut OsRng, &private_key.to_public_key(), &key).expect("wrap key");

    let err = unwrap_key(other_pem.as_bytes(), &wrapped_hex).unwrap_err();
    assert!(matches!(err, KeyUnwrapError::UnwrapFailure));
    // The message must not leak which internal check rejected the wrap.
    assert_eq!(err.to_string(), "asymmetric key unwrap failed");
}

#[test]
fn unwrap_rejects_non_hex_wrapped_key() {
    let (_, pem) = test_keypair();
    let err = unwrap_key(pem.as_bytes(), "zz-not-hex").unwrap_err();
    assert!(matches!(err, KeyUnwrapError::Decoding(_)));
}

#[test]
fn unwrap_rejects_wrapped_key_of_wrong_length() {
    let (_, pem) = test_keypair();
    let err = unwrap_key(pem.as_bytes(), "deadbeef").unwrap_err();
    assert!(matches!(err, KeyUnwrapError::Decoding(_)));
}

#[test]
fn unwrap_rejects_unparseable_pem() {
    let err = unwrap_key(b"not a pem", &"00".repeat(256)).unwrap_err();
    assert!(matches!(err, KeyUnwrapError::KeyFormat(_)));
}

// ============================================================================
// SECTION: Content Round-Trip Properties
// ============================================================================

proptest! {
    #[test]
    fn seal_then_decrypt_round_trips(key in any::<[u8; 32]>(), plaintext in ".{0,256}") {
        let key = SymmetricKey::from_bytes(key);
        let payload = seal_payload(&plaintext, &key).expect("seal");
        let recovered = decrypt_payload(&payload, &key).expect("decrypt");
        prop_assert_eq!(recovered.as_str(), plaintext);
    }

    #[test]
    fn decrypt_round_trips_for_any_nonce(
        key in any::<[u8; 32]>(),
        nonce in any::<[u8; 24]>(),
        plaintext in ".{0,256}",
    ) {
        let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key));
        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&nonce), plaintext.as_bytes())
            .expect("encrypt");
        let mut framed = nonce.to_vec();
        framed.extend_from_slice(&ciphertext);

        let key = SymmetricKey::from_bytes(key);
        let recovered =
            decrypt_payload(&EncryptedPayload::from_bytes(framed), &key).expect("decrypt");
        prop_assert_eq!(recovered.as_str(), plaintext);
    }

    #[test]
    fn any_single_byte_flip_fails_authentication(
        key in any::<[u8; 32]>(),
        plaintext in ".{1,128}",
        flip in any::<prop::sample::Index>(),
    ) {
        let key = SymmetricKey::from_bytes(key);
        let payload = seal_payload(&plaintext, &key).expect("seal");
        let mut tampered = payload.into_bytes();
        let index = flip.index(tampered.len());
        tampered[index] ^= 0x01;

        let result = decrypt_payload(&EncryptedPayload::from_bytes(tampered), &key);
        prop_assert!(matches!(result, Err(ContentError::DecryptionFailure)));
    }

    #[test]
    fn short_payloads_are_rejected_before_the_cipher(
        key in any::<[u8; 32]>(),
        bytes in proptest::collection::vec(any::<u8>(), 0..MIN_PAYLOAD_LEN),
    ) {
        let key = SymmetricKey::from_bytes(key);
        let actual_len = bytes.len();
        let result = decrypt_payload(&EncryptedPayload::from_bytes(bytes), &key);
        prop_assert_eq!(
            result.unwrap_err(),
            ContentError::MalformedPayload {
                min_len: MIN_PAYLOAD_LEN,
                actual_len,
            }
        );
    }
}

// ============================================================================
// SECTION: Encoding Tests
// ============================================================================

#[test]
fn authenticated_non_utf8_plaintext_is_an_encoding_error() {
    let key_bytes = [3u8; 32];
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(&key_bytes));
    let nonce = [9u8; NONCE_LEN];
    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), &[0xff, 0xfe, 0x00][..])
        .expect("encrypt");
    let mut framed = nonce.to_vec();
    framed.extend_from_slice(&ciphertext);

    let key = SymmetricKey::from_bytes(key_bytes);
    let err = decrypt_payload(&EncryptedPayload::from_bytes(framed), &key).unwrap_err();
    assert!(matches!(err, ContentError::Encoding(_)));
}

#[test]
fn decryption_failure_message_is_coarse() {
    let key = SymmetricKey::from_bytes([1u8; 32]);
    let bogus = vec![0u8; MIN_PAYLOAD_LEN];
    let err = decrypt_payload(&EncryptedPayload::from_bytes(bogus), &key).unwrap_err();
    assert_eq!(err.to_string(), "content decryption failed");
}

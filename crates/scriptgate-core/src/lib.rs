// crates/scriptgate-core/src/lib.rs
// ============================================================================
// Module: Script Gate Core Library
// Description: Secure delivery-and-execution pipeline for remote scripts.
// Purpose: Reconstruct plaintext from fetched bytes and gate execution.
// Dependencies: chacha20poly1305, hex, rsa, serde, tempfile, thiserror, zeroize
// ============================================================================

//! ## Overview
//! Script Gate Core turns raw fetched bytes plus side-channel metadata into a
//! plaintext script and routes it to an interpreter behind a confirmation
//! gate. The pipeline is synchronous and single-threaded; the only suspension
//! point is the confirmation prompt supplied by the caller.
//! Invariants:
//! - Encrypted payloads are never partially decrypted and executed.
//! - The symmetric key exists only for the duration of one decryption.
//! - Temporary script files are deleted on every exit path.
//!
//! Security posture: all fetched content is untrusted until the caller
//! explicitly confirms execution; in-process evaluation is disabled unless a
//! [`NativeEngine`] is registered.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::content::ContentError;
pub use core::content::EncryptedPayload;
pub use core::content::MIN_PAYLOAD_LEN;
pub use core::content::NONCE_LEN;
pub use core::content::PlaintextScript;
pub use core::content::TAG_LEN;
pub use core::content::decrypt_payload;
pub use core::content::seal_payload;
pub use core::interpreter::DEFAULT_NATIVE_MARKER;
pub use core::interpreter::ExecutionMode;
pub use core::interpreter::classify;
pub use core::keywrap::KeyUnwrapError;
pub use core::keywrap::SYMMETRIC_KEY_LEN;
pub use core::keywrap::SymmetricKey;
pub use core::keywrap::unwrap_key;
pub use core::keywrap::wrap_key;
pub use core::metadata::MetadataError;
pub use core::metadata::ScriptMetadata;
pub use core::metadata::ScriptSource;
pub use runtime::dispatcher::CapturedOutput;
pub use runtime::dispatcher::ConfirmationGate;
pub use runtime::dispatcher::DispatchError;
pub use runtime::dispatcher::DispatchOutcome;
pub use runtime::dispatcher::DispatchRequest;
pub use runtime::dispatcher::DispatchState;
pub use runtime::dispatcher::Dispatcher;
pub use runtime::dispatcher::NativeBindings;
pub use runtime::dispatcher::NativeEngine;
pub use runtime::dispatcher::OutputMode;

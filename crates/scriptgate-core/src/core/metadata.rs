// crates/scriptgate-core/src/core/metadata.rs
// ============================================================================
// Module: Script Metadata Model
// Description: Typed side-channel metadata returned alongside script bytes.
// Purpose: Carry encryption flags and wrapped key material between layers.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`ScriptMetadata`] is a pure data holder produced by the transport layer
//! and consumed by the execution dispatcher. It has no behavior beyond
//! validation of the wrapped-key invariant.
//! Invariants:
//! - `encrypted == false` implies decryption is never attempted, regardless
//!   of the other fields.
//! - `wrapped_key` must be present and non-empty when `encrypted` is true and
//!   a decryption is attempted; its absence is a fatal error for that
//!   attempt, never a silent fallback.
//!
//! Security posture: metadata originates from an untrusted remote host; the
//! `checksum` and `key_id` fields are opaque pass-through values and are not
//! interpreted locally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Script Source
// ============================================================================

/// Identity of a fetched script: owning account plus script name.
///
/// # Invariants
/// - Displayed as `owner/name` in all user-facing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSource {
    /// Username of the script owner.
    pub owner: String,
    /// Script name as published.
    pub name: String,
}

impl ScriptSource {
    /// Creates a script source from owner and name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ============================================================================
// SECTION: Script Metadata
// ============================================================================

/// Side-channel metadata describing one fetched script payload.
///
/// # Invariants
/// - Created per fetch, consumed once, then discarded.
/// - `version`, `checksum`, and `key_id` are opaque and passed through
///   unmodified; the core never verifies the checksum locally (integrity is
///   delegated to the transport layer and, for encrypted bodies, to the
///   AEAD tag).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    /// Whether the payload bytes require decryption.
    pub encrypted: bool,
    /// Opaque version tag.
    pub version: Option<String>,
    /// Opaque integrity tag, not independently verified by the core.
    pub checksum: Option<String>,
    /// Identifies which key pair the wrap was produced for. Informational
    /// only; never used to select a local key.
    pub key_id: Option<String>,
    /// Hex-encoded asymmetrically wrapped symmetric key.
    pub wrapped_key: Option<String>,
}

impl ScriptMetadata {
    /// Metadata for an unencrypted payload.
    #[must_use]
    pub const fn plaintext() -> Self {
        Self {
            encrypted: false,
            version: None,
            checksum: None,
            key_id: None,
            wrapped_key: None,
        }
    }

    /// Returns the wrapped key required for a decryption attempt.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::MissingWrappedKey`] when the payload is
    /// marked encrypted but no non-empty wrapped key is present.
    pub fn wrapped_key_for_unwrap(&self) -> Result<&str, MetadataError> {
        match self.wrapped_key.as_deref() {
            Some(wrapped) if !wrapped.trim().is_empty() => Ok(wrapped),
            _ => Err(MetadataError::MissingWrappedKey),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metadata validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// Payload is marked encrypted but carries no wrapped key.
    #[error("payload is marked encrypted but no wrapped key was provided")]
    MissingWrappedKey,
}

// crates/scriptgate-client/src/lib.rs
// ============================================================================
// Module: Script Gate Client Library
// Description: HTTP transport and local configuration for Script Gate.
// Purpose: Fetch script bytes plus side-channel metadata for the pipeline.
// Dependencies: reqwest, scriptgate-core, serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! The client crate is the transport collaborator of the pipeline: it fetches
//! a named script from a remote host and parses the side-channel response
//! headers into [`scriptgate_core::ScriptMetadata`]. It also owns the local
//! TOML configuration file.
//! Invariants:
//! - Network failures are surfaced immediately and never retried here.
//! - Response bodies are size-capped; redirects are rejected.
//!
//! Security posture: the remote host and the local config file are untrusted
//! inputs; parsing fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ClientConfig;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use transport::Credentials;
pub use transport::HttpTransport;
pub use transport::MAX_RESPONSE_BYTES;
pub use transport::ScriptFetch;
pub use transport::ScriptQuery;
pub use transport::TransportError;

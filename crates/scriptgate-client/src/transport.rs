// crates/scriptgate-client/src/transport.rs
// ============================================================================
// Module: Script Gate HTTP Transport
// Description: Blocking HTTP fetch of script bytes and metadata headers.
// Purpose: Resolve `owner/script[@version]` into payload bytes plus metadata.
// Dependencies: reqwest, scriptgate-core, thiserror, url
// ============================================================================

//! ## Overview
//! [`HttpTransport`] fetches `GET {base}/{owner}/{script}[@{version}]` and
//! parses the side-channel headers (`X-Encrypted`, `X-Script-Version`,
//! `X-Script-Checksum`, `X-Encryption-KeyID`, `X-Wrapped-Key`) into a
//! [`ScriptMetadata`]. Non-success status codes fail closed.
//! Invariants:
//! - Redirects are rejected.
//! - Response bodies are capped at [`MAX_RESPONSE_BYTES`].
//! - Credentials are an explicit constructed value; there is no implicit
//!   shared session state.
//! - Transport failures are surfaced immediately; retry policy, if any,
//!   belongs to the caller.
//!
//! Security posture: the remote host is untrusted; header values are parsed
//! defensively and oversized bodies are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::redirect::Policy;
use scriptgate_core::ScriptMetadata;
use scriptgate_core::ScriptSource;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted response body size in bytes.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

/// Request timeout for fetches.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the encryption flag.
const HEADER_ENCRYPTED: &str = "X-Encrypted";
/// Header carrying the opaque script version tag.
const HEADER_VERSION: &str = "X-Script-Version";
/// Header carrying the opaque checksum tag.
const HEADER_CHECKSUM: &str = "X-Script-Checksum";
/// Header identifying the wrapping key pair.
const HEADER_KEY_ID: &str = "X-Encryption-KeyID";
/// Header carrying the hex-encoded wrapped symmetric key.
const HEADER_WRAPPED_KEY: &str = "X-Wrapped-Key";

// ============================================================================
// SECTION: Request and Response Types
// ============================================================================

/// Authentication for outbound requests.
///
/// # Invariants
/// - Carried explicitly by the transport value; never global.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    /// No authentication (public scripts only).
    #[default]
    Anonymous,
    /// Bearer token authentication.
    Bearer(String),
    /// API credential pair (client id and secret) sent as basic auth.
    Basic {
        /// API client identifier.
        client_id: String,
        /// API client secret.
        client_secret: String,
    },
}

/// One script fetch request: identity plus optional selectors.
///
/// # Invariants
/// - `version` and `share_token` are passed through to the server unmodified
///   and are not interpreted locally.
#[derive(Debug, Clone)]
pub struct ScriptQuery {
    /// Identity of the script to fetch.
    pub source: ScriptSource,
    /// Optional version tag appended as `@{version}`.
    pub version: Option<String>,
    /// Optional share token for private scripts.
    pub share_token: Option<String>,
}

impl ScriptQuery {
    /// Creates a query for the latest version with no share token.
    #[must_use]
    pub const fn new(source: ScriptSource) -> Self {
        Self {
            source,
            version: None,
            share_token: None,
        }
    }
}

/// A fetched script: raw body plus parsed side-channel metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFetch {
    /// Raw response body: ciphertext+nonce if encrypted, else plaintext.
    pub body: Vec<u8>,
    /// Parsed side-channel metadata.
    pub metadata: ScriptMetadata,
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Blocking HTTP transport for script fetches.
///
/// # Invariants
/// - Redirects are rejected.
/// - Responses exceeding [`MAX_RESPONSE_BYTES`] are rejected.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client used for fetch requests.
    client: Client,
    /// Base URL of the script host.
    base_url: Url,
    /// Authentication attached to every request.
    credentials: Credentials,
}

impl HttpTransport {
    /// Builds a transport for the given base URL with anonymous credentials.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_credentials(base_url, Credentials::Anonymous)
    }

    /// Builds a transport with explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn with_credentials(
        base_url: &str,
        credentials: Credentials,
    ) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(TransportError::InvalidUrl(format!("unsupported scheme: {scheme}")));
            }
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Fetches script bytes and side-channel metadata.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidUrl`] when the owner/script path cannot be
    ///   joined onto the base URL.
    /// - [`TransportError::Http`] on connection failure or redirect.
    /// - [`TransportError::Status`] on a non-success status code.
    /// - [`TransportError::TooLarge`] when the body exceeds
    ///   [`MAX_RESPONSE_BYTES`].
    /// - [`TransportError::Header`] when a metadata header is not valid
    ///   visible ASCII.
    pub fn fetch(&self, query: &ScriptQuery) -> Result<ScriptFetch, TransportError> {
        let url = self.fetch_url(query)?;
        let response = self
            .authorize(self.client.get(url.clone()))
            .send()
            .map_err(|err| TransportError::Http(err.to_string()))?;
        if response.url() != &url {
            return Err(TransportError::Http(format!(
                "redirected from {} to {}",
                url,
                response.url()
            )));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        let metadata = parse_metadata(response.headers())?;
        let max_bytes = max_response_bytes_u64()?;
        if let Some(length) = response.content_length()
            && length > max_bytes
        {
            return Err(TransportError::TooLarge {
                max_bytes: MAX_RESPONSE_BYTES,
            });
        }
        let mut limited = response.take(max_bytes.saturating_add(1));
        let mut body = Vec::new();
        limited.read_to_end(&mut body).map_err(|err| TransportError::Http(err.to_string()))?;
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(TransportError::TooLarge {
                max_bytes: MAX_RESPONSE_BYTES,
            });
        }
        Ok(ScriptFetch {
            body,
            metadata,
        })
    }

    /// Builds the fetch URL `{base}/{owner}/{script}[@{version}][?token=..]`.
    fn fetch_url(&self, query: &ScriptQuery) -> Result<Url, TransportError> {
        let script_path = query.version.as_deref().map_or_else(
            || query.source.name.clone(),
            |version| format!("{}@{version}", query.source.name),
        );
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&query.source.owner)
            .push(&script_path);
        if let Some(token) = query.share_token.as_deref() {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// Attaches the configured credentials to a request.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Basic {
                client_id,
                client_secret,
            } => request.basic_auth(client_id, Some(client_secret)),
        }
    }
}

/// Returns the response size cap as a `u64` without lossy casts.
fn max_response_bytes_u64() -> Result<u64, TransportError> {
    u64::try_from(MAX_RESPONSE_BYTES).map_err(|_| TransportError::TooLarge {
        max_bytes: MAX_RESPONSE_BYTES,
    })
}

// ============================================================================
// SECTION: Header Parsing
// ============================================================================

/// Parses the side-channel response headers into script metadata.
fn parse_metadata(headers: &reqwest::header::HeaderMap) -> Result<ScriptMetadata, TransportError> {
    Ok(ScriptMetadata {
        encrypted: header_value(headers, HEADER_ENCRYPTED)?.as_deref() == Some("true"),
        version: header_value(headers, HEADER_VERSION)?,
        checksum: header_value(headers, HEADER_CHECKSUM)?,
        key_id: header_value(headers, HEADER_KEY_ID)?,
        wrapped_key: header_value(headers, HEADER_WRAPPED_KEY)?,
    })
}

/// Reads an optional header as a string, failing on non-ASCII values.
fn header_value(
    headers: &reqwest::header::HeaderMap,
    name: &str,
) -> Result<Option<String>, TransportError> {
    headers.get(name).map_or(Ok(None), |value| {
        value
            .to_str()
            .map(|text| Some(text.to_string()))
            .map_err(|_| TransportError::Header(format!("header {name} is not valid ASCII")))
    })
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport errors.
///
/// # Invariants
/// - Never retried by this crate; surfaced immediately to the caller.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The base URL or fetch path is invalid.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// Connection failure, redirect, or body read failure.
    #[error("http transport failure: {0}")]
    Http(String),
    /// Non-success HTTP status.
    #[error("http status {0}")]
    Status(u16),
    /// Response body exceeded the size cap.
    #[error("response exceeds the {max_bytes}-byte limit")]
    TooLarge {
        /// Maximum accepted body size.
        max_bytes: usize,
    },
    /// A metadata header could not be parsed.
    #[error("metadata header error: {0}")]
    Header(String),
}

// crates/scriptgate-client/tests/transport_tests.rs
// ============================================================================
// Module: HTTP Transport Tests
// Description: Fetch behavior against in-process HTTP fixture servers.
// Purpose: Prove metadata parsing, authentication, and fail-closed guards.
// ============================================================================

//! ## Overview
//! Each test spins up a `tiny_http` server on an ephemeral port, serves one
//! scripted response, and asserts on the transport's result and on the
//! request the server actually received.

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

use std::thread;
use std::thread::JoinHandle;

use scriptgate_client::Credentials;
use scriptgate_client::HttpTransport;
use scriptgate_client::MAX_RESPONSE_BYTES;
use scriptgate_client::ScriptQuery;
use scriptgate_client::TransportError;
use scriptgate_core::ScriptSource;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// What the fixture server saw in the one request it handled.
struct SeenRequest {
    url: String,
    authorization: Option<String>,
}

/// Serves exactly one request with the given status, headers, and body,
/// returning what the server observed.
fn serve_one(
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
) -> (String, JoinHandle<SeenRequest>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let addr = server.server_addr();
    let handle = thread::spawn(move || {
        let request = server.recv().expect("receive request");
        let seen = SeenRequest {
            url: request.url().to_string(),
            authorization: request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string()),
        };
        let mut response = Response::from_data(body).with_status_code(status);
        for (name, value) in headers {
            response.add_header(Header::from_bytes(name, value).expect("header"));
        }
        // The client may hang up early (size-cap tests), so a failed write
        // here is not an error.
        let _ = request.respond(response);
        seen
    });
    (format!("http://{addr}"), handle)
}

fn query(owner: &str, name: &str) -> ScriptQuery {
    ScriptQuery::new(ScriptSource {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

// ============================================================================
// SECTION: Success Path Tests
// ============================================================================

#[test]
fn fetch_parses_metadata_headers_and_body() {
    let (base, handle) = serve_one(
        200,
        vec![
            ("X-Encrypted", "true".to_string()),
            ("X-Script-Version", "v7".to_string()),
            ("X-Script-Checksum", "abc123".to_string()),
            ("X-Encryption-KeyID", "key-1".to_string()),
            ("X-Wrapped-Key", "deadbeef".to_string()),
        ],
        b"ciphertext-bytes".to_vec(),
    );

    let transport = HttpTransport::new(&base).expect("transport");
    let fetch = transport.fetch(&query("alice", "deploy")).expect("fetch");

    assert_eq!(fetch.body, b"ciphertext-bytes");
    assert!(fetch.metadata.encrypted);
    assert_eq!(fetch.metadata.version.as_deref(), Some("v7"));
    assert_eq!(fetch.metadata.checksum.as_deref(), Some("abc123"));
    assert_eq!(fetch.metadata.key_id.as_deref(), Some("key-1"));
    assert_eq!(fetch.metadata.wrapped_key.as_deref(), Some("deadbeef"));

    let seen = handle.join().expect("server thread");
    assert_eq!(seen.url, "/alice/deploy");
}

#[test]
fn response_without_headers_is_plaintext_metadata() {
    let (base, handle) = serve_one(200, Vec::new(), b"#!/bin/bash\necho hi\n".to_vec());

    let transport = HttpTransport::new(&base).expect("transport");
    let fetch = transport.fetch(&query("alice", "hello")).expect("fetch");

    assert!(!fetch.metadata.encrypted);
    assert_eq!(fetch.metadata.wrapped_key, None);
    assert_eq!(fetch.body, b"#!/bin/bash\necho hi\n");

    handle.join().expect("server thread");
}

#[test]
fn version_and_token_shape_the_request_url() {
    let (base, handle) = serve_one(200, Vec::new(), b"ok".to_vec());

    let mut query = query("alice", "deploy");
    query.version = Some("v2".to_string());
    query.share_token = Some("s3cret".to_string());

    let transport = HttpTransport::new(&base).expect("transport");
    transport.fetch(&query).expect("fetch");

    let seen = handle.join().expect("server thread");
    assert_eq!(seen.url, "/alice/deploy@v2?token=s3cret");
}

#[test]
fn bearer_credentials_are_sent_as_authorization() {
    let (base, handle) = serve_one(200, Vec::new(), b"ok".to_vec());

    let transport =
        HttpTransport::with_credentials(&base, Credentials::Bearer("tok-123".to_string()))
            .expect("transport");
    transport.fetch(&query("alice", "deploy")).expect("fetch");

    let seen = handle.join().expect("server thread");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-123"));
}

#[test]
fn anonymous_credentials_send_no_authorization() {
    let (base, handle) = serve_one(200, Vec::new(), b"ok".to_vec());

    let transport = HttpTransport::new(&base).expect("transport");
    transport.fetch(&query("alice", "deploy")).expect("fetch");

    let seen = handle.join().expect("server thread");
    assert_eq!(seen.authorization, None);
}

// ============================================================================
// SECTION: Fail-Closed Tests
// ============================================================================

#[test]
fn non_success_status_fails_closed() {
    let (base, handle) = serve_one(404, Vec::new(), b"not found".to_vec());

    let transport = HttpTransport::new(&base).expect("transport");
    let err = transport.fetch(&query("alice", "missing")).expect_err("status error");

    assert!(matches!(err, TransportError::Status(404)));
    handle.join().expect("server thread");
}

#[test]
fn redirects_are_not_followed() {
    let (base, handle) = serve_one(
        302,
        vec![("Location", "http://127.0.0.1:1/elsewhere".to_string())],
        Vec::new(),
    );

    let transport = HttpTransport::new(&base).expect("transport");
    let err = transport.fetch(&query("alice", "moved")).expect_err("redirect error");

    assert!(matches!(err, TransportError::Status(302)));
    handle.join().expect("server thread");
}

#[test]
fn oversized_body_is_rejected() {
    let body = vec![b'a'; MAX_RESPONSE_BYTES + 1];
    let (base, handle) = serve_one(200, Vec::new(), body);

    let transport = HttpTransport::new(&base).expect("transport");
    let err = transport.fetch(&query("alice", "huge")).expect_err("size error");

    assert!(matches!(err, TransportError::TooLarge { .. }));
    handle.join().expect("server thread");
}

#[test]
fn non_http_scheme_is_rejected_at_construction() {
    let err = HttpTransport::new("ftp://example.invalid").expect_err("scheme error");
    assert!(matches!(err, TransportError::InvalidUrl(_)));
}

#[test]
fn unparseable_base_url_is_rejected() {
    let err = HttpTransport::new("not a url").expect_err("parse error");
    assert!(matches!(err, TransportError::InvalidUrl(_)));
}

// crates/scriptgate-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Execution Dispatcher
// Description: Linear state machine from fetched bytes to an execution result.
// Purpose: Gate execution on confirmation and guarantee temp-file cleanup.
// Dependencies: crate::core, serde_json, tempfile, thiserror
// ============================================================================

//! ## Overview
//! One [`Dispatcher`] invocation walks the linear state machine
//! `Fetched → (Decrypted) → Classified → AwaitingConfirmation →
//! {Cancelled | Confirmed} → Materialized → Executed → CleanedUp`.
//! Invariants:
//! - A payload marked encrypted without a supplied key short-circuits to
//!   returning the raw bytes; execution is never attempted on ciphertext.
//! - Decryption failures abort the invocation before any execution attempt.
//! - Cancellation at the confirmation gate is a normal terminal outcome, not
//!   an error, and creates no temporary files.
//! - Each invocation owns its uniquely named temporary file exclusively, and
//!   deletion is guaranteed on every exit path (scoped drop guard, not
//!   best-effort cleanup code).
//! - In-process evaluation requires an explicitly registered
//!   [`NativeEngine`]; without one the native path fails with
//!   [`DispatchError::NativeExecutionDisabled`].
//!
//! The pipeline is synchronous and blocking. The confirmation gate and the
//! spawned child may block indefinitely; time-bounded behavior, if needed,
//! must be imposed by the host around this call.
//!
//! Security posture: plaintext reaching this module is remote-authored and
//! untrusted; the confirmation gate and the disabled-by-default native
//! engine are the trust boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;

use tempfile::TempPath;
use thiserror::Error;

use crate::core::content::ContentError;
use crate::core::content::EncryptedPayload;
use crate::core::content::PlaintextScript;
use crate::core::content::decrypt_payload;
use crate::core::interpreter::DEFAULT_NATIVE_MARKER;
use crate::core::interpreter::ExecutionMode;
use crate::core::interpreter::classify;
use crate::core::keywrap::KeyUnwrapError;
use crate::core::keywrap::unwrap_key;
use crate::core::metadata::MetadataError;
use crate::core::metadata::ScriptMetadata;
use crate::core::metadata::ScriptSource;

// ============================================================================
// SECTION: Collaborator Traits
// ============================================================================

/// Synchronous yes/no confirmation seam.
///
/// Implementations present the full plaintext and the source identity to the
/// user and block until an answer is available. This is the sole suspension
/// point in the pipeline.
pub trait ConfirmationGate {
    /// Returns `Ok(true)` only on an explicit affirmative response.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Prompt`] when the interactive stream fails.
    fn confirm(&mut self, source: &ScriptSource, plaintext: &str) -> Result<bool, DispatchError>;
}

/// Binding set produced by in-process evaluation.
pub type NativeBindings = BTreeMap<String, serde_json::Value>;

/// Embedded script interpreter plugin point.
///
/// In-process evaluation of remote text is the single highest-risk path in
/// this system: it has no sandboxing and inherently trusts the remote
/// author. It is therefore disabled unless the host registers an engine via
/// [`Dispatcher::with_native_engine`].
pub trait NativeEngine {
    /// Marker identifying this engine's runtime in shebang lines.
    fn shebang_marker(&self) -> &str {
        DEFAULT_NATIVE_MARKER
    }

    /// Evaluates plaintext in a fresh, isolated execution context and
    /// returns the resulting bindings.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ExecutionFailure`] when evaluation fails.
    fn evaluate(&mut self, plaintext: &str) -> Result<NativeBindings, DispatchError>;
}

// ============================================================================
// SECTION: Request and Outcome Types
// ============================================================================

/// Child process output handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Forward the child's stdout/stderr to the caller's streams.
    #[default]
    Inherit,
    /// Capture the child's stdout/stderr and return them in the outcome.
    Capture,
}

/// Captured stdout/stderr of an executed foreign-interpreter script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Raw bytes written to stdout.
    pub stdout: Vec<u8>,
    /// Raw bytes written to stderr.
    pub stderr: Vec<u8>,
}

/// One pipeline invocation: fetched bytes plus caller intent.
///
/// # Invariants
/// - `body` and `metadata` describe the same fetch response.
/// - `private_key_pem` is borrowed conceptually from the caller: it is used
///   for at most one unwrap and never persisted or logged.
#[derive(Debug)]
pub struct DispatchRequest {
    /// Identity of the fetched script (owner and name).
    pub source: ScriptSource,
    /// Side-channel metadata for the fetch.
    pub metadata: ScriptMetadata,
    /// Raw response body: ciphertext+nonce if encrypted, else plaintext.
    pub body: Vec<u8>,
    /// Optional PEM-encoded private key for unwrapping the content key.
    pub private_key_pem: Option<Vec<u8>>,
    /// Skip the confirmation gate when true.
    pub accept: bool,
    /// Execute the script; when false the plaintext is returned unexecuted.
    pub execute: bool,
    /// Positional arguments forwarded to a foreign interpreter.
    pub args: Vec<String>,
    /// Child process output handling.
    pub output: OutputMode,
}

impl DispatchRequest {
    /// Creates a fetch-only request with no key, no auto-accept, and no
    /// execution.
    #[must_use]
    pub const fn new(source: ScriptSource, metadata: ScriptMetadata, body: Vec<u8>) -> Self {
        Self {
            source,
            metadata,
            body,
            private_key_pem: None,
            accept: false,
            execute: false,
            args: Vec::new(),
            output: OutputMode::Inherit,
        }
    }
}

/// Terminal result of one pipeline invocation.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Plaintext returned without execution (`execute == false`).
    Plaintext(PlaintextScript),
    /// Raw encrypted bytes returned because no key was supplied; the caller
    /// must explicitly re-invoke with a key.
    EncryptedPassthrough(Vec<u8>),
    /// The user declined confirmation. A deliberate no-op, not an error.
    Cancelled,
    /// A foreign-interpreter script ran to completion.
    Exited {
        /// Child process exit code (may be non-zero).
        code: i32,
        /// Captured output when [`OutputMode::Capture`] was requested.
        output: Option<CapturedOutput>,
        /// Path the script was materialized to. The file is already deleted
        /// by the time the outcome is returned; the path is reported for
        /// audit purposes only.
        script_path: PathBuf,
    },
    /// A native script was evaluated in-process.
    Evaluated(NativeBindings),
}

/// Dispatcher state machine positions.
///
/// # Invariants
/// - States advance strictly left to right; `Cancelled` and `CleanedUp` are
///   terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Raw bytes and metadata received from the transport layer.
    Fetched,
    /// Payload decrypted to plaintext.
    Decrypted,
    /// Execution mode resolved from the shebang line.
    Classified,
    /// Blocked on the synchronous confirmation prompt.
    AwaitingConfirmation,
    /// The user declined confirmation; no execution occurred.
    Cancelled,
    /// Execution was confirmed (or pre-accepted by the caller).
    Confirmed,
    /// Plaintext written to an executable temporary file.
    Materialized,
    /// The script ran (child process or native engine).
    Executed,
    /// Temporary resources released.
    CleanedUp,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Linear per-invocation execution dispatcher.
///
/// # Invariants
/// - Single-threaded and blocking; one invocation at a time.
/// - [`Dispatcher::state`] reflects the furthest state reached by the most
///   recent invocation, including the cleanup performed on failure paths.
#[derive(Default)]
pub struct Dispatcher {
    /// Optional in-process evaluation engine (disabled by default).
    engine: Option<Box<dyn NativeEngine>>,
    /// Furthest state reached by the most recent invocation.
    state: Option<DispatchState>,
}

impl Dispatcher {
    /// Creates a dispatcher with in-process evaluation disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an embedded script interpreter for the native path.
    #[must_use]
    pub fn with_native_engine(mut self, engine: Box<dyn NativeEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Returns the furthest state reached by the most recent invocation.
    #[must_use]
    pub const fn state(&self) -> Option<DispatchState> {
        self.state
    }

    /// Runs one pipeline invocation to a terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on metadata, unwrap, decryption, prompt, or
    /// execution failure. Every failure aborts the invocation; none are
    /// retried here. Cancellation is reported as
    /// [`DispatchOutcome::Cancelled`], never as an error.
    pub fn dispatch(
        &mut self,
        request: DispatchRequest,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.state = Some(DispatchState::Fetched);
        let DispatchRequest {
            source,
            metadata,
            body,
            private_key_pem,
            accept,
            execute,
            args,
            output,
        } = request;

        let plaintext = if metadata.encrypted {
            let Some(pem) = private_key_pem else {
                return Ok(DispatchOutcome::EncryptedPassthrough(body));
            };
            let wrapped_hex = metadata.wrapped_key_for_unwrap()?;
            // The unwrapped key lives only for the scope of this call and is
            // zeroed when it drops.
            let key = unwrap_key(&pem, wrapped_hex)?;
            let plaintext = decrypt_payload(&EncryptedPayload::from_bytes(body), &key)?;
            self.state = Some(DispatchState::Decrypted);
            plaintext
        } else {
            let text = String::from_utf8(body)
                .map_err(|err| ContentError::Encoding(err.utf8_error().to_string()))?;
            PlaintextScript::new(text)
        };

        if !execute {
            return Ok(DispatchOutcome::Plaintext(plaintext));
        }

        let marker = self
            .engine
            .as_ref()
            .map_or_else(|| DEFAULT_NATIVE_MARKER.to_string(), |engine| {
                engine.shebang_marker().to_string()
            });
        let mode = classify(plaintext.as_str(), &marker);
        self.state = Some(DispatchState::Classified);

        if accept {
            self.state = Some(DispatchState::Confirmed);
        } else {
            self.state = Some(DispatchState::AwaitingConfirmation);
            if !gate.confirm(&source, plaintext.as_str())? {
                self.state = Some(DispatchState::Cancelled);
                return Ok(DispatchOutcome::Cancelled);
            }
            self.state = Some(DispatchState::Confirmed);
        }

        match mode {
            ExecutionMode::Native => {
                let Some(engine) = self.engine.as_mut() else {
                    return Err(DispatchError::NativeExecutionDisabled);
                };
                let bindings = engine.evaluate(plaintext.as_str())?;
                self.state = Some(DispatchState::Executed);
                Ok(DispatchOutcome::Evaluated(bindings))
            }
            ExecutionMode::ForeignInterpreter {
                ..
            } => self.run_foreign(&plaintext, &args, output),
        }
    }

    /// Materializes, spawns, and cleans up a foreign-interpreter script.
    fn run_foreign(
        &mut self,
        plaintext: &PlaintextScript,
        args: &[String],
        output: OutputMode,
    ) -> Result<DispatchOutcome, DispatchError> {
        let temp = materialize(plaintext)?;
        self.state = Some(DispatchState::Materialized);
        let spawn_result = spawn_script(&temp, args, output);
        if spawn_result.is_ok() {
            self.state = Some(DispatchState::Executed);
        }
        let script_path = temp.to_path_buf();
        // Dropping the TempPath deletes the file on every exit path,
        // including spawn failure.
        drop(temp);
        self.state = Some(DispatchState::CleanedUp);
        let (code, captured) = spawn_result?;
        Ok(DispatchOutcome::Exited {
            code,
            output: captured,
            script_path,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("native_engine", &self.engine.is_some())
            .field("state", &self.state)
            .finish()
    }
}

// ============================================================================
// SECTION: Materialization and Spawn
// ============================================================================

/// Writes plaintext to a uniquely named, owner-only executable temp file.
fn materialize(plaintext: &PlaintextScript) -> Result<TempPath, DispatchError> {
    let mut file = tempfile::Builder::new()
        .prefix("scriptgate-")
        .suffix(".sh")
        .tempfile()
        .map_err(|err| {
            DispatchError::ExecutionFailure(format!("failed to create temporary script: {err}"))
        })?;
    file.write_all(plaintext.as_str().as_bytes()).map_err(|err| {
        DispatchError::ExecutionFailure(format!("failed to write temporary script: {err}"))
    })?;
    file.flush().map_err(|err| {
        DispatchError::ExecutionFailure(format!("failed to flush temporary script: {err}"))
    })?;
    let (handle, path) = file.into_parts();
    // Close the write handle before exec; a still-open file cannot be
    // spawned on Linux (ETXTBSY).
    drop(handle);
    set_owner_exec(&path).map_err(|err| {
        DispatchError::ExecutionFailure(format!("failed to mark script executable: {err}"))
    })?;
    Ok(path)
}

/// Sets owner-only read/write/execute permissions on the materialized script.
#[cfg(unix)]
fn set_owner_exec(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
}

/// Permission narrowing is a no-op on platforms without Unix modes.
#[cfg(not(unix))]
fn set_owner_exec(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Spawns the materialized script and waits for it to exit.
fn spawn_script(
    path: &Path,
    args: &[String],
    output: OutputMode,
) -> Result<(i32, Option<CapturedOutput>), DispatchError> {
    let mut command = Command::new(path);
    command.args(args);
    match output {
        OutputMode::Inherit => {
            let status = command.status().map_err(|err| {
                DispatchError::ExecutionFailure(format!("failed to spawn script: {err}"))
            })?;
            Ok((exit_code(status)?, None))
        }
        OutputMode::Capture => {
            let out = command.output().map_err(|err| {
                DispatchError::ExecutionFailure(format!("failed to spawn script: {err}"))
            })?;
            let code = exit_code(out.status)?;
            Ok((
                code,
                Some(CapturedOutput {
                    stdout: out.stdout,
                    stderr: out.stderr,
                }),
            ))
        }
    }
}

/// Extracts the exit code, rejecting signal-terminated children.
fn exit_code(status: ExitStatus) -> Result<i32, DispatchError> {
    status
        .code()
        .ok_or_else(|| DispatchError::ExecutionFailure("script terminated by signal".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Dispatcher errors.
///
/// # Invariants
/// - Cryptographic failures surface the coarse messages of their source
///   modules; no oracle detail is added here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Metadata invariant violation (missing wrapped key).
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// Key unwrap failure.
    #[error(transparent)]
    KeyUnwrap(#[from] KeyUnwrapError),
    /// Content decryption failure.
    #[error(transparent)]
    Content(#[from] ContentError),
    /// A native-classified script reached execution with no registered
    /// engine. In-process evaluation is an explicit opt-in.
    #[error("in-process evaluation is disabled: no native engine is registered")]
    NativeExecutionDisabled,
    /// Child process spawn failed or the child terminated abnormally.
    #[error("execution failure: {0}")]
    ExecutionFailure(String),
    /// The interactive confirmation stream failed.
    #[error("confirmation prompt failed: {0}")]
    Prompt(String),
}

// crates/scriptgate-core/src/core/interpreter.rs
// ============================================================================
// Module: Interpreter Resolver
// Description: Shebang-based classification of script execution mode.
// Purpose: Decide between in-process evaluation and a foreign interpreter.
// Dependencies: none beyond the standard library
// ============================================================================

//! ## Overview
//! Classification inspects only the first line of plaintext. A `#!` line
//! whose text contains the native-runtime marker (case-insensitive) selects
//! in-process evaluation; any other `#!` line selects the named foreign
//! interpreter; a script with no `#!` line at all defaults to native.
//! Classification is pure and never fails.
//!
//! The no-shebang default is deliberately permissive to stay byte-compatible
//! with existing producers. It is only safe because in-process evaluation is
//! disabled unless the host registers a
//! [`NativeEngine`](crate::runtime::dispatcher::NativeEngine); see the
//! dispatcher documentation.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default marker identifying the native scripting runtime in a shebang line.
///
/// Matches the runtime name used by existing script producers. A registered
/// native engine may override this via
/// [`NativeEngine::shebang_marker`](crate::runtime::dispatcher::NativeEngine::shebang_marker).
pub const DEFAULT_NATIVE_MARKER: &str = "python";

/// Two-character shebang prefix.
const SHEBANG_PREFIX: &str = "#!";

// ============================================================================
// SECTION: Execution Mode
// ============================================================================

/// Resolved execution mode for a plaintext script.
///
/// # Invariants
/// - Variants are stable for serialization and caller matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Evaluate in-process through the registered native engine.
    Native,
    /// Spawn the named interpreter as a child process.
    ForeignInterpreter {
        /// Interpreter path taken from the shebang line. Informational: the
        /// dispatcher spawns the materialized file directly and lets the
        /// kernel honor the shebang.
        interpreter: String,
    },
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies a plaintext script by its first line.
///
/// `native_marker` is matched case-insensitively against the whole shebang
/// line. Pure classification with no side effects; absence of a recognized
/// shebang defaults to [`ExecutionMode::Native`] rather than erroring.
#[must_use]
pub fn classify(plaintext: &str, native_marker: &str) -> ExecutionMode {
    let first_line = plaintext.lines().next().unwrap_or("");
    let Some(rest) = first_line.strip_prefix(SHEBANG_PREFIX) else {
        return ExecutionMode::Native;
    };
    let lowered = first_line.to_ascii_lowercase();
    if lowered.contains(&native_marker.to_ascii_lowercase()) {
        return ExecutionMode::Native;
    }
    let interpreter = rest.split_whitespace().next().unwrap_or("").to_string();
    ExecutionMode::ForeignInterpreter {
        interpreter,
    }
}

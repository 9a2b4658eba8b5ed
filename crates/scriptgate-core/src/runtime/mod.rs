// crates/scriptgate-core/src/runtime/mod.rs
// ============================================================================
// Module: Script Gate Runtime
// Description: Execution dispatcher and its collaborator traits.
// Purpose: Gate, materialize, execute, and clean up remote scripts.
// Dependencies: crate::core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! The runtime layer owns all side effects of the pipeline: the confirmation
//! prompt seam, temporary-file materialization, child-process execution, and
//! the cleanup guarantee.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dispatcher;

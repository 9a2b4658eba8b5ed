// crates/scriptgate-core/src/core/mod.rs
// ============================================================================
// Module: Script Gate Core Types
// Description: Metadata model, key unwrap, content decryption, classification.
// Purpose: Pure data and cryptographic building blocks for the pipeline.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! Leaf modules of the delivery pipeline. Everything here is side-effect free
//! apart from randomness on the producer-side helpers; process execution and
//! filesystem access live in [`crate::runtime`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod content;
pub mod interpreter;
pub mod keywrap;
pub mod metadata;

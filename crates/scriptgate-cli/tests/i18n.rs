// crates/scriptgate-cli/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Locale parsing and catalog translation behavior.
// Purpose: Prove fallback order and placeholder substitution.
// ============================================================================

//! ## Overview
//! These tests never call `set_locale`, so the process-wide locale stays at
//! its English default and test ordering cannot matter.

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

use scriptgate_cli::i18n::Locale;
use scriptgate_cli::i18n::SUPPORTED_LOCALES;
use scriptgate_cli::t;

#[test]
fn locale_parse_accepts_case_and_region_variants() {
    assert_eq!(Locale::parse("en"), Some(Locale::En));
    assert_eq!(Locale::parse("EN"), Some(Locale::En));
    assert_eq!(Locale::parse("ca_ES"), Some(Locale::Ca));
    assert_eq!(Locale::parse("ca-ES.UTF-8"), Some(Locale::Ca));
    assert_eq!(Locale::parse("  en  "), Some(Locale::En));
}

#[test]
fn locale_parse_rejects_unknown_and_empty_values() {
    assert_eq!(Locale::parse(""), None);
    assert_eq!(Locale::parse("   "), None);
    assert_eq!(Locale::parse("fr"), None);
}

#[test]
fn supported_locales_are_stable() {
    assert_eq!(SUPPORTED_LOCALES, &[Locale::En, Locale::Ca]);
    assert_eq!(Locale::En.as_str(), "en");
    assert_eq!(Locale::Ca.as_str(), "ca");
}

#[test]
fn placeholders_are_substituted_in_order() {
    let message = t!("output.write_failed", stream = "stdout", error = "boom");
    assert_eq!(message, "Failed to write to stdout: boom");
}

#[test]
fn unknown_keys_fall_back_to_the_key_itself() {
    let message = t!("no.such.key");
    assert_eq!(message, "no.such.key");
}

#[test]
fn version_message_formats() {
    let message = t!("main.version", version = "1.2.3");
    assert_eq!(message, "scriptgate 1.2.3");
}

// crates/clinvara-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads and argument helpers.
// Purpose: Ensure CLI inputs fail closed when oversized or out of range.
// Dependencies: clinvara-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit`, `read_json`, and range bound parsing.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use clinvara_core::PatientDocument;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::ReadLimitError;
use super::read_bytes_with_limit;
use super::read_json;
use super::sequence_bound;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("small.json");
    fs::write(&path, b"[]").unwrap();
    let bytes = read_bytes_with_limit(&path, 8).unwrap();
    assert_eq!(bytes, b"[]");
}

#[test]
fn read_bytes_with_limit_rejects_oversized_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("large.json");
    fs::write(&path, vec![b' '; 16]).unwrap();
    match read_bytes_with_limit(&path, 8) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 16);
            assert_eq!(limit, 8);
        }
        other => panic!("expected size rejection, got {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    let result = read_bytes_with_limit(&temp.path().join("absent.json"), 8);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}

#[test]
fn read_json_names_the_input_kind_on_parse_failure() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("patients.json");
    fs::write(&path, br#"[{"patient_id": "P-1", "age": 40}]"#).unwrap();
    let err = read_json::<Vec<PatientDocument>>(&path, "patient documents", 1024).unwrap_err();
    assert!(err.to_string().starts_with("Failed to parse patient documents at "));
}

#[test]
fn sequence_bound_rejects_zero() {
    let err = sequence_bound(0).unwrap_err();
    assert_eq!(err.to_string(), "Audit range bound must be at least 1, got 0.");
    assert_eq!(sequence_bound(3).unwrap().get(), 3);
}

#[test]
fn override_value_must_be_a_known_eligibility() {
    let parsed = Cli::try_parse_from([
        "clinvara",
        "override",
        "--study",
        "CARD-204",
        "--verdict",
        "CARD-204:v1:P-1",
        "--value",
        "maybe",
        "--note",
        "n",
        "--actor",
        "cra",
    ]);
    assert!(parsed.is_err());

    let parsed = Cli::try_parse_from([
        "clinvara",
        "override",
        "--study",
        "CARD-204",
        "--verdict",
        "CARD-204:v1:P-1",
        "--value",
        "ineligible",
        "--note",
        "consent withdrawn",
        "--actor",
        "cra",
    ])
    .unwrap();
    assert!(matches!(parsed.command, Some(Commands::Override(_))));
}

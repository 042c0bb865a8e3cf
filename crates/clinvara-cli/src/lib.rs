// crates/clinvara-cli/src/lib.rs
// ============================================================================
// Module: Clinvara CLI Library
// Description: Shared helpers for the Clinvara command-line interface.
// Purpose: Provide the message catalog for the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Houses the message catalog used by the `clinvara` binary. The entry point
//! (`src/main.rs`) routes every user-facing line through [`t!`](crate::t) so output
//! stays consistent across commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and formatting helpers.
pub mod i18n;

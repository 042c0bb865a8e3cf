// crates/clinvara-config/src/lib.rs
// ============================================================================
// Module: Clinvara Config Library
// Description: Canonical config model and validation for clinvara.toml.
// Purpose: Single source of truth for engine, store, and event settings.
// Dependencies: clinvara-core, clinvara-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `clinvara-config` defines the configuration model for the Clinvara
//! screening tools. Loading is strict and fail-closed: oversized, non-UTF-8,
//! unknown, or out-of-range settings are rejected before any store is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

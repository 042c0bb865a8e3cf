// crates/clinvara-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Screening Store
// Description: Durable store backends for Clinvara using SQLite WAL.
// Purpose: Persist criteria, patients, verdicts, overrides, and the audit chain.
// Dependencies: clinvara-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides [`SqliteScreeningStore`], one `SQLite` database that
//! implements every Clinvara store trait. Tables are append-only: rows are
//! inserted once and never updated or deleted. Each record is stored as
//! canonical JSON with a content hash that is checked again on load, so a
//! row edited outside the engine fails closed instead of feeding evaluation.
//! Audit rows are returned as stored and left to chain verification.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteScreeningStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;

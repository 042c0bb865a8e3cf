// crates/clinvara-core/src/lib.rs
// ============================================================================
// Module: Clinvara Core Library
// Description: Public API surface for the Clinvara screening core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Clinvara core screens patient records against versioned inclusion and
//! exclusion criteria under three-valued logic, explains every verdict from
//! its stored trace, lets reviewers override verdicts with a justified note,
//! and records verdicts and overrides on a per-study hash chain. It is
//! backend-agnostic and integrates through explicit store, clock, and event
//! interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditRange;
pub use interfaces::AuditStore;
pub use interfaces::Clock;
pub use interfaces::CriteriaRegistry;
pub use interfaces::EngineEvent;
pub use interfaces::EventRecord;
pub use interfaces::EventSink;
pub use interfaces::OverrideStore;
pub use interfaces::PatientStore;
pub use interfaces::PublishedCriteria;
pub use interfaces::StoreError;
pub use interfaces::VerdictStore;
pub use runtime::BatchReport;
pub use runtime::EngineConfig;
pub use runtime::EngineError;
pub use runtime::EngineStores;
pub use runtime::FileEventSink;
pub use runtime::FixedClock;
pub use runtime::InMemoryAuditStore;
pub use runtime::InMemoryCriteriaRegistry;
pub use runtime::InMemoryOverrideStore;
pub use runtime::InMemoryPatientStore;
pub use runtime::InMemoryVerdictStore;
pub use runtime::ManualClock;
pub use runtime::MemoryEventSink;
pub use runtime::NoopEventSink;
pub use runtime::Rationale;
pub use runtime::ReviewSummary;
pub use runtime::ScreeningEngine;
pub use runtime::StderrEventSink;
pub use runtime::StudyContext;
pub use runtime::SystemClock;
pub use runtime::evaluate;
pub use runtime::explain;

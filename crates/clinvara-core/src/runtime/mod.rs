// crates/clinvara-core/src/runtime/mod.rs
// ============================================================================
// Module: Clinvara Runtime
// Description: Matcher, explainer, review workflow, and audit recording.
// Purpose: Execute screening against pluggable stores, clocks, and sinks.
// Dependencies: crate::{core, interfaces}, clinvara-logic
// ============================================================================

//! ## Overview
//! The matcher and explainer are pure functions over core types. The
//! [`ScreeningEngine`] layers storage, the audit chain, and the review
//! workflow on top of them; every surface goes through the same engine.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit_log;
pub mod batch;
pub mod clock;
pub mod engine;
pub mod events;
pub mod explain;
pub mod matcher;
pub mod predicate;
pub mod store;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit_log::StudyAuditLog;
pub use batch::BatchReport;
pub use clock::FixedClock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use engine::DEFAULT_BATCH_WORKERS;
pub use engine::ENGINE_ACTOR;
pub use engine::EngineConfig;
pub use engine::EngineError;
pub use engine::ScreeningEngine;
pub use engine::StudyContext;
pub use engine::StudyWriteGuard;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use explain::MissingDatum;
pub use explain::Rationale;
pub use explain::RationaleLine;
pub use explain::RationaleNodeKind;
pub use explain::RationaleSection;
pub use explain::explain;
pub use matcher::evaluate;
pub use matcher::evaluate_verdict;
pub use predicate::EvaluationInput;
pub use store::EngineStores;
pub use store::InMemoryAuditStore;
pub use store::InMemoryCriteriaRegistry;
pub use store::InMemoryOverrideStore;
pub use store::InMemoryPatientStore;
pub use store::InMemoryVerdictStore;
pub use summary::CriterionTally;
pub use summary::EligibilityCounts;
pub use summary::OverrideTransition;
pub use summary::ReviewSummary;
pub use summary::summarize;

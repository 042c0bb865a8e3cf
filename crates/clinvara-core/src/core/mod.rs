// crates/clinvara-core/src/core/mod.rs
// ============================================================================
// Module: Clinvara Core Types
// Description: Criteria, patient, verdict, review, and audit data model.
// Purpose: Provide stable, serializable types shared by every surface.
// Dependencies: clinvara-logic, serde
// ============================================================================

//! ## Overview
//! Core types are the canonical source of truth for the engine, the stores,
//! and the CLI. They carry no I/O and never read a clock.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod criteria;
pub mod hashing;
pub mod identifiers;
pub mod patient;
pub mod review;
pub mod schema;
pub mod time;
pub mod verdict;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditCorruptionError;
pub use audit::AuditEntry;
pub use audit::AuditEntryType;
pub use audit::AuditPayload;
pub use audit::AuditVerification;
pub use audit::OverrideRecord;
pub use audit::StoredAuditEntry;
pub use audit::VerdictRecord;
pub use audit::verify_chain;
pub use audit::verify_stored_chain;
pub use criteria::CriteriaDocument;
pub use criteria::CriteriaIssue;
pub use criteria::CriteriaLimits;
pub use criteria::CriteriaSet;
pub use criteria::CriteriaValidationError;
pub use criteria::CriterionDocument;
pub use criteria::CriterionKind;
pub use criteria::CriterionPredicate;
pub use criteria::NumericRange;
pub use criteria::Operator;
pub use criteria::TreeSide;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use identifiers::ActorId;
pub use identifiers::AttributePath;
pub use identifiers::CriteriaVersion;
pub use identifiers::CriterionId;
pub use identifiers::PatientId;
pub use identifiers::SequenceNo;
pub use identifiers::StudyId;
pub use identifiers::VerdictId;
pub use patient::PatientDocument;
pub use patient::PatientNotFoundError;
pub use patient::PatientRecord;
pub use patient::PatientRecordError;
pub use review::EffectiveVerdict;
pub use review::Override;
pub use review::OverrideRequest;
pub use review::OverrideValidationError;
pub use review::ReviewState;
pub use review::VerdictSource;
pub use review::resolve_effective;
pub use schema::AttributeType;
pub use schema::AttributeValue;
pub use schema::NumericValue;
pub use schema::SchemaError;
pub use schema::StudySchema;
pub use time::ClinicalDate;
pub use time::DateParseError;
pub use time::Timestamp;
pub use verdict::CriterionTrace;
pub use verdict::Eligibility;
pub use verdict::Evaluation;
pub use verdict::EvaluationTrace;
pub use verdict::PredicateObservation;
pub use verdict::Verdict;

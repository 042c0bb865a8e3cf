// crates/clinvara-core/src/interfaces/mod.rs
// ============================================================================
// Module: Clinvara Interfaces
// Description: Backend-agnostic storage, clock, and event interfaces.
// Purpose: Define the contract surfaces used by the screening runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces let the engine run over in-memory state in tests and durable
//! stores in deployments without changing evaluation logic. Every store is
//! append-only: there is no update or delete operation for criteria,
//! verdicts, overrides, or audit entries. Implementations fail closed and
//! report duplicate keys as [`StoreError::Conflict`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::AuditEntry;
use crate::core::CriteriaSet;
use crate::core::CriteriaVersion;
use crate::core::Eligibility;
use crate::core::HashDigest;
use crate::core::Override;
use crate::core::PatientId;
use crate::core::PatientRecord;
use crate::core::SequenceNo;
use crate::core::StoredAuditEntry;
use crate::core::StudyId;
use crate::core::Timestamp;
use crate::core::Verdict;
use crate::core::VerdictId;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Store errors shared by every persistence interface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Stored data version is incompatible.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Data is invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Key already exists or append position is taken.
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Criteria Registry
// ============================================================================

/// Criteria set as published, with its canonical hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedCriteria {
    /// Loaded criteria set.
    pub criteria: CriteriaSet,
    /// Canonical hash of the criteria set.
    pub criteria_hash: HashDigest,
    /// Publication time.
    pub published_at: Timestamp,
}

/// Registry of published criteria versions.
pub trait CriteriaRegistry {
    /// Stores a new criteria version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the version already exists.
    fn publish(&self, record: &PublishedCriteria) -> Result<(), StoreError>;

    /// Loads a criteria version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Option<PublishedCriteria>, StoreError>;

    /// Returns the highest published version for a study.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn latest_version(&self, study_id: &StudyId) -> Result<Option<CriteriaVersion>, StoreError>;
}

// ============================================================================
// SECTION: Patient Store
// ============================================================================

/// Store of ingested patient records.
pub trait PatientStore {
    /// Stores a patient record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the patient already exists.
    fn insert(&self, study_id: &StudyId, record: &PatientRecord) -> Result<(), StoreError>;

    /// Loads a patient record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(
        &self,
        study_id: &StudyId,
        patient_id: &PatientId,
    ) -> Result<Option<PatientRecord>, StoreError>;

    /// Lists patient identifiers in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn patient_ids(&self, study_id: &StudyId) -> Result<Vec<PatientId>, StoreError>;
}

// ============================================================================
// SECTION: Verdict Store
// ============================================================================

/// Store of computed verdicts.
pub trait VerdictStore {
    /// Stores a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the verdict already exists.
    fn insert(&self, verdict: &Verdict) -> Result<(), StoreError>;

    /// Loads a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get(&self, study_id: &StudyId, verdict_id: &VerdictId)
    -> Result<Option<Verdict>, StoreError>;

    /// Lists verdicts for a version in ascending patient order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list(&self, study_id: &StudyId, version: CriteriaVersion)
    -> Result<Vec<Verdict>, StoreError>;
}

// ============================================================================
// SECTION: Override Store
// ============================================================================

/// Store of applied overrides.
pub trait OverrideStore {
    /// Appends an override.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the append fails.
    fn append(&self, record: &Override) -> Result<(), StoreError>;

    /// Lists overrides for a verdict in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list(&self, study_id: &StudyId, verdict_id: &VerdictId)
    -> Result<Vec<Override>, StoreError>;

    /// Lists every override of a study in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_study(&self, study_id: &StudyId) -> Result<Vec<Override>, StoreError>;
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Inclusive sequence range for audit reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRange {
    /// First sequence number (inclusive); chain start when absent.
    pub from: Option<SequenceNo>,
    /// Last sequence number (inclusive); chain end when absent.
    pub to: Option<SequenceNo>,
}

impl AuditRange {
    /// Range covering the whole chain.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: None,
            to: None,
        }
    }

    /// Returns true when the sequence number falls inside the range.
    #[must_use]
    pub fn contains(&self, sequence_no: SequenceNo) -> bool {
        self.from.is_none_or(|from| sequence_no >= from)
            && self.to.is_none_or(|to| sequence_no <= to)
    }
}

/// Append-only per-study audit ledger.
pub trait AuditStore {
    /// Appends an entry at the next position of its study chain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the entry is not the next position.
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Returns the last entry of a study chain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn last(&self, study_id: &StudyId) -> Result<Option<AuditEntry>, StoreError>;

    /// Returns entries in chain order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn entries(&self, study_id: &StudyId, range: AuditRange)
    -> Result<Vec<AuditEntry>, StoreError>;

    /// Returns every row of a study chain for verification.
    ///
    /// Stores that persist encoded entries report rows that no longer decode
    /// as [`StoredAuditEntry::Unreadable`] instead of failing the read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the rows cannot be loaded at all.
    fn stored_entries(&self, study_id: &StudyId) -> Result<Vec<StoredAuditEntry>, StoreError> {
        Ok(self
            .entries(study_id, AuditRange::all())?
            .into_iter()
            .map(StoredAuditEntry::Decoded)
            .collect())
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for overrides and audit entries; never used by evaluation.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Engine Events
// ============================================================================

/// Structured engine event.
///
/// # Invariants
/// - Carries identifiers, outcomes, and hashes only; never attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Criteria version accepted.
    CriteriaPublished {
        /// Study identifier.
        study_id: StudyId,
        /// Published version.
        version: CriteriaVersion,
        /// Canonical criteria hash.
        criteria_hash: HashDigest,
        /// True when the version already existed with the same hash.
        idempotent: bool,
    },
    /// Verdict computed and recorded.
    VerdictComputed {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
        /// Computed eligibility.
        eligibility: Eligibility,
        /// Audit position of the recording entry.
        sequence_no: SequenceNo,
    },
    /// Evaluation request answered from a stored verdict.
    VerdictReused {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
    },
    /// Override applied.
    OverrideApplied {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
        /// Replacement value.
        value: Eligibility,
        /// Reviewer.
        actor: ActorId,
        /// Audit position of the recording entry.
        sequence_no: SequenceNo,
    },
    /// Override rejected by validation.
    OverrideRejected {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
        /// Rejection reason.
        reason: String,
    },
    /// Audit chain verified intact.
    AuditVerified {
        /// Study identifier.
        study_id: StudyId,
        /// Entries checked.
        checked: usize,
    },
    /// Audit chain failed verification.
    AuditCorruptionDetected {
        /// Study identifier.
        study_id: StudyId,
        /// First corrupt position.
        sequence_no: SequenceNo,
    },
    /// Batch re-evaluation finished.
    BatchCompleted {
        /// Study identifier.
        study_id: StudyId,
        /// Criteria version.
        version: CriteriaVersion,
        /// Newly recorded verdicts.
        evaluated: usize,
        /// Patients skipped because a verdict already existed.
        skipped: usize,
        /// Patients without a record.
        missing: usize,
    },
}

/// Event stamped with its emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Emission time (unix millis).
    pub timestamp_ms: Timestamp,
    /// Event body.
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Sink for structured engine events.
pub trait EventSink: Send + Sync {
    /// Records an event. Sinks must not fail the calling operation.
    fn record(&self, event: &EventRecord);
}

// crates/clinvara-core/src/core/audit.rs
// ============================================================================
// Module: Clinvara Audit Chain
// Description: Hash-chained audit entries and chain verification.
// Purpose: Make every recorded verdict and override tamper-evident.
// Dependencies: serde, thiserror, crate::core::{hashing, identifiers, time}
// ============================================================================

//! ## Overview
//! Each study owns one append-only chain. An entry's `self_hash` is
//! `SHA-256(prev_hash_hex || canonical_json(body))`, where the body covers
//! every serialized field except the two hashes, and the first entry links to
//! an all-zero seed digest. [`verify_chain`] recomputes the chain from the
//! seed and reports the first position whose recorded data disagrees.
//! [`verify_stored_chain`] does the same over rows read back from a store,
//! where a row that no longer decodes counts as corrupt at its position.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::chain_hash;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::CriteriaVersion;
use crate::core::identifiers::PatientId;
use crate::core::identifiers::SequenceNo;
use crate::core::identifiers::StudyId;
use crate::core::identifiers::VerdictId;
use crate::core::time::ClinicalDate;
use crate::core::time::Timestamp;
use crate::core::verdict::Eligibility;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Entry Types
// ============================================================================

/// Kind of recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntryType {
    /// A verdict was computed and stored.
    VerdictComputed,
    /// A reviewer override was applied.
    OverrideApplied,
}

impl AuditEntryType {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VerdictComputed => "VERDICT_COMPUTED",
            Self::OverrideApplied => "OVERRIDE_APPLIED",
        }
    }
}

/// Verdict summary recorded in the audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// Verdict identifier.
    pub verdict_id: VerdictId,
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Criteria version evaluated.
    pub criteria_version: CriteriaVersion,
    /// Canonical hash of the criteria set.
    pub criteria_hash: HashDigest,
    /// Reference date used.
    pub reference_date: ClinicalDate,
    /// Computed eligibility.
    pub eligibility: Eligibility,
    /// Canonical hash of the trace.
    pub trace_hash: HashDigest,
}

impl From<&Verdict> for VerdictRecord {
    fn from(verdict: &Verdict) -> Self {
        Self {
            verdict_id: verdict.verdict_id.clone(),
            patient_id: verdict.patient_id.clone(),
            criteria_version: verdict.criteria_version,
            criteria_hash: verdict.criteria_hash.clone(),
            reference_date: verdict.reference_date,
            eligibility: verdict.eligibility,
            trace_hash: verdict.trace_hash.clone(),
        }
    }
}

/// Override summary recorded in the audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Verdict overridden.
    pub verdict_id: VerdictId,
    /// Patient of the verdict.
    pub patient_id: PatientId,
    /// Value computed by the matcher.
    pub computed: Eligibility,
    /// Replacement value.
    pub value: Eligibility,
    /// Justification.
    pub note: String,
    /// Decision time.
    pub decided_at: Timestamp,
}

/// Entry payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditPayload {
    /// Verdict computed.
    Verdict(VerdictRecord),
    /// Override applied.
    Override(OverrideRecord),
}

impl AuditPayload {
    /// Returns the entry type this payload belongs to.
    #[must_use]
    pub const fn entry_type(&self) -> AuditEntryType {
        match self {
            Self::Verdict(_) => AuditEntryType::VerdictComputed,
            Self::Override(_) => AuditEntryType::OverrideApplied,
        }
    }

    /// Returns the verdict the payload refers to.
    #[must_use]
    pub const fn verdict_id(&self) -> &VerdictId {
        match self {
            Self::Verdict(record) => &record.verdict_id,
            Self::Override(record) => &record.verdict_id,
        }
    }
}

// ============================================================================
// SECTION: Audit Entry
// ============================================================================

/// Recorded audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Study owning the chain.
    pub study_id: StudyId,
    /// Position in the chain (1-based).
    pub sequence_no: SequenceNo,
    /// Recording time.
    pub timestamp: Timestamp,
    /// Actor responsible for the event.
    pub actor: ActorId,
    /// Entry type.
    pub entry_type: AuditEntryType,
    /// Entry payload.
    pub payload: AuditPayload,
    /// Hash of the previous entry (seed for the first entry).
    pub prev_hash: HashDigest,
    /// Hash of this entry.
    pub self_hash: HashDigest,
}

/// Hashed portion of an entry.
#[derive(Serialize)]
struct EntryBody<'a> {
    /// Study owning the chain.
    study_id: &'a StudyId,
    /// Position in the chain.
    sequence_no: SequenceNo,
    /// Recording time.
    timestamp: Timestamp,
    /// Actor responsible for the event.
    actor: &'a ActorId,
    /// Entry type.
    entry_type: AuditEntryType,
    /// Entry payload.
    payload: &'a AuditPayload,
}

impl AuditEntry {
    /// Seals a new entry onto a chain whose last hash is `prev_hash`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the body cannot be canonicalized.
    pub fn seal(
        study_id: StudyId,
        sequence_no: SequenceNo,
        timestamp: Timestamp,
        actor: ActorId,
        payload: AuditPayload,
        prev_hash: HashDigest,
    ) -> Result<Self, HashError> {
        let entry_type = payload.entry_type();
        let self_hash = chain_hash(
            &prev_hash,
            &EntryBody {
                study_id: &study_id,
                sequence_no,
                timestamp,
                actor: &actor,
                entry_type,
                payload: &payload,
            },
        )?;
        Ok(Self {
            study_id,
            sequence_no,
            timestamp,
            actor,
            entry_type,
            payload,
            prev_hash,
            self_hash,
        })
    }

    /// Recomputes this entry's hash from its recorded fields.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the body cannot be canonicalized.
    pub fn recompute_hash(&self) -> Result<HashDigest, HashError> {
        chain_hash(
            &self.prev_hash,
            &EntryBody {
                study_id: &self.study_id,
                sequence_no: self.sequence_no,
                timestamp: self.timestamp,
                actor: &self.actor,
                entry_type: self.entry_type,
                payload: &self.payload,
            },
        )
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Result of verifying a study's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditVerification {
    /// Study verified.
    pub study_id: StudyId,
    /// True when the whole chain verified.
    pub valid: bool,
    /// First position whose data disagrees with the recomputed chain.
    pub first_corrupt_at: Option<SequenceNo>,
    /// Number of entries examined.
    pub checked: usize,
}

impl AuditVerification {
    /// Converts a failed verification into an [`AuditCorruptionError`].
    ///
    /// # Errors
    ///
    /// Returns [`AuditCorruptionError`] when the chain did not verify.
    pub fn into_result(self) -> Result<Self, AuditCorruptionError> {
        match self.first_corrupt_at {
            Some(sequence_no) if !self.valid => Err(AuditCorruptionError {
                study_id: self.study_id,
                sequence_no,
            }),
            _ => Ok(self),
        }
    }
}

/// Audit chain failed verification; consumers must halt for this study.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("audit chain for study {study_id} is corrupt starting at entry {sequence_no}")]
pub struct AuditCorruptionError {
    /// Study whose chain is corrupt.
    pub study_id: StudyId,
    /// First corrupt position.
    pub sequence_no: SequenceNo,
}

/// Verifies a study's chain from the seed digest.
///
/// Entries must be supplied in stored order. The reported position is the
/// chain position (1-based index), not the possibly tampered recorded number.
#[must_use]
pub fn verify_chain(study_id: &StudyId, entries: &[AuditEntry]) -> AuditVerification {
    let mut expected_prev = HashDigest::chain_seed();
    for (index, entry) in entries.iter().enumerate() {
        let position = SequenceNo::from_index(index);
        let intact = entry.study_id == *study_id
            && entry.sequence_no == position
            && entry.entry_type == entry.payload.entry_type()
            && entry.prev_hash == expected_prev
            && entry.recompute_hash().is_ok_and(|hash| hash == entry.self_hash);
        if !intact {
            return AuditVerification {
                study_id: study_id.clone(),
                valid: false,
                first_corrupt_at: Some(position),
                checked: index + 1,
            };
        }
        expected_prev = entry.self_hash.clone();
    }
    AuditVerification {
        study_id: study_id.clone(),
        valid: true,
        first_corrupt_at: None,
        checked: entries.len(),
    }
}

/// Audit row as read back from a store for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredAuditEntry {
    /// Row decoded into an entry.
    Decoded(AuditEntry),
    /// Row whose stored bytes no longer decode into an entry.
    Unreadable {
        /// Position recorded alongside the row.
        sequence_no: SequenceNo,
    },
}

/// Verifies stored rows, treating the first unreadable row as corrupt.
///
/// Decoded rows before the first unreadable one are checked with
/// [`verify_chain`]; a break among them is reported first.
#[must_use]
pub fn verify_stored_chain(study_id: &StudyId, rows: &[StoredAuditEntry]) -> AuditVerification {
    let mut decoded = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match row {
            StoredAuditEntry::Decoded(entry) => decoded.push(entry.clone()),
            StoredAuditEntry::Unreadable {
                ..
            } => {
                let prefix = verify_chain(study_id, &decoded);
                if !prefix.valid {
                    return prefix;
                }
                return AuditVerification {
                    study_id: study_id.clone(),
                    valid: false,
                    first_corrupt_at: Some(SequenceNo::from_index(index)),
                    checked: index + 1,
                };
            }
        }
    }
    verify_chain(study_id, &decoded)
}

// crates/clinvara-core/src/core/review.rs
// ============================================================================
// Module: Clinvara Review Records
// Description: Reviewer overrides and effective verdict resolution.
// Purpose: Let reviewers supersede a computed value without editing it.
// Dependencies: serde, thiserror, crate::core::{identifiers, time, verdict}
// ============================================================================

//! ## Overview
//! Overrides are appended, never edited, and never touch the verdict they
//! target. The effective value of a verdict is the override with the latest
//! timestamp, ties broken by audit sequence number, or the computed value when
//! no override exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::PatientId;
use crate::core::identifiers::SequenceNo;
use crate::core::identifiers::StudyId;
use crate::core::identifiers::VerdictId;
use crate::core::time::Timestamp;
use crate::core::verdict::Eligibility;
use crate::core::verdict::Verdict;

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Override request submitted by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Verdict being overridden.
    pub verdict_id: VerdictId,
    /// Replacement value.
    pub value: Eligibility,
    /// Mandatory justification.
    pub note: String,
    /// Reviewer submitting the override.
    pub actor: Option<ActorId>,
    /// Decision time; the engine clock is used when absent.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl OverrideRequest {
    /// Checks the note and actor, returning the actor on success.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideValidationError`] when the note is blank or the actor
    /// is missing.
    pub fn validate(&self, study_id: &StudyId) -> Result<&ActorId, OverrideValidationError> {
        let actor = match &self.actor {
            Some(actor) if !actor.is_blank() => actor,
            _ => {
                return Err(OverrideValidationError::MissingActor {
                    study_id: study_id.clone(),
                    verdict_id: self.verdict_id.clone(),
                });
            }
        };
        if self.note.trim().is_empty() {
            return Err(OverrideValidationError::EmptyNote {
                study_id: study_id.clone(),
                verdict_id: self.verdict_id.clone(),
            });
        }
        Ok(actor)
    }
}

/// Applied override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// Verdict overridden.
    pub verdict_id: VerdictId,
    /// Study identifier.
    pub study_id: StudyId,
    /// Patient of the overridden verdict.
    pub patient_id: PatientId,
    /// Replacement value.
    pub value: Eligibility,
    /// Justification.
    pub note: String,
    /// Reviewer.
    pub actor: ActorId,
    /// Decision time.
    pub timestamp: Timestamp,
    /// Audit sequence number of the recording entry.
    pub sequence_no: SequenceNo,
}

/// Override validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideValidationError {
    /// Note is empty or whitespace.
    #[error("override for verdict {verdict_id} in study {study_id} rejected: note must not be empty")]
    EmptyNote {
        /// Study identifier.
        study_id: StudyId,
        /// Target verdict.
        verdict_id: VerdictId,
    },
    /// Actor is absent or blank.
    #[error("override for verdict {verdict_id} in study {study_id} rejected: actor is required")]
    MissingActor {
        /// Study identifier.
        study_id: StudyId,
        /// Target verdict.
        verdict_id: VerdictId,
    },
}

// ============================================================================
// SECTION: Effective Verdict
// ============================================================================

/// Review state of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// No override recorded.
    AutoComputed,
    /// At least one override recorded.
    Overridden,
}

/// Where an effective value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Matcher output.
    Computed,
    /// Reviewer override.
    Override,
}

/// Resolved effective value for a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveVerdict {
    /// Verdict identifier.
    pub verdict_id: VerdictId,
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Effective value.
    pub value: Eligibility,
    /// Source of the effective value.
    pub source: VerdictSource,
    /// Review state.
    pub review_state: ReviewState,
    /// Value computed by the matcher.
    pub computed: Eligibility,
    /// Number of overrides recorded.
    pub override_count: usize,
    /// Override supplying the effective value, if any.
    pub deciding_override: Option<Override>,
}

/// Resolves the effective value of a verdict from its overrides.
#[must_use]
pub fn resolve_effective(verdict: &Verdict, overrides: &[Override]) -> EffectiveVerdict {
    let deciding = overrides
        .iter()
        .filter(|record| record.verdict_id == verdict.verdict_id)
        .max_by_key(|record| (record.timestamp, record.sequence_no))
        .cloned();
    let override_count =
        overrides.iter().filter(|record| record.verdict_id == verdict.verdict_id).count();
    let (value, source, review_state) = match &deciding {
        Some(record) => (record.value, VerdictSource::Override, ReviewState::Overridden),
        None => (verdict.eligibility, VerdictSource::Computed, ReviewState::AutoComputed),
    };
    EffectiveVerdict {
        verdict_id: verdict.verdict_id.clone(),
        patient_id: verdict.patient_id.clone(),
        value,
        source,
        review_state,
        computed: verdict.eligibility,
        override_count,
        deciding_override: deciding,
    }
}

// crates/clinvara-core/src/core/verdict.rs
// ============================================================================
// Module: Clinvara Verdicts
// Description: Eligibility outcomes, evaluation traces, and stored verdicts.
// Purpose: Capture what the matcher decided and the full trace behind it.
// Dependencies: clinvara-logic, serde, crate::core::{hashing, identifiers}
// ============================================================================

//! ## Overview
//! A [`Verdict`] is created once per (criteria version, patient) and never
//! edited. It embeds the [`EvaluationTrace`] that produced it; recomputing the
//! tri-state roots from the trace leaves must reproduce the stored
//! eligibility, which [`Verdict::is_consistent`] checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use clinvara_logic::KleeneLogic;
use clinvara_logic::TraceNode;
use clinvara_logic::TriState;
use serde::Deserialize;
use serde::Serialize;

use crate::core::criteria::CriteriaSet;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AttributePath;
use crate::core::identifiers::CriteriaVersion;
use crate::core::identifiers::CriterionId;
use crate::core::identifiers::PatientId;
use crate::core::identifiers::StudyId;
use crate::core::identifiers::VerdictId;
use crate::core::schema::AttributeValue;
use crate::core::time::ClinicalDate;

// ============================================================================
// SECTION: Eligibility
// ============================================================================

/// Top-level screening outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// Inclusion TRUE and exclusion FALSE.
    Eligible,
    /// Inclusion FALSE or exclusion TRUE.
    Ineligible,
    /// Neither outcome is forced because data is missing.
    Indeterminate,
}

impl Eligibility {
    /// Combines the inclusion and exclusion roots.
    #[must_use]
    pub const fn from_roots(inclusion: TriState, exclusion: TriState) -> Self {
        match (inclusion, exclusion) {
            (TriState::False, _) | (_, TriState::True) => Self::Ineligible,
            (TriState::True, TriState::False) => Self::Eligible,
            _ => Self::Indeterminate,
        }
    }

    /// Returns a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Ineligible => "ineligible",
            Self::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Eligibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eligible" => Ok(Self::Eligible),
            "ineligible" => Ok(Self::Ineligible),
            "indeterminate" => Ok(Self::Indeterminate),
            other => Err(format!("unknown eligibility value: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Traces
// ============================================================================

/// Detail recorded for each predicate leaf during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateObservation {
    /// Criterion identifier.
    pub criterion_id: CriterionId,
    /// Human-readable rule description.
    pub description: String,
    /// Attribute path read by the predicate.
    pub attribute: AttributePath,
    /// Observed value (derived values included); `None` when absent.
    pub observed: Option<AttributeValue>,
}

/// Trace of one criteria tree.
pub type CriterionTrace = TraceNode<PredicateObservation>;

/// Traces for both trees of a criteria set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationTrace {
    /// Inclusion tree trace.
    pub inclusion: CriterionTrace,
    /// Exclusion tree trace.
    pub exclusion: CriterionTrace,
}

impl EvaluationTrace {
    /// Eligibility implied by the stored root results.
    #[must_use]
    pub const fn eligibility(&self) -> Eligibility {
        Eligibility::from_roots(self.inclusion.result(), self.exclusion.result())
    }

    /// Eligibility recomputed from leaf results alone.
    #[must_use]
    pub fn recompute(&self) -> Eligibility {
        Eligibility::from_roots(
            self.inclusion.recompute(&KleeneLogic),
            self.exclusion.recompute(&KleeneLogic),
        )
    }

    /// Returns true when every stored node result matches recomputation.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.inclusion.is_consistent(&KleeneLogic) && self.exclusion.is_consistent(&KleeneLogic)
    }

    /// Computes the canonical hash of the trace.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }
}

/// Output of the pure matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Computed eligibility.
    pub eligibility: Eligibility,
    /// Trace behind the eligibility.
    pub trace: EvaluationTrace,
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Stored, immutable verdict for one (criteria version, patient) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Derived verdict identifier.
    pub verdict_id: VerdictId,
    /// Study identifier.
    pub study_id: StudyId,
    /// Criteria version evaluated.
    pub criteria_version: CriteriaVersion,
    /// Patient evaluated.
    pub patient_id: PatientId,
    /// Canonical hash of the criteria set evaluated.
    pub criteria_hash: HashDigest,
    /// Reference date used by temporal predicates and derived ages.
    pub reference_date: ClinicalDate,
    /// Computed eligibility.
    pub eligibility: Eligibility,
    /// Evaluation trace.
    pub trace: EvaluationTrace,
    /// Canonical hash of the trace.
    pub trace_hash: HashDigest,
}

impl Verdict {
    /// Builds a verdict from a matcher evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the trace cannot be hashed.
    pub fn from_evaluation(
        criteria: &CriteriaSet,
        criteria_hash: HashDigest,
        patient_id: PatientId,
        reference_date: ClinicalDate,
        evaluation: Evaluation,
    ) -> Result<Self, HashError> {
        let trace_hash = evaluation.trace.canonical_hash()?;
        Ok(Self {
            verdict_id: VerdictId::derive(&criteria.study_id, criteria.version, &patient_id),
            study_id: criteria.study_id.clone(),
            criteria_version: criteria.version,
            patient_id,
            criteria_hash,
            reference_date,
            eligibility: evaluation.eligibility,
            trace: evaluation.trace,
            trace_hash,
        })
    }

    /// Returns true when the stored eligibility, trace, and trace hash agree.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.trace.is_consistent()
            && self.trace.recompute() == self.eligibility
            && self.trace.canonical_hash().is_ok_and(|hash| hash == self.trace_hash)
    }
}

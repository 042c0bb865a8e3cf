// crates/clinvara-core/src/runtime/matcher.rs
// ============================================================================
// Module: Clinvara Matching Engine
// Description: Pure evaluation of a criteria set against a patient record.
// Purpose: Produce an eligibility outcome and its full trace in one pass.
// Dependencies: clinvara-logic, crate::{core, runtime::predicate}
// ============================================================================

//! ## Overview
//! [`evaluate`] is a pure function of (criteria, record, reference date). It
//! touches no clock and no store, so it may run on any number of threads, and
//! identical inputs always yield identical outputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clinvara_logic::KleeneLogic;

use crate::core::ClinicalDate;
use crate::core::CriteriaSet;
use crate::core::Evaluation;
use crate::core::EvaluationTrace;
use crate::core::HashError;
use crate::core::PatientRecord;
use crate::core::Verdict;
use crate::interfaces::PublishedCriteria;
use crate::runtime::predicate::EvaluationInput;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates both trees under strong Kleene logic.
#[must_use]
pub fn evaluate(
    criteria: &CriteriaSet,
    record: &PatientRecord,
    reference_date: ClinicalDate,
) -> Evaluation {
    let input = EvaluationInput {
        record,
        reference_date,
    };
    let trace = EvaluationTrace {
        inclusion: criteria.inclusion.evaluate(&input, &KleeneLogic),
        exclusion: criteria.exclusion.evaluate(&input, &KleeneLogic),
    };
    Evaluation {
        eligibility: trace.eligibility(),
        trace,
    }
}

/// Evaluates a published criteria version and wraps the result as a verdict.
///
/// # Errors
///
/// Returns [`HashError`] when the trace cannot be hashed.
pub fn evaluate_verdict(
    published: &PublishedCriteria,
    record: &PatientRecord,
    reference_date: ClinicalDate,
) -> Result<Verdict, HashError> {
    let evaluation = evaluate(&published.criteria, record, reference_date);
    Verdict::from_evaluation(
        &published.criteria,
        published.criteria_hash.clone(),
        record.patient_id.clone(),
        reference_date,
        evaluation,
    )
}

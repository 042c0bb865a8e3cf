// crates/clinvara-core/src/runtime/predicate.rs
// ============================================================================
// Module: Clinvara Predicate Evaluation
// Description: Tri-state evaluation of typed criterion predicates.
// Purpose: Convert patient attribute values into predicate outcomes.
// Dependencies: clinvara-logic, crate::core
// ============================================================================

//! ## Overview
//! A predicate is UNKNOWN when its attribute is absent (or a derived value
//! cannot be computed), except `exists`, which is always TRUE or FALSE.
//! Temporal predicates and derived ages read only the caller-supplied
//! reference date.

// ============================================================================
// SECTION: Imports
// ============================================================================

use clinvara_logic::TracedPredicateEval;
use clinvara_logic::TriState;

use crate::core::AttributeType;
use crate::core::AttributeValue;
use crate::core::ClinicalDate;
use crate::core::CriterionPredicate;
use crate::core::NumericValue;
use crate::core::Operator;
use crate::core::PatientRecord;
use crate::core::PredicateObservation;

// ============================================================================
// SECTION: Evaluation Input
// ============================================================================

/// Read-only view handed to predicates during evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    /// Patient being screened.
    pub record: &'a PatientRecord,
    /// Reference date for temporal predicates and derived ages.
    pub reference_date: ClinicalDate,
}

impl TracedPredicateEval for CriterionPredicate {
    type Reader<'a> = EvaluationInput<'a>;
    type Detail = PredicateObservation;

    fn eval_traced(&self, input: &Self::Reader<'_>) -> (TriState, PredicateObservation) {
        let observed = observe(self, input);
        let result = match (&self.operator, &observed) {
            (Operator::Exists, value) => TriState::from(value.is_some()),
            (_, None) => TriState::Unknown,
            (operator, Some(value)) => apply(operator, value, input.reference_date),
        };
        let detail = PredicateObservation {
            criterion_id: self.id.clone(),
            description: self.description(),
            attribute: self.attribute.clone(),
            observed,
        };
        (result, detail)
    }
}

// ============================================================================
// SECTION: Observation
// ============================================================================

/// Reads (or derives) the value a predicate looks at.
fn observe(predicate: &CriterionPredicate, input: &EvaluationInput<'_>) -> Option<AttributeValue> {
    match &predicate.attribute_type {
        AttributeType::DerivedAge {
            source,
        } => match input.record.value(source)? {
            AttributeValue::Date(birth) => birth
                .whole_years_until(input.reference_date)
                .map(|years| AttributeValue::Numeric(NumericValue::from(i64::from(years)))),
            _ => None,
        },
        _ => input.record.value(&predicate.attribute).cloned(),
    }
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Applies an operator to a present value.
fn apply(operator: &Operator, value: &AttributeValue, reference: ClinicalDate) -> TriState {
    match operator {
        Operator::Eq {
            value: expected,
        } => same_kind_eq(value, expected).map_or(TriState::Unknown, TriState::from),
        Operator::Neq {
            value: rejected,
        } => same_kind_eq(value, rejected).map_or(TriState::Unknown, |eq| TriState::from(!eq)),
        Operator::Range {
            bounds,
        } => match value {
            AttributeValue::Numeric(number) => TriState::from(bounds.contains(number)),
            _ => TriState::Unknown,
        },
        Operator::In {
            values,
        } => match value {
            AttributeValue::CodeList(codes) => TriState::from(codes.iter().any(|code| {
                values.iter().any(|candidate| {
                    matches!(candidate, AttributeValue::Categorical(accepted) if accepted == code)
                })
            })),
            single => TriState::from(
                values.iter().any(|candidate| same_kind_eq(single, candidate) == Some(true)),
            ),
        },
        Operator::Contains {
            code,
        } => match value {
            AttributeValue::CodeList(codes) => TriState::from(codes.contains(code)),
            _ => TriState::Unknown,
        },
        Operator::Before {
            offset_days,
        } => compare_date(value, reference.add_days(*offset_days), |date, pivot| date < pivot),
        Operator::After {
            offset_days,
        } => compare_date(value, reference.add_days(*offset_days), |date, pivot| date > pivot),
        Operator::Within {
            days_before,
            days_after,
        } => {
            let (Some(start), Some(end)) = (
                reference.add_days(-i64::from(*days_before)),
                reference.add_days(i64::from(*days_after)),
            ) else {
                return TriState::Unknown;
            };
            match value {
                AttributeValue::Date(date) => TriState::from(start <= *date && *date <= end),
                _ => TriState::Unknown,
            }
        }
        Operator::Exists => TriState::True,
    }
}

/// Equality between two values of the same kind; `None` across kinds.
fn same_kind_eq(left: &AttributeValue, right: &AttributeValue) -> Option<bool> {
    match (left, right) {
        (AttributeValue::Numeric(a), AttributeValue::Numeric(b)) => Some(a == b),
        (AttributeValue::Categorical(a), AttributeValue::Categorical(b)) => Some(a == b),
        (AttributeValue::CodeList(a), AttributeValue::CodeList(b)) => Some(a == b),
        (AttributeValue::Date(a), AttributeValue::Date(b)) => Some(a == b),
        (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => Some(a == b),
        _ => None,
    }
}

/// Compares a date value against a pivot date.
fn compare_date(
    value: &AttributeValue,
    pivot: Option<ClinicalDate>,
    cmp: impl Fn(ClinicalDate, ClinicalDate) -> bool,
) -> TriState {
    match (value, pivot) {
        (AttributeValue::Date(date), Some(pivot)) => TriState::from(cmp(*date, pivot)),
        _ => TriState::Unknown,
    }
}

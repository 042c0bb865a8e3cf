// crates/clinvara-core/tests/matcher.rs
// ============================================================================
// Module: Matcher Tests
// Description: Operator semantics, missing data, and verdict combination.
// Purpose: Validate the pure matcher against typed patient records.
// Dependencies: clinvara_core, clinvara_logic, serde_json
// ============================================================================
//! ## Overview
//! Drives `evaluate` directly. Every case uses an explicit reference date so
//! results never depend on when the test runs.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use clinvara_core::AttributeValue;
use clinvara_core::Eligibility;
use clinvara_core::NumericValue;
use clinvara_core::evaluate;
use clinvara_logic::TraceNode;
use clinvara_logic::TriState;
use serde_json::Value;
use serde_json::json;
use support::STUDY;
use support::criteria_doc;
use support::date;
use support::load;
use support::patient;
use support::reference;
use support::single_predicate;

/// Evaluates one predicate against a patient and returns the inclusion root.
fn check(attribute: &str, operator: &str, value: Option<Value>, attributes: Value) -> TriState {
    let criteria = load(&single_predicate(attribute, operator, value));
    let record = patient("P1", attributes);
    evaluate(&criteria, &record, reference()).trace.inclusion.result()
}

// ============================================================================
// SECTION: Operators
// ============================================================================

#[test]
fn equality_operators_compare_typed_values() {
    assert_eq!(check("diagnosis", "eq", Some(json!("X")), json!({"diagnosis": "X"})), TriState::True);
    assert_eq!(check("diagnosis", "eq", Some(json!("X")), json!({"diagnosis": "Y"})), TriState::False);
    assert_eq!(check("diagnosis", "neq", Some(json!("X")), json!({"diagnosis": "Y"})), TriState::True);
    assert_eq!(check("pregnant", "eq", Some(json!(false)), json!({"pregnant": false})), TriState::True);
    assert_eq!(
        check("last_visit", "eq", Some(json!("2025-05-01")), json!({"last_visit": "2025-05-01"})),
        TriState::True
    );
}

#[test]
fn numeric_equality_is_exact_decimal() {
    assert_eq!(check("hba1c", "eq", Some(json!(6.5)), json!({"hba1c": 6.50})), TriState::True);
    assert_eq!(check("hba1c", "eq", Some(json!(0.3)), json!({"hba1c": 0.30000001})), TriState::False);
}

#[test]
fn comparison_sugar_respects_bound_inclusivity() {
    let at_bound = json!({"age": 18});
    assert_eq!(check("age", "gte", Some(json!(18)), at_bound.clone()), TriState::True);
    assert_eq!(check("age", "gt", Some(json!(18)), at_bound.clone()), TriState::False);
    assert_eq!(check("age", "lte", Some(json!(18)), at_bound.clone()), TriState::True);
    assert_eq!(check("age", "lt", Some(json!(18)), at_bound), TriState::False);
}

#[test]
fn range_bounds_are_configured_per_criterion() {
    let exclusive = json!({"min": 6.5, "max": 9, "min_inclusive": false, "max_inclusive": false});
    let inclusive = json!({"min": 6.5, "max": 9});
    assert_eq!(check("hba1c", "range", Some(exclusive.clone()), json!({"hba1c": 6.5})), TriState::False);
    assert_eq!(check("hba1c", "range", Some(inclusive.clone()), json!({"hba1c": 6.5})), TriState::True);
    assert_eq!(check("hba1c", "range", Some(exclusive), json!({"hba1c": 7.25})), TriState::True);
    assert_eq!(check("hba1c", "range", Some(inclusive), json!({"hba1c": 9.01})), TriState::False);
    assert_eq!(check("hba1c", "range", Some(json!({"max": 7})), json!({"hba1c": -3})), TriState::True);
}

#[test]
fn membership_and_code_lists() {
    let codes = json!({"diagnosis_codes": ["C50.9", "E11"]});
    assert_eq!(check("diagnosis", "in", Some(json!(["X", "Y"])), json!({"diagnosis": "Y"})), TriState::True);
    assert_eq!(check("diagnosis", "in", Some(json!(["X", "Y"])), json!({"diagnosis": "Z"})), TriState::False);
    assert_eq!(check("age", "in", Some(json!([30, 40])), json!({"age": 40})), TriState::True);
    assert_eq!(check("diagnosis_codes", "in", Some(json!(["I10", "E11"])), codes.clone()), TriState::True);
    assert_eq!(check("diagnosis_codes", "in", Some(json!(["I10"])), codes.clone()), TriState::False);
    assert_eq!(check("diagnosis_codes", "contains", Some(json!("C50.9")), codes.clone()), TriState::True);
    assert_eq!(check("diagnosis_codes", "contains", Some(json!("C50")), codes), TriState::False);
}

#[test]
fn temporal_operators_are_relative_to_reference_date() {
    // Reference date is 2025-06-01.
    let visit = |day: &str| json!({"last_visit": day});
    assert_eq!(check("last_visit", "before", None, visit("2025-05-31")), TriState::True);
    assert_eq!(check("last_visit", "before", None, visit("2025-06-01")), TriState::False);
    assert_eq!(check("last_visit", "after", Some(json!(-30)), visit("2025-05-15")), TriState::True);
    assert_eq!(
        check("last_visit", "after", Some(json!({"offset_days": -30})), visit("2025-05-03")),
        TriState::True
    );
    assert_eq!(check("last_visit", "after", Some(json!(-30)), visit("2025-05-02")), TriState::False);
    assert_eq!(check("last_visit", "after", Some(json!(-30)), visit("2025-05-01")), TriState::False);

    let window = Some(json!({"days_before": 90, "days_after": 0}));
    assert_eq!(check("last_visit", "within", window.clone(), visit("2025-03-03")), TriState::True);
    assert_eq!(check("last_visit", "within", window.clone(), visit("2025-03-02")), TriState::False);
    assert_eq!(check("last_visit", "within", window.clone(), visit("2025-06-01")), TriState::True);
    assert_eq!(check("last_visit", "within", window, visit("2025-06-02")), TriState::False);
}

#[test]
fn exists_is_never_unknown() {
    assert_eq!(check("diagnosis", "exists", None, json!({"diagnosis": "X"})), TriState::True);
    assert_eq!(check("diagnosis", "exists", None, json!({})), TriState::False);
    assert_eq!(check("diagnosis", "exists", None, json!({"diagnosis": null})), TriState::False);
}

#[test]
fn derived_age_uses_whole_years_at_reference_date() {
    let born = |day: &str| json!({"birth_date": day});
    assert_eq!(check("derived_age", "gte", Some(json!(18)), born("2007-06-01")), TriState::True);
    assert_eq!(check("derived_age", "gte", Some(json!(18)), born("2007-06-02")), TriState::False);
    assert_eq!(check("derived_age", "gte", Some(json!(18)), json!({})), TriState::Unknown);
    // A birth date after the reference date has no defined age.
    assert_eq!(check("derived_age", "gte", Some(json!(0)), born("2026-01-01")), TriState::Unknown);
}

#[test]
fn derived_age_is_recorded_as_observed_value() {
    let criteria = load(&single_predicate("derived_age", "gte", Some(json!(18))));
    let record = patient("P1", json!({"birth_date": "1990-01-15"}));
    let trace = evaluate(&criteria, &record, reference()).trace;
    let TraceNode::Predicate {
        detail, ..
    } = &trace.inclusion
    else {
        panic!("expected predicate root");
    };
    assert_eq!(detail.observed, Some(AttributeValue::Numeric(NumericValue::from(35))));
}

// ============================================================================
// SECTION: Missing Data And Verdicts
// ============================================================================

#[test]
fn absent_attribute_degrades_to_unknown() {
    assert_eq!(check("age", "gte", Some(json!(18)), json!({})), TriState::Unknown);
    assert_eq!(check("age", "gte", Some(json!(18)), json!({"age": null})), TriState::Unknown);
    assert_eq!(check("diagnosis", "neq", Some(json!("X")), json!({})), TriState::Unknown);
}

#[test]
fn true_or_branch_masks_missing_sibling() {
    let criteria = load(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {
            "kind": "or",
            "children": [
                {"kind": "predicate", "id": "AGE", "attribute": "age", "operator": "gte", "value": 18},
                {"kind": "predicate", "id": "DX", "attribute": "diagnosis", "operator": "eq", "value": "X"}
            ]
        }
    })));
    let record = patient("P1", json!({"diagnosis": "X"}));
    let evaluation = evaluate(&criteria, &record, reference());
    assert_eq!(evaluation.eligibility, Eligibility::Eligible);
    assert!(evaluation.trace.inclusion.contributing_unknowns().is_empty());
}

#[test]
fn exclusion_true_forces_ineligible_despite_unknown_inclusion() {
    let criteria = load(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "predicate", "id": "INC1", "attribute": "age", "operator": "gte", "value": 18},
        "exclusion_tree": {"kind": "predicate", "id": "EXC1", "attribute": "pregnant", "operator": "eq", "value": true}
    })));
    let excluded = patient("P1", json!({"pregnant": true}));
    assert_eq!(evaluate(&criteria, &excluded, reference()).eligibility, Eligibility::Ineligible);
    let unknown = patient("P2", json!({"age": 30}));
    assert_eq!(evaluate(&criteria, &unknown, reference()).eligibility, Eligibility::Indeterminate);
    let clear = patient("P3", json!({"age": 30, "pregnant": false}));
    assert_eq!(evaluate(&criteria, &clear, reference()).eligibility, Eligibility::Eligible);
}

#[test]
fn not_keeps_unknown_unknown() {
    let criteria = load(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {
            "kind": "not",
            "children": [{"kind": "predicate", "attribute": "pregnant", "operator": "eq", "value": true}]
        }
    })));
    assert_eq!(
        evaluate(&criteria, &patient("P1", json!({})), reference()).eligibility,
        Eligibility::Indeterminate
    );
    assert_eq!(
        evaluate(&criteria, &patient("P2", json!({"pregnant": false})), reference()).eligibility,
        Eligibility::Eligible
    );
}

#[test]
fn missing_exclusion_tree_never_excludes() {
    let criteria = load(&single_predicate("age", "gte", Some(json!(18))));
    let evaluation = evaluate(&criteria, &patient("P1", json!({"age": 40})), reference());
    assert_eq!(evaluation.trace.exclusion.result(), TriState::False);
    assert_eq!(evaluation.eligibility, Eligibility::Eligible);
}

#[test]
fn evaluation_does_not_depend_on_anything_but_inputs() {
    let criteria = load(&support::scenario_criteria(1));
    let record = patient("P1", json!({"age": 25, "diagnosis": "X"}));
    let first = evaluate(&criteria, &record, reference());
    let second = evaluate(&criteria, &record, reference());
    assert_eq!(first, second);
    assert_eq!(
        first.trace.canonical_hash().unwrap(),
        second.trace.canonical_hash().unwrap()
    );
    let later = evaluate(&criteria, &record, date("2030-01-01"));
    assert_eq!(later.eligibility, first.eligibility);
}

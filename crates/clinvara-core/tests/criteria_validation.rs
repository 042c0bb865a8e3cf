// crates/clinvara-core/tests/criteria_validation.rs
// ============================================================================
// Module: Criteria Validation Tests
// Description: Load-time type checking and structural limits.
// Purpose: Ensure malformed criteria are rejected whole, with locations.
// Dependencies: clinvara_core, serde_json
// ============================================================================
//! ## Overview
//! Criteria are type-checked against the study schema when loaded. These
//! tests cover unknown attributes, operator/type mismatches, malformed
//! arguments, identifier rules, and limits.

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

use clinvara_core::AttributePath;
use clinvara_core::CriteriaDocument;
use clinvara_core::CriteriaIssue;
use clinvara_core::CriteriaLimits;
use clinvara_core::CriteriaSet;
use clinvara_core::CriteriaValidationError;
use clinvara_core::CriterionId;
use clinvara_core::TreeSide;
use serde_json::Value;
use serde_json::json;
use support::STUDY;
use support::criteria_doc;
use support::load;
use support::schema;
use support::single_predicate;

/// Loads with default limits and returns the rejection.
fn reject(document: &CriteriaDocument) -> CriteriaValidationError {
    CriteriaSet::load(document, &schema(), &CriteriaLimits::default()).unwrap_err()
}

/// Rejection issue for a single predicate.
fn predicate_issue(attribute: &str, operator: &str, value: Option<Value>) -> CriteriaIssue {
    reject(&single_predicate(attribute, operator, value)).issue
}

// ============================================================================
// SECTION: Schema Checks
// ============================================================================

#[test]
fn unknown_attribute_is_rejected_with_location() {
    let err = reject(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 3,
        "inclusion_tree": {"kind": "and", "children": [
            {"kind": "predicate", "attribute": "age", "operator": "gte", "value": 18},
            {"kind": "predicate", "attribute": "ecog", "operator": "lte", "value": 1}
        ]}
    })));
    assert_eq!(err.issue, CriteriaIssue::UnknownAttribute(AttributePath::new("ecog")));
    assert_eq!(err.location.as_deref(), Some("inclusion/1"));
    assert_eq!(err.version, 3);
    let message = err.to_string();
    assert!(message.contains(STUDY));
    assert!(message.contains("inclusion/1"));
}

#[test]
fn operator_type_mismatches_are_rejected() {
    for (attribute, operator, value) in [
        ("diagnosis", "gte", json!(3)),
        ("age", "contains", json!("X")),
        ("last_visit", "in", json!(["2025-01-01"])),
        ("pregnant", "range", json!({"min": 0})),
        ("diagnosis_codes", "eq", json!("C50.9")),
        ("age", "before", json!(0)),
        ("derived_age", "eq", json!(18)),
    ] {
        let issue = predicate_issue(attribute, operator, Some(value));
        assert!(
            matches!(issue, CriteriaIssue::OperatorTypeMismatch { .. }),
            "{operator} on {attribute}: {issue:?}"
        );
    }
}

#[test]
fn unknown_operator_is_rejected() {
    assert_eq!(
        predicate_issue("age", "approximately", Some(json!(18))),
        CriteriaIssue::UnknownOperator("approximately".to_string())
    );
}

#[test]
fn malformed_arguments_are_rejected() {
    let invalid = [
        ("age", "gte", Some(json!("eighteen"))),
        ("diagnosis", "eq", Some(json!(7))),
        ("diagnosis", "in", Some(json!([]))),
        ("diagnosis", "in", Some(json!("X"))),
        ("hba1c", "range", Some(json!({}))),
        ("hba1c", "range", Some(json!({"min": 9, "max": 6}))),
        ("hba1c", "range", Some(json!({"min": 6, "max": 6, "min_inclusive": false}))),
        ("diagnosis_codes", "contains", Some(json!(""))),
        ("last_visit", "before", Some(json!("yesterday"))),
        ("last_visit", "after", Some(json!(10_000_000))),
        ("last_visit", "within", Some(json!({"days_before": -1}))),
        ("last_visit", "eq", Some(json!("2025-13-01"))),
    ];
    for (attribute, operator, value) in invalid {
        let issue = predicate_issue(attribute, operator, value.clone());
        assert!(
            matches!(issue, CriteriaIssue::InvalidValue { .. }),
            "{operator} {value:?}: {issue:?}"
        );
    }
}

#[test]
fn missing_and_unexpected_fields_are_rejected() {
    assert_eq!(predicate_issue("age", "gte", None), CriteriaIssue::MissingField("value"));
    assert_eq!(
        predicate_issue("diagnosis", "exists", Some(json!(true))),
        CriteriaIssue::UnexpectedField("value")
    );
    let err = reject(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "and", "attribute": "age", "children": []}
    })));
    assert_eq!(err.issue, CriteriaIssue::UnexpectedField("attribute"));
    let err = reject(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "predicate", "operator": "exists"}
    })));
    assert_eq!(err.issue, CriteriaIssue::MissingField("attribute"));
}

#[test]
fn not_requires_exactly_one_child() {
    let err = reject(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "not", "children": [
            {"kind": "predicate", "attribute": "age", "operator": "exists"},
            {"kind": "predicate", "attribute": "diagnosis", "operator": "exists"}
        ]}
    })));
    assert_eq!(err.issue, CriteriaIssue::NotArity(2));
}

#[test]
fn document_level_checks() {
    let mut wrong_study = support::scenario_criteria(1);
    wrong_study.study_id = "OTHER".into();
    assert!(matches!(reject(&wrong_study).issue, CriteriaIssue::StudyMismatch { .. }));

    let zero = support::scenario_criteria(0);
    assert_eq!(reject(&zero).issue, CriteriaIssue::ZeroVersion);

    let unknown_field = serde_json::from_value::<CriteriaDocument>(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "predicate", "attribute": "age", "operator": "exists"},
        "notes": "unexpected"
    }));
    assert!(unknown_field.is_err());
}

// ============================================================================
// SECTION: Identifiers And Limits
// ============================================================================

#[test]
fn criterion_ids_are_explicit_or_positional_and_unique() {
    let criteria = load(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "and", "children": [
            {"kind": "predicate", "id": "INC1", "attribute": "age", "operator": "gte", "value": 18},
            {"kind": "predicate", "attribute": "diagnosis", "operator": "eq", "value": "X"}
        ]},
        "exclusion_tree": {"kind": "predicate", "attribute": "pregnant", "operator": "eq", "value": true}
    })));
    let ids: Vec<_> = criteria
        .predicates()
        .into_iter()
        .map(|(side, predicate)| (side, predicate.id.to_string()))
        .collect();
    assert_eq!(
        ids,
        vec![
            (TreeSide::Inclusion, "INC1".to_string()),
            (TreeSide::Inclusion, "inclusion/1".to_string()),
            (TreeSide::Exclusion, "exclusion".to_string()),
        ]
    );

    let err = reject(&criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "predicate", "id": "C1", "attribute": "age", "operator": "exists"},
        "exclusion_tree": {"kind": "predicate", "id": "C1", "attribute": "pregnant", "operator": "exists"}
    })));
    assert_eq!(err.issue, CriteriaIssue::DuplicateCriterionId(CriterionId::new("C1")));
    assert_eq!(err.location.as_deref(), Some("exclusion"));
}

#[test]
fn depth_and_node_limits_are_enforced() {
    let mut node = json!({"kind": "predicate", "attribute": "age", "operator": "exists"});
    for _ in 0..5 {
        node = json!({"kind": "not", "children": [node]});
    }
    let deep = criteria_doc(json!({"study_id": STUDY, "version": 1, "inclusion_tree": node}));
    let tight = CriteriaLimits {
        max_depth: 4,
        max_nodes: 1024,
    };
    let err = CriteriaSet::load(&deep, &schema(), &tight).unwrap_err();
    assert_eq!(
        err.issue,
        CriteriaIssue::TooDeep {
            max: 4
        }
    );
    assert!(CriteriaSet::load(&deep, &schema(), &CriteriaLimits::default()).is_ok());

    let wide: Vec<Value> = (0..10)
        .map(|_| json!({"kind": "predicate", "attribute": "age", "operator": "exists"}))
        .collect();
    let wide = criteria_doc(json!({
        "study_id": STUDY,
        "version": 1,
        "inclusion_tree": {"kind": "or", "children": wide}
    }));
    let small = CriteriaLimits {
        max_depth: 32,
        max_nodes: 8,
    };
    let err = CriteriaSet::load(&wide, &schema(), &small).unwrap_err();
    assert_eq!(
        err.issue,
        CriteriaIssue::TooManyNodes {
            max: 8
        }
    );
}

#[test]
fn canonical_hash_ignores_document_key_order() {
    let first = load(&support::scenario_criteria(1));
    let reordered = load(&criteria_doc(json!({
        "inclusion_tree": {
            "children": [
                {"value": 18, "operator": "gte", "attribute": "age", "label": "Adult", "id": "INC1", "kind": "predicate"},
                {"value": "X", "operator": "eq", "attribute": "diagnosis", "id": "INC2", "kind": "predicate"}
            ],
            "kind": "and"
        },
        "version": 1,
        "study_id": STUDY
    })));
    assert_eq!(first.canonical_hash().unwrap(), reordered.canonical_hash().unwrap());
}

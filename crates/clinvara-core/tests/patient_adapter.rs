// crates/clinvara-core/tests/patient_adapter.rs
// ============================================================================
// Module: Patient Adapter Tests
// Description: Schema checks and patient document normalization.
// Purpose: Validate absence handling, unmapped keys, and type rejection.
// Dependencies: clinvara_core, serde_json
// ============================================================================
//! ## Overview
//! Covers the boundary between raw patient documents and typed records,
//! plus study schema validation.

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
use clinvara_core::AttributeValue;
use clinvara_core::PatientRecord;
use clinvara_core::PatientRecordError;
use clinvara_core::SchemaError;
use clinvara_core::StudySchema;
use serde_json::json;
use support::date;
use support::patient;
use support::patient_doc;
use support::schema;

// ============================================================================
// SECTION: Normalization
// ============================================================================

#[test]
fn null_values_are_treated_as_absent() {
    let record = patient("P1", json!({"age": null, "diagnosis": "X"}));
    assert!(record.value(&AttributePath::new("age")).is_none());
    assert_eq!(
        record.value(&AttributePath::new("diagnosis")),
        Some(&AttributeValue::Categorical("X".to_string()))
    );
}

#[test]
fn undeclared_attributes_are_listed_as_unmapped() {
    let record = patient("P1", json!({"zeta": 1, "age": 40, "alpha": "a"}));
    assert_eq!(record.unmapped, vec!["alpha".to_string(), "zeta".to_string()]);
    assert_eq!(record.attributes.len(), 1);
}

#[test]
fn typed_values_are_normalized() {
    let record = patient(
        "P1",
        json!({
            "birth_date": "1990-01-15",
            "diagnosis_codes": "C50.9",
            "pregnant": false
        }),
    );
    assert_eq!(
        record.value(&AttributePath::new("birth_date")),
        Some(&AttributeValue::Date(date("1990-01-15")))
    );
    assert_eq!(
        record.value(&AttributePath::new("diagnosis_codes")),
        Some(&AttributeValue::CodeList(vec!["C50.9".to_string()]))
    );
    assert_eq!(record.value(&AttributePath::new("pregnant")), Some(&AttributeValue::Boolean(false)));
}

#[test]
fn type_mismatch_rejects_the_record() {
    for attributes in [
        json!({"age": "forty"}),
        json!({"pregnant": "no"}),
        json!({"birth_date": "15/01/1990"}),
        json!({"diagnosis_codes": [1, 2]}),
        json!({"diagnosis": 3}),
    ] {
        let err = PatientRecord::from_document(&patient_doc("P1", attributes.clone()), &schema())
            .unwrap_err();
        assert!(
            matches!(err, PatientRecordError::TypeMismatch { .. }),
            "{attributes}: {err:?}"
        );
    }
}

#[test]
fn derived_attributes_cannot_be_supplied() {
    let err = PatientRecord::from_document(&patient_doc("P1", json!({"derived_age": 40})), &schema())
        .unwrap_err();
    let PatientRecordError::TypeMismatch {
        attribute, ..
    } = err
    else {
        panic!("expected type mismatch");
    };
    assert_eq!(attribute, AttributePath::new("derived_age"));
}

#[test]
fn blank_patient_id_is_rejected() {
    let err = PatientRecord::from_document(&patient_doc("  ", json!({})), &schema()).unwrap_err();
    assert!(matches!(err, PatientRecordError::MissingPatientId { .. }));
}

#[test]
fn unknown_document_fields_are_rejected() {
    let parsed = serde_json::from_value::<clinvara_core::PatientDocument>(json!({
        "patient_id": "P1",
        "attributes": {},
        "site": "Boston"
    }));
    assert!(parsed.is_err());
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

#[test]
fn fixture_schema_is_valid() {
    assert!(schema().validate().is_ok());
}

#[test]
fn derived_age_needs_a_date_source() {
    let bad: StudySchema = serde_json::from_value(json!({
        "study_id": "S",
        "attributes": {
            "age_years": {"type": "numeric"},
            "derived_age": {"type": "derived_age", "source": "age_years"}
        }
    }))
    .unwrap();
    assert!(matches!(bad.validate(), Err(SchemaError::InvalidDerivedSource { .. })));

    let dangling: StudySchema = serde_json::from_value(json!({
        "study_id": "S",
        "attributes": {"derived_age": {"type": "derived_age", "source": "dob"}}
    }))
    .unwrap();
    assert!(matches!(dangling.validate(), Err(SchemaError::InvalidDerivedSource { .. })));
}

#[test]
fn blank_study_and_paths_are_rejected() {
    let blank: StudySchema =
        serde_json::from_value(json!({"study_id": "", "attributes": {}})).unwrap();
    assert_eq!(blank.validate(), Err(SchemaError::MissingStudyId));
    let empty_path: StudySchema = serde_json::from_value(json!({
        "study_id": "S",
        "attributes": {"": {"type": "numeric"}}
    }))
    .unwrap();
    assert!(matches!(empty_path.validate(), Err(SchemaError::EmptyPath { .. })));
}

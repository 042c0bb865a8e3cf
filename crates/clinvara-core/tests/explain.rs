// crates/clinvara-core/tests/explain.rs
// ============================================================================
// Module: Rationale Tests
// Description: Verdict explanations built from stored traces.
// Purpose: Ensure reviewers see every criterion outcome and the missing data.
// Dependencies: clinvara_core, clinvara_logic, serde_json
// ============================================================================
//! ## Overview
//! Builds rationales for stored verdicts and checks the structured lines,
//! the missing-data list, and the plain-text rendering.

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
use clinvara_core::CriterionId;
use clinvara_core::Eligibility;
use clinvara_core::PatientId;
use clinvara_core::TreeSide;
use clinvara_core::runtime::RationaleNodeKind;
use clinvara_logic::TriState;
use serde_json::json;
use support::Harness;
use support::reference;
use support::version;

#[test]
fn indeterminate_rationale_lists_missing_data() {
    let h = Harness::new();
    h.publish_scenario(1);
    h.ingest("C", json!({"diagnosis": "X"}));
    let verdict = h.engine.evaluate(&h.ctx, version(1), &PatientId::new("C"), reference()).unwrap();

    let rationale = h.engine.explain_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    assert_eq!(rationale.eligibility, Eligibility::Indeterminate);
    assert_eq!(rationale.missing.len(), 1);
    assert_eq!(rationale.missing[0].criterion_id, CriterionId::new("INC1"));
    assert_eq!(rationale.missing[0].attribute, AttributePath::new("age"));
    assert_eq!(rationale.missing[0].side, TreeSide::Inclusion);

    let inclusion = &rationale.sections[0];
    assert_eq!(inclusion.side, TreeSide::Inclusion);
    assert_eq!(inclusion.result, TriState::Unknown);
    let kinds: Vec<_> = inclusion.lines.iter().map(|line| line.kind).collect();
    assert_eq!(
        kinds,
        vec![RationaleNodeKind::AllOf, RationaleNodeKind::Predicate, RationaleNodeKind::Predicate]
    );
    assert_eq!(inclusion.lines[1].result, TriState::Unknown);
    assert_eq!(inclusion.lines[2].result, TriState::True);
    assert_eq!(inclusion.lines[2].path, vec![1]);
    assert_eq!(inclusion.lines[2].depth, 1);
}

#[test]
fn determined_rationale_has_no_missing_data() {
    let h = Harness::new();
    h.publish_scenario(1);
    // Age is missing but the diagnosis already forces ineligibility.
    h.ingest("D", json!({"diagnosis": "Y"}));
    let verdict = h.engine.evaluate(&h.ctx, version(1), &PatientId::new("D"), reference()).unwrap();
    assert_eq!(verdict.eligibility, Eligibility::Ineligible);
    let rationale = h.engine.explain_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    assert!(rationale.missing.is_empty());
    assert_eq!(rationale.sections[1].side, TreeSide::Exclusion);
    assert_eq!(rationale.sections[1].result, TriState::False);
}

#[test]
fn text_rendering_shows_outcomes_and_observations() {
    let h = Harness::new();
    h.publish_scenario(1);
    h.ingest("C", json!({"diagnosis": "X"}));
    let verdict = h.engine.evaluate(&h.ctx, version(1), &PatientId::new("C"), reference()).unwrap();
    let rationale = h.engine.explain_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    let text = rationale.render_text();
    assert_eq!(text, rationale.to_string());
    assert!(text.ends_with('\n'));

    assert!(text.contains("Computed eligibility: indeterminate"));
    assert!(text.contains("Inclusion: unknown"));
    assert!(text.contains("[unknown] INC1: Adult (age >= 18) (observed: not recorded)"));
    assert!(text.contains("[true] INC2: diagnosis = \"X\" (observed: \"X\")"));
    assert!(text.contains("Missing data:"));
    assert!(text.contains("reference date 2025-06-01"));
}

#[test]
fn rationale_is_stable_for_a_stored_verdict() {
    let h = Harness::new();
    h.publish_scenario(1);
    h.ingest("A", json!({"age": 25, "diagnosis": "X"}));
    let verdict = h.engine.evaluate(&h.ctx, version(1), &PatientId::new("A"), reference()).unwrap();
    let first = h.engine.explain_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    let second = clinvara_core::explain(&h.engine.verdict(&h.ctx, &verdict.verdict_id).unwrap());
    assert_eq!(first, second);
    assert_eq!(first.render_text(), second.render_text());
}

// crates/clinvara-core/tests/review.rs
// ============================================================================
// Module: Review Workflow Tests
// Description: Override validation, precedence, and effective verdicts.
// Purpose: Ensure overrides never mutate verdicts and the latest one wins.
// Dependencies: clinvara_core, serde_json
// ============================================================================
//! ## Overview
//! Exercises `submit_override`, `list_overrides`, and `effective_verdict`
//! through the engine, including rejected submissions that must leave no
//! trace in the override store or the audit chain.

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

use clinvara_core::ActorId;
use clinvara_core::AuditRange;
use clinvara_core::Eligibility;
use clinvara_core::EngineError;
use clinvara_core::OverrideRequest;
use clinvara_core::OverrideValidationError;
use clinvara_core::PatientId;
use clinvara_core::ReviewState;
use clinvara_core::SequenceNo;
use clinvara_core::Timestamp;
use clinvara_core::Verdict;
use clinvara_core::VerdictId;
use clinvara_core::VerdictSource;
use serde_json::json;
use support::Harness;
use support::START_MS;
use support::reference;
use support::version;

/// Publishes the scenario and evaluates an indeterminate patient.
fn indeterminate_verdict(h: &Harness) -> Verdict {
    h.publish_scenario(1);
    h.ingest("C", json!({"diagnosis": "X"}));
    h.engine.evaluate(&h.ctx, version(1), &PatientId::new("C"), reference()).unwrap()
}

/// Builds an override request.
fn request(
    verdict_id: &VerdictId,
    value: Eligibility,
    note: &str,
    actor: Option<&str>,
    timestamp: Option<i64>,
) -> OverrideRequest {
    OverrideRequest {
        verdict_id: verdict_id.clone(),
        value,
        note: note.to_string(),
        actor: actor.map(ActorId::new),
        timestamp: timestamp.map(Timestamp::from_unix_millis),
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

#[test]
fn blank_note_is_rejected_and_nothing_is_recorded() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    for note in ["", "   \n\t"] {
        let err = h
            .engine
            .submit_override(
                &h.ctx,
                &request(&verdict.verdict_id, Eligibility::Eligible, note, Some("cra"), None),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::OverrideRejected(OverrideValidationError::EmptyNote { .. })));
    }
    assert!(h.engine.list_overrides(&h.ctx, &verdict.verdict_id).unwrap().is_empty());
    assert_eq!(h.engine.audit_log(&h.ctx, AuditRange::all()).unwrap().len(), 1);
    let effective = h.engine.effective_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    assert_eq!(effective.review_state, ReviewState::AutoComputed);
    assert_eq!(h.event_names().iter().filter(|name| *name == "override_rejected").count(), 2);
}

#[test]
fn missing_actor_is_rejected() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    for actor in [None, Some(" ")] {
        let err = h
            .engine
            .submit_override(
                &h.ctx,
                &request(&verdict.verdict_id, Eligibility::Eligible, "checked chart", actor, None),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::OverrideRejected(OverrideValidationError::MissingActor { .. })
        ));
    }
    assert!(h.engine.study_overrides(&h.ctx).unwrap().is_empty());
}

#[test]
fn override_of_unknown_verdict_is_not_found() {
    let h = Harness::new();
    h.publish_scenario(1);
    let err = h
        .engine
        .submit_override(
            &h.ctx,
            &request(&VerdictId::new("missing"), Eligibility::Eligible, "note", Some("cra"), None),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::VerdictNotFound { .. }));
    assert!(h.engine.audit_log(&h.ctx, AuditRange::all()).unwrap().is_empty());
}

// ============================================================================
// SECTION: Precedence
// ============================================================================

#[test]
fn latest_timestamp_wins_over_submission_order() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    let id = &verdict.verdict_id;
    h.engine
        .submit_override(&h.ctx, &request(id, Eligibility::Ineligible, "later", Some("a"), Some(START_MS + 500)))
        .unwrap();
    h.engine
        .submit_override(&h.ctx, &request(id, Eligibility::Eligible, "earlier", Some("b"), Some(START_MS + 100)))
        .unwrap();

    let effective = h.engine.effective_verdict(&h.ctx, id).unwrap();
    assert_eq!(effective.value, Eligibility::Ineligible);
    assert_eq!(effective.override_count, 2);
    assert_eq!(effective.deciding_override.unwrap().note, "later");
}

#[test]
fn equal_timestamps_resolve_by_audit_sequence() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    let id = &verdict.verdict_id;
    let at = Some(START_MS + 1_000);
    let first = h
        .engine
        .submit_override(&h.ctx, &request(id, Eligibility::Ineligible, "first", Some("a"), at))
        .unwrap();
    let second = h
        .engine
        .submit_override(&h.ctx, &request(id, Eligibility::Eligible, "second", Some("b"), at))
        .unwrap();
    assert!(first.sequence_no < second.sequence_no);
    assert_eq!(second.sequence_no, SequenceNo::from_index(2));

    let effective = h.engine.effective_verdict(&h.ctx, id).unwrap();
    assert_eq!(effective.value, Eligibility::Eligible);
    assert_eq!(effective.source, VerdictSource::Override);
}

#[test]
fn overrides_are_listed_in_insertion_order_and_verdict_is_untouched() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    let id = &verdict.verdict_id;
    for (offset, value) in [(30, Eligibility::Eligible), (10, Eligibility::Ineligible), (20, Eligibility::Eligible)] {
        h.clock.advance(offset);
        h.engine
            .submit_override(&h.ctx, &request(id, value, &format!("step {offset}"), Some("cra"), None))
            .unwrap();
    }
    let notes: Vec<_> = h
        .engine
        .list_overrides(&h.ctx, id)
        .unwrap()
        .into_iter()
        .map(|record| record.note)
        .collect();
    assert_eq!(notes, vec!["step 30", "step 10", "step 20"]);
    assert_eq!(h.engine.verdict(&h.ctx, id).unwrap(), verdict);

    // Clock only moved forward, so the last submission is also the latest.
    let effective = h.engine.effective_verdict(&h.ctx, id).unwrap();
    assert_eq!(effective.value, Eligibility::Eligible);
    assert_eq!(effective.computed, Eligibility::Indeterminate);
}

#[test]
fn override_may_restate_the_computed_value() {
    let h = Harness::new();
    let verdict = indeterminate_verdict(&h);
    h.engine
        .submit_override(
            &h.ctx,
            &request(&verdict.verdict_id, Eligibility::Indeterminate, "awaiting labs", Some("cra"), None),
        )
        .unwrap();
    let effective = h.engine.effective_verdict(&h.ctx, &verdict.verdict_id).unwrap();
    assert_eq!(effective.value, Eligibility::Indeterminate);
    assert_eq!(effective.review_state, ReviewState::Overridden);
    assert_eq!(effective.source, VerdictSource::Override);
}

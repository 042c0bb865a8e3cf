// crates/clinvara-core/tests/event_sinks.rs
// ============================================================================
// Module: Event Sink Tests
// Description: JSON-lines output of the file event sink.
// Dependencies: clinvara_core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Runs a small screening session against a file sink and reads the JSON
//! lines back, including across a reopen of the same file.

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

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clinvara_core::EngineConfig;
use clinvara_core::EngineStores;
use clinvara_core::FileEventSink;
use clinvara_core::FixedClock;
use clinvara_core::PatientId;
use clinvara_core::ScreeningEngine;
use clinvara_core::Timestamp;
use serde_json::Value;
use serde_json::json;
use support::START_MS;
use support::patient_doc;
use support::reference;
use support::scenario_criteria;
use support::schema;
use support::version;
use tempfile::TempDir;

/// Engine over fresh in-memory stores writing events to `path`.
fn engine_with_file_sink(path: &Path) -> ScreeningEngine {
    ScreeningEngine::new(
        EngineConfig::default(),
        EngineStores::in_memory(),
        Arc::new(FixedClock(Timestamp::from_unix_millis(START_MS))),
        Arc::new(FileEventSink::new(path).unwrap()),
    )
}

/// Reads the sink file as parsed JSON lines.
fn read_events(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn file_sink_writes_one_json_line_per_event() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("events.jsonl");
    let engine = engine_with_file_sink(&path);
    let ctx = engine.open_study(schema()).unwrap();
    engine.publish_criteria(&ctx, &scenario_criteria(1)).unwrap();
    engine.ingest_patient(&ctx, &patient_doc("A", json!({"age": 40, "diagnosis": "X"}))).unwrap();
    engine.evaluate(&ctx, version(1), &PatientId::new("A"), reference()).unwrap();

    let events = read_events(&path);
    let names: Vec<&str> = events.iter().map(|event| event["event"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["criteria_published", "verdict_computed"]);
    assert_eq!(events[1]["timestamp_ms"], json!(START_MS));
    assert_eq!(events[1]["verdict_id"], json!("ONC-001:v1:A"));
}

#[test]
fn file_sink_appends_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("events.jsonl");
    for _ in 0..2 {
        let engine = engine_with_file_sink(&path);
        let ctx = engine.open_study(schema()).unwrap();
        engine.publish_criteria(&ctx, &scenario_criteria(1)).unwrap();
    }
    let events = read_events(&path);
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event["event"] == json!("criteria_published")));
}

// crates/clinvara-core/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared schema, documents, and engine fixtures.
// ============================================================================
//! ## Overview
//! Builds the screening fixtures used across the core integration tests: a
//! study schema covering every attribute type, criteria and patient documents
//! from JSON, and an engine wired to in-memory stores, a manual clock, and a
//! memory event sink.

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
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use clinvara_core::ClinicalDate;
use clinvara_core::CriteriaDocument;
use clinvara_core::CriteriaLimits;
use clinvara_core::CriteriaSet;
use clinvara_core::CriteriaVersion;
use clinvara_core::EngineConfig;
use clinvara_core::EngineStores;
use clinvara_core::ManualClock;
use clinvara_core::MemoryEventSink;
use clinvara_core::PatientDocument;
use clinvara_core::PatientRecord;
use clinvara_core::ScreeningEngine;
use clinvara_core::StudyContext;
use clinvara_core::StudySchema;
use clinvara_core::Timestamp;
use serde_json::Value;
use serde_json::json;

/// Study used by every fixture.
pub const STUDY: &str = "ONC-001";

/// Start time of the manual clock.
pub const START_MS: i64 = 1_700_000_000_000;

/// Schema with one attribute of each declared type.
pub fn schema() -> StudySchema {
    serde_json::from_value(json!({
        "study_id": STUDY,
        "attributes": {
            "age": {"type": "numeric"},
            "diagnosis": {"type": "categorical"},
            "diagnosis_codes": {"type": "code_list"},
            "birth_date": {"type": "date"},
            "last_visit": {"type": "date"},
            "pregnant": {"type": "boolean"},
            "hba1c": {"type": "numeric"},
            "derived_age": {"type": "derived_age", "source": "birth_date"}
        }
    }))
    .unwrap()
}

/// Parses a criteria document from JSON.
pub fn criteria_doc(value: Value) -> CriteriaDocument {
    serde_json::from_value(value).unwrap()
}

/// Inclusion `age >= 18 AND diagnosis = "X"`, no exclusion tree.
pub fn scenario_criteria(version: u64) -> CriteriaDocument {
    criteria_doc(json!({
        "study_id": STUDY,
        "version": version,
        "inclusion_tree": {
            "kind": "and",
            "children": [
                {"kind": "predicate", "id": "INC1", "label": "Adult", "attribute": "age", "operator": "gte", "value": 18},
                {"kind": "predicate", "id": "INC2", "attribute": "diagnosis", "operator": "eq", "value": "X"}
            ]
        }
    }))
}

/// Builds a single-predicate criteria document.
pub fn single_predicate(attribute: &str, operator: &str, value: Option<Value>) -> CriteriaDocument {
    let mut node = json!({"kind": "predicate", "id": "P1", "attribute": attribute, "operator": operator});
    if let Some(value) = value {
        node["value"] = value;
    }
    criteria_doc(json!({"study_id": STUDY, "version": 1, "inclusion_tree": node}))
}

/// Loads a criteria document against the fixture schema.
pub fn load(document: &CriteriaDocument) -> CriteriaSet {
    CriteriaSet::load(document, &schema(), &CriteriaLimits::default()).unwrap()
}

/// Parses a patient document from an id and attribute object.
pub fn patient_doc(patient_id: &str, attributes: Value) -> PatientDocument {
    serde_json::from_value(json!({"patient_id": patient_id, "attributes": attributes})).unwrap()
}

/// Normalizes a patient document against the fixture schema.
pub fn patient(patient_id: &str, attributes: Value) -> PatientRecord {
    PatientRecord::from_document(&patient_doc(patient_id, attributes), &schema()).unwrap()
}

/// Parses an ISO date.
pub fn date(text: &str) -> ClinicalDate {
    ClinicalDate::parse(text).unwrap()
}

/// Default reference date.
pub fn reference() -> ClinicalDate {
    date("2025-06-01")
}

/// Builds a criteria version.
pub fn version(raw: u64) -> CriteriaVersion {
    CriteriaVersion::from_raw(raw).unwrap()
}

/// Engine wired to in-memory stores with inspectable clock and events.
pub struct Harness {
    /// Engine under test.
    pub engine: ScreeningEngine,
    /// Study context for the fixture schema.
    pub ctx: StudyContext,
    /// Clock driving audit timestamps.
    pub clock: Arc<ManualClock>,
    /// Captured events.
    pub events: Arc<MemoryEventSink>,
    /// Stores shared with the engine.
    pub stores: EngineStores,
}

impl Harness {
    /// Builds a harness over fresh in-memory stores.
    pub fn new() -> Self {
        Self::with_stores(EngineStores::in_memory(), EngineConfig::default())
    }

    /// Builds a harness over the given stores and configuration.
    pub fn with_stores(stores: EngineStores, config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(Timestamp::from_unix_millis(START_MS)));
        let events = Arc::new(MemoryEventSink::new());
        let engine = ScreeningEngine::new(config, stores.clone(), clock.clone(), events.clone());
        let ctx = engine.open_study(schema()).unwrap();
        Self {
            engine,
            ctx,
            clock,
            events,
            stores,
        }
    }

    /// Publishes the scenario criteria at `version`.
    pub fn publish_scenario(&self, version: u64) {
        self.engine.publish_criteria(&self.ctx, &scenario_criteria(version)).unwrap();
    }

    /// Ingests a patient.
    pub fn ingest(&self, patient_id: &str, attributes: Value) -> PatientRecord {
        self.engine.ingest_patient(&self.ctx, &patient_doc(patient_id, attributes)).unwrap()
    }

    /// Returns captured event names in order.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .events()
            .iter()
            .map(|event| event["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

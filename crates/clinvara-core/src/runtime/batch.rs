// crates/clinvara-core/src/runtime/batch.rs
// ============================================================================
// Module: Clinvara Batch Re-Evaluation
// Description: Restartable re-evaluation of many patients at one version.
// Purpose: Evaluate in parallel, then record in ascending patient order.
// Dependencies: serde, crate::{core, runtime::engine, runtime::matcher}
// ============================================================================

//! ## Overview
//! A batch runs in two phases. Pure evaluation is spread across scoped worker
//! threads with no shared mutable state. Recording then happens serially in
//! ascending patient order so audit sequence numbers are reproducible for the
//! same input. Patients that already have a verdict at the version are
//! skipped, which makes an interrupted batch safe to re-run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;

use serde::Deserialize;
use serde::Serialize;

use crate::core::ClinicalDate;
use crate::core::CriteriaVersion;
use crate::core::PatientId;
use crate::core::PatientRecord;
use crate::core::StudyId;
use crate::core::Verdict;
use crate::core::VerdictId;
use crate::interfaces::EngineEvent;
use crate::interfaces::PublishedCriteria;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::RecordOutcome;
use crate::runtime::engine::ScreeningEngine;
use crate::runtime::engine::StudyContext;
use crate::runtime::matcher::evaluate_verdict;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of a batch re-evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Study identifier.
    pub study_id: StudyId,
    /// Criteria version evaluated.
    pub version: CriteriaVersion,
    /// Verdicts recorded by this run, in ascending patient order.
    pub evaluated: Vec<VerdictId>,
    /// Patients that already had a verdict at the version.
    pub skipped: Vec<PatientId>,
    /// Requested patients with no ingested record.
    pub missing: Vec<PatientId>,
}

// ============================================================================
// SECTION: Batch Operations
// ============================================================================

impl ScreeningEngine {
    /// Re-evaluates the given patients at a criteria version.
    ///
    /// Duplicate identifiers are collapsed. Missing patients are reported in
    /// the result rather than failing the batch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the version is absent, a worker panics,
    /// or recording fails. Verdicts recorded before the failure remain and a
    /// re-run skips them.
    pub fn reevaluate_batch(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
        patient_ids: &[PatientId],
        reference_date: ClinicalDate,
    ) -> Result<BatchReport, EngineError> {
        let published = self.criteria(ctx, version)?;
        let mut requested = patient_ids.to_vec();
        requested.sort();
        requested.dedup();

        let mut report = BatchReport {
            study_id: ctx.study_id().clone(),
            version,
            evaluated: Vec::new(),
            skipped: Vec::new(),
            missing: Vec::new(),
        };
        let mut pending = Vec::new();
        for patient_id in requested {
            let verdict_id = VerdictId::derive(ctx.study_id(), version, &patient_id);
            match self.verdict(ctx, &verdict_id) {
                Ok(_) => {
                    report.skipped.push(patient_id);
                    continue;
                }
                Err(EngineError::VerdictNotFound {
                    ..
                }) => {}
                Err(err) => return Err(err),
            }
            match self.patient(ctx, &patient_id) {
                Ok(record) => pending.push(record),
                Err(EngineError::PatientNotFound(_)) => report.missing.push(patient_id),
                Err(err) => return Err(err),
            }
        }

        let computed = evaluate_parallel(
            ctx.study_id(),
            &published,
            &pending,
            reference_date,
            self.config().batch_workers,
        )?;
        for verdict in computed {
            match self.record_verdict(ctx, verdict)? {
                RecordOutcome::Recorded(verdict) => report.evaluated.push(verdict.verdict_id),
                RecordOutcome::Reused(verdict) => report.skipped.push(verdict.patient_id),
            }
        }
        report.skipped.sort();

        self.emit(EngineEvent::BatchCompleted {
            study_id: ctx.study_id().clone(),
            version,
            evaluated: report.evaluated.len(),
            skipped: report.skipped.len(),
            missing: report.missing.len(),
        });
        Ok(report)
    }

    /// Re-evaluates every ingested patient of the study.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] under the same conditions as
    /// [`ScreeningEngine::reevaluate_batch`].
    pub fn reevaluate_all(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
        reference_date: ClinicalDate,
    ) -> Result<BatchReport, EngineError> {
        let patient_ids = self.patient_ids(ctx)?;
        self.reevaluate_batch(ctx, version, &patient_ids, reference_date)
    }
}

/// Evaluates records on scoped worker threads, preserving input order.
fn evaluate_parallel(
    study_id: &StudyId,
    published: &PublishedCriteria,
    records: &[PatientRecord],
    reference_date: ClinicalDate,
    workers: usize,
) -> Result<Vec<Verdict>, EngineError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, records.len());
    let chunk_size = records.len().div_ceil(workers);
    thread::scope(|scope| {
        let handles: Vec<_> = records
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|record| evaluate_verdict(published, record, reference_date))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect();
        let mut verdicts = Vec::with_capacity(records.len());
        for handle in handles {
            let chunk = handle.join().map_err(|_| EngineError::WorkerPanicked {
                study_id: study_id.clone(),
            })??;
            verdicts.extend(chunk);
        }
        Ok(verdicts)
    })
}

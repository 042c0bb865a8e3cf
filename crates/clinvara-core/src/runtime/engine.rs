// crates/clinvara-core/src/runtime/engine.rs
// ============================================================================
// Module: Clinvara Screening Engine
// Description: Study-scoped orchestration of criteria, verdicts, and reviews.
// Purpose: Record verdicts and overrides onto the audit chain under one writer.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! [`ScreeningEngine`] owns the stores, clock, and event sink. Callers first
//! open a [`StudyContext`] and pass it to every operation; the context carries
//! the study schema and the per-study write lock that serializes audit
//! appends and override submissions. Evaluation itself stays pure and runs
//! outside the lock; only recording is serialized.
//!
//! Security posture: criteria and patient documents are untrusted input and
//! are fully validated before anything is stored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use thiserror::Error;

use crate::core::ActorId;
use crate::core::AuditCorruptionError;
use crate::core::AuditEntry;
use crate::core::AuditPayload;
use crate::core::AuditVerification;
use crate::core::ClinicalDate;
use crate::core::CriteriaDocument;
use crate::core::CriteriaLimits;
use crate::core::CriteriaSet;
use crate::core::CriteriaValidationError;
use crate::core::CriteriaVersion;
use crate::core::EffectiveVerdict;
use crate::core::HashError;
use crate::core::Override;
use crate::core::OverrideRecord;
use crate::core::OverrideRequest;
use crate::core::OverrideValidationError;
use crate::core::PatientDocument;
use crate::core::PatientId;
use crate::core::PatientNotFoundError;
use crate::core::PatientRecord;
use crate::core::PatientRecordError;
use crate::core::SchemaError;
use crate::core::StudyId;
use crate::core::StudySchema;
use crate::core::Verdict;
use crate::core::VerdictId;
use crate::core::VerdictRecord;
use crate::core::resolve_effective;
use crate::interfaces::AuditRange;
use crate::interfaces::Clock;
use crate::interfaces::EngineEvent;
use crate::interfaces::EventRecord;
use crate::interfaces::EventSink;
use crate::interfaces::PublishedCriteria;
use crate::interfaces::StoreError;
use crate::runtime::audit_log::StudyAuditLog;
use crate::runtime::explain::Rationale;
use crate::runtime::explain::explain;
use crate::runtime::matcher::evaluate_verdict;
use crate::runtime::store::EngineStores;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Operation needs the study schema but the context was opened without one.
    #[error("study {study_id} was opened without a schema")]
    SchemaRequired {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Schema declaration is invalid.
    #[error(transparent)]
    InvalidSchema(#[from] SchemaError),
    /// Criteria document rejected at load time.
    #[error(transparent)]
    CriteriaValidation(Box<CriteriaValidationError>),
    /// Criteria version is not published.
    #[error("criteria version {version} not found for study {study_id}")]
    CriteriaNotFound {
        /// Study identifier.
        study_id: StudyId,
        /// Requested version.
        version: CriteriaVersion,
    },
    /// Version already published with different content.
    #[error("criteria version {version} already published for study {study_id} with a different hash")]
    CriteriaVersionConflict {
        /// Study identifier.
        study_id: StudyId,
        /// Conflicting version.
        version: CriteriaVersion,
    },
    /// Version does not exceed the latest published version.
    #[error("criteria version {version} for study {study_id} must exceed latest version {latest}")]
    CriteriaVersionRegression {
        /// Study identifier.
        study_id: StudyId,
        /// Submitted version.
        version: CriteriaVersion,
        /// Latest published version.
        latest: CriteriaVersion,
    },
    /// Patient document rejected by the adapter.
    #[error(transparent)]
    PatientRecord(#[from] PatientRecordError),
    /// Patient already ingested with different attributes.
    #[error("patient {patient_id} already ingested for study {study_id} with different attributes")]
    PatientConflict {
        /// Study identifier.
        study_id: StudyId,
        /// Patient identifier.
        patient_id: PatientId,
    },
    /// Patient record is absent.
    #[error(transparent)]
    PatientNotFound(#[from] PatientNotFoundError),
    /// Verdict is absent.
    #[error("verdict {verdict_id} not found in study {study_id}")]
    VerdictNotFound {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
    },
    /// Verdict exists for a different reference date.
    #[error(
        "verdict {verdict_id} in study {study_id} was computed for reference date {recorded}, \
         not {requested}"
    )]
    VerdictConflict {
        /// Study identifier.
        study_id: StudyId,
        /// Verdict identifier.
        verdict_id: VerdictId,
        /// Reference date of the stored verdict.
        recorded: ClinicalDate,
        /// Reference date requested.
        requested: ClinicalDate,
    },
    /// Override failed validation and was not applied.
    #[error(transparent)]
    OverrideRejected(#[from] OverrideValidationError),
    /// Audit chain failed verification.
    #[error(transparent)]
    AuditCorruption(#[from] AuditCorruptionError),
    /// Audit sequence numbers are exhausted.
    #[error("audit sequence exhausted for study {study_id}")]
    SequenceExhausted {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Study write lock was poisoned by a panicking writer.
    #[error("write lock poisoned for study {study_id}")]
    LockPoisoned {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Batch evaluation worker panicked.
    #[error("batch evaluation worker panicked for study {study_id}")]
    WorkerPanicked {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Canonical hashing failure.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl From<CriteriaValidationError> for EngineError {
    fn from(err: CriteriaValidationError) -> Self {
        Self::CriteriaValidation(Box::new(err))
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default number of batch evaluation workers.
pub const DEFAULT_BATCH_WORKERS: usize = 4;
/// Actor recorded on entries the engine writes on its own behalf.
pub const ENGINE_ACTOR: &str = "clinvara-engine";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Limits applied when loading criteria.
    pub limits: CriteriaLimits,
    /// Worker threads used by batch re-evaluation.
    pub batch_workers: usize,
    /// Actor recorded on `VERDICT_COMPUTED` entries.
    pub system_actor: ActorId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: CriteriaLimits::default(),
            batch_workers: DEFAULT_BATCH_WORKERS,
            system_actor: ActorId::new(ENGINE_ACTOR),
        }
    }
}

// ============================================================================
// SECTION: Study Context
// ============================================================================

/// Study-scoped handle threaded through every engine operation.
#[derive(Debug, Clone)]
pub struct StudyContext {
    /// Study identifier.
    study_id: StudyId,
    /// Attribute schema, when the study was opened with one.
    schema: Option<Arc<StudySchema>>,
    /// Serializes audit appends and override submissions for the study.
    write_lock: Arc<Mutex<()>>,
}

impl StudyContext {
    /// Returns the study identifier.
    #[must_use]
    pub const fn study_id(&self) -> &StudyId {
        &self.study_id
    }

    /// Returns the schema, if the study was opened with one.
    #[must_use]
    pub fn schema(&self) -> Option<&StudySchema> {
        self.schema.as_deref()
    }

    /// Returns the schema or fails when the context has none.
    fn require_schema(&self) -> Result<&StudySchema, EngineError> {
        self.schema().ok_or_else(|| EngineError::SchemaRequired {
            study_id: self.study_id.clone(),
        })
    }

    /// Acquires the study write lock.
    pub(crate) fn lock(&self) -> Result<StudyWriteGuard<'_>, EngineError> {
        let guard = self.write_lock.lock().map_err(|_| EngineError::LockPoisoned {
            study_id: self.study_id.clone(),
        })?;
        Ok(StudyWriteGuard {
            _guard: guard,
        })
    }
}

/// Proof that the study write lock is held.
pub struct StudyWriteGuard<'a> {
    /// Held lock.
    _guard: MutexGuard<'a, ()>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Outcome of recording a computed verdict.
pub(crate) enum RecordOutcome {
    /// Verdict stored and audited.
    Recorded(Verdict),
    /// Identical verdict already stored; nothing written.
    Reused(Verdict),
}

/// Screening engine over pluggable stores.
pub struct ScreeningEngine {
    /// Engine configuration.
    config: EngineConfig,
    /// Backing stores.
    stores: EngineStores,
    /// Time source for audit entries and overrides.
    clock: Arc<dyn Clock + Send + Sync>,
    /// Structured event sink.
    events: Arc<dyn EventSink>,
    /// Write locks handed out per study.
    study_locks: Mutex<BTreeMap<StudyId, Arc<Mutex<()>>>>,
}

impl ScreeningEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        stores: EngineStores,
        clock: Arc<dyn Clock + Send + Sync>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            stores,
            clock,
            events,
            study_locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Opens a study with its attribute schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSchema`] when the schema is malformed.
    pub fn open_study(&self, schema: StudySchema) -> Result<StudyContext, EngineError> {
        schema.validate()?;
        let study_id = schema.study_id.clone();
        Ok(StudyContext {
            write_lock: self.study_lock(&study_id)?,
            study_id,
            schema: Some(Arc::new(schema)),
        })
    }

    /// Opens a study for read, review, and audit operations only.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LockPoisoned`] when the lock table is poisoned.
    pub fn open_study_without_schema(&self, study_id: StudyId) -> Result<StudyContext, EngineError> {
        Ok(StudyContext {
            write_lock: self.study_lock(&study_id)?,
            study_id,
            schema: None,
        })
    }

    /// Returns the shared write lock for a study, creating it on first use.
    fn study_lock(&self, study_id: &StudyId) -> Result<Arc<Mutex<()>>, EngineError> {
        let mut locks = self.study_locks.lock().map_err(|_| EngineError::LockPoisoned {
            study_id: study_id.clone(),
        })?;
        Ok(Arc::clone(locks.entry(study_id.clone()).or_default()))
    }

    /// Stamps and records an event.
    pub(crate) fn emit(&self, event: EngineEvent) {
        self.events.record(&EventRecord {
            timestamp_ms: self.clock.now(),
            event,
        });
    }

    /// Returns the audit log handle for a study.
    fn audit<'a>(&'a self, ctx: &'a StudyContext) -> StudyAuditLog<'a> {
        StudyAuditLog::new(self.stores.audit.as_ref(), &ctx.study_id)
    }

    // ------------------------------------------------------------------------
    // Criteria
    // ------------------------------------------------------------------------

    /// Validates and publishes a criteria version.
    ///
    /// Republishing an identical version is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the document is invalid, the version
    /// conflicts with or does not exceed published versions, or storage fails.
    pub fn publish_criteria(
        &self,
        ctx: &StudyContext,
        document: &CriteriaDocument,
    ) -> Result<PublishedCriteria, EngineError> {
        let criteria = CriteriaSet::load(document, ctx.require_schema()?, &self.config.limits)?;
        let criteria_hash = criteria.canonical_hash()?;
        let version = criteria.version;

        let guard = ctx.lock()?;
        if let Some(existing) = self.stores.criteria.get(&ctx.study_id, version)? {
            drop(guard);
            if existing.criteria_hash != criteria_hash {
                return Err(EngineError::CriteriaVersionConflict {
                    study_id: ctx.study_id.clone(),
                    version,
                });
            }
            self.emit(EngineEvent::CriteriaPublished {
                study_id: ctx.study_id.clone(),
                version,
                criteria_hash,
                idempotent: true,
            });
            return Ok(existing);
        }
        if let Some(latest) = self.stores.criteria.latest_version(&ctx.study_id)?
            && latest >= version
        {
            return Err(EngineError::CriteriaVersionRegression {
                study_id: ctx.study_id.clone(),
                version,
                latest,
            });
        }
        let record = PublishedCriteria {
            criteria,
            criteria_hash: criteria_hash.clone(),
            published_at: self.clock.now(),
        };
        self.stores.criteria.publish(&record)?;
        drop(guard);

        self.emit(EngineEvent::CriteriaPublished {
            study_id: ctx.study_id.clone(),
            version,
            criteria_hash,
            idempotent: false,
        });
        Ok(record)
    }

    /// Loads a published criteria version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CriteriaNotFound`] when the version is absent.
    pub fn criteria(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
    ) -> Result<PublishedCriteria, EngineError> {
        self.stores.criteria.get(&ctx.study_id, version)?.ok_or_else(|| {
            EngineError::CriteriaNotFound {
                study_id: ctx.study_id.clone(),
                version,
            }
        })
    }

    /// Returns the latest published criteria version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn latest_version(&self, ctx: &StudyContext) -> Result<Option<CriteriaVersion>, EngineError> {
        Ok(self.stores.criteria.latest_version(&ctx.study_id)?)
    }

    // ------------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------------

    /// Normalizes and stores a patient document.
    ///
    /// Re-ingesting an identical record is idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the document fails the adapter, conflicts
    /// with an ingested record, or storage fails.
    pub fn ingest_patient(
        &self,
        ctx: &StudyContext,
        document: &PatientDocument,
    ) -> Result<PatientRecord, EngineError> {
        let record = PatientRecord::from_document(document, ctx.require_schema()?)?;
        let guard = ctx.lock()?;
        match self.stores.patients.get(&ctx.study_id, &record.patient_id)? {
            Some(existing) if existing == record => Ok(existing),
            Some(_) => Err(EngineError::PatientConflict {
                study_id: ctx.study_id.clone(),
                patient_id: record.patient_id,
            }),
            None => {
                self.stores.patients.insert(&ctx.study_id, &record)?;
                drop(guard);
                Ok(record)
            }
        }
    }

    /// Loads a patient record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PatientNotFound`] when the record is absent.
    pub fn patient(
        &self,
        ctx: &StudyContext,
        patient_id: &PatientId,
    ) -> Result<PatientRecord, EngineError> {
        self.stores.patients.get(&ctx.study_id, patient_id)?.ok_or_else(|| {
            EngineError::PatientNotFound(PatientNotFoundError {
                study_id: ctx.study_id.clone(),
                patient_id: patient_id.clone(),
            })
        })
    }

    /// Lists ingested patients in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn patient_ids(&self, ctx: &StudyContext) -> Result<Vec<PatientId>, EngineError> {
        Ok(self.stores.patients.patient_ids(&ctx.study_id)?)
    }

    // ------------------------------------------------------------------------
    // Verdicts
    // ------------------------------------------------------------------------

    /// Evaluates a patient, records the verdict, and appends `VERDICT_COMPUTED`.
    ///
    /// A repeated call with the same reference date returns the stored
    /// verdict without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the criteria or patient are absent, a
    /// verdict exists for another reference date, or recording fails.
    pub fn evaluate(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
        patient_id: &PatientId,
        reference_date: ClinicalDate,
    ) -> Result<Verdict, EngineError> {
        let published = self.criteria(ctx, version)?;
        let verdict_id = VerdictId::derive(&ctx.study_id, version, patient_id);
        if let Some(existing) = self.stores.verdicts.get(&ctx.study_id, &verdict_id)? {
            return self.reuse(ctx, existing, reference_date);
        }
        let record = self.patient(ctx, patient_id)?;
        let verdict = evaluate_verdict(&published, &record, reference_date)?;
        match self.record_verdict(ctx, verdict)? {
            RecordOutcome::Recorded(verdict) => Ok(verdict),
            RecordOutcome::Reused(verdict) => self.reuse(ctx, verdict, reference_date),
        }
    }

    /// Returns a stored verdict when its reference date matches the request.
    fn reuse(
        &self,
        ctx: &StudyContext,
        existing: Verdict,
        reference_date: ClinicalDate,
    ) -> Result<Verdict, EngineError> {
        if existing.reference_date != reference_date {
            return Err(EngineError::VerdictConflict {
                study_id: ctx.study_id.clone(),
                verdict_id: existing.verdict_id,
                recorded: existing.reference_date,
                requested: reference_date,
            });
        }
        self.emit(EngineEvent::VerdictReused {
            study_id: ctx.study_id.clone(),
            verdict_id: existing.verdict_id.clone(),
        });
        Ok(existing)
    }

    /// Records a computed verdict under the study lock.
    ///
    /// The verdict is stored before its `VERDICT_COMPUTED` entry is appended,
    /// so a failed insert leaves the chain untouched and a retry appends the
    /// entry exactly once.
    pub(crate) fn record_verdict(
        &self,
        ctx: &StudyContext,
        verdict: Verdict,
    ) -> Result<RecordOutcome, EngineError> {
        let guard = ctx.lock()?;
        if let Some(existing) = self.stores.verdicts.get(&ctx.study_id, &verdict.verdict_id)? {
            return Ok(RecordOutcome::Reused(existing));
        }
        self.stores.verdicts.insert(&verdict)?;
        let entry = self.audit(ctx).append(
            &guard,
            self.clock.now(),
            self.config.system_actor.clone(),
            AuditPayload::Verdict(VerdictRecord::from(&verdict)),
        )?;
        drop(guard);

        self.emit(EngineEvent::VerdictComputed {
            study_id: ctx.study_id.clone(),
            verdict_id: verdict.verdict_id.clone(),
            eligibility: verdict.eligibility,
            sequence_no: entry.sequence_no,
        });
        Ok(RecordOutcome::Recorded(verdict))
    }

    /// Loads a stored verdict.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::VerdictNotFound`] when the verdict is absent.
    pub fn verdict(&self, ctx: &StudyContext, verdict_id: &VerdictId) -> Result<Verdict, EngineError> {
        self.stores.verdicts.get(&ctx.study_id, verdict_id)?.ok_or_else(|| {
            EngineError::VerdictNotFound {
                study_id: ctx.study_id.clone(),
                verdict_id: verdict_id.clone(),
            }
        })
    }

    /// Lists verdicts for a version in ascending patient order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn list_verdicts(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
    ) -> Result<Vec<Verdict>, EngineError> {
        let mut verdicts = self.stores.verdicts.list(&ctx.study_id, version)?;
        verdicts.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
        Ok(verdicts)
    }

    /// Builds the reviewer rationale for a stored verdict.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::VerdictNotFound`] when the verdict is absent.
    pub fn explain_verdict(
        &self,
        ctx: &StudyContext,
        verdict_id: &VerdictId,
    ) -> Result<Rationale, EngineError> {
        Ok(explain(&self.verdict(ctx, verdict_id)?))
    }

    // ------------------------------------------------------------------------
    // Overrides
    // ------------------------------------------------------------------------

    /// Applies a reviewer override and appends `OVERRIDE_APPLIED`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OverrideRejected`] when the note or actor is
    /// missing, [`EngineError::VerdictNotFound`] when the verdict is absent,
    /// or a store error when recording fails.
    pub fn submit_override(
        &self,
        ctx: &StudyContext,
        request: &OverrideRequest,
    ) -> Result<Override, EngineError> {
        let actor = match request.validate(&ctx.study_id) {
            Ok(actor) => actor.clone(),
            Err(err) => {
                self.emit(EngineEvent::OverrideRejected {
                    study_id: ctx.study_id.clone(),
                    verdict_id: request.verdict_id.clone(),
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };
        let verdict = self.verdict(ctx, &request.verdict_id)?;

        let guard = ctx.lock()?;
        let timestamp = request.timestamp.unwrap_or_else(|| self.clock.now());
        let entry = self.audit(ctx).append(
            &guard,
            timestamp,
            actor.clone(),
            AuditPayload::Override(OverrideRecord {
                verdict_id: verdict.verdict_id.clone(),
                patient_id: verdict.patient_id.clone(),
                computed: verdict.eligibility,
                value: request.value,
                note: request.note.clone(),
                decided_at: timestamp,
            }),
        )?;
        let record = Override {
            verdict_id: verdict.verdict_id,
            study_id: ctx.study_id.clone(),
            patient_id: verdict.patient_id,
            value: request.value,
            note: request.note.clone(),
            actor,
            timestamp,
            sequence_no: entry.sequence_no,
        };
        self.stores.overrides.append(&record)?;
        drop(guard);

        self.emit(EngineEvent::OverrideApplied {
            study_id: ctx.study_id.clone(),
            verdict_id: record.verdict_id.clone(),
            value: record.value,
            actor: record.actor.clone(),
            sequence_no: record.sequence_no,
        });
        Ok(record)
    }

    /// Lists overrides for a verdict in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn list_overrides(
        &self,
        ctx: &StudyContext,
        verdict_id: &VerdictId,
    ) -> Result<Vec<Override>, EngineError> {
        Ok(self.stores.overrides.list(&ctx.study_id, verdict_id)?)
    }

    /// Lists every override of the study in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn study_overrides(&self, ctx: &StudyContext) -> Result<Vec<Override>, EngineError> {
        Ok(self.stores.overrides.list_study(&ctx.study_id)?)
    }

    /// Resolves the effective value of a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::VerdictNotFound`] when the verdict is absent.
    pub fn effective_verdict(
        &self,
        ctx: &StudyContext,
        verdict_id: &VerdictId,
    ) -> Result<EffectiveVerdict, EngineError> {
        let verdict = self.verdict(ctx, verdict_id)?;
        let overrides = self.list_overrides(ctx, verdict_id)?;
        Ok(resolve_effective(&verdict, &overrides))
    }

    // ------------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------------

    /// Returns audit entries within a range, in chain order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn audit_log(
        &self,
        ctx: &StudyContext,
        range: AuditRange,
    ) -> Result<Vec<AuditEntry>, EngineError> {
        self.audit(ctx).read(range)
    }

    /// Recomputes the audit chain and reports the first corrupt position.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn verify_audit_log(&self, ctx: &StudyContext) -> Result<AuditVerification, EngineError> {
        let report = self.audit(ctx).verify()?;
        match report.first_corrupt_at {
            Some(sequence_no) => self.emit(EngineEvent::AuditCorruptionDetected {
                study_id: ctx.study_id.clone(),
                sequence_no,
            }),
            None => self.emit(EngineEvent::AuditVerified {
                study_id: ctx.study_id.clone(),
                checked: report.checked,
            }),
        }
        Ok(report)
    }

    /// Verifies the audit chain and fails when it is corrupt.
    ///
    /// Export paths call this first and halt on error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AuditCorruption`] when verification fails.
    pub fn ensure_audit_intact(&self, ctx: &StudyContext) -> Result<AuditVerification, EngineError> {
        Ok(self.verify_audit_log(ctx)?.into_result()?)
    }
}

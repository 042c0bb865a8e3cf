// crates/clinvara-core/src/runtime/store.rs
// ============================================================================
// Module: Clinvara In-Memory Stores
// Description: Mutex-guarded in-memory implementations of every store trait.
// Purpose: Provide deterministic stores for tests, demos, and the memory backend.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Each store keeps its data in an `Arc<Mutex<BTreeMap>>` so clones share
//! state and iteration order is deterministic. Stores are append-only and
//! report duplicates as [`StoreError::Conflict`]. [`EngineStores`] bundles
//! shared trait objects so the engine can run over any backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AuditEntry;
use crate::core::CriteriaVersion;
use crate::core::Override;
use crate::core::PatientId;
use crate::core::PatientRecord;
use crate::core::StudyId;
use crate::core::Verdict;
use crate::core::VerdictId;
use crate::interfaces::AuditRange;
use crate::interfaces::AuditStore;
use crate::interfaces::CriteriaRegistry;
use crate::interfaces::OverrideStore;
use crate::interfaces::PatientStore;
use crate::interfaces::PublishedCriteria;
use crate::interfaces::StoreError;
use crate::interfaces::VerdictStore;

/// Locks a store mutex, mapping poisoning to a store error.
fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Store(format!("{name} mutex poisoned")))
}

// ============================================================================
// SECTION: Criteria Registry
// ============================================================================

/// In-memory criteria registry.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCriteriaRegistry {
    /// Published criteria keyed by study and version.
    records: Arc<Mutex<BTreeMap<(StudyId, CriteriaVersion), PublishedCriteria>>>,
}

impl InMemoryCriteriaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CriteriaRegistry for InMemoryCriteriaRegistry {
    fn publish(&self, record: &PublishedCriteria) -> Result<(), StoreError> {
        let key = (record.criteria.study_id.clone(), record.criteria.version);
        let mut guard = lock(&self.records, "criteria registry")?;
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "criteria version {} already published for study {}",
                key.1, key.0
            )));
        }
        guard.insert(key, record.clone());
        drop(guard);
        Ok(())
    }

    fn get(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Option<PublishedCriteria>, StoreError> {
        let guard = lock(&self.records, "criteria registry")?;
        Ok(guard.get(&(study_id.clone(), version)).cloned())
    }

    fn latest_version(&self, study_id: &StudyId) -> Result<Option<CriteriaVersion>, StoreError> {
        let guard = lock(&self.records, "criteria registry")?;
        Ok(guard.keys().filter(|(study, _)| study == study_id).map(|(_, version)| *version).max())
    }
}

// ============================================================================
// SECTION: Patient Store
// ============================================================================

/// In-memory patient store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPatientStore {
    /// Patient records keyed by study and patient.
    records: Arc<Mutex<BTreeMap<(StudyId, PatientId), PatientRecord>>>,
}

impl InMemoryPatientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatientStore for InMemoryPatientStore {
    fn insert(&self, study_id: &StudyId, record: &PatientRecord) -> Result<(), StoreError> {
        let key = (study_id.clone(), record.patient_id.clone());
        let mut guard = lock(&self.records, "patient store")?;
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "patient {} already ingested for study {study_id}",
                record.patient_id
            )));
        }
        guard.insert(key, record.clone());
        drop(guard);
        Ok(())
    }

    fn get(
        &self,
        study_id: &StudyId,
        patient_id: &PatientId,
    ) -> Result<Option<PatientRecord>, StoreError> {
        let guard = lock(&self.records, "patient store")?;
        Ok(guard.get(&(study_id.clone(), patient_id.clone())).cloned())
    }

    fn patient_ids(&self, study_id: &StudyId) -> Result<Vec<PatientId>, StoreError> {
        let guard = lock(&self.records, "patient store")?;
        Ok(guard
            .keys()
            .filter(|(study, _)| study == study_id)
            .map(|(_, patient)| patient.clone())
            .collect())
    }
}

// ============================================================================
// SECTION: Verdict Store
// ============================================================================

/// In-memory verdict store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVerdictStore {
    /// Verdicts keyed by study and verdict identifier.
    records: Arc<Mutex<BTreeMap<(StudyId, VerdictId), Verdict>>>,
}

impl InMemoryVerdictStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerdictStore for InMemoryVerdictStore {
    fn insert(&self, verdict: &Verdict) -> Result<(), StoreError> {
        let key = (verdict.study_id.clone(), verdict.verdict_id.clone());
        let mut guard = lock(&self.records, "verdict store")?;
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict(format!("verdict {} already stored", key.1)));
        }
        guard.insert(key, verdict.clone());
        drop(guard);
        Ok(())
    }

    fn get(
        &self,
        study_id: &StudyId,
        verdict_id: &VerdictId,
    ) -> Result<Option<Verdict>, StoreError> {
        let guard = lock(&self.records, "verdict store")?;
        Ok(guard.get(&(study_id.clone(), verdict_id.clone())).cloned())
    }

    fn list(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Vec<Verdict>, StoreError> {
        let mut verdicts: Vec<Verdict> = {
            let guard = lock(&self.records, "verdict store")?;
            guard
                .values()
                .filter(|verdict| {
                    verdict.study_id == *study_id && verdict.criteria_version == version
                })
                .cloned()
                .collect()
        };
        verdicts.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));
        Ok(verdicts)
    }
}

// ============================================================================
// SECTION: Override Store
// ============================================================================

/// In-memory override store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOverrideStore {
    /// Overrides in insertion order.
    records: Arc<Mutex<Vec<Override>>>,
}

impl InMemoryOverrideStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn append(&self, record: &Override) -> Result<(), StoreError> {
        lock(&self.records, "override store")?.push(record.clone());
        Ok(())
    }

    fn list(
        &self,
        study_id: &StudyId,
        verdict_id: &VerdictId,
    ) -> Result<Vec<Override>, StoreError> {
        let guard = lock(&self.records, "override store")?;
        Ok(guard
            .iter()
            .filter(|record| record.study_id == *study_id && record.verdict_id == *verdict_id)
            .cloned()
            .collect())
    }

    fn list_study(&self, study_id: &StudyId) -> Result<Vec<Override>, StoreError> {
        let guard = lock(&self.records, "override store")?;
        Ok(guard.iter().filter(|record| record.study_id == *study_id).cloned().collect())
    }
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// In-memory audit ledger.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditStore {
    /// Chains keyed by study.
    chains: Arc<Mutex<BTreeMap<StudyId, Vec<AuditEntry>>>>,
}

impl InMemoryAuditStore {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut guard = lock(&self.chains, "audit store")?;
        let chain = guard.entry(entry.study_id.clone()).or_default();
        let expected = chain.len().saturating_add(1);
        if u64::try_from(expected).ok() != Some(entry.sequence_no.get()) {
            return Err(StoreError::Conflict(format!(
                "audit entry {} for study {} is not the next position ({expected})",
                entry.sequence_no, entry.study_id
            )));
        }
        chain.push(entry.clone());
        drop(guard);
        Ok(())
    }

    fn last(&self, study_id: &StudyId) -> Result<Option<AuditEntry>, StoreError> {
        let guard = lock(&self.chains, "audit store")?;
        Ok(guard.get(study_id).and_then(|chain| chain.last()).cloned())
    }

    fn entries(
        &self,
        study_id: &StudyId,
        range: AuditRange,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let guard = lock(&self.chains, "audit store")?;
        Ok(guard
            .get(study_id)
            .map(|chain| {
                chain.iter().filter(|entry| range.contains(entry.sequence_no)).cloned().collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// SECTION: Store Bundle
// ============================================================================

/// Shared trait objects for every store the engine uses.
#[derive(Clone)]
pub struct EngineStores {
    /// Criteria registry.
    pub criteria: Arc<dyn CriteriaRegistry + Send + Sync>,
    /// Patient store.
    pub patients: Arc<dyn PatientStore + Send + Sync>,
    /// Verdict store.
    pub verdicts: Arc<dyn VerdictStore + Send + Sync>,
    /// Override store.
    pub overrides: Arc<dyn OverrideStore + Send + Sync>,
    /// Audit ledger.
    pub audit: Arc<dyn AuditStore + Send + Sync>,
}

impl EngineStores {
    /// Bundles fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            criteria: Arc::new(InMemoryCriteriaRegistry::new()),
            patients: Arc::new(InMemoryPatientStore::new()),
            verdicts: Arc::new(InMemoryVerdictStore::new()),
            overrides: Arc::new(InMemoryOverrideStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
        }
    }
}

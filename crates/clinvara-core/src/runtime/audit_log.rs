// crates/clinvara-core/src/runtime/audit_log.rs
// ============================================================================
// Module: Clinvara Audit Log
// Description: Study-scoped handle for appending to and reading an audit chain.
// Purpose: Seal entries onto the chain tail and verify stored chains.
// Dependencies: crate::{core, interfaces, runtime::engine}
// ============================================================================

//! ## Overview
//! [`StudyAuditLog`] is a scoped handle over one study's chain. Appends read
//! the current tail, seal the next entry against its hash, and store it; the
//! caller must hold the study write lock so the read-seal-store sequence is
//! never interleaved with another writer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ActorId;
use crate::core::AuditEntry;
use crate::core::AuditPayload;
use crate::core::AuditVerification;
use crate::core::HashDigest;
use crate::core::SequenceNo;
use crate::core::StudyId;
use crate::core::Timestamp;
use crate::core::verify_stored_chain;
use crate::interfaces::AuditRange;
use crate::interfaces::AuditStore;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::StudyWriteGuard;

// ============================================================================
// SECTION: Study Audit Log
// ============================================================================

/// Scoped handle over one study's audit chain.
pub struct StudyAuditLog<'a> {
    /// Backing ledger.
    store: &'a (dyn AuditStore + Send + Sync),
    /// Study whose chain this handle covers.
    study_id: &'a StudyId,
}

impl<'a> StudyAuditLog<'a> {
    /// Creates a handle for a study chain.
    #[must_use]
    pub const fn new(store: &'a (dyn AuditStore + Send + Sync), study_id: &'a StudyId) -> Self {
        Self {
            store,
            study_id,
        }
    }

    /// Seals and stores the next entry of the chain.
    ///
    /// The write guard proves the caller holds the study lock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the tail cannot be read, hashing fails,
    /// or the store rejects the append.
    pub fn append(
        &self,
        _guard: &StudyWriteGuard<'_>,
        timestamp: Timestamp,
        actor: ActorId,
        payload: AuditPayload,
    ) -> Result<AuditEntry, EngineError> {
        let (sequence_no, prev_hash) = match self.store.last(self.study_id)? {
            Some(tail) => {
                let next = tail.sequence_no.next().ok_or_else(|| EngineError::SequenceExhausted {
                    study_id: self.study_id.clone(),
                })?;
                (next, tail.self_hash)
            }
            None => (SequenceNo::FIRST, HashDigest::chain_seed()),
        };
        let entry = AuditEntry::seal(
            self.study_id.clone(),
            sequence_no,
            timestamp,
            actor,
            payload,
            prev_hash,
        )?;
        self.store.append(&entry)?;
        Ok(entry)
    }

    /// Returns entries in chain order within the range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when loading fails.
    pub fn read(&self, range: AuditRange) -> Result<Vec<AuditEntry>, EngineError> {
        Ok(self.store.entries(self.study_id, range)?)
    }

    /// Recomputes the whole chain from the seed.
    ///
    /// Rows that no longer decode are reported as corrupt, not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] when the rows cannot be loaded.
    pub fn verify(&self) -> Result<AuditVerification, EngineError> {
        let rows = self.store.stored_entries(self.study_id)?;
        Ok(verify_stored_chain(self.study_id, &rows))
    }
}

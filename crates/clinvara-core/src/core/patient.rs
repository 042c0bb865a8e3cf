// crates/clinvara-core/src/core/patient.rs
// ============================================================================
// Module: Clinvara Patient Records
// Description: Patient documents and the typed record the engine evaluates.
// Purpose: Convert loosely typed patient data into schema-checked attributes.
// Dependencies: serde, serde_json, crate::core::schema
// ============================================================================

//! ## Overview
//! The adapter is the engine's input contract. JSON `null` counts as absent,
//! attributes the schema does not declare are set aside in
//! [`PatientRecord::unmapped`], and values that do not fit their declared
//! type reject the whole record. Absence is never an error here; it turns the
//! affected predicates UNKNOWN during evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::AttributePath;
use crate::core::identifiers::PatientId;
use crate::core::identifiers::StudyId;
use crate::core::schema::AttributeValue;
use crate::core::schema::StudySchema;

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Patient document as produced by dataset ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatientDocument {
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Attribute values keyed by path.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

// ============================================================================
// SECTION: Patient Record
// ============================================================================

/// Normalized, immutable patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Present, typed attribute values.
    pub attributes: BTreeMap<AttributePath, AttributeValue>,
    /// Attribute keys the schema does not declare, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped: Vec<String>,
}

impl PatientRecord {
    /// Converts a patient document using the study schema.
    ///
    /// # Errors
    ///
    /// Returns [`PatientRecordError`] when the identifier is empty or a value
    /// does not match its declared type.
    pub fn from_document(
        document: &PatientDocument,
        schema: &StudySchema,
    ) -> Result<Self, PatientRecordError> {
        if document.patient_id.is_blank() {
            return Err(PatientRecordError::MissingPatientId {
                study_id: schema.study_id.clone(),
            });
        }
        let mut attributes = BTreeMap::new();
        let mut unmapped = Vec::new();
        for (key, raw) in &document.attributes {
            let path = AttributePath::new(key.as_str());
            let Some(declared) = schema.attribute(&path) else {
                unmapped.push(key.clone());
                continue;
            };
            let typed = AttributeValue::from_json(declared, raw).map_err(|reason| {
                PatientRecordError::TypeMismatch {
                    study_id: schema.study_id.clone(),
                    patient_id: document.patient_id.clone(),
                    attribute: path.clone(),
                    reason,
                }
            })?;
            if let Some(value) = typed {
                attributes.insert(path, value);
            }
        }
        unmapped.sort();
        Ok(Self {
            patient_id: document.patient_id.clone(),
            attributes,
            unmapped,
        })
    }

    /// Returns the value recorded for an attribute path.
    #[must_use]
    pub fn value(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.attributes.get(path)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Patient document rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatientRecordError {
    /// Patient identifier is empty.
    #[error("patient record for study {study_id} has an empty patient_id")]
    MissingPatientId {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Value does not fit the declared attribute type.
    #[error("patient {patient_id} in study {study_id}: attribute {attribute}: {reason}")]
    TypeMismatch {
        /// Study identifier.
        study_id: StudyId,
        /// Patient identifier.
        patient_id: PatientId,
        /// Attribute path.
        attribute: AttributePath,
        /// Mismatch description.
        reason: String,
    },
}

/// Patient record is absent (as opposed to missing an attribute).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("patient {patient_id} not found in study {study_id}")]
pub struct PatientNotFoundError {
    /// Study identifier.
    pub study_id: StudyId,
    /// Patient identifier.
    pub patient_id: PatientId,
}

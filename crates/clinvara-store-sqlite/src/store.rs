// crates/clinvara-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Screening Store
// Description: Append-only SQLite tables behind every Clinvara store trait.
// Purpose: Persist screening state with integrity checks on load.
// Dependencies: clinvara-core, rusqlite, serde, serde_json
// ============================================================================

//! ## Overview
//! [`SqliteScreeningStore`] keeps one shared connection behind a mutex and
//! runs every read and write in a transaction. Records are written as
//! canonical JSON together with a SHA-256 digest of the stored bytes; loads
//! recompute the digest and fail closed on mismatch. Update and delete are
//! blocked by triggers so the tables stay append-only. Audit entries are
//! returned as stored: their integrity is the hash chain, checked by
//! [`clinvara_core::verify_chain`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use clinvara_core::AuditEntry;
use clinvara_core::AuditRange;
use clinvara_core::AuditStore;
use clinvara_core::CriteriaRegistry;
use clinvara_core::CriteriaVersion;
use clinvara_core::DEFAULT_HASH_ALGORITHM;
use clinvara_core::EngineStores;
use clinvara_core::HashAlgorithm;
use clinvara_core::HashDigest;
use clinvara_core::Override;
use clinvara_core::OverrideStore;
use clinvara_core::PatientId;
use clinvara_core::PatientRecord;
use clinvara_core::PatientStore;
use clinvara_core::PublishedCriteria;
use clinvara_core::SequenceNo;
use clinvara_core::StoreError;
use clinvara_core::StoredAuditEntry;
use clinvara_core::StudyId;
use clinvara_core::Verdict;
use clinvara_core::VerdictId;
use clinvara_core::VerdictStore;
use clinvara_core::canonical_json_bytes;
use clinvara_core::hash_bytes;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Params;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version stored in `store_meta`.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout for `SQLite` connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of the full store path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum size of one stored record in bytes.
pub const MAX_RECORD_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` screening store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with default pragmas for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Key already present or append position taken.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Record exceeded the size limit.
    #[error("sqlite store record too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual record size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "record exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a rusqlite error to a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err function pointer.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed screening store implementing every store trait.
#[derive(Clone)]
pub struct SqliteScreeningStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteScreeningStore {
    /// Opens an `SQLite`-backed screening store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Bundles this store as every engine store.
    #[must_use]
    pub fn engine_stores(&self) -> EngineStores {
        EngineStores {
            criteria: Arc::new(self.clone()),
            patients: Arc::new(self.clone()),
            verdicts: Arc::new(self.clone()),
            overrides: Arc::new(self.clone()),
            audit: Arc::new(self.clone()),
        }
    }

    /// Runs `body` inside a transaction and commits on success.
    fn with_transaction<T>(
        &self,
        body: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let value = body(&tx)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Record Encoding
// ============================================================================

/// Record bytes with their content digest.
struct EncodedRecord {
    /// Canonical JSON bytes.
    bytes: Vec<u8>,
    /// Digest of `bytes`.
    hash: HashDigest,
}

/// Record as read back from a table row.
struct StoredRecord {
    /// Stored JSON bytes.
    bytes: Vec<u8>,
    /// Stored hex digest.
    hash: String,
    /// Stored hash algorithm label.
    algorithm: String,
}

impl StoredRecord {
    /// Reads the `(record_json, record_hash, hash_algorithm)` columns.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bytes: row.get(0)?,
            hash: row.get(1)?,
            algorithm: row.get(2)?,
        })
    }

    /// Verifies the digest and decodes the record.
    fn decode<T: DeserializeOwned>(self, label: &str) -> Result<T, SqliteStoreError> {
        if self.bytes.len() > MAX_RECORD_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_RECORD_BYTES,
                actual_bytes: self.bytes.len(),
            });
        }
        let algorithm = parse_hash_algorithm(&self.algorithm)?;
        let expected = hash_bytes(algorithm, &self.bytes);
        if expected.value != self.hash {
            return Err(SqliteStoreError::Corrupt(format!("hash mismatch for {label}")));
        }
        serde_json::from_slice(&self.bytes)
            .map_err(|err| SqliteStoreError::Invalid(format!("{label}: {err}")))
    }
}

/// Encodes a record as canonical JSON and hashes it.
fn encode_record<T: Serialize>(value: &T) -> Result<EncodedRecord, SqliteStoreError> {
    let bytes =
        canonical_json_bytes(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
    Ok(EncodedRecord {
        bytes,
        hash,
    })
}

/// Loads at most one hashed record.
fn query_record<T: DeserializeOwned, P: Params>(
    tx: &Transaction<'_>,
    sql: &str,
    params: P,
    label: &str,
) -> Result<Option<T>, SqliteStoreError> {
    let stored = tx.query_row(sql, params, StoredRecord::from_row).optional().map_err(db_error)?;
    stored.map(|record| record.decode(label)).transpose()
}

/// Loads every hashed record matched by `sql`, in query order.
fn query_records<T: DeserializeOwned, P: Params>(
    tx: &Transaction<'_>,
    sql: &str,
    params: P,
    label: &str,
) -> Result<Vec<T>, SqliteStoreError> {
    let mut statement = tx.prepare(sql).map_err(db_error)?;
    let rows = statement
        .query_map(params, StoredRecord::from_row)
        .map_err(db_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_error)?;
    rows.into_iter().map(|record| record.decode(label)).collect()
}

/// Returns true when `sql` matches at least one row.
fn row_exists<P: Params>(
    tx: &Transaction<'_>,
    sql: &str,
    params: P,
) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> =
        tx.query_row(sql, params, |row| row.get(0)).optional().map_err(db_error)?;
    Ok(found.is_some())
}

/// Converts an unsigned value into an `SQLite` integer.
fn sql_integer(value: u64, label: &str) -> Result<i64, SqliteStoreError> {
    i64::try_from(value)
        .map_err(|_| SqliteStoreError::Invalid(format!("{label} exceeds sqlite integer range")))
}

// ============================================================================
// SECTION: Criteria Registry
// ============================================================================

impl CriteriaRegistry for SqliteScreeningStore {
    fn publish(&self, record: &PublishedCriteria) -> Result<(), StoreError> {
        self.publish_criteria(record).map_err(StoreError::from)
    }

    fn get(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Option<PublishedCriteria>, StoreError> {
        self.load_criteria(study_id, version).map_err(StoreError::from)
    }

    fn latest_version(&self, study_id: &StudyId) -> Result<Option<CriteriaVersion>, StoreError> {
        self.latest_criteria_version(study_id).map_err(StoreError::from)
    }
}

impl SqliteScreeningStore {
    /// Inserts a criteria version.
    fn publish_criteria(&self, record: &PublishedCriteria) -> Result<(), SqliteStoreError> {
        let study_id = record.criteria.study_id.as_str();
        let version = sql_integer(record.criteria.version.get(), "criteria version")?;
        let encoded = encode_record(record)?;
        self.with_transaction(|tx| {
            if row_exists(
                tx,
                "SELECT 1 FROM criteria WHERE study_id = ?1 AND version = ?2",
                params![study_id, version],
            )? {
                return Err(SqliteStoreError::Conflict(format!(
                    "criteria version {version} already published for study {study_id}"
                )));
            }
            tx.execute(
                "INSERT INTO criteria (study_id, version, record_json, record_hash, \
                 hash_algorithm, published_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    study_id,
                    version,
                    encoded.bytes,
                    encoded.hash.value,
                    hash_algorithm_label(encoded.hash.algorithm),
                    record.published_at.as_unix_millis(),
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Loads a criteria version.
    fn load_criteria(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Option<PublishedCriteria>, SqliteStoreError> {
        let raw_version = sql_integer(version.get(), "criteria version")?;
        let label = format!("criteria {study_id} v{version}");
        let record: Option<PublishedCriteria> = self.with_transaction(|tx| {
            query_record(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM criteria WHERE study_id = \
                 ?1 AND version = ?2",
                params![study_id.as_str(), raw_version],
                &label,
            )
        })?;
        if let Some(record) = &record
            && (record.criteria.study_id != *study_id || record.criteria.version != version)
        {
            return Err(SqliteStoreError::Invalid(format!(
                "key and payload disagree for {label}"
            )));
        }
        Ok(record)
    }

    /// Returns the highest stored version for a study.
    fn latest_criteria_version(
        &self,
        study_id: &StudyId,
    ) -> Result<Option<CriteriaVersion>, SqliteStoreError> {
        let latest: Option<i64> = self.with_transaction(|tx| {
            tx.query_row(
                "SELECT MAX(version) FROM criteria WHERE study_id = ?1",
                params![study_id.as_str()],
                |row| row.get(0),
            )
            .map_err(db_error)
        })?;
        latest
            .map(|raw| {
                u64::try_from(raw).ok().and_then(CriteriaVersion::from_raw).ok_or_else(|| {
                    SqliteStoreError::Corrupt(format!(
                        "invalid criteria version {raw} for study {study_id}"
                    ))
                })
            })
            .transpose()
    }
}

// ============================================================================
// SECTION: Patient Store
// ============================================================================

impl PatientStore for SqliteScreeningStore {
    fn insert(&self, study_id: &StudyId, record: &PatientRecord) -> Result<(), StoreError> {
        self.insert_patient(study_id, record).map_err(StoreError::from)
    }

    fn get(
        &self,
        study_id: &StudyId,
        patient_id: &PatientId,
    ) -> Result<Option<PatientRecord>, StoreError> {
        self.load_patient(study_id, patient_id).map_err(StoreError::from)
    }

    fn patient_ids(&self, study_id: &StudyId) -> Result<Vec<PatientId>, StoreError> {
        self.list_patient_ids(study_id).map_err(StoreError::from)
    }
}

impl SqliteScreeningStore {
    /// Inserts a patient record.
    fn insert_patient(
        &self,
        study_id: &StudyId,
        record: &PatientRecord,
    ) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(record)?;
        let patient_id = record.patient_id.as_str();
        self.with_transaction(|tx| {
            if row_exists(
                tx,
                "SELECT 1 FROM patients WHERE study_id = ?1 AND patient_id = ?2",
                params![study_id.as_str(), patient_id],
            )? {
                return Err(SqliteStoreError::Conflict(format!(
                    "patient {patient_id} already ingested for study {study_id}"
                )));
            }
            tx.execute(
                "INSERT INTO patients (study_id, patient_id, record_json, record_hash, \
                 hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    study_id.as_str(),
                    patient_id,
                    encoded.bytes,
                    encoded.hash.value,
                    hash_algorithm_label(encoded.hash.algorithm),
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Loads a patient record.
    fn load_patient(
        &self,
        study_id: &StudyId,
        patient_id: &PatientId,
    ) -> Result<Option<PatientRecord>, SqliteStoreError> {
        let label = format!("patient {patient_id} in study {study_id}");
        let record: Option<PatientRecord> = self.with_transaction(|tx| {
            query_record(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM patients WHERE study_id = \
                 ?1 AND patient_id = ?2",
                params![study_id.as_str(), patient_id.as_str()],
                &label,
            )
        })?;
        if let Some(record) = &record
            && record.patient_id != *patient_id
        {
            return Err(SqliteStoreError::Invalid(format!(
                "key and payload disagree for {label}"
            )));
        }
        Ok(record)
    }

    /// Lists patient identifiers in ascending order.
    fn list_patient_ids(&self, study_id: &StudyId) -> Result<Vec<PatientId>, SqliteStoreError> {
        self.with_transaction(|tx| {
            let mut statement = tx
                .prepare("SELECT patient_id FROM patients WHERE study_id = ?1 ORDER BY patient_id")
                .map_err(db_error)?;
            statement
                .query_map(params![study_id.as_str()], |row| row.get::<_, String>(0))
                .map_err(db_error)?
                .map(|id| id.map(PatientId::new).map_err(db_error))
                .collect()
        })
    }
}

// ============================================================================
// SECTION: Verdict Store
// ============================================================================

impl VerdictStore for SqliteScreeningStore {
    fn insert(&self, verdict: &Verdict) -> Result<(), StoreError> {
        self.insert_verdict(verdict).map_err(StoreError::from)
    }

    fn get(
        &self,
        study_id: &StudyId,
        verdict_id: &VerdictId,
    ) -> Result<Option<Verdict>, StoreError> {
        self.load_verdict(study_id, verdict_id).map_err(StoreError::from)
    }

    fn list(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Vec<Verdict>, StoreError> {
        self.list_verdicts(study_id, version).map_err(StoreError::from)
    }
}

impl SqliteScreeningStore {
    /// Inserts a verdict.
    fn insert_verdict(&self, verdict: &Verdict) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(verdict)?;
        let version = sql_integer(verdict.criteria_version.get(), "criteria version")?;
        self.with_transaction(|tx| {
            if row_exists(
                tx,
                "SELECT 1 FROM verdicts WHERE study_id = ?1 AND verdict_id = ?2",
                params![verdict.study_id.as_str(), verdict.verdict_id.as_str()],
            )? {
                return Err(SqliteStoreError::Conflict(format!(
                    "verdict {} already stored",
                    verdict.verdict_id
                )));
            }
            tx.execute(
                "INSERT INTO verdicts (study_id, verdict_id, criteria_version, patient_id, \
                 record_json, record_hash, hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    verdict.study_id.as_str(),
                    verdict.verdict_id.as_str(),
                    version,
                    verdict.patient_id.as_str(),
                    encoded.bytes,
                    encoded.hash.value,
                    hash_algorithm_label(encoded.hash.algorithm),
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Loads a verdict.
    fn load_verdict(
        &self,
        study_id: &StudyId,
        verdict_id: &VerdictId,
    ) -> Result<Option<Verdict>, SqliteStoreError> {
        let label = format!("verdict {verdict_id}");
        let verdict: Option<Verdict> = self.with_transaction(|tx| {
            query_record(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM verdicts WHERE study_id = \
                 ?1 AND verdict_id = ?2",
                params![study_id.as_str(), verdict_id.as_str()],
                &label,
            )
        })?;
        if let Some(verdict) = &verdict
            && (verdict.study_id != *study_id || verdict.verdict_id != *verdict_id)
        {
            return Err(SqliteStoreError::Invalid(format!(
                "key and payload disagree for {label}"
            )));
        }
        Ok(verdict)
    }

    /// Lists verdicts for a version in ascending patient order.
    fn list_verdicts(
        &self,
        study_id: &StudyId,
        version: CriteriaVersion,
    ) -> Result<Vec<Verdict>, SqliteStoreError> {
        let raw_version = sql_integer(version.get(), "criteria version")?;
        let label = format!("verdicts of study {study_id} v{version}");
        self.with_transaction(|tx| {
            query_records(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM verdicts WHERE study_id = \
                 ?1 AND criteria_version = ?2 ORDER BY patient_id",
                params![study_id.as_str(), raw_version],
                &label,
            )
        })
    }
}

// ============================================================================
// SECTION: Override Store
// ============================================================================

impl OverrideStore for SqliteScreeningStore {
    fn append(&self, record: &Override) -> Result<(), StoreError> {
        self.append_override(record).map_err(StoreError::from)
    }

    fn list(
        &self,
        study_id: &StudyId,
        verdict_id: &VerdictId,
    ) -> Result<Vec<Override>, StoreError> {
        let label = format!("overrides of verdict {verdict_id}");
        self.with_transaction(|tx| {
            query_records(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM overrides WHERE study_id = \
                 ?1 AND verdict_id = ?2 ORDER BY override_id",
                params![study_id.as_str(), verdict_id.as_str()],
                &label,
            )
        })
        .map_err(StoreError::from)
    }

    fn list_study(&self, study_id: &StudyId) -> Result<Vec<Override>, StoreError> {
        let label = format!("overrides of study {study_id}");
        self.with_transaction(|tx| {
            query_records(
                tx,
                "SELECT record_json, record_hash, hash_algorithm FROM overrides WHERE study_id = \
                 ?1 ORDER BY override_id",
                params![study_id.as_str()],
                &label,
            )
        })
        .map_err(StoreError::from)
    }
}

impl SqliteScreeningStore {
    /// Appends an override row.
    fn append_override(&self, record: &Override) -> Result<(), SqliteStoreError> {
        let encoded = encode_record(record)?;
        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO overrides (study_id, verdict_id, record_json, record_hash, \
                 hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.study_id.as_str(),
                    record.verdict_id.as_str(),
                    encoded.bytes,
                    encoded.hash.value,
                    hash_algorithm_label(encoded.hash.algorithm),
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

impl AuditStore for SqliteScreeningStore {
    fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.append_audit_entry(entry).map_err(StoreError::from)
    }

    fn last(&self, study_id: &StudyId) -> Result<Option<AuditEntry>, StoreError> {
        self.with_transaction(|tx| {
            let bytes: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT entry_json FROM audit_entries WHERE study_id = ?1 ORDER BY \
                     sequence_no DESC LIMIT 1",
                    params![study_id.as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_error)?;
            bytes.map(|bytes| decode_audit_entry(study_id, &bytes)).transpose()
        })
        .map_err(StoreError::from)
    }

    fn entries(
        &self,
        study_id: &StudyId,
        range: AuditRange,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        self.load_audit_entries(study_id, range).map_err(StoreError::from)
    }

    fn stored_entries(&self, study_id: &StudyId) -> Result<Vec<StoredAuditEntry>, StoreError> {
        self.load_stored_audit_rows(study_id).map_err(StoreError::from)
    }
}

impl SqliteScreeningStore {
    /// Appends an audit entry at the next chain position.
    fn append_audit_entry(&self, entry: &AuditEntry) -> Result<(), SqliteStoreError> {
        let sequence_no = sql_integer(entry.sequence_no.get(), "audit sequence number")?;
        let bytes = encode_record(entry)?.bytes;
        self.with_transaction(|tx| {
            let last: Option<i64> = tx
                .query_row(
                    "SELECT MAX(sequence_no) FROM audit_entries WHERE study_id = ?1",
                    params![entry.study_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(db_error)?;
            let expected = last.unwrap_or(0).saturating_add(1);
            if sequence_no != expected {
                return Err(SqliteStoreError::Conflict(format!(
                    "audit entry {sequence_no} for study {} is not the next position ({expected})",
                    entry.study_id
                )));
            }
            tx.execute(
                "INSERT INTO audit_entries (study_id, sequence_no, entry_json, self_hash, \
                 recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.study_id.as_str(),
                    sequence_no,
                    bytes,
                    entry.self_hash.value,
                    entry.timestamp.as_unix_millis(),
                ],
            )
            .map_err(db_error)?;
            Ok(())
        })
    }

    /// Loads audit entries in chain order.
    fn load_audit_entries(
        &self,
        study_id: &StudyId,
        range: AuditRange,
    ) -> Result<Vec<AuditEntry>, SqliteStoreError> {
        let from = range.from.map_or(Ok(1), |from| sql_integer(from.get(), "audit range start"))?;
        let to = range.to.map_or(i64::MAX, |to| i64::try_from(to.get()).unwrap_or(i64::MAX));
        self.with_transaction(|tx| {
            let mut statement = tx
                .prepare(
                    "SELECT entry_json FROM audit_entries WHERE study_id = ?1 AND sequence_no \
                     >= ?2 AND sequence_no <= ?3 ORDER BY sequence_no",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![study_id.as_str(), from, to], |row| row.get::<_, Vec<u8>>(0))
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            rows.iter().map(|bytes| decode_audit_entry(study_id, bytes)).collect()
        })
    }

    /// Loads every audit row of a study, keeping undecodable rows in place.
    fn load_stored_audit_rows(
        &self,
        study_id: &StudyId,
    ) -> Result<Vec<StoredAuditEntry>, SqliteStoreError> {
        self.with_transaction(|tx| {
            let mut statement = tx
                .prepare(
                    "SELECT sequence_no, entry_json FROM audit_entries WHERE study_id = ?1 ORDER \
                     BY sequence_no",
                )
                .map_err(db_error)?;
            let rows = statement
                .query_map(params![study_id.as_str()], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                })
                .map_err(db_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(db_error)?;
            rows.into_iter()
                .map(|(sequence_no, bytes)| {
                    let sequence_no = u64::try_from(sequence_no)
                        .ok()
                        .and_then(SequenceNo::from_raw)
                        .ok_or_else(|| {
                            SqliteStoreError::Corrupt(format!(
                                "audit row for study {study_id} has invalid position \
                                 {sequence_no}"
                            ))
                        })?;
                    Ok(match decode_audit_entry(study_id, &bytes) {
                        Ok(entry) => StoredAuditEntry::Decoded(entry),
                        Err(_) => StoredAuditEntry::Unreadable {
                            sequence_no,
                        },
                    })
                })
                .collect()
        })
    }
}

/// Decodes a stored audit entry without judging its chain hashes.
fn decode_audit_entry(study_id: &StudyId, bytes: &[u8]) -> Result<AuditEntry, SqliteStoreError> {
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_RECORD_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    let entry: AuditEntry = serde_json::from_slice(bytes).map_err(|err| {
        SqliteStoreError::Corrupt(format!("unreadable audit entry for study {study_id}: {err}"))
    })?;
    if entry.study_id != *study_id {
        return Err(SqliteStoreError::Corrupt(format!(
            "audit entry {} filed under study {study_id} belongs to {}",
            entry.sequence_no, entry.study_id
        )));
    }
    Ok(entry)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Table definitions for schema version 1.
const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS criteria (
        study_id TEXT NOT NULL,
        version INTEGER NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL,
        hash_algorithm TEXT NOT NULL,
        published_at INTEGER NOT NULL,
        PRIMARY KEY (study_id, version)
    );
    CREATE TABLE IF NOT EXISTS patients (
        study_id TEXT NOT NULL,
        patient_id TEXT NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL,
        hash_algorithm TEXT NOT NULL,
        PRIMARY KEY (study_id, patient_id)
    );
    CREATE TABLE IF NOT EXISTS verdicts (
        study_id TEXT NOT NULL,
        verdict_id TEXT NOT NULL,
        criteria_version INTEGER NOT NULL,
        patient_id TEXT NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL,
        hash_algorithm TEXT NOT NULL,
        PRIMARY KEY (study_id, verdict_id)
    );
    CREATE INDEX IF NOT EXISTS idx_verdicts_version
        ON verdicts (study_id, criteria_version, patient_id);
    CREATE TABLE IF NOT EXISTS overrides (
        override_id INTEGER PRIMARY KEY AUTOINCREMENT,
        study_id TEXT NOT NULL,
        verdict_id TEXT NOT NULL,
        record_json BLOB NOT NULL,
        record_hash TEXT NOT NULL,
        hash_algorithm TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_overrides_verdict ON overrides (study_id, verdict_id);
    CREATE TABLE IF NOT EXISTS audit_entries (
        study_id TEXT NOT NULL,
        sequence_no INTEGER NOT NULL,
        entry_json BLOB NOT NULL,
        self_hash TEXT NOT NULL,
        recorded_at INTEGER NOT NULL,
        PRIMARY KEY (study_id, sequence_no)
    );
";

/// Tables that reject update and delete.
const APPEND_ONLY_TABLES: [&str; 5] =
    ["criteria", "patients", "verdicts", "overrides", "audit_entries"];

/// Initializes the `SQLite` schema or validates existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(SCHEMA_V1).map_err(db_error)?;
            for table in APPEND_ONLY_TABLES {
                tx.execute_batch(&format!(
                    "CREATE TRIGGER IF NOT EXISTS {table}_no_update BEFORE UPDATE ON {table}
                     BEGIN SELECT RAISE(ABORT, '{table} is append-only'); END;
                     CREATE TRIGGER IF NOT EXISTS {table}_no_delete BEFORE DELETE ON {table}
                     BEGIN SELECT RAISE(ABORT, '{table} is append-only'); END;"
                ))
                .map_err(db_error)?;
            }
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the canonical hash algorithm label.
const fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

/// Parses a hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}

// crates/clinvara-core/src/core/identifiers.rs
// ============================================================================
// Module: Clinvara Identifiers
// Description: Opaque identifiers for studies, patients, criteria, and verdicts.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as plain strings or numbers on the
//! wire. Numeric identifiers enforce non-zero, 1-based invariants at
//! construction boundaries. [`VerdictId`] is derived from its inputs so a
//! (criteria version, patient) pair can only ever name one verdict.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: String Identifiers
// ============================================================================

/// Declares an opaque string identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true when the identifier is empty or whitespace only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id! {
    /// Study identifier scoping criteria, verdicts, overrides, and audit chains.
    StudyId
}

string_id! {
    /// Patient identifier within a study.
    PatientId
}

string_id! {
    /// Reviewer or system actor recorded on overrides and audit entries.
    ActorId
}

string_id! {
    /// Attribute path declared in a study schema (for example `vitals.age`).
    AttributePath
}

string_id! {
    /// Criterion identifier (for example `INC1` or `inclusion/0/1`).
    CriterionId
}

// ============================================================================
// SECTION: Criteria Version
// ============================================================================

/// Published criteria version, monotonic per study.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaVersion(NonZeroU64);

impl CriteriaVersion {
    /// Creates a new criteria version from a non-zero value.
    #[must_use]
    pub const fn new(version: NonZeroU64) -> Self {
        Self(version)
    }

    /// Creates a criteria version from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw version value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for CriteriaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Sequence Numbers
// ============================================================================

/// Audit sequence number within a study chain.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceNo(NonZeroU64);

impl SequenceNo {
    /// First sequence number of every chain.
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Creates a sequence number from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the sequence number for a zero-based chain position.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        let raw = u64::try_from(index).unwrap_or(u64::MAX - 1).saturating_add(1);
        NonZeroU64::new(raw).map_or(Self::FIRST, Self)
    }

    /// Returns the raw sequence value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the following sequence number, or `None` on overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for SequenceNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Verdict Identifier
// ============================================================================

/// Verdict identifier derived from study, criteria version, and patient.
///
/// # Invariants
/// - Rendered as `{study}:v{version}:{patient}`; never assigned freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerdictId(String);

impl VerdictId {
    /// Derives the verdict identifier for a (criteria version, patient) pair.
    #[must_use]
    pub fn derive(study_id: &StudyId, version: CriteriaVersion, patient_id: &PatientId) -> Self {
        Self(format!("{study_id}:v{version}:{patient_id}"))
    }

    /// Wraps a verdict identifier received from an external caller.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerdictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for VerdictId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

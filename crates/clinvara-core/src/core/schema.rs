// crates/clinvara-core/src/core/schema.rs
// ============================================================================
// Module: Clinvara Attribute Schema
// Description: Declared attribute types and typed attribute values.
// Purpose: Bind every attribute path to a type so criteria and patient data
// can be checked before evaluation.
// Dependencies: bigdecimal, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`StudySchema`] declares the attribute paths a study may reference and the
//! type of each. Criteria are type-checked against it at load time and patient
//! documents are converted through it at ingestion, so evaluation never meets
//! an ill-typed value. Derived attributes (`derived_age`) are computed from a
//! declared date attribute and the reference date and are never supplied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::AttributePath;
use crate::core::identifiers::StudyId;
use crate::core::time::ClinicalDate;

// ============================================================================
// SECTION: Attribute Types
// ============================================================================

/// Declared type of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeType {
    /// Exact decimal number.
    Numeric,
    /// Single categorical label.
    Categorical,
    /// Multi-valued categorical labels (for example diagnosis codes).
    CodeList,
    /// Calendar date.
    Date,
    /// Boolean flag.
    Boolean,
    /// Whole years between a source date attribute and the reference date.
    DerivedAge {
        /// Date attribute the age is computed from.
        source: AttributePath,
    },
}

impl AttributeType {
    /// Returns a stable lowercase label for messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::CodeList => "code_list",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::DerivedAge {
                ..
            } => "derived_age",
        }
    }

    /// Returns true when values are computed rather than supplied.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::DerivedAge { .. })
    }
}

// ============================================================================
// SECTION: Numeric Values
// ============================================================================

/// Exact decimal value.
///
/// # Invariants
/// - Serialized as a decimal string so precision survives canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NumericValue(BigDecimal);

impl NumericValue {
    /// Wraps a decimal.
    #[must_use]
    pub const fn new(value: BigDecimal) -> Self {
        Self(value)
    }

    /// Converts a JSON number without going through binary floating point.
    #[must_use]
    pub fn from_json_number(number: &serde_json::Number) -> Option<Self> {
        BigDecimal::from_str(&number.to_string()).ok().map(Self)
    }

    /// Returns the decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }
}

impl From<i64> for NumericValue {
    fn from(value: i64) -> Self {
        Self(BigDecimal::from(value))
    }
}

impl FromStr for NumericValue {
    type Err = bigdecimal::ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.normalized().fmt(f)
    }
}

impl Serialize for NumericValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NumericValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => text.parse().map_err(de::Error::custom),
            Value::Number(number) => Self::from_json_number(&number)
                .ok_or_else(|| de::Error::custom("invalid decimal number")),
            _ => Err(de::Error::custom("expected a decimal string or number")),
        }
    }
}

// ============================================================================
// SECTION: Attribute Values
// ============================================================================

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// Exact decimal number.
    Numeric(NumericValue),
    /// Single categorical label.
    Categorical(String),
    /// Multi-valued categorical labels.
    CodeList(Vec<String>),
    /// Calendar date.
    Date(ClinicalDate),
    /// Boolean flag.
    Boolean(bool),
}

impl AttributeValue {
    /// Converts a JSON value into a typed value for the declared type.
    ///
    /// JSON `null` is treated as absent and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the JSON shape does not fit
    /// the declared type, or when a value is supplied for a derived attribute.
    pub fn from_json(declared: &AttributeType, value: &Value) -> Result<Option<Self>, String> {
        if value.is_null() {
            return Ok(None);
        }
        let typed = match (declared, value) {
            (AttributeType::Numeric, Value::Number(number)) => NumericValue::from_json_number(number)
                .map(Self::Numeric)
                .ok_or_else(|| format!("number {number} is not a valid decimal"))?,
            (AttributeType::Categorical, Value::String(text)) => Self::Categorical(text.clone()),
            (AttributeType::CodeList, Value::String(code)) => Self::CodeList(vec![code.clone()]),
            (AttributeType::CodeList, Value::Array(items)) => {
                let mut codes = Vec::with_capacity(items.len());
                for item in items {
                    let Value::String(code) = item else {
                        return Err("code_list entries must be strings".to_string());
                    };
                    codes.push(code.clone());
                }
                Self::CodeList(codes)
            }
            (AttributeType::Date, Value::String(text)) => {
                Self::Date(ClinicalDate::parse(text).map_err(|err| err.to_string())?)
            }
            (AttributeType::Boolean, Value::Bool(flag)) => Self::Boolean(*flag),
            (AttributeType::DerivedAge {
                ..
            }, _) => {
                return Err("derived attributes are computed and must not be supplied".to_string());
            }
            (declared, other) => {
                return Err(format!(
                    "expected {} value, found {}",
                    declared.label(),
                    json_kind(other)
                ));
            }
        };
        Ok(Some(typed))
    }

    /// Returns a stable lowercase label of the value's type.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Categorical(_) => "categorical",
            Self::CodeList(_) => "code_list",
            Self::Date(_) => "date",
            Self::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(value) => value.fmt(f),
            Self::Categorical(text) => write!(f, "\"{text}\""),
            Self::CodeList(codes) => write!(f, "[{}]", codes.join(", ")),
            Self::Date(date) => date.fmt(f),
            Self::Boolean(flag) => flag.fmt(f),
        }
    }
}

/// Returns a short label for a JSON value's kind.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Study Schema
// ============================================================================

/// Declared attributes for one study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySchema {
    /// Study the schema belongs to.
    pub study_id: StudyId,
    /// Attribute declarations keyed by path.
    pub attributes: BTreeMap<AttributePath, AttributeType>,
}

/// Schema declaration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Study identifier is empty.
    #[error("schema study_id must not be empty")]
    MissingStudyId,
    /// Attribute path is empty.
    #[error("schema for study {study_id} declares an empty attribute path")]
    EmptyPath {
        /// Study identifier.
        study_id: StudyId,
    },
    /// Derived attribute source is missing or not a date.
    #[error(
        "schema for study {study_id}: derived attribute {attribute} needs a declared date source, \
         got {source_path}"
    )]
    InvalidDerivedSource {
        /// Study identifier.
        study_id: StudyId,
        /// Derived attribute path.
        attribute: AttributePath,
        /// Declared source path.
        source_path: AttributePath,
    },
}

impl StudySchema {
    /// Validates attribute declarations.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a declaration is malformed.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.study_id.is_blank() {
            return Err(SchemaError::MissingStudyId);
        }
        for (path, declared) in &self.attributes {
            if path.is_blank() {
                return Err(SchemaError::EmptyPath {
                    study_id: self.study_id.clone(),
                });
            }
            if let AttributeType::DerivedAge {
                source,
            } = declared
                && self.attributes.get(source) != Some(&AttributeType::Date)
            {
                return Err(SchemaError::InvalidDerivedSource {
                    study_id: self.study_id.clone(),
                    attribute: path.clone(),
                    source_path: source.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns the declared type for an attribute path.
    #[must_use]
    pub fn attribute(&self, path: &AttributePath) -> Option<&AttributeType> {
        self.attributes.get(path)
    }
}

// crates/clinvara-core/src/core/criteria.rs
// ============================================================================
// Module: Clinvara Criteria Model
// Description: Criteria documents, typed predicates, and criteria set loading.
// Purpose: Turn inclusion/exclusion documents into type-checked predicate trees.
// Dependencies: clinvara-logic, serde, serde_json, crate::core::{schema, hashing}
// ============================================================================

//! ## Overview
//! Criteria arrive as loosely shaped documents (`kind`, `attribute`,
//! `operator`, `value`, `children`). [`CriteriaSet::load`] resolves every
//! attribute against the study schema, checks each operator against the
//! attribute's declared type, converts literal values into typed values, and
//! assigns positional identifiers to unnamed predicates. Any problem rejects
//! the whole document; a criteria set is never partially loaded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use clinvara_logic::Requirement;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AttributePath;
use crate::core::identifiers::CriteriaVersion;
use crate::core::identifiers::CriterionId;
use crate::core::identifiers::StudyId;
use crate::core::schema::AttributeType;
use crate::core::schema::AttributeValue;
use crate::core::schema::NumericValue;
use crate::core::schema::StudySchema;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Largest day offset accepted by temporal operators.
pub const MAX_OFFSET_DAYS: i64 = 100_000;

/// Structural limits applied when loading a criteria set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriteriaLimits {
    /// Maximum nesting depth of a single tree (a lone predicate has depth 1).
    pub max_depth: usize,
    /// Maximum number of nodes across both trees.
    pub max_nodes: usize,
}

impl Default for CriteriaLimits {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_nodes: 1024,
        }
    }
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Criteria document as produced by an external authoring step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaDocument {
    /// Study the criteria belong to.
    pub study_id: StudyId,
    /// Criteria version (must be >= 1).
    pub version: u64,
    /// Inclusion tree.
    pub inclusion_tree: CriterionDocument,
    /// Optional exclusion tree; absent means nothing excludes.
    #[serde(default)]
    pub exclusion_tree: Option<CriterionDocument>,
}

/// Node kind in a criteria document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    /// Predicate leaf.
    Predicate,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Negation (exactly one child).
    Not,
}

/// One node of a criteria document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriterionDocument {
    /// Node kind.
    pub kind: CriterionKind,
    /// Optional criterion identifier (predicates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Optional human-readable label (predicates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Attribute path (predicates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributePath>,
    /// Operator name (predicates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Operator argument (predicates only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Child nodes (combinators only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

// ============================================================================
// SECTION: Typed Predicates
// ============================================================================

/// Numeric interval with per-bound inclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    /// Lower bound, if any.
    pub min: Option<NumericValue>,
    /// Upper bound, if any.
    pub max: Option<NumericValue>,
    /// Whether the lower bound itself satisfies the range.
    pub min_inclusive: bool,
    /// Whether the upper bound itself satisfies the range.
    pub max_inclusive: bool,
}

impl NumericRange {
    /// Returns true when the value lies inside the range.
    #[must_use]
    pub fn contains(&self, value: &NumericValue) -> bool {
        let above_min = self.min.as_ref().is_none_or(|min| {
            if self.min_inclusive { value >= min } else { value > min }
        });
        let below_max = self.max.as_ref().is_none_or(|max| {
            if self.max_inclusive { value <= max } else { value < max }
        });
        above_min && below_max
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (Some(min), None) => write!(f, "{} {min}", if self.min_inclusive { ">=" } else { ">" }),
            (None, Some(max)) => write!(f, "{} {max}", if self.max_inclusive { "<=" } else { "<" }),
            (Some(min), Some(max)) => write!(
                f,
                "in {}{min}, {max}{}",
                if self.min_inclusive { "[" } else { "(" },
                if self.max_inclusive { "]" } else { ")" }
            ),
            (None, None) => f.write_str("in (-inf, +inf)"),
        }
    }
}

/// Type-checked predicate operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operator {
    /// Equality against a typed value.
    Eq {
        /// Expected value.
        value: AttributeValue,
    },
    /// Inequality against a typed value.
    Neq {
        /// Rejected value.
        value: AttributeValue,
    },
    /// Numeric interval.
    Range {
        /// Interval bounds.
        bounds: NumericRange,
    },
    /// Membership (any overlap for code lists).
    In {
        /// Accepted values.
        values: Vec<AttributeValue>,
    },
    /// Code list contains a code.
    Contains {
        /// Required code.
        code: String,
    },
    /// Date strictly before `reference + offset_days`.
    Before {
        /// Day offset from the reference date.
        offset_days: i64,
    },
    /// Date strictly after `reference + offset_days`.
    After {
        /// Day offset from the reference date.
        offset_days: i64,
    },
    /// Date inside `[reference - days_before, reference + days_after]`.
    Within {
        /// Days before the reference date.
        days_before: u32,
        /// Days after the reference date.
        days_after: u32,
    },
    /// Attribute is present.
    Exists,
}

impl Operator {
    /// Renders the operator applied to an attribute for human review.
    #[must_use]
    pub fn describe(&self, attribute: &AttributePath) -> String {
        match self {
            Self::Eq {
                value,
            } => format!("{attribute} = {value}"),
            Self::Neq {
                value,
            } => format!("{attribute} != {value}"),
            Self::Range {
                bounds,
            } => format!("{attribute} {bounds}"),
            Self::In {
                values,
            } => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                format!("{attribute} in {{{}}}", rendered.join(", "))
            }
            Self::Contains {
                code,
            } => format!("{attribute} contains \"{code}\""),
            Self::Before {
                offset_days,
            } => format!("{attribute} before {}", reference_label(*offset_days)),
            Self::After {
                offset_days,
            } => format!("{attribute} after {}", reference_label(*offset_days)),
            Self::Within {
                days_before,
                days_after,
            } => format!(
                "{attribute} within {days_before} days before to {days_after} days after reference \
                 date"
            ),
            Self::Exists => format!("{attribute} is recorded"),
        }
    }
}

/// Formats `reference date +/- n days`.
fn reference_label(offset_days: i64) -> String {
    match offset_days {
        0 => "reference date".to_string(),
        n if n > 0 => format!("reference date + {n} days"),
        n => format!("reference date - {} days", n.unsigned_abs()),
    }
}

/// Predicate leaf bound to a declared attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionPredicate {
    /// Criterion identifier (explicit or positional).
    pub id: CriterionId,
    /// Optional human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Attribute path.
    pub attribute: AttributePath,
    /// Declared type of the attribute.
    pub attribute_type: AttributeType,
    /// Type-checked operator.
    pub operator: Operator,
}

impl CriterionPredicate {
    /// Returns the review description (label when present, else the rule).
    #[must_use]
    pub fn description(&self) -> String {
        let rule = self.operator.describe(&self.attribute);
        match &self.label {
            Some(label) => format!("{label} ({rule})"),
            None => rule,
        }
    }
}

// ============================================================================
// SECTION: Criteria Set
// ============================================================================

/// Published, immutable criteria for one study version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaSet {
    /// Study identifier.
    pub study_id: StudyId,
    /// Criteria version.
    pub version: CriteriaVersion,
    /// Inclusion tree; must be TRUE for eligibility.
    pub inclusion: Requirement<CriterionPredicate>,
    /// Exclusion tree; must be FALSE for eligibility.
    pub exclusion: Requirement<CriterionPredicate>,
}

/// Which tree a criterion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeSide {
    /// Inclusion tree.
    Inclusion,
    /// Exclusion tree.
    Exclusion,
}

impl TreeSide {
    /// Returns the tree label used in positional identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inclusion => "inclusion",
            Self::Exclusion => "exclusion",
        }
    }
}

impl CriteriaSet {
    /// Loads and type-checks a criteria document against a study schema.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaValidationError`] describing the first problem found.
    pub fn load(
        document: &CriteriaDocument,
        schema: &StudySchema,
        limits: &CriteriaLimits,
    ) -> Result<Self, CriteriaValidationError> {
        let fail = |location: Option<String>, issue: CriteriaIssue| CriteriaValidationError {
            study_id: document.study_id.clone(),
            version: document.version,
            location,
            issue,
        };

        if document.study_id.is_blank() {
            return Err(fail(None, CriteriaIssue::MissingStudyId));
        }
        if document.study_id != schema.study_id {
            return Err(fail(
                None,
                CriteriaIssue::StudyMismatch {
                    schema: schema.study_id.clone(),
                },
            ));
        }
        let version = CriteriaVersion::from_raw(document.version)
            .ok_or_else(|| fail(None, CriteriaIssue::ZeroVersion))?;

        let mut builder = TreeBuilder {
            schema,
            limits,
            ids: BTreeSet::new(),
            nodes: 0,
        };
        let inclusion = builder
            .build(&document.inclusion_tree, TreeSide::Inclusion.as_str().to_string(), 1)
            .map_err(|(location, issue)| fail(Some(location), issue))?;
        let exclusion = match &document.exclusion_tree {
            Some(tree) => builder
                .build(tree, TreeSide::Exclusion.as_str().to_string(), 1)
                .map_err(|(location, issue)| fail(Some(location), issue))?,
            None => Requirement::never(),
        };

        Ok(Self {
            study_id: document.study_id.clone(),
            version,
            inclusion,
            exclusion,
        })
    }

    /// Returns the tree for a side.
    #[must_use]
    pub const fn tree(&self, side: TreeSide) -> &Requirement<CriterionPredicate> {
        match side {
            TreeSide::Inclusion => &self.inclusion,
            TreeSide::Exclusion => &self.exclusion,
        }
    }

    /// Returns every predicate with its tree side, inclusion first.
    #[must_use]
    pub fn predicates(&self) -> Vec<(TreeSide, &CriterionPredicate)> {
        let inclusion = self.inclusion.predicates().into_iter().map(|p| (TreeSide::Inclusion, p));
        let exclusion = self.exclusion.predicates().into_iter().map(|p| (TreeSide::Exclusion, p));
        inclusion.chain(exclusion).collect()
    }

    /// Computes the canonical hash of the loaded criteria set.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Criteria document rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("criteria for study {study_id} version {version} rejected{}: {issue}", location_suffix(.location.as_deref()))]
pub struct CriteriaValidationError {
    /// Study identifier from the document.
    pub study_id: StudyId,
    /// Raw version from the document.
    pub version: u64,
    /// Node location (`inclusion/0/1`) or criterion id, when node-specific.
    pub location: Option<String>,
    /// Problem found.
    pub issue: CriteriaIssue,
}

/// Formats the optional location for error messages.
fn location_suffix(location: Option<&str>) -> String {
    location.map(|loc| format!(" at {loc}")).unwrap_or_default()
}

/// Specific reason a criteria document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriteriaIssue {
    /// Study identifier is empty.
    #[error("study_id must not be empty")]
    MissingStudyId,
    /// Study identifier does not match the schema.
    #[error("document does not belong to schema study {schema}")]
    StudyMismatch {
        /// Schema study identifier.
        schema: StudyId,
    },
    /// Version zero is not allowed.
    #[error("version must be >= 1")]
    ZeroVersion,
    /// Attribute path is not declared in the schema.
    #[error("unknown attribute {0}")]
    UnknownAttribute(AttributePath),
    /// Operator name is not recognized.
    #[error("unknown operator {0}")]
    UnknownOperator(String),
    /// Operator does not apply to the attribute's declared type.
    #[error("operator {operator} cannot be applied to {attribute_type} attribute {attribute}")]
    OperatorTypeMismatch {
        /// Operator name.
        operator: String,
        /// Attribute path.
        attribute: AttributePath,
        /// Declared type label.
        attribute_type: &'static str,
    },
    /// Operator argument is malformed.
    #[error("invalid value for operator {operator}: {reason}")]
    InvalidValue {
        /// Operator name.
        operator: String,
        /// Problem description.
        reason: String,
    },
    /// Required field is absent.
    #[error("missing field {0}")]
    MissingField(&'static str),
    /// Field is not valid for the node kind.
    #[error("field {0} is not allowed on this node kind")]
    UnexpectedField(&'static str),
    /// NOT node does not have exactly one child.
    #[error("not node must have exactly one child, found {0}")]
    NotArity(usize),
    /// Explicit criterion identifier is empty.
    #[error("criterion id must not be empty")]
    EmptyCriterionId,
    /// Criterion identifier is used twice.
    #[error("duplicate criterion id {0}")]
    DuplicateCriterionId(CriterionId),
    /// Tree exceeds the depth limit.
    #[error("tree depth exceeds limit {max}")]
    TooDeep {
        /// Configured limit.
        max: usize,
    },
    /// Criteria exceed the node limit.
    #[error("criteria exceed node limit {max}")]
    TooManyNodes {
        /// Configured limit.
        max: usize,
    },
}

// ============================================================================
// SECTION: Tree Builder
// ============================================================================

/// Failure raised while building a tree: node location plus issue.
type BuildFailure = (String, CriteriaIssue);

/// Recursive document-to-requirement converter.
struct TreeBuilder<'a> {
    /// Schema used to resolve attributes.
    schema: &'a StudySchema,
    /// Structural limits.
    limits: &'a CriteriaLimits,
    /// Criterion identifiers assigned so far.
    ids: BTreeSet<CriterionId>,
    /// Nodes built so far across both trees.
    nodes: usize,
}

impl TreeBuilder<'_> {
    /// Builds a requirement from a document node at `location`.
    fn build(
        &mut self,
        node: &CriterionDocument,
        location: String,
        depth: usize,
    ) -> Result<Requirement<CriterionPredicate>, BuildFailure> {
        if depth > self.limits.max_depth {
            return Err((
                location,
                CriteriaIssue::TooDeep {
                    max: self.limits.max_depth,
                },
            ));
        }
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err((
                location,
                CriteriaIssue::TooManyNodes {
                    max: self.limits.max_nodes,
                },
            ));
        }

        if node.kind == CriterionKind::Predicate {
            let predicate = self.build_predicate(node, &location)?;
            return Ok(Requirement::predicate(predicate));
        }

        if let Some(field) = predicate_field_on_combinator(node) {
            return Err((location, CriteriaIssue::UnexpectedField(field)));
        }
        if node.kind == CriterionKind::Not && node.children.len() != 1 {
            return Err((location, CriteriaIssue::NotArity(node.children.len())));
        }
        let mut children = Vec::with_capacity(node.children.len());
        for (index, child) in node.children.iter().enumerate() {
            children.push(self.build(child, format!("{location}/{index}"), depth + 1)?);
        }
        Ok(match node.kind {
            CriterionKind::And => Requirement::and(children),
            CriterionKind::Or => Requirement::or(children),
            CriterionKind::Not | CriterionKind::Predicate => {
                let child = children.pop().ok_or((location, CriteriaIssue::NotArity(0)))?;
                Requirement::negate(child)
            }
        })
    }

    /// Builds and type-checks a predicate leaf.
    fn build_predicate(
        &mut self,
        node: &CriterionDocument,
        location: &str,
    ) -> Result<CriterionPredicate, BuildFailure> {
        let fail = |issue: CriteriaIssue| (location.to_string(), issue);
        if !node.children.is_empty() {
            return Err(fail(CriteriaIssue::UnexpectedField("children")));
        }
        let attribute =
            node.attribute.clone().ok_or_else(|| fail(CriteriaIssue::MissingField("attribute")))?;
        let operator_name =
            node.operator.as_deref().ok_or_else(|| fail(CriteriaIssue::MissingField("operator")))?;
        let attribute_type = self
            .schema
            .attribute(&attribute)
            .cloned()
            .ok_or_else(|| fail(CriteriaIssue::UnknownAttribute(attribute.clone())))?;

        if !KNOWN_OPERATORS.contains(&operator_name) {
            return Err(fail(CriteriaIssue::UnknownOperator(operator_name.to_string())));
        }
        if !operator_applies(operator_name, &attribute_type) {
            return Err(fail(CriteriaIssue::OperatorTypeMismatch {
                operator: operator_name.to_string(),
                attribute,
                attribute_type: attribute_type.label(),
            }));
        }
        let operator = parse_operator(operator_name, node.value.as_ref(), &attribute_type)
            .map_err(fail)?;

        let id = match &node.id {
            Some(raw) if raw.trim().is_empty() => {
                return Err(fail(CriteriaIssue::EmptyCriterionId));
            }
            Some(raw) => CriterionId::new(raw.trim()),
            None => CriterionId::new(location),
        };
        if !self.ids.insert(id.clone()) {
            return Err(fail(CriteriaIssue::DuplicateCriterionId(id)));
        }

        Ok(CriterionPredicate {
            id,
            label: node.label.clone().filter(|label| !label.trim().is_empty()),
            attribute,
            attribute_type,
            operator,
        })
    }
}

/// Returns the first predicate-only field set on a combinator node.
const fn predicate_field_on_combinator(node: &CriterionDocument) -> Option<&'static str> {
    if node.attribute.is_some() {
        Some("attribute")
    } else if node.operator.is_some() {
        Some("operator")
    } else if node.value.is_some() {
        Some("value")
    } else if node.id.is_some() {
        Some("id")
    } else {
        None
    }
}

// ============================================================================
// SECTION: Operator Parsing
// ============================================================================

/// Operator names accepted in documents.
const KNOWN_OPERATORS: &[&str] = &[
    "eq", "neq", "gt", "gte", "lt", "lte", "range", "in", "contains", "before", "after", "within",
    "exists",
];

/// Returns true when the operator is defined for the declared type.
fn operator_applies(operator: &str, declared: &AttributeType) -> bool {
    use AttributeType as T;
    match operator {
        "eq" | "neq" => matches!(declared, T::Numeric | T::Categorical | T::Boolean | T::Date),
        "gt" | "gte" | "lt" | "lte" | "range" => {
            matches!(declared, T::Numeric | T::DerivedAge { .. })
        }
        "in" => matches!(declared, T::Numeric | T::Categorical | T::CodeList),
        "contains" => matches!(declared, T::CodeList),
        "before" | "after" | "within" => matches!(declared, T::Date),
        "exists" => true,
        _ => false,
    }
}

/// Converts an operator name and argument into a typed operator.
fn parse_operator(
    name: &str,
    value: Option<&Value>,
    declared: &AttributeType,
) -> Result<Operator, CriteriaIssue> {
    let invalid = |reason: &str| CriteriaIssue::InvalidValue {
        operator: name.to_string(),
        reason: reason.to_string(),
    };
    let required = || value.ok_or(CriteriaIssue::MissingField("value"));

    match name {
        "eq" | "neq" => {
            let typed = AttributeValue::from_json(declared, required()?)
                .map_err(|reason| invalid(&reason))?
                .ok_or_else(|| invalid("value must not be null"))?;
            Ok(if name == "eq" {
                Operator::Eq {
                    value: typed,
                }
            } else {
                Operator::Neq {
                    value: typed,
                }
            })
        }
        "gt" | "gte" | "lt" | "lte" => {
            let bound = parse_decimal(required()?).ok_or_else(|| invalid("expected a number"))?;
            let bounds = match name {
                "gt" | "gte" => NumericRange {
                    min: Some(bound),
                    max: None,
                    min_inclusive: name == "gte",
                    max_inclusive: true,
                },
                _ => NumericRange {
                    min: None,
                    max: Some(bound),
                    min_inclusive: true,
                    max_inclusive: name == "lte",
                },
            };
            Ok(Operator::Range {
                bounds,
            })
        }
        "range" => parse_range(required()?).map_err(|reason| invalid(&reason)),
        "in" => {
            let Value::Array(items) = required()? else {
                return Err(invalid("expected an array of values"));
            };
            if items.is_empty() {
                return Err(invalid("value list must not be empty"));
            }
            let element_type = match declared {
                AttributeType::Numeric => AttributeType::Numeric,
                _ => AttributeType::Categorical,
            };
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let typed = AttributeValue::from_json(&element_type, item)
                    .map_err(|reason| invalid(&reason))?
                    .ok_or_else(|| invalid("list entries must not be null"))?;
                values.push(typed);
            }
            Ok(Operator::In {
                values,
            })
        }
        "contains" => match required()? {
            Value::String(code) if !code.is_empty() => Ok(Operator::Contains {
                code: code.clone(),
            }),
            _ => Err(invalid("expected a non-empty code string")),
        },
        "before" | "after" => {
            let offset_days = match value {
                None => 0,
                Some(Value::Number(number)) => {
                    number.as_i64().ok_or_else(|| invalid("offset must be an integer"))?
                }
                Some(Value::Object(map)) => match map.get("offset_days") {
                    None => 0,
                    Some(raw) => raw.as_i64().ok_or_else(|| invalid("offset must be an integer"))?,
                },
                Some(_) => return Err(invalid("expected {offset_days} or an integer")),
            };
            if offset_days.unsigned_abs() > MAX_OFFSET_DAYS.unsigned_abs() {
                return Err(invalid("offset exceeds the supported day range"));
            }
            Ok(if name == "before" {
                Operator::Before {
                    offset_days,
                }
            } else {
                Operator::After {
                    offset_days,
                }
            })
        }
        "within" => {
            let Value::Object(map) = required()? else {
                return Err(invalid("expected {days_before, days_after}"));
            };
            let days = |key: &str| -> Result<u32, CriteriaIssue> {
                match map.get(key) {
                    None => Ok(0),
                    Some(raw) => raw
                        .as_u64()
                        .filter(|days| i64::try_from(*days).is_ok_and(|d| d <= MAX_OFFSET_DAYS))
                        .and_then(|days| u32::try_from(days).ok())
                        .ok_or_else(|| invalid("day counts must be small non-negative integers")),
                }
            };
            Ok(Operator::Within {
                days_before: days("days_before")?,
                days_after: days("days_after")?,
            })
        }
        "exists" => {
            if value.is_some() {
                return Err(CriteriaIssue::UnexpectedField("value"));
            }
            Ok(Operator::Exists)
        }
        other => Err(CriteriaIssue::UnknownOperator(other.to_string())),
    }
}

/// Parses a `{min, max, min_inclusive, max_inclusive}` range argument.
fn parse_range(value: &Value) -> Result<Operator, String> {
    let Value::Object(map) = value else {
        return Err("expected {min, max, min_inclusive, max_inclusive}".to_string());
    };
    let bound = |key: &str| -> Result<Option<NumericValue>, String> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => parse_decimal(raw).map(Some).ok_or_else(|| format!("{key} must be a number")),
        }
    };
    let flag = |key: &str| -> Result<bool, String> {
        match map.get(key) {
            None => Ok(true),
            Some(Value::Bool(flag)) => Ok(*flag),
            Some(_) => Err(format!("{key} must be a boolean")),
        }
    };
    let bounds = NumericRange {
        min: bound("min")?,
        max: bound("max")?,
        min_inclusive: flag("min_inclusive")?,
        max_inclusive: flag("max_inclusive")?,
    };
    match (&bounds.min, &bounds.max) {
        (None, None) => return Err("range needs at least one bound".to_string()),
        (Some(min), Some(max))
            if min > max || (min == max && !(bounds.min_inclusive && bounds.max_inclusive)) =>
        {
            return Err("range is empty".to_string());
        }
        _ => {}
    }
    Ok(Operator::Range {
        bounds,
    })
}

/// Parses a decimal from a JSON number or decimal string.
fn parse_decimal(value: &Value) -> Option<NumericValue> {
    match value {
        Value::Number(number) => NumericValue::from_json_number(number),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

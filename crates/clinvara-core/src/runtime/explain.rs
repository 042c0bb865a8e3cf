// crates/clinvara-core/src/runtime/explain.rs
// ============================================================================
// Module: Clinvara Explainability
// Description: Structured rationale rendered from stored evaluation traces.
// Purpose: Show reviewers every node, its observed value, and missing data.
// Dependencies: clinvara-logic, serde, crate::core
// ============================================================================

//! ## Overview
//! A [`Rationale`] is read from a stored verdict's trace and never
//! re-evaluates criteria, so the explanation cannot drift from the verdict.
//! When the verdict is indeterminate it lists exactly the unknown leaves whose
//! unknown result propagates to an unknown root; unknowns masked by a
//! determined sibling are left out.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write;

use clinvara_logic::TraceNode;
use clinvara_logic::TraceVisit;
use clinvara_logic::TriState;
use serde::Deserialize;
use serde::Serialize;

use crate::core::AttributePath;
use crate::core::AttributeValue;
use crate::core::ClinicalDate;
use crate::core::CriteriaVersion;
use crate::core::CriterionId;
use crate::core::CriterionTrace;
use crate::core::Eligibility;
use crate::core::PatientId;
use crate::core::PredicateObservation;
use crate::core::TreeSide;
use crate::core::Verdict;
use crate::core::VerdictId;

// ============================================================================
// SECTION: Rationale Types
// ============================================================================

/// Node kind shown in a rationale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationaleNodeKind {
    /// Predicate leaf.
    Predicate,
    /// All children required.
    AllOf,
    /// Any child suffices.
    AnyOf,
    /// Negated child.
    Not,
}

/// One node of the rationale, in depth-first order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationaleLine {
    /// Nesting depth (tree root is zero).
    pub depth: usize,
    /// Child index path from the tree root.
    pub path: Vec<usize>,
    /// Node kind.
    pub kind: RationaleNodeKind,
    /// Criterion identifier for predicate leaves.
    pub criterion_id: Option<CriterionId>,
    /// Human-readable description.
    pub description: String,
    /// Observed value for predicate leaves.
    pub observed: Option<AttributeValue>,
    /// Node result.
    pub result: TriState,
}

/// Rationale for one criteria tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationaleSection {
    /// Tree side.
    pub side: TreeSide,
    /// Root result.
    pub result: TriState,
    /// Nodes in depth-first order.
    pub lines: Vec<RationaleLine>,
}

/// Unknown leaf that contributes to an indeterminate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDatum {
    /// Tree side.
    pub side: TreeSide,
    /// Criterion identifier.
    pub criterion_id: CriterionId,
    /// Attribute that is missing.
    pub attribute: AttributePath,
    /// Criterion description.
    pub description: String,
}

/// Structured, reviewable explanation of a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rationale {
    /// Verdict explained.
    pub verdict_id: VerdictId,
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Criteria version.
    pub criteria_version: CriteriaVersion,
    /// Reference date used.
    pub reference_date: ClinicalDate,
    /// Computed eligibility.
    pub eligibility: Eligibility,
    /// Inclusion then exclusion sections.
    pub sections: Vec<RationaleSection>,
    /// Data whose absence keeps the verdict indeterminate.
    pub missing: Vec<MissingDatum>,
}

// ============================================================================
// SECTION: Explain
// ============================================================================

/// Builds the rationale for a stored verdict.
#[must_use]
pub fn explain(verdict: &Verdict) -> Rationale {
    let trees = [
        (TreeSide::Inclusion, &verdict.trace.inclusion),
        (TreeSide::Exclusion, &verdict.trace.exclusion),
    ];
    let sections = trees.iter().map(|(side, trace)| section(*side, trace)).collect();
    let mut missing = Vec::new();
    if verdict.eligibility == Eligibility::Indeterminate {
        for (side, trace) in trees {
            for leaf in trace.contributing_unknowns() {
                missing.push(MissingDatum {
                    side,
                    criterion_id: leaf.criterion_id.clone(),
                    attribute: leaf.attribute.clone(),
                    description: leaf.description.clone(),
                });
            }
        }
    }
    Rationale {
        verdict_id: verdict.verdict_id.clone(),
        patient_id: verdict.patient_id.clone(),
        criteria_version: verdict.criteria_version,
        reference_date: verdict.reference_date,
        eligibility: verdict.eligibility,
        sections,
        missing,
    }
}

/// Flattens one tree trace into rationale lines.
fn section(side: TreeSide, trace: &CriterionTrace) -> RationaleSection {
    let mut lines = Vec::new();
    trace.walk(&mut |visit: TraceVisit<'_, PredicateObservation>| {
        let (kind, criterion_id, description, observed) = match visit.node {
            TraceNode::Predicate {
                detail, ..
            } => (
                RationaleNodeKind::Predicate,
                Some(detail.criterion_id.clone()),
                detail.description.clone(),
                detail.observed.clone(),
            ),
            TraceNode::And {
                children, ..
            } => (RationaleNodeKind::AllOf, None, combinator_label("ALL of", children.len()), None),
            TraceNode::Or {
                children, ..
            } => (RationaleNodeKind::AnyOf, None, combinator_label("ANY of", children.len()), None),
            TraceNode::Not {
                ..
            } => (RationaleNodeKind::Not, None, "NOT".to_string(), None),
        };
        lines.push(RationaleLine {
            depth: visit.depth,
            path: visit.path.to_vec(),
            kind,
            criterion_id,
            description,
            observed,
            result: visit.node.result(),
        });
    });
    RationaleSection {
        side,
        result: trace.result(),
        lines,
    }
}

/// Labels a combinator, noting empty ones.
fn combinator_label(label: &str, children: usize) -> String {
    if children == 0 { format!("{label} (no criteria)") } else { label.to_string() }
}

// ============================================================================
// SECTION: Text Rendering
// ============================================================================

impl Rationale {
    /// Renders the rationale as indented plain text for review.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Verdict {} (patient {}, criteria v{}, reference date {})",
            self.verdict_id, self.patient_id, self.criteria_version, self.reference_date
        )?;
        writeln!(f, "Computed eligibility: {}", self.eligibility)?;
        for section in &self.sections {
            let title = match section.side {
                TreeSide::Inclusion => "Inclusion",
                TreeSide::Exclusion => "Exclusion",
            };
            writeln!(f)?;
            writeln!(f, "{title}: {}", section.result)?;
            for line in &section.lines {
                write_line(f, line)?;
            }
        }
        if !self.missing.is_empty() {
            writeln!(f)?;
            writeln!(f, "Missing data:")?;
            for datum in &self.missing {
                writeln!(f, "  - {} ({}): {}", datum.criterion_id, datum.attribute, datum.description)?;
            }
        }
        Ok(())
    }
}

/// Writes one indented rationale line.
fn write_line(out: &mut impl Write, line: &RationaleLine) -> fmt::Result {
    let indent = "  ".repeat(line.depth + 1);
    write!(out, "{indent}[{}] ", line.result)?;
    if let Some(id) = &line.criterion_id {
        write!(out, "{id}: ")?;
    }
    write!(out, "{}", line.description)?;
    if line.kind == RationaleNodeKind::Predicate {
        match &line.observed {
            Some(value) => write!(out, " (observed: {value})")?,
            None => out.write_str(" (observed: not recorded)")?,
        }
    }
    writeln!(out)
}
